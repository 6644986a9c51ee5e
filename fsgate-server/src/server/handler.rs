use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::schemars::{self, JsonSchema};
use rmcp::ErrorData as McpError;
use rmcp::{tool, tool_handler, tool_router};
use serde::{Deserialize, Serialize};
use serde_json::json;

use fsgate_core::{FileAccessManager, FsError, Settings};

fn default_true() -> bool {
    true
}

/// Tool handler backed by one shared [`FileAccessManager`].
#[derive(Clone)]
pub struct FsServerHandler {
    manager: Arc<FileAccessManager>,
    server_name: String,
    tool_router: ToolRouter<Self>,
}

impl FsServerHandler {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        let manager = FileAccessManager::from_settings(settings)?;
        Ok(Self::with_manager(
            Arc::new(manager),
            settings.server_name.clone(),
        ))
    }

    pub fn with_manager(manager: Arc<FileAccessManager>, server_name: String) -> Self {
        Self {
            manager,
            server_name,
            tool_router: Self::tool_router(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PathInput {
    #[schemars(description = "Absolute path inside an allowed directory")]
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WriteFileInput {
    #[schemars(description = "Absolute path of the file to write")]
    pub path: String,

    #[schemars(description = "Text content to write; replaces any existing content")]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ListDirectoryInput {
    #[schemars(description = "Absolute path of the directory to list")]
    pub path: String,

    #[schemars(description = "Hide entries matched by .gitignore (default: true)")]
    #[serde(default = "default_true")]
    pub respect_gitignore: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DirectoryTreeInput {
    #[schemars(description = "Absolute path of the tree root")]
    pub path: String,

    #[schemars(description = "Directories deeper than this are not expanded (default: server setting)")]
    pub max_depth: Option<usize>,

    #[schemars(description = "Hide entries matched by .gitignore (default: true)")]
    #[serde(default = "default_true")]
    pub respect_gitignore: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchFilesInput {
    #[schemars(description = "Absolute path of the directory to search under")]
    pub path: String,

    #[schemars(description = "Case-insensitive substring matched against file names")]
    pub pattern: String,

    #[schemars(description = "Skip entries matched by .gitignore (default: true)")]
    #[serde(default = "default_true")]
    pub respect_gitignore: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ClearIgnoreCacheInput {
    #[schemars(description = "Directory whose cached .gitignore should be dropped; omit to clear everything")]
    pub path: Option<String>,
}

#[tool_router]
impl FsServerHandler {
    #[tool(description = "Read a text file. Invalid UTF-8 is replaced. Returns content and size in bytes.")]
    async fn read_file(&self, input: Parameters<PathInput>) -> Result<CallToolResult, McpError> {
        respond(self.manager.read_file(&input.0.path).await)
    }

    #[tool(description = "Write text to a file, creating parent directories as needed.")]
    async fn write_file(
        &self,
        input: Parameters<WriteFileInput>,
    ) -> Result<CallToolResult, McpError> {
        let Parameters(WriteFileInput { path, content }) = input;
        respond(self.manager.write_file(&path, &content).await)
    }

    #[tool(description = "List the immediate children of a directory, sorted by name.")]
    async fn list_directory(
        &self,
        input: Parameters<ListDirectoryInput>,
    ) -> Result<CallToolResult, McpError> {
        let Parameters(ListDirectoryInput {
            path,
            respect_gitignore,
        }) = input;
        respond(self.manager.list_directory(&path, respect_gitignore).await)
    }

    #[tool(description = "Recursive tree of a directory. Directories at the depth limit are marked truncated.")]
    async fn directory_tree(
        &self,
        input: Parameters<DirectoryTreeInput>,
    ) -> Result<CallToolResult, McpError> {
        let Parameters(DirectoryTreeInput {
            path,
            max_depth,
            respect_gitignore,
        }) = input;
        respond(
            self.manager
                .directory_tree(&path, max_depth, respect_gitignore)
                .await,
        )
    }

    #[tool(description = "Find files whose name contains a pattern (case-insensitive). Ignored directories are skipped entirely.")]
    async fn search_files(
        &self,
        input: Parameters<SearchFilesInput>,
    ) -> Result<CallToolResult, McpError> {
        let Parameters(SearchFilesInput {
            path,
            pattern,
            respect_gitignore,
        }) = input;
        respond(
            self.manager
                .search_files(&path, &pattern, respect_gitignore)
                .await,
        )
    }

    #[tool(description = "Metadata for a file or directory: type, size, timestamps, symlink flag.")]
    async fn get_file_info(
        &self,
        input: Parameters<PathInput>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.manager.get_file_info(&input.0.path).await)
    }

    #[tool(description = "Create a directory and any missing parents. Succeeds if it already exists.")]
    async fn create_directory(
        &self,
        input: Parameters<PathInput>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.manager.create_directory(&input.0.path).await)
    }

    #[tool(description = "List the directories this server is allowed to access.")]
    async fn list_allowed_directories(&self) -> Result<CallToolResult, McpError> {
        respond(Ok(json!({
            "allowed_directories": self.manager.allowed_directories(),
        })))
    }

    #[tool(description = "Forget cached .gitignore rules for one directory, or for all directories.")]
    async fn clear_ignore_cache(
        &self,
        input: Parameters<ClearIgnoreCacheInput>,
    ) -> Result<CallToolResult, McpError> {
        let path = input.0.path;
        let result = self
            .manager
            .refresh_ignore_cache(path.as_deref())
            .await
            .map(|()| json!({ "success": true, "path": path }));
        respond(result)
    }
}

#[tool_handler]
impl rmcp::ServerHandler for FsServerHandler {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: self.server_name.clone(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Implementation::from_build_env()
            },
            instructions: Some(
                "Filesystem access limited to the allowed directories. Paths must be \
                 absolute; percent-encoded paths are decoded. Listing, tree and search \
                 hide entries matched by .gitignore unless respect_gitignore is false. \
                 Call list_allowed_directories to see where you may operate."
                    .to_string(),
            ),
        }
    }
}

/// Successful values become pretty JSON text; filesystem errors become an
/// error result carrying a JSON payload the client can inspect.
fn respond<T: Serialize>(result: fsgate_core::Result<T>) -> Result<CallToolResult, McpError> {
    match result {
        Ok(value) => {
            let text = serde_json::to_string_pretty(&value)
                .map_err(|e| McpError::internal_error(e.to_string(), None))?;
            Ok(CallToolResult::success(vec![Content::text(text)]))
        }
        Err(err) => {
            tracing::warn!(kind = err.kind(), "{err}");
            Ok(CallToolResult::error(vec![Content::text(
                error_payload(&err).to_string(),
            )]))
        }
    }
}

fn error_payload(err: &FsError) -> serde_json::Value {
    let mut payload = json!({
        "error": err.to_string(),
        "kind": err.kind(),
        "path": err.path(),
    });
    if let Some(allowed) = err.allowed_directories() {
        payload["allowed_directories"] = json!(allowed);
    }
    payload
}
