use std::path::{Path, PathBuf};

use fsgate_core::file::types::{EntryKind, TreeNode};
use fsgate_core::FsError;


use fixture::Fixture;

fn collect_paths(node: &TreeNode, out: &mut Vec<PathBuf>) {
    out.push(node.path.clone());
    for child in &node.children {
        collect_paths(child, out);
    }
}

#[tokio::test]
async fn test_list_hides_ignored_entries() {
    let fixture = Fixture::python_project();

    let listing = fixture
        .manager
        .list_directory(&fixture.path(""), true)
        .await
        .unwrap();
    let names: Vec<&str> = listing.items.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec![".gitignore", "README.md", "src", "tests"]);
    assert_eq!(listing.total, 4);

    let src = fixture
        .manager
        .list_directory(&fixture.path("src"), false)
        .await
        .unwrap();
    let names: Vec<&str> = src.items.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["helper.pyc", "main.py", "utils.py"]);
}

#[tokio::test]
async fn test_tree_never_contains_ignored_paths() {
    let fixture = Fixture::python_project();

    let tree = fixture
        .manager
        .directory_tree(&fixture.path(""), Some(10), true)
        .await
        .unwrap();

    let mut paths = Vec::new();
    collect_paths(&tree, &mut paths);
    for path in &paths {
        let relative = fixture.relative(path);
        assert!(!relative.starts_with("venv"), "{path:?}");
        assert!(!relative.starts_with("__pycache__"), "{path:?}");
        assert_ne!(path.extension().and_then(|e| e.to_str()), Some("pyc"));
    }
    assert!(paths.contains(&fixture.abs("src/main.py")));
    assert!(paths.contains(&fixture.abs("tests/test_main.py")));
}

#[tokio::test]
async fn test_tree_depth_bounds() {
    let fixture = Fixture::python_project();

    let root = fixture
        .manager
        .directory_tree(&fixture.path(""), Some(0), true)
        .await
        .unwrap();
    assert!(root.truncated);
    assert!(root.children.is_empty());

    let shallow = fixture
        .manager
        .directory_tree(&fixture.path(""), Some(1), true)
        .await
        .unwrap();
    assert!(!shallow.truncated);
    for child in &shallow.children {
        assert!(child.children.is_empty());
        assert_eq!(child.truncated, child.kind == EntryKind::Directory);
    }
}

#[tokio::test]
async fn test_search_skips_ignored_directories() {
    let fixture = Fixture::python_project();

    let results = fixture
        .manager
        .search_files(&fixture.path(""), "py", true)
        .await
        .unwrap();
    let names: Vec<&str> = results.results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["main.py", "utils.py", "test_main.py"]);

    let everything = fixture
        .manager
        .search_files(&fixture.path(""), "py", false)
        .await
        .unwrap();
    assert!(everything
        .results
        .iter()
        .any(|r| r.path.starts_with(fixture.abs("venv"))));
}

#[tokio::test]
async fn test_write_then_read() {
    let fixture = Fixture::new();
    let target = fixture.path("deep/nested/notes.txt");
    let content = "line one\nline two \u{2713}\n";

    let written = fixture.manager.write_file(&target, content).await.unwrap();
    assert!(written.success);

    let read = fixture.manager.read_file(&target).await.unwrap();
    assert_eq!(read.content, content);
    assert_eq!(read.size, content.len() as u64);
}

#[tokio::test]
async fn test_gitignore_edit_takes_effect() {
    let fixture = Fixture::new();
    fixture.write("keep.txt", "x");
    fixture.write("drop.tmp", "x");
    fixture.write(".gitignore", "*.tmp\n");

    let names = |listing: fsgate_core::file::types::DirectoryListing| {
        listing
            .items
            .into_iter()
            .map(|i| i.name)
            .collect::<Vec<_>>()
    };

    let before = fixture
        .manager
        .list_directory(&fixture.path(""), true)
        .await
        .unwrap();
    assert_eq!(names(before), vec![".gitignore", "keep.txt"]);

    // New contents with a distinct mtime
    let gitignore = fixture.abs(".gitignore");
    std::fs::write(&gitignore, "keep.txt\n").unwrap();
    let later = std::time::SystemTime::now() + std::time::Duration::from_secs(5);
    std::fs::File::options()
        .write(true)
        .open(&gitignore)
        .unwrap()
        .set_modified(later)
        .unwrap();

    let after = fixture
        .manager
        .list_directory(&fixture.path(""), true)
        .await
        .unwrap();
    assert_eq!(names(after), vec![".gitignore", "drop.tmp"]);
}

#[tokio::test]
async fn test_type_mismatches() {
    let fixture = Fixture::python_project();

    let err = fixture
        .manager
        .read_file(&fixture.path("src"))
        .await
        .unwrap_err();
    assert!(matches!(err, FsError::NotAFile(_)));

    let err = fixture
        .manager
        .directory_tree(&fixture.path("README.md"), None, true)
        .await
        .unwrap_err();
    assert!(matches!(err, FsError::NotADirectory(_)));

    let err = fixture
        .manager
        .list_directory(&fixture.path("missing"), true)
        .await
        .unwrap_err();
    assert!(matches!(err, FsError::PathNotFound(_)));
}

#[tokio::test]
async fn test_every_operation_rejects_outside_paths() {
    let fixture = Fixture::new();
    let outside = Path::new("/").join("fsgate-outside-root");
    let outside = outside.to_string_lossy();
    let escape = format!("{}/../../etc", fixture.path(""));

    let manager = &fixture.manager;
    let errors = vec![
        manager.read_file(&outside).await.err(),
        manager.write_file(&outside, "x").await.err(),
        manager.list_directory(&escape, true).await.err(),
        manager.directory_tree(&escape, None, true).await.err(),
        manager.search_files(&escape, "x", true).await.err(),
        manager.get_file_info(&outside).await.err(),
        manager.create_directory(&outside).await.err(),
    ];
    for err in errors {
        let err = err.expect("operation should have been rejected");
        assert!(matches!(err, FsError::PathNotAllowed { .. }), "{err}");
        assert_eq!(err.allowed_directories(), Some(&[fixture.root.clone()][..]));
    }
}
