//! MCP server exposing the sandboxed filesystem tools over stdio.

mod handler;

pub use handler::FsServerHandler;
