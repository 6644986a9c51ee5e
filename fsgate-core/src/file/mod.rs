//! Sandboxed filesystem access with `.gitignore` awareness.
//!
//! ## Architecture
//!
//! ### resolver.rs
//! Turns client supplied path strings into absolute paths and rejects anything
//! outside the allowed roots:
//! - Percent-decodes first (`%20`, `%2e%2e`), then folds `.`/`..`
//! - Resolves symlinks in the existing part of the path so links cannot escape
//! - Compares whole path components, so `/srv/ab` is not inside `/srv/a`
//!
//! ### ignore.rs
//! Compiles `.gitignore` files with the `ignore` crate and caches them per
//! directory. A cached rule set is reused while the file's mtime is unchanged.
//! Unreadable or invalid ignore files hide nothing.
//!
//! ### walk.rs
//! Listing, bounded-depth trees and name search. Ignored directories are
//! pruned, never entered.
//!
//! ### access.rs
//! `FileAccessManager` ties the above together and offers the operations the
//! server exposes: read_file, write_file, list_directory, directory_tree,
//! search_files, get_file_info, create_directory.

pub mod access;
pub mod ignore;
pub mod resolver;
pub mod types;
pub mod walk;

pub use access::FileAccessManager;
