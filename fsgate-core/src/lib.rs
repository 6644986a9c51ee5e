pub mod error;
pub mod file;
pub mod settings;

pub use error::{FsError, Result};
pub use file::FileAccessManager;
pub use settings::Settings;
