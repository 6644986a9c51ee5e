pub mod config;

pub use config::Settings;

#[cfg(test)]
mod tests;
