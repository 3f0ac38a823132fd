//! Configuration loading, merging into CLI arguments, and validation into
//! engine settings.
pub(crate) mod apply;
mod loader;
pub mod types;
mod validate;


pub use apply::apply_config;
pub use loader::{DEFAULT_CONFIG_FILES, load_config};
pub use validate::resolve_run_settings;

#[cfg(test)]
pub(crate) use loader::load_config_file;
