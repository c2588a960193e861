// wls-server: accepts raw HTML over HTTP and reports the language detected
// by a dynamically loaded `ExtractLanguage` plugin.

pub mod config;
pub mod error;
pub mod plugin;
pub mod plugin_ffi;
pub mod shutdown_signal;
pub mod web;

pub use config::{ServerArgs, ServerConfig};
pub use error::{ConfigError, FrameError, LoadError, StartupError};
pub use plugin::{LanguageExtractor, LoadedPlugin};
