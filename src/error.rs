// src/error.rs
// Defines the error types of the server: fatal startup failures and
// per-connection framing failures, plus the conversion of the latter
// into HTTP responses.

use crate::web::OutgoingResponse;
use std::fmt;
use std::path::PathBuf;

// Errors raised while resolving the server configuration.
#[derive(Debug)]
pub enum ConfigError {
    // Neither host+port from the environment nor a configuration file.
    NotFound { path: PathBuf },
    // The configuration file exists but could not be read.
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    InvalidPort(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NotFound { path } => write!(
                f,
                "Configuration not found. Set WLS_HOST and WLS_PORT or provide {}",
                path.display()
            ),
            ConfigError::Read { path, source } => write!(
                f,
                "Failed to read configuration file {}: {}",
                path.display(),
                source
            ),
            ConfigError::InvalidPort(value) => write!(
                f,
                "Invalid port '{}': expected an integer between 1 and 65535",
                value
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            _ => None,
        }
    }
}

// Errors raised while loading the extraction plugin.
#[derive(Debug)]
pub enum LoadError {
    ModuleNotFound {
        path: PathBuf,
        source: libloading::Error,
    },
    SymbolNotFound {
        path: PathBuf,
        symbol: &'static str,
        source: libloading::Error,
    },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::ModuleNotFound { path, source } => {
                write!(f, "Plugin not found at {}: {}", path.display(), source)
            }
            LoadError::SymbolNotFound {
                path,
                symbol,
                source,
            } => write!(
                f,
                "Could not find {} function in plugin {}: {}",
                symbol,
                path.display(),
                source
            ),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::ModuleNotFound { source, .. } => Some(source),
            LoadError::SymbolNotFound { source, .. } => Some(source),
        }
    }
}

// Any failure that prevents the server from accepting connections.
// All of them terminate the process with exit code 1.
#[derive(Debug)]
pub enum StartupError {
    Config(ConfigError),
    Plugin(LoadError),
    Bind {
        host: String,
        port: u16,
        source: std::io::Error,
    },
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::Config(e) => write!(f, "{}", e),
            StartupError::Plugin(e) => write!(f, "{}", e),
            StartupError::Bind { host, port, source } => {
                write!(f, "Failed to bind to {}:{}: {}", host, port, source)
            }
        }
    }
}

impl std::error::Error for StartupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StartupError::Config(e) => Some(e),
            StartupError::Plugin(e) => Some(e),
            StartupError::Bind { source, .. } => Some(source),
        }
    }
}

impl From<ConfigError> for StartupError {
    fn from(err: ConfigError) -> Self {
        StartupError::Config(err)
    }
}

impl From<LoadError> for StartupError {
    fn from(err: LoadError) -> Self {
        StartupError::Plugin(err)
    }
}

// Errors raised while assembling a request from a connection.
#[derive(Debug)]
pub enum FrameError {
    Io(std::io::Error),
    // The peer closed the connection without sending a single byte.
    Empty,
    // The peer closed the connection before the end of the header block.
    IncompleteHeaders { received: usize },
    // The peer closed the connection before the declared body arrived.
    TruncatedBody { expected: usize, received: usize },
    MalformedContentLength(String),
    HeadersTooLarge { limit: usize },
    BodyTooLarge { declared: usize, limit: usize },
}

impl FrameError {
    // Maps a framing failure to the response sent back to the peer, if any.
    // Failures caused by the peer hanging up are not answered.
    pub fn into_response(self) -> Option<OutgoingResponse> {
        let message = match self {
            FrameError::MalformedContentLength(_) => "Invalid Content-Length",
            FrameError::HeadersTooLarge { .. } => "Request headers too large",
            FrameError::BodyTooLarge { .. } => "Request body too large",
            FrameError::Io(_)
            | FrameError::Empty
            | FrameError::IncompleteHeaders { .. }
            | FrameError::TruncatedBody { .. } => return None,
        };
        Some(OutgoingResponse::error(400, message))
    }
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::Io(e) => write!(f, "I/O error while reading request: {}", e),
            FrameError::Empty => write!(f, "connection closed before any data was received"),
            FrameError::IncompleteHeaders { received } => write!(
                f,
                "connection closed before the end of the headers ({} bytes received)",
                received
            ),
            FrameError::TruncatedBody { expected, received } => write!(
                f,
                "connection closed after {} of {} body bytes",
                received, expected
            ),
            FrameError::MalformedContentLength(value) => {
                write!(f, "malformed Content-Length value '{}'", value)
            }
            FrameError::HeadersTooLarge { limit } => {
                write!(f, "request headers exceed {} bytes", limit)
            }
            FrameError::BodyTooLarge { declared, limit } => write!(
                f,
                "declared body of {} bytes exceeds the limit of {} bytes",
                declared, limit
            ),
        }
    }
}

impl std::error::Error for FrameError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FrameError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FrameError {
    fn from(err: std::io::Error) -> Self {
        FrameError::Io(err)
    }
}
