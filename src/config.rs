// Resolves the server configuration: command line / environment first,
// then a local JSON configuration file.

use crate::error::ConfigError;
use clap::Parser;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_PLUGIN_PATH: &str = "./plugins/libextractor.so";
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Command line arguments for wls-server
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct ServerArgs {
    /// Hostname to bind the server to.
    /// "localhost" and "127.0.0.1" bind to the loopback interface, any other value binds to all interfaces.
    #[arg(long, env = "WLS_HOST")]
    pub host: Option<String>,

    /// Port number to listen on.
    /// Host and port must both be given for the command line / environment to take precedence over the config file.
    #[arg(short, long, env = "WLS_PORT")]
    pub port: Option<String>,

    /// Path to the shared library exporting `ExtractLanguage`.
    #[arg(long, env = "WLS_PLUGIN_PATH")]
    pub plugin_path: Option<PathBuf>,

    /// JSON configuration file used when host and port are not given.
    #[arg(long, env = "WLS_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Enable debug logging.
    #[arg(short, long, env = "WLS_VERBOSE", action = clap::ArgAction::SetTrue)]
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Environment,
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub plugin_path: PathBuf,
    pub source: ConfigSource,
}

impl ServerConfig {
    pub fn resolve(args: &ServerArgs) -> Result<Self, ConfigError> {
        if let (Some(host), Some(port)) = (&args.host, &args.port) {
            return Ok(ServerConfig {
                host: host.clone(),
                port: parse_port(port)?,
                plugin_path: args
                    .plugin_path
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_PLUGIN_PATH)),
                source: ConfigSource::Environment,
            });
        }

        tracing::debug!(
            "Host and port not set on the command line or environment, reading {}",
            args.config.display()
        );
        Self::from_file(&args.config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ConfigError::NotFound {
                path: path.to_path_buf(),
            },
            _ => ConfigError::Read {
                path: path.to_path_buf(),
                source: e,
            },
        })?;
        Self::from_json(&json, ConfigSource::File(path.to_path_buf()))
    }

    // Keys missing from the document keep their defaults.
    pub fn from_json(json: &str, source: ConfigSource) -> Result<Self, ConfigError> {
        let port = match scan_json_value(json, "port") {
            Some(port) => parse_port(port)?,
            None => DEFAULT_PORT,
        };
        Ok(ServerConfig {
            host: scan_json_value(json, "host")
                .unwrap_or(DEFAULT_HOST)
                .to_string(),
            port,
            plugin_path: PathBuf::from(
                scan_json_value(json, "pluginPath").unwrap_or(DEFAULT_PLUGIN_PATH),
            ),
            source,
        })
    }
}

fn parse_port(value: &str) -> Result<u16, ConfigError> {
    match value.trim().parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(ConfigError::InvalidPort(value.to_string())),
    }
}

// Tolerant lookup of a flat value in a JSON document. Finds `"key"`, skips to
// the following colon and returns either the quoted string or the bare token
// that ends at `,`, `}` or a newline. Escapes and nesting are not understood.
pub fn scan_json_value<'a>(json: &'a str, key: &str) -> Option<&'a str> {
    let quoted_key = format!("\"{}\"", key);
    let key_pos = json.find(&quoted_key)?;
    let after_key = &json[key_pos + quoted_key.len()..];
    let colon = after_key.find(':')?;
    let value = after_key[colon + 1..].trim_start();

    let token = if let Some(rest) = value.strip_prefix('"') {
        &rest[..rest.find('"')?]
    } else {
        let end = value.find([',', '}', '\n'])?;
        value[..end].trim_end()
    };

    if token.is_empty() { None } else { Some(token) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn write_temp_config(contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("wls-config-{}.json", Uuid::new_v4()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_scan_json_value_string_and_number() {
        let json = r#"{"host":"0.0.0.0","port":8080,"pluginPath":"/opt/ext.so"}"#;
        assert_eq!(scan_json_value(json, "host"), Some("0.0.0.0"));
        assert_eq!(scan_json_value(json, "port"), Some("8080"));
        assert_eq!(scan_json_value(json, "pluginPath"), Some("/opt/ext.so"));
        assert_eq!(scan_json_value(json, "missing"), None);
    }

    #[test]
    fn test_scan_json_value_tolerates_whitespace_and_newlines() {
        let json = "{\n  \"host\" :  \"example.org\",\n  \"port\": 9000\n}\n";
        assert_eq!(scan_json_value(json, "host"), Some("example.org"));
        assert_eq!(scan_json_value(json, "port"), Some("9000"));
    }

    #[test]
    fn test_scan_json_value_empty_value_is_absent() {
        assert_eq!(scan_json_value(r#"{"host":""}"#, "host"), None);
        assert_eq!(scan_json_value(r#"{"host":"unterminated}"#, "host"), None);
    }

    #[test]
    fn test_from_json_scenario_all_interfaces() {
        let json = r#"{"host":"0.0.0.0","port":8080,"pluginPath":"/opt/ext.so"}"#;
        let config = ServerConfig::from_json(json, ConfigSource::Environment).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.plugin_path, PathBuf::from("/opt/ext.so"));
    }

    #[test]
    fn test_from_json_missing_keys_use_defaults() {
        let config = ServerConfig::from_json("{}", ConfigSource::Environment).unwrap();
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.plugin_path, PathBuf::from(DEFAULT_PLUGIN_PATH));
    }

    #[test]
    fn test_from_json_quoted_port_is_accepted() {
        let config =
            ServerConfig::from_json(r#"{"port":"7000"}"#, ConfigSource::Environment).unwrap();
        assert_eq!(config.port, 7000);
    }

    #[test]
    fn test_from_json_invalid_port_is_rejected() {
        for json in [
            r#"{"port":0}"#,
            r#"{"port":70000}"#,
            r#"{"port":"http"}"#,
            r#"{"port":-1}"#,
        ] {
            let err = ServerConfig::from_json(json, ConfigSource::Environment).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidPort(_)), "{}", json);
        }
    }

    #[test]
    fn test_resolve_environment_takes_precedence_over_file() {
        let path = write_temp_config(r#"{"host":"0.0.0.0","port":8080}"#);
        let args = ServerArgs {
            host: Some("localhost".to_string()),
            port: Some("6000".to_string()),
            plugin_path: None,
            config: path.clone(),
            verbose: false,
        };

        let config = ServerConfig::resolve(&args).unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 6000);
        assert_eq!(config.plugin_path, PathBuf::from(DEFAULT_PLUGIN_PATH));
        assert_eq!(config.source, ConfigSource::Environment);

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_resolve_environment_plugin_path() {
        let args = ServerArgs {
            host: Some("127.0.0.1".to_string()),
            port: Some("5001".to_string()),
            plugin_path: Some(PathBuf::from("/tmp/libdetect.so")),
            config: PathBuf::from("does-not-exist.json"),
            verbose: false,
        };

        let config = ServerConfig::resolve(&args).unwrap();
        assert_eq!(config.plugin_path, PathBuf::from("/tmp/libdetect.so"));
    }

    #[test]
    fn test_resolve_host_without_port_falls_back_to_file() {
        let path = write_temp_config(r#"{"host":"0.0.0.0","port":8080,"pluginPath":"/opt/ext.so"}"#);
        let args = ServerArgs {
            host: Some("localhost".to_string()),
            port: None,
            plugin_path: Some(PathBuf::from("/ignored.so")),
            config: path.clone(),
            verbose: false,
        };

        let config = ServerConfig::resolve(&args).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.plugin_path, PathBuf::from("/opt/ext.so"));
        assert_eq!(config.source, ConfigSource::File(path.clone()));

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_resolve_without_any_source_is_not_found() {
        let missing = std::env::temp_dir().join(format!("wls-missing-{}.json", Uuid::new_v4()));
        let args = ServerArgs {
            config: missing,
            ..Default::default()
        };

        let err = ServerConfig::resolve(&args).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn test_resolve_invalid_environment_port() {
        let args = ServerArgs {
            host: Some("localhost".to_string()),
            port: Some("eighty".to_string()),
            ..Default::default()
        };

        let err = ServerConfig::resolve(&args).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort(ref v) if v == "eighty"));
    }

    #[test]
    fn test_args_parse_flags() {
        let args = ServerArgs::try_parse_from([
            "wls-server",
            "--host",
            "localhost",
            "--port",
            "5050",
            "--plugin-path",
            "/opt/ext.so",
            "--config",
            "other.json",
        ])
        .unwrap();
        assert_eq!(args.host.as_deref(), Some("localhost"));
        assert_eq!(args.port.as_deref(), Some("5050"));
        assert_eq!(args.plugin_path, Some(PathBuf::from("/opt/ext.so")));
        assert_eq!(args.config, PathBuf::from("other.json"));
    }
}
