//! Command-line interface for mcp-sse-bridge.
//!
//! Uses lexopt for minimal binary size overhead (~34KB).

use std::ffi::OsString;
use std::net::IpAddr;
use std::path::PathBuf;

/// Command-line arguments.
///
/// Options left as `None` defer to the environment, the config file, or
/// built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Host address to bind to.
    pub host: Option<IpAddr>,
    /// Port to listen on.
    pub port: Option<u16>,
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Path that opens an event stream.
    pub stream_path: Option<String>,
    /// Base path for message posts.
    pub message_path: Option<String>,
    /// Seconds between keep-alive comments.
    pub keep_alive_secs: Option<u64>,
    /// Exit immediately on Ctrl-C instead of draining.
    pub no_graceful_shutdown: bool,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('H') | Long("host") => {
                let value: String = parser.value()?.parse()?;
                result.host = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("host", value))?,
                );
            }
            Short('p') | Long("port") => {
                let value: String = parser.value()?.parse()?;
                result.port = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("port", value))?,
                );
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Long("stream-path") => {
                result.stream_path = Some(parser.value()?.parse()?);
            }
            Long("message-path") => {
                result.message_path = Some(parser.value()?.parse()?);
            }
            Long("keep-alive") => {
                let value: String = parser.value()?.parse()?;
                result.keep_alive_secs = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("keep-alive", value))?,
                );
            }
            Long("no-graceful-shutdown") => {
                result.no_graceful_shutdown = true;
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Value(val) => {
                return Err(ArgsError::UnexpectedArgument(val.to_string_lossy().into()));
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"mcp-sse-bridge {version}
Session-routing bridge for MCP over SSE + HTTP POST

USAGE:
    mcp-sse-bridge [OPTIONS]

OPTIONS:
    -H, --host <ADDR>           Host address to bind [default: 127.0.0.1]
    -p, --port <PORT>           Port to listen on [default: 3000]
    -c, --config <FILE>         Path to configuration file (JSON)
    -l, --log-level <LVL>       Log level (error, warn, info, debug, trace)
        --stream-path <PATH>    Path that opens an event stream [default: /mcp]
        --message-path <PATH>   Base path for message posts [default: /mcp/message]
        --keep-alive <SECS>     Seconds between keep-alive comments [default: 15]
        --no-graceful-shutdown  Exit immediately on Ctrl-C
    -h, --help                  Print help
    -V, --version               Print version

ENVIRONMENT VARIABLES:
    MCP_BRIDGE_HOST         Host address (overrides config)
    MCP_BRIDGE_PORT         Port number (overrides config)
    MCP_BRIDGE_LOG_LEVEL    Log level (overrides config)
    RUST_LOG                Alternative log level setting

EXAMPLES:
    # Start with defaults (localhost:3000)
    mcp-sse-bridge

    # Listen on all interfaces
    mcp-sse-bridge -H 0.0.0.0 -p 8080

    # Start with config file
    mcp-sse-bridge -c /etc/mcp-sse-bridge/config.json
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("mcp-sse-bridge {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
    /// Unexpected positional argument.
    UnexpectedArgument(String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for --{}: '{}'", name, value)
            }
            Self::UnexpectedArgument(arg) => {
                write!(f, "unexpected argument: '{}'", arg)
            }
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(args: &[&str]) -> Vec<OsString> {
        std::iter::once("mcp-sse-bridge")
            .chain(args.iter().copied())
            .map(OsString::from)
            .collect()
    }

    #[test]
    fn test_default_args() {
        let result = parse_args_from(args(&[])).unwrap();
        assert!(result.host.is_none());
        assert!(result.port.is_none());
        assert!(!result.no_graceful_shutdown);
    }

    #[test]
    fn test_host_port() {
        let result = parse_args_from(args(&["-H", "0.0.0.0", "-p", "8080"])).unwrap();
        assert_eq!(result.host.unwrap().to_string(), "0.0.0.0");
        assert_eq!(result.port, Some(8080));
    }

    #[test]
    fn test_long_options() {
        let result =
            parse_args_from(args(&["--host", "192.168.1.1", "--port", "9000"])).unwrap();
        assert_eq!(result.host.unwrap().to_string(), "192.168.1.1");
        assert_eq!(result.port, Some(9000));
    }

    #[test]
    fn test_route_paths() {
        let result = parse_args_from(args(&[
            "--stream-path",
            "/sse",
            "--message-path",
            "/messages",
        ]))
        .unwrap();
        assert_eq!(result.stream_path.as_deref(), Some("/sse"));
        assert_eq!(result.message_path.as_deref(), Some("/messages"));
    }

    #[test]
    fn test_keep_alive() {
        let result = parse_args_from(args(&["--keep-alive", "30"])).unwrap();
        assert_eq!(result.keep_alive_secs, Some(30));

        assert!(parse_args_from(args(&["--keep-alive", "soon"])).is_err());
    }

    #[test]
    fn test_config_file() {
        let result = parse_args_from(args(&["-c", "/etc/config.json"])).unwrap();
        assert_eq!(result.config, Some(PathBuf::from("/etc/config.json")));
    }

    #[test]
    fn test_no_graceful_shutdown() {
        let result = parse_args_from(args(&["--no-graceful-shutdown"])).unwrap();
        assert!(result.no_graceful_shutdown);
    }

    #[test]
    fn test_help_flag() {
        let result = parse_args_from(args(&["-h"])).unwrap();
        assert!(result.help);

        let result = parse_args_from(args(&["--help"])).unwrap();
        assert!(result.help);
    }

    #[test]
    fn test_version_flag() {
        let result = parse_args_from(args(&["-V"])).unwrap();
        assert!(result.version);

        let result = parse_args_from(args(&["--version"])).unwrap();
        assert!(result.version);
    }

    #[test]
    fn test_log_level() {
        let result = parse_args_from(args(&["-l", "debug"])).unwrap();
        assert_eq!(result.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_invalid_port() {
        let result = parse_args_from(args(&["-p", "invalid"]));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_host() {
        let result = parse_args_from(args(&["-H", "not-an-ip"]));
        assert!(result.is_err());
    }

    #[test]
    fn test_unexpected_positional() {
        let result = parse_args_from(args(&["serve"]));
        assert!(matches!(result, Err(ArgsError::UnexpectedArgument(_))));
    }

    #[test]
    fn test_unknown_flag() {
        let result = parse_args_from(args(&["--api-key", "x"]));
        assert!(matches!(result, Err(ArgsError::Lexopt(_))));
    }
}
