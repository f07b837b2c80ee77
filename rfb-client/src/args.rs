//! Command-line argument parsing for the automation CLI.
//!
//! This module is only available when the `cli` feature is enabled.
//! Connection settings come from a TOML file, environment variables and
//! flags, in increasing order of precedence. The subcommand selects the
//! [`Operation`].
//!
//! # Examples
//!
//! ```no_run
//! use rfb_client::args::Args;
//! use rfb_client::Config;
//!
//! let args = Args::parse();
//! let config = Config::from_args(&args)?;
//! let operation = args.command.operation()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::batch::Action;
use crate::config::{Config, EncryptionPreference};
use crate::errors::RfbClientError;
use crate::input::ScrollDirection;
use crate::operations::Operation;
use clap::{Parser, Subcommand};
use rfb_common::{DEFAULT_SOURCE_HEIGHT, DEFAULT_SOURCE_WIDTH};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// RFB automation command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// VNC server address (host, host:port or host:display)
    ///
    /// Examples:
    ///   - localhost
    ///   - 192.168.1.100:0 (display :0 = port 5900)
    ///   - vnc.example.com:5901
    #[arg(short = 'H', long, value_name = "SERVER", env = "VNC_HOST")]
    pub host: Option<String>,

    /// Server port (overrides port in SERVER if specified)
    #[arg(short = 'p', long, value_name = "PORT", env = "VNC_PORT")]
    pub port: Option<u16>,

    /// Password for VNC authentication
    #[arg(
        short = 'P',
        long,
        value_name = "PASSWORD",
        env = "VNC_PASSWORD",
        hide_env_values = true
    )]
    pub password: Option<String>,

    /// Security preference: disabled, prefer_on, prefer_off or always_on
    #[arg(short = 'e', long, value_name = "MODE", env = "VNC_ENCRYPTION")]
    pub encryption: Option<EncryptionPreference>,

    /// Connect/read/write timeout in milliseconds
    #[arg(short = 't', long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Ask the server to disconnect other viewers
    #[arg(long)]
    pub exclusive: bool,

    /// Configuration file path (TOML format)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Caller reference resolution for pointer subcommands.
#[derive(clap::Args, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceArgs {
    /// Width of the screen the coordinates refer to
    #[arg(long, default_value_t = DEFAULT_SOURCE_WIDTH, allow_negative_numbers = true)]
    pub source_width: i32,

    /// Height of the screen the coordinates refer to
    #[arg(long, default_value_t = DEFAULT_SOURCE_HEIGHT, allow_negative_numbers = true)]
    pub source_height: i32,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Capture the remote screen as PNG
    Capture {
        /// Where to write the PNG
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
    /// Move the pointer
    Move {
        #[arg(allow_negative_numbers = true)]
        x: i32,
        #[arg(allow_negative_numbers = true)]
        y: i32,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Click a mouse button
    Click {
        #[arg(allow_negative_numbers = true)]
        x: i32,
        #[arg(allow_negative_numbers = true)]
        y: i32,
        /// 1 = left, 2 = middle, 3 = right
        #[arg(short, long, default_value_t = 1)]
        button: u8,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Double-click a mouse button
    DoubleClick {
        #[arg(allow_negative_numbers = true)]
        x: i32,
        #[arg(allow_negative_numbers = true)]
        y: i32,
        /// 1 = left, 2 = middle, 3 = right
        #[arg(short, long, default_value_t = 1)]
        button: u8,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// One wheel tick
    Scroll {
        #[arg(allow_negative_numbers = true)]
        x: i32,
        #[arg(allow_negative_numbers = true)]
        y: i32,
        /// up or down
        #[arg(short, long, default_value = "down")]
        direction: ScrollDirection,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Type text, press a named key and/or a key combination
    Keys {
        #[arg(long)]
        text: Option<String>,
        /// e.g. enter, tab, escape, f5
        #[arg(long)]
        special_key: Option<String>,
        /// e.g. ctrl+c, cmd+q, ctrl+alt+delete
        #[arg(long)]
        combo: Option<String>,
    },
    /// Run a JSON list of actions over one connection
    Batch {
        /// JSON file holding the action array, or `-` for stdin
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[command(flatten)]
        source: SourceArgs,
    },
}

impl Args {
    /// Parse command-line arguments.
    #[must_use]
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Parse arguments from an iterator.
    ///
    /// # Errors
    ///
    /// Returns an error if the arguments are invalid.
    pub fn try_parse_from<I, T>(iter: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }
}

impl Command {
    /// The operation this subcommand requests. Batch files are read here.
    pub fn operation(&self) -> Result<Operation, RfbClientError> {
        let op = match self {
            Self::Capture { .. } => Operation::CaptureScreen,
            Self::Move { x, y, source } => Operation::Move {
                x: *x,
                y: *y,
                source_width: source.source_width,
                source_height: source.source_height,
            },
            Self::Click {
                x,
                y,
                button,
                source,
            } => Operation::Click {
                x: *x,
                y: *y,
                button: *button,
                source_width: source.source_width,
                source_height: source.source_height,
            },
            Self::DoubleClick {
                x,
                y,
                button,
                source,
            } => Operation::DoubleClick {
                x: *x,
                y: *y,
                button: *button,
                source_width: source.source_width,
                source_height: source.source_height,
            },
            Self::Scroll {
                x,
                y,
                direction,
                source,
            } => Operation::Scroll {
                x: *x,
                y: *y,
                direction: *direction,
                source_width: source.source_width,
                source_height: source.source_height,
            },
            Self::Keys {
                text,
                special_key,
                combo,
            } => Operation::SendKeys {
                text: text.clone(),
                special_key: special_key.clone(),
                key_combination: combo.clone(),
            },
            Self::Batch { file, source } => Operation::BatchActions {
                actions: read_actions(file)?,
                source_width: source.source_width,
                source_height: source.source_height,
            },
        };
        Ok(op)
    }
}

fn read_actions(path: &Path) -> Result<Vec<Action>, RfbClientError> {
    let content = if path == Path::new("-") {
        std::io::read_to_string(std::io::stdin())
    } else {
        std::fs::read_to_string(path)
    }
    .map_err(|e| RfbClientError::Action(format!("failed to read {}: {e}", path.display())))?;

    parse_actions(&content)
}

fn parse_actions(json: &str) -> Result<Vec<Action>, RfbClientError> {
    serde_json::from_str(json)
        .map_err(|e| RfbClientError::Action(format!("invalid action list: {e}")))
}

impl Config {
    /// Create a configuration from command-line arguments.
    ///
    /// If a config file is specified in the arguments, it will be loaded
    /// first, then overridden by explicit command-line arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config file cannot be read or parsed
    /// - The server address is invalid
    /// - The configuration validation fails
    pub fn from_args(args: &Args) -> Result<Self, RfbClientError> {
        let mut builder = match &args.config {
            Some(path) => Config::from_toml_file(path)?.into_builder(),
            None => Config::builder(),
        };

        if let Some(server) = &args.host {
            let (host, port) = parse_server_address(server)?;
            builder = builder.host(host);
            if let Some(port) = port {
                builder = builder.port(port);
            }
        }
        if let Some(port) = args.port {
            builder = builder.port(port);
        }
        if let Some(password) = &args.password {
            builder = builder.password(password.clone());
        }
        if let Some(encryption) = args.encryption {
            builder = builder.encryption(encryption);
        }
        if let Some(ms) = args.timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        if args.exclusive {
            builder = builder.shared(false);
        }

        builder.build()
    }
}

/// Parse server address in the format "host", "host:port" or "host:display".
///
/// VNC display numbers (0-99) are converted to port numbers (5900-5999).
/// Returns no port when none was given, so a file value can stand.
fn parse_server_address(server: &str) -> Result<(String, Option<u16>), RfbClientError> {
    let Some((host, port_or_display)) = server.rsplit_once(':') else {
        return Ok((server.to_string(), None));
    };
    let num = port_or_display.parse::<u16>().map_err(|_| {
        RfbClientError::Config(format!(
            "Invalid port or display number: {}",
            port_or_display
        ))
    })?;

    let port = if num < 100 {
        // Display number: :0 = 5900, :1 = 5901, etc.
        5900 + num
    } else {
        num
    };

    Ok((host.to_string(), Some(port)))
}
