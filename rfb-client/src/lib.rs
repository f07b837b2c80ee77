//! Async RFB automation client.
//!
//! This crate drives a remote desktop over the RFB protocol, one
//! short-lived connection per call: capture the screen, move and click the
//! pointer, type keys, or run a batch of actions. It builds on the
//! low-level `rfb-protocol`, `rfb-pixelbuffer` and `rfb-encodings` crates.
//!
//! # Quick Start
//!
//! ```no_run
//! use rfb_client::{run_operation, Config, Operation, OperationOutcome};
//! use anyhow::Result;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::builder()
//!         .host("localhost")
//!         .port(5900)
//!         .password("secret")
//!         .build()?;
//!
//!     let click = Operation::Click {
//!         x: 683,
//!         y: 384,
//!         button: 1,
//!         source_width: 1366,
//!         source_height: 768,
//!     };
//!     if let OperationOutcome::Pointer { x, y, .. } = run_operation(&config, &click).await? {
//!         println!("clicked at {x},{y}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`transport`]: one TCP stream with a timeout on every read and write
//! - [`session`]: handshake, security, init, capture and raw input PDUs
//! - [`input`]: clicks, drags, scrolls, text and key combinations
//! - [`scaling`]: caller reference resolution to remote pixels
//! - [`batch`]: ordered actions with abort-on-first-failure
//! - [`operations`]: the closed set of calls the dispatch layer can make
//!
//! # Error Handling
//!
//! Every failure is an [`RfbClientError`]; [`RfbClientError::kind`] gives
//! the coarse category callers match on. Nothing here retries. A failed
//! connect, handshake or authentication is reported once and the transport
//! is closed before the error is returned.
//!
//! # Safety
//!
//! This crate is `#![forbid(unsafe_code)]` and uses only safe Rust.

#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod batch;
pub mod config;
pub mod errors;
pub mod framebuffer;
pub mod input;
pub mod keymap;
pub mod operations;
pub mod scaling;
pub mod session;
pub mod transport;

mod protocol;
mod protocol_trace;

// Optional CLI support
#[cfg(feature = "cli")]
pub mod args;

pub use batch::{execute_batch, Action, ActionOutcome, BatchResult};
pub use config::{Config, EncryptionPreference};
pub use errors::{ErrorKind, RfbClientError};
pub use input::{ButtonMask, InputInjector, MouseButton, ScrollDirection};
pub use keymap::KeyCombination;
pub use operations::{
    encode_png, run_operation, spawn_operation, Operation, OperationHandle, OperationOutcome,
};
pub use rfb_common::{ScreenGeometry, SourceResolution};
pub use scaling::CoordinateScaler;
pub use session::Session;
