//! Protocol module - the wallbox command/response vocabulary
//!
//! The wallbox speaks a plain-text protocol over UDP:
//! - Commands are newline-free UTF-8 text datagrams
//! - Report replies are JSON objects with a fixed field set per report
//! - Control replies are a fixed confirmation byte sequence

mod command;
mod report;

pub use command::*;
pub use report::*;

use std::time::Duration;

/// Default UDP port the wallbox listens on
pub const DEFAULT_PORT: u16 = 7090;

/// Well-known local UDP port; the device only talks to a client bound here
pub const LOCAL_PORT: u16 = 7090;

/// How long to wait for the reply to a single command
pub const RESPONSE_TIMEOUT: Duration = Duration::from_millis(200);

/// Maximum reply size; longer datagrams are truncated by the receive call
pub const MAX_RESPONSE_SIZE: usize = 512;

/// The only reply accepted for control commands
pub const CONFIRMATION_MESSAGE: &[u8] = b"TCH-OK :done\n";

/// Default number of extra round-trip attempts after a failed one
pub const DEFAULT_RETRIES: u32 = 10;

/// Smallest accepted charging current limit (mA); 0 is also allowed
pub const MIN_CURRENT_MA: u32 = 6000;

/// Largest accepted charging current limit (mA)
pub const MAX_CURRENT_MA: u32 = 63_000;

/// Largest accepted current-change delay (s), about ten days
pub const MAX_DELAY_S: u32 = 860_400;
