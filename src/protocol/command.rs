//! Command encoding
//!
//! Every command is a short UTF-8 text line sent verbatim as one datagram.
//! The device answers each command with at most one datagram.

use std::fmt;

/// A command understood by the wallbox
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Identity/firmware query
    Info,
    /// Structured status report query
    Report(u32),
    /// Set the charging current limit (mA), applied after a delay (s)
    CurrTime { current_ma: u32, delay_s: u32 },
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Info => f.write_str("i"),
            Command::Report(n) => write!(f, "report {}", n),
            Command::CurrTime {
                current_ma,
                delay_s,
            } => write!(f, "currtime {} {}", current_ma, delay_s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_encoding() {
        assert_eq!(Command::Info.to_string(), "i");
    }

    #[test]
    fn test_report_encoding() {
        assert_eq!(Command::Report(2).to_string(), "report 2");
        assert_eq!(Command::Report(101).to_string(), "report 101");
    }

    #[test]
    fn test_currtime_encoding() {
        let cmd = Command::CurrTime {
            current_ma: 6000,
            delay_s: 0,
        };
        assert_eq!(cmd.to_string(), "currtime 6000 0");

        let cmd = Command::CurrTime {
            current_ma: 0,
            delay_s: 860_400,
        };
        assert_eq!(cmd.to_string(), "currtime 0 860400");
    }
}
