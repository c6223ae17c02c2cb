//! Wallbox client
//!
//! Turns raw byte exchanges into validated protocol operations:
//! - Readiness probe on connect (info query plus reports 1-3)
//! - Report fetching with schema validation
//! - Charging current control with confirmation checking
//! - Bounded retry around every round-trip

use std::net::SocketAddr;

use bytes::Bytes;
use thiserror::Error;

use super::transport::UdpTransport;
use crate::protocol::{
    Command, Report, ReportError, ReportKind, CONFIRMATION_MESSAGE, DEFAULT_RETRIES, LOCAL_PORT,
    MAX_CURRENT_MA, MAX_DELAY_S, MIN_CURRENT_MA,
};

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Already connected")]
    AlreadyConnected,

    #[error("Not connected")]
    NotConnected,

    #[error("Client is closed")]
    Closed,

    #[error("Invalid report number {0}, must be 1, 2, 3 or at least 100")]
    InvalidReportNumber(u32),

    #[error("Current must be 0 or between 6000 and 63000 mA, got {0}")]
    CurrentOutOfRange(u32),

    #[error("Delay must be between 0 and 860400 seconds, got {0}")]
    DelayOutOfRange(u32),

    #[error("Report {report} failed after {attempts} attempts: {source}")]
    ReportFailed {
        report: u32,
        attempts: u32,
        source: ReportError,
    },

    #[error("Command '{command}' rejected after {attempts} attempts, last reply: {last_reply:?}")]
    Rejected {
        command: String,
        attempts: u32,
        last_reply: Option<Bytes>,
    },

    #[error("No response to command '{0}'")]
    NoResponse(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Client lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Initial state, no socket yet
    Unconnected,
    /// Socket bound, readiness probe running
    Connecting,
    /// Readiness probe passed, protocol operations allowed
    Ready,
    /// Torn down, terminal
    Closed,
}

/// Client for one wallbox
///
/// All protocol operations are full synchronous round-trips on `&mut self`:
/// a call does not return before its send/wait cycle, including retries,
/// has completed. The socket is released when the client is dropped or
/// [`close`](WallboxClient::close)d, whichever comes first.
pub struct WallboxClient {
    /// Wallbox endpoint
    remote_addr: SocketAddr,
    /// Default extra attempts per operation
    retries: u32,
    /// Present from successful bind until close
    transport: Option<UdpTransport>,
    /// Lifecycle state
    state: ClientState,
}

impl WallboxClient {
    /// Create an unconnected client with the default retry budget
    pub fn new(remote_addr: SocketAddr) -> Self {
        Self::with_retries(remote_addr, DEFAULT_RETRIES)
    }

    /// Create an unconnected client with an explicit retry budget
    pub fn with_retries(remote_addr: SocketAddr, retries: u32) -> Self {
        Self {
            remote_addr,
            retries,
            transport: None,
            state: ClientState::Unconnected,
        }
    }

    /// Connect on the well-known local port and run the readiness probe
    pub async fn connect(&mut self) -> ClientResult<()> {
        self.connect_on(LOCAL_PORT).await
    }

    /// Connect binding an explicit local port (tests pass 0)
    ///
    /// Binds the local endpoint, associates the socket with the wallbox and
    /// probes readiness: the info query followed by reports 1, 2 and 3,
    /// results discarded. Any probe failure is fatal; the socket is
    /// released and the client ends up `Closed`.
    pub async fn connect_on(&mut self, local_port: u16) -> ClientResult<()> {
        match self.state {
            ClientState::Unconnected => {}
            ClientState::Closed => return Err(ClientError::Closed),
            _ => return Err(ClientError::AlreadyConnected),
        }

        let transport = UdpTransport::bind(self.remote_addr, local_port).await?;
        tracing::info!(
            remote = %self.remote_addr,
            local = %transport.local_addr()?,
            "Connected to wallbox"
        );
        self.transport = Some(transport);
        self.state = ClientState::Connecting;

        if let Err(e) = self.connection_buildup().await {
            tracing::error!(%e, "Connection buildup failed");
            self.transport = None;
            self.state = ClientState::Closed;
            return Err(e);
        }

        self.state = ClientState::Ready;
        Ok(())
    }

    /// Readiness probe run once after the socket comes up
    ///
    /// The info reply is not checked; the reports go through the normal
    /// validation and retry machinery, so a device that cannot produce its
    /// three base reports fails the connect.
    async fn connection_buildup(&mut self) -> ClientResult<()> {
        self.exchange(Command::Info).await?;
        for n in 1..=3 {
            self.fetch_report(n, self.retries).await?;
        }
        Ok(())
    }

    /// Get the current lifecycle state
    pub fn state(&self) -> ClientState {
        self.state
    }

    /// Get the wallbox endpoint
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Check whether protocol operations are allowed
    pub fn is_ready(&self) -> bool {
        self.state == ClientState::Ready
    }

    /// Query the identity text the device answers to the info command
    pub async fn device_info(&mut self) -> ClientResult<String> {
        self.require_ready()?;
        match self.exchange(Command::Info).await? {
            Some(raw) => Ok(String::from_utf8_lossy(&raw).into_owned()),
            None => Err(ClientError::NoResponse(Command::Info.to_string())),
        }
    }

    /// Fetch and validate a report with the default retry budget
    pub async fn get_report(&mut self, n: u32) -> ClientResult<Report> {
        let retries = self.retries;
        self.get_report_with_retries(n, retries).await
    }

    /// Fetch and validate a report with an explicit retry budget
    ///
    /// `retries` counts extra round-trips after a failed one, so 0 means
    /// exactly one attempt. A timeout, malformed JSON or a missing schema
    /// field all burn one attempt; exhausting the budget surfaces the last
    /// failure as [`ClientError::ReportFailed`].
    pub async fn get_report_with_retries(&mut self, n: u32, retries: u32) -> ClientResult<Report> {
        self.require_ready()?;
        self.fetch_report(n, retries).await
    }

    /// Set the charging current limit with the default retry budget
    ///
    /// `current_ma` is the limit in milliamps, 0 disables the current
    /// timer. `delay_s` defers the change by up to ten days; `None` means
    /// immediately.
    pub async fn set_charging_current(
        &mut self,
        current_ma: u32,
        delay_s: Option<u32>,
    ) -> ClientResult<()> {
        let retries = self.retries;
        self.set_charging_current_with_retries(current_ma, delay_s, retries)
            .await
    }

    /// Set the charging current limit with an explicit retry budget
    ///
    /// Range violations are caller bugs: they fail before any datagram is
    /// sent and are never retried. The device must answer with the exact
    /// confirmation bytes; any other reply, including silence, burns one
    /// attempt.
    pub async fn set_charging_current_with_retries(
        &mut self,
        current_ma: u32,
        delay_s: Option<u32>,
        retries: u32,
    ) -> ClientResult<()> {
        self.require_ready()?;

        let delay_s = delay_s.unwrap_or(0);
        if current_ma != 0 && !(MIN_CURRENT_MA..=MAX_CURRENT_MA).contains(&current_ma) {
            return Err(ClientError::CurrentOutOfRange(current_ma));
        }
        if delay_s > MAX_DELAY_S {
            return Err(ClientError::DelayOutOfRange(delay_s));
        }

        let command = Command::CurrTime {
            current_ma,
            delay_s,
        };
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let reply = self.exchange(command).await?;
            match reply {
                Some(ref raw) if raw.as_ref() == CONFIRMATION_MESSAGE => {
                    tracing::info!(current_ma, delay_s, "Current command accepted");
                    return Ok(());
                }
                reply if attempt <= retries => {
                    tracing::warn!(
                        %command,
                        attempt,
                        ?reply,
                        "Retrying current command, invalid response"
                    );
                }
                reply => {
                    return Err(ClientError::Rejected {
                        command: command.to_string(),
                        attempts: attempt,
                        last_reply: reply,
                    });
                }
            }
        }
    }

    /// Release the socket and make the client unusable
    ///
    /// Idempotent; dropping the client without calling this releases the
    /// socket just the same.
    pub fn close(&mut self) {
        if self.state != ClientState::Closed {
            tracing::debug!(remote = %self.remote_addr, "Closing wallbox client");
            self.transport = None;
            self.state = ClientState::Closed;
        }
    }

    /// Report round-trip with the bounded retry loop
    ///
    /// Runs without the `Ready` guard so the readiness probe can use it
    /// while the client is still `Connecting`.
    async fn fetch_report(&mut self, n: u32, retries: u32) -> ClientResult<Report> {
        let kind = ReportKind::from_number(n).ok_or(ClientError::InvalidReportNumber(n))?;
        let command = Command::Report(n);

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.try_report(command, n, kind).await? {
                Ok(report) => return Ok(report),
                Err(err) if attempt <= retries => {
                    tracing::warn!(report = n, attempt, %err, "Retrying report, invalid response");
                }
                Err(err) => {
                    return Err(ClientError::ReportFailed {
                        report: n,
                        attempts: attempt,
                        source: err,
                    });
                }
            }
        }
    }

    /// One report attempt: round-trip, decode, schema check
    ///
    /// The outer `Result` carries hard transport faults that end the
    /// operation at once; the inner one carries the transient failures the
    /// retry loop consumes. A timeout is transient: silence and garbage
    /// are indistinguishable to the caller.
    async fn try_report(
        &mut self,
        command: Command,
        n: u32,
        kind: ReportKind,
    ) -> ClientResult<Result<Report, ReportError>> {
        match self.exchange(command).await? {
            Some(raw) => Ok(Report::parse(n, kind, &raw)),
            None => Ok(Err(ReportError::NoResponse)),
        }
    }

    /// One raw round-trip through the transport; `None` means timeout
    async fn exchange(&mut self, command: Command) -> ClientResult<Option<Bytes>> {
        let transport = self.transport.as_mut().ok_or(ClientError::NotConnected)?;
        Ok(transport.exchange(&command.to_string()).await?)
    }

    fn require_ready(&self) -> ClientResult<()> {
        match self.state {
            ClientState::Ready => Ok(()),
            ClientState::Closed => Err(ClientError::Closed),
            _ => Err(ClientError::NotConnected),
        }
    }
}
