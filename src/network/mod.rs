//! Network module - UDP communication with the wallbox
//!
//! Provides:
//! - Transport owning the connected UDP socket
//! - Client driving the command/response protocol with bounded retry

mod client;
mod transport;

pub use client::*;
pub use transport::*;

use std::net::SocketAddr;

/// Resolve a hostname to a socket address
pub async fn resolve_host(host: &str, port: u16) -> std::io::Result<SocketAddr> {
    use tokio::net::lookup_host;

    let addr_string = format!("{}:{}", host, port);
    let mut addrs = lookup_host(&addr_string).await?;

    addrs.next().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Could not resolve host: {}", host),
        )
    })
}
