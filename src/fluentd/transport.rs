//! Reconnect-capable socket transport
//!
//! One endpoint per exporter instance. The connection is established lazily,
//! torn down after every successful send (the synchronous forward protocol
//! keeps no long-lived connection), and re-established on the next send if
//! found stale.

use std::io::Write;
use std::net::{TcpStream, UdpSocket};
#[cfg(unix)]
use std::os::unix::net::UnixStream;
#[cfg(unix)]
use std::path::PathBuf;

use tracing::{debug, warn};
use url::Url;

use crate::config::FluentdConfig;
use crate::error::{FluentdConfigError, FluentdTransportError};

/// Parsed endpoint: protocol family plus remote address.
#[derive(Debug, Clone)]
enum Endpoint {
    Tcp { host: String, port: u16 },
    Udp { host: String, port: u16 },
    #[cfg(unix)]
    Unix { path: PathBuf },
}

/// A live socket.
#[derive(Debug)]
enum ActiveConnection {
    Tcp(TcpStream),
    Udp(UdpSocket),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl ActiveConnection {
    /// Probe the socket's pending error status without reading or writing.
    fn has_pending_error(&self) -> bool {
        let probed = match self {
            ActiveConnection::Tcp(stream) => stream.take_error(),
            ActiveConnection::Udp(socket) => socket.take_error(),
            #[cfg(unix)]
            ActiveConnection::Unix(stream) => stream.take_error(),
        };
        !matches!(probed, Ok(None))
    }

    /// Write the whole buffer. Success means all bytes were accepted.
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        match self {
            ActiveConnection::Tcp(stream) => {
                stream.write_all(buf)?;
                stream.flush()
            }
            ActiveConnection::Udp(socket) => {
                let sent = socket.send(buf)?;
                if sent == buf.len() {
                    Ok(())
                } else {
                    Err(std::io::Error::new(
                        std::io::ErrorKind::WriteZero,
                        "datagram truncated",
                    ))
                }
            }
            #[cfg(unix)]
            ActiveConnection::Unix(stream) => {
                stream.write_all(buf)?;
                stream.flush()
            }
        }
    }
}

/// Connection lifecycle: sockets cycle between these two states. Dropping
/// the `Connected` state closes the socket handle.
#[derive(Debug, Default)]
enum ConnectionState {
    #[default]
    Disconnected,
    Connected(ActiveConnection),
}

/// Delivery counters, reported at shutdown and used by tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct TransportStats {
    /// Connection attempts, successful or not
    pub connect_attempts: usize,
    /// Packets fully written
    pub successful_sends: usize,
    /// Packets dropped after exhausting retries
    pub failed_sends: usize,
}

/// Blocking socket transport with bounded retry.
#[derive(Debug)]
pub struct SocketTransport {
    endpoint: Endpoint,
    endpoint_display: String,
    retry_count: usize,
    state: ConnectionState,
    stats: TransportStats,
}

impl SocketTransport {
    /// Parse the configured endpoint and resolve its socket family. An
    /// unknown scheme fails construction; the endpoint is a startup-time
    /// precondition, not a per-call recoverable error.
    pub fn new(config: &FluentdConfig) -> Result<Self, FluentdConfigError> {
        let url = Url::parse(&config.endpoint).map_err(|e| {
            FluentdConfigError::InvalidEndpoint(format!("{}: {}", config.endpoint, e))
        })?;

        let endpoint = match url.scheme() {
            "tcp" | "udp" => {
                let host = url
                    .host_str()
                    .ok_or_else(|| {
                        FluentdConfigError::InvalidEndpoint(format!(
                            "{} is missing a host",
                            config.endpoint
                        ))
                    })?
                    .to_string();
                let port = url.port().ok_or_else(|| {
                    FluentdConfigError::InvalidEndpoint(format!(
                        "{} is missing a port",
                        config.endpoint
                    ))
                })?;
                if url.scheme() == "tcp" {
                    Endpoint::Tcp { host, port }
                } else {
                    Endpoint::Udp { host, port }
                }
            }
            "unix" => {
                #[cfg(unix)]
                {
                    Endpoint::Unix {
                        path: PathBuf::from(url.path()),
                    }
                }
                #[cfg(not(unix))]
                {
                    return Err(FluentdConfigError::UnsupportedScheme(
                        "unix domain sockets are not supported on this platform".to_string(),
                    ));
                }
            }
            other => return Err(FluentdConfigError::UnsupportedScheme(other.to_string())),
        };

        debug!(endpoint = %config.endpoint, "transport initialized");

        Ok(Self {
            endpoint,
            endpoint_display: config.endpoint.clone(),
            retry_count: config.retry_count,
            state: ConnectionState::Disconnected,
            stats: TransportStats::default(),
        })
    }

    /// The configured endpoint, for diagnostics.
    pub fn endpoint(&self) -> &str {
        &self.endpoint_display
    }

    /// Delivery counters so far.
    pub fn stats(&self) -> TransportStats {
        self.stats
    }

    /// Whether a socket is currently held open.
    pub fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected(_))
    }

    /// Open a socket if none is held. Does not retry.
    fn connect(&mut self) -> Result<(), FluentdTransportError> {
        if self.is_connected() {
            return Ok(());
        }
        self.stats.connect_attempts += 1;

        let connection = match &self.endpoint {
            Endpoint::Tcp { host, port } => {
                TcpStream::connect((host.as_str(), *port)).map(ActiveConnection::Tcp)
            }
            Endpoint::Udp { host, port } => UdpSocket::bind("0.0.0.0:0").and_then(|socket| {
                socket.connect((host.as_str(), *port))?;
                Ok(ActiveConnection::Udp(socket))
            }),
            #[cfg(unix)]
            Endpoint::Unix { path } => UnixStream::connect(path).map(ActiveConnection::Unix),
        }
        .map_err(|source| {
            warn!(endpoint = %self.endpoint_display, error = %source, "unable to connect");
            FluentdTransportError::ConnectFailed {
                endpoint: self.endpoint_display.clone(),
                source,
            }
        })?;

        self.state = ConnectionState::Connected(connection);
        Ok(())
    }

    /// Close the socket handle if one is held. Idempotent.
    pub fn disconnect(&mut self) {
        self.state = ConnectionState::Disconnected;
    }

    /// Deliver one packet, reconnecting and retrying up to the configured
    /// attempt count. The packet is one delivery unit; there is no partial
    /// success.
    pub fn send(&mut self, packet: &[u8]) -> Result<(), FluentdTransportError> {
        let mut remaining = self.retry_count;
        while remaining > 0 {
            remaining -= 1;

            // A socket left open from a previous round may have failed since.
            if let ConnectionState::Connected(connection) = &self.state {
                if connection.has_pending_error() {
                    self.disconnect();
                }
            }

            if !self.is_connected() {
                // Establishing the connection may take time; a failure
                // consumes this attempt.
                if self.connect().is_err() {
                    continue;
                }
                debug!("socket connected");
            }

            let write_result = match &mut self.state {
                ConnectionState::Connected(connection) => connection.write_all(packet),
                ConnectionState::Disconnected => unreachable!("connected above"),
            };

            match write_result {
                Ok(()) => {
                    debug!(bytes = packet.len(), "send successful");
                    self.disconnect();
                    self.stats.successful_sends += 1;
                    return Ok(());
                }
                Err(e) => {
                    warn!(error = %e, remaining, "send failed, retrying");
                    self.disconnect();
                }
            }
        }

        warn!(endpoint = %self.endpoint_display, "send failed, retries exhausted");
        self.stats.failed_sends += 1;
        Err(FluentdTransportError::RetriesExhausted {
            attempts: self.retry_count,
        })
    }
}
