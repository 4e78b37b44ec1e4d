use serde::{Deserialize, Serialize};
use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Send errors meaning the destination host is down or unreachable. Network
/// unreachable and would-block are not in the set and stay fatal.
#[cfg(unix)]
const HOST_DOWN_ERRNO: &[i32] = &[libc::EHOSTDOWN, libc::EHOSTUNREACH];
// WSAEHOSTDOWN, WSAEHOSTUNREACH
#[cfg(windows)]
const HOST_DOWN_ERRNO: &[i32] = &[10064, 10065];
#[cfg(not(any(unix, windows)))]
const HOST_DOWN_ERRNO: &[i32] = &[];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("cannot resolve destination {0}")]
    Resolve(String),
    #[error("cannot open socket: {0}")]
    Open(String),
    #[error("send to {destination} failed: {reason}")]
    SendFailed { destination: String, reason: String },
    #[error("transport to {0} is closed")]
    Closed(String),
}

/// Outcome of a single datagram send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportResult {
    Sent,
    /// Destination down or unreachable; the caller carries on.
    TransientFailure,
    /// The transport has been closed and the run must stop.
    FatalFailure(TransportError),
}

pub trait PacketSink {
    fn send(&mut self, packet: &[u8]) -> TransportResult;

    /// Makes the sink usable again after a fatal failure closed it, so the
    /// unblock directives still go out. Sinks that never close themselves
    /// keep the default.
    fn reopen(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Safe to call more than once.
    fn close(&mut self);
}

impl<T: PacketSink + ?Sized> PacketSink for &mut T {
    fn send(&mut self, packet: &[u8]) -> TransportResult {
        (**self).send(packet)
    }

    fn reopen(&mut self) -> Result<(), TransportError> {
        (**self).reopen()
    }

    fn close(&mut self) {
        (**self).close();
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TransportStats {
    pub datagrams_sent: u64,
    pub bytes_sent: u64,
    pub transient_failures: u64,
    pub reopens: u32,
}

/// Whether a send error means the target is merely unavailable right now.
pub fn is_transient(error: &io::Error) -> bool {
    error
        .raw_os_error()
        .is_some_and(|code| HOST_DOWN_ERRNO.contains(&code))
}

fn bind_for(destination: SocketAddr) -> Result<UdpSocket, TransportError> {
    let bind_addr = if destination.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
    UdpSocket::bind(bind_addr).map_err(|e| TransportError::Open(e.to_string()))
}

/// Best-effort datagram link to the unit under test.
#[derive(Debug)]
pub struct UdpTransport {
    socket: Option<UdpSocket>,
    destination: SocketAddr,
    stats: TransportStats,
}

impl UdpTransport {
    pub fn open(host: &str, port: u16) -> Result<Self, TransportError> {
        let target = format!("{}:{}", host, port);
        let destination = target
            .to_socket_addrs()
            .map_err(|e| TransportError::Resolve(format!("{}: {}", target, e)))?
            .next()
            .ok_or_else(|| TransportError::Resolve(target.clone()))?;

        let socket = bind_for(destination)?;
        debug!("UDP transport bound to {:?}, sending to {}", socket.local_addr().ok(), destination);

        Ok(Self {
            socket: Some(socket),
            destination,
            stats: TransportStats::default(),
        })
    }

    pub fn destination(&self) -> SocketAddr {
        self.destination
    }

    pub fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    pub fn stats(&self) -> &TransportStats {
        &self.stats
    }
}

impl PacketSink for UdpTransport {
    fn send(&mut self, packet: &[u8]) -> TransportResult {
        let Some(socket) = self.socket.as_ref() else {
            return TransportResult::FatalFailure(TransportError::Closed(self.destination.to_string()));
        };

        match socket.send_to(packet, self.destination) {
            Ok(sent) => {
                self.stats.datagrams_sent += 1;
                self.stats.bytes_sent += sent as u64;
                TransportResult::Sent
            }
            Err(e) if is_transient(&e) => {
                self.stats.transient_failures += 1;
                debug!("UDP: {} unavailable: {}", self.destination, e);
                TransportResult::TransientFailure
            }
            Err(e) => {
                warn!("UDP: send to {} failed, closing socket: {}", self.destination, e);
                self.close();
                TransportResult::FatalFailure(TransportError::SendFailed {
                    destination: self.destination.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    fn reopen(&mut self) -> Result<(), TransportError> {
        if self.is_open() {
            return Ok(());
        }
        let socket = bind_for(self.destination)?;
        self.socket = Some(socket);
        self.stats.reopens += 1;
        info!("UDP transport to {} reopened", self.destination);
        Ok(())
    }

    fn close(&mut self) {
        if self.socket.take().is_some() {
            debug!("UDP transport to {} closed", self.destination);
        }
    }
}
