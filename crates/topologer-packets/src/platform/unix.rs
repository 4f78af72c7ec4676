//! Unix packet I/O: a raw ICMPv4 socket for replies and a UDP socket for probes.

use crate::{Sink, Source, SourceSinkHandle};
use async_trait::async_trait;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::mem::MaybeUninit;
use std::net::{Ipv4Addr, SocketAddrV4};
use tokio::io::unix::AsyncFd;
use tokio::net::UdpSocket;
use tokio::time::Instant;
use topologer_core::TopologyError;
use tracing::{debug, trace};

/// Creates the listener and prober for one trace.
pub async fn new_source_sink() -> Result<SourceSinkHandle, TopologyError> {
    let source = IcmpListener::new()?;
    let sink = UdpProber::bind().await?;
    debug!(local_port = sink.local_port(), "Opened probe sockets");

    Ok(SourceSinkHandle {
        source: Box::new(source),
        sink: Box::new(sink),
    })
}

/// Raw ICMPv4 socket. Requires root or CAP_NET_RAW.
pub struct IcmpListener {
    socket: Option<AsyncFd<Socket>>,
    read_deadline: Option<Instant>,
}

impl IcmpListener {
    /// Creates a new non-blocking raw ICMP socket.
    pub fn new() -> Result<Self, TopologyError> {
        let socket =
            Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4)).map_err(|e| {
                match e.kind() {
                    io::ErrorKind::PermissionDenied => TopologyError::PermissionDenied(e),
                    _ => TopologyError::SocketCreation(e),
                }
            })?;
        socket
            .set_nonblocking(true)
            .map_err(TopologyError::SocketCreation)?;
        let socket = AsyncFd::new(socket).map_err(TopologyError::SocketCreation)?;

        Ok(Self {
            socket: Some(socket),
            read_deadline: None,
        })
    }
}

fn recv_from(socket: &Socket, buf: &mut [u8]) -> io::Result<(usize, Ipv4Addr)> {
    // SAFETY: recv_from only writes initialised bytes, and any bit pattern is a valid u8.
    let uninit = unsafe { &mut *(buf as *mut [u8] as *mut [MaybeUninit<u8>]) };
    let (n, addr) = socket.recv_from(uninit)?;
    let sender = addr
        .as_socket_ipv4()
        .map(|addr| *addr.ip())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "non-IPv4 sender"))?;
    Ok((n, sender))
}

#[async_trait]
impl Source for IcmpListener {
    fn set_read_deadline(&mut self, deadline: Instant) {
        self.read_deadline = Some(deadline);
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<(usize, Ipv4Addr), TopologyError> {
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| TopologyError::Internal("ICMP listener is closed".to_string()))?;

        loop {
            let ready = match self.read_deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, socket.readable())
                    .await
                    .map_err(|_| TopologyError::ReadTimeout)?,
                None => socket.readable().await,
            };
            let mut guard = ready.map_err(TopologyError::ReceiveFailed)?;

            match guard.try_io(|inner| recv_from(inner.get_ref(), &mut *buf)) {
                Ok(Ok((n, sender))) => {
                    trace!(bytes = n, sender = %sender, "Read ICMP packet");
                    return Ok((n, sender));
                }
                Ok(Err(e)) if e.kind() == io::ErrorKind::Interrupted => continue,
                Ok(Err(e)) => return Err(TopologyError::ReceiveFailed(e)),
                Err(_would_block) => continue,
            }
        }
    }

    async fn close(&mut self) -> Result<(), TopologyError> {
        // Socket is closed when dropped
        self.socket.take();
        Ok(())
    }
}

/// UDP socket bound to an ephemeral local port.
pub struct UdpProber {
    socket: Option<UdpSocket>,
    local_port: u16,
}

impl UdpProber {
    /// Binds to `0.0.0.0:0`.
    pub async fn bind() -> Result<Self, TopologyError> {
        let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0))
            .await
            .map_err(TopologyError::SocketCreation)?;
        let local_port = socket
            .local_addr()
            .map_err(TopologyError::SocketCreation)?
            .port();

        Ok(Self {
            socket: Some(socket),
            local_port,
        })
    }
}

#[async_trait]
impl Sink for UdpProber {
    async fn send_to(
        &mut self,
        payload: &[u8],
        addr: SocketAddrV4,
        ttl: u8,
    ) -> Result<(), TopologyError> {
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| TopologyError::Internal("UDP prober is closed".to_string()))?;

        socket
            .set_ttl(u32::from(ttl))
            .map_err(|source| TopologyError::ProbeSend { ttl, source })?;
        socket
            .send_to(payload, addr)
            .await
            .map_err(|source| TopologyError::ProbeSend { ttl, source })?;

        Ok(())
    }

    fn local_port(&self) -> u16 {
        self.local_port
    }

    async fn close(&mut self) -> Result<(), TopologyError> {
        self.socket.take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_prober_binds_ephemeral_port() {
        let mut prober = UdpProber::bind().await.unwrap();
        assert_ne!(prober.local_port(), 0);

        prober.close().await.unwrap();
        let err = prober
            .send_to(&[], SocketAddrV4::new(Ipv4Addr::LOCALHOST, 33435), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, TopologyError::Internal(_)));
    }

    #[tokio::test]
    async fn test_prober_sends_with_ttl() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = match receiver.local_addr().unwrap() {
            std::net::SocketAddr::V4(addr) => addr,
            other => panic!("unexpected address {other}"),
        };

        let mut prober = UdpProber::bind().await.unwrap();
        prober.send_to(b"probe", addr, 4).await.unwrap();

        let mut buf = [0u8; 16];
        let (n, from) = receiver.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"probe");
        assert_eq!(from.port(), prober.local_port());
    }

    #[tokio::test]
    async fn test_listener_creation_reports_privileges() {
        match IcmpListener::new() {
            Ok(mut listener) => listener.close().await.unwrap(),
            Err(e) => assert!(
                matches!(
                    e,
                    TopologyError::PermissionDenied(_) | TopologyError::SocketCreation(_)
                ),
                "unexpected error {e}"
            ),
        }
    }
}
