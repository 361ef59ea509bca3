//! Control protocol transport
//!
//! One bincode-encoded [`ControlPacket`] per UDP datagram. Sockets are bound
//! with std first, so bind errors surface on the caller's thread, then handed
//! to the tokio runtime of the thread that services them.

use crate::error::{BridgeError, Result};
use crate::protocol::ControlPacket;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;

/// Largest payload a UDP datagram can carry.
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// How often socket loops wake up to check their running flag.
pub const RECV_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Bind a non-blocking std socket ready to be converted with [`ControlSocket::from_std`].
pub fn bind_std(addr: SocketAddr) -> Result<std::net::UdpSocket> {
    let socket = std::net::UdpSocket::bind(addr)?;
    socket.set_nonblocking(true)?;
    Ok(socket)
}

pub struct ControlSocket {
    socket: UdpSocket,
    buf: Vec<u8>,
}

impl ControlSocket {
    /// Must be called from within a tokio runtime.
    pub fn from_std(socket: std::net::UdpSocket) -> Result<Self> {
        Ok(Self {
            socket: UdpSocket::from_std(socket)?,
            buf: vec![0u8; MAX_DATAGRAM_SIZE],
        })
    }

    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        Ok(Self {
            socket: UdpSocket::bind(addr).await?,
            buf: vec![0u8; MAX_DATAGRAM_SIZE],
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub async fn send_packet(&self, addr: SocketAddr, packet: &ControlPacket) -> Result<()> {
        let data = packet.encode()?;
        if data.len() > MAX_DATAGRAM_SIZE {
            return Err(BridgeError::ProtocolError(format!(
                "packet for {} exceeds datagram size ({} bytes)",
                packet.path,
                data.len()
            )));
        }
        self.socket.send_to(&data, addr).await?;
        Ok(())
    }

    pub async fn recv_packet(&mut self) -> Result<(ControlPacket, SocketAddr)> {
        let (len, from) = self.socket.recv_from(&mut self.buf).await?;
        let packet = ControlPacket::decode(&self.buf[..len])?;
        Ok((packet, from))
    }

    /// Receive with a deadline. `Ok(None)` means nothing arrived in time.
    pub async fn recv_packet_timeout(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<(ControlPacket, SocketAddr)>> {
        match tokio::time::timeout(timeout, self.recv_packet()).await {
            Ok(result) => result.map(Some),
            Err(_) => Ok(None),
        }
    }
}

/// Current-thread runtime for a dedicated socket thread.
pub fn socket_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
