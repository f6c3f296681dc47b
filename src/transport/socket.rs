//! Datagram endpoint used for the timed UDP phase.
//!
//! Wraps a tokio `UdpSocket` together with a receive buffer sized to the
//! negotiated message.

use std::io;
use std::net::SocketAddr;

use tokio::net::UdpSocket;

/// Default receive buffer size (largest datagram we ever accept).
pub const DEFAULT_RECV_BUFFER_SIZE: usize = crate::core::MAX_DATAGRAM_SIZE;

/// A bound UDP socket with its own receive buffer.
#[derive(Debug)]
pub struct DatagramEndpoint {
    socket: UdpSocket,
    /// Sized to the negotiated message once the exchange starts.
    recv_buffer: Vec<u8>,
    port: u16,
}

impl DatagramEndpoint {
    /// Bind a new endpoint to the given address.
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Self::from_socket(socket)
    }

    /// Wrap an already bound socket.
    pub fn from_socket(socket: UdpSocket) -> io::Result<Self> {
        let port = socket.local_addr()?.port();
        Ok(Self {
            socket,
            recv_buffer: vec![0u8; DEFAULT_RECV_BUFFER_SIZE],
            port,
        })
    }

    /// Resize the receive buffer. Datagrams longer than this are truncated.
    pub fn set_recv_buffer_size(&mut self, size: usize) {
        self.recv_buffer.resize(size, 0);
    }

    /// Size of the receive buffer.
    pub fn recv_buffer_size(&self) -> usize {
        self.recv_buffer.len()
    }

    /// Locally bound port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Address the endpoint is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Connect to a remote address (for initiator sockets).
    pub async fn connect(&self, addr: SocketAddr) -> io::Result<()> {
        self.socket.connect(addr).await
    }

    /// Send one datagram to `addr`.
    pub async fn send_to(&self, data: &[u8], addr: SocketAddr) -> io::Result<usize> {
        self.socket.send_to(data, addr).await
    }

    /// Send one datagram to the connected peer.
    pub async fn send(&self, data: &[u8]) -> io::Result<usize> {
        self.socket.send(data).await
    }

    /// Receive a datagram into the internal buffer.
    ///
    /// Returns the received length and the sender's address; the bytes are
    /// available through [`DatagramEndpoint::recv_data`].
    pub async fn recv_from(&mut self) -> io::Result<(usize, SocketAddr)> {
        self.socket.recv_from(&mut self.recv_buffer).await
    }

    /// Receive a datagram from the connected address into the internal buffer.
    pub async fn recv(&mut self) -> io::Result<usize> {
        self.socket.recv(&mut self.recv_buffer).await
    }

    /// Get the received data after a successful `recv` or `recv_from`.
    pub fn recv_data(&self, len: usize) -> &[u8] {
        &self.recv_buffer[..len]
    }
}
