use std::fmt;
use std::net::SocketAddr;

use futures::{SinkExt, StreamExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::debug;

use crate::codec::{CodecConfig, Frame, MessageCodec};
use crate::error::AtaxxError;
use crate::message::{ClientMessage, ServerMessage};

/// The server's view of a peer: reads client messages, writes server messages.
pub type ServerConnection = Connection<ClientMessage, ServerMessage>;

/// The client's view of the server.
pub type ClientConnection = Connection<ServerMessage, ClientMessage>;

/// What a single read produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound<M> {
    Message(M),
    /// A delimited frame that did not hold a valid message.
    Malformed(String),
    /// The peer closed the stream, or it failed.
    Closed,
}

/// A framed TCP connection to a single peer.
///
/// `recv` is cancel-safe: partially received frames stay buffered in the
/// codec, so it can sit inside a `tokio::select!`.
pub struct Connection<In, Out> {
    framed: Framed<TcpStream, MessageCodec<In, Out>>,
    peer: SocketAddr,
}

impl<In, Out> fmt::Debug for Connection<In, Out> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection").field("peer", &self.peer).finish()
    }
}

impl<In: DeserializeOwned, Out: Serialize> Connection<In, Out> {
    pub fn new(stream: TcpStream, codec: CodecConfig) -> Result<Self, AtaxxError> {
        let peer = stream.peer_addr()?;
        stream.set_nodelay(true)?;
        Ok(Self {
            framed: Framed::new(stream, MessageCodec::new(codec)),
            peer,
        })
    }

    pub async fn connect(conn_info: &ConnectionInfo, codec: CodecConfig) -> Result<Self, AtaxxError> {
        let stream = TcpStream::connect(conn_info.to_socket_string()).await?;
        Self::new(stream, codec)
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Encode and flush one message.
    pub async fn send(&mut self, message: Out) -> Result<(), AtaxxError> {
        self.framed.send(message).await
    }

    /// Wait for the next frame from the peer.
    pub async fn recv(&mut self) -> Inbound<In> {
        match self.framed.next().await {
            Some(Ok(Frame::Message(message))) => Inbound::Message(message),
            Some(Ok(Frame::Malformed(reason))) => Inbound::Malformed(reason),
            Some(Err(e)) => {
                debug!(peer = %self.peer, "read failed: {e}");
                Inbound::Closed
            }
            None => Inbound::Closed,
        }
    }

    /// Flush anything pending and shut down the write half.
    pub async fn close(mut self) {
        if let Err(e) = SinkExt::<Out>::close(&mut self.framed).await {
            debug!(peer = %self.peer, "close failed: {e}");
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    ip: String,
    port: u16,
}

impl ConnectionInfo {
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self {
            ip: ip.into(),
            port,
        }
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port`, bracketing IPv6 literals.
    pub fn to_socket_string(&self) -> String {
        if self.ip.contains(':') {
            format!("[{}]:{}", self.ip, self.port)
        } else {
            format!("{}:{}", self.ip, self.port)
        }
    }
}

impl fmt::Display for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_socket_string())
    }
}

impl From<SocketAddr> for ConnectionInfo {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr.port())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_string_formats() {
        assert_eq!(ConnectionInfo::new("127.0.0.1", 8080).to_socket_string(), "127.0.0.1:8080");
        assert_eq!(ConnectionInfo::new("::1", 9).to_string(), "[::1]:9");
    }

    #[test]
    fn from_socket_addr() {
        let addr: SocketAddr = "10.0.0.2:4321".parse().unwrap();
        let info = ConnectionInfo::from(addr);
        assert_eq!(info.ip(), "10.0.0.2");
        assert_eq!(info.port(), 4321);
    }
}
