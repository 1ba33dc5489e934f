//! Connection registrar.
//!
//! A single supervisor task owns the listening socket. While the match
//! has free slots each accepted connection goes through the `register`
//! handshake; once it is full every new connection is refused with
//! `register_nack{"game already full"}`. The supervisor keeps refusing
//! until the lobby is shut down, which drops the listener.

use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use ataxx_core::{
    AtaxxError, ClientMessage, CodecConfig, Color, Inbound, Player, ServerConnection,
    ServerMessage,
};

pub const NACK_INVALID_REGISTER: &str = "invalid register";
pub const NACK_USERNAME_EXISTS: &str = "username exists";
pub const NACK_GAME_FULL: &str = "game already full";
pub const NACK_REGISTER_TIMEOUT: &str = "registration timeout";

#[derive(Debug, Clone, Copy)]
pub struct LobbyConfig {
    /// Player slots in the match.
    pub capacity: usize,
    pub register_timeout: Duration,
    pub write_timeout: Duration,
    pub codec: CodecConfig,
}

/// Why a handshake did not produce a player.
#[derive(Debug, PartialEq, Eq)]
enum Refusal {
    /// Answer with `register_nack{reason}` and close.
    Nack(&'static str),
    /// The peer went away; nothing to answer.
    Gone,
}

/// Handle to the registration supervisor.
pub struct Lobby {
    registered: mpsc::Receiver<Player>,
    capacity: usize,
    cancel: CancellationToken,
    supervisor: JoinHandle<Result<(), AtaxxError>>,
}

impl Lobby {
    /// Start the supervisor on `listener`. Cancelling `parent` stops it too.
    pub fn spawn(listener: TcpListener, config: LobbyConfig, parent: &CancellationToken) -> Self {
        let (tx, registered) = mpsc::channel(config.capacity.max(1));
        let cancel = parent.child_token();
        let supervisor = tokio::spawn(supervise(listener, config, tx, cancel.clone()));
        Self {
            registered,
            capacity: config.capacity,
            cancel,
            supervisor,
        }
    }

    /// Wait until every slot holds a registered player, in registration order.
    ///
    /// Cancel-safe: players received before cancellation are kept in the
    /// channel only until the lobby is dropped.
    pub async fn accept_until_full(&mut self) -> Result<Vec<Player>, AtaxxError> {
        let mut players = Vec::with_capacity(self.capacity);
        while players.len() < self.capacity {
            match self.registered.recv().await {
                Some(player) => players.push(player),
                None => return Err(AtaxxError::ChannelClosed),
            }
        }
        Ok(players)
    }

    /// Stop the supervisor and close the listening socket.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        match self.supervisor.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("lobby supervisor stopped early: {e}"),
            Err(e) => warn!("lobby supervisor ended abnormally: {e}"),
        }
    }
}

// ── Supervisor ───────────────────────────────────────────────────

async fn supervise(
    listener: TcpListener,
    config: LobbyConfig,
    registered: mpsc::Sender<Player>,
    cancel: CancellationToken,
) -> Result<(), AtaxxError> {
    let mut names: Vec<String> = Vec::with_capacity(config.capacity);

    loop {
        let (stream, peer) = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("accept error: {e}");
                    continue;
                }
            },
        };

        let mut conn = match open(stream, config.codec) {
            Ok(conn) => conn,
            Err(e) => {
                warn!(%peer, "failed to set up connection: {e}");
                continue;
            }
        };

        if names.len() >= config.capacity {
            debug!(%peer, "match full, refusing");
            tokio::spawn(refuse(conn, NACK_GAME_FULL, config.write_timeout));
            continue;
        }

        // Handshakes run one at a time: a silent peer holds up the next
        // registrant for at most `register_timeout`.
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            outcome = handshake(&mut conn, &names, config.register_timeout) => outcome,
        };

        let username = match outcome {
            Ok(username) => username,
            Err(Refusal::Nack(reason)) => {
                info!(%peer, reason, "registration refused");
                refuse(conn, reason, config.write_timeout).await;
                continue;
            }
            Err(Refusal::Gone) => {
                debug!(%peer, "peer left before registering");
                continue;
            }
        };

        let color = Color::ALL[names.len() % Color::ALL.len()];
        let ack = tokio::time::timeout(config.write_timeout, conn.send(ServerMessage::RegisterAck))
            .await
            .unwrap_or(Err(AtaxxError::Timeout(config.write_timeout)));
        if let Err(e) = ack {
            warn!(%peer, %username, "failed to acknowledge registration: {e}");
            continue;
        }

        info!(%peer, %username, %color, "player registered");
        names.push(username.clone());
        registered
            .send(Player::new(username, color, Some(conn)))
            .await?;
    }

    debug!("lobby supervisor stopped");
    Ok(())
}

fn open(stream: TcpStream, codec: CodecConfig) -> Result<ServerConnection, AtaxxError> {
    ServerConnection::new(stream, codec)
}

/// Read one message and decide whether it claims a free slot.
async fn handshake(
    conn: &mut ServerConnection,
    taken: &[String],
    register_timeout: Duration,
) -> Result<String, Refusal> {
    let first = tokio::time::timeout(register_timeout, conn.recv())
        .await
        .map_err(|_| Refusal::Nack(NACK_REGISTER_TIMEOUT))?;

    match first {
        Inbound::Message(ClientMessage::Register { username }) => {
            if username.trim().is_empty() {
                Err(Refusal::Nack(NACK_INVALID_REGISTER))
            } else if taken.contains(&username) {
                Err(Refusal::Nack(NACK_USERNAME_EXISTS))
            } else {
                Ok(username)
            }
        }
        Inbound::Message(_) | Inbound::Malformed(_) => Err(Refusal::Nack(NACK_INVALID_REGISTER)),
        Inbound::Closed => Err(Refusal::Gone),
    }
}

/// Send `register_nack{reason}` and close, bounded by `write_timeout`.
async fn refuse(mut conn: ServerConnection, reason: &'static str, write_timeout: Duration) {
    let peer = conn.peer_addr();
    let sent = tokio::time::timeout(write_timeout, async move {
        let sent = conn.send(ServerMessage::nack(reason)).await;
        conn.close().await;
        sent
    })
    .await
    .unwrap_or(Err(AtaxxError::Timeout(write_timeout)));
    if let Err(e) = sent {
        debug!(%peer, "nack not delivered: {e}");
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ataxx_core::{ClientConnection, Connection, ConnectionInfo};

    async fn pair() -> (ServerConnection, ClientConnection) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let info = ConnectionInfo::from(listener.local_addr().unwrap());
        let client = tokio::spawn(async move {
            Connection::connect(&info, CodecConfig::default()).await.unwrap()
        });
        let (stream, _) = listener.accept().await.unwrap();
        (open(stream, CodecConfig::default()).unwrap(), client.await.unwrap())
    }

    #[tokio::test]
    async fn handshake_accepts_fresh_name() {
        let (mut server, mut client) = pair().await;
        client
            .send(ClientMessage::Register {
                username: "alice".into(),
            })
            .await
            .unwrap();
        let name = handshake(&mut server, &[], Duration::from_secs(5)).await;
        assert_eq!(name, Ok("alice".to_string()));
    }

    #[tokio::test]
    async fn handshake_refuses_taken_name() {
        let (mut server, mut client) = pair().await;
        client
            .send(ClientMessage::Register {
                username: "alice".into(),
            })
            .await
            .unwrap();
        let taken = vec!["alice".to_string()];
        let outcome = handshake(&mut server, &taken, Duration::from_secs(5)).await;
        assert_eq!(outcome, Err(Refusal::Nack(NACK_USERNAME_EXISTS)));
    }

    #[tokio::test]
    async fn handshake_refuses_blank_name_and_other_messages() {
        let (mut server, mut client) = pair().await;
        client
            .send(ClientMessage::Register {
                username: "   ".into(),
            })
            .await
            .unwrap();
        client.send(ClientMessage::Pass).await.unwrap();

        let first = handshake(&mut server, &[], Duration::from_secs(5)).await;
        assert_eq!(first, Err(Refusal::Nack(NACK_INVALID_REGISTER)));
        let second = handshake(&mut server, &[], Duration::from_secs(5)).await;
        assert_eq!(second, Err(Refusal::Nack(NACK_INVALID_REGISTER)));
    }

    #[tokio::test]
    async fn handshake_times_out() {
        let (mut server, _client) = pair().await;
        let outcome = handshake(&mut server, &[], Duration::from_millis(50)).await;
        assert_eq!(outcome, Err(Refusal::Nack(NACK_REGISTER_TIMEOUT)));
    }

    #[tokio::test]
    async fn handshake_notices_departure() {
        let (mut server, client) = pair().await;
        client.close().await;
        let outcome = handshake(&mut server, &[], Duration::from_secs(5)).await;
        assert_eq!(outcome, Err(Refusal::Gone));
    }
}
