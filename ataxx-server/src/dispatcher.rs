//! Outbound delivery to one or both players.
//!
//! Every board-bearing emission is rendered once, then written to each
//! recipient under a write deadline. A failed or timed-out write drops
//! that player's connection handle; the scheduler notices on its next
//! step and ends the match.

use std::time::Duration;

use tracing::{debug, warn};

use ataxx_core::{AtaxxError, NoopRenderer, Player, Renderer, ServerMessage};

pub struct Dispatcher {
    renderer: Box<dyn Renderer>,
    write_timeout: Duration,
}

impl Dispatcher {
    pub fn new(renderer: impl Renderer + 'static, write_timeout: Duration) -> Self {
        Self {
            renderer: Box::new(renderer),
            write_timeout,
        }
    }

    /// Deliver to a single player. Returns whether the write succeeded.
    pub async fn send_to(&self, player: &mut Player, message: &ServerMessage) -> bool {
        self.render(message);
        self.deliver(player, message).await
    }

    /// Deliver to every player that still has a connection.
    pub async fn broadcast(&self, players: &mut [Player], message: &ServerMessage) {
        self.render(message);
        for player in players.iter_mut().filter(|p| p.is_connected()) {
            self.deliver(player, message).await;
        }
    }

    /// Flush and close every remaining connection.
    pub async fn hang_up(&self, players: &mut [Player]) {
        for player in players.iter_mut() {
            if let Some(conn) = player.disconnect() {
                if tokio::time::timeout(self.write_timeout, conn.close())
                    .await
                    .is_err()
                {
                    debug!(player = player.name(), "close timed out");
                }
            }
        }
    }

    fn render(&self, message: &ServerMessage) {
        if let Some(board) = message.board() {
            self.renderer.render(board);
        }
    }

    async fn deliver(&self, player: &mut Player, message: &ServerMessage) -> bool {
        let kind = message.kind();
        let sent = tokio::time::timeout(self.write_timeout, player.send(message.clone()))
            .await
            .unwrap_or(Err(AtaxxError::Timeout(self.write_timeout)));
        match sent {
            Ok(()) => {
                debug!(player = player.name(), kind, "sent");
                true
            }
            Err(e) => {
                warn!(player = player.name(), kind, "write failed: {e}");
                player.disconnect();
                false
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(NoopRenderer, Duration::from_secs(5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use ataxx_core::{
        Board, ClientConnection, CodecConfig, Color, Connection, ConnectionInfo, Layout,
        ServerConnection,
    };
    use tokio::net::TcpListener;

    #[derive(Default, Clone)]
    struct CountingRenderer(Arc<AtomicUsize>);

    impl Renderer for CountingRenderer {
        fn render(&self, _board: &Board) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn detached() -> [Player; 2] {
        [
            Player::new("alice", Color::Red, None),
            Player::new("bob", Color::Blue, None),
        ]
    }

    #[tokio::test]
    async fn renders_once_per_board_emission() {
        let counter = CountingRenderer::default();
        let dispatcher = Dispatcher::new(counter.clone(), Duration::from_millis(100));
        let mut players = detached();

        let msg = ServerMessage::MoveOk {
            board: Board::with_layout(Layout::Center),
            next_player: "bob".into(),
        };
        dispatcher.broadcast(&mut players, &msg).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);

        dispatcher
            .broadcast(&mut players, &ServerMessage::RegisterAck)
            .await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn send_to_detached_player_fails() {
        let dispatcher = Dispatcher::default();
        let mut players = detached();
        let delivered = dispatcher
            .send_to(&mut players[0], &ServerMessage::RegisterAck)
            .await;
        assert!(!delivered);
    }

    /// A connected player whose peer holds the socket open but never reads.
    async fn stalled_player() -> (Player, ClientConnection) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let info = ConnectionInfo::from(listener.local_addr().unwrap());
        let client = tokio::spawn(async move {
            Connection::connect(&info, CodecConfig::default()).await.unwrap()
        });
        let (stream, _) = listener.accept().await.unwrap();
        let conn = ServerConnection::new(stream, CodecConfig::default()).unwrap();
        (
            Player::new("alice", Color::Red, Some(conn)),
            client.await.unwrap(),
        )
    }

    #[tokio::test]
    async fn write_timeout_disconnects_player() {
        let dispatcher = Dispatcher::new(NoopRenderer, Duration::from_millis(50));
        let (mut player, _peer) = stalled_player().await;
        let bulky = ServerMessage::nack("x".repeat(32 * 1024));

        // Fill the socket buffers until a write can no longer complete.
        let mut delivered = 0;
        while dispatcher.send_to(&mut player, &bulky).await {
            delivered += 1;
            assert!(delivered < 100_000, "socket never filled");
        }
        assert!(delivered > 0);
        assert!(!player.is_connected());
    }

    #[tokio::test]
    async fn write_to_departed_peer_disconnects_player() {
        let dispatcher = Dispatcher::new(NoopRenderer, Duration::from_secs(1));
        let (mut player, peer) = stalled_player().await;
        drop(peer);

        let bulky = ServerMessage::nack("x".repeat(32 * 1024));
        let mut attempts = 0;
        while dispatcher.send_to(&mut player, &bulky).await {
            attempts += 1;
            assert!(attempts < 1_000, "write to closed peer kept succeeding");
        }
        assert!(!player.is_connected());
    }
}
