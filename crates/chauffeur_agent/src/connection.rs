//! The connection manager: owns the WebSocket session, decodes inbound
//! messages, serializes outbound orders, and drives reconnect-with-backoff.
//!
//! Lifecycle: `Disconnected -> Connecting -> Connected (message loop)`,
//! falling back to `Disconnected` on any transport failure. On entering
//! the connected state a `join` request is sent; the server replies with
//! `setup` and the game is on.
//!
//! Concurrency: the mirrored world and the decision engine live behind one
//! mutex. `status` and `powerup-status` handling runs on a blocking task
//! that *tries* to take that mutex; if the previous message is still being
//! processed, the new one is dropped on the floor rather than queued. The
//! server's next update re-synchronizes whatever was missed; this trades
//! completeness for bounded latency, deliberately. The guard is released by
//! scope exit on every path, errors included.

use crate::brain::{Brain, CardPlay, MoveOrder, OrderSink, OrderVerb};
use crate::error::AgentError;
use crate::world::{update, PowerUpKey, World};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chauffeur_protocol::{
    encode_names, encode_path, CardAction, ClientMessage, PowerupStatusMessage, ServerMessage,
    StatusMessage,
};
use futures::{SinkExt, StreamExt};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Ignore the server's card resync while a play we just sent is still in
/// flight; past this window the server's snapshot wins.
const CARD_RESYNC_GRACE: Duration = Duration::from_secs(1);

/// Log a warning when a single message takes this long to handle.
const SLOW_TURN: Duration = Duration::from_millis(800);

/// Everything needed to join and keep a session.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// WebSocket URL, e.g. `ws://127.0.0.1:8080`.
    pub server_url: String,
    pub name: String,
    pub school: String,
    pub language: String,
    /// Raw 32x32 PNG bytes, base64-encoded into the join request.
    pub avatar: Option<Vec<u8>>,
    /// Delay before the second connection attempt.
    pub backoff_start: Duration,
    /// Added to the delay after every further failure, without cap.
    pub backoff_step: Duration,
}

/// The outbound half handed to the decision engine: encodes orders onto the
/// writer channel and remembers the last card play for the resync test.
#[derive(Debug, Default)]
pub struct OrderTx {
    tx: Option<mpsc::UnboundedSender<Message>>,
    last_card_played: Option<PowerUpKey>,
    last_card_sent: Option<Instant>,
}

impl OrderTx {
    fn send(&mut self, msg: ClientMessage) -> Result<(), AgentError> {
        let tx = self.tx.as_ref().ok_or(AgentError::Disconnected)?;
        tx.send(Message::Text(msg.encode().into()))
            .map_err(|_| AgentError::Disconnected)
    }

    /// Whether the server's card lists should be trusted over our own
    /// optimistic view. False only while a play of a *different* card is
    /// still within the grace window.
    fn trust_server_cards(&self, incoming: &PowerUpKey) -> bool {
        match (&self.last_card_played, self.last_card_sent) {
            (Some(key), Some(at)) => key == incoming || at.elapsed() > CARD_RESYNC_GRACE,
            _ => true,
        }
    }
}

impl OrderSink for OrderTx {
    fn send_order(&mut self, order: MoveOrder) -> Result<(), AgentError> {
        let path = (!order.path.is_empty()).then(|| encode_path(&order.path));
        let pick_up = (!order.pick_up.is_empty()).then(|| encode_names(&order.pick_up));
        let msg = match order.verb {
            OrderVerb::Ready => ClientMessage::Ready { path, pick_up },
            OrderVerb::Move => ClientMessage::Move { path, pick_up },
        };
        self.send(msg)
    }

    fn send_card(&mut self, play: CardPlay) -> Result<(), AgentError> {
        info!("requesting {:?} of {}", play.action, play.key());
        if play.action == CardAction::Play {
            self.last_card_played = Some(play.key());
            self.last_card_sent = Some(Instant::now());
        }
        self.send(ClientMessage::Order {
            action: play.action,
            card: play.card,
            company: play.company,
            passenger: play.passenger,
            player: play.player,
        })
    }
}

/// The mutable half of a running agent: the mirrored world (absent until
/// the first `setup`), the decision engine, and the outbound order sink.
#[derive(Debug)]
pub struct Session {
    pub world: Option<World>,
    pub brain: Brain,
    pub orders: OrderTx,
}

impl Session {
    pub fn new(brain: Brain) -> Self {
        Self {
            world: None,
            brain,
            orders: OrderTx::default(),
        }
    }
}

/// How a guarded message dispatch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Handled,
    /// The guard was busy; the message was dropped, state untouched.
    DroppedBusy,
    /// No setup yet; the message was discarded.
    NotReady,
    /// The handler failed; logged, loop unaffected.
    Failed,
}

/// The connection manager.
pub struct Client {
    config: ConnectConfig,
    session: Arc<Mutex<Session>>,
}

impl Client {
    pub fn new(config: ConnectConfig) -> Self {
        Self {
            config,
            session: Arc::new(Mutex::new(Session::new(Brain::new()))),
        }
    }

    /// Run forever: connect, play, reconnect on loss. Only the server's
    /// `exit` message ends the process.
    pub async fn run(&self) -> Result<(), AgentError> {
        loop {
            let ws = self.connect_with_backoff().await;
            match self.session_loop(ws).await {
                Ok(()) => warn!("connection closed by server"),
                Err(e) => warn!("connection lost: {e}"),
            }
        }
    }

    /// First attempt immediately, then sleep a strictly growing delay
    /// between failures until a session is established.
    async fn connect_with_backoff(&self) -> WsStream {
        let mut delay = self.config.backoff_start;
        loop {
            match connect_async(self.config.server_url.as_str()).await {
                Ok((ws, _response)) => {
                    info!("connected to {}", self.config.server_url);
                    return ws;
                }
                Err(e) => {
                    warn!(
                        "connection to {} failed: {e}; retrying in {:?}",
                        self.config.server_url, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay += self.config.backoff_step;
                }
            }
        }
    }

    async fn session_loop(&self, ws: WsStream) -> Result<(), AgentError> {
        let (mut sink, mut stream) = ws.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

        // the writer task owns the sink half; every outbound frame funnels
        // through the channel
        let writer = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let Err(e) = sink.send(msg).await {
                    warn!("send failed: {e}");
                    break;
                }
            }
        });

        lock_session(&self.session).orders.tx = Some(tx.clone());
        let result = match self.send_join(&tx) {
            Ok(()) => loop {
                match stream.next().await {
                    Some(Ok(Message::Text(text))) => self.dispatch(text.to_string()),
                    Some(Ok(Message::Close(_))) => break Ok(()),
                    Some(Ok(_)) => {} // ping/pong/binary: nothing for us
                    Some(Err(e)) => break Err(AgentError::Transport(e.to_string())),
                    None => break Err(AgentError::Transport("stream ended".to_string())),
                }
            },
            Err(e) => Err(e),
        };

        lock_session(&self.session).orders.tx = None;
        drop(tx);
        writer.abort();
        result
    }

    fn send_join(&self, tx: &mpsc::UnboundedSender<Message>) -> Result<(), AgentError> {
        let join = ClientMessage::Join {
            name: self.config.name.clone(),
            school: self.config.school.clone(),
            language: self.config.language.clone(),
            avatar: self.config.avatar.as_ref().map(|bytes| BASE64.encode(bytes)),
        };
        info!(
            "joining as {} ({})",
            self.config.name, self.config.school
        );
        tx.send(Message::Text(join.encode().into()))
            .map_err(|_| AgentError::Disconnected)
    }

    /// Decode a frame and route it by its root kind. Decode failures and
    /// handler failures are logged; only `exit` ends the process.
    fn dispatch(&self, text: String) {
        match ServerMessage::decode(&text) {
            Err(e) => warn!("bad message from server: {e}"),
            Ok(ServerMessage::Setup(setup)) => {
                info!("received setup message");
                let mut session = lock_session(&self.session);
                let Session { world, brain, orders } = &mut *session;
                match World::from_setup(&setup) {
                    Ok(mut fresh) => {
                        if let Err(e) = brain.setup(&mut fresh, orders) {
                            // stay passive; the server re-sends setup on
                            // every reconnect
                            error!("setup failed: {e}");
                        }
                        *world = Some(fresh);
                    }
                    Err(e) => {
                        *world = None;
                        error!("setup failed: {e}");
                    }
                }
            }
            Ok(ServerMessage::Status(msg)) => self.spawn_guarded("status", move |session| {
                handle_status(session, msg)
            }),
            Ok(ServerMessage::PowerupStatus(msg)) => {
                self.spawn_guarded("powerup-status", move |session| {
                    handle_powerup_status(session, msg)
                })
            }
            Ok(ServerMessage::Exit) => {
                info!("received exit message");
                std::process::exit(0);
            }
            Ok(ServerMessage::Unknown { kind }) => {
                warn!("bad message from server: unknown kind `{kind}`");
            }
        }
    }

    fn spawn_guarded<F>(&self, kind: &'static str, handler: F)
    where
        F: FnOnce(&mut Session) -> Result<(), AgentError> + Send + 'static,
    {
        let session = Arc::clone(&self.session);
        tokio::task::spawn_blocking(move || {
            try_handle(&session, kind, handler);
        });
    }
}

/// Run a handler under the non-blocking guard. A held guard means a message
/// is already in flight: this one is dropped, not queued. The guard is a
/// scoped lock, so it is released on every exit path.
pub fn try_handle<F>(session: &Mutex<Session>, kind: &str, handler: F) -> Dispatch
where
    F: FnOnce(&mut Session) -> Result<(), AgentError>,
{
    let mut guard = match session.try_lock() {
        Ok(guard) => guard,
        Err(TryLockError::WouldBlock) => {
            debug!("busy, dropping {kind} message");
            return Dispatch::DroppedBusy;
        }
        Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
    };
    if guard.world.is_none() {
        // a status racing ahead of the post-reconnect setup
        debug!("{kind} before setup, discarded");
        return Dispatch::NotReady;
    }
    let start = Instant::now();
    let result = handler(&mut guard);
    let elapsed = start.elapsed();
    if elapsed > SLOW_TURN {
        warn!("handling {kind} took {elapsed:?}");
    }
    match result {
        Ok(()) => Dispatch::Handled,
        Err(e) => {
            error!("error handling {kind} message: {e}");
            Dispatch::Failed
        }
    }
}

/// Apply a status payload to the repository, then let the engine react.
pub fn handle_status(session: &mut Session, msg: StatusMessage) -> Result<(), AgentError> {
    let Session { world, brain, orders } = session;
    let Some(world) = world.as_mut() else {
        return Ok(());
    };
    let acting = update::apply_status(world, &msg)?;
    brain.game_status(world, orders, msg.status, acting)
}

/// Resolve a card-play result: resync the deck and hand unless we just
/// acted ourselves, then let the engine react.
pub fn handle_powerup_status(
    session: &mut Session,
    msg: PowerupStatusMessage,
) -> Result<(), AgentError> {
    let Session { world, brain, orders } = session;
    let Some(world) = world.as_mut() else {
        return Ok(());
    };

    let player = match &msg.played_by {
        Some(guid) => world
            .player_by_guid(guid)
            .ok_or_else(|| AgentError::UnknownPlayer(guid.clone()))?,
        None => world.me,
    };
    let card = world.resolve_power_up(&msg.card);
    info!(
        "{} {:?} on {}",
        world.players[player.0].name,
        msg.status,
        world.powerups.get(card)
    );

    let key = PowerUpKey::of_snapshot(&msg.card);
    if orders.trust_server_cards(&key) {
        if let Some(deck) = &msg.cards_deck {
            let ids = deck.iter().map(|snap| world.resolve_power_up(snap)).collect();
            world.powerups.reconcile_deck(ids);
        }
        if let Some(hand) = &msg.cards_hand {
            let ids = hand.iter().map(|snap| world.resolve_power_up(snap)).collect();
            world.powerups.reconcile_hand(ids);
        }
    }

    brain.powerup_status(world, orders, msg.status, player, card)
}

fn lock_session(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_session() -> Session {
        let setup = r#"{
            "msg": "setup",
            "my-guid": "me",
            "map": {"width": 4, "height": 1, "rows": ["...."]},
            "players": [{"guid": "me", "name": "Us", "limo-x": 0, "limo-y": 0}],
            "companies": [{"name": "Initech", "bus-stop-x": 2, "bus-stop-y": 0}],
            "stores": [],
            "passengers": [{"name": "Alice", "points-delivered": 5, "lobby": "Initech",
                            "destination": "Initech"}],
            "powerups": []
        }"#;
        let ServerMessage::Setup(setup) = ServerMessage::decode(setup).expect("decode")
        else {
            panic!("expected setup");
        };
        let mut session = Session::new(Brain::new());
        session.world = Some(World::from_setup(&setup).expect("world"));
        session
    }

    fn update_msg() -> StatusMessage {
        let text = r#"{
            "msg": "status",
            "status": "UPDATE",
            "players": [{"guid": "me", "score": 0, "total-score": 0, "cards-max": 0,
                         "coffee-servings": 3, "limo-x": 1, "limo-y": 0}]
        }"#;
        let ServerMessage::Status(msg) = ServerMessage::decode(text).expect("decode")
        else {
            panic!("expected status");
        };
        msg
    }

    #[test]
    fn held_guard_drops_the_message_and_leaves_state_untouched() {
        let session = Mutex::new(seeded_session());

        let outer = session.try_lock().expect("first lock");
        let before = outer.world.as_ref().expect("world").me().limo.tile;
        // simulate the second message arriving mid-handling: the lock is
        // held, so the dispatch must drop, not block
        let outcome = try_handle(&session, "status", |session| {
            handle_status(session, update_msg())
        });
        assert_eq!(outcome, Dispatch::DroppedBusy);
        assert_eq!(
            outer.world.as_ref().expect("world").me().limo.tile,
            before
        );
        drop(outer);

        // with the guard free the same message lands
        let outcome = try_handle(&session, "status", |session| {
            handle_status(session, update_msg())
        });
        assert_eq!(outcome, Dispatch::Handled);
        let guard = session.try_lock().expect("lock after handling");
        assert_eq!(
            guard.world.as_ref().expect("world").me().limo.tile,
            chauffeur_protocol::Tile::new(1, 0)
        );
    }

    #[test]
    fn messages_before_setup_are_discarded() {
        let session = Mutex::new(Session::new(Brain::new()));
        let outcome = try_handle(&session, "status", |session| {
            handle_status(session, update_msg())
        });
        assert_eq!(outcome, Dispatch::NotReady);
    }

    #[test]
    fn handler_failures_do_not_poison_the_loop() {
        let session = Mutex::new(seeded_session());
        let outcome = try_handle(&session, "status", |_session| {
            Err(AgentError::NoEligiblePassenger)
        });
        assert_eq!(outcome, Dispatch::Failed);
        // the guard was released on the error path
        assert!(session.try_lock().is_ok());
    }

    #[test]
    fn relocation_play_triggers_a_replan() {
        let mut session = seeded_session();
        let (tx, mut rx) = mpsc::unbounded_channel();
        session.orders.tx = Some(tx);
        let session = Mutex::new(session);

        let text = r#"{
            "msg": "powerup-status",
            "status": "POWER_UP_PLAYED",
            "played-by": "me",
            "card": {"card": "RELOCATE_ALL_CARS", "ok-to-play": true}
        }"#;
        let ServerMessage::PowerupStatus(msg) =
            ServerMessage::decode(text).expect("decode")
        else {
            panic!("expected powerup-status");
        };
        let outcome = try_handle(&session, "powerup-status", |session| {
            handle_powerup_status(session, msg)
        });
        assert_eq!(outcome, Dispatch::Handled);

        // every limo was relocated, so the engine re-planned from scratch
        let frame = rx.try_recv().expect("an order was sent");
        let Message::Text(text) = frame else {
            panic!("expected a text frame");
        };
        assert!(text.contains(r#""msg":"move""#));
        assert!(text.contains("path"));
    }

    #[test]
    fn card_resync_is_skipped_only_within_the_grace_window() {
        let mut orders = OrderTx::default();
        let played = PowerUpKey {
            card: chauffeur_protocol::CardKind::StopCar,
            company: None,
            passenger: None,
            player: Some("Rival".into()),
        };
        let other = PowerUpKey {
            card: chauffeur_protocol::CardKind::RelocateAllCars,
            company: None,
            passenger: None,
            player: None,
        };

        // nothing played yet: always trust the server
        assert!(orders.trust_server_cards(&other));

        orders.last_card_played = Some(played.clone());
        orders.last_card_sent = Some(Instant::now());
        // the play we just sent comes back: trust the server's view of it
        assert!(orders.trust_server_cards(&played));
        // a different card inside the grace window: our optimistic view wins
        assert!(!orders.trust_server_cards(&other));

        orders.last_card_sent = Some(Instant::now() - CARD_RESYNC_GRACE * 2);
        assert!(orders.trust_server_cards(&other));
    }
}
