//! Native channel transport over `tokio-tungstenite`.
//!
//! Each channel runs in a background tokio task with:
//! - Engine.IO handshake and namespace connect
//! - Client-side ping with a liveness deadline
//! - Exponential backoff reconnection with jitter, reusing the last
//!   subscription parameters
//! - Stream-based event delivery to the consumer

use std::pin::Pin;
use std::sync::atomic::{AtomicU16, AtomicU32, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream, Stream};
use futures_util::{SinkExt, StreamExt};
use pin_project_lite::pin_project;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::WsError;
use crate::shared::Symbol;
use crate::ws::codec::{self, EnginePacket, Handshake, SocketPacket};
use crate::ws::{ChannelEvent, ChannelKind, ConnectionState, Subscription, TransportConfig};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Used until the server's handshake announces real timings.
const DEFAULT_PING_INTERVAL_MS: u64 = 25_000;

/// Upper bounds on server-announced timings.
const MAX_PING_INTERVAL_MS: u64 = 5 * 60 * 1000;
const MAX_SILENCE_MS: u64 = 10 * 60 * 1000;

// ─── Commands from the handle to the background task ─────────────────────────

enum Command {
    Close,
}

// ─── Disconnect reasons for the reconnection decision ─────────────────────────

enum DisconnectReason {
    UserRequested,
    PingTimeout,
    Error(String),
}

// ─── Background task state ───────────────────────────────────────────────────

struct TaskState {
    config: TransportConfig,
    subscription: Subscription,
    event_tx: mpsc::Sender<ChannelEvent>,
    cmd_rx: mpsc::Receiver<Command>,
    reconnect_attempts: Arc<AtomicU32>,
    ready_state: Arc<AtomicU16>,
}

impl TaskState {
    fn channel(&self) -> ChannelKind {
        self.subscription.channel()
    }

    /// Deliver an event. Waits for queue space so no message is lost; fails
    /// silently once the handle has closed its receiver.
    async fn emit(&self, event: ChannelEvent) {
        let _ = self.event_tx.send(event).await;
    }

    /// Move to `next` and announce it. `Closed` is sticky: once the handle
    /// has closed, the task never overwrites it.
    async fn transition(&self, next: ConnectionState) {
        let changed = self
            .ready_state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                if current == ConnectionState::Closed as u16 || current == next as u16 {
                    None
                } else {
                    Some(next as u16)
                }
            })
            .is_ok();
        if changed {
            tracing::debug!(channel = %self.channel(), state = %next, "Channel state changed");
            self.emit(ChannelEvent::State(next)).await;
        }
    }

    fn attempts(&self) -> u32 {
        self.reconnect_attempts.load(Ordering::SeqCst)
    }

    fn should_reconnect(&self) -> bool {
        self.config.reconnect.enabled && self.attempts() < self.config.reconnect.max_attempts
    }
}

// ─── Transport ───────────────────────────────────────────────────────────────

/// Opens channels against one server.
#[derive(Debug, Clone, Default)]
pub struct Transport {
    config: TransportConfig,
}

impl Transport {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Open the public market-data channel for `symbol`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open_public(&self, symbol: Symbol) -> ChannelHandle {
        self.open(Subscription::Market { symbol })
    }

    /// Open the private account channel authenticated by `token`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open_private(&self, token: impl Into<String>) -> ChannelHandle {
        self.open(Subscription::Account {
            token: token.into(),
        })
    }

    /// Open a channel for an arbitrary subscription.
    pub fn open(&self, subscription: Subscription) -> ChannelHandle {
        let (event_tx, event_rx) = mpsc::channel(self.config.event_capacity.max(1));
        let (cmd_tx, cmd_rx) = mpsc::channel(4);
        let ready_state = Arc::new(AtomicU16::new(ConnectionState::Disconnected as u16));
        let reconnect_attempts = Arc::new(AtomicU32::new(0));
        let kind = subscription.channel();

        tracing::info!(channel = %kind, ?subscription, "Opening channel");

        let state = TaskState {
            config: self.config.clone(),
            subscription,
            event_tx,
            cmd_rx,
            reconnect_attempts: Arc::clone(&reconnect_attempts),
            ready_state: Arc::clone(&ready_state),
        };
        let task_handle = tokio::spawn(run_task(state));

        ChannelHandle {
            kind,
            cmd_tx: Some(cmd_tx),
            event_rx,
            task_handle: Some(task_handle),
            ready_state,
            reconnect_attempts,
        }
    }
}

// ─── ChannelHandle ───────────────────────────────────────────────────────────

pin_project! {
    /// Caller's end of one channel.
    ///
    /// Yields [`ChannelEvent`]s until closed. Closing is idempotent and
    /// discards anything still queued.
    pub struct ChannelHandle {
        kind: ChannelKind,
        cmd_tx: Option<mpsc::Sender<Command>>,
        #[pin]
        event_rx: mpsc::Receiver<ChannelEvent>,
        task_handle: Option<JoinHandle<()>>,
        ready_state: Arc<AtomicU16>,
        reconnect_attempts: Arc<AtomicU32>,
    }

    impl PinnedDrop for ChannelHandle {
        fn drop(this: Pin<&mut Self>) {
            let this = this.project();
            if let Some(handle) = this.task_handle.take() {
                handle.abort();
            }
        }
    }
}

impl ChannelHandle {
    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from(self.ready_state.load(Ordering::SeqCst))
    }

    /// Reconnect attempts since the last successful connect.
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.cmd_tx.is_none()
    }

    /// Next event, or `None` once the channel is closed or has given up
    /// reconnecting.
    pub async fn next(&mut self) -> Option<ChannelEvent> {
        if self.is_closed() {
            return None;
        }
        self.event_rx.recv().await
    }

    /// Close the channel. Calling it again has no effect.
    pub fn close(&mut self) {
        let Some(cmd_tx) = self.cmd_tx.take() else {
            return;
        };
        self.ready_state
            .store(ConnectionState::Closed as u16, Ordering::SeqCst);
        let _ = cmd_tx.try_send(Command::Close);

        self.event_rx.close();
        let mut discarded = 0usize;
        while self.event_rx.try_recv().is_ok() {
            discarded += 1;
        }
        tracing::info!(channel = %self.kind, discarded, "Channel closed");
    }

    /// Close and wait (bounded) for the background task to send its
    /// goodbye frames.
    pub async fn close_gracefully(&mut self) -> Result<(), WsError> {
        self.close();
        if let Some(handle) = self.task_handle.take() {
            tokio::time::timeout(Duration::from_secs(5), handle)
                .await
                .map_err(|_| WsError::Timeout)?
                .map_err(|e| WsError::ConnectionFailed(e.to_string()))?;
        }
        Ok(())
    }
}

impl Stream for ChannelHandle {
    type Item = ChannelEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        if this.cmd_tx.is_none() {
            return Poll::Ready(None);
        }
        this.event_rx.poll_recv(cx)
    }
}

impl std::fmt::Debug for ChannelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelHandle")
            .field("kind", &self.kind)
            .field("state", &self.state())
            .field("reconnect_attempts", &self.reconnect_attempts())
            .finish()
    }
}

// ─── Background task ─────────────────────────────────────────────────────────

async fn run_task(mut state: TaskState) {
    let url = codec::build_url(&state.config.url, &state.subscription);

    loop {
        // ── 1. Attempt connection ────────────────────────────────────────
        state.transition(ConnectionState::Connecting).await;
        let timeout = Duration::from_millis(state.config.connect_timeout_ms);

        let attempt = tokio::select! {
            result = attempt_connect(&url, timeout) => Some(result),
            cmd = state.cmd_rx.recv() => match cmd {
                Some(Command::Close) | None => None,
            },
        };
        let Some(result) = attempt else {
            return;
        };

        let reason = match result {
            // ── 2. Connected: run until the connection breaks ────────────
            Ok((sink, stream)) => run_connected(&mut state, sink, stream).await,
            Err(e) => {
                tracing::warn!(channel = %state.channel(), "Connection failed: {}", e);
                DisconnectReason::Error(e.to_string())
            }
        };

        // ── 3. Post-disconnect decision ──────────────────────────────────
        match &reason {
            DisconnectReason::UserRequested => return,
            DisconnectReason::PingTimeout | DisconnectReason::Error(_) => {
                if let DisconnectReason::Error(cause) = &reason {
                    tracing::debug!(channel = %state.channel(), "Disconnected: {}", cause);
                }
                state.transition(ConnectionState::Disconnected).await;
                if !state.should_reconnect() {
                    tracing::error!(
                        channel = %state.channel(),
                        attempts = state.attempts(),
                        "Giving up reconnecting"
                    );
                    state.transition(ConnectionState::Errored).await;
                    return;
                }
                if !backoff_sleep(&mut state).await {
                    return;
                }
            }
        }
    }
}

/// The inner connected loop. Runs until the connection breaks or the
/// handle closes.
async fn run_connected(
    state: &mut TaskState,
    mut sink: WsSink,
    mut stream: WsSource,
) -> DisconnectReason {
    let namespace = state.subscription.namespace();
    let channel = state.channel();

    let mut ping_every = Duration::from_millis(DEFAULT_PING_INTERVAL_MS);
    let mut silence_limit = Duration::from_millis(state.config.connect_timeout_ms);

    let mut ping_interval = tokio::time::interval(ping_every);
    ping_interval.reset(); // skip immediate first tick
    let mut handshake_done = false;

    let liveness = tokio::time::sleep(silence_limit);
    tokio::pin!(liveness);

    loop {
        tokio::select! {
            // ── a) Incoming WS message ───────────────────────────────────
            msg = stream.next() => {
                liveness.as_mut().reset(tokio::time::Instant::now() + silence_limit);
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let text_str: &str = text.as_ref();
                        let packet = match codec::decode(text_str) {
                            Ok(packet) => packet,
                            Err(e) => {
                                tracing::debug!(%channel, "Skipping undecodable frame: {}, raw: {}", e, text_str);
                                continue;
                            }
                        };
                        match packet {
                            EnginePacket::Open(handshake) => {
                                (ping_every, silence_limit) = liveness_timing(&handshake);
                                ping_interval = tokio::time::interval(ping_every);
                                ping_interval.reset();
                                handshake_done = true;
                                liveness.as_mut().reset(tokio::time::Instant::now() + silence_limit);

                                let connect = codec::encode_connect(&state.subscription);
                                if let Err(e) = send_text(&mut sink, connect).await {
                                    return DisconnectReason::Error(e);
                                }
                            }
                            EnginePacket::Ping(payload) => {
                                if let Err(e) = send_text(&mut sink, codec::encode_pong(&payload)).await {
                                    tracing::warn!(%channel, "Failed to send pong: {}", e);
                                }
                            }
                            EnginePacket::Close => {
                                return DisconnectReason::Error("Server closed the session".into());
                            }
                            EnginePacket::Message(SocketPacket::Connect { nsp }) => {
                                if nsp == namespace {
                                    state.reconnect_attempts.store(0, Ordering::SeqCst);
                                    tracing::info!(%channel, "Channel connected");
                                    state.transition(ConnectionState::Connected).await;
                                }
                            }
                            EnginePacket::Message(SocketPacket::Disconnect { nsp }) => {
                                if nsp == namespace {
                                    return DisconnectReason::Error("Server disconnected the namespace".into());
                                }
                            }
                            EnginePacket::Message(packet) => {
                                if let Some(raw) = packet.into_raw(channel) {
                                    state.emit(ChannelEvent::Message(raw)).await;
                                }
                            }
                            EnginePacket::Pong(_) | EnginePacket::Upgrade | EnginePacket::Noop => {}
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = extract_close(frame.as_ref());
                        tracing::info!(%channel, code, "Server closed connection: {}", reason);
                        return DisconnectReason::Error(reason);
                    }
                    Some(Ok(_)) => {} // Binary, Pong, Frame: ignore
                    Some(Err(e)) => {
                        let reason = e.to_string();
                        tracing::error!(%channel, "WebSocket error: {}", reason);
                        return DisconnectReason::Error(reason);
                    }
                    None => {
                        return DisconnectReason::Error("Stream ended".into());
                    }
                }
            }

            // ── b) Command from the handle ───────────────────────────────
            cmd = state.cmd_rx.recv() => {
                match cmd {
                    Some(Command::Close) | None => {
                        let _ = send_text(&mut sink, codec::encode_disconnect(&state.subscription)).await;
                        let _ = sink.send(Message::Close(Some(CloseFrame {
                            code: CloseCode::Normal,
                            reason: "Client disconnect".into(),
                        }))).await;
                        return DisconnectReason::UserRequested;
                    }
                }
            }

            // ── c) Ping interval ─────────────────────────────────────────
            _ = ping_interval.tick(), if handshake_done => {
                if let Err(e) = send_text(&mut sink, codec::encode_ping()).await {
                    tracing::warn!(%channel, "Failed to send ping: {}", e);
                }
            }

            // ── d) Liveness deadline ─────────────────────────────────────
            () = &mut liveness => {
                tracing::warn!(
                    %channel,
                    "No traffic within {}ms",
                    silence_limit.as_millis()
                );
                let _ = sink.close().await;
                return DisconnectReason::PingTimeout;
            }
        }
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Attempt to establish a WebSocket connection within `timeout`.
async fn attempt_connect(url: &str, timeout: Duration) -> Result<(WsSink, WsSource), WsError> {
    let (ws_stream, _) = tokio::time::timeout(timeout, connect_async(url))
        .await
        .map_err(|_| WsError::Timeout)?
        .map_err(|e| WsError::ConnectionFailed(e.to_string()))?;

    Ok(ws_stream.split())
}

async fn send_text(sink: &mut WsSink, text: String) -> Result<(), String> {
    sink.send(Message::Text(text.into()))
        .await
        .map_err(|e| e.to_string())
}

/// Ping period and silence limit announced by `handshake`, clamped so a
/// hostile or broken server cannot overflow the timers.
fn liveness_timing(handshake: &Handshake) -> (Duration, Duration) {
    let interval = handshake.ping_interval.clamp(1, MAX_PING_INTERVAL_MS);
    let silence = interval
        .saturating_add(handshake.ping_timeout)
        .min(MAX_SILENCE_MS);
    (Duration::from_millis(interval), Duration::from_millis(silence))
}

/// Extract close code and reason from an optional CloseFrame.
fn extract_close(frame: Option<&CloseFrame>) -> (u16, String) {
    match frame {
        Some(f) => (f.code.into(), f.reason.to_string()),
        None => (1006, "No close frame".into()),
    }
}

// ─── Reconnection backoff ────────────────────────────────────────────────────

/// Sleep before the next attempt. Returns `false` if the handle closed
/// meanwhile.
async fn backoff_sleep(state: &mut TaskState) -> bool {
    let attempt = state.reconnect_attempts.fetch_add(1, Ordering::SeqCst) + 1;

    let policy = &state.config.reconnect;
    let jitter = rand::random::<u32>() % 500;
    let delay = policy
        .delay_for(attempt)
        .saturating_add(jitter)
        .min(policy.max_delay_ms.max(1));

    tracing::info!(
        channel = %state.channel(),
        "Reconnect attempt {}/{} in {}ms",
        attempt,
        policy.max_attempts,
        delay
    );

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_millis(delay as u64)) => true,
        cmd = state.cmd_rx.recv() => match cmd {
            Some(Command::Close) | None => false,
        },
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::ReconnectPolicy;

    fn unreachable_transport() -> Transport {
        Transport::new(TransportConfig {
            // Reserved port; connection is refused immediately.
            url: "ws://127.0.0.1:1".into(),
            reconnect: ReconnectPolicy {
                enabled: false,
                ..Default::default()
            },
            connect_timeout_ms: 1000,
            event_capacity: 16,
        })
    }

    #[test]
    fn test_extract_close_with_frame() {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "goodbye".into(),
        };
        let (code, reason) = extract_close(Some(&frame));
        assert_eq!(code, 1000);
        assert_eq!(reason, "goodbye");
    }

    #[test]
    fn test_extract_close_no_frame() {
        let (code, reason) = extract_close(None);
        assert_eq!(code, 1006);
        assert_eq!(reason, "No close frame");
    }

    fn handshake(ping_interval: u64, ping_timeout: u64) -> Handshake {
        Handshake {
            sid: "s".into(),
            upgrades: Vec::new(),
            ping_interval,
            ping_timeout,
        }
    }

    #[test]
    fn test_liveness_timing_follows_handshake() {
        let (ping, silence) = liveness_timing(&handshake(25_000, 5_000));
        assert_eq!(ping, Duration::from_millis(25_000));
        assert_eq!(silence, Duration::from_millis(30_000));
    }

    #[test]
    fn test_liveness_timing_clamps_extreme_values() {
        let (ping, silence) = liveness_timing(&handshake(u64::MAX, u64::MAX));
        assert_eq!(ping, Duration::from_millis(MAX_PING_INTERVAL_MS));
        assert_eq!(silence, Duration::from_millis(MAX_SILENCE_MS));
        // Must be usable as a deadline.
        let _ = tokio::time::Instant::now() + silence;

        let (ping, _) = liveness_timing(&handshake(0, 0));
        assert_eq!(ping, Duration::from_millis(1));
    }

    #[tokio::test]
    async fn test_reconnect_attempts_are_exposed() {
        let transport = Transport::new(TransportConfig {
            url: "ws://127.0.0.1:1".into(),
            reconnect: ReconnectPolicy {
                enabled: true,
                max_attempts: 2,
                base_delay_ms: 1,
                max_delay_ms: 5,
            },
            connect_timeout_ms: 1000,
            event_capacity: 16,
        });
        let mut handle = transport.open_public(Symbol::from("btc-eur"));
        assert_eq!(handle.reconnect_attempts(), 0);

        while handle.next().await.is_some() {}
        assert_eq!(handle.state(), ConnectionState::Errored);
        assert_eq!(handle.reconnect_attempts(), 2);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let mut handle = unreachable_transport().open_public(Symbol::from("btc-eur"));
        handle.close();
        handle.close();
        assert_eq!(handle.state(), ConnectionState::Closed);
        assert!(handle.is_closed());
        assert!(handle.next().await.is_none());
    }

    #[tokio::test]
    async fn test_gives_up_without_reconnect() {
        let mut handle = unreachable_transport().open_private("token");
        assert_eq!(handle.kind(), ChannelKind::Private);

        let mut states = Vec::new();
        while let Some(event) = handle.next().await {
            if let ChannelEvent::State(s) = event {
                states.push(s);
            }
        }
        assert_eq!(
            states,
            vec![
                ConnectionState::Connecting,
                ConnectionState::Disconnected,
                ConnectionState::Errored
            ]
        );
        assert_eq!(handle.state(), ConnectionState::Errored);
    }
}
