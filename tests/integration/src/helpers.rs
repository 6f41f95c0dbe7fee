//! Test helpers for integration tests
//!
//! [`TestServer`] runs the gateway on an ephemeral port; [`WsClient`] speaks
//! the JSON frame protocol over a real socket.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use futures_util::{SinkExt, StreamExt};
use kizuna_common::{JwtService, RealtimeConfig};
use kizuna_core::{MessageRepository, PresenceRepository, Snowflake};
use kizuna_db::MemoryStore;
use kizuna_gateway::protocol::OpCode;
use kizuna_gateway::{create_app, GatewayState};
use kizuna_service::ServiceContextBuilder;
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::fixtures::{seeded_store, CapturingNotifier, JWT_SECRET};

/// How long a client waits for an expected frame
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Stores a test server can swap out
pub struct TestStores {
    pub messages: Arc<dyn MessageRepository>,
    pub presence: Arc<dyn PresenceRepository>,
}

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<CapturingNotifier>,
    pub state: GatewayState,
    jwt: Arc<JwtService>,
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a new test server with default realtime settings
    pub async fn start() -> Result<Self> {
        Self::start_with(RealtimeConfig::default()).await
    }

    /// Start a test server with custom realtime settings
    pub async fn start_with(realtime: RealtimeConfig) -> Result<Self> {
        Self::start_with_stores(realtime, |store| TestStores {
            messages: store.clone(),
            presence: store.clone(),
        })
        .await
    }

    /// Start a test server whose message and presence stores wrap the
    /// seeded store
    pub async fn start_with_stores(
        realtime: RealtimeConfig,
        wrap: impl FnOnce(&Arc<MemoryStore>) -> TestStores,
    ) -> Result<Self> {
        let store = seeded_store();
        let notifier = CapturingNotifier::new();
        let jwt = Arc::new(JwtService::new(JWT_SECRET, 900));
        let stores = wrap(&store);

        let ctx = ServiceContextBuilder::new()
            .user_repo(store.clone())
            .room_repo(store.clone())
            .message_repo(stores.messages)
            .presence_repo(stores.presence)
            .notifier(notifier.clone())
            .jwt_service(jwt.clone())
            .build()?;
        let state = GatewayState::new(ctx, realtime);
        let app = create_app(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Ok(Self {
            addr,
            store,
            notifier,
            state,
            jwt,
            _handle: handle,
        })
    }

    pub fn gateway_url(&self) -> String {
        format!("ws://{}/gateway", self.addr)
    }

    /// Mint an access token for a seeded user
    pub fn token(&self, user_id: Snowflake) -> String {
        self.jwt
            .issue_access_token(user_id)
            .unwrap_or_else(|e| panic!("token for {user_id}: {e}"))
    }

    /// Connect and identify as `user_id`
    pub async fn login(&self, user_id: Snowflake) -> Result<(WsClient, Value)> {
        let mut client = WsClient::connect(self).await?;
        let ready = client.identify(&self.token(user_id)).await?;
        Ok((client, ready))
    }

    /// Poll until `check` holds or the receive timeout elapses
    pub async fn eventually(&self, check: impl Fn() -> bool) -> bool {
        let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
        while tokio::time::Instant::now() < deadline {
            if check() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        check()
    }
}

/// What the server sent
#[derive(Debug)]
pub enum Frame {
    Json(Value),
    Closed(Option<u16>),
}

/// WebSocket client speaking the gateway protocol
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    pub hello: Value,
}

impl WsClient {
    /// Open a socket and consume the `Hello` frame
    pub async fn connect(server: &TestServer) -> Result<Self> {
        let (stream, _) = connect_async(server.gateway_url()).await?;
        let mut client = Self {
            stream,
            hello: Value::Null,
        };

        match client.next_frame().await? {
            Frame::Json(frame) if frame["op"] == OpCode::Hello.as_u8() => {
                client.hello = frame["d"].clone();
                Ok(client)
            }
            other => bail!("expected Hello, got {other:?}"),
        }
    }

    /// Send `Identify` and wait for `READY`
    pub async fn identify(&mut self, token: &str) -> Result<Value> {
        self.send_op(OpCode::Identify, json!({ "token": token })).await?;
        self.expect_event("READY").await
    }

    pub async fn send_op(&mut self, op: OpCode, d: Value) -> Result<()> {
        self.send_raw(json!({ "op": op.as_u8(), "d": d }).to_string())
            .await
    }

    pub async fn send_raw(&mut self, text: impl Into<String>) -> Result<()> {
        self.stream.send(Message::Text(text.into())).await?;
        Ok(())
    }

    /// Join a room and wait for the confirmation
    pub async fn join(&mut self, room_id: Snowflake) -> Result<Value> {
        self.send_op(OpCode::RoomJoin, json!({ "room_id": room_id }))
            .await?;
        self.expect_event("ROOM_JOINED").await
    }

    pub async fn send_message(&mut self, room_id: Snowflake, content: &str, nonce: &str) -> Result<()> {
        self.send_op(
            OpCode::MessageSend,
            json!({ "room_id": room_id, "content": content, "nonce": nonce }),
        )
        .await
    }

    /// Next frame from the server, or an error after [`RECV_TIMEOUT`]
    pub async fn next_frame(&mut self) -> Result<Frame> {
        self.next_frame_within(RECV_TIMEOUT)
            .await?
            .ok_or_else(|| anyhow!("no frame within {RECV_TIMEOUT:?}"))
    }

    async fn next_frame_within(&mut self, wait: Duration) -> Result<Option<Frame>> {
        loop {
            let next = match tokio::time::timeout(wait, self.stream.next()).await {
                Ok(next) => next,
                Err(_) => return Ok(None),
            };
            let frame = match next {
                None => Frame::Closed(None),
                Some(Err(_)) => Frame::Closed(None),
                Some(Ok(Message::Text(text))) => {
                    Frame::Json(serde_json::from_str(&text).context("server sent invalid JSON")?)
                }
                Some(Ok(Message::Close(frame))) => Frame::Closed(frame.map(|f| u16::from(f.code))),
                Some(Ok(_)) => continue,
            };
            return Ok(Some(frame));
        }
    }

    /// Skip frames until a dispatch named `event` arrives; returns its `d`
    pub async fn expect_event(&mut self, event: &str) -> Result<Value> {
        loop {
            match self.next_frame().await? {
                Frame::Json(frame) if frame["t"] == event => return Ok(frame["d"].clone()),
                Frame::Json(_) => {}
                Frame::Closed(code) => bail!("closed with {code:?} while waiting for {event}"),
            }
        }
    }

    /// True if no dispatch named `event` arrives within `wait`
    pub async fn expect_no_event(&mut self, event: &str, wait: Duration) -> Result<bool> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Ok(true);
            }
            match self.next_frame_within(remaining).await? {
                None | Some(Frame::Closed(_)) => return Ok(true),
                Some(Frame::Json(frame)) if frame["t"] == event => return Ok(false),
                Some(Frame::Json(_)) => {}
            }
        }
    }

    /// Skip frames until the server closes; returns the close code
    pub async fn expect_close(&mut self) -> Result<Option<u16>> {
        loop {
            if let Frame::Closed(code) = self.next_frame().await? {
                return Ok(code);
            }
        }
    }

    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}
