//! In-process fakes for the HTTP and WebSocket seams, plus token builders.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use futures::StreamExt;
use reqwest::Method;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use url::Url;

use crate::api::{HttpRequest, HttpResponse, HttpTransport, TransportError};
use crate::session::SessionProvider;
use crate::stream::{ConnectError, Connection, Frame, StreamConnector};
use crate::utils::now_timestamp_ms;

// --- HTTP ---

#[derive(Clone)]
enum Reply {
    Respond(HttpResponse),
    Delayed(Duration, HttpResponse),
    Hang,
    Network(String),
}

struct Route {
    method: Method,
    suffix: String,
    replies: VecDeque<Reply>,
}

/// Answers requests from a script keyed on method and path suffix.
///
/// A route's replies are consumed in order and the last one repeats. The most recently
/// added matching route wins; unmatched requests get a 404.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    routes: Mutex<Vec<Route>>,
    sent: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn route(&self, method: Method, suffix: &str, reply: HttpResponse) {
        self.add(method, suffix, vec![Reply::Respond(reply)]);
    }

    pub(crate) fn route_sequence(&self, method: Method, suffix: &str, replies: Vec<HttpResponse>) {
        self.add(method, suffix, replies.into_iter().map(Reply::Respond).collect());
    }

    pub(crate) fn route_delayed(
        &self,
        method: Method,
        suffix: &str,
        delay: Duration,
        reply: HttpResponse,
    ) {
        self.add(method, suffix, vec![Reply::Delayed(delay, reply)]);
    }

    pub(crate) fn hang(&self, method: Method, suffix: &str) {
        self.add(method, suffix, vec![Reply::Hang]);
    }

    pub(crate) fn fail_network(&self, method: Method, suffix: &str, detail: &str) {
        self.add(method, suffix, vec![Reply::Network(detail.to_string())]);
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, method: Method, suffix: &str) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && path_of(&r.url).ends_with(suffix))
            .count()
    }

    fn add(&self, method: Method, suffix: &str, replies: Vec<Reply>) {
        self.routes.lock().unwrap().push(Route {
            method,
            suffix: suffix.to_string(),
            replies: replies.into(),
        });
    }

    fn next_reply(&self, request: &HttpRequest) -> Reply {
        let path = path_of(&request.url);
        let mut routes = self.routes.lock().unwrap();
        let Some(route) = routes
            .iter_mut()
            .rev()
            .find(|r| r.method == request.method && path.ends_with(&r.suffix))
        else {
            return Reply::Respond(reply_text(404, "no scripted route"));
        };
        if route.replies.len() > 1 {
            route.replies.pop_front().unwrap()
        } else {
            route.replies.front().cloned().unwrap()
        }
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let reply = self.next_reply(&request);
        self.sent.lock().unwrap().push(request);
        match reply {
            Reply::Respond(response) => Ok(response),
            Reply::Delayed(delay, response) => {
                tokio::time::sleep(delay).await;
                Ok(response)
            }
            Reply::Hang => std::future::pending().await,
            Reply::Network(detail) => Err(TransportError::Network(detail)),
        }
    }
}

fn path_of(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

pub(crate) fn reply_json(status: u16, body: Value) -> HttpResponse {
    HttpResponse {
        status,
        body: serde_json::to_vec(&body).unwrap(),
    }
}

pub(crate) fn reply_text(status: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        body: body.as_bytes().to_vec(),
    }
}

// --- session ---

pub(crate) struct TestSession {
    token: RwLock<Option<String>>,
}

impl TestSession {
    pub(crate) fn with_token(token: &str) -> Arc<Self> {
        Arc::new(Self {
            token: RwLock::new(Some(token.to_string())),
        })
    }

    pub(crate) fn anonymous() -> Arc<Self> {
        Arc::new(Self {
            token: RwLock::new(None),
        })
    }
}

impl SessionProvider for TestSession {
    fn access_token(&self) -> Option<String> {
        self.token.read().unwrap().clone()
    }

    fn evict_access_token(&self) {
        *self.token.write().unwrap() = None;
    }
}

/// An unsigned token carrying `claims` as its payload.
pub(crate) fn jwt_with_claims(claims: Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(json!({"alg": "HS256", "typ": "JWT"}).to_string());
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.signature", header, payload)
}

/// Token whose `exp` lies `ttl` from now, rounded up to the next whole second.
pub(crate) fn jwt_expiring_in(ttl: Duration) -> String {
    let exp_ms = now_timestamp_ms() + ttl.as_millis() as i64;
    let exp = (exp_ms + 999) / 1000;
    jwt_with_claims(json!({"sub": "7", "exp": exp}))
}

// --- websocket ---

/// Server side of one scripted socket.
pub(crate) struct ScriptedSocket {
    frames: mpsc::UnboundedSender<Frame>,
    outbound: Mutex<mpsc::UnboundedReceiver<String>>,
    received: Mutex<Vec<String>>,
}

impl ScriptedSocket {
    pub(crate) fn push_text(&self, text: &str) {
        let _ = self.frames.send(Frame::Text(text.to_string()));
    }

    pub(crate) fn push_error(&self, detail: &str) {
        let _ = self.frames.send(Frame::Error(detail.to_string()));
    }

    pub(crate) fn close(&self) {
        let _ = self.frames.send(Frame::Closed {
            code: Some(1006),
            reason: "abnormal closure".into(),
        });
    }

    /// Everything the client has written to this socket so far.
    pub(crate) fn sent(&self) -> Vec<String> {
        let mut received = self.received.lock().unwrap();
        let mut outbound = self.outbound.lock().unwrap();
        while let Ok(text) = outbound.try_recv() {
            received.push(text);
        }
        received.clone()
    }
}

struct LiveGuard(Arc<AtomicUsize>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Hands out in-memory sockets and tracks how many are still held by a client.
#[derive(Default)]
pub(crate) struct ScriptedConnector {
    urls: Mutex<Vec<String>>,
    sockets: Mutex<Vec<Arc<ScriptedSocket>>>,
    live: Arc<AtomicUsize>,
    refuse: AtomicBool,
}

impl ScriptedConnector {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    pub(crate) fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }

    pub(crate) fn connects(&self) -> usize {
        self.urls.lock().unwrap().len()
    }

    pub(crate) fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub(crate) fn socket(&self, index: usize) -> Arc<ScriptedSocket> {
        self.sockets.lock().unwrap()[index].clone()
    }

    pub(crate) fn last_socket(&self) -> Arc<ScriptedSocket> {
        self.sockets.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl StreamConnector for ScriptedConnector {
    async fn connect(&self, url: &Url) -> Result<Connection, ConnectError> {
        self.urls.lock().unwrap().push(url.to_string());
        if self.refuse.load(Ordering::SeqCst) {
            return Err(ConnectError("connection refused".into()));
        }

        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        self.sockets.lock().unwrap().push(Arc::new(ScriptedSocket {
            frames: frames_tx,
            outbound: Mutex::new(outbound_rx),
            received: Mutex::new(Vec::new()),
        }));

        self.live.fetch_add(1, Ordering::SeqCst);
        let guard = LiveGuard(self.live.clone());
        let inbound = futures::stream::unfold((frames_rx, guard), |(mut rx, guard)| async move {
            rx.recv().await.map(|frame| (frame, (rx, guard)))
        })
        .boxed();

        Ok(Connection {
            outbound: outbound_tx,
            inbound,
        })
    }
}

/// Let spawned tasks run without moving the paused clock past any real timer.
pub(crate) async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
