use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::{Serialize, de::DeserializeOwned};

use super::error::ApiError;
use super::transport::{HttpRequest, HttpResponse, HttpTransport, RequestBody, TransportError};
use crate::session::SessionProvider;

#[cfg(debug_assertions)]
use crate::config::DF;

/// Which credential a request carries.
#[derive(Debug, Clone)]
pub(crate) enum Auth {
    /// Whatever access token the session holds at send time, if any.
    Session,
    /// An explicit token that is not (yet) the session's.
    Bearer(String),
    Anonymous,
}

/// Uniform request dispatch: bearer injection, a fixed timeout and error classification.
///
/// Cheap to clone; clones share the transport and session.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiInner>,
}

struct ApiInner {
    api_root: String,
    timeout: Duration,
    transport: Arc<dyn HttpTransport>,
    session: Arc<dyn SessionProvider>,
}

impl ApiClient {
    pub fn new(
        api_root: impl Into<String>,
        timeout: Duration,
        transport: Arc<dyn HttpTransport>,
        session: Arc<dyn SessionProvider>,
    ) -> Self {
        Self {
            inner: Arc::new(ApiInner {
                api_root: api_root.into().trim_end_matches('/').to_string(),
                timeout,
                transport,
                session,
            }),
        }
    }

    pub fn api_root(&self) -> &str {
        &self.inner.api_root
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.inner.api_root, path)
    }

    /// Send `method path` with the session's current token.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
    ) -> Result<HttpResponse, ApiError> {
        self.dispatch(method, path, body, Auth::Session).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.request(Method::GET, path, RequestBody::Empty).await?;
        decode(&response)
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::POST, path, json_body(path, body)?)
            .await?;
        decode(&response)
    }

    pub(crate) async fn dispatch(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
        auth: Auth,
    ) -> Result<HttpResponse, ApiError> {
        // Read the token now, not earlier: a renewal may have replaced it while we waited.
        let bearer = match &auth {
            Auth::Session => self.inner.session.access_token(),
            Auth::Bearer(token) => Some(token.clone()),
            Auth::Anonymous => None,
        };
        let request = HttpRequest {
            method: method.clone(),
            url: self.url(path),
            bearer,
            body,
        };

        // Dropping the in-flight future on expiry aborts the underlying request.
        let outcome = tokio::time::timeout(self.inner.timeout, self.inner.transport.send(request))
            .await;

        let response = match outcome {
            Err(_elapsed) => {
                log::warn!("{} {} timed out after {:?}", method, path, self.inner.timeout);
                return Err(ApiError::timeout());
            }
            Ok(Err(TransportError::Timeout)) => return Err(ApiError::timeout()),
            Ok(Err(TransportError::Network(detail))) => {
                log::warn!("{} {} failed: {}", method, path, detail);
                return Err(ApiError::network(detail));
            }
            Ok(Ok(response)) => response,
        };

        #[cfg(debug_assertions)]
        if DF.log_api_requests {
            log::info!("{} {} -> {}", method, path, response.status);
        }

        if response.is_success() {
            return Ok(response);
        }

        let error = ApiError::from_status(response.status, &response.body);
        if error.is_unauthorized() && matches!(auth, Auth::Session) {
            // Next request goes out without a credential instead of replaying a dead one.
            self.inner.session.evict_access_token();
            log::warn!("{} {} returned 401; cached access token evicted", method, path);
        }
        Err(error)
    }
}

pub(crate) fn json_body<B: Serialize + ?Sized>(
    path: &str,
    body: &B,
) -> Result<RequestBody, ApiError> {
    serde_json::to_value(body)
        .map(RequestBody::Json)
        .map_err(|e| ApiError::decode(0, format!("could not encode body for {}: {}", path, e)))
}

pub(crate) fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    serde_json::from_slice(&response.body).map_err(|e| ApiError::decode(response.status, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::{ApiErrorKind, messages};
    use crate::testing::{ScriptedTransport, TestSession, reply_json};
    use serde_json::json;

    fn client(transport: &Arc<ScriptedTransport>, session: &Arc<TestSession>) -> ApiClient {
        ApiClient::new(
            "http://backend.test/api/v1/",
            Duration::from_secs(5),
            transport.clone(),
            session.clone(),
        )
    }

    #[tokio::test]
    async fn attaches_the_current_token_and_joins_paths() {
        let transport = ScriptedTransport::new();
        transport.route(Method::GET, "/documents", reply_json(200, json!([])));
        let session = TestSession::with_token("tok-1");

        let _: serde_json::Value = client(&transport, &session).get_json("/documents").await.unwrap();

        let sent = transport.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].url, "http://backend.test/api/v1/documents");
        assert_eq!(sent[0].bearer.as_deref(), Some("tok-1"));
    }

    #[tokio::test]
    async fn omits_authorization_without_a_session() {
        let transport = ScriptedTransport::new();
        transport.route(Method::GET, "/quota", reply_json(200, json!({})));
        let session = TestSession::anonymous();

        let _ = client(&transport, &session)
            .request(Method::GET, "/quota", RequestBody::Empty)
            .await;

        assert_eq!(transport.requests()[0].bearer, None);
    }

    #[tokio::test]
    async fn unauthorized_evicts_the_token_before_returning() {
        let transport = ScriptedTransport::new();
        transport.route(Method::GET, "/conversions", reply_json(401, json!({"detail": "expired"})));
        let session = TestSession::with_token("stale");
        let api = client(&transport, &session);

        let error = api
            .request(Method::GET, "/conversions", RequestBody::Empty)
            .await
            .unwrap_err();

        assert_eq!(error.kind, ApiErrorKind::Unauthorized);
        assert_eq!(error.status, Some(401));
        assert_eq!(session.access_token(), None);
    }

    #[tokio::test]
    async fn explicit_bearer_401_leaves_the_session_alone() {
        let transport = ScriptedTransport::new();
        transport.route(Method::GET, "/auth/me", reply_json(401, json!({})));
        let session = TestSession::with_token("keep-me");

        let _ = client(&transport, &session)
            .dispatch(Method::GET, "/auth/me", RequestBody::Empty, Auth::Bearer("other".into()))
            .await;

        assert_eq!(transport.requests()[0].bearer.as_deref(), Some("other"));
        assert_eq!(session.access_token().as_deref(), Some("keep-me"));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_requests_time_out() {
        let transport = ScriptedTransport::new();
        transport.hang(Method::GET, "/summary");
        let session = TestSession::anonymous();

        let error = client(&transport, &session)
            .request(Method::GET, "/summary", RequestBody::Empty)
            .await
            .unwrap_err();

        assert_eq!(error.kind, ApiErrorKind::Timeout);
        assert_eq!(error.message, messages::TIMEOUT);
    }

    #[tokio::test]
    async fn network_failures_are_classified() {
        let transport = ScriptedTransport::new();
        transport.fail_network(Method::GET, "/outputs", "connection refused");
        let session = TestSession::anonymous();

        let error = client(&transport, &session)
            .request(Method::GET, "/outputs", RequestBody::Empty)
            .await
            .unwrap_err();

        assert_eq!(error.kind, ApiErrorKind::Network);
        assert_eq!(error.status, None);
    }

    #[tokio::test]
    async fn malformed_success_bodies_surface_as_decode_errors() {
        let transport = ScriptedTransport::new();
        transport.route(Method::GET, "/quota", crate::testing::reply_text(200, "not json"));
        let session = TestSession::anonymous();

        let error = client(&transport, &session)
            .get_json::<crate::domain::Quota>("/quota")
            .await
            .unwrap_err();

        assert_eq!(error.kind, ApiErrorKind::Decode);
        assert_eq!(error.status, Some(200));
    }
}
