mod client;
mod error;
mod resources;
mod transport;

pub use client::ApiClient;
pub use error::{ApiError, ApiErrorKind, messages};
pub use transport::{
    HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, RequestBody, TransportError,
};

// Re-exported so callers of `ApiClient::request` don't need a direct reqwest dependency.
pub use reqwest::Method;
