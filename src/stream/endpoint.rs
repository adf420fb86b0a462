use url::Url;

use super::StreamError;
use crate::config::routes;
use crate::domain::Topic;

/// `ws(s)://<host>/api/v1/ws/<topic>?token=<access_token>`, derived from the REST root.
pub fn stream_url(api_root: &str, topic: Topic, token: &str) -> Result<Url, StreamError> {
    let mut url =
        Url::parse(api_root).map_err(|e| StreamError::InvalidEndpoint(e.to_string()))?;

    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => {
            return Err(StreamError::InvalidEndpoint(format!(
                "unsupported scheme '{}'",
                other
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| StreamError::InvalidEndpoint(format!("cannot switch to {}", scheme)))?;

    let path = format!("{}{}/{}", url.path().trim_end_matches('/'), routes::WS, topic);
    url.set_path(&path);
    url.query_pairs_mut().clear().append_pair("token", token);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swaps_scheme_and_carries_the_token() {
        let url = stream_url("http://backend.test/api/v1", Topic::Prices, "abc.def").unwrap();
        assert_eq!(url.as_str(), "ws://backend.test/api/v1/ws/prices?token=abc.def");

        let url = stream_url("https://app.example.com/api/v1/", Topic::Alerts, "t").unwrap();
        assert_eq!(url.as_str(), "wss://app.example.com/api/v1/ws/alerts?token=t");
    }

    #[test]
    fn rejects_non_http_roots() {
        assert!(matches!(
            stream_url("ftp://backend.test", Topic::Prices, "t"),
            Err(StreamError::InvalidEndpoint(_))
        ));
        assert!(stream_url("not a url", Topic::Prices, "t").is_err());
    }
}
