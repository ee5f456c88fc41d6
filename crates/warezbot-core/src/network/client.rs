//! HTTP client shared by the collaborator clients.
//!
//! Wraps reqwest with:
//! - A fixed request timeout and user agent
//! - Non-2xx responses mapped to `WarezError::Api`
//! - JSON bodies decoded into `WarezError::Json` on mismatch

use crate::config::NetworkConfig;
use crate::{Result, WarezError};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Longest slice of an error body kept in `WarezError::Api`.
const MAX_ERROR_BODY: usize = 512;

/// JSON-over-HTTP client for one downstream service.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    service: &'static str,
}

impl HttpClient {
    /// Create a client with the default request timeout.
    pub fn new(service: &'static str) -> Result<Self> {
        Self::with_timeout(service, NetworkConfig::REQUEST_TIMEOUT)
    }

    /// Create a client with a custom request timeout.
    pub fn with_timeout(service: &'static str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(NetworkConfig::USER_AGENT)
            .build()
            .map_err(|e| WarezError::Network {
                message: format!("Failed to create HTTP client for {}: {}", service, e),
                source: Some(e),
            })?;

        Ok(Self { client, service })
    }

    /// GET `url` and decode the JSON reply.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        headers: &[(&str, &str)],
    ) -> Result<T> {
        let request = with_headers(self.client.get(url.clone()), headers);
        self.send_json("GET", &url, request).await
    }

    /// POST a JSON body to `url` and decode the JSON reply.
    pub async fn post_json<B, T>(&self, url: Url, headers: &[(&str, &str)], body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = with_headers(self.client.post(url.clone()).json(body), headers);
        self.send_json("POST", &url, request).await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: &str,
        url: &Url,
        request: RequestBuilder,
    ) -> Result<T> {
        debug!("{} {} {}", self.service, method, redacted(url));

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                WarezError::Timeout(NetworkConfig::REQUEST_TIMEOUT)
            } else {
                WarezError::Network {
                    message: format!("{} {} failed: {}", method, extract_domain(url), e),
                    source: Some(e),
                }
            }
        })?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(WarezError::Api {
                service: self.service.to_string(),
                status: status.as_u16(),
                message: truncate(&body, MAX_ERROR_BODY).to_string(),
            });
        }

        serde_json::from_str(&body).map_err(|e| WarezError::Json {
            message: format!("unexpected {} response: {}", self.service, e),
            source: Some(e),
        })
    }
}

fn with_headers(mut request: RequestBuilder, headers: &[(&str, &str)]) -> RequestBuilder {
    for (key, value) in headers {
        request = request.header(*key, *value);
    }
    request
}

/// Parse a configured host into a base URL usable with [`endpoint`].
///
/// A host without a scheme is given `https://`, and the path always ends in
/// `/` so that relative joins append instead of replacing the last segment.
pub fn base_url(host: &str) -> Result<Url> {
    let host = host.trim();
    let with_scheme = if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    };
    let mut url = Url::parse(&with_scheme)
        .map_err(|e| WarezError::config(format!("failed to parse host {:?}: {}", host, e)))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Resolve `path` against a base produced by [`base_url`].
pub fn endpoint(base: &Url, path: &str) -> Result<Url> {
    base.join(path.trim_start_matches('/'))
        .map_err(|e| WarezError::Other(format!("invalid endpoint {:?}: {}", path, e)))
}

/// Extract domain from a URL.
pub fn extract_domain(url: &Url) -> String {
    url.host_str().unwrap_or("unknown").to_string()
}

/// URL for logs, without query parameters that may carry API keys.
fn redacted(url: &Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}

fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Json, Router};
    use serde_json::{json, Value};

    async fn serve(app: Router) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        base_url(&format!("http://{}", addr)).unwrap()
    }

    #[test]
    fn test_base_url_defaults_to_https() {
        assert_eq!(
            base_url("emby.example.com").unwrap().as_str(),
            "https://emby.example.com/"
        );
        assert_eq!(
            base_url("http://radarr.local:7878/api").unwrap().as_str(),
            "http://radarr.local:7878/api/"
        );
    }

    #[test]
    fn test_endpoint_appends_to_base_path() {
        let base = base_url("https://emby.example.com/emby").unwrap();
        assert_eq!(
            endpoint(&base, "Sessions").unwrap().as_str(),
            "https://emby.example.com/emby/Sessions"
        );
        assert_eq!(
            endpoint(&base, "/Items/42/RemoteImages/").unwrap().as_str(),
            "https://emby.example.com/emby/Items/42/RemoteImages/"
        );
    }

    #[test]
    fn test_extract_domain() {
        let url = Url::parse("https://slack.com/api/chat.postMessage").unwrap();
        assert_eq!(extract_domain(&url), "slack.com");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "h");
        assert_eq!(truncate("short", 64), "short");
    }

    #[tokio::test]
    async fn test_get_json_and_api_errors() {
        let app = Router::new()
            .route("/ok", get(|| async { Json(json!({ "answer": 42 })) }))
            .route(
                "/broken",
                get(|| async { (StatusCode::UNAUTHORIZED, "bad token") }),
            )
            .route("/garbage", get(|| async { "not json" }));
        let base = serve(app).await;
        let client = HttpClient::new("test").unwrap();

        let value: Value = client
            .get_json(endpoint(&base, "ok").unwrap(), &[])
            .await
            .unwrap();
        assert_eq!(value["answer"], 42);

        let err = client
            .get_json::<Value>(endpoint(&base, "broken").unwrap(), &[])
            .await
            .unwrap_err();
        match err {
            WarezError::Api {
                service,
                status,
                message,
            } => {
                assert_eq!(service, "test");
                assert_eq!(status, 401);
                assert_eq!(message, "bad token");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = client
            .get_json::<Value>(endpoint(&base, "garbage").unwrap(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, WarezError::Json { .. }));
    }
}
