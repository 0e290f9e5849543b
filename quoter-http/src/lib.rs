//! Small HTTP client shared by the quotes page source and the status client.
//!
//! - JSON and plain-text helpers over one request path
//! - Per-request options: headers, `Auth`, timeout, absolute URLs
//! - Bearer values are sanitized before use and never logged
//! - One attempt per call; failures surface as [`HttpError`] for the caller to map
//! - Optional *raw* request/response logging via `QUOTER_HTTP_RAW=1`
//!
//! Example (no_run):
//! ```rust
//! # async fn demo() -> Result<(), quoter_http::HttpError> {
//! let client = quoter_http::HttpClient::new("https://quotes.example.com/")?;
//! let page = client
//!     .get_text("random", quoter_http::RequestOpts::default())
//!     .await?;
//! assert!(!page.is_empty());
//! # Ok(()) }
//! ```

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::env;
use std::time::{Duration, Instant};
use thiserror::Error;

const RAW_ENV: &str = "QUOTER_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024;
const SNIPPET_MAX: usize = 500;
const USER_AGENT: &str = concat!("quoter/", env!("CARGO_PKG_VERSION"));

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}")]
    Api { status: StatusCode, message: String },
}

/// Authentication strategies understood by [`HttpClient`].
#[derive(Clone, Debug)]
pub enum Auth<'a> {
    /// Authorization: Bearer <token>
    Bearer(&'a str),
}

impl Auth<'_> {
    fn kind(&self) -> &'static str {
        match self {
            Auth::Bearer(_) => "bearer",
        }
    }
}

/// Per-request tuning knobs.
///
/// ```
/// use quoter_http::RequestOpts;
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(10)),
///     allow_absolute: true,
///     ..Default::default()
/// };
/// assert_eq!(opts.timeout.unwrap().as_secs(), 10);
/// assert!(opts.auth.is_none());
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub timeout: Option<Duration>,
    pub auth: Option<Auth<'a>>,
    pub headers: Option<HeaderMap>,
    /// If true and `path` is an absolute URL, use it as-is (ignore base).
    pub allow_absolute: bool,
}

#[derive(Clone)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    pub default_timeout: Duration,
}

impl HttpClient {
    /// Construct a client anchored to a base URL.
    ///
    /// ```
    /// use quoter_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://api.github.com/graphql")?;
    /// assert_eq!(client.default_timeout, Duration::from_secs(10));
    /// assert_eq!(client.base().as_str(), "https://api.github.com/graphql");
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let base = Url::parse(base).map_err(|e| HttpError::Url(e.to_string()))?;
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            default_timeout: Duration::from_secs(10),
        })
    }

    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// GET a body as text (HTML pages and the like).
    pub async fn get_text(&self, path: &str, opts: RequestOpts<'_>) -> Result<String, HttpError> {
        let bytes = self
            .request_bytes::<()>(Method::GET, path, None, &opts)
            .await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// POST a JSON body and decode a JSON response.
    pub async fn post_json_opts<B, T>(
        &self,
        path: &str,
        body: &B,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let bytes = self
            .request_bytes(Method::POST, path, Some(body), &opts)
            .await?;
        decode_json(&bytes)
    }

    fn resolve(&self, path: &str, allow_absolute: bool) -> Result<Url, HttpError> {
        if allow_absolute {
            if let Ok(abs) = Url::parse(path) {
                return Ok(abs);
            }
        }
        self.base
            .join(path)
            .map_err(|e| HttpError::Url(e.to_string()))
    }

    async fn request_bytes<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        opts: &RequestOpts<'_>,
    ) -> Result<Vec<u8>, HttpError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.resolve(path, opts.allow_absolute)?;
        let body_bytes = match body {
            Some(b) => Some(serde_json::to_vec(b).map_err(|e| HttpError::Build(e.to_string()))?),
            None => None,
        };
        let bearer = match &opts.auth {
            Some(Auth::Bearer(tok)) => Some(sanitize_token(tok)?),
            None => None,
        };
        let timeout = opts.timeout.unwrap_or(self.default_timeout);
        let auth_kind = opts.auth.as_ref().map(Auth::kind).unwrap_or("none");
        let req_id = uuid::Uuid::new_v4().simple().to_string();

        let mut rb = self
            .inner
            .request(method.clone(), url.clone())
            .timeout(timeout);
        if let Some(bytes) = &body_bytes {
            rb = rb
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(bytes.clone());
        }
        if let Some(hdrs) = &opts.headers {
            rb = rb.headers(hdrs.clone());
        }
        if let Some(tok) = &bearer {
            rb = rb.bearer_auth(tok);
        }

        tracing::debug!(
            req_id=%req_id,
            method=%method,
            host_path=%format!("{}{}", url.host_str().unwrap_or("-"), url.path()),
            timeout_ms=timeout.as_millis() as u64,
            auth_kind,
            has_body=%body_bytes.is_some(),
            "http.request.start"
        );
        if raw_enabled() {
            let curl = make_curl(&method, &url, opts.headers.as_ref(), body_bytes.as_deref());
            tracing::debug!(target: "http.raw", %req_id, %curl, "request");
        }

        let t0 = Instant::now();
        let sent = match rb.send().await {
            Ok(resp) => {
                let status = resp.status();
                let headers = resp.headers().clone();
                resp.bytes().await.map(|b| (status, headers, b.to_vec()))
            }
            Err(err) => Err(err),
        };
        let (status, headers, bytes) = sent.map_err(|err| {
            let message = err.to_string();
            tracing::warn!(req_id=%req_id, message=%message, "http.network_error");
            HttpError::Network(message)
        })?;

        tracing::debug!(
            req_id=%req_id,
            %status,
            duration_ms=t0.elapsed().as_millis() as u64,
            body_len=bytes.len(),
            "http.response"
        );
        if raw_enabled() {
            let mut raw = bytes.clone();
            let truncated = raw.len() > RAW_MAX_BODY;
            raw.truncate(RAW_MAX_BODY);
            tracing::debug!(
                target: "http.raw",
                %req_id,
                %status,
                headers=?redact_headers(&headers),
                body=%String::from_utf8_lossy(&raw),
                truncated,
                "response"
            );
        }

        if status.is_success() {
            return Ok(bytes);
        }

        let message = extract_error_message(&bytes);
        tracing::warn!(
            req_id=%req_id,
            %status,
            message=%message,
            body_snippet=%snip_body(&bytes),
            "http.error"
        );
        Err(HttpError::Api { status, message })
    }
}

fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, HttpError> {
    serde_json::from_slice::<T>(bytes).map_err(|e| {
        let snippet = snip_body(bytes);
        tracing::warn!(serde_err=%e, body_snippet=%snippet, "http.response.decode_error");
        HttpError::Decode(e.to_string(), snippet)
    })
}

/// Best-effort error text: `{"message": ..}` (GitHub REST style), the first
/// entry of `{"errors": [{"message": ..}]}` (GraphQL style), else a body snippet.
fn extract_error_message(body: &[u8]) -> String {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) else {
        return snip_body(body);
    };
    if let Some(msg) = value.get("message").and_then(|m| m.as_str()) {
        return msg.to_string();
    }
    if let Some(msg) = value
        .get("errors")
        .and_then(|e| e.as_array())
        .and_then(|errs| errs.first())
        .and_then(|first| first.get("message"))
        .and_then(|m| m.as_str())
    {
        return msg.to_string();
    }
    snip_body(body)
}

fn snip_body(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    if text.chars().count() > SNIPPET_MAX {
        let mut snip: String = text.chars().take(SNIPPET_MAX).collect();
        snip.push_str("...");
        snip
    } else {
        text.into_owned()
    }
}

fn sanitize_token(raw: &str) -> Result<String, HttpError> {
    let mut s = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();
    s.retain(|ch| !ch.is_ascii_whitespace());

    if s.is_empty() {
        return Err(HttpError::Build("bearer token is empty".into()));
    }
    if !s.is_ascii() {
        return Err(HttpError::Build("bearer token contains non-ASCII bytes".into()));
    }
    if s.bytes().any(|b| b < 0x20 || b == 0x7F) {
        return Err(HttpError::Build(
            "bearer token contains control characters".into(),
        ));
    }
    HeaderValue::from_str(&format!("Bearer {s}"))
        .map_err(|e| HttpError::Build(format!("invalid Authorization header: {e}")))?;
    Ok(s)
}

fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(k, v)| {
            let key = k.as_str().to_string();
            let val = if key.eq_ignore_ascii_case("authorization") {
                "<redacted>".to_string()
            } else {
                v.to_str().unwrap_or("").to_string()
            };
            (key, val)
        })
        .collect()
}

/// Render a curl command for repro; the auth header is never included.
fn make_curl(method: &Method, url: &Url, headers: Option<&HeaderMap>, body: Option<&[u8]>) -> String {
    let mut parts = vec!["curl".to_string(), format!("-X{method}")];
    if let Some(h) = headers {
        for (name, val) in redact_headers(h) {
            parts.push(format!("-H '{}: {}'", name, val.replace('\'', r"'\''")));
        }
    }
    if let Some(bytes) = body {
        let mut s = String::from_utf8_lossy(bytes).into_owned();
        if s.len() > RAW_MAX_BODY {
            let cut = (0..=RAW_MAX_BODY).rev().find(|i| s.is_char_boundary(*i)).unwrap_or(0);
            s.truncate(cut);
        }
        parts.push(format!("-d '{}'", s.replace('\'', r"'\''")));
    }
    parts.push(format!("'{}'", url.as_str()));
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn sanitize_strips_quotes_and_whitespace() {
        assert_eq!(sanitize_token(" \"ghp_abc\n123\" ").unwrap(), "ghp_abc123");
        assert!(sanitize_token("   ").is_err());
        assert!(sanitize_token("tök").is_err());
    }

    #[test]
    fn error_message_prefers_rest_then_graphql_shape() {
        assert_eq!(
            extract_error_message(br#"{"message":"Bad credentials"}"#),
            "Bad credentials"
        );
        assert_eq!(
            extract_error_message(br#"{"errors":[{"message":"nope"}]}"#),
            "nope"
        );
        assert_eq!(extract_error_message(b"plain failure"), "plain failure");
    }

    #[test]
    fn snippet_is_capped_on_char_boundary() {
        let body = "я".repeat(SNIPPET_MAX + 10);
        let snip = snip_body(body.as_bytes());
        assert!(snip.ends_with("..."));
        assert_eq!(snip.chars().count(), SNIPPET_MAX + 3);
    }

    #[test]
    fn curl_never_contains_authorization_value() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer secret"));
        let url = Url::parse("https://api.github.com/graphql").unwrap();
        let curl = make_curl(&Method::POST, &url, Some(&headers), Some(b"{}"));
        assert!(!curl.contains("secret"));
        assert!(curl.contains("<redacted>"));
    }

    #[tokio::test]
    async fn get_text_returns_page_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/random"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>hi</p>"))
            .mount(&server)
            .await;

        let client = HttpClient::new(&server.uri()).unwrap();
        let body = client.get_text("random", RequestOpts::default()).await.unwrap();
        assert_eq!(body, "<p>hi</p>");
    }

    #[tokio::test]
    async fn post_json_sends_bearer_and_decodes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::new(&server.uri()).unwrap();
        let got: serde_json::Value = client
            .post_json_opts(
                &format!("{}/graphql", server.uri()),
                &serde_json::json!({"query": "{}"}),
                RequestOpts {
                    auth: Some(Auth::Bearer("tok")),
                    allow_absolute: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(got["ok"], true);
    }

    #[tokio::test]
    async fn server_error_is_reported_after_a_single_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({"message": "down"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::new(&server.uri()).unwrap();
        let err = client.get_text("x", RequestOpts::default()).await.unwrap_err();
        match err {
            HttpError::Api { status, message } => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(message, "down");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
