use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, Proxy, Url};
use serde::Serialize;
use tokio::runtime::Runtime;

use crate::config::TransportConfig;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("http client setup failed: {0}")]
    Client(String),
    #[error("http runtime unavailable: {0}")]
    Runtime(String),
    #[error("request to {target} failed: {source}")]
    Request {
        target: String,
        source: reqwest::Error,
    },
    #[error("{target} responded with HTTP {status}")]
    Status { target: String, status: u16 },
}

/// Blocking facade over an async `reqwest` client.
///
/// The watcher runs strictly sequentially, so every call drives its future
/// to completion on a private runtime.
pub struct HttpTransport {
    client: Client,
    runtime: Runtime,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("ja,en-US;q=0.7,en;q=0.3"));

        let mut builder = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .default_headers(headers);

        if let Some(proxy_url) = &config.proxy_url {
            let proxy =
                Proxy::all(proxy_url).map_err(|err| TransportError::Client(err.to_string()))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|err| TransportError::Client(err.to_string()))?;
        let runtime = Runtime::new().map_err(|err| TransportError::Runtime(err.to_string()))?;

        Ok(Self { client, runtime })
    }

    /// GET a page and decode the body as UTF-8 regardless of the declared charset.
    pub fn get_text(&self, url: &str) -> Result<String, TransportError> {
        let target = redact(url);
        self.runtime.block_on(async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|source| request_error(&target, source))?;
            let response = check_status(&target, response)?;
            let bytes = response
                .bytes()
                .await
                .map_err(|source| request_error(&target, source))?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        })
    }

    pub fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<(), TransportError> {
        let target = redact(url);
        self.runtime.block_on(async {
            let response = self
                .client
                .post(url)
                .form(form)
                .send()
                .await
                .map_err(|source| request_error(&target, source))?;
            check_status(&target, response).map(|_| ())
        })
    }

    pub fn post_json<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<(), TransportError> {
        let target = redact(url);
        self.runtime.block_on(async {
            let response = self
                .client
                .post(url)
                .json(body)
                .send()
                .await
                .map_err(|source| request_error(&target, source))?;
            check_status(&target, response).map(|_| ())
        })
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport").finish_non_exhaustive()
    }
}

fn check_status(
    target: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(TransportError::Status {
            target: target.to_string(),
            status: status.as_u16(),
        })
    }
}

fn request_error(target: &str, source: reqwest::Error) -> TransportError {
    TransportError::Request {
        target: target.to_string(),
        source: source.without_url(),
    }
}

/// Scheme and host only; webhook paths carry credentials.
pub(crate) fn redact(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => format!("{}://{}", parsed.scheme(), host),
            None => parsed.scheme().to_string(),
        },
        Err(_) => "<invalid url>".to_string(),
    }
}
