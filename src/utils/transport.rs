use std::fmt;
use std::io::{self, Read};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use thiserror::Error;
use tracing::{debug, warn};

/// Timeout for index pages and HEAD probes.
pub const SHORT_TIMEOUT: Duration = Duration::from_secs(10);
/// Timeout for a full archive transfer.
pub const ARCHIVE_TIMEOUT: Duration = Duration::from_secs(600);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to configure HTTP client: {0}")]
    Config(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} {reason} from {url}")]
    Status {
        url: String,
        status: u16,
        reason: String,
    },

    #[error("failed to read response from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: io::Error,
    },
}

impl TransportError {
    pub fn status(url: &Url, status: u16) -> Self {
        let reason = StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or("")
            .to_string();
        TransportError::Status {
            url: url.to_string(),
            status,
            reason,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, TransportError::Status { status: 404, .. })
    }
}

/// Connection settings fixed when a transport is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportConfig {
    pub proxy: Option<Url>,
    /// Disables certificate and hostname verification. Insecure; opt-in only.
    pub accept_invalid_certs: bool,
}

impl TransportConfig {
    /// The proxy URL with any password masked, for display and logs.
    pub fn redacted_proxy(&self) -> Option<String> {
        self.proxy.as_ref().map(redact)
    }
}

pub fn redact(url: &Url) -> String {
    let mut shown = url.clone();
    if shown.password().is_some() {
        let _ = shown.set_password(Some("***"));
    }
    shown.to_string()
}

/// A streaming response body.
pub struct Body {
    content_length: Option<u64>,
    reader: Box<dyn Read + Send>,
}

impl Body {
    /// A zero content length is treated the same as an absent one.
    pub fn new(reader: impl Read + Send + 'static, content_length: Option<u64>) -> Self {
        Self {
            content_length: content_length.filter(|len| *len > 0),
            reader: Box::new(reader),
        }
    }

    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    pub fn text(mut self, url: &Url) -> Result<String, TransportError> {
        let mut bytes = Vec::new();
        self.reader
            .read_to_end(&mut bytes)
            .map_err(|source| TransportError::Body {
                url: url.to_string(),
                source,
            })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl Read for Body {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

pub trait Transport {
    /// Starts a GET; non-success statuses are errors. The body is not buffered.
    fn get(&self, url: &Url, timeout: Duration) -> Result<Body, TransportError>;

    /// Issues a HEAD and returns the status code, whatever it is.
    fn head(&self, url: &Url) -> Result<u16, TransportError>;
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let mut builder = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")));

        builder = match &config.proxy {
            Some(proxy) => {
                debug!(proxy = %redact(proxy), "Routing HTTP and HTTPS through proxy");
                builder.proxy(reqwest::Proxy::all(proxy.clone()).map_err(TransportError::Config)?)
            }
            // Keep HTTP_PROXY and friends from leaking in.
            None => builder.no_proxy(),
        };

        if config.accept_invalid_certs {
            warn!("TLS certificate and hostname verification is disabled");
            builder = builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }

        let client = builder.build().map_err(TransportError::Config)?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &Url, timeout: Duration) -> Result<Body, TransportError> {
        debug!(%url, ?timeout, "GET");
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .map_err(|source| TransportError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::status(url, status.as_u16()));
        }

        let content_length = response.content_length();
        Ok(Body::new(response, content_length))
    }

    fn head(&self, url: &Url) -> Result<u16, TransportError> {
        debug!(%url, "HEAD");
        let response = self
            .client
            .head(url.clone())
            .timeout(SHORT_TIMEOUT)
            .send()
            .map_err(|source| TransportError::Request {
                url: url.to_string(),
                source,
            })?;
        Ok(response.status().as_u16())
    }
}
