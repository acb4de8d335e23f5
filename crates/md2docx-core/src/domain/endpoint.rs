//! Backend network endpoint.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// Where the conversion backend is listening.
///
/// Built once the backend's actual port is known. There are no setters:
/// a restarted backend gets a fresh `ServerEndpoint`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerEndpoint {
    host: String,
    port: u16,
    base_url: String,
}

impl ServerEndpoint {
    /// Create an endpoint for `host:port`, deriving `http://host:port` as the base URL.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        let base_url = format!("http://{host}:{port}");
        Self {
            host,
            port,
            base_url,
        }
    }

    /// Endpoint for an existing `http://host[:port]` URL.
    ///
    /// The port defaults to 80 when absent. Query and fragment are ignored.
    /// Returns `None` for other schemes or a URL with a path, since API
    /// paths are joined onto the authority.
    pub fn parse(base_url: &str) -> Option<Self> {
        let url = Url::parse(base_url.trim()).ok()?;
        if url.scheme() != "http" || url.path() != "/" {
            return None;
        }
        let host = url.host_str().filter(|h| !h.is_empty())?;
        let port = url.port_or_known_default()?;
        Some(Self::new(host, port))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Base URL without a trailing slash, e.g. `http://localhost:8081`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join an absolute API path (`/api/config`) onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl fmt::Display for ServerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_url)
    }
}
