use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// Logical scheme advertised by simplerpc channels.
pub const SIMPLE_SCHEME: &str = "simple";

/// Scheme of the canonical resolved address form.
pub const CANONICAL_SCHEME: &str = "tcp";

const SCHEME_SEPARATOR: &str = "://";

/// A parsed `scheme://host:port/objectURI` endpoint.
///
/// Immutable once parsed. The object URI is absent for bare channel addresses
/// such as `tcp://host:port`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    scheme: String,
    host: String,
    port: u16,
    object_uri: Option<String>,
}

impl Endpoint {
    /// Build an endpoint from parts.
    pub fn new(scheme: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            port,
            object_uri: None,
        }
    }

    /// Attach an object URI. An empty string clears it.
    pub fn with_object_uri(mut self, object_uri: impl Into<String>) -> Self {
        let object_uri = object_uri.into();
        self.object_uri = (!object_uri.is_empty()).then_some(object_uri);
        self
    }

    /// Parse `scheme://host:port[/objectURI]`.
    ///
    /// IPv6 hosts must be bracketed (`tcp://[::1]:9000`). Any other shape,
    /// including a missing port or scheme separator, yields a [`ParseError`].
    pub fn parse(url: &str) -> Result<Self, ParseError> {
        let (scheme, rest) = url
            .split_once(SCHEME_SEPARATOR)
            .ok_or_else(|| ParseError::MissingScheme(url.to_string()))?;
        if scheme.is_empty() {
            return Err(ParseError::EmptyScheme(url.to_string()));
        }

        let (authority, path) = match rest.split_once('/') {
            Some((authority, path)) => (authority, path),
            None => (rest, ""),
        };

        let (host, port) = split_authority(url, authority)?;
        if host.is_empty() {
            return Err(ParseError::EmptyHost(url.to_string()));
        }
        if port.is_empty() {
            return Err(ParseError::MissingPort(url.to_string()));
        }
        let port = port.parse::<u16>().map_err(|_| ParseError::InvalidPort {
            url: url.to_string(),
            port: port.to_string(),
        })?;

        Ok(Self::new(scheme, host, port).with_object_uri(path))
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Object URI on the remote side, if any.
    pub fn object_uri(&self) -> Option<&str> {
        self.object_uri.as_deref()
    }

    /// Canonical channel address (`tcp://host:port`) regardless of scheme.
    pub fn canonical(&self) -> String {
        canonicalize(&self.host, self.port)
    }

    /// `host:port` form suitable for `TcpStream::connect`.
    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", render_host(&self.host), self.port)
    }

    /// Logical URL, keeping the original scheme and object URI.
    pub fn to_url(&self) -> String {
        let mut url = format!(
            "{}{SCHEME_SEPARATOR}{}:{}",
            self.scheme,
            render_host(&self.host),
            self.port
        );
        if let Some(uri) = &self.object_uri {
            url.push('/');
            url.push_str(uri);
        }
        url
    }
}

/// Render the canonical address form. Always `tcp://`, even for endpoints
/// advertised under another scheme.
pub fn canonicalize(host: &str, port: u16) -> String {
    format!("{CANONICAL_SCHEME}{SCHEME_SEPARATOR}{}:{port}", render_host(host))
}

fn render_host(host: &str) -> String {
    if host.contains(':') {
        format!("[{host}]")
    } else {
        host.to_string()
    }
}

fn split_authority<'a>(url: &str, authority: &'a str) -> Result<(&'a str, &'a str), ParseError> {
    if let Some(bracketed) = authority.strip_prefix('[') {
        let (host, after) = bracketed
            .split_once(']')
            .ok_or_else(|| ParseError::EmptyHost(url.to_string()))?;
        let port = after
            .strip_prefix(':')
            .ok_or_else(|| ParseError::MissingPort(url.to_string()))?;
        return Ok((host, port));
    }

    authority
        .split_once(':')
        .ok_or_else(|| ParseError::MissingPort(url.to_string()))
}

impl FromStr for Endpoint {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_url())
    }
}
