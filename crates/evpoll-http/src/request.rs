//! HTTP/1.0 request parsing.
//!
//! Wire shape:
//!
//! ```text
//! GET /hello.txt HTTP/1.0\r\n
//! User-Agent: TestClient\r\n
//! \r\n
//! [optional body]
//! ```
//!
//! Headers keep their wire order in a list; lookup is case-insensitive
//! on the name. Malformed input yields a [`ParseError`], never a panic.

use std::fmt;

/// One `Name: Value` pair, wire order preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// A parsed HTTP/1.0 request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub version: String,
    pub headers: Vec<Header>,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Not even the request line terminator arrived.
    MissingRequestLine,
    /// Request line is not `METHOD SP PATH SP VERSION`.
    InvalidRequestLine,
    /// Request line or headers are not valid UTF-8.
    InvalidEncoding,
    /// A header line has no `:` separator.
    InvalidHeader(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRequestLine => write!(f, "missing request line"),
            Self::InvalidRequestLine => write!(f, "invalid request line"),
            Self::InvalidEncoding => write!(f, "request is not valid UTF-8"),
            Self::InvalidHeader(line) => write!(f, "invalid header: {}", line),
        }
    }
}

impl std::error::Error for ParseError {}

impl Request {
    /// Parse one request from raw bytes.
    pub fn parse(raw: &[u8]) -> Result<Self, ParseError> {
        let (first_line, rest) =
            split_once(raw, b"\r\n").ok_or(ParseError::MissingRequestLine)?;

        let first_line =
            std::str::from_utf8(first_line).map_err(|_| ParseError::InvalidEncoding)?;
        let mut tokens = first_line.split(' ').filter(|t| !t.is_empty());
        let method = tokens.next().ok_or(ParseError::InvalidRequestLine)?;
        let path = tokens.next().ok_or(ParseError::InvalidRequestLine)?;
        let version = tokens.next().ok_or(ParseError::InvalidRequestLine)?;
        if tokens.next().is_some() {
            return Err(ParseError::InvalidRequestLine);
        }

        let (header_block, body) = match split_once(rest, b"\r\n\r\n") {
            Some((headers, body)) => (headers, body),
            // No blank-line separator: everything left is headers.
            None => (rest.strip_suffix(b"\r\n").unwrap_or(rest), &[][..]),
        };

        let mut headers = Vec::new();
        let header_block =
            std::str::from_utf8(header_block).map_err(|_| ParseError::InvalidEncoding)?;
        for line in header_block.split("\r\n") {
            if line.is_empty() {
                continue;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| ParseError::InvalidHeader(line.to_string()))?;
            headers.push(Header {
                name: name.trim().to_string(),
                value: value.trim().to_string(),
            });
        }

        Ok(Request {
            method: method.to_string(),
            path: path.to_string(),
            version: version.to_string(),
            headers,
            body: body.to_vec(),
        })
    }

    /// First header value matching `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }
}

/// Byte-slice analogue of `str::split_once`.
fn split_once<'a>(haystack: &'a [u8], sep: &[u8]) -> Option<(&'a [u8], &'a [u8])> {
    haystack
        .windows(sep.len())
        .position(|w| w == sep)
        .map(|pos| (&haystack[..pos], &haystack[pos + sep.len()..]))
}
