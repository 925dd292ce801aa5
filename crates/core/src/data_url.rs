//! `data:` URL codec
//!
//! Used to carry the server icon inside the status JSON:
//!
//! ```text
//! data:[type/subtype][;charset=<name>][;param=value...][;base64],<payload>
//! ```
//!
//! The encoder leaves out the default media type (`text/plain`) and the
//! default charset (`US-ASCII`). The decoder is lenient: a missing comma,
//! missing type and unknown parameters are all accepted, and a body with
//! broken percent- or base64-encoding decodes to an empty payload instead of
//! failing the whole URL.

use crate::{Result, StatusError};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Media type assumed when a URL does not name one
pub const DEFAULT_MIME: &str = "text/plain";

/// Charset assumed for text payloads when none is given
pub const DEFAULT_CHARSET: &str = "US-ASCII";

const SCHEME: &str = "data:";
const BASE64_MARKER: &str = "base64";

/// A decoded `data:` URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    /// Lower-cased `type/subtype` essence
    mime: String,

    /// Parameters other than `base64`, keys lower-cased
    params: BTreeMap<String, String>,

    /// Raw payload bytes
    data: Vec<u8>,
}

impl DataUrl {
    pub fn new(mime: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        let mime = mime.into().trim().to_ascii_lowercase();
        Self {
            mime: if mime.is_empty() { DEFAULT_MIME.to_string() } else { mime },
            params: BTreeMap::new(),
            data: data.into(),
        }
    }

    /// Convenience constructor for a PNG image
    pub fn png(data: impl Into<Vec<u8>>) -> Self {
        Self::new("image/png", data)
    }

    /// Add a parameter (e.g. `charset`)
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Charset of a text payload, falling back to `US-ASCII`
    pub fn charset(&self) -> &str {
        self.params
            .get("charset")
            .map(String::as_str)
            .unwrap_or(DEFAULT_CHARSET)
    }

    /// Encode into URL form
    pub fn encode(&self) -> String {
        let mut out = String::from(SCHEME);

        if self.mime != DEFAULT_MIME {
            out.push_str(&self.mime);
        }

        for (key, value) in &self.params {
            if key == "charset" && value.eq_ignore_ascii_case(DEFAULT_CHARSET) {
                continue;
            }
            out.push(';');
            out.push_str(key);
            out.push('=');
            out.push_str(value);
        }

        if self.mime.starts_with("text/") {
            out.push(',');
            percent_encode(&self.data, &mut out);
        } else {
            out.push(';');
            out.push_str(BASE64_MARKER);
            out.push(',');
            out.push_str(&STANDARD.encode(&self.data));
        }

        out
    }

    /// Decode a URL string
    ///
    /// Only a missing `data:` scheme is an error; everything after it is
    /// parsed leniently.
    pub fn decode(input: &str) -> Result<Self> {
        let input = input.trim();
        let rest = match input.get(..SCHEME.len()) {
            Some(scheme) if scheme.eq_ignore_ascii_case(SCHEME) => &input[SCHEME.len()..],
            _ => {
                return Err(StatusError::format(format!(
                    "Not a data URL: {}",
                    truncate(input, 32)
                )))
            }
        };

        let (header, body) = match rest.find(',') {
            Some(pos) => (&rest[..pos], &rest[pos + 1..]),
            None => (rest, ""),
        };

        let mut mime = DEFAULT_MIME.to_string();
        let mut params = BTreeMap::new();
        let mut base64 = false;

        for (index, segment) in header.split(';').enumerate() {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }

            if index == 0 && segment.contains('/') {
                mime = segment.to_ascii_lowercase();
            } else if segment.eq_ignore_ascii_case(BASE64_MARKER) {
                base64 = true;
            } else if let Some(eq) = segment.find('=') {
                let key = segment[..eq].trim().to_ascii_lowercase();
                let value = segment[eq + 1..].trim().to_string();
                params.insert(key, value);
            }
            // Anything else is an unknown flag; ignored
        }

        let data = if base64 {
            decode_base64_body(body)
        } else {
            percent_decode(body).unwrap_or_default()
        };

        Ok(Self { mime, params, data })
    }
}

impl Default for DataUrl {
    fn default() -> Self {
        Self::new(DEFAULT_MIME, Vec::new())
    }
}

impl fmt::Display for DataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for DataUrl {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self> {
        Self::decode(s)
    }
}

impl Serialize for DataUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for DataUrl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        DataUrl::decode(&s).map_err(serde::de::Error::custom)
    }
}

fn decode_base64_body(body: &str) -> Vec<u8> {
    // Bodies may themselves be percent-escaped and are often line-wrapped
    let Some(raw) = percent_decode(body) else {
        return Vec::new();
    };
    let compact: Vec<u8> = raw.into_iter().filter(|b| !b.is_ascii_whitespace()).collect();
    STANDARD.decode(compact).unwrap_or_default()
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~')
}

fn percent_encode(data: &[u8], out: &mut String) {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    for &b in data {
        if is_unreserved(b) {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0x0F) as usize] as char);
        }
    }
}

/// Returns `None` on a truncated or non-hex escape
fn percent_decode(input: &str) -> Option<Vec<u8>> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hi = hex_value(*bytes.get(i + 1)?)?;
            let lo = hex_value(*bytes.get(i + 2)?)?;
            out.push((hi << 4) | lo);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    Some(out)
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1x1 transparent PNG
    const PNG_BASE64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    #[test]
    fn test_empty_url() {
        let url = DataUrl::decode("data:").unwrap();
        assert_eq!(url.mime(), DEFAULT_MIME);
        assert_eq!(url.charset(), DEFAULT_CHARSET);
        assert!(url.data().is_empty());
    }

    #[test]
    fn test_plain_text() {
        let url = DataUrl::decode("data:,A%20brief%20note").unwrap();
        assert_eq!(url.mime(), "text/plain");
        assert_eq!(url.data(), b"A brief note");

        let again = DataUrl::decode(&url.encode()).unwrap();
        assert_eq!(again, url);
    }

    #[test]
    fn test_png_body() {
        let url = DataUrl::decode(&format!("data:image/png;base64,{}", PNG_BASE64)).unwrap();
        assert_eq!(url.mime(), "image/png");
        assert_eq!(&url.data()[1..4], b"PNG");

        let encoded = url.encode();
        assert_eq!(encoded, format!("data:image/png;base64,{}", PNG_BASE64));
        assert_eq!(DataUrl::decode(&encoded).unwrap(), url);
    }

    #[test]
    fn test_encoder_omits_defaults() {
        let url = DataUrl::new("text/plain", b"hi".to_vec()).with_param("charset", "us-ascii");
        assert_eq!(url.encode(), "data:,hi");

        let url = DataUrl::new("text/plain", b"hi".to_vec()).with_param("charset", "utf-8");
        assert_eq!(url.encode(), "data:;charset=utf-8,hi");
        let decoded = DataUrl::decode("data:;charset=utf-8,hi").unwrap();
        assert_eq!(decoded.charset(), "utf-8");
        assert_eq!(decoded.mime(), DEFAULT_MIME);
    }

    #[test]
    fn test_lenient_header() {
        // No comma at all
        let url = DataUrl::decode("data:image/gif").unwrap();
        assert_eq!(url.mime(), "image/gif");
        assert!(url.data().is_empty());

        // Unknown flag and parameter are tolerated
        let url = DataUrl::decode("data:text/html;foo;bar=baz,%3Cp%3E").unwrap();
        assert_eq!(url.mime(), "text/html");
        assert_eq!(url.params().get("bar").map(String::as_str), Some("baz"));
        assert_eq!(url.data(), b"<p>");
    }

    #[test]
    fn test_malformed_body_is_empty() {
        let url = DataUrl::decode("data:image/png;base64,!!!not-base64!!!").unwrap();
        assert_eq!(url.mime(), "image/png");
        assert!(url.data().is_empty());

        let url = DataUrl::decode("data:,broken%2").unwrap();
        assert!(url.data().is_empty());

        let url = DataUrl::decode("data:,bad%zzescape").unwrap();
        assert!(url.data().is_empty());
    }

    #[test]
    fn test_wrapped_base64() {
        let wrapped = format!("data:image/png;base64,{}\n{}", &PNG_BASE64[..20], &PNG_BASE64[20..]);
        let url = DataUrl::decode(&wrapped).unwrap();
        assert_eq!(url.data(), STANDARD.decode(PNG_BASE64).unwrap().as_slice());
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert!(DataUrl::decode("http://example.com/icon.png").is_err());
        assert!(DataUrl::decode("").is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let url = DataUrl::png(vec![1u8, 2, 3]);
        let json = serde_json::to_string(&url).unwrap();
        assert_eq!(json, "\"data:image/png;base64,AQID\"");
        let back: DataUrl = serde_json::from_str(&json).unwrap();
        assert_eq!(back, url);
    }
}
