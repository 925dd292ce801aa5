//! Server status value model
//!
//! A [`Status`] is built once per successful query, by either the modern
//! (JSON) or the legacy (NUL-separated fields) provider, and is read-only
//! afterwards.
//!
//! # JSON shape
//!
//! ```text
//! {
//!   "version": {"name": "1.20.4", "protocol": 765},
//!   "players": {"online": 3, "max": 20, "sample": [{"name": "...", "id": "..."}]},
//!   "description": "A Minecraft Server" | {"text": "...", "extra": [...]},
//!   "favicon": "data:image/png;base64,...",
//!   "ping": 42
//! }
//! ```

use crate::data_url::DataUrl;
use crate::Result;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Duration;

/// Game version reported by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub name: String,
    pub protocol: i32,
}

/// One entry of the player sample list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSample {
    pub name: String,
    pub id: String,
}

/// Player counts plus the optional sample of online players
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Players {
    pub online: i32,
    pub max: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample: Option<Vec<PlayerSample>>,
}

/// Server description (MOTD)
///
/// Old servers and the legacy protocol send a flat string with `§` formatting
/// codes; newer servers send a structured chat component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Description {
    Legacy(String),
    Structured(serde_json::Value),
}

impl Description {
    /// Flatten to plain text with all formatting codes removed
    pub fn to_plain_text(&self) -> String {
        let raw = match self {
            Description::Legacy(text) => text.clone(),
            Description::Structured(value) => {
                let mut out = String::new();
                flatten_component(value, &mut out);
                out
            }
        };
        strip_formatting(&raw)
    }
}

fn flatten_component(value: &serde_json::Value, out: &mut String) {
    use serde_json::Value;

    match value {
        Value::String(text) => out.push_str(text),
        Value::Array(parts) => parts.iter().for_each(|part| flatten_component(part, out)),
        Value::Object(map) => {
            match (map.get("text"), map.get("translate")) {
                (Some(Value::String(text)), _) => out.push_str(text),
                (_, Some(Value::String(key))) => out.push_str(key),
                _ => {}
            }
            if let Some(extra) = map.get("extra") {
                flatten_component(extra, out);
            }
        }
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Null => {}
    }
}

/// Remove `§x` formatting sequences
pub fn strip_formatting(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '§' {
            chars.next();
        } else {
            out.push(c);
        }
    }
    out
}

/// Status as sent by the server, before the client measured the ping
#[derive(Debug, Deserialize)]
struct StatusResponse {
    version: Version,
    players: Players,
    description: Description,
    #[serde(default, deserialize_with = "lenient_favicon")]
    favicon: Option<DataUrl>,
}

/// A broken icon must not invalidate an otherwise good status
fn lenient_favicon<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<DataUrl>, D::Error> {
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(s)) => DataUrl::decode(&s).ok(),
        _ => None,
    })
}

fn ping_millis<S: Serializer>(ping: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(ping.as_millis() as u64)
}

/// Complete result of one status query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Status {
    version: Version,
    players: Players,
    description: Description,
    #[serde(skip_serializing_if = "Option::is_none")]
    favicon: Option<DataUrl>,
    #[serde(serialize_with = "ping_millis")]
    ping: Duration,
}

impl Status {
    pub fn new(
        version: Version,
        players: Players,
        description: Description,
        favicon: Option<DataUrl>,
        ping: Duration,
    ) -> Self {
        Self {
            version,
            players,
            description,
            favicon,
            ping,
        }
    }

    /// Build a status from a modern status-response body
    ///
    /// `version`, `players` and `description` are required; anything missing
    /// or mistyped is a format error.
    pub fn from_json(json: &str, ping: Duration) -> Result<Self> {
        let response: StatusResponse = serde_json::from_str(json)?;
        Ok(Self::new(
            response.version,
            response.players,
            response.description,
            response.favicon,
            ping,
        ))
    }

    /// Serialize to the status JSON shape, with `ping` in milliseconds
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn players(&self) -> &Players {
        &self.players
    }

    pub fn description(&self) -> &Description {
        &self.description
    }

    pub fn favicon(&self) -> Option<&DataUrl> {
        self.favicon.as_ref()
    }

    /// Icon bytes when the server sent a PNG favicon
    pub fn favicon_png(&self) -> Option<&[u8]> {
        self.favicon
            .as_ref()
            .filter(|url| url.mime() == "image/png" && !url.data().is_empty())
            .map(DataUrl::data)
    }

    pub fn ping(&self) -> Duration {
        self.ping
    }
}
