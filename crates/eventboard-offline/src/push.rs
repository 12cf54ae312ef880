//! Push payloads and notification clicks.

use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_TITLE: &str = "Community Event Board";
pub const DEFAULT_BODY: &str = "You have a new update from Community Event Board.";
pub const DEFAULT_URL: &str = "/";

/// Push message data. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PushPayload {
    pub title: Option<String>,
    pub body: Option<String>,
    pub url: Option<String>,
}

impl PushPayload {
    /// Parses raw push data. Data that is not a JSON object is shown as the
    /// notification body.
    pub fn parse(data: Option<&[u8]>) -> Self {
        let Some(data) = data.filter(|d| !d.is_empty()) else {
            return Self::default();
        };

        serde_json::from_slice(data).unwrap_or_else(|_| {
            let text = String::from_utf8_lossy(data).trim().to_string();
            Self {
                body: Some(text).filter(|t| !t.is_empty()),
                ..Self::default()
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// Origin-relative or absolute target opened on click.
    pub url: String,
}

impl From<PushPayload> for Notification {
    fn from(payload: PushPayload) -> Self {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Self {
            title: non_empty(payload.title).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            body: non_empty(payload.body).unwrap_or_else(|| DEFAULT_BODY.to_string()),
            url: non_empty(payload.url).unwrap_or_else(|| DEFAULT_URL.to_string()),
        }
    }
}

impl Notification {
    /// Absolute URL to open on click. Targets on another origin, or that do
    /// not parse, open the origin root instead.
    pub fn click_target(&self, origin: &Url) -> Url {
        match origin.join(&self.url) {
            Ok(url) if url.origin() == origin.origin() => url,
            _ => origin.join(DEFAULT_URL).unwrap_or_else(|_| origin.clone()),
        }
    }
}
