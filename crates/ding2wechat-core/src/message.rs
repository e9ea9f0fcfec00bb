//! Wire types for both sides of the relay
//!
//! Inbound bodies follow the DingTalk robot format:
//! `{"msgtype": "text", "text": {"content": "..."}}` or
//! `{"msgtype": "markdown", "markdown": {"title": "...", "text": "..."}}`.
//!
//! Outbound bodies follow the WeCom group robot format:
//! `{"msgtype": "text", "text": {"content": "...", "mentioned_list": [...]}}` or
//! `{"msgtype": "markdown", "markdown": {"content": "..."}}`.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Inbound DingTalk message as decoded from the request body.
///
/// Decoding is lenient about which payload is present; `translate` checks that
/// the payload matching `msgtype` exists. Extra DingTalk fields such as `at`
/// are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DingTalkMessage {
    pub msgtype: String,
    #[serde(default)]
    pub text: Option<DingTalkText>,
    #[serde(default)]
    pub markdown: Option<DingTalkMarkdown>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DingTalkText {
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DingTalkMarkdown {
    #[serde(default)]
    pub title: Option<String>,
    pub text: String,
}

/// Outbound WeCom message. Exactly one payload exists, selected by the variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeComMessage {
    Text(WeComText),
    Markdown(WeComMarkdown),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WeComText {
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mentioned_list: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mentioned_mobile_list: Vec<String>,
}

/// WeCom markdown messages have no mention support.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WeComMarkdown {
    pub content: String,
}

impl WeComMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(WeComText {
            content: content.into(),
            ..Default::default()
        })
    }

    pub fn markdown(content: impl Into<String>) -> Self {
        Self::Markdown(WeComMarkdown {
            content: content.into(),
        })
    }

    /// Value of the `msgtype` field on the wire
    pub fn msgtype(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Markdown(_) => "markdown",
        }
    }
}

impl Serialize for WeComMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("msgtype", self.msgtype())?;
        match self {
            Self::Text(text) => map.serialize_entry("text", text)?,
            Self::Markdown(markdown) => map.serialize_entry("markdown", markdown)?,
        }
        map.end()
    }
}
