//! DingTalk → WeCom message translation

use thiserror::Error;

use crate::message::{DingTalkMessage, WeComMessage};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslationError {
    #[error("malformed dingtalk body: missing {0} field")]
    MissingField(&'static str),

    #[error("unknown msgtype: {0}")]
    UnknownType(String),
}

/// Translate an inbound DingTalk message into the WeCom template message.
///
/// Text messages come out without mentions; those are filled in per target by
/// [`crate::annotate::annotate`].
pub fn translate(source: &DingTalkMessage) -> Result<WeComMessage, TranslationError> {
    match source.msgtype.as_str() {
        "text" => {
            let text = source
                .text
                .as_ref()
                .ok_or(TranslationError::MissingField("text"))?;
            Ok(WeComMessage::text(text.content.clone()))
        }
        "markdown" => {
            let markdown = source
                .markdown
                .as_ref()
                .ok_or(TranslationError::MissingField("markdown"))?;
            Ok(WeComMessage::markdown(markdown.text.clone()))
        }
        other => Err(TranslationError::UnknownType(other.to_string())),
    }
}
