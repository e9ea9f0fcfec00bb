//! Per-target mention injection

use crate::config::Target;
use crate::message::WeComMessage;

/// Copy `base` and attach the target's mentions.
///
/// Only text messages carry mentions. Markdown messages come back unchanged.
pub fn annotate(base: &WeComMessage, target: &Target) -> WeComMessage {
    let mut msg = base.clone();
    if let WeComMessage::Text(text) = &mut msg {
        text.mentioned_list = target.mentioned_list.clone();
        text.mentioned_mobile_list = target.mentioned_mobile_list.clone();
    }
    msg
}
