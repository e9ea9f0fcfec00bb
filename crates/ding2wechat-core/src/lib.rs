//! ding2wechat-core - DingTalk to WeCom webhook relay
//!
//! This crate provides:
//! - Receiver/target configuration loaded from YAML, with duplicate-name checks
//! - Translation from DingTalk robot messages to WeCom robot messages
//! - Per-target mention injection
//! - Best-effort sequential fanout over a pluggable webhook transport

pub mod annotate;
pub mod config;
pub mod dispatch;
pub mod message;
pub mod transport;
pub mod translate;

// Re-export main types for convenience
pub use annotate::annotate;
pub use config::{Config, LoadError, Receiver, Target};
pub use dispatch::{DispatchError, DispatchReport, Dispatcher, TargetOutcome, TargetReport};
pub use message::{DingTalkMessage, WeComMarkdown, WeComMessage, WeComText};
pub use transport::{DEFAULT_TIMEOUT, HttpTransport, WebhookResponse, WebhookTransport};
pub use translate::{TranslationError, translate};
