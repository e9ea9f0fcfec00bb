//! ding2wechat-gateway — HTTP surface for the relay
//!
//! Exposes endpoints:
//! - POST /receiver?name=<receiver>  — accept a DingTalk message and fan it out
//! - GET  /                          — index page listing the receivers

pub mod error;
pub mod index;
pub mod server;

pub use error::RelayError;
pub use server::{GatewayServer, GatewayState, relay, router};
