//! Fanout of a translated message to every target of a receiver
//!
//! Delivery is best-effort: each target gets exactly one attempt, in list
//! order, and a failure on one target never stops the others. The caller gets
//! a [`DispatchReport`] but the receiver endpoint does not surface it.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::annotate::annotate;
use crate::config::{Receiver, Target};
use crate::message::WeComMessage;
use crate::transport::{HttpTransport, WebhookResponse, WebhookTransport};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to send webhook request: {0:#}")]
    Send(anyhow::Error),
}

/// What happened to one target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOutcome {
    /// The webhook answered with a 2xx status
    Delivered { status: u16 },
    /// The webhook answered with a non-2xx status
    Rejected { status: u16 },
    /// Encoding or transport failed before a response arrived
    Failed { error: String },
}

impl fmt::Display for TargetOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delivered { status } => write!(f, "delivered ({})", status),
            Self::Rejected { status } => write!(f, "rejected ({})", status),
            Self::Failed { error } => write!(f, "failed: {}", error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetReport {
    /// Target URL with the webhook key masked
    pub url: String,
    pub outcome: TargetOutcome,
}

/// Per-target outcomes of one dispatch, in target order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub targets: Vec<TargetReport>,
}

impl DispatchReport {
    pub fn attempted(&self) -> usize {
        self.targets.len()
    }

    pub fn delivered(&self) -> usize {
        self.targets
            .iter()
            .filter(|t| matches!(t.outcome, TargetOutcome::Delivered { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.attempted() - self.delivered()
    }
}

/// Sends annotated copies of a message to a receiver's targets
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn WebhookTransport>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn WebhookTransport>) -> Self {
        Self { transport }
    }

    /// Dispatcher over a pooled `reqwest` client with the default timeout
    pub fn http() -> anyhow::Result<Self> {
        Ok(Self::new(Arc::new(HttpTransport::new()?)))
    }

    /// Send `base` to every target of `receiver`, one at a time.
    ///
    /// Never fails: per-target errors are logged and recorded in the report.
    pub async fn dispatch(&self, receiver: &Receiver, base: &WeComMessage) -> DispatchReport {
        let mut report = DispatchReport::default();

        for target in &receiver.targets {
            let url = target.redacted_url();
            let outcome = match self.send_to(base, target).await {
                Ok(resp) if resp.is_success() => {
                    debug!("Webhook {} responded {}: {}", url, resp.status, resp.body);
                    TargetOutcome::Delivered { status: resp.status }
                }
                Ok(resp) => {
                    warn!("Webhook {} responded {}: {}", url, resp.status, resp.body);
                    TargetOutcome::Rejected { status: resp.status }
                }
                Err(e) => {
                    error!("Unable to deliver to webhook {}: {}", url, e);
                    TargetOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            report.targets.push(TargetReport { url, outcome });
        }

        info!(
            "Dispatched to receiver '{}': {}/{} delivered",
            receiver.name,
            report.delivered(),
            report.attempted()
        );
        report
    }

    async fn send_to(
        &self,
        base: &WeComMessage,
        target: &Target,
    ) -> Result<WebhookResponse, DispatchError> {
        let msg = annotate(base, target);
        let body = serde_json::to_vec(&msg)?;
        debug!(
            "Sending webhook request to {}: {}",
            target.redacted_url(),
            String::from_utf8_lossy(&body)
        );
        self.transport
            .post_json(&target.url, body)
            .await
            .map_err(DispatchError::Send)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Records every POST and answers from a per-URL script
    #[derive(Default)]
    struct ScriptedTransport {
        sent: Mutex<Vec<(String, Value)>>,
        statuses: HashMap<String, u16>,
        unreachable: Vec<String>,
    }

    impl ScriptedTransport {
        fn sent(&self) -> Vec<(String, Value)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl WebhookTransport for ScriptedTransport {
        async fn post_json(&self, url: &str, body: Vec<u8>) -> anyhow::Result<WebhookResponse> {
            let value: Value = serde_json::from_slice(&body)?;
            self.sent.lock().unwrap().push((url.to_string(), value));
            if self.unreachable.iter().any(|u| u == url) {
                return Err(anyhow!("connection refused"));
            }
            let status = self.statuses.get(url).copied().unwrap_or(200);
            Ok(WebhookResponse {
                status,
                body: r#"{"errcode":0}"#.to_string(),
            })
        }
    }

    fn receiver(targets: Vec<Target>) -> Receiver {
        Receiver {
            name: "r1".to_string(),
            targets,
        }
    }

    fn target_with_mentions(url: &str, mentioned: &[&str]) -> Target {
        Target {
            mentioned_list: mentioned.iter().map(|s| s.to_string()).collect(),
            ..Target::new(url)
        }
    }

    #[tokio::test]
    async fn test_dispatch_fans_out_in_order() {
        let transport = Arc::new(ScriptedTransport::default());
        let dispatcher = Dispatcher::new(transport.clone());
        let receiver = receiver(vec![
            target_with_mentions("http://t1/hook", &["alice"]),
            target_with_mentions("http://t2/hook", &[]),
        ]);

        let report = dispatcher
            .dispatch(&receiver, &WeComMessage::text("ping"))
            .await;

        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, "http://t1/hook");
        assert_eq!(
            sent[0].1,
            json!({"msgtype": "text", "text": {"content": "ping", "mentioned_list": ["alice"]}})
        );
        assert_eq!(sent[1].0, "http://t2/hook");
        assert_eq!(sent[1].1, json!({"msgtype": "text", "text": {"content": "ping"}}));

        assert_eq!(report.attempted(), 2);
        assert_eq!(report.delivered(), 2);
        assert_eq!(report.failed(), 0);
    }

    #[tokio::test]
    async fn test_dispatch_continues_after_failure() {
        let transport = Arc::new(ScriptedTransport {
            unreachable: vec!["http://t1/hook".to_string()],
            ..Default::default()
        });
        let dispatcher = Dispatcher::new(transport.clone());
        let receiver = receiver(vec![
            target_with_mentions("http://t1/hook", &["alice"]),
            target_with_mentions("http://t2/hook", &[]),
        ]);

        let report = dispatcher
            .dispatch(&receiver, &WeComMessage::text("ping"))
            .await;

        assert_eq!(transport.sent().len(), 2);
        assert!(matches!(
            report.targets[0].outcome,
            TargetOutcome::Failed { ref error } if error.contains("connection refused")
        ));
        assert_eq!(
            report.targets[1].outcome,
            TargetOutcome::Delivered { status: 200 }
        );
        assert_eq!(report.failed(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_non_success_status_does_not_abort() {
        let mut statuses = HashMap::new();
        statuses.insert("http://t1/hook".to_string(), 503);
        let transport = Arc::new(ScriptedTransport {
            statuses,
            ..Default::default()
        });
        let dispatcher = Dispatcher::new(transport.clone());
        let receiver = receiver(vec![Target::new("http://t1/hook"), Target::new("http://t2/hook")]);

        let report = dispatcher
            .dispatch(&receiver, &WeComMessage::markdown("# hi"))
            .await;

        assert_eq!(transport.sent().len(), 2);
        assert_eq!(report.targets[0].outcome, TargetOutcome::Rejected { status: 503 });
        assert_eq!(report.targets[1].outcome, TargetOutcome::Delivered { status: 200 });
        assert_eq!(report.delivered(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_markdown_carries_no_mentions() {
        let transport = Arc::new(ScriptedTransport::default());
        let dispatcher = Dispatcher::new(transport.clone());
        let receiver = receiver(vec![target_with_mentions("http://t1/hook", &["alice"])]);

        dispatcher
            .dispatch(&receiver, &WeComMessage::markdown("# hi"))
            .await;

        let sent = transport.sent();
        assert_eq!(sent[0].1, json!({"msgtype": "markdown", "markdown": {"content": "# hi"}}));
    }

    #[tokio::test]
    async fn test_dispatch_no_targets() {
        let transport = Arc::new(ScriptedTransport::default());
        let dispatcher = Dispatcher::new(transport.clone());

        let report = dispatcher
            .dispatch(&receiver(vec![]), &WeComMessage::text("ping"))
            .await;

        assert!(transport.sent().is_empty());
        assert_eq!(report, DispatchReport::default());
    }

    #[tokio::test]
    async fn test_report_masks_webhook_key() {
        let transport = Arc::new(ScriptedTransport::default());
        let dispatcher = Dispatcher::new(transport.clone());
        let url = "https://qyapi.weixin.qq.com/cgi-bin/webhook/send?key=693a91f6-7xxx-4bc4-97a0-0ec2sifa5aaa";
        let receiver = receiver(vec![Target::new(url)]);

        let report = dispatcher
            .dispatch(&receiver, &WeComMessage::text("ping"))
            .await;

        assert_eq!(transport.sent()[0].0, url);
        assert!(!report.targets[0].url.contains("693a91f6-7xxx"));
    }

    #[tokio::test]
    async fn test_failed_outcome_masks_webhook_key() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let dispatcher = Dispatcher::http().unwrap();
        let url = format!(
            "http://127.0.0.1:{}/cgi-bin/webhook/send?key=SECRETSECRETKEY123",
            port
        );
        let receiver = receiver(vec![Target::new(url)]);

        let report = dispatcher
            .dispatch(&receiver, &WeComMessage::text("ping"))
            .await;

        let target = &report.targets[0];
        assert!(matches!(target.outcome, TargetOutcome::Failed { .. }));
        assert!(!target.outcome.to_string().contains("SECRETSECRETKEY123"));
        assert!(!target.url.contains("SECRETSECRETKEY123"));
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(TargetOutcome::Delivered { status: 200 }.to_string(), "delivered (200)");
        assert_eq!(TargetOutcome::Rejected { status: 404 }.to_string(), "rejected (404)");
        assert_eq!(
            TargetOutcome::Failed { error: "timeout".into() }.to_string(),
            "failed: timeout"
        );
    }
}
