//! WhatsApp delivery with bounded retries. When every attempt fails the
//! caller gets a click-to-chat link to send the message by hand.

use std::time::Duration;

use serde::Serialize;
use tokio::time;
use tracing::{info, warn};
use url::form_urlencoded;

use crate::error::{AppError, UpstreamError};
use crate::upstream::{Capability, MessageSender};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    /// Delay after the first failure; doubles after each further one.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * (1u32 << attempt.min(16))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    #[serde(rename_all = "camelCase")]
    Sent { message_id: String, attempts: u32 },
    #[serde(rename_all = "camelCase")]
    ManualAction {
        link: String,
        attempts: u32,
        reason: String,
    },
}

/// Digits of a phone number as WhatsApp expects them: country code first,
/// no `+`, spaces or dashes.
pub fn normalize_phone(to: &str) -> Result<String, AppError> {
    let digits: String = to.chars().filter(char::is_ascii_digit).collect();
    if !(8..=15).contains(&digits.len()) {
        return Err(AppError::Validation(
            "to must be a phone number with 8 to 15 digits".into(),
        ));
    }
    Ok(digits)
}

/// `https://wa.me/<digits>?text=<message>` with the message percent-encoded.
pub fn click_to_chat_link(digits: &str, message: &str) -> String {
    let text: String = form_urlencoded::byte_serialize(message.as_bytes())
        .collect::<String>()
        .replace('+', "%20");
    format!("https://wa.me/{digits}?text={text}")
}

pub async fn deliver(
    messenger: &Capability<dyn MessageSender>,
    to: &str,
    message: &str,
    policy: RetryPolicy,
) -> Result<DeliveryOutcome, AppError> {
    let digits = normalize_phone(to)?;
    if message.trim().is_empty() {
        return Err(AppError::Validation("message is required".into()));
    }

    let manual = |attempts: u32, err: UpstreamError| {
        warn!(attempts, error = %err, "WhatsApp delivery failed, returning manual link");
        DeliveryOutcome::ManualAction {
            link: click_to_chat_link(&digits, message),
            attempts,
            reason: err.to_string(),
        }
    };

    let sender = match messenger.get() {
        Ok(sender) => sender,
        Err(e) => return Ok(manual(0, e)),
    };

    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match sender.send_text(&digits, message).await {
            Ok(message_id) => {
                info!(attempt, %message_id, "WhatsApp message sent");
                return Ok(DeliveryOutcome::Sent {
                    message_id,
                    attempts: attempt,
                });
            }
            Err(e) if attempt >= policy.attempts => return Ok(manual(attempt, e)),
            Err(e) => {
                let wait = policy.delay_after(attempt - 1);
                warn!(attempt, error = %e, wait_ms = wait.as_millis() as u64, "WhatsApp send failed, retrying");
                time::sleep(wait).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct Flaky {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl MessageSender for Flaky {
        async fn send_text(&self, _: &str, _: &str) -> Result<String, UpstreamError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(UpstreamError::Http(500))
            } else {
                Ok("wamid.1".into())
            }
        }
    }

    fn flaky(failures: u32) -> (Arc<Flaky>, Capability<dyn MessageSender>) {
        let f = Arc::new(Flaky {
            failures,
            calls: AtomicU32::new(0),
        });
        let sender: Arc<dyn MessageSender> = f.clone();
        (f, Capability::Configured(sender))
    }

    fn fast() -> RetryPolicy {
        RetryPolicy {
            attempts: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn backoff_doubles() {
        let p = RetryPolicy::default();
        assert_eq!(p.delay_after(0), Duration::from_millis(500));
        assert_eq!(p.delay_after(1), Duration::from_millis(1000));
        assert_eq!(p.delay_after(2), Duration::from_millis(2000));
    }

    #[test]
    fn link_encodes_message() {
        assert_eq!(
            click_to_chat_link("919876543210", "Hi! 50% off & more"),
            "https://wa.me/919876543210?text=Hi%21%2050%25%20off%20%26%20more"
        );
    }

    #[test]
    fn phone_numbers_are_reduced_to_digits() {
        assert_eq!(normalize_phone("+91 98765-43210").unwrap(), "919876543210");
        assert!(normalize_phone("12345").is_err());
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let (f, cap) = flaky(2);
        let out = deliver(&cap, "+91 98765 43210", "hello", fast()).await.unwrap();
        assert_eq!(
            out,
            DeliveryOutcome::Sent {
                message_id: "wamid.1".into(),
                attempts: 3
            }
        );
        assert_eq!(f.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_attempts_give_manual_link() {
        let (f, cap) = flaky(10);
        let out = deliver(&cap, "919876543210", "see you", fast()).await.unwrap();
        match out {
            DeliveryOutcome::ManualAction { link, attempts, reason } => {
                assert_eq!(link, "https://wa.me/919876543210?text=see%20you");
                assert_eq!(attempts, 3);
                assert_eq!(reason, "http error: 500");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(f.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn unconfigured_sender_skips_retries() {
        let cap: Capability<dyn MessageSender> = Capability::NotConfigured("WhatsApp");
        let out = deliver(&cap, "919876543210", "hi", fast()).await.unwrap();
        assert!(matches!(out, DeliveryOutcome::ManualAction { attempts: 0, .. }));
    }

    #[tokio::test]
    async fn blank_message_is_rejected() {
        let cap: Capability<dyn MessageSender> = Capability::NotConfigured("WhatsApp");
        assert!(matches!(
            deliver(&cap, "919876543210", "  ", fast()).await,
            Err(AppError::Validation(_))
        ));
    }
}
