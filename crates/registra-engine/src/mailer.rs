//! # Report Mailer
//!
//! Delivers exported Z-reports to the back office.
//!
//! Delivery is retried IMMEDIATELY up to a fixed budget of attempts;
//! when the budget is spent the failure escalates to the admin notifier
//! exactly once and the terminal error is returned to the caller. No
//! background queue: the close flow either hands the report off or
//! learns synchronously that it could not.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, warn};

use crate::error::{EngineError, EngineResult};

/// Total attempts per delivery, first try included.
const MAX_ATTEMPTS: u32 = 3;

/// Outbound mail seam.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &[u8]) -> Result<(), String>;
}

/// Escalation target for deliveries that exhausted their retries.
#[async_trait]
pub trait AdminNotifier: Send + Sync {
    async fn notify(&self, subject: &str, detail: &str);
}

pub struct ReportMailer {
    transport: Arc<dyn MailTransport>,
    notifier: Arc<dyn AdminNotifier>,
}

impl ReportMailer {
    pub fn new(transport: Arc<dyn MailTransport>, notifier: Arc<dyn AdminNotifier>) -> Self {
        ReportMailer {
            transport,
            notifier,
        }
    }

    /// Sends an exported report, retrying up to [`MAX_ATTEMPTS`] times.
    pub async fn send_z_report(
        &self,
        to: &str,
        session_number: &str,
        body: &[u8],
    ) -> EngineResult<()> {
        let subject = format!("Z-report {session_number}");
        let mut last_error = String::new();

        for attempt in 1..=MAX_ATTEMPTS {
            match self.transport.send(to, &subject, body).await {
                Ok(()) => return Ok(()),
                Err(reason) => {
                    warn!(
                        session_number = %session_number,
                        attempt,
                        reason = %reason,
                        "Report delivery attempt failed"
                    );
                    last_error = reason;
                }
            }
        }

        error!(
            session_number = %session_number,
            attempts = MAX_ATTEMPTS,
            reason = %last_error,
            "Report delivery exhausted retries, escalating"
        );
        self.notifier
            .notify(
                &format!("Z-report delivery failed: {session_number}"),
                &last_error,
            )
            .await;
        Err(EngineError::DeliveryFailed {
            attempts: MAX_ATTEMPTS,
            reason: last_error,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `fail_first` sends, succeeds after.
    struct FlakyTransport {
        fail_first: u32,
        attempts: AtomicU32,
    }

    #[async_trait]
    impl MailTransport for FlakyTransport {
        async fn send(&self, _to: &str, _subject: &str, _body: &[u8]) -> Result<(), String> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt <= self.fail_first {
                Err(format!("smtp timeout (attempt {attempt})"))
            } else {
                Ok(())
            }
        }
    }

    #[derive(Default)]
    struct CountingNotifier {
        notifications: AtomicU32,
    }

    #[async_trait]
    impl AdminNotifier for CountingNotifier {
        async fn notify(&self, _subject: &str, _detail: &str) {
            self.notifications.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn mailer(fail_first: u32) -> (ReportMailer, Arc<FlakyTransport>, Arc<CountingNotifier>) {
        let transport = Arc::new(FlakyTransport {
            fail_first,
            attempts: AtomicU32::new(0),
        });
        let notifier = Arc::new(CountingNotifier::default());
        let mailer = ReportMailer::new(
            Arc::clone(&transport) as Arc<dyn MailTransport>,
            Arc::clone(&notifier) as Arc<dyn AdminNotifier>,
        );
        (mailer, transport, notifier)
    }

    #[tokio::test]
    async fn test_first_attempt_success_sends_once() {
        let (mailer, transport, notifier) = mailer(0);
        mailer
            .send_z_report("office@example.com", "KASSZA-2026-0001", b"report")
            .await
            .unwrap();
        assert_eq!(transport.attempts.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.notifications.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_success_on_second_attempt_no_escalation() {
        let (mailer, transport, notifier) = mailer(1);
        mailer
            .send_z_report("office@example.com", "KASSZA-2026-0001", b"report")
            .await
            .unwrap();
        assert_eq!(transport.attempts.load(Ordering::SeqCst), 2);
        assert_eq!(notifier.notifications.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_three_failures_escalate_exactly_once() {
        let (mailer, transport, notifier) = mailer(5);
        let err = mailer
            .send_z_report("office@example.com", "KASSZA-2026-0001", b"report")
            .await
            .unwrap_err();

        assert_eq!(transport.attempts.load(Ordering::SeqCst), 3);
        assert_eq!(notifier.notifications.load(Ordering::SeqCst), 1);
        match err {
            EngineError::DeliveryFailed { attempts, reason } => {
                assert_eq!(attempts, 3);
                assert!(reason.contains("attempt 3"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
