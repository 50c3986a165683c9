//! Background delivery queue
//!
//! A bounded channel drained by one worker task. Each message gets
//! `max_attempts` tries spaced by `retry_delay`; a message that still fails
//! is logged and dropped. Enqueueing never fails the caller.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::{Email, Mailer};
use lentera_core::config::MailConfig;

#[derive(Clone)]
pub struct MailQueue {
    sender: mpsc::Sender<Email>,
}

impl MailQueue {
    /// Spawn the worker; must be called inside a tokio runtime
    pub fn start(mailer: Arc<dyn Mailer>, config: &MailConfig) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let worker = tokio::spawn(run_worker(
            receiver,
            mailer,
            config.max_attempts.max(1),
            Duration::from_secs(config.retry_delay_secs),
        ));
        (Self { sender }, worker)
    }

    /// Queue `email` for delivery
    pub fn enqueue(&self, email: Email) {
        let to = email.to.clone();
        match self.sender.try_send(email) {
            Ok(()) => debug!(to = %to, "Email queued"),
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(to = %to, "Mail queue full, email dropped")
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!(to = %to, "Mail worker stopped, email dropped")
            }
        }
    }
}

async fn run_worker(
    mut receiver: mpsc::Receiver<Email>,
    mailer: Arc<dyn Mailer>,
    max_attempts: u32,
    retry_delay: Duration,
) {
    while let Some(email) = receiver.recv().await {
        deliver(mailer.as_ref(), &email, max_attempts, retry_delay).await;
    }
    debug!("Mail queue closed, worker exiting");
}

async fn deliver(mailer: &dyn Mailer, email: &Email, max_attempts: u32, retry_delay: Duration) -> bool {
    for attempt in 1..=max_attempts {
        match mailer.send(email).await {
            Ok(()) => return true,
            Err(e) if attempt < max_attempts => {
                warn!(to = %email.to, attempt, error = %e, "Email delivery failed, retrying");
                tokio::time::sleep(retry_delay).await;
            }
            Err(e) => {
                error!(to = %email.to, attempts = max_attempts, error = %e, "Email delivery gave up");
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::{LogMailer, MailError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn email() -> Email {
        Email {
            to: "siti@example.com".to_string(),
            subject: "Hello".to_string(),
            html_body: "<p>Hi</p>".to_string(),
            text_body: "Hi".to_string(),
        }
    }

    /// Fails the first `failures` sends
    struct FlakyMailer {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl Mailer for FlakyMailer {
        async fn send(&self, _email: &Email) -> Result<(), MailError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(MailError::Transport("connection refused".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn test_deliver_retries_until_success() {
        let mailer = FlakyMailer {
            failures: 2,
            calls: AtomicU32::new(0),
        };
        assert!(deliver(&mailer, &email(), 3, Duration::ZERO).await);
        assert_eq!(mailer.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_deliver_gives_up() {
        let mailer = FlakyMailer {
            failures: 10,
            calls: AtomicU32::new(0),
        };
        assert!(!deliver(&mailer, &email(), 3, Duration::ZERO).await);
        assert_eq!(mailer.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_queue_delivers_through_worker() {
        let mailer = Arc::new(LogMailer::new());
        let (queue, worker) = MailQueue::start(mailer.clone(), &MailConfig::default());

        queue.enqueue(email());
        drop(queue);
        worker.await.unwrap();

        assert_eq!(mailer.sent(), vec![email()]);
    }
}
