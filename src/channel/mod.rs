//! Resilient form submission
//!
//! [`RetryChannel::submit`] posts multipart fields to an endpoint in a
//! background task and resubmits the identical request whenever the
//! transport fails, following the channel's [`RetryPolicy`]. The caller gets
//! a [`SubmissionHandle`] to cancel the loop or await its outcome; the
//! success callback runs at most once.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_retry::RetryIf;
use tracing::{error, info, warn};

use crate::errors::PanelError;
use crate::observability::SubmissionId;

pub mod retry_policy;
pub mod transport;

pub use retry_policy::{Backoff, RetryPolicy};
pub use transport::{FormFields, HttpTransport, ServerResponse, Transport};

/// How a submission loop ended
#[derive(Debug, Clone)]
pub enum SubmissionStatus {
    /// Server accepted the submission and the callback ran
    Delivered { attempts: u32 },
    /// Policy exhausted or error not worth retrying
    GaveUp { attempts: u32, error: PanelError },
    /// Caller cancelled through the handle
    Cancelled { attempts: u32 },
}

impl SubmissionStatus {
    pub fn attempts(&self) -> u32 {
        match self {
            SubmissionStatus::Delivered { attempts }
            | SubmissionStatus::GaveUp { attempts, .. }
            | SubmissionStatus::Cancelled { attempts } => *attempts,
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, SubmissionStatus::Delivered { .. })
    }
}

/// Caller-side handle on a running submission loop
///
/// Dropping the handle detaches the loop; it keeps going until the policy
/// ends it.
#[derive(Debug)]
pub struct SubmissionHandle {
    id: SubmissionId,
    cancel: Option<oneshot::Sender<()>>,
    attempts: Arc<AtomicU32>,
    task: JoinHandle<SubmissionStatus>,
}

impl SubmissionHandle {
    pub fn id(&self) -> &SubmissionId {
        &self.id
    }

    /// Attempts issued so far, the first one included
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Stop resubmitting. Returns false if already cancelled or finished.
    pub fn cancel(&mut self) -> bool {
        match self.cancel.take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the loop to end
    pub async fn finished(self) -> SubmissionStatus {
        let attempts = Arc::clone(&self.attempts);
        match self.task.await {
            Ok(status) => status,
            Err(e) => SubmissionStatus::GaveUp {
                attempts: attempts.load(Ordering::SeqCst),
                error: PanelError::Internal(format!("submission task failed: {}", e)),
            },
        }
    }
}

/// Submits form data and keeps resubmitting on transport failure
#[derive(Clone)]
pub struct RetryChannel {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl RetryChannel {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        if policy.is_unbounded() {
            warn!(
                delay_ms = policy.delay.as_millis() as u64,
                "Retry channel configured without an attempt cap"
            );
        }
        Self { transport, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Post `fields` to `endpoint` in the background.
    ///
    /// `on_success` receives the first successful response. Concurrent calls
    /// are independent loops, even for the same endpoint and fields.
    pub fn submit<F>(
        &self,
        endpoint: impl Into<String>,
        on_success: F,
        fields: FormFields,
    ) -> SubmissionHandle
    where
        F: FnOnce(ServerResponse) + Send + 'static,
    {
        let id = SubmissionId::new();
        let endpoint = endpoint.into();
        let attempts = Arc::new(AtomicU32::new(0));
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();

        let transport = Arc::clone(&self.transport);
        let delays = self.policy.delays();
        let task_id = id.clone();
        let task_attempts = Arc::clone(&attempts);

        let task = tokio::spawn(async move {
            let action = {
                let endpoint = endpoint.clone();
                let id = task_id.clone();
                let attempts = Arc::clone(&task_attempts);
                move || {
                    let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    let transport = Arc::clone(&transport);
                    let endpoint = endpoint.clone();
                    let fields = fields.clone();
                    let id = id.clone();
                    async move {
                        let result = transport.post_form(&endpoint, &fields).await;
                        if let Err(err) = &result {
                            warn!(
                                submission_id = %id,
                                endpoint = %endpoint,
                                attempt,
                                error = %err,
                                "Submission attempt failed"
                            );
                        }
                        result
                    }
                }
            };

            let cancelled = async move {
                // A dropped handle is not a cancellation
                if cancel_rx.await.is_err() {
                    std::future::pending::<()>().await;
                }
            };

            tokio::select! {
                result = RetryIf::spawn(delays, action, |e: &PanelError| e.is_retryable()) => {
                    let attempts = task_attempts.load(Ordering::SeqCst);
                    match result {
                        Ok(response) => {
                            info!(
                                submission_id = %task_id,
                                endpoint = %endpoint,
                                attempts,
                                status = response.status,
                                "Submission delivered"
                            );
                            on_success(response);
                            SubmissionStatus::Delivered { attempts }
                        }
                        Err(error) => {
                            error!(
                                submission_id = %task_id,
                                endpoint = %endpoint,
                                attempts,
                                error = %error,
                                "Submission abandoned"
                            );
                            SubmissionStatus::GaveUp { attempts, error }
                        }
                    }
                }
                _ = cancelled => {
                    let attempts = task_attempts.load(Ordering::SeqCst);
                    info!(submission_id = %task_id, endpoint = %endpoint, attempts, "Submission cancelled");
                    SubmissionStatus::Cancelled { attempts }
                }
            }
        });

        SubmissionHandle {
            id,
            cancel: Some(cancel_tx),
            attempts,
            task,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{Scripted, ScriptedTransport};
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn transport_err() -> PanelError {
        PanelError::Transport {
            endpoint: "/save".to_string(),
            message: "connection refused".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_failures_then_success() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.script_post(Scripted::Fail(transport_err()));
        transport.script_post(Scripted::Fail(PanelError::Status {
            endpoint: "/save".to_string(),
            status: 502,
        }));
        transport.script_post(Scripted::Reply("saved".to_string()));

        let channel = RetryChannel::new(
            transport.clone(),
            RetryPolicy::unbounded(Duration::from_millis(5000)),
        );
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = channel.submit(
            "/save",
            move |response| {
                let _ = tx.send(response.body);
            },
            FormFields::new().with("name", "Alice"),
        );

        let status = handle.finished().await;
        assert!(status.is_delivered());
        assert_eq!(status.attempts(), 3);

        assert_eq!(rx.recv().await.as_deref(), Some("saved"));
        assert!(rx.recv().await.is_none(), "callback must run exactly once");

        let calls = transport.calls();
        assert_eq!(calls.len(), 3);
        for pair in calls.windows(2) {
            assert!(pair[1].at - pair[0].at >= Duration::from_millis(5000));
        }
        assert!(calls
            .iter()
            .all(|c| c.fields == Some(FormFields::new().with("name", "Alice"))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_policy_gives_up() {
        let transport = Arc::new(ScriptedTransport::new());
        for _ in 0..5 {
            transport.script_post(Scripted::Fail(transport_err()));
        }

        let channel = RetryChannel::new(
            transport.clone(),
            RetryPolicy::bounded(3, Duration::from_millis(5000)),
        );
        let status = channel
            .submit(
                "/save",
                |_| {
                    panic!("must not succeed");
                },
                FormFields::new(),
            )
            .finished()
            .await;

        assert!(matches!(status, SubmissionStatus::GaveUp { attempts: 3, .. }));
        assert_eq!(transport.calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_stops_immediately() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.script_post(Scripted::Fail(PanelError::Internal("boom".to_string())));

        let channel = RetryChannel::new(
            transport.clone(),
            RetryPolicy::unbounded(Duration::from_millis(5000)),
        );
        let status = channel
            .submit("/save", |_| {}, FormFields::new())
            .finished()
            .await;

        assert!(matches!(status, SubmissionStatus::GaveUp { attempts: 1, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_unbounded_loop() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.fail_posts_forever(transport_err());

        let channel = RetryChannel::new(
            transport.clone(),
            RetryPolicy::unbounded(Duration::from_millis(5000)),
        );
        let mut handle = channel.submit("/save", |_| {}, FormFields::new());

        tokio::time::sleep(Duration::from_millis(12_000)).await;
        assert!(handle.cancel());
        assert!(!handle.cancel());

        let status = handle.finished().await;
        assert!(matches!(status, SubmissionStatus::Cancelled { .. }));
        let made = transport.calls().len();
        assert_eq!(made, 3);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(transport.calls().len(), made);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_submissions_are_independent() {
        let transport = Arc::new(ScriptedTransport::new());
        let channel = RetryChannel::new(transport.clone(), RetryPolicy::default());

        let a = channel.submit("/save", |_| {}, FormFields::new().with("k", "v"));
        let b = channel.submit("/save", |_| {}, FormFields::new().with("k", "v"));
        assert_ne!(a.id(), b.id());

        assert!(a.finished().await.is_delivered());
        assert!(b.finished().await.is_delivered());
        assert_eq!(transport.calls().len(), 2);
    }
}
