//! Generation status polling
//!
//! Image generations run as backend jobs; the only way to follow them is to
//! re-fetch the conversation's job list on an interval.

use crate::api::{Generation, StudioApi};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Background poller for one conversation's generations. Stops when
/// dropped, when `stop` is called, or when the receiver goes away.
pub struct GenerationPoller {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl GenerationPoller {
    /// Start polling. The first fetch happens immediately.
    pub fn spawn<A>(
        api: Arc<A>,
        conversation_id: impl Into<String>,
        interval: Duration,
    ) -> (Self, mpsc::Receiver<Vec<Generation>>)
    where
        A: StudioApi + ?Sized + 'static,
    {
        let conversation_id = conversation_id.into();
        let (tx, rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    () = tx.closed() => break,
                    _ = ticker.tick() => {}
                }

                let result = tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    result = api.list_generations(&conversation_id) => result,
                };

                match result {
                    Ok(generations) => {
                        let active = generations.iter().filter(|g| g.is_active()).count();
                        tracing::trace!(
                            conversation_id = %conversation_id,
                            total = generations.len(),
                            active,
                            "Polled generations"
                        );
                        if tx.send(generations).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            conversation_id = %conversation_id,
                            error = %e,
                            "Failed to poll generations"
                        );
                    }
                }
            }

            tracing::debug!(conversation_id = %conversation_id, "Generation poller stopped");
        });

        (Self { cancel, task }, rx)
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for GenerationPoller {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{
        ApiError, Conversation, GenerationStatus, Message, ModelAssignments, Session,
    };
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Backend that only answers `list_generations`, from a script
    #[derive(Default)]
    struct ScriptedApi {
        responses: Mutex<VecDeque<Result<Vec<Generation>, ApiError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedApi {
        fn push(&self, response: Result<Vec<Generation>, ApiError>) {
            self.responses.lock().unwrap().push_back(response);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn unsupported(operation: &'static str) -> ApiError {
        ApiError::Status {
            operation,
            status: 501,
            body: String::new(),
        }
    }

    #[async_trait]
    impl StudioApi for ScriptedApi {
        async fn create_session(&self, _: &ModelAssignments) -> Result<Session, ApiError> {
            Err(unsupported("create session"))
        }

        async fn get_session(&self, _: &str) -> Result<Session, ApiError> {
            Err(unsupported("get session"))
        }

        async fn update_session(&self, _: &str, _: &ModelAssignments) -> Result<Session, ApiError> {
            Err(unsupported("update session"))
        }

        async fn create_conversation(&self, _: &str) -> Result<Conversation, ApiError> {
            Err(unsupported("create conversation"))
        }

        async fn get_messages(&self, _: &str) -> Result<Vec<Message>, ApiError> {
            Err(unsupported("get messages"))
        }

        async fn list_generations(&self, _: &str) -> Result<Vec<Generation>, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn generation(id: &str, status: GenerationStatus, progress: u8) -> Generation {
        Generation {
            id: id.to_string(),
            status,
            progress,
            parameters: None,
            error: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_poll_is_immediate() {
        let api = Arc::new(ScriptedApi::default());
        api.push(Ok(vec![generation("g1", GenerationStatus::Running, 40)]));

        let (_poller, mut rx) = GenerationPoller::spawn(api.clone(), "c1", Duration::from_secs(2));
        let first = tokio::time::timeout(Duration::from_millis(10), rx.recv())
            .await
            .expect("first poll should not wait for the interval")
            .unwrap();
        assert_eq!(first.len(), 1);
        assert!(first[0].is_active());
        assert_eq!(first[0].progress, 40);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_skipped_and_polling_continues() {
        let api = Arc::new(ScriptedApi::default());
        api.push(Err(unsupported("list generations")));
        api.push(Ok(vec![generation("g1", GenerationStatus::Complete, 100)]));

        let (_poller, mut rx) = GenerationPoller::spawn(api.clone(), "c1", Duration::from_secs(2));
        let polled = rx.recv().await.unwrap();
        assert_eq!(polled[0].status, GenerationStatus::Complete);
        assert!(!polled[0].is_active());
        assert_eq!(api.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn polls_on_interval() {
        let api = Arc::new(ScriptedApi::default());
        let (_poller, mut rx) = GenerationPoller::spawn(api.clone(), "c1", Duration::from_secs(2));

        rx.recv().await.unwrap();
        let started = tokio::time::Instant::now();
        rx.recv().await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(2));
        assert_eq!(api.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_ends_the_task() {
        let api = Arc::new(ScriptedApi::default());
        let (poller, mut rx) = GenerationPoller::spawn(api.clone(), "c1", Duration::from_secs(2));
        rx.recv().await.unwrap();

        poller.stop();
        assert!(rx.recv().await.is_none());
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(poller.task.is_finished());
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_receiver_ends_the_task() {
        let api = Arc::new(ScriptedApi::default());
        let (poller, rx) = GenerationPoller::spawn(api.clone(), "c1", Duration::from_secs(2));
        drop(rx);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(poller.task.is_finished());
        assert!(api.calls() <= 1);
    }
}
