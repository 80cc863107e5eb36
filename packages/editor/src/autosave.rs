//! Debounced autosave.
//!
//! Every dirty-marking change re-arms the deadline, so an autosave only
//! goes out after `autosave_delay` of inactivity. [`AutosaveDriver`] is the
//! task that waits for the deadline and hands the blocks to the client.

use std::sync::Arc;
use std::time::Duration;

use blockpress_model::BlockTree;
use tokio::sync::{oneshot, Mutex};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

use crate::persistence::PersistenceClient;
use crate::session::EditorSession;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutosaveScheduler {
    delay: Duration,
    deadline: Option<Instant>,
}

impl AutosaveScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Push the deadline to `now + delay`
    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

/// Blocks captured for an autosave
#[derive(Debug, Clone, PartialEq)]
pub struct AutosaveRequest {
    pub post_id: String,
    pub blocks: BlockTree,
}

impl EditorSession {
    pub fn autosave_deadline(&self) -> Option<Instant> {
        self.autosave.deadline()
    }

    /// Disarm and capture the blocks if the deadline has passed
    pub fn take_due_autosave(&mut self, now: Instant) -> Option<AutosaveRequest> {
        if !self.autosave.is_due(now) {
            return None;
        }
        self.autosave.cancel();
        Some(AutosaveRequest {
            post_id: self.post_id.clone(),
            blocks: self.tree.clone(),
        })
    }
}

/// Background task that fires autosaves for a shared session
pub struct AutosaveDriver {
    session: Arc<Mutex<EditorSession>>,
    client: Arc<dyn PersistenceClient>,
}

impl AutosaveDriver {
    pub fn new(session: Arc<Mutex<EditorSession>>, client: Arc<dyn PersistenceClient>) -> Self {
        Self { session, client }
    }

    /// Send an autosave if one is due. The session is not locked while the
    /// client runs.
    pub async fn tick(&self) -> bool {
        let request = self.session.lock().await.take_due_autosave(Instant::now());
        let Some(request) = request else {
            return false;
        };

        debug!(post = %request.post_id, "autosaving");
        if let Err(err) = self
            .client
            .autosave(&request.post_id, &request.blocks)
            .await
        {
            warn!(post = %request.post_id, error = %err, "autosave failed");
        }
        true
    }

    /// Wait for deadlines until `shutdown` fires or its sender is dropped
    pub async fn run(self, mut shutdown: oneshot::Receiver<()>) {
        loop {
            let (deadline, delay) = {
                let session = self.session.lock().await;
                (session.autosave_deadline(), session.config().autosave_delay())
            };
            let wake = deadline.unwrap_or_else(|| Instant::now() + delay);

            tokio::select! {
                _ = &mut shutdown => {
                    debug!("autosave driver stopped");
                    break;
                }
                _ = sleep_until(wake) => {
                    self.tick().await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::persistence::tests::RecordingClient;
    use blockpress_model::BlockRegistry;

    fn session() -> EditorSession {
        EditorSession::new(
            "3",
            BlockTree::new(),
            BlockRegistry::builtin(),
            EditorConfig::default(),
        )
    }

    #[test]
    fn test_scheduler_rearms() {
        let start = Instant::now();
        let mut scheduler = AutosaveScheduler::new(Duration::from_secs(30));
        assert!(!scheduler.is_due(start));

        scheduler.arm(start);
        assert!(!scheduler.is_due(start + Duration::from_secs(29)));
        scheduler.arm(start + Duration::from_secs(20));
        assert!(!scheduler.is_due(start + Duration::from_secs(31)));
        assert!(scheduler.is_due(start + Duration::from_secs(50)));

        scheduler.cancel();
        assert!(scheduler.deadline().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mutation_arms_autosave() {
        let mut session = session();
        assert!(session.autosave_deadline().is_none());

        session.add("paragraph", None).unwrap();
        let deadline = session.autosave_deadline().unwrap();
        assert_eq!(deadline, Instant::now() + Duration::from_secs(30));

        assert!(session.take_due_autosave(Instant::now()).is_none());
        let request = session.take_due_autosave(deadline).unwrap();
        assert_eq!(request.blocks.len(), 1);
        assert!(session.autosave_deadline().is_none());
        assert!(session.is_dirty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_autosave_never_arms() {
        let config = EditorConfig {
            autosave_enabled: false,
            ..EditorConfig::default()
        };
        let mut session =
            EditorSession::new("3", BlockTree::new(), BlockRegistry::builtin(), config);
        session.add("paragraph", None).unwrap();
        assert!(session.autosave_deadline().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_fires_after_inactivity() {
        let session = Arc::new(Mutex::new(session()));
        session.lock().await.add("paragraph", None).unwrap();
        let client = Arc::new(RecordingClient::default());
        let driver = AutosaveDriver::new(session.clone(), client.clone());
        let (stop, shutdown) = oneshot::channel();
        let handle = tokio::spawn(driver.run(shutdown));

        tokio::time::sleep(Duration::from_secs(20)).await;
        session.lock().await.add("heading", None).unwrap();
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(client.autosaves.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_secs(15)).await;
        let autosaves = client.autosaves.lock().unwrap().clone();
        assert_eq!(autosaves.len(), 1);
        assert_eq!(autosaves[0].len(), 2);
        assert!(session.lock().await.is_dirty());

        stop.send(()).unwrap();
        handle.await.unwrap();
    }
}
