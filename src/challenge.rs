use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread;
use thiserror::Error;

use crate::store::{JsonStoreExt, KeyValueStore, StoreError};

const CHALLENGE_KEY_PREFIX: &str = "challenge:";

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("submission rejected: {0}")]
    Rejected(String),

    #[error("submission store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("submission worker stopped before reporting")]
    Disconnected,
}

/// Capability that persists a final score against a challenge
pub trait ChallengeSubmitter: Send + Sync {
    fn submit(&self, challenge_id: &str, score: u64) -> Result<(), SubmitError>;
}

impl<F> ChallengeSubmitter for F
where
    F: Fn(&str, u64) -> Result<(), SubmitError> + Send + Sync,
{
    fn submit(&self, challenge_id: &str, score: u64) -> Result<(), SubmitError> {
        self(challenge_id, score)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    ScoreNotSaved { challenge_id: String, score: u64 },
}

impl Notification {
    pub fn message(&self) -> String {
        match self {
            Notification::ScoreNotSaved { .. } => {
                "Score not saved, but you still played great!".to_string()
            }
        }
    }
}

/// User-facing notification sink
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        log::warn!("{}", notification.message());
    }
}

/// Notifications collected for a UI to drain on its next frame
#[derive(Debug, Default, Clone)]
pub struct NotificationQueue {
    pending: Arc<Mutex<Vec<Notification>>>,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<Notification> {
        match self.pending.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl Notifier for NotificationQueue {
    fn notify(&self, notification: Notification) {
        match self.pending.lock() {
            Ok(mut pending) => pending.push(notification),
            Err(poisoned) => poisoned.into_inner().push(notification),
        }
    }
}

/// Outcome of a background score submission
#[derive(Debug)]
pub struct SaveHandle {
    rx: Receiver<Result<(), SubmitError>>,
}

impl SaveHandle {
    /// Submit on a worker thread; failures are reported to `notifier`
    pub fn spawn(
        submitter: Arc<dyn ChallengeSubmitter>,
        notifier: Arc<dyn Notifier>,
        challenge_id: String,
        score: u64,
    ) -> Self {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let outcome = submitter.submit(&challenge_id, score);
            match &outcome {
                Ok(()) => log::info!("saved score {score} for challenge {challenge_id}"),
                Err(err) => {
                    log::warn!("could not save score for challenge {challenge_id}: {err}");
                    notifier.notify(Notification::ScoreNotSaved {
                        challenge_id: challenge_id.clone(),
                        score,
                    });
                }
            }
            let _ = tx.send(outcome);
        });

        Self { rx }
    }

    /// Block until the submission finishes
    pub fn wait(self) -> Result<(), SubmitError> {
        self.rx.recv().unwrap_or(Err(SubmitError::Disconnected))
    }

    /// Non-blocking check; `None` while the submission is in flight
    pub fn try_outcome(&self) -> Option<Result<(), SubmitError>> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(SubmitError::Disconnected)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub score: u64,
    pub submitted_at: DateTime<Local>,
}

/// Submitter that records completions in the local key-value store
#[derive(Debug)]
pub struct LocalChallengeLog<S: KeyValueStore + Send> {
    store: Mutex<S>,
}

impl<S: KeyValueStore + Send> LocalChallengeLog<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Mutex::new(store),
        }
    }

    fn key(challenge_id: &str) -> String {
        format!("{CHALLENGE_KEY_PREFIX}{challenge_id}")
    }

    pub fn submissions(&self, challenge_id: &str) -> Result<Vec<Submission>, SubmitError> {
        let store = self.lock()?;
        Ok(store
            .get_json::<Vec<Submission>>(&Self::key(challenge_id))?
            .unwrap_or_default())
    }

    pub fn best_score(&self, challenge_id: &str) -> Result<Option<u64>, SubmitError> {
        Ok(self
            .submissions(challenge_id)?
            .iter()
            .map(|s| s.score)
            .max())
    }

    /// Challenge identifiers with at least one submission
    pub fn challenges(&self) -> Result<Vec<String>, SubmitError> {
        let store = self.lock()?;
        Ok(store
            .keys_with_prefix(CHALLENGE_KEY_PREFIX)?
            .into_iter()
            .map(|k| k[CHALLENGE_KEY_PREFIX.len()..].to_string())
            .collect())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, S>, SubmitError> {
        self.store
            .lock()
            .map_err(|_| SubmitError::Rejected("submission log poisoned".into()))
    }
}

impl<S: KeyValueStore + Send> ChallengeSubmitter for LocalChallengeLog<S> {
    fn submit(&self, challenge_id: &str, score: u64) -> Result<(), SubmitError> {
        if challenge_id.trim().is_empty() {
            return Err(SubmitError::Rejected("empty challenge id".into()));
        }

        let mut store = self.lock()?;
        let key = Self::key(challenge_id);
        let mut submissions: Vec<Submission> = store.get_json(&key)?.unwrap_or_default();
        submissions.push(Submission {
            score,
            submitted_at: Local::now(),
        });
        store.set_json(&key, &submissions)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use assert_matches::assert_matches;

    #[test]
    fn local_log_records_and_ranks_submissions() {
        let log = LocalChallengeLog::new(MemoryStore::new());

        log.submit("recycle-week", 40).unwrap();
        log.submit("recycle-week", 90).unwrap();
        log.submit("energy", 10).unwrap();

        assert_eq!(log.submissions("recycle-week").unwrap().len(), 2);
        assert_eq!(log.best_score("recycle-week").unwrap(), Some(90));
        assert_eq!(log.best_score("unknown").unwrap(), None);
        assert_eq!(log.challenges().unwrap(), vec!["energy", "recycle-week"]);
    }

    #[test]
    fn local_log_rejects_blank_ids() {
        let log = LocalChallengeLog::new(MemoryStore::new());
        assert_matches!(log.submit("  ", 5), Err(SubmitError::Rejected(_)));
    }

    #[test]
    fn save_handle_reports_success_without_notifying() {
        let queue = NotificationQueue::new();
        let log = Arc::new(LocalChallengeLog::new(MemoryStore::new()));

        let handle = SaveHandle::spawn(log.clone(), Arc::new(queue.clone()), "c1".into(), 77);
        handle.wait().unwrap();

        assert_eq!(log.best_score("c1").unwrap(), Some(77));
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn save_handle_notifies_on_failure() {
        let queue = NotificationQueue::new();
        let failing =
            |_: &str, _: u64| -> Result<(), SubmitError> { Err(SubmitError::Rejected("offline".into())) };

        let handle = SaveHandle::spawn(Arc::new(failing), Arc::new(queue.clone()), "c2".into(), 12);
        assert_matches!(handle.wait(), Err(SubmitError::Rejected(_)));

        let notes = queue.drain();
        assert_eq!(
            notes,
            vec![Notification::ScoreNotSaved {
                challenge_id: "c2".into(),
                score: 12
            }]
        );
        assert!(notes[0].message().contains("still played great"));
        assert!(queue.drain().is_empty());
    }
}
