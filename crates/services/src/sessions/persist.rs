use log::{debug, warn};
use std::mem;
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use storage::{AnswerRecord, AnswerStore};

/// Fire-and-forget answer autosave.
///
/// Each call spawns a task on the current tokio runtime. Failures are logged and
/// dropped; the participant keeps answering either way. Outstanding saves are
/// tracked so submission and shutdown can wait for them with [`AnswerPersister::flush`].
#[derive(Clone)]
pub struct AnswerPersister {
    store: Arc<dyn AnswerStore>,
    in_flight: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl AnswerPersister {
    #[must_use]
    pub fn new(store: Arc<dyn AnswerStore>) -> Self {
        Self {
            store,
            in_flight: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Schedule `record` to be saved. Returns whether a save was started.
    ///
    /// Without a tokio runtime the save is skipped and logged.
    pub fn persist(&self, record: AnswerRecord) -> bool {
        let Ok(runtime) = Handle::try_current() else {
            warn!(
                "no async runtime; skipping save of question {} for {}",
                record.question_id, record.sso
            );
            return false;
        };

        let store = Arc::clone(&self.store);
        let handle = runtime.spawn(async move {
            match store.save_answer(&record).await {
                Ok(()) => debug!(
                    "saved answer for question {} ({})",
                    record.question_id,
                    if record.answer.is_some() { "set" } else { "cleared" }
                ),
                Err(e) => warn!(
                    "failed to save answer for question {} for {}: {e}",
                    record.question_id, record.sso
                ),
            }
        });

        match self.in_flight.lock() {
            Ok(mut in_flight) => {
                in_flight.retain(|h| !h.is_finished());
                in_flight.push(handle);
            }
            // The save still runs; it just cannot be waited on.
            Err(e) => warn!("save tracker unavailable: {e}"),
        }
        true
    }

    /// Number of saves started and not yet finished.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.in_flight
            .lock()
            .map_or(0, |in_flight| in_flight.iter().filter(|h| !h.is_finished()).count())
    }

    /// Wait for every save started so far. Save failures stay logged only.
    pub async fn flush(&self) {
        let handles = match self.in_flight.lock() {
            Ok(mut in_flight) => mem::take(&mut *in_flight),
            Err(e) => {
                warn!("save tracker unavailable: {e}");
                return;
            }
        };
        if !handles.is_empty() {
            debug!("waiting for {} answer save(s)", handles.len());
        }
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("answer save did not finish: {e}");
            }
        }
    }
}
