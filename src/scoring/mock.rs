//! Mock scoring model with scripted replies and call accounting.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use super::error::ModelError;
use super::model::ScoringModel;
use super::prompt::ModelPrompt;

type Responder = dyn Fn(&ModelPrompt) -> Result<String, ModelError> + Send + Sync;

/// Scoring model that answers from a fixed score table, a script, or a closure.
///
/// Scripted replies are consumed first; after that the responder answers.
#[derive(Clone)]
pub struct MockScoringModel {
    script: Arc<Mutex<VecDeque<Result<String, ModelError>>>>,
    responder: Arc<Responder>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
    batches: Arc<Mutex<Vec<Vec<String>>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockScoringModel {
    pub fn from_fn(
        responder: impl Fn(&ModelPrompt) -> Result<String, ModelError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            responder: Arc::new(responder),
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
            batches: Arc::new(Mutex::new(Vec::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Answers every prompt with a `{"results": [...]}` reply built from `table`
    /// (submission id → criterion → score). Ids missing from the table are left out.
    pub fn with_scores<I, C>(table: I) -> Self
    where
        I: IntoIterator<Item = (String, C)>,
        C: IntoIterator<Item = (String, f64)>,
    {
        let table: HashMap<String, BTreeMap<String, f64>> = table
            .into_iter()
            .map(|(id, scores)| (id, scores.into_iter().collect()))
            .collect();

        Self::from_fn(move |prompt| {
            let results: Vec<_> = prompt
                .submission_ids
                .iter()
                .filter_map(|id| {
                    table.get(id).map(|scores| {
                        json!({"id": id, "scores": scores, "rationale": format!("mock rationale for {id}")})
                    })
                })
                .collect();
            Ok(json!({ "results": results }).to_string())
        })
    }

    /// Fails every call with a clone of `error`.
    pub fn failing(error: ModelError) -> Self {
        Self::from_fn(move |_| Err(error.clone()))
    }

    /// Queues replies returned (in order) before the responder is used.
    pub fn with_script(
        self,
        replies: impl IntoIterator<Item = Result<String, ModelError>>,
    ) -> Self {
        self.script.lock().extend(replies);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Submission ids of every call, in call order.
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().clone()
    }

    /// User prompts of every call, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

impl std::fmt::Debug for MockScoringModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockScoringModel")
            .field("calls", &self.calls())
            .field("delay", &self.delay)
            .finish()
    }
}

#[async_trait]
impl ScoringModel for MockScoringModel {
    async fn complete(&self, prompt: &ModelPrompt) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.batches.lock().push(prompt.submission_ids.clone());
        self.prompts.lock().push(prompt.user.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let scripted = self.script.lock().pop_front();
        match scripted {
            Some(reply) => reply,
            None => (self.responder)(prompt),
        }
    }
}
