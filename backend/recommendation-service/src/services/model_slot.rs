//! The single shared model reference plus its lifecycle state.
//!
//! Readers clone the `Arc` under a short read lock and then work lock-free,
//! so a swap never blocks an in-flight query and no query ever sees parts of
//! two different trains.

use super::model::TrainedModel;
use crate::models::ModelState;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug)]
struct SlotInner {
    model: Option<Arc<TrainedModel>>,
    state: ModelState,
}

#[derive(Debug, Clone)]
pub struct ModelSlot {
    inner: Arc<RwLock<SlotInner>>,
}

impl Default for ModelSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelSlot {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(SlotInner {
                model: None,
                state: ModelState::Uninitialized,
            })),
        }
    }

    /// The model currently being served, if any.
    pub async fn current(&self) -> Option<Arc<TrainedModel>> {
        self.inner.read().await.model.clone()
    }

    pub async fn state(&self) -> ModelState {
        self.inner.read().await.state
    }

    /// Model and state read under one lock.
    pub async fn snapshot(&self) -> (Option<Arc<TrainedModel>>, ModelState) {
        let inner = self.inner.read().await;
        (inner.model.clone(), inner.state)
    }

    pub async fn set_state(&self, state: ModelState) {
        self.inner.write().await.state = state;
    }

    /// Publish a new model and mark the slot ready in one step.
    pub async fn install(&self, model: Arc<TrainedModel>) {
        let mut inner = self.inner.write().await;
        inner.model = Some(model);
        inner.state = ModelState::Ready;
    }

    /// Record a failed train. A previously installed model keeps serving,
    /// so the slot only reports `Failed` when there is nothing to serve.
    pub async fn mark_failed(&self) -> ModelState {
        let mut inner = self.inner.write().await;
        inner.state = if inner.model.is_some() {
            ModelState::Ready
        } else {
            ModelState::Failed
        };
        inner.state
    }
}
