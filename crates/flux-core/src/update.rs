//! The opaque update value fed into the dispatch engine.

use std::ops::Deref;
use std::sync::Arc;

use serde_json::Value;

/// One inbound event from the messaging platform.
///
/// The core never inspects the payload itself: adapters derive per-update
/// fields from it and the polling transport extracts dedupe keys through
/// caller-supplied callbacks. Cloning is cheap; the payload is shared.
#[derive(Clone)]
pub struct Update {
    inner: Arc<Value>,
}

impl Update {
    /// Wraps a platform payload.
    pub fn new(payload: Value) -> Self {
        Self {
            inner: Arc::new(payload),
        }
    }

    /// Returns the raw payload.
    pub fn payload(&self) -> &Value {
        &self.inner
    }
}

impl From<Value> for Update {
    fn from(payload: Value) -> Self {
        Self::new(payload)
    }
}

impl Deref for Update {
    type Target = Value;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl std::fmt::Debug for Update {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Update").field(&self.inner).finish()
    }
}
