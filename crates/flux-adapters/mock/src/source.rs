//! Scripted update source for the polling transport.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use flux_core::Update;
use flux_transport::{GetUpdatesFn, get_updates_fn};

/// Serves scripted updates one per poll, honoring the offset watermark.
///
/// Updates whose `update_id` falls below the requested offset are skipped;
/// once the script is exhausted every poll returns an empty batch.
pub fn scripted_source(script: Vec<Value>) -> GetUpdatesFn {
    let script: Arc<[Update]> = script.into_iter().map(Update::new).collect::<Vec<_>>().into();
    let cursor = Arc::new(Mutex::new(0usize));

    get_updates_fn(move |params| {
        let script = Arc::clone(&script);
        let cursor = Arc::clone(&cursor);
        async move {
            if params.cancel.is_cancelled() {
                return Ok(Vec::new());
            }

            let mut cursor = cursor.lock();
            if let Some(offset) = params.offset {
                while *cursor < script.len() && update_id(&script[*cursor]).is_some_and(|id| id < offset) {
                    *cursor += 1;
                }
            }

            match script.get(*cursor) {
                Some(update) => {
                    *cursor += 1;
                    Ok(vec![update.clone()])
                }
                None => Ok(Vec::new()),
            }
        }
    })
}

fn update_id(update: &Update) -> Option<i64> {
    update.get("update_id").and_then(|id| id.as_i64())
}
