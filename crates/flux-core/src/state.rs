//! Typed per-conversation state stored in a session entry.
//!
//! Scene and wizard progress live in dedicated, namespaced sub-records owned
//! by the stage/wizard layers; free-form user data goes through the
//! [`SessionData`] accessor methods. Nothing probes reserved keys in a raw
//! record.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Scene position within a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneState {
    /// Name of the active scene, or `None` when no scene is active.
    pub current: Option<String>,
}

/// Wizard progress for one named wizard.
///
/// The step index is clamped against the wizard's current step count on
/// every turn, so a persisted value from a longer step list re-clamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardState {
    /// Current step index.
    pub step: usize,
}

/// One session entry.
///
/// Created lazily on first access per key and kept for the lifetime of the
/// backing store. The default in-memory store never evicts; unbounded growth
/// is a documented limitation of that store, not of this type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default)]
    scene: SceneState,
    #[serde(default)]
    wizards: HashMap<String, WizardState>,
    #[serde(default)]
    values: Map<String, Value>,
}

impl SessionData {
    /// Creates an empty session entry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the scene sub-record.
    pub fn scene(&self) -> &SceneState {
        &self.scene
    }

    pub(crate) fn scene_mut(&mut self) -> &mut SceneState {
        &mut self.scene
    }

    /// Returns the progress of a named wizard, if it has run before.
    pub fn wizard(&self, name: &str) -> Option<&WizardState> {
        self.wizards.get(name)
    }

    pub(crate) fn wizard_mut(&mut self, name: &str) -> &mut WizardState {
        self.wizards.entry(name.to_owned()).or_default()
    }

    /// Returns a user value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Stores a user value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(key.into(), value)
    }

    /// Removes a user value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Returns the free-form user record.
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wizard_records_are_namespaced() {
        let mut data = SessionData::new();
        data.wizard_mut("signup").step = 2;
        data.wizard_mut("feedback").step = 1;

        assert_eq!(data.wizard("signup").map(|w| w.step), Some(2));
        assert_eq!(data.wizard("feedback").map(|w| w.step), Some(1));
        assert!(data.wizard("other").is_none());
    }

    #[test]
    fn round_trips_through_serde() {
        let mut data = SessionData::new();
        data.scene_mut().current = Some("checkout".to_owned());
        data.insert("count", json!(3));

        let encoded = serde_json::to_string(&data).unwrap();
        let decoded: SessionData = serde_json::from_str(&encoded).unwrap();

        assert_eq!(decoded.scene().current.as_deref(), Some("checkout"));
        assert_eq!(decoded.get("count"), Some(&json!(3)));
    }
}
