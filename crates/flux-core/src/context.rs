//! Per-update context passed through the middleware chain.
//!
//! A [`Context`] is constructed once per update and exclusively owned by the
//! dispatch call for that update's lifetime; middleware receive it by
//! `&mut`, so no locking is involved. It carries the raw update, the
//! adapter-derived view, the router's match outputs, and the mutable slots
//! populated by the session and stage layers.
//!
//! Reading the session, scene, or wizard state before the corresponding
//! middleware has run earlier in the same chain is a configuration error and
//! fails with [`DispatchError::SessionRequired`] /
//! [`DispatchError::StageRequired`] rather than being silently tolerated.

use serde_json::Value;

use crate::adapter::{BoxedAdapter, ParsedCommand, UpdateView};
use crate::error::{DispatchError, DispatchResult};
use crate::state::{SceneState, SessionData, WizardState};
use crate::update::Update;

#[derive(Debug, Clone)]
struct ActiveWizard {
    scene: String,
    max_step: usize,
}

/// The per-update mutable object middleware read and write during dispatch.
pub struct Context {
    update: Update,
    adapter: BoxedAdapter,
    view: UpdateView,
    trigger_match: Option<Vec<String>>,
    command: Option<String>,
    payload: Option<String>,
    session: Option<SessionData>,
    active_wizard: Option<ActiveWizard>,
}

impl Context {
    /// Builds the context for one update, deriving the view via the adapter.
    pub fn new(update: Update, adapter: BoxedAdapter) -> Self {
        let view = adapter.view(&update);
        Self {
            update,
            adapter,
            view,
            trigger_match: None,
            command: None,
            payload: None,
            session: None,
            active_wizard: None,
        }
    }

    /// Returns the raw update.
    pub fn update(&self) -> &Update {
        &self.update
    }

    /// Returns the adapter handling this update.
    pub fn adapter(&self) -> &BoxedAdapter {
        &self.adapter
    }

    /// Returns the adapter-derived view of this update.
    pub fn view(&self) -> &UpdateView {
        &self.view
    }

    /// Text of the inbound message, if any.
    pub fn message_text(&self) -> Option<&str> {
        self.view.message_text.as_deref()
    }

    /// Data attached to an inbound callback action, if any.
    pub fn callback_data(&self) -> Option<&str> {
        self.view.callback_data.as_deref()
    }

    /// The command the adapter parsed out of the message text, if any.
    pub fn parsed_command(&self) -> Option<&ParsedCommand> {
        self.view.command.as_ref()
    }

    /// Chat this update belongs to, if resolvable.
    pub fn chat_id(&self) -> Option<i64> {
        self.view.chat_id
    }

    /// User this update originates from, if resolvable.
    pub fn user_id(&self) -> Option<i64> {
        self.view.user_id
    }

    /// Whether the update carries a message.
    pub fn has_message(&self) -> bool {
        self.view.has_message
    }

    /// Whether the update carries a callback action.
    pub fn has_callback_query(&self) -> bool {
        self.view.has_callback_query
    }

    /// Whether the update carries an inline query.
    pub fn has_inline_query(&self) -> bool {
        self.view.has_inline_query
    }

    // =========================================================================
    // Router outputs
    // =========================================================================

    /// The trigger match written by `hears`/`action` before the handler ran.
    ///
    /// Index 0 is the whole matched text, subsequent indices are captured
    /// groups (empty for groups that did not participate in the match).
    pub fn trigger_match(&self) -> Option<&[String]> {
        self.trigger_match.as_deref()
    }

    /// The matched command name written by `command`.
    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    /// The trimmed command payload written by `command`.
    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref()
    }

    pub(crate) fn set_trigger_match(&mut self, captures: Vec<String>) {
        self.trigger_match = Some(captures);
    }

    pub(crate) fn set_command(&mut self, name: String, payload: String) {
        self.command = Some(name);
        self.payload = Some(payload);
    }

    // =========================================================================
    // Reply
    // =========================================================================

    /// Sends a text reply through the adapter.
    pub async fn reply(&self, text: &str) -> DispatchResult<Value> {
        Ok(self.adapter.reply(&self.update, text, None).await?)
    }

    /// Sends a text reply with platform-specific extras.
    pub async fn reply_with(&self, text: &str, extra: &Value) -> DispatchResult<Value> {
        Ok(self.adapter.reply(&self.update, text, Some(extra)).await?)
    }

    // =========================================================================
    // Session slot
    // =========================================================================

    /// Whether the session middleware has attached an entry.
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Attaches the session entry for this update.
    ///
    /// Called by the session middleware before the rest of the chain runs.
    pub fn attach_session(&mut self, data: SessionData) {
        self.session = Some(data);
    }

    /// Detaches the session entry so it can be committed back to the store.
    pub fn take_session(&mut self) -> Option<SessionData> {
        self.session.take()
    }

    /// Returns the session entry.
    pub fn session(&self) -> DispatchResult<&SessionData> {
        self.session.as_ref().ok_or(DispatchError::SessionRequired {
            consumer: "session access",
        })
    }

    /// Returns the session entry mutably.
    pub fn session_mut(&mut self) -> DispatchResult<&mut SessionData> {
        self.session.as_mut().ok_or(DispatchError::SessionRequired {
            consumer: "session access",
        })
    }

    // =========================================================================
    // Scene and wizard state
    // =========================================================================

    /// Returns a cursor over the scene position.
    ///
    /// Fails with [`DispatchError::SessionRequired`] when the session
    /// middleware has not run earlier in the chain.
    pub fn scene(&mut self) -> DispatchResult<SceneCursor<'_>> {
        let session = self
            .session
            .as_mut()
            .ok_or(DispatchError::SessionRequired { consumer: "scenes" })?;
        Ok(SceneCursor {
            state: session.scene_mut(),
        })
    }

    /// Marks the start of a wizard turn and returns the clamped current step.
    ///
    /// Called by the wizard scene body before dispatching the step handler.
    pub fn begin_wizard_turn(&mut self, scene: &str, step_count: usize) -> DispatchResult<usize> {
        let max_step = step_count.saturating_sub(1);
        let session = self
            .session
            .as_mut()
            .ok_or(DispatchError::SessionRequired { consumer: "wizards" })?;
        let state = session.wizard_mut(scene);
        state.step = state.step.min(max_step);
        let step = state.step;
        self.active_wizard = Some(ActiveWizard {
            scene: scene.to_owned(),
            max_step,
        });
        Ok(step)
    }

    /// Returns a cursor over the active wizard's step position.
    ///
    /// Fails with [`DispatchError::StageRequired`] outside a wizard turn and
    /// with [`DispatchError::SessionRequired`] when the session is missing.
    pub fn wizard(&mut self) -> DispatchResult<WizardCursor<'_>> {
        let active = self
            .active_wizard
            .as_ref()
            .ok_or(DispatchError::StageRequired)?;
        let max_step = active.max_step;
        let scene = active.scene.clone();
        let session = self
            .session
            .as_mut()
            .ok_or(DispatchError::SessionRequired { consumer: "wizards" })?;
        let state = session.wizard_mut(&scene);
        state.step = state.step.min(max_step);
        Ok(WizardCursor { state, max_step })
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("view", &self.view)
            .field("command", &self.command)
            .field("has_session", &self.session.is_some())
            .finish()
    }
}

/// Cursor over the scene position of the current session.
pub struct SceneCursor<'c> {
    state: &'c mut SceneState,
}

impl SceneCursor<'_> {
    /// Name of the active scene, if any.
    pub fn current(&self) -> Option<&str> {
        self.state.current.as_deref()
    }

    /// Activates a scene unconditionally.
    ///
    /// The name is not validated against the registry; an unregistered name
    /// simply means the stage finds no scene and falls through on the next
    /// update.
    pub fn enter(&mut self, name: impl Into<String>) {
        self.state.current = Some(name.into());
    }

    /// Deactivates the current scene.
    pub fn leave(&mut self) {
        self.state.current = None;
    }
}

/// Cursor over the step position of the active wizard.
pub struct WizardCursor<'c> {
    state: &'c mut WizardState,
    max_step: usize,
}

impl WizardCursor<'_> {
    /// Current step index.
    pub fn step(&self) -> usize {
        self.state.step
    }

    /// Advances one step, clamped to the last step.
    pub fn next(&mut self) {
        self.state.step = (self.state.step + 1).min(self.max_step);
    }

    /// Steps back, clamped to the first step.
    pub fn back(&mut self) {
        self.state.step = self.state.step.saturating_sub(1);
    }

    /// Jumps to an absolute step, clamped to the valid range.
    pub fn select_step(&mut self, step: usize) {
        self.state.step = step.min(self.max_step);
    }
}
