//! # Flux Scenes
//!
//! Stateful-conversation layers for the flux bot framework.
//!
//! This crate provides:
//! - **Session** ([`session`]) – a persistent per-conversation record with a
//!   pluggable store, attached to the context before the rest of the chain
//!   runs
//! - **Scenes** ([`scene`], [`stage`]) – named sub-pipelines a conversation
//!   can be "in", with a registry middleware that delegates each update to
//!   the active scene
//! - **Wizards** ([`wizard`]) – scenes backed by an ordered step list with a
//!   persisted current-step index
//!
//! Ordering matters: register [`SessionLayer`] first, then any transition
//! commands, then the [`Stage`]. Stage and wizard machinery fail fast with a
//! configuration error when the session is missing.
//!
//! ## Example
//!
//! ```rust,ignore
//! use flux_scenes::{SessionLayer, Stage, Wizard};
//!
//! let mut stage = Stage::new();
//! stage.register(Wizard::new("signup", steps));
//!
//! bot.use_middleware(SessionLayer::new().middleware());
//! bot.command("signup", Stage::enter("signup"));
//! bot.use_middleware(stage.middleware());
//! ```

pub mod scene;
pub mod session;
pub mod stage;
pub mod wizard;

pub use scene::Scene;
pub use session::{MemoryStore, SessionKeyFn, SessionLayer, SessionSeedFn, SessionStore};
pub use stage::Stage;
pub use wizard::Wizard;
