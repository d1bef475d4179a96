//! Named, reusable sub-pipelines a conversation can be "in".

use flux_core::{Chain, IntoStack};

/// A named middleware sub-pipeline.
///
/// Exactly one scene (or none) is active per session at a time; the
/// [`Stage`](crate::Stage) delegates each update to the active scene's
/// chain. The scene decides whether to continue into whatever runs after
/// the stage by calling its own `next`.
pub struct Scene {
    name: String,
    chain: Chain,
}

impl Scene {
    /// Builds a scene from an ordered middleware stack.
    pub fn new(name: impl Into<String>, stack: impl IntoStack) -> Self {
        Self {
            name: name.into(),
            chain: Chain::new(stack.into_stack()),
        }
    }

    /// Returns the scene name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn chain(&self) -> &Chain {
        &self.chain
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("name", &self.name)
            .field("middleware", &self.chain.len())
            .finish()
    }
}
