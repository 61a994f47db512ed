// SPDX-License-Identifier: Apache-2.0
//! The component trait every node member implements.

use async_trait::async_trait;

use crate::context::Context;
use crate::priority::InitializationPriority;

/// A single lifecycle participant in the node. Components are
/// instantiated, stable-sorted by [`InitializationPriority`], and have
/// `setup()` called in that order; on shutdown, `close()` is called on
/// every component regardless of setup outcome, and failures are
/// aggregated.
#[async_trait]
pub trait Component: Send + Sync {
    /// A short, stable name for diagnostics and `UnknownComponent` errors.
    fn name(&self) -> &str;

    /// Where in the startup order this component's `setup()` runs.
    fn priority(&self) -> InitializationPriority;

    /// Bring the component up: register entities, bind sockets, spawn
    /// tasks. Runs strictly after every component ordered before it.
    async fn setup(&self, ctx: &Context) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Tear the component down: release OS handles, join owned tasks.
    /// Called during shutdown for every component, even ones whose
    /// `setup()` never ran because an earlier component failed.
    async fn close(&self, ctx: &Context) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let _ = ctx;
        Ok(())
    }
}
