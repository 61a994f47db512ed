// SPDX-License-Identifier: Apache-2.0
//! The ambient context: the registry and bus, constructed before any
//! component's `setup()` runs and passed explicitly thereafter.

use std::sync::Arc;

use hearth_bus::Bus;
use hearth_registry::Registry;
use tokio_util::sync::CancellationToken;

/// Everything a component needs to participate in the node: the registry,
/// the bus, and the root cancellation token it should derive a child token
/// from for any task it spawns.
#[derive(Clone)]
pub struct Context {
    /// The process-wide entity registry.
    pub registry: Arc<Registry>,
    /// The process-wide event/service bus.
    pub bus: Arc<Bus>,
    /// The node's root cancellation token. Components spawning long-lived
    /// tasks should use `root_cancellation.child_token()`.
    pub root_cancellation: CancellationToken,
}

impl Context {
    /// Construct a fresh context with an empty registry and bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry::new()),
            bus: Arc::new(Bus::new()),
            root_cancellation: CancellationToken::new(),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
