// SPDX-License-Identifier: Apache-2.0
//! Node lifecycle error taxonomy.

/// Errors raised while building or tearing down a node.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// A component name in the config (or reached via `auto_load`) has no
    /// registered constructor.
    #[error("unknown component: {0}")]
    UnknownComponent(String),
    /// A component's `setup()` failed; startup does not continue past it.
    #[error("setup failed for component {component}: {source}")]
    SetupFailed {
        /// The failing component's name.
        component: String,
        /// The underlying failure.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// One or more components' `close()` failed during shutdown. Shutdown
    /// still visits every component; this aggregates all failures.
    #[error("{0} component(s) failed to close cleanly: {1:?}")]
    ShutdownFailed(usize, Vec<String>),
    /// Registering an entity during a component's `setup()` failed (e.g. a
    /// duplicate `hash_key`); the node still attempts to start the rest.
    #[error("registry error: {0}")]
    Registry(#[from] hearth_registry::RegistryError),
}
