// SPDX-License-Identifier: Apache-2.0
//! Assembles a [`hearth_node::Node`] from a [`NodeConfig`], wires in the
//! built-in `"api"` component, and runs it until shutdown is requested.

mod api_server;
mod error;

pub use api_server::ApiServer;
pub use error::ServiceError;

use std::collections::HashMap;
use std::sync::Arc;

use hearth_config::NodeConfig;
use hearth_node::{Component, ComponentFactory, Context, Node};

/// The component factories built into every Hearth node: currently just
/// `"api"`, the ESPHome-Native-API-compatible listener.
#[must_use]
pub fn built_in_factories() -> HashMap<String, ComponentFactory> {
    let mut factories: HashMap<String, ComponentFactory> = HashMap::new();
    factories.insert(
        "api".to_owned(),
        Arc::new(|_config: &hearth_config::ComponentConfig| {
            Ok(Vec::<Arc<dyn Component>>::new())
        }),
    );
    factories
}

/// Build a node from `config`, merging `user_factories` over the built-in
/// set (a user factory for `"api"` would shadow the default, though no
/// config ships one today), then run until a shutdown signal arrives.
///
/// # Errors
/// Returns an error if any startup failure should be treated as fatal by
/// the caller; startup otherwise only logs and accumulates
/// [`Node::startup_errors`].
pub async fn run(
    config: NodeConfig,
    user_factories: HashMap<String, ComponentFactory>,
) -> anyhow::Result<()> {
    let config = Arc::new(config);
    let ctx = Context::new();

    let mut factories = built_in_factories();
    factories.insert(
        "api".to_owned(),
        api_factory(Arc::clone(&config)),
    );
    factories.extend(user_factories);

    let node = Node::build(&config, &factories, ctx).await;
    for error in node.startup_errors() {
        tracing::error!(%error, "component failed to start");
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");

    node.shutdown().await?;
    Ok(())
}

fn api_factory(config: Arc<NodeConfig>) -> ComponentFactory {
    Arc::new(move |_entry: &hearth_config::ComponentConfig| {
        Ok(vec![
            Arc::new(ApiServer::new(Arc::clone(&config))) as Arc<dyn Component>
        ])
    })
}
