// SPDX-License-Identifier: Apache-2.0
//! The node: folds autoload dependencies, instantiates components,
//! stable-sorts by [`InitializationPriority`], and runs their lifecycle.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use hearth_config::{ComponentConfig, NodeConfig};

use crate::component::Component;
use crate::constructor::ComponentFactory;
use crate::context::Context;
use crate::error::NodeError;

/// Fold `auto_load` dependencies into the declared component set, adding
/// default (empty-params, empty-auto_load) entries for any dependency not
/// already present. Declared components keep their given params; newly
/// folded-in dependencies get defaults.
fn fold_autoload_dependencies(declared: &[ComponentConfig]) -> Vec<ComponentConfig> {
    let mut effective: HashMap<String, ComponentConfig> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    let mut queue: VecDeque<ComponentConfig> = declared.iter().cloned().collect();

    while let Some(component) = queue.pop_front() {
        if effective.contains_key(&component.name) {
            continue;
        }
        for dependency in &component.auto_load {
            if !effective.contains_key(dependency) {
                queue.push_back(ComponentConfig {
                    name: dependency.clone(),
                    params: serde_yaml::Mapping::new(),
                    auto_load: Vec::new(),
                });
            }
        }
        order.push(component.name.clone());
        effective.insert(component.name.clone(), component);
    }

    order
        .into_iter()
        .filter_map(|name| effective.remove(&name))
        .collect()
}

/// A running (or torn-down) Hearth node.
pub struct Node {
    components: Vec<Arc<dyn Component>>,
    ctx: Context,
    startup_errors: Vec<String>,
}

impl Node {
    /// Build a node from `config`: fold autoload dependencies, instantiate
    /// every component via `factories`, stable-sort by priority, and run
    /// `setup()` on each in order. Setup failures (including unknown
    /// component names) don't abort the build; they're collected and
    /// available via [`Node::startup_errors`], and the node still attempts
    /// to start every other component.
    pub async fn build(
        config: &NodeConfig,
        factories: &HashMap<String, ComponentFactory>,
        ctx: Context,
    ) -> Self {
        let effective = fold_autoload_dependencies(&config.components);
        let mut components = Vec::new();
        let mut startup_errors = Vec::new();

        for entry in &effective {
            match factories.get(&entry.name) {
                Some(factory) => match factory(entry) {
                    Ok(built) => components.extend(built),
                    Err(err) => startup_errors.push(format!("{}: {err}", entry.name)),
                },
                None => startup_errors.push(format!(
                    "{}",
                    NodeError::UnknownComponent(entry.name.clone())
                )),
            }
        }

        components.sort_by_key(|component| component.priority());

        for component in &components {
            if let Err(err) = component.setup(&ctx).await {
                tracing::error!(component = component.name(), error = %err, "component setup failed");
                startup_errors.push(format!("{}: {err}", component.name()));
            }
        }

        Self {
            components,
            ctx,
            startup_errors,
        }
    }

    /// Errors accumulated while building this node (unknown component
    /// names, or components whose `setup()` returned an error).
    #[must_use]
    pub fn startup_errors(&self) -> &[String] {
        &self.startup_errors
    }

    /// The node's ambient context.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Cancel the root token, then call `close()` on every component
    /// regardless of earlier failures, aggregating any errors.
    ///
    /// # Errors
    /// Returns [`NodeError::ShutdownFailed`] if any component's `close()`
    /// failed.
    pub async fn shutdown(self) -> Result<(), NodeError> {
        self.ctx.root_cancellation.cancel();
        let mut failures = Vec::new();
        for component in &self.components {
            if let Err(err) = component.close(&self.ctx).await {
                tracing::error!(component = component.name(), error = %err, "component close failed");
                failures.push(format!("{}: {err}", component.name()));
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(NodeError::ShutdownFailed(failures.len(), failures))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::priority::InitializationPriority;
    use async_trait::async_trait;
    use hearth_config::MacAddress;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Recorder {
        name: &'static str,
        priority: InitializationPriority,
        order: Arc<std::sync::Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl Component for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn priority(&self) -> InitializationPriority {
            self.priority
        }

        async fn setup(&self, _ctx: &Context) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.order
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(self.name);
            Ok(())
        }
    }

    fn node_config(components: Vec<ComponentConfig>) -> NodeConfig {
        let mut cfg = NodeConfig::new("node-a", [0x02, 0, 0, 0, 0, 1]).unwrap();
        cfg.components = components;
        cfg
    }

    fn bare(name: &str) -> ComponentConfig {
        ComponentConfig {
            name: name.to_owned(),
            params: serde_yaml::Mapping::new(),
            auto_load: Vec::new(),
        }
    }

    #[tokio::test]
    async fn setup_runs_in_priority_order_not_declaration_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let late_order = Arc::clone(&order);
        let bus_order = Arc::clone(&order);

        let mut factories: HashMap<String, crate::constructor::ComponentFactory> = HashMap::new();
        factories.insert(
            "late".to_owned(),
            Arc::new(move |_: &ComponentConfig| {
                Ok(vec![Arc::new(Recorder {
                    name: "late",
                    priority: InitializationPriority::Late,
                    order: Arc::clone(&late_order),
                }) as Arc<dyn Component>])
            }),
        );
        factories.insert(
            "bus".to_owned(),
            Arc::new(move |_: &ComponentConfig| {
                Ok(vec![Arc::new(Recorder {
                    name: "bus",
                    priority: InitializationPriority::Bus,
                    order: Arc::clone(&bus_order),
                }) as Arc<dyn Component>])
            }),
        );

        let config = node_config(vec![bare("late"), bare("bus")]);
        let node = Node::build(&config, &factories, Context::new()).await;
        assert!(node.startup_errors().is_empty());
        assert_eq!(
            *order.lock().unwrap_or_else(std::sync::PoisonError::into_inner),
            vec!["bus", "late"]
        );
    }

    #[tokio::test]
    async fn unknown_component_is_reported_but_others_still_start() {
        let hits = Arc::new(AtomicU32::new(0));
        let hits_clone = Arc::clone(&hits);
        let mut factories: HashMap<String, crate::constructor::ComponentFactory> = HashMap::new();
        factories.insert(
            "known".to_owned(),
            Arc::new(move |_: &ComponentConfig| {
                hits_clone.fetch_add(1, Ordering::SeqCst);
                Ok(Vec::new())
            }),
        );

        let config = node_config(vec![bare("unknown"), bare("known")]);
        let node = Node::build(&config, &factories, Context::new()).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(node.startup_errors().len(), 1);
    }

    #[test]
    fn autoload_dependencies_get_default_entries() {
        let declared = vec![ComponentConfig {
            name: "wifi".to_owned(),
            params: serde_yaml::Mapping::new(),
            auto_load: vec!["network".to_owned()],
        }];
        let effective = fold_autoload_dependencies(&declared);
        assert_eq!(effective.len(), 2);
        assert!(effective.iter().any(|c| c.name == "network"));
    }
}
