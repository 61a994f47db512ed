// SPDX-License-Identifier: Apache-2.0
//! Component constructors: `name -> zero or more components`.

use std::sync::Arc;

use hearth_config::ComponentConfig;

use crate::component::Component;
use crate::error::NodeError;

/// Builds zero or more [`Component`]s from one config entry.
pub type ComponentFactory =
    Arc<dyn Fn(&ComponentConfig) -> Result<Vec<Arc<dyn Component>>, NodeError> + Send + Sync>;
