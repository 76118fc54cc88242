// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use crate::config::{
    config_sanitizer::ConfigSanitizer, Error, ExecutionConfig, ResidualStateConfig,
};
use serde::{Deserialize, Serialize};

/// The config for a residual state merge deployment: how account state objects
/// bound their queues, and how epochs are executed.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResidualConfig {
    pub state: ResidualStateConfig,
    pub execution: ExecutionConfig,
}

impl ConfigSanitizer for ResidualConfig {
    fn sanitize(residual_config: &ResidualConfig) -> Result<(), Error> {
        ResidualStateConfig::sanitize(residual_config)?;
        ExecutionConfig::sanitize(residual_config)
    }
}

impl ResidualConfig {
    /// Sanitizes the config, returning it on success.
    pub fn sanitized(self) -> Result<Self, Error> {
        Self::sanitize(&self)?;
        Ok(self)
    }
}
