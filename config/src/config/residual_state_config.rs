// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use crate::config::{config_sanitizer::ConfigSanitizer, Error, ResidualConfig};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_RESIDUALS_PER_SLOT: usize = 1 << 20;

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResidualStateConfig {
    /// Maximum number of pending residuals a single slot may hold within one
    /// epoch. Appends beyond the limit are rejected.
    pub max_residuals_per_slot: usize,
    /// If set, merging is refused while workers are still registered with the
    /// state object instead of relying on the caller's barrier alone.
    pub enforce_quiescence: bool,
}

impl Default for ResidualStateConfig {
    fn default() -> Self {
        Self {
            max_residuals_per_slot: DEFAULT_MAX_RESIDUALS_PER_SLOT,
            enforce_quiescence: true,
        }
    }
}

impl ConfigSanitizer for ResidualStateConfig {
    fn sanitize(residual_config: &ResidualConfig) -> Result<(), Error> {
        let sanitizer_name = Self::get_sanitizer_name();
        let state_config = &residual_config.state;

        if state_config.max_residuals_per_slot == 0 {
            return Err(Error::ConfigSanitizerFailed(
                sanitizer_name,
                "max_residuals_per_slot must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
