// Copyright © Aptos Foundation
// Parts of the project are originally copyright © Meta Platforms, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::config::{config_sanitizer::ConfigSanitizer, Error, ResidualConfig};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutionConfig {
    /// Number of worker threads used for parallel epoch execution
    pub concurrency_level: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            concurrency_level: num_cpus::get(),
        }
    }
}

impl ConfigSanitizer for ExecutionConfig {
    fn sanitize(residual_config: &ResidualConfig) -> Result<(), Error> {
        let sanitizer_name = Self::get_sanitizer_name();

        if residual_config.execution.concurrency_level == 0 {
            return Err(Error::ConfigSanitizerFailed(
                sanitizer_name,
                "concurrency_level must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
