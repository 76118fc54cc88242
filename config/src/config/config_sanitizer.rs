// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use crate::config::{Error, ResidualConfig};

/// A trait for validating configs before they reach the state objects and
/// executors built from them.
pub trait ConfigSanitizer {
    /// Get the name of the sanitizer (e.g., for logging and error strings)
    fn get_sanitizer_name() -> String {
        let config_name = std::any::type_name::<Self>()
            .rsplit("::")
            .next()
            .unwrap_or("UnknownConfig");
        format!("{}Sanitizer", config_name)
    }

    /// Validate and process the config, returning an error on failure
    fn sanitize(residual_config: &ResidualConfig) -> Result<(), Error>;
}
