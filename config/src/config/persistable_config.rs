// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use crate::config::{Error, ResidualConfig};
use serde::{de::DeserializeOwned, Serialize};
use std::{fs, path::Path};

pub trait PersistableConfig: Serialize + DeserializeOwned {
    /// Label used in errors, e.g. "residual config".
    const CONFIG_NAME: &'static str;

    /// Reads and parses the config stored at `path`
    fn load_config<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let source = format!("{} {}", Self::CONFIG_NAME, path.as_ref().display());
        let serialized_config =
            fs::read_to_string(&path).map_err(|error| Error::IO(source.clone(), error))?;
        serde_yaml::from_str(&serialized_config).map_err(|error| Error::Yaml(source, error))
    }

    /// Writes the config as YAML to `output_file`, replacing any previous file
    fn save_config<P: AsRef<Path>>(&self, output_file: P) -> Result<(), Error> {
        let target = format!("{} {}", Self::CONFIG_NAME, output_file.as_ref().display());
        let serialized_config =
            serde_yaml::to_string(&self).map_err(|error| Error::Yaml(target.clone(), error))?;
        fs::write(&output_file, serialized_config).map_err(|error| Error::IO(target, error))
    }

    /// Parses the config from an in-memory YAML document
    fn parse_serialized_config(serialized_config: &str) -> Result<Self, Error> {
        serde_yaml::from_str(serialized_config)
            .map_err(|error| Error::Yaml(Self::CONFIG_NAME.to_string(), error))
    }
}

// We only implement PersistableConfig for the configs that should be read/written to disk
impl PersistableConfig for ResidualConfig {
    const CONFIG_NAME: &'static str = "residual config";
}
