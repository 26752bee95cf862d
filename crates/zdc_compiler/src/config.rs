//! Compiler configuration (TOML). Every field is optional.
//!
//! ```toml
//! [emit]
//! indent_width = 4
//! parameter_max_amount = 1000
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use zdc_codegen_decorate::EmitOptions;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub emit: EmitOptions,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid compiler configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("emit.parameter_max_amount must be at least 1")]
    ZeroParameterAmount,
}

impl Config {
    pub fn from_toml_str(source: &str) -> Result<Config, ConfigError> {
        let config: Config = toml::from_str(source)?;
        if config.emit.parameter_max_amount == 0 {
            return Err(ConfigError::ZeroParameterAmount);
        }
        Ok(config)
    }
}
