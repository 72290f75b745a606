use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{asset::Name, conversion::ConversionPair};

pub const DEFAULT_AUTHORITY: &str = "vgrab";
pub const DEFAULT_MEMO_LIMIT: usize = 256;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Ledger-wide settings. Every field has a default, so an empty JSON
/// object is a complete config.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    /// The ledger's own identity; transfers to it are conversion requests.
    pub authority: Name,
    /// Maximum memo size in bytes.
    pub memo_limit: usize,
    pub conversion: ConversionPair,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            authority: Name::from_static(DEFAULT_AUTHORITY),
            memo_limit: DEFAULT_MEMO_LIMIT,
            conversion: ConversionPair::default(),
        }
    }
}

impl LedgerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects a config the ledger could not run with. The memo limit must
    /// fit every memo the ledger writes itself on conversion payouts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.conversion
            .validate()
            .map_err(|err| ConfigError::Invalid(err.to_string()))?;
        let required = self.conversion.longest_memo_len();
        if self.memo_limit < required {
            return Err(ConfigError::Invalid(format!(
                "memo_limit {} is shorter than the {required}-byte conversion memos",
                self.memo_limit
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::Symbol;

    #[test]
    fn empty_object_yields_defaults() {
        let config = LedgerConfig::from_json("{}").unwrap();
        assert_eq!(config, LedgerConfig::default());
        assert_eq!(config.authority.as_str(), "vgrab");
        assert_eq!(config.memo_limit, 256);
        assert_eq!(
            config.conversion.fractional,
            Symbol::new(4, "ZKSPLAY").unwrap()
        );
        assert_eq!(config.conversion.coarse, Symbol::new(0, "ZKS").unwrap());
    }

    #[test]
    fn overrides_are_parsed_from_text_forms() {
        let config = LedgerConfig::from_json(
            r#"{
                "authority": "swapper",
                "memo_limit": 64,
                "conversion": { "fractional": "2,CENT", "coarse": "0,DOLLAR" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.authority.as_str(), "swapper");
        assert_eq!(config.memo_limit, 64);
        assert_eq!(config.conversion.ratio(), 100);
    }

    #[test]
    fn invalid_configs_are_rejected() {
        assert!(matches!(
            LedgerConfig::from_json(r#"{ "memo_limit": 0 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            LedgerConfig::from_json(
                r#"{ "conversion": { "fractional": "0,A", "coarse": "2,B" } }"#
            ),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            LedgerConfig::from_json(r#"{ "authority": "NOT VALID" }"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            LedgerConfig::from_json(r#"{ "unknown": 1 }"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn memo_limit_must_fit_conversion_memos() {
        let err = LedgerConfig::from_json(r#"{ "memo_limit": 16 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("36-byte"));

        assert!(LedgerConfig::from_json(r#"{ "memo_limit": 35 }"#).is_err());
        let config = LedgerConfig::from_json(r#"{ "memo_limit": 36 }"#).unwrap();
        assert_eq!(config.memo_limit, 36);

        // "Surplus CENT from swapping to DOLLAR"
        let raw = r#"{
            "memo_limit": 36,
            "conversion": { "fractional": "2,CENT", "coarse": "0,DOLLAR" }
        }"#;
        assert_eq!(LedgerConfig::from_json(raw).unwrap().memo_limit, 36);
        let raw = r#"{
            "memo_limit": 36,
            "conversion": { "fractional": "2,CENTS", "coarse": "0,DOLLAR" }
        }"#;
        assert!(matches!(LedgerConfig::from_json(raw), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = LedgerConfig::load("/nonexistent/vgrab.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/vgrab.json"));
    }
}
