//! Verifier configuration, loadable from TOML.
//!
//! ```toml
//! role = "customer"
//! encoding = "base64"
//! strict = true
//!
//! [[results]]
//! code = 0
//! verdict = "ok"
//! name = "Clean"
//! ```

use adscore_primitives::{create_formatter, Base64, Base64Variant, Formatter, Hex};
use serde::{Deserialize, Serialize};

use crate::errors::{ConfigError, Result};
use crate::signature::SignRole;
use crate::verdict::{VerdictEntry, VerdictTable};

fn default_encoding() -> String {
    "base64".to_owned()
}

const fn default_strict() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignatureConfig {
    #[serde(default)]
    pub role: SignRole,
    /// Formatter name, as accepted by [`create_formatter`].
    #[serde(default = "default_encoding")]
    pub encoding: String,
    /// Fail on out-of-alphabet characters instead of dropping them.
    #[serde(default = "default_strict")]
    pub strict: bool,
    /// Overrides the default verdict table, order preserved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<VerdictEntry>>,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self { role: SignRole::default(), encoding: default_encoding(), strict: default_strict(), results: None }
    }
}

impl SignatureConfig {
    /// # Errors
    ///
    /// `ConfigError::Invalid` on malformed TOML or unknown keys.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        config.formatter()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// `ConfigError::Invalid` if the configuration cannot be represented.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(self).map_err(|e| ConfigError::Invalid(e.to_string()))?)
    }

    /// Formatter named by `encoding`, with `strict` applied to base64.
    ///
    /// # Errors
    ///
    /// `ConfigError::Invalid` for an unknown encoding name.
    pub fn formatter(&self) -> Result<Box<dyn Formatter + Send + Sync>> {
        let named = create_formatter(&self.encoding).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.strict {
            return Ok(named);
        }
        let variant = match self.encoding.to_ascii_lowercase().as_str() {
            "hex" => return Ok(Box::new(Hex)),
            "base64-original" => Base64Variant::Original,
            "base64-original-nopad" => Base64Variant::OriginalNoPadding,
            "base64-urlsafe" => Base64Variant::UrlSafe,
            _ => Base64Variant::UrlSafeNoPadding,
        };
        Ok(Box::new(Base64::new(variant, false)))
    }

    #[must_use]
    pub fn verdict_table(&self) -> VerdictTable {
        self.results
            .as_ref()
            .map_or_else(VerdictTable::default, |entries| entries.iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SignatureError;

    #[test]
    fn empty_document_is_default() {
        let config = SignatureConfig::from_toml_str("").unwrap();
        assert_eq!(config, SignatureConfig::default());
        assert_eq!(config.verdict_table(), VerdictTable::default());
        assert_eq!(config.formatter().unwrap().format(&[0xfb, 0xff]), "-_8");
    }

    #[test]
    fn custom_results_keep_order() {
        let config = SignatureConfig::from_toml_str(
            r#"
            role = "master"
            encoding = "hex"

            [[results]]
            code = 9
            verdict = "bot"

            [[results]]
            code = 0
            verdict = "ok"
            name = "Clean"
            "#,
        )
        .unwrap();
        assert_eq!(config.role, SignRole::Master);
        let table = config.verdict_table();
        let codes: Vec<i64> = table.iter().map(|e| e.code).collect();
        assert_eq!(codes, [9, 0]);
        assert_eq!(table.get(9).unwrap().name, None);
        assert_eq!(config.formatter().unwrap().format(&[0xAB]), "ab");
    }

    #[test]
    fn lenient_base64() {
        let config = SignatureConfig { strict: false, ..SignatureConfig::default() };
        assert_eq!(config.formatter().unwrap().parse("-_8*").unwrap(), vec![0xfb, 0xff]);
    }

    #[test]
    fn rejects_bad_documents() {
        for doc in ["role = \"admin\"", "encoding = \"rot13\"", "colour = \"blue\"", "strict = 3"] {
            assert!(
                matches!(SignatureConfig::from_toml_str(doc), Err(SignatureError::Config(ConfigError::Invalid(_)))),
                "{doc}"
            );
        }
    }

    #[test]
    fn toml_round_trip() {
        let config = SignatureConfig {
            role: SignRole::Master,
            results: Some(vec![VerdictEntry::new(6, "proxy", "Proxy")]),
            ..SignatureConfig::default()
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(SignatureConfig::from_toml_str(&text).unwrap(), config);
    }
}
