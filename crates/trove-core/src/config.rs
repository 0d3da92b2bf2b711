//! Operation configuration types.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// How long a conflict decision stays in force within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecisionScope {
    /// The first decision of a batch is reused for every later conflict.
    #[default]
    ApplyToAll,
    /// The resolver is consulted for every conflict.
    PerItem,
}

/// Configuration shared by the operation engines.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct OpsConfig {
    /// Copy modification times and permissions onto copied files.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub preserve_metadata: bool,

    /// Scope of conflict decisions in multi-item transfers.
    #[builder(default)]
    #[serde(default)]
    pub batch_scope: DecisionScope,

    /// Number of past clipboard operations kept for recall.
    #[builder(default = "50")]
    #[serde(default = "default_clipboard_history")]
    pub clipboard_history: usize,

    /// Copy the target of symlinks instead of recreating the link.
    #[builder(default = "false")]
    #[serde(default)]
    pub follow_symlinks: bool,

    /// How many times a resolver may propose an unusable rename before the
    /// item is given up on.
    #[builder(default = "16")]
    #[serde(default = "default_max_rename_attempts")]
    pub max_rename_attempts: u32,
}

fn default_true() -> bool {
    true
}

fn default_clipboard_history() -> usize {
    50
}

fn default_max_rename_attempts() -> u32 {
    16
}

impl OpsConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.clipboard_history == Some(0) {
            return Err("Clipboard history must hold at least one entry".to_string());
        }
        if self.max_rename_attempts == Some(0) {
            return Err("At least one rename attempt is required".to_string());
        }
        Ok(())
    }
}

impl OpsConfig {
    /// Create a new config builder.
    pub fn builder() -> OpsConfigBuilder {
        OpsConfigBuilder::default()
    }
}

impl Default for OpsConfig {
    fn default() -> Self {
        Self {
            preserve_metadata: true,
            batch_scope: DecisionScope::ApplyToAll,
            clipboard_history: default_clipboard_history(),
            follow_symlinks: false,
            max_rename_attempts: default_max_rename_attempts(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = OpsConfig::builder()
            .clipboard_history(10usize)
            .batch_scope(DecisionScope::PerItem)
            .build()
            .unwrap();

        assert_eq!(config.clipboard_history, 10);
        assert_eq!(config.batch_scope, DecisionScope::PerItem);
        assert!(config.preserve_metadata);
        assert_eq!(config.max_rename_attempts, 16);
    }

    #[test]
    fn test_config_rejects_empty_history() {
        let result = OpsConfig::builder().clipboard_history(0usize).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_config_default() {
        let config = OpsConfig::default();
        assert_eq!(config.clipboard_history, 50);
        assert_eq!(config.batch_scope, DecisionScope::ApplyToAll);
        assert!(!config.follow_symlinks);
    }
}
