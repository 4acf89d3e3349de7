//! Layout settings
//!
//! Settings are plain serde structs so hosts can keep them alongside their
//! own application settings and hand them over as JSON.

use crate::error::LayoutResult;
use crate::node::FontSize;
use serde::{Deserialize, Serialize};

/// How far a recomputation pass reaches after an edit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateScope {
    /// Recompute the whole equation from its root
    #[default]
    Root,
    /// Recompute the edited subtree, then re-aggregate its ancestors only
    Subtree,
}

/// Settings for an [`EquationTree`](crate::EquationTree)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    /// Size class given to newly created containers
    pub default_font_size: FontSize,
    /// Reach of the pass run after each mutation
    pub update_scope: UpdateScope,
}

impl LayoutSettings {
    /// Parse settings from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> LayoutResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse settings from JSON, falling back to defaults on malformed input
    pub fn from_json_or_default(json: &str) -> Self {
        match Self::from_json(json) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Failed to parse layout settings, using defaults: {}", e);
                Self::default()
            }
        }
    }

    pub fn to_json(&self) -> LayoutResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LayoutError;

    #[test]
    fn test_defaults() {
        let settings = LayoutSettings::default();
        assert_eq!(settings.default_font_size, FontSize::Normal);
        assert_eq!(settings.update_scope, UpdateScope::Root);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings = LayoutSettings::from_json(r#"{ "update_scope": "subtree" }"#).unwrap();
        assert_eq!(settings.update_scope, UpdateScope::Subtree);
        assert_eq!(settings.default_font_size, FontSize::Normal);
    }

    #[test]
    fn test_json_roundtrip() {
        let settings = LayoutSettings {
            default_font_size: FontSize::Smallest,
            update_scope: UpdateScope::Subtree,
        };
        let json = settings.to_json().unwrap();
        assert_eq!(LayoutSettings::from_json(&json).unwrap(), settings);
    }

    #[test]
    fn test_malformed_json() {
        let err = LayoutSettings::from_json("{ not json").unwrap_err();
        assert!(matches!(err, LayoutError::Settings(_)));

        let settings = LayoutSettings::from_json_or_default(r#"{ "update_scope": "sideways" }"#);
        assert_eq!(settings, LayoutSettings::default());
    }
}
