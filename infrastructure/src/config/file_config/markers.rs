//! Routing marker configuration from TOML (`[markers]` section)
//!
//! Each list is optional; an omitted list keeps the built-in markers for
//! that intent.

use serde::{Deserialize, Serialize};
use sgr_domain::IntentMarkers;

/// Raw marker configuration from TOML
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileMarkersConfig {
    pub clarify: Option<Vec<String>>,
    pub report: Option<Vec<String>>,
    pub research: Option<Vec<String>>,
}

impl FileMarkersConfig {
    /// Merge the configured lists over the built-in markers.
    ///
    /// Markers are matched against lowercase words, so they are lowercased
    /// and trimmed here.
    pub fn to_markers(&self) -> IntentMarkers {
        let defaults = IntentMarkers::default();
        IntentMarkers {
            clarify: normalize(self.clarify.as_ref()).unwrap_or(defaults.clarify),
            report: normalize(self.report.as_ref()).unwrap_or(defaults.report),
            research: normalize(self.research.as_ref()).unwrap_or(defaults.research),
        }
    }
}

fn normalize(list: Option<&Vec<String>>) -> Option<Vec<String>> {
    list.map(|markers| markers.iter().map(|m| m.trim().to_lowercase()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_omitted_lists_keep_defaults() {
        let markers = FileMarkersConfig::default().to_markers();
        assert_eq!(markers, IntentMarkers::default());
    }

    #[test]
    fn test_configured_list_replaces_defaults() {
        let toml_str = r#"
[markers]
report = [" Draft ", "WRITE"]
"#;
        let config: super::super::FileConfig = toml::from_str(toml_str).unwrap();
        let markers = config.markers.to_markers();
        assert_eq!(markers.report, vec!["draft".to_string(), "write".to_string()]);
        assert_eq!(markers.clarify, IntentMarkers::default().clarify);
    }
}
