//! Project feature flags.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Detected characteristics of the target project. Missing keys are false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureSet {
    pub has_frontend: bool,
    pub has_backend: bool,
    pub has_database: bool,
    pub has_auth: bool,
    pub has_api_endpoints: bool,
    pub has_realtime: bool,
    pub has_file_uploads: bool,
    pub has_payments: bool,
    pub has_ci_cd: bool,
    pub has_docker: bool,
    pub is_cli_tool: bool,
    pub is_library: bool,
}

impl FeatureSet {
    /// Flag names in document order.
    pub const NAMES: [&'static str; 12] = [
        "has_frontend",
        "has_backend",
        "has_database",
        "has_auth",
        "has_api_endpoints",
        "has_realtime",
        "has_file_uploads",
        "has_payments",
        "has_ci_cd",
        "has_docker",
        "is_cli_tool",
        "is_library",
    ];

    /// A flag is set if any source sets it.
    pub fn any_of<I>(sources: I) -> Self
    where
        I: IntoIterator<Item = FeatureSet>,
    {
        sources.into_iter().fold(Self::default(), |acc, s| acc.union(&s))
    }

    pub fn union(&self, other: &FeatureSet) -> Self {
        Self {
            has_frontend: self.has_frontend || other.has_frontend,
            has_backend: self.has_backend || other.has_backend,
            has_database: self.has_database || other.has_database,
            has_auth: self.has_auth || other.has_auth,
            has_api_endpoints: self.has_api_endpoints || other.has_api_endpoints,
            has_realtime: self.has_realtime || other.has_realtime,
            has_file_uploads: self.has_file_uploads || other.has_file_uploads,
            has_payments: self.has_payments || other.has_payments,
            has_ci_cd: self.has_ci_cd || other.has_ci_cd,
            has_docker: self.has_docker || other.has_docker,
            is_cli_tool: self.is_cli_tool || other.is_cli_tool,
            is_library: self.is_library || other.is_library,
        }
    }

    pub fn get(&self, name: &str) -> Option<bool> {
        self.flag(name).map(|f| *f)
    }

    /// Set a flag by name. Returns false for an unknown name.
    pub fn set(&mut self, name: &str, value: bool) -> bool {
        match self.flag_mut(name) {
            Some(flag) => {
                *flag = value;
                true
            }
            None => false,
        }
    }

    /// Build from a name -> bool map, ignoring unknown names.
    pub fn from_map(map: &BTreeMap<String, bool>) -> Self {
        let mut features = Self::default();
        for (name, value) in map {
            features.set(name, *value);
        }
        features
    }

    /// (name, value) pairs in document order.
    pub fn flags(&self) -> impl Iterator<Item = (&'static str, bool)> + '_ {
        Self::NAMES
            .into_iter()
            .filter_map(move |name| self.get(name).map(|v| (name, v)))
    }

    fn flag(&self, name: &str) -> Option<&bool> {
        Some(match name {
            "has_frontend" => &self.has_frontend,
            "has_backend" => &self.has_backend,
            "has_database" => &self.has_database,
            "has_auth" => &self.has_auth,
            "has_api_endpoints" => &self.has_api_endpoints,
            "has_realtime" => &self.has_realtime,
            "has_file_uploads" => &self.has_file_uploads,
            "has_payments" => &self.has_payments,
            "has_ci_cd" => &self.has_ci_cd,
            "has_docker" => &self.has_docker,
            "is_cli_tool" => &self.is_cli_tool,
            "is_library" => &self.is_library,
            _ => return None,
        })
    }

    fn flag_mut(&mut self, name: &str) -> Option<&mut bool> {
        Some(match name {
            "has_frontend" => &mut self.has_frontend,
            "has_backend" => &mut self.has_backend,
            "has_database" => &mut self.has_database,
            "has_auth" => &mut self.has_auth,
            "has_api_endpoints" => &mut self.has_api_endpoints,
            "has_realtime" => &mut self.has_realtime,
            "has_file_uploads" => &mut self.has_file_uploads,
            "has_payments" => &mut self.has_payments,
            "has_ci_cd" => &mut self.has_ci_cd,
            "has_docker" => &mut self.has_docker,
            "is_cli_tool" => &mut self.is_cli_tool,
            "is_library" => &mut self.is_library,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_of_is_or_fold() {
        let prd = FeatureSet {
            has_backend: true,
            ..Default::default()
        };
        let codebase = FeatureSet {
            has_docker: true,
            ..Default::default()
        };
        let merged = FeatureSet::any_of([prd, codebase, FeatureSet::default()]);
        assert!(merged.has_backend);
        assert!(merged.has_docker);
        assert!(!merged.has_frontend);
        assert_eq!(FeatureSet::any_of(Vec::new()), FeatureSet::default());
    }

    #[test]
    fn test_missing_keys_default_false() {
        let features: FeatureSet = serde_json::from_str(r#"{"has_payments": true}"#).unwrap();
        assert!(features.has_payments);
        assert!(!features.is_cli_tool);
    }

    #[test]
    fn test_set_by_name() {
        let mut features = FeatureSet::default();
        assert!(features.set("has_realtime", true));
        assert!(!features.set("has_blockchain", true));
        assert_eq!(features.get("has_realtime"), Some(true));
        assert_eq!(features.get("has_blockchain"), None);
    }

    #[test]
    fn test_flags_follow_document_order() {
        let names: Vec<&str> = FeatureSet::default().flags().map(|(n, _)| n).collect();
        assert_eq!(names, FeatureSet::NAMES);
        let json = serde_json::to_value(FeatureSet::default()).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 12);
    }
}
