use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::env::EnvResolver;

pub const TEST_NAME_KEY: &str = "testName";

#[derive(Debug, Error)]
pub enum TestInfoError {
    #[error("Test description has no '{0}' entry")]
    MissingInfo(String),
}

/// Description of the test being run.
///
/// `info` carries test metadata such as `testName`; `default_env` carries the
/// default values handed out through [`EnvResolver`]. Lookups in both tables
/// ignore ASCII case because the configuration layer lowercases keys.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TestInfo {
    pub info: BTreeMap<String, String>,
    pub default_env: BTreeMap<String, String>,
}

impl TestInfo {
    pub fn get_test_info(&self, key: &str) -> Option<&str> {
        lookup(&self.info, key)
    }

    pub fn set_test_info(&mut self, key: &str, value: &str) {
        self.info.retain(|k, _| !k.eq_ignore_ascii_case(key));
        self.info.insert(key.to_string(), value.to_string());
    }

    pub fn test_name(&self) -> Result<&str, TestInfoError> {
        self.get_test_info(TEST_NAME_KEY)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| TestInfoError::MissingInfo(TEST_NAME_KEY.to_string()))
    }

    pub fn get_default_env(&self, name: &str) -> Option<&str> {
        lookup(&self.default_env, name)
    }

    pub fn set_default_env(&mut self, name: &str, value: &str) {
        self.default_env.retain(|k, _| !k.eq_ignore_ascii_case(name));
        self.default_env.insert(name.to_string(), value.to_string());
    }
}

impl EnvResolver for TestInfo {
    fn resolve(&self, name: &str, fallback: Option<&str>) -> String {
        self.get_default_env(name)
            .or(fallback)
            .unwrap_or_default()
            .to_string()
    }
}

fn lookup<'a>(table: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    table
        .get(key)
        .or_else(|| {
            table
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v)
        })
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_prefers_configured_default() {
        let mut info = TestInfo::default();
        info.set_default_env("OFI_INTERFACE", "eth0");

        assert_eq!(info.resolve("OFI_INTERFACE", Some("ib0")), "eth0");
    }

    #[test]
    fn resolve_uses_fallback_then_empty_string() {
        let info = TestInfo::default();

        assert_eq!(info.resolve("CRT_PHY_ADDR_STR", Some("ofi+sockets")), "ofi+sockets");
        assert_eq!(info.resolve("ORT_PATH", None), "");
    }

    #[test]
    fn lookups_ignore_case_of_stored_keys() {
        let mut info = TestInfo::default();
        info.default_env.insert("ofi_port".to_string(), "23350".to_string());
        info.info.insert("testname".to_string(), "pool_basic".to_string());

        assert_eq!(info.get_default_env("OFI_PORT"), Some("23350"));
        assert_eq!(info.test_name().unwrap(), "pool_basic");
    }

    #[test]
    fn set_test_info_replaces_differently_cased_key() {
        let mut info = TestInfo::default();
        info.info.insert("testname".to_string(), "old".to_string());

        info.set_test_info(TEST_NAME_KEY, "new");

        assert_eq!(info.info.len(), 1);
        assert_eq!(info.test_name().unwrap(), "new");
    }

    #[test]
    fn missing_or_empty_test_name_is_an_error() {
        let mut info = TestInfo::default();
        assert!(matches!(info.test_name(), Err(TestInfoError::MissingInfo(_))));

        info.set_test_info(TEST_NAME_KEY, "");
        assert!(info.test_name().is_err());
    }
}
