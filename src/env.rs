//! Environment defaults for the `daos_test` launch.
//!
//! [`EnvResolver`] is the contract a test description fulfils to hand out
//! default values for named variables. [`EnvironmentMap`] is the per-run set of
//! bindings built from it and passed to the launcher.

use std::collections::{BTreeMap, btree_map};

use serde::Serialize;

/// Default transport provider when `CRT_PHY_ADDR_STR` has no configured value.
pub const DEFAULT_PHY_ADDR_STR: &str = "ofi+sockets";

/// Default network interface when `OFI_INTERFACE` has no configured value.
pub const DEFAULT_OFI_INTERFACE: &str = "ib0";

/// Variable holding the directory prefix of the MPI launcher.
pub const ORT_PATH: &str = "ORT_PATH";

/// Variables exported to `daos_test`, with the fallback used when the
/// resolver has nothing for them.
pub const DAOS_TEST_ENV: [(&str, Option<&str>); 9] = [
    ("LD_LIBRARY_PATH", None),
    ("CCI_CONFIG", None),
    ("CRT_PHY_ADDR_STR", Some(DEFAULT_PHY_ADDR_STR)),
    ("DD_LOG", None),
    ("ABT_ENV_MAX_NUM_XSTREAMS", None),
    ("ABT_MAX_NUM_XSTREAMS", None),
    ("PATH", None),
    ("OFI_PORT", None),
    ("OFI_INTERFACE", Some(DEFAULT_OFI_INTERFACE)),
];

/// Source of default values for environment variables.
pub trait EnvResolver: Send + Sync {
    /// Returns the default for `name`, else `fallback`, else an empty string.
    fn resolve(&self, name: &str, fallback: Option<&str>) -> String;
}

/// Resolved variable bindings for a single launch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EnvironmentMap(BTreeMap<String, String>);

impl EnvironmentMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves every variable in `keys` through `resolver`.
    pub fn resolve_all(resolver: &dyn EnvResolver, keys: &[(&str, Option<&str>)]) -> Self {
        keys.iter()
            .map(|(name, fallback)| (name.to_string(), resolver.resolve(name, *fallback)))
            .collect()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.0.iter()
    }
}

impl FromIterator<(String, String)> for EnvironmentMap {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a EnvironmentMap {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    struct FixedResolver(HashMap<&'static str, &'static str>);

    impl EnvResolver for FixedResolver {
        fn resolve(&self, name: &str, fallback: Option<&str>) -> String {
            self.0
                .get(name)
                .copied()
                .or(fallback)
                .unwrap_or_default()
                .to_string()
        }
    }

    #[test]
    fn resolve_all_covers_every_daos_test_variable() {
        let resolver = FixedResolver(HashMap::from([("OFI_PORT", "23350"), ("PATH", "/usr/bin")]));

        let env = EnvironmentMap::resolve_all(&resolver, &DAOS_TEST_ENV);

        assert_eq!(env.len(), 9);
        for (name, _) in DAOS_TEST_ENV {
            assert!(env.contains_key(name), "missing {name}");
        }
        assert_eq!(env.get("OFI_PORT"), Some("23350"));
        assert_eq!(env.get("PATH"), Some("/usr/bin"));
        assert_eq!(env.get("CRT_PHY_ADDR_STR"), Some("ofi+sockets"));
        assert_eq!(env.get("OFI_INTERFACE"), Some("ib0"));
        assert_eq!(env.get("DD_LOG"), Some(""));
    }

    #[test]
    fn configured_values_win_over_fallbacks() {
        let resolver = FixedResolver(HashMap::from([("CRT_PHY_ADDR_STR", "ofi+verbs"), ("OFI_INTERFACE", "eth0")]));

        let env = EnvironmentMap::resolve_all(&resolver, &DAOS_TEST_ENV);

        assert_eq!(env.get("CRT_PHY_ADDR_STR"), Some("ofi+verbs"));
        assert_eq!(env.get("OFI_INTERFACE"), Some("eth0"));
    }

    #[test]
    fn serializes_as_a_flat_object() {
        let mut env = EnvironmentMap::new();
        env.insert("OFI_PORT", "23350");

        let json = serde_json::to_string(&env).unwrap();

        assert_eq!(json, r#"{"OFI_PORT":"23350"}"#);
    }
}
