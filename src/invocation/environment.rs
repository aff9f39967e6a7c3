//! Immutable environment snapshots.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};

use serde::de::Deserializer;
use serde::ser::{Error as _, SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

/// The process environment as it was at one instant.
///
/// Values are kept as OS strings so a dispatched child sees exactly what the
/// wrapper saw. Serializing a snapshot that holds a non-UTF-8 name or value
/// fails instead of silently mangling it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct EnvSnapshot {
    vars: BTreeMap<OsString, OsString>,
}

impl EnvSnapshot {
    /// Snapshot the live process environment.
    pub fn capture() -> Self {
        Self {
            vars: std::env::vars_os().collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, name: impl AsRef<OsStr>) -> Option<&OsStr> {
        self.vars.get(name.as_ref()).map(OsString::as_os_str)
    }

    pub fn contains(&self, name: impl AsRef<OsStr>) -> bool {
        self.vars.contains_key(name.as_ref())
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Variables in name order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.vars.iter(),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for EnvSnapshot
where
    K: Into<OsString>,
    V: Into<OsString>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

pub struct Iter<'a> {
    inner: btree_map::Iter<'a, OsString, OsString>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a OsStr, &'a OsStr);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|(k, v)| (k.as_os_str(), v.as_os_str()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a> IntoIterator for &'a EnvSnapshot {
    type Item = (&'a OsStr, &'a OsStr);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Serialize for EnvSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.vars.len()))?;
        for (name, value) in &self.vars {
            let name = name.to_str().ok_or_else(|| {
                S::Error::custom(format!(
                    "environment variable name {name:?} is not valid UTF-8"
                ))
            })?;
            let value = value.to_str().ok_or_else(|| {
                S::Error::custom(format!(
                    "environment variable {name} has a value that is not valid UTF-8"
                ))
            })?;
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for EnvSnapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let vars = BTreeMap::<String, String>::deserialize(deserializer)?;
        Ok(vars.into_iter().collect())
    }
}
