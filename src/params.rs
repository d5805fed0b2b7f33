use maplit::btreemap;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, path::PathBuf};

pub mod keys {
    pub const TYPE_ID: &str = "type";
    pub const UUID: &str = "uuid";
    pub const NAME: &str = "name";
    pub const MOUNT_PATH: &str = "mount_path";
    pub const VOLUME_NAME: &str = "volume_name";
    pub const NEGATIVE_VNODE_CACHE: &str = "negative_vnode_cache";
    pub const NO_APPLE_DOUBLE: &str = "no_apple_double";
    pub const ADD_TO_FAVORITES: &str = "add_to_favorites";
    pub const ADVANCED_OPTIONS: &str = "advanced_options";
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl Value {
    /// Interpret text from the command line. Booleans and integers are
    /// recognized, everything else stays a string.
    pub fn parse(text: &str) -> Value {
        if let Ok(b) = text.parse() {
            return Value::Bool(b);
        }
        match text.parse() {
            Ok(i) => Value::Int(i),
            Err(_) => Value::Str(text.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(BTreeMap<String, Value>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        match self.0.get(key)? {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn flag(&self, key: &str) -> bool {
        match self.0.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Int(i)) => *i != 0,
            Some(Value::Str(s)) => matches!(s.as_str(), "true" | "yes" | "1"),
            None => false,
        }
    }

    pub fn mount_path(&self) -> Option<PathBuf> {
        self.str(keys::MOUNT_PATH).map(PathBuf::from)
    }

    /// Merge `defaults` underneath `self`: keys already present win, missing
    /// keys come from `defaults`, then from [`generic_defaults`].
    pub fn with_defaults(&self, defaults: &Parameters) -> Parameters {
        let mut merged = generic_defaults();
        merged.extend(defaults);
        merged.extend(self);
        merged
    }

    pub fn extend(&mut self, other: &Parameters) {
        for (k, v) in other.iter() {
            self.0.insert(k.clone(), v.clone());
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Parameters(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<BTreeMap<String, Value>> for Parameters {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Parameters(map)
    }
}

pub fn generic_defaults() -> Parameters {
    Parameters(btreemap! {
        keys::NEGATIVE_VNODE_CACHE.to_string() => Value::Bool(false),
        keys::NO_APPLE_DOUBLE.to_string() => Value::Bool(true),
        keys::ADD_TO_FAVORITES.to_string() => Value::Bool(false),
    })
}
