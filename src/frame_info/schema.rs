//! Side-channel data types and their JSON form.
//!
//! The instrumentation hook serializes the map as
//! `{"<path>/<function>:<line>": {"class": "...", "locals": {"<name>": {...}}}}`.
//! Locals keep their recording order.

use crate::utils::error::FrameInfoError;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Statistics for a single local variable of a frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalStats {
    pub name: String,

    /// Declared (runtime) type name
    #[serde(rename = "type")]
    pub type_name: String,

    pub is_none: bool,

    /// Length for sized values (strings, lists), otherwise 0
    pub length: u64,

    /// Rendered value for scalars, otherwise empty
    pub value: String,
}

/// Supplementary information for one frame
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameInfo {
    /// Class of the receiver, empty for free functions
    #[serde(rename = "class", default)]
    pub class_name: String,

    #[serde(default, with = "locals_by_name")]
    pub locals: Vec<LocalStats>,
}

/// Frame identity key -> frame info
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameInfoMap(BTreeMap<String, FrameInfo>);

/// Identity key for a frame: `<path>/<function>:<line>` on the raw path
pub fn frame_key(path: &str, function: &str, line: u32) -> String {
    format!("{}/{}:{}", path, function, line)
}

impl FrameInfoMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the JSON string recorded alongside an exception event
    ///
    /// An empty string decodes to an empty map.
    pub fn from_json(json: &str) -> Result<Self, FrameInfoError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, FrameInfoError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn insert(&mut self, key: String, info: FrameInfo) {
        self.0.insert(key, info);
    }

    pub fn get(&self, key: &str) -> Option<&FrameInfo> {
        self.0.get(key)
    }

    pub fn lookup(&self, path: &str, function: &str, line: u32) -> Option<&FrameInfo> {
        self.get(&frame_key(path, function, line))
    }

    /// Layer `other` over this map; its entries win on key collisions
    pub fn merged_with(&self, other: &FrameInfoMap) -> FrameInfoMap {
        let mut merged = self.clone();
        for (key, info) in &other.0 {
            merged.0.insert(key.clone(), info.clone());
        }
        merged
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Wire shape of one local's statistics (name is the map key)
#[derive(Serialize, Deserialize)]
struct LocalRecord {
    #[serde(rename = "type", default)]
    type_name: String,

    #[serde(default)]
    is_none: bool,

    #[serde(default, deserialize_with = "lenient_u64")]
    length: u64,

    #[serde(default, deserialize_with = "lenient_string")]
    value: String,
}

/// Length arrives as a number or as a stringified number
fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| D::Error::custom(format!("invalid length {}", n))),
        Value::String(s) if s.is_empty() => Ok(0),
        Value::String(s) => s
            .parse::<u64>()
            .map_err(|e| D::Error::custom(format!("invalid length '{}': {}", s, e))),
        other => Err(D::Error::custom(format!(
            "expected number or string, found {}",
            other
        ))),
    }
}

/// Scalar values arrive as strings, numbers or booleans
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

mod locals_by_name {
    use super::{LocalRecord, LocalStats};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::{Map, Value};

    pub fn serialize<S: Serializer>(locals: &[LocalStats], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(locals.iter().map(|local| {
            (
                local.name.as_str(),
                LocalRecord {
                    type_name: local.type_name.clone(),
                    is_none: local.is_none,
                    length: local.length,
                    value: local.value.clone(),
                },
            )
        }))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<LocalStats>, D::Error> {
        let raw = Map::<String, Value>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(name, value)| {
                let record: LocalRecord = serde_json::from_value(value)
                    .map_err(|e| D::Error::custom(format!("local '{}': {}", name, e)))?;
                Ok(LocalStats {
                    name,
                    type_name: record.type_name,
                    is_none: record.is_none,
                    length: record.length,
                    value: record.value,
                })
            })
            .collect()
    }
}
