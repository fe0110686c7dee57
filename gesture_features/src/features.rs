//! The per-frame feature map.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Value of one derived feature.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Flag(bool),
    Level(f32),
}

impl FeatureValue {
    /// Truthiness used by the single/all/any rule forms.
    pub fn is_truthy(self) -> bool {
        match self {
            FeatureValue::Flag(b)  => b,
            FeatureValue::Level(x) => x != 0.0,
        }
    }

    /// Numeric view used by threshold comparisons (`true` = 1, `false` = 0).
    pub fn as_f32(self) -> f32 {
        match self {
            FeatureValue::Flag(true)  => 1.0,
            FeatureValue::Flag(false) => 0.0,
            FeatureValue::Level(x)    => x,
        }
    }
}

impl From<bool> for FeatureValue {
    fn from(b: bool) -> Self { FeatureValue::Flag(b) }
}

impl From<f32> for FeatureValue {
    fn from(x: f32) -> Self { FeatureValue::Level(x) }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Flag(b)  => write!(f, "{b}"),
            FeatureValue::Level(x) => write!(f, "{x:.2}"),
        }
    }
}

/// Feature name → value for one frame.  Built fresh every frame.
///
/// An absent key means "not detected", which is distinct from `Flag(false)`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FeatureMap {
    values: BTreeMap<String, FeatureValue>,
}

impl FeatureMap {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FeatureValue>) {
        self.values.insert(name.into(), value.into());
    }

    /// Insert `true` under `name` only when `detected` holds.
    pub fn set_if(&mut self, name: impl Into<String>, detected: bool) {
        if detected {
            self.insert(name, true);
        }
    }

    pub fn get(&self, name: &str) -> Option<FeatureValue> {
        self.values.get(name).copied()
    }

    /// Present and truthy.
    pub fn is_truthy(&self, name: &str) -> bool {
        self.get(name).is_some_and(FeatureValue::is_truthy)
    }

    pub fn is_empty(&self) -> bool { self.values.is_empty() }
    pub fn len(&self)      -> usize { self.values.len() }

    /// Entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, FeatureValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<K: Into<String>, V: Into<FeatureValue>> FromIterator<(K, V)> for FeatureMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = FeatureMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_is_not_truthy() {
        let map = FeatureMap::new();
        assert!(!map.is_truthy("peace_sign"));
        assert!(map.get("peace_sign").is_none());
    }

    #[test]
    fn false_flag_is_present_but_not_truthy() {
        let map: FeatureMap = [("eyes_wide", false)].into_iter().collect();
        assert_eq!(map.get("eyes_wide"), Some(FeatureValue::Flag(false)));
        assert!(!map.is_truthy("eyes_wide"));
    }

    #[test]
    fn zero_level_is_falsy() {
        let mut map = FeatureMap::new();
        map.insert("face_stillness", 0.0_f32);
        assert!(!map.is_truthy("face_stillness"));
        map.insert("face_stillness", 0.8_f32);
        assert!(map.is_truthy("face_stillness"));
    }

    #[test]
    fn set_if_only_inserts_detections() {
        let mut map = FeatureMap::new();
        map.set_if("tpose", false);
        map.set_if("salute", true);
        assert_eq!(map.len(), 1);
        assert!(map.is_truthy("salute"));
    }

    #[test]
    fn serializes_untagged() {
        let mut map = FeatureMap::new();
        map.insert("pointing", true);
        map.insert("face_stillness", 0.5_f32);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"face_stillness":0.5,"pointing":true}"#);
    }

    #[test]
    fn flag_coerces_to_number() {
        assert_eq!(FeatureValue::Flag(true).as_f32(), 1.0);
        assert_eq!(FeatureValue::Flag(false).as_f32(), 0.0);
    }
}
