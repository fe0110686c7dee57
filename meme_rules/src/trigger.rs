//! Trigger rules, parsed once from configuration and evaluated every frame.
//!
//! The raw `triggers` object selects its form by key:
//!
//! | Key | Form | Semantics |
//! |---|---|---|
//! | `gesture` | [`TriggerRule::Single`] | feature present and truthy |
//! | `gestures` | [`TriggerRule::All`] | every feature present and truthy |
//! | `any_of` | [`TriggerRule::Any`] | at least one feature present and truthy |
//! | `conditions` | [`TriggerRule::Conditions`] | every per-feature comparison holds |
//!
//! Exactly one of these keys must be present.

use std::collections::BTreeSet;
use std::fmt;

use gesture_features::{FeatureMap, FeatureValue};
use serde_json::{Map, Value};

use crate::error::ValidationError;

const GESTURE:    &str = "gesture";
const GESTURES:   &str = "gestures";
const ANY_OF:     &str = "any_of";
const CONDITIONS: &str = "conditions";

const RULE_KEYS: [&str; 4] = [GESTURE, GESTURES, ANY_OF, CONDITIONS];

// ════════════════════════════════════════════════════════════════════════════
// Types
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub enum TriggerRule {
    Single(String),
    All(BTreeSet<String>),
    Any(BTreeSet<String>),
    /// `(feature, condition)` pairs, all of which must hold.
    Conditions(Vec<(String, Condition)>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    /// Numeric comparisons against thresholds; every one must hold.
    Compare(Vec<(CmpOp, f32)>),
    /// Direct equality with a literal.
    Equals(Literal),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmpOp { Gt, Lt, Ge, Le, Eq }

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Bool(bool),
    Number(f32),
    Text(String),
}

// ════════════════════════════════════════════════════════════════════════════
// Evaluation
// ════════════════════════════════════════════════════════════════════════════

impl TriggerRule {
    /// Pure evaluation against one frame's features.  Absent features are
    /// never satisfied.
    pub fn evaluate(&self, features: &FeatureMap) -> bool {
        match self {
            TriggerRule::Single(f) => features.is_truthy(f),
            TriggerRule::All(fs)   => fs.iter().all(|f| features.is_truthy(f)),
            TriggerRule::Any(fs)   => fs.iter().any(|f| features.is_truthy(f)),
            TriggerRule::Conditions(conds) => conds.iter().all(|(f, c)| {
                features.get(f).is_some_and(|v| c.holds(v))
            }),
        }
    }
}

impl Condition {
    pub fn holds(&self, value: FeatureValue) -> bool {
        match self {
            Condition::Compare(ops) => ops.iter().all(|&(op, t)| op.apply(value.as_f32(), t)),
            Condition::Equals(lit)  => lit.matches(value),
        }
    }
}

impl CmpOp {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            ">"  => Some(CmpOp::Gt),
            "<"  => Some(CmpOp::Lt),
            ">=" => Some(CmpOp::Ge),
            "<=" => Some(CmpOp::Le),
            "==" => Some(CmpOp::Eq),
            _    => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Gt => ">",
            CmpOp::Lt => "<",
            CmpOp::Ge => ">=",
            CmpOp::Le => "<=",
            CmpOp::Eq => "==",
        }
    }

    pub fn apply(self, value: f32, threshold: f32) -> bool {
        match self {
            CmpOp::Gt => value >  threshold,
            CmpOp::Lt => value <  threshold,
            CmpOp::Ge => value >= threshold,
            CmpOp::Le => value <= threshold,
            CmpOp::Eq => value == threshold,
        }
    }
}

impl Literal {
    /// Booleans compare numerically (`true` = 1), text never equals a feature.
    pub fn matches(&self, value: FeatureValue) -> bool {
        match self {
            Literal::Bool(b)   => value.as_f32() == if *b { 1.0 } else { 0.0 },
            Literal::Number(n) => value.as_f32() == *n,
            Literal::Text(_)   => false,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Parsing
// ════════════════════════════════════════════════════════════════════════════

impl TriggerRule {
    /// Parse the raw `triggers` value of the meme called `name`.
    pub fn parse(name: &str, raw: &Value) -> Result<Self, ValidationError> {
        let obj = raw.as_object().ok_or_else(|| malformed(name, "triggers", "expected an object"))?;

        let present: Vec<&str> = RULE_KEYS.iter().copied().filter(|k| obj.contains_key(*k)).collect();
        match present.as_slice() {
            [] => Err(ValidationError::UnrecognizedTrigger {
                name: name.to_string(),
                keys: obj.keys().cloned().collect(),
            }),
            [key] => parse_form(name, key, &obj[*key]),
            _ => Err(ValidationError::AmbiguousTrigger {
                name: name.to_string(),
                keys: present.iter().map(|k| k.to_string()).collect(),
            }),
        }
    }
}

fn parse_form(name: &str, key: &str, value: &Value) -> Result<TriggerRule, ValidationError> {
    match key {
        GESTURE => match value.as_str() {
            Some(f) if !f.is_empty() => Ok(TriggerRule::Single(f.to_string())),
            Some(_) => Err(empty(name, key)),
            None    => Err(malformed(name, key, "expected a feature name")),
        },
        GESTURES => Ok(TriggerRule::All(feature_set(name, key, value)?)),
        ANY_OF   => Ok(TriggerRule::Any(feature_set(name, key, value)?)),
        _ => {
            let obj = value.as_object()
                .ok_or_else(|| malformed(name, key, "expected an object"))?;
            Ok(TriggerRule::Conditions(parse_conditions(name, obj)?))
        }
    }
}

fn feature_set(name: &str, key: &str, value: &Value) -> Result<BTreeSet<String>, ValidationError> {
    let items = value.as_array()
        .ok_or_else(|| malformed(name, key, "expected a list of feature names"))?;

    let set = items.iter()
        .map(|v| v.as_str().map(str::to_string)
            .ok_or_else(|| malformed(name, key, "list entries must be strings")))
        .collect::<Result<BTreeSet<_>, _>>()?;

    if set.is_empty() {
        return Err(empty(name, key));
    }
    Ok(set)
}

fn parse_conditions(
    name: &str,
    obj:  &Map<String, Value>,
) -> Result<Vec<(String, Condition)>, ValidationError> {
    if obj.is_empty() {
        return Err(empty(name, CONDITIONS));
    }

    obj.iter().map(|(feature, raw)| {
        let cond = match raw {
            Value::Object(ops) => {
                if ops.is_empty() {
                    return Err(malformed(name, CONDITIONS, &format!("`{feature}` has no operators")));
                }
                let ops = ops.iter().map(|(op, t)| {
                    let op = CmpOp::parse(op).ok_or_else(|| ValidationError::UnknownOperator {
                        name:    name.to_string(),
                        feature: feature.clone(),
                        op:      op.clone(),
                    })?;
                    let t = t.as_f64().ok_or_else(|| malformed(
                        name, CONDITIONS, &format!("threshold for `{feature}` is not a number"),
                    ))?;
                    Ok((op, t as f32))
                }).collect::<Result<Vec<_>, ValidationError>>()?;
                Condition::Compare(ops)
            }
            Value::Bool(b)   => Condition::Equals(Literal::Bool(*b)),
            Value::Number(n) => match n.as_f64() {
                Some(n) => Condition::Equals(Literal::Number(n as f32)),
                None    => return Err(malformed(name, CONDITIONS, "number out of range")),
            },
            Value::String(s) => Condition::Equals(Literal::Text(s.clone())),
            Value::Null | Value::Array(_) => {
                return Err(malformed(name, CONDITIONS, &format!("unsupported value for `{feature}`")));
            }
        };
        Ok((feature.clone(), cond))
    }).collect()
}

fn malformed(name: &str, key: &str, reason: &str) -> ValidationError {
    ValidationError::MalformedTrigger {
        name:   name.to_string(),
        key:    key.to_string(),
        reason: reason.to_string(),
    }
}

fn empty(name: &str, key: &str) -> ValidationError {
    ValidationError::EmptyFeatureSet { name: name.to_string(), key: key.to_string() }
}

// ════════════════════════════════════════════════════════════════════════════
// Display
// ════════════════════════════════════════════════════════════════════════════

impl fmt::Display for TriggerRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |fs: &BTreeSet<String>| fs.iter().cloned().collect::<Vec<_>>().join(", ");
        match self {
            TriggerRule::Single(g) => write!(f, "{g}"),
            TriggerRule::All(fs)   => write!(f, "all({})", join(fs)),
            TriggerRule::Any(fs)   => write!(f, "any({})", join(fs)),
            TriggerRule::Conditions(conds) => {
                let parts: Vec<String> = conds.iter().map(|(feature, c)| match c {
                    Condition::Compare(ops) => ops.iter()
                        .map(|(op, t)| format!("{feature} {} {t}", op.symbol()))
                        .collect::<Vec<_>>()
                        .join(" and "),
                    Condition::Equals(lit) => format!("{feature} is {lit}"),
                }).collect();
                write!(f, "{}", parts.join(" and "))
            }
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(b)   => write!(f, "{b}"),
            Literal::Number(n) => write!(f, "{n}"),
            Literal::Text(s)   => write!(f, "{s:?}"),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(raw: Value) -> TriggerRule {
        TriggerRule::parse("test", &raw).unwrap()
    }

    fn features(pairs: &[(&str, FeatureValue)]) -> FeatureMap {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    fn flags(names: &[&str]) -> FeatureMap {
        names.iter().map(|n| (*n, true)).collect()
    }

    #[test]
    fn single_needs_present_and_truthy() {
        let r = rule(json!({"gesture": "peace_sign"}));
        assert_eq!(r, TriggerRule::Single("peace_sign".into()));
        assert!(r.evaluate(&flags(&["peace_sign"])));
        assert!(!r.evaluate(&flags(&["pointing"])));
        assert!(!r.evaluate(&features(&[("peace_sign", FeatureValue::Flag(false))])));
    }

    #[test]
    fn all_requires_every_feature() {
        let r = rule(json!({"gestures": ["hand_raised_left", "hand_raised_right"]}));
        assert!(r.evaluate(&flags(&["hand_raised_left", "hand_raised_right"])));
        assert!(!r.evaluate(&flags(&["hand_raised_left"])));
        assert!(!r.evaluate(&flags(&["hand_raised_right"])));
    }

    #[test]
    fn any_requires_one_feature() {
        let r = rule(json!({"any_of": ["tpose", "arms_crossed"]}));
        assert!(r.evaluate(&flags(&["tpose"])));
        assert!(r.evaluate(&flags(&["arms_crossed"])));
        assert!(r.evaluate(&flags(&["tpose", "arms_crossed"])));
        assert!(!r.evaluate(&flags(&["salute"])));
        assert!(!r.evaluate(&features(&[
            ("tpose", FeatureValue::Flag(false)),
            ("arms_crossed", FeatureValue::Flag(false)),
        ])));
    }

    #[test]
    fn greater_than_is_strict() {
        let r = rule(json!({"conditions": {"x": {">": 0.5}}}));
        assert!(r.evaluate(&features(&[("x", FeatureValue::Level(0.6))])));
        assert!(!r.evaluate(&features(&[("x", FeatureValue::Level(0.5))])));
        assert!(!r.evaluate(&features(&[("x", FeatureValue::Level(0.4))])));
        assert!(!r.evaluate(&FeatureMap::new()));
    }

    #[test]
    fn all_operators() {
        let v = |x: f32| features(&[("x", FeatureValue::Level(x))]);
        assert!(rule(json!({"conditions": {"x": {"<":  0.5}}})).evaluate(&v(0.4)));
        assert!(rule(json!({"conditions": {"x": {">=": 0.5}}})).evaluate(&v(0.5)));
        assert!(rule(json!({"conditions": {"x": {"<=": 0.5}}})).evaluate(&v(0.5)));
        assert!(rule(json!({"conditions": {"x": {"==": 0.5}}})).evaluate(&v(0.5)));
        assert!(!rule(json!({"conditions": {"x": {"==": 0.5}}})).evaluate(&v(0.51)));
    }

    #[test]
    fn range_needs_both_bounds() {
        let r = rule(json!({"conditions": {"x": {">": 0.2, "<": 0.8}}}));
        assert!(r.evaluate(&features(&[("x", FeatureValue::Level(0.5))])));
        assert!(!r.evaluate(&features(&[("x", FeatureValue::Level(0.9))])));
    }

    #[test]
    fn conditions_are_anded() {
        let r = rule(json!({"conditions": {"face_stillness": {">": 0.7}, "eyes_wide": false}}));
        let still_calm = features(&[
            ("face_stillness", FeatureValue::Level(0.8)),
            ("eyes_wide",      FeatureValue::Flag(false)),
        ]);
        let still_shocked = features(&[
            ("face_stillness", FeatureValue::Level(0.8)),
            ("eyes_wide",      FeatureValue::Flag(true)),
        ]);
        assert!(r.evaluate(&still_calm));
        assert!(!r.evaluate(&still_shocked));
        // absent eyes_wide fails the whole rule
        assert!(!r.evaluate(&features(&[("face_stillness", FeatureValue::Level(0.8))])));
    }

    #[test]
    fn literal_equality() {
        let r = rule(json!({"conditions": {"eyes_wide": true}}));
        assert!(r.evaluate(&flags(&["eyes_wide"])));
        let r = rule(json!({"conditions": {"face_stillness": 0.8}}));
        assert!(r.evaluate(&features(&[("face_stillness", FeatureValue::Level(0.8))])));
        let r = rule(json!({"conditions": {"eyes_wide": "yes"}}));
        assert!(!r.evaluate(&flags(&["eyes_wide"])));
    }

    #[test]
    fn flag_compares_numerically() {
        let r = rule(json!({"conditions": {"tpose": {">": 0.5}}}));
        assert!(r.evaluate(&flags(&["tpose"])));
    }

    #[test]
    fn unknown_key_is_unrecognized() {
        let err = TriggerRule::parse("m", &json!({"unknown_key": "x"})).unwrap_err();
        assert!(matches!(err, ValidationError::UnrecognizedTrigger { .. }));
    }

    #[test]
    fn two_forms_are_ambiguous() {
        let err = TriggerRule::parse("m", &json!({"gesture": "a", "any_of": ["b"]})).unwrap_err();
        match err {
            ValidationError::AmbiguousTrigger { keys, .. } => {
                assert_eq!(keys, vec!["gesture".to_string(), "any_of".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn malformed_shapes_are_rejected() {
        for raw in [
            json!("peace_sign"),
            json!({"gesture": 3}),
            json!({"gestures": "a"}),
            json!({"any_of": [1, 2]}),
            json!({"conditions": ["x"]}),
            json!({"conditions": {"x": {">": "high"}}}),
            json!({"conditions": {"x": null}}),
            json!({"conditions": {"x": {}}}),
        ] {
            let err = TriggerRule::parse("m", &raw).unwrap_err();
            assert!(matches!(err, ValidationError::MalformedTrigger { .. }), "{raw}: {err:?}");
        }
    }

    #[test]
    fn empty_sets_are_rejected() {
        for raw in [json!({"gestures": []}), json!({"any_of": []}), json!({"gesture": ""}), json!({"conditions": {}})] {
            let err = TriggerRule::parse("m", &raw).unwrap_err();
            assert!(matches!(err, ValidationError::EmptyFeatureSet { .. }), "{raw}: {err:?}");
        }
    }

    #[test]
    fn unknown_operator_is_rejected() {
        let err = TriggerRule::parse("m", &json!({"conditions": {"x": {"!=": 1}}})).unwrap_err();
        assert_eq!(err, ValidationError::UnknownOperator {
            name: "m".into(), feature: "x".into(), op: "!=".into(),
        });
    }

    #[test]
    fn display_is_readable() {
        assert_eq!(rule(json!({"gestures": ["b", "a"]})).to_string(), "all(a, b)");
        assert_eq!(
            rule(json!({"conditions": {"face_stillness": {">": 0.7}}})).to_string(),
            "face_stillness > 0.7",
        );
    }
}
