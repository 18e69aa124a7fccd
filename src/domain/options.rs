//! Processing options forwarded verbatim to the engine.
//!
//! Options are a JSON object built from two sources: a fixed shadow toggle and an optional
//! free-form override applied shallowly on top. The gateway parses client-supplied options
//! strictly ([`ProcessingOptions::parse_strict`]); the interactive client degrades to the
//! defaults instead ([`ProcessingOptions::interactive`]).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Key of the shadow section understood by the engine.
pub const SHADOW_KEY: &str = "shadow";

#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("options are not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("options must be a JSON object, got {kind}")]
    NotAnObject { kind: &'static str },
}

/// An override the interactive client could not use; the defaults were applied instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoredOverride {
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessingOptions(Map<String, Value>);

impl ProcessingOptions {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Defaults driven by the shadow toggle: `{"shadow": {"enabled": <enabled>}}`.
    pub fn with_shadow(enabled: bool) -> Self {
        let mut shadow = Map::new();
        shadow.insert("enabled".to_string(), Value::Bool(enabled));
        let mut map = Map::new();
        map.insert(SHADOW_KEY.to_string(), Value::Object(shadow));
        Self(map)
    }

    /// Apply `overrides` key by key; nested objects are replaced, not merged.
    pub fn merge(&mut self, overrides: Map<String, Value>) {
        for (key, value) in overrides {
            self.0.insert(key, value);
        }
    }

    /// Parse the `options` form field. Absent or blank input yields empty options.
    pub fn parse_strict(raw: Option<&str>) -> Result<Self, OptionsError> {
        let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
            return Ok(Self::empty());
        };

        match serde_json::from_str::<Value>(raw)? {
            Value::Object(map) => Ok(Self(map)),
            other => Err(OptionsError::NotAnObject {
                kind: json_kind(&other),
            }),
        }
    }

    /// Build options the way the interactive form does: toggle defaults plus an optional
    /// manual override. An unusable override is reported and otherwise ignored.
    pub fn interactive(
        shadow_enabled: bool,
        manual: Option<&str>,
    ) -> (Self, Option<IgnoredOverride>) {
        let mut options = Self::with_shadow(shadow_enabled);
        match Self::parse_strict(manual) {
            Ok(overrides) => {
                options.merge(overrides.0);
                (options, None)
            }
            Err(err) => (
                options,
                Some(IgnoredOverride {
                    reason: err.to_string(),
                }),
            ),
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Serialized form sent to the engine as the `options` part.
    pub fn to_wire(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn strict_parse_treats_blank_as_empty() {
        assert!(ProcessingOptions::parse_strict(None).unwrap().is_empty());
        assert!(ProcessingOptions::parse_strict(Some("   ")).unwrap().is_empty());
    }

    #[test]
    fn strict_parse_rejects_malformed_json() {
        let err = ProcessingOptions::parse_strict(Some("{not json")).unwrap_err();
        assert!(matches!(err, OptionsError::Malformed(_)));
    }

    #[test]
    fn strict_parse_rejects_non_objects() {
        let err = ProcessingOptions::parse_strict(Some("[1,2]")).unwrap_err();
        assert!(matches!(err, OptionsError::NotAnObject { kind: "an array" }));
    }

    #[test]
    fn interactive_merges_override_shallowly() {
        let (options, ignored) = ProcessingOptions::interactive(
            true,
            Some(r#"{"orientation":"lying","shadow":{"intensity":0.4}}"#),
        );
        assert!(ignored.is_none());
        assert_eq!(
            Value::Object(options.as_map().clone()),
            json!({"orientation": "lying", "shadow": {"intensity": 0.4}})
        );
    }

    #[test]
    fn interactive_falls_back_to_defaults_on_bad_override() {
        let (options, ignored) = ProcessingOptions::interactive(false, Some("{oops"));
        assert!(ignored.is_some());
        assert_eq!(options, ProcessingOptions::with_shadow(false));
    }

    #[test]
    fn wire_form_round_trips() {
        let options = ProcessingOptions::with_shadow(true);
        let parsed = ProcessingOptions::parse_strict(Some(&options.to_wire())).unwrap();
        assert_eq!(parsed, options);
    }
}
