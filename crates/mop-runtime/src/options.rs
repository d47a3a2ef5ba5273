//! Object space configuration
//!
//! Options can be built in code, deserialized from a host's own config file
//! (any serde format), or read from `MOP_*` environment variables.

use std::str::FromStr;

use serde::de::{self, Unexpected};
use serde::{Deserialize, Deserializer, Serialize};

/// Environment variable selecting the miss policy (`report` or `fail`)
pub const ENV_MISS_POLICY: &str = "MOP_MISS_POLICY";

/// Environment variable overriding the maximum call depth
pub const ENV_MAX_CALL_DEPTH: &str = "MOP_MAX_CALL_DEPTH";

/// What `send` does when a message is not understood
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissPolicy {
    /// Return `Reply::NotUnderstood` and keep going
    #[default]
    Report,
    /// Return `MopError::NotUnderstood`
    Fail,
}

impl FromStr for MissPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "report" => Ok(MissPolicy::Report),
            "fail" => Ok(MissPolicy::Fail),
            other => Err(format!("unknown miss policy: {}", other)),
        }
    }
}

/// Object space options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpaceOptions {
    /// Default not-understood handler installed by `ObjectSpace::with_options`
    pub miss_policy: MissPolicy,

    /// Maximum nesting of callable invocations, at least 1
    #[serde(deserialize_with = "call_depth")]
    pub max_call_depth: usize,
}

/// Default maximum call depth
pub(crate) const DEFAULT_MAX_CALL_DEPTH: usize = 256;

fn call_depth<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    let depth = usize::deserialize(deserializer)?;
    if depth == 0 {
        return Err(de::Error::invalid_value(Unexpected::Unsigned(0), &"a call depth of at least 1"));
    }
    Ok(depth)
}

impl Default for SpaceOptions {
    fn default() -> Self {
        Self {
            miss_policy: MissPolicy::Report,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

impl SpaceOptions {
    /// Defaults overridden by `MOP_MISS_POLICY` / `MOP_MAX_CALL_DEPTH`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the `MOP_*` keys.
    /// Unparseable values are ignored with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut options = Self::default();

        if let Some(raw) = lookup(ENV_MISS_POLICY) {
            match raw.parse() {
                Ok(policy) => options.miss_policy = policy,
                Err(err) => tracing::warn!(key = ENV_MISS_POLICY, %err, "ignoring invalid option"),
            }
        }

        if let Some(raw) = lookup(ENV_MAX_CALL_DEPTH) {
            match raw.trim().parse::<usize>() {
                Ok(depth) if depth > 0 => options.max_call_depth = depth,
                _ => tracing::warn!(key = ENV_MAX_CALL_DEPTH, value = %raw, "ignoring invalid option"),
            }
        }

        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = SpaceOptions::default();
        assert_eq!(options.miss_policy, MissPolicy::Report);
        assert_eq!(options.max_call_depth, 256);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let options: SpaceOptions = serde_json::from_str(r#"{"miss_policy":"fail"}"#).unwrap();
        assert_eq!(options.miss_policy, MissPolicy::Fail);
        assert_eq!(options.max_call_depth, 256);
    }

    #[test]
    fn test_serialize_lowercase_policy() {
        let json = serde_json::to_string(&SpaceOptions::default()).unwrap();
        assert!(json.contains(r#""miss_policy":"report""#));
    }

    #[test]
    fn test_from_lookup() {
        let options = SpaceOptions::from_lookup(|key| match key {
            ENV_MISS_POLICY => Some("FAIL".to_string()),
            ENV_MAX_CALL_DEPTH => Some("32".to_string()),
            _ => None,
        });
        assert_eq!(options.miss_policy, MissPolicy::Fail);
        assert_eq!(options.max_call_depth, 32);
    }

    #[test]
    fn test_from_lookup_ignores_garbage() {
        let options = SpaceOptions::from_lookup(|key| match key {
            ENV_MISS_POLICY => Some("explode".to_string()),
            ENV_MAX_CALL_DEPTH => Some("0".to_string()),
            _ => None,
        });
        assert_eq!(options, SpaceOptions::default());
    }

    #[test]
    fn test_json_rejects_zero_depth() {
        let err = serde_json::from_str::<SpaceOptions>(r#"{"max_call_depth":0}"#).unwrap_err();
        assert!(err.to_string().contains("at least 1"));
    }
}
