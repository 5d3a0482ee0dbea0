use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::protocol::DebounceScope;

pub const EXECUTE_PREFIX: &str = "__execute_event__";
pub const MOUNT_ID: &str = "app";
pub const DEBOUNCE_WINDOW_MS: u64 = 800;

/// What a lazy region does when it becomes visible again after it was hidden
/// with its content already loaded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RevisibilityPolicy {
    #[default]
    KeepLoaded,
    Refetch,
}

/// Whether `styles`/`scripts` of a response reach the document head.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HeadInjection {
    #[default]
    Ignore,
    /// Written into `#main_styles` / `#main_scripts`.
    Inject,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuntimeConfig {
    pub execute_prefix: String,
    pub debounce_ms: u64,
    pub debounce_scope: DebounceScope,
    pub revisibility: RevisibilityPolicy,
    pub head_injection: HeadInjection,
    pub mount_id: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            execute_prefix: EXECUTE_PREFIX.to_owned(),
            debounce_ms: DEBOUNCE_WINDOW_MS,
            debounce_scope: DebounceScope::default(),
            revisibility: RevisibilityPolicy::default(),
            head_injection: HeadInjection::default(),
            mount_id: MOUNT_ID.to_owned(),
        }
    }
}

impl RuntimeConfig {
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: RuntimeConfig =
            serde_json::from_str(r#"{"debounceMs": 300, "debounceScope": "global"}"#).unwrap();
        assert_eq!(config.debounce_window(), Duration::from_millis(300));
        assert_eq!(config.debounce_scope, DebounceScope::Global);
        assert_eq!(config.execute_prefix, "__execute_event__");
        assert_eq!(config.revisibility, RevisibilityPolicy::KeepLoaded);
        assert_eq!(config.mount_id, "app");
    }

    #[test]
    fn policies_use_camel_case() {
        let config: RuntimeConfig =
            serde_json::from_str(r#"{"revisibility": "refetch", "headInjection": "inject"}"#)
                .unwrap();
        assert_eq!(config.revisibility, RevisibilityPolicy::Refetch);
        assert_eq!(config.head_injection, HeadInjection::Inject);
    }
}
