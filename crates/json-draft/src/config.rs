//! Producer configuration and finalize hooks.

use std::fmt;

use json_draft_path::PathStep;
use serde::{Deserialize, Serialize};

use crate::backend::Strategy;
use crate::draft::Draft;
use crate::value::Value;

/// Options for a [`Producer`](crate::Producer).
///
/// Deserializes from `{"auto_freeze": bool, "strategy": "trap" | "accessor"}`;
/// `autoFreeze` and the boolean `use_proxies` / `useProxies` are accepted as
/// well. Missing fields take their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawConfig")]
pub struct ProducerConfig {
    /// Freeze every node created by a producer call. Defaults to on in debug
    /// builds.
    pub auto_freeze: bool,
    pub strategy: Strategy,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            auto_freeze: cfg!(debug_assertions),
            strategy: Strategy::default(),
        }
    }
}

impl ProducerConfig {
    pub fn with_auto_freeze(mut self, auto_freeze: bool) -> Self {
        self.auto_freeze = auto_freeze;
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_use_proxies(self, use_proxies: bool) -> Self {
        self.with_strategy(Strategy::from_use_proxies(use_proxies))
    }
}

#[derive(Deserialize)]
struct RawConfig {
    #[serde(default, alias = "autoFreeze")]
    auto_freeze: Option<bool>,
    #[serde(default)]
    strategy: Option<Strategy>,
    #[serde(default, alias = "useProxies")]
    use_proxies: Option<bool>,
}

impl From<RawConfig> for ProducerConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = ProducerConfig::default();
        let strategy = raw
            .strategy
            .or(raw.use_proxies.map(Strategy::from_use_proxies))
            .unwrap_or(defaults.strategy);
        ProducerConfig {
            auto_freeze: raw.auto_freeze.unwrap_or(defaults.auto_freeze),
            strategy,
        }
    }
}

// ── Hooks ─────────────────────────────────────────────────────────────────

type AssignHook = Box<dyn Fn(&Draft, &PathStep, &Value)>;
type DeleteHook = Box<dyn Fn(&Draft, &PathStep)>;
type CopyHook = Box<dyn Fn(&Draft)>;

/// Callbacks run while a modified draft is finalized.
///
/// `on_assign` sees every key whose final value differs from the base,
/// `on_delete` every base key that is gone, and `on_copy` the draft itself
/// once its copy is final. Hooks may read the draft but not write to it.
#[derive(Default)]
pub struct Hooks {
    on_assign: Option<AssignHook>,
    on_delete: Option<DeleteHook>,
    on_copy: Option<CopyHook>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_assign(mut self, hook: impl Fn(&Draft, &PathStep, &Value) + 'static) -> Self {
        self.on_assign = Some(Box::new(hook));
        self
    }

    pub fn on_delete(mut self, hook: impl Fn(&Draft, &PathStep) + 'static) -> Self {
        self.on_delete = Some(Box::new(hook));
        self
    }

    pub fn on_copy(mut self, hook: impl Fn(&Draft) + 'static) -> Self {
        self.on_copy = Some(Box::new(hook));
        self
    }

    pub(crate) fn has_on_assign(&self) -> bool {
        self.on_assign.is_some()
    }

    pub(crate) fn assign(&self, draft: &Draft, key: &PathStep, value: &Value) {
        if let Some(hook) = &self.on_assign {
            hook(draft, key, value);
        }
    }

    pub(crate) fn delete(&self, draft: &Draft, key: &PathStep) {
        if let Some(hook) = &self.on_delete {
            hook(draft, key);
        }
    }

    pub(crate) fn copy(&self, draft: &Draft) {
        if let Some(hook) = &self.on_copy {
            hook(draft);
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("on_assign", &self.on_assign.is_some())
            .field("on_delete", &self.on_delete.is_some())
            .field("on_copy", &self.on_copy.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_follow_build_profile() {
        let config = ProducerConfig::default();
        assert_eq!(config.auto_freeze, cfg!(debug_assertions));
        assert_eq!(config.strategy, Strategy::Trap);
    }

    #[test]
    fn deserialize_with_defaults() {
        let config: ProducerConfig = serde_json::from_value(json!({})).unwrap();
        assert_eq!(config, ProducerConfig::default());

        let config: ProducerConfig =
            serde_json::from_value(json!({"autoFreeze": false, "useProxies": false})).unwrap();
        assert!(!config.auto_freeze);
        assert_eq!(config.strategy, Strategy::Accessor);
    }

    #[test]
    fn explicit_strategy_wins_over_use_proxies() {
        let config: ProducerConfig =
            serde_json::from_value(json!({"strategy": "trap", "use_proxies": false})).unwrap();
        assert_eq!(config.strategy, Strategy::Trap);
    }

    #[test]
    fn serializes_canonical_fields() {
        let config = ProducerConfig::default()
            .with_auto_freeze(true)
            .with_use_proxies(false);
        assert_eq!(
            serde_json::to_value(config).unwrap(),
            json!({"auto_freeze": true, "strategy": "accessor"})
        );
    }

    #[test]
    fn hooks_debug_lists_installed_callbacks() {
        let hooks = Hooks::new().on_copy(|_| {});
        assert_eq!(
            format!("{hooks:?}"),
            "Hooks { on_assign: false, on_delete: false, on_copy: true }"
        );
    }
}
