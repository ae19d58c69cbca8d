//! Ordered shallow merging of fragments
//!
//! Fragments are applied in role priority order, then in extraction
//! order. Each top-level key is taken whole from the last fragment that
//! wrote it; nested objects are never combined.

use crate::fragment::Fragment;
use crate::role::RoleId;
use crate::telemetry::TelemetryRecord;
use oncall_contract::keys;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Merged mapping plus the role that last wrote each key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedResult {
    body: Map<String, Value>,
    writers: BTreeMap<String, RoleId>,
}

impl MergedResult {
    /// Empty result
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold fragments in the given order
    #[must_use]
    pub fn merge_all(fragments: impl IntoIterator<Item = Fragment>) -> Self {
        let mut merged = Self::new();
        for fragment in fragments {
            merged.absorb(fragment);
        }
        merged
    }

    /// Apply one fragment on top of the current state
    pub fn absorb(&mut self, fragment: Fragment) {
        let Fragment { role, value, .. } = fragment;
        for (key, v) in value {
            if let Some(previous) = self.writers.insert(key.clone(), role.clone()) {
                if previous != role {
                    debug!(key = %key, overwritten = %previous, by = %role, "Key overwritten by later role");
                }
            }
            self.body.insert(key, v);
        }
    }

    /// Replace `telemetry` with the process-computed record
    pub fn stamp(&mut self, telemetry: &TelemetryRecord) {
        self.writers.remove(keys::TELEMETRY);
        self.body.insert(keys::TELEMETRY.to_string(), telemetry.to_value());
    }

    /// Role that last wrote `key` (telemetry has none)
    #[must_use]
    pub fn writer_of(&self, key: &str) -> Option<&RoleId> {
        self.writers.get(key)
    }

    /// Current mapping
    #[inline]
    #[must_use]
    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    /// Value under `key`
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    /// Number of top-level keys
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// No keys at all
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Into a JSON object
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.body)
    }

    /// Into the raw mapping
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.body
    }
}

/// Orders fragments by a fixed role priority list and folds them
#[derive(Debug, Clone, Default)]
pub struct ResultMerger {
    priority: Vec<RoleId>,
}

impl ResultMerger {
    /// Create merger; earlier roles have higher priority and are applied first
    #[must_use]
    pub fn new<R: Into<RoleId>>(priority: impl IntoIterator<Item = R>) -> Self {
        Self {
            priority: priority.into_iter().map(Into::into).collect(),
        }
    }

    /// Role priority list
    #[inline]
    #[must_use]
    pub fn priority(&self) -> &[RoleId] {
        &self.priority
    }

    /// Position of `role`; unknown roles rank after every known one
    #[must_use]
    pub fn rank(&self, role: &RoleId) -> usize {
        self.priority
            .iter()
            .position(|r| r == role)
            .unwrap_or(self.priority.len())
    }

    /// Stable sort by role rank, keeping extraction order within a role
    #[must_use]
    pub fn order(&self, mut fragments: Vec<Fragment>) -> Vec<Fragment> {
        fragments.sort_by_key(|f| self.rank(&f.role));
        fragments
    }

    /// Order then fold
    #[must_use]
    pub fn merge(&self, fragments: Vec<Fragment>) -> MergedResult {
        MergedResult::merge_all(self.order(fragments))
    }

    /// Order, fold, and stamp telemetry
    #[must_use]
    pub fn merge_stamped(&self, fragments: Vec<Fragment>, telemetry: &TelemetryRecord) -> MergedResult {
        let mut merged = self.merge(fragments);
        merged.stamp(telemetry);
        merged
    }
}
