//! Canned outputs for mock mode
//!
//! A fixture directory holds `*.json` files, each a complete analysis
//! object. The key is the file's `_incident_id` field or, failing that,
//! its stem. Keys starting with `_` are metadata and are stripped on
//! load. `_default` answers for any incident without its own fixture.

use crate::dispatcher::{DispatchReport, SpecialistRun};
use crate::error::FixtureError;
use crate::roster::SpecialistRole;
use crate::specialist::SpecialistReply;
use oncall_composition::TokenUsage;
use oncall_contract::keys;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Fixture key used when no exact match exists
pub const DEFAULT_FIXTURE: &str = "_default";

/// Model name reported for mocked runs
pub const MOCK_MODEL: &str = "mock-model-router";

const ID_FIELD: &str = "_incident_id";

/// Fixtures keyed by incident id
#[derive(Debug, Clone, Default)]
pub struct FixtureStore {
    fixtures: BTreeMap<String, Map<String, Value>>,
}

impl FixtureStore {
    /// Empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.json` file in `dir`
    ///
    /// Files that cannot be read or are not JSON objects are skipped with
    /// a warning.
    ///
    /// # Errors
    /// [`FixtureError::DirectoryMissing`] if `dir` does not exist,
    /// [`FixtureError::Io`] if it cannot be listed.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(FixtureError::DirectoryMissing {
                path: dir.to_path_buf(),
            });
        }
        let io_err = |source| FixtureError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(io_err)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut store = Self::new();
        for path in paths {
            match load_file(&path) {
                Ok((id, fixture)) => {
                    debug!(incident_id = %id, file = %path.display(), "Loaded fixture");
                    store.insert(id, fixture);
                }
                Err(error) => warn!(%error, "Skipping fixture"),
            }
        }

        info!(dir = %dir.display(), count = store.len(), "Fixture directory loaded");
        Ok(store)
    }

    /// Add or replace a fixture; metadata keys are stripped
    pub fn insert(&mut self, incident_id: impl Into<String>, mut fixture: Map<String, Value>) {
        fixture.retain(|key, _| !key.starts_with('_'));
        self.fixtures.insert(incident_id.into(), fixture);
    }

    /// Builder form of [`insert`](Self::insert)
    #[must_use]
    pub fn with(mut self, incident_id: impl Into<String>, fixture: Map<String, Value>) -> Self {
        self.insert(incident_id, fixture);
        self
    }

    /// Exact match, then `_default`
    ///
    /// # Errors
    /// [`FixtureError::NoFixture`] when neither exists.
    pub fn lookup(&self, incident_id: &str) -> Result<&Map<String, Value>, FixtureError> {
        self.fixtures
            .get(incident_id)
            .or_else(|| self.fixtures.get(DEFAULT_FIXTURE))
            .ok_or_else(|| FixtureError::NoFixture {
                incident_id: incident_id.to_string(),
            })
    }

    /// Known incident ids
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.fixtures.keys().map(String::as_str)
    }

    /// Number of fixtures
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    /// No fixtures
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }
}

fn load_file(path: &Path) -> Result<(String, Map<String, Value>), FixtureError> {
    let text = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&text).map_err(|source| FixtureError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let Value::Object(map) = value else {
        return Err(FixtureError::NotAnObject {
            path: path.to_path_buf(),
        });
    };

    let id = match map.get(ID_FIELD) {
        Some(Value::String(id)) => id.clone(),
        _ => path
            .file_stem()
            .map_or_else(|| path.display().to_string(), |s| s.to_string_lossy().into_owned()),
    };
    Ok((id, map))
}

/// Stands in for the specialist dispatcher in mock mode
///
/// The incident's fixture is split by role ownership so each role
/// yields the text it would have produced. Keys no role owns go to the
/// first role. A fixture `telemetry` key is dropped.
#[derive(Debug, Clone)]
pub struct MockDispatcher {
    store: FixtureStore,
    roles: Vec<SpecialistRole>,
}

impl MockDispatcher {
    /// Create mock dispatcher for `roles` (priority order)
    #[must_use]
    pub fn new(store: FixtureStore, roles: Vec<SpecialistRole>) -> Self {
        Self { store, roles }
    }

    /// Fixture store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &FixtureStore {
        &self.store
    }

    /// Roles in priority order
    #[inline]
    #[must_use]
    pub fn roles(&self) -> &[SpecialistRole] {
        &self.roles
    }

    /// Canned runs for `incident_id`
    ///
    /// `prompt` is only measured, for the token estimate. Its tokens are
    /// charged to the first run, the fixture text to whichever run serves it.
    ///
    /// # Errors
    /// [`FixtureError::NoFixture`] when neither the incident nor the
    /// default fixture exists.
    pub fn dispatch(&self, incident_id: &str, prompt: &str) -> Result<DispatchReport, FixtureError> {
        let fixture = self.store.lookup(incident_id)?;

        let mut parts: Vec<Map<String, Value>> = vec![Map::new(); self.roles.len()];
        for (key, value) in fixture {
            if key == keys::TELEMETRY {
                continue;
            }
            let slot = self.roles.iter().position(|r| r.owns(key)).unwrap_or(0);
            if let Some(part) = parts.get_mut(slot) {
                part.insert(key.clone(), value.clone());
            }
        }

        let runs = self
            .roles
            .iter()
            .zip(parts)
            .enumerate()
            .map(|(index, (role, part))| {
                let text = Value::Object(part).to_string();
                // one prompt, so only the first run is charged for it
                let measured = if index == 0 { prompt } else { "" };
                let usage = TokenUsage::estimate(measured, &text);
                SpecialistRun {
                    role: role.id.clone(),
                    elapsed: Duration::ZERO,
                    outcome: Ok(SpecialistReply::text(text).with_model(MOCK_MODEL).with_usage(usage)),
                    mocked: true,
                }
            })
            .collect();

        info!(incident_id, "Served mock response");
        Ok(DispatchReport::new(runs))
    }
}
