//! The process-wide vocabulary table.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::activity::{ActivityDescriptor, ActivityKey};
use crate::verb::{VerbDescriptor, VerbKey};
use crate::StatementError;

/// Read-only mapping from keys to descriptors.
///
/// Built once on first use and shared for the lifetime of the process.
/// Lookups hand out references into the same table, so a descriptor keeps
/// its identity across calls.
#[derive(Debug)]
pub struct Catalog {
    verbs: BTreeMap<VerbKey, VerbDescriptor>,
    activities: BTreeMap<ActivityKey, ActivityDescriptor>,
}

static CATALOG: OnceLock<Catalog> = OnceLock::new();

impl Catalog {
    /// The shared catalog.
    pub fn global() -> &'static Catalog {
        CATALOG.get_or_init(Self::build)
    }

    fn build() -> Self {
        let verbs = VerbKey::ALL
            .into_iter()
            .map(|key| (key, VerbDescriptor::new(key)))
            .collect();
        let activities = ActivityKey::ALL
            .into_iter()
            .map(|key| (key, ActivityDescriptor::new(key)))
            .collect();
        Self { verbs, activities }
    }

    /// Looks up a verb by its string key.
    ///
    /// # Errors
    ///
    /// Returns `StatementError::UnknownVerb` if the key is not in the catalog.
    pub fn verb(&self, key: &str) -> Result<&VerbDescriptor, StatementError> {
        let key: VerbKey = key.parse()?;
        self.verbs
            .get(&key)
            .ok_or_else(|| StatementError::UnknownVerb(key.to_string()))
    }

    /// Looks up an activity by its string key.
    ///
    /// # Errors
    ///
    /// Returns `StatementError::UnknownActivity` if the key is not in the catalog.
    pub fn activity(&self, key: &str) -> Result<&ActivityDescriptor, StatementError> {
        let key: ActivityKey = key.parse()?;
        self.activities
            .get(&key)
            .ok_or_else(|| StatementError::UnknownActivity(key.to_string()))
    }

    pub fn verbs(&self) -> impl Iterator<Item = &VerbDescriptor> {
        self.verbs.values()
    }

    pub fn activities(&self) -> impl Iterator<Item = &ActivityDescriptor> {
        self.activities.values()
    }
}
