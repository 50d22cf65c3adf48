use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::service::FeatureTypeDescription;

/// Identifies a feature type description: service endpoint plus type name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DescribeKey {
    pub service_url: String,
    pub type_name: String,
}

impl DescribeKey {
    pub fn new(service_url: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            service_url: service_url.into(),
            type_name: type_name.into(),
        }
    }
}

/// Memoized feature type descriptions.
///
/// Entries stay until the caller invalidates them. Concurrent misses on one key
/// may both fetch; the last insert wins.
#[derive(Debug, Default)]
pub struct DescribeCache {
    entries: Mutex<BTreeMap<DescribeKey, Arc<FeatureTypeDescription>>>,
}

impl DescribeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &DescribeKey) -> Option<Arc<FeatureTypeDescription>> {
        self.entries.lock().get(key).cloned()
    }

    pub fn insert(
        &self,
        key: DescribeKey,
        description: FeatureTypeDescription,
    ) -> Arc<FeatureTypeDescription> {
        let description = Arc::new(description);
        self.entries.lock().insert(key, description.clone());
        description
    }

    pub fn invalidate(&self, key: &DescribeKey) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    /// Drops every description fetched from `service_url`.
    pub fn invalidate_service(&self, service_url: &str) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|k, _| k.service_url != service_url);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
