//! Key-value stores that secrets are merged into

use std::collections::{BTreeMap, HashMap};

/// A mutable name -> value store. Only additive writes are ever made.
pub trait TargetStore {
    fn contains_key(&self, key: &str) -> bool;

    fn insert(&mut self, key: String, value: String);
}

impl TargetStore for HashMap<String, String> {
    fn contains_key(&self, key: &str) -> bool {
        HashMap::contains_key(self, key)
    }

    fn insert(&mut self, key: String, value: String) {
        HashMap::insert(self, key, value);
    }
}

impl TargetStore for BTreeMap<String, String> {
    fn contains_key(&self, key: &str) -> bool {
        BTreeMap::contains_key(self, key)
    }

    fn insert(&mut self, key: String, value: String) {
        BTreeMap::insert(self, key, value);
    }
}

/// The environment of the current process.
///
/// Writing to it affects every thread; use it only at the outermost call site.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl TargetStore for ProcessEnv {
    fn contains_key(&self, key: &str) -> bool {
        std::env::var_os(key).is_some()
    }

    fn insert(&mut self, key: String, value: String) {
        std::env::set_var(key, value);
    }
}

/// Keys written and keys left alone by a merge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub injected: Vec<String>,
    pub preserved: Vec<String>,
}

/// Merge `values` into `target`, keeping any value already present
pub fn merge<S, I>(target: &mut S, values: I) -> MergeReport
where
    S: TargetStore + ?Sized,
    I: IntoIterator<Item = (String, String)>,
{
    let mut report = MergeReport::default();
    for (key, value) in values {
        if target.contains_key(&key) {
            report.preserved.push(key);
        } else {
            target.insert(key.clone(), value);
            report.injected.push(key);
        }
    }
    report
}
