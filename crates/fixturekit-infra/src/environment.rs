//! The import environment a generated package is activated in.
//!
//! Package builders check it for name collisions before writing anything, and
//! [`Package::activate`](crate::package::Package::activate) uses it to make a
//! package resolvable for the duration of a guard.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

/// Module resolution as seen by generated packages.
pub trait ImportEnvironment: Send + Sync {
    /// Whether `dottedname` resolves to an existing module or package.
    fn find_module(&self, dottedname: &str) -> bool;

    /// Put `root` in front of the search path.
    fn insert_root(&self, root: &Path);

    fn remove_root(&self, root: &Path);

    /// Names of the distributions found on the search path at the last refresh.
    fn working_set(&self) -> Vec<String>;

    /// Rebuild the set of installed distributions from the search path.
    fn refresh_working_set(&self);

    /// Put back a working set saved with [`working_set`](Self::working_set).
    fn restore_working_set(&self, distributions: Vec<String>);

    /// Drop every cached module matching `predicate`, returning the names.
    fn purge_modules(&self, predicate: &dyn Fn(&str) -> bool) -> Vec<String>;
}

#[derive(Default)]
struct SearchPathState {
    roots: Vec<PathBuf>,
    loaded: BTreeSet<String>,
    working_set: Vec<String>,
    refreshes: usize,
}

/// A filesystem search path plus a module cache.
///
/// A dotted name resolves when some root contains the matching package
/// directory (with `__init__.py`) or module file, or when it is cached.
#[derive(Default)]
pub struct SearchPathEnvironment {
    state: Mutex<SearchPathState>,
}

impl SearchPathEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// An environment searching `roots` in order.
    pub fn with_roots(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        let environment = Self::new();
        environment.state().roots.extend(roots);
        environment
    }

    /// The process-wide environment, seeded from `PYTHONPATH`.
    pub fn global() -> Arc<SearchPathEnvironment> {
        static GLOBAL: OnceLock<Arc<SearchPathEnvironment>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| {
            let roots = std::env::var_os("PYTHONPATH")
                .map(|value| std::env::split_paths(&value).collect::<Vec<_>>())
                .unwrap_or_default();
            Arc::new(SearchPathEnvironment::with_roots(roots))
        }))
    }

    fn state(&self) -> std::sync::MutexGuard<'_, SearchPathState> {
        self.state.lock().expect("search path lock poisoned")
    }

    /// Record `dottedname` as imported.
    pub fn mark_loaded(&self, dottedname: &str) {
        self.state().loaded.insert(dottedname.to_string());
    }

    pub fn loaded_modules(&self) -> Vec<String> {
        self.state().loaded.iter().cloned().collect()
    }

    pub fn roots(&self) -> Vec<PathBuf> {
        self.state().roots.clone()
    }

    /// How often the working set was rebuilt.
    pub fn refreshes(&self) -> usize {
        self.state().refreshes
    }
}

/// Distributions with `.egg-info` or `.dist-info` metadata directly in `root`.
fn distributions_in(root: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(root) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            file_name
                .strip_suffix(".egg-info")
                .or_else(|| file_name.strip_suffix(".dist-info"))
                .map(str::to_string)
        })
        .collect();
    names.sort();
    names
}

fn resolves_below(root: &Path, dottedname: &str) -> bool {
    let mut path = root.to_path_buf();
    path.extend(dottedname.split('.'));
    path.join("__init__.py").is_file() || path.with_extension("py").is_file()
}

impl ImportEnvironment for SearchPathEnvironment {
    fn find_module(&self, dottedname: &str) -> bool {
        let state = self.state();
        state.loaded.contains(dottedname)
            || state.roots.iter().any(|root| resolves_below(root, dottedname))
    }

    fn insert_root(&self, root: &Path) {
        self.state().roots.insert(0, root.to_path_buf());
    }

    fn remove_root(&self, root: &Path) {
        let mut state = self.state();
        if let Some(index) = state.roots.iter().position(|r| r == root) {
            state.roots.remove(index);
        }
    }

    fn working_set(&self) -> Vec<String> {
        self.state().working_set.clone()
    }

    fn refresh_working_set(&self) {
        let mut state = self.state();
        let mut distributions = Vec::new();
        for root in &state.roots {
            for name in distributions_in(root) {
                if !distributions.contains(&name) {
                    distributions.push(name);
                }
            }
        }
        state.working_set = distributions;
        state.refreshes += 1;
    }

    fn restore_working_set(&self, distributions: Vec<String>) {
        self.state().working_set = distributions;
    }

    fn purge_modules(&self, predicate: &dyn Fn(&str) -> bool) -> Vec<String> {
        let mut state = self.state();
        let purged: Vec<String> = state
            .loaded
            .iter()
            .filter(|name| predicate(name))
            .cloned()
            .collect();
        for name in &purged {
            state.loaded.remove(name);
        }
        purged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_module_in_root() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("the/package")).unwrap();
        std::fs::write(tmp.path().join("the/__init__.py"), "").unwrap();
        std::fs::write(tmp.path().join("the/package/__init__.py"), "").unwrap();
        std::fs::write(tmp.path().join("the/module.py"), "").unwrap();

        let environment = SearchPathEnvironment::new();
        assert!(!environment.find_module("the.package"));

        environment.insert_root(tmp.path());
        assert!(environment.find_module("the"));
        assert!(environment.find_module("the.package"));
        assert!(environment.find_module("the.module"));
        assert!(!environment.find_module("the.other"));

        environment.remove_root(tmp.path());
        assert!(!environment.find_module("the.package"));
    }

    #[test]
    fn test_working_set_follows_search_path() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("the.package.egg-info")).unwrap();
        std::fs::create_dir_all(tmp.path().join("other-1.0.dist-info")).unwrap();
        std::fs::write(tmp.path().join("README.egg-info"), "").unwrap();

        let environment = SearchPathEnvironment::new();
        let before = environment.working_set();
        environment.insert_root(tmp.path());
        environment.refresh_working_set();
        assert_eq!(environment.working_set(), vec!["other-1.0", "the.package"]);

        environment.restore_working_set(before);
        assert!(environment.working_set().is_empty());
        assert_eq!(environment.refreshes(), 1);
    }

    #[test]
    fn test_loaded_modules_resolve_and_purge() {
        let environment = SearchPathEnvironment::new();
        environment.mark_loaded("os");
        environment.mark_loaded("the.package");
        assert!(environment.find_module("os"));

        let purged = environment.purge_modules(&|name| name.starts_with("the"));
        assert_eq!(purged, vec!["the.package"]);
        assert_eq!(environment.loaded_modules(), vec!["os"]);
    }
}
