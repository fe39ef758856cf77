use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Module search configuration. The first root containing a module wins;
/// package sources are searched under `<root>/packages/<name>/src`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub search_paths: Vec<PathBuf>,
    pub packages: Vec<String>,
}

impl Config {
    pub fn with_root(root: PathBuf) -> Self {
        Self {
            search_paths: vec![root],
            packages: Vec::new(),
        }
    }

    /// All directories module discovery should look into, in priority order.
    pub fn module_search_paths(&self) -> Vec<PathBuf> {
        let mut paths = self.search_paths.clone();

        for root in &self.search_paths {
            for package in &self.packages {
                paths.push(root.join("packages").join(package).join("src"));
            }
        }

        paths
    }
}
