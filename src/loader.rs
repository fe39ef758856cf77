use std::path::{Path, PathBuf};

use crate::sir::{ModuleId, Unit};
use crate::source::ModulePath;

/// Module discovery, implemented by the driver. The analyzer calls this
/// when a `use` names a root module that is not in the unit yet; how the
/// module is found on disk, lexed, parsed, and lowered is outside this
/// crate.
pub trait ModuleLoader {
    /// Path of the file backing a module, if one exists.
    fn find_module(&mut self, path: &ModulePath) -> Option<PathBuf>;

    /// Dotted paths of the modules nested under a module file's directory.
    fn find_sub_modules(&mut self, module_file: &Path) -> Vec<ModulePath>;

    /// Load a module into the unit and return its id. The default does
    /// nothing, which is correct for fully pre-populated units.
    fn load_module(&mut self, _unit: &mut Unit, _path: &ModulePath) -> Option<ModuleId> {
        None
    }
}

/// Loader for units that are fully populated up front (tests, single-file
/// analysis).
#[derive(Debug, Default)]
pub struct NoLoader;

impl ModuleLoader for NoLoader {
    fn find_module(&mut self, _path: &ModulePath) -> Option<PathBuf> {
        None
    }

    fn find_sub_modules(&mut self, _module_file: &Path) -> Vec<ModulePath> {
        Vec::new()
    }
}
