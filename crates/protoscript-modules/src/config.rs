//! Environment-derived configuration for module loading and the debug
//! pretty-printer limits (spec §6), read once per `Context` rather than
//! re-reading the environment on every module load or print call.

/// Default search directories tried after `PS_MODULE_PATH`'s entries,
/// in order (spec §4.6).
const FALLBACK_SEARCH_DIRS: &[&str] = &["./modules", "./lib"];

#[derive(Debug, Clone)]
pub struct Config {
    /// Directories searched in order for a `psmod_<name>` shared library,
    /// `PS_MODULE_PATH` entries first.
    pub module_search_path: Vec<String>,
    pub debug_max_depth: usize,
    pub debug_max_items: usize,
    pub debug_max_string: usize,
}

impl Config {
    /// Reads `PS_MODULE_PATH` (colon-separated) and the three
    /// `PS_DEBUG_MAX_*` variables, falling back to documented defaults
    /// when unset or unparsable.
    pub fn from_env() -> Self {
        let mut module_search_path: Vec<String> = std::env::var("PS_MODULE_PATH")
            .ok()
            .map(|raw| raw.split(':').filter(|s| !s.is_empty()).map(str::to_string).collect())
            .unwrap_or_default();
        module_search_path.extend(FALLBACK_SEARCH_DIRS.iter().map(|s| s.to_string()));

        Config {
            module_search_path,
            debug_max_depth: env_usize("PS_DEBUG_MAX_DEPTH", 8),
            debug_max_items: env_usize("PS_DEBUG_MAX_ITEMS", 64),
            debug_max_string: env_usize("PS_DEBUG_MAX_STRING", 256),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            module_search_path: FALLBACK_SEARCH_DIRS.iter().map(|s| s.to_string()).collect(),
            debug_max_depth: 8,
            debug_max_items: 64,
            debug_max_string: 256,
        }
    }
}

fn env_usize(var: &str, default: usize) -> usize {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// The on-disk file name for a module's shared library on this platform,
/// e.g. `"TimeCivil"` -> `"psmod_TimeCivil.so"` on Linux. Dots in the
/// module name (for dotted module paths) are replaced with underscores,
/// per spec §4.6/§6.
pub fn shared_library_file_name(module_name: &str) -> String {
    let normalized = module_name.replace('.', "_");
    format!("psmod_{normalized}{}", std::env::consts::DLL_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_replaces_dots_with_underscores() {
        let name = shared_library_file_name("Time.Civil");
        assert!(name.starts_with("psmod_Time_Civil"));
    }

    #[test]
    fn default_search_path_has_modules_then_lib() {
        let cfg = Config::default();
        assert_eq!(cfg.module_search_path, vec!["./modules", "./lib"]);
    }
}
