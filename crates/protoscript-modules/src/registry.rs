//! Loads and dispatches native modules (spec §4.6).
//!
//! At most one resident copy of a module exists per registry (matching
//! `Context`'s "at most one resident copy... per context", since one
//! `ModuleRegistry` is owned by exactly one `Context`'s embedding host).
//! `Math` is always resident without touching the filesystem; any other
//! name is searched for on disk following `PS_MODULE_PATH`, then
//! `./modules`, then `./lib`, and `dlopen`ed on first use.

use crate::abi::{
    PsContextHandle, PsModuleDesc, PsModuleInitFn, PS_ABI_VERSION, PS_MODULE_INIT_SYMBOL, PS_OK,
};
use crate::call_context::{marshal_args, unmarshal_return};
use crate::config::{shared_library_file_name, Config};
use crate::math;
use crate::symbol_hash::SymbolHash;
use libloading::{Library, Symbol};
use protoscript_core::context::Context;
use protoscript_core::error::RuntimeError;
use protoscript_core::value::Value;
use protoscript_vm::NativeCallDispatch;
use rustc_hash::FxHashMap;
use std::ffi::CStr;
use std::os::raw::c_char;
use std::path::PathBuf;

/// One function a dynamically loaded module exposes, with its C-string
/// metadata already copied into owned Rust storage — the raw descriptor
/// array the module handed back at init time is not re-read after load.
struct NativeFn {
    arity: i32,
    func: crate::abi::PsNativeFn,
}

/// A resident dynamically loaded module. The `Library` is kept open for
/// the registry's lifetime (spec §3 Context Lifecycle: "kept open for the
/// context's lifetime"); dropping it would invalidate every `NativeFn`
/// pointer copied out of its descriptor table.
struct LoadedLibrary {
    _lib: Library,
    functions: FxHashMap<String, NativeFn>,
}

#[derive(Debug, thiserror::Error)]
pub enum ModuleLoadError {
    #[error("native module {0} not found on PS_MODULE_PATH, ./modules, or ./lib")]
    NotFound(String),
    #[error("failed to load native module {module}: {source}")]
    Dlopen {
        module: String,
        #[source]
        source: libloading::Error,
    },
    #[error("native module {0} does not export ps_module_init")]
    MissingEntryPoint(String),
    #[error("native module {module} reports ABI version {reported}, expected {expected}")]
    AbiMismatch {
        module: String,
        reported: u32,
        expected: u32,
    },
    #[error("native module {0}'s ps_module_init reported a failure status")]
    InitFailed(String),
}

impl From<ModuleLoadError> for RuntimeError {
    fn from(err: ModuleLoadError) -> Self {
        RuntimeError::Module(err.to_string())
    }
}

/// Resolves `Module.symbol` native calls for the interpreter, loading
/// shared libraries on demand.
pub struct ModuleRegistry {
    config: Config,
    libraries: FxHashMap<String, LoadedLibrary>,
    /// Internal dispatch accelerator keyed by the domain-separated hash of
    /// `(module, function)`; the public surface stays name-based (spec
    /// §9 ambient stack note on `SymbolHash`).
    dispatch_cache: FxHashMap<SymbolHash, (String, String)>,
}

impl ModuleRegistry {
    pub fn new(config: Config) -> Self {
        ModuleRegistry {
            config,
            libraries: FxHashMap::default(),
            dispatch_cache: FxHashMap::default(),
        }
    }

    pub fn with_default_config() -> Self {
        ModuleRegistry::new(Config::from_env())
    }

    pub fn is_loaded(&self, module: &str) -> bool {
        module == "Math" || self.libraries.contains_key(module)
    }

    /// Loads `module` if it is not already resident. `Math` is a no-op
    /// (always available); any other name is searched for on disk.
    pub fn load(&mut self, module: &str) -> Result<(), ModuleLoadError> {
        if self.is_loaded(module) {
            return Ok(());
        }
        let path = self.find_shared_library(module)?;
        // SAFETY: the loaded library is expected to conform to the
        // documented `ps_module_init` ABI contract; this is the one place
        // in the crate where that trust boundary is crossed.
        let lib = unsafe { Library::new(&path) }
            .map_err(|source| ModuleLoadError::Dlopen {
                module: module.to_string(),
                source,
            })?;

        let init: Symbol<PsModuleInitFn> = unsafe {
            lib.get(PS_MODULE_INIT_SYMBOL)
                .map_err(|_| ModuleLoadError::MissingEntryPoint(module.to_string()))?
        };

        let mut desc = PsModuleDesc::default();
        let status = unsafe { init(&mut desc as *mut PsModuleDesc) };
        if status != PS_OK {
            return Err(ModuleLoadError::InitFailed(module.to_string()));
        }
        if desc.abi_version != PS_ABI_VERSION {
            return Err(ModuleLoadError::AbiMismatch {
                module: module.to_string(),
                reported: desc.abi_version,
                expected: PS_ABI_VERSION,
            });
        }

        let mut functions = FxHashMap::default();
        if !desc.functions.is_null() && desc.function_count > 0 {
            // SAFETY: `functions`/`function_count` were just populated by
            // the module's own init function per the documented contract.
            let slice = unsafe { std::slice::from_raw_parts(desc.functions, desc.function_count) };
            for entry in slice {
                let name = unsafe { c_str_to_string(entry.name) };
                functions.insert(
                    name,
                    NativeFn {
                        arity: entry.arity,
                        func: entry.func,
                    },
                );
            }
        }

        self.libraries.insert(
            module.to_string(),
            LoadedLibrary {
                _lib: lib,
                functions,
            },
        );
        Ok(())
    }

    fn find_shared_library(&self, module: &str) -> Result<PathBuf, ModuleLoadError> {
        let file_name = shared_library_file_name(module);
        for dir in &self.config.module_search_path {
            let candidate = PathBuf::from(dir).join(&file_name);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
        Err(ModuleLoadError::NotFound(module.to_string()))
    }

    fn call_dynamic(&self, module: &str, function: &str, args: &[Value]) -> Result<Value, RuntimeError> {
        let lib = self
            .libraries
            .get(module)
            .ok_or_else(|| RuntimeError::Module(format!("module {module} is not loaded")))?;
        let entry = lib.functions.get(function).ok_or_else(|| {
            RuntimeError::Module(format!("module {module} has no symbol {function}"))
        })?;
        if entry.arity >= 0 && entry.arity as usize != args.len() {
            return Err(RuntimeError::Module(format!(
                "{module}.{function}: expected {} argument(s), got {}",
                entry.arity,
                args.len()
            )));
        }

        let ffi_args = marshal_args(args)?;
        let mut out = crate::abi::PsFfiValue::VOID;
        // SAFETY: `entry.func` was obtained from a descriptor the module
        // itself populated and validated against `PS_ABI_VERSION` above;
        // `ffi_args`'s backing buffers outlive this call.
        let status = unsafe {
            (entry.func)(
                std::ptr::null_mut::<PsContextHandle>(),
                ffi_args.as_slice().as_ptr(),
                ffi_args.as_slice().len(),
                &mut out as *mut _,
            )
        };
        if status != PS_OK {
            return Err(RuntimeError::Module(format!(
                "{module}.{function} reported a native failure"
            )));
        }
        // SAFETY: a conforming module wrote a well-formed PsFfiValue.
        unsafe { unmarshal_return(&out) }
    }
}

impl NativeCallDispatch for ModuleRegistry {
    fn call(
        &mut self,
        module: &str,
        function: &str,
        args: &[Value],
        _ctx: &mut Context,
    ) -> Result<Value, RuntimeError> {
        self.dispatch_cache
            .entry(SymbolHash::of_call(module, function))
            .or_insert_with(|| (module.to_string(), function.to_string()));

        if module == "Math" {
            return match math::call(function, args) {
                Some(result) => result,
                None => Err(RuntimeError::Module(format!("Math has no symbol {function}"))),
            };
        }

        if !self.is_loaded(module) {
            self.load(module)?;
        }
        self.call_dynamic(module, function, args)
    }
}

/// # Safety
/// `ptr` must be a valid, NUL-terminated C string for the duration of the
/// call (true for every `name` field inside a freshly returned
/// `PsModuleDesc`, which this function is only ever used against).
unsafe fn c_str_to_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn math_is_loaded_without_touching_disk() {
        let registry = ModuleRegistry::with_default_config();
        assert!(registry.is_loaded("Math"));
    }

    #[test]
    fn math_dispatch_via_native_call_dispatch() {
        let mut registry = ModuleRegistry::with_default_config();
        let mut ctx = Context::new();
        let result = registry
            .call("Math", "sqrt", &[Value::Float(4.0)], &mut ctx)
            .unwrap();
        assert_eq!(result.as_float(), Some(2.0));
    }

    #[test]
    fn unknown_module_reports_not_found() {
        let mut registry = ModuleRegistry::with_default_config();
        let mut ctx = Context::new();
        let err = registry.call("NoSuchModule", "fn", &[], &mut ctx).unwrap_err();
        assert!(matches!(err, RuntimeError::Module(_)));
    }
}
