//! A fast `(module, function)` lookup key, grounded on the teacher's
//! `TypeHash` (XXH64-based, domain-separated).
//!
//! The public ABI surface stays name-based throughout (a `system_call`
//! instruction names its module and function as plain strings, per spec
//! §4.6); `SymbolHash` is purely an internal accelerator so the registry's
//! dispatch table is a single hash-map lookup instead of a nested
//! string-comparison loop over every loaded module's function table.

use xxhash_rust::xxh64::xxh64;

const MODULE_DOMAIN: u64 = 0x6d6f64756c655f5f; // "module__"
const FUNCTION_SEP: u64 = 0x5f5f66756e635f5f; // "__func__"

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolHash(u64);

impl SymbolHash {
    pub fn of_call(module: &str, function: &str) -> Self {
        let module_hash = MODULE_DOMAIN ^ xxh64(module.as_bytes(), 0);
        let func_hash = xxh64(function.as_bytes(), FUNCTION_SEP);
        SymbolHash(module_hash.wrapping_mul(0x9e3779b97f4a7c15) ^ func_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_call_hashes_equal() {
        assert_eq!(
            SymbolHash::of_call("Math", "sqrt"),
            SymbolHash::of_call("Math", "sqrt")
        );
    }

    #[test]
    fn distinguishes_module_and_function() {
        assert_ne!(
            SymbolHash::of_call("Math", "sqrt"),
            SymbolHash::of_call("Math", "pow")
        );
        assert_ne!(
            SymbolHash::of_call("Math", "sqrt"),
            SymbolHash::of_call("Sys", "sqrt")
        );
    }
}
