//! Compiler options consumed by the middle-end (spec.md §6).

use bitflags::bitflags;

bitflags! {
    /// `CHECKS.*` flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Checks: u8 {
        /// Emit load/store/member/array-access null checks and a
        /// per-function failure pseudo-block (`printf` + `exit(1)`).
        const NULL_CHECKS = 1 << 0;
    }
}

bitflags! {
    /// `TRAITS.*` flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Traits: u8 {
        /// Replace `__types__`/`__type_kinds__` with null placeholders,
        /// disable `typeinfo`, restrict printf-format variadic checks.
        const NO_TYPEINFO = 1 << 0;
        /// Treat `DeclareUndef` as `Declare` (zero-init) for local
        /// variables; does not affect global/static `DeclareUndef`.
        const NO_UNDEF = 1 << 1;
        /// Skip zero-init on heap allocations (`new T`).
        const UNSAFE_NEW = 1 << 2;
        /// Emit optional extra warnings.
        const FUSSY = 1 << 3;
    }
}

bitflags! {
    /// `IGNORE.*` flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Ignore: u8 {
        const EARLY_RETURN = 1 << 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptLevel {
    None,
    Less,
    #[default]
    Default,
    Aggressive,
}

/// Forwarded verbatim to the backend; the middle-end does not act on it
/// beyond threading it through `IrModule`.
#[derive(Debug, Clone)]
pub struct Options {
    pub checks: Checks,
    pub traits: Traits,
    pub ignore: Ignore,
    pub optimization: OptLevel,
    pub entry_point: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            checks: Checks::empty(),
            traits: Traits::empty(),
            ignore: Ignore::empty(),
            optimization: OptLevel::default(),
            entry_point: "main".to_string(),
        }
    }
}

impl Options {
    pub fn null_checks(&self) -> bool {
        self.checks.contains(Checks::NULL_CHECKS)
    }

    pub fn rtti_enabled(&self) -> bool {
        !self.traits.contains(Traits::NO_TYPEINFO)
    }

    pub fn no_undef(&self) -> bool {
        self.traits.contains(Traits::NO_UNDEF)
    }

    pub fn unsafe_new(&self) -> bool {
        self.traits.contains(Traits::UNSAFE_NEW)
    }
}
