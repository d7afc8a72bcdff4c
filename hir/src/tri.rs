//! Three-valued results and caches.
//!
//! A plain `Result<_, _>` cannot distinguish "this tentative lookup simply
//! didn't find a match, synthesize a no-op" from "this is a real compile
//! error, abort compilation" (spec.md §9 "Three-valued error codes"). The
//! same tri-state shape recurs for the `__defer__`/`__pass__`/`__assign__`/
//! `__access__` autogen cache (spec.md §4.4 `sf_cache`), which must
//! remember "checked, doesn't apply" as distinct from "haven't checked
//! yet", to avoid infinite recursion when autogenerating for recursive
//! aggregate types.

/// Outcome of an IR-generation routine.
#[derive(Debug)]
pub enum GenResult<T> {
    /// Generation succeeded, producing `T`.
    Success(T),
    /// A hard compile error; a diagnostic has already been reported.
    Failure,
    /// A tentative-context failure: the caller was speculating (an
    /// overload attempt, a tentative call, a conforming attempt) and must
    /// decide what to do — typically roll back via a snapshot and try the
    /// next alternative, or fall back to a default behavior.
    AltFailure,
}

impl<T> GenResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, GenResult::Success(_))
    }

    pub fn success(self) -> Option<T> {
        match self {
            GenResult::Success(v) => Some(v),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> GenResult<U> {
        match self {
            GenResult::Success(v) => GenResult::Success(f(v)),
            GenResult::Failure => GenResult::Failure,
            GenResult::AltFailure => GenResult::AltFailure,
        }
    }
}

/// A memoizing tri-state cache value: unknown (not yet computed), or a
/// computed, stable answer. Distinguishing "unknown" from "computed: none"
/// is what prevents re-entrant autogeneration attempts for recursive
/// aggregate types from looping forever.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tri<T> {
    #[default]
    Unknown,
    Yes(T),
    No,
}

impl<T: Copy> Tri<T> {
    pub fn is_unknown(&self) -> bool {
        matches!(self, Tri::Unknown)
    }

    pub fn known(&self) -> Option<Option<T>> {
        match self {
            Tri::Unknown => None,
            Tri::Yes(v) => Some(Some(*v)),
            Tri::No => Some(None),
        }
    }
}
