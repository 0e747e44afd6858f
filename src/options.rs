//! Per-call validation context: the mode and the cycle guard.

use std::collections::HashMap;

use crate::result::ValidationResult;
use crate::types::Type;
use crate::value::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Mode {
    /// run parsers and auto-casters, rebuild values
    #[default]
    Construct,
    /// validate as-is, hand back the original input
    Check,
}

/// Threaded by `&mut` through one top-level validation. Create a fresh one
/// per top-level call.
#[derive(Debug, Default)]
pub struct ValidationOptions {
    pub mode: Mode,
    visited: Visited,
}

impl ValidationOptions {
    pub fn new(mode: Mode) -> Self {
        Self { mode, visited: Visited::default() }
    }

    pub fn construct() -> Self {
        Self::new(Mode::Construct)
    }

    pub fn check() -> Self {
        Self::new(Mode::Check)
    }

    /// Run `f` with a different mode, restoring the current one afterwards.
    /// The cycle guard is shared.
    pub fn with_mode<R>(&mut self, mode: Mode, f: impl FnOnce(&mut Self) -> R) -> R {
        let previous = std::mem::replace(&mut self.mode, mode);
        let out = f(self);
        self.mode = previous;
        out
    }

    /// Number of (type, input) pairs seen so far.
    pub fn visited_len(&self) -> usize {
        self.visited.entries.len()
    }

    pub(crate) fn visited(&mut self) -> &mut Visited {
        &mut self.visited
    }
}

// ------------------------------ Cycle guard ------------------------------ //

#[derive(Debug)]
pub(crate) enum Visit {
    InProgress,
    Done(ValidationResult),
}

#[derive(Debug)]
struct Entry {
    // both handles stay alive so their addresses cannot be reused mid-call
    _ty: Type,
    _input: Value,
    visit: Visit,
}

/// Lookup table from (type identity, input identity) to result.
#[derive(Debug, Default)]
pub(crate) struct Visited {
    entries: HashMap<(usize, usize), Entry>,
}

impl Visited {
    pub(crate) fn get(&self, key: (usize, usize)) -> Option<&Visit> {
        self.entries.get(&key).map(|e| &e.visit)
    }

    pub(crate) fn enter(&mut self, key: (usize, usize), ty: &Type, input: &Value) {
        self.entries.insert(
            key,
            Entry { _ty: ty.clone(), _input: input.clone(), visit: Visit::InProgress },
        );
    }

    pub(crate) fn finish(&mut self, key: (usize, usize), result: ValidationResult) {
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.visit = Visit::Done(result);
        }
    }
}
