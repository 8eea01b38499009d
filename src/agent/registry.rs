use crate::agent::breakpoint::{BreakpointId, BreakpointRef};
use crate::agent::error::Error;
use crate::agent::expression::CompiledExpression;
use indexmap::IndexMap;
use std::cell::Cell;
use std::path::PathBuf;

/// A breakpoint that passed validation and is armed in the runtime.
pub(crate) struct LiveBreakpoint {
    pub bp: BreakpointRef,
    /// Resolved absolute path; together with `line` this is the dispatch key.
    pub path: PathBuf,
    pub line: u32,
    /// Compiled condition; the always-true handle when none was posted.
    pub condition: CompiledExpression,
    pub expressions: Vec<CompiledExpression>,
    /// One-shot latch: only the first truthy hit is reported.
    pub hit: Cell<bool>,
}

/// Live snapshot requests keyed by control-plane id. Mutated only from the
/// control context; the break-event context reads it between mutations.
#[derive(Default)]
pub(crate) struct Registry {
    live: IndexMap<BreakpointId, LiveBreakpoint>,
}

impl Registry {
    pub fn insert(&mut self, id: BreakpointId, record: LiveBreakpoint) -> Result<(), Error> {
        if self.live.contains_key(&id) {
            return Err(Error::DuplicateBreakpoint(id.to_string()));
        }
        self.live.insert(id, record);
        Ok(())
    }

    /// Idempotent removal.
    pub fn remove(&mut self, id: &BreakpointId) -> Option<LiveBreakpoint> {
        self.live.shift_remove(id)
    }

    pub fn get(&self, id: &BreakpointId) -> Option<&LiveBreakpoint> {
        self.live.get(id)
    }

    pub fn contains(&self, id: &BreakpointId) -> bool {
        self.live.contains_key(id)
    }

    pub fn count(&self) -> usize {
        self.live.len()
    }

    /// Ids of armed, not-yet-hit breakpoints at a dispatch location.
    pub fn ids_at(&self, path: &std::path::Path, line: u32) -> Vec<BreakpointId> {
        self.live
            .iter()
            .filter(|(_, lb)| lb.path == path && lb.line == line && !lb.hit.get())
            .map(|(id, _)| id.clone())
            .collect()
    }
}
