//! Bridge between logical breakpoints and the runtime's debug facility. One
//! physical break per distinct location, one listener for the whole agent:
//! attached with the first registered breakpoint, detached with the last, so
//! shutdown leaves the runtime exactly as it was found.

use crate::agent::runtime::{BreakHandler, DebugRuntime, NativeBreakId};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

struct LocationRecord {
    native: NativeBreakId,
    refs: usize,
}

pub(crate) struct HookBridge<R: DebugRuntime> {
    runtime: R,
    attached: Cell<bool>,
    locations: RefCell<HashMap<(PathBuf, u32), LocationRecord>>,
}

impl<R: DebugRuntime> HookBridge<R> {
    pub fn new(runtime: R) -> Self {
        HookBridge {
            runtime,
            attached: Cell::new(false),
            locations: RefCell::new(HashMap::new()),
        }
    }

    /// Arm a location. Several logical breakpoints at the same `(path, line)`
    /// share one physical break.
    pub fn register(
        &self,
        path: &Path,
        line: u32,
        handler: &BreakHandler,
    ) -> anyhow::Result<NativeBreakId> {
        let key = (path.to_path_buf(), line);
        let mut locations = self.locations.borrow_mut();
        if let Some(record) = locations.get_mut(&key) {
            record.refs += 1;
            return Ok(record.native);
        }

        let native = self.runtime.set_break(path, line)?;
        locations.insert(key, LocationRecord { native, refs: 1 });

        if !self.attached.get() {
            self.runtime.attach_listener(handler.clone());
            self.attached.set(true);
        }
        Ok(native)
    }

    /// Disarm a location previously armed with `register`.
    pub fn unregister(&self, path: &Path, line: u32) {
        let key = (path.to_path_buf(), line);
        let mut locations = self.locations.borrow_mut();
        match locations.get_mut(&key) {
            None => return,
            Some(record) if record.refs > 1 => {
                record.refs -= 1;
                return;
            }
            Some(_) => {}
        }
        if let Some(record) = locations.remove(&key) {
            self.runtime.clear_break(record.native);
        }

        if locations.is_empty() && self.attached.get() {
            self.runtime.detach_listener();
            self.attached.set(false);
        }
    }
}
