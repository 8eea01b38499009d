//! The debug-agent engine. A control plane posts breakpoints through the
//! [`Agent`] facade; the agent resolves the source location against the
//! scanned inventory, compiles the condition and watch expressions, arms the
//! runtime's debug hook, and on the first truthy hit captures a bounded
//! snapshot into the breakpoint record before firing the installed waiter.
//!
//! The control context (`set`/`clear`/`wait`) and the break-event context
//! are cooperatively serialized: both run on the runtime's thread, and every
//! internal borrow is released before a user callback is invoked, so calling
//! `clear` from inside a `wait` callback is safe.

pub mod breakpoint;
pub mod capture;
pub mod config;
pub mod error;
pub mod expression;
mod hook;
pub mod inventory;
pub mod messages;
mod registry;
pub mod resolve;
pub mod runtime;

use crate::agent::breakpoint::{Action, BreakpointId, BreakpointRef};
use crate::agent::config::Config;
use crate::agent::error::Error;
use crate::agent::expression::eval::Scope;
use crate::agent::expression::{Kind, SourceFrontend};
use crate::agent::hook::HookBridge;
use crate::agent::inventory::Inventory;
use crate::agent::registry::{LiveBreakpoint, Registry};
use crate::agent::runtime::{BreakEvent, BreakHandler, DebugRuntime};
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

type Waiter = Box<dyn FnOnce(Result<(), Error>)>;

/// The snapshot agent facade. Cheap to clone; all clones share one registry
/// and one hook subscription.
pub struct Agent<R: DebugRuntime + 'static> {
    inner: Rc<AgentInner<R>>,
}

impl<R: DebugRuntime + 'static> Clone for Agent<R> {
    fn clone(&self) -> Self {
        Agent {
            inner: Rc::clone(&self.inner),
        }
    }
}

struct AgentInner<R: DebugRuntime> {
    config: Config,
    inventory: Inventory,
    bridge: HookBridge<R>,
    registry: RefCell<Registry>,
    waiters: RefCell<IndexMap<BreakpointId, Waiter>>,
    frontends: HashMap<String, Box<dyn SourceFrontend>>,
}

impl<R: DebugRuntime + 'static> Agent<R> {
    /// Create an agent over an already-scanned inventory. Performs no I/O.
    pub fn new(
        config: Config,
        inventory: Inventory,
        runtime: R,
        frontends: Vec<Box<dyn SourceFrontend>>,
    ) -> Self {
        let frontends = frontends
            .into_iter()
            .map(|f| (f.extension().to_string(), f))
            .collect();
        Agent {
            inner: Rc::new(AgentInner {
                config,
                inventory,
                bridge: HookBridge::new(runtime),
                registry: RefCell::new(Registry::default()),
                waiters: RefCell::new(IndexMap::new()),
                frontends,
            }),
        }
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inner.inventory
    }

    /// Validate, resolve, compile and arm a breakpoint. On failure the
    /// breakpoint's `status` is populated and the same error reaches `cb`.
    pub fn set(&self, bp: &BreakpointRef, cb: impl FnOnce(Result<(), Error>)) {
        match self.inner.register(bp, self.handler()) {
            Ok(()) => cb(Ok(())),
            Err(e) => {
                bp.borrow_mut().status = e.status();
                cb(Err(e));
            }
        }
    }

    /// Remove a breakpoint: disarm the hook and drop the waiter without
    /// firing it. Idempotent, and safe to call from a `wait` callback.
    pub fn clear(&self, bp: &BreakpointRef) {
        let id = bp.borrow().id.clone();
        self.inner.waiters.borrow_mut().shift_remove(&id);
        let removed = self.inner.registry.borrow_mut().remove(&id);
        if let Some(live) = removed {
            self.inner.bridge.unregister(&live.path, live.line);
            log::debug!(target: "agent", "breakpoint {id} cleared");
        }
    }

    /// Install the completion callback for a breakpoint. Exactly one waiter
    /// per breakpoint; installing a second before the first fires is a logic
    /// error. If the breakpoint already hit, `cb` fires immediately.
    pub fn wait(
        &self,
        bp: &BreakpointRef,
        cb: impl FnOnce(Result<(), Error>) + 'static,
    ) -> Result<(), Error> {
        let id = bp.borrow().id.clone();
        let already_hit = {
            let registry = self.inner.registry.borrow();
            let Some(live) = registry.get(&id) else {
                return Err(Error::UnknownBreakpoint(id.to_string()));
            };
            live.hit.get()
        };

        if already_hit {
            cb(Ok(()));
            return Ok(());
        }

        let mut waiters = self.inner.waiters.borrow_mut();
        if waiters.contains_key(&id) {
            return Err(Error::WaiterAlreadyInstalled(id.to_string()));
        }
        waiters.insert(id, Box::new(cb));
        Ok(())
    }

    /// Number of armed breakpoints, for health checks.
    pub fn num_breakpoints(&self) -> usize {
        self.inner.registry.borrow().count()
    }

    /// Number of installed waiters, for health checks.
    pub fn num_listeners(&self) -> usize {
        self.inner.waiters.borrow().len()
    }

    fn handler(&self) -> BreakHandler {
        let weak = Rc::downgrade(&self.inner);
        Rc::new(move |event| {
            if let Some(inner) = weak.upgrade() {
                inner.on_break(event);
            }
        })
    }
}

impl<R: DebugRuntime> AgentInner<R> {
    fn register(&self, bp: &BreakpointRef, handler: BreakHandler) -> Result<(), Error> {
        let b = bp.borrow();
        if self.registry.borrow().contains(&b.id) {
            return Err(Error::DuplicateBreakpoint(b.id.to_string()));
        }

        let entry = resolve::resolve(&self.inventory, &b.location.path)?;
        resolve::check_line(entry, b.location.line)?;

        let ext = entry
            .path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let frontend: Option<&dyn SourceFrontend> = if ext == inventory::NATIVE_EXTENSION {
            None
        } else {
            match self.frontends.get(ext) {
                Some(frontend) => Some(frontend.as_ref()),
                None => return Err(Error::UnsupportedExtension(b.location.path.clone())),
            }
        };

        let condition = expression::compile(
            Kind::Condition,
            frontend,
            b.condition.as_deref().unwrap_or_default(),
        )?;
        let expressions = b
            .expressions
            .iter()
            .map(|source| expression::compile(Kind::Watch, frontend, source))
            .collect::<Result<Vec<_>, _>>()?;

        let line = b.location.line as u32;
        let path = entry.path.clone();
        self.bridge.register(&path, line, &handler)?;

        let id = b.id.clone();
        let record = LiveBreakpoint {
            bp: Rc::clone(bp),
            path: path.clone(),
            line,
            condition,
            expressions,
            hit: Cell::new(false),
        };
        drop(b);

        if let Err(e) = self.registry.borrow_mut().insert(id.clone(), record) {
            self.bridge.unregister(&path, line);
            return Err(e);
        }
        log::debug!(target: "agent", "breakpoint {id} armed at {}:{line}", path.display());
        Ok(())
    }

    /// Break-event dispatch. Runs synchronously on the runtime's hook; every
    /// internal borrow is dropped before a waiter is fired so waiters may
    /// call back into the facade.
    fn on_break(&self, event: &BreakEvent) {
        let ids = self.registry.borrow().ids_at(event.path, event.line);
        for id in ids {
            self.dispatch_one(&id, event);
        }
    }

    fn dispatch_one(&self, id: &BreakpointId, event: &BreakEvent) {
        let outcome = {
            let registry = self.registry.borrow();
            // A waiter fired earlier in this same event may have cleared it.
            let Some(live) = registry.get(id) else { return };
            if live.hit.get() {
                return;
            }

            let frames = event.state.frames();
            let scope = Scope::new(frames.first(), event.state);
            match live.condition.evaluate(&scope) {
                Ok(value) if !value.is_truthy() => return,
                Ok(_) => {
                    live.hit.set(true);
                    let action = live.bp.borrow().action;
                    match action {
                        Action::Capture => {
                            let snapshot = capture::capture(
                                &self.config.capture,
                                event.state,
                                &live.expressions,
                            );
                            let mut b = live.bp.borrow_mut();
                            b.stack_frames = snapshot.stack_frames;
                            b.variable_table = snapshot.variable_table;
                            b.evaluated_expressions = snapshot.evaluated_expressions;
                        }
                        Action::Log => {
                            let format = live.bp.borrow().log_message_format.clone();
                            let line = capture::format_log_message(
                                format.as_deref().unwrap_or_default(),
                                &self.config.capture,
                                event.state,
                                &live.expressions,
                            );
                            live.bp.borrow_mut().log_message = Some(line);
                        }
                    }
                    log::debug!(target: "agent", "breakpoint {id} hit at {}:{}", event.path.display(), event.line);
                    Ok(())
                }
                Err(e) => {
                    live.hit.set(true);
                    let err = Error::ConditionEvaluation(e.to_string());
                    live.bp.borrow_mut().status = err.status();
                    log::warn!(target: "agent", "breakpoint {id} condition failed: {e}");
                    Err(err)
                }
            }
        };

        let waiter = self.waiters.borrow_mut().shift_remove(id);
        if let Some(waiter) = waiter {
            // A panic inside the waiter belongs to the host and is not caught.
            waiter(outcome);
        }
    }
}
