//! Shared fixture: an on-disk source tree plus a scripted runtime standing
//! in for the interpreter's debug facility. Tests arm breakpoints through
//! the facade, then "execute" fixture functions by firing break events for
//! the instrumented lines, exactly as the real hook would.
#![allow(dead_code)]

use shutterbug::agent::config::Config;
use shutterbug::agent::inventory;
use shutterbug::agent::runtime::{
    BreakEvent, BreakHandler, DebugRuntime, FrameSnapshot, NativeBreakId, ObjectRef, PausedState,
    Value,
};
use shutterbug::Agent;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;

pub const FOO_SOURCE: &str = "function foo(n) {
  var A = [1, 2, 3];
  var B = { a: 5, b: 6, c: 7 };
  return n + 42 + A[0] + B.b;
}

function readGetter(hasGetter) {
  var plain = hasGetter.a;
  return hasGetter.a;
}

module.exports = { foo: foo, readGetter: readGetter };
";

struct RuntimeState {
    listener: RefCell<Option<BreakHandler>>,
    breaks: RefCell<HashMap<NativeBreakId, (PathBuf, u32)>>,
    next_id: Cell<NativeBreakId>,
    attaches: Cell<usize>,
    detaches: Cell<usize>,
}

/// Scripted stand-in for the runtime debug facility.
#[derive(Clone)]
pub struct FakeRuntime {
    inner: Rc<RuntimeState>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        FakeRuntime {
            inner: Rc::new(RuntimeState {
                listener: RefCell::new(None),
                breaks: RefCell::new(HashMap::new()),
                next_id: Cell::new(1),
                attaches: Cell::new(0),
                detaches: Cell::new(0),
            }),
        }
    }

    pub fn has_break(&self, path: &Path, line: u32) -> bool {
        self.inner
            .breaks
            .borrow()
            .values()
            .any(|(p, l)| p == path && *l == line)
    }

    pub fn planted_breaks(&self) -> usize {
        self.inner.breaks.borrow().len()
    }

    pub fn listener_attached(&self) -> bool {
        self.inner.listener.borrow().is_some()
    }

    /// Attach/detach pairs must balance once the agent is torn down.
    pub fn attach_balance(&self) -> (usize, usize) {
        (self.inner.attaches.get(), self.inner.detaches.get())
    }

    /// Deliver a break event if the location is instrumented, as the real
    /// hook would. Returns whether the listener ran.
    pub fn fire(&self, path: &Path, line: u32, state: &dyn PausedState) -> bool {
        if !self.has_break(path, line) {
            return false;
        }
        let listener = self.inner.listener.borrow().clone();
        match listener {
            Some(listener) => {
                listener(&BreakEvent { path, line, state });
                true
            }
            None => false,
        }
    }

    /// Simulate one invocation of `foo(n)`: execution passes every line of
    /// the function body, pausing at whichever lines are instrumented.
    pub fn run_foo(&self, root: &Path, n: i64) {
        let path = root.join("foo.js");
        for line in 1..=5 {
            if self.has_break(&path, line) {
                let state = FooState::new(root, line, n);
                self.fire(&path, line, &state);
            }
        }
    }

    /// Simulate one invocation of `readGetter(hasGetter)` (lines 7-10).
    pub fn run_read_getter(&self, root: &Path) {
        let path = root.join("foo.js");
        for line in 7..=10 {
            if self.has_break(&path, line) {
                let state = GetterState::new(root, line);
                self.fire(&path, line, &state);
            }
        }
    }
}

impl DebugRuntime for FakeRuntime {
    fn set_break(&self, path: &Path, line: u32) -> anyhow::Result<NativeBreakId> {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner
            .breaks
            .borrow_mut()
            .insert(id, (path.to_path_buf(), line));
        Ok(id)
    }

    fn clear_break(&self, id: NativeBreakId) {
        self.inner.breaks.borrow_mut().remove(&id);
    }

    fn attach_listener(&self, handler: BreakHandler) {
        self.inner.attaches.set(self.inner.attaches.get() + 1);
        *self.inner.listener.borrow_mut() = Some(handler);
    }

    fn detach_listener(&self) {
        self.inner.detaches.set(self.inner.detaches.get() + 1);
        *self.inner.listener.borrow_mut() = None;
    }
}

/// Globals visible from every fixture frame: a `process` object whose `env`
/// members are all accessor-backed.
fn process_global() -> Value {
    let env = ObjectRef::object();
    env.push_accessor("PATH");
    env.push_accessor("HOME");
    env.push_accessor("SHELL");
    let process = ObjectRef::object();
    process.push("env", Value::Object(env));
    Value::Object(process)
}

/// Paused inside `foo(n)`, before the return on line 4 ran.
pub struct FooState {
    path: PathBuf,
    line: u32,
    n: i64,
    a: ObjectRef,
    b: ObjectRef,
    process: Value,
}

impl FooState {
    pub fn new(root: &Path, line: u32, n: i64) -> Self {
        let b = ObjectRef::object();
        b.push("a", Value::Int(5));
        b.push("b", Value::Int(6));
        b.push("c", Value::Int(7));
        FooState {
            path: root.join("foo.js"),
            line,
            n,
            a: ObjectRef::array([1, 2, 3].map(Value::Int)),
            b,
            process: process_global(),
        }
    }
}

impl PausedState for FooState {
    fn frames(&self) -> Vec<FrameSnapshot> {
        vec![
            FrameSnapshot {
                function: Some("foo".to_string()),
                path: self.path.clone(),
                line: self.line,
                receiver: Value::Undefined,
                arguments: vec![("n".to_string(), Value::Int(self.n))],
                locals: vec![
                    ("A".to_string(), Value::Object(self.a.clone())),
                    ("B".to_string(), Value::Object(self.b.clone())),
                ],
            },
            FrameSnapshot {
                function: None,
                path: self.path.clone(),
                line: 12,
                receiver: Value::Undefined,
                arguments: vec![],
                locals: vec![],
            },
        ]
    }

    fn global(&self, name: &str) -> Option<Value> {
        (name == "process").then(|| self.process.clone())
    }
}

/// Paused inside `readGetter(hasGetter)`: one plain data property next to a
/// hazardous getter on the same object.
pub struct GetterState {
    path: PathBuf,
    line: u32,
    has_getter: ObjectRef,
    process: Value,
}

impl GetterState {
    pub fn new(root: &Path, line: u32) -> Self {
        let has_getter = ObjectRef::object();
        has_getter.push("a", Value::Int(5));
        has_getter.push_accessor("buzz");
        GetterState {
            path: root.join("foo.js"),
            line,
            has_getter,
            process: process_global(),
        }
    }
}

impl PausedState for GetterState {
    fn frames(&self) -> Vec<FrameSnapshot> {
        vec![FrameSnapshot {
            function: Some("readGetter".to_string()),
            path: self.path.clone(),
            line: self.line,
            receiver: Value::Undefined,
            arguments: vec![(
                "hasGetter".to_string(),
                Value::Object(self.has_getter.clone()),
            )],
            locals: vec![("plain".to_string(), Value::Int(5))],
        }]
    }

    fn global(&self, name: &str) -> Option<Value> {
        (name == "process").then(|| self.process.clone())
    }
}

/// A facade wired to the fixture tree and the scripted runtime.
pub struct TestAgent {
    pub dir: TempDir,
    pub root: PathBuf,
    pub runtime: FakeRuntime,
    pub agent: Agent<FakeRuntime>,
}

pub fn setup() -> TestAgent {
    setup_with(Config::default())
}

pub fn setup_with(config: Config) -> TestAgent {
    setup_with_frontends(config, vec![])
}

pub fn setup_with_frontends(
    mut config: Config,
    frontends: Vec<Box<dyn shutterbug::agent::expression::SourceFrontend>>,
) -> TestAgent {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("foo.js"), FOO_SOURCE).unwrap();
    fs::create_dir(dir.path().join("a")).unwrap();
    fs::create_dir(dir.path().join("b")).unwrap();
    fs::create_dir(dir.path().join("lib")).unwrap();
    fs::write(dir.path().join("a/hello.js"), "module.exports = 1;\n").unwrap();
    fs::write(dir.path().join("b/hello.js"), "module.exports = 2;\n").unwrap();
    fs::write(dir.path().join("lib/util.es6"), "export const one = 1;\n").unwrap();
    fs::write(dir.path().join("lib/brew.coffee"), "one = 1\n").unwrap();
    fs::write(dir.path().join("readme.txt"), "not a source file\n").unwrap();

    let root = dir.path().canonicalize().unwrap();
    config.working_directory = root.clone();
    let extensions: Vec<String> = frontends.iter().map(|f| f.extension().to_string()).collect();
    let inventory = inventory::scan(&root, &extensions).unwrap();

    let runtime = FakeRuntime::new();
    let agent = Agent::new(config, inventory, runtime.clone(), frontends);

    TestAgent {
        dir,
        root,
        runtime,
        agent,
    }
}

/// Resolve a member's effective status: inline, or through its table entry.
pub fn member_status<'a>(
    member: &'a shutterbug::agent::breakpoint::Variable,
    table: &'a [shutterbug::agent::breakpoint::Variable],
) -> Option<&'a shutterbug::agent::breakpoint::StatusMessage> {
    member
        .status
        .as_ref()
        .or_else(|| member.var_table_index.and_then(|i| table[i as usize].status.as_ref()))
}
