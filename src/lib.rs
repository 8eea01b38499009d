//! Shutterbug is an in-process snapshot debugger agent for embedded
//! interpreter runtimes. A control plane posts snapshot requests ("break at
//! file F line L when condition C holds, capture state and evaluate E₁…Eₙ"),
//! the agent instruments the runtime through its debug hook, captures a
//! bounded dump of the call stack and variable graph on the first matching
//! hit, and removes its instrumentation. The debugged program is never
//! stopped and user expressions can never mutate user state.

pub mod agent;
pub mod log;

pub use agent::config::Config;
pub use agent::inventory::{self, Inventory};
pub use agent::Agent;
