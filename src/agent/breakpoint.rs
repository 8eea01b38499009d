//! Breakpoint wire model: the structures posted by the control plane and
//! shipped back on completion. Everything here is JSON round-trippable;
//! integer fields stay inside the signed 32-bit range.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

/// Opaque identifier assigned by the control plane. Any scalar is valid,
/// including the literal zero.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BreakpointId {
    Int(i64),
    Str(String),
}

impl Default for BreakpointId {
    fn default() -> Self {
        BreakpointId::Int(0)
    }
}

impl Display for BreakpointId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BreakpointId::Int(n) => write!(f, "{n}"),
            BreakpointId::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for BreakpointId {
    fn from(n: i64) -> Self {
        BreakpointId::Int(n)
    }
}

impl From<&str> for BreakpointId {
    fn from(s: &str) -> Self {
        BreakpointId::Str(s.to_string())
    }
}

/// What a hit produces: a full state capture or a formatted log line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    #[default]
    #[strum(serialize = "CAPTURE")]
    Capture,
    #[strum(serialize = "LOG")]
    Log,
}

/// A position in a source file. `path` as posted is a hint that need not
/// match any real file literally; after resolution it names exactly one
/// inventory entry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub path: String,
    pub line: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<i32>,
}

/// What a status message refers to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reference {
    BreakpointSourceLocation,
    BreakpointCondition,
    BreakpointExpression,
    VariableName,
    VariableValue,
    #[default]
    Unspecified,
}

/// Parameterized human-readable message. `$0`, `$1`, … in `format` refer to
/// `parameters`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatMessage {
    pub format: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<String>,
}

/// Carried on the breakpoint when set-time validation fails, and on
/// individual variables when capture-time evaluation fails or truncates.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusMessage {
    pub is_error: bool,
    pub refers_to: Reference,
    pub description: FormatMessage,
}

impl StatusMessage {
    pub fn error(refers_to: Reference, format: impl Into<String>, parameters: Vec<String>) -> Self {
        Self {
            is_error: true,
            refers_to,
            description: FormatMessage {
                format: format.into(),
                parameters,
            },
        }
    }

    pub fn info(refers_to: Reference, format: impl Into<String>, parameters: Vec<String>) -> Self {
        Self {
            is_error: false,
            refers_to,
            description: FormatMessage {
                format: format.into(),
                parameters,
            },
        }
    }
}

/// A captured variable. Compounds are flattened: a value with members is
/// interned into the snapshot's variable table and referenced by index,
/// which breaks cycles and shares structure.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<Variable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub var_table_index: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusMessage>,
}

impl Variable {
    pub fn scalar(name: impl Into<String>, value: impl Into<String>, r#type: &str) -> Self {
        Variable {
            name: Some(name.into()),
            value: Some(value.into()),
            r#type: Some(r#type.to_string()),
            ..Default::default()
        }
    }

    pub fn table_ref(name: impl Into<String>, index: i32) -> Self {
        Variable {
            name: Some(name.into()),
            var_table_index: Some(index),
            ..Default::default()
        }
    }

    pub fn with_status(name: Option<String>, status: StatusMessage) -> Self {
        Variable {
            name,
            status: Some(status),
            ..Default::default()
        }
    }
}

/// One reported stack frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    pub function: String,
    pub location: SourceLocation,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<Variable>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locals: Vec<Variable>,
}

/// A snapshot request plus its output slot.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Breakpoint {
    pub id: BreakpointId,
    pub action: Action,
    pub location: SourceLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub expressions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_message_format: Option<String>,

    // Output fields, populated on hit.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stack_frames: Vec<StackFrame>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variable_table: Vec<Variable>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub evaluated_expressions: Vec<Variable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusMessage>,
}

/// Shared handle through which the control-plane glue and the agent both see
/// one breakpoint record.
pub type BreakpointRef = Rc<RefCell<Breakpoint>>;

impl Breakpoint {
    /// Snapshot request at a location, no condition.
    pub fn at(id: impl Into<BreakpointId>, path: impl Into<String>, line: i32) -> BreakpointRef {
        Rc::new(RefCell::new(Breakpoint {
            id: id.into(),
            location: SourceLocation {
                path: path.into(),
                line,
                column: None,
            },
            ..Default::default()
        }))
    }
}
