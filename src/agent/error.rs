use crate::agent::breakpoint::{Reference, StatusMessage};
use crate::agent::messages;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // --------------------------------- source resolution -----------------------------------------
    #[error("no inventory file matches `{0}`")]
    PathNotFound(String),
    #[error("`{0}` is ambiguous: {1} inventory files match")]
    PathAmbiguous(String, usize),
    #[error("`{0}` does not have a supported source extension")]
    UnsupportedExtension(String),
    #[error("line {line} is outside {basename} ({lines} lines)")]
    InvalidLine {
        basename: String,
        line: i32,
        lines: u32,
    },

    // --------------------------------- expression compilation ------------------------------------
    #[error("condition rejected: {0}")]
    ConditionCompile(String),
    #[error("expression rejected: {0}")]
    ExpressionCompile(String),

    // --------------------------------- registry --------------------------------------------------
    #[error("breakpoint `{0}` is already registered")]
    DuplicateBreakpoint(String),
    #[error("breakpoint `{0}` is not registered")]
    UnknownBreakpoint(String),
    #[error("breakpoint `{0}` already has a waiter installed")]
    WaiterAlreadyInstalled(String),

    // --------------------------------- capture time ----------------------------------------------
    #[error("condition evaluation failed: {0}")]
    ConditionEvaluation(String),

    // --------------------------------- host boundary ---------------------------------------------
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error("debug hook: {0}")]
    Hook(#[from] anyhow::Error),
}

impl Error {
    /// Status payload mirrored onto the breakpoint for set-time validation
    /// failures. Logic errors and host errors carry none.
    pub fn status(&self) -> Option<StatusMessage> {
        let status = match self {
            Error::PathNotFound(path) => StatusMessage::error(
                Reference::BreakpointSourceLocation,
                messages::SOURCE_FILE_NOT_FOUND,
                vec![path.clone()],
            ),
            Error::PathAmbiguous(path, _) => StatusMessage::error(
                Reference::BreakpointSourceLocation,
                messages::SOURCE_FILE_AMBIGUOUS,
                vec![path.clone()],
            ),
            Error::UnsupportedExtension(path) => StatusMessage::error(
                Reference::BreakpointSourceLocation,
                messages::UNSUPPORTED_EXTENSION,
                vec![path.clone()],
            ),
            Error::InvalidLine { basename, line, .. } => StatusMessage::error(
                Reference::BreakpointSourceLocation,
                format!("{}{basename}:{line}", messages::INVALID_LINE_NUMBER),
                vec![],
            ),
            Error::ConditionCompile(detail) => StatusMessage::error(
                Reference::BreakpointCondition,
                messages::ERROR_COMPILING_CONDITION,
                vec![detail.clone()],
            ),
            Error::ExpressionCompile(detail) => StatusMessage::error(
                Reference::BreakpointExpression,
                format!("{}: {detail}", messages::ERROR_COMPILING_EXPRESSION),
                vec![],
            ),
            Error::ConditionEvaluation(detail) => StatusMessage::error(
                Reference::BreakpointCondition,
                messages::CONDITION_EVALUATION_FAILED,
                vec![detail.clone()],
            ),
            Error::Hook(e) => StatusMessage::error(
                Reference::Unspecified,
                format!("debug hook: {e:#}"),
                vec![],
            ),
            Error::DuplicateBreakpoint(_)
            | Error::UnknownBreakpoint(_)
            | Error::WaiterAlreadyInstalled(_)
            | Error::IO(_) => return None,
        };
        Some(status)
    }
}

#[macro_export]
macro_rules! _error {
    ($log_fn: path, $res: expr) => {
        match $res {
            Ok(value) => Some(value),
            Err(e) => {
                $log_fn!(target: "agent", "{:#}", e);
                None
            }
        }
    };
    ($log_fn: path, $res: expr, $msg: tt) => {
        match $res {
            Ok(value) => Some(value),
            Err(e) => {
                $log_fn!(target: "agent", concat!($msg, " {:#}"), e);
                None
            }
        }
    };
}

/// Transforms `Result` into `Option` and logs an error if it occurs.
#[macro_export]
macro_rules! weak_error {
    ($res: expr) => {
        $crate::_error!(log::warn, $res)
    };
    ($res: expr, $msg: tt) => {
        $crate::_error!(log::warn, $res, $msg)
    };
}

/// Transforms `Result` into `Option` and puts the error into debug logs if
/// it occurs.
#[macro_export]
macro_rules! muted_error {
    ($res: expr) => {
        $crate::_error!(log::debug, $res)
    };
    ($res: expr, $msg: tt) => {
        $crate::_error!(log::debug, $res, $msg)
    };
}
