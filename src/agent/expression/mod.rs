//! Compilation of user condition and watch-expression strings into handles
//! that are provably safe to evaluate against a paused program.

pub mod ast;
pub mod eval;
pub mod parser;

use crate::agent::error::Error;
use crate::agent::runtime::Value;
use ast::Expr;
use eval::{EvalError, Scope};

/// What a string is compiled as. Conditions are stricter: call syntax is
/// rejected at compile time, and an empty string is the always-true
/// condition. Watch expressions admit call syntax (every call is still
/// refused at evaluation time) but may not be empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Condition,
    Watch,
}

/// A validated expression ready for read-only evaluation.
#[derive(Debug)]
pub struct CompiledExpression {
    /// The user's text, reported back as the variable name of watch results.
    pub source: String,
    ast: Option<Expr>,
}

impl CompiledExpression {
    /// Evaluate under the paused scope. The always-true condition yields
    /// `true` without touching the debuggee.
    pub fn evaluate(&self, scope: &Scope) -> Result<Value, EvalError> {
        match &self.ast {
            Some(expr) => eval::evaluate(expr, scope),
            None => Ok(Value::Bool(true)),
        }
    }
}

/// Error from a registered transpiler frontend.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct FrontendError {
    pub message: String,
}

/// Pluggable transpiler for sources the runtime does not execute natively.
/// Registered per extension; the scanner's allow-list is the native
/// extension plus all registered ones.
pub trait SourceFrontend {
    /// Extension this frontend covers, without the leading dot.
    fn extension(&self) -> &str;

    /// Translate a user expression written in the transpiled language into a
    /// native expression string.
    fn translate(&self, expr: &str) -> Result<String, FrontendError>;
}

/// Compile `source` for a breakpoint in a file handled by `frontend`
/// (`None` for native sources).
pub fn compile(
    kind: Kind,
    frontend: Option<&dyn SourceFrontend>,
    source: &str,
) -> Result<CompiledExpression, Error> {
    let reject = |detail: String| match kind {
        Kind::Condition => Error::ConditionCompile(detail),
        Kind::Watch => Error::ExpressionCompile(detail),
    };

    let native = match frontend {
        Some(frontend) => frontend.translate(source).map_err(|e| reject(e.message))?,
        None => source.to_string(),
    };

    let ast = parser::parse(&native).map_err(reject)?;

    match kind {
        Kind::Condition => {
            if ast.as_ref().is_some_and(Expr::contains_call) {
                return Err(Error::ConditionCompile(
                    "call expressions are not allowed in conditions".to_string(),
                ));
            }
        }
        Kind::Watch => {
            if ast.is_none() {
                return Err(Error::ExpressionCompile(
                    "empty expression".to_string(),
                ));
            }
        }
    }

    Ok(CompiledExpression {
        source: source.to_string(),
        ast,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::agent::messages;

    #[test]
    fn test_condition_acceptance_matrix() {
        let accepted = ["null", "", ";", "x==1", "this+1", "1,2,3,{f:2},4"];
        for input in accepted {
            assert!(
                compile(Kind::Condition, None, input).is_ok(),
                "condition {input:?} must compile"
            );
        }

        let rejected = [
            "*",
            "j+",
            "x = 1",
            "var x = 1;",
            "console.log(1)",
            "while(true);",
            "return 3",
            "throw new Error()",
            "new Error()",
            "try { 1 }",
            "let me_pass = 1",
            "debugger",
            "x++",
            "() => { 1 }",
        ];
        for input in rejected {
            let err = compile(Kind::Condition, None, input)
                .err()
                .unwrap_or_else(|| panic!("condition {input:?} must be rejected"));
            let status = err.status().expect("compile errors carry a status");
            assert!(status.is_error);
            assert_eq!(status.description.format, messages::ERROR_COMPILING_CONDITION);
        }
    }

    #[test]
    fn test_watch_expressions_permit_call_syntax() {
        assert!(compile(Kind::Watch, None, "process.env").is_ok());
        assert!(compile(Kind::Watch, None, "f(1)").is_ok());
        assert!(compile(Kind::Watch, None, "").is_err());

        let err = compile(Kind::Watch, None, "j+").err().expect("must fail");
        let status = err.status().expect("compile errors carry a status");
        assert!(status.description.format.contains(messages::ERROR_COMPILING_EXPRESSION));
        assert!(status.description.format.contains("Unexpected token"));
    }

    struct FailingFrontend;

    impl SourceFrontend for FailingFrontend {
        fn extension(&self) -> &str {
            "coffee"
        }

        fn translate(&self, _: &str) -> Result<String, FrontendError> {
            Err(FrontendError {
                message: "Unexpected token >>".to_string(),
            })
        }
    }

    #[test]
    fn test_frontend_failures_keep_their_message_for_watches_only() {
        let err = compile(Kind::Condition, Some(&FailingFrontend), "x ->").unwrap_err();
        let status = err.status().unwrap();
        assert_eq!(status.description.format, messages::ERROR_COMPILING_CONDITION);

        let err = compile(Kind::Watch, Some(&FailingFrontend), "x ->").unwrap_err();
        let status = err.status().unwrap();
        assert!(status.description.format.contains("Unexpected token >>"));
    }
}
