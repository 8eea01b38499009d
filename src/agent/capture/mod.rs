//! State capture. On a hit the capturer walks the paused frames and the
//! reachable value graph into the flattened wire form, under the configured
//! bounds. Everything here is local to one snapshot and discarded after the
//! waiter returns.

pub mod render;
pub mod table;

use crate::agent::breakpoint::{Reference, SourceLocation, StackFrame, StatusMessage, Variable};
use crate::agent::config::CaptureConfig;
use crate::agent::expression::eval::Scope;
use crate::agent::expression::CompiledExpression;
use crate::agent::messages;
use crate::agent::runtime::{ObjectKind, PausedState, PropertySlot, Value};
use render::render_scalar;
use table::VariableTable;

/// Output slot content of a captured snapshot.
pub struct Snapshot {
    pub stack_frames: Vec<StackFrame>,
    pub variable_table: Vec<Variable>,
    pub evaluated_expressions: Vec<Variable>,
}

/// Produce the frames, variable table and watch-expression results for a
/// paused program.
pub fn capture(
    cfg: &CaptureConfig,
    state: &dyn PausedState,
    expressions: &[CompiledExpression],
) -> Snapshot {
    let mut table = VariableTable::default();
    let frames = state.frames();

    let mut stack_frames = Vec::with_capacity(frames.len().min(cfg.max_frames));
    for (i, frame) in frames.iter().take(cfg.max_frames).enumerate() {
        let (arguments, locals) = if i < cfg.max_expand_frames {
            (
                frame
                    .arguments
                    .iter()
                    .map(|(name, value)| table.variable_for(name.clone(), value, cfg))
                    .collect(),
                frame
                    .locals
                    .iter()
                    .map(|(name, value)| table.variable_for(name.clone(), value, cfg))
                    .collect(),
            )
        } else {
            let index = table.not_expanded_entry(cfg.max_expand_frames);
            (
                vec![Variable::table_ref("arguments", index)],
                vec![Variable::table_ref("locals", index)],
            )
        };

        stack_frames.push(StackFrame {
            function: frame
                .function
                .clone()
                .unwrap_or_else(|| messages::ANONYMOUS_FUNCTION.to_string()),
            location: SourceLocation {
                path: frame.path.display().to_string(),
                line: frame.line as i32,
                column: None,
            },
            arguments,
            locals,
        });
    }

    let mut evaluated_expressions = Vec::with_capacity(expressions.len());
    for expr in expressions {
        let scope = Scope::new(frames.first(), state);
        let variable = match expr.evaluate(&scope) {
            Ok(value) => table.variable_for(expr.source.clone(), &value, cfg),
            Err(e) => Variable::with_status(
                Some(expr.source.clone()),
                StatusMessage::error(
                    Reference::VariableValue,
                    format!("{}: {e}", messages::EXPRESSION_EVALUATION_FAILED),
                    vec![],
                ),
            ),
        };
        evaluated_expressions.push(variable);
    }

    Snapshot {
        stack_frames,
        variable_table: table.into_entries(),
        evaluated_expressions,
    }
}

/// Expand a logpoint message. `$0`, `$1`, … substitute the evaluated
/// expressions in request order, `$$` escapes a literal dollar, and an
/// out-of-range reference stays verbatim.
pub fn format_log_message(
    format: &str,
    cfg: &CaptureConfig,
    state: &dyn PausedState,
    expressions: &[CompiledExpression],
) -> String {
    let frames = state.frames();
    let rendered: Vec<String> = expressions
        .iter()
        .map(|expr| {
            let scope = Scope::new(frames.first(), state);
            match expr.evaluate(&scope) {
                Ok(value) => render_log_value(&value, cfg),
                Err(e) => format!("<{e}>"),
            }
        })
        .collect();

    let mut out = String::with_capacity(format.len());
    let mut chars = format.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('$') => {
                chars.next();
                out.push('$');
            }
            Some(d) if d.is_ascii_digit() => {
                let mut number = String::new();
                while let Some(d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                    number.push(*d);
                    chars.next();
                }
                match number.parse::<usize>().ok().and_then(|i| rendered.get(i)) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('$');
                        out.push_str(&number);
                    }
                }
            }
            _ => out.push('$'),
        }
    }
    out
}

/// One-level rendering for log lines: scalars verbatim, compounds shallow.
fn render_log_value(value: &Value, cfg: &CaptureConfig) -> String {
    use itertools::Itertools;

    let Value::Object(obj) = value else {
        return render_scalar(value, cfg.max_string_length);
    };

    let data = obj.borrow();
    let body = data
        .properties
        .iter()
        .take(cfg.max_properties)
        .map(|p| {
            let rendered = match &p.slot {
                PropertySlot::Data(Value::Object(_)) => "...".to_string(),
                PropertySlot::Data(v) => render_scalar(v, cfg.max_string_length),
                PropertySlot::Accessor => "<native>".to_string(),
            };
            match data.kind {
                ObjectKind::Array => rendered,
                _ => format!("{}: {rendered}", p.name),
            }
        })
        .join(", ");

    match data.kind {
        ObjectKind::Array => format!("[{body}]"),
        _ => format!("{{{body}}}"),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::agent::expression::{self, Kind};
    use crate::agent::runtime::{FrameSnapshot, ObjectRef};
    use std::path::PathBuf;

    struct OneFrame {
        locals: Vec<(String, Value)>,
    }

    impl PausedState for OneFrame {
        fn frames(&self) -> Vec<FrameSnapshot> {
            vec![FrameSnapshot {
                function: Some("foo".to_string()),
                path: PathBuf::from("/srv/app/foo.js"),
                line: 4,
                receiver: Value::Undefined,
                arguments: vec![("n".to_string(), Value::Int(2))],
                locals: self.locals.clone(),
            }]
        }

        fn global(&self, _: &str) -> Option<Value> {
            None
        }
    }

    #[test]
    fn test_log_format_expansion() {
        let state = OneFrame {
            locals: vec![(
                "A".to_string(),
                Value::Object(ObjectRef::array([1, 2, 3].map(Value::Int))),
            )],
        };
        let cfg = CaptureConfig::default();
        let exprs = vec![
            expression::compile(Kind::Watch, None, "n").unwrap(),
            expression::compile(Kind::Watch, None, "A").unwrap(),
        ];

        let line = format_log_message("n=$0 A=$1 $$2 $9 $x", &cfg, &state, &exprs);
        assert_eq!(line, "n=2 A=[1, 2, 3] $2 $9 $x");
    }

    #[test]
    fn test_collapsed_frames_share_the_sentinel_entry() {
        struct ManyFrames;
        impl PausedState for ManyFrames {
            fn frames(&self) -> Vec<FrameSnapshot> {
                (0..4)
                    .map(|i| FrameSnapshot {
                        function: None,
                        path: PathBuf::from("/srv/app/foo.js"),
                        line: i + 1,
                        receiver: Value::Undefined,
                        arguments: vec![],
                        locals: vec![("x".to_string(), Value::Int(i as i64))],
                    })
                    .collect()
            }
            fn global(&self, _: &str) -> Option<Value> {
                None
            }
        }

        let cfg = CaptureConfig {
            max_expand_frames: 1,
            ..CaptureConfig::default()
        };
        let snapshot = capture(&cfg, &ManyFrames, &[]);

        assert_eq!(snapshot.stack_frames.len(), 4);
        assert_eq!(snapshot.stack_frames[0].locals[0].name.as_deref(), Some("x"));
        assert_eq!(
            snapshot.stack_frames[0].function,
            messages::ANONYMOUS_FUNCTION
        );

        let stub = &snapshot.stack_frames[2].locals[0];
        let index = stub.var_table_index.expect("collapsed frames are stubs");
        let sentinel = &snapshot.variable_table[index as usize];
        let status = sentinel.status.as_ref().unwrap();
        assert!(status.is_error);
        assert!(status.description.format.contains("stack frames"));

        // Every collapsed frame points at the same entry.
        for frame in &snapshot.stack_frames[1..] {
            assert_eq!(frame.arguments[0].var_table_index, Some(index));
            assert_eq!(frame.locals[0].var_table_index, Some(index));
        }
    }

    #[test]
    fn test_expression_errors_stay_local() {
        let state = OneFrame { locals: vec![] };
        let cfg = CaptureConfig::default();
        let exprs = vec![
            expression::compile(Kind::Watch, None, "missing").unwrap(),
            expression::compile(Kind::Watch, None, "n").unwrap(),
        ];

        let snapshot = capture(&cfg, &state, &exprs);
        assert_eq!(snapshot.evaluated_expressions.len(), 2);

        let failed = &snapshot.evaluated_expressions[0];
        assert_eq!(failed.name.as_deref(), Some("missing"));
        assert!(failed.status.as_ref().unwrap().is_error);
        assert_eq!(
            failed.status.as_ref().unwrap().refers_to,
            Reference::VariableValue
        );

        let ok = &snapshot.evaluated_expressions[1];
        assert_eq!(ok.value.as_deref(), Some("2"));
    }
}
