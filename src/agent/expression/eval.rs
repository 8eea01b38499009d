//! Side-effect-free evaluation of parsed expressions against the paused
//! program. The evaluator interprets the whitelisted node set directly, so a
//! write is unrepresentable: the only operations that touch the debuggee are
//! identifier reads and data-property reads. Accessor-backed properties and
//! calls are refused before they can run user code.

use super::ast::{BinaryOp, Expr, Literal, UnaryOp};
use crate::agent::runtime::{FrameSnapshot, ObjectKind, ObjectRef, PausedState, PropertySlot, Value};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum EvalError {
    #[error("`{0}` is not defined")]
    NotDefined(String),
    #[error("property `{0}` is native or accessor-backed")]
    Hazardous(String),
    #[error("calls are not allowed in a read-only evaluation")]
    CallRefused,
    #[error("cannot read property `{0}` of {1}")]
    MemberOfNothing(String, &'static str),
    #[error("division by zero")]
    DivisionByZero,
    #[error("unsupported operand types for `{0}`")]
    BadOperands(String),
}

/// Name resolution order: top-frame locals, then arguments, then globals.
pub struct Scope<'a> {
    frame: Option<&'a FrameSnapshot>,
    state: &'a dyn PausedState,
}

impl<'a> Scope<'a> {
    pub fn new(frame: Option<&'a FrameSnapshot>, state: &'a dyn PausedState) -> Self {
        Scope { frame, state }
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(frame) = self.frame {
            let local = frame
                .locals
                .iter()
                .chain(frame.arguments.iter())
                .find(|(n, _)| n == name);
            if let Some((_, value)) = local {
                return Some(value.clone());
            }
        }
        self.state.global(name)
    }

    fn this(&self) -> Value {
        self.frame
            .map(|f| f.receiver.clone())
            .unwrap_or(Value::Undefined)
    }
}

pub fn evaluate(expr: &Expr, scope: &Scope) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(lit) => Ok(literal_value(lit)),
        Expr::This => Ok(scope.this()),
        Expr::Ident(name) => scope
            .lookup(name)
            .ok_or_else(|| EvalError::NotDefined(name.clone())),
        Expr::Member(target, field) => {
            let target = evaluate(target, scope)?;
            read_member(&target, field)
        }
        Expr::Index(target, index) => {
            let target = evaluate(target, scope)?;
            let index = evaluate(index, scope)?;
            let key = match index {
                Value::Int(n) => n.to_string(),
                Value::Str(s) => s,
                other => return Err(EvalError::BadOperands(format!("[{}]", other.type_name()))),
            };
            read_member(&target, &key)
        }
        Expr::Unary(op, operand) => {
            let operand = evaluate(operand, scope)?;
            unary(*op, operand)
        }
        Expr::Binary(BinaryOp::And, lhs, rhs) => {
            let lhs = evaluate(lhs, scope)?;
            if lhs.is_truthy() {
                evaluate(rhs, scope)
            } else {
                Ok(lhs)
            }
        }
        Expr::Binary(BinaryOp::Or, lhs, rhs) => {
            let lhs = evaluate(lhs, scope)?;
            if lhs.is_truthy() {
                Ok(lhs)
            } else {
                evaluate(rhs, scope)
            }
        }
        Expr::Binary(op, lhs, rhs) => {
            let lhs = evaluate(lhs, scope)?;
            let rhs = evaluate(rhs, scope)?;
            binary(*op, lhs, rhs)
        }
        Expr::Conditional(cond, then, otherwise) => {
            if evaluate(cond, scope)?.is_truthy() {
                evaluate(then, scope)
            } else {
                evaluate(otherwise, scope)
            }
        }
        Expr::Comma(items) => {
            let mut last = Value::Undefined;
            for item in items {
                last = evaluate(item, scope)?;
            }
            Ok(last)
        }
        Expr::Array(items) => {
            let values: Result<Vec<_>, _> = items.iter().map(|e| evaluate(e, scope)).collect();
            Ok(Value::Object(ObjectRef::array(values?)))
        }
        Expr::Object(pairs) => {
            let object = ObjectRef::object();
            for (key, value_expr) in pairs {
                let value = evaluate(value_expr, scope)?;
                object.push(key.clone(), value);
            }
            Ok(Value::Object(object))
        }
        Expr::Call(_, _) => Err(EvalError::CallRefused),
    }
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Null => Value::Null,
        Literal::Undefined => Value::Undefined,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(n) => Value::Int(*n),
        Literal::Float(x) => Value::Float(*x),
        Literal::Str(s) => Value::Str(s.clone()),
    }
}

fn read_member(target: &Value, field: &str) -> Result<Value, EvalError> {
    match target {
        Value::Undefined => Err(EvalError::MemberOfNothing(field.to_string(), "undefined")),
        Value::Null => Err(EvalError::MemberOfNothing(field.to_string(), "null")),
        Value::Str(s) => Ok(match field {
            "length" => Value::Int(s.chars().count() as i64),
            _ => match field.parse::<usize>() {
                Ok(i) => s
                    .chars()
                    .nth(i)
                    .map(|c| Value::Str(c.to_string()))
                    .unwrap_or(Value::Undefined),
                Err(_) => Value::Undefined,
            },
        }),
        Value::Bool(_) | Value::Int(_) | Value::Float(_) => Ok(Value::Undefined),
        Value::Object(obj) => match obj.property(field) {
            Some(PropertySlot::Data(value)) => Ok(value),
            Some(PropertySlot::Accessor) => Err(EvalError::Hazardous(field.to_string())),
            None => {
                if field == "length" && obj.kind() == ObjectKind::Array {
                    Ok(Value::Int(obj.borrow().properties.len() as i64))
                } else {
                    Ok(Value::Undefined)
                }
            }
        },
    }
}

fn unary(op: UnaryOp, operand: Value) -> Result<Value, EvalError> {
    match (op, operand) {
        (UnaryOp::Not, operand) => Ok(Value::Bool(!operand.is_truthy())),
        (UnaryOp::Neg, Value::Int(n)) => Ok(Value::Int(-n)),
        (UnaryOp::Neg, Value::Float(x)) => Ok(Value::Float(-x)),
        (UnaryOp::Plus, v @ (Value::Int(_) | Value::Float(_))) => Ok(v),
        (op, _) => Err(EvalError::BadOperands(op.to_string())),
    }
}

fn binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    use BinaryOp::*;
    match op {
        Eq => Ok(Value::Bool(loose_eq(&lhs, &rhs))),
        Ne => Ok(Value::Bool(!loose_eq(&lhs, &rhs))),
        StrictEq => Ok(Value::Bool(strict_eq(&lhs, &rhs))),
        StrictNe => Ok(Value::Bool(!strict_eq(&lhs, &rhs))),
        Add => add(lhs, rhs),
        Sub | Mul | Div | Rem => arithmetic(op, lhs, rhs),
        Lt | Le | Gt | Ge => compare(op, lhs, rhs),
        And | Or => unreachable!("short-circuit operators are handled by the caller"),
    }
}

fn add(lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    match (lhs, rhs) {
        (Value::Str(a), b) => Ok(Value::Str(a + &concat_repr(&b))),
        (a, Value::Str(b)) => Ok(Value::Str(concat_repr(&a) + &b)),
        (a, b) => arithmetic(BinaryOp::Add, a, b),
    }
}

fn concat_repr(value: &Value) -> String {
    match value {
        Value::Undefined => "undefined".to_string(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(n) => n.to_string(),
        Value::Float(x) => x.to_string(),
        Value::Str(s) => s.clone(),
        Value::Object(obj) => match obj.kind() {
            ObjectKind::Array => "[object Array]".to_string(),
            ObjectKind::Function => "[object Function]".to_string(),
            ObjectKind::Plain => "[object Object]".to_string(),
        },
    }
}

fn arithmetic(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    use BinaryOp::*;
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => match op {
            Add => Ok(Value::Int(a.wrapping_add(b))),
            Sub => Ok(Value::Int(a.wrapping_sub(b))),
            Mul => Ok(Value::Int(a.wrapping_mul(b))),
            Div if b == 0 => Err(EvalError::DivisionByZero),
            Div => Ok(Value::Int(a / b)),
            Rem if b == 0 => Err(EvalError::DivisionByZero),
            Rem => Ok(Value::Int(a % b)),
            _ => Err(EvalError::BadOperands(op.to_string())),
        },
        (a, b) => match (as_float(&a), as_float(&b)) {
            (Some(a), Some(b)) => match op {
                Add => Ok(Value::Float(a + b)),
                Sub => Ok(Value::Float(a - b)),
                Mul => Ok(Value::Float(a * b)),
                Div => Ok(Value::Float(a / b)),
                Rem => Ok(Value::Float(a % b)),
                _ => Err(EvalError::BadOperands(op.to_string())),
            },
            _ => Err(EvalError::BadOperands(op.to_string())),
        },
    }
}

fn compare(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    use BinaryOp::*;
    if let (Value::Str(a), Value::Str(b)) = (&lhs, &rhs) {
        let result = match op {
            Lt => a < b,
            Le => a <= b,
            Gt => a > b,
            Ge => a >= b,
            _ => unreachable!(),
        };
        return Ok(Value::Bool(result));
    }
    match (as_float(&lhs), as_float(&rhs)) {
        (Some(a), Some(b)) => {
            let result = match op {
                Lt => a < b,
                Le => a <= b,
                Gt => a > b,
                Ge => a >= b,
                _ => unreachable!(),
            };
            Ok(Value::Bool(result))
        }
        _ => Err(EvalError::BadOperands(op.to_string())),
    }
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Int(n) => Some(*n as f64),
        Value::Float(x) => Some(*x),
        _ => None,
    }
}

fn strict_eq(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => a == b,
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
        (Value::Object(a), Value::Object(b)) => a == b,
        _ => false,
    }
}

fn loose_eq(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
        _ => strict_eq(lhs, rhs),
    }
}
