//! Evaluation of compiled expressions.
//!
//! Values are plain JSON values. Integers stay integral through `+`, `-`, `*`;
//! `/` yields a float, or integer 0 when the divisor is zero. Null operands
//! count as 0 in arithmetic and make every ordering comparison false.
//! Booleans behave as 0/1 in arithmetic, ordering, and numeric equality.

use std::cmp::Ordering;

use serde_json::Value;

use super::{ArithOp, CompareOp, EvaluationContext, Expr, Func, Identifier, PathRoot};
use crate::error::EvalError;

impl Expr {
    /// Evaluate against `ctx`.
    pub fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Result<Value, EvalError> {
        match self {
            Self::Empty => Ok(Value::Bool(false)),
            Self::Literal(value) => Ok(value.clone()),
            Self::Ident(ident) => Ok(resolve(ident, ctx)),
            Self::Not(inner) => Ok(Value::Bool(!is_truthy(&inner.evaluate(ctx)?))),
            Self::Any(parts) => {
                for part in parts {
                    if is_truthy(&part.evaluate(ctx)?) {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
            Self::All(parts) => {
                for part in parts {
                    if !is_truthy(&part.evaluate(ctx)?) {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
            Self::Compare { op, lhs, rhs } => {
                let lhs = lhs.evaluate(ctx)?;
                let rhs = rhs.evaluate(ctx)?;
                compare(*op, &lhs, &rhs).map(Value::Bool)
            }
            Self::Arith { op, lhs, rhs } => {
                let lhs = lhs.evaluate(ctx)?;
                let rhs = rhs.evaluate(ctx)?;
                arithmetic(*op, lhs, rhs)
            }
            Self::Call { func, arg } => {
                let value = arg.evaluate(ctx)?;
                match func {
                    Func::Len | Func::Count => Ok(Value::from(length(&value))),
                }
            }
        }
    }
}

/// Truthiness: null, `false`, zero, and empty strings, lists, and objects are
/// false; everything else is true.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Structural equality where numbers (and booleans) compare by value, so
/// `1 == 1.0` and `true == 1`.
pub fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    if let (Some(a), Some(b)) = (Numeric::of(lhs), Numeric::of(rhs)) {
        return a.cmp_numeric(b) == Ordering::Equal;
    }
    match (lhs, rhs) {
        (Value::Null, Value::Null) => true,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .all(|(k, v)| b.get(k).is_some_and(|other| values_equal(v, other)))
        }
        _ => false,
    }
}

fn resolve(ident: &Identifier, ctx: &EvaluationContext<'_>) -> Value {
    if let Some(value) = ctx.computed.get(&ident.raw) {
        return value.clone();
    }
    if ctx.has_fired(&ident.raw) {
        return Value::Bool(true);
    }

    let Some((root, segments)) = &ident.path else {
        return Value::Null;
    };
    let start = match root {
        PathRoot::Curr => ctx.curr,
        PathRoot::Prev => ctx.prev,
        PathRoot::ActionResult => {
            let Some(outcome) = ctx.action_result else {
                return Value::Null;
            };
            return walk_map(outcome, segments);
        }
        PathRoot::Computed => {
            return ctx
                .computed
                .get(&segments.join("."))
                .cloned()
                .unwrap_or(Value::Null);
        }
    };

    let mut node = start;
    for segment in segments {
        match node.get(segment) {
            Some(next) => node = next,
            None => return Value::Null,
        }
    }
    node.clone()
}

fn walk_map(map: &serde_json::Map<String, Value>, segments: &[String]) -> Value {
    let Some((first, rest)) = segments.split_first() else {
        return Value::Object(map.clone());
    };
    let mut node = match map.get(first) {
        Some(value) => value,
        None => return Value::Null,
    };
    for segment in rest {
        match node.get(segment) {
            Some(next) => node = next,
            None => return Value::Null,
        }
    }
    node.clone()
}

fn length(value: &Value) -> usize {
    match value {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        _ => 0,
    }
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// Numbers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Numeric {
    Int(i64),
    Float(f64),
}

impl Numeric {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Self::Int(i64::from(*b))),
            Value::Number(n) => Some(
                n.as_i64()
                    .map_or_else(|| Self::Float(n.as_f64().unwrap_or(0.0)), Self::Int),
            ),
            _ => None,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    const fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Self::Int(i) => i == 0,
            Self::Float(f) => f == 0.0,
        }
    }

    fn cmp_numeric(self, other: Self) -> Ordering {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.cmp(&b),
            (a, b) => a.as_f64().total_cmp(&b.as_f64()),
        }
    }
}

fn float_value(f: f64, op: ArithOp) -> Result<Value, EvalError> {
    serde_json::Number::from_f64(f)
        .map(Value::Number)
        .ok_or(EvalError::NonFinite { op: op.symbol() })
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

fn compare(op: CompareOp, lhs: &Value, rhs: &Value) -> Result<bool, EvalError> {
    match op {
        CompareOp::Eq => return Ok(values_equal(lhs, rhs)),
        CompareOp::Ne => return Ok(!values_equal(lhs, rhs)),
        _ => {}
    }
    if lhs.is_null() || rhs.is_null() {
        return Ok(false);
    }
    let ordering = order(lhs, rhs).ok_or(EvalError::TypeMismatch {
        op: op.symbol(),
        lhs: kind(lhs),
        rhs: kind(rhs),
    })?;
    Ok(match op {
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Ge => ordering != Ordering::Less,
        CompareOp::Le => ordering != Ordering::Greater,
        CompareOp::Eq | CompareOp::Ne => false,
    })
}

/// Ordering between two values of comparable kinds; lists compare
/// element-wise, then by length.
fn order(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (Numeric::of(lhs), Numeric::of(rhs)) {
        return Some(a.cmp_numeric(b));
    }
    match (lhs, rhs) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Array(a), Value::Array(b)) => {
            for (x, y) in a.iter().zip(b) {
                if values_equal(x, y) {
                    continue;
                }
                return order(x, y);
            }
            Some(a.len().cmp(&b.len()))
        }
        _ => None,
    }
}

fn arithmetic(op: ArithOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    let lhs = if lhs.is_null() { Value::from(0) } else { lhs };
    let rhs = if rhs.is_null() { Value::from(0) } else { rhs };

    if op == ArithOp::Div && Numeric::of(&rhs).is_some_and(Numeric::is_zero) {
        return Ok(Value::from(0));
    }

    let mismatch = || EvalError::TypeMismatch {
        op: op.symbol(),
        lhs: kind(&lhs),
        rhs: kind(&rhs),
    };

    if let (Some(a), Some(b)) = (Numeric::of(&lhs), Numeric::of(&rhs)) {
        let overflow = EvalError::Overflow { op: op.symbol() };
        return match (op, a, b) {
            (ArithOp::Add, Numeric::Int(x), Numeric::Int(y)) => {
                x.checked_add(y).map(Value::from).ok_or(overflow)
            }
            (ArithOp::Sub, Numeric::Int(x), Numeric::Int(y)) => {
                x.checked_sub(y).map(Value::from).ok_or(overflow)
            }
            (ArithOp::Mul, Numeric::Int(x), Numeric::Int(y)) => {
                x.checked_mul(y).map(Value::from).ok_or(overflow)
            }
            (ArithOp::Add, a, b) => float_value(a.as_f64() + b.as_f64(), op),
            (ArithOp::Sub, a, b) => float_value(a.as_f64() - b.as_f64(), op),
            (ArithOp::Mul, a, b) => float_value(a.as_f64() * b.as_f64(), op),
            (ArithOp::Div, a, b) => float_value(a.as_f64() / b.as_f64(), op),
        };
    }

    match (op, &lhs, &rhs) {
        (ArithOp::Add, Value::String(a), Value::String(b)) => Ok(Value::String(format!("{a}{b}"))),
        (ArithOp::Add, Value::Array(a), Value::Array(b)) => {
            Ok(Value::Array(a.iter().chain(b).cloned().collect()))
        }
        _ => Err(mismatch()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truthiness() {
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!(0.0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!([])));
        assert!(!is_truthy(&json!({})));
        assert!(is_truthy(&json!(-1)));
        assert!(is_truthy(&json!("x")));
        assert!(is_truthy(&json!(["a"])));
    }

    #[test]
    fn numeric_equality_crosses_int_and_float() {
        assert!(values_equal(&json!(1), &json!(1.0)));
        assert!(values_equal(&json!(true), &json!(1)));
        assert!(values_equal(&json!([1, "a"]), &json!([1.0, "a"])));
        assert!(!values_equal(&json!(0), &Value::Null));
        assert!(!values_equal(&json!("1"), &json!(1)));
    }

    #[test]
    fn integer_arithmetic_stays_integral() {
        assert_eq!(arithmetic(ArithOp::Add, json!(2), json!(3)).ok(), Some(json!(5)));
        assert_eq!(arithmetic(ArithOp::Sub, json!(2), json!(3)).ok(), Some(json!(-1)));
        assert_eq!(arithmetic(ArithOp::Mul, json!(4), json!(3)).ok(), Some(json!(12)));
        assert_eq!(arithmetic(ArithOp::Div, json!(3), json!(2)).ok(), Some(json!(1.5)));
    }

    #[test]
    fn division_by_zero_is_zero() {
        assert_eq!(arithmetic(ArithOp::Div, json!(3), json!(0)).ok(), Some(json!(0)));
        assert_eq!(arithmetic(ArithOp::Div, json!(3.5), json!(0.0)).ok(), Some(json!(0)));
        assert_eq!(arithmetic(ArithOp::Div, json!(3), Value::Null).ok(), Some(json!(0)));
        assert_eq!(arithmetic(ArithOp::Div, json!(3), json!(false)).ok(), Some(json!(0)));
    }

    #[test]
    fn overflow_is_an_error() {
        assert_eq!(
            arithmetic(ArithOp::Add, json!(i64::MAX), json!(1)),
            Err(EvalError::Overflow { op: "+" })
        );
    }

    #[test]
    fn concatenation() {
        assert_eq!(arithmetic(ArithOp::Add, json!("a"), json!("b")).ok(), Some(json!("ab")));
        assert_eq!(
            arithmetic(ArithOp::Add, json!(["a"]), json!(["b"])).ok(),
            Some(json!(["a", "b"]))
        );
        assert!(arithmetic(ArithOp::Sub, json!("a"), json!("b")).is_err());
    }

    #[test]
    fn ordering() {
        assert_eq!(compare(CompareOp::Gt, &json!(2), &json!(1.5)), Ok(true));
        assert_eq!(compare(CompareOp::Le, &json!("abc"), &json!("abd")), Ok(true));
        assert_eq!(compare(CompareOp::Lt, &json!([1, 2]), &json!([1, 3])), Ok(true));
        assert_eq!(compare(CompareOp::Ge, &Value::Null, &json!(0)), Ok(false));
        assert!(compare(CompareOp::Gt, &json!({}), &json!(1)).is_err());
    }

    #[test]
    fn length_of_sized_values() {
        assert_eq!(length(&json!("héllo")), 5);
        assert_eq!(length(&json!([1, 2, 3])), 3);
        assert_eq!(length(&json!({"a": 1})), 1);
        assert_eq!(length(&json!(7)), 0);
    }
}
