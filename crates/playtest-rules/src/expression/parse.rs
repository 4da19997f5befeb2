//! Compilation of condition strings into [`Expr`] trees.
//!
//! Compilation never fails: anything that is not recognised as an operator,
//! literal, or call becomes an [`Identifier`], which resolves to null when
//! nothing matches it at evaluation time.

use serde_json::Value;

use super::{ArithOp, CompareOp, Expr, Func, Identifier, PathRoot};

/// Compile a condition string.
pub fn compile(source: &str) -> Expr {
    let expr = source.trim();
    if expr.is_empty() {
        return Expr::Empty;
    }

    if let Some(parts) = split_top_level(expr, "||") {
        return Expr::Any(parts.into_iter().map(compile).collect());
    }

    if let Some(parts) = split_top_level(expr, "&&") {
        return Expr::All(parts.into_iter().map(compile).collect());
    }

    if let Some(rest) = expr.strip_prefix('!')
        && !rest.starts_with('=')
    {
        let inner = rest.trim();
        let inner = unwrap_group(inner).unwrap_or(inner);
        return Expr::Not(Box::new(compile(inner)));
    }

    if let Some(inner) = unwrap_group(expr) {
        return compile(inner);
    }

    for op in CompareOp::SCAN_ORDER {
        if let Some((lhs, rhs)) = expr.split_once(op.symbol()) {
            return Expr::Compare {
                op,
                lhs: Box::new(compile(lhs)),
                rhs: Box::new(compile(rhs)),
            };
        }
    }

    for op in ArithOp::SCAN_ORDER {
        if expr.starts_with(op.symbol()) {
            continue;
        }
        if let Some((lhs, rhs)) = expr.split_once(op.symbol()) {
            return Expr::Arith {
                op,
                lhs: Box::new(compile(lhs)),
                rhs: Box::new(compile(rhs)),
            };
        }
    }

    leaf(expr)
}

/// Split at every occurrence of `op` outside parentheses.
///
/// Returns `None` when there is no such occurrence. Pieces are trimmed; a
/// blank trailing piece is dropped, other blank pieces are kept.
fn split_top_level<'a>(expr: &'a str, op: &str) -> Option<Vec<&'a str>> {
    let mut parts = Vec::new();
    let mut depth: i64 = 0;
    let mut start = 0;
    let mut found = false;
    let mut skip_until = 0;

    for (i, c) in expr.char_indices() {
        if i < skip_until {
            continue;
        }
        match c {
            '(' => depth = depth.saturating_add(1),
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 && expr.get(i..).is_some_and(|rest| rest.starts_with(op)) => {
                parts.push(expr.get(start..i).unwrap_or_default().trim());
                found = true;
                start = i.saturating_add(op.len());
                skip_until = start;
            }
            _ => {}
        }
    }

    if !found {
        return None;
    }
    let tail = expr.get(start..).unwrap_or_default().trim();
    if !tail.is_empty() {
        parts.push(tail);
    }
    Some(parts)
}

/// Strip one pair of parentheses if the first `(` closes at the last `)`.
fn unwrap_group(expr: &str) -> Option<&str> {
    let inner = expr.strip_prefix('(')?.strip_suffix(')')?;
    let mut depth: i64 = 0;
    for c in inner.chars() {
        match c {
            '(' => depth = depth.saturating_add(1),
            ')' => {
                depth = depth.saturating_sub(1);
                if depth < 0 {
                    return None;
                }
            }
            _ => {}
        }
    }
    Some(inner)
}

fn leaf(expr: &str) -> Expr {
    if let Some(value) = number_literal(expr) {
        return Expr::Literal(value);
    }

    match expr {
        "null" | "None" => return Expr::Literal(Value::Null),
        "true" | "True" => return Expr::Literal(Value::Bool(true)),
        "false" | "False" => return Expr::Literal(Value::Bool(false)),
        _ => {}
    }

    for (prefix, func) in [("len(", Func::Len), ("count(", Func::Count)] {
        if let Some(inner) = expr.strip_prefix(prefix).and_then(|s| s.strip_suffix(')')) {
            return Expr::Call {
                func,
                arg: Box::new(compile(inner)),
            };
        }
    }

    for quote in ['"', '\''] {
        if expr.starts_with(quote) && expr.ends_with(quote) {
            let text = expr
                .strip_prefix(quote)
                .and_then(|s| s.strip_suffix(quote))
                .unwrap_or_default();
            return Expr::Literal(Value::String(text.to_owned()));
        }
    }

    Expr::Ident(identifier(expr))
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Integers (`12`, `-3`) and unsigned decimals with at most one dot (`0.5`,
/// `.5`, `5.`).
fn number_literal(expr: &str) -> Option<Value> {
    let unsigned = expr.strip_prefix('-').unwrap_or(expr);
    if is_digits(unsigned) {
        return match expr.parse::<i64>() {
            Ok(n) => Some(Value::from(n)),
            Err(_) => expr.parse::<f64>().ok().map(Value::from),
        };
    }

    if expr.contains('.') && is_digits(&expr.replacen('.', "", 1)) {
        return expr.parse::<f64>().ok().map(Value::from);
    }

    None
}

fn identifier(expr: &str) -> Identifier {
    let mut segments = expr.split('.');
    let root = match segments.next() {
        Some("curr") => Some(PathRoot::Curr),
        Some("prev") => Some(PathRoot::Prev),
        Some("action_result" | "actionResult") => Some(PathRoot::ActionResult),
        Some("computed") => Some(PathRoot::Computed),
        _ => None,
    };
    Identifier {
        raw: expr.to_owned(),
        path: root.map(|root| (root, segments.map(str::to_owned).collect())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(raw: &str) -> Expr {
        Expr::Ident(identifier(raw))
    }

    #[test]
    fn blank_is_empty() {
        assert_eq!(compile("   "), Expr::Empty);
    }

    #[test]
    fn or_binds_before_and() {
        assert_eq!(
            compile("a && b || c"),
            Expr::Any(vec![Expr::All(vec![ident("a"), ident("b")]), ident("c")])
        );
    }

    #[test]
    fn nested_or_falls_through_to_and() {
        assert_eq!(
            compile("(a || b) && c"),
            Expr::All(vec![Expr::Any(vec![ident("a"), ident("b")]), ident("c")])
        );
    }

    #[test]
    fn dangling_operator_keeps_leading_blank() {
        let parts = split_top_level("|| a ||", "||");
        assert_eq!(parts, Some(vec!["", "a"]));
    }

    #[test]
    fn not_does_not_swallow_ne() {
        assert!(matches!(compile("!= 3"), Expr::Compare { op: CompareOp::Ne, .. }));
        assert!(matches!(compile("!a"), Expr::Not(_)));
    }

    #[test]
    fn group_requires_matching_parens() {
        assert_eq!(unwrap_group("(a + b)"), Some("a + b"));
        assert_eq!(unwrap_group("(a) + (b)"), None);
        // `(a) + (b)` is not a group, so it falls to arithmetic.
        assert!(matches!(compile("(a) + (b)"), Expr::Arith { op: ArithOp::Add, .. }));
    }

    #[test]
    fn comparison_scans_operator_list_not_position() {
        // `==` is checked before `<`, even though `<` appears first.
        assert_eq!(
            compile("a < b == c"),
            Expr::Compare {
                op: CompareOp::Eq,
                lhs: Box::new(Expr::Compare {
                    op: CompareOp::Lt,
                    lhs: Box::new(ident("a")),
                    rhs: Box::new(ident("b")),
                }),
                rhs: Box::new(ident("c")),
            }
        );
    }

    #[test]
    fn ge_is_found_before_gt() {
        assert!(matches!(compile("a >= 3"), Expr::Compare { op: CompareOp::Ge, .. }));
    }

    #[test]
    fn leading_sign_is_not_an_operator() {
        assert_eq!(compile("-5"), Expr::Literal(Value::from(-5)));
        assert!(matches!(compile("-a * 2"), Expr::Arith { op: ArithOp::Mul, .. }));
    }

    #[test]
    fn negative_decimal_is_an_identifier() {
        assert_eq!(compile("-0.5"), ident("-0.5"));
        assert_eq!(
            compile("hp_ratio_delta < -0.5"),
            Expr::Compare {
                op: CompareOp::Lt,
                lhs: Box::new(ident("hp_ratio_delta")),
                rhs: Box::new(ident("-0.5")),
            }
        );
    }

    #[test]
    fn numbers() {
        assert_eq!(number_literal("12"), Some(Value::from(12)));
        assert_eq!(number_literal("1.5"), Some(Value::from(1.5)));
        assert_eq!(number_literal(".5"), Some(Value::from(0.5)));
        assert_eq!(number_literal("1.2.3"), None);
        assert_eq!(number_literal("1e5"), None);
        assert_eq!(number_literal("-1.5"), None);
    }

    #[test]
    fn calls_and_strings() {
        assert!(matches!(compile("len(a)"), Expr::Call { func: Func::Len, .. }));
        assert!(matches!(compile("count(a)"), Expr::Call { func: Func::Count, .. }));
        assert_eq!(compile("'x'"), Expr::Literal(Value::from("x")));
        assert_eq!(compile("\"\""), Expr::Literal(Value::from("")));
    }

    #[test]
    fn identifiers_pre_split_known_roots() {
        let id = identifier("curr.player.hp");
        assert_eq!(
            id.path,
            Some((PathRoot::Curr, vec!["player".to_owned(), "hp".to_owned()]))
        );
        assert_eq!(identifier("hp_delta").path, None);
        assert_eq!(
            identifier("actionResult.crit").path.map(|(root, _)| root),
            Some(PathRoot::ActionResult)
        );
    }
}
