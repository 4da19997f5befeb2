//! The condition language used by event rules.
//!
//! Conditions are short strings such as
//! `battle_started && curr.monster.is_boss == true` or
//! `curr.player.hp * 100 / curr.player.max_hp < 20`. They are compiled once
//! (see [`compile`]) into an [`Expr`] tree and then evaluated against an
//! [`EvaluationContext`] for every tick transition.
//!
//! # Dispatch order
//!
//! Existing rule files were written against a fixed-order splitter, not a
//! precedence grammar, and compilation reproduces it exactly. For a trimmed
//! expression the first matching step wins:
//!
//! 1. `||` at parenthesis depth zero
//! 2. `&&` at parenthesis depth zero
//! 3. leading `!` (but not `!=`), unwrapping one matching pair of parentheses
//! 4. an expression wholly wrapped in matching parentheses
//! 5. the first of `!=`, `==`, `>=`, `<=`, `>`, `<` present anywhere, split at
//!    its first occurrence
//! 6. the first of `+`, `-`, `*`, `/` present anywhere (ignored when it is
//!    the leading character), split at its first occurrence
//! 7. literals: integers, floats, `null`/`None`, `true`/`True`,
//!    `false`/`False`
//! 8. `len(...)` / `count(...)`
//! 9. quoted strings
//! 10. identifiers: computed value, then already-fired event, then a dotted
//!     path rooted at `curr`, `prev`, `action_result`, or `computed`
//!
//! Steps 5 and 6 do not look at parentheses or quotes, so
//! `(a + b) * c` splits at `+`. Write conditions accordingly.
//!
//! Step 7 only accepts a sign on integers. `-0.5` is not a literal: it falls
//! through to step 10 and evaluates to null, so `hp_ratio_delta < -0.5`
//! never holds. Write `hp_ratio_delta * 2 < -1` or `0 - 0.5` instead.

mod eval;
mod parse;

use playtest_types::{Attributes, ComputedValues};
use serde_json::Value;

use crate::error::EvalError;

pub use eval::{is_truthy, values_equal};
pub use parse::compile;

/// Comparison operators, in the order the compiler scans for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `!=`
    Ne,
    /// `==`
    Eq,
    /// `>=`
    Ge,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `<`
    Lt,
}

impl CompareOp {
    /// Scan order used during compilation.
    pub const SCAN_ORDER: [Self; 6] = [Self::Ne, Self::Eq, Self::Ge, Self::Le, Self::Gt, Self::Lt];

    /// Source spelling of the operator.
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Ne => "!=",
            Self::Eq => "==",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Lt => "<",
        }
    }
}

/// Arithmetic operators, in the order the compiler scans for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
}

impl ArithOp {
    /// Scan order used during compilation.
    pub const SCAN_ORDER: [Self; 4] = [Self::Add, Self::Sub, Self::Mul, Self::Div];

    /// Source spelling of the operator.
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        }
    }
}

/// Built-in functions. `len` and `count` are synonyms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    /// `len(x)`
    Len,
    /// `count(x)`
    Count,
}

/// Where a dotted path starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRoot {
    /// `curr.` -- the later state.
    Curr,
    /// `prev.` -- the earlier state.
    Prev,
    /// `action_result.` / `actionResult.` -- the action outcome map.
    ActionResult,
    /// `computed.` -- the computed value map, keyed by the rest of the path.
    Computed,
}

/// A bare name, with its dotted path pre-split when it has a known root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    /// The name exactly as written.
    pub raw: String,
    /// Root and remaining segments, if the name starts with a known root.
    pub path: Option<(PathRoot, Vec<String>)>,
}

/// A compiled condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Blank source; evaluates to `false`.
    Empty,
    /// A constant.
    Literal(Value),
    /// A name resolved at evaluation time.
    Ident(Identifier),
    /// Logical negation.
    Not(Box<Expr>),
    /// Logical OR over the operands.
    Any(Vec<Expr>),
    /// Logical AND over the operands.
    All(Vec<Expr>),
    /// A comparison.
    Compare {
        /// The operator.
        op: CompareOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
    /// An arithmetic operation.
    Arith {
        /// The operator.
        op: ArithOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
    /// A function call.
    Call {
        /// The function.
        func: Func,
        /// Its single argument.
        arg: Box<Expr>,
    },
}

/// Everything a condition can see during one inference pass.
#[derive(Debug, Clone)]
pub struct EvaluationContext<'a> {
    /// The earlier state, as a JSON tree.
    pub prev: &'a Value,
    /// The later state, as a JSON tree.
    pub curr: &'a Value,
    /// Derived values for this transition.
    pub computed: &'a ComputedValues,
    /// Event ids fired earlier in this pass, in firing order.
    pub fired: Vec<String>,
    /// Outcome of the action that produced `curr`, if the caller has one.
    pub action_result: Option<&'a Attributes>,
}

impl<'a> EvaluationContext<'a> {
    /// A context with no events fired yet.
    pub const fn new(
        prev: &'a Value,
        curr: &'a Value,
        computed: &'a ComputedValues,
        action_result: Option<&'a Attributes>,
    ) -> Self {
        Self {
            prev,
            curr,
            computed,
            fired: Vec::new(),
            action_result,
        }
    }

    /// Whether `event_id` has already fired in this pass.
    pub fn has_fired(&self, event_id: &str) -> bool {
        self.fired.iter().any(|e| e == event_id)
    }
}

/// Compile and evaluate `source` in one step.
///
/// Rules compile their conditions once at load time; this is for ad-hoc
/// expressions.
pub fn evaluate(source: &str, ctx: &EvaluationContext<'_>) -> Result<Value, EvalError> {
    compile(source).evaluate(ctx)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Fixture {
        prev: Value,
        curr: Value,
        computed: ComputedValues,
        action: Attributes,
    }

    impl Fixture {
        fn new() -> Self {
            let prev = json!({
                "player": {"hp": 100, "max_hp": 100, "level": 1},
                "world": {"floor": 1, "in_battle": false},
                "monster": null,
            });
            let curr = json!({
                "player": {"hp": 80, "max_hp": 100, "level": 1},
                "world": {"floor": 1, "in_battle": true},
                "monster": {"id": "slime", "is_boss": false},
                "ui": {"current_scene": "battle"},
            });
            let mut computed = ComputedValues::new();
            computed.insert("hp_delta".to_owned(), json!(-20));
            computed.insert("hp_ratio".to_owned(), json!(0.8));
            computed.insert("battle_started".to_owned(), json!(true));
            computed.insert("item_obtained".to_owned(), json!(["potion", "herb"]));
            computed.insert("monster_killed".to_owned(), Value::Null);
            let mut action = Attributes::new();
            action.insert("damage_dealt".to_owned(), json!(12));
            Self {
                prev,
                curr,
                computed,
                action,
            }
        }

        fn ctx(&self) -> EvaluationContext<'_> {
            EvaluationContext::new(&self.prev, &self.curr, &self.computed, Some(&self.action))
        }
    }

    fn eval(fx: &Fixture, source: &str) -> Value {
        evaluate(source, &fx.ctx()).unwrap()
    }

    #[test]
    fn compares_state_paths() {
        let fx = Fixture::new();
        assert_eq!(eval(&fx, "curr.player.hp > 50"), json!(true));
        assert_eq!(eval(&fx, "curr.player.hp > 90"), json!(false));
        assert_eq!(eval(&fx, "prev.player.hp == 100"), json!(true));
        assert_eq!(eval(&fx, "curr.world.in_battle != prev.world.in_battle"), json!(true));
    }

    #[test]
    fn logical_operators_split_at_top_level() {
        let fx = Fixture::new();
        assert_eq!(eval(&fx, "battle_started && hp_delta < 0"), json!(true));
        assert_eq!(eval(&fx, "battle_started && hp_delta > 0"), json!(false));
        assert_eq!(eval(&fx, "hp_delta > 0 || battle_started"), json!(true));
        assert_eq!(eval(&fx, "(hp_delta > 0 || battle_started) && hp_ratio < 1"), json!(true));
    }

    #[test]
    fn negation_unwraps_one_group() {
        let fx = Fixture::new();
        assert_eq!(eval(&fx, "!battle_started"), json!(false));
        assert_eq!(eval(&fx, "!(hp_delta > 0)"), json!(true));
        assert_eq!(eval(&fx, "!prev.world.in_battle"), json!(true));
    }

    #[test]
    fn null_ordering_is_false_but_equality_works() {
        let fx = Fixture::new();
        assert_eq!(eval(&fx, "prev.monster.hp > 0"), json!(false));
        assert_eq!(eval(&fx, "prev.monster.hp < 0"), json!(false));
        assert_eq!(eval(&fx, "prev.monster == null"), json!(true));
        assert_eq!(eval(&fx, "curr.monster != null"), json!(true));
        assert_eq!(eval(&fx, "monster_killed == None"), json!(true));
    }

    #[test]
    fn arithmetic_coerces_null_and_guards_division() {
        let fx = Fixture::new();
        assert_eq!(eval(&fx, "curr.player.hp / curr.player.max_hp"), json!(0.8));
        assert_eq!(eval(&fx, "curr.player.hp / 0"), json!(0));
        assert_eq!(eval(&fx, "prev.monster.hp + 5"), json!(5));
        assert_eq!(eval(&fx, "curr.player.hp * 100 / curr.player.max_hp < 90"), json!(true));
    }

    #[test]
    fn len_and_count() {
        let fx = Fixture::new();
        assert_eq!(eval(&fx, "len(null)"), json!(0));
        assert_eq!(eval(&fx, "len(item_obtained)"), json!(2));
        assert_eq!(eval(&fx, "count(computed.item_obtained) >= 2"), json!(true));
        assert_eq!(eval(&fx, "len(curr.player.hp)"), json!(0));
    }

    #[test]
    fn literals() {
        let fx = Fixture::new();
        assert_eq!(eval(&fx, "42"), json!(42));
        assert_eq!(eval(&fx, "-7"), json!(-7));
        assert_eq!(eval(&fx, "0.25"), json!(0.25));
        assert_eq!(eval(&fx, "True"), json!(true));
        assert_eq!(eval(&fx, "'battle'"), json!("battle"));
        assert_eq!(eval(&fx, "curr.ui.current_scene == \"battle\""), json!(true));
        assert_eq!(eval(&fx, ""), json!(false));
    }

    #[test]
    fn identifiers_resolve_computed_then_fired_then_path() {
        let fx = Fixture::new();
        let mut ctx = fx.ctx();
        assert_eq!(evaluate("battle_start", &ctx).unwrap(), Value::Null);
        ctx.fired.push("battle_start".to_owned());
        assert_eq!(evaluate("battle_start", &ctx).unwrap(), json!(true));
        assert_eq!(evaluate("battle_start && hp_delta < 0", &ctx).unwrap(), json!(true));
    }

    #[test]
    fn action_result_and_missing_segments() {
        let fx = Fixture::new();
        assert_eq!(eval(&fx, "action_result.damage_dealt >= 10"), json!(true));
        assert_eq!(eval(&fx, "actionResult.damage_dealt"), json!(12));
        assert_eq!(eval(&fx, "curr.player.weapon.name"), Value::Null);
        assert_eq!(eval(&fx, "unknown.root"), Value::Null);
    }

    #[test]
    fn type_errors_surface() {
        let fx = Fixture::new();
        assert!(evaluate("curr.ui.current_scene > 3", &fx.ctx()).is_err());
        assert!(evaluate("curr.monster * 2", &fx.ctx()).is_err());
    }
}
