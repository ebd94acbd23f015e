//! A small expression tree for composing SQL predicates.
//!
//! Terms are immutable values combined through explicit combinators
//! (`and`, `greater_than`, ...) rather than operator overloading. Every
//! binary node renders fully parenthesized, `(<left> <op> <right>)`, so the
//! rendered text always reflects the tree exactly as it was built.
//!
//! Quoting a string literal does not make it safe to embed: the renderer
//! supplied with a literal is responsible for escaping its content.

use std::fmt;

use serde_json::Value;

/// Converts a literal's value to its SQL text, before quoting.
pub type Renderer = fn(&Value) -> String;

/// The default renderer: a string's raw content, any other value's JSON text.
pub fn default_renderer(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
}

impl UnaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Not => "not",
        }
    }
}

/// A node of the expression tree.
#[derive(Debug, Clone)]
pub enum Term {
    /// A value rendered by `renderer`, wrapped in `quote` when the value is
    /// a string. `null` when the value is JSON null.
    Literal {
        value: Value,
        renderer: Renderer,
        quote: Option<char>,
    },
    UnaryOp {
        operator: UnaryOperator,
        operand: Box<Term>,
    },
    BinOp {
        operator: BinaryOperator,
        left: Box<Term>,
        right: Box<Term>,
    },
}

impl Term {
    pub fn literal(value: impl Into<Value>, renderer: Renderer, quote: Option<char>) -> Self {
        Self::Literal {
            value: value.into(),
            renderer,
            quote,
        }
    }

    fn binary(self, operator: BinaryOperator, other: impl Into<Term>) -> Self {
        Self::BinOp {
            operator,
            left: Box::new(self),
            right: Box::new(other.into()),
        }
    }

    pub fn and(self, other: impl Into<Term>) -> Self {
        self.binary(BinaryOperator::And, other)
    }

    pub fn or(self, other: impl Into<Term>) -> Self {
        self.binary(BinaryOperator::Or, other)
    }

    pub fn equals(self, other: impl Into<Term>) -> Self {
        self.binary(BinaryOperator::Eq, other)
    }

    pub fn not_equals(self, other: impl Into<Term>) -> Self {
        self.binary(BinaryOperator::Ne, other)
    }

    pub fn less_than(self, other: impl Into<Term>) -> Self {
        self.binary(BinaryOperator::Lt, other)
    }

    pub fn less_or_equal(self, other: impl Into<Term>) -> Self {
        self.binary(BinaryOperator::Le, other)
    }

    pub fn greater_than(self, other: impl Into<Term>) -> Self {
        self.binary(BinaryOperator::Gt, other)
    }

    pub fn greater_or_equal(self, other: impl Into<Term>) -> Self {
        self.binary(BinaryOperator::Ge, other)
    }

    pub fn negate(self) -> Self {
        Self::UnaryOp {
            operator: UnaryOperator::Not,
            operand: Box::new(self),
        }
    }

    /// Render the term as SQL text.
    pub fn eval(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Literal {
                value: Value::Null, ..
            } => f.write_str("null"),
            Term::Literal {
                value: value @ Value::String(_),
                renderer,
                quote: Some(q),
            } => write!(f, "{q}{}{q}", renderer(value)),
            Term::Literal {
                value, renderer, ..
            } => f.write_str(&renderer(value)),
            Term::UnaryOp { operator, operand } => {
                write!(f, "{} {operand}", operator.as_str())
            }
            Term::BinOp {
                operator,
                left,
                right,
            } => write!(f, "({left} {} {right})", operator.as_str()),
        }
    }
}

/// A single-quoted literal rendered with [`default_renderer`].
pub fn lit(value: impl Into<Value>) -> Term {
    Term::literal(value, default_renderer, Some('\''))
}

/// A single-quoted literal rendered with a custom renderer.
pub fn lit_with(value: impl Into<Value>, renderer: Renderer) -> Term {
    Term::literal(value, renderer, Some('\''))
}

/// An unquoted name or raw SQL fragment.
pub fn var(name: impl Into<String>) -> Term {
    Term::literal(Value::String(name.into()), default_renderer, None)
}

/// The `?` placeholder.
pub fn qmark_param() -> Term {
    var("?")
}

/// The `:<index>` placeholder.
pub fn numeric_param(index: usize) -> Term {
    var(format!(":{index}"))
}

/// The `:<name>` placeholder.
pub fn named_param(name: &str) -> Term {
    var(format!(":{name}"))
}

/// The `%(<name>)s` placeholder.
pub fn pyformat_param(name: &str) -> Term {
    var(format!("%({name})s"))
}

pub fn and(left: impl Into<Term>, right: impl Into<Term>) -> Term {
    left.into().and(right)
}

pub fn or(left: impl Into<Term>, right: impl Into<Term>) -> Term {
    left.into().or(right)
}

pub fn not(operand: impl Into<Term>) -> Term {
    operand.into().negate()
}

pub fn equals(left: impl Into<Term>, right: impl Into<Term>) -> Term {
    left.into().equals(right)
}

pub fn not_equals(left: impl Into<Term>, right: impl Into<Term>) -> Term {
    left.into().not_equals(right)
}

pub fn less_than(left: impl Into<Term>, right: impl Into<Term>) -> Term {
    left.into().less_than(right)
}

pub fn less_or_equal(left: impl Into<Term>, right: impl Into<Term>) -> Term {
    left.into().less_or_equal(right)
}

pub fn greater_than(left: impl Into<Term>, right: impl Into<Term>) -> Term {
    left.into().greater_than(right)
}

pub fn greater_or_equal(left: impl Into<Term>, right: impl Into<Term>) -> Term {
    left.into().greater_or_equal(right)
}

impl From<Value> for Term {
    fn from(value: Value) -> Self {
        lit(value)
    }
}

impl From<&str> for Term {
    fn from(value: &str) -> Self {
        lit(value)
    }
}

impl From<String> for Term {
    fn from(value: String) -> Self {
        lit(value)
    }
}

impl From<i32> for Term {
    fn from(value: i32) -> Self {
        lit(value)
    }
}

impl From<i64> for Term {
    fn from(value: i64) -> Self {
        lit(value)
    }
}

impl From<f64> for Term {
    fn from(value: f64) -> Self {
        lit(value)
    }
}

impl From<bool> for Term {
    fn from(value: bool) -> Self {
        lit(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_of_ints() {
        assert_eq!(greater_than(and(1, 2), 3).eval(), "((1 and 2) > 3)");
    }

    #[test]
    fn tree_with_var() {
        let term = lit(1).and(2).greater_than(3).or(var("x").equals("x"));
        assert_eq!(term.eval(), "(((1 and 2) > 3) or (x = 'x'))");
    }

    #[test]
    fn null_and_empty_string() {
        let term = lit(1).and(Value::Null).greater_than(3);
        assert_eq!(term.eval(), "((1 and null) > 3)");
        let term = lit(1).and("").greater_than(3);
        assert_eq!(term.eval(), "((1 and '') > 3)");
    }

    #[test]
    fn composition_order_is_explicit() {
        let term = var("x").equals(3).and(var("y")).greater_than("wada wada");
        assert_eq!(term.eval(), "(((x = 3) and y) > 'wada wada')");
        let term = var("x").equals(lit(3).and(var("y")).greater_than("wada wada"));
        assert_eq!(term.eval(), "(x = ((3 and y) > 'wada wada'))");
    }

    #[test]
    fn parameters() {
        let term = var("x")
            .equals(qmark_param())
            .and(var("y").greater_than(2))
            .and(var("z").less_or_equal(qmark_param()));
        assert_eq!(term.eval(), "(((x = ?) and (y > 2)) and (z <= ?))");

        assert_eq!(numeric_param(2).eval(), ":2");
        assert_eq!(named_param("id").eval(), ":id");
        assert_eq!(pyformat_param("id").eval(), "%(id)s");
    }

    #[test]
    fn negation() {
        let term = var("x")
            .equals(qmark_param())
            .and(not(var("y").greater_than(2)))
            .and(var("z").less_or_equal(qmark_param()));
        assert_eq!(term.eval(), "(((x = ?) and not (y > 2)) and (z <= ?))");
    }

    #[test]
    fn every_comparison() {
        let cases = [
            (equals("a", 1), "('a' = 1)"),
            (not_equals("a", 1), "('a' <> 1)"),
            (less_than("a", 1), "('a' < 1)"),
            (less_or_equal("a", 1), "('a' <= 1)"),
            (greater_than("a", 1), "('a' > 1)"),
            (greater_or_equal("a", 1), "('a' >= 1)"),
            (or(true, false), "(true or false)"),
        ];
        for (term, expected) in cases {
            assert_eq!(term.eval(), expected);
        }
    }

    #[test]
    fn custom_renderer_and_quote() {
        fn shout(value: &Value) -> String {
            default_renderer(value).to_uppercase()
        }
        assert_eq!(lit_with("abc", shout).eval(), "'ABC'");
        assert_eq!(Term::literal("abc", default_renderer, Some('"')).eval(), "\"abc\"");
        // Only strings are quoted.
        assert_eq!(Term::literal(2.5, default_renderer, Some('"')).eval(), "2.5");
    }

    #[test]
    fn rendering_is_repeatable() {
        let term = var("x").greater_than(1).negate();
        assert_eq!(term.eval(), term.eval());
        assert_eq!(term.eval(), "not (x > 1)");
    }
}
