// Abstract syntax tree for the condition-query expression language

use serde::{Deserialize, Serialize};

/// AST node types
///
/// The language is deliberately small: literals, parameter identifiers,
/// member access, logical and comparison operators, the ternary
/// conditional, and a fixed set of method/function calls. There are no
/// loops, no assignment, and no user-defined functions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// String literal (e.g., "nominal", 'true')
    String(String),

    /// Number literal
    Number(f64),

    /// Boolean literal
    Boolean(bool),

    /// Null literal (`null` and `undefined` both parse to this)
    Null,

    /// A bound identifier: a sanitized parameter name, the `parameters`
    /// aggregate, or the `Object` namespace for `Object.values`
    Identifier(String),

    /// Member access (e.g., `parameters.Color`)
    Member { target: Box<Expr>, name: String },

    /// Unary operation
    Unary { op: UnaryOp, operand: Box<Expr> },

    /// Binary operation
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    /// Ternary conditional (`cond ? then : else`)
    Conditional {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Option<Box<Expr>>,
    },

    /// Method call on a target expression (e.g., `parameters.sort.includes('true')`,
    /// `Object.values(parameters)`)
    Method {
        target: Box<Expr>,
        name: String,
        args: Vec<Expr>,
    },

    /// Bare function call (e.g., `Boolean(parameters.Color)`)
    Function { name: String, args: Vec<Expr> },
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    And,
    Or,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Logical NOT
    Not,
}

impl Expr {
    /// Create a string literal node
    pub fn string(s: impl Into<String>) -> Self {
        Expr::String(s.into())
    }

    /// Create a number literal node
    pub fn number(n: f64) -> Self {
        Expr::Number(n)
    }

    /// Create an identifier node
    pub fn identifier(name: impl Into<String>) -> Self {
        Expr::Identifier(name.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expr_creation() {
        assert!(matches!(Expr::string("hello"), Expr::String(_)));
        assert!(matches!(Expr::number(42.0), Expr::Number(_)));
        assert!(matches!(Expr::identifier("Color"), Expr::Identifier(_)));
    }

    #[test]
    fn test_binary_node() {
        let node = Expr::Binary {
            op: BinaryOp::And,
            lhs: Box::new(Expr::Boolean(true)),
            rhs: Box::new(Expr::Boolean(false)),
        };
        assert!(matches!(node, Expr::Binary { .. }));
    }
}
