//! Expressions.
//!
//! The tree is fully owned: every child is a `Box<Expr>` or a `Vec<Expr>`.
//! Passes that replace a node do so by overwriting the `&mut Expr` slot that
//! holds it, which keeps sibling order intact without any link fix-up.
//!
//! # Examples
//!
//! ```
//! use dscript_ast::{BinaryOp, Expr, Span};
//!
//! let span = Span::default();
//! // self->depth = self->depth + 1
//! let depth = Expr::scoped("self", "depth", span);
//! let next = Expr::binary(BinaryOp::Add, depth.clone(), Expr::int(1, span), span);
//! let stmt = Expr::assign(depth, next, span);
//! assert_eq!(stmt.to_string(), "self->depth = (self->depth + 1)");
//! ```

use serde::{Deserialize, Serialize};

use crate::foundation::Span;

/// An expression node with its source location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    /// Expression kind
    pub kind: ExprKind,

    /// Source location for error messages
    pub span: Span,
}

/// Expression kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    // === Leaves ===
    /// Integer literal: `42`
    Int(u64),

    /// String literal: `"spa_sync"`
    Str(String),

    /// Identifier: `timestamp`, `self`, `arg0`
    Ident(String),

    /// Kernel symbol reference: `` `max_ncpus ``
    Sym(String),

    /// Type name used as an operand (`sizeof(int)`, casts)
    Type(String),

    // === Operators ===
    /// Unary operator: `!x`, `++self->n`
    Unary { op: UnaryOp, operand: Box<Expr> },

    /// Binary operator, including assignment and member access
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Conditional expression: `c ? a : b`
    Ternary {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },

    /// Subscript with one or more keys: `args[0]`, `self->ts[tid, cpu]`
    Index { base: Box<Expr>, keys: Vec<Expr> },

    // === Calls and aggregations ===
    /// Subroutine call: `strlen(s)`, `printf("%d", x)`
    Call { func: String, args: Vec<Expr> },

    /// Aggregation: `@name[keys] = func(...)`
    Agg {
        name: String,
        keys: Vec<Expr>,
        func: Option<Box<Expr>>,
    },

    /// Reference to an inline identifier, carrying its expansion
    Inline { name: String, body: Box<Expr> },

    /// Placeholder left by parser error recovery.
    ///
    /// Never valid input to a compiler pass.
    Error,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Logical negation: `!x`
    Not,
    /// Bitwise complement: `~x`
    BitNot,
    /// Arithmetic negation: `-x`
    Neg,
    /// Pointer dereference: `*p`
    Deref,
    /// Address-of: `&x`
    AddrOf,
    /// Pre-increment: `++x`
    PreInc,
    /// Pre-decrement: `--x`
    PreDec,
    /// Post-increment: `x++`
    PostInc,
    /// Post-decrement: `x--`
    PostDec,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Bitwise
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,

    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    // Logical
    And,
    Or,
    Xor,

    /// Assignment: `a = b`
    Assign,

    /// Member access through a pointer or scope: `self->x`, `entry->arg0`
    Ptr,

    /// Member access: `curthread.t_tid`
    Dot,
}

impl UnaryOp {
    /// Source token for this operator.
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::Neg => "-",
            UnaryOp::Deref => "*",
            UnaryOp::AddrOf => "&",
            UnaryOp::PreInc | UnaryOp::PostInc => "++",
            UnaryOp::PreDec | UnaryOp::PostDec => "--",
        }
    }

    /// Whether the operator is written after its operand.
    pub fn is_postfix(self) -> bool {
        matches!(self, UnaryOp::PostInc | UnaryOp::PostDec)
    }
}

impl BinaryOp {
    /// Source token for this operator.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Xor => "^^",
            BinaryOp::Assign => "=",
            BinaryOp::Ptr => "->",
            BinaryOp::Dot => ".",
        }
    }

    /// Member-access operators bind tighter than anything else and are
    /// printed without surrounding spaces.
    pub fn is_member_access(self) -> bool {
        matches!(self, BinaryOp::Ptr | BinaryOp::Dot)
    }
}

impl Expr {
    /// Create a new expression
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Create an identifier reference
    pub fn ident(name: impl Into<String>, span: Span) -> Self {
        Self::new(ExprKind::Ident(name.into()), span)
    }

    /// Create an integer literal
    pub fn int(value: u64, span: Span) -> Self {
        Self::new(ExprKind::Int(value), span)
    }

    /// Create a string literal
    pub fn string(value: impl Into<String>, span: Span) -> Self {
        Self::new(ExprKind::Str(value.into()), span)
    }

    /// Create a binary operator expression
    pub fn binary(op: BinaryOp, left: Expr, right: Expr, span: Span) -> Self {
        Self::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        )
    }

    /// Create a unary operator expression
    pub fn unary(op: UnaryOp, operand: Expr, span: Span) -> Self {
        Self::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        )
    }

    /// Create a subscript expression
    pub fn index(base: Expr, keys: Vec<Expr>, span: Span) -> Self {
        Self::new(
            ExprKind::Index {
                base: Box::new(base),
                keys,
            },
            span,
        )
    }

    /// Create `base->member`
    pub fn ptr(base: Expr, member: impl Into<String>, span: Span) -> Self {
        Self::binary(BinaryOp::Ptr, base, Self::ident(member, span), span)
    }

    /// Create a scoped variable reference such as `self->x` or `this->x`
    pub fn scoped(scope: &str, member: impl Into<String>, span: Span) -> Self {
        Self::ptr(Self::ident(scope, span), member, span)
    }

    /// Create `target = value`
    pub fn assign(target: Expr, value: Expr, span: Span) -> Self {
        Self::binary(BinaryOp::Assign, target, value, span)
    }

    /// Create `left && right`
    pub fn and(left: Expr, right: Expr, span: Span) -> Self {
        Self::binary(BinaryOp::And, left, right, span)
    }

    /// Create `!operand`
    pub fn not(operand: Expr, span: Span) -> Self {
        Self::unary(UnaryOp::Not, operand, span)
    }

    /// Create a subroutine call
    pub fn call(func: impl Into<String>, args: Vec<Expr>, span: Span) -> Self {
        Self::new(
            ExprKind::Call {
                func: func.into(),
                args,
            },
            span,
        )
    }

    /// The identifier name, if this is an identifier.
    pub fn as_ident(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Ident(name) => Some(name),
            _ => None,
        }
    }

    /// Whether this is the identifier `name`.
    pub fn is_ident(&self, name: &str) -> bool {
        self.as_ident() == Some(name)
    }

    /// Short name of the node kind, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            ExprKind::Int(_) => "integer",
            ExprKind::Str(_) => "string",
            ExprKind::Ident(_) => "identifier",
            ExprKind::Sym(_) => "symbol",
            ExprKind::Type(_) => "type",
            ExprKind::Unary { .. } => "unary operator",
            ExprKind::Binary { .. } => "binary operator",
            ExprKind::Ternary { .. } => "conditional",
            ExprKind::Index { .. } => "subscript",
            ExprKind::Call { .. } => "function call",
            ExprKind::Agg { .. } => "aggregation",
            ExprKind::Inline { .. } => "inline",
            ExprKind::Error => "error placeholder",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        Span::new(0, 3, 9, 1)
    }

    #[test]
    fn test_scoped_builds_ptr_node() {
        let expr = Expr::scoped("self", "x", span());
        match expr.kind {
            ExprKind::Binary { op, left, right } => {
                assert_eq!(op, BinaryOp::Ptr);
                assert!(left.is_ident("self"));
                assert!(right.is_ident("x"));
            }
            other => panic!("Expected Binary, got {:?}", other),
        }
    }

    #[test]
    fn test_constructors_keep_span() {
        let custom = Span::new(2, 40, 50, 7);
        let expr = Expr::and(Expr::int(1, custom), Expr::ident("a", custom), custom);
        assert_eq!(expr.span, custom);
        assert_eq!(expr.kind_name(), "binary operator");
    }

    #[test]
    fn test_postfix_operators() {
        assert!(UnaryOp::PostInc.is_postfix());
        assert!(!UnaryOp::PreInc.is_postfix());
        assert_eq!(UnaryOp::PreDec.symbol(), "--");
    }
}
