//! Statements, clauses and programs.

use serde::{Deserialize, Serialize};

use super::Expr;
use crate::foundation::{ProbeDesc, Span};

/// A statement in a clause body.
///
/// `If` and `While` are the experimental structured statements; every other
/// statement is an expression evaluated for its effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    /// Expression statement: `self->x = 1;`, `trace(arg0);`
    Expr(Expr),

    /// `if (cond) { ... } else { ... }`
    ///
    /// An empty `else_body` means there is no `else` branch.
    If {
        cond: Expr,
        then_body: Vec<Stmt>,
        else_body: Vec<Stmt>,
        span: Span,
    },

    /// `while<max_iter> (cond) { ... }`
    ///
    /// The loop runs at most `max_iter` times; the bound is part of the
    /// syntax and known at compile time.
    While {
        cond: Expr,
        max_iter: u32,
        body: Vec<Stmt>,
        span: Span,
    },
}

impl Stmt {
    /// Wrap an expression as a statement.
    pub fn expr(expr: Expr) -> Self {
        Stmt::Expr(expr)
    }

    /// Whether this is an `if` or `while` statement.
    pub fn is_structured(&self) -> bool {
        matches!(self, Stmt::If { .. } | Stmt::While { .. })
    }

    pub fn span(&self) -> Span {
        match self {
            Stmt::Expr(expr) => expr.span,
            Stmt::If { span, .. } | Stmt::While { span, .. } => *span,
        }
    }
}

/// A probe clause: `probes /predicate/ { actions }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    /// Probes this clause fires on
    pub probes: Vec<ProbeDesc>,
    /// Optional guard
    pub predicate: Option<Expr>,
    /// Statements executed when the guard holds
    pub actions: Vec<Stmt>,
    /// Source location
    pub span: Span,
}

impl Clause {
    pub fn new(
        probes: Vec<ProbeDesc>,
        predicate: Option<Expr>,
        actions: Vec<Stmt>,
        span: Span,
    ) -> Self {
        Self {
            probes,
            predicate,
            actions,
            span,
        }
    }

    /// Whether every probe of this clause is a `return` probe.
    ///
    /// A clause with no probes does not qualify.
    pub fn all_return_probes(&self) -> bool {
        !self.probes.is_empty() && self.probes.iter().all(ProbeDesc::is_return)
    }
}

/// A compiled program: an ordered list of clauses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub clauses: Vec<Clause>,
}

impl Program {
    pub fn new(clauses: Vec<Clause>) -> Self {
        Self { clauses }
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe(text: &str) -> ProbeDesc {
        ProbeDesc::parse(text).unwrap()
    }

    #[test]
    fn test_all_return_probes() {
        let span = Span::default();
        let ret = Clause::new(
            vec![probe("fbt::a:return"), probe("fbt::b:return")],
            None,
            vec![],
            span,
        );
        assert!(ret.all_return_probes());

        let mixed = Clause::new(
            vec![probe("fbt::a:return"), probe("fbt::b:entry")],
            None,
            vec![],
            span,
        );
        assert!(!mixed.all_return_probes());

        let empty = Clause::new(vec![], None, vec![], span);
        assert!(!empty.all_return_probes());
    }

    #[test]
    fn test_structured_statements() {
        let span = Span::default();
        let plain = Stmt::expr(Expr::ident("x", span));
        let looped = Stmt::While {
            cond: Expr::int(1, span),
            max_iter: 4,
            body: vec![],
            span,
        };
        assert!(!plain.is_structured());
        assert!(looped.is_structured());
    }
}
