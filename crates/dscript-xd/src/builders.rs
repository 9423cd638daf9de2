//! Construction helpers for the clauses shared by every expansion.
//!
//! Each helper returns a complete [`Clause`]; callers decide where it goes in
//! the output list.

use dscript_ast::{Clause, Expr, ProbeDesc, Span, Stmt};

use crate::slots::{CondId, Slot};

/// `self->_XD_error`
pub fn error_flag(span: Span) -> Expr {
    Slot::Error.expr(span)
}

/// `this->_XD_condition_<id>`
pub fn condition(id: CondId, span: Span) -> Expr {
    Slot::Condition(id).expr(span)
}

/// `!self->_XD_error`
pub fn no_error(span: Span) -> Expr {
    Expr::not(error_flag(span), span)
}

/// The ambient condition variable, or the literal `1` outside any condition.
///
/// The literal keeps condition values boolean-typed, so a condition slot
/// reused by another super-clause always holds the same type.
pub fn ambient_or_true(ambient: Option<CondId>, span: Span) -> Expr {
    match ambient {
        Some(id) => condition(id, span),
        None => Expr::int(1, span),
    }
}

/// Clause evaluating `value` under `ambient` into condition `new`:
///
/// ```text
/// probes
/// /!self->_XD_error/
/// {
///     this->_XD_condition_<new> = (<ambient> && value);
/// }
/// ```
///
/// Unless an error occurred, the condition is always written (0 or 1), so
/// condition slots never need resetting between firings.
pub fn condition_clause(
    probes: &[ProbeDesc],
    ambient: Option<CondId>,
    new: CondId,
    value: Expr,
    span: Span,
) -> Clause {
    let value = Expr::and(ambient_or_true(ambient, span), value, span);
    let assign = Expr::assign(condition(new, span), value, span);
    Clause::new(
        probes.to_vec(),
        Some(no_error(span)),
        vec![Stmt::expr(assign)],
        span,
    )
}

/// Guard for a basic-block clause.
///
/// Under a condition: `!self->_XD_error && this->_XD_condition_<id>`.
/// Outside any condition: `!self->_XD_error`, or no guard at all while the
/// expansion has not allocated a condition yet (nothing can have cleared or
/// set the error flag for this firing by then).
pub fn block_guard(ambient: Option<CondId>, conditions_allocated: bool, span: Span) -> Option<Expr> {
    match ambient {
        Some(id) => Some(Expr::and(no_error(span), condition(id, span), span)),
        None if conditions_allocated => Some(no_error(span)),
        None => None,
    }
}

/// Basic-block clause running `stmts` under `ambient`.
pub fn basic_block_clause(
    probes: &[ProbeDesc],
    ambient: Option<CondId>,
    conditions_allocated: bool,
    stmts: Vec<Stmt>,
    span: Span,
) -> Clause {
    Clause::new(
        probes.to_vec(),
        block_guard(ambient, conditions_allocated, span),
        stmts,
        span,
    )
}

/// `probes { self->_XD_error = 0; }`
///
/// Runs at the start of each multi-clause expansion, so a fault in an earlier
/// firing does not suppress this one.
pub fn clear_error_clause(probes: &[ProbeDesc], span: Span) -> Clause {
    Clause::new(
        probes.to_vec(),
        None,
        vec![Stmt::expr(Expr::assign(error_flag(span), Expr::int(0, span), span))],
        span,
    )
}

/// `dtrace:::ERROR { self->_XD_error = 1; }`
pub fn error_handler_clause(probe: ProbeDesc, span: Span) -> Clause {
    Clause::new(
        vec![probe],
        None,
        vec![Stmt::expr(Expr::assign(error_flag(span), Expr::int(1, span), span))],
        span,
    )
}
