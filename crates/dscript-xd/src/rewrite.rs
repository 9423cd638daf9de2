//! Pattern rewriting of `entry->` and `callers[]` forms.
//!
//! A single depth-first walk over the whole super-clause (predicate, then
//! every action statement including nested `if`/`while` conditions and
//! bodies). At each node the recognisers run in a fixed order, and the first
//! one that matches overwrites the node in place:
//!
//! | Form | Replacement | Only in all-`return` clauses |
//! |------|-------------|------------------------------|
//! | `entry-><field>` | capture slot, or `(timestamp - <marker>) / <divisor>` for `elapsed_*` | yes |
//! | `entry->args[N]` | `argsN` capture slot | yes |
//! | `callers["a,b"]` | `self->_XD_callers_<id>` | no |
//!
//! Anything else is descended into unchanged. Forms with the right head but
//! the wrong shape (`entry->args[i]`, `callers[x]`) are left for identifier
//! resolution to report.
//!
//! The walk also counts `if` and `while` statements so the caller can take
//! the fast path for clauses that need no splitting.

use std::collections::BTreeSet;

use dscript_ast::{BinaryOp, Clause, Expr, ExprKind, Span, Stmt};
use tracing::trace;

use crate::error::{Result, XdError};
use crate::slots::{
    CaptureGroupId, CounterId, EntryVar, IdAllocator, Slot, MAX_ENTRY_ARG, TIMESTAMP,
};

/// Identifier introducing entry-state references.
const ENTRY_IDENT: &str = "entry";

/// Identifier introducing recursion counters.
const CALLERS_IDENT: &str = "callers";

/// Entry state one super-clause reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequirement {
    /// Group naming this super-clause's slots
    pub group: CaptureGroupId,
    /// Fields to capture, always including `timestamp`
    pub vars: BTreeSet<EntryVar>,
}

/// One `callers[...]` occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallersCounter {
    pub id: CounterId,
    /// Comma-separated probe descriptions without the trailing probe name
    pub targets: String,
    /// Location of the `callers[...]` expression
    pub span: Span,
}

/// What the rewritten super-clause needs from the rest of the expansion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requirements {
    pub capture: Option<CaptureRequirement>,
    /// In order of occurrence
    pub counters: Vec<CallersCounter>,
    pub ifs: usize,
    pub whiles: usize,
}

impl Requirements {
    pub fn needs_capture(&self) -> bool {
        self.capture.is_some()
    }

    /// Whether the body contains any `if` or `while`.
    pub fn has_control_flow(&self) -> bool {
        self.ifs > 0 || self.whiles > 0
    }
}

/// Rewrites one super-clause in place.
pub struct Rewriter<'a> {
    ids: &'a mut IdAllocator,
    in_return: bool,
    reqs: Requirements,
}

impl<'a> Rewriter<'a> {
    /// `in_return` enables the `entry->` recognisers; it must only be set
    /// when every probe of the clause is a `return` probe.
    pub fn new(ids: &'a mut IdAllocator, in_return: bool) -> Self {
        Self {
            ids,
            in_return,
            reqs: Requirements::default(),
        }
    }

    /// Rewrite every reachable node of `clause` and report what it needs.
    pub fn rewrite_clause(mut self, clause: &mut Clause) -> Result<Requirements> {
        if let Some(predicate) = clause.predicate.as_mut() {
            self.visit_expr(predicate)?;
        }
        self.visit_stmts(&mut clause.actions)?;
        Ok(self.reqs)
    }

    fn visit_stmts(&mut self, stmts: &mut [Stmt]) -> Result<()> {
        for stmt in stmts {
            match stmt {
                Stmt::Expr(expr) => self.visit_expr(expr)?,
                Stmt::If {
                    cond,
                    then_body,
                    else_body,
                    ..
                } => {
                    self.reqs.ifs += 1;
                    self.visit_expr(cond)?;
                    self.visit_stmts(then_body)?;
                    self.visit_stmts(else_body)?;
                }
                Stmt::While { cond, body, .. } => {
                    self.reqs.whiles += 1;
                    self.visit_expr(cond)?;
                    self.visit_stmts(body)?;
                }
            }
        }
        Ok(())
    }

    fn visit_expr(&mut self, expr: &mut Expr) -> Result<()> {
        // Replacements never contain further special forms.
        if self.rewrite_entry_var(expr)
            || self.rewrite_entry_args(expr)
            || self.rewrite_callers(expr)
        {
            return Ok(());
        }

        match &mut expr.kind {
            ExprKind::Int(_)
            | ExprKind::Str(_)
            | ExprKind::Ident(_)
            | ExprKind::Sym(_)
            | ExprKind::Type(_) => Ok(()),

            ExprKind::Unary { operand, .. } => self.visit_expr(operand),

            ExprKind::Binary { left, right, .. } => {
                self.visit_expr(left)?;
                self.visit_expr(right)
            }

            ExprKind::Ternary {
                cond,
                then_expr,
                else_expr,
            } => {
                self.visit_expr(cond)?;
                self.visit_expr(then_expr)?;
                self.visit_expr(else_expr)
            }

            ExprKind::Index { base, keys } => {
                self.visit_expr(base)?;
                keys.iter_mut().try_for_each(|key| self.visit_expr(key))
            }

            ExprKind::Call { args, .. } => args.iter_mut().try_for_each(|arg| self.visit_expr(arg)),

            ExprKind::Agg { keys, func, .. } => {
                keys.iter_mut().try_for_each(|key| self.visit_expr(key))?;
                match func {
                    Some(func) => self.visit_expr(func),
                    None => Ok(()),
                }
            }

            ExprKind::Inline { body, .. } => self.visit_expr(body),

            ExprKind::Error => Err(XdError::UnknownNode {
                kind: expr.kind_name(),
                span: expr.span,
            }),
        }
    }

    /// `entry-><field>` for any registry field.
    fn rewrite_entry_var(&mut self, expr: &mut Expr) -> bool {
        if !self.in_return {
            return false;
        }
        let Some(field) = entry_member(expr) else {
            return false;
        };
        let Some(var) = EntryVar::from_field(field) else {
            return false;
        };

        let span = expr.span;
        let replacement = match var.elapsed_divisor() {
            Some(divisor) => {
                let marker = self.entry_slot(EntryVar::Timestamp, span);
                let delta = Expr::binary(BinaryOp::Sub, Expr::ident(TIMESTAMP, span), marker, span);
                Expr::binary(BinaryOp::Div, delta, Expr::int(divisor, span), span)
            }
            None => self.entry_slot(var, span),
        };

        trace!(field = %var.name(), replacement = %replacement, "rewrote entry variable");
        *expr = replacement;
        true
    }

    /// `entry->args[N]` with `N` an integer literal in range.
    fn rewrite_entry_args(&mut self, expr: &mut Expr) -> bool {
        if !self.in_return {
            return false;
        }
        let ExprKind::Index { base, keys } = &expr.kind else {
            return false;
        };
        if entry_member(base) != Some("args") {
            return false;
        }
        let [key] = keys.as_slice() else {
            return false;
        };
        let index = match key.kind {
            ExprKind::Int(n) if n <= u64::from(MAX_ENTRY_ARG) => n as u8,
            _ => return false,
        };

        let span = expr.span;
        let replacement = self.entry_slot(EntryVar::Args(index), span);
        trace!(index, replacement = %replacement, "rewrote entry args subscript");
        *expr = replacement;
        true
    }

    /// `callers["<probes>"]` with a single string-literal key.
    fn rewrite_callers(&mut self, expr: &mut Expr) -> bool {
        let ExprKind::Index { base, keys } = &expr.kind else {
            return false;
        };
        if !base.is_ident(CALLERS_IDENT) {
            return false;
        }
        let [key] = keys.as_slice() else {
            return false;
        };
        let ExprKind::Str(targets) = &key.kind else {
            return false;
        };

        let id = self.ids.next_counter();
        let counter = CallersCounter {
            id,
            targets: targets.clone(),
            span: expr.span,
        };
        trace!(counter = %id, targets = %counter.targets, "rewrote callers counter");

        *expr = Slot::Callers(id).expr(expr.span);
        self.reqs.counters.push(counter);
        true
    }

    /// Reference to the capture slot for `var`, allocating this clause's
    /// capture group on first use. Every use also requires the marker.
    fn entry_slot(&mut self, var: EntryVar, span: Span) -> Expr {
        let ids = &mut *self.ids;
        let capture = self.reqs.capture.get_or_insert_with(|| CaptureRequirement {
            group: ids.next_capture_group(),
            vars: BTreeSet::new(),
        });
        capture.vars.insert(var);
        capture.vars.insert(EntryVar::Timestamp);

        Slot::Entry {
            var,
            group: capture.group,
        }
        .expr(span)
    }
}

/// The member name of `entry-><member>`.
fn entry_member(expr: &Expr) -> Option<&str> {
    match &expr.kind {
        ExprKind::Binary {
            op: BinaryOp::Ptr,
            left,
            right,
        } if left.is_ident(ENTRY_IDENT) => right.as_ident(),
        _ => None,
    }
}
