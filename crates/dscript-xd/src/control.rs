//! Control-flow desugaring.
//!
//! Splits a statement list at `if`/`while` boundaries into basic blocks, each
//! emitted as its own sub-clause guarded by the condition it runs under.
//! Conditions are `this->` variables computed by dedicated clauses, so the
//! whole construct runs as a straight sequence of guarded clauses on every
//! firing:
//!
//! ```text
//! if (t) { A } else { B }      /!err/          { c1 = (amb && t); }
//!                              /!err && c1/    { A }
//!                              /!err/          { c2 = (amb && !c1); }
//!                              /!err && c2/    { B }
//!
//! while<2> (t) { A }           /!err/          { nd = (amb && 1); }
//!                              /!err/          { nd = (nd && t); }
//!                              /!err && nd/    { A }
//!                              /!err/          { nd = (nd && t); }
//!                              /!err && nd/    { A }
//! ```
//!
//! Condition IDs are dense from 1 in visitation order and never reused
//! within one expansion.

use dscript_ast::{Clause, Expr, ProbeDesc, Span, Stmt};
use tracing::trace;

use crate::builders::{basic_block_clause, condition, condition_clause};
use crate::slots::CondId;

/// Accumulates the sub-clauses of one super-clause body.
#[derive(Debug)]
pub struct BlockBuilder<'p> {
    probes: &'p [ProbeDesc],
    last_condition: Option<CondId>,
    clauses: Vec<Clause>,
}

impl<'p> BlockBuilder<'p> {
    /// Every emitted clause fires on `probes`.
    pub fn new(probes: &'p [ProbeDesc]) -> Self {
        Self {
            probes,
            last_condition: None,
            clauses: Vec::new(),
        }
    }

    /// Reserve the next condition ID without emitting anything.
    pub fn allocate_condition(&mut self) -> CondId {
        let id = self.last_condition.map_or(CondId::FIRST, CondId::next);
        self.last_condition = Some(id);
        id
    }

    /// Number of conditions allocated so far.
    pub fn conditions(&self) -> u32 {
        self.last_condition.map_or(0, CondId::get)
    }

    /// Allocate a condition and emit the clause computing `(ambient && value)`.
    pub fn new_condition(&mut self, value: Expr, ambient: Option<CondId>, span: Span) -> CondId {
        let id = self.allocate_condition();
        self.clauses
            .push(condition_clause(self.probes, ambient, id, value, span));
        id
    }

    /// Desugar `stmts` running under `ambient`.
    pub fn visit_stmts(&mut self, stmts: Vec<Stmt>, ambient: Option<CondId>) {
        let mut block = Vec::new();

        for stmt in stmts {
            match stmt {
                Stmt::Expr(_) => block.push(stmt),
                Stmt::If {
                    cond,
                    then_body,
                    else_body,
                    span,
                } => {
                    self.flush(&mut block, ambient);
                    self.visit_if(cond, then_body, else_body, ambient, span);
                }
                Stmt::While {
                    cond,
                    max_iter,
                    body,
                    span,
                } => {
                    self.flush(&mut block, ambient);
                    self.visit_while(cond, max_iter, body, ambient, span);
                }
            }
        }

        self.flush(&mut block, ambient);
    }

    fn visit_if(
        &mut self,
        cond: Expr,
        then_body: Vec<Stmt>,
        else_body: Vec<Stmt>,
        ambient: Option<CondId>,
        span: Span,
    ) {
        let taken = self.new_condition(cond, ambient, span);
        self.visit_stmts(then_body, Some(taken));

        if !else_body.is_empty() {
            let not_taken = Expr::not(condition(taken, span), span);
            let otherwise = self.new_condition(not_taken, ambient, span);
            self.visit_stmts(else_body, Some(otherwise));
        }
    }

    fn visit_while(
        &mut self,
        cond: Expr,
        max_iter: u32,
        body: Vec<Stmt>,
        ambient: Option<CondId>,
        span: Span,
    ) {
        // True until the loop test first fails.
        let not_done = self.new_condition(Expr::int(1, span), ambient, span);

        let group_start = self.clauses.len();
        self.clauses.push(condition_clause(
            self.probes,
            Some(not_done),
            not_done,
            cond,
            span,
        ));
        self.visit_stmts(body, Some(not_done));

        if max_iter == 0 {
            self.clauses.truncate(group_start);
        } else {
            let group = self.clauses[group_start..].to_vec();
            for _ in 1..max_iter {
                self.clauses.extend(group.iter().cloned());
            }
        }

        trace!(
            condition = %not_done,
            max_iter,
            group_len = self.clauses.len() - group_start,
            "unrolled while loop"
        );
    }

    /// Emit the pending basic block, if any.
    fn flush(&mut self, block: &mut Vec<Stmt>, ambient: Option<CondId>) {
        if block.is_empty() {
            return;
        }
        let stmts = std::mem::take(block);
        let span = stmts[0].span();
        let clause = basic_block_clause(
            self.probes,
            ambient,
            self.last_condition.is_some(),
            stmts,
            span,
        );
        self.clauses.push(clause);
    }

    /// The emitted sub-clauses, in order.
    pub fn finish(self) -> Vec<Clause> {
        self.clauses
    }
}
