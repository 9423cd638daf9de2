//! Clauses correlating state across probes.
//!
//! `entry->` in a return clause needs the value captured when the matching
//! entry probe fired. Captures are stored per thread and indexed by
//! `stackdepth`, so recursive calls do not overwrite each other:
//!
//! ```text
//! fbt::f:entry                       capture (before the body)
//! {
//!     self->_XD_entry_arg0_1[stackdepth] = arg0;
//!     self->_XD_entry_timestamp_1[stackdepth] = timestamp;
//! }
//!
//! fbt::f:return                      priming
//! /!self->_XD_error/
//! {
//!     this->_XD_condition_1 = (1 && self->_XD_entry_timestamp_1[stackdepth]);
//! }
//!
//! fbt::f:return                      release (after the body)
//! {
//!     self->_XD_entry_arg0_1[stackdepth] = 0;
//!     self->_XD_entry_timestamp_1[stackdepth] = 0;
//! }
//! ```
//!
//! The timestamp slot is written last and doubles as the completion marker:
//! the return side only runs the body when the entry side ran to the end.
//!
//! `callers["f,g"]` counts how many of the named functions are on the stack
//! with an increment clause on their entry probes and a decrement clause on
//! their return probes.

use dscript_ast::{Clause, Expr, ProbeDesc, Span, Stmt, UnaryOp, ENTRY, RETURN};

use crate::builders::condition_clause;
use crate::error::{Result, XdError};
use crate::rewrite::{CallersCounter, CaptureRequirement};
use crate::slots::{CondId, EntryVar, Slot};

fn entry_slot(capture: &CaptureRequirement, var: EntryVar, span: Span) -> Expr {
    Slot::Entry {
        var,
        group: capture.group,
    }
    .expr(span)
}

/// Capture clause: stores every needed field on the entry probes, in
/// registry order with the marker last.
pub fn capture_clause(probes: &[ProbeDesc], capture: &CaptureRequirement, span: Span) -> Clause {
    let probes = probes.iter().map(|p| p.with_name(ENTRY)).collect();

    let actions = capture
        .vars
        .iter()
        .filter_map(|&var| {
            let value = var.captured_value(span)?;
            Some(Stmt::expr(Expr::assign(
                entry_slot(capture, var, span),
                value,
                span,
            )))
        })
        .collect();

    Clause::new(probes, None, actions, span)
}

/// Release clause: zeroes every captured slot, marker included.
pub fn release_clause(probes: &[ProbeDesc], capture: &CaptureRequirement, span: Span) -> Clause {
    let actions = capture
        .vars
        .iter()
        .filter(|var| var.elapsed_divisor().is_none())
        .map(|&var| {
            Stmt::expr(Expr::assign(
                entry_slot(capture, var, span),
                Expr::int(0, span),
                span,
            ))
        })
        .collect();

    Clause::new(probes.to_vec(), None, actions, span)
}

/// Priming clause: condition 1 holds iff the capture completed.
pub fn priming_clause(probes: &[ProbeDesc], capture: &CaptureRequirement, span: Span) -> Clause {
    let marker = entry_slot(capture, EntryVar::Timestamp, span);
    condition_clause(probes, None, CondId::FIRST, marker, span)
}

/// Increment and decrement clauses for every `callers[]` counter of an
/// expansion, each list in order of occurrence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallersClauses {
    /// Go before every other clause of the expansion
    pub increments: Vec<Clause>,
    /// Go after every other clause of the expansion
    pub decrements: Vec<Clause>,
}

pub fn callers_clauses(counters: &[CallersCounter]) -> Result<CallersClauses> {
    let mut clauses = CallersClauses::default();

    for counter in counters {
        let span = counter.span;
        let slot = Slot::Callers(counter.id);

        let increment = Expr::unary(UnaryOp::PreInc, slot.expr(span), span);
        clauses.increments.push(Clause::new(
            target_probes(counter, ENTRY)?,
            None,
            vec![Stmt::expr(increment)],
            span,
        ));

        let decrement = Expr::unary(UnaryOp::PreDec, slot.expr(span), span);
        clauses.decrements.push(Clause::new(
            target_probes(counter, RETURN)?,
            Some(slot.expr(span)),
            vec![Stmt::expr(decrement)],
            span,
        ));
    }

    Ok(clauses)
}

/// One probe per comma-separated target, with `name` appended.
fn target_probes(counter: &CallersCounter, name: &str) -> Result<Vec<ProbeDesc>> {
    counter
        .targets
        .split(',')
        .map(|token| {
            let text = format!("{}:{}", token.trim(), name);
            ProbeDesc::parse(&text).map_err(|source| XdError::InvalidProbe {
                text,
                span: counter.span,
                source,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slots::{CaptureGroupId, CounterId, ElapsedUnit};
    use std::collections::BTreeSet;

    fn span() -> Span {
        Span::default()
    }

    fn return_probes() -> Vec<ProbeDesc> {
        vec![
            ProbeDesc::parse("fbt::spa_sync:return").unwrap(),
            ProbeDesc::parse("fbt::txg_sync:return").unwrap(),
        ]
    }

    fn capture(vars: &[EntryVar]) -> CaptureRequirement {
        CaptureRequirement {
            group: CaptureGroupId(3),
            vars: vars.iter().copied().collect::<BTreeSet<_>>(),
        }
    }

    fn counter(id: u32, targets: &str) -> CallersCounter {
        CallersCounter {
            id: CounterId(id),
            targets: targets.to_string(),
            span: span(),
        }
    }

    #[test]
    fn test_capture_clause_fires_on_entry_with_marker_last() {
        let capture = capture(&[EntryVar::Timestamp, EntryVar::Args(1), EntryVar::Errno]);
        let clause = capture_clause(&return_probes(), &capture, span());

        assert!(clause.probes.iter().all(ProbeDesc::is_entry));
        assert_eq!(clause.probes[1].function, "txg_sync");
        assert!(clause.predicate.is_none());
        let actions: Vec<String> = clause.actions.iter().map(ToString::to_string).collect();
        assert_eq!(
            actions,
            vec![
                "self->_XD_entry_errno_3[stackdepth] = errno;\n",
                "self->_XD_entry_args1_3[stackdepth] = args[1];\n",
                "self->_XD_entry_timestamp_3[stackdepth] = timestamp;\n",
            ]
        );
    }

    #[test]
    fn test_elapsed_fields_have_no_slot() {
        let capture = capture(&[EntryVar::Elapsed(ElapsedUnit::Ms), EntryVar::Timestamp]);
        assert_eq!(capture_clause(&return_probes(), &capture, span()).actions.len(), 1);
        assert_eq!(release_clause(&return_probes(), &capture, span()).actions.len(), 1);
    }

    #[test]
    fn test_release_clause_zeroes_slots_on_return() {
        let capture = capture(&[EntryVar::Arg(0), EntryVar::Timestamp]);
        let clause = release_clause(&return_probes(), &capture, span());

        assert_eq!(clause.probes, return_probes());
        assert_eq!(
            clause.actions.last().unwrap().to_string(),
            "self->_XD_entry_timestamp_3[stackdepth] = 0;\n"
        );
    }

    #[test]
    fn test_priming_clause_sets_first_condition() {
        let clause = priming_clause(&return_probes(), &capture(&[EntryVar::Timestamp]), span());
        assert_eq!(clause.predicate.unwrap().to_string(), "!self->_XD_error");
        assert_eq!(
            clause.actions[0].to_string(),
            "this->_XD_condition_1 = (1 && self->_XD_entry_timestamp_3[stackdepth]);\n"
        );
    }

    #[test]
    fn test_callers_clauses_expand_each_target() {
        let clauses = callers_clauses(&[counter(1, "spa_sync,fbt:zfs:dsl_pool_sync")]).unwrap();

        assert_eq!(
            clauses.increments[0].to_string(),
            "::spa_sync:entry,\nfbt:zfs:dsl_pool_sync:entry\n{\n    ++self->_XD_callers_1;\n}\n"
        );
        assert_eq!(
            clauses.decrements[0].to_string(),
            "::spa_sync:return,\nfbt:zfs:dsl_pool_sync:return\n/self->_XD_callers_1/\n{\n    --self->_XD_callers_1;\n}\n"
        );
    }

    #[test]
    fn test_callers_clauses_keep_occurrence_order() {
        let clauses = callers_clauses(&[counter(4, "a"), counter(5, "b")]).unwrap();
        assert_eq!(clauses.increments[0].probes[0].function, "a");
        assert_eq!(clauses.increments[1].probes[0].function, "b");
        assert_eq!(clauses.decrements[1].probes[0].function, "b");
    }

    #[test]
    fn test_invalid_callers_target() {
        match callers_clauses(&[counter(1, "a:b:c:d")]) {
            Err(XdError::InvalidProbe { text, .. }) => assert_eq!(text, "a:b:c:d:entry"),
            other => panic!("Expected InvalidProbe, got {:?}", other),
        }
    }
}
