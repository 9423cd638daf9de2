//! Per-program expansion session.
//!
//! A [`Session`] owns the state that must stay consistent across every
//! super-clause of one program: the capture-group and counter ID sequences,
//! and whether the global error-handler clause has been emitted.
//!
//! # Output Order
//!
//! For each super-clause, [`Session::expand`] returns:
//!
//! ```text
//! [error handler]        once per session, on the first multi-clause expansion
//! [callers increments]   in order of occurrence
//! [capture]              entry probes
//! [clear error]          when any condition was allocated
//! [priming]              condition 1
//! [body clauses]
//! [release]              return probes
//! [callers decrements]   in order of occurrence
//! ```
//!
//! A super-clause with no `if`, no `while` and no `entry->` keeps its body as
//! a single clause with its original predicate, so the body may still set a
//! variable the predicate reads on the next firing.

use dscript_ast::{walk::walk_stmts, Clause, ProbeDesc, Program, Span};
use tracing::{debug, instrument};

use crate::builders::{clear_error_clause, error_handler_clause};
use crate::config::XdConfig;
use crate::control::BlockBuilder;
use crate::correlate::{callers_clauses, capture_clause, priming_clause, release_clause};
use crate::error::{Result, XdError};
use crate::rewrite::Rewriter;
use crate::slots::IdAllocator;

/// Expansion state shared by every super-clause of one program.
///
/// Expansions take `&mut self`, so one session is never used by two
/// expansions at once; wrap it in a mutex to share it between threads.
///
/// Not `Clone`: a copy would hand out the same capture-group and counter
/// IDs again.
///
/// ```compile_fail
/// use dscript_xd::{Session, XdConfig};
///
/// let session = Session::new(XdConfig::experimental()).unwrap();
/// let _copy: Session = session.clone();
/// ```
#[derive(Debug)]
pub struct Session {
    config: XdConfig,
    error_probe: ProbeDesc,
    ids: IdAllocator,
    error_handler_emitted: bool,
}

impl Session {
    /// Create a session, validating `config`.
    pub fn new(config: XdConfig) -> Result<Self> {
        config.validate()?;
        let error_probe = config.error_probe_desc()?;
        Ok(Self {
            config,
            error_probe,
            ids: IdAllocator::new(),
            error_handler_emitted: false,
        })
    }

    /// Configuration this session was created with.
    pub fn config(&self) -> &XdConfig {
        &self.config
    }

    /// ID sequences consumed so far.
    pub fn ids(&self) -> &IdAllocator {
        &self.ids
    }

    pub fn error_handler_emitted(&self) -> bool {
        self.error_handler_emitted
    }

    /// Expand one super-clause into its ordered sub-clauses.
    ///
    /// IDs consumed before an error stay consumed.
    ///
    /// # Errors
    ///
    /// - [`XdError::UnknownNode`] if the clause contains a parser-recovery node
    /// - [`XdError::InvalidProbe`] if a `callers[]` target does not parse
    #[instrument(skip_all, name = "expand", fields(probes = clause.probes.len(), at = %clause.span))]
    pub fn expand(&mut self, mut clause: Clause) -> Result<Vec<Clause>> {
        let in_return = clause.all_return_probes();
        let reqs = Rewriter::new(&mut self.ids, in_return).rewrite_clause(&mut clause)?;
        let callers = callers_clauses(&reqs.counters)?;

        let Clause {
            probes,
            predicate,
            actions,
            span,
        } = clause;

        let mut builder = BlockBuilder::new(&probes);
        let mut ambient = None;
        if reqs.needs_capture() {
            // Condition 1 is computed by the priming clause.
            ambient = Some(builder.allocate_condition());
        }

        let fast_path = !reqs.has_control_flow() && builder.conditions() == 0;
        let (body, conditions) = if fast_path {
            (vec![Clause::new(probes.clone(), predicate, actions, span)], 0)
        } else {
            if let Some(predicate) = predicate {
                let pred_span = predicate.span;
                ambient = Some(builder.new_condition(predicate, ambient, pred_span));
            }
            builder.visit_stmts(actions, ambient);
            let conditions = builder.conditions();
            (builder.finish(), conditions)
        };

        let mut out = callers.increments;
        if let Some(capture) = &reqs.capture {
            out.push(capture_clause(&probes, capture, span));
        }
        if conditions > 0 {
            out.push(clear_error_clause(&probes, span));
        }
        if let Some(capture) = &reqs.capture {
            out.push(priming_clause(&probes, capture, span));
        }
        out.extend(body);
        if let Some(capture) = &reqs.capture {
            out.push(release_clause(&probes, capture, span));
        }
        out.extend(callers.decrements);

        if out.len() > 1 && !self.error_handler_emitted {
            self.error_handler_emitted = true;
            out.insert(0, error_handler_clause(self.error_probe.clone(), span));
        }

        debug!(
            fast_path,
            conditions,
            capture_group = ?reqs.capture.as_ref().map(|c| c.group.0),
            counters = reqs.counters.len(),
            sub_clauses = out.len(),
            "expanded clause"
        );
        if self.config.dump_subclauses {
            for (index, sub) in out.iter().enumerate() {
                debug!(index, "sub-clause:\n{}", sub);
            }
        }

        Ok(out)
    }

    /// Expand every clause of `program` in order.
    ///
    /// With experimental features disabled the program is returned unchanged,
    /// unless it uses `if` or `while`.
    pub fn compile_program(&mut self, program: Program) -> Result<Program> {
        if !self.config.experimental {
            return match first_structured_stmt(&program) {
                Some(span) => Err(XdError::ExperimentalDisabled { span }),
                None => Ok(program),
            };
        }

        let mut clauses = Vec::with_capacity(program.len());
        for clause in program.clauses {
            clauses.extend(self.expand(clause)?);
        }
        debug!(sub_clauses = clauses.len(), "compiled program");
        Ok(Program::new(clauses))
    }
}

/// Span of the first `if` or `while` in `program`, in source order.
fn first_structured_stmt(program: &Program) -> Option<Span> {
    let mut found = None;
    for clause in &program.clauses {
        walk_stmts(&clause.actions, &mut |stmt| {
            if found.is_none() && stmt.is_structured() {
                found = Some(stmt.span());
            }
        });
        if found.is_some() {
            break;
        }
    }
    found
}
