//! Synthesized state slots and their names.
//!
//! Every variable the pass introduces is named by a pure function of
//! `(role, id, field)`, so names are unique by construction and never need
//! to be checked against a symbol table. This matters because a persistent
//! variable keeps one value type for the whole program: two super-clauses
//! capturing `entry->args[0]` of different types must use different slots.
//!
//! | Slot | Scope | Name |
//! |------|-------|------|
//! | error flag | `self` | `_XD_error` |
//! | condition | `this` | `_XD_condition_<cond>` |
//! | entry capture | `self`, indexed by `stackdepth` | `_XD_entry_<field>_<group>` |
//! | callers counter | `self` | `_XD_callers_<counter>` |

use std::fmt;

use dscript_ast::{Expr, Span};

/// Prefix shared by every synthesized variable.
pub const XD_PREFIX: &str = "_XD_";

/// Built-in variable holding the current call depth.
pub const STACK_DEPTH: &str = "stackdepth";

/// Built-in variable holding the current time in nanoseconds.
pub const TIMESTAMP: &str = "timestamp";

/// Scope of per-thread variables that persist across probe firings.
pub const SELF_SCOPE: &str = "self";

/// Scope of variables that live for one probe firing.
pub const THIS_SCOPE: &str = "this";

// ============================================================================
// Identifiers
// ============================================================================

/// Identifier of a condition variable within one expansion.
///
/// Allocated densely from 1. "No condition" is `Option::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CondId(u32);

impl CondId {
    /// The first condition of an expansion; reserved for the priming
    /// clause when the expansion captures entry state.
    pub const FIRST: CondId = CondId(1);

    /// Returns `None` for 0, which is not a valid condition.
    pub fn new(id: u32) -> Option<Self> {
        (id > 0).then_some(CondId(id))
    }

    /// The condition allocated after this one.
    pub fn next(self) -> Self {
        CondId(self.0 + 1)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

/// Identifier distinguishing one super-clause's capture slots from another's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CaptureGroupId(pub u32);

/// Identifier of one `callers[...]` counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CounterId(pub u32);

impl fmt::Display for CondId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for CaptureGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for CounterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session-wide allocator for capture-group and counter IDs.
///
/// Both sequences start at 1, only grow, and are incremented before the ID
/// is handed out, so an expansion that fails part-way still consumes its IDs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdAllocator {
    capture_groups: u32,
    counters: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_capture_group(&mut self) -> CaptureGroupId {
        self.capture_groups += 1;
        CaptureGroupId(self.capture_groups)
    }

    pub fn next_counter(&mut self) -> CounterId {
        self.counters += 1;
        CounterId(self.counters)
    }

    /// Number of capture groups handed out so far.
    pub fn capture_groups(&self) -> u32 {
        self.capture_groups
    }

    /// Number of `callers[]` counters handed out so far.
    pub fn counters(&self) -> u32 {
        self.counters
    }
}

// ============================================================================
// Entry-variable registry
// ============================================================================

/// Unit of an `entry->elapsed_*` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ElapsedUnit {
    Ns,
    Us,
    Ms,
    Sec,
}

impl ElapsedUnit {
    pub const ALL: [ElapsedUnit; 4] = [
        ElapsedUnit::Ns,
        ElapsedUnit::Us,
        ElapsedUnit::Ms,
        ElapsedUnit::Sec,
    ];

    /// Nanoseconds per unit.
    pub fn divisor(self) -> u64 {
        match self {
            ElapsedUnit::Ns => 1,
            ElapsedUnit::Us => 1_000,
            ElapsedUnit::Ms => 1_000_000,
            ElapsedUnit::Sec => 1_000_000_000,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            ElapsedUnit::Ns => "ns",
            ElapsedUnit::Us => "us",
            ElapsedUnit::Ms => "ms",
            ElapsedUnit::Sec => "sec",
        }
    }
}

/// A field readable through `entry->` in a return clause.
///
/// The derived ordering is the registry order, which is also the order
/// captures are assigned in. `Timestamp` sorts last: it is the completion
/// marker and must be the final assignment of a capture clause, so that a
/// set marker implies every other capture of the group was set too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntryVar {
    VTimestamp,
    WallTimestamp,
    Errno,
    /// `elapsed_<unit>`, derived from the captured timestamp
    Elapsed(ElapsedUnit),
    /// `argN`, 0..=9
    Arg(u8),
    /// `argsN`, also reached as `entry->args[N]`, 0..=9
    Args(u8),
    Timestamp,
}

/// Highest argument index reachable through `entry->`.
pub const MAX_ENTRY_ARG: u8 = 9;

impl EntryVar {
    /// Look up a field name, e.g. `"elapsed_us"` or `"arg3"`.
    pub fn from_field(name: &str) -> Option<Self> {
        match name {
            "vtimestamp" => return Some(EntryVar::VTimestamp),
            "walltimestamp" => return Some(EntryVar::WallTimestamp),
            "errno" => return Some(EntryVar::Errno),
            "timestamp" => return Some(EntryVar::Timestamp),
            _ => {}
        }

        if let Some(unit) = name.strip_prefix("elapsed_") {
            return ElapsedUnit::ALL
                .into_iter()
                .find(|u| u.suffix() == unit)
                .map(EntryVar::Elapsed);
        }
        if let Some(digit) = name.strip_prefix("args") {
            return single_digit(digit).map(EntryVar::Args);
        }
        if let Some(digit) = name.strip_prefix("arg") {
            return single_digit(digit).map(EntryVar::Arg);
        }
        None
    }

    /// Every registry entry, in registry order.
    pub fn all() -> Vec<EntryVar> {
        let mut vars = vec![EntryVar::VTimestamp, EntryVar::WallTimestamp, EntryVar::Errno];
        vars.extend(ElapsedUnit::ALL.into_iter().map(EntryVar::Elapsed));
        vars.extend((0..=MAX_ENTRY_ARG).map(EntryVar::Arg));
        vars.extend((0..=MAX_ENTRY_ARG).map(EntryVar::Args));
        vars.push(EntryVar::Timestamp);
        vars
    }

    /// Field name as written after `entry->`.
    pub fn name(self) -> String {
        match self {
            EntryVar::VTimestamp => "vtimestamp".to_string(),
            EntryVar::WallTimestamp => "walltimestamp".to_string(),
            EntryVar::Errno => "errno".to_string(),
            EntryVar::Elapsed(unit) => format!("elapsed_{}", unit.suffix()),
            EntryVar::Arg(n) => format!("arg{}", n),
            EntryVar::Args(n) => format!("args{}", n),
            EntryVar::Timestamp => TIMESTAMP.to_string(),
        }
    }

    /// Divisor applied to the elapsed time, for `elapsed_*` fields.
    pub fn elapsed_divisor(self) -> Option<u64> {
        match self {
            EntryVar::Elapsed(unit) => Some(unit.divisor()),
            _ => None,
        }
    }

    /// Expression evaluated at the entry probe to capture this field.
    ///
    /// `None` for elapsed fields, which have no slot of their own.
    pub fn captured_value(self, span: Span) -> Option<Expr> {
        match self {
            EntryVar::Elapsed(_) => None,
            EntryVar::Args(n) => Some(Expr::index(
                Expr::ident("args", span),
                vec![Expr::int(u64::from(n), span)],
                span,
            )),
            other => Some(Expr::ident(other.name(), span)),
        }
    }
}

fn single_digit(s: &str) -> Option<u8> {
    match s.as_bytes() {
        [d @ b'0'..=b'9'] => Some(d - b'0'),
        _ => None,
    }
}

// ============================================================================
// Slots
// ============================================================================

/// A synthesized variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// `self->_XD_error`
    Error,
    /// `this->_XD_condition_<id>`
    Condition(CondId),
    /// `self->_XD_entry_<field>_<group>[stackdepth]`
    Entry { var: EntryVar, group: CaptureGroupId },
    /// `self->_XD_callers_<id>`
    Callers(CounterId),
}

impl Slot {
    pub fn scope(self) -> &'static str {
        match self {
            Slot::Condition(_) => THIS_SCOPE,
            Slot::Error | Slot::Entry { .. } | Slot::Callers(_) => SELF_SCOPE,
        }
    }

    /// Variable name, without scope.
    pub fn name(self) -> String {
        match self {
            Slot::Error => format!("{}error", XD_PREFIX),
            Slot::Condition(id) => format!("{}condition_{}", XD_PREFIX, id),
            Slot::Entry { var, group } => format!("{}entry_{}_{}", XD_PREFIX, var.name(), group),
            Slot::Callers(id) => format!("{}callers_{}", XD_PREFIX, id),
        }
    }

    /// Reference expression for this slot.
    pub fn expr(self, span: Span) -> Expr {
        let var = Expr::scoped(self.scope(), self.name(), span);
        match self {
            Slot::Entry { .. } => Expr::index(var, vec![Expr::ident(STACK_DEPTH, span)], span),
            _ => var,
        }
    }
}
