//! Source-form printing of AST nodes.
//!
//! Used for diagnostics (dumping generated sub-clauses) and by tests, which
//! compare compiler output against expected source text.
//!
//! Nested operator expressions are always parenthesised, so the printed text
//! is unambiguous without a precedence table. Member access (`->`, `.`) is
//! never parenthesised.

use std::fmt::{self, Display, Formatter, Write};

use super::{Clause, Expr, ExprKind, Program, Stmt};

const INDENT: &str = "    ";

/// Whether `expr` must be wrapped in parentheses when it appears as an
/// operand of another operator.
fn needs_parens(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Binary { op, .. } => !op.is_member_access(),
        ExprKind::Ternary { .. } => true,
        _ => false,
    }
}

fn write_operand(f: &mut Formatter<'_>, expr: &Expr) -> fmt::Result {
    if needs_parens(expr) {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

fn write_list(f: &mut Formatter<'_>, exprs: &[Expr]) -> fmt::Result {
    for (i, expr) in exprs.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", expr)?;
    }
    Ok(())
}

fn write_string_literal(f: &mut Formatter<'_>, value: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in value.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Int(value) => write!(f, "{}", value),
            ExprKind::Str(value) => write_string_literal(f, value),
            ExprKind::Ident(name) | ExprKind::Type(name) => f.write_str(name),
            ExprKind::Sym(name) => write!(f, "`{}", name),

            ExprKind::Unary { op, operand } => {
                if op.is_postfix() {
                    write_operand(f, operand)?;
                    f.write_str(op.symbol())
                } else {
                    f.write_str(op.symbol())?;
                    write_operand(f, operand)
                }
            }

            ExprKind::Binary { op, left, right } => {
                write_operand(f, left)?;
                if op.is_member_access() {
                    f.write_str(op.symbol())?;
                } else {
                    write!(f, " {} ", op.symbol())?;
                }
                write_operand(f, right)
            }

            ExprKind::Ternary {
                cond,
                then_expr,
                else_expr,
            } => {
                write_operand(f, cond)?;
                f.write_str(" ? ")?;
                write_operand(f, then_expr)?;
                f.write_str(" : ")?;
                write_operand(f, else_expr)
            }

            ExprKind::Index { base, keys } => {
                write_operand(f, base)?;
                f.write_char('[')?;
                write_list(f, keys)?;
                f.write_char(']')
            }

            ExprKind::Call { func, args } => {
                write!(f, "{}(", func)?;
                write_list(f, args)?;
                f.write_char(')')
            }

            ExprKind::Agg { name, keys, func } => {
                write!(f, "@{}", name)?;
                if !keys.is_empty() {
                    f.write_char('[')?;
                    write_list(f, keys)?;
                    f.write_char(']')?;
                }
                if let Some(func) = func {
                    write!(f, " = {}", func)?;
                }
                Ok(())
            }

            ExprKind::Inline { name, .. } => f.write_str(name),
            ExprKind::Error => f.write_str("<error>"),
        }
    }
}

fn write_block(f: &mut Formatter<'_>, stmts: &[Stmt], depth: usize) -> fmt::Result {
    f.write_str("{\n")?;
    for stmt in stmts {
        write_stmt(f, stmt, depth + 1)?;
    }
    for _ in 0..depth {
        f.write_str(INDENT)?;
    }
    f.write_char('}')
}

fn write_stmt(f: &mut Formatter<'_>, stmt: &Stmt, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        f.write_str(INDENT)?;
    }
    match stmt {
        Stmt::Expr(expr) => writeln!(f, "{};", expr),
        Stmt::If {
            cond,
            then_body,
            else_body,
            ..
        } => {
            write!(f, "if ({}) ", cond)?;
            write_block(f, then_body, depth)?;
            if !else_body.is_empty() {
                f.write_str(" else ")?;
                write_block(f, else_body, depth)?;
            }
            f.write_char('\n')
        }
        Stmt::While {
            cond,
            max_iter,
            body,
            ..
        } => {
            write!(f, "while<{}> ({}) ", max_iter, cond)?;
            write_block(f, body, depth)?;
            f.write_char('\n')
        }
    }
}

impl Display for Stmt {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_stmt(f, self, 0)
    }
}

impl Display for Clause {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, probe) in self.probes.iter().enumerate() {
            if i > 0 {
                f.write_str(",\n")?;
            }
            write!(f, "{}", probe)?;
        }
        f.write_char('\n')?;
        if let Some(predicate) = &self.predicate {
            writeln!(f, "/{}/", predicate)?;
        }
        write_block(f, &self.actions, 0)?;
        f.write_char('\n')
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                f.write_char('\n')?;
            }
            write!(f, "{}", clause)?;
        }
        Ok(())
    }
}
