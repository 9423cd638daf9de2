//! Read-only tree walking.
//!
//! Closure-driven pre-order traversal: the visitor sees a node before its
//! children, and children in source order. Passes that rewrite nodes do
//! their own `&mut` descent; these helpers are for inspection only.
//!
//! # Examples
//!
//! ```
//! use dscript_ast::walk::walk_expr;
//! use dscript_ast::{Expr, ExprKind, Span};
//!
//! let span = Span::default();
//! let expr = Expr::call("strlen", vec![Expr::ident("s", span)], span);
//!
//! let mut idents = Vec::new();
//! walk_expr(&expr, &mut |node| {
//!     if let ExprKind::Ident(name) = &node.kind {
//!         idents.push(name.clone());
//!     }
//! });
//! assert_eq!(idents, vec!["s".to_string()]);
//! ```

use super::{Clause, Expr, ExprKind, Stmt};

/// Recursively walk an expression tree in pre-order, calling visitor for each node.
pub fn walk_expr<V>(expr: &Expr, visitor: &mut V)
where
    V: FnMut(&Expr),
{
    visitor(expr);

    match &expr.kind {
        // === Compound expressions with child nodes ===
        ExprKind::Unary { operand, .. } => walk_expr(operand, visitor),

        ExprKind::Binary { left, right, .. } => {
            walk_expr(left, visitor);
            walk_expr(right, visitor);
        }

        ExprKind::Ternary {
            cond,
            then_expr,
            else_expr,
        } => {
            walk_expr(cond, visitor);
            walk_expr(then_expr, visitor);
            walk_expr(else_expr, visitor);
        }

        ExprKind::Index { base, keys } => {
            walk_expr(base, visitor);
            for key in keys {
                walk_expr(key, visitor);
            }
        }

        ExprKind::Call { args, .. } => {
            for arg in args {
                walk_expr(arg, visitor);
            }
        }

        ExprKind::Agg { keys, func, .. } => {
            for key in keys {
                walk_expr(key, visitor);
            }
            if let Some(func) = func {
                walk_expr(func, visitor);
            }
        }

        ExprKind::Inline { body, .. } => walk_expr(body, visitor),

        // === Leaf nodes (no children to traverse) ===
        ExprKind::Int(_)
        | ExprKind::Str(_)
        | ExprKind::Ident(_)
        | ExprKind::Sym(_)
        | ExprKind::Type(_)
        | ExprKind::Error => {}
    }
}

/// Walk a statement list in pre-order, including nested `if`/`while` bodies.
pub fn walk_stmts<V>(stmts: &[Stmt], visitor: &mut V)
where
    V: FnMut(&Stmt),
{
    for stmt in stmts {
        visitor(stmt);
        match stmt {
            Stmt::Expr(_) => {}
            Stmt::If {
                then_body,
                else_body,
                ..
            } => {
                walk_stmts(then_body, visitor);
                walk_stmts(else_body, visitor);
            }
            Stmt::While { body, .. } => walk_stmts(body, visitor),
        }
    }
}

/// Walk every expression of a clause: the predicate, then each statement's
/// expressions (including `if`/`while` conditions) in source order.
pub fn walk_clause_exprs<V>(clause: &Clause, visitor: &mut V)
where
    V: FnMut(&Expr),
{
    if let Some(predicate) = &clause.predicate {
        walk_expr(predicate, visitor);
    }
    walk_stmts(&clause.actions, &mut |stmt| match stmt {
        Stmt::Expr(expr) => walk_expr(expr, &mut *visitor),
        Stmt::If { cond, .. } | Stmt::While { cond, .. } => walk_expr(cond, &mut *visitor),
    });
}
