/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Boolean and value expressions used in selection predicates, join
//! conditions and expression projections.
//!
//! The tree is a pure value. Constructors simplify eagerly (`and` drops
//! `True`, collapses on `False`, equality of identical operands folds to
//! `True`) so that downstream comparisons of plans are structural.

use std::collections::BTreeSet;
use std::fmt;

use super::types::{Column, SqlLiteral};

/// A scalar or boolean SQL expression.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Expr {
    /// Always satisfied.
    True,
    /// Never satisfied. Also the rendering of "value not representable".
    False,
    /// A column reference.
    Column(Column),
    /// A canonicalized literal.
    Literal(SqlLiteral),
    /// String concatenation, used to express template values in SQL.
    Concat(Vec<Expr>),
    /// A unary SQL function application such as `LOWER`.
    Apply { function: String, arg: Box<Expr> },
    /// An opaque vendor expression with its referenced columns declared.
    Raw { sql: String, columns: BTreeSet<Column> },
    /// Equality of two expressions.
    Equality(Box<Expr>, Box<Expr>),
    /// Conjunction; the set form makes it order-insensitive.
    And(BTreeSet<Expr>),
    /// Disjunction.
    Or(BTreeSet<Expr>),
    Not(Box<Expr>),
}

impl Expr {
    pub fn column(column: Column) -> Expr {
        Expr::Column(column)
    }

    pub fn literal(literal: SqlLiteral) -> Expr {
        Expr::Literal(literal)
    }

    /// Equality with eager folding: identical operands are `True`, two
    /// different literals are `False`.
    pub fn equality(left: Expr, right: Expr) -> Expr {
        if left == right {
            return Expr::True;
        }
        if let (Expr::Literal(a), Expr::Literal(b)) = (&left, &right) {
            if a != b {
                return Expr::False;
            }
        }
        let (left, right) = if left <= right {
            (left, right)
        } else {
            (right, left)
        };
        Expr::Equality(Box::new(left), Box::new(right))
    }

    /// Column-to-column equality.
    pub fn column_equality(a: Column, b: Column) -> Expr {
        Expr::equality(Expr::Column(a), Expr::Column(b))
    }

    /// Conjunction of any number of expressions, flattened and simplified.
    pub fn conjunction(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        let mut set = BTreeSet::new();
        for expr in exprs {
            match expr {
                Expr::True => {}
                Expr::False => return Expr::False,
                Expr::And(inner) => set.extend(inner),
                other => {
                    set.insert(other);
                }
            }
        }
        match set.len() {
            0 => Expr::True,
            1 => set.into_iter().next().unwrap(),
            _ => Expr::And(set),
        }
    }

    /// Disjunction of any number of expressions, flattened and simplified.
    pub fn disjunction(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        let mut set = BTreeSet::new();
        for expr in exprs {
            match expr {
                Expr::False => {}
                Expr::True => return Expr::True,
                Expr::Or(inner) => set.extend(inner),
                other => {
                    set.insert(other);
                }
            }
        }
        match set.len() {
            0 => Expr::False,
            1 => set.into_iter().next().unwrap(),
            _ => Expr::Or(set),
        }
    }

    pub fn negation(expr: Expr) -> Expr {
        match expr {
            Expr::True => Expr::False,
            Expr::False => Expr::True,
            Expr::Not(inner) => *inner,
            other => Expr::Not(Box::new(other)),
        }
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Expr::True)
    }

    pub fn is_false(&self) -> bool {
        matches!(self, Expr::False)
    }

    /// All columns referenced anywhere in this expression.
    pub fn columns(&self) -> BTreeSet<Column> {
        let mut out = BTreeSet::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns(&self, out: &mut BTreeSet<Column>) {
        match self {
            Expr::True | Expr::False | Expr::Literal(_) => {}
            Expr::Column(c) => {
                out.insert(c.clone());
            }
            Expr::Concat(parts) => {
                for p in parts {
                    p.collect_columns(out);
                }
            }
            Expr::Apply { arg, .. } => arg.collect_columns(out),
            Expr::Raw { columns, .. } => out.extend(columns.iter().cloned()),
            Expr::Equality(l, r) => {
                l.collect_columns(out);
                r.collect_columns(out);
            }
            Expr::And(set) | Expr::Or(set) => {
                for e in set {
                    e.collect_columns(out);
                }
            }
            Expr::Not(inner) => inner.collect_columns(out),
        }
    }

    /// Rebuild the expression with every column replaced through `rename`.
    pub fn rewrite_columns(&self, rename: &impl Fn(&Column) -> Column) -> Expr {
        match self {
            Expr::True => Expr::True,
            Expr::False => Expr::False,
            Expr::Literal(l) => Expr::Literal(l.clone()),
            Expr::Column(c) => Expr::Column(rename(c)),
            Expr::Concat(parts) => {
                Expr::Concat(parts.iter().map(|p| p.rewrite_columns(rename)).collect())
            }
            Expr::Apply { function, arg } => Expr::Apply {
                function: function.clone(),
                arg: Box::new(arg.rewrite_columns(rename)),
            },
            Expr::Raw { sql, columns } => Expr::Raw {
                sql: sql.clone(),
                columns: columns.iter().map(rename).collect(),
            },
            Expr::Equality(l, r) => {
                Expr::equality(l.rewrite_columns(rename), r.rewrite_columns(rename))
            }
            Expr::And(set) => {
                Expr::conjunction(set.iter().map(|e| e.rewrite_columns(rename)))
            }
            Expr::Or(set) => {
                Expr::disjunction(set.iter().map(|e| e.rewrite_columns(rename)))
            }
            Expr::Not(inner) => Expr::negation(inner.rewrite_columns(rename)),
        }
    }

    /// The conjuncts of this expression: members of a top-level `And`, or
    /// the expression itself.
    pub fn conjuncts(&self) -> Vec<Expr> {
        match self {
            Expr::True => Vec::new(),
            Expr::And(set) => set.iter().cloned().collect(),
            other => vec![other.clone()],
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::True => write!(f, "TRUE"),
            Expr::False => write!(f, "FALSE"),
            Expr::Column(c) => write!(f, "{}", c),
            Expr::Literal(l) => write!(f, "{}", l),
            Expr::Concat(parts) => {
                write!(f, "CONCAT(")?;
                for (i, p) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ")")
            }
            Expr::Apply { function, arg } => write!(f, "{}({})", function, arg),
            Expr::Raw { sql, .. } => write!(f, "({})", sql),
            Expr::Equality(l, r) => write!(f, "{} = {}", l, r),
            Expr::And(set) => {
                write!(f, "(")?;
                for (i, e) in set.iter().enumerate() {
                    if i > 0 {
                        write!(f, " AND ")?;
                    }
                    write!(f, "{}", e)?;
                }
                write!(f, ")")
            }
            Expr::Or(set) => {
                write!(f, "(")?;
                for (i, e) in set.iter().enumerate() {
                    if i > 0 {
                        write!(f, " OR ")?;
                    }
                    write!(f, "{}", e)?;
                }
                write!(f, ")")
            }
            Expr::Not(inner) => write!(f, "NOT ({})", inner),
        }
    }
}
