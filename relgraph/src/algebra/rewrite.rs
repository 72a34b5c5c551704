/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The single generic tree-transform used by renaming and optimization.
//!
//! A transform supplies a table substitution and (derived from it) a column
//! substitution; [`transform`] rebuilds the tree bottom-up applying both to
//! every variant. Renaming a relation without renaming the binding maker
//! that reads its rows is the classic way to corrupt results, so renamers
//! are always applied through [`Renamer::apply`] on the expression and the
//! maker side together by the translator.

use std::collections::BTreeMap;

use super::expr::Expr;
use super::relation::{Projection, RelationalExpr};
use super::types::{Column, ColumnEquality, OrderSpec, TableRef};

/// A per-variant rewrite: tables and columns.
pub trait ExprTransform {
    fn table(&self, table: &TableRef) -> TableRef;

    fn column(&self, column: &Column) -> Column {
        Column {
            table: self.table(&column.table),
            name: column.name.clone(),
        }
    }
}

/// Rebuild an expression tree under a transform.
///
/// Bare `Table` leaves whose reference changes are wrapped in an `Alias`
/// node so that the statement renderer can emit `FROM base AS alias`.
pub fn transform(expr: &RelationalExpr, t: &impl ExprTransform) -> RelationalExpr {
    let rename = |c: &Column| t.column(c);
    match expr {
        RelationalExpr::Table(table) => {
            let renamed = t.table(table);
            if renamed == *table {
                RelationalExpr::Table(table.clone())
            } else {
                RelationalExpr::Alias {
                    child: Box::new(RelationalExpr::Table(table.clone())),
                    alias: renamed,
                }
            }
        }
        RelationalExpr::Alias { child, alias } => RelationalExpr::Alias {
            child: child.clone(),
            alias: t.table(alias),
        },
        RelationalExpr::Join {
            operands,
            equalities,
        } => RelationalExpr::Join {
            operands: operands.iter().map(|o| transform(o, t)).collect(),
            equalities: equalities
                .iter()
                .map(|eq| ColumnEquality::new(t.column(&eq.left), t.column(&eq.right)))
                .collect(),
        },
        RelationalExpr::Select { child, predicate } => RelationalExpr::Select {
            child: Box::new(transform(child, t)),
            predicate: predicate.rewrite_columns(&rename),
        },
        RelationalExpr::Project { child, projections } => RelationalExpr::Project {
            child: Box::new(transform(child, t)),
            projections: projections
                .iter()
                .map(|p| match p {
                    Projection::Column(c) => Projection::Column(t.column(c)),
                    Projection::Expr { name, expr } => Projection::Expr {
                        name: name.clone(),
                        expr: expr.rewrite_columns(&rename),
                    },
                })
                .collect(),
        },
        RelationalExpr::Order { child, order } => RelationalExpr::Order {
            child: Box::new(transform(child, t)),
            order: order
                .iter()
                .map(|spec| OrderSpec {
                    column: t.column(&spec.column),
                    ascending: spec.ascending,
                })
                .collect(),
        },
        RelationalExpr::Limit {
            child,
            count,
            from_end,
        } => RelationalExpr::Limit {
            child: Box::new(transform(child, t)),
            count: *count,
            from_end: *from_end,
        },
        RelationalExpr::Distinct { child } => RelationalExpr::Distinct {
            child: Box::new(transform(child, t)),
        },
        RelationalExpr::Empty { columns } => RelationalExpr::Empty {
            columns: columns.iter().map(|c| t.column(c)).collect(),
        },
        RelationalExpr::True => RelationalExpr::True,
    }
}

/// Table-name substitution; the concrete transform used for aliasing
/// duplicate bridge occurrences.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Renamer {
    map: BTreeMap<TableRef, TableRef>,
}

impl Renamer {
    pub fn empty() -> Self {
        Renamer::default()
    }

    /// Alias the given tables with consecutive numeric indices starting at
    /// `start`. Distinct instances of the same base table map to distinct
    /// indices, so a relation that already self-joins under its own aliases
    /// stays a self-join after renaming.
    pub fn prefixing(tables: impl IntoIterator<Item = TableRef>, start: u32) -> Self {
        let map = tables
            .into_iter()
            .zip(start..)
            .map(|(t, index)| {
                let renamed = TableRef::aliased(t.base.clone(), index);
                (t, renamed)
            })
            .collect();
        Renamer { map }
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn rename_table(&self, table: &TableRef) -> TableRef {
        self.map.get(table).cloned().unwrap_or_else(|| table.clone())
    }

    pub fn rename_column(&self, column: &Column) -> Column {
        self.column(column)
    }

    /// Apply this renaming to a whole expression tree.
    pub fn apply(&self, expr: &RelationalExpr) -> RelationalExpr {
        transform(expr, self)
    }
}

impl ExprTransform for Renamer {
    fn table(&self, table: &TableRef) -> TableRef {
        self.rename_table(table)
    }
}

/// Exact column substitution; used by join elimination to redirect the
/// eliminated table's key column to the referencing side.
#[derive(Debug, Clone, Default)]
pub struct ColumnRenamer {
    map: BTreeMap<Column, Column>,
}

impl ColumnRenamer {
    pub fn single(from: Column, to: Column) -> Self {
        ColumnRenamer {
            map: BTreeMap::from([(from, to)]),
        }
    }

    pub fn rename_column(&self, column: &Column) -> Column {
        self.column(column)
    }

    pub fn apply(&self, expr: &RelationalExpr) -> RelationalExpr {
        transform(expr, self)
    }
}

impl ExprTransform for ColumnRenamer {
    fn table(&self, table: &TableRef) -> TableRef {
        table.clone()
    }

    fn column(&self, column: &Column) -> Column {
        self.map.get(column).cloned().unwrap_or_else(|| column.clone())
    }
}
