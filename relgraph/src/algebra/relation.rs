/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The relational expression tree.
//!
//! Nodes are immutable values; plans are built bottom-up through the
//! validating constructors and rewritten only through
//! [`transform`](super::rewrite::transform). The validating constructors
//! enforce the structural invariants: every referenced column is exposed by
//! the children, join operands expose pairwise-disjoint table names, and
//! equality conditions only relate format-compatible columns.
//!
//! Direct variant construction is possible inside the crate (the rewrite
//! machinery relies on it) but must preserve validity.

use std::collections::BTreeSet;
use std::fmt;

use super::expr::Expr;
use super::types::{Column, ColumnEquality, OrderSpec, TableRef};
use crate::error::{RelgraphError, Result};
use crate::schema::Catalog;

/// A projected output: a plain column, or a named expression (used for the
/// boolean indicator columns of condition merging).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Projection {
    Column(Column),
    Expr { name: String, expr: Expr },
}

impl Projection {
    /// Input columns this projection reads.
    pub fn input_columns(&self) -> BTreeSet<Column> {
        match self {
            Projection::Column(c) => BTreeSet::from([c.clone()]),
            Projection::Expr { expr, .. } => expr.columns(),
        }
    }

    /// The key this projection's value is read under in a result row.
    pub fn output_key(&self) -> String {
        match self {
            Projection::Column(c) => c.qualified(),
            Projection::Expr { name, .. } => name.clone(),
        }
    }
}

/// A relational query plan.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RelationalExpr {
    /// A base table scan.
    Table(TableRef),
    /// Inner join of the operands under the given column equalities.
    Join {
        operands: BTreeSet<RelationalExpr>,
        equalities: BTreeSet<ColumnEquality>,
    },
    /// Filter.
    Select {
        child: Box<RelationalExpr>,
        predicate: Expr,
    },
    /// Projection to the given outputs.
    Project {
        child: Box<RelationalExpr>,
        projections: BTreeSet<Projection>,
    },
    /// The child's single table renamed to `alias`.
    Alias {
        child: Box<RelationalExpr>,
        alias: TableRef,
    },
    Order {
        child: Box<RelationalExpr>,
        order: Vec<OrderSpec>,
    },
    Limit {
        child: Box<RelationalExpr>,
        count: u64,
        /// Take the last `count` rows of the ordering instead of the first.
        from_end: bool,
    },
    Distinct { child: Box<RelationalExpr> },
    /// The empty relation over the given columns: no rows, ever.
    Empty { columns: BTreeSet<Column> },
    /// The unit relation: exactly one row with no columns.
    True,
}

impl RelationalExpr {
    /// A base table scan, validated against the catalog.
    pub fn table(catalog: &Catalog, name: &str) -> Result<RelationalExpr> {
        catalog.table(name)?;
        Ok(RelationalExpr::Table(TableRef::new(name)))
    }

    /// Inner join. Operand table names must be pairwise disjoint and every
    /// equality must relate exposed, format-compatible columns.
    pub fn join(
        catalog: &Catalog,
        operands: impl IntoIterator<Item = RelationalExpr>,
        equalities: impl IntoIterator<Item = ColumnEquality>,
    ) -> Result<RelationalExpr> {
        let operands: BTreeSet<RelationalExpr> = operands.into_iter().collect();
        let equalities: BTreeSet<ColumnEquality> = equalities.into_iter().collect();

        let mut seen = BTreeSet::new();
        for operand in &operands {
            for table in operand.tables() {
                if !seen.insert(table.name()) {
                    return Err(RelgraphError::DuplicateTable(table.name()));
                }
            }
        }

        let mut exposed = BTreeSet::new();
        for operand in &operands {
            exposed.extend(operand.columns(catalog)?);
        }
        for eq in &equalities {
            for column in [&eq.left, &eq.right] {
                if !exposed.contains(column) {
                    return Err(RelgraphError::MissingColumn(column.qualified()));
                }
            }
            if !catalog.compatible(&eq.left, &eq.right)? {
                return Err(RelgraphError::IncompatibleFormats {
                    left: eq.left.qualified(),
                    right: eq.right.qualified(),
                });
            }
        }

        if operands.len() == 1 && equalities.is_empty() {
            return Ok(operands.into_iter().next().unwrap());
        }
        Ok(RelationalExpr::Join {
            operands,
            equalities,
        })
    }

    /// Filter; a `True` predicate returns the child unchanged, a `False`
    /// predicate collapses to the empty relation.
    pub fn select(
        catalog: &Catalog,
        child: RelationalExpr,
        predicate: Expr,
    ) -> Result<RelationalExpr> {
        if predicate.is_true() {
            return Ok(child);
        }
        let exposed = child.columns(catalog)?;
        if predicate.is_false() {
            return Ok(RelationalExpr::Empty { columns: exposed });
        }
        for column in predicate.columns() {
            if !exposed.contains(&column) {
                return Err(RelgraphError::MissingColumn(column.qualified()));
            }
        }
        Ok(RelationalExpr::Select {
            child: Box::new(child),
            predicate,
        })
    }

    /// Projection to the given outputs.
    pub fn project(
        catalog: &Catalog,
        child: RelationalExpr,
        projections: impl IntoIterator<Item = Projection>,
    ) -> Result<RelationalExpr> {
        let projections: BTreeSet<Projection> = projections.into_iter().collect();
        let exposed = child.columns(catalog)?;
        for projection in &projections {
            for column in projection.input_columns() {
                if !exposed.contains(&column) {
                    return Err(RelgraphError::MissingColumn(column.qualified()));
                }
            }
        }
        Ok(RelationalExpr::Project {
            child: Box::new(child),
            projections,
        })
    }

    /// Rename the child's single table to `alias`.
    pub fn alias(child: RelationalExpr, alias: TableRef) -> Result<RelationalExpr> {
        let tables = child.tables();
        if tables.len() != 1 {
            let names: Vec<String> = tables.iter().map(|t| t.name()).collect();
            return Err(RelgraphError::AliasOverMultipleTables(names.join(", ")));
        }
        Ok(RelationalExpr::Alias {
            child: Box::new(child),
            alias,
        })
    }

    pub fn order(
        catalog: &Catalog,
        child: RelationalExpr,
        order: Vec<OrderSpec>,
    ) -> Result<RelationalExpr> {
        let exposed = child.columns(catalog)?;
        for spec in &order {
            if !exposed.contains(&spec.column) {
                return Err(RelgraphError::MissingColumn(spec.column.qualified()));
            }
        }
        Ok(RelationalExpr::Order {
            child: Box::new(child),
            order,
        })
    }

    pub fn limit(child: RelationalExpr, count: u64, from_end: bool) -> RelationalExpr {
        RelationalExpr::Limit {
            child: Box::new(child),
            count,
            from_end,
        }
    }

    pub fn distinct(child: RelationalExpr) -> RelationalExpr {
        RelationalExpr::Distinct {
            child: Box::new(child),
        }
    }

    pub fn empty(columns: impl IntoIterator<Item = Column>) -> RelationalExpr {
        RelationalExpr::Empty {
            columns: columns.into_iter().collect(),
        }
    }

    /// Table names this expression exposes, post-aliasing.
    pub fn tables(&self) -> BTreeSet<TableRef> {
        match self {
            RelationalExpr::Table(t) => BTreeSet::from([t.clone()]),
            RelationalExpr::Alias { alias, .. } => BTreeSet::from([alias.clone()]),
            RelationalExpr::Join { operands, .. } => {
                operands.iter().flat_map(|o| o.tables()).collect()
            }
            RelationalExpr::Select { child, .. }
            | RelationalExpr::Project { child, .. }
            | RelationalExpr::Order { child, .. }
            | RelationalExpr::Limit { child, .. }
            | RelationalExpr::Distinct { child } => child.tables(),
            RelationalExpr::Empty { .. } | RelationalExpr::True => BTreeSet::new(),
        }
    }

    /// Columns this expression exposes to its parent. Expression projections
    /// are not part of this set; they are read by name from the result row.
    pub fn columns(&self, catalog: &Catalog) -> Result<BTreeSet<Column>> {
        match self {
            RelationalExpr::Table(t) => catalog.columns_of(t),
            RelationalExpr::Alias { child, alias } => {
                let inner = child.columns(catalog)?;
                Ok(inner
                    .into_iter()
                    .map(|c| Column::with_table(alias.clone(), c.name))
                    .collect())
            }
            RelationalExpr::Join { operands, .. } => {
                let mut out = BTreeSet::new();
                for operand in operands {
                    out.extend(operand.columns(catalog)?);
                }
                Ok(out)
            }
            RelationalExpr::Select { child, .. }
            | RelationalExpr::Order { child, .. }
            | RelationalExpr::Limit { child, .. }
            | RelationalExpr::Distinct { child } => child.columns(catalog),
            RelationalExpr::Project { projections, .. } => Ok(projections
                .iter()
                .filter_map(|p| match p {
                    Projection::Column(c) => Some(c.clone()),
                    Projection::Expr { .. } => None,
                })
                .collect()),
            RelationalExpr::Empty { columns } => Ok(columns.clone()),
            RelationalExpr::True => Ok(BTreeSet::new()),
        }
    }

    /// Whether this plan can never produce a row.
    pub fn is_empty_relation(&self) -> bool {
        match self {
            RelationalExpr::Empty { .. } => true,
            RelationalExpr::Join { operands, .. } => {
                operands.iter().any(|o| o.is_empty_relation())
            }
            RelationalExpr::Select { child, predicate } => {
                predicate.is_false() || child.is_empty_relation()
            }
            RelationalExpr::Project { child, .. }
            | RelationalExpr::Alias { child, .. }
            | RelationalExpr::Order { child, .. }
            | RelationalExpr::Limit { child, .. }
            | RelationalExpr::Distinct { child } => child.is_empty_relation(),
            _ => false,
        }
    }
}

impl fmt::Display for RelationalExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationalExpr::Table(t) => write!(f, "Table({})", t),
            RelationalExpr::Join {
                operands,
                equalities,
            } => {
                write!(f, "Join(")?;
                for (i, o) in operands.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", o)?;
                }
                for eq in equalities {
                    write!(f, "; {}", eq)?;
                }
                write!(f, ")")
            }
            RelationalExpr::Select { child, predicate } => {
                write!(f, "Select({} WHERE {})", child, predicate)
            }
            RelationalExpr::Project { child, projections } => {
                write!(f, "Project({} TO ", child)?;
                for (i, p) in projections.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p.output_key())?;
                }
                write!(f, ")")
            }
            RelationalExpr::Alias { child, alias } => write!(f, "Alias({} AS {})", child, alias),
            RelationalExpr::Order { child, order } => {
                write!(f, "Order({}", child)?;
                for spec in order {
                    write!(
                        f,
                        " BY {} {}",
                        spec.column,
                        if spec.ascending { "ASC" } else { "DESC" }
                    )?;
                }
                write!(f, ")")
            }
            RelationalExpr::Limit {
                child,
                count,
                from_end,
            } => write!(
                f,
                "Limit({}, {}{})",
                child,
                count,
                if *from_end { " FROM END" } else { "" }
            ),
            RelationalExpr::Distinct { child } => write!(f, "Distinct({})", child),
            RelationalExpr::Empty { .. } => write!(f, "Empty"),
            RelationalExpr::True => write!(f, "True"),
        }
    }
}
