/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Value makers: row-to-lexical-form converters.
//!
//! A value maker is the capability object behind one term slot of a bridge.
//! It knows which columns it reads, how to produce the slot's string value
//! from a result row, and how to turn "this slot equals V" into a relational
//! predicate.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use crate::algebra::{Column, Expr, Projection};
use crate::error::Result;
use crate::makers::row::ResultRow;
use crate::makers::template::{CompositeId, Template};
use crate::schema::Catalog;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueMaker {
    /// The value of a single column, verbatim.
    Column(Column),
    /// A reversible string template.
    Template(Template),
    /// A synthetic multi-column identifier.
    CompositeId(CompositeId),
    /// A fixed string, independent of the row.
    Constant(String),
    /// An opaque SQL expression, projected under `name` by the plan and
    /// read back from the row under that key.
    Expression { name: String, expr: Expr },
}

impl ValueMaker {
    pub fn constant(value: impl Into<String>) -> Self {
        ValueMaker::Constant(value.into())
    }

    /// The columns this maker reads.
    pub fn columns(&self) -> BTreeSet<Column> {
        match self {
            ValueMaker::Column(c) => BTreeSet::from([c.clone()]),
            ValueMaker::Template(t) => t.column_set(),
            ValueMaker::CompositeId(id) => id.column_set(),
            ValueMaker::Constant(_) => BTreeSet::new(),
            ValueMaker::Expression { expr, .. } => expr.columns(),
        }
    }

    /// What the plan must project for this maker to be decodable.
    pub fn projections(&self) -> BTreeSet<Projection> {
        match self {
            ValueMaker::Expression { name, expr } => BTreeSet::from([Projection::Expr {
                name: name.clone(),
                expr: expr.clone(),
            }]),
            _ => self.columns().into_iter().map(Projection::Column).collect(),
        }
    }

    /// Forward evaluation; `None` propagates column absence.
    pub fn value(&self, row: &ResultRow) -> Option<String> {
        match self {
            ValueMaker::Column(c) => row.column(c).map(|v| v.to_string()),
            ValueMaker::Template(t) => t.value(row),
            ValueMaker::CompositeId(id) => id.value(row),
            ValueMaker::Constant(v) => Some(v.clone()),
            ValueMaker::Expression { name, .. } => row.get(name).map(|v| v.to_string()),
        }
    }

    /// Structural pre-check that `candidate` could be produced at all.
    pub fn could_fit(&self, candidate: &str) -> bool {
        match self {
            ValueMaker::Column(_) | ValueMaker::Expression { .. } => true,
            ValueMaker::Template(t) => t.could_fit(candidate),
            ValueMaker::CompositeId(id) => id.could_fit(candidate),
            ValueMaker::Constant(v) => v == candidate,
        }
    }

    /// Reverse-match `candidate` into per-column required values. `None`
    /// means no fit; an empty map means "fits, but no column is pinned".
    pub fn attribute_conditions(&self, candidate: &str) -> Option<FxHashMap<Column, String>> {
        match self {
            ValueMaker::Column(c) => {
                let mut out = FxHashMap::default();
                out.insert(c.clone(), candidate.to_string());
                Some(out)
            }
            ValueMaker::Template(t) => t.attribute_conditions(candidate),
            ValueMaker::CompositeId(id) => id.attribute_conditions(candidate),
            ValueMaker::Constant(v) => (v == candidate).then(FxHashMap::default),
            ValueMaker::Expression { .. } => Some(FxHashMap::default()),
        }
    }

    /// The predicate "this slot's value equals `candidate`".
    pub fn value_expression(&self, candidate: &str, catalog: &Catalog) -> Result<Expr> {
        match self {
            ValueMaker::Column(c) => Ok(match catalog.to_literal(c, candidate)? {
                Some(literal) => {
                    Expr::equality(Expr::Column(c.clone()), Expr::Literal(literal))
                }
                None => Expr::False,
            }),
            ValueMaker::Template(t) => t.value_expression(candidate, catalog),
            ValueMaker::CompositeId(id) => id.value_expression(candidate, catalog),
            ValueMaker::Constant(v) => Ok(if v == candidate {
                Expr::True
            } else {
                Expr::False
            }),
            ValueMaker::Expression { expr, .. } => Ok(Expr::equality(
                expr.clone(),
                Expr::Literal(crate::algebra::SqlLiteral::new(format!(
                    "'{}'",
                    candidate.replace('\'', "''")
                ))),
            )),
        }
    }

    /// The SQL value of this maker, for cross-source equality building.
    /// The boolean is true when the rendering is only an approximation
    /// (an encoding with no SQL form).
    pub fn sql_expr(&self) -> (Expr, bool) {
        match self {
            ValueMaker::Column(c) => (Expr::Column(c.clone()), false),
            ValueMaker::Template(t) => t.sql_expr(),
            ValueMaker::CompositeId(id) => (id.sql_expr(), false),
            ValueMaker::Constant(v) => (
                Expr::Literal(crate::algebra::SqlLiteral::new(format!(
                    "'{}'",
                    v.replace('\'', "''")
                ))),
                false,
            ),
            ValueMaker::Expression { expr, .. } => (expr.clone(), false),
        }
    }

    /// Rebuild with every column substituted.
    pub fn rewrite_columns(&self, rename: &impl Fn(&Column) -> Column) -> ValueMaker {
        match self {
            ValueMaker::Column(c) => ValueMaker::Column(rename(c)),
            ValueMaker::Template(t) => ValueMaker::Template(t.rewrite_columns(rename)),
            ValueMaker::CompositeId(id) => ValueMaker::CompositeId(id.rewrite_columns(rename)),
            ValueMaker::Constant(v) => ValueMaker::Constant(v.clone()),
            ValueMaker::Expression { name, expr } => ValueMaker::Expression {
                name: name.clone(),
                expr: expr.rewrite_columns(rename),
            },
        }
    }
}
