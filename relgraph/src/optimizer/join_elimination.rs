/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Foreign-key join elimination.
//!
//! A join operand can be dropped when it contributes nothing but its key
//! column and the equality on that column is backed by a declared foreign
//! key. The referencing column then stands in for the removed key column
//! everywhere, in the plan and in the binding maker alike. Runs to fixpoint
//! over the top-level join.

use std::collections::BTreeSet;

use log::debug;

use crate::algebra::{Column, ColumnRenamer, Expr, Projection, RelationalExpr, TableRef};
use crate::error::Result;
use crate::makers::{BindingMaker, NodeRelation};
use crate::schema::Catalog;

/// Whether an operand is a plain scan of exactly this table, with no
/// selection of its own that removal would lose.
fn is_bare_scan(operand: &RelationalExpr, table: &TableRef) -> bool {
    match operand {
        RelationalExpr::Table(t) => t == table,
        RelationalExpr::Alias { child, alias } => {
            alias == table && matches!(child.as_ref(), RelationalExpr::Table(_))
        }
        _ => false,
    }
}

/// The conditions under which dropping `key.table` preserves the row
/// multiset: the equality is foreign-key backed, the referencing column is
/// non-nullable, the key column is unique in its table, and nothing else in
/// the plan reads the dropped table.
fn removable(
    catalog: &Catalog,
    referencing: &Column,
    key: &Column,
    required: &BTreeSet<Column>,
) -> Result<bool> {
    if referencing.table == key.table {
        return Ok(false);
    }
    if !catalog.has_foreign_key(referencing, key) {
        return Ok(false);
    }
    if catalog.is_nullable(referencing)? {
        return Ok(false);
    }
    if !catalog.is_unique(&key.table.base, &BTreeSet::from([key.name.clone()])) {
        return Ok(false);
    }
    Ok(required
        .iter()
        .all(|c| c.table != key.table || c == key))
}

struct Candidate {
    referencing: Column,
    key: Column,
    conjunct: Expr,
}

/// Columns the plan still reads when the conjunct at `skipped` goes away.
fn required_without(
    conjuncts: &[Expr],
    skipped: usize,
    equalities: &BTreeSet<crate::algebra::ColumnEquality>,
    projections: &BTreeSet<Projection>,
    binding: &BindingMaker,
) -> BTreeSet<Column> {
    let mut required: BTreeSet<Column> = BTreeSet::new();
    for (i, conjunct) in conjuncts.iter().enumerate() {
        if i != skipped {
            required.extend(conjunct.columns());
        }
    }
    for eq in equalities {
        required.insert(eq.left.clone());
        required.insert(eq.right.clone());
    }
    for projection in projections {
        required.extend(projection.input_columns());
    }
    required.extend(binding.columns());
    required
}

fn find_candidate(
    catalog: &Catalog,
    conjuncts: &[Expr],
    operands: &BTreeSet<RelationalExpr>,
    equalities: &BTreeSet<crate::algebra::ColumnEquality>,
    projections: &BTreeSet<Projection>,
    binding: &BindingMaker,
) -> Result<Option<Candidate>> {
    for (index, conjunct) in conjuncts.iter().enumerate() {
        let Expr::Equality(left, right) = conjunct else {
            continue;
        };
        let (Expr::Column(a), Expr::Column(b)) = (left.as_ref(), right.as_ref()) else {
            continue;
        };
        let required = required_without(conjuncts, index, equalities, projections, binding);
        for (referencing, key) in [(a, b), (b, a)] {
            if !removable(catalog, referencing, key, &required)? {
                continue;
            }
            if !operands.iter().any(|o| is_bare_scan(o, &key.table)) {
                continue;
            }
            return Ok(Some(Candidate {
                referencing: referencing.clone(),
                key: key.clone(),
                conjunct: conjunct.clone(),
            }));
        }
    }
    Ok(None)
}

/// Drop foreign-key joins from a plan until none qualifies. Plans not of
/// the project-select-join shape are returned unchanged.
pub fn eliminate_joins(catalog: &Catalog, relation: NodeRelation) -> Result<NodeRelation> {
    let mut relation = relation;
    loop {
        match eliminate_once(catalog, relation)? {
            Ok(reduced) => relation = reduced,
            Err(unchanged) => return Ok(unchanged),
        }
    }
}

/// One elimination step. `Ok(Ok(_))` is a reduced plan, `Ok(Err(_))` gives
/// the input back untouched.
fn eliminate_once(
    catalog: &Catalog,
    relation: NodeRelation,
) -> Result<std::result::Result<NodeRelation, NodeRelation>> {
    let NodeRelation {
        expr,
        binding,
        duplicate_free,
        unsupported,
    } = relation;

    let RelationalExpr::Project { child, projections } = expr else {
        return Ok(Err(
            NodeRelation::new(expr, binding, duplicate_free).with_unsupported(unsupported)
        ));
    };
    let (join, predicate) = match *child {
        RelationalExpr::Select { child, predicate } => (*child, predicate),
        other => (other, Expr::True),
    };
    let RelationalExpr::Join {
        operands,
        equalities,
    } = join
    else {
        return Ok(Err(rebuild(
            catalog,
            join,
            predicate,
            projections,
            binding,
            duplicate_free,
            unsupported,
        )?));
    };

    let conjuncts = predicate.conjuncts();
    let candidate = find_candidate(
        catalog,
        &conjuncts,
        &operands,
        &equalities,
        &projections,
        &binding,
    )?;

    let Some(candidate) = candidate else {
        let join = RelationalExpr::Join {
            operands,
            equalities,
        };
        return Ok(Err(rebuild(
            catalog,
            join,
            predicate,
            projections,
            binding,
            duplicate_free,
            unsupported,
        )?));
    };

    debug!(
        "eliminating join to {} through foreign key on {}",
        candidate.key.table,
        candidate.referencing.qualified()
    );
    let renamer = ColumnRenamer::single(candidate.key.clone(), candidate.referencing.clone());
    let rename = |c: &Column| renamer.rename_column(c);

    let remaining: Vec<RelationalExpr> = operands
        .into_iter()
        .filter(|o| !is_bare_scan(o, &candidate.key.table))
        .collect();
    let remaining_conjuncts = conjuncts
        .into_iter()
        .filter(|c| *c != candidate.conjunct)
        .map(|c| c.rewrite_columns(&rename));
    let equalities = equalities
        .into_iter()
        .map(|eq| crate::algebra::ColumnEquality::new(rename(&eq.left), rename(&eq.right)));
    let projections = projections.into_iter().map(|p| match p {
        Projection::Column(c) => Projection::Column(rename(&c)),
        Projection::Expr { name, expr } => Projection::Expr {
            name,
            expr: expr.rewrite_columns(&rename),
        },
    });

    let join = RelationalExpr::join(catalog, remaining, equalities)?;
    let reduced = rebuild(
        catalog,
        join,
        Expr::conjunction(remaining_conjuncts),
        projections.collect(),
        binding.rewrite_columns(&rename),
        duplicate_free,
        unsupported,
    )?;
    Ok(Ok(reduced))
}

fn rebuild(
    catalog: &Catalog,
    child: RelationalExpr,
    predicate: Expr,
    projections: BTreeSet<Projection>,
    binding: BindingMaker,
    duplicate_free: bool,
    unsupported: bool,
) -> Result<NodeRelation> {
    let selected = RelationalExpr::select(catalog, child, predicate)?;
    let expr = RelationalExpr::project(catalog, selected, projections)?;
    Ok(NodeRelation::new(expr, binding, duplicate_free).with_unsupported(unsupported))
}
