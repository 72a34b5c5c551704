/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Condition merging.
//!
//! Plans that share a base relation and differ only in their selection
//! predicate are collapsed into one query: the union of their projections
//! plus one boolean indicator projection per member, with the members'
//! predicates disjoined into a single selection. Each member's binding maker
//! is gated on its indicator so rows satisfying only the other members'
//! predicates are skipped on the decoding side.

use std::collections::BTreeSet;

use log::debug;

use crate::algebra::{Expr, Projection, RelationalExpr};
use crate::error::Result;
use crate::makers::{BindingMaker, NodeRelation};
use crate::schema::Catalog;

/// One relational plan decoded by several binding makers. The output shape
/// of the optimizer; an unmerged plan carries a single maker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedRelation {
    pub expr: RelationalExpr,
    pub bindings: Vec<BindingMaker>,
    pub duplicate_free: bool,
    /// Whether any member plan carries an approximated constraint.
    pub unsupported: bool,
}

impl MergedRelation {
    fn single(relation: NodeRelation) -> Self {
        MergedRelation {
            expr: relation.expr,
            bindings: vec![relation.binding],
            duplicate_free: relation.duplicate_free,
            unsupported: relation.unsupported,
        }
    }
}

/// A relation peeled into base, predicate and projections. Only the shape
/// the translator emits is merge-eligible; anything else passes through.
struct Member {
    predicate: Expr,
    projections: BTreeSet<Projection>,
    binding: BindingMaker,
    duplicate_free: bool,
    unsupported: bool,
}

fn peel(relation: NodeRelation) -> std::result::Result<(RelationalExpr, Member), NodeRelation> {
    let NodeRelation {
        expr,
        binding,
        duplicate_free,
        unsupported,
    } = relation;
    let (child, projections) = match expr {
        RelationalExpr::Project { child, projections } => (*child, projections),
        other => {
            return Err(
                NodeRelation::new(other, binding, duplicate_free).with_unsupported(unsupported)
            );
        }
    };
    let (base, predicate) = match child {
        RelationalExpr::Select { child, predicate } => (*child, predicate),
        other => (other, Expr::True),
    };
    Ok((
        base,
        Member {
            predicate,
            projections,
            binding,
            duplicate_free,
            unsupported,
        },
    ))
}

/// Merging is only sound when re-decoding shared rows cannot change
/// multiplicities: every member must be duplicate-free, or all members must
/// project the exact same outputs.
fn mergeable(members: &[Member]) -> bool {
    members.iter().all(|m| m.duplicate_free)
        || members
            .windows(2)
            .all(|pair| pair[0].projections == pair[1].projections)
}

fn merge_group(
    catalog: &Catalog,
    base: RelationalExpr,
    members: Vec<Member>,
) -> Result<MergedRelation> {
    let mut projections: BTreeSet<Projection> = BTreeSet::new();
    let mut predicates: Vec<Expr> = Vec::new();
    let mut bindings: Vec<BindingMaker> = Vec::new();
    let mut duplicate_free = true;
    let mut unsupported = false;

    for (index, member) in members.into_iter().enumerate() {
        projections.extend(member.projections);
        duplicate_free = duplicate_free && member.duplicate_free;
        unsupported = unsupported || member.unsupported;
        if member.predicate.is_true() {
            // Every row belongs to this member; no gate needed.
            bindings.push(member.binding);
        } else {
            let name = format!("cond_{}", index);
            projections.insert(Projection::Expr {
                name: name.clone(),
                expr: member.predicate.clone(),
            });
            bindings.push(member.binding.with_gate(name));
        }
        predicates.push(member.predicate);
    }

    let selected = RelationalExpr::select(catalog, base, Expr::disjunction(predicates))?;
    let expr = RelationalExpr::project(catalog, selected, projections)?;
    Ok(MergedRelation {
        expr,
        bindings,
        duplicate_free,
        unsupported,
    })
}

/// Merge plans sharing a base relation. Input order is preserved; groups
/// that fail the soundness guard are emitted unmerged.
pub fn merge_conditions(
    catalog: &Catalog,
    relations: Vec<NodeRelation>,
) -> Result<Vec<MergedRelation>> {
    let mut groups: Vec<(RelationalExpr, Vec<Member>)> = Vec::new();
    let mut passthrough: Vec<MergedRelation> = Vec::new();

    for relation in relations {
        match peel(relation) {
            Ok((base, member)) => {
                if let Some((_, members)) = groups.iter_mut().find(|(b, _)| *b == base) {
                    members.push(member);
                } else {
                    groups.push((base, vec![member]));
                }
            }
            Err(relation) => passthrough.push(MergedRelation::single(relation)),
        }
    }

    let mut out = Vec::new();
    for (base, members) in groups {
        if members.len() > 1 && mergeable(&members) {
            debug!("merging {} plans over a shared base relation", members.len());
            out.push(merge_group(catalog, base, members)?);
        } else {
            for member in members {
                out.push(rebuild_single(catalog, base.clone(), member)?);
            }
        }
    }
    out.extend(passthrough);
    Ok(out)
}

fn rebuild_single(
    catalog: &Catalog,
    base: RelationalExpr,
    member: Member,
) -> Result<MergedRelation> {
    let selected = RelationalExpr::select(catalog, base, member.predicate)?;
    let expr = RelationalExpr::project(catalog, selected, member.projections)?;
    Ok(MergedRelation {
        expr,
        bindings: vec![member.binding],
        duplicate_free: member.duplicate_free,
        unsupported: member.unsupported,
    })
}
