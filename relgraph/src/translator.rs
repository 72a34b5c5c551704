/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The graph pattern translator.
//!
//! Takes a basic graph pattern and the bridge pool, and produces every
//! self-consistent relational plan that satisfies all triple patterns
//! simultaneously. Candidate bridges are selected per pattern, pruned by
//! specificity against the pattern's fixed terms, and combined as a
//! cartesian product; each combination is validated through one constraint
//! builder per shared variable and assembled into an aliased join with the
//! merged predicates as a selection.
//!
//! Combinations are independent pure computations and are evaluated in
//! parallel.

use std::collections::BTreeMap;

use log::{debug, trace};
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use shared::terms::{PatternTerm, TriplePattern, TriplePosition, Variable};

use crate::algebra::{Expr, Projection, RelationalExpr, Renamer};
use crate::constraint::NodeSetConstraintBuilder;
use crate::context::TranslationContext;
use crate::error::{RelgraphError, Result};
use crate::makers::{BindingMaker, NodeMaker, NodeRelation, TripleRelation, ValueMaker};
use crate::schema::Catalog;

/// How strongly a maker pins down a fixed term. Fixed terms beat structured
/// sources, structured sources beat generic columns; once a more specific
/// bridge matches a fixed term, the generic ones are pruned.
fn specificity(maker: &NodeMaker) -> u8 {
    match maker {
        NodeMaker::Fixed(_) => 3,
        NodeMaker::Typed { maker, .. } => match maker {
            ValueMaker::Template(_) | ValueMaker::CompositeId(_) | ValueMaker::Constant(_) => 2,
            ValueMaker::Column(_) | ValueMaker::Expression { .. } => 1,
        },
        NodeMaker::Empty => 0,
    }
}

pub struct GraphPatternTranslator<'a> {
    catalog: &'a Catalog,
    bridges: &'a [TripleRelation],
}

impl<'a> GraphPatternTranslator<'a> {
    pub fn new(catalog: &'a Catalog, bridges: &'a [TripleRelation]) -> Self {
        GraphPatternTranslator { catalog, bridges }
    }

    /// Translate a basic graph pattern into the set of relational plans
    /// that jointly cover it. An empty result means the pattern cannot
    /// match anything.
    pub fn translate(
        &self,
        patterns: &[TriplePattern],
        ctx: &TranslationContext,
    ) -> Result<Vec<NodeRelation>> {
        if patterns.is_empty() {
            return Ok(vec![NodeRelation::unit()]);
        }

        let mut candidates: Vec<Vec<&TripleRelation>> = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let selected = self.candidates_for(pattern);
            trace!(
                "pattern {:?}: {} candidate bridge(s)",
                pattern,
                selected.len()
            );
            if selected.is_empty() {
                debug!("no bridge matches pattern {:?}; pattern is empty", pattern);
                return Ok(Vec::new());
            }
            candidates.push(selected);
        }

        let mut total: usize = 1;
        for list in &candidates {
            total = total
                .checked_mul(list.len())
                .ok_or(RelgraphError::TooManyCombinations)?;
        }

        let results: Vec<Option<NodeRelation>> = (0..total)
            .into_par_iter()
            .map(|index| {
                let combination = pick_combination(&candidates, index);
                self.evaluate_combination(patterns, &combination, ctx)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        for relation in results.into_iter().flatten() {
            if seen.insert(relation.expr.clone()) {
                out.push(relation);
            }
        }
        Ok(out)
    }

    /// Bridges not provably incompatible with the pattern's fixed terms,
    /// pruned per fixed position to the most specific match.
    fn candidates_for(&self, pattern: &TriplePattern) -> Vec<&'a TripleRelation> {
        let mut candidates: Vec<&TripleRelation> = self
            .bridges
            .iter()
            .filter(|bridge| self.matches_fixed_terms(bridge, pattern))
            .collect();

        for position in TriplePosition::ALL {
            if pattern.term_at(position).is_var() {
                continue;
            }
            let best = candidates
                .iter()
                .map(|bridge| specificity(bridge.maker_at(position)))
                .max()
                .unwrap_or(0);
            candidates.retain(|bridge| specificity(bridge.maker_at(position)) == best);
        }
        candidates
    }

    /// Cheap per-position pre-filter, without cross-pattern sharing.
    fn matches_fixed_terms(&self, bridge: &TripleRelation, pattern: &TriplePattern) -> bool {
        for position in TriplePosition::ALL {
            if let PatternTerm::Term(term) = pattern.term_at(position) {
                let mut builder = NodeSetConstraintBuilder::new();
                builder.restrict_to_node_maker(bridge.maker_at(position));
                builder.restrict_to_fixed_term(term);
                if builder.is_empty() {
                    return false;
                }
            }
        }
        true
    }

    /// Evaluate one per-pattern choice of bridges. `Ok(None)` means the
    /// combination is unsatisfiable and silently dropped.
    fn evaluate_combination(
        &self,
        patterns: &[TriplePattern],
        combination: &[&TripleRelation],
        ctx: &TranslationContext,
    ) -> Result<Option<NodeRelation>> {
        ctx.count_considered();

        // Each table instance across the combination gets its own alias
        // index, so the same bridge chosen for two patterns self-joins as
        // two instances and a bridge that already self-joins keeps its
        // instances apart.
        let mut operands = Vec::with_capacity(combination.len());
        let mut makers: Vec<[NodeMaker; 3]> = Vec::with_capacity(combination.len());
        let mut unsupported = false;
        let mut next_alias: u32 = 1;
        for bridge in combination {
            let tables = bridge.expr.tables();
            let renamer = Renamer::prefixing(tables.iter().cloned(), next_alias);
            next_alias += tables.len() as u32;
            operands.push(renamer.apply(&bridge.expr));
            let rename = |c: &crate::algebra::Column| renamer.rename_column(c);
            makers.push([
                bridge.subject.rewrite_columns(&rename),
                bridge.predicate.rewrite_columns(&rename),
                bridge.object.rewrite_columns(&rename),
            ]);
        }

        let mut conjuncts: Vec<Expr> = Vec::new();
        let mut var_builders: BTreeMap<&Variable, NodeSetConstraintBuilder> = BTreeMap::new();
        let mut var_makers: BTreeMap<Variable, NodeMaker> = BTreeMap::new();

        for (occurrence, pattern) in patterns.iter().enumerate() {
            for (slot, position) in TriplePosition::ALL.into_iter().enumerate() {
                let maker = &makers[occurrence][slot];
                match pattern.term_at(position) {
                    PatternTerm::Var(variable) => {
                        var_builders
                            .entry(variable)
                            .or_default()
                            .restrict_to_node_maker(maker);
                        var_makers
                            .entry(variable.clone())
                            .or_insert_with(|| maker.clone());
                    }
                    PatternTerm::Term(term) => {
                        let mut builder = NodeSetConstraintBuilder::new();
                        builder.restrict_to_node_maker(maker);
                        builder.restrict_to_fixed_term(term);
                        if builder.is_empty() {
                            ctx.count_dropped();
                            return Ok(None);
                        }
                        let constraint = builder.constraint(self.catalog)?;
                        if builder.is_empty() || constraint.is_false() {
                            ctx.count_dropped();
                            return Ok(None);
                        }
                        if builder.is_unsupported() {
                            ctx.count_unsupported();
                            unsupported = true;
                        }
                        conjuncts.push(constraint);
                    }
                }
            }
        }

        for builder in var_builders.values_mut() {
            if builder.is_empty() {
                ctx.count_dropped();
                return Ok(None);
            }
            let constraint = builder.constraint(self.catalog)?;
            if builder.is_empty() || constraint.is_false() {
                ctx.count_dropped();
                return Ok(None);
            }
            if builder.is_unsupported() {
                ctx.count_unsupported();
                unsupported = true;
            }
            conjuncts.push(constraint);
        }

        let joined = RelationalExpr::join(self.catalog, operands, [])?;
        let selected =
            RelationalExpr::select(self.catalog, joined, Expr::conjunction(conjuncts))?;
        if selected.is_empty_relation() {
            ctx.count_dropped();
            return Ok(None);
        }

        let mut projections: Vec<Projection> = Vec::new();
        for maker in var_makers.values() {
            projections.extend(maker.projections());
        }
        let projected = RelationalExpr::project(self.catalog, selected, projections)?;

        let duplicate_free = combination.iter().all(|b| b.duplicate_free)
            && var_makers.values().all(|m| m.is_unique());
        let binding = BindingMaker::new(var_makers);
        Ok(Some(
            NodeRelation::new(projected, binding, duplicate_free).with_unsupported(unsupported),
        ))
    }
}

/// Decode a combination index into one candidate per pattern (mixed radix).
fn pick_combination<'b, 'a>(
    candidates: &'b [Vec<&'a TripleRelation>],
    mut index: usize,
) -> Vec<&'a TripleRelation> {
    let mut combination = Vec::with_capacity(candidates.len());
    for list in candidates {
        combination.push(list[index % list.len()]);
        index /= list.len();
    }
    combination
}
