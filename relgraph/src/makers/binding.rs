/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Binding makers and the relation/maker pairs that travel together.
//!
//! A `NodeRelation` couples a relational plan with the binding maker that
//! decodes its rows. The two must always be renamed together; the translator
//! guarantees this by applying every `Renamer` to both sides in one place.

use std::collections::{BTreeMap, BTreeSet};

use shared::terms::{Binding, TriplePosition, Variable};

use crate::algebra::{Column, Projection, RelationalExpr};
use crate::makers::node::NodeMaker;
use crate::makers::row::ResultRow;

/// Decodes one result row into a binding, or nothing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BindingMaker {
    makers: BTreeMap<Variable, NodeMaker>,
    /// Row key that must be truthy for the row to produce a binding at all.
    /// Set by condition merging to the member's indicator column.
    gate: Option<String>,
}

impl BindingMaker {
    pub fn new(makers: impl IntoIterator<Item = (Variable, NodeMaker)>) -> Self {
        BindingMaker {
            makers: makers.into_iter().collect(),
            gate: None,
        }
    }

    pub fn with_gate(mut self, gate: impl Into<String>) -> Self {
        self.gate = Some(gate.into());
        self
    }

    pub fn gate(&self) -> Option<&str> {
        self.gate.as_deref()
    }

    pub fn maker(&self, variable: &Variable) -> Option<&NodeMaker> {
        self.makers.get(variable)
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.makers.keys()
    }

    /// A row is discarded when its gate is not truthy or any maker yields
    /// no term.
    pub fn make_binding(&self, row: &ResultRow) -> Option<Binding> {
        if let Some(gate) = &self.gate {
            if !row.is_truthy(gate) {
                return None;
            }
        }
        let mut binding = Binding::new();
        for (variable, maker) in &self.makers {
            let term = maker.make_term(row)?;
            binding.insert(variable.clone(), term);
        }
        Some(binding)
    }

    pub fn columns(&self) -> BTreeSet<Column> {
        self.makers.values().flat_map(|m| m.columns()).collect()
    }

    pub fn projections(&self) -> BTreeSet<Projection> {
        self.makers.values().flat_map(|m| m.projections()).collect()
    }

    pub fn rewrite_columns(&self, rename: &impl Fn(&Column) -> Column) -> BindingMaker {
        BindingMaker {
            makers: self
                .makers
                .iter()
                .map(|(v, m)| (v.clone(), m.rewrite_columns(rename)))
                .collect(),
            gate: self.gate.clone(),
        }
    }

    /// The same maker with the gate stripped; used as the grouping identity
    /// of condition merging.
    pub fn without_gate(&self) -> BindingMaker {
        BindingMaker {
            makers: self.makers.clone(),
            gate: None,
        }
    }
}

/// A relational plan plus the maker decoding its rows.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeRelation {
    pub expr: RelationalExpr,
    pub binding: BindingMaker,
    /// Whether the plan is known not to return duplicate rows.
    pub duplicate_free: bool,
    /// Whether some joint constraint could only be approximated in SQL.
    /// Such a plan over-selects; the caller may drop it instead of
    /// executing possibly-incorrect SQL.
    pub unsupported: bool,
}

impl NodeRelation {
    pub fn new(expr: RelationalExpr, binding: BindingMaker, duplicate_free: bool) -> Self {
        NodeRelation {
            expr,
            binding,
            duplicate_free,
            unsupported: false,
        }
    }

    pub fn with_unsupported(mut self, unsupported: bool) -> Self {
        self.unsupported = unsupported;
        self
    }

    /// The unit relation: one row, no columns, empty binding. The result of
    /// translating an empty pattern.
    pub fn unit() -> Self {
        NodeRelation {
            expr: RelationalExpr::True,
            binding: BindingMaker::default(),
            duplicate_free: true,
            unsupported: false,
        }
    }
}

/// A bridge: one relational query shape mapped to a family of triples.
/// Bridges are built once from the mapping and reused across queries.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TripleRelation {
    pub expr: RelationalExpr,
    pub subject: NodeMaker,
    pub predicate: NodeMaker,
    pub object: NodeMaker,
    /// Whether `expr` is duplicate-free (its projected columns contain a
    /// unique key of every participating table).
    pub duplicate_free: bool,
}

impl TripleRelation {
    pub fn new(
        expr: RelationalExpr,
        subject: NodeMaker,
        predicate: NodeMaker,
        object: NodeMaker,
        duplicate_free: bool,
    ) -> Self {
        TripleRelation {
            expr,
            subject,
            predicate,
            object,
            duplicate_free,
        }
    }

    pub fn maker_at(&self, position: TriplePosition) -> &NodeMaker {
        match position {
            TriplePosition::Subject => &self.subject,
            TriplePosition::Predicate => &self.predicate,
            TriplePosition::Object => &self.object,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::makers::value::ValueMaker;
    use shared::terms::{RdfTerm, TermKind};

    #[test]
    fn null_column_discards_the_whole_binding() {
        let maker = BindingMaker::new([
            (
                Variable::new("x"),
                NodeMaker::typed(
                    TermKind::PlainLiteral,
                    ValueMaker::Column(Column::new("t", "a")),
                ),
            ),
            (
                Variable::new("y"),
                NodeMaker::fixed(RdfTerm::uri("http://ex.org/c")),
            ),
        ]);
        let mut row = ResultRow::new();
        row.set_column(&Column::new("t", "a"), None);
        assert!(maker.make_binding(&row).is_none());

        row.set_column(&Column::new("t", "a"), Some("v"));
        let binding = maker.make_binding(&row).unwrap();
        assert_eq!(binding[&Variable::new("x")], RdfTerm::plain("v"));
    }

    #[test]
    fn gate_discards_rows() {
        let maker = BindingMaker::new([(
            Variable::new("x"),
            NodeMaker::fixed(RdfTerm::uri("http://ex.org/c")),
        )])
        .with_gate("cond_0");
        let mut row = ResultRow::new();
        row.set("cond_0", Some("0".to_string()));
        assert!(maker.make_binding(&row).is_none());
        row.set("cond_0", Some("1".to_string()));
        assert!(maker.make_binding(&row).is_some());
    }
}
