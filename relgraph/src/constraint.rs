/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The node-set constraint builder.
//!
//! One builder accumulates every restriction on a single term-producing
//! slot: the term kind, a fixed value, and all sources (columns, templates,
//! composite ids, expressions) bound to the slot across patterns. Facts are
//! stored in sets and contradictions fire on insertion, so applying the same
//! facts in any order reaches the same final state.
//!
//! `is_empty` means proven unsatisfiable: the caller drops the combination
//! without executing SQL. `is_unsupported` (meaningful after `constraint`)
//! means the joint restriction could not be fully expressed relationally;
//! the best available predicate is still emitted and the caller should
//! surface a warning rather than fail.

use std::collections::BTreeSet;

use log::{debug, warn};
use shared::terms::{RdfTerm, TermKind};

use crate::algebra::{Column, Expr, SqlLiteral};
use crate::error::Result;
use crate::makers::{CompositeId, NodeMaker, Template, ValueMaker};
use crate::schema::Catalog;

/// The three structural families a slot can be confined to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeClass {
    Uri,
    Blank,
    Literal,
}

fn class_of(kind: &TermKind) -> NodeClass {
    match kind {
        TermKind::Uri => NodeClass::Uri,
        TermKind::BlankNode => NodeClass::Blank,
        TermKind::PlainLiteral | TermKind::LangLiteral(_) | TermKind::TypedLiteral(_) => {
            NodeClass::Literal
        }
    }
}

fn literal_shape(kind: &TermKind) -> Option<(Option<String>, Option<String>)> {
    match kind {
        TermKind::PlainLiteral => Some((None, None)),
        TermKind::LangLiteral(lang) => Some((Some(lang.clone()), None)),
        TermKind::TypedLiteral(dt) => Some((None, Some(dt.clone()))),
        _ => None,
    }
}

#[derive(Debug, Clone, Default)]
pub struct NodeSetConstraintBuilder {
    empty: bool,
    unsupported: bool,
    class: Option<NodeClass>,
    shape: Option<(Option<String>, Option<String>)>,
    value: Option<String>,
    columns: BTreeSet<Column>,
    templates: BTreeSet<Template>,
    composite_ids: BTreeSet<CompositeId>,
    expressions: BTreeSet<(String, Expr)>,
}

impl NodeSetConstraintBuilder {
    pub fn new() -> Self {
        NodeSetConstraintBuilder::default()
    }

    fn fail(&mut self, why: &str) {
        if !self.empty {
            debug!("node set unsatisfiable: {}", why);
        }
        self.empty = true;
    }

    /// True once any contradiction fired; short-circuits downstream work.
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// Only meaningful after `constraint` has run at least once.
    pub fn is_unsupported(&self) -> bool {
        self.unsupported
    }

    pub fn restrict_to_kind(&mut self, kind: &TermKind) {
        if self.empty {
            return;
        }
        let class = class_of(kind);
        match self.class {
            None => self.class = Some(class),
            Some(existing) if existing != class => {
                return self.fail("conflicting term kinds");
            }
            Some(_) => {}
        }
        if let Some(shape) = literal_shape(kind) {
            self.restrict_to_literal_shape(shape.0, shape.1);
        }
    }

    pub fn restrict_to_literal_shape(
        &mut self,
        language: Option<String>,
        datatype: Option<String>,
    ) {
        if self.empty {
            return;
        }
        let shape = (language, datatype);
        match &self.shape {
            None => self.shape = Some(shape),
            Some(existing) if *existing != shape => {
                self.fail("conflicting literal language/datatype");
            }
            Some(_) => {}
        }
    }

    pub fn restrict_to_fixed_term(&mut self, term: &RdfTerm) {
        self.restrict_to_kind(&TermKind::of(term));
        self.restrict_to_value(term.lexical_form());
    }

    pub fn restrict_to_value(&mut self, value: &str) {
        if self.empty {
            return;
        }
        match &self.value {
            Some(existing) if existing != value => {
                return self.fail("two different fixed values");
            }
            Some(_) => return,
            None => {}
        }
        // Re-check the required value against every structured source
        // recorded so far; the symmetric check runs on source insertion.
        if self.templates.iter().any(|t| !t.could_fit(value)) {
            return self.fail("fixed value does not fit a template");
        }
        if self.composite_ids.iter().any(|id| !id.could_fit(value)) {
            return self.fail("fixed value does not fit a composite id");
        }
        self.value = Some(value.to_string());
    }

    pub fn restrict_to_column(&mut self, column: Column) {
        if self.empty {
            return;
        }
        self.columns.insert(column);
    }

    pub fn restrict_to_template(&mut self, template: Template) {
        if self.empty {
            return;
        }
        if let Some(value) = &self.value {
            if !template.could_fit(value) {
                return self.fail("fixed value does not fit a template");
            }
        }
        if self
            .templates
            .iter()
            .any(|existing| !existing.affix_compatible(&template))
        {
            return self.fail("templates with incompatible literal affixes");
        }
        self.templates.insert(template);
    }

    pub fn restrict_to_composite_id(&mut self, id: CompositeId) {
        if self.empty {
            return;
        }
        if let Some(value) = &self.value {
            if !id.could_fit(value) {
                return self.fail("fixed value does not fit a composite id");
            }
        }
        if self
            .composite_ids
            .iter()
            .any(|existing| !existing.same_shape(&id))
        {
            // Different prefix or arity can never produce equal identifiers.
            return self.fail("composite ids of different shapes");
        }
        self.composite_ids.insert(id);
    }

    pub fn restrict_to_expression(&mut self, name: String, expr: Expr) {
        if self.empty {
            return;
        }
        self.expressions.insert((name, expr));
    }

    /// Merge in everything a node maker says about this slot.
    pub fn restrict_to_node_maker(&mut self, maker: &NodeMaker) {
        match maker {
            NodeMaker::Empty => self.fail("empty node maker"),
            NodeMaker::Fixed(term) => self.restrict_to_fixed_term(term),
            NodeMaker::Typed { kind, maker, .. } => {
                self.restrict_to_kind(kind);
                match maker {
                    ValueMaker::Column(c) => self.restrict_to_column(c.clone()),
                    ValueMaker::Template(t) => self.restrict_to_template(t.clone()),
                    ValueMaker::CompositeId(id) => self.restrict_to_composite_id(id.clone()),
                    ValueMaker::Constant(v) => self.restrict_to_value(v),
                    ValueMaker::Expression { name, expr } => {
                        self.restrict_to_expression(name.clone(), expr.clone())
                    }
                }
            }
        }
    }

    /// Emit the predicate enforcing all accumulated facts jointly.
    ///
    /// Same-category sources are chained pairwise (equality is transitive,
    /// so consecutive pairs over the sorted sets suffice and the output is
    /// order-independent); one representative per category is then chained
    /// across categories. A fixed value pins every source through its
    /// `value_expression`.
    pub fn constraint(&mut self, catalog: &Catalog) -> Result<Expr> {
        if self.empty {
            return Ok(Expr::False);
        }
        let mut conjuncts: Vec<Expr> = Vec::new();

        if let Some(value) = self.value.clone() {
            for column in &self.columns {
                match catalog.to_literal(column, &value)? {
                    Some(literal) => conjuncts.push(Expr::equality(
                        Expr::Column(column.clone()),
                        Expr::Literal(literal),
                    )),
                    None => {
                        self.fail("fixed value not representable in column type");
                        return Ok(Expr::False);
                    }
                }
            }
            for template in &self.templates {
                let expr = template.value_expression(&value, catalog)?;
                if expr.is_false() {
                    self.fail("fixed value does not reverse-match a template");
                    return Ok(Expr::False);
                }
                conjuncts.push(expr);
            }
            for id in &self.composite_ids {
                let expr = id.value_expression(&value, catalog)?;
                if expr.is_false() {
                    self.fail("fixed value does not reverse-match a composite id");
                    return Ok(Expr::False);
                }
                conjuncts.push(expr);
            }
            for (_, expr) in &self.expressions {
                conjuncts.push(Expr::equality(
                    expr.clone(),
                    Expr::Literal(SqlLiteral::new(format!(
                        "'{}'",
                        value.replace('\'', "''")
                    ))),
                ));
            }
        }

        let columns: Vec<&Column> = self.columns.iter().collect();
        for pair in columns.windows(2) {
            if !catalog.compatible(pair[0], pair[1])? {
                self.fail("columns with incompatible formats");
                return Ok(Expr::False);
            }
            conjuncts.push(Expr::column_equality(pair[0].clone(), pair[1].clone()));
        }

        let templates: Vec<&Template> = self.templates.iter().collect();
        for pair in templates.windows(2) {
            if pair[0].structurally_equal(pair[1]) {
                for (a, b) in pair[0].columns().iter().zip(pair[1].columns()) {
                    if !catalog.compatible(a, b)? {
                        self.fail("template columns with incompatible formats");
                        return Ok(Expr::False);
                    }
                    conjuncts.push(Expr::column_equality(a.clone(), b.clone()));
                }
            } else {
                let (left, left_approx) = pair[0].sql_expr();
                let (right, right_approx) = pair[1].sql_expr();
                if left_approx || right_approx {
                    self.unsupported = true;
                    warn!(
                        "equating structurally different templates through a \
                         non-invertible column function; emitting best-effort SQL"
                    );
                }
                conjuncts.push(Expr::equality(left, right));
            }
        }

        let ids: Vec<&CompositeId> = self.composite_ids.iter().collect();
        for pair in ids.windows(2) {
            for (a, b) in pair[0].columns.iter().zip(&pair[1].columns) {
                if !catalog.compatible(a, b)? {
                    self.fail("composite id columns with incompatible formats");
                    return Ok(Expr::False);
                }
                conjuncts.push(Expr::column_equality(a.clone(), b.clone()));
            }
        }

        let expressions: Vec<&(String, Expr)> = self.expressions.iter().collect();
        for pair in expressions.windows(2) {
            conjuncts.push(Expr::equality(pair[0].1.clone(), pair[1].1.clone()));
        }

        // One representative per category, chained across categories.
        let mut representatives: Vec<Expr> = Vec::new();
        if let Some(column) = self.columns.iter().next() {
            representatives.push(Expr::Column(column.clone()));
        }
        if let Some(template) = self.templates.iter().next() {
            let (expr, approx) = template.sql_expr();
            if approx && (self.columns.len() + self.composite_ids.len() + self.expressions.len())
                > 0
            {
                self.unsupported = true;
                warn!(
                    "equating a template using a non-SQL column function with \
                     another source; emitting best-effort SQL"
                );
            }
            representatives.push(expr);
        }
        if let Some(id) = self.composite_ids.iter().next() {
            representatives.push(id.sql_expr());
        }
        if let Some((_, expr)) = self.expressions.iter().next() {
            representatives.push(expr.clone());
        }
        for pair in representatives.windows(2) {
            conjuncts.push(Expr::equality(pair[0].clone(), pair[1].clone()));
        }

        let constraint = Expr::conjunction(conjuncts);
        if constraint.is_false() {
            self.fail("constraint folded to false");
        }
        Ok(constraint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DataType;

    fn permutations(n: usize) -> Vec<Vec<usize>> {
        if n == 0 {
            return vec![Vec::new()];
        }
        let mut out = Vec::new();
        for rest in permutations(n - 1) {
            for slot in 0..=rest.len() {
                let mut p = rest.clone();
                p.insert(slot, n - 1);
                out.push(p);
            }
        }
        out
    }

    fn mixed_catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.add_table(
            "t",
            [
                ("a", DataType::Text, false),
                ("b", DataType::Text, false),
                ("c", DataType::Text, false),
            ],
        );
        catalog
    }

    #[test]
    fn mixed_restrictions_commute() {
        let catalog = mixed_catalog();
        // Value, template, column and composite id, all mutually
        // satisfiable; every ordering must reach the same state and emit
        // the same predicate.
        let steps: Vec<Box<dyn Fn(&mut NodeSetConstraintBuilder)>> = vec![
            Box::new(|b: &mut NodeSetConstraintBuilder| b.restrict_to_value("people@@7")),
            Box::new(|b: &mut NodeSetConstraintBuilder| {
                b.restrict_to_template(Template::parse("people@@{t.a}").unwrap())
            }),
            Box::new(|b: &mut NodeSetConstraintBuilder| {
                b.restrict_to_column(Column::new("t", "b"))
            }),
            Box::new(|b: &mut NodeSetConstraintBuilder| {
                b.restrict_to_composite_id(CompositeId::new(
                    "people",
                    vec![Column::new("t", "c")],
                ))
            }),
        ];

        let mut reference: Option<(bool, Expr)> = None;
        for order in permutations(steps.len()) {
            let mut builder = NodeSetConstraintBuilder::new();
            for &i in &order {
                steps[i](&mut builder);
            }
            let constraint = builder.constraint(&catalog).unwrap();
            let outcome = (builder.is_empty(), constraint);
            match &reference {
                None => reference = Some(outcome),
                Some(expected) => assert_eq!(&outcome, expected, "order {:?}", order),
            }
        }
        assert!(!reference.unwrap().0);
    }

    #[test]
    fn mixed_restrictions_commute_when_unsatisfiable() {
        let catalog = mixed_catalog();
        // The fixed value never fits the composite id prefix, whichever
        // restriction lands first.
        let steps: Vec<Box<dyn Fn(&mut NodeSetConstraintBuilder)>> = vec![
            Box::new(|b: &mut NodeSetConstraintBuilder| b.restrict_to_value("people@@7")),
            Box::new(|b: &mut NodeSetConstraintBuilder| {
                b.restrict_to_column(Column::new("t", "b"))
            }),
            Box::new(|b: &mut NodeSetConstraintBuilder| {
                b.restrict_to_composite_id(CompositeId::new(
                    "groups",
                    vec![Column::new("t", "c")],
                ))
            }),
        ];
        for order in permutations(steps.len()) {
            let mut builder = NodeSetConstraintBuilder::new();
            for &i in &order {
                steps[i](&mut builder);
            }
            assert!(builder.is_empty(), "order {:?}", order);
            assert_eq!(builder.constraint(&catalog).unwrap(), Expr::False);
        }
    }

    #[test]
    fn conflicting_kinds_empty_in_any_order() {
        let uri = TermKind::Uri;
        let lit = TermKind::PlainLiteral;
        for (a, b) in [(&uri, &lit), (&lit, &uri)] {
            let mut builder = NodeSetConstraintBuilder::new();
            builder.restrict_to_kind(a);
            assert!(!builder.is_empty());
            builder.restrict_to_kind(b);
            assert!(builder.is_empty());
        }
    }

    #[test]
    fn conflicting_datatypes_empty() {
        let mut builder = NodeSetConstraintBuilder::new();
        builder.restrict_to_kind(&TermKind::TypedLiteral("xsd:int".to_string()));
        builder.restrict_to_kind(&TermKind::TypedLiteral("xsd:date".to_string()));
        assert!(builder.is_empty());
    }

    #[test]
    fn composite_ids_of_different_prefixes_empty() {
        let mut builder = NodeSetConstraintBuilder::new();
        builder.restrict_to_composite_id(CompositeId::new(
            "map1",
            vec![Column::new("t", "a")],
        ));
        builder.restrict_to_composite_id(CompositeId::new(
            "map2",
            vec![Column::new("t", "a")],
        ));
        assert!(builder.is_empty());
    }
}
