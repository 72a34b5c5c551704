/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

extern crate relgraph;
use relgraph::algebra::{Column, Expr, Projection, RelationalExpr, SqlLiteral, TableRef};
use relgraph::context::TranslationContext;
use relgraph::makers::{
    BindingMaker, NodeMaker, NodeRelation, ResultRow, Template, TripleRelation, ValueMaker,
};
use relgraph::optimizer::{eliminate_joins, merge_conditions, optimize};
use relgraph::schema::{Catalog, DataType};
use relgraph::translator::GraphPatternTranslator;
use shared::terms::{PatternTerm, RdfTerm, TermKind, TriplePattern, Variable};

const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
const EX_PERSON: &str = "http://example.org/terms#Person";
const EX_NAME: &str = "http://example.org/terms#name";
const EX_AUTHOR: &str = "http://example.org/terms#author";

fn setup_catalog() -> Catalog {
    let mut catalog = Catalog::new();
    catalog
        .add_table(
            "papers",
            [
                ("paper_id", DataType::Integer, false),
                ("year", DataType::Integer, true),
                ("published", DataType::Boolean, false),
            ],
        )
        .add_table(
            "persons",
            [
                ("per_id", DataType::Integer, false),
                ("name", DataType::Text, true),
            ],
        )
        .add_table(
            "rel_person_paper",
            [
                ("per_id", DataType::Integer, false),
                ("paper_id", DataType::Integer, false),
            ],
        )
        .add_unique_key("papers", ["paper_id"])
        .add_unique_key("persons", ["per_id"])
        .add_foreign_key(
            Column::new("rel_person_paper", "per_id"),
            Column::new("persons", "per_id"),
        );
    catalog
}

fn paper_uri(table: &str) -> ValueMaker {
    let text = format!("http://example.org/papers/{{{}.paper_id}}", table);
    ValueMaker::Template(Template::parse(&text).unwrap())
}

fn person_uri(table: &str) -> ValueMaker {
    let text = format!("http://example.org/persons/{{{}.per_id}}", table);
    ValueMaker::Template(Template::parse(&text).unwrap())
}

fn setup_bridges(catalog: &Catalog) -> Vec<TripleRelation> {
    let persons = RelationalExpr::table(catalog, "persons").unwrap();
    let rel = RelationalExpr::table(catalog, "rel_person_paper").unwrap();

    vec![
        TripleRelation::new(
            persons.clone(),
            NodeMaker::typed_unique(TermKind::Uri, person_uri("persons")),
            NodeMaker::fixed(RdfTerm::uri(RDF_TYPE)),
            NodeMaker::fixed(RdfTerm::uri(EX_PERSON)),
            true,
        ),
        TripleRelation::new(
            persons,
            NodeMaker::typed_unique(TermKind::Uri, person_uri("persons")),
            NodeMaker::fixed(RdfTerm::uri(EX_NAME)),
            NodeMaker::typed(
                TermKind::PlainLiteral,
                ValueMaker::Column(Column::new("persons", "name")),
            ),
            true,
        ),
        TripleRelation::new(
            rel,
            NodeMaker::typed(TermKind::Uri, paper_uri("rel_person_paper")),
            NodeMaker::fixed(RdfTerm::uri(EX_AUTHOR)),
            NodeMaker::typed(TermKind::Uri, person_uri("rel_person_paper")),
            true,
        ),
    ]
}

/// A translated plan over the papers table with one extra predicate, the
/// raw material of condition merging.
fn paper_plan(catalog: &Catalog, variable: &str, predicate: Expr) -> NodeRelation {
    let base = RelationalExpr::table(catalog, "papers").unwrap();
    let selected = RelationalExpr::select(catalog, base, predicate).unwrap();
    let projections = [Projection::Column(Column::new("papers", "paper_id"))];
    let expr = RelationalExpr::project(catalog, selected, projections).unwrap();
    let binding = BindingMaker::new([(
        Variable::new(variable),
        NodeMaker::typed_unique(TermKind::Uri, paper_uri("papers")),
    )]);
    NodeRelation::new(expr, binding, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreign_key_join_is_eliminated() {
        let catalog = setup_catalog();
        let bridges = setup_bridges(&catalog);
        let translator = GraphPatternTranslator::new(&catalog, &bridges);
        let ctx = TranslationContext::new();

        // The persons occurrence only contributes its key, which the
        // linking table already carries.
        let patterns = [
            TriplePattern::new(
                PatternTerm::var("p"),
                PatternTerm::Term(RdfTerm::uri(EX_AUTHOR)),
                PatternTerm::var("a"),
            ),
            TriplePattern::new(
                PatternTerm::var("a"),
                PatternTerm::Term(RdfTerm::uri(RDF_TYPE)),
                PatternTerm::Term(RdfTerm::uri(EX_PERSON)),
            ),
        ];
        let relations = translator.translate(&patterns, &ctx).unwrap();
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].expr.tables().len(), 2);

        let reduced = eliminate_joins(&catalog, relations[0].clone()).unwrap();
        assert_eq!(
            reduced.expr.tables(),
            [TableRef::aliased("rel_person_paper", 1)].into()
        );

        // The binding still decodes, now entirely from the linking table.
        let mut row = ResultRow::new();
        let rel = TableRef::aliased("rel_person_paper", 1);
        row.set_column(&Column::with_table(rel.clone(), "paper_id"), Some("3"));
        row.set_column(&Column::with_table(rel, "per_id"), Some("5"));
        let binding = reduced.binding.make_binding(&row).unwrap();
        assert_eq!(
            binding[&Variable::new("a")],
            RdfTerm::uri("http://example.org/persons/5")
        );
    }

    #[test]
    fn test_join_kept_when_other_columns_are_needed() {
        let catalog = setup_catalog();
        let bridges = setup_bridges(&catalog);
        let translator = GraphPatternTranslator::new(&catalog, &bridges);
        let ctx = TranslationContext::new();

        // The name column lives on persons, so the join must stay.
        let patterns = [
            TriplePattern::new(
                PatternTerm::var("p"),
                PatternTerm::Term(RdfTerm::uri(EX_AUTHOR)),
                PatternTerm::var("a"),
            ),
            TriplePattern::new(
                PatternTerm::var("a"),
                PatternTerm::Term(RdfTerm::uri(EX_NAME)),
                PatternTerm::var("n"),
            ),
        ];
        let relations = translator.translate(&patterns, &ctx).unwrap();
        assert_eq!(relations.len(), 1);

        let reduced = eliminate_joins(&catalog, relations[0].clone()).unwrap();
        assert_eq!(reduced.expr.tables().len(), 2);
    }

    #[test]
    fn test_condition_merge_gates_bindings() {
        let catalog = setup_catalog();
        let published = Expr::equality(
            Expr::Column(Column::new("papers", "published")),
            Expr::Literal(SqlLiteral::new("TRUE")),
        );
        let recent = Expr::equality(
            Expr::Column(Column::new("papers", "year")),
            Expr::Literal(SqlLiteral::new("2024")),
        );
        let first = paper_plan(&catalog, "p", published);
        let second = paper_plan(&catalog, "q", recent);

        let merged = merge_conditions(&catalog, vec![first, second]).unwrap();
        assert_eq!(merged.len(), 1);
        let merged = &merged[0];
        assert_eq!(merged.bindings.len(), 2);
        assert_eq!(merged.bindings[0].gate(), Some("cond_0"));
        assert_eq!(merged.bindings[1].gate(), Some("cond_1"));

        // A row satisfying only the first member decodes only there.
        let mut row = ResultRow::new();
        row.set_column(&Column::new("papers", "paper_id"), Some("3"));
        row.set("cond_0", Some("1".to_string()));
        row.set("cond_1", Some("0".to_string()));
        let binding = merged.bindings[0].make_binding(&row).unwrap();
        assert_eq!(
            binding[&Variable::new("p")],
            RdfTerm::uri("http://example.org/papers/3")
        );
        assert!(merged.bindings[1].make_binding(&row).is_none());
    }

    #[test]
    fn test_plans_over_different_bases_stay_apart() {
        let catalog = setup_catalog();
        let published = Expr::equality(
            Expr::Column(Column::new("papers", "published")),
            Expr::Literal(SqlLiteral::new("TRUE")),
        );
        let paper = paper_plan(&catalog, "p", published);

        let persons = RelationalExpr::table(&catalog, "persons").unwrap();
        let projections = [Projection::Column(Column::new("persons", "per_id"))];
        let expr = RelationalExpr::project(&catalog, persons, projections).unwrap();
        let person = NodeRelation::new(
            expr,
            BindingMaker::new([(
                Variable::new("a"),
                NodeMaker::typed_unique(TermKind::Uri, person_uri("persons")),
            )]),
            true,
        );

        let merged = merge_conditions(&catalog, vec![paper, person]).unwrap();
        assert_eq!(merged.len(), 2);
        assert!(merged.iter().all(|m| m.bindings.len() == 1));
    }

    #[test]
    fn test_unsupported_flag_survives_the_pipeline() {
        let catalog = setup_catalog();
        let published = Expr::equality(
            Expr::Column(Column::new("papers", "published")),
            Expr::Literal(SqlLiteral::new("TRUE")),
        );
        let recent = Expr::equality(
            Expr::Column(Column::new("papers", "year")),
            Expr::Literal(SqlLiteral::new("2024")),
        );
        // One member carries an approximated constraint; the merged plan
        // must stay flagged so the caller can still drop it.
        let relations = vec![
            paper_plan(&catalog, "p", published),
            paper_plan(&catalog, "q", recent).with_unsupported(true),
        ];

        let merged = optimize(&catalog, relations).unwrap();
        assert_eq!(merged.len(), 1);
        assert!(merged[0].unsupported);
    }

    #[test]
    fn test_optimize_pipeline_preserves_plan_count_per_binding() {
        let catalog = setup_catalog();
        let published = Expr::equality(
            Expr::Column(Column::new("papers", "published")),
            Expr::Literal(SqlLiteral::new("TRUE")),
        );
        let recent = Expr::equality(
            Expr::Column(Column::new("papers", "year")),
            Expr::Literal(SqlLiteral::new("2024")),
        );
        let relations = vec![
            paper_plan(&catalog, "p", published),
            paper_plan(&catalog, "q", recent),
        ];

        let merged = optimize(&catalog, relations).unwrap();
        let total_bindings: usize = merged.iter().map(|m| m.bindings.len()).sum();
        assert_eq!(total_bindings, 2);
        assert_eq!(merged.len(), 1);
    }
}
