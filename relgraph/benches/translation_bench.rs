/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

extern crate criterion;
extern crate relgraph;

use criterion::*;

use relgraph::algebra::{Column, RelationalExpr};
use relgraph::context::TranslationContext;
use relgraph::makers::{NodeMaker, Template, TripleRelation, ValueMaker};
use relgraph::optimizer::optimize;
use relgraph::schema::{Catalog, DataType};
use relgraph::translator::GraphPatternTranslator;
use shared::terms::{PatternTerm, RdfTerm, TermKind, TriplePattern};

const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

fn setup_catalog(tables: usize) -> Catalog {
    let mut catalog = Catalog::new();
    for i in 0..tables {
        catalog
            .add_table(
                format!("entity_{}", i),
                [
                    ("id", DataType::Integer, false),
                    ("label", DataType::Text, true),
                ],
            )
            .add_unique_key(format!("entity_{}", i), ["id"]);
    }
    catalog
}

fn setup_bridges(catalog: &Catalog, tables: usize) -> Vec<TripleRelation> {
    let mut bridges = Vec::new();
    for i in 0..tables {
        let table = format!("entity_{}", i);
        let expr = RelationalExpr::table(catalog, &table).unwrap();
        let subject = NodeMaker::typed_unique(
            TermKind::Uri,
            ValueMaker::Template(
                Template::parse(&format!("http://example.org/{}/{{{}.id}}", table, table))
                    .unwrap(),
            ),
        );
        bridges.push(TripleRelation::new(
            expr.clone(),
            subject.clone(),
            NodeMaker::fixed(RdfTerm::uri(RDF_TYPE)),
            NodeMaker::fixed(RdfTerm::uri(format!("http://example.org/terms#Class{}", i))),
            true,
        ));
        bridges.push(TripleRelation::new(
            expr,
            subject,
            NodeMaker::fixed(RdfTerm::uri("http://example.org/terms#label")),
            NodeMaker::typed(
                TermKind::PlainLiteral,
                ValueMaker::Column(Column::new(table.as_str(), "label")),
            ),
            true,
        ));
    }
    bridges
}

fn star_pattern(size: usize) -> Vec<TriplePattern> {
    let mut patterns = vec![TriplePattern::new(
        PatternTerm::var("s"),
        PatternTerm::Term(RdfTerm::uri(RDF_TYPE)),
        PatternTerm::Term(RdfTerm::uri("http://example.org/terms#Class0")),
    )];
    for i in 0..size {
        patterns.push(TriplePattern::new(
            PatternTerm::var("s"),
            PatternTerm::Term(RdfTerm::uri("http://example.org/terms#label")),
            PatternTerm::var(format!("o{}", i)),
        ));
    }
    patterns
}

fn translation_benchmark(c: &mut Criterion) {
    let catalog = setup_catalog(16);
    let bridges = setup_bridges(&catalog, 16);
    let translator = GraphPatternTranslator::new(&catalog, &bridges);
    let patterns = star_pattern(3);

    c.bench_function("translate_star_pattern", |b| {
        b.iter(|| {
            let ctx = TranslationContext::new();
            translator
                .translate(black_box(&patterns), &ctx)
                .unwrap()
        })
    });

    c.bench_function("translate_and_optimize", |b| {
        b.iter(|| {
            let ctx = TranslationContext::new();
            let relations = translator
                .translate(black_box(&patterns), &ctx)
                .unwrap();
            optimize(&catalog, relations).unwrap()
        })
    });
}

criterion_group!(benches, translation_benchmark);
criterion_main!(benches);
