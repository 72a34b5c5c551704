/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! One result row of an executed relational plan.
//!
//! Keys are the projection output keys: `table.column` (with the aliased
//! table name) for column projections, the bare projection name for
//! expression projections. Values are stringly typed; the database layer is
//! responsible for canonical string rendering.

use rustc_hash::FxHashMap;

use crate::algebra::Column;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultRow {
    values: FxHashMap<String, Option<String>>,
}

impl ResultRow {
    pub fn new() -> Self {
        ResultRow::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: Option<String>) -> &mut Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn set_column(&mut self, column: &Column, value: Option<&str>) -> &mut Self {
        self.set(column.qualified(), value.map(|v| v.to_string()))
    }

    /// The value under a raw key; absent and null are both `None`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|v| v.as_deref())
    }

    pub fn column(&self, column: &Column) -> Option<&str> {
        self.get(&column.qualified())
    }

    /// Gate-column truthiness: `1`, `true` and `t` (case-insensitive)
    /// count as true across vendor boolean renderings.
    pub fn is_truthy(&self, key: &str) -> bool {
        match self.get(key) {
            Some(v) => matches!(
                v.to_ascii_lowercase().as_str(),
                "1" | "true" | "t"
            ),
            None => false,
        }
    }
}
