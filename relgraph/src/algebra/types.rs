/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Base identifiers of the relational algebra: table references, qualified
//! columns, literals, order specs and column equalities.

use std::fmt;

/// A reference to a base table, optionally under a numeric alias.
///
/// The alias index is assigned by the translator when the same bridge (and
/// therefore the same base table) participates more than once in a plan.
/// `base` always names the catalog table, so schema facts stay reachable
/// after renaming.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableRef {
    pub base: String,
    pub alias: Option<u32>,
}

impl TableRef {
    pub fn new(base: impl Into<String>) -> Self {
        TableRef {
            base: base.into(),
            alias: None,
        }
    }

    pub fn aliased(base: impl Into<String>, index: u32) -> Self {
        TableRef {
            base: base.into(),
            alias: Some(index),
        }
    }

    /// The name this table carries inside a plan: `base` or `base__N`.
    pub fn name(&self) -> String {
        match self.alias {
            Some(n) => format!("{}__{}", self.base, n),
            None => self.base.clone(),
        }
    }

    pub fn is_aliased(&self) -> bool {
        self.alias.is_some()
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A fully qualified column.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Column {
    pub table: TableRef,
    pub name: String,
}

impl Column {
    pub fn new(table: impl Into<String>, name: impl Into<String>) -> Self {
        Column {
            table: TableRef::new(table),
            name: name.into(),
        }
    }

    pub fn with_table(table: TableRef, name: impl Into<String>) -> Self {
        Column {
            table,
            name: name.into(),
        }
    }

    /// The row key this column is read under: `table.column` with the
    /// aliased table name.
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.table.name(), self.name)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified())
    }
}

/// A rendered SQL literal, already canonicalized and quoted for the target
/// column's data type by the schema layer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SqlLiteral(pub String);

impl SqlLiteral {
    pub fn new(rendered: impl Into<String>) -> Self {
        SqlLiteral(rendered.into())
    }
}

impl fmt::Display for SqlLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An equality between two columns, stored with the smaller column first so
/// that structurally equal joins compare equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColumnEquality {
    pub left: Column,
    pub right: Column,
}

impl ColumnEquality {
    pub fn new(a: Column, b: Column) -> Self {
        if a <= b {
            ColumnEquality { left: a, right: b }
        } else {
            ColumnEquality { left: b, right: a }
        }
    }
}

impl fmt::Display for ColumnEquality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.left, self.right)
    }
}

/// One ordering criterion of an `Order` node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderSpec {
    pub column: Column,
    pub ascending: bool,
}

impl OrderSpec {
    pub fn ascending(column: Column) -> Self {
        OrderSpec {
            column,
            ascending: true,
        }
    }

    pub fn descending(column: Column) -> Self {
        OrderSpec {
            column,
            ascending: false,
        }
    }
}
