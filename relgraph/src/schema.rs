/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Schema facts consulted by the algebra constructors, the constraint
//! builder and the optimizer: column data types, nullability, foreign keys
//! and unique keys.
//!
//! The catalog never renders SQL statements. Its only value-level job is
//! [`DataType::to_literal`], which canonicalizes an application-level string
//! into a quoted literal or reports it as not representable (meaning: no row
//! can ever match, so the caller emits a false predicate instead of SQL).

use std::collections::{BTreeMap, BTreeSet};

use crate::algebra::{Column, SqlLiteral};
use crate::error::{RelgraphError, Result};

/// Canonical column encodings. Two columns can only be joined or equated
/// when their encodings belong to the same family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DataType {
    Integer,
    Decimal,
    Text,
    Boolean,
    Date,
    Timestamp,
    Binary,
}

impl DataType {
    /// Canonicalize a string value into a dialect-neutral quoted literal.
    /// Returns `None` when the value is not representable in this type, in
    /// which case the predicate being built is impossible.
    pub fn to_literal(&self, value: &str) -> Option<SqlLiteral> {
        match self {
            DataType::Integer => {
                let n: i64 = value.trim().parse().ok()?;
                Some(SqlLiteral::new(n.to_string()))
            }
            DataType::Decimal => {
                let n: f64 = value.trim().parse().ok()?;
                if !n.is_finite() {
                    return None;
                }
                Some(SqlLiteral::new(value.trim().to_string()))
            }
            DataType::Boolean => match value.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "1" => Some(SqlLiteral::new("TRUE")),
                "false" | "f" | "0" => Some(SqlLiteral::new("FALSE")),
                _ => None,
            },
            DataType::Text | DataType::Date | DataType::Timestamp => {
                Some(SqlLiteral::new(format!("'{}'", value.replace('\'', "''"))))
            }
            DataType::Binary => {
                if value.bytes().all(|b| b.is_ascii_hexdigit()) {
                    Some(SqlLiteral::new(format!("X'{}'", value)))
                } else {
                    None
                }
            }
        }
    }

    /// Whether two columns of these types may be compared without an
    /// implicit, lossy conversion.
    pub fn compatible_with(&self, other: &DataType) -> bool {
        use DataType::*;
        match (self, other) {
            (a, b) if a == b => true,
            (Integer, Decimal) | (Decimal, Integer) => true,
            _ => false,
        }
    }
}

/// Definition of a single column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub data_type: DataType,
    pub nullable: bool,
}

/// Definition of a base table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    pub name: String,
    pub columns: BTreeMap<String, ColumnDef>,
}

/// A foreign key: every non-null value of `from` exists in `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub from: Column,
    pub to: Column,
}

/// In-memory realization of the schema facts the engine needs. Populated by
/// the (out of scope) introspection layer, or by hand in tests.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tables: BTreeMap<String, TableDef>,
    foreign_keys: Vec<ForeignKey>,
    unique_keys: Vec<(String, BTreeSet<String>)>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog::default()
    }

    /// Register a table with its columns as `(name, type, nullable)`.
    pub fn add_table<'a>(
        &mut self,
        name: impl Into<String>,
        columns: impl IntoIterator<Item = (&'a str, DataType, bool)>,
    ) -> &mut Self {
        let name = name.into();
        let columns = columns
            .into_iter()
            .map(|(col, data_type, nullable)| {
                (
                    col.to_string(),
                    ColumnDef {
                        data_type,
                        nullable,
                    },
                )
            })
            .collect();
        self.tables.insert(
            name.clone(),
            TableDef {
                name,
                columns,
            },
        );
        self
    }

    /// Declare that every non-null value of `from` exists in `to`.
    pub fn add_foreign_key(&mut self, from: Column, to: Column) -> &mut Self {
        self.foreign_keys.push(ForeignKey { from, to });
        self
    }

    /// Declare a unique key on a base table.
    pub fn add_unique_key<'a>(
        &mut self,
        table: impl Into<String>,
        columns: impl IntoIterator<Item = &'a str>,
    ) -> &mut Self {
        self.unique_keys.push((
            table.into(),
            columns.into_iter().map(|c| c.to_string()).collect(),
        ));
        self
    }

    pub fn table(&self, base: &str) -> Result<&TableDef> {
        self.tables
            .get(base)
            .ok_or_else(|| RelgraphError::UnknownTable(base.to_string()))
    }

    /// Resolve a possibly-aliased column to its base-table definition.
    pub fn column_def(&self, column: &Column) -> Result<&ColumnDef> {
        let table = self.table(&column.table.base)?;
        table
            .columns
            .get(&column.name)
            .ok_or_else(|| RelgraphError::UnknownColumn(column.qualified()))
    }

    /// All columns of a table, qualified with the given (possibly aliased)
    /// table reference.
    pub fn columns_of(&self, table: &crate::algebra::TableRef) -> Result<BTreeSet<Column>> {
        let def = self.table(&table.base)?;
        Ok(def
            .columns
            .keys()
            .map(|name| Column::with_table(table.clone(), name))
            .collect())
    }

    /// Format compatibility between two (possibly aliased) columns.
    pub fn compatible(&self, a: &Column, b: &Column) -> Result<bool> {
        let da = self.column_def(a)?.data_type;
        let db = self.column_def(b)?.data_type;
        Ok(da.compatible_with(&db))
    }

    /// Canonicalize a value for a column, `None` meaning impossible.
    pub fn to_literal(&self, column: &Column, value: &str) -> Result<Option<SqlLiteral>> {
        Ok(self.column_def(column)?.data_type.to_literal(value))
    }

    pub fn is_nullable(&self, column: &Column) -> Result<bool> {
        Ok(self.column_def(column)?.nullable)
    }

    /// The foreign key whose referencing side is exactly `from`, if any.
    /// Alias indices are ignored; foreign keys are declared on base tables.
    pub fn foreign_key_from(&self, from: &Column) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|fk| {
            fk.from.table.base == from.table.base && fk.from.name == from.name
        })
    }

    /// Whether a foreign key guarantees every value of `from` exists in `to`.
    pub fn has_foreign_key(&self, from: &Column, to: &Column) -> bool {
        self.foreign_key_from(from).is_some_and(|fk| {
            fk.to.table.base == to.table.base && fk.to.name == to.name
        })
    }

    /// Whether the given base-table columns contain a declared unique key.
    pub fn is_unique(&self, table: &str, columns: &BTreeSet<String>) -> bool {
        self.unique_keys
            .iter()
            .any(|(t, key)| t == table && key.is_subset(columns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_literals_are_canonicalized() {
        assert_eq!(
            DataType::Integer.to_literal(" 042 "),
            Some(SqlLiteral::new("42"))
        );
        assert_eq!(DataType::Integer.to_literal("abc"), None);
    }

    #[test]
    fn text_literals_are_quoted_and_escaped() {
        assert_eq!(
            DataType::Text.to_literal("O'Brien"),
            Some(SqlLiteral::new("'O''Brien'"))
        );
    }

    #[test]
    fn compatibility_is_by_family() {
        assert!(DataType::Integer.compatible_with(&DataType::Decimal));
        assert!(!DataType::Integer.compatible_with(&DataType::Text));
        assert!(!DataType::Binary.compatible_with(&DataType::Text));
    }

    #[test]
    fn aliased_columns_resolve_to_base_table() {
        let mut catalog = Catalog::new();
        catalog.add_table("person", [("id", DataType::Integer, false)]);
        let aliased = Column::with_table(
            crate::algebra::TableRef::aliased("person", 2),
            "id",
        );
        assert_eq!(catalog.column_def(&aliased).unwrap().data_type, DataType::Integer);
    }
}
