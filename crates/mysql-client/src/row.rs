//! Row representation for query results.
//!
//! Rows read with the text protocol are decoded eagerly into [`SqlValue`]s
//! using the column metadata sent ahead of them. The metadata is shared by
//! every row of a result set.

use std::sync::Arc;

use bytes::Bytes;
use mysql_protocol::{ColumnDefinition, ColumnType};
use mysql_types::{FromSql, SqlValue, TypeError, decode_text_value};

/// Column metadata describing a result set column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    definition: ColumnDefinition,
}

impl Column {
    /// Wrap a decoded column definition.
    #[must_use]
    pub fn new(definition: ColumnDefinition) -> Self {
        Self { definition }
    }

    /// Column alias.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Wire type.
    #[must_use]
    pub fn column_type(&self) -> ColumnType {
        self.definition.column_type
    }

    /// Whether the column holds unsigned integers.
    #[must_use]
    pub fn is_unsigned(&self) -> bool {
        self.definition.is_unsigned()
    }

    /// Full definition as sent by the server.
    #[must_use]
    pub fn definition(&self) -> &ColumnDefinition {
        &self.definition
    }
}

fn index_out_of_bounds(index: usize) -> TypeError {
    TypeError::TypeMismatch {
        expected: "valid column index",
        actual: format!("index {index} out of bounds"),
    }
}

/// A single decoded row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[Column]>,
    values: Vec<SqlValue>,
}

impl Row {
    /// Decode a text-protocol row against its column metadata.
    pub fn decode(columns: Arc<[Column]>, raw: Vec<Option<Bytes>>) -> Result<Self, TypeError> {
        let values = raw
            .into_iter()
            .zip(columns.iter())
            .map(|(cell, column)| decode_text_value(cell, column.definition()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { columns, values })
    }

    /// Get a value by column index with type conversion.
    pub fn get<T: FromSql>(&self, index: usize) -> Result<T, TypeError> {
        self.values
            .get(index)
            .ok_or_else(|| index_out_of_bounds(index))
            .and_then(T::from_sql)
    }

    /// Get a value by column name with type conversion.
    ///
    /// Names are compared ignoring ASCII case.
    pub fn get_by_name<T: FromSql>(&self, name: &str) -> Result<T, TypeError> {
        let index = self
            .find_by_name(name)
            .ok_or_else(|| TypeError::TypeMismatch {
                expected: "valid column name",
                actual: format!("column '{name}' not found"),
            })?;
        self.get(index)
    }

    /// Try to get a value by column index, returning None if NULL or not found.
    pub fn try_get<T: FromSql>(&self, index: usize) -> Option<T> {
        self.values
            .get(index)
            .and_then(|v| T::from_sql_nullable(v).ok().flatten())
    }

    /// Try to get a value by column name, returning None if NULL or not found.
    pub fn try_get_by_name<T: FromSql>(&self, name: &str) -> Option<T> {
        self.try_get(self.find_by_name(name)?)
    }

    /// Get the raw SQL value by index.
    #[must_use]
    pub fn get_raw(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    /// Check if a column value is NULL. Missing columns count as NULL.
    #[must_use]
    pub fn is_null(&self, index: usize) -> bool {
        self.values.get(index).is_none_or(SqlValue::is_null)
    }

    /// Get the number of columns in the row.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the row is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get the column metadata.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Consume the row, returning its values.
    #[must_use]
    pub fn into_values(self) -> Vec<SqlValue> {
        self.values
    }

    fn find_by_name(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name().eq_ignore_ascii_case(name))
    }
}

/// One result of a statement: either rows or an affected-row count.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultSet {
    /// Column metadata; empty for statements that return no rows.
    pub columns: Arc<[Column]>,
    /// Decoded rows.
    pub rows: Vec<Row>,
    /// Rows changed by a data-modifying statement.
    pub affected_rows: u64,
    /// `LAST_INSERT_ID()` after the statement.
    pub last_insert_id: u64,
    /// Warnings raised by the statement.
    pub warnings: u16,
}

impl ResultSet {
    /// Whether the statement produced a row set (possibly empty).
    #[must_use]
    pub fn has_rows(&self) -> bool {
        !self.columns.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mysql_protocol::ColumnFlags;

    fn columns() -> Arc<[Column]> {
        vec![
            Column::new(ColumnDefinition::new("ID", ColumnType::Long)),
            Column::new(
                ColumnDefinition::new("big", ColumnType::LongLong).with_flags(ColumnFlags::UNSIGNED),
            ),
            Column::new(ColumnDefinition::new("name", ColumnType::VarString)),
        ]
        .into()
    }

    fn row() -> Row {
        Row::decode(
            columns(),
            vec![
                Some(Bytes::from_static(b"7")),
                Some(Bytes::from_static(b"18446744073709551615")),
                None,
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_typed_access() {
        let row = row();
        assert_eq!(row.get::<i32>(0).unwrap(), 7);
        assert_eq!(row.get::<u64>(1).unwrap(), u64::MAX);
        assert_eq!(row.get_by_name::<i64>("id").unwrap(), 7);
        assert!(matches!(row.get::<String>(2), Err(TypeError::UnexpectedNull)));
    }

    #[test]
    fn test_nullable_access() {
        let row = row();
        assert_eq!(row.try_get::<String>(2), None);
        assert_eq!(row.try_get_by_name::<i32>("ID"), Some(7));
        assert!(row.is_null(2));
        assert!(row.is_null(10));
        assert!(!row.is_null(0));
    }

    #[test]
    fn test_out_of_bounds() {
        let row = row();
        assert!(row.get::<i32>(3).is_err());
        assert!(row.get_by_name::<i32>("nope").is_err());
        assert_eq!(row.len(), 3);
    }

    #[test]
    fn test_invalid_cell() {
        let err = Row::decode(columns(), vec![Some(Bytes::from_static(b"x")), None, None]);
        assert!(err.is_err());
    }
}
