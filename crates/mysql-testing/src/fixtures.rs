//! Test fixture utilities.

use crate::mock_server::{MockColumn, MockResponse, ScalarValue};

/// Leading text of the driver's routine metadata lookup, for use with
/// [`MockServerBuilder::with_prefix_response`](crate::MockServerBuilder::with_prefix_response).
pub const ROUTINE_PARAMETERS_PREFIX: &str = "SELECT ORDINAL_POSITION, PARAMETER_MODE";

/// Test database fixture for setting up and tearing down test data.
pub struct TestFixture {
    /// Database name.
    pub database: String,
    /// Tables created by this fixture.
    pub tables: Vec<String>,
}

impl TestFixture {
    /// Create a new test fixture.
    #[must_use]
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            tables: Vec::new(),
        }
    }

    /// Add a table to the fixture.
    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.tables.push(table.into());
        self
    }

    /// Generate SQL to create the test database.
    #[must_use]
    pub fn create_database_sql(&self) -> String {
        format!("CREATE DATABASE IF NOT EXISTS {}", quote(&self.database))
    }

    /// Generate SQL to drop the test database.
    #[must_use]
    pub fn drop_database_sql(&self) -> String {
        format!("DROP DATABASE IF EXISTS {}", quote(&self.database))
    }

    /// Generate SQL to drop every fixture table, in reverse creation order.
    #[must_use]
    pub fn drop_tables_sql(&self) -> Vec<String> {
        self.tables
            .iter()
            .rev()
            .map(|t| format!("DROP TABLE IF EXISTS {}.{}", quote(&self.database), quote(t)))
            .collect()
    }
}

fn quote(identifier: &str) -> String {
    format!("`{}`", identifier.replace('`', "``"))
}

/// One row of `information_schema.parameters`.
#[derive(Debug, Clone)]
pub struct RoutineParameter {
    /// `ORDINAL_POSITION`; 0 for a function's return value.
    pub ordinal_position: u32,
    /// `PARAMETER_MODE` (`IN`, `OUT`, `INOUT`, or NULL).
    pub mode: Option<String>,
    /// `PARAMETER_NAME`; NULL for a function's return value.
    pub name: Option<String>,
    /// `DATA_TYPE`.
    pub data_type: String,
    /// `DTD_IDENTIFIER`.
    pub dtd_identifier: String,
}

impl RoutineParameter {
    /// A procedure parameter.
    pub fn new(position: u32, mode: &str, name: &str, data_type: &str) -> Self {
        Self {
            ordinal_position: position,
            mode: Some(mode.into()),
            name: Some(name.into()),
            data_type: data_type.into(),
            dtd_identifier: data_type.into(),
        }
    }

    /// A function's return value.
    pub fn return_value(data_type: &str) -> Self {
        Self {
            ordinal_position: 0,
            mode: None,
            name: None,
            data_type: data_type.into(),
            dtd_identifier: data_type.into(),
        }
    }

    /// Override `DTD_IDENTIFIER`, e.g. `int(10) unsigned`.
    #[must_use]
    pub fn with_dtd_identifier(mut self, dtd: &str) -> Self {
        self.dtd_identifier = dtd.into();
        self
    }
}

/// Result set the server returns for a routine metadata lookup.
pub fn routine_parameters(parameters: &[RoutineParameter]) -> MockResponse {
    let columns = vec![
        MockColumn::bigint("ORDINAL_POSITION").unsigned().not_null(),
        MockColumn::varchar("PARAMETER_MODE"),
        MockColumn::varchar("PARAMETER_NAME"),
        MockColumn::varchar("DATA_TYPE").not_null(),
        MockColumn::varchar("DTD_IDENTIFIER").not_null(),
    ];
    let rows = parameters
        .iter()
        .map(|p| {
            vec![
                ScalarValue::UInt(u64::from(p.ordinal_position)),
                p.mode.clone().into(),
                p.name.clone().into(),
                p.data_type.clone().into(),
                p.dtd_identifier.clone().into(),
            ]
        })
        .collect();
    MockResponse::rows(columns, rows)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_sql() {
        let fixture = TestFixture::new("driver_test").with_table("a").with_table("b`c");
        assert_eq!(
            fixture.create_database_sql(),
            "CREATE DATABASE IF NOT EXISTS `driver_test`"
        );
        assert_eq!(
            fixture.drop_tables_sql(),
            vec![
                "DROP TABLE IF EXISTS `driver_test`.`b``c`",
                "DROP TABLE IF EXISTS `driver_test`.`a`",
            ]
        );
    }

    #[test]
    fn test_routine_parameters_shape() {
        let response = routine_parameters(&[
            RoutineParameter::return_value("int"),
            RoutineParameter::new(1, "IN", "id", "int").with_dtd_identifier("int unsigned"),
        ]);
        match response {
            MockResponse::Rows { columns, rows } => {
                assert_eq!(columns.len(), 5);
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[0][1], ScalarValue::Null);
                assert_eq!(rows[1][4], ScalarValue::String("int unsigned".into()));
            }
            _ => unreachable!(),
        }
    }
}
