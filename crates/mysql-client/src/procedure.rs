//! Stored-procedure parameter metadata.
//!
//! Before calling a stored routine the driver reads its parameter list from
//! `information_schema.parameters` and aligns the caller's parameters with
//! it: ordered by ordinal position, with directions and types filled in
//! where the caller left them unset.

use mysql_types::SqlType;

use crate::error::{Error, Result};
use crate::parameter::{ParameterCollection, ParameterDirection};
use crate::row::Row;
use crate::session::Session;

const PARAMETERS_QUERY: &str = "SELECT ORDINAL_POSITION, PARAMETER_MODE, PARAMETER_NAME, \
     DATA_TYPE, DTD_IDENTIFIER \
     FROM information_schema.parameters \
     WHERE SPECIFIC_SCHEMA = @schema AND SPECIFIC_NAME = @component \
     ORDER BY ORDINAL_POSITION";

/// Metadata for one routine parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedParameter {
    /// 1-based position; 0 for a function's return value.
    pub ordinal_position: u32,
    /// Declared direction.
    pub direction: ParameterDirection,
    /// Declared name; `None` for a function's return value.
    pub name: Option<String>,
    /// `DATA_TYPE` as reported by the server.
    pub data_type: String,
    /// `DATA_TYPE` mapped to a known type.
    pub sql_type: Option<SqlType>,
    /// Whether the type is unsigned.
    pub is_unsigned: bool,
}

impl CachedParameter {
    fn from_row(row: &Row) -> Result<Self> {
        let mode: Option<String> = row.get(1)?;
        let data_type: String = row.get(3)?;
        let dtd_identifier: String = row.get(4)?;
        Ok(Self {
            ordinal_position: row.get(0)?,
            direction: ParameterDirection::from_mode(mode.as_deref()),
            name: row.get(2)?,
            sql_type: SqlType::from_data_type(&data_type),
            data_type,
            is_unsigned: dtd_identifier.to_ascii_lowercase().contains("unsigned"),
        })
    }
}

/// Parameter metadata for a stored procedure or function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedProcedure {
    schema: String,
    component: String,
    parameters: Vec<CachedParameter>,
}

impl CachedProcedure {
    /// Create metadata from known parameters, sorted by ordinal position.
    #[must_use]
    pub fn new(
        schema: impl Into<String>,
        component: impl Into<String>,
        mut parameters: Vec<CachedParameter>,
    ) -> Self {
        parameters.sort_by_key(|p| p.ordinal_position);
        Self {
            schema: schema.into(),
            component: component.into(),
            parameters,
        }
    }

    /// Read the parameter list of `schema`.`component` from the server.
    pub async fn fill(session: &mut Session, schema: &str, component: &str) -> Result<Self> {
        let parameters = ParameterCollection::new()
            .with("@schema", schema)
            .with("@component", component);
        let result = session.query_with(PARAMETERS_QUERY, &parameters).await?;

        let parameters = result
            .rows
            .iter()
            .map(CachedParameter::from_row)
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            schema = schema,
            component = component,
            parameter_count = parameters.len(),
            "loaded stored procedure metadata"
        );

        Ok(Self::new(schema, component, parameters))
    }

    /// Schema the routine lives in.
    #[must_use]
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Routine name.
    #[must_use]
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Parameters in ordinal order.
    #[must_use]
    pub fn parameters(&self) -> &[CachedParameter] {
        &self.parameters
    }

    /// `` `schema`.`component` ``.
    #[must_use]
    pub fn fully_qualified(&self) -> String {
        quote_pair(&self.schema, &self.component)
    }

    /// Reorder `parameters` to match the routine's declaration.
    ///
    /// The return value is matched by direction; every other parameter by
    /// normalized name. Unset directions and types are filled from the
    /// metadata.
    ///
    /// # Errors
    ///
    /// [`Error::Binding`] if the routine is a function and no
    /// return-value parameter was supplied, or if a declared parameter has
    /// no counterpart in `parameters`.
    pub fn align_parameters(&self, parameters: &ParameterCollection) -> Result<ParameterCollection> {
        let return_parameter = parameters
            .iter()
            .find(|p| p.direction == Some(ParameterDirection::ReturnValue));

        let mut aligned = ParameterCollection::new();
        for cached in &self.parameters {
            let parameter = if cached.direction == ParameterDirection::ReturnValue {
                return_parameter.ok_or_else(|| {
                    Error::Binding(format!(
                        "Attempt to call stored function {} without specifying a return parameter",
                        self.fully_qualified()
                    ))
                })?
            } else {
                let name = cached.name.as_deref().unwrap_or_default();
                parameters
                    .normalized_index_of(name)
                    .and_then(|i| parameters.get(i))
                    .ok_or_else(|| {
                        Error::Binding(format!("Parameter '{name}' not found in the collection."))
                    })?
            };

            let mut parameter = parameter.clone();
            parameter.direction.get_or_insert(cached.direction);
            if parameter.sql_type.is_none() {
                parameter.sql_type = cached.sql_type;
            }
            aligned.push(parameter);
        }

        Ok(aligned)
    }
}

fn quote_identifier(identifier: &str) -> String {
    format!("`{}`", identifier.replace('`', "``"))
}

fn quote_pair(schema: &str, component: &str) -> String {
    format!("{}.{}", quote_identifier(schema), quote_identifier(component))
}

/// A routine name split into schema and component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedSchema {
    /// Schema (database) name.
    pub schema: String,
    /// Routine name.
    pub component: String,
}

impl NormalizedSchema {
    /// Split `name` (`proc`, `db.proc`, `` `db`.`proc` ``), using
    /// `default_schema` when no schema is given.
    ///
    /// # Errors
    ///
    /// [`Error::Binding`] if the name is malformed or no schema can be
    /// determined.
    pub fn normalize(name: &str, default_schema: Option<&str>) -> Result<Self> {
        let parts = split_identifiers(name)
            .ok_or_else(|| Error::Binding(format!("Could not parse routine name '{name}'.")))?;

        match parts.as_slice() {
            [component] => {
                let schema = default_schema.filter(|s| !s.is_empty()).ok_or_else(|| {
                    Error::Binding(format!("Could not determine schema for '{name}'."))
                })?;
                Ok(Self {
                    schema: schema.to_string(),
                    component: component.clone(),
                })
            }
            [schema, component] => Ok(Self {
                schema: schema.clone(),
                component: component.clone(),
            }),
            _ => Err(Error::Binding(format!(
                "Could not parse routine name '{name}'."
            ))),
        }
    }

    /// `` `schema`.`component` ``; the per-connection cache key.
    #[must_use]
    pub fn fully_qualified(&self) -> String {
        quote_pair(&self.schema, &self.component)
    }
}

/// Split a dotted identifier, honouring backtick quoting.
fn split_identifiers(name: &str) -> Option<Vec<String>> {
    let mut parts = Vec::new();
    let mut chars = name.trim().chars().peekable();

    loop {
        let mut part = String::new();
        if chars.peek() == Some(&'`') {
            chars.next();
            loop {
                match chars.next()? {
                    '`' if chars.peek() == Some(&'`') => {
                        chars.next();
                        part.push('`');
                    }
                    '`' => break,
                    c => part.push(c),
                }
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c == '.' {
                    break;
                }
                part.push(c);
                chars.next();
            }
            part = part.trim().to_string();
        }

        if part.is_empty() {
            return None;
        }
        parts.push(part);

        match chars.next() {
            None => return Some(parts),
            Some('.') => {}
            Some(_) => return None,
        }
    }
}
