//! Statement parameters.
//!
//! A [`ParameterCollection`] holds the values bound to a statement, either
//! by name (`@name` placeholders) or by position (`?` placeholders).

use std::slice;

use mysql_types::{SqlType, SqlValue, ToSql};

use crate::error::Result;

/// Direction of a stored-procedure parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterDirection {
    /// Passed to the routine.
    Input,
    /// Set by the routine.
    Output,
    /// Passed to and set by the routine.
    InputOutput,
    /// Return value of a stored function.
    ReturnValue,
}

impl ParameterDirection {
    /// Map `information_schema.parameters.PARAMETER_MODE` to a direction.
    ///
    /// A missing mode marks the return value of a stored function.
    #[must_use]
    pub fn from_mode(mode: Option<&str>) -> Self {
        match mode {
            None => Self::ReturnValue,
            Some(m) if m.eq_ignore_ascii_case("out") => Self::Output,
            Some(m) if m.eq_ignore_ascii_case("inout") => Self::InputOutput,
            Some(_) => Self::Input,
        }
    }
}

/// A single statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Parameter name, with or without a leading `@`; empty for positional
    /// parameters.
    pub name: String,
    /// Bound value.
    pub value: SqlValue,
    /// Direction; `None` until set by the caller or filled from metadata.
    pub direction: Option<ParameterDirection>,
    /// Declared type; `None` until set by the caller or filled from metadata.
    pub sql_type: Option<SqlType>,
}

impl Parameter {
    /// Create a named parameter.
    pub fn new(name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            direction: None,
            sql_type: None,
        }
    }

    /// Create a positional parameter.
    pub fn positional(value: impl Into<SqlValue>) -> Self {
        Self::new(String::new(), value)
    }

    /// Create a named parameter from any [`ToSql`] value.
    pub fn from_sql(name: impl Into<String>, value: &dyn ToSql) -> Result<Self> {
        Ok(Self::new(name, value.to_sql()?))
    }

    /// Set the direction.
    #[must_use]
    pub fn with_direction(mut self, direction: ParameterDirection) -> Self {
        self.direction = Some(direction);
        self
    }

    /// Set the declared type.
    #[must_use]
    pub fn with_sql_type(mut self, sql_type: SqlType) -> Self {
        self.sql_type = Some(sql_type);
        self
    }

    /// The name with quoting and any `@`/`?` prefix removed.
    #[must_use]
    pub fn normalized_name(&self) -> &str {
        normalize_parameter_name(&self.name)
    }
}

/// Strip surrounding whitespace, a leading `@` or `?`, and the quotes of
/// a quoted name such as `` @`my param` ``.
#[must_use]
pub fn normalize_parameter_name(name: &str) -> &str {
    let name = name.trim();
    let name = name
        .strip_prefix('@')
        .or_else(|| name.strip_prefix('?'))
        .unwrap_or(name);

    for quote in ['`', '\'', '"'] {
        if let Some(inner) = name
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    name
}

/// Unicode-aware case-insensitive comparison of parameter names.
fn eq_ignore_case(a: &str, b: &str) -> bool {
    if a.is_ascii() && b.is_ascii() {
        return a.eq_ignore_ascii_case(b);
    }
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// An ordered collection of statement parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterCollection {
    parameters: Vec<Parameter>,
}

impl ParameterCollection {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter.
    pub fn push(&mut self, parameter: Parameter) {
        self.parameters.push(parameter);
    }

    /// Append a named parameter.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.push(Parameter::new(name, value));
        self
    }

    /// Append a positional parameter.
    #[must_use]
    pub fn with_positional(mut self, value: impl Into<SqlValue>) -> Self {
        self.push(Parameter::positional(value));
        self
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    /// Whether the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Parameter at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Parameter> {
        self.parameters.get(index)
    }

    /// Mutable parameter at `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Parameter> {
        self.parameters.get_mut(index)
    }

    /// Iterate over the parameters in order.
    pub fn iter(&self) -> slice::Iter<'_, Parameter> {
        self.parameters.iter()
    }

    /// Index of the parameter whose name equals `name`, ignoring case.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.parameters
            .iter()
            .position(|p| eq_ignore_case(&p.name, name))
    }

    /// Index of the parameter whose normalized name matches the normalized
    /// form of `name`, ignoring case.
    #[must_use]
    pub fn normalized_index_of(&self, name: &str) -> Option<usize> {
        let wanted = normalize_parameter_name(name);
        self.parameters
            .iter()
            .position(|p| eq_ignore_case(p.normalized_name(), wanted))
    }

    /// Exact match first, then normalized match.
    ///
    /// `@id`, `?id` and `id` all find a parameter named `@ID`.
    #[must_use]
    pub fn flexible_index_of(&self, name: &str) -> Option<usize> {
        self.index_of(name)
            .or_else(|| self.normalized_index_of(name))
    }
}

impl FromIterator<Parameter> for ParameterCollection {
    fn from_iter<I: IntoIterator<Item = Parameter>>(iter: I) -> Self {
        Self {
            parameters: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ParameterCollection {
    type Item = Parameter;
    type IntoIter = std::vec::IntoIter<Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.parameters.into_iter()
    }
}

impl<'a> IntoIterator for &'a ParameterCollection {
    type Item = &'a Parameter;
    type IntoIter = slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.parameters.iter()
    }
}
