//! Client-side statement binding.
//!
//! MySQL's text protocol has no parameter markers, so the driver splices
//! each bound value into the statement as a SQL literal and sends the
//! result as a single `COM_QUERY` payload.
//!
//! ## Example
//!
//! ```rust
//! use mysql_client::{ParameterCollection, StatementPreparer, StatementPreparerOptions};
//!
//! let params = ParameterCollection::new().with("@name", "O'Brien");
//! let payload = StatementPreparer::new(
//!     "SELECT id FROM users WHERE name = @name",
//!     &params,
//!     StatementPreparerOptions::empty(),
//! )
//! .parse_and_bind()
//! .unwrap();
//!
//! assert_eq!(payload[0], 0x03);
//! assert_eq!(&payload[1..], b"SELECT id FROM users WHERE name = 'O\\'Brien'");
//! ```

use bitflags::bitflags;
use bytes::{BufMut, Bytes, BytesMut};
use mysql_protocol::CommandKind;
use mysql_types::{EncodeOptions, append_sql_literal};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::parameter::{Parameter, ParameterCollection};
use crate::parser::{ParseHandler, SqlParser};

bitflags! {
    /// Options that change how a statement is bound.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StatementPreparerOptions: u8 {
        /// Leave unmatched `@name` tokens in place as user variables.
        const ALLOW_USER_VARIABLES = 0x01;
        /// Send UUIDs as `BINARY(16)`.
        const OLD_GUIDS = 0x02;
        /// The server has `NO_BACKSLASH_ESCAPES` set; escape quotes by
        /// doubling them.
        const NO_BACKSLASH_ESCAPES = 0x04;
    }
}

impl StatementPreparerOptions {
    /// Options implied by a connection configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let mut options = Self::empty();
        options.set(Self::ALLOW_USER_VARIABLES, config.allow_user_variables);
        options.set(Self::OLD_GUIDS, config.old_guids);
        options
    }

    fn encode_options(self) -> EncodeOptions {
        EncodeOptions::new()
            .no_backslash_escapes(self.contains(Self::NO_BACKSLASH_ESCAPES))
            .old_guids(self.contains(Self::OLD_GUIDS))
    }
}

/// Binds a [`ParameterCollection`] into statement text.
#[derive(Debug)]
pub struct StatementPreparer<'a> {
    sql: &'a str,
    parameters: &'a ParameterCollection,
    options: StatementPreparerOptions,
}

impl<'a> StatementPreparer<'a> {
    /// Create a preparer for `sql`.
    pub fn new(
        sql: &'a str,
        parameters: &'a ParameterCollection,
        options: StatementPreparerOptions,
    ) -> Self {
        Self {
            sql,
            parameters,
            options,
        }
    }

    /// Produce the `COM_QUERY` payload with every placeholder replaced.
    ///
    /// # Errors
    ///
    /// [`Error::Binding`] if a named placeholder has no matching parameter
    /// (and user variables are not allowed) or if there are more `?`
    /// placeholders than parameters. [`Error::Type`] if a value has no
    /// literal form.
    pub fn parse_and_bind(&self) -> Result<Bytes> {
        let mut out = BytesMut::with_capacity(self.sql.len() + 1);
        out.put_u8(CommandKind::Query as u8);

        if !self.sql.trim().is_empty() {
            let mut binder = Binder {
                preparer: self,
                out: &mut out,
                last_index: 0,
                positional_index: 0,
            };
            SqlParser::parse(self.sql, &mut binder)?;
            binder.finish();
        }

        Ok(out.freeze())
    }
}

struct Binder<'p, 'a> {
    preparer: &'p StatementPreparer<'a>,
    out: &'p mut BytesMut,
    last_index: usize,
    positional_index: usize,
}

impl Binder<'_, '_> {
    fn append_parameter(
        &mut self,
        parameter: &Parameter,
        text_index: usize,
        text_length: usize,
    ) -> Result<()> {
        let sql = self.preparer.sql;
        self.out.put_slice(&sql.as_bytes()[self.last_index..text_index]);
        append_sql_literal(
            &mut *self.out,
            &parameter.value,
            self.preparer.options.encode_options(),
        )?;
        self.last_index = text_index + text_length;
        Ok(())
    }

    fn finish(self) {
        let sql = self.preparer.sql;
        self.out.put_slice(&sql.as_bytes()[self.last_index..]);
    }
}

impl ParseHandler for Binder<'_, '_> {
    fn on_named_parameter(&mut self, index: usize, length: usize) -> Result<()> {
        let name = &self.preparer.sql[index..index + length];
        match self.preparer.parameters.flexible_index_of(name) {
            Some(i) => {
                let parameters = self.preparer.parameters;
                match parameters.get(i) {
                    Some(parameter) => self.append_parameter(parameter, index, length),
                    None => Ok(()),
                }
            }
            None if self
                .preparer
                .options
                .contains(StatementPreparerOptions::ALLOW_USER_VARIABLES) =>
            {
                Ok(())
            }
            None => Err(Error::Binding(format!("Parameter '{name}' must be defined."))),
        }
    }

    fn on_positional_parameter(&mut self, index: usize) -> Result<()> {
        let parameters = self.preparer.parameters;
        let parameter = parameters.get(self.positional_index).ok_or_else(|| {
            Error::Binding(format!(
                "Statement has more than {} positional parameter(s).",
                parameters.len()
            ))
        })?;
        self.append_parameter(parameter, index, 1)?;
        self.positional_index += 1;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mysql_types::SqlValue;

    fn bind(sql: &str, params: &ParameterCollection, options: StatementPreparerOptions) -> String {
        let payload = StatementPreparer::new(sql, params, options)
            .parse_and_bind()
            .unwrap();
        assert_eq!(payload[0], 0x03);
        String::from_utf8(payload[1..].to_vec()).unwrap()
    }

    #[test]
    fn test_empty_text_is_tag_only() {
        let params = ParameterCollection::new();
        for sql in ["", "   ", "\n\t"] {
            let payload = StatementPreparer::new(sql, &params, StatementPreparerOptions::empty())
                .parse_and_bind()
                .unwrap();
            assert_eq!(&payload[..], &[0x03]);
        }
    }

    #[test]
    fn test_no_parameters_copies_text() {
        let params = ParameterCollection::new();
        assert_eq!(
            bind("SELECT 1", &params, StatementPreparerOptions::empty()),
            "SELECT 1"
        );
    }

    #[test]
    fn test_named_binding() {
        let params = ParameterCollection::new()
            .with("@id", 42)
            .with("name", "O'Brien")
            .with("@missing_value", SqlValue::Null);
        assert_eq!(
            bind(
                "UPDATE t SET name = @name, note = @missing_value WHERE id = @ID",
                &params,
                StatementPreparerOptions::empty()
            ),
            "UPDATE t SET name = 'O\\'Brien', note = NULL WHERE id = 42"
        );
    }

    #[test]
    fn test_positional_binding_order() {
        let params = ParameterCollection::new()
            .with_positional(1)
            .with_positional("two")
            .with_positional(3.5f64);
        assert_eq!(
            bind("CALL p(?, ?, ?)", &params, StatementPreparerOptions::empty()),
            "CALL p(1, 'two', 3.5e0)"
        );
    }

    #[test]
    fn test_positional_underflow() {
        let params = ParameterCollection::new().with_positional(1);
        let err = StatementPreparer::new("SELECT ?, ?", &params, StatementPreparerOptions::empty())
            .parse_and_bind()
            .unwrap_err();
        assert!(matches!(err, Error::Binding(_)));
    }

    #[test]
    fn test_undefined_named_parameter() {
        let params = ParameterCollection::new();
        let err = StatementPreparer::new(
            "SELECT @undefined",
            &params,
            StatementPreparerOptions::empty(),
        )
        .parse_and_bind()
        .unwrap_err();
        assert_eq!(err.to_string(), "Parameter '@undefined' must be defined.");
    }

    #[test]
    fn test_user_variables_allowed() {
        let params = ParameterCollection::new().with("@b", 2);
        assert_eq!(
            bind(
                "SET @a = @b",
                &params,
                StatementPreparerOptions::ALLOW_USER_VARIABLES
            ),
            "SET @a = 2"
        );
    }

    #[test]
    fn test_placeholders_in_literals_untouched() {
        let params = ParameterCollection::new().with_positional(7);
        assert_eq!(
            bind(
                "SELECT '?', `@x`, ? -- ?\n",
                &params,
                StatementPreparerOptions::empty()
            ),
            "SELECT '?', `@x`, 7 -- ?\n"
        );
    }

    #[test]
    fn test_no_backslash_escapes() {
        let params = ParameterCollection::new().with("@s", "a'b\\c");
        assert_eq!(
            bind(
                "SELECT @s",
                &params,
                StatementPreparerOptions::NO_BACKSLASH_ESCAPES
            ),
            "SELECT 'a''b\\c'"
        );
    }

    #[test]
    fn test_binary_value() {
        let params = ParameterCollection::new().with("@b", vec![0x61u8, 0x27]);
        assert_eq!(
            bind("SELECT @b", &params, StatementPreparerOptions::empty()),
            "SELECT _binary'a\\''"
        );
    }

    #[test]
    fn test_options_from_config() {
        let config = Config::new().allow_user_variables(true);
        let options = StatementPreparerOptions::from_config(&config);
        assert!(options.contains(StatementPreparerOptions::ALLOW_USER_VARIABLES));
        assert!(!options.contains(StatementPreparerOptions::OLD_GUIDS));
    }
}
