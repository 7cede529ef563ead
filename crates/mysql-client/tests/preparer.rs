//! Statement binding property tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use mysql_client::{Error, ParameterCollection, StatementPreparer, StatementPreparerOptions};
use proptest::prelude::*;

fn bind(sql: &str, params: &ParameterCollection, options: StatementPreparerOptions) -> String {
    let payload = StatementPreparer::new(sql, params, options)
        .parse_and_bind()
        .unwrap();
    assert_eq!(payload[0], 0x03, "payload must start with the COM_QUERY tag");
    String::from_utf8(payload[1..].to_vec()).unwrap()
}

#[test]
fn test_named_and_positional_mixed() {
    let sql = "SELECT * FROM items WHERE kind = ? LIMIT @limit";

    let params = ParameterCollection::new()
        .with_positional("books")
        .with("@limit", 10);
    assert_eq!(
        bind(sql, &params, StatementPreparerOptions::empty()),
        "SELECT * FROM items WHERE kind = 'books' LIMIT 10"
    );

    // `?` counts through the whole collection, named entries included.
    let params = ParameterCollection::new()
        .with("@limit", 10)
        .with_positional("books");
    assert_eq!(
        bind(sql, &params, StatementPreparerOptions::empty()),
        "SELECT * FROM items WHERE kind = 10 LIMIT 10"
    );
}

#[test]
fn test_quoted_and_commented_placeholders_untouched() {
    let params = ParameterCollection::new().with("@a", 5);
    assert_eq!(
        bind(
            "SELECT @a, 'literal @a', `col@a`, -- @a comment\n @a",
            &params,
            StatementPreparerOptions::empty()
        ),
        "SELECT 5, 'literal @a', `col@a`, -- @a comment\n 5"
    );
}

#[test]
fn test_more_placeholders_than_parameters() {
    let params = ParameterCollection::new()
        .with_positional(1)
        .with_positional(2);
    let err = StatementPreparer::new(
        "INSERT INTO t VALUES (?, ?, ?)",
        &params,
        StatementPreparerOptions::empty(),
    )
    .parse_and_bind()
    .unwrap_err();
    assert!(matches!(err, Error::Binding(_)), "got {err:?}");
}

#[test]
fn test_parameter_names_are_case_insensitive() {
    let params = ParameterCollection::new().with("@UserId", 5);
    assert_eq!(
        bind("DELETE FROM s WHERE u = @userid", &params, StatementPreparerOptions::empty()),
        "DELETE FROM s WHERE u = 5"
    );
}

#[test]
fn test_question_mark_parameter_names() {
    let params = ParameterCollection::new().with("?id", 1);
    assert_eq!(
        bind("SELECT @id", &params, StatementPreparerOptions::empty()),
        "SELECT 1"
    );
}

#[test]
fn test_system_variables_untouched() {
    let params = ParameterCollection::new();
    assert_eq!(
        bind(
            "SELECT @@session.sql_mode, @@version",
            &params,
            StatementPreparerOptions::empty()
        ),
        "SELECT @@session.sql_mode, @@version"
    );
}

#[test]
fn test_multiple_statements_share_parameters() {
    let params = ParameterCollection::new().with("@id", 3);
    assert_eq!(
        bind(
            "DELETE FROM a WHERE id = @id; DELETE FROM b WHERE id = @id;",
            &params,
            StatementPreparerOptions::empty()
        ),
        "DELETE FROM a WHERE id = 3; DELETE FROM b WHERE id = 3;"
    );
}

proptest! {
    #[test]
    fn string_literals_never_escape_their_quotes(value in ".*") {
        let params = ParameterCollection::new().with("@v", value.as_str());
        let bound = bind("SELECT @v", &params, StatementPreparerOptions::NO_BACKSLASH_ESCAPES);
        prop_assert_eq!(bound, format!("SELECT '{}'", value.replace('\'', "''")));
    }

    #[test]
    fn text_without_markers_is_copied(sql in "[a-zA-Z0-9 ,()=*]{1,64}") {
        prop_assume!(!sql.trim().is_empty());
        let params = ParameterCollection::new();
        prop_assert_eq!(bind(&sql, &params, StatementPreparerOptions::empty()), sql);
    }

    #[test]
    fn integers_bind_verbatim(n in any::<i64>()) {
        let params = ParameterCollection::new().with_positional(n);
        prop_assert_eq!(
            bind("SELECT ?", &params, StatementPreparerOptions::empty()),
            format!("SELECT {n}")
        );
    }
}
