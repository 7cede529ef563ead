#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mysql_client::{Parameter, ParameterCollection, StatementPreparer, StatementPreparerOptions};

#[derive(Debug, Arbitrary)]
enum FuzzValue {
    Int(i64),
    Text(String),
    Blob(Vec<u8>),
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    sql: String,
    named: Vec<(String, FuzzValue)>,
    positional: Vec<FuzzValue>,
    no_backslash_escapes: bool,
    allow_user_variables: bool,
}

fn parameter(name: Option<String>, value: FuzzValue) -> Parameter {
    match (name, value) {
        (Some(name), FuzzValue::Int(v)) => Parameter::new(name, v),
        (Some(name), FuzzValue::Text(v)) => Parameter::new(name, v),
        (Some(name), FuzzValue::Blob(v)) => Parameter::new(name, v),
        (None, FuzzValue::Int(v)) => Parameter::positional(v),
        (None, FuzzValue::Text(v)) => Parameter::positional(v),
        (None, FuzzValue::Blob(v)) => Parameter::positional(v),
    }
}

fuzz_target!(|input: FuzzInput| {
    let mut parameters = ParameterCollection::new();
    for (name, value) in input.named {
        parameters.push(parameter(Some(format!("@{name}")), value));
    }
    for value in input.positional {
        parameters.push(parameter(None, value));
    }

    let mut options = StatementPreparerOptions::empty();
    options.set(
        StatementPreparerOptions::NO_BACKSLASH_ESCAPES,
        input.no_backslash_escapes,
    );
    options.set(
        StatementPreparerOptions::ALLOW_USER_VARIABLES,
        input.allow_user_variables,
    );

    if let Ok(payload) = StatementPreparer::new(&input.sql, &parameters, options).parse_and_bind() {
        assert_eq!(payload[0], 0x03);
    }
});
