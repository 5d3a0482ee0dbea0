use chumsky::prelude::*;
use serde_json::Value as JsonValue;
use smallvec::SmallVec;
use std::fmt;

use super::ParseError;
use crate::protocol::{FormState, FormValue};

/// The expressions a schema may bind: a read of the page state or a JSON
/// literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    State(String),
    Literal(JsonValue),
}

impl Expression {
    pub fn evaluate(&self, state: &FormState) -> JsonValue {
        match self {
            Self::State(key) => match state.get(key) {
                Some(FormValue::Text(text)) => JsonValue::String(text.clone()),
                Some(FormValue::List(items)) => {
                    JsonValue::Array(items.iter().cloned().map(JsonValue::String).collect())
                }
                Some(FormValue::Blob(blob)) => {
                    JsonValue::String(blob.file_name.clone().unwrap_or_default())
                }
                None => JsonValue::Null,
            },
            Self::Literal(value) => value.clone(),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::State(key) => write!(f, "states[{}]", JsonValue::String(key.clone())),
            Self::Literal(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    /// `$event`, the DOM event that triggered the listener.
    Event,
    Expression(Expression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: String,
    pub arguments: SmallVec<[Argument; 3]>,
}

fn json_literal<'src>()
-> impl Parser<'src, &'src str, JsonValue, extra::Err<ParseError<'src>>> + Clone {
    let shape = recursive(|value| {
        let string = just('"')
            .then(
                choice((
                    just('\\').then(any()).ignored(),
                    none_of("\\\"").ignored(),
                ))
                .repeated(),
            )
            .then(just('"'))
            .ignored()
            .boxed();

        let number = just('-')
            .or_not()
            .then(text::digits(10))
            .then(just('.').then(text::digits(10)).or_not())
            .then(
                one_of("eE")
                    .then(one_of("+-").or_not())
                    .then(text::digits(10))
                    .or_not(),
            )
            .ignored();

        let keyword = choice((just("true"), just("false"), just("null"))).ignored();

        let array = value
            .clone()
            .padded()
            .separated_by(just(','))
            .collect::<Vec<_>>()
            .delimited_by(just('[').then(text::whitespace()), just(']'))
            .ignored();

        let member = string.clone().padded().then_ignore(just(':')).then(value.padded());
        let object = member
            .separated_by(just(','))
            .collect::<Vec<_>>()
            .delimited_by(just('{').then(text::whitespace()), just('}'))
            .ignored();

        choice((string, number, keyword, array, object)).boxed()
    });

    shape.to_slice().try_map(|literal: &str, span| {
        serde_json::from_str(literal).map_err(|error| Rich::custom(span, error.to_string()))
    })
}

fn expression<'src>()
-> impl Parser<'src, &'src str, Expression, extra::Err<ParseError<'src>>> + Clone {
    let key = any()
        .filter(|c: &char| c.is_alphanumeric() || matches!(c, '_' | '$'))
        .repeated()
        .at_least(1)
        .to_slice()
        .map(ToString::to_string);

    let indexed_key = json_literal()
        .padded()
        .delimited_by(just('['), just(']'))
        .try_map(|literal, span| match literal {
            JsonValue::String(key) => Ok(key),
            other => Err(Rich::custom(
                span,
                format!("state keys are strings, found {other}"),
            )),
        });

    let state = just("states")
        .ignore_then(choice((just('.').ignore_then(key), indexed_key)))
        .map(Expression::State);

    choice((state, json_literal().map(Expression::Literal))).padded()
}

fn call<'src>() -> impl Parser<'src, &'src str, Call, extra::Err<ParseError<'src>>> {
    let argument = choice((
        just("$event").padded().to(Argument::Event),
        expression().map(Argument::Expression),
    ));

    text::ident()
        .padded()
        .then(
            argument
                .separated_by(just(','))
                .collect::<Vec<_>>()
                .delimited_by(just('('), just(')').padded()),
        )
        .map(|(method, arguments): (&str, Vec<Argument>)| Call {
            method: method.to_owned(),
            arguments: SmallVec::from_vec(arguments),
        })
}

pub fn parse_expression(source: &str) -> Result<Expression, String> {
    expression()
        .then_ignore(end())
        .parse(source)
        .into_result()
        .map_err(|errors| describe(&errors))
}

pub fn parse_call(source: &str) -> Result<Call, String> {
    call()
        .then_ignore(end())
        .parse(source)
        .into_result()
        .map_err(|errors| describe(&errors))
}

fn describe(errors: &[ParseError<'_>]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn state_reads() {
        assert_eq!(
            parse_expression(" states.count "),
            Ok(Expression::State("count".to_owned()))
        );
        assert_eq!(
            parse_expression(r#"states["Customer.Name"]"#),
            Ok(Expression::State("Customer.Name".to_owned()))
        );
        assert!(parse_expression("states[1]").is_err());
    }

    #[test]
    fn json_literals() {
        assert_eq!(
            parse_expression(r#"{"id": "inc", "params": ["a"], "n": -1.5e2, "ok": true}"#),
            Ok(Expression::Literal(
                json!({"id": "inc", "params": ["a"], "n": -150.0, "ok": true})
            ))
        );
        assert_eq!(
            parse_expression(r#" "quoted \"text\"" "#),
            Ok(Expression::Literal(json!("quoted \"text\"")))
        );
        assert_eq!(parse_expression("[ ]"), Ok(Expression::Literal(json!([]))));
        assert!(parse_expression("{id: 1}").is_err());
    }

    #[test]
    fn calls_with_event_and_literals() {
        let call = parse_call(r#"oninput(null, "name", $event)"#).unwrap();
        assert_eq!(call.method, "oninput");
        assert_eq!(
            call.arguments.as_slice(),
            [
                Argument::Expression(Expression::Literal(JsonValue::Null)),
                Argument::Expression(Expression::Literal(json!("name"))),
                Argument::Event,
            ]
        );

        let call = parse_call(r#"onclick({"id":"inc","pushState":null}, 5)"#).unwrap();
        assert_eq!(
            call.arguments[0],
            Argument::Expression(Expression::Literal(json!({"id": "inc", "pushState": null})))
        );
        assert_eq!(call.arguments[1], Argument::Expression(Expression::Literal(json!(5))));
    }

    #[test]
    fn rejects_arbitrary_javascript() {
        assert!(parse_call("onclick(window.location)").is_err());
        assert!(parse_call("alert(1); onclick()").is_err());
    }

    #[test]
    fn evaluates_against_state() {
        let mut state = FormState::new();
        state.set("count", "3");
        state.set("tags", FormValue::List(vec!["a".to_owned(), "b".to_owned()]));
        assert_eq!(Expression::State("count".to_owned()).evaluate(&state), json!("3"));
        assert_eq!(Expression::State("tags".to_owned()).evaluate(&state), json!(["a", "b"]));
        assert_eq!(Expression::State("missing".to_owned()).evaluate(&state), JsonValue::Null);
    }
}
