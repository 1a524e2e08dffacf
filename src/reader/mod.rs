// ABOUTME: Public reader entry points — read_one and read_all

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::combinator::{match_rule, MatchOutcome, State};

mod error;
mod grammar;
mod value;

pub use error::ReadError;
pub use value::{BigDecimal, Form, Name};

fn chars_of(input: &str) -> State<char> {
    State::new(input.chars().collect::<Vec<_>>())
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "reader encountered a structurally invalid form".to_string()
    }
}

/// Reads exactly one form from `input`. Leading and trailing whitespace
/// and `;` comments are ignored; anything else left over after the form
/// is reported as [`ReadError::TrailingInput`].
///
/// A form that parses but violates a structural invariant (for instance a
/// map literal with an odd number of entries) surfaces as
/// [`ReadError::Invalid`] rather than [`ReadError::NoParse`] — the shape
/// matched, the content didn't.
pub fn read_one(input: &str) -> Result<Form, ReadError> {
    let state = chars_of(input);
    let rule = grammar::form_rule();

    match panic::catch_unwind(AssertUnwindSafe(move || match_rule(&rule, state))) {
        Err(payload) => Err(ReadError::invalid(panic_message(payload))),
        Ok(MatchOutcome::Matched(form)) => Ok(form),
        Ok(MatchOutcome::Failed(state)) => Err(ReadError::no_parse(state.position())),
        Ok(MatchOutcome::Incomplete(_, rest)) => Err(ReadError::trailing_input(
            rest.position(),
            rest.remainder().iter().collect::<String>(),
        )),
    }
}

/// Reads every form present in `input`, in order.
pub fn read_all(input: &str) -> Result<Vec<Form>, ReadError> {
    let state = chars_of(input);
    let rule = grammar::document_rule();

    match panic::catch_unwind(AssertUnwindSafe(move || match_rule(&rule, state))) {
        Err(payload) => Err(ReadError::invalid(panic_message(payload))),
        Ok(MatchOutcome::Matched(forms)) => Ok(forms),
        Ok(MatchOutcome::Failed(state)) => Err(ReadError::no_parse(state.position())),
        Ok(MatchOutcome::Incomplete(_, rest)) => Err(ReadError::trailing_input(
            rest.position(),
            rest.remainder().iter().collect::<String>(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_one_ignores_surrounding_whitespace() {
        assert_eq!(read_one("  42  ").unwrap(), Form::Integer(42));
    }

    #[test]
    fn read_one_reports_trailing_input() {
        let err = read_one("1 2").unwrap_err();
        assert!(matches!(err, ReadError::TrailingInput { .. }));
    }

    #[test]
    fn read_one_reports_no_parse_on_garbage() {
        let err = read_one(")").unwrap_err();
        assert!(matches!(err, ReadError::NoParse { .. }));
    }

    #[test]
    fn read_one_bridges_structural_panics_to_invalid() {
        let err = read_one("{:a}").unwrap_err();
        assert!(matches!(err, ReadError::Invalid { .. }));
    }

    #[test]
    fn read_all_reads_every_form_in_order() {
        let forms = read_all("1 2 3").unwrap();
        assert_eq!(forms, vec![Form::Integer(1), Form::Integer(2), Form::Integer(3)]);
    }

    #[test]
    fn read_all_of_empty_input_is_empty() {
        assert_eq!(read_all("   ").unwrap(), Vec::<Form>::new());
    }
}
