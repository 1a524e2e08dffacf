// ABOUTME: Public error type for the reader's entry points

use thiserror::Error;

/// Everything that can go wrong reading a form from text.
#[derive(Debug, Error, PartialEq)]
pub enum ReadError {
    /// No form could be parsed starting at `position`.
    #[error("no form could be parsed at character offset {position}")]
    NoParse { position: usize },

    /// A form parsed successfully but characters remained afterward.
    #[error("trailing input after a complete form, starting at character offset {position}: {remainder:?}")]
    TrailingInput { position: usize, remainder: String },

    /// A form matched an outer shape but violated a structural
    /// constraint (e.g. an odd number of map entries) — a hard failure
    /// bridged back into the reader's public `Result`-based API.
    #[error("invalid form: {reason}")]
    Invalid { reason: String },
}

impl ReadError {
    pub fn no_parse(position: usize) -> Self {
        ReadError::NoParse { position }
    }

    pub fn trailing_input(position: usize, remainder: impl Into<String>) -> Self {
        ReadError::TrailingInput {
            position,
            remainder: remainder.into(),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        ReadError::Invalid {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_mention_the_offending_position() {
        let err = ReadError::no_parse(3);
        assert!(err.to_string().contains('3'));
    }

    #[test]
    fn invalid_carries_a_free_form_reason() {
        let err = ReadError::invalid("odd number of map entries");
        assert!(err.to_string().contains("odd number of map entries"));
    }
}
