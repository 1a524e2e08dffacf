// ABOUTME: Drives a rule to completion against a state and classifies the
// ABOUTME: outcome as a full match, a failure, or an incomplete parse

use super::rule::Rule;
use super::state::State;

/// The three ways a top-level application of a rule to a state can end.
pub enum MatchOutcome<T, O>
where
    T: Clone + 'static,
{
    /// The rule succeeded and consumed every token.
    Matched(O),
    /// The rule failed outright; `state` is the pre-call state.
    Failed(State<T>),
    /// The rule succeeded but left tokens unconsumed.
    Incomplete(O, State<T>),
}

impl<T, O> std::fmt::Debug for MatchOutcome<T, O>
where
    T: Clone + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MatchOutcome::Matched(_) => "Matched",
            MatchOutcome::Failed(_) => "Failed",
            MatchOutcome::Incomplete(_, _) => "Incomplete",
        };
        f.write_str(name)
    }
}

/// Applies `rule` to `state` and classifies the outcome. This is the
/// boundary between the combinator core (which only knows about
/// success/failure of a single application) and callers like the reader,
/// which need to turn "leftover input" into their own named error variant.
pub fn match_rule<T, O>(rule: &Rule<T, O>, state: State<T>) -> MatchOutcome<T, O>
where
    T: Clone + 'static,
    O: Clone + 'static,
{
    let original = state.clone();
    match rule(state) {
        Err(_) => MatchOutcome::Failed(original),
        Ok((product, rest)) => {
            if rest.is_empty() {
                MatchOutcome::Matched(product)
            } else {
                MatchOutcome::Incomplete(product, rest)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinator::rule::lit;

    #[test]
    fn full_match_reports_product() {
        let rule = lit('a');
        let state = State::new(vec!['a']);
        match match_rule(&rule, state) {
            MatchOutcome::Matched(c) => assert_eq!(c, 'a'),
            other => panic!("expected Matched, got {other:?}"),
        }
    }

    #[test]
    fn failure_reports_pre_call_state() {
        let rule = lit('a');
        let state = State::new(vec!['b']);
        match match_rule(&rule, state) {
            MatchOutcome::Failed(s) => assert_eq!(s.position(), 0),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn leftover_input_reports_incomplete() {
        let rule = lit('a');
        let state = State::new(vec!['a', 'b']);
        match match_rule(&rule, state) {
            MatchOutcome::Incomplete(c, rest) => {
                assert_eq!(c, 'a');
                assert_eq!(rest.position(), 1);
            }
            other => panic!("expected Incomplete, got {other:?}"),
        }
    }
}
