// ABOUTME: A from-scratch parser-combinator core: state, the rule algebra,
// ABOUTME: a top-level matcher, and character-stream conveniences

mod charkit;
mod matcher;
mod rule;
mod state;

pub use charkit::{
    anything_except, antilit, cascading_rep_plus, digit_run_like, lex, mapalt, mapconc,
    radix_digit, set_lit,
};
pub use matcher::{match_rule, MatchOutcome};
pub use rule::{
    alt, anti_validate, anything, bind_any, bridge_panics, circumfix_conc, complex,
    conc2, conc3, conc4, conc_vec, constant_semantics, effects, emptiness, end_of_input, except,
    factor_eq, factor_lt, factor_lte, failpoint, followed_by, get_state, intercept, invisi_conc,
    lit, next_rule_id, nothing, not_followed_by, opt, prefix_conc, remember, rep_eq, rep_lt,
    rep_lte, rep_plus, rep_star, semantics, set_state, suffix_conc, term, validate, with_label,
    Bindings, ComplexStep, Failure, ParseResult, Forward, Rule,
};
pub use state::{InfoValue, State};
