// ABOUTME: Character-stream conveniences layered on the generic rule algebra

use std::rc::Rc;

use super::rule::{lit, rep_star, semantics, term, Rule};
use super::state::State;

/// `conc` restricted to `&str` literals: matches each character of `text`
/// in order, producing `text` itself on success.
pub fn mapconc(text: &'static str) -> Rule<char, &'static str> {
    let chars: Vec<char> = text.chars().collect();
    Rc::new(move |state: State<char>| {
        let mut state = state;
        for expected in &chars {
            let (_, next) = lit(*expected)(state)?;
            state = next;
        }
        Ok((text, state))
    })
}

/// `alt` restricted to single characters: succeeds with whichever
/// character of `choices` matched.
pub fn mapalt(choices: &'static str) -> Rule<char, char> {
    let set: Vec<char> = choices.chars().collect();
    term(move |c: &char| set.contains(c))
}

/// Succeeds iff the head character is one of `set`.
pub fn set_lit(set: &'static str) -> Rule<char, char> {
    let chars: Vec<char> = set.chars().collect();
    term(move |c: &char| chars.contains(c))
}

/// Succeeds iff the head character is *not* one of `set`.
pub fn antilit(set: &'static str) -> Rule<char, char> {
    let chars: Vec<char> = set.chars().collect();
    term(move |c: &char| !chars.contains(c))
}

/// `except(anything(), set_lit(set))`, phrased the way the reader grammar
/// wants it for "any character but these".
pub fn anything_except(set: &'static str) -> Rule<char, char> {
    antilit(set)
}

/// Matches a single digit valid in the given `radix` (2..=36), producing
/// its numeric value. Digits above 9 are matched case-insensitively
/// (`a`/`A` = 10, …, `z`/`Z` = 35), matching Clojure's radix literal
/// syntax (`16rFF`, `2r1010`).
pub fn radix_digit(radix: u32) -> Rule<char, u32> {
    semantics(term(move |c: &char| c.is_digit(radix)), move |c: char| {
        c.to_digit(radix).expect("predicate already checked digit-ness")
    })
}

/// One-or-more repetition folded into an accumulator as it goes, rather
/// than collected into a `Vec` and reduced afterwards: `init` turns the
/// first match into the starting accumulator, `step` folds in each
/// subsequent one. This is what lets a radix integer's digits (`16rFF`) be
/// assembled into a single numeric value in the same pass that matches
/// them, rather than matching a `Vec<u32>` and then folding it separately.
pub fn cascading_rep_plus<O, Acc>(
    rule: Rule<char, O>,
    init: impl Fn(O) -> Acc + 'static,
    step: impl Fn(Acc, O) -> Acc + 'static,
) -> Rule<char, Acc>
where
    O: Clone + 'static,
    Acc: Clone + 'static,
{
    Rc::new(move |state: State<char>| {
        let (first, state) = rule(state)?;
        let (rest, state) = rep_star(rule.clone())(state)?;
        let acc = rest.into_iter().fold(init(first), |acc, o| step(acc, o));
        Ok((acc, state))
    })
}

/// `cascading_rep_plus` specialized to collecting a run of `char` into the
/// `String` they spell out — the common case for digit/symbol-char runs.
pub fn digit_run_like(rule: Rule<char, char>) -> Rule<char, String> {
    cascading_rep_plus(
        rule,
        |c: char| c.to_string(),
        |mut acc: String, c: char| {
            acc.push(c);
            acc
        },
    )
}

/// Wraps `rule` so no character of input in between two lexemes is
/// implicitly skipped: `lex` exists only to name the intent ("this rule is
/// atomic; nothing softens its failure") since the core algebra has no
/// separate whitespace-skipping phase.
pub fn lex<O>(rule: Rule<char, O>) -> Rule<char, O>
where
    O: Clone + 'static,
{
    rule
}
