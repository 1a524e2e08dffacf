// ABOUTME: Black-box tests for the combinator core through its public API

use peglisp::combinator::{
    alt, conc2, conc3, lit, match_rule, opt, rep_plus, rep_star, semantics, term, Forward,
    MatchOutcome, State,
};

fn chars(s: &str) -> State<char> {
    State::new(s.chars().collect::<Vec<_>>())
}

#[test]
fn arithmetic_expression_grammar_parses_left_to_right() {
    // expr := digit (("+" | "-") digit)*
    let digit = semantics(term(|c: &char| c.is_ascii_digit()), |c: char| {
        c.to_digit(10).unwrap() as i64
    });
    let op_digit = conc2(alt(vec![lit('+'), lit('-')]), digit.clone());
    let expr = semantics(
        conc2(digit, rep_star(op_digit)),
        |(first, rest): (i64, Vec<(char, i64)>)| {
            rest.into_iter().fold(first, |acc, (op, n)| {
                if op == '+' {
                    acc + n
                } else {
                    acc - n
                }
            })
        },
    );

    let (value, state) = expr(chars("5+3-2")).unwrap();
    assert_eq!(value, 6);
    assert!(state.is_empty());
}

#[test]
fn match_rule_classifies_incomplete_parses() {
    let rule = lit('a');
    match match_rule(&rule, chars("ab")) {
        MatchOutcome::Incomplete(c, rest) => {
            assert_eq!(c, 'a');
            assert_eq!(rest.remainder(), &['b']);
        }
        other => panic!("expected Incomplete, got {other:?}"),
    }
}

#[test]
fn forward_reference_supports_mutual_recursion() {
    // even := "x" odd | ""      (epsilon)
    // odd  := "x" even
    let even_forward: Forward<char, usize> = Forward::new();
    let odd_forward: Forward<char, usize> = Forward::new();

    let even_body = semantics(
        opt(conc2(lit('x'), odd_forward.rule())),
        |opt_pair: Option<(char, usize)>| match opt_pair {
            Some((_, n)) => n + 1,
            None => 0,
        },
    );
    even_forward.set(even_body);

    let odd_body = semantics(conc2(lit('x'), even_forward.rule()), |(_, n)| n + 1);
    odd_forward.set(odd_body);

    let even = even_forward.rule();
    let (n, state) = even(chars("xxxx")).unwrap();
    assert_eq!(n, 4);
    assert!(state.is_empty());
}

#[test]
fn three_way_conc_rejects_partial_matches() {
    let rule = conc3(lit('a'), lit('b'), lit('c'));
    assert!(rule(chars("abc")).is_ok());
    assert!(rule(chars("abx")).is_err());
    assert!(rule(chars("ab")).is_err());
}

#[test]
fn rep_plus_requires_at_least_one_match() {
    let rule = rep_plus(lit('a'));
    let (matches, state) = rule(chars("aaab")).unwrap();
    assert_eq!(matches.len(), 3);
    assert_eq!(state.remainder(), &['b']);
    assert!(rule(chars("b")).is_err());
}
