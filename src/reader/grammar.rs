// ABOUTME: The Lisp reader's grammar, built out of the combinator core

use std::rc::Rc;

use crate::combinator::{
    alt, anything, cascading_rep_plus, circumfix_conc, conc2, conc3, constant_semantics,
    digit_run_like, factor_eq, mapalt, mapconc, not_followed_by, opt, prefix_conc, radix_digit,
    rep_star, semantics, suffix_conc, term, Failure, Forward, InfoValue, ParseResult, Rule, State,
};

use super::value::{BigDecimal, Form, Name};

fn is_symbol_start(c: char) -> bool {
    c.is_alphabetic() || "*+!-_?<>=.$%&".contains(c)
}

fn is_symbol_const(c: char) -> bool {
    c.is_alphanumeric() || "*+!-_?<>=.$%&:".contains(c)
}

fn whitespace_char() -> Rule<char, char> {
    term(|c: &char| " \t\n\r,".contains(*c))
}

fn line_comment() -> Rule<char, ()> {
    constant_semantics(conc2(term(|c: &char| *c == ';'), rep_star(term(|c: &char| *c != '\n'))), ())
}

fn discard_form(form: Rule<char, Form>) -> Rule<char, ()> {
    constant_semantics(prefix_conc(mapconc("#_"), form), ())
}

/// Zero or more runs of whitespace, `;`-comments, and `#_`-discarded forms.
/// Never fails. `form` is the full form rule — needed both to parse (and
/// throw away) whatever follows a `#_`, and, recursively through the same
/// `Forward` indirection every other reader macro goes through, to let a
/// discarded form itself contain further ignorable content.
pub(crate) fn ignorable(form: Rule<char, Form>) -> Rule<char, ()> {
    constant_semantics(
        rep_star(alt(vec![
            constant_semantics(whitespace_char(), ()),
            line_comment(),
            discard_form(form.clone()),
        ])),
        (),
    )
}

fn skip_ws<O>(form: Rule<char, Form>, rule: Rule<char, O>) -> Rule<char, O>
where
    O: Clone + 'static,
{
    prefix_conc(ignorable(form), rule)
}

fn identifier_like(
    is_start: fn(char) -> bool,
    is_rest: fn(char) -> bool,
) -> Rule<char, String> {
    semantics(
        conc2(
            term(move |c: &char| is_start(*c)),
            rep_star(term(move |c: &char| is_rest(*c))),
        ),
        |(first, rest): (char, Vec<char>)| {
            let mut s = String::new();
            s.push(first);
            s.extend(rest);
            s
        },
    )
}

fn raw_symbol_name() -> Rule<char, String> {
    identifier_like(is_symbol_start, is_symbol_const)
}

/// Tries a namespace-qualified name first (`ns/name`), so `:a/b` reads as
/// a namespaced keyword rather than the bare keyword `:a` followed by
/// trailing garbage.
fn symbol_name_rule() -> Rule<char, Name> {
    let ns_qualified = semantics(
        conc3(raw_symbol_name(), term(|c: &char| *c == '/'), raw_symbol_name()),
        |(ns, _, name)| Name::namespaced(ns, name),
    );
    let division = constant_semantics(term(|c: &char| *c == '/'), Name::simple("/"));
    let normal = semantics(raw_symbol_name(), Name::simple);
    alt(vec![ns_qualified, division, normal])
}

fn word_boundary_literal(word: &'static str, form: Form) -> Rule<char, Form> {
    constant_semantics(
        suffix_conc(
            mapconc(word),
            not_followed_by(term(|c: &char| is_symbol_const(*c))),
        ),
        form,
    )
}

// ============================================================================
// Numbers
// ============================================================================

fn digits() -> Rule<char, String> {
    digit_run_like(term(|c: &char| c.is_ascii_digit()))
}

fn parse_exponent() -> Rule<char, String> {
    semantics(
        conc3(mapalt("eE"), opt(mapalt("+-")), digits()),
        |(_, sign, digits)| match sign {
            Some('-') => format!("-{digits}"),
            _ => digits,
        },
    )
}

fn reduce_fraction(n: i64, d: i64) -> (i64, i64) {
    fn gcd(a: i64, b: i64) -> i64 {
        if b == 0 {
            a.abs().max(1)
        } else {
            gcd(b, a % b)
        }
    }
    let g = gcd(n, d);
    (n / g, d / g)
}

/// The indicator characters that end a token on their own, without needing
/// surrounding whitespace: `;`, `(`, `)`, `[`, `]`, `{`, `}`, backslash,
/// `"`, `'`, `@`, `^`, backtick, `#`.
fn is_indicator(c: char) -> bool {
    ";()[]{}\\\"'@^`#".contains(c)
}

fn is_separator(c: char) -> bool {
    " \t\n\r,".contains(c) || is_indicator(c)
}

/// Lookahead for a separator or end-of-input; consumes nothing. A number
/// literal must be followed by one of these, or it isn't a number at
/// all — `123abc` has to fail as a number and fall through rather than
/// silently splitting into the forms `123` and `abc`.
fn form_terminator() -> Rule<char, ()> {
    Rc::new(|state: State<char>| {
        if state.is_empty() || is_separator(*state.peek()) {
            Ok(((), state))
        } else {
            Err(Failure)
        }
    })
}

fn number_form() -> Rule<char, Form> {
    suffix_conc(Rc::new(parse_number), form_terminator())
}

fn parse_number(state: State<char>) -> ParseResult<char, Form> {
    let (sign_char, state) = opt(mapalt("+-"))(state)?;
    let negative = sign_char == Some('-');

    let (int_part, state) = digits()(state)?;

    // Radix integer: <digits> "r" <digits in that radix>
    if let Ok((_, after_r)) = term(|c: &char| *c == 'r')(state.clone()) {
        let radix: u32 = int_part.parse().unwrap_or(0);
        if (2..=36).contains(&radix) {
            let fold_radix_digits = cascading_rep_plus(
                radix_digit(radix),
                |d: u32| d as i64,
                move |acc: i64, d: u32| acc * radix as i64 + d as i64,
            );
            if let Ok((value, after_digits)) = fold_radix_digits(after_r) {
                let value = if negative { -value } else { value };
                return Ok((Form::Integer(value), after_digits));
            }
        }
        return Err(Failure);
    }

    // Rational: <digits> "/" <digits>
    if let Ok((_, after_slash)) = term(|c: &char| *c == '/')(state.clone()) {
        if let Ok((denom_digits, after_denom)) = digits()(after_slash) {
            let numerator: i64 = int_part.parse().map_err(|_| Failure)?;
            let denominator: i64 = denom_digits.parse().map_err(|_| Failure)?;
            if denominator == 0 {
                // A zero denominator just isn't a valid rational literal;
                // this is an ordinary parse failure, not a hard one.
                return Err(Failure);
            }
            let numerator = if negative { -numerator } else { numerator };
            let (numerator, denominator) = reduce_fraction(numerator, denominator);
            return Ok((Form::Rational { numerator, denominator }, after_denom));
        }
        return Err(Failure);
    }

    // Float: <digits> "." <digits>? <exponent>? "M"?
    if let Ok((_, after_dot)) = term(|c: &char| *c == '.')(state.clone()) {
        let (frac_digits, after_frac) =
            digits()(after_dot.clone()).unwrap_or((String::new(), after_dot));
        let (exponent, after_exp) = opt(parse_exponent())(after_frac)?;
        let (is_decimal, after_suffix) = match term(|c: &char| *c == 'M')(after_exp.clone()) {
            Ok((_, s)) => (true, s),
            Err(_) => (false, after_exp),
        };

        if is_decimal {
            let mut all_digits = int_part.clone();
            all_digits.push_str(&frac_digits);
            let scale = frac_digits.len() as u32;
            return Ok((
                Form::Decimal(BigDecimal { negative, digits: all_digits, scale }),
                after_suffix,
            ));
        }

        let frac_for_parse = if frac_digits.is_empty() { "0" } else { &frac_digits };
        let mantissa = format!("{}{}.{}", if negative { "-" } else { "" }, int_part, frac_for_parse);
        let with_exp = match exponent {
            Some(e) => format!("{mantissa}e{e}"),
            None => mantissa,
        };
        let value: f64 = with_exp.parse().map_err(|_| Failure)?;
        return Ok((Form::Float(value), after_suffix));
    }

    // Plain integer, possibly with a bare exponent (still a float) or an M suffix.
    let (exponent, after_exp) = opt(parse_exponent())(state.clone())?;
    if let Some(e) = exponent {
        let mantissa = format!("{}{}", if negative { "-" } else { "" }, int_part);
        let value: f64 = format!("{mantissa}e{e}").parse().map_err(|_| Failure)?;
        return Ok((Form::Float(value), after_exp));
    }

    if let Ok((_, after_m)) = term(|c: &char| *c == 'M')(state.clone()) {
        return Ok((Form::Decimal(BigDecimal { negative, digits: int_part, scale: 0 }), after_m));
    }

    let value: i64 = int_part.parse().map_err(|_| Failure)?;
    let value = if negative { -value } else { value };
    Ok((Form::Integer(value), state))
}

// ============================================================================
// Characters
// ============================================================================

const CHARACTER_NAMES: &[(&str, char)] = &[
    ("newline", '\n'),
    ("space", ' '),
    ("tab", '\t'),
    ("backspace", '\u{8}'),
    ("formfeed", '\u{c}'),
    ("return", '\r'),
];

fn character_form() -> Rule<char, Form> {
    Rc::new(parse_character)
}

fn parse_character(state: State<char>) -> ParseResult<char, Form> {
    let (_, state) = term(|c: &char| *c == '\\')(state)?;

    for (name, ch) in CHARACTER_NAMES {
        let named = suffix_conc(mapconc(*name), not_followed_by(term(|c: &char| c.is_alphanumeric())));
        if let Ok((_, after_name)) = named(state.clone()) {
            return Ok((Form::Char(*ch), after_name));
        }
    }

    if let Ok((_, after_u)) = term(|c: &char| *c == 'u')(state.clone()) {
        if let Ok((hex_digits, after_hex)) = factor_eq(4, radix_digit(16))(after_u) {
            let code = hex_digits.iter().fold(0u32, |acc, d| acc * 16 + d);
            if let Some(c) = char::from_u32(code) {
                return Ok((Form::Char(c), after_hex));
            }
        }
        return Err(Failure);
    }

    let (c, after) = anything::<char>()(state)?;
    Ok((Form::Char(c), after))
}

// ============================================================================
// Strings
// ============================================================================

fn string_char() -> Rule<char, char> {
    Rc::new(|state: State<char>| {
        if state.is_empty() {
            return Err(Failure);
        }
        let c = *state.peek();
        if c == '"' {
            return Err(Failure);
        }
        if c != '\\' {
            return Ok((c, state.advance()));
        }
        let after_backslash = state.advance();
        if after_backslash.is_empty() {
            return Err(Failure);
        }
        let escape = *after_backslash.peek();
        let resolved = match escape {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '\\' => '\\',
            '"' => '"',
            '0' => '\0',
            other => other,
        };
        Ok((resolved, after_backslash.advance()))
    })
}

fn string_form() -> Rule<char, Form> {
    semantics(
        circumfix_conc(
            term(|c: &char| *c == '"'),
            rep_star(string_char()),
            term(|c: &char| *c == '"'),
        ),
        |chars: Vec<char>| Form::Str(chars.into_iter().collect()),
    )
}

/// The key `^` prefix parses record their warning under, in the same
/// `State::info` map spec'd out for arbitrary caller side-info (`line`,
/// `column`, `warnings`, ...).
const WARNINGS_KEY: &str = "warnings";

fn push_warning<T: Clone>(state: &State<T>, message: &str) -> State<T> {
    state.update_info(WARNINGS_KEY, |old| {
        let mut warnings: Vec<String> = old
            .and_then(|v| v.downcast_ref::<Vec<String>>().cloned())
            .unwrap_or_default();
        warnings.push(message.to_string());
        Rc::new(warnings) as InfoValue
    })
}

/// `^form` — the deprecated `meta` prefix. Wraps like the other prefix
/// forms, but also appends a deprecation notice to the resulting state's
/// `"warnings"` info, since unlike the others this one is deprecated.
fn deprecated_meta_form(inner_rule: Rule<char, Form>) -> Rule<char, Form> {
    Rc::new(move |state: State<char>| {
        let (_, state) = term(|c: &char| *c == '^')(state)?;
        let (inner, state) = inner_rule(state)?;
        let state = push_warning(&state, "the `^` meta prefix is deprecated");
        Ok((Form::wrapped("meta", inner), state))
    })
}

// ============================================================================
// The full, recursive grammar
// ============================================================================

thread_local! {
    static GRAMMAR: Rule<char, Form> = build_grammar();
}

/// The `form` rule: a single Lisp form, with surrounding whitespace and
/// comments consumed on the way in. Cloning is O(1) (an `Rc` bump), so
/// repeated calls don't rebuild the grammar.
pub(crate) fn form_rule() -> Rule<char, Form> {
    GRAMMAR.with(Clone::clone)
}

/// Zero or more forms, separated and surrounded by whitespace/comments —
/// the rule a whole source document is read against.
pub(crate) fn document_rule() -> Rule<char, Vec<Form>> {
    let form = form_rule();
    suffix_conc(rep_star(skip_ws(form.clone(), form.clone())), ignorable(form))
}

fn build_grammar() -> Rule<char, Form> {
    let form_forward: Forward<char, Form> = Forward::new();

    let nil_literal = word_boundary_literal("nil", Form::Nil);
    let true_literal = word_boundary_literal("true", Form::Bool(true));
    let false_literal = word_boundary_literal("false", Form::Bool(false));

    let keyword_form = semantics(
        prefix_conc(term(|c: &char| *c == ':'), symbol_name_rule()),
        Form::Keyword,
    );

    let list_items = conc2(
        rep_star(skip_ws(form_forward.rule(), form_forward.rule())),
        ignorable(form_forward.rule()),
    );
    let list_form = semantics(
        circumfix_conc(term(|c: &char| *c == '('), list_items, term(|c: &char| *c == ')')),
        |(items, ())| Form::List(items),
    );

    let vector_items = conc2(
        rep_star(skip_ws(form_forward.rule(), form_forward.rule())),
        ignorable(form_forward.rule()),
    );
    let vector_form = semantics(
        circumfix_conc(term(|c: &char| *c == '['), vector_items, term(|c: &char| *c == ']')),
        |(items, ())| Form::Vector(items),
    );

    let set_items = conc2(
        rep_star(skip_ws(form_forward.rule(), form_forward.rule())),
        ignorable(form_forward.rule()),
    );
    let set_form = semantics(
        circumfix_conc(mapconc("#{"), set_items, term(|c: &char| *c == '}')),
        |(items, ())| Form::Set(items),
    );

    let map_items = conc2(
        rep_star(skip_ws(form_forward.rule(), form_forward.rule())),
        ignorable(form_forward.rule()),
    );
    let map_form = semantics(
        circumfix_conc(term(|c: &char| *c == '{'), map_items, term(|c: &char| *c == '}')),
        |(items, ()): (Vec<Form>, ())| {
            if items.len() % 2 != 0 {
                // A map literal with an odd number of forms is not a soft
                // parse failure — the shape matched, the content didn't —
                // so it escalates to a hard failure instead.
                panic!("map literal has an odd number of forms: {}", items.len());
            }
            let pairs = items
                .chunks(2)
                .map(|pair| (pair[0].clone(), pair[1].clone()))
                .collect();
            Form::Map(pairs)
        },
    );

    let unquote_splicing_form = semantics(
        prefix_conc(mapconc("~@"), form_forward.rule()),
        |inner| Form::wrapped("unquote-splicing", inner),
    );
    let unquote_form = semantics(
        prefix_conc(term(|c: &char| *c == '~'), form_forward.rule()),
        |inner| Form::wrapped("unquote", inner),
    );
    let syntax_quote_form = semantics(
        prefix_conc(term(|c: &char| *c == '`'), form_forward.rule()),
        |inner| Form::wrapped("syntax-quote", inner),
    );
    let quote_form = semantics(
        prefix_conc(term(|c: &char| *c == '\''), form_forward.rule()),
        |inner| Form::wrapped("quote", inner),
    );
    let meta_form = deprecated_meta_form(form_forward.rule());
    let deref_form = semantics(
        prefix_conc(term(|c: &char| *c == '@'), form_forward.rule()),
        |inner| Form::wrapped("deref", inner),
    );

    let var_dispatch_form = semantics(
        prefix_conc(mapconc("#'"), form_forward.rule()),
        |inner| Form::wrapped("var", inner),
    );
    // `#^metadata form` → `(with-meta form metadata)`, with a bare
    // keyword/symbol metadata shorthand rewritten to `{:tag k}`.
    let with_meta_dispatch_form = semantics(
        prefix_conc(mapconc("#^"), conc2(form_forward.rule(), form_forward.rule())),
        |(metadata, form): (Form, Form)| {
            let metadata = match metadata {
                Form::Keyword(_) | Form::Symbol(_) => {
                    Form::Map(vec![(Form::Keyword(Name::simple("tag")), metadata)])
                }
                other => other,
            };
            Form::List(vec![Form::symbol("with-meta"), form, metadata])
        },
    );
    // `#(1 2)` → `(mini-fn 1 2)`: the matched series becomes the rest of
    // the list, not a nested list under a single `mini-fn` head.
    let anon_fn_dispatch_form = semantics(
        prefix_conc(term(|c: &char| *c == '#'), list_form.clone()),
        |inner: Form| match inner {
            Form::List(items) => {
                let mut out = Vec::with_capacity(items.len() + 1);
                out.push(Form::symbol("mini-fn"));
                out.extend(items);
                Form::List(out)
            }
            other => Form::wrapped("mini-fn", other),
        },
    );

    let symbol_form = semantics(symbol_name_rule(), Form::Symbol);

    let body = alt(vec![
        nil_literal,
        true_literal,
        false_literal,
        character_form(),
        string_form(),
        keyword_form,
        set_form,
        var_dispatch_form,
        with_meta_dispatch_form,
        anon_fn_dispatch_form,
        list_form,
        vector_form,
        map_form,
        unquote_splicing_form,
        unquote_form,
        syntax_quote_form,
        quote_form,
        meta_form,
        deref_form,
        number_form(),
        symbol_form,
    ]);

    let whole_form = skip_ws(form_forward.rule(), body);
    form_forward.set(whole_form.clone());
    whole_form
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Option<Form> {
        let state = State::new(input.chars().collect::<Vec<_>>());
        let rule = form_rule();
        match rule(state) {
            Ok((form, rest)) if rest.is_empty() => Some(form),
            _ => None,
        }
    }

    #[test]
    fn empty_list_is_not_nil() {
        assert_eq!(parse("()"), Some(Form::List(vec![])));
        assert_eq!(parse("nil"), Some(Form::Nil));
    }

    #[test]
    fn float_with_exponent() {
        assert_eq!(parse("55.2e2"), Some(Form::Float(5520.0)));
    }

    #[test]
    fn radix_integer() {
        assert_eq!(parse("16rFF"), Some(Form::Integer(255)));
    }

    #[test]
    fn trailing_dot_float() {
        assert_eq!(parse("16."), Some(Form::Float(16.0)));
    }

    #[test]
    fn namespaced_keyword() {
        assert_eq!(
            parse(":a/b"),
            Some(Form::Keyword(Name::namespaced("a", "b")))
        );
    }

    #[test]
    fn meta_prefix_wraps_target() {
        assert_eq!(
            parse("^()"),
            Some(Form::wrapped("meta", Form::List(vec![])))
        );
    }

    #[test]
    fn meta_prefix_records_a_deprecation_warning() {
        let state = State::new("^()".chars().collect::<Vec<_>>());
        let (_, state) = form_rule()(state).expect("^() should parse");
        let warnings = state
            .get_info(WARNINGS_KEY)
            .and_then(|v| v.downcast_ref::<Vec<String>>().cloned())
            .unwrap_or_default();
        assert_eq!(warnings, vec!["the `^` meta prefix is deprecated".to_string()]);
    }

    #[test]
    fn non_meta_forms_record_no_warnings() {
        let state = State::new("(1 2)".chars().collect::<Vec<_>>());
        let (_, state) = form_rule()(state).expect("(1 2) should parse");
        assert!(state.get_info(WARNINGS_KEY).is_none());
    }

    #[test]
    fn number_without_a_terminator_does_not_split_into_two_forms() {
        // Without the form-terminator check, this would wrongly read as
        // the two-element list `(123 abc)`.
        assert_eq!(parse("(123abc)"), None);
    }

    #[test]
    fn number_followed_by_an_indicator_is_still_a_number() {
        assert_eq!(parse("(123)"), Some(Form::List(vec![Form::Integer(123)])));
    }

    #[test]
    fn zero_denominator_rational_fails_to_parse() {
        assert_eq!(parse("3/0"), None);
    }

    #[test]
    fn hash_is_not_a_symbol_char() {
        // `#` is an indicator, not a symbol-char, so `foo#bar` is the
        // symbol `foo` with `#bar` left over, not one symbol `foo#bar`.
        assert_eq!(parse("foo#bar"), None);
    }

    #[test]
    fn peculiar_word_is_recognized_even_immediately_before_a_hash() {
        let state = State::new("nil#foo".chars().collect::<Vec<_>>());
        let (form, rest) = form_rule()(state).expect("nil should read as the peculiar symbol nil");
        assert_eq!(form, Form::Nil);
        assert_eq!(rest.remainder(), &['#', 'f', 'o', 'o']);
    }

    #[test]
    fn discard_form_is_thrown_away_inside_ignorable() {
        assert_eq!(parse("#_1 2"), Some(Form::Integer(2)));
    }

    #[test]
    fn with_meta_dispatch_builds_three_element_wrapper_with_tag_conversion() {
        assert_eq!(
            parse("#^:k x"),
            Some(Form::List(vec![
                Form::symbol("with-meta"),
                Form::symbol("x"),
                Form::Map(vec![(Form::Keyword(Name::simple("tag")), Form::Keyword(Name::simple("k")))]),
            ]))
        );
    }

    #[test]
    #[should_panic]
    fn odd_length_map_is_a_hard_failure() {
        parse("{:a}");
    }

    #[test]
    fn simple_rational_reduces() {
        assert_eq!(parse("2/4"), Some(Form::Rational { numerator: 1, denominator: 2 }));
    }

    #[test]
    fn character_literals() {
        assert_eq!(parse("\\newline"), Some(Form::Char('\n')));
        assert_eq!(parse("\\a"), Some(Form::Char('a')));
        assert_eq!(parse("\\u0041"), Some(Form::Char('A')));
    }

    #[test]
    fn string_with_escapes() {
        assert_eq!(parse("\"a\\nb\""), Some(Form::Str("a\nb".to_string())));
    }

    #[test]
    fn vector_and_set_literals() {
        assert_eq!(parse("[1 2]"), Some(Form::Vector(vec![Form::Integer(1), Form::Integer(2)])));
        assert_eq!(parse("#{1 2}"), Some(Form::Set(vec![Form::Integer(1), Form::Integer(2)])));
    }

    #[test]
    fn map_literal() {
        assert_eq!(
            parse("{:a 1}"),
            Some(Form::Map(vec![(Form::Keyword(Name::simple("a")), Form::Integer(1))]))
        );
    }

    #[test]
    fn document_with_reader_macros() {
        let source = "~@a ()";
        let state = State::new(source.chars().collect::<Vec<_>>());
        let (forms, rest) = document_rule()(state).expect("document should parse");
        assert!(rest.is_empty());
        assert_eq!(
            forms,
            vec![
                Form::wrapped("unquote-splicing", Form::symbol("a")),
                Form::List(vec![]),
            ]
        );
    }

    #[test]
    fn division_symbol_is_distinct_from_empty_namespace() {
        assert_eq!(parse("/"), Some(Form::Symbol(Name::simple("/"))));
    }
}
