// ABOUTME: The rule algebra — primitives and combinators that build larger
// ABOUTME: rules out of smaller ones, plus memoization and left-recursion handling

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::state::{MemoSlot, State};

/// A failed (non-matching) parse attempt. Soft failures carry no further
/// information — the caller simply continues with the pre-call state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Failure;

/// The outcome of applying a rule: either a `(product, new_state)` pair on
/// success, or [`Failure`] on (soft) failure.
///
/// Hard failures bypass this algebra entirely — they are implemented as
/// Rust panics (see [`failpoint`] and [`intercept`]), not as an `Err`
/// variant here.
pub type ParseResult<T, O> = Result<(O, State<T>), Failure>;

/// A rule: an opaque value behaving as a function `State -> Result`. Rules
/// are first-class, cheaply cloned (`Rc`) values, which is what lets
/// [`Forward`] support mutually recursive grammars.
pub type Rule<T, O> = Rc<dyn Fn(State<T>) -> ParseResult<T, O>>;

static NEXT_RULE_ID: AtomicU64 = AtomicU64::new(0);

/// Allocate a fresh construction-time rule identity, used by [`remember`]
/// as the memo key's first component. A hash of structure would not do —
/// two structurally identical rules can have divergent semantics under
/// side effects ([`effects`]), so identity must be assigned once, at
/// construction.
pub fn next_rule_id() -> u64 {
    NEXT_RULE_ID.fetch_add(1, Ordering::Relaxed)
}

// ============================================================================
// Primitives
// ============================================================================

/// Succeeds with the head token iff the remainder is non-empty; advances one.
pub fn anything<T>() -> Rule<T, T>
where
    T: Clone + 'static,
{
    Rc::new(|state: State<T>| {
        if state.is_empty() {
            Err(Failure)
        } else {
            let tok = state.peek().clone();
            Ok((tok, state.advance()))
        }
    })
}

/// Succeeds with `()`, consuming nothing.
pub fn emptiness<T>() -> Rule<T, ()>
where
    T: Clone + 'static,
{
    Rc::new(|state: State<T>| Ok(((), state)))
}

/// Always fails.
pub fn nothing<T, O>() -> Rule<T, O>
where
    T: Clone + 'static,
    O: Clone + 'static,
{
    Rc::new(|_state: State<T>| Err(Failure))
}

/// Succeeds with `()` iff the remainder is empty; consumes nothing.
pub fn end_of_input<T>() -> Rule<T, ()>
where
    T: Clone + 'static,
{
    Rc::new(|state: State<T>| {
        if state.is_empty() {
            Ok(((), state))
        } else {
            Err(Failure)
        }
    })
}

/// Succeeds with the head token iff `pred` holds for it. Equivalent to
/// `validate(anything(), pred)`.
pub fn term<T, F>(pred: F) -> Rule<T, T>
where
    T: Clone + 'static,
    F: Fn(&T) -> bool + 'static,
{
    Rc::new(move |state: State<T>| {
        if state.is_empty() {
            return Err(Failure);
        }
        let tok = state.peek().clone();
        if pred(&tok) {
            Ok((tok, state.advance()))
        } else {
            Err(Failure)
        }
    })
}

/// `term(|t| *t == token)`.
pub fn lit<T>(token: T) -> Rule<T, T>
where
    T: Clone + PartialEq + 'static,
{
    term(move |t: &T| *t == token)
}

/// Succeeds with a clone of the current state as its own product, consuming
/// nothing. This is what makes it possible to phrase [`except`] as
/// `complex([Bind("s", get_state()), Bind("p", a), When(...)], |b| ...)`,
/// the way the algebra defines it — `except` itself just does the
/// equivalent thing directly, without going through `complex`.
pub fn get_state<T>() -> Rule<T, State<T>>
where
    T: Clone + 'static,
{
    Rc::new(|state: State<T>| {
        let product = state.clone();
        Ok((product, state))
    })
}

/// Succeeds with `()`, discarding wherever parsing actually arrived and
/// continuing from `s` instead.
pub fn set_state<T>(s: State<T>) -> Rule<T, ()>
where
    T: Clone + 'static,
{
    Rc::new(move |_state: State<T>| Ok(((), s.clone())))
}

// ============================================================================
// Semantic transforms
// ============================================================================

/// Runs `rule`; on success, succeeds iff `pred(product)`.
pub fn validate<T, O, F>(rule: Rule<T, O>, pred: F) -> Rule<T, O>
where
    T: Clone + 'static,
    O: Clone + 'static,
    F: Fn(&O) -> bool + 'static,
{
    Rc::new(move |state: State<T>| {
        let (product, new_state) = rule(state)?;
        if pred(&product) {
            Ok((product, new_state))
        } else {
            Err(Failure)
        }
    })
}

/// Runs `rule`; succeeds iff `pred(product)` is false. `label` is purely
/// diagnostic and does not affect control flow.
pub fn anti_validate<T, O, F>(rule: Rule<T, O>, pred: F, _label: &'static str) -> Rule<T, O>
where
    T: Clone + 'static,
    O: Clone + 'static,
    F: Fn(&O) -> bool + 'static,
{
    validate(rule, move |o| !pred(o))
}

/// On success of `rule`, replaces the product with `f(product)`.
pub fn semantics<T, O, O2, F>(rule: Rule<T, O>, f: F) -> Rule<T, O2>
where
    T: Clone + 'static,
    O: Clone + 'static,
    O2: Clone + 'static,
    F: Fn(O) -> O2 + 'static,
{
    Rc::new(move |state: State<T>| {
        let (product, new_state) = rule(state)?;
        Ok((f(product), new_state))
    })
}

/// Replaces the product of `rule` with the constant `k` on success.
pub fn constant_semantics<T, O, K>(rule: Rule<T, O>, k: K) -> Rule<T, K>
where
    T: Clone + 'static,
    O: Clone + 'static,
    K: Clone + 'static,
{
    semantics(rule, move |_| k.clone())
}

// ============================================================================
// Sequencing (conc) — memoization is mandatory here
// ============================================================================

/// Sequential composition of two rules, memoized. The product is the pair
/// of sub-products; any sub-failure fails the whole and restores the state
/// to before the `conc` (nothing here mutates the caller's original state
/// value, since `State` is immutable — failure simply never returns a new
/// one).
pub fn conc2<T, O1, O2>(r1: Rule<T, O1>, r2: Rule<T, O2>) -> Rule<T, (O1, O2)>
where
    T: Clone + 'static,
    O1: Clone + 'static,
    O2: Clone + 'static,
{
    remember(Rc::new(move |state: State<T>| {
        let (a, state) = r1(state)?;
        let (b, state) = r2(state)?;
        Ok(((a, b), state))
    }))
}

/// Three-way [`conc2`].
pub fn conc3<T, O1, O2, O3>(
    r1: Rule<T, O1>,
    r2: Rule<T, O2>,
    r3: Rule<T, O3>,
) -> Rule<T, (O1, O2, O3)>
where
    T: Clone + 'static,
    O1: Clone + 'static,
    O2: Clone + 'static,
    O3: Clone + 'static,
{
    remember(Rc::new(move |state: State<T>| {
        let (a, state) = r1(state)?;
        let (b, state) = r2(state)?;
        let (c, state) = r3(state)?;
        Ok(((a, b, c), state))
    }))
}

/// Four-way [`conc2`].
pub fn conc4<T, O1, O2, O3, O4>(
    r1: Rule<T, O1>,
    r2: Rule<T, O2>,
    r3: Rule<T, O3>,
    r4: Rule<T, O4>,
) -> Rule<T, (O1, O2, O3, O4)>
where
    T: Clone + 'static,
    O1: Clone + 'static,
    O2: Clone + 'static,
    O3: Clone + 'static,
    O4: Clone + 'static,
{
    remember(Rc::new(move |state: State<T>| {
        let (a, state) = r1(state)?;
        let (b, state) = r2(state)?;
        let (c, state) = r3(state)?;
        let (d, state) = r4(state)?;
        Ok(((a, b, c, d), state))
    }))
}

/// Homogeneous n-ary `conc`: all sub-rules share a product type, and the
/// result is the ordered `Vec` of sub-products, e.g. `mapconc`/`factor=`.
pub fn conc_vec<T, O>(rules: Vec<Rule<T, O>>) -> Rule<T, Vec<O>>
where
    T: Clone + 'static,
    O: Clone + 'static,
{
    remember(Rc::new(move |state: State<T>| {
        let mut state = state;
        let mut out = Vec::with_capacity(rules.len());
        for r in &rules {
            let (v, next) = r(state)?;
            out.push(v);
            state = next;
        }
        Ok((out, state))
    }))
}

// ============================================================================
// Ordered choice
// ============================================================================

/// Ordered choice: tries each rule in order from the same state; the first
/// success wins; all failing is a failure. Not commutative: reordering the
/// alternatives can change which one matches a given input.
pub fn alt<T, O>(rules: Vec<Rule<T, O>>) -> Rule<T, O>
where
    T: Clone + 'static,
    O: Clone + 'static,
{
    Rc::new(move |state: State<T>| {
        for r in &rules {
            if let Ok(result) = r(state.clone()) {
                return Ok(result);
            }
        }
        Err(Failure)
    })
}

// ============================================================================
// Monadic sugar (`complex`)
// ============================================================================

/// The bindings accumulated by a [`complex`] rule so far, keyed by the
/// binding name given in the corresponding [`ComplexStep::Bind`].
pub type Bindings = HashMap<String, Rc<dyn Any>>;

/// One step of a `complex` rule: either bind a sub-rule's product (wrapped
/// so it can sit alongside bindings of other types) under a name, or
/// require a predicate over bindings seen so far to hold.
pub enum ComplexStep<T>
where
    T: Clone + 'static,
{
    Bind(String, Rule<T, Rc<dyn Any>>),
    When(Rc<dyn Fn(&Bindings) -> bool>),
}

/// Lifts a typed rule into one whose product is type-erased, so it can be
/// used as a [`ComplexStep::Bind`] step.
pub fn bind_any<T, O>(rule: Rule<T, O>) -> Rule<T, Rc<dyn Any>>
where
    T: Clone + 'static,
    O: Clone + 'static,
{
    semantics(rule, |v: O| Rc::new(v) as Rc<dyn Any>)
}

/// Monadic sugar binding successive sub-products to names; any `When` step
/// failing fails the whole; `body` computes the final product from the
/// bindings. Rust's static type system can't give this a single
/// variadic/typed signature for a heterogeneous sequence of binding types,
/// so bindings are carried as `Rc<dyn Any>` and downcast by callers.
pub fn complex<T, O, B>(steps: Vec<ComplexStep<T>>, body: B) -> Rule<T, O>
where
    T: Clone + 'static,
    O: Clone + 'static,
    B: Fn(&Bindings) -> Option<O> + 'static,
{
    Rc::new(move |state: State<T>| {
        let mut bindings: Bindings = HashMap::new();
        let mut state = state;
        for step in &steps {
            match step {
                ComplexStep::Bind(name, rule) => {
                    let (v, next) = rule(state)?;
                    bindings.insert(name.clone(), v);
                    state = next;
                }
                ComplexStep::When(pred) => {
                    if !pred(&bindings) {
                        return Err(Failure);
                    }
                }
            }
        }
        match body(&bindings) {
            Some(v) => Ok((v, state)),
            None => Err(Failure),
        }
    })
}

// ============================================================================
// Optionality and repetition
// ============================================================================

/// `alt(rule, emptiness)`, generalized to Rust's `Option`: always succeeds;
/// `None` if `rule` fails.
pub fn opt<T, O>(rule: Rule<T, O>) -> Rule<T, Option<O>>
where
    T: Clone + 'static,
    O: Clone + 'static,
{
    Rc::new(move |state: State<T>| match rule(state.clone()) {
        Ok((v, next)) => Ok((Some(v), next)),
        Err(_) => Ok((None, state)),
    })
}

/// Greedy zero-or-more; never fails. Written as an explicit loop rather
/// than mutual recursion with [`rep_plus`]: a naively recursive `rep*`/
/// `rep+` pair built on each other tends to blow the stack on long inputs.
///
/// A repetition that matches without consuming any tokens stops after one
/// iteration rather than looping forever; this is a safety guard the
/// abstract algebra doesn't need to state but any real implementation
/// does.
pub fn rep_star<T, O>(rule: Rule<T, O>) -> Rule<T, Vec<O>>
where
    T: Clone + 'static,
    O: Clone + 'static,
{
    Rc::new(move |state: State<T>| {
        let mut state = state;
        let mut out = Vec::new();
        loop {
            let before = state.position();
            match rule(state.clone()) {
                Ok((v, next)) => {
                    let made_progress = next.position() != before;
                    out.push(v);
                    state = next;
                    if !made_progress {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
        Ok((out, state))
    })
}

/// One-or-more; fails if the first invocation fails, else behaves like
/// [`rep_star`].
pub fn rep_plus<T, O>(rule: Rule<T, O>) -> Rule<T, Vec<O>>
where
    T: Clone + 'static,
    O: Clone + 'static,
{
    let star = rep_star(rule.clone());
    Rc::new(move |state: State<T>| {
        let (first, state) = rule(state)?;
        let (rest, state) = star(state)?;
        let mut out = Vec::with_capacity(1 + rest.len());
        out.push(first);
        out.extend(rest);
        Ok((out, state))
    })
}

/// `validate(rep_star(rule), |v| v.len() == n)`.
pub fn rep_eq<T, O>(n: usize, rule: Rule<T, O>) -> Rule<T, Vec<O>>
where
    T: Clone + 'static,
    O: Clone + 'static,
{
    validate(rep_star(rule), move |v: &Vec<O>| v.len() == n)
}

/// `validate(rep_star(rule), |v| v.len() < n)`.
pub fn rep_lt<T, O>(n: usize, rule: Rule<T, O>) -> Rule<T, Vec<O>>
where
    T: Clone + 'static,
    O: Clone + 'static,
{
    validate(rep_star(rule), move |v: &Vec<O>| v.len() < n)
}

/// `validate(rep_star(rule), |v| v.len() <= n)`.
pub fn rep_lte<T, O>(n: usize, rule: Rule<T, O>) -> Rule<T, Vec<O>>
where
    T: Clone + 'static,
    O: Clone + 'static,
{
    validate(rep_star(rule), move |v: &Vec<O>| v.len() <= n)
}

/// Exact-count repetition: `conc(r, ..., r)`, `n` times.
pub fn factor_eq<T, O>(n: usize, rule: Rule<T, O>) -> Rule<T, Vec<O>>
where
    T: Clone + 'static,
    O: Clone + 'static,
{
    let rules: Vec<Rule<T, O>> = (0..n).map(|_| Rc::clone(&rule)).collect();
    conc_vec(rules)
}

/// Tries `factor_eq(n - 1, rule)`, then falls back to `rep_lt(n, rule)`
/// (which never fails).
pub fn factor_lt<T, O>(n: usize, rule: Rule<T, O>) -> Rule<T, Vec<O>>
where
    T: Clone + 'static,
    O: Clone + 'static,
{
    let exact = factor_eq(n.saturating_sub(1), Rc::clone(&rule));
    let fallback = rep_lt(n, rule);
    Rc::new(move |state: State<T>| match exact(state.clone()) {
        Ok(result) => Ok(result),
        Err(_) => fallback(state),
    })
}

/// Tries `factor_eq(n, rule)`, then falls back to `rep_lt(n, rule)`.
pub fn factor_lte<T, O>(n: usize, rule: Rule<T, O>) -> Rule<T, Vec<O>>
where
    T: Clone + 'static,
    O: Clone + 'static,
{
    let exact = factor_eq(n, Rc::clone(&rule));
    let fallback = rep_lt(n, rule);
    Rc::new(move |state: State<T>| match exact(state.clone()) {
        Ok(result) => Ok(result),
        Err(_) => fallback(state),
    })
}

// ============================================================================
// Lookahead and subtraction
// ============================================================================

/// Lookahead: runs `rule`; on success yields its product but restores the
/// pre-call state; on failure, fails. Consumes no tokens either way.
pub fn followed_by<T, O>(rule: Rule<T, O>) -> Rule<T, O>
where
    T: Clone + 'static,
    O: Clone + 'static,
{
    Rc::new(move |state: State<T>| {
        let (v, _discarded) = rule(state.clone())?;
        Ok((v, state))
    })
}

/// Negative lookahead: succeeds with `true` iff `rule` fails; never
/// consumes.
pub fn not_followed_by<T, O>(rule: Rule<T, O>) -> Rule<T, bool>
where
    T: Clone + 'static,
    O: Clone + 'static,
{
    Rc::new(move |state: State<T>| match rule(state.clone()) {
        Ok(_) => Err(Failure),
        Err(_) => Ok((true, state)),
    })
}

/// Succeeds with `a`'s product iff `a` succeeds *and* `b` would fail at the
/// same pre-call state.
pub fn except<T, OA, OB>(a: Rule<T, OA>, b: Rule<T, OB>) -> Rule<T, OA>
where
    T: Clone + 'static,
    OA: Clone + 'static,
    OB: Clone + 'static,
{
    Rc::new(move |state: State<T>| {
        if b(state.clone()).is_ok() {
            return Err(Failure);
        }
        a(state)
    })
}

// ============================================================================
// Sequencing sugar
// ============================================================================

/// `semantics(conc2(pre, main), |(_, m)| m)`.
pub fn prefix_conc<T, OPre, OMain>(pre: Rule<T, OPre>, main: Rule<T, OMain>) -> Rule<T, OMain>
where
    T: Clone + 'static,
    OPre: Clone + 'static,
    OMain: Clone + 'static,
{
    semantics(conc2(pre, main), |(_, m)| m)
}

/// `semantics(conc2(main, post), |(m, _)| m)`.
pub fn suffix_conc<T, OMain, OPost>(main: Rule<T, OMain>, post: Rule<T, OPost>) -> Rule<T, OMain>
where
    T: Clone + 'static,
    OMain: Clone + 'static,
    OPost: Clone + 'static,
{
    semantics(conc2(main, post), |(m, _)| m)
}

/// `semantics(conc3(open, body, close), |(_, b, _)| b)`.
pub fn circumfix_conc<T, OOpen, OBody, OClose>(
    open: Rule<T, OOpen>,
    body: Rule<T, OBody>,
    close: Rule<T, OClose>,
) -> Rule<T, OBody>
where
    T: Clone + 'static,
    OOpen: Clone + 'static,
    OBody: Clone + 'static,
    OClose: Clone + 'static,
{
    semantics(conc3(open, body, close), |(_, b, _)| b)
}

/// Yields the first sub-product regardless of how many rules follow it.
pub fn invisi_conc<T, O1, O2>(first: Rule<T, O1>, rest: Vec<Rule<T, O2>>) -> Rule<T, O1>
where
    T: Clone + 'static,
    O1: Clone + 'static,
    O2: Clone + 'static,
{
    let rest_rule = conc_vec(rest);
    semantics(conc2(first, rest_rule), |(a, _)| a)
}

/// A semantic no-op on success; `label` is purely a diagnostic annotation,
/// recorded under the `"label"` info-key so a caller reading the final
/// failed state can surface it. Never affects control flow.
pub fn with_label<T, O>(label: &'static str, rule: Rule<T, O>) -> Rule<T, O>
where
    T: Clone + 'static,
    O: Clone + 'static,
{
    Rc::new(move |state: State<T>| {
        let tagged = state.set_info("label", Rc::new(label));
        rule(tagged)
    })
}

// ============================================================================
// Side effects and failure escalation
// ============================================================================

/// Succeeds with `()`, performing a caller-specified side effect. The
/// library permits side effects here by contract; callers are responsible
/// for idempotence.
pub fn effects<T, F>(f: F) -> Rule<T, ()>
where
    T: Clone + 'static,
    F: Fn(&State<T>) + 'static,
{
    Rc::new(move |state: State<T>| {
        f(&state);
        Ok(((), state))
    })
}

/// On failure of `rule`, calls `hook(remainder, state)` and returns its
/// result as the rule's own result. `hook` typically raises a hard failure
/// (panics) rather than returning.
pub fn failpoint<T, O, H>(rule: Rule<T, O>, hook: Rc<H>) -> Rule<T, O>
where
    T: Clone + 'static,
    O: Clone + 'static,
    H: Fn(&[T], &State<T>) -> ParseResult<T, O> + 'static,
{
    Rc::new(move |state: State<T>| match rule(state.clone()) {
        Ok(result) => Ok(result),
        Err(_) => hook(state.remainder(), &state),
    })
}

/// Wraps the evaluation of `rule` so `hook` receives a thunk that, when
/// invoked, runs `rule` against the current state; `hook`'s return is the
/// rule's result. This is the hook for bridging hard failures (Rust
/// panics) back into the combinator algebra during a specific sub-rule's
/// evaluation — see [`bridge_panics`] for the common case.
pub fn intercept<T, O, H>(rule: Rule<T, O>, hook: Rc<H>) -> Rule<T, O>
where
    T: Clone + 'static,
    O: Clone + 'static,
    H: Fn(&dyn Fn() -> ParseResult<T, O>) -> ParseResult<T, O> + 'static,
{
    Rc::new(move |state: State<T>| {
        let rule = Rc::clone(&rule);
        let state_for_thunk = state.clone();
        let thunk = move || rule(state_for_thunk.clone());
        hook(&thunk)
    })
}

/// `intercept` specialized to catch a panic raised anywhere inside `rule`
/// and convert it back into an ordinary soft [`Failure`], so a hard failure
/// deep inside a sub-grammar doesn't necessarily abort the whole parse.
pub fn bridge_panics<T, O>(rule: Rule<T, O>) -> Rule<T, O>
where
    T: Clone + 'static,
    O: Clone + 'static,
{
    let hook = Rc::new(|thunk: &dyn Fn() -> ParseResult<T, O>| {
        match std::panic::catch_unwind(std::panic::AssertUnwindSafe(thunk)) {
            Ok(result) => result,
            Err(_) => Err(Failure),
        }
    });
    intercept(rule, hook)
}

// ============================================================================
// Memoization and left recursion
// ============================================================================

/// Memoizes `rule`, caching `(rule_identity, position) -> result` in the
/// state's shared memo table. The first invocation at a given position
/// stores the result; later invocations at the same position return it
/// directly.
///
/// Also implements the seed-growing technique for left-recursive rules
/// (Warth et al.): a re-entrant call at the same `(id, position)` — i.e. a
/// left-recursive self-reference — is answered with the *current* seed
/// (initially a failure) instead of recursing again. If evaluating the
/// rule body against that seed advances further than the seed did, the
/// seed is replaced and the body is re-run; this repeats until an attempt
/// fails to advance further, at which point the last successful seed (or
/// failure, if none ever succeeded) is the final, memoized result.
///
/// Ordinary (non-left-recursive) rules pay no extra cost for this: if the
/// first evaluation never re-enters its own `(id, position)`, the result
/// is used as-is without a second evaluation.
pub fn remember<T, O>(rule: Rule<T, O>) -> Rule<T, O>
where
    T: Clone + 'static,
    O: Clone + 'static,
{
    let id = next_rule_id();
    Rc::new(move |state: State<T>| {
        let key = (id, state.position());

        if let Some(slot) = state.memo.borrow().get(key) {
            return match slot {
                MemoSlot::Done(v) => downcast_result::<T, O>(v).clone(),
                MemoSlot::Growing { seed, touched } => {
                    touched.set(true);
                    downcast_result::<T, O>(seed).clone()
                }
            };
        }

        let touched = Rc::new(Cell::new(false));
        let mut seed: ParseResult<T, O> = Err(Failure);
        let budget = state.remainder().len() + 1;
        let mut iterations = 0usize;

        loop {
            iterations += 1;
            touched.set(false);
            state.memo.borrow_mut().insert(
                key,
                MemoSlot::Growing {
                    seed: Box::new(seed.clone()),
                    touched: Rc::clone(&touched),
                },
            );

            let attempt = rule(state.clone());
            let recursed = touched.get();

            if iterations == 1 && !recursed {
                seed = attempt;
                break;
            }

            let improved = match (&attempt, &seed) {
                (Ok((_, s_new)), Ok((_, s_old))) => s_new.position() > s_old.position(),
                (Ok(_), Err(_)) => true,
                _ => false,
            };

            if improved && iterations <= budget {
                seed = attempt;
                continue;
            }
            break;
        }

        state
            .memo
            .borrow_mut()
            .insert(key, MemoSlot::Done(Box::new(seed.clone())));
        seed
    })
}

fn downcast_result<T, O>(boxed: &Box<dyn Any>) -> &ParseResult<T, O>
where
    T: Clone + 'static,
    O: Clone + 'static,
{
    boxed
        .downcast_ref::<ParseResult<T, O>>()
        .expect("memo slot type mismatch: a rule identity was reused at a different product type")
}

// ============================================================================
// Forward references
// ============================================================================

/// A placeholder for a rule that hasn't been defined yet, so mutually
/// recursive grammars can refer to each other. Call [`Forward::rule`] to
/// get a `Rule` usable immediately; call [`Forward::set`] once the real
/// rule is ready.
pub struct Forward<T, O>
where
    T: Clone + 'static,
    O: Clone + 'static,
{
    cell: Rc<RefCell<Option<Rule<T, O>>>>,
}

impl<T, O> Forward<T, O>
where
    T: Clone + 'static,
    O: Clone + 'static,
{
    pub fn new() -> Self {
        Forward {
            cell: Rc::new(RefCell::new(None)),
        }
    }

    /// Bind the placeholder to its real definition.
    pub fn set(&self, rule: Rule<T, O>) {
        *self.cell.borrow_mut() = Some(rule);
    }

    /// A rule that dispatches to whatever [`Forward::set`] was called
    /// with. Can be cloned and embedded in other rules before `set` is
    /// called, as long as `set` happens before the grammar is actually
    /// applied to any input.
    pub fn rule(&self) -> Rule<T, O> {
        let cell = Rc::clone(&self.cell);
        Rc::new(move |state: State<T>| {
            let target = cell
                .borrow()
                .clone()
                .expect("Forward rule applied before Forward::set was called");
            target(state)
        })
    }
}

impl<T, O> Default for Forward<T, O>
where
    T: Clone + 'static,
    O: Clone + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, O> Clone for Forward<T, O>
where
    T: Clone + 'static,
    O: Clone + 'static,
{
    fn clone(&self) -> Self {
        Forward {
            cell: Rc::clone(&self.cell),
        }
    }
}
