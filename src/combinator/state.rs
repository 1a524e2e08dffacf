// ABOUTME: Token-stream state for the combinator core — remainder, position, info, memo

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// A value attached to a state under an arbitrary info-key (e.g. `"warnings"`).
///
/// The combinator core never inspects these values itself; it only stores
/// and retrieves them on behalf of callers via [`State::get_info`] and
/// friends.
pub type InfoValue = Rc<dyn Any>;

/// One entry in a rule's memo slot: either a finished result, or a seed
/// still being grown by the left-recursion handling in
/// [`crate::combinator::rule::remember`]. `touched` is flipped by a
/// re-entrant call at the same key, which is how `remember` tells a
/// genuinely left-recursive rule apart from an ordinary one without
/// paying for an extra evaluation on the ordinary case.
pub(crate) enum MemoSlot {
    Growing {
        seed: Box<dyn Any>,
        touched: Rc<Cell<bool>>,
    },
    Done(Box<dyn Any>),
}

#[derive(Default)]
pub(crate) struct MemoTable {
    entries: HashMap<(u64, usize), MemoSlot>,
}

impl MemoTable {
    pub(crate) fn get(&self, key: (u64, usize)) -> Option<&MemoSlot> {
        self.entries.get(&key)
    }

    pub(crate) fn insert(&mut self, key: (u64, usize), slot: MemoSlot) {
        self.entries.insert(key, slot);
    }

    pub(crate) fn remove(&mut self, key: (u64, usize)) {
        self.entries.remove(&key);
    }
}

/// The state a rule is applied to: the tokens still to be consumed, the
/// current position, an open-ended info map, and the memo table for the
/// current parse run.
///
/// `State` is cheap to clone — cloning only bumps a handful of `Rc`
/// refcounts — so combinators pass it by value the way `nom` parsers pass
/// `&str` slices by value.
///
/// `State` is deliberately `!Send`/`!Sync` (it is built entirely out of
/// `Rc`, not `Arc`): a memo table is only valid for a single parse run on a
/// single thread and must never be shared across threads, so the type
/// itself enforces that rather than leaving it a documented contract.
#[derive(Clone)]
pub struct State<T: Clone> {
    remainder: Rc<[T]>,
    position: usize,
    info: Rc<HashMap<String, InfoValue>>,
    pub(crate) memo: Rc<RefCell<MemoTable>>,
}

impl<T: Clone> State<T> {
    /// Begin a fresh parse run over `tokens`, with an empty info map and a
    /// fresh (empty) memo table.
    pub fn new(tokens: impl Into<Vec<T>>) -> Self {
        State {
            remainder: Rc::from(tokens.into().into_boxed_slice()),
            position: 0,
            info: Rc::new(HashMap::new()),
            memo: Rc::new(RefCell::new(MemoTable::default())),
        }
    }

    /// The tokens not yet consumed.
    pub fn remainder(&self) -> &[T] {
        &self.remainder
    }

    /// The current position: the number of tokens consumed so far.
    pub fn position(&self) -> usize {
        self.position
    }

    /// `true` iff there are no tokens left to consume.
    pub fn is_empty(&self) -> bool {
        self.remainder.is_empty()
    }

    /// The first remaining token, without consuming it. Panics if the
    /// remainder is empty — callers must check [`State::is_empty`] first.
    pub fn peek(&self) -> &T {
        &self.remainder[0]
    }

    /// A new state with the head token consumed: position advances by one
    /// and the remainder becomes its own tail.
    ///
    /// Panics if the remainder is empty, for the same reason as [`State::peek`].
    pub fn advance(&self) -> State<T> {
        State {
            remainder: Rc::from(&self.remainder[1..]),
            position: self.position + 1,
            info: Rc::clone(&self.info),
            memo: Rc::clone(&self.memo),
        }
    }

    /// Read an info value by key, if present.
    pub fn get_info(&self, key: &str) -> Option<InfoValue> {
        self.info.get(key).cloned()
    }

    /// A new state with `key` bound to `value` (a pure functional update;
    /// `self` is untouched).
    pub fn set_info(&self, key: impl Into<String>, value: InfoValue) -> State<T> {
        let mut info = (*self.info).clone();
        info.insert(key.into(), value);
        State {
            remainder: Rc::clone(&self.remainder),
            position: self.position,
            info: Rc::new(info),
            memo: Rc::clone(&self.memo),
        }
    }

    /// A new state with `key`'s value replaced by `f` applied to the old
    /// value (or `None` if it was unset).
    pub fn update_info(
        &self,
        key: &str,
        f: impl FnOnce(Option<InfoValue>) -> InfoValue,
    ) -> State<T> {
        let new_value = f(self.get_info(key));
        self.set_info(key, new_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_increments_position_and_shrinks_remainder() {
        let s = State::new(vec!['a', 'b', 'c']);
        assert_eq!(s.position(), 0);
        let s2 = s.advance();
        assert_eq!(s2.position(), 1);
        assert_eq!(s2.remainder(), &['b', 'c']);
        // the original state is untouched
        assert_eq!(s.position(), 0);
        assert_eq!(s.remainder(), &['a', 'b', 'c']);
    }

    #[test]
    fn peek_does_not_consume() {
        let s = State::new(vec!['x', 'y']);
        assert_eq!(*s.peek(), 'x');
        assert_eq!(s.position(), 0);
    }

    #[test]
    fn is_empty_reflects_remainder() {
        let s: State<char> = State::new(Vec::new());
        assert!(s.is_empty());
        let s2 = State::new(vec!['a']);
        assert!(!s2.is_empty());
    }

    #[test]
    fn info_round_trips_and_is_functional() {
        let s: State<char> = State::new(vec!['a']);
        assert!(s.get_info("line").is_none());

        let s2 = s.set_info("line", Rc::new(1usize));
        assert_eq!(
            s2.get_info("line").and_then(|v| v.downcast_ref::<usize>().copied()),
            Some(1)
        );
        // the old state is unaffected (pure functional update)
        assert!(s.get_info("line").is_none());

        let s3 = s2.update_info("line", |old| {
            let old = old.and_then(|v| v.downcast_ref::<usize>().copied()).unwrap_or(0);
            Rc::new(old + 1)
        });
        assert_eq!(
            s3.get_info("line").and_then(|v| v.downcast_ref::<usize>().copied()),
            Some(2)
        );
    }
}
