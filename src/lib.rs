// ABOUTME: peglisp — a parser-combinator core, and a Clojure-flavored Lisp
// ABOUTME: reader built on top of it

pub mod combinator;
pub mod reader;

pub use reader::{read_all, read_one, BigDecimal, Form, Name, ReadError};
