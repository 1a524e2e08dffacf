// ABOUTME: The reader's output type — one Clojure-flavored Lisp form

use std::fmt;

/// A symbol or keyword's name, with an optional namespace segment
/// (`ns/name`, or bare `name` when no namespace was given).
#[derive(Debug, Clone, PartialEq)]
pub struct Name {
    pub namespace: Option<String>,
    pub name: String,
}

impl Name {
    pub fn simple(name: impl Into<String>) -> Self {
        Name {
            namespace: None,
            name: name.into(),
        }
    }

    pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Name {
            namespace: Some(namespace.into()),
            name: name.into(),
        }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{ns}/{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// An arbitrary-precision decimal literal (Clojure's `M` suffix, e.g.
/// `3.14M`). The reader only ever needs to *represent* these, never
/// compute with them, so this is a structural model (sign, digit string,
/// decimal-point position) rather than a full bignum type.
#[derive(Debug, Clone, PartialEq)]
pub struct BigDecimal {
    pub negative: bool,
    pub digits: String,
    pub scale: u32,
}

impl fmt::Display for BigDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            write!(f, "-")?;
        }
        if self.scale == 0 {
            write!(f, "{}M", self.digits)
        } else {
            let split = self.digits.len().saturating_sub(self.scale as usize);
            write!(f, "{}.{}M", &self.digits[..split], &self.digits[split..])
        }
    }
}

/// A single parsed form. Collections hold `Vec`/pairs of `Form` rather than
/// `Rc<Form>` — the reader builds a tree once per call and hands ownership
/// to the caller, so there is no sharing to economize on.
#[derive(Debug, Clone, PartialEq)]
pub enum Form {
    Nil,
    Bool(bool),
    Integer(i64),
    Rational { numerator: i64, denominator: i64 },
    Float(f64),
    Decimal(BigDecimal),
    Char(char),
    Str(String),
    Symbol(Name),
    Keyword(Name),
    List(Vec<Form>),
    Vector(Vec<Form>),
    Map(Vec<(Form, Form)>),
    Set(Vec<Form>),
}

impl Form {
    pub fn list(items: impl Into<Vec<Form>>) -> Self {
        Form::List(items.into())
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        Form::Symbol(Name::simple(name))
    }

    /// Wraps `form` as `(quote-like-head form)`, the shape every reader
    /// macro (`'`, `` ` ``, `~`, `~@`, `#'`, `@`) expands to.
    pub fn wrapped(head: &str, form: Form) -> Self {
        Form::List(vec![Form::symbol(head), form])
    }
}

impl fmt::Display for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Form::Nil => write!(f, "nil"),
            Form::Bool(b) => write!(f, "{b}"),
            Form::Integer(n) => write!(f, "{n}"),
            Form::Rational { numerator, denominator } => write!(f, "{numerator}/{denominator}"),
            Form::Float(x) => write!(f, "{x}"),
            Form::Decimal(d) => write!(f, "{d}"),
            Form::Char(c) => write!(f, "\\{c}"),
            Form::Str(s) => write!(f, "{s:?}"),
            Form::Symbol(name) => write!(f, "{name}"),
            Form::Keyword(name) => write!(f, ":{name}"),
            Form::List(items) => write_seq(f, '(', ')', items),
            Form::Vector(items) => write_seq(f, '[', ']', items),
            Form::Set(items) => {
                write!(f, "#{{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "}}")
            }
            Form::Map(pairs) => {
                write!(f, "{{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k} {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

fn write_seq(f: &mut fmt::Formatter<'_>, open: char, close: char, items: &[Form]) -> fmt::Result {
    write!(f, "{open}")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{item}")?;
    }
    write!(f, "{close}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_display_includes_namespace_only_when_present() {
        assert_eq!(Name::simple("foo").to_string(), "foo");
        assert_eq!(Name::namespaced("ns", "foo").to_string(), "ns/foo");
    }

    #[test]
    fn form_display_round_trips_simple_atoms() {
        assert_eq!(Form::Nil.to_string(), "nil");
        assert_eq!(Form::Bool(true).to_string(), "true");
        assert_eq!(Form::Integer(42).to_string(), "42");
        assert_eq!(
            Form::Rational { numerator: 2, denominator: 3 }.to_string(),
            "2/3"
        );
    }

    #[test]
    fn form_display_renders_collections() {
        let list = Form::list(vec![Form::Integer(1), Form::Integer(2)]);
        assert_eq!(list.to_string(), "(1 2)");
        let vector = Form::Vector(vec![Form::Integer(1)]);
        assert_eq!(vector.to_string(), "[1]");
    }

    #[test]
    fn big_decimal_display_places_the_decimal_point() {
        let d = BigDecimal {
            negative: false,
            digits: "314".to_string(),
            scale: 2,
        };
        assert_eq!(d.to_string(), "3.14M");
    }
}
