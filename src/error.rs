//! Errors produced while reading, interning and taking apart S-expressions

#![deny(missing_docs)]
#![deny(unsafe_code)]

use std::cmp;

use thiserror::Error;

/// The broad category of a parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Input that cannot start or continue an expression here.
    InvalidSyntax,
    /// Input ended inside a list or string literal, or before any expression.
    Incomplete,
    /// List nesting went past the reader's depth limit.
    TooDeeplyNested,
}

/// The representation of an s-expression parse error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{line}:{column}: {message}")]
pub struct ParseError {
    /// What kind of failure this is.
    pub kind:    ParseErrorKind,
    /// The error message.
    pub message: &'static str,
    /// The line number on which the error occurred.
    pub line:    usize,
    /// The column number on which the error occurred.
    pub column:  usize,
    /// The character index in the given text which caused the error.
    pub index:   usize,
}

impl ParseError {
    /**
     * Produce a new boxed error. Errors are always used in a boxed form so
     * there is no raw error constructor
     */
    #[cold]
    pub fn new(kind: ParseErrorKind, message: &'static str, source: &str, pos: usize) -> Box<ParseError> {
        let (line, column) = ParseError::get_location(source, pos);
        Box::new(ParseError {
            kind:    kind,
            message: message,
            line:    line,
            column:  column,
            index:   pos,
        })
    }

    /// Directly create a `ParseResult`
    pub fn err<T>(kind: ParseErrorKind, message: &'static str, source: &str, pos: usize) -> ParseResult<T> {
        Err(ParseError::new(kind, message, source, pos))
    }

    /**
     * Get the specified line and column in the given text that the error
     * occurred at as a tuple.
     *
     * Tuple is in the form `(line, column)`.
     */
    fn get_location(s: &str, pos: usize) -> (usize, usize) {
        let mut line: usize = 1;
        let mut col:  isize = -1;
        for c in s.chars().take(pos+1) {
            if c == '\n' {
                line +=  1;
                col   = -1;
            } else {
                col  +=  1;
            }
        }
        (line, cmp::max(col, 0) as usize)
    }
}

/// The result of parsing an s-expression. Errors are the uncommon case, so
/// they're boxed to keep the `Ok` path small.
pub type ParseResult<T> = Result<T, Box<ParseError>>;

/// Failure to allocate a new symbol slot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymbolError {
    /// Every slot of the table is in use.
    #[error("symbol table full ({capacity} slots)")]
    TableFull {
        /// Total slots, including the reserved one.
        capacity: usize,
    },
}

/// Misuse of a value's structure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObjectError {
    /// `head` or `tail` was taken of something other than a pair.
    #[error("expected a pair, found {found}")]
    NotAPair {
        /// Type name of the value actually given.
        found: &'static str,
    },
    /// A proper list was required.
    #[error("value is not a proper list")]
    NotAProperList,
}

#[test]
fn error_display() {
    let error = ParseError {
        kind:    ParseErrorKind::Incomplete,
        message: "Unexpected end of input",
        line:    4usize,
        column:  1usize,
        index:   4usize
    };

    assert_eq!(format!("{}", error), "4:1: Unexpected end of input");
    assert_eq!(format!("{}", Box::new(error)), "4:1: Unexpected end of input");
}

#[test]
fn error_location() {
  let s = "0123456789\n0123456789\n\n6";
  assert_eq!(ParseError::get_location(s, 4), (1, 4));

  assert_eq!(ParseError::get_location(s, 10), (2, 0));
  assert_eq!(ParseError::get_location(s, 11), (2, 0));
  assert_eq!(ParseError::get_location(s, 15), (2, 4));

  assert_eq!(ParseError::get_location(s, 21), (3, 0));
  assert_eq!(ParseError::get_location(s, 22), (4, 0));
  assert_eq!(ParseError::get_location(s, 23), (4, 0));
  assert_eq!(ParseError::get_location(s, 500), (4, 0));
}

#[test]
fn new_error_carries_position() {
    let e = ParseError::new(ParseErrorKind::InvalidSyntax, "Unexpected close paren", "(a\n b))", 6);
    assert_eq!(e.kind, ParseErrorKind::InvalidSyntax);
    assert_eq!(e.index, 6);
    assert_eq!((e.line, e.column), (2, 3));
}

#[test]
fn object_error_display() {
    assert_eq!(
        ObjectError::NotAPair { found: "integer" }.to_string(),
        "expected a pair, found integer"
    );
    assert_eq!(
        SymbolError::TableFull { capacity: 4 }.to_string(),
        "symbol table full (4 slots)"
    );
}
