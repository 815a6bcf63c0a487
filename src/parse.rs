//! Functions related to reading of input

#![deny(missing_docs)]
#![deny(unsafe_code)]

use std::iter::{Enumerate, Peekable};
use std::str::Chars;

use log::{trace, warn};
use unescape::unescape;

use crate::error::{ParseError, ParseErrorKind, ParseResult};
use crate::symbol::SymbolTable;
use crate::value::Value;

type CharSource<'a> = Peekable<Enumerate<Chars<'a>>>;

/// Deepest list nesting a reader accepts by default.
pub const MAX_READ_DEPTH: usize = 128;

/**
 * Can `c` appear in a symbol?
 *
 * Everything but parentheses, the double quote, and the whitespace
 * characters space, newline, carriage return, form feed, backspace and bell.
 * Tab is not a delimiter.
 */
pub fn is_symbol_char(c: char) -> bool {
    !matches!(c, '(' | ')' | '"') && !is_whitespace(c)
}

/**
 * Can `c` appear in an integer?
 *
 * A minus sign is accepted anywhere, not just in front. `-1-2` therefore
 * counts as integer text and reads as `-1`.
 */
pub fn is_integer_char(c: char) -> bool {
    c.is_ascii_digit() || c == '-'
}

/// The characters skipped between expressions.
fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\n' | '\r' | '\x0C' | '\x08' | '\x07')
}

/**
 * A reader over a particular `str`.
 *
 * The reader keeps a cursor into its text, so successive calls pick up
 * where the last one stopped, and `consumed` reports how many characters
 * have been used so far. Symbols are interned into the table it borrows.
 *
 * ```rust
 * use tinysexp::{write, Reader, SymbolTable};
 * let mut table = SymbolTable::new();
 * let mut reader = Reader::new("(foo (bar 1 2 3) \"faz\") tail", &mut table);
 * let list = reader.read().unwrap();
 * assert_eq!(reader.consumed(), 23);
 * assert!(list.is_proper_list());
 * let rest = reader.read().unwrap();
 * drop(reader);
 * assert_eq!(write(&rest, &table), "TAIL");
 * ```
 */
pub struct Reader<'a, 't> {
    source:    &'a str,
    chars:     CharSource<'a>,
    symbols:   &'t mut SymbolTable,
    consumed:  usize,
    max_depth: usize,
    failed:    bool,
}

impl<'a, 't> Reader<'a, 't> {
    /**
     * Create a new reader for a specific `str`, interning into `symbols`
     */
    pub fn new(source: &'a str, symbols: &'t mut SymbolTable) -> Reader<'a, 't> {
        Reader {
            source:    source,
            chars:     source.chars().enumerate().peekable(),
            symbols:   symbols,
            consumed:  0,
            max_depth: MAX_READ_DEPTH,
            failed:    false,
        }
    }

    /// Limit list nesting to `max_depth` levels.
    pub fn with_max_depth(mut self, max_depth: usize) -> Reader<'a, 't> {
        self.max_depth = max_depth;
        self
    }

    /// Characters used up so far, whitespace included.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Whether only whitespace remains.
    pub fn at_end(&mut self) -> bool {
        self.skip_whitespace();
        self.chars.peek().is_none()
    }

    /**
     * Read one complete expression: an atom, a string literal or a
     * parenthesised list, after any leading whitespace. Anything after the
     * expression is left for the next call.
     */
    pub fn read(&mut self) -> ParseResult<Value> {
        let start = self.consumed;
        let value = self.parse_expression(0)?;
        trace!("read expression from {} to {}", start, self.consumed);
        Ok(value)
    }

    /**
     * Read an atom right at the cursor: integer text becomes an integer, any
     * other run of symbol characters a symbol. Nothing is skipped first.
     */
    pub fn read_atom(&mut self) -> ParseResult<Value> {
        match self.peek() {
            Some((pos, c)) => {
                if self.at_integer() {
                    self.read_integer()
                } else if is_symbol_char(c) {
                    self.read_symbol()
                } else {
                    self.err(ParseErrorKind::InvalidSyntax, "Expected an atom", pos)
                }
            }
            None => self.end_of_input(),
        }
    }

    /**
     * Read a run of symbol characters and intern it. Characters past the
     * table's name length limit are consumed but not kept.
     *
     * # Panics
     *
     * If the symbol table is full; see `SymbolTable::intern`.
     */
    pub fn read_symbol(&mut self) -> ParseResult<Value> {
        let start = self.consumed;
        let limit = self.symbols.max_name_len();
        let mut name = String::new();
        let mut kept = 0usize;

        while let Some((_, c)) = self.peek() {
            if !is_symbol_char(c) {
                break;
            }
            if kept < limit {
                name.push(c);
                kept += 1;
            }
            self.bump();
        }

        if self.consumed == start {
            return self.err(ParseErrorKind::InvalidSyntax, "Expected a symbol", start);
        }
        let dropped = self.consumed - start - kept;
        if dropped > 0 {
            warn!("symbol at {} truncated to {} characters, {} dropped", start, limit, dropped);
        }
        Ok(Value::make_symbol(self.symbols.intern(&name)))
    }

    /**
     * Read a run of integer characters as a signed decimal. Digits after a
     * stray minus sign are ignored and overflow wraps.
     */
    pub fn read_integer(&mut self) -> ParseResult<Value> {
        let start = self.consumed;
        let mut text = String::new();

        while let Some((_, c)) = self.peek() {
            if !is_integer_char(c) {
                break;
            }
            text.push(c);
            self.bump();
        }

        if text.is_empty() {
            return self.err(ParseErrorKind::InvalidSyntax, "Expected an integer", start);
        }
        Ok(Value::make_integer(parse_decimal(&text)))
    }

    /**
     * Parse a single sexpression
     */
    fn parse_expression(&mut self, depth: usize) -> ParseResult<Value> {
        self.skip_whitespace();

        match self.peek() {
            Some((pos, c)) => match c {
                // Start of list
                '(' => {
                    if depth >= self.max_depth {
                        return self.err(ParseErrorKind::TooDeeplyNested, "List nested too deeply", pos);
                    }
                    self.bump();
                    self.parse_list(pos, depth + 1)
                },
                // End of list
                ')' => self.err(ParseErrorKind::InvalidSyntax, "Unexpected close paren", pos),
                // String literal
                '"' => self.parse_quoted(pos),
                _ => self.read_atom(),
            },
            None => self.end_of_input(),
        }
    }

    /**
     * Parse the rest of a list whose opening paren is at `open`. A lone `.`
     * before the last element makes that element the final tail.
     */
    fn parse_list(&mut self, open: usize, depth: usize) -> ParseResult<Value> {
        let mut items = Vec::new();

        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return self.err(ParseErrorKind::Incomplete, "Unclosed list", open),
                Some((_, ')')) => {
                    self.bump();
                    return Ok(Value::list(items));
                },
                Some((pos, '.')) if self.at_dot() => {
                    if items.is_empty() {
                        return self.err(ParseErrorKind::InvalidSyntax, "Dot without a preceding element", pos);
                    }
                    self.bump();
                    let last = self.parse_dotted_tail(open, depth)?;
                    return Ok(Value::list_with_tail(items, last));
                },
                Some(_) => items.push(self.parse_expression(depth)?),
            }
        }
    }

    /// The single expression after a dot, and the closing paren after it.
    fn parse_dotted_tail(&mut self, open: usize, depth: usize) -> ParseResult<Value> {
        self.skip_whitespace();
        match self.peek() {
            None => return self.err(ParseErrorKind::Incomplete, "Unclosed list", open),
            Some((pos, ')')) => {
                return self.err(ParseErrorKind::InvalidSyntax, "Dot without a following element", pos);
            },
            Some(_) => {},
        }

        let last = self.parse_expression(depth)?;

        self.skip_whitespace();
        match self.peek() {
            Some((_, ')')) => {
                self.bump();
                Ok(last)
            },
            Some((pos, _)) => self.err(ParseErrorKind::InvalidSyntax, "Expected close paren after dotted tail", pos),
            None => self.err(ParseErrorKind::Incomplete, "Unclosed list", open),
        }
    }

    /**
     * Parse a quoted string whose opening quote is at `open`. A backslash
     * keeps the following character from ending the literal; escapes are
     * then expanded.
     */
    fn parse_quoted(&mut self, open: usize) -> ParseResult<Value> {
        // remove leading quote
        self.bump();

        let mut raw = String::new();
        loop {
            match self.bump() {
                None => return self.err(ParseErrorKind::Incomplete, "Unterminated string literal", open),
                Some('"') => break,
                Some('\\') => {
                    raw.push('\\');
                    match self.bump() {
                        Some(follower) => raw.push(follower),
                        None => return self.err(ParseErrorKind::Incomplete, "Unterminated string literal", open),
                    }
                },
                Some(c) => raw.push(c),
            }
        }

        match unescape(&raw) {
            Some(text) => Ok(Value::make_string(&text)),
            None => self.err(ParseErrorKind::InvalidSyntax, "String literal escape error", open),
        }
    }

    /// Is the cursor on a `.` that stands alone as a token?
    fn at_dot(&self) -> bool {
        let mut ahead = self.chars.clone();
        match ahead.next() {
            Some((_, '.')) => {},
            _ => return false,
        }
        match ahead.peek() {
            Some(&(_, c)) => !is_symbol_char(c),
            None => true,
        }
    }

    /// Does the token at the cursor consist of integer characters and hold
    /// at least one digit?
    fn at_integer(&self) -> bool {
        let mut digits = false;
        for (_, c) in self.chars.clone() {
            if !is_symbol_char(c) {
                break;
            }
            if !is_integer_char(c) {
                return false;
            }
            digits |= c.is_ascii_digit();
        }
        digits
    }

    /// Consume whitespace
    fn skip_whitespace(&mut self) {
        while let Some((_, c)) = self.peek() {
            if is_whitespace(c) {
                self.bump();
            } else {
                return;
            }
        }
    }

    fn bump(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;
        self.consumed += 1;
        Some(c)
    }

    fn peek(&mut self) -> Option<(usize, char)> {
        self.chars.peek().copied()
    }

    fn err<T>(&self, kind: ParseErrorKind, message: &'static str, pos: usize) -> ParseResult<T> {
        ParseError::err(kind, message, self.source, pos)
    }

    fn end_of_input<T>(&self) -> ParseResult<T> {
        self.err(ParseErrorKind::Incomplete, "Unexpected end of input", self.consumed)
    }
}

impl<'a, 't> Iterator for Reader<'a, 't> {
    type Item = ParseResult<Value>;

    /// The next top-level expression, or `None` once only whitespace is
    /// left. Iteration ends after the first error.
    fn next(&mut self) -> Option<ParseResult<Value>> {
        if self.failed || self.at_end() {
            return None;
        }
        let result = self.read();
        self.failed = result.is_err();
        Some(result)
    }
}

/**
 * Leading optional minus and the digits after it, like C's `atoi`. Anything
 * from the first other character on is ignored. Overflow wraps.
 */
fn parse_decimal(text: &str) -> i64 {
    let mut chars = text.chars().peekable();
    let negative = chars.next_if_eq(&'-').is_some();
    let mut value: i64 = 0;
    for c in chars {
        match c.to_digit(10) {
            Some(d) => value = value.wrapping_mul(10).wrapping_add(i64::from(d)),
            None => break,
        }
    }
    if negative { value.wrapping_neg() } else { value }
}

/**
 * Read one expression from the start of `source`, returning it together
 * with the number of characters consumed.
 *
 * ```rust
 * use tinysexp::{read, SymbolTable, Value};
 * let mut table = SymbolTable::new();
 * let (value, consumed) = read("()", &mut table).unwrap();
 * assert_eq!(value, Value::Nil);
 * assert_eq!(consumed, 2);
 * assert!(read("(foo", &mut table).is_err());
 * ```
 */
pub fn read(source: &str, symbols: &mut SymbolTable) -> ParseResult<(Value, usize)> {
    let mut reader = Reader::new(source, symbols);
    let value = reader.read()?;
    Ok((value, reader.consumed()))
}

/// Read one atom from the very start of `source`, returning it together with
/// the number of characters consumed.
pub fn read_atom(source: &str, symbols: &mut SymbolTable) -> ParseResult<(Value, usize)> {
    let mut reader = Reader::new(source, symbols);
    let value = reader.read_atom()?;
    Ok((value, reader.consumed()))
}

#[cfg(test)]
fn read_str(text: &str, table: &mut SymbolTable) -> Value {
    read(text, table).unwrap().0
}

#[test]
fn character_classes() {
    for c in ['(', ')', ' ', '\n', '\r', '\x0C', '\x08', '\x07', '"'] {
        assert!(!is_symbol_char(c), "{:?}", c);
    }
    for c in ['a', 'Z', '-', '+', '*', '.', '7', '\t', 'λ'] {
        assert!(is_symbol_char(c), "{:?}", c);
    }
    assert!(is_integer_char('0') && is_integer_char('9') && is_integer_char('-'));
    assert!(!is_integer_char('+') && !is_integer_char('a'));
}

#[test]
fn atom_symbol_stops_at_whitespace() {
    let mut table = SymbolTable::new();
    let (value, consumed) = read_atom("foo    bar", &mut table).unwrap();
    assert_eq!(consumed, 3);
    assert_eq!(table.resolve(value.as_symbol().unwrap()), Some("FOO"));
}

#[test]
fn atom_integer() {
    let mut table = SymbolTable::new();
    let (value, consumed) = read_atom("2100 ", &mut table).unwrap();
    assert_eq!(value, Value::Integer(2100));
    assert_eq!(consumed, 4);

    assert_eq!(read_atom("-17)", &mut table).unwrap(), (Value::Integer(-17), 3));
    assert!(table.is_empty());
}

#[test]
fn atom_integer_like_symbols() {
    let mut table = SymbolTable::new();
    let (minus, _) = read_atom("-", &mut table).unwrap();
    assert_eq!(table.resolve(minus.as_symbol().unwrap()), Some("-"));

    let (mixed, consumed) = read_atom("12ab", &mut table).unwrap();
    assert_eq!(consumed, 4);
    assert_eq!(table.resolve(mixed.as_symbol().unwrap()), Some("12AB"));
}

#[test]
fn permissive_minus() {
    let mut table = SymbolTable::new();
    assert_eq!(read_atom("-1-2", &mut table).unwrap(), (Value::Integer(-1), 4));
    assert_eq!(parse_decimal("9223372036854775808"), i64::MIN);
}

#[test]
fn atom_rejects_delimiters() {
    let mut table = SymbolTable::new();
    for text in ["(a)", ")", " a", "\"s\""] {
        let e = read_atom(text, &mut table).unwrap_err();
        assert_eq!(e.kind, ParseErrorKind::InvalidSyntax);
        assert_eq!(e.index, 0);
    }
    assert_eq!(read_atom("", &mut table).unwrap_err().kind, ParseErrorKind::Incomplete);
}

#[test]
fn read_nested_list() {
    let mut table = SymbolTable::new();
    let value = read_str("(foo (bar 1 2 3) \"faz\")", &mut table);
    assert!(value.is_proper_list());

    let items: Vec<&Value> = value.iter().collect();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].as_symbol(), table.lookup("FOO"));
    assert!(items[1].is_proper_list());
    assert_eq!(items[2], &Value::make_string("faz"));

    let inner = Value::list(vec![
        Value::make_symbol(table.lookup("bar").unwrap()),
        Value::make_integer(1),
        Value::make_integer(2),
        Value::make_integer(3),
    ]);
    assert_eq!(items[1], &inner);
}

#[test]
fn read_empty_list_is_nil() {
    let mut table = SymbolTable::new();
    assert_eq!(read("()", &mut table).unwrap(), (Value::Nil, 2));
    assert_eq!(read_str("(  \n )", &mut table), Value::Nil);
    assert_eq!(read_str("(())", &mut table), Value::list(vec![Value::Nil]));
}

#[test]
fn read_skips_leading_whitespace() {
    let mut table = SymbolTable::new();
    let (value, consumed) = read("  \n 42 rest", &mut table).unwrap();
    assert_eq!(value, Value::Integer(42));
    assert_eq!(consumed, 6);
}

#[test]
fn read_unterminated_list() {
    let mut table = SymbolTable::new();
    let e = read("(foo", &mut table).unwrap_err();
    assert_eq!(e.kind, ParseErrorKind::Incomplete);
    assert_eq!(e.index, 0);

    let e = read("(a (b c)\n", &mut table).unwrap_err();
    assert_eq!(e.kind, ParseErrorKind::Incomplete);
    assert_eq!(e.message, "Unclosed list");
}

#[test]
fn read_stray_close() {
    let mut table = SymbolTable::new();
    let e = read("  )", &mut table).unwrap_err();
    assert_eq!(e.kind, ParseErrorKind::InvalidSyntax);
    assert_eq!((e.index, e.line, e.column), (2, 1, 2));
}

#[test]
fn read_empty_input() {
    let mut table = SymbolTable::new();
    assert_eq!(read("", &mut table).unwrap_err().kind, ParseErrorKind::Incomplete);
    assert_eq!(read(" \n ", &mut table).unwrap_err().kind, ParseErrorKind::Incomplete);
}

#[test]
fn read_strings() {
    let mut table = SymbolTable::new();
    assert_eq!(read("\"\"", &mut table).unwrap(), (Value::make_string(""), 2));
    assert_eq!(
        read_str("\"a (b) c\"", &mut table),
        Value::make_string("a (b) c")
    );
    assert_eq!(
        read_str("\"say \\\"hi\\\"\\n\"", &mut table),
        Value::make_string("say \"hi\"\n")
    );
    assert_eq!(
        read_str("(\"one\"\"two\")", &mut table),
        Value::list(vec![Value::make_string("one"), Value::make_string("two")])
    );
}

#[test]
fn read_unterminated_string() {
    let mut table = SymbolTable::new();
    let e = read("(a \"open", &mut table).unwrap_err();
    assert_eq!(e.kind, ParseErrorKind::Incomplete);
    assert_eq!(e.index, 3);

    let e = read("\"trailing\\", &mut table).unwrap_err();
    assert_eq!(e.kind, ParseErrorKind::Incomplete);
}

#[test]
fn read_dotted() {
    let mut table = SymbolTable::new();
    let pair = read_str("(a . b)", &mut table);
    assert!(pair.is_dotted_pair());
    assert!(pair.is_dotted_list());

    let list = read_str("(1 2 . 3)", &mut table);
    assert_eq!(
        list,
        Value::list_with_tail(vec![Value::make_integer(1), Value::make_integer(2)], Value::make_integer(3))
    );

    // Dotting onto a list splices it in.
    assert_eq!(
        read_str("(1 . (2 3))", &mut table),
        Value::list(vec![Value::make_integer(1), Value::make_integer(2), Value::make_integer(3)])
    );

    // A dot inside a token is just part of a symbol.
    let sym = read_str("(a.b)", &mut table);
    assert_eq!(sym.head().unwrap().as_symbol(), table.lookup("A.B"));
}

#[test]
fn read_bad_dots() {
    let mut table = SymbolTable::new();
    for text in ["(. a)", "(a . )", "(a . b c)", "(a . b . c)"] {
        let e = read(text, &mut table).unwrap_err();
        assert_eq!(e.kind, ParseErrorKind::InvalidSyntax, "{}", text);
    }
    assert_eq!(read("(a . b", &mut table).unwrap_err().kind, ParseErrorKind::Incomplete);
}

#[test]
fn read_depth_limit() {
    let mut table = SymbolTable::new();
    let ok = "((((1))))";
    let value = Reader::new(ok, &mut table).with_max_depth(4).read().unwrap();
    assert!(value.is_proper_list());

    let e = Reader::new(ok, &mut table).with_max_depth(3).read().unwrap_err();
    assert_eq!(e.kind, ParseErrorKind::TooDeeplyNested);
    assert_eq!(e.index, 3);

    let deep: String = std::iter::repeat('(').take(MAX_READ_DEPTH + 1).collect();
    assert_eq!(read(&deep, &mut table).unwrap_err().kind, ParseErrorKind::TooDeeplyNested);
}

#[test]
fn reader_resumes() {
    let mut table = SymbolTable::new();
    let mut reader = Reader::new("one (two) \"three\" 4  ", &mut table);
    let values: Vec<Value> = reader.by_ref().map(|r| r.unwrap()).collect();
    assert_eq!(values.len(), 4);
    assert_eq!(reader.consumed(), 21);
    assert!(reader.at_end());
    assert!(reader.next().is_none());
    drop(reader);
    assert_eq!(values[3], Value::Integer(4));
    assert_eq!(values[0].as_symbol(), table.lookup("one"));
}

#[test]
fn reader_stops_on_error() {
    let mut table = SymbolTable::new();
    let mut reader = Reader::new("ok )", &mut table);
    assert!(reader.next().unwrap().is_ok());
    let e = reader.next().unwrap().unwrap_err();
    assert_eq!(e.index, 3);
    assert!(reader.next().is_none());
}

#[test]
fn long_symbols_are_consumed_whole() {
    let mut table = SymbolTable::with_limits(16, 3);
    let mut reader = Reader::new("abcdef ghi", &mut table);
    let first = reader.read().unwrap();
    assert_eq!(reader.consumed(), 6);
    let second = reader.read().unwrap();
    drop(reader);
    assert_eq!(table.resolve(first.as_symbol().unwrap()), Some("ABC"));
    assert_eq!(table.resolve(second.as_symbol().unwrap()), Some("GHI"));
}

#[test]
fn long_symbols_log_dropped_characters() {
    let mut table = SymbolTable::with_limits(16, 3);
    let lines = crate::test_log::capture(|| {
        read("(abcdef ghi)", &mut table).unwrap();
    });
    let warnings: Vec<&String> = lines.iter().filter(|l| l.starts_with("WARN")).collect();
    assert_eq!(warnings.len(), 1, "{:?}", lines);
    assert!(warnings[0].contains("3 dropped"), "{:?}", warnings);
}

#[test]
fn tab_is_part_of_a_symbol() {
    let mut table = SymbolTable::new();
    let (value, consumed) = read_atom("a\tb c", &mut table).unwrap();
    assert_eq!(consumed, 3);
    assert_eq!(table.resolve(value.as_symbol().unwrap()), Some("A\tB"));
}
