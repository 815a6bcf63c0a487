//! Rendering values back to text.
//!
//! Symbols only mean something alongside the table they were interned in, so
//! values are printed through small adapters that borrow both the value and
//! the table and implement `Display`.
//!
//! `write` always uses dotted notation for pairs: `(1 . (2 . NIL))`.
//! `write_proper_list` prints the elements of a proper list separated by
//! spaces, `(1 2)`, each element itself rendered by `write`.

#![deny(missing_docs)]
#![deny(unsafe_code)]

use std::fmt::{self, Display, Formatter};

use crate::error::ObjectError;
use crate::symbol::SymbolTable;
use crate::value::Value;

/**
 * A value prepared for printing with `write` rules.
 *
 * ```rust
 * use tinysexp::{SymbolTable, Value};
 * let mut table = SymbolTable::new();
 * let pair = Value::cons(Value::intern(&mut table, "a"), Value::make_integer(1));
 * assert_eq!(pair.display(&table).to_string(), "(A . 1)");
 * ```
 */
pub struct Written<'v, 't> {
    value:   &'v Value,
    symbols: &'t SymbolTable,
}

impl<'v, 't> Written<'v, 't> {
    /// Prepare `value` for printing against `symbols`.
    pub fn new(value: &'v Value, symbols: &'t SymbolTable) -> Written<'v, 't> {
        Written { value: value, symbols: symbols }
    }
}

impl<'v, 't> Display for Written<'v, 't> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write_value(self.value, self.symbols, f)
    }
}

/**
 * A proper list prepared for printing without dots.
 *
 * Construction checks the list, so printing never meets a dotted tail.
 */
pub struct ProperList<'v, 't> {
    value:   &'v Value,
    symbols: &'t SymbolTable,
}

impl<'v, 't> ProperList<'v, 't> {
    /// Fails with `NotAProperList` unless `value` is a pair chain ending in nil.
    pub fn new(value: &'v Value, symbols: &'t SymbolTable) -> Result<ProperList<'v, 't>, ObjectError> {
        if value.is_proper_list() {
            Ok(ProperList { value: value, symbols: symbols })
        } else {
            Err(ObjectError::NotAProperList)
        }
    }
}

impl<'v, 't> Display for ProperList<'v, 't> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "(")?;
        for (i, item) in self.value.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write_value(item, self.symbols, f)?;
        }
        write!(f, ")")
    }
}

impl Value {
    /// Borrow this value for printing with `write` rules.
    pub fn display<'v, 't>(&'v self, symbols: &'t SymbolTable) -> Written<'v, 't> {
        Written::new(self, symbols)
    }
}

/// Render `value` in dotted-pair notation.
pub fn write(value: &Value, symbols: &SymbolTable) -> String {
    value.display(symbols).to_string()
}

/**
 * Render a proper list as space-separated elements.
 *
 * ```rust
 * use tinysexp::{write_proper_list, SymbolTable, Value};
 * let mut table = SymbolTable::new();
 * let list = Value::list(vec![Value::intern(&mut table, "x"), Value::make_integer(2)]);
 * assert_eq!(write_proper_list(&list, &table).unwrap(), "(X 2)");
 * assert!(write_proper_list(&Value::Nil, &table).is_err());
 * ```
 */
pub fn write_proper_list(value: &Value, symbols: &SymbolTable) -> Result<String, ObjectError> {
    Ok(ProperList::new(value, symbols)?.to_string())
}

/// Walks the tail chain in a loop; only heads recurse, so list length never
/// costs stack.
fn write_value(value: &Value, symbols: &SymbolTable, f: &mut Formatter) -> fmt::Result {
    let mut current = value;
    let mut open = 0usize;
    while let Value::Pair(ref pair) = *current {
        write!(f, "(")?;
        write_value(&pair.head, symbols, f)?;
        write!(f, " . ")?;
        open += 1;
        current = &pair.tail;
    }
    write_atom(current, symbols, f)?;
    for _ in 0..open {
        write!(f, ")")?;
    }
    Ok(())
}

fn write_atom(value: &Value, symbols: &SymbolTable, f: &mut Formatter) -> fmt::Result {
    match *value {
        Value::Nil => write!(f, "NIL"),
        Value::Pair(_) => write_value(value, symbols, f),
        Value::Symbol(sym) => match symbols.resolve(sym) {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "{}", sym),
        },
        Value::Integer(i) => write!(f, "{}", i),
        Value::String(ref text) => write!(f, "{}", text),
    }
}

#[cfg(test)]
fn foo_bar_ten(table: &mut SymbolTable) -> Value {
    let foo = Value::intern(table, "foo");
    let bar = Value::intern(table, "bar");
    Value::cons(foo, Value::cons(bar, Value::cons(Value::make_integer(10), Value::Nil)))
}

#[test]
fn write_atoms() {
    let mut table = SymbolTable::new();
    assert_eq!(write(&Value::Nil, &table), "NIL");
    assert_eq!(write(&Value::make_integer(-42), &table), "-42");
    assert_eq!(write(&Value::make_string("raw \"text\""), &table), "raw \"text\"");
    let sym = Value::intern(&mut table, "MixedCase");
    assert_eq!(write(&sym, &table), "MIXEDCASE");
}

#[test]
fn write_uses_dotted_notation() {
    let mut table = SymbolTable::new();
    let list = foo_bar_ten(&mut table);
    assert_eq!(write(&list, &table), "(FOO . (BAR . (10 . NIL)))");

    let pair = Value::cons(Value::make_integer(1), Value::make_string("two"));
    assert_eq!(write(&pair, &table), "(1 . two)");
}

#[test]
fn write_long_read_list() {
    let mut table = SymbolTable::new();
    let text = format!("({})", "1 ".repeat(200_000));
    let (list, _) = crate::parse::read(&text, &mut table).unwrap();
    assert!(list.is_proper_list());

    let written = write(&list, &table);
    assert!(written.starts_with("(1 . (1 . "));
    assert!(written.ends_with(&format!("NIL{}", ")".repeat(200_000))));
    assert_eq!(written.len(), 200_000 * "(1 . ".len() + "NIL".len() + 200_000);
    assert_eq!(list.free_recursive(), 200_000);
}

#[test]
fn write_proper_list_drops_dots() {
    let mut table = SymbolTable::new();
    let list = foo_bar_ten(&mut table);
    assert_eq!(write_proper_list(&list, &table).unwrap(), "(FOO BAR 10)");

    let single = Value::cons(Value::make_integer(7), Value::Nil);
    assert_eq!(write_proper_list(&single, &table).unwrap(), "(7)");
}

#[test]
fn write_proper_list_nested_elements_stay_dotted() {
    let mut table = SymbolTable::new();
    let inner = Value::list(vec![Value::make_integer(1), Value::make_integer(2)]);
    let outer = Value::list(vec![Value::intern(&mut table, "a"), inner]);
    assert_eq!(write_proper_list(&outer, &table).unwrap(), "(A (1 . (2 . NIL)))");
}

#[test]
fn write_proper_list_rejects_others() {
    let table = SymbolTable::new();
    let dotted = Value::cons(Value::make_integer(1), Value::make_integer(2));
    assert_eq!(write_proper_list(&dotted, &table), Err(ObjectError::NotAProperList));
    assert_eq!(write_proper_list(&Value::make_integer(1), &table), Err(ObjectError::NotAProperList));
}

#[test]
fn unknown_symbol_handle() {
    let mut other = SymbolTable::new();
    other.intern("a");
    let b = Value::intern(&mut other, "b");
    let empty = SymbolTable::new();
    assert_eq!(write(&b, &empty), "#<symbol 2>");
}
