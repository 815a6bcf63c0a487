//! Representation of the S-expression tree.

#![deny(missing_docs)]
#![deny(unsafe_code)]

use std::mem;

use log::trace;

use crate::error::ObjectError;
use crate::symbol::{Symbol, SymbolTable};

/// A cons cell: the structural node of every list and tree.
#[derive(PartialEq, Clone, Debug, Default)]
pub struct Pair {
    /// The first element.
    pub head: Value,
    /// The rest.
    pub tail: Value,
}

impl Pair {
    /// A new cell holding `head` and `tail`.
    pub fn new(head: Value, tail: Value) -> Pair {
        Pair { head: head, tail: tail }
    }
}

/**
 * A single data element in an s-expression.
 *
 * Each value exclusively owns what it holds: a pair owns both of its
 * children and a string owns its text. Symbols are only handles; the name
 * lives in a `SymbolTable` and outlives the value.
 *
 * Dropping a value releases the whole tree below it without recursing, so
 * arbitrarily long or deep structures can be dropped safely. Comparison and
 * cloning walk the tail chain in a loop and only recurse into heads, so
 * long lists are fine but deeply nested heads cost stack. `Debug` recurses
 * on both sides; use `write` to look at long lists.
 */
#[derive(Debug, Default)]
pub enum Value {
    /// The empty list and list terminator.
    #[default]
    Nil,
    /// A cons cell
    Pair(Box<Pair>),
    /// An interned, case-insensitive symbol
    Symbol(Symbol),
    /// An integer value
    Integer(i64),
    /// A UTF-8 string value
    String(String),
}

impl Value {
    /// Create a new symbol value
    pub fn make_symbol(sym: Symbol) -> Value {
        Value::Symbol(sym)
    }

    /// Intern `name` in `symbols` and wrap the handle as a value.
    pub fn intern(symbols: &mut SymbolTable, name: &str) -> Value {
        Value::Symbol(symbols.intern(name))
    }

    /// Create a new integer
    pub fn make_integer<I: Into<i64>>(i: I) -> Value {
        Value::Integer(i.into())
    }

    /// Wrap an existing cell.
    pub fn make_pair(pair: Pair) -> Value {
        Value::Pair(Box::new(pair))
    }

    /// Create a new string holding a copy of `text`.
    pub fn make_string(text: &str) -> Value {
        Value::String(text.to_owned())
    }

    /// Create a cons cell
    pub fn cons(head: Value, tail: Value) -> Value {
        Value::make_pair(Pair::new(head, tail))
    }

    /**
     * Create a proper list from `items`.
     *
     * ```rust
     * use tinysexp::Value;
     * let list = Value::list(vec![Value::make_integer(1), Value::make_integer(2)]);
     * assert!(list.is_proper_list());
     * assert_eq!(list.iter().count(), 2);
     * ```
     */
    pub fn list(items: Vec<Value>) -> Value {
        Value::list_with_tail(items, Value::Nil)
    }

    /// Create a list from `items` whose final tail is `last` rather than nil.
    pub fn list_with_tail(mut items: Vec<Value>, last: Value) -> Value {
        let mut result = last;

        while let Some(value) = items.pop() {
            result = Value::cons(value, result)
        }

        result
    }

    /// Check if a value is nil
    pub fn is_nil(&self) -> bool {
        matches!(*self, Value::Nil)
    }

    /// Check if a value is a cons cell
    pub fn is_pair(&self) -> bool {
        matches!(*self, Value::Pair(_))
    }

    /// Check if a value is a symbol
    pub fn is_symbol(&self) -> bool {
        matches!(*self, Value::Symbol(_))
    }

    /// Check if a value is an integer
    pub fn is_integer(&self) -> bool {
        matches!(*self, Value::Integer(_))
    }

    /// Check if a value is a string
    pub fn is_string(&self) -> bool {
        matches!(*self, Value::String(_))
    }

    /// Anything that is neither nil nor a pair.
    pub fn is_atom(&self) -> bool {
        !self.is_nil() && !self.is_pair()
    }

    /// The symbol handle, if this is a symbol.
    pub fn as_symbol(&self) -> Option<Symbol> {
        match *self {
            Value::Symbol(sym) => Some(sym),
            _ => None,
        }
    }

    /// The integer, if this is an integer.
    pub fn as_integer(&self) -> Option<i64> {
        match *self {
            Value::Integer(i) => Some(i),
            _ => None,
        }
    }

    /// The text, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match *self {
            Value::String(ref text) => Some(text),
            _ => None,
        }
    }

    /// A short lowercase name for the variant, for messages.
    pub fn type_name(&self) -> &'static str {
        match *self {
            Value::Nil => "nil",
            Value::Pair(_) => "pair",
            Value::Symbol(_) => "symbol",
            Value::Integer(_) => "integer",
            Value::String(_) => "string",
        }
    }

    /// The first element of a pair.
    pub fn head(&self) -> Result<&Value, ObjectError> {
        match *self {
            Value::Pair(ref pair) => Ok(&pair.head),
            _ => Err(ObjectError::NotAPair { found: self.type_name() }),
        }
    }

    /// The rest of a pair.
    pub fn tail(&self) -> Result<&Value, ObjectError> {
        match *self {
            Value::Pair(ref pair) => Ok(&pair.tail),
            _ => Err(ObjectError::NotAPair { found: self.type_name() }),
        }
    }

    /**
     * Iterate over the heads along a chain of pairs. Stops at the first tail
     * that is not a pair, so a dotted list yields every element but the
     * final tail.
     */
    pub fn iter(&self) -> Iter<'_> {
        Iter { next: self }
    }

    /**
     * Is this a pair chain ending in nil?
     *
     * Nil itself is not a proper list here: it is not a pair.
     */
    pub fn is_proper_list(&self) -> bool {
        let mut current = self;
        loop {
            match *current {
                Value::Pair(ref pair) => match pair.tail {
                    Value::Nil => return true,
                    ref rest => current = rest,
                },
                _ => return false,
            }
        }
    }

    /// Is this a pair whose tail is not nil? Looks one level deep only.
    pub fn is_dotted_pair(&self) -> bool {
        match *self {
            Value::Pair(ref pair) => !pair.tail.is_nil(),
            _ => false,
        }
    }

    /// Is this a pair chain ending in an atom rather than nil?
    pub fn is_dotted_list(&self) -> bool {
        let mut current = self;
        loop {
            match *current {
                Value::Pair(ref pair) => match pair.tail {
                    Value::Nil => return false,
                    Value::Pair(_) => current = &pair.tail,
                    _ => return true,
                },
                _ => return false,
            }
        }
    }

    /**
     * Release this value's own storage.
     *
     * A pair gives its children back to the caller instead of releasing
     * them, so freeing one cell never frees what it points to. Every other
     * variant returns `None`.
     */
    pub fn free(mut self) -> Option<(Value, Value)> {
        match self {
            Value::Pair(ref mut pair) => Some((
                mem::take(&mut pair.head),
                mem::take(&mut pair.tail),
            )),
            _ => None,
        }
    }

    /**
     * Release this value and everything below it. Returns the number of
     * pair cells released.
     */
    pub fn free_recursive(mut self) -> usize {
        let cells = release_tree(&mut self);
        trace!("released {} pair cells", cells);
        cells
    }
}

/// Detach the children of a pair and push them for release.
fn detach(value: &mut Value, pending: &mut Vec<Value>) -> bool {
    match *value {
        Value::Pair(ref mut pair) => {
            pending.push(mem::take(&mut pair.head));
            pending.push(mem::take(&mut pair.tail));
            true
        }
        _ => false,
    }
}

/// Tear down a tree with an explicit stack. Every popped cell has already
/// lost its children by the time it is dropped.
fn release_tree(root: &mut Value) -> usize {
    let mut pending = Vec::new();
    let mut cells = 0usize;
    if detach(root, &mut pending) {
        cells += 1;
    }
    while let Some(mut value) = pending.pop() {
        if detach(&mut value, &mut pending) {
            cells += 1;
        }
    }
    cells
}

impl Drop for Value {
    fn drop(&mut self) {
        // Cells with only atom children drop fine the ordinary way.
        if let Value::Pair(ref pair) = *self {
            if pair.head.is_pair() || pair.tail.is_pair() {
                release_tree(self);
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        let mut left = self;
        let mut right = other;
        loop {
            match (left, right) {
                (&Value::Pair(ref a), &Value::Pair(ref b)) => {
                    if a.head != b.head {
                        return false;
                    }
                    left = &a.tail;
                    right = &b.tail;
                }
                (&Value::Nil, &Value::Nil) => return true,
                (&Value::Symbol(a), &Value::Symbol(b)) => return a == b,
                (&Value::Integer(a), &Value::Integer(b)) => return a == b,
                (&Value::String(ref a), &Value::String(ref b)) => return a == b,
                _ => return false,
            }
        }
    }
}

impl Clone for Value {
    fn clone(&self) -> Value {
        let mut heads = Vec::new();
        let mut current = self;
        while let Value::Pair(ref pair) = *current {
            heads.push(pair.head.clone());
            current = &pair.tail;
        }
        let last = match *current {
            Value::Symbol(sym) => Value::Symbol(sym),
            Value::Integer(i) => Value::Integer(i),
            Value::String(ref text) => Value::String(text.clone()),
            // Only nil is left.
            _ => Value::Nil,
        };
        Value::list_with_tail(heads, last)
    }
}

impl From<Symbol> for Value {
    fn from(sym: Symbol) -> Value {
        Value::Symbol(sym)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Value {
        Value::Integer(i)
    }
}

impl<'a> From<&'a str> for Value {
    fn from(text: &'a str) -> Value {
        Value::make_string(text)
    }
}

/// Borrowing iterator over the elements of a list. See `Value::iter`.
pub struct Iter<'a> {
    next: &'a Value,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<&'a Value> {
        match *self.next {
            Value::Pair(ref pair) => {
                self.next = &pair.tail;
                Some(&pair.head)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
fn sample(table: &mut SymbolTable) -> Value {
    Value::list(vec![
        Value::intern(table, "foo"),
        Value::intern(table, "bar"),
        Value::make_integer(10),
    ])
}

#[test]
fn predicates() {
    let mut table = SymbolTable::new();
    let sym = Value::intern(&mut table, "x");
    let int = Value::make_integer(3);
    let text = Value::make_string("text");
    let pair = Value::cons(Value::make_integer(1), Value::Nil);

    assert!(Value::Nil.is_nil() && !Value::Nil.is_pair() && !Value::Nil.is_atom());
    assert!(pair.is_pair() && !pair.is_atom());
    assert!(sym.is_symbol() && sym.is_atom());
    assert!(int.is_integer() && !int.is_symbol());
    assert!(text.is_string() && !text.is_integer());
    assert_eq!(text.as_str(), Some("text"));
    assert_eq!(int.as_integer(), Some(3));
    assert_eq!(sym.as_symbol(), table.lookup("X"));
}

#[test]
fn make_string_copies() {
    let mut source = String::from("tets");
    let value = Value::make_string(&source);
    source.push('!');
    assert_eq!(value.as_str(), Some("tets"));
}

#[test]
fn head_and_tail() {
    let pair = Value::cons(Value::make_integer(1), Value::make_integer(2));
    assert_eq!(pair.head(), Ok(&Value::Integer(1)));
    assert_eq!(pair.tail(), Ok(&Value::Integer(2)));

    assert_eq!(Value::Nil.head(), Err(ObjectError::NotAPair { found: "nil" }));
    assert_eq!(
        Value::make_integer(5).tail(),
        Err(ObjectError::NotAPair { found: "integer" })
    );
}

#[test]
fn list_classification() {
    let mut table = SymbolTable::new();
    let a = Value::intern(&mut table, "a");
    let b = Value::intern(&mut table, "b");

    assert!(!Value::Nil.is_proper_list());
    assert!(!Value::Nil.is_dotted_pair());
    assert!(!Value::Nil.is_dotted_list());
    assert!(!a.is_proper_list());

    let single = Value::cons(a.clone(), Value::Nil);
    assert!(single.is_proper_list());
    assert!(!single.is_dotted_pair());
    assert!(!single.is_dotted_list());

    let dotted = Value::cons(a.clone(), b.clone());
    assert!(dotted.is_dotted_pair());
    assert!(dotted.is_dotted_list());
    assert!(!dotted.is_proper_list());

    let proper = sample(&mut table);
    assert!(proper.is_proper_list());
    // A longer proper list still has a non-nil tail at the top.
    assert!(proper.is_dotted_pair());
    assert!(!proper.is_dotted_list());

    let dotted_list = Value::list_with_tail(vec![a.clone(), b.clone()], Value::make_integer(3));
    assert!(dotted_list.is_dotted_list());
    assert!(!dotted_list.is_proper_list());
}

#[test]
fn iter_walks_spine() {
    let mut table = SymbolTable::new();
    let list = sample(&mut table);
    let items: Vec<&Value> = list.iter().collect();
    assert_eq!(items.len(), 3);
    assert_eq!(items[2], &Value::Integer(10));

    let dotted = Value::list_with_tail(vec![Value::make_integer(1)], Value::make_integer(2));
    assert_eq!(dotted.iter().count(), 1);
    assert_eq!(Value::Nil.iter().count(), 0);
}

#[test]
fn free_hands_back_children() {
    let head = Value::make_string("kept");
    let tail = Value::cons(Value::make_integer(1), Value::Nil);
    let pair = Value::cons(head.clone(), tail.clone());

    let (h, t) = pair.free().unwrap();
    assert_eq!(h, head);
    assert_eq!(t, tail);
    assert_eq!(Value::make_integer(4).free(), None);
}

#[test]
fn free_leaves_symbols_interned() {
    let mut table = SymbolTable::new();
    let sym = Value::intern(&mut table, "persist");
    assert_eq!(sym.free_recursive(), 0);
    assert_eq!(table.lookup("persist").and_then(|s| table.resolve(s)), Some("PERSIST"));
}

#[test]
fn free_recursive_counts_cells() {
    let mut table = SymbolTable::new();
    let nested = Value::list(vec![
        sample(&mut table),
        Value::cons(Value::make_integer(1), Value::make_integer(2)),
    ]);
    // Two spine cells, three in the first element, one in the second.
    assert_eq!(nested.free_recursive(), 6);
    assert_eq!(Value::Nil.free_recursive(), 0);
}

#[test]
fn deep_structures_release_without_overflow() {
    let mut long = Value::Nil;
    for i in 0..200_000i64 {
        long = Value::cons(Value::make_integer(i), long);
    }
    assert_eq!(long.free_recursive(), 200_000);

    let mut deep = Value::Nil;
    for _ in 0..200_000 {
        deep = Value::cons(deep, Value::Nil);
    }
    drop(deep);
}

#[test]
fn equality_compares_structure() {
    let mut table = SymbolTable::new();
    assert_eq!(sample(&mut table), sample(&mut table));
    assert_ne!(sample(&mut table), Value::Nil);
    assert_ne!(Value::make_integer(1), Value::make_string("1"));
    assert_ne!(
        Value::list(vec![Value::make_integer(1)]),
        Value::cons(Value::make_integer(1), Value::make_integer(2))
    );
    assert_ne!(
        Value::list(vec![Value::make_integer(1), Value::make_integer(2)]),
        Value::list(vec![Value::make_integer(1), Value::make_integer(3)])
    );

    let dotted = Value::list_with_tail(vec![Value::make_string("a")], Value::make_integer(9));
    let copy = dotted.clone();
    assert_eq!(copy, dotted);
    assert!(copy.is_dotted_list());
}

#[test]
fn long_lists_compare_and_clone() {
    let items: Vec<Value> = (0..200_000i64).map(Value::make_integer).collect();
    let long = Value::list(items);
    let copy = long.clone();
    assert!(copy == long);

    let mut changed: Vec<Value> = (0..200_000i64).map(Value::make_integer).collect();
    changed[199_999] = Value::make_integer(-1);
    assert!(Value::list(changed) != long);
}
