//! Interned, case-insensitive symbol names.
//!
//! A `SymbolTable` maps names to small integer handles. Names are folded to
//! upper case before they are compared or stored, so `foo`, `Foo` and `FOO`
//! all intern to the same `Symbol`. Slot 0 is reserved as "no symbol"; since
//! `Symbol` wraps a `NonZeroU32` no handle can ever refer to it.

#![deny(missing_docs)]
#![deny(unsafe_code)]

use std::cmp;
use std::fmt;
use std::num::NonZeroU32;
use std::sync::{Mutex, OnceLock};

use log::{debug, error, warn};

use crate::error::SymbolError;

/// Slots in a default table, the reserved slot 0 included.
pub const MAX_SYMBOLS: usize = 512;

/// Longest name, in characters, a default table stores. Longer names are
/// truncated.
pub const MAX_SYMBOL_LEN: usize = 511;

/// A handle to an interned name.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Symbol(NonZeroU32);

impl Symbol {
    /// Build a handle from its raw number. `0` is never a symbol.
    pub fn from_raw(raw: u32) -> Option<Symbol> {
        NonZeroU32::new(raw).map(Symbol)
    }

    /// The raw handle number.
    pub fn raw(self) -> u32 {
        self.0.get()
    }

    fn index(self) -> usize {
        self.0.get() as usize
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#<symbol {}>", self.0)
    }
}

/**
 * A bounded table of interned names.
 *
 * ```rust
 * use tinysexp::SymbolTable;
 * let mut table = SymbolTable::new();
 * let foo = table.intern("foo");
 * assert_eq!(table.intern("FoO"), foo);
 * assert_eq!(table.resolve(foo), Some("FOO"));
 * ```
 *
 * Lookup is a linear scan. The table never forgets a name: releasing a
 * symbol value leaves its entry in place.
 */
#[derive(Debug, Clone)]
pub struct SymbolTable {
    names:        Vec<String>,
    capacity:     usize,
    max_name_len: usize,
}

impl SymbolTable {
    /// A table with the default limits.
    pub fn new() -> SymbolTable {
        SymbolTable::with_limits(MAX_SYMBOLS, MAX_SYMBOL_LEN)
    }

    /**
     * A table with `capacity` slots and names capped at `max_name_len`
     * characters. The capacity counts the reserved slot 0, so a table can
     * hold at most `capacity - 1` names.
     */
    pub fn with_limits(capacity: usize, max_name_len: usize) -> SymbolTable {
        let mut names = Vec::with_capacity(cmp::min(capacity, MAX_SYMBOLS));
        // Slot 0. Never matched by a lookup.
        names.push(String::new());
        SymbolTable {
            names:        names,
            capacity:     capacity,
            max_name_len: max_name_len,
        }
    }

    /// Total slots, the reserved one included.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Longest stored name, in characters.
    pub fn max_name_len(&self) -> usize {
        self.max_name_len
    }

    /// Number of interned names.
    pub fn len(&self) -> usize {
        self.names.len() - 1
    }

    /// Whether nothing has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /**
     * Truncate to the maximum length and fold to upper case. Only ASCII
     * letters change case.
     */
    pub fn normalize(&self, name: &str) -> String {
        let mut normal: String = name.chars().take(self.max_name_len).collect();
        normal.make_ascii_uppercase();
        normal
    }

    /// Find the handle of an already-interned name without inserting it.
    pub fn lookup(&self, name: &str) -> Option<Symbol> {
        let normal = self.normalize(name);
        self.find(&normal)
    }

    fn find(&self, normal: &str) -> Option<Symbol> {
        self.names.iter()
            .enumerate()
            .skip(1)
            .find(|&(_, stored)| stored == normal)
            .and_then(|(i, _)| Symbol::from_raw(i as u32))
    }

    /**
     * Intern `name`, returning the existing handle if the normalized name is
     * already present, or allocating a new slot otherwise.
     */
    pub fn try_intern(&mut self, name: &str) -> Result<Symbol, SymbolError> {
        let normal = self.normalize(name);
        // Case folding keeps byte lengths, so any shortfall is truncation.
        if normal.len() < name.len() {
            warn!("symbol name truncated to {} characters: {:?}", self.max_name_len, normal);
        }
        if let Some(sym) = self.find(&normal) {
            return Ok(sym);
        }

        let index = self.names.len();
        let full = SymbolError::TableFull { capacity: self.capacity };
        if index >= self.capacity {
            return Err(full);
        }
        let sym = u32::try_from(index).ok()
            .and_then(Symbol::from_raw)
            .ok_or(full)?;

        debug!("interned {:?} as {}", normal, sym.raw());
        self.names.push(normal);
        Ok(sym)
    }

    /**
     * Intern `name`.
     *
     * # Panics
     *
     * Running out of slots is a configuration error, not something callers
     * are expected to recover from; use `try_intern` to observe it instead.
     */
    pub fn intern(&mut self, name: &str) -> Symbol {
        match self.try_intern(name) {
            Ok(sym) => sym,
            Err(e) => {
                error!("cannot intern {:?}: {}", name, e);
                panic!("{}", e)
            }
        }
    }

    /// The stored name of `sym`, or `None` if the table has no such slot.
    pub fn resolve(&self, sym: Symbol) -> Option<&str> {
        self.names.get(sym.index()).map(String::as_str)
    }
}

impl Default for SymbolTable {
    fn default() -> SymbolTable {
        SymbolTable::new()
    }
}

/**
 * The process-wide table, created with default limits on first use.
 *
 * Callers that can pass a table around explicitly should prefer that; this
 * exists for code that needs one shared set of names.
 */
pub fn global() -> &'static Mutex<SymbolTable> {
    static TABLE: OnceLock<Mutex<SymbolTable>> = OnceLock::new();
    TABLE.get_or_init(|| Mutex::new(SymbolTable::new()))
}

#[test]
fn intern_is_case_insensitive() {
    let mut table = SymbolTable::new();
    let a = table.intern("lambda");
    let b = table.intern("LAMBDA");
    let c = table.intern("LaMbDa");
    assert_eq!(a, b);
    assert_eq!(b, c);
    assert_eq!(table.len(), 1);
    assert_eq!(table.resolve(a), Some("LAMBDA"));
}

#[test]
fn handles_are_distinct_and_nonzero() {
    let mut table = SymbolTable::new();
    let foo = table.intern("foo");
    let bar = table.intern("bar");
    assert_ne!(foo, bar);
    assert_eq!(foo.raw(), 1);
    assert_eq!(bar.raw(), 2);
    assert_eq!(Symbol::from_raw(0), None);
}

#[test]
fn resolve_out_of_range() {
    let mut table = SymbolTable::new();
    table.intern("only");
    assert_eq!(table.resolve(Symbol::from_raw(2).unwrap()), None);
    assert_eq!(table.resolve(Symbol::from_raw(100000).unwrap()), None);
}

#[test]
fn lookup_does_not_insert() {
    let mut table = SymbolTable::new();
    assert_eq!(table.lookup("car"), None);
    assert!(table.is_empty());
    let car = table.intern("car");
    assert_eq!(table.lookup("CAR"), Some(car));
}

#[test]
fn long_names_are_truncated() {
    let mut table = SymbolTable::with_limits(8, 4);
    let a = table.intern("abcdefgh");
    let b = table.intern("ABCDxyz");
    assert_eq!(a, b);
    assert_eq!(table.resolve(a), Some("ABCD"));

    let default = SymbolTable::new();
    let long: String = std::iter::repeat('q').take(600).collect();
    assert_eq!(default.normalize(&long).chars().count(), MAX_SYMBOL_LEN);
}

#[test]
fn only_interning_warns_about_truncation() {
    let mut table = SymbolTable::with_limits(8, 4);
    let quiet = crate::test_log::capture(|| {
        assert_eq!(table.lookup("abcdefgh"), None);
        table.intern("abcd");
        table.lookup("abcdefgh");
    });
    assert!(quiet.iter().all(|line| !line.contains("truncated")), "{:?}", quiet);

    let loud = crate::test_log::capture(|| {
        table.intern("abcdefgh");
    });
    assert!(loud.iter().any(|line| line.starts_with("WARN") && line.contains("truncated")), "{:?}", loud);
}

#[test]
fn truncation_counts_characters() {
    let table = SymbolTable::with_limits(8, 3);
    assert_eq!(table.normalize("ßaßb"), "ßAß");
}

#[test]
fn try_intern_reports_full_table() {
    let mut table = SymbolTable::with_limits(3, 16);
    assert!(table.try_intern("one").is_ok());
    assert!(table.try_intern("two").is_ok());
    assert_eq!(
        table.try_intern("three"),
        Err(SymbolError::TableFull { capacity: 3 })
    );
    // Existing names still resolve once the table is full.
    assert_eq!(table.try_intern("ONE").map(Symbol::raw), Ok(1));
}

#[test]
#[should_panic(expected = "symbol table full")]
fn intern_panics_when_full() {
    let mut table = SymbolTable::with_limits(2, 16);
    table.intern("one");
    table.intern("two");
}

#[test]
fn global_table_is_shared() {
    let sym = global().lock().unwrap().intern("global-test-symbol");
    let again = global().lock().unwrap().intern("GLOBAL-TEST-SYMBOL");
    assert_eq!(sym, again);
    assert_eq!(
        global().lock().unwrap().resolve(sym),
        Some("GLOBAL-TEST-SYMBOL")
    );
}
