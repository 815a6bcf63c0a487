//! A small S-expression core: interned symbols, cons cells, a reader and a
//! printer.
//!
//! Use `read` (or a `Reader` for more than one expression) to get a `Value`
//! from text, and `write` or `write_proper_list` to turn it back into text.
//! Symbols are interned into a `SymbolTable` that both sides share.
//!
//! ```rust
//! use tinysexp::{read, write, write_proper_list, SymbolTable};
//! let mut table = SymbolTable::new();
//! let (list, _) = read("(foo bar 10)", &mut table).unwrap();
//! assert_eq!(write(&list, &table), "(FOO . (BAR . (10 . NIL)))");
//! assert_eq!(write_proper_list(&list, &table).unwrap(), "(FOO BAR 10)");
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]

mod error;
mod parse;
mod print;
pub mod symbol;
mod value;

pub use error::{ObjectError, ParseError, ParseErrorKind, ParseResult, SymbolError};
pub use parse::{is_integer_char, is_symbol_char, read, read_atom, Reader, MAX_READ_DEPTH};
pub use print::{write, write_proper_list, ProperList, Written};
pub use symbol::{Symbol, SymbolTable, MAX_SYMBOLS, MAX_SYMBOL_LEN};
pub use value::{Iter, Pair, Value};

/// Captures log records emitted on the current test thread.
#[cfg(test)]
mod test_log {
    use std::cell::RefCell;

    use log::{LevelFilter, Log, Metadata, Record};

    thread_local! {
        static LINES: RefCell<Option<Vec<String>>> = RefCell::new(None);
    }

    struct Capture;

    impl Log for Capture {
        fn enabled(&self, _: &Metadata) -> bool {
            true
        }

        fn log(&self, record: &Record) {
            LINES.with(|lines| {
                if let Some(ref mut lines) = *lines.borrow_mut() {
                    lines.push(format!("{} {}", record.level(), record.args()));
                }
            });
        }

        fn flush(&self) {}
    }

    static CAPTURE: Capture = Capture;

    /// Run `f` and return the `LEVEL message` lines it logged.
    pub fn capture<F: FnOnce()>(f: F) -> Vec<String> {
        // Another test may have installed it already.
        let _ = log::set_logger(&CAPTURE);
        log::set_max_level(LevelFilter::Trace);
        LINES.with(|lines| *lines.borrow_mut() = Some(Vec::new()));
        f();
        LINES.with(|lines| lines.borrow_mut().take().unwrap_or_default())
    }
}

#[test]
fn atoms_round_trip() {
    let mut table = SymbolTable::new();
    let atoms = vec![
        Value::intern(&mut table, "lambda"),
        Value::intern(&mut table, "a.b-c*"),
        Value::make_integer(0),
        Value::make_integer(2100),
        Value::make_integer(-7),
        Value::make_integer(i64::MAX),
    ];
    for atom in atoms {
        let text = write(&atom, &table);
        let (back, consumed) = read(&text, &mut table).unwrap();
        assert_eq!(back, atom, "{}", text);
        assert_eq!(consumed, text.chars().count());
    }
}

#[test]
fn proper_lists_round_trip_through_write_proper_list() {
    let mut table = SymbolTable::new();
    let (list, _) = read("(foo -3 bar 10)", &mut table).unwrap();
    let text = write_proper_list(&list, &table).unwrap();
    assert_eq!(text, "(FOO -3 BAR 10)");
    assert_eq!(read(&text, &mut table).unwrap().0, list);
}

#[test]
fn dotted_output_reads_back_as_dotted_list() {
    let mut table = SymbolTable::new();
    let (list, _) = read("(a b)", &mut table).unwrap();
    let text = write(&list, &table);
    assert_eq!(text, "(A . (B . NIL))");

    // NIL comes back as an ordinary symbol.
    let (back, _) = read(&text, &mut table).unwrap();
    assert!(back.is_dotted_list());
    assert_eq!(write(&back, &table), text);
}
