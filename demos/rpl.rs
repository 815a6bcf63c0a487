/*!
 * Simple example of a Read-Print loop (there is no eval).
 *
 * Each line of input is read as a sequence of expressions. Every expression
 * is echoed in dotted notation, and proper lists are echoed a second time
 * without dots. Set `RUST_LOG=debug` to watch symbols being interned.
 */

use std::io::{stdin, stdout, BufRead, Write};

use tinysexp::{write, ProperList, Reader, SymbolTable, Value};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn echo(value: &Value, symbols: &SymbolTable) {
    println!("{}", write(value, symbols));
    if let Ok(list) = ProperList::new(value, symbols) {
        println!("{}", list);
    }
}

fn main() {
    env_logger::init();

    let mut symbols = SymbolTable::new();
    let exit = symbols.intern("exit");
    let mut sout = stdout();

    println!("tinysexp RPL version {}.", VERSION);
    println!("Symbol `exit` to exit.\n");

    let input = stdin();
    let mut lines = input.lock().lines();
    loop {
        print!("> ");
        sout.flush().unwrap();

        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                eprintln!("Error: {}", e);
                return;
            }
            None => return,
        };

        let mut values = Vec::new();
        for result in Reader::new(&line, &mut symbols) {
            match result {
                Ok(v) => values.push(v),
                Err(e) => println!("Error: {}", e),
            }
        }

        for value in values {
            if value.as_symbol() == Some(exit) {
                return;
            }
            echo(&value, &symbols);
            value.free_recursive();
        }
    }
}
