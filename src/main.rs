//! Ember - A small embeddable scripting language
//!
//! This is the command-line front end for Ember: a **lexer → parser →
//! bytecode compiler → stack-based virtual machine** pipeline that takes
//! source text and executes it directly, without emitting any external
//! artifact. The language supports signed integers, floats, booleans,
//! strings, dynamically sized arrays, first-class user-defined functions,
//! if/elif/else, while, for-in over integer ranges, and a standard library
//! of math/string/array/random/file functions exposed as ordinary globals.
//!
//! ## Architecture overview
//!
//! - **lexer**: Source text → flat token sequence.
//! - **parser**: Tokens → AST via precedence climbing.
//! - **ast**: The AST node definitions shared by the parser and compiler.
//! - **compiler**: AST → `Chunk` (bytecode + constant pool + line table).
//! - **vm**: Executes a `Chunk`, producing a value or a runtime error.
//! - **builtin**: The standard-library registry injected into VM globals.
//! - **error**: The typed error hierarchy shared across every stage.
//!
//! ## Usage
//!
//! `ember <file>` runs a file to completion. `ember` with no arguments
//! starts a line-buffering REPL.

mod ast;
mod builtin;
mod compiler;
mod error;
mod lexer;
mod parser;
mod vm;

use std::io::Write;
use std::{env, fs, process};

use error::EmberError;
use vm::VM;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        None => run_repl(),
        Some("--help") | Some("-h") => {
            print_usage();
        }
        Some("--version") | Some("-v") => {
            println!("ember {}", VERSION);
        }
        Some(flag) if flag.starts_with('-') => {
            eprintln!("ember: unrecognized option '{}'", flag);
            process::exit(1);
        }
        Some(path) => run_file(path),
    }
}

fn print_usage() {
    println!("Ember - a small embeddable scripting language");
    println!();
    println!("Usage:");
    println!("  ember <file>      Run a .ember source file");
    println!("  ember             Start an interactive REPL");
    println!("  ember --help      Show this message");
    println!("  ember --version   Show the interpreter version");
}

/// Runs a single source file to completion and exits with the status the
/// spec mandates: 0 on success, 1 on a parse or runtime error reported to
/// stderr as `"Parse error: <msg>"` / `"Runtime error: <msg>"`.
fn run_file(path: &str) {
    let source = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("ember: cannot read '{}': {}", path, e);
            process::exit(1);
        }
    };
    log::info!("loaded {} ({} bytes)", path, source.len());

    match run_source(&source) {
        Ok(_) => {}
        Err(e) => {
            report_error(&e);
            process::exit(1);
        }
    }
}

fn run_source(source: &str) -> error::Result<vm::Value> {
    let chunk = compiler::compile_program(source)?;
    let mut machine = VM::new(chunk);
    builtin::install(&mut machine);
    machine.run()
}

fn report_error(err: &EmberError) {
    if err.is_runtime() {
        eprintln!("Runtime error: {}", err);
    } else {
        eprintln!("Parse error: {}", err);
    }
}

/// Line-buffering REPL: reads lines into a buffer, entering continuation
/// mode whenever the most recently entered line ends with `then` or `do`,
/// and flushing once a line consisting solely of `end` is seen (or
/// immediately, for a single-line non-block input).
fn run_repl() {
    log::info!("REPL started");
    println!("Ember {} - type 'exit' or press Ctrl+D to quit", VERSION);

    let stdin = std::io::stdin();
    let mut buffer = String::new();
    let mut in_block = false;

    loop {
        print!("{}", if in_block { "... " } else { ">>> " });
        let _ = std::io::stdout().flush();

        let mut line = String::new();
        let bytes_read = match stdin.read_line(&mut line) {
            Ok(n) => n,
            Err(e) => {
                eprintln!("ember: error reading stdin: {}", e);
                break;
            }
        };
        if bytes_read == 0 {
            println!();
            break;
        }

        let trimmed = line.trim_end_matches(['\n', '\r']);
        if !in_block && trimmed.trim() == "exit" {
            break;
        }

        if in_block {
            if trimmed.trim() == "end" {
                buffer.push_str(trimmed);
                buffer.push('\n');
                execute_buffer(&buffer);
                buffer.clear();
                in_block = false;
                continue;
            }
            buffer.push_str(trimmed);
            buffer.push('\n');
            continue;
        }

        let ends_block_opener = {
            let t = trimmed.trim_end();
            t.ends_with("then") || t.ends_with("do")
        };

        if ends_block_opener {
            buffer.push_str(trimmed);
            buffer.push('\n');
            in_block = true;
            continue;
        }

        execute_buffer(trimmed);
    }
}

fn execute_buffer(source: &str) {
    if source.trim().is_empty() {
        return;
    }
    match run_source(source) {
        Ok(value) => {
            if !matches!(value, vm::Value::Null) {
                println!("{}", value);
            }
        }
        Err(e) => report_error(&e),
    }
}
