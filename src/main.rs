mod builtins;
mod env;
mod error;
mod eval;
mod expand;
mod lexer;
mod number;
mod reader;
mod value;

use builtins::initial_env;
use clap::Parser;
use env::Environment;
use error::SchemeError;
use eval::{eval, eval_source};
use expand::expand;
use lexer::Lexer;
use reader::{read, ReadOutcome};
use rustyline::error::ReadlineError;
use rustyline::{Config, DefaultEditor};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use value::Value;

/// Scheme interpreter: REPL by default, script mode with a file argument
#[derive(Parser, Debug)]
#[command(name = "rscheme")]
#[command(version)]
#[command(about = "A tree-walking Scheme interpreter")]
struct CliArgs {
    /// Script file to evaluate (omit to start the REPL)
    #[arg(value_name = "FILE")]
    script: Option<PathBuf>,
}

fn main() {
    let args = CliArgs::parse();

    let env = match initial_env() {
        Ok(env) => env,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    match args.script {
        Some(path) => {
            // Script mode: evaluate the file, non-zero exit on error
            if let Err(e) = run_script(&path, &env) {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        }
        None => run_repl(&env),
    }
}

/// Evaluate a script file top to bottom; nothing prints unless the script
/// prints.
fn run_script(path: &Path, env: &Rc<Environment>) -> Result<(), SchemeError> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| SchemeError::io(format!("{}: {}", path.display(), e)))?;
    eval_source(&source, env)?;
    Ok(())
}

fn run_repl(env: &Rc<Environment>) {
    let config = Config::builder().auto_add_history(true).build();
    let mut rl = match DefaultEditor::with_config(config) {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("failed to initialize the REPL: {}", e);
            std::process::exit(1);
        }
    };
    let history_file = ".rscheme_history";
    let _ = rl.load_history(history_file);

    let mut pending = String::new();
    loop {
        // The prompt reappears only once the line buffer is drained; a
        // datum continued across lines reads with no prompt at all
        let prompt = if pending.is_empty() { "> " } else { "" };
        match rl.readline(prompt) {
            Ok(line) => {
                pending.push_str(&line);
                pending.push('\n');
                pending = consume_buffer(&pending, env);
            }
            Err(ReadlineError::Interrupted) => {
                println!();
                pending.clear();
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}", e);
                break;
            }
        }
    }
    let _ = rl.save_history(history_file);
}

/// Evaluate every complete datum in the buffer. Returns the text still
/// waiting for more input (an unterminated datum), or nothing when the
/// buffer drained. Results print one per line; the unspecified value and
/// stray close parens print nothing; errors print and evaluation moves on
/// to the next datum.
fn consume_buffer(pending: &str, env: &Rc<Environment>) -> String {
    let mut lexer = Lexer::new(pending);
    loop {
        let checkpoint = lexer.checkpoint();
        match read(&mut lexer) {
            Ok(ReadOutcome::Datum(datum)) => {
                match expand(datum, true).and_then(|core| eval(core, env.clone())) {
                    Ok(Value::Unspecified) => {}
                    Ok(value) => println!("{}", value),
                    Err(e) => println!("{}", e),
                }
            }
            Ok(ReadOutcome::StrayClose) => {}
            Ok(ReadOutcome::Eof) => return String::new(),
            Ok(ReadOutcome::Incomplete) => return pending[checkpoint..].to_string(),
            Err(e) => {
                println!("{}", e);
                return String::new();
            }
        }
    }
}
