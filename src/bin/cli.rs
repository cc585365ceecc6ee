//! flatdb - command line entry point
//!
//! Runs exactly one statement given as the single argument and exits with
//! its return code.

use std::process;

use anyhow::Context;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use flatdb::sql::{Lexer, TokenClass, TokenStream};
use flatdb::{Config, Error, ExecutionEngine, QueryResult};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Tokenize and execute one command. Lexical errors are marked on the
/// offending token like any other statement error.
fn execute(config: Config, stream: &mut TokenStream) -> flatdb::Result<QueryResult> {
    if let Some(index) = stream
        .tokens()
        .iter()
        .position(|t| t.class == TokenClass::Error)
    {
        let text = stream.tokens()[index].text.clone();
        return Err(stream.reject_at(index, Error::InvalidToken(text)));
    }

    let mut engine = ExecutionEngine::open(config)?;
    engine.execute(stream)
}

fn run(command: &str) -> anyhow::Result<i32> {
    let config = Config::from_env().context("failed to load configuration")?;
    debug!(data_dir = %config.data_dir.display(), "configuration loaded");

    let mut stream = TokenStream::new(Lexer::new(command).scan());

    match execute(config, &mut stream) {
        Ok(result) => {
            println!("{}", result);
            Ok(0)
        }
        Err(e) => {
            error!(error = %e, "statement failed");
            match stream.offending() {
                Some(token) => {
                    println!("Error in the string: {}", token.text);
                    println!("rc={}", e.code());
                }
                None => println!("Error: rc={}", e.code()),
            }
            Ok(e.code())
        }
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 || args[1].is_empty() {
        println!("Usage: flatdb \"command statement\"");
        process::exit(1);
    }

    init_tracing();

    match run(&args[1]) {
        Ok(0) => {}
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}
