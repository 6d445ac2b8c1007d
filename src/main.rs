use std::io::{self, Write};

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use evaldemo::{hello, Interpreter, Lexer, LiteralParser, Value, DEFAULT_MAX_DEPTH};

#[derive(Parser)]
#[command(
    name = "evaldemo",
    about = "Greeting helper with a safe literal parser and an unsafe expression evaluator"
)]
struct Cli {
    /// Maximum nesting depth accepted by either parser
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Print a greeting for NAME
    Hello {
        name: String,
    },

    /// Parse a literal: numbers, strings, booleans, None, lists, tuples, sets, dicts
    Literal {
        expr: String,
    },

    /// Evaluate an arbitrary expression (never do this with untrusted input)
    Eval {
        expr: String,
    },

    /// Read expressions line by line from stdin
    Repl {
        /// Evaluate lines as expressions instead of parsing them as literals
        #[arg(long)]
        insecure: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("evaldemo=warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        None => println!("{}", hello("World")),
        Some(Command::Hello { name }) => println!("{}", hello(&name)),
        Some(Command::Literal { expr }) => {
            let value = parse_literal(&expr, cli.max_depth)?;
            println!("{}", value);
        },
        Some(Command::Eval { expr }) => {
            let value = Interpreter::new().with_max_depth(cli.max_depth).eval_str(&expr)?;
            println!("{}", value);
        },
        Some(Command::Repl { insecure }) => repl(insecure, cli.max_depth)?,
    }
    Ok(())
}

fn parse_literal(expr: &str, max_depth: usize) -> Result<Value> {
    let value = LiteralParser::from(Lexer::new(expr.chars()))
        .with_max_depth(max_depth)
        .parse()?;
    Ok(value)
}

fn repl(insecure: bool, max_depth: usize) -> Result<()> {
    let interpreter = Interpreter::new().with_max_depth(max_depth);

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Err(err) => {
                println!("failed to read: {}", err);
                break;
            },
            Ok(0) => {
                println!("exit");
                break;
            },
            Ok(_) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let result = if insecure {
                    interpreter.eval_str(line).map_err(anyhow::Error::from)
                } else {
                    parse_literal(line, max_depth)
                };
                match result {
                    Ok(value) => println!("{}", value),
                    Err(err) => println!("error: {}", err),
                }
            },
        }
    }
    Ok(())
}
