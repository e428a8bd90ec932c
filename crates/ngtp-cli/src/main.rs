use clap::{Args, Parser, Subcommand};
use log::debug;
use ngtp_parser::visitor::unparsable_bindings;
use ngtp_parser::{tokenize_lossy, ErrorPolicy, ExprParser, ParseOptions, TemplateParser};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "ngtp")]
#[command(about = "Angular-style template and binding expression parser")]
#[command(version)]
struct Cli {
    /// Log parser activity (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a template and write its tree as JSON
    Parse {
        /// Input template file
        path: String,

        /// Write JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Abort on the first unparsable expression
        #[arg(long)]
        fail_fast: bool,

        #[command(flatten)]
        format: Format,
    },

    /// Report every error and unparsable binding in a template
    Check {
        /// Input template file
        path: String,

        /// Keep whitespace-only text nodes
        #[arg(long)]
        preserve_whitespace: bool,
    },

    /// Parse a single expression and print its AST
    Expr {
        expression: String,

        /// Parse as an event handler (allows `path = value`)
        #[arg(long)]
        action: bool,

        /// Print canonical source instead of JSON
        #[arg(long)]
        canonical: bool,

        #[arg(long)]
        pretty: bool,
    },

    /// Print the lexer tokens of a single expression
    Tokens {
        expression: String,

        #[arg(long)]
        pretty: bool,
    },
}

#[derive(Args)]
struct Format {
    /// Keep whitespace-only text nodes
    #[arg(long)]
    preserve_whitespace: bool,

    /// Indent the JSON output
    #[arg(long)]
    pretty: bool,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Command::Parse {
            path,
            output,
            fail_fast,
            format,
        } => cmd_parse(&path, output.as_deref(), fail_fast, &format),
        Command::Check {
            path,
            preserve_whitespace,
        } => cmd_check(&path, preserve_whitespace),
        Command::Expr {
            expression,
            action,
            canonical,
            pretty,
        } => cmd_expr(&expression, action, canonical, pretty),
        Command::Tokens { expression, pretty } => cmd_tokens(&expression, pretty),
    }
}

fn read_source(path: &str) -> String {
    let p = Path::new(path);
    if !p.exists() {
        eprintln!("Error: file not found: {path}");
        std::process::exit(1);
    }
    match std::fs::read_to_string(p) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error reading {path}: {e}");
            std::process::exit(1);
        }
    }
}

fn emit_json<T: serde::Serialize + ?Sized>(value: &T, pretty: bool) -> String {
    match ngtp_printer::to_json(value, pretty) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_parse(path: &str, output: Option<&Path>, fail_fast: bool, format: &Format) {
    let source = read_source(path);
    let options = ParseOptions {
        error_policy: if fail_fast {
            ErrorPolicy::FailFast
        } else {
            ErrorPolicy::Placeholder
        },
        preserve_whitespace: format.preserve_whitespace,
    };

    let root = match TemplateParser::parse_with_options(&source, options) {
        Ok(root) => root,
        Err(e) => {
            eprintln!("{path}: {e}");
            std::process::exit(1);
        }
    };

    debug!("{path}: {} top-level node(s)", root.nodes.len());

    let json = emit_json(&root, format.pretty);
    match output {
        Some(out) => {
            if let Err(e) = std::fs::write(out, format!("{json}\n")) {
                eprintln!("Error writing {}: {e}", out.display());
                std::process::exit(1);
            }
            eprintln!("Wrote: {}", out.display());
        }
        None => println!("{json}"),
    }
}

fn cmd_check(path: &str, preserve_whitespace: bool) {
    let source = read_source(path);
    let options = ParseOptions {
        preserve_whitespace,
        ..ParseOptions::default()
    };

    let root = match TemplateParser::parse_with_options(&source, options) {
        Ok(root) => root,
        Err(e) => {
            eprintln!("{path}: {e}");
            std::process::exit(1);
        }
    };

    let broken = unparsable_bindings(&root);
    if broken.is_empty() {
        eprintln!("OK: {path}");
        return;
    }

    for binding in &broken {
        for error in &binding.errors {
            eprintln!("{path}: {error}");
        }
    }
    eprintln!("{path}: {} unparsable binding(s)", broken.len());
    std::process::exit(1);
}

fn cmd_expr(expression: &str, action: bool, canonical: bool, pretty: bool) {
    let parsed = if action {
        ExprParser::parse_action(expression)
    } else {
        ExprParser::parse(expression)
    };

    match parsed {
        Ok(ast) if canonical => println!("{}", ngtp_printer::unparse(&ast)),
        Ok(ast) => println!("{}", emit_json(&ast, pretty)),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

fn cmd_tokens(expression: &str, pretty: bool) {
    let tokens = tokenize_lossy(expression);
    println!("{}", emit_json(&tokens, pretty));
    if tokens.iter().any(|token| token.is_error()) {
        std::process::exit(1);
    }
}
