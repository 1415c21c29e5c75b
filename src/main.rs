use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use mini_compiler::{compile, Compilation, CompileOptions, ErrorPolicy, TracingSink};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Compile a program down to virtual instructions and print the stages.
#[derive(Parser, Debug)]
#[command(name = "minic")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Source file to compile
    #[arg(required_unless_present = "eval", conflicts_with = "eval")]
    file: Option<PathBuf>,

    /// Compile the given source text instead of a file
    #[arg(short, long)]
    eval: Option<String>,

    /// Stage output to print (repeatable)
    #[arg(long, value_enum, default_values_t = [Stage::Ir, Stage::Bytecode])]
    emit: Vec<Stage>,

    /// Keep going after syntax and resolution errors
    #[arg(long)]
    recover: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    Tokens,
    Ast,
    Ir,
    Symbols,
    Bytecode,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    let source = match (&cli.eval, &cli.file) {
        (Some(source), _) => source.clone(),
        (None, Some(path)) => match fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) => {
                eprintln!("Failed to read {}: {err}", path.display());
                return ExitCode::FAILURE;
            }
        },
        (None, None) => unreachable!("clap requires a file or --eval"),
    };

    let options = CompileOptions {
        policy: if cli.recover {
            ErrorPolicy::Recover
        } else {
            ErrorPolicy::Abort
        },
    };

    match compile(&source, &options, &mut TracingSink) {
        Ok(compilation) => {
            for stage in &cli.emit {
                print_stage(*stage, &compilation);
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn print_stage(stage: Stage, compilation: &Compilation) {
    match stage {
        Stage::Tokens => {
            println!("== tokens");
            for token in &compilation.tokens {
                println!("{token}");
            }
        }
        Stage::Ast => {
            println!("== ast");
            if let Some(ast) = &compilation.ast {
                print!("{}", ast.render());
            }
        }
        Stage::Ir => {
            println!("== ir");
            print!("{}", compilation.ir);
        }
        Stage::Symbols => {
            println!("== symbols");
            print!("{}", compilation.symbols);
        }
        Stage::Bytecode => {
            println!("== bytecode");
            for instruction in &compilation.instructions {
                println!("{instruction}");
            }
        }
    }
}
