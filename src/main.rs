// lumenc: command-line driver for the Lumen compiler front end

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgAction, Parser, ValueEnum};
use tracing::Level;

use lumenc::pipeline::{CompileError, CompileOptions, Compiler, Mode};

#[derive(Parser, Debug)]
#[command(name = "lumenc", version, about = "Parse, type check and lower Lumen source to stack IR")]
struct Cli {
    /// Source file to compile
    file: PathBuf,

    /// Keep running later stages after errors
    #[arg(long)]
    exploratory: bool,

    /// What to print after compiling
    #[arg(long, value_enum, default_value_t = Emit::Diagnostics)]
    emit: Emit,

    /// Log more (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Emit {
    Diagnostics,
    Ast,
    Symbols,
    Ir,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.exploratory {
        Mode::Exploratory
    } else {
        Mode::Strict
    };
    let compiler = Compiler::new(CompileOptions::new().mode(mode));

    eprintln!("Compiling {}...", cli.file.display());
    let compilation = match compiler.compile_file(&cli.file) {
        Ok(compilation) => compilation,
        Err(err @ CompileError::Io { .. }) => {
            return Err(anyhow::Error::new(err).context("no source to compile"));
        }
        Err(err) => {
            for diagnostic in err.diagnostics() {
                println!("{}", diagnostic);
            }
            eprintln!("Error: {}", err);
            return Ok(ExitCode::FAILURE);
        }
    };

    for diagnostic in &compilation.diagnostics {
        println!("{}", diagnostic);
    }

    match cli.emit {
        Emit::Diagnostics => {}
        Emit::Ast => {
            for item in &compilation.unit().items {
                println!("{:#?}", item);
            }
        }
        Emit::Symbols => print!("{}", compilation.checked.symbols),
        Emit::Ir => print!("{}", compilation.ir),
    }

    if compilation.has_errors() {
        eprintln!(
            "Finished with {} diagnostic(s), errors present.",
            compilation.diagnostics.len()
        );
        return Ok(ExitCode::FAILURE);
    }

    eprintln!(
        "Compiled successfully. {} routine(s) generated.",
        compilation.ir.routines.len()
    );
    Ok(ExitCode::SUCCESS)
}
