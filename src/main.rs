//! The command-line interface of the `glsl-tools` suite.

use clap::{Args, Parser, Subcommand, ValueEnum};
use glsl_parse::VariableSymbol;
use glsl_program::{FileResolver, Preprocessor, PreprocessorOptions, Program};
use lalr_gen::{Construction, Grammar, GrammarError};
use std::{fs, path::PathBuf};
use thiserror::Error;

#[derive(Parser)]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    /// main command
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// preprocess the source file and output the translation to stdout
    Preprocess(CommonArgs),
    /// check correctness of the source file
    Check(CommonArgs),
    /// output the declaration syntax tree to stdout
    Dump(CommonArgs),
    /// list the uniforms of the source file, with their annotations
    Uniforms(CommonArgs),
    /// list the outputs of the source file, with their annotations
    Outs(CommonArgs),
    /// build a parser table and report its conflicts
    Table(TableArgs),
}

#[derive(Args)]
struct CommonArgs {
    /// glsl source file
    input: PathBuf,
    /// include directory, defaults to the directory of the source file
    #[arg(short = 'I', long = "include")]
    include: Option<PathBuf>,
    /// predefined macro, `NAME` or `NAME=VALUE`
    #[arg(short = 'D', long = "define")]
    defines: Vec<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum TableGrammar {
    Glsl,
    Preprocessor,
    Annotation,
}

#[derive(Clone, Copy, ValueEnum)]
enum TableConstruction {
    Canonical,
    Merged,
    Unioned,
}

impl From<TableConstruction> for Construction {
    fn from(value: TableConstruction) -> Self {
        match value {
            TableConstruction::Canonical => Construction::Canonical,
            TableConstruction::Merged => Construction::Merged,
            TableConstruction::Unioned => Construction::Unioned,
        }
    }
}

#[derive(Args)]
struct TableArgs {
    grammar: TableGrammar,
    /// state collection used to build the table
    #[arg(long, value_enum, default_value = "unioned")]
    construction: TableConstruction,
    /// print every state of the table
    #[arg(long)]
    dump: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("could not read `{0}`: {1}")]
    Io(PathBuf, std::io::Error),
    #[error("{0}")]
    Program(#[from] glsl_program::Error),
    #[error("{0}")]
    Grammar(#[from] GrammarError),
}

impl CommonArgs {
    fn read_source(&self) -> Result<String, CliError> {
        fs::read_to_string(&self.input).map_err(|e| CliError::Io(self.input.clone(), e))
    }

    fn resolver(&self) -> FileResolver {
        let base = self.include.clone().unwrap_or_else(|| {
            self.input
                .parent()
                .map(|dir| dir.to_path_buf())
                .unwrap_or_default()
        });
        FileResolver::new(base)
    }

    fn options(&self) -> PreprocessorOptions {
        let predefined = self
            .defines
            .iter()
            .map(|def| match def.split_once('=') {
                Some((name, value)) => (name.to_string(), value.to_string()),
                None => (def.clone(), "1".to_string()),
            })
            .collect();
        PreprocessorOptions {
            predefined,
            ..Default::default()
        }
    }

    fn program(&self) -> Result<Program<FileResolver>, CliError> {
        let source = self.read_source()?;
        let mut program = Program::new(self.resolver());
        program.set_options(self.options());
        let res = program.parse(&source);
        for msg in program.log() {
            eprintln!("{msg}");
        }
        res?;
        Ok(program)
    }
}

fn print_symbols(symbols: &[VariableSymbol]) {
    for symbol in symbols {
        println!("{symbol}");
    }
}

fn grammar(grammar: TableGrammar) -> Result<Grammar, GrammarError> {
    match grammar {
        TableGrammar::Glsl => glsl_parse::grammar::glsl_grammar(),
        TableGrammar::Preprocessor => glsl_program::preprocess::grammar::preprocessor_grammar(),
        TableGrammar::Annotation => glsl_parse::annotation::annotation_grammar(),
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    match &cli.command {
        Command::Preprocess(args) => {
            let source = args.read_source()?;
            let mut pp = Preprocessor::new(args.resolver());
            pp.set_options(args.options());
            let res = pp.translate(&source);
            for msg in pp.log() {
                eprintln!("{msg}");
            }
            print!("{}", res?);
        }
        Command::Check(args) => {
            print!("{} -- ", args.input.display());
            args.program()?;
            println!("OK");
        }
        Command::Dump(args) => {
            let program = args.program()?;
            if let Some(unit) = program.unit() {
                println!("{unit:#?}");
            }
        }
        Command::Uniforms(args) => print_symbols(&args.program()?.uniforms(true)),
        Command::Outs(args) => print_symbols(&args.program()?.outs(true)),
        Command::Table(args) => {
            let table = grammar(args.grammar)?.build_table(args.construction.into());
            println!(
                "{} states, {} conflicts",
                table.num_states(),
                table.conflicts().len()
            );
            for conflict in table.conflicts() {
                println!("{conflict}");
            }
            if args.dump {
                println!("{table}");
            }
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(err) = run(&cli) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
