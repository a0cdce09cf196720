use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use chocopy::{
    codegen, pipeline,
    util::{fmt::tree, intern::Interner},
};
use clap::{ArgGroup, Parser};
use log::{info, LevelFilter};

mod toolchain;

#[derive(Parser)]
#[command(name = "chocopyc", about = "ChocoPy to native compiler", version)]
#[command(group(ArgGroup::new("phase").args(["lex", "parse", "names", "types", "emit_ir"])))]
struct Cli {
    /// Source file to compile.
    file: PathBuf,

    /// Run the lexer and print the tokens.
    #[arg(short = 'l')]
    lex: bool,

    /// Run the parser and print the tree.
    #[arg(short = 'p')]
    parse: bool,

    /// Run the name-scope analysis.
    #[arg(short = 'n')]
    names: bool,

    /// Run the type checker.
    #[arg(short = 't')]
    types: bool,

    /// Write `<basename>.ll` next to the source, without assembling.
    #[arg(short = 'c')]
    emit_ir: bool,

    /// Path of the executable (defaults to `<basename>`).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// LLVM static compiler to assemble the IR with.
    #[arg(long, default_value = "llc")]
    llc: PathBuf,

    /// Extra argument for `llc`, once per occurrence. The IR uses opaque
    /// pointers, so LLVM 14 needs `--llc-arg=-opaque-pointers`; 15 and up
    /// need nothing.
    #[arg(long = "llc-arg", value_name = "ARG", allow_hyphen_values = true)]
    llc_args: Vec<String>,

    /// C compiler driver to link with.
    #[arg(long, default_value = "gcc")]
    cc: PathBuf,

    /// Optimization level passed to `llc`.
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(0..=3))]
    opt_level: u8,

    /// Size in bytes of the buffer `input()` reads into.
    #[arg(long = "string-buffer", default_value_t = 10_000, value_parser = parse_buffer_len)]
    string_buffer_len: usize,

    /// Increases logging, once per occurrence.
    #[arg(short, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_buffer_len(arg: &str) -> Result<usize, String> {
    match arg.parse::<usize>() {
        Ok(len) if len >= 2 => Ok(len),
        Ok(_) => Err("the buffer must hold at least one character".into()),
        Err(error) => Err(error.to_string()),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    match run(&cli) {
        Ok(Outcome::Done) => ExitCode::SUCCESS,
        Ok(Outcome::Diagnostic(diagnostic)) => {
            println!("{diagnostic}");
            ExitCode::FAILURE
        }
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .init();
}

enum Outcome {
    Done,
    /// A compile error, already rendered.
    Diagnostic(String),
}

fn run(cli: &Cli) -> Result<Outcome> {
    let src = fs::read_to_string(&cli.file)
        .with_context(|| format!("failed to read {}", cli.file.display()))?;
    let interner = &mut Interner::with_capacity(128);
    let stdout = &mut io::stdout().lock();

    let result = if cli.lex {
        pipeline::lex(&src).map(|tokens| tree::print_tokens(stdout, &src, &tokens))
    } else if cli.parse {
        pipeline::parse(&src, interner).map(|program| {
            stdout.write_all(tree::print_program_string(interner, &program, None).as_bytes())
        })
    } else if cli.names {
        pipeline::check_scopes(&src, interner).map(|_| Ok(()))
    } else if cli.types {
        pipeline::check_types(&src, interner).map(|_| Ok(()))
    } else {
        let options = codegen::Options {
            string_buffer_len: cli.string_buffer_len,
        };
        match pipeline::emit_ir(&src, interner, &options) {
            Ok(ir) => return build(cli, &ir).map(|()| Outcome::Done),
            Err(error) => Err(error),
        }
    };

    match result {
        Ok(written) => {
            written.context("failed to write to stdout")?;
            Ok(Outcome::Done)
        }
        Err(error) => Ok(Outcome::Diagnostic(error.report(&src, interner))),
    }
}

fn build(cli: &Cli, ir: &str) -> Result<()> {
    if cli.emit_ir {
        let path = cli.file.with_extension("ll");
        fs::write(&path, ir).with_context(|| format!("failed to write {}", path.display()))?;
        info!("wrote {}", path.display());
        return Ok(());
    }

    let output = match &cli.output {
        Some(output) => output.clone(),
        None => default_output(&cli.file)?,
    };
    let tools = toolchain::Toolchain {
        llc: &cli.llc,
        llc_args: &cli.llc_args,
        cc: &cli.cc,
        opt_level: cli.opt_level,
    };
    tools.build_executable(ir, &output)?;
    info!("wrote {}", output.display());
    Ok(())
}

/// `dir/prog.py` becomes `dir/prog`.
fn default_output(file: &Path) -> Result<PathBuf> {
    let stem = file
        .file_stem()
        .with_context(|| format!("{} has no file name", file.display()))?;
    Ok(file.with_file_name(stem))
}

#[cfg(test)]
mod tests {
    use std::ffi::OsStr;

    use super::*;

    #[test]
    fn test_default_output() {
        let output = default_output(Path::new("demos/fib.py")).unwrap();
        assert_eq!(output, Path::new("demos/fib"));
    }

    #[test]
    fn test_phase_flags_are_exclusive() {
        assert!(Cli::try_parse_from(["chocopyc", "-l", "-p", "a.py"]).is_err());
        let cli = Cli::try_parse_from(["chocopyc", "-vv", "-c", "a.py"]).unwrap();
        assert!(cli.emit_ir);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.string_buffer_len, 10_000);
    }

    #[test]
    fn test_buffer_len_is_validated() {
        assert!(Cli::try_parse_from(["chocopyc", "--string-buffer", "1", "a.py"]).is_err());
        let cli = Cli::try_parse_from(["chocopyc", "--string-buffer", "64", "a.py"]).unwrap();
        assert_eq!(cli.string_buffer_len, 64);
    }

    #[test]
    fn test_llc_args_accumulate() {
        let cli = Cli::try_parse_from([
            "chocopyc",
            "--llc-arg=-opaque-pointers",
            "--llc-arg",
            "-mcpu=generic",
            "a.py",
        ])
        .unwrap();
        assert_eq!(cli.llc_args, ["-opaque-pointers", "-mcpu=generic"]);
        let cli = Cli::try_parse_from(["chocopyc", "a.py"]).unwrap();
        assert!(cli.llc_args.is_empty());
    }

    #[test]
    fn test_emit_ir_writes_next_to_source() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("prog.py");
        fs::write(&file, "print(1 + 2)\n").unwrap();
        let cli = Cli::try_parse_from([OsStr::new("chocopyc"), OsStr::new("-c"), file.as_os_str()])
            .unwrap();
        assert!(matches!(run(&cli).unwrap(), Outcome::Done));
        let ir = fs::read_to_string(dir.path().join("prog.ll")).unwrap();
        assert!(ir.contains("define i32 @main()"));
    }

    #[test]
    fn test_diagnostics_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("bad.py");
        fs::write(&file, "x: int = True\n").unwrap();
        let cli = Cli::try_parse_from([OsStr::new("chocopyc"), OsStr::new("-t"), file.as_os_str()])
            .unwrap();
        let Outcome::Diagnostic(diagnostic) = run(&cli).unwrap() else {
            panic!("expected a diagnostic");
        };
        assert!(diagnostic.starts_with("Semantic Error"));
    }
}
