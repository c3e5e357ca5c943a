//! kestrelc: The kestrel compiler back end CLI.
//!
//! Usage:
//!   kestrelc [options] [file...]
//!
//! Reads syntax trees produced by the kestrel parser (JSON), reports
//! semantic diagnostics, and writes MIPS assembly next to each input.

use clap::Parser as ClapParser;
use kestrel_compiler::{LoadError, Program, UnitResult};
use kestrel_diagnostics::{Diagnostic, DiagnosticCollection};
use kestrel_options::{CompilerOptions, ConfigError, KestrelConfig};
use std::path::{Path, PathBuf};
use std::process;
use std::time::{Duration, Instant};

const DEFAULT_PROJECT_FILE: &str = "kestrel.json";

#[derive(ClapParser, Debug)]
#[command(name = "kestrelc", about = "kestrel - semantic analysis and MIPS code generation", disable_version_flag = true)]
struct Cli {
    /// Syntax tree files to compile.
    #[arg(value_name = "FILE")]
    files: Vec<String>,

    /// Path to kestrel.json.
    #[arg(short = 'p', long = "project")]
    project: Option<String>,

    /// Redirect output files to the directory.
    #[arg(long = "outDir")]
    out_dir: Option<String>,

    /// Check only; do not write assembly.
    #[arg(long = "noEmit")]
    no_emit: bool,

    /// Number of temporary registers available to expressions (1-10).
    #[arg(long = "registers", value_name = "N")]
    registers: Option<usize>,

    /// Do not annotate the assembly with comments.
    #[arg(long = "noComments")]
    no_comments: bool,

    /// List all files that are part of the compilation.
    #[arg(long = "listFiles")]
    list_files: bool,

    /// Report per-phase timings and written files.
    #[arg(long)]
    verbose: bool,

    /// Enable colored diagnostics when stderr is a terminal.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pretty: bool,

    /// Print the compiler version.
    #[arg(short = 'v', long)]
    version: bool,
}

/// Failures that stop the driver before or after compilation.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
enum CliError {
    #[error("no input files found")]
    #[diagnostic(code(kestrelc::no_input), help("pass syntax tree files, or a kestrel.json with -p"))]
    NoInput,

    #[error(transparent)]
    #[diagnostic(code(kestrelc::config))]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(code(kestrelc::load), help("inputs must be JSON syntax trees produced by the kestrel parser"))]
    Load(#[from] LoadError),

    #[error("failed to write output files")]
    #[diagnostic(code(kestrelc::emit))]
    Write(#[source] std::io::Error),
}

// ANSI color codes
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const GRAY: &str = "\x1b[90m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn main() {
    let cli = Cli::parse();

    if cli.version {
        println!("kestrelc Version {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let exit_code = match run_compile(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:?}", miette::Report::new(err));
            1
        }
    };
    process::exit(exit_code);
}

/// Per-phase wall clock, reported with `--verbose`.
#[derive(Default)]
struct Timings {
    phases: Vec<(&'static str, Duration)>,
}

impl Timings {
    fn time<T>(&mut self, phase: &'static str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let value = f();
        self.phases.push((phase, start.elapsed()));
        value
    }
}

fn run_compile(cli: &Cli) -> Result<i32, CliError> {
    let start = Instant::now();
    let use_color = cli.pretty && atty_is_terminal();
    let mut timings = Timings::default();

    let (files, config) = resolve_input_files(cli)?;
    if files.is_empty() {
        return Err(CliError::NoInput);
    }

    if cli.list_files {
        for f in &files {
            println!("{}", f);
        }
    }

    // CLI options override kestrel.json
    let base = config.map(|c| c.options()).unwrap_or_default();
    let options = base.merge(&cli_overrides(cli));
    options.validate()?;

    let mut program = Program::new(files, options);
    timings.time("load", || program.load_root_files())?;

    let results = timings.time("compile", || program.compile());

    let mut blocked = 0;
    let mut all = DiagnosticCollection::new();
    for result in &results {
        print_unit_diagnostics(result, use_color);
        if !result.succeeded() {
            blocked += 1;
        }
        all.extend(result.diagnostics.clone());
    }

    let written = timings
        .time("emit", || program.write_outputs(&results))
        .map_err(CliError::Write)?;

    if cli.verbose {
        for path in &written {
            eprintln!("wrote {}", path.display());
        }
        for (phase, elapsed) in &timings.phases {
            eprintln!("{:>8}: {:.2}ms", phase, elapsed.as_secs_f64() * 1000.0);
        }
    }

    if blocked > 0 {
        print_summary(&all, blocked, use_color);
        return Ok(2);
    }

    if use_color {
        eprintln!(
            "{}Compilation completed in {:.2}s.{}",
            GRAY,
            start.elapsed().as_secs_f64(),
            RESET
        );
    }

    Ok(0)
}

fn cli_overrides(cli: &Cli) -> CompilerOptions {
    CompilerOptions {
        temp_registers: cli.registers,
        emit_comments: cli.no_comments.then_some(false),
        out_dir: cli.out_dir.clone(),
        no_emit: cli.no_emit.then_some(true),
        output_extension: None,
    }
}

fn resolve_input_files(cli: &Cli) -> Result<(Vec<String>, Option<KestrelConfig>), CliError> {
    if let Some(ref project) = cli.project {
        let (files, config) = load_files_from_config(project)?;
        // Files named on the command line replace the project's list.
        if cli.files.is_empty() {
            Ok((files, Some(config)))
        } else {
            Ok((cli.files.clone(), Some(config)))
        }
    } else if !cli.files.is_empty() {
        Ok((cli.files.clone(), None))
    } else if Path::new(DEFAULT_PROJECT_FILE).exists() {
        let (files, config) = load_files_from_config(DEFAULT_PROJECT_FILE)?;
        Ok((files, Some(config)))
    } else {
        Ok((vec![], None))
    }
}

fn load_files_from_config(path: &str) -> Result<(Vec<String>, KestrelConfig), ConfigError> {
    let mut config = kestrel_options::parse_config_file(path)?;
    let root_dir = Path::new(path)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let files: Vec<String> = config
        .files()
        .iter()
        .map(|f| root_dir.join(f).to_string_lossy().to_string())
        .collect();

    // outDir is relative to the project file as well.
    if let Some(options) = config.compiler_options.as_mut() {
        if let Some(out_dir) = options.out_dir.take() {
            options.out_dir = Some(root_dir.join(out_dir).to_string_lossy().to_string());
        }
    }

    Ok((files, config))
}

fn print_unit_diagnostics(result: &UnitResult, use_color: bool) {
    let file = result.file_name.as_deref().unwrap_or("<input>");
    for diag in result.diagnostics.diagnostics() {
        print_diagnostic(file, diag, use_color);
    }
}

fn print_diagnostic(file: &str, diag: &Diagnostic, use_color: bool) {
    if use_color {
        let color = if diag.is_error() { RED } else { YELLOW };
        eprint!("{}{}{}", CYAN, file, RESET);
        if let Some(position) = diag.position {
            eprint!(":{}", position);
        }
        eprintln!(
            ": {} {}{}{}{} {}K{}{}: {}",
            diag.kind, BOLD, color, diag.category, RESET, CYAN, diag.code, RESET, diag.message_text
        );
    } else if diag.position.is_some() {
        eprintln!("{}:{}", file, diag);
    } else {
        eprintln!("{}: {}", file, diag);
    }
}

fn print_summary(all: &DiagnosticCollection, blocked: usize, use_color: bool) {
    let summary = all.summary();
    let errors = all.error_count();
    let warnings = all.warning_count();
    let line = format!(
        "Found {} error{} and {} warning{} ({} lexical, {} syntactic, {} semantic, {} codegen); {} file{} not generated.",
        errors,
        plural(errors),
        warnings,
        plural(warnings),
        summary.lexical,
        summary.syntactic,
        summary.semantic,
        summary.codegen,
        blocked,
        plural(blocked),
    );
    if use_color {
        eprintln!("\n{}{}{}", RED, line, RESET);
    } else {
        eprintln!("\n{}", line);
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

fn atty_is_terminal() -> bool {
    #[cfg(unix)]
    {
        unsafe { libc::isatty(2) != 0 }
    }
    #[cfg(not(unix))]
    {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_parse() {
        let cli = Cli::try_parse_from([
            "kestrelc",
            "a.json",
            "b.json",
            "--outDir",
            "build",
            "--registers",
            "4",
            "--noComments",
            "--noEmit",
            "--pretty",
            "false",
        ])
        .unwrap();
        assert_eq!(cli.files, ["a.json", "b.json"]);
        assert!(!cli.pretty);

        let options = cli_overrides(&cli);
        assert_eq!(options.temp_registers(), 4);
        assert!(!options.emit_comments());
        assert!(options.no_emit());
        assert_eq!(options.out_dir(), Some("build"));
    }

    #[test]
    fn test_unset_flags_do_not_override_config() {
        let cli = Cli::try_parse_from(["kestrelc", "a.json"]).unwrap();
        let base = CompilerOptions {
            temp_registers: Some(5),
            emit_comments: Some(false),
            ..Default::default()
        };
        let merged = base.merge(&cli_overrides(&cli));
        assert_eq!(merged.temp_registers(), 5);
        assert!(!merged.emit_comments());
        assert!(cli.pretty);
    }

    #[test]
    fn test_project_files_are_relative_to_config() {
        let (files, config) = load_files_from_config("../../tests/fixtures/kestrel.json").unwrap();
        let root = Path::new("../../tests/fixtures");
        assert_eq!(
            files,
            [
                root.join("global_init.json").to_string_lossy().to_string(),
                root.join("widening.json").to_string_lossy().to_string(),
            ]
        );
        let out_dir = root.join("build").to_string_lossy().to_string();
        assert_eq!(config.options().out_dir(), Some(out_dir.as_str()));
    }
}
