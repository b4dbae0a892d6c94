use anyhow::{anyhow, Context};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use rofflang::error::WarningMask;
use rofflang::roffmacro::Macro;
use rofflang::token;
use rofflang::vm;
use rofflang_stdlib::output;
use rofflang_stdlib::StdLibState;
use std::io::{Read, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Run roff documents through the Rofflang interpreter.
///
/// Requests, macros, strings, registers, conditionals, loops and diversions are interpreted;
///     the remaining text is written to standard output unformatted.
/// Diagnostics and the output of requests like `tm` go to standard error.
#[derive(Parser)]
#[clap(version)]
struct Cli {
    /// Input files; `-` or no files at all reads standard input
    files: Vec<PathBuf>,

    /// Enable a warning category, or `all` or `w`
    #[arg(short = 'w', value_name = "NAME")]
    enable_warnings: Vec<String>,

    /// Disable a warning category, or `all` or `w`
    #[arg(short = 'W', value_name = "NAME")]
    disable_warnings: Vec<String>,

    /// Start in compatibility mode
    #[arg(short = 'C')]
    compatible: bool,

    /// Set a number register before reading input
    #[arg(short = 'r', value_name = "NAME=VALUE")]
    registers: Vec<String>,

    /// Define a string before reading input
    #[arg(short = 'd', value_name = "NAME=STRING")]
    strings: Vec<String>,

    /// Read a macro file before the input files
    #[arg(short = 'm', value_name = "FILE")]
    macro_files: Vec<PathBuf>,

    /// Maximum depth of the input stack; zero means no limit
    #[arg(long)]
    stack_limit: Option<usize>,

    /// How diagnostics are reported
    #[arg(long, value_enum, default_value_t = DiagnosticsFormat::Text)]
    diagnostics: DiagnosticsFormat,

    /// Log filter, like `debug` or `rofflang=trace`; overrides RUST_LOG
    #[arg(long)]
    log_level: Option<String>,

    /// Write a backtrace of the input stack after every diagnostic
    #[arg(short = 'b')]
    backtrace: bool,

    /// Make the `n` condition true and the `t` condition false
    #[arg(long)]
    nroff: bool,

    /// Print the documentation for a request, or list all requests, and exit
    #[arg(long, value_name = "REQUEST", num_args = 0..=1, default_missing_value = "")]
    doc: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DiagnosticsFormat {
    /// One line per diagnostic on standard error, as the diagnostics are reported
    Text,
    /// A JSON array on standard error, after the run
    Json,
}

fn main() {
    let args: Cli = Cli::parse();
    init_logging(args.log_level.as_deref());
    match run(args) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("{}: {err:#}", "error".bold().red());
            std::process::exit(1);
        }
    }
}

fn init_logging(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Run the documents. Returns false if processing ended with a fatal error.
fn run(args: Cli) -> anyhow::Result<bool> {
    let mut vm = StdLibState::new_vm();
    if let Some(name) = args.doc {
        return doc(&vm, &name).map(|()| true);
    }
    configure(&mut vm, &args)?;

    let mut sources: Vec<(String, Vec<u8>)> = vec![];
    for path in &args.macro_files {
        sources.push(read_input(path)?);
    }
    if args.files.is_empty() {
        sources.push(read_input(&PathBuf::from("-"))?);
    }
    for path in &args.files {
        sources.push(read_input(path)?);
    }
    // The input stack reads its top first.
    for (name, contents) in sources.into_iter().rev() {
        if let Err(err) = vm.push_source(&name, contents) {
            eprintln!("{err}");
            return Ok(false);
        }
    }

    tracing::info!(files = args.files.len(), "run");
    let result = output::run(&mut vm);
    if args.diagnostics == DiagnosticsFormat::Json {
        let json = serde_json::to_string_pretty(&vm.state.diagnostics)
            .context("failed to serialize the diagnostics")?;
        eprintln!("{json}");
    }
    match result {
        Ok(tokens) => {
            let text = token::write_tokens(&tokens, vm.names());
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(text.as_bytes())
                .and_then(|()| stdout.flush())
                .context("failed to write the output")?;
            Ok(true)
        }
        Err(err) => {
            eprintln!("{err}");
            Ok(false)
        }
    }
}

fn configure(vm: &mut vm::VM<StdLibState>, args: &Cli) -> anyhow::Result<()> {
    let interp = vm.interp_mut();
    interp.compatible = args.compatible;
    interp.backtrace_on_diagnostics = args.backtrace;
    for name in &args.enable_warnings {
        let mask = warning_mask(name)?;
        interp.warning_mask = WarningMask(interp.warning_mask.0 | mask.0);
    }
    for name in &args.disable_warnings {
        let mask = warning_mask(name)?;
        interp.warning_mask = WarningMask(interp.warning_mask.0 & !mask.0);
    }
    if let Some(limit) = args.stack_limit {
        vm.input_stack_mut().set_limit(limit);
    }
    vm.state.nroff = args.nroff;
    if args.diagnostics == DiagnosticsFormat::Json {
        vm.diagnostics_on_terminal = false;
        vm.state.collect_diagnostics = true;
    }
    for assignment in &args.registers {
        let (name, value) = split_assignment(assignment)?;
        let value: i32 = value
            .trim()
            .parse()
            .with_context(|| format!("invalid value for register '{name}': '{value}'"))?;
        let name = vm.intern(name);
        vm.registers.set_value(name, value);
    }
    for assignment in &args.strings {
        let (name, value) = split_assignment(assignment)?;
        let name = vm.intern(name);
        let value = vm.filter_external_input(value.as_bytes());
        vm.commands.insert_macro(name, Macro::from_bytes(&value));
    }
    Ok(())
}

fn warning_mask(name: &str) -> anyhow::Result<WarningMask> {
    WarningMask::for_name(name).ok_or_else(|| anyhow!("unknown warning category '{name}'"))
}

fn split_assignment(s: &str) -> anyhow::Result<(&str, &str)> {
    match s.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name, value)),
        _ => Err(anyhow!("expected NAME=VALUE, got '{s}'")),
    }
}

fn read_input(path: &PathBuf) -> anyhow::Result<(String, Vec<u8>)> {
    if path.as_os_str() == "-" {
        let mut contents = vec![];
        std::io::stdin()
            .read_to_end(&mut contents)
            .context("failed to read standard input")?;
        return Ok(("-".into(), contents));
    }
    let contents =
        std::fs::read(path).with_context(|| format!("cannot open '{}'", path.display()))?;
    Ok((path.display().to_string(), contents))
}

fn doc(vm: &vm::VM<StdLibState>, name: &str) -> anyhow::Result<()> {
    let built_ins = vm.commands.built_in_commands();
    if name.is_empty() {
        let mut names: Vec<(&str, Option<&'static str>)> = built_ins
            .iter()
            .map(|(name, built_in)| (vm.name_str(*name), built_in.doc()))
            .collect();
        names.sort();
        let mut last_prefix = None;
        for (i, (name, doc)) in names.into_iter().enumerate() {
            let prefix = name.chars().next();
            if last_prefix != prefix {
                last_prefix = prefix;
                if i != 0 {
                    println!();
                }
            }
            let first_line = doc.unwrap_or("").split('\n').next().unwrap_or("");
            println!(".{}  {}", name.bold(), first_line);
        }
        return Ok(());
    }
    let built_in = vm
        .names()
        .get(name)
        .and_then(|interned| built_ins.get(&interned))
        .ok_or_else(|| anyhow!("unknown request '.{name}'"))?;
    println!(".{}  {}", name.bold(), built_in.doc().unwrap_or(""));
    Ok(())
}
