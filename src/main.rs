//! Purpose: `cfm-digest` CLI entry point.
//! Role: Binary crate root; parses args, hashes inputs through the native engine.
//! Invariants: Only uses construct -> update* -> finish (plus reset between inputs).
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
use std::ffi::OsString;
use std::fs::File;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind};
use confium_digest::api::{
    Context, DEFAULT_PLUGIN, EngineConfig, Error, ErrorKind, IncrementalDigest, NativeLibrary,
    SearchConfig, to_exit_code,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

const DEFAULT_ALGORITHM: &str = "SHA-256";

#[derive(Parser)]
#[command(
    name = "cfm-digest",
    version,
    about = "Compute digests with the confium native hashing engine",
    long_about = r#"Compute digests with the confium native hashing engine.

The native library is found via --library, CONFIUM_LIBRARY_PATH, or the platform
library directories. The provider plugin path comes from --plugin-path or
CFM_HASH_BOTAN_PLUGIN_PATH.

Examples:
  $ cfm-digest sum -a MD5 README.md
  $ printf test | cfm-digest sum -a MD5
  $ cfm-digest info -a SHA-256 --json"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        help = "Native library file, or a directory to search",
        value_hint = ValueHint::AnyPath
    )]
    library: Option<PathBuf>,
    #[arg(long, global = true, default_value = DEFAULT_PLUGIN, help = "Provider plugin name")]
    plugin: String,
    #[arg(
        long,
        global = true,
        help = "Provider plugin file (default: provider search)",
        value_hint = ValueHint::FilePath
    )]
    plugin_path: Option<OsString>,
    #[arg(
        long,
        global = true,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics: auto|always|never"
    )]
    color: ColorMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Print the digest of each input (stdin when none or `-`)")]
    Sum(SumArgs),
    #[command(about = "Describe the loaded library and an algorithm")]
    Info(InfoArgs),
}

#[derive(Args)]
struct SumArgs {
    #[arg(short, long, default_value = DEFAULT_ALGORITHM, help = "Algorithm name, e.g. MD5")]
    algorithm: String,
    #[arg(long, help = "Emit one JSON object per input")]
    json: bool,
    #[arg(value_hint = ValueHint::FilePath)]
    files: Vec<PathBuf>,
}

#[derive(Args)]
struct InfoArgs {
    #[arg(short, long, default_value = DEFAULT_ALGORITHM, help = "Algorithm name, e.g. MD5")]
    algorithm: String,
    #[arg(long, help = "Emit JSON")]
    json: bool,
}

#[derive(Serialize)]
struct SumLine<'a> {
    algorithm: &'a str,
    input: String,
    bytes: u64,
    digest: String,
}

#[derive(Serialize)]
struct InfoReport<'a> {
    library: Option<String>,
    version: Option<String>,
    entry_points: Vec<&'static str>,
    algorithm: &'a str,
    block_length: u32,
    digest_length: u32,
}

fn main() {
    init_tracing();
    let (result, color_mode) = run();
    let exit_code = match result {
        Ok(code) => code,
        Err(err) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn run() -> (Result<i32, Error>, ColorMode) {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => return (clap_outcome(&err), ColorMode::Auto),
    };
    let color_mode = cli.color;
    (dispatch(cli), color_mode)
}

fn clap_outcome(err: &clap::Error) -> Result<i32, Error> {
    match err.kind() {
        ClapErrorKind::DisplayHelp
        | ClapErrorKind::DisplayVersion
        | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            err.print().map_err(|io_err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to write help")
                    .with_source(io_err)
            })?;
            if matches!(
                err.kind(),
                ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            ) {
                Ok(2)
            } else {
                Ok(0)
            }
        }
        _ => Err(Error::new(ErrorKind::Usage)
            .with_message(clap_error_summary(err))
            .with_hint("Try `cfm-digest --help`.")),
    }
}

fn clap_error_summary(err: &clap::Error) -> String {
    err.to_string()
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.trim_start_matches("error:").trim().to_string())
        .unwrap_or_else(|| "invalid arguments".to_string())
}

fn dispatch(cli: Cli) -> Result<i32, Error> {
    let library = load_library(cli.library.as_deref())?;
    let mut config = EngineConfig::from_env().with_plugin_name(cli.plugin);
    if let Some(path) = cli.plugin_path {
        config = config.with_plugin_path(path);
    }
    let context = Context::with_config(library, &config)?;

    match cli.command {
        Command::Sum(args) => run_sum(&context, &args),
        Command::Info(args) => run_info(&context, &args),
    }
}

fn load_library(explicit: Option<&Path>) -> Result<Arc<NativeLibrary>, Error> {
    match explicit {
        Some(path) => {
            let config = SearchConfig::from_env().with_override(path);
            NativeLibrary::resolve(&config).map(Arc::new)
        }
        None => NativeLibrary::global(),
    }
}

fn run_sum(context: &Context, args: &SumArgs) -> Result<i32, Error> {
    let mut digest = context.digest(&args.algorithm)?;
    let inputs = if args.files.is_empty() {
        vec![PathBuf::from("-")]
    } else {
        args.files.clone()
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for input in &inputs {
        let bytes = if input.as_os_str() == "-" {
            digest.update_reader(io::stdin().lock())?
        } else {
            let file = File::open(input).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to open input")
                    .with_path(input)
                    .with_source(err)
            })?;
            digest.update_reader(file)?
        };
        let hex = digest.hexdigest()?;
        digest.reset()?;

        let name = input.display().to_string();
        let line = if args.json {
            let value = SumLine {
                algorithm: &args.algorithm,
                input: name,
                bytes,
                digest: hex,
            };
            serde_json::to_string(&value).map_err(|err| {
                Error::new(ErrorKind::Internal)
                    .with_message("json encode failed")
                    .with_source(err)
            })?
        } else {
            format!("{hex}  {name}")
        };
        writeln!(out, "{line}").map_err(write_error)?;
    }
    Ok(0)
}

fn run_info(context: &Context, args: &InfoArgs) -> Result<i32, Error> {
    let library = context.library();
    let digest = context.digest(&args.algorithm)?;
    let report = InfoReport {
        library: library.path().map(|path| path.display().to_string()),
        version: library.version().ok().map(|version| version.to_string()),
        entry_points: library.bound_entry_points(),
        algorithm: &args.algorithm,
        block_length: digest.block_length()?,
        digest_length: digest.digest_length()?,
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.json {
        let json = serde_json::to_string_pretty(&report).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("json encode failed")
                .with_source(err)
        })?;
        writeln!(out, "{json}").map_err(write_error)?;
        return Ok(0);
    }

    let lines = [
        format!(
            "library:       {}",
            report.library.as_deref().unwrap_or("(in-process)")
        ),
        format!(
            "version:       {}",
            report.version.as_deref().unwrap_or("unknown")
        ),
        format!("entry points:  {}", report.entry_points.join(", ")),
        format!("algorithm:     {}", report.algorithm),
        format!("block length:  {}", report.block_length),
        format!("digest length: {}", report.digest_length),
    ];
    for line in lines {
        writeln!(out, "{line}").map_err(write_error)?;
    }
    Ok(0)
}

fn write_error(err: io::Error) -> Error {
    Error::new(ErrorKind::Io)
        .with_message("failed to write output")
        .with_source(err)
}

#[derive(Serialize)]
struct ErrorRecord<'a> {
    error: ErrorBody<'a>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    kind: String,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    entry_point: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    algorithm: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    causes: Vec<String>,
}

impl<'a> ErrorRecord<'a> {
    fn new(err: &'a Error) -> Self {
        use std::error::Error as _;
        let mut causes = Vec::new();
        let mut cur = err.source();
        while let Some(source) = cur {
            causes.push(source.to_string());
            cur = source.source();
        }
        Self {
            error: ErrorBody {
                kind: format!("{:?}", err.kind()),
                message: err.message().unwrap_or_else(|| fallback_message(err.kind())),
                hint: err.hint(),
                path: err.path().map(|path| path.display().to_string()),
                entry_point: err.entry_point(),
                code: err.code(),
                algorithm: err.algorithm(),
                causes,
            },
        }
    }
}

fn fallback_message(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::LibraryNotFound => "native library not found",
        ErrorKind::EntryPointMissing => "entry point missing",
        ErrorKind::NativeCallFailed => "native call failed",
        ErrorKind::InvalidAlgorithm => "invalid algorithm",
        ErrorKind::Usage | ErrorKind::Internal | ErrorKind::Io => "failed",
    }
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }
    match serde_json::to_string(&ErrorRecord::new(err)) {
        Ok(json) => eprintln!("{json}"),
        Err(_) => eprintln!("{{\"error\":{{\"kind\":\"Internal\"}}}}"),
    }
}

fn paint(label: &str, ansi: &str, enabled: bool) -> String {
    if enabled {
        format!("\u{1b}[{ansi}m{label}\u{1b}[0m")
    } else {
        label.to_string()
    }
}

// Native context (entry point, status, algorithm, path) comes from `Error`'s Display.
fn error_text(err: &Error, use_color: bool) -> String {
    let mut text = format!("{} {err}", paint("error:", "31", use_color));
    if let Some(hint) = err.hint() {
        text.push_str(&format!("\n{} {hint}", paint("hint:", "33", use_color)));
    }
    text
}
