//! flagstack CLI
//!
//! Entry point for the `flagstack` command-line tool.

use clap::{Args, Parser, Subcommand, ValueEnum};
use flagstack::pipeline::emit;
use flagstack::resolver::FlagError;
use flagstack::source::parse_layer_source;
use flagstack::{LayerEntry, OutputFormat, Stack, StackError};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Manifest used when neither --manifest nor --catalog is given.
const DEFAULT_MANIFEST: &str = "flagstack.toml";

#[derive(Parser)]
#[command(name = "flagstack")]
#[command(about = "Resolve layered build-flag overrides", version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct StackArgs {
    /// Stack manifest listing the catalog and layers (default: flagstack.toml)
    #[arg(long, short = 'm', conflicts_with_all = ["catalog", "layer"])]
    manifest: Option<PathBuf>,

    /// Flag catalog, used with --layer instead of a manifest
    #[arg(long, short = 'c')]
    catalog: Option<PathBuf>,

    /// Layer as ID:PRIORITY:PATH (repeatable)
    #[arg(long, short = 'l', requires = "catalog")]
    layer: Vec<LayerEntry>,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Header,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Header => OutputFormat::Header,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve, validate and emit the final configuration
    Resolve {
        #[command(flatten)]
        stack: StackArgs,

        /// Output syntax
        #[arg(long, short = 'f', value_enum, default_value = "header")]
        format: FormatArg,

        /// Annotate header lines with descriptions and source layers
        #[arg(long)]
        annotate: bool,

        /// Write output to a file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Check constraints without emitting
    Validate {
        #[command(flatten)]
        stack: StackArgs,

        /// Output the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show where every flag's final state came from
    Explain {
        #[command(flatten)]
        stack: StackArgs,

        /// Output in human-readable format instead of JSON
        #[arg(long)]
        human: bool,
    },

    /// Parse a single layer source and print its directives
    Parse {
        /// Layer source file
        path: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    match cli.command {
        Commands::Resolve {
            stack,
            format,
            annotate,
            output,
        } => run_resolve(stack, format.into(), annotate, output),
        Commands::Validate { stack, json } => run_validate(stack, json),
        Commands::Explain { stack, human } => run_explain(stack, human),
        Commands::Parse { path } => run_parse(&path),
    }
}

fn init_tracing(verbose: u8, json: bool) {
    let filter = match verbose {
        0 => "flagstack=warn,flagstack_resolver=warn",
        1 => "flagstack=debug,flagstack_resolver=debug",
        _ => "flagstack=trace,flagstack_resolver=trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_stack(args: &StackArgs) -> Result<Stack, StackError> {
    match (&args.manifest, &args.catalog) {
        (Some(manifest), _) => Stack::load(manifest),
        (None, Some(catalog)) => Stack::from_parts(catalog, &args.layer),
        (None, None) => Stack::load(Path::new(DEFAULT_MANIFEST)),
    }
}

fn fail(err: StackError) -> ! {
    if let StackError::Flag(FlagError::ConstraintViolation(violations)) = &err {
        eprintln!("Constraint violations:");
        for violation in violations {
            eprintln!("  - {}", violation);
        }
    } else {
        eprintln!("Error: {}", err);
    }
    process::exit(err.exit_code());
}

fn run_resolve(args: StackArgs, format: OutputFormat, annotate: bool, output: Option<PathBuf>) {
    let stack = load_stack(&args).unwrap_or_else(|e| fail(e));
    let resolution = stack.resolve().unwrap_or_else(|e| fail(e));
    let validated = resolution
        .into_validated(stack.registry())
        .unwrap_or_else(|e| fail(e.into()));
    let rendered = emit(&validated, stack.registry(), format, annotate).unwrap_or_else(|e| fail(e));

    match output {
        Some(path) => {
            if let Err(e) = fs::write(&path, rendered) {
                fail(StackError::Io { path, source: e });
            }
        }
        None => print!("{}", rendered),
    }
}

fn run_validate(args: StackArgs, json: bool) {
    let stack = load_stack(&args).unwrap_or_else(|e| fail(e));
    let resolution = stack.resolve().unwrap_or_else(|e| fail(e));

    if json {
        let report = stack.report(&resolution).unwrap_or_else(|e| fail(e));
        match report.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => fail(StackError::Serialize(e.to_string())),
        }
    } else if resolution.is_valid() {
        println!(
            "Configuration valid: {} flags, {} layers",
            resolution.configuration.len(),
            stack.layers().len()
        );
    } else {
        println!("Configuration invalid:");
        for violation in &resolution.violations {
            println!("  - {}", violation);
        }
    }

    if resolution.is_valid() {
        process::exit(0);
    } else {
        process::exit(2);
    }
}

fn run_explain(args: StackArgs, human: bool) {
    let stack = load_stack(&args).unwrap_or_else(|e| fail(e));
    let resolution = stack.resolve().unwrap_or_else(|e| fail(e));
    let report = stack.report(&resolution).unwrap_or_else(|e| fail(e));

    if human {
        println!("{}", report.to_human());
    } else {
        match report.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => fail(StackError::Serialize(e.to_string())),
        }
    }
}

fn run_parse(path: &Path) {
    let text = fs::read_to_string(path).unwrap_or_else(|source| {
        fail(StackError::Io {
            path: path.to_path_buf(),
            source,
        })
    });
    let parsed = parse_layer_source(&text).unwrap_or_else(|source| {
        fail(StackError::Source {
            path: path.to_path_buf(),
            source,
        })
    });

    let assertions: Vec<_> = parsed.assertions().collect();
    let settings: Vec<_> = parsed.settings().collect();
    let document = serde_json::json!({
        "path": path.display().to_string(),
        "assertions": assertions,
        "settings": settings,
    });
    match serde_json::to_string_pretty(&document) {
        Ok(json) => println!("{}", json),
        Err(e) => fail(StackError::Serialize(e.to_string())),
    }
}
