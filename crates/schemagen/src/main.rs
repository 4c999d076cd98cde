use std::fs::File;
use std::io::{BufWriter, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::error::ErrorKind;
use clap::parser::ValueSource;
use clap::{Args, CommandFactory, FromArgMatches, Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use itertools::Itertools;
use mimalloc::MiMalloc;
use schemagen_extract::TypeScriptExtractor;
use schemagen_schemas::Manifest;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Exit status when at least one schema failed to generate.
const EXIT_JOB_FAILURES: u8 = 1;
/// Exit status for errors that stop the run before or outside any job.
const EXIT_FATAL: u8 = 2;

/// Compile TypeScript protocol declarations into JSON Schema documents.
///
/// Without a subcommand, runs `generate`.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,

    #[command(flatten)]
    generate: GenerateArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate every schema listed in the manifest
    ///
    /// Deletes and recreates the output directory, writes one document per
    /// job plus the index, and exits non-zero if any document failed.
    Generate(GenerateArgs),

    /// Print the raw schema of a single type
    ///
    /// The output is the extractor's view of the type: no callback
    /// redaction and no interchange metadata.
    Extract {
        /// TypeScript source file declaring or re-exporting the type
        file: Utf8PathBuf,

        /// Name of the exported type
        #[arg(value_name = "TYPE")]
        type_name: String,

        /// Output file path (writes to stdout if not specified)
        #[arg(short, long)]
        output: Option<Utf8PathBuf>,
    },

    /// Print the JSON Schema of the manifest format
    ManifestSchema,
}

/// Ids of the top-level [`GenerateArgs`], which only apply when no
/// subcommand is given.
const TOP_LEVEL_GENERATE_ARGS: &[&str] = &["manifest", "source_root", "out_dir"];

#[derive(Args)]
struct GenerateArgs {
    /// Path to the generation manifest
    #[arg(long, env = "SCHEMAGEN_MANIFEST", default_value = "schemagen.json")]
    manifest: Utf8PathBuf,

    /// Override the manifest's source root
    #[arg(long, env = "SCHEMAGEN_SOURCE_ROOT")]
    source_root: Option<Utf8PathBuf>,

    /// Override the manifest's output directory
    #[arg(long, env = "SCHEMAGEN_OUT_DIR")]
    out_dir: Option<Utf8PathBuf>,
}

/// Parses the command line, rejecting generate options given before a
/// subcommand. Global flags such as `-v` may appear on either side.
fn parse_cli() -> Cli {
    let mut command = Cli::command();
    let matches = command.get_matches_mut();
    if matches.subcommand_name().is_some() {
        let misplaced = TOP_LEVEL_GENERATE_ARGS.iter().find(|id| {
            matches.value_source(id) == Some(ValueSource::CommandLine)
        });
        if let Some(id) = misplaced {
            command
                .error(
                    ErrorKind::ArgumentConflict,
                    format!(
                        "`--{}` cannot be used before a subcommand",
                        id.replace('_', "-")
                    ),
                )
                .exit();
        }
    }
    Cli::from_arg_matches(&matches).unwrap_or_else(|err| err.exit())
}

fn main() -> ExitCode {
    let cli = parse_cli();

    // Initialize structured logging. Output goes to stderr so JSON output
    // on stdout remains clean for piping. Default to warn, allowlist our crates.
    const CRATES: &[&str] = &[
        "schemagen",
        "schemagen_compile",
        "schemagen_extract",
        "schemagen_schemas",
    ];
    let level = cli.verbose.tracing_level_filter();
    let allowlist = CRATES.iter().map(|c| format!("{c}={level}")).join(",");
    let filter = EnvFilter::new(format!("warn,{allowlist}"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    let command = cli.command.unwrap_or(Commands::Generate(cli.generate));
    match execute(command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn execute(command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Generate(args) => generate(args),
        Commands::Extract {
            file,
            type_name,
            output,
        } => {
            // Stdout must outlive the lock, so we bind it here first.
            let stdout = std::io::stdout();
            let mut writer: Box<dyn Write> = match output {
                Some(path) => Box::new(BufWriter::new(
                    File::create(&path)
                        .with_context(|| format!("failed to create {path}"))?,
                )),
                None => Box::new(stdout.lock()),
            };
            schemagen_extract::run(&file, &type_name, &mut *writer)?;
            writer.flush()?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::ManifestSchema => {
            let schema = schemars::schema_for!(Manifest);
            let mut stdout = std::io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &schema)?;
            writeln!(stdout)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn generate(args: GenerateArgs) -> Result<ExitCode> {
    let manifest_path = args.manifest;
    let mut manifest = Manifest::load(&manifest_path)?;
    if let Some(source_root) = args.source_root {
        manifest.source_root = source_root;
    }
    if let Some(out_dir) = args.out_dir {
        manifest.output_dir = out_dir;
    }
    debug!(manifest = %manifest_path, jobs = manifest.jobs.len(), "loaded manifest");

    println!("Generating JSON Schemas from {manifest_path}...\n");
    let report =
        schemagen_compile::run(&manifest, &mut TypeScriptExtractor::new())?;

    for output in &report.written {
        if *output == manifest.index.file {
            println!("  {output} (index)");
        } else {
            println!("  {output}");
        }
    }
    println!(
        "\n{}/{} schemas generated in {}/",
        report.succeeded,
        report.total,
        manifest.output_dir.as_str().trim_end_matches('/')
    );

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("{} schema(s) failed - see errors above", report.failed());
        Ok(ExitCode::from(EXIT_JOB_FAILURES))
    }
}
