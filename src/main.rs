//! `longan` -- consistency checker for extracted OOXML packages.
//!
//! Diagnostics go to stdout, logs to stderr. The exit status is 0 when no
//! ERROR was reported, 1 when at least one was, and 2 when the run itself
//! could not be carried out (bad arguments, unreadable package root).

use clap::{ArgAction, Parser, Subcommand};
use longan::audit::{AuditOptions, AuditReport, PackageAudit};
use longan::opc::infer_package_root;
use longan::report::{self, ReportFormat};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Check relationships, content types and themes of an extracted OOXML package
#[derive(Parser, Debug)]
#[command(name = "longan")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Full audit of a package: given parts plus theme discovery
    Check {
        /// Root directory of the extracted package
        root: PathBuf,

        /// `.rels` parts to validate
        #[arg(long = "rels", value_name = "FILE", num_args = 1..)]
        rels: Vec<PathBuf>,

        /// `[Content_Types].xml` part to validate
        #[arg(long, value_name = "FILE")]
        content_types: Option<PathBuf>,

        /// Skip theme discovery and cross-reference checks
        #[arg(long)]
        no_themes: bool,

        /// Validate parts one at a time
        #[arg(long)]
        sequential: bool,

        /// Treat Default extensions differing only in case as duplicates
        #[arg(long)]
        ignore_extension_case: bool,

        /// Also resolve TargetMode="External" targets on disk
        #[arg(long)]
        check_external: bool,

        #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
    },

    /// Validate `.rels` parts
    Rels {
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,

        /// Package root; inferred from the first file when omitted
        #[arg(long)]
        root: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
    },

    /// Validate a `[Content_Types].xml` part
    ContentTypes {
        file: PathBuf,

        /// Package root that PartName values resolve against
        #[arg(long)]
        root: PathBuf,

        /// Treat Default extensions differing only in case as duplicates
        #[arg(long)]
        ignore_extension_case: bool,

        #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
    },

    /// Theme discovery and cross-reference checks only
    Themes {
        root: PathBuf,

        #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
    },

    /// Print the extLst of every theme part and the variant manager
    Inspect { root: PathBuf },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "longan=warn",
        1 => "longan=info",
        _ => "longan=debug",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn audit(root: PathBuf, options: AuditOptions, format: ReportFormat) -> longan::Result<ExitCode> {
    let report: AuditReport = PackageAudit::new(root, options)?.run();
    print!("{}", report::render(&report, format)?);
    Ok(if report.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn run(command: Command) -> longan::Result<ExitCode> {
    match command {
        Command::Check {
            root,
            rels,
            content_types,
            no_themes,
            sequential,
            ignore_extension_case,
            check_external,
            format,
        } => {
            let options = AuditOptions {
                discover_themes: !no_themes,
                rels_parts: rels,
                content_types_part: content_types,
                parallel: !sequential,
                case_insensitive_extensions: ignore_extension_case,
                check_external_targets: check_external,
            };
            audit(root, options, format)
        },
        Command::Rels {
            files,
            root,
            format,
        } => {
            let root = match root {
                Some(root) => root,
                None => {
                    // clap guarantees at least one file
                    let inferred = files.first().map(|f| infer_package_root(f)).unwrap_or_default();
                    tracing::info!(root = %inferred.display(), "inferred package root");
                    inferred
                },
            };
            let options = AuditOptions {
                discover_themes: false,
                rels_parts: files,
                ..AuditOptions::default()
            };
            audit(root, options, format)
        },
        Command::ContentTypes {
            file,
            root,
            ignore_extension_case,
            format,
        } => {
            let options = AuditOptions {
                discover_themes: false,
                content_types_part: Some(file),
                case_insensitive_extensions: ignore_extension_case,
                ..AuditOptions::default()
            };
            audit(root, options, format)
        },
        Command::Themes { root, format } => audit(root, AuditOptions::default(), format),
        Command::Inspect { root } => {
            let inspection = PackageAudit::new(root, AuditOptions::default())?.inspect_themes();
            print!("{}", report::render_inspection(&inspection));
            Ok(ExitCode::SUCCESS)
        },
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::from(2)
        },
    }
}
