// Command-line front end: read one scanned form and print its report as JSON.
//
// Stdout carries nothing but the report so the output can be piped straight
// into another program. Usage errors, missing files and logs go to stderr.

use clap::error::ErrorKind as ClapErrorKind;
use clap::{ArgAction, Parser};
use mark_sense::core_modules::preprocess::load_image;
use mark_sense::core_modules::utils::annotate::annotate;
use mark_sense::{DEFAULT_TEMPLATE_ID, FormPipeline, FormReport, FormTemplate, OmrResult};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mark_sense")]
#[command(about = "Read the filled-in bubbles of a scanned order form and print them as JSON")]
#[command(version)]
struct Cli {
    /// Path to the scanned form image.
    image: PathBuf,

    /// Built-in form template to read the scan with.
    #[arg(long, default_value = DEFAULT_TEMPLATE_ID)]
    template: String,

    /// JSON form template, used instead of the built-in one.
    #[arg(long, conflicts_with = "template")]
    template_file: Option<PathBuf>,

    /// Also write a PNG of the form with every analyzed region outlined.
    #[arg(long)]
    annotate: Option<PathBuf>,

    /// Print the report on a single line.
    #[arg(long)]
    compact: bool,

    /// Log progress to stderr (-v for info, -vv for debug).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            if error.print().is_err() {
                eprintln!("{error}");
            }
            return match error.kind() {
                ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(1),
            };
        }
    };

    init_tracing(cli.verbose);

    if !cli.image.exists() {
        eprintln!("Error: Image file not found: {}", cli.image.display());
        return ExitCode::from(1);
    }

    let pipeline = match load_template(&cli).and_then(FormPipeline::new) {
        Ok(pipeline) => pipeline,
        Err(error) => {
            eprintln!("Error: {error}");
            return ExitCode::from(1);
        }
    };

    let report = match load_image(&cli.image) {
        Ok(image) => {
            let summary = pipeline.process_image(&image);
            if let Some(overlay_path) = &cli.annotate {
                if let Err(error) = annotate::save(overlay_path, &image, &summary.marks) {
                    tracing::error!(%error, "could not write annotated form");
                }
            }
            FormReport::Processed(summary)
        }
        Err(error) => {
            tracing::warn!(%error, "form could not be read");
            FormReport::from_error(&error)
        }
    };

    let rendered = if cli.compact {
        report.to_json()
    } else {
        report.to_json_pretty()
    };
    match rendered {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("Error: could not serialize report: {error}");
            ExitCode::from(1)
        }
    }
}

fn load_template(cli: &Cli) -> OmrResult<FormTemplate> {
    match &cli.template_file {
        Some(path) => FormTemplate::from_json_file(path),
        None => FormTemplate::builtin(&cli.template),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}
