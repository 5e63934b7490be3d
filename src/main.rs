use clap::Parser;
use std::path::PathBuf;

use factura::{
    configuration::RendererConfiguration,
    error::ContextError,
    form::{FormEvent, InvoiceDraft},
    renderer::{self, LogoOutcome},
};

/// Generates the PDF invoice described by a JSON draft.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct CliArguments {
    /// The JSON draft with the invoice number, date, billing details and items.
    #[arg(short = 'd', long = "draft", value_name = "json_file")]
    draft_path: PathBuf,
    /// The JSON configuration of the renderer.
    #[arg(short = 'c', long = "configuration", value_name = "json_file")]
    configuration_path: Option<PathBuf>,
    /// Overrides the output directory of the configuration.
    #[arg(short = 'o', long = "output-directory", value_name = "directory")]
    output_directory: Option<PathBuf>,
    /// Log everything, regardless of `RUST_LOG`.
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn main() {
    let arguments = CliArguments::parse();

    let mut logger_builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if arguments.verbose {
        logger_builder.filter_level(log::LevelFilter::Trace);
    }
    logger_builder.init();

    if let Err(error) = fallible_main(arguments) {
        log::error!("{}", error);
        std::process::exit(1);
    }
}

fn fallible_main(arguments: CliArguments) -> Result<(), ContextError> {
    log::debug!("{:?}", arguments);

    let mut configuration = match &arguments.configuration_path {
        Some(configuration_path) => RendererConfiguration::from_path(configuration_path)?,
        None => RendererConfiguration::default(),
    };
    if let Some(output_directory) = arguments.output_directory {
        configuration.output_directory = output_directory;
    }
    log::debug!("{:?}", configuration);

    let form = InvoiceDraft::from_path(&arguments.draft_path)?.into_form();
    let (form, invoice) = form.submit()?;
    let render_result = renderer::generate_pdf(&invoice, &configuration);
    let form = form.apply(FormEvent::GenerationFinished);
    log::trace!("{:?}", form);

    let report = render_result?;
    if let LogoOutcome::Skipped(reason) = &report.logo {
        log::warn!("The invoice was generated without the logo: {}", reason);
    }
    log::info!(
        "Generated the invoice {:?} with a total of {:.2}€",
        report.file_name,
        invoice.total
    );

    Ok(())
}
