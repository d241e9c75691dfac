use std::{path::Path, process::ExitCode};

use clap::Parser;
use error_stack::ResultExt;
use lbc_tools::{logging::init_logging, synthesis};

mod cli;

fn main() -> ExitCode {
    let clargs = cli::Cli::parse();
    init_logging(clargs.verbosity.log_level_filter());
    if let Err(e) = driver(clargs) {
        eprintln!("ERROR: {e:?}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn driver(clargs: cli::Cli) -> error_stack::Result<(), CliError> {
    check_output_path(&clargs.outputfile)?;

    let source = netcdf::open(&clargs.inputfile).change_context_lazy(|| {
        CliError::context(format!(
            "Error opening GEOS-CF file {}",
            clargs.inputfile.display()
        ))
    })?;
    let template = netcdf::open(&clargs.gfsfile).change_context_lazy(|| {
        CliError::context(format!(
            "Error opening GFS template file {}",
            clargs.gfsfile.display()
        ))
    })?;

    log::info!("Writing {}", clargs.outputfile.display());
    let mut output = netcdf::create(&clargs.outputfile).change_context_lazy(|| {
        CliError::context(format!(
            "Error creating output file {}",
            clargs.outputfile.display()
        ))
    })?;

    let summary = synthesis::synthesize(&source, &template, &mut output, &clargs.tracers)
        .change_context_lazy(|| {
            CliError::context(format!(
                "Error building {} from {} and {}",
                clargs.outputfile.display(),
                clargs.inputfile.display(),
                clargs.gfsfile.display()
            ))
        })?;

    if !summary.unfilled_vars.is_empty() {
        log::warn!(
            "{} template variable(s) had no valid data and were left as fill values",
            summary.unfilled_vars.len()
        );
    }
    log::info!(
        "Wrote {} template variables and {} tracer(s) to {}",
        summary.n_template_vars,
        summary.tracer_vars.len(),
        clargs.outputfile.display()
    );
    Ok(())
}

/// Give a clearer message than netCDF would for an output path that cannot be created.
fn check_output_path(out_file: &Path) -> error_stack::Result<(), CliError> {
    if out_file.is_dir() {
        return Err(CliError::UserError(format!(
            "--outputfile must be a file path, {} is a directory",
            out_file.display()
        ))
        .into());
    }

    // "out.nc" has a parent of "", meaning the current directory
    if let Some(parent) = out_file.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(CliError::UserError(format!(
                "The directory for --outputfile ({}) does not exist",
                parent.display()
            ))
            .into());
        }
    }

    Ok(())
}

/// Program error type
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}")]
    UserError(String),

    /// Wrapper type used to add information to an inner error.
    #[error("{0}")]
    Context(String),
}

impl CliError {
    fn context<S: ToString>(ctx: S) -> Self {
        Self::Context(ctx.to_string())
    }
}
