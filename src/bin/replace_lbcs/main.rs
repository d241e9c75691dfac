use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use error_stack::ResultExt;
use lbc_tools::{
    logging::init_logging,
    replace::{missing_from_target, planned_transfers, replace_fields, DEFAULT_TOKENS},
};

fn main() -> ExitCode {
    let clargs = Cli::parse();
    init_logging(clargs.verbosity.log_level_filter());
    if let Err(e) = driver(clargs) {
        eprintln!("ERROR: {e:?}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn driver(clargs: Cli) -> error_stack::Result<(), CliError> {
    let source = netcdf::open(&clargs.inputfile).change_context_lazy(|| {
        CliError::context(format!(
            "Error opening input file {}",
            clargs.inputfile.display()
        ))
    })?;

    if clargs.dry_run {
        return dry_run(&clargs, &source);
    }

    let mut target = netcdf::append(&clargs.outputfile).change_context_lazy(|| {
        CliError::context(format!(
            "Error opening {} for modification",
            clargs.outputfile.display()
        ))
    })?;

    let transferred =
        replace_fields(&mut target, &source, &clargs.tracers).change_context_lazy(|| {
            CliError::context(format!(
                "Error replacing fields in {} with those from {}",
                clargs.outputfile.display(),
                clargs.inputfile.display()
            ))
        })?;

    log::info!(
        "Replaced {} variable(s) in {}",
        transferred.len(),
        clargs.outputfile.display()
    );
    Ok(())
}

/// List the planned transfers without modifying the output file. Fails if a
/// planned variable is missing from the output file, as a real run would.
fn dry_run(clargs: &Cli, source: &netcdf::File) -> error_stack::Result<(), CliError> {
    let target = netcdf::open(&clargs.outputfile).change_context_lazy(|| {
        CliError::context(format!(
            "Error opening output file {}",
            clargs.outputfile.display()
        ))
    })?;

    let transfers = planned_transfers(source, &clargs.tracers);
    if transfers.is_empty() {
        println!(
            "No variables in {} match the requested tracers",
            clargs.inputfile.display()
        );
    }
    for varname in transfers.iter() {
        println!("Would transfer {varname}");
    }

    let missing = missing_from_target(&target, &transfers);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(CliError::UserError(format!(
            "{} is missing variable(s) that would be transferred: {}",
            clargs.outputfile.display(),
            missing.join(", ")
        ))
        .into())
    }
}

/// Replace fields in a GFS boundary file with those of another GFS
/// boundary file of the same dimensions.
#[derive(Debug, clap::Parser)]
struct Cli {
    /// Path to the netCDF file to take fields from
    #[clap(short, long)]
    inputfile: PathBuf,

    /// Path to the netCDF file to modify in place
    #[clap(short, long)]
    outputfile: PathBuf,

    /// Tracers to copy. Every input variable whose name contains one of
    /// these strings is copied, so a short string may match several variables.
    #[clap(short, long, num_args = 1.., default_values_t = DEFAULT_TOKENS.map(String::from))]
    tracers: Vec<String>,

    /// Only list the variables that would be copied, do not modify --outputfile.
    #[clap(long)]
    dry_run: bool,

    #[command(flatten)]
    verbosity: Verbosity<InfoLevel>,
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
