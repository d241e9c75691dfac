//! Command line interface definitions
use std::path::PathBuf;

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use lbc_tools::synthesis::DEFAULT_TRACERS;

/// Create a netCDF file that looks like a GFS Gaussian grid netCDF history
/// file but contains data from a NASA GEOS-CF netCDF history file.
#[derive(Debug, Parser)]
pub(crate) struct Cli {
    /// Path to the input NASA GEOS-CF file
    #[clap(short, long)]
    pub(crate) inputfile: PathBuf,

    /// Path to the template GFS netCDF Gaussian grid file. Its variables,
    /// types, and dimensions are copied to the output.
    #[clap(short, long)]
    pub(crate) gfsfile: PathBuf,

    /// Path to write the output file to. Overwritten if it exists.
    #[clap(short, long)]
    pub(crate) outputfile: PathBuf,

    /// Tracers to copy from the GEOS-CF file. These must match the GEOS-CF
    /// variable names exactly; they are lower-cased in the output.
    #[clap(short, long, num_args = 1.., default_values_t = DEFAULT_TRACERS.map(String::from))]
    pub(crate) tracers: Vec<String>,

    #[command(flatten)]
    pub(crate) verbosity: Verbosity<InfoLevel>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_tracers() {
        let cli = Cli::try_parse_from(["nasa2gfs", "-i", "in.nc", "-g", "gfs.nc", "-o", "out.nc"])
            .unwrap();
        assert_eq!(cli.tracers, vec!["NO2"]);
        assert_eq!(cli.inputfile, PathBuf::from("in.nc"));
    }

    #[test]
    fn test_multiple_tracers() {
        let cli = Cli::try_parse_from([
            "nasa2gfs", "--inputfile", "in.nc", "--gfsfile", "gfs.nc", "--outputfile", "out.nc",
            "--tracers", "NO2", "CO", "O3",
        ])
        .unwrap();
        assert_eq!(cli.tracers, vec!["NO2", "CO", "O3"]);
    }

    #[test]
    fn test_required_args() {
        let err = Cli::try_parse_from(["nasa2gfs", "-i", "in.nc", "-o", "out.nc"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
