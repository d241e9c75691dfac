//! Overwrite tracer fields in one boundary file with those from another.
//!
//! A source variable is selected if its name *contains* any of the requested
//! tokens, so "no2" selects "no2", "no2_A", and "hno2" alike. Selected
//! variables must exist in the target with a compatible shape.
use error_stack::ResultExt;

use crate::{
    error::LbcError,
    nc_utils::{copy_variable, req_var},
};

/// Tokens used when none are requested.
pub const DEFAULT_TOKENS: [&str; 1] = ["no2"];

/// Names from `source_names` that contain at least one of `tokens`.
///
/// The result is ordered by token first, then by position in `source_names`.
/// A name matching several tokens is listed once, at its first match.
pub fn matching_variables<N, T>(source_names: &[N], tokens: &[T]) -> Vec<String>
where
    N: AsRef<str>,
    T: AsRef<str>,
{
    let mut matches: Vec<String> = vec![];
    for token in tokens {
        for name in source_names {
            let name = name.as_ref();
            if name.contains(token.as_ref()) && !matches.iter().any(|m| m == name) {
                matches.push(name.to_string());
            }
        }
    }
    matches
}

/// The variables of `source` that [`replace_fields`] would copy.
pub fn planned_transfers<T: AsRef<str>>(source: &netcdf::File, tokens: &[T]) -> Vec<String> {
    let names: Vec<String> = source.variables().map(|v| v.name()).collect();
    matching_variables(&names, tokens)
}

/// The names in `planned` that have no variable in `target`.
pub fn missing_from_target<S: AsRef<str>>(target: &netcdf::File, planned: &[S]) -> Vec<String> {
    planned
        .iter()
        .map(|name| name.as_ref())
        .filter(|name| target.variable(name).is_none())
        .map(|name| name.to_string())
        .collect()
}

/// Copy every variable of `source` matching `tokens` over the same-named
/// variable in `target`. Returns the names of the variables copied.
///
/// Every matched variable must exist in `target`; this is checked before
/// anything is written. Target variables that do not match, or are not in
/// `source`, are left alone.
pub fn replace_fields<T: AsRef<str>>(
    target: &mut netcdf::FileMut,
    source: &netcdf::File,
    tokens: &[T],
) -> error_stack::Result<Vec<String>, LbcError> {
    let transfers = planned_transfers(source, tokens);
    if transfers.is_empty() {
        log::warn!("No variables in the input file matched the requested tracers");
    }

    if let Some(varname) = missing_from_target(target, &transfers).first() {
        return Err(LbcError::missing_variable(varname)).attach_printable_lazy(|| {
            format!("{varname} matched a requested tracer, so it must exist in the output file")
        });
    }

    for varname in transfers.iter() {
        log::info!("Transferring {varname}");
        let src = req_var(source, varname)?;
        copy_variable(&src, target, varname)
            .attach_printable_lazy(|| format!("copying input variable '{varname}'"))?;
    }

    Ok(transfers)
}
