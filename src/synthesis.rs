//! Build a file laid out like a GFS Gaussian-grid history file from NASA
//! GEOS-CF output.
//!
//! The output takes its variable list from a GFS template and its grid from
//! the GEOS-CF file. Values are written in stages (see [`SynthesisStage`]):
//!
//! 1. every template variable is filled with the template's mean value,
//! 2. the fields listed in [`NAME_CORRESPONDENCE`] are copied from GEOS-CF,
//! 3. the 2-D `lon`/`lat` fields are expanded from the GEOS-CF 1-D coordinates,
//! 4. `phalf` is computed from the fixed GEOS L72 coefficients, and
//! 5. the requested tracers are copied from GEOS-CF, converted to ppm.
//!
//! Later stages overwrite earlier ones, so the order matters. Variables not
//! touched after stage 1 keep the placeholder mean.
use error_stack::ResultExt;
use indexmap::IndexMap;
use itertools::Itertools;
use ndarray::{Array1, ArrayD, Ix1, IxDyn};

use crate::{
    error::LbcError,
    grid::lon_lat_mesh,
    nc_utils::{
        add_numeric_variable, copy_variable, nan_mean, put_from_f64, read_global_int_attr,
        read_masked_f64, req_dim_len, req_var, writable_shape, NumericKind,
    },
    vertical::interface_pressures,
};

pub const SOURCE_LON: &str = "lon";
pub const SOURCE_LAT: &str = "lat";
pub const SOURCE_LEV: &str = "lev";

pub const DIM_X: &str = "grid_xt";
pub const DIM_Y: &str = "grid_yt";
pub const DIM_LAYER: &str = "pfull";
pub const DIM_INTERFACE: &str = "phalf";
pub const DIM_TIME: &str = "time";

/// Every dimension defined in the output file. Template variables may only use these.
pub const OUTPUT_DIMS: [&str; 5] = [DIM_X, DIM_Y, DIM_LAYER, DIM_INTERFACE, DIM_TIME];

/// Dimensions of each tracer variable added to the output.
pub const TRACER_DIMS: [&str; 4] = [DIM_TIME, DIM_LAYER, DIM_Y, DIM_X];

/// Output variables whose values come straight from a GEOS-CF variable,
/// as (output name, GEOS-CF name) pairs.
pub const NAME_CORRESPONDENCE: [(&str, &str); 6] = [
    ("grid_xt", "lon"),
    ("grid_yt", "lat"),
    ("pfull", "lev"),
    ("dpres", "DELP"),
    ("hgtsfc", "PHIS"),
    ("pressfc", "PS"),
];

/// Output variables that receive the 2-D longitude and latitude fields.
pub const MESH_LON: &str = "lon";
pub const MESH_LAT: &str = "lat";

/// Tracers copied when none are requested.
pub const DEFAULT_TRACERS: [&str; 1] = ["NO2"];

/// GEOS-CF tracers are mole fractions, the output expects ppm.
pub const PPM_PER_MOLE_FRACTION: f64 = 1_000_000.0;

/// Global attribute holding the number of tracers in the file.
pub const TRACER_COUNT_ATTR: &str = "ncnsto";

/// String global attributes written to every output file.
pub const FIXED_GLOBAL_ATTRIBUTES: [(&str, &str); 3] = [
    ("source", "FV3GFS"),
    ("grid", "gaussian"),
    ("hydrostatic", "non-hydrostatic"),
];

/// The stages that write data into the output file, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisStage {
    MeanFill,
    NameCorrespondence,
    LonLatMesh,
    InterfacePressure,
    Tracers,
}

impl SynthesisStage {
    pub const ORDER: [Self; 5] = [
        Self::MeanFill,
        Self::NameCorrespondence,
        Self::LonLatMesh,
        Self::InterfacePressure,
        Self::Tracers,
    ];
}

/// Horizontal and vertical sizes of the output grid, taken from the GEOS-CF file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridDims {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
}

impl GridDims {
    pub fn from_source(source: &netcdf::File) -> error_stack::Result<Self, LbcError> {
        Ok(Self {
            nx: req_dim_len(source, SOURCE_LON)?,
            ny: req_dim_len(source, SOURCE_LAT)?,
            nz: req_dim_len(source, SOURCE_LEV)?,
        })
    }

    /// Number of layer interfaces, always one more than the number of layers.
    pub fn n_interfaces(&self) -> usize {
        self.nz + 1
    }
}

/// Type and dimensions of one template variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableSpec {
    pub kind: NumericKind,
    pub dims: Vec<String>,
}

/// The variables of a template file, in file order.
#[derive(Debug, Clone, Default)]
pub struct VariableCatalog {
    variables: IndexMap<String, VariableSpec>,
}

impl VariableCatalog {
    pub fn from_file(file: &netcdf::File) -> error_stack::Result<Self, LbcError> {
        let mut variables = IndexMap::new();
        for var in file.variables() {
            let kind = NumericKind::of(&var)?;
            let dims = var.dimensions().iter().map(|d| d.name()).collect();
            variables.insert(var.name(), VariableSpec { kind, dims });
        }
        Ok(Self { variables })
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn contains(&self, varname: &str) -> bool {
        self.variables.contains_key(varname)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &VariableSpec)> {
        self.variables.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// A tracer to copy: the GEOS-CF variable name and the output variable name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracerSpec {
    pub source: String,
    pub output: String,
}

impl TracerSpec {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            output: source.to_lowercase(),
        }
    }
}

/// Build the tracer list, rejecting any output name that would collide
/// with a template variable or another tracer.
pub fn tracer_specs<S: AsRef<str>>(
    catalog: &VariableCatalog,
    tracers: &[S],
) -> error_stack::Result<Vec<TracerSpec>, LbcError> {
    let mut specs: Vec<TracerSpec> = vec![];
    for tracer in tracers {
        let spec = TracerSpec::new(tracer.as_ref());
        if catalog.contains(&spec.output) || specs.iter().any(|s| s.output == spec.output) {
            return Err(LbcError::duplicate_variable(&spec.output))
                .attach_printable_lazy(|| format!("from requested tracer '{}'", spec.source));
        }
        specs.push(spec);
    }
    Ok(specs)
}

/// What [`synthesize`] wrote.
#[derive(Debug, Clone)]
pub struct SynthesisSummary {
    pub dims: GridDims,
    pub n_template_vars: usize,
    pub tracer_vars: Vec<String>,
    /// Template variables with no valid values, left as netCDF fill.
    pub unfilled_vars: Vec<String>,
}

/// Populate `output` (a newly created, empty file) from the GEOS-CF file
/// `source` and the GFS file `template`, adding one variable per entry in
/// `tracers`.
///
/// All required source variables, template variables, and the template's
/// tracer count are checked before anything is written.
pub fn synthesize<S: AsRef<str>>(
    source: &netcdf::File,
    template: &netcdf::File,
    output: &mut netcdf::FileMut,
    tracers: &[S],
) -> error_stack::Result<SynthesisSummary, LbcError> {
    let dims = GridDims::from_source(source)?;
    let catalog =
        VariableCatalog::from_file(template).attach_printable("in the GFS template file")?;
    let tracer_specs = tracer_specs(&catalog, tracers)?;
    check_source_variables(source, &tracer_specs)?;
    check_template_variables(&catalog)?;
    let template_ntracer = read_global_int_attr(template, TRACER_COUNT_ATTR)?;

    log::info!(
        "Output grid is {} x {} with {} layers, {} template variables, tracers: {}",
        dims.nx,
        dims.ny,
        dims.nz,
        catalog.len(),
        tracer_specs.iter().map(|t| &t.output).join(", ")
    );

    define_dimensions(output, dims)?;
    declare_variables(output, &catalog, &tracer_specs)?;
    write_global_attributes(output, dims, template_ntracer, tracer_specs.len())?;

    let mut unfilled_vars = vec![];
    for stage in SynthesisStage::ORDER {
        log::debug!("Writing stage {stage:?}");
        match stage {
            SynthesisStage::MeanFill => {
                unfilled_vars = fill_template_means(template, output, &catalog)?;
            }
            SynthesisStage::NameCorrespondence => copy_corresponding_fields(source, output)?,
            SynthesisStage::LonLatMesh => write_lon_lat_mesh(source, output)?,
            SynthesisStage::InterfacePressure => write_interface_pressures(output)?,
            SynthesisStage::Tracers => write_tracers(source, output, &tracer_specs)?,
        }
    }

    Ok(SynthesisSummary {
        dims,
        n_template_vars: catalog.len(),
        tracer_vars: tracer_specs.into_iter().map(|t| t.output).collect(),
        unfilled_vars,
    })
}

fn check_source_variables(
    source: &netcdf::File,
    tracers: &[TracerSpec],
) -> error_stack::Result<(), LbcError> {
    let required = NAME_CORRESPONDENCE
        .iter()
        .map(|(_, src)| *src)
        .chain(tracers.iter().map(|t| t.source.as_str()));

    for varname in required {
        req_var(source, varname).attach_printable("in the GEOS-CF input file")?;
    }
    Ok(())
}

fn check_template_variables(catalog: &VariableCatalog) -> error_stack::Result<(), LbcError> {
    let required = NAME_CORRESPONDENCE
        .iter()
        .map(|(out, _)| *out)
        .chain([MESH_LON, MESH_LAT, DIM_INTERFACE]);

    for varname in required {
        if !catalog.contains(varname) {
            return Err(LbcError::missing_variable(varname))
                .attach_printable("in the GFS template file");
        }
    }

    for (varname, spec) in catalog.iter() {
        if let Some(dim) = spec.dims.iter().find(|d| !OUTPUT_DIMS.contains(&d.as_str())) {
            return Err(LbcError::missing_dimension(dim)).attach_printable_lazy(|| {
                format!("template variable '{varname}' uses a dimension not defined in the output")
            });
        }
    }
    Ok(())
}

fn define_dimensions(
    output: &mut netcdf::FileMut,
    dims: GridDims,
) -> error_stack::Result<(), LbcError> {
    let sizes = [
        (DIM_X, dims.nx),
        (DIM_Y, dims.ny),
        (DIM_LAYER, dims.nz),
        (DIM_INTERFACE, dims.n_interfaces()),
    ];

    for (name, len) in sizes {
        output
            .add_dimension(name, len)
            .change_context_lazy(|| LbcError::context(format!("creating dimension '{name}'")))?;
    }

    output
        .add_unlimited_dimension(DIM_TIME)
        .change_context_lazy(|| LbcError::context(format!("creating dimension '{DIM_TIME}'")))?;
    Ok(())
}

fn declare_variables(
    output: &mut netcdf::FileMut,
    catalog: &VariableCatalog,
    tracers: &[TracerSpec],
) -> error_stack::Result<(), LbcError> {
    for (varname, spec) in catalog.iter() {
        let dims: Vec<&str> = spec.dims.iter().map(|d| d.as_str()).collect();
        add_numeric_variable(output, varname, spec.kind, &dims)?;
    }

    for tracer in tracers {
        add_numeric_variable(output, &tracer.output, NumericKind::F32, &TRACER_DIMS)?;
    }
    Ok(())
}

fn write_global_attributes(
    output: &mut netcdf::FileMut,
    dims: GridDims,
    template_ntracer: i64,
    n_new_tracers: usize,
) -> error_stack::Result<(), LbcError> {
    let ncnsto = i32::try_from(template_ntracer + n_new_tracers as i64).map_err(|_| {
        LbcError::bad_attribute(TRACER_COUNT_ATTR, "tracer count does not fit in a 32-bit integer")
    })?;
    let im = i32::try_from(dims.nx)
        .map_err(|_| LbcError::context("grid x size does not fit in a 32-bit integer"))?;
    let jm = i32::try_from(dims.ny)
        .map_err(|_| LbcError::context("grid y size does not fit in a 32-bit integer"))?;

    for (name, value) in [(TRACER_COUNT_ATTR, ncnsto), ("im", im), ("jm", jm)] {
        output
            .add_attribute(name, value)
            .change_context_lazy(|| {
                LbcError::context(format!("writing global attribute '{name}'"))
            })?;
    }

    for (name, value) in FIXED_GLOBAL_ATTRIBUTES {
        output
            .add_attribute(name, value)
            .change_context_lazy(|| {
                LbcError::context(format!("writing global attribute '{name}'"))
            })?;
    }
    Ok(())
}

/// Fill every template variable with its mean over the template file.
/// Returns the names of variables that had no valid values to average.
fn fill_template_means(
    template: &netcdf::File,
    output: &mut netcdf::FileMut,
    catalog: &VariableCatalog,
) -> error_stack::Result<Vec<String>, LbcError> {
    let mut unfilled = vec![];
    for (varname, _) in catalog.iter() {
        let values = read_masked_f64(&req_var(template, varname)?)
            .change_context_lazy(|| LbcError::context("reading the template file"))?;

        let mean = if let Some(m) = nan_mean(values.view()) {
            m
        } else {
            log::warn!("Template variable {varname} has no valid values, leaving it unfilled");
            unfilled.push(varname.to_string());
            continue;
        };

        let shape = writable_shape(&req_var(output, varname)?);
        log::debug!("Filling {varname} with mean value {mean}, shape = {shape:?}");
        let filled = ArrayD::from_elem(IxDyn(&shape), mean);
        put_from_f64(output, varname, filled.view())?;
    }
    Ok(unfilled)
}

fn copy_corresponding_fields(
    source: &netcdf::File,
    output: &mut netcdf::FileMut,
) -> error_stack::Result<(), LbcError> {
    for (out_name, src_name) in NAME_CORRESPONDENCE {
        log::debug!("Copying {src_name} to {out_name}");
        copy_variable(&req_var(source, src_name)?, output, out_name)
            .attach_printable_lazy(|| format!("copying GEOS-CF '{src_name}' into '{out_name}'"))?;
    }
    Ok(())
}

fn read_coordinate(
    source: &netcdf::File,
    varname: &str,
) -> error_stack::Result<Array1<f64>, LbcError> {
    read_masked_f64(&req_var(source, varname)?)?
        .into_dimensionality::<Ix1>()
        .change_context_lazy(|| LbcError::context(format!("GEOS-CF '{varname}' must be 1-D")))
}

fn write_lon_lat_mesh(
    source: &netcdf::File,
    output: &mut netcdf::FileMut,
) -> error_stack::Result<(), LbcError> {
    let lon = read_coordinate(source, SOURCE_LON)?;
    let lat = read_coordinate(source, SOURCE_LAT)?;
    let (lons, lats) = lon_lat_mesh(lon.view(), lat.view());
    put_from_f64(output, MESH_LON, lons.into_dyn().view())?;
    put_from_f64(output, MESH_LAT, lats.into_dyn().view())?;
    Ok(())
}

fn write_interface_pressures(output: &mut netcdf::FileMut) -> error_stack::Result<(), LbcError> {
    let phalf = interface_pressures();
    put_from_f64(output, DIM_INTERFACE, phalf.into_dyn().view())
        .attach_printable("the GEOS L72 coefficients require the input to have 72 levels")
}

fn write_tracers(
    source: &netcdf::File,
    output: &mut netcdf::FileMut,
    tracers: &[TracerSpec],
) -> error_stack::Result<(), LbcError> {
    for tracer in tracers {
        log::info!("Adding tracer {} as {}", tracer.source, tracer.output);
        let mut values = read_masked_f64(&req_var(source, &tracer.source)?)?;
        values.mapv_inplace(|v| v * PPM_PER_MOLE_FRACTION);
        put_from_f64(output, &tracer.output, values.view())?;
    }
    Ok(())
}
