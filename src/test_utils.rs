//! Builders for the small netCDF files used by the unit tests.
use std::path::Path;

use ndarray::{Array, Array1, Array2, ArrayD, IxDyn};
use netcdf::AttributeValue;

use crate::nc_utils::full_extents;

pub(crate) const SRC_NX: usize = 4;
pub(crate) const SRC_NY: usize = 3;
pub(crate) const SRC_NZ: usize = crate::vertical::N_LAYERS;

pub(crate) const TMPL_NX: usize = 2;
pub(crate) const TMPL_NY: usize = 2;
pub(crate) const TMPL_NZ: usize = 3;
pub(crate) const TMPL_NCNSTO: i32 = 9;

pub(crate) const SRC_FILL: f32 = 1e15;
pub(crate) const TMPL_FILL: f32 = -999.0;

pub(crate) fn source_lon() -> Array1<f64> {
    Array1::from_shape_fn(SRC_NX, |j| -100.0 + 0.25 * j as f64)
}

pub(crate) fn source_lat() -> Array1<f64> {
    Array1::from_shape_fn(SRC_NY, |i| 20.0 + 0.5 * i as f64)
}

pub(crate) fn source_delp(k: usize, i: usize, j: usize) -> f32 {
    10.0 + k as f32 + 0.5 * i as f32 + 0.25 * j as f32
}

pub(crate) fn source_phis(i: usize, j: usize) -> f32 {
    100.0 * i as f32 + j as f32
}

pub(crate) fn source_ps(i: usize, j: usize) -> f32 {
    100_000.0 + 10.0 * i as f32 + j as f32
}

/// NO2 mole fraction; the first grid cell is a fill value.
pub(crate) fn source_no2(k: usize, i: usize, j: usize) -> f32 {
    if k == 0 && i == 0 && j == 0 {
        SRC_FILL
    } else {
        (1 + k + i + j) as f32 * 1e-9
    }
}

pub(crate) fn source_co(k: usize, _i: usize, _j: usize) -> f32 {
    (k + 1) as f32 * 1e-7
}

/// Values of the template `tmp` variable at level `k`, row `i`, column `j`.
/// One cell is the fill value.
pub(crate) fn template_tmp(k: usize, i: usize, j: usize) -> f32 {
    if k == 2 && i == 1 && j == 1 {
        TMPL_FILL
    } else {
        250.0 + 10.0 * k as f32
    }
}

fn put_all<T: netcdf::NcTypeDescriptor + Copy>(
    file: &mut netcdf::FileMut,
    varname: &str,
    values: ArrayD<T>,
) -> netcdf::Result<()> {
    let mut var = file
        .variable_mut(varname)
        .expect("test variable should have been defined");
    var.put(values.view(), full_extents(values.shape()))
}

fn field3d<F>(nz: usize, ny: usize, nx: usize, f: F) -> ArrayD<f32>
where
    F: Fn(usize, usize, usize) -> f32,
{
    Array::from_shape_fn(IxDyn(&[1, nz, ny, nx]), |idx| f(idx[1], idx[2], idx[3]))
}

fn field2d<F: Fn(usize, usize) -> f32>(ny: usize, nx: usize, f: F) -> ArrayD<f32> {
    Array::from_shape_fn(IxDyn(&[1, ny, nx]), |idx| f(idx[1], idx[2]))
}

/// Variations on the GEOS-CF file written by [`write_source_file_with`].
#[derive(Debug, Clone)]
pub(crate) struct SourceLayout {
    pub(crate) nz: usize,
    /// If false, `PS` has no time dimension.
    pub(crate) ps_has_time: bool,
}

impl Default for SourceLayout {
    fn default() -> Self {
        Self {
            nz: SRC_NZ,
            ps_has_time: true,
        }
    }
}

/// Write a GEOS-CF style chemistry file with one time record.
pub(crate) fn write_source_file(path: &Path) -> netcdf::Result<()> {
    write_source_file_with(path, &SourceLayout::default())
}

pub(crate) fn write_source_file_with(path: &Path, layout: &SourceLayout) -> netcdf::Result<()> {
    let nz = layout.nz;
    let mut file = netcdf::create(path)?;
    file.add_dimension("lon", SRC_NX)?;
    file.add_dimension("lat", SRC_NY)?;
    file.add_dimension("lev", nz)?;
    file.add_unlimited_dimension("time")?;

    file.add_variable::<f64>("lon", &["lon"])?;
    file.add_variable::<f64>("lat", &["lat"])?;
    file.add_variable::<f64>("lev", &["lev"])?;
    file.add_variable::<f32>("DELP", &["time", "lev", "lat", "lon"])?;
    file.add_variable::<f32>("PHIS", &["time", "lat", "lon"])?;
    if layout.ps_has_time {
        file.add_variable::<f32>("PS", &["time", "lat", "lon"])?;
    } else {
        file.add_variable::<f32>("PS", &["lat", "lon"])?;
    }
    file.add_variable::<f32>("NO2", &["time", "lev", "lat", "lon"])?
        .put_attribute("_FillValue", SRC_FILL)?;
    file.add_variable::<f32>("CO", &["time", "lev", "lat", "lon"])?;

    put_all(&mut file, "lon", source_lon().into_dyn())?;
    put_all(&mut file, "lat", source_lat().into_dyn())?;
    put_all(
        &mut file,
        "lev",
        Array1::from_shape_fn(nz, |k| (k + 1) as f64).into_dyn(),
    )?;
    put_all(&mut file, "DELP", field3d(nz, SRC_NY, SRC_NX, source_delp))?;
    put_all(&mut file, "PHIS", field2d(SRC_NY, SRC_NX, source_phis))?;
    if layout.ps_has_time {
        put_all(&mut file, "PS", field2d(SRC_NY, SRC_NX, source_ps))?;
    } else {
        let ps = Array2::from_shape_fn((SRC_NY, SRC_NX), |(i, j)| source_ps(i, j));
        put_all(&mut file, "PS", ps.into_dyn())?;
    }
    put_all(&mut file, "NO2", field3d(nz, SRC_NY, SRC_NX, source_no2))?;
    put_all(&mut file, "CO", field3d(nz, SRC_NY, SRC_NX, source_co))?;
    Ok(())
}

/// Variations on the GFS template written by [`write_template_file_with`].
#[derive(Debug, Clone)]
pub(crate) struct TemplateLayout {
    /// Value of the `ncnsto` global attribute, omitted if `None`.
    pub(crate) ncnsto: Option<AttributeValue>,
    /// Extra `(time, grid_yt, grid_xt)` float variable that is never written.
    pub(crate) all_missing_var: Option<&'static str>,
    /// Extra scalar string variable.
    pub(crate) string_var: Option<&'static str>,
}

impl Default for TemplateLayout {
    fn default() -> Self {
        Self {
            ncnsto: Some(AttributeValue::Int(TMPL_NCNSTO)),
            all_missing_var: None,
            string_var: None,
        }
    }
}

/// Write a small GFS history style template. Its grid sizes deliberately
/// differ from the source file's.
pub(crate) fn write_template_file(path: &Path) -> netcdf::Result<()> {
    write_template_file_with(path, &TemplateLayout::default())
}

pub(crate) fn write_template_file_with(path: &Path, layout: &TemplateLayout) -> netcdf::Result<()> {
    let mut file = netcdf::create(path)?;
    file.add_dimension("grid_xt", TMPL_NX)?;
    file.add_dimension("grid_yt", TMPL_NY)?;
    file.add_dimension("pfull", TMPL_NZ)?;
    file.add_dimension("phalf", TMPL_NZ + 1)?;
    file.add_unlimited_dimension("time")?;
    if let Some(ncnsto) = &layout.ncnsto {
        file.add_attribute("ncnsto", ncnsto.clone())?;
    }
    file.add_attribute("source", "FV3GFS")?;

    let d4 = ["time", "pfull", "grid_yt", "grid_xt"];
    let d3 = ["time", "grid_yt", "grid_xt"];
    file.add_variable::<f64>("time", &["time"])?;
    file.add_variable::<f64>("grid_xt", &["grid_xt"])?;
    file.add_variable::<f64>("grid_yt", &["grid_yt"])?;
    file.add_variable::<f32>("pfull", &["pfull"])?;
    file.add_variable::<f32>("phalf", &["phalf"])?;
    file.add_variable::<f64>("lon", &["grid_yt", "grid_xt"])?;
    file.add_variable::<f64>("lat", &["grid_yt", "grid_xt"])?;
    file.add_variable::<f32>("dpres", &d4)?;
    file.add_variable::<f32>("hgtsfc", &d3)?;
    file.add_variable::<f32>("pressfc", &d3)?;
    file.add_variable::<f32>("tmp", &d4)?
        .put_attribute("_FillValue", TMPL_FILL)?;
    file.add_variable::<i32>("land", &["grid_yt", "grid_xt"])?;
    file.add_variable::<i32>("ntrac", &[])?;
    if let Some(name) = layout.all_missing_var {
        file.add_variable::<f32>(name, &d3)?
            .put_attribute("_FillValue", TMPL_FILL)?;
    }
    if let Some(name) = layout.string_var {
        file.add_string_variable(name, &[])?;
    }

    put_all(&mut file, "time", ndarray::arr1(&[6.0]).into_dyn())?;
    put_all(&mut file, "grid_xt", ndarray::arr1(&[1.0, 2.0]).into_dyn())?;
    put_all(&mut file, "grid_yt", ndarray::arr1(&[3.0, 4.0]).into_dyn())?;
    put_all(&mut file, "pfull", ndarray::arr1(&[1.0f32, 2.0, 3.0]).into_dyn())?;
    put_all(&mut file, "phalf", ndarray::arr1(&[0.5f32, 1.5, 2.5, 3.5]).into_dyn())?;
    put_all(&mut file, "lon", ndarray::arr2(&[[1.0, 2.0], [1.0, 2.0]]).into_dyn())?;
    put_all(&mut file, "lat", ndarray::arr2(&[[3.0, 3.0], [4.0, 4.0]]).into_dyn())?;
    put_all(&mut file, "dpres", field3d(TMPL_NZ, TMPL_NY, TMPL_NX, |_, _, _| 5.0))?;
    put_all(&mut file, "hgtsfc", field2d(TMPL_NY, TMPL_NX, |i, j| (i + j) as f32))?;
    put_all(&mut file, "pressfc", field2d(TMPL_NY, TMPL_NX, |_, _| 98_000.0))?;
    put_all(&mut file, "tmp", field3d(TMPL_NZ, TMPL_NY, TMPL_NX, template_tmp))?;
    put_all(&mut file, "land", ndarray::arr2(&[[0, 1], [1, 1]]).into_dyn())?;
    put_all(&mut file, "ntrac", ndarray::arr0(7).into_dyn())?;
    Ok(())
}

/// Shape of every variable in the boundary files built by [`write_boundary_file`].
pub(crate) const BNDY_SHAPE: [usize; 3] = [2, 2, 3];

/// Write a boundary file with one `(lev, lat, lon)` float variable per
/// entry in `variables`, each filled with its constant value.
pub(crate) fn write_boundary_file(path: &Path, variables: &[(&str, f32)]) -> netcdf::Result<()> {
    let mut file = netcdf::create(path)?;
    file.add_dimension("lev", BNDY_SHAPE[0])?;
    file.add_dimension("lat", BNDY_SHAPE[1])?;
    file.add_dimension("lon", BNDY_SHAPE[2])?;

    for &(name, value) in variables {
        file.add_variable::<f32>(name, &["lev", "lat", "lon"])?;
        put_all(&mut file, name, ArrayD::from_elem(IxDyn(&BNDY_SHAPE), value))?;
    }
    Ok(())
}

/// Write a boundary file with one `(lev, lat, lon)` 64-bit integer variable
/// holding `values`, which must have `BNDY_SHAPE` elements.
pub(crate) fn write_i64_boundary_file(
    path: &Path,
    varname: &str,
    values: &[i64],
    fill: Option<i64>,
) -> netcdf::Result<()> {
    let mut file = netcdf::create(path)?;
    file.add_dimension("lev", BNDY_SHAPE[0])?;
    file.add_dimension("lat", BNDY_SHAPE[1])?;
    file.add_dimension("lon", BNDY_SHAPE[2])?;

    let mut var = file.add_variable::<i64>(varname, &["lev", "lat", "lon"])?;
    if let Some(fill) = fill {
        var.put_attribute("_FillValue", fill)?;
    }
    let values = ArrayD::from_shape_vec(IxDyn(&BNDY_SHAPE), values.to_vec())
        .expect("values must match the boundary file shape");
    put_all(&mut file, varname, values)
}
