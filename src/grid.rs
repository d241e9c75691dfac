use ndarray::{Array2, ArrayView1};

/// Expand 1-D longitude and latitude vectors into 2-D fields.
///
/// Both outputs have shape `(lat.len(), lon.len())`: row `i` of the latitude
/// field is filled with `lat[i]` and column `j` of the longitude field is
/// filled with `lon[j]`.
pub fn lon_lat_mesh<T: Copy>(lon: ArrayView1<T>, lat: ArrayView1<T>) -> (Array2<T>, Array2<T>) {
    let shape = (lat.len(), lon.len());
    let lons = Array2::from_shape_fn(shape, |(_, j)| lon[j]);
    let lats = Array2::from_shape_fn(shape, |(i, _)| lat[i]);
    (lons, lats)
}
