//! The GEOS 72-layer hybrid sigma-pressure vertical grid.
//!
//! GEOS-CF output carries the layer midpoints (`lev`) but not the interfaces,
//! which the GFS-style output needs as `phalf`. The interfaces are computed
//! from these fixed coefficient tables.
use ndarray::Array1;

/// Number of vertical layers in the GEOS L72 grid.
pub const N_LAYERS: usize = 72;

/// Surface pressure used to evaluate `AK + BK * p` for `phalf`.
pub const REFERENCE_SURFACE_PRESSURE: f64 = 1000.0;

/// Interface pressure coefficients, top of atmosphere first.
pub const AK: [f64; N_LAYERS + 1] = [
    1.0, 2.00000023841858, 3.27000045776367, 4.75850105285645,
    6.60000133514404, 8.93450164794922, 11.9703016281128, 15.9495029449463,
    21.1349029541016, 27.8526058197021, 36.5041084289551, 47.5806083679199,
    61.6779098510742, 79.5134124755859, 101.944023132324, 130.051025390625,
    165.079025268555, 208.497039794922, 262.021057128906, 327.64306640625,
    407.657104492188, 504.680114746094, 621.680114746094, 761.984191894531,
    929.294189453125, 1127.69018554688, 1364.34020996094, 1645.71032714844,
    1979.16040039062, 2373.04052734375, 2836.78051757812, 3381.00073242188,
    4017.541015625, 4764.39111328125, 5638.791015625, 6660.34130859375,
    7851.2314453125, 9236.572265625, 10866.3017578125, 12783.703125,
    15039.302734375, 17693.00390625, 20119.201171875, 21686.501953125,
    22436.30078125, 22389.80078125, 21877.59765625, 21214.998046875,
    20325.8984375, 19309.6953125, 18161.896484375, 16960.896484375,
    15625.99609375, 14290.9951171875, 12869.59375, 11895.8623046875,
    10918.1708984375, 9936.521484375, 8909.9921875, 7883.421875,
    7062.1982421875, 6436.263671875, 5805.3212890625, 5169.61083984375,
    4533.90087890625, 3898.20092773438, 3257.08081054688, 2609.20068359375,
    1961.310546875, 1313.48034667969, 659.375244140625, 4.80482578277588, 0.0,
];

/// Interface sigma coefficients, top of atmosphere first.
pub const BK: [f64; N_LAYERS + 1] = [
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
    0.0, 0.0, 0.0, 0.0, 0.0, 8.17541323527848e-09,
    0.00696002459153533, 0.0280100405216217, 0.0637200623750687,
    0.113602079451084, 0.156224086880684, 0.200350105762482,
    0.246741116046906, 0.294403105974197, 0.343381136655807,
    0.392891138792038, 0.44374018907547, 0.494590193033218,
    0.546304166316986, 0.581041514873505, 0.615818440914154,
    0.650634944438934, 0.685899913311005, 0.721165955066681,
    0.749378204345703, 0.770637512207031, 0.791946947574615,
    0.81330394744873, 0.834660947322845, 0.856018006801605,
    0.877429008483887, 0.898908019065857, 0.920387029647827,
    0.941865026950836, 0.963406026363373, 0.984951972961426, 1.0,
];

/// Compute the interface values `AK[i] + BK[i] * REFERENCE_SURFACE_PRESSURE`.
pub fn interface_pressures() -> Array1<f64> {
    AK.iter()
        .zip(BK.iter())
        .map(|(a, b)| a + b * REFERENCE_SURFACE_PRESSURE)
        .collect()
}
