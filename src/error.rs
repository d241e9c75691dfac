//! Common errors across the lbc-tools crate

/// Errors raised while reading, synthesizing, or replacing boundary file data.
#[derive(Debug, thiserror::Error)]
pub enum LbcError {
    /// Indicates a required dimension is missing from a netCDF file.
    #[error("Missing expected dimension: {0}")]
    MissingDimension(String),

    /// Indicates a required variable is missing from a netCDF file.
    #[error("Missing expected variable: {0}")]
    MissingVariable(String),

    /// Indicates a required global attribute is missing from a netCDF file.
    #[error("Missing expected attribute: {0}")]
    MissingAttribute(String),

    /// Indicates that an attribute exists but its value could not be interpreted.
    #[error("Attribute '{name}' has an unusable value: {reason}")]
    BadAttribute { name: String, reason: String },

    #[error("Variable '{0}' has a non-numeric type, which is not supported")]
    UnsupportedType(String),

    #[error("Variable '{varname}' has shape {expected:?}, cannot write data of shape {actual:?}")]
    ShapeMismatch {
        varname: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Variable '{0}' would be defined twice in the output file")]
    DuplicateVariable(String),

    #[error("Value {value} does not fit in the type of variable '{varname}'")]
    ValueOutOfRange { varname: String, value: f64 },

    /// Wrapper type used to add information to an inner error.
    #[error("{0}")]
    Context(String),
}

impl LbcError {
    pub fn missing_dimension<S: ToString>(dimname: S) -> Self {
        Self::MissingDimension(dimname.to_string())
    }

    pub fn missing_variable<S: ToString>(varname: S) -> Self {
        Self::MissingVariable(varname.to_string())
    }

    pub fn missing_attribute<S: ToString>(attname: S) -> Self {
        Self::MissingAttribute(attname.to_string())
    }

    pub fn bad_attribute<N: ToString, R: ToString>(name: N, reason: R) -> Self {
        Self::BadAttribute {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn unsupported_type<S: ToString>(varname: S) -> Self {
        Self::UnsupportedType(varname.to_string())
    }

    pub fn shape_mismatch<S: ToString>(varname: S, expected: &[usize], actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            varname: varname.to_string(),
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }

    pub fn duplicate_variable<S: ToString>(varname: S) -> Self {
        Self::DuplicateVariable(varname.to_string())
    }

    pub fn context<S: ToString>(ctx: S) -> Self {
        Self::Context(ctx.to_string())
    }
}
