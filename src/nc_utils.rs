//! Helpers for moving numeric data between netCDF variables of arbitrary type.
//!
//! Both tools copy values between variables whose on-disk types are only
//! known at run time. Values are carried as `f64` with missing entries set
//! to NaN, and converted back to the destination variable's type on write,
//! where NaNs become that variable's fill value. Reads unpack values with
//! `scale_factor`/`add_offset` and mask values outside `valid_min`,
//! `valid_max` or `valid_range`; writes pack them again.
//!
//! [`copy_variable`] skips the `f64` step when source and destination store
//! the same type with the same packing, so 64-bit integers copy exactly.
//! [`NumericKind`] and [`NumericVisitor`] do the dispatch from a runtime
//! netCDF type to a concrete Rust type.
use std::fmt::Debug;

use error_stack::ResultExt;
use ndarray::{ArrayD, ArrayViewD};
use netcdf::{
    types::{FloatType, IntType, NcVariableType},
    AttributeValue, Extent, Extents, NcTypeDescriptor,
};
use num_traits::{NumCast, ToPrimitive};

use crate::error::LbcError;

/// A numeric type that can be stored in a netCDF variable.
pub trait NcNumeric: NcTypeDescriptor + NumCast + Copy + PartialEq + Debug {
    /// The fill value netCDF uses for this type when a variable does not define `_FillValue`.
    const NC_DEFAULT_FILL: Self;
}

impl NcNumeric for i8 {
    const NC_DEFAULT_FILL: Self = -127;
}

impl NcNumeric for i16 {
    const NC_DEFAULT_FILL: Self = -32767;
}

impl NcNumeric for i32 {
    const NC_DEFAULT_FILL: Self = -2147483647;
}

impl NcNumeric for i64 {
    const NC_DEFAULT_FILL: Self = -9223372036854775806;
}

impl NcNumeric for u8 {
    const NC_DEFAULT_FILL: Self = 255;
}

impl NcNumeric for u16 {
    const NC_DEFAULT_FILL: Self = 65535;
}

impl NcNumeric for u32 {
    const NC_DEFAULT_FILL: Self = 4294967295;
}

impl NcNumeric for u64 {
    const NC_DEFAULT_FILL: Self = 18446744073709551614;
}

impl NcNumeric for f32 {
    const NC_DEFAULT_FILL: Self = 9.969_209_968_386_869e36;
}

impl NcNumeric for f64 {
    const NC_DEFAULT_FILL: Self = 9.969_209_968_386_869e36;
}

/// The numeric netCDF types this crate can read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericKind {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

/// Something generic over the concrete type behind a [`NumericKind`].
///
/// Implement this and pass it to [`NumericKind::accept`] to call
/// `visit::<T>` with `T` matching the runtime type.
pub trait NumericVisitor {
    type Output;

    fn visit<T: NcNumeric>(self) -> Self::Output;
}

impl NumericKind {
    /// Map a netCDF variable type to its numeric kind. Returns `None` for
    /// characters, strings, and user-defined types.
    pub fn from_vartype(vartype: &NcVariableType) -> Option<Self> {
        match vartype {
            NcVariableType::Int(IntType::I8) => Some(Self::I8),
            NcVariableType::Int(IntType::I16) => Some(Self::I16),
            NcVariableType::Int(IntType::I32) => Some(Self::I32),
            NcVariableType::Int(IntType::I64) => Some(Self::I64),
            NcVariableType::Int(IntType::U8) => Some(Self::U8),
            NcVariableType::Int(IntType::U16) => Some(Self::U16),
            NcVariableType::Int(IntType::U32) => Some(Self::U32),
            NcVariableType::Int(IntType::U64) => Some(Self::U64),
            NcVariableType::Float(FloatType::F32) => Some(Self::F32),
            NcVariableType::Float(FloatType::F64) => Some(Self::F64),
            _ => None,
        }
    }

    /// Get the numeric kind of a variable, or an error if it is not numeric.
    pub fn of(var: &netcdf::Variable) -> error_stack::Result<Self, LbcError> {
        Self::from_vartype(&var.vartype())
            .ok_or_else(|| LbcError::unsupported_type(var.name()).into())
    }

    pub fn accept<V: NumericVisitor>(self, visitor: V) -> V::Output {
        match self {
            NumericKind::I8 => visitor.visit::<i8>(),
            NumericKind::I16 => visitor.visit::<i16>(),
            NumericKind::I32 => visitor.visit::<i32>(),
            NumericKind::I64 => visitor.visit::<i64>(),
            NumericKind::U8 => visitor.visit::<u8>(),
            NumericKind::U16 => visitor.visit::<u16>(),
            NumericKind::U32 => visitor.visit::<u32>(),
            NumericKind::U64 => visitor.visit::<u64>(),
            NumericKind::F32 => visitor.visit::<f32>(),
            NumericKind::F64 => visitor.visit::<f64>(),
        }
    }

    pub fn is_integer(self) -> bool {
        !matches!(self, NumericKind::F32 | NumericKind::F64)
    }

    /// netCDF does not treat the default fill as missing for single byte types.
    fn masks_default_fill(self) -> bool {
        !matches!(self, NumericKind::I8 | NumericKind::U8)
    }
}

/// The set of values that mark an entry of a variable as missing.
///
/// NaN is always considered missing, in addition to any explicit values.
#[derive(Debug, Clone, PartialEq)]
pub struct MissingValues<T> {
    values: Vec<T>,
}

impl<T: NcNumeric> MissingValues<T> {
    #[cfg(test)]
    pub(crate) fn new(values: Vec<T>) -> Self {
        Self { values }
    }

    /// Collect the missing values for `var` from its `_FillValue` and
    /// `missing_value` attributes. If `_FillValue` is absent, the netCDF
    /// default fill for the type is used instead (except for byte types).
    pub fn for_variable(var: &netcdf::Variable) -> error_stack::Result<Self, LbcError> {
        let kind = NumericKind::of(var)?;
        let mut values = vec![];

        if let Some(fill) = var_attr_numbers::<T>(var, "_FillValue")? {
            values.extend(fill);
        } else if kind.masks_default_fill() {
            values.push(T::NC_DEFAULT_FILL);
        }

        if let Some(missing) = var_attr_numbers::<T>(var, "missing_value")? {
            values.extend(missing);
        }

        Ok(Self { values })
    }

    pub fn is_missing(&self, value: T) -> bool {
        // NaN is the only value not equal to itself
        #[allow(clippy::eq_op)]
        let is_nan = value != value;
        is_nan || self.values.contains(&value)
    }
}

/// Limits from the `valid_range`, or `valid_min` and `valid_max`, attributes.
/// Raw (packed) values outside them are treated as missing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ValidRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl ValidRange {
    /// `valid_range` takes precedence over `valid_min` and `valid_max`.
    pub fn for_variable(var: &netcdf::Variable) -> error_stack::Result<Self, LbcError> {
        if let Some(range) = var_attr_numbers::<f64>(var, "valid_range")? {
            return match range.as_slice() {
                &[min, max] => Ok(Self {
                    min: Some(min),
                    max: Some(max),
                }),
                _ => Err(LbcError::bad_attribute("valid_range", "expected two values").into()),
            };
        }

        Ok(Self {
            min: var_attr_scalar(var, "valid_min")?,
            max: var_attr_scalar(var, "valid_max")?,
        })
    }

    pub fn contains(&self, raw: f64) -> bool {
        self.min.map_or(true, |min| raw >= min) && self.max.map_or(true, |max| raw <= max)
    }
}

/// Linear packing from the `scale_factor` and `add_offset` attributes:
/// `unpacked = raw * scale_factor + add_offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Packing {
    pub scale_factor: f64,
    pub add_offset: f64,
}

impl Packing {
    /// Returns `None` if the variable has neither attribute.
    pub fn for_variable(var: &netcdf::Variable) -> error_stack::Result<Option<Self>, LbcError> {
        let scale_factor = var_attr_scalar(var, "scale_factor")?;
        let add_offset = var_attr_scalar(var, "add_offset")?;
        if scale_factor.is_none() && add_offset.is_none() {
            return Ok(None);
        }

        let scale_factor = scale_factor.unwrap_or(1.0);
        if scale_factor == 0.0 {
            return Err(LbcError::bad_attribute("scale_factor", "must not be zero").into());
        }
        Ok(Some(Self {
            scale_factor,
            add_offset: add_offset.unwrap_or(0.0),
        }))
    }

    pub fn unpack(&self, raw: f64) -> f64 {
        raw * self.scale_factor + self.add_offset
    }

    pub fn pack(&self, value: f64) -> f64 {
        (value - self.add_offset) / self.scale_factor
    }
}

/// Convert a numeric attribute value into a list of `T`. Elements that cannot be
/// represented as `T` are dropped. Returns `None` for string attributes.
pub fn attr_numbers<T: NumCast>(value: &AttributeValue) -> Option<Vec<T>> {
    fn cast_all<T: NumCast, U: ToPrimitive + Copy>(values: &[U]) -> Vec<T> {
        values.iter().filter_map(|&v| T::from(v)).collect()
    }

    let numbers = match value {
        AttributeValue::Uchar(v) => cast_all(&[*v]),
        AttributeValue::Uchars(v) => cast_all(v),
        AttributeValue::Schar(v) => cast_all(&[*v]),
        AttributeValue::Schars(v) => cast_all(v),
        AttributeValue::Ushort(v) => cast_all(&[*v]),
        AttributeValue::Ushorts(v) => cast_all(v),
        AttributeValue::Short(v) => cast_all(&[*v]),
        AttributeValue::Shorts(v) => cast_all(v),
        AttributeValue::Uint(v) => cast_all(&[*v]),
        AttributeValue::Uints(v) => cast_all(v),
        AttributeValue::Int(v) => cast_all(&[*v]),
        AttributeValue::Ints(v) => cast_all(v),
        AttributeValue::Ulonglong(v) => cast_all(&[*v]),
        AttributeValue::Ulonglongs(v) => cast_all(v),
        AttributeValue::Longlong(v) => cast_all(&[*v]),
        AttributeValue::Longlongs(v) => cast_all(v),
        AttributeValue::Float(v) => cast_all(&[*v]),
        AttributeValue::Floats(v) => cast_all(v),
        AttributeValue::Double(v) => cast_all(&[*v]),
        AttributeValue::Doubles(v) => cast_all(v),
        _ => return None,
    };
    Some(numbers)
}

fn var_attr_numbers<T: NumCast>(
    var: &netcdf::Variable,
    attname: &str,
) -> error_stack::Result<Option<Vec<T>>, LbcError> {
    let attr = if let Some(attr) = var.attribute(attname) {
        attr
    } else {
        return Ok(None);
    };

    let value = attr.value().change_context_lazy(|| {
        LbcError::context(format!(
            "reading attribute '{attname}' of variable '{}'",
            var.name()
        ))
    })?;

    let numbers = attr_numbers(&value)
        .ok_or_else(|| LbcError::bad_attribute(attname, "expected a numeric value"))?;
    Ok(Some(numbers))
}

fn var_attr_scalar(
    var: &netcdf::Variable,
    attname: &str,
) -> error_stack::Result<Option<f64>, LbcError> {
    match var_attr_numbers::<f64>(var, attname)? {
        None => Ok(None),
        Some(values) => match values.as_slice() {
            &[v] => Ok(Some(v)),
            _ => Err(LbcError::bad_attribute(attname, "expected a single value").into()),
        },
    }
}

/// The fill value written for missing entries of `var`.
fn fill_or_default<T: NcNumeric>(var: &netcdf::Variable) -> error_stack::Result<T, LbcError> {
    let fill = var.fill_value::<T>().change_context_lazy(|| {
        LbcError::context(format!("reading fill value of variable '{}'", var.name()))
    })?;
    Ok(fill.unwrap_or(T::NC_DEFAULT_FILL))
}

/// Read a global attribute that must hold a single integer.
pub fn read_global_int_attr(
    file: &netcdf::File,
    attname: &str,
) -> error_stack::Result<i64, LbcError> {
    let value = file
        .attribute(attname)
        .ok_or_else(|| LbcError::missing_attribute(attname))?
        .value()
        .change_context_lazy(|| {
            LbcError::context(format!("reading global attribute '{attname}'"))
        })?;

    match attr_numbers::<i64>(&value).as_deref() {
        Some([v]) => Ok(*v),
        _ => Err(LbcError::bad_attribute(attname, "expected a single integer").into()),
    }
}

/// Get the length of a dimension that must exist in `file`.
pub fn req_dim_len(file: &netcdf::File, dimname: &str) -> error_stack::Result<usize, LbcError> {
    file.dimension(dimname)
        .map(|dim| dim.len())
        .ok_or_else(|| LbcError::missing_dimension(dimname).into())
}

/// Get a variable that must exist in `file`.
pub fn req_var<'f>(
    file: &'f netcdf::File,
    varname: &str,
) -> error_stack::Result<netcdf::Variable<'f>, LbcError> {
    file.variable(varname)
        .ok_or_else(|| LbcError::missing_variable(varname).into())
}

/// The shape to use when writing a whole variable.
///
/// This is the current shape, except that an unlimited leading dimension
/// with no records yet is counted as one record.
pub fn writable_shape(var: &netcdf::Variable) -> Vec<usize> {
    var.dimensions()
        .iter()
        .enumerate()
        .map(|(idim, dim)| {
            if idim == 0 && dim.is_unlimited() && dim.len() == 0 {
                1
            } else {
                dim.len()
            }
        })
        .collect()
}

/// Check that an array with shape `data_shape` can be written over the whole
/// of `var`. Unlimited dimensions may have any length; all others must match.
pub fn check_write_shape(
    var: &netcdf::Variable,
    data_shape: &[usize],
) -> error_stack::Result<(), LbcError> {
    let dims = var.dimensions();
    let var_shape: Vec<usize> = dims.iter().map(|d| d.len()).collect();
    let mismatch = || LbcError::shape_mismatch(var.name(), &var_shape, data_shape);

    if dims.len() != data_shape.len() {
        return Err(mismatch().into());
    }

    for (dim, &n) in dims.iter().zip(data_shape) {
        if !dim.is_unlimited() && dim.len() != n {
            return Err(mismatch().into());
        }
    }

    Ok(())
}

/// Extents covering an array of the given shape, starting from the origin.
/// Unlike `Extents::All`, this lets a write extend an unlimited dimension.
pub fn full_extents(shape: &[usize]) -> Extents {
    if shape.is_empty() {
        // scalar variable
        return Extents::All;
    }

    let extents = shape
        .iter()
        .map(|&count| Extent::SliceCount {
            start: 0,
            count,
            stride: 1,
        })
        .collect();
    Extents::Extent(extents)
}

/// Read a whole numeric variable as unpacked `f64`, with missing entries set to NaN.
pub fn read_masked_f64(var: &netcdf::Variable) -> error_stack::Result<ArrayD<f64>, LbcError> {
    let kind = NumericKind::of(var)?;
    kind.accept(ReadMasked { var })
}

struct ReadMasked<'a, 'f> {
    var: &'a netcdf::Variable<'f>,
}

impl NumericVisitor for ReadMasked<'_, '_> {
    type Output = error_stack::Result<ArrayD<f64>, LbcError>;

    fn visit<T: NcNumeric>(self) -> Self::Output {
        let missing = MissingValues::<T>::for_variable(self.var)?;
        let valid = ValidRange::for_variable(self.var)?;
        let packing = Packing::for_variable(self.var)?;
        let values = self.var.get::<T, _>(Extents::All).change_context_lazy(|| {
            LbcError::context(format!("reading variable '{}'", self.var.name()))
        })?;

        Ok(values.mapv(|v| match v.to_f64() {
            Some(raw) if !missing.is_missing(v) && valid.contains(raw) => {
                packing.map_or(raw, |p| p.unpack(raw))
            }
            _ => f64::NAN,
        }))
    }
}

/// Overwrite the whole of variable `varname` in `file` with `values`.
///
/// Values are packed if the variable has `scale_factor` or `add_offset`
/// (packed values are rounded for integer variables), then converted to the
/// variable's type (float to integer truncates toward zero). NaNs are
/// written as the variable's fill value.
pub fn put_from_f64(
    file: &mut netcdf::FileMut,
    varname: &str,
    values: ArrayViewD<f64>,
) -> error_stack::Result<(), LbcError> {
    let (kind, packing) = {
        let var = req_var(file, varname)?;
        check_write_shape(&var, values.shape())?;
        (NumericKind::of(&var)?, Packing::for_variable(&var)?)
    };

    kind.accept(PutFromF64 {
        file,
        varname,
        values,
        packing,
        round: kind.is_integer(),
    })
}

struct PutFromF64<'a> {
    file: &'a mut netcdf::FileMut,
    varname: &'a str,
    values: ArrayViewD<'a, f64>,
    packing: Option<Packing>,
    round: bool,
}

impl NumericVisitor for PutFromF64<'_> {
    type Output = error_stack::Result<(), LbcError>;

    fn visit<T: NcNumeric>(self) -> Self::Output {
        let varname = self.varname;
        let mut var = self
            .file
            .variable_mut(varname)
            .ok_or_else(|| LbcError::missing_variable(varname))?;

        let fill = fill_or_default::<T>(&var)?;

        let mut converted = ArrayD::from_elem(self.values.raw_dim(), fill);
        for (out, &v) in converted.iter_mut().zip(self.values.iter()) {
            if v.is_nan() {
                continue;
            }
            let v = match self.packing {
                Some(p) if self.round => p.pack(v).round(),
                Some(p) => p.pack(v),
                None => v,
            };
            *out = <T as NumCast>::from(v).ok_or_else(|| LbcError::ValueOutOfRange {
                varname: varname.to_string(),
                value: v,
            })?;
        }

        var.put(converted.view(), full_extents(self.values.shape()))
            .change_context_lazy(|| {
                LbcError::context(format!("writing values to variable '{varname}'"))
            })
    }
}

/// Overwrite the whole of variable `varname` in `target` with the values of `src`.
///
/// When both variables store the same type with the same packing, values
/// are copied as-is, with entries that are missing in `src` replaced by the
/// target's fill value. Otherwise this goes through [`read_masked_f64`] and
/// [`put_from_f64`].
pub fn copy_variable(
    src: &netcdf::Variable,
    target: &mut netcdf::FileMut,
    varname: &str,
) -> error_stack::Result<(), LbcError> {
    let src_kind = NumericKind::of(src)?;
    let src_shape: Vec<usize> = src.dimensions().iter().map(|d| d.len()).collect();
    let (dst_kind, dst_packing) = {
        let var = req_var(target, varname)?;
        check_write_shape(&var, &src_shape)?;
        (NumericKind::of(&var)?, Packing::for_variable(&var)?)
    };

    if src_kind == dst_kind && Packing::for_variable(src)? == dst_packing {
        src_kind.accept(CopySameType {
            src,
            file: target,
            varname,
        })
    } else {
        log::debug!("Converting {varname} from {src_kind:?} to {dst_kind:?}");
        let values = read_masked_f64(src)?;
        put_from_f64(target, varname, values.view())
    }
}

struct CopySameType<'a, 'f> {
    src: &'a netcdf::Variable<'f>,
    file: &'a mut netcdf::FileMut,
    varname: &'a str,
}

impl NumericVisitor for CopySameType<'_, '_> {
    type Output = error_stack::Result<(), LbcError>;

    fn visit<T: NcNumeric>(self) -> Self::Output {
        let varname = self.varname;
        let missing = MissingValues::<T>::for_variable(self.src)?;
        let valid = ValidRange::for_variable(self.src)?;
        let values = self.src.get::<T, _>(Extents::All).change_context_lazy(|| {
            LbcError::context(format!("reading variable '{}'", self.src.name()))
        })?;

        let mut var = self
            .file
            .variable_mut(varname)
            .ok_or_else(|| LbcError::missing_variable(varname))?;
        let fill = fill_or_default::<T>(&var)?;

        let copied = values.mapv(|v| {
            let in_range = v.to_f64().map_or(false, |raw| valid.contains(raw));
            if missing.is_missing(v) || !in_range {
                fill
            } else {
                v
            }
        });

        var.put(copied.view(), full_extents(copied.shape()))
            .change_context_lazy(|| {
                LbcError::context(format!("writing values to variable '{varname}'"))
            })
    }
}

/// Define a new variable of the given numeric kind.
pub fn add_numeric_variable(
    file: &mut netcdf::FileMut,
    varname: &str,
    kind: NumericKind,
    dims: &[&str],
) -> error_stack::Result<(), LbcError> {
    kind.accept(AddVariable {
        file,
        varname,
        dims,
    })
}

struct AddVariable<'a> {
    file: &'a mut netcdf::FileMut,
    varname: &'a str,
    dims: &'a [&'a str],
}

impl NumericVisitor for AddVariable<'_> {
    type Output = error_stack::Result<(), LbcError>;

    fn visit<T: NcNumeric>(self) -> Self::Output {
        self.file
            .add_variable::<T>(self.varname, self.dims)
            .change_context_lazy(|| {
                LbcError::context(format!("defining variable '{}'", self.varname))
            })?;
        Ok(())
    }
}

/// Mean of all non-NaN values, or `None` if there are none.
pub fn nan_mean(values: ArrayViewD<f64>) -> Option<f64> {
    let (sum, n) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(sum, n), &v| (sum + v, n + 1));

    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}
