//! ValueCell — one typed field value: a scalar or a homogeneous N-d array.
//!
//! Convention: a scalar has shape `[]`. `as_array()` on a scalar yields a
//! one-element buffer with shape `[]`; `as_scalar()` accepts any shape whose
//! element count is exactly one (`[]`, `[1]`, `[1, 1]`, ...).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::UnitCategory;
use crate::{Error, Result, CELL};

/// Dimension sizes, outermost first. Empty = scalar.
pub type Shape = SmallVec<[usize; 4]>;

// ============================================================================
// Primitive types
// ============================================================================

/// NXDL primitive type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PrimitiveType {
    Float64,
    Int64,
    UInt64,
    Bool,
    Utf8,
    Complex128,
    Binary,
    DateTime,
    /// Declaration-only: any integer, float or complex value.
    AnyNumber,
}

impl PrimitiveType {
    pub fn nxdl_name(self) -> &'static str {
        match self {
            PrimitiveType::Float64 => "NX_FLOAT",
            PrimitiveType::Int64 => "NX_INT",
            PrimitiveType::UInt64 => "NX_UINT",
            PrimitiveType::Bool => "NX_BOOLEAN",
            PrimitiveType::Utf8 => "NX_CHAR",
            PrimitiveType::Complex128 => "NX_COMPLEX",
            PrimitiveType::Binary => "NX_BINARY",
            PrimitiveType::DateTime => "NX_DATE_TIME",
            PrimitiveType::AnyNumber => "NX_NUMBER",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            PrimitiveType::Float64
                | PrimitiveType::Int64
                | PrimitiveType::UInt64
                | PrimitiveType::Complex128
                | PrimitiveType::AnyNumber
        )
    }

    /// Whether a value of type `got` may be stored where `self` is declared.
    ///
    /// Widening table: int64/uint64 → float64, uint64 → int64 (range-checked
    /// on conversion), any real → complex128. Nothing else converts.
    pub fn accepts(self, got: PrimitiveType) -> bool {
        use PrimitiveType::*;
        self == got
            || matches!(
                (self, got),
                (AnyNumber, Float64 | Int64 | UInt64 | Complex128)
                    | (Float64, Int64 | UInt64)
                    | (Int64, UInt64)
                    | (Complex128, Float64 | Int64 | UInt64)
            )
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.nxdl_name())
    }
}

impl FromStr for PrimitiveType {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "NX_FLOAT" => PrimitiveType::Float64,
            "NX_INT" => PrimitiveType::Int64,
            "NX_UINT" | "NX_POSINT" => PrimitiveType::UInt64,
            "NX_BOOLEAN" => PrimitiveType::Bool,
            "NX_CHAR" => PrimitiveType::Utf8,
            "NX_COMPLEX" => PrimitiveType::Complex128,
            "NX_BINARY" => PrimitiveType::Binary,
            "NX_DATE_TIME" => PrimitiveType::DateTime,
            "NX_NUMBER" => PrimitiveType::AnyNumber,
            other => return Err(Error::Schema(format!("unknown primitive type '{other}'"))),
        })
    }
}

impl TryFrom<String> for PrimitiveType {
    type Error = Error;
    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<PrimitiveType> for String {
    fn from(t: PrimitiveType) -> Self {
        t.nxdl_name().to_owned()
    }
}

/// Complex number stored as two `f64`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Complex128 {
    pub re: f64,
    pub im: f64,
}

impl Complex128 {
    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }
}

impl fmt::Display for Complex128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.im < 0.0 {
            write!(f, "{}-{}i", self.re, -self.im)
        } else {
            write!(f, "{}+{}i", self.re, self.im)
        }
    }
}

// ============================================================================
// Scalar
// ============================================================================

/// A single element of any primitive type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Float64(f64),
    Int64(i64),
    UInt64(u64),
    Bool(bool),
    Utf8(String),
    Complex128(Complex128),
    Binary(u8),
    DateTime(DateTime<Utc>),
}

impl Scalar {
    pub fn primitive_type(&self) -> PrimitiveType {
        match self {
            Scalar::Float64(_) => PrimitiveType::Float64,
            Scalar::Int64(_) => PrimitiveType::Int64,
            Scalar::UInt64(_) => PrimitiveType::UInt64,
            Scalar::Bool(_) => PrimitiveType::Bool,
            Scalar::Utf8(_) => PrimitiveType::Utf8,
            Scalar::Complex128(_) => PrimitiveType::Complex128,
            Scalar::Binary(_) => PrimitiveType::Binary,
            Scalar::DateTime(_) => PrimitiveType::DateTime,
        }
    }

    /// Plain-text form used for enumeration membership.
    pub fn token(&self) -> String {
        match self {
            Scalar::Utf8(s) => s.clone(),
            Scalar::DateTime(dt) => dt.to_rfc3339(),
            other => other.to_string(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Utf8(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Float64(v) => write!(f, "{v}"),
            Scalar::Int64(v) => write!(f, "{v}"),
            Scalar::UInt64(v) => write!(f, "{v}"),
            Scalar::Bool(v) => write!(f, "{v}"),
            Scalar::Utf8(s) => write!(f, "\"{}\"", s.replace('"', "\\\"")),
            Scalar::Complex128(c) => write!(f, "{c}"),
            Scalar::Binary(b) => write!(f, "0x{b:02x}"),
            Scalar::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
        }
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float64(v)
    }
}

impl From<f32> for Scalar {
    fn from(v: f32) -> Self {
        Scalar::Float64(v as f64)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int64(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int64(v as i64)
    }
}

impl From<u64> for Scalar {
    fn from(v: u64) -> Self {
        Scalar::UInt64(v)
    }
}

impl From<u32> for Scalar {
    fn from(v: u32) -> Self {
        Scalar::UInt64(v as u64)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Utf8(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Utf8(v.to_owned())
    }
}

impl From<Complex128> for Scalar {
    fn from(v: Complex128) -> Self {
        Scalar::Complex128(v)
    }
}

impl From<DateTime<Utc>> for Scalar {
    fn from(v: DateTime<Utc>) -> Self {
        Scalar::DateTime(v)
    }
}

// ============================================================================
// CellData — flattened, row-major buffer
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellData {
    Float64(Vec<f64>),
    Int64(Vec<i64>),
    UInt64(Vec<u64>),
    Bool(Vec<bool>),
    Utf8(Vec<String>),
    Complex128(Vec<Complex128>),
    Binary(Vec<u8>),
    DateTime(Vec<DateTime<Utc>>),
}

impl CellData {
    pub fn len(&self) -> usize {
        match self {
            CellData::Float64(v) => v.len(),
            CellData::Int64(v) => v.len(),
            CellData::UInt64(v) => v.len(),
            CellData::Bool(v) => v.len(),
            CellData::Utf8(v) => v.len(),
            CellData::Complex128(v) => v.len(),
            CellData::Binary(v) => v.len(),
            CellData::DateTime(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn primitive_type(&self) -> PrimitiveType {
        match self {
            CellData::Float64(_) => PrimitiveType::Float64,
            CellData::Int64(_) => PrimitiveType::Int64,
            CellData::UInt64(_) => PrimitiveType::UInt64,
            CellData::Bool(_) => PrimitiveType::Bool,
            CellData::Utf8(_) => PrimitiveType::Utf8,
            CellData::Complex128(_) => PrimitiveType::Complex128,
            CellData::Binary(_) => PrimitiveType::Binary,
            CellData::DateTime(_) => PrimitiveType::DateTime,
        }
    }

    /// Element at a flat (row-major) index.
    pub fn get(&self, index: usize) -> Option<Scalar> {
        match self {
            CellData::Float64(v) => v.get(index).copied().map(Scalar::Float64),
            CellData::Int64(v) => v.get(index).copied().map(Scalar::Int64),
            CellData::UInt64(v) => v.get(index).copied().map(Scalar::UInt64),
            CellData::Bool(v) => v.get(index).copied().map(Scalar::Bool),
            CellData::Utf8(v) => v.get(index).cloned().map(Scalar::Utf8),
            CellData::Complex128(v) => v.get(index).copied().map(Scalar::Complex128),
            CellData::Binary(v) => v.get(index).copied().map(Scalar::Binary),
            CellData::DateTime(v) => v.get(index).copied().map(Scalar::DateTime),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Scalar> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    fn from_scalar(value: Scalar) -> Self {
        match value {
            Scalar::Float64(v) => CellData::Float64(vec![v]),
            Scalar::Int64(v) => CellData::Int64(vec![v]),
            Scalar::UInt64(v) => CellData::UInt64(vec![v]),
            Scalar::Bool(v) => CellData::Bool(vec![v]),
            Scalar::Utf8(v) => CellData::Utf8(vec![v]),
            Scalar::Complex128(v) => CellData::Complex128(vec![v]),
            Scalar::Binary(v) => CellData::Binary(vec![v]),
            Scalar::DateTime(v) => CellData::DateTime(vec![v]),
        }
    }

    /// Convert to `target` along the widening table; `None` if the
    /// conversion is not allowed or a value is out of range.
    pub(crate) fn widen_to(self, target: PrimitiveType) -> Option<CellData> {
        let got = self.primitive_type();
        if got == target || (target == PrimitiveType::AnyNumber && got.is_numeric()) {
            return Some(self);
        }
        let real = |re: f64| Complex128 { re, im: 0.0 };
        match (self, target) {
            (CellData::Int64(v), PrimitiveType::Float64) => {
                Some(CellData::Float64(v.into_iter().map(|x| x as f64).collect()))
            }
            (CellData::UInt64(v), PrimitiveType::Float64) => {
                Some(CellData::Float64(v.into_iter().map(|x| x as f64).collect()))
            }
            (CellData::UInt64(v), PrimitiveType::Int64) => v
                .into_iter()
                .map(|x| i64::try_from(x).ok())
                .collect::<Option<Vec<_>>>()
                .map(CellData::Int64),
            (CellData::Float64(v), PrimitiveType::Complex128) => {
                Some(CellData::Complex128(v.into_iter().map(real).collect()))
            }
            (CellData::Int64(v), PrimitiveType::Complex128) => {
                Some(CellData::Complex128(v.into_iter().map(|x| real(x as f64)).collect()))
            }
            (CellData::UInt64(v), PrimitiveType::Complex128) => {
                Some(CellData::Complex128(v.into_iter().map(|x| real(x as f64)).collect()))
            }
            _ => None,
        }
    }
}

impl From<Vec<f64>> for CellData {
    fn from(v: Vec<f64>) -> Self {
        CellData::Float64(v)
    }
}

impl From<Vec<i64>> for CellData {
    fn from(v: Vec<i64>) -> Self {
        CellData::Int64(v)
    }
}

impl From<Vec<i32>> for CellData {
    fn from(v: Vec<i32>) -> Self {
        CellData::Int64(v.into_iter().map(i64::from).collect())
    }
}

impl From<Vec<u64>> for CellData {
    fn from(v: Vec<u64>) -> Self {
        CellData::UInt64(v)
    }
}

impl From<Vec<bool>> for CellData {
    fn from(v: Vec<bool>) -> Self {
        CellData::Bool(v)
    }
}

impl From<Vec<String>> for CellData {
    fn from(v: Vec<String>) -> Self {
        CellData::Utf8(v)
    }
}

impl From<Vec<&str>> for CellData {
    fn from(v: Vec<&str>) -> Self {
        CellData::Utf8(v.into_iter().map(str::to_owned).collect())
    }
}

impl From<Vec<Complex128>> for CellData {
    fn from(v: Vec<Complex128>) -> Self {
        CellData::Complex128(v)
    }
}

impl From<Vec<u8>> for CellData {
    fn from(v: Vec<u8>) -> Self {
        CellData::Binary(v)
    }
}

impl From<Vec<DateTime<Utc>>> for CellData {
    fn from(v: Vec<DateTime<Utc>>) -> Self {
        CellData::DateTime(v)
    }
}

// ============================================================================
// ValueCell
// ============================================================================

/// One field's data: flattened buffer, shape and optional unit category.
///
/// Invariant: `data.len() == product(shape)` (1 for a scalar).
/// The primitive type is fixed at creation; later writes must widen into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCell")]
pub struct ValueCell {
    data: CellData,
    #[serde(default, skip_serializing_if = "is_scalar_shape")]
    shape: Shape,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unit: Option<UnitCategory>,
}

#[derive(Deserialize)]
struct RawCell {
    data: CellData,
    #[serde(default)]
    shape: Shape,
    #[serde(default)]
    unit: Option<UnitCategory>,
}

impl TryFrom<RawCell> for ValueCell {
    type Error = Error;

    fn try_from(raw: RawCell) -> Result<Self> {
        check_len(raw.data.len(), &raw.shape)?;
        Ok(Self { data: raw.data, shape: raw.shape, unit: raw.unit })
    }
}

fn is_scalar_shape(shape: &Shape) -> bool {
    shape.is_empty()
}

fn check_len(len: usize, shape: &[usize]) -> Result<()> {
    let expected: usize = shape.iter().product();
    if len != expected {
        return Err(Error::ShapeMismatch {
            field: CELL.into(),
            message: format!("buffer holds {len} elements, shape {shape:?} needs {expected}"),
        });
    }
    Ok(())
}

impl ValueCell {
    pub fn scalar(value: impl Into<Scalar>) -> Self {
        Self { data: CellData::from_scalar(value.into()), shape: Shape::new(), unit: None }
    }

    /// Array cell; fails with `ShapeMismatch` unless `data.len() == product(shape)`.
    pub fn array(data: impl Into<CellData>, shape: &[usize]) -> Result<Self> {
        let data = data.into();
        check_len(data.len(), shape)?;
        Ok(Self { data, shape: Shape::from_slice(shape), unit: None })
    }

    /// Rank-1 array over the whole buffer.
    pub fn vector(data: impl Into<CellData>) -> Self {
        let data = data.into();
        let shape = smallvec::smallvec![data.len()];
        Self { data, shape, unit: None }
    }

    pub fn with_unit(mut self, unit: impl Into<Option<UnitCategory>>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn primitive_type(&self) -> PrimitiveType {
        self.data.primitive_type()
    }

    pub fn unit(&self) -> Option<UnitCategory> {
        self.unit
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True when the shape is `[]`.
    pub fn is_scalar(&self) -> bool {
        self.shape.is_empty()
    }

    pub fn data(&self) -> &CellData {
        &self.data
    }

    /// Overwrite with a scalar. The shape becomes `[]`.
    pub fn set_scalar(
        &mut self,
        value: impl Into<Scalar>,
        unit: impl Into<Option<UnitCategory>>,
    ) -> Result<()> {
        let data = self.admit(CellData::from_scalar(value.into()))?;
        let unit = self.admit_unit(unit.into())?;
        self.data = data;
        self.shape = Shape::new();
        self.unit = unit;
        Ok(())
    }

    /// Overwrite with an array.
    pub fn set_array(
        &mut self,
        data: impl Into<CellData>,
        shape: &[usize],
        unit: impl Into<Option<UnitCategory>>,
    ) -> Result<()> {
        let data = data.into();
        check_len(data.len(), shape)?;
        let data = self.admit(data)?;
        let unit = self.admit_unit(unit.into())?;
        self.data = data;
        self.shape = Shape::from_slice(shape);
        self.unit = unit;
        Ok(())
    }

    /// The single element; `NotScalar` if the cell holds more or fewer than one.
    pub fn as_scalar(&self) -> Result<Scalar> {
        match (self.len(), self.data.get(0)) {
            (1, Some(value)) => Ok(value),
            (len, _) => Err(Error::NotScalar { shape: self.shape.to_vec(), len }),
        }
    }

    /// Buffer and shape. Always succeeds; a scalar is shape `[]`.
    pub fn as_array(&self) -> (&CellData, &[usize]) {
        (&self.data, &self.shape)
    }

    /// Typed scalar extraction, e.g. `cell.get::<f64>()`.
    pub fn get<T: FromScalar>(&self) -> Result<T> {
        T::from_scalar(self.as_scalar()?)
    }

    /// Typed extraction of every element in row-major order.
    pub fn to_vec<T: FromScalar>(&self) -> Result<Vec<T>> {
        self.data.iter().map(T::from_scalar).collect()
    }

    /// Widen into a declared type, or fail with `TypeMismatch`.
    pub(crate) fn coerce_to(self, target: PrimitiveType) -> Result<Self> {
        let got = self.primitive_type();
        let ValueCell { data, shape, unit } = self;
        if target.accepts(got) {
            if let Some(data) = data.widen_to(target) {
                return Ok(Self { data, shape, unit });
            }
        }
        Err(Error::TypeMismatch { field: CELL.into(), expected: target, got })
    }

    /// The cell that replaces `self` when `incoming` is written over it:
    /// same primitive type, consistent unit, incoming shape.
    pub(crate) fn supersede(&self, incoming: ValueCell) -> Result<ValueCell> {
        let ValueCell { data, shape, unit } = incoming;
        Ok(ValueCell { data: self.admit(data)?, shape, unit: self.admit_unit(unit)? })
    }

    fn admit(&self, incoming: CellData) -> Result<CellData> {
        let expected = self.primitive_type();
        let got = incoming.primitive_type();
        incoming
            .widen_to(expected)
            .ok_or(Error::TypeMismatch { field: CELL.into(), expected, got })
    }

    fn admit_unit(&self, incoming: Option<UnitCategory>) -> Result<Option<UnitCategory>> {
        match (self.unit, incoming) {
            (current, None) => Ok(current),
            (Some(current), Some(new)) if current != new => Err(Error::UnitCategoryMismatch {
                field: CELL.into(),
                expected: current.nxdl_name().into(),
                got: new.nxdl_name().into(),
            }),
            (_, Some(new)) => Ok(Some(new)),
        }
    }
}

/// Elements shown before a long array is elided.
const DISPLAY_LIMIT: usize = 8;

impl fmt::Display for ValueCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_scalar() {
            if let Some(v) = self.data.get(0) {
                return write!(f, "{v}");
            }
        }
        write!(f, "[")?;
        for (i, v) in self.data.iter().take(DISPLAY_LIMIT).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v}")?;
        }
        if self.len() > DISPLAY_LIMIT {
            write!(f, ", ... ({} total)", self.len())?;
        }
        write!(f, "]")
    }
}

impl From<Scalar> for ValueCell {
    fn from(v: Scalar) -> Self {
        ValueCell::scalar(v)
    }
}

// ============================================================================
// Typed extraction
// ============================================================================

/// Convert a `Scalar` into a concrete Rust type, widening where allowed.
pub trait FromScalar: Sized {
    fn from_scalar(value: Scalar) -> Result<Self>;
}

fn mismatch<T>(expected: PrimitiveType, value: &Scalar) -> Result<T> {
    Err(Error::TypeMismatch { field: CELL.into(), expected, got: value.primitive_type() })
}

impl FromScalar for Scalar {
    fn from_scalar(value: Scalar) -> Result<Self> {
        Ok(value)
    }
}

impl FromScalar for f64 {
    fn from_scalar(value: Scalar) -> Result<Self> {
        match value {
            Scalar::Float64(v) => Ok(v),
            Scalar::Int64(v) => Ok(v as f64),
            Scalar::UInt64(v) => Ok(v as f64),
            other => mismatch(PrimitiveType::Float64, &other),
        }
    }
}

impl FromScalar for i64 {
    fn from_scalar(value: Scalar) -> Result<Self> {
        match value {
            Scalar::Int64(v) => Ok(v),
            Scalar::UInt64(v) if i64::try_from(v).is_ok() => Ok(v as i64),
            other => mismatch(PrimitiveType::Int64, &other),
        }
    }
}

impl FromScalar for u64 {
    fn from_scalar(value: Scalar) -> Result<Self> {
        match value {
            Scalar::UInt64(v) => Ok(v),
            Scalar::Int64(v) if v >= 0 => Ok(v as u64),
            other => mismatch(PrimitiveType::UInt64, &other),
        }
    }
}

impl FromScalar for bool {
    fn from_scalar(value: Scalar) -> Result<Self> {
        match value {
            Scalar::Bool(v) => Ok(v),
            other => mismatch(PrimitiveType::Bool, &other),
        }
    }
}

impl FromScalar for String {
    fn from_scalar(value: Scalar) -> Result<Self> {
        match value {
            Scalar::Utf8(v) => Ok(v),
            other => mismatch(PrimitiveType::Utf8, &other),
        }
    }
}

impl FromScalar for u8 {
    fn from_scalar(value: Scalar) -> Result<Self> {
        match value {
            Scalar::Binary(v) => Ok(v),
            other => mismatch(PrimitiveType::Binary, &other),
        }
    }
}

impl FromScalar for Complex128 {
    fn from_scalar(value: Scalar) -> Result<Self> {
        match value {
            Scalar::Complex128(v) => Ok(v),
            Scalar::Float64(v) => Ok(Complex128::new(v, 0.0)),
            Scalar::Int64(v) => Ok(Complex128::new(v as f64, 0.0)),
            Scalar::UInt64(v) => Ok(Complex128::new(v as f64, 0.0)),
            other => mismatch(PrimitiveType::Complex128, &other),
        }
    }
}

/// NeXus files commonly carry timestamps as ISO 8601 strings; both forms
/// are accepted.
impl FromScalar for DateTime<Utc> {
    fn from_scalar(value: Scalar) -> Result<Self> {
        match value {
            Scalar::DateTime(v) => Ok(v),
            Scalar::Utf8(ref s) => match DateTime::parse_from_rfc3339(s) {
                Ok(dt) => Ok(dt.with_timezone(&Utc)),
                Err(_) => mismatch(PrimitiveType::DateTime, &value),
            },
            other => mismatch(PrimitiveType::DateTime, &other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_scalar_round_trip() {
        let cell = ValueCell::scalar(1.23);
        assert!(cell.is_scalar());
        assert_eq!(cell.as_scalar().unwrap(), Scalar::Float64(1.23));
        assert_eq!(cell.get::<f64>().unwrap(), 1.23);
        let (data, shape) = cell.as_array();
        assert_eq!(data, &CellData::Float64(vec![1.23]));
        assert!(shape.is_empty());
    }

    #[test]
    fn test_array_shape_checked() {
        let err = ValueCell::array(vec![1.0, 2.0, 3.0], &[2, 2]).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));

        let cell = ValueCell::array(vec![1i64, 2, 3, 4, 5, 6], &[2, 3]).unwrap();
        assert_eq!(cell.shape(), &[2, 3]);
        assert_eq!(cell.rank(), 2);
        assert_eq!(cell.len(), 6);
    }

    #[test]
    fn test_as_scalar_on_single_element_array() {
        let cell = ValueCell::array(vec![7i64], &[1, 1]).unwrap();
        assert_eq!(cell.get::<i64>().unwrap(), 7);

        let cell = ValueCell::vector(vec![1i64, 2]);
        assert!(matches!(cell.as_scalar(), Err(Error::NotScalar { len: 2, .. })));

        let empty = ValueCell::array(Vec::<f64>::new(), &[0]).unwrap();
        assert!(matches!(empty.as_scalar(), Err(Error::NotScalar { len: 0, .. })));
    }

    #[test]
    fn test_set_scalar_widens_int_into_float() {
        let mut cell = ValueCell::vector(vec![1.0, 2.0]);
        cell.set_scalar(3i64, None).unwrap();
        assert_eq!(cell.primitive_type(), PrimitiveType::Float64);
        assert!(cell.is_scalar());
        assert_eq!(cell.get::<f64>().unwrap(), 3.0);
    }

    #[test]
    fn test_set_scalar_rejects_string_into_number() {
        let mut cell = ValueCell::scalar(1.0);
        let err = cell.set_scalar("x", None).unwrap_err();
        assert!(matches!(
            err,
            Error::TypeMismatch { expected: PrimitiveType::Float64, got: PrimitiveType::Utf8, .. }
        ));
        assert_eq!(cell.get::<f64>().unwrap(), 1.0);
    }

    #[test]
    fn test_set_scalar_rejects_float_into_int() {
        let mut cell = ValueCell::scalar(1i64);
        assert!(cell.set_scalar(1.5, None).is_err());
    }

    #[test]
    fn test_uint_into_int_is_range_checked() {
        let mut cell = ValueCell::scalar(0i64);
        cell.set_scalar(5u64, None).unwrap();
        assert_eq!(cell.get::<i64>().unwrap(), 5);
        assert!(cell.set_scalar(u64::MAX, None).is_err());
    }

    #[test]
    fn test_unit_must_stay_consistent() {
        let mut cell = ValueCell::scalar(1.0).with_unit(UnitCategory::Length);
        cell.set_scalar(2.0, None).unwrap();
        assert_eq!(cell.unit(), Some(UnitCategory::Length));
        cell.set_scalar(3.0, UnitCategory::Length).unwrap();
        let err = cell.set_scalar(4.0, UnitCategory::Angle).unwrap_err();
        assert!(matches!(err, Error::UnitCategoryMismatch { .. }));
        assert_eq!(cell.get::<f64>().unwrap(), 3.0);
    }

    #[test]
    fn test_set_array_then_scalar_promotes_shape() {
        let mut cell = ValueCell::scalar(0.0);
        cell.set_array(vec![1.0, 2.0, 3.0, 4.0], &[2, 2], None).unwrap();
        assert_eq!(cell.shape(), &[2, 2]);
        cell.set_scalar(9.0, None).unwrap();
        assert!(cell.shape().is_empty());
        assert!(matches!(
            cell.set_array(vec![1.0], &[2], None),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_complex_accepts_reals() {
        let cell = ValueCell::vector(vec![1.0, -2.0]).coerce_to(PrimitiveType::Complex128).unwrap();
        assert_eq!(
            cell.to_vec::<Complex128>().unwrap(),
            vec![Complex128::new(1.0, 0.0), Complex128::new(-2.0, 0.0)]
        );
        assert_eq!(Complex128::new(1.0, -2.0).to_string(), "1-2i");
    }

    #[test]
    fn test_any_number_keeps_concrete_type() {
        let cell = ValueCell::scalar(4u64).coerce_to(PrimitiveType::AnyNumber).unwrap();
        assert_eq!(cell.primitive_type(), PrimitiveType::UInt64);
        assert!(ValueCell::scalar(true).coerce_to(PrimitiveType::AnyNumber).is_err());
    }

    #[test]
    fn test_datetime_from_string() {
        let cell = ValueCell::scalar("2024-05-01T12:00:00Z");
        let dt: DateTime<Utc> = cell.get().unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
        assert!(ValueCell::scalar("yesterday").get::<DateTime<Utc>>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(ValueCell::scalar("ceos").to_string(), "\"ceos\"");
        assert_eq!(ValueCell::vector(vec![1i64, 2, 3]).to_string(), "[1, 2, 3]");
        let long = ValueCell::vector((0..10).map(|i| i as f64).collect::<Vec<_>>());
        assert!(long.to_string().ends_with("... (10 total)]"));
    }

    #[test]
    fn test_serde_rejects_inconsistent_shape() {
        let ok: ValueCell =
            serde_json::from_str(r#"{"data":{"Int64":[1,2]},"shape":[2],"unit":"NX_COUNT"}"#).unwrap();
        assert_eq!(ok.unit(), Some(UnitCategory::Count));
        let bad = serde_json::from_str::<ValueCell>(r#"{"data":{"Int64":[1,2]},"shape":[3]}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_primitive_type_names() {
        assert_eq!("NX_POSINT".parse::<PrimitiveType>().unwrap(), PrimitiveType::UInt64);
        assert_eq!(PrimitiveType::Utf8.to_string(), "NX_CHAR");
        assert!("NX_QUATERNION".parse::<PrimitiveType>().is_err());
    }
}
