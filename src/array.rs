//! The closed set of array element kinds and their access rules.
//!
//! [`Array`] wraps a [`TypedArray`] of the Rust type backing each
//! [`DataType`]. Numeric kinds and char read and write each other with
//! primitive `as` casts; unsigned kinds keep their unsigned magnitude when
//! widened. Every other pairing is an [`ArrayError::ForbiddenConversion`].

use std::borrow::Cow;
use std::fmt;

use num_traits::AsPrimitive;

use crate::iter::Cursor;
use crate::{
    ArrayError, DataType, Index, IndexIterator, NativeKind, Nested, ObjectRef, Result, Section,
    TypedArray, Value,
};

/// An N-D array of one element kind.
#[derive(Debug, Clone)]
pub enum Array {
    Boolean(TypedArray<bool>),
    Byte(TypedArray<i8>),
    UByte(TypedArray<u8>),
    Short(TypedArray<i16>),
    UShort(TypedArray<u16>),
    Int(TypedArray<i32>),
    UInt(TypedArray<u32>),
    Long(TypedArray<i64>),
    ULong(TypedArray<u64>),
    Float(TypedArray<f32>),
    Double(TypedArray<f64>),
    Char(TypedArray<char>),
    String(TypedArray<String>),
    Opaque(TypedArray<Vec<u8>>),
    Object(TypedArray<Option<ObjectRef>>),
    Structure(TypedArray<Option<ObjectRef>>),
    Sequence(TypedArray<Option<ObjectRef>>),
}

// ============================================================================
// Dispatch macros
// ============================================================================

macro_rules! kinds {
    ($mac:ident!($($args:tt)*)) => {
        $mac!(@arms ($($args)*) Boolean, Byte, UByte, Short, UShort, Int, UInt, Long, ULong,
            Float, Double, Char, String, Opaque, Object, Structure, Sequence)
    };
}

/// Evaluate `$body` with `$a` bound to the inner `TypedArray`.
macro_rules! for_each_kind {
    (@arms ($self:expr, $a:ident => $body:expr) $($v:ident),*) => {
        match $self { $(Array::$v($a) => $body,)* }
    };
    ($self:expr, $a:ident => $body:expr) => {
        kinds!(for_each_kind!($self, $a => $body))
    };
}

/// Like `for_each_kind!`, rewrapping the resulting `TypedArray` in the same kind.
macro_rules! map_kind {
    (@arms ($self:expr, $a:ident => $body:expr) $($v:ident),*) => {
        match $self { $(Array::$v($a) => Array::$v($body),)* }
    };
    ($self:expr, $a:ident => $body:expr) => {
        kinds!(map_kind!($self, $a => $body))
    };
}

/// Build an array of `$kind` from a generic `TypedArray` constructor.
macro_rules! of_kind {
    (@arms ($kind:expr, $make:expr) $($v:ident),*) => {
        match $kind { $(DataType::$v => Array::$v($make),)* }
    };
    ($kind:expr, $make:expr) => {
        kinds!(of_kind!($kind, $make))
    };
}

/// Every element of an array as `Value`s of the matching variant.
macro_rules! values_of {
    (@arms ($self:expr) $($v:ident),*) => {
        match $self { $(Array::$v(a) => a.to_vec().into_iter().map(Value::$v).collect(),)* }
    };
    ($self:expr) => {
        kinds!(values_of!($self))
    };
}

/// Numeric kinds bind `$a`; char binds `$c`; anything else is `$other`.
macro_rules! numeric_match {
    ($self:expr, $a:ident => $body:expr, $c:ident => $char_body:expr, $other:ident => $fallback:expr) => {
        match $self {
            Array::Byte($a) => $body,
            Array::UByte($a) => $body,
            Array::Short($a) => $body,
            Array::UShort($a) => $body,
            Array::Int($a) => $body,
            Array::UInt($a) => $body,
            Array::Long($a) => $body,
            Array::ULong($a) => $body,
            Array::Float($a) => $body,
            Array::Double($a) => $body,
            Array::Char($c) => $char_body,
            $other => $fallback,
        }
    };
}

/// Primitive `as` conversion into a numeric element type.
///
/// Narrow integer targets go through `i32` first, so a float wraps the way
/// an int-then-narrow cast does: `300.0` read as a byte is `44`.
trait NumericTarget: Copy + 'static {
    fn convert<S>(value: S) -> Self
    where
        S: AsPrimitive<Self> + AsPrimitive<i32>;
}

macro_rules! impl_numeric_target {
    (direct: $($t:ty),*; via_int: $($n:ty),*) => {
        $(
            impl NumericTarget for $t {
                #[inline]
                fn convert<S>(value: S) -> Self
                where
                    S: AsPrimitive<Self> + AsPrimitive<i32>,
                {
                    <S as AsPrimitive<Self>>::as_(value)
                }
            }
        )*
        $(
            impl NumericTarget for $n {
                #[inline]
                fn convert<S>(value: S) -> Self
                where
                    S: AsPrimitive<Self> + AsPrimitive<i32>,
                {
                    <i32 as AsPrimitive<Self>>::as_(<S as AsPrimitive<i32>>::as_(value))
                }
            }
        )*
    };
}

impl_numeric_target!(direct: i32, u32, i64, u64, f32, f64; via_int: i8, u8, i16, u16);

fn char_from_code(code: u32) -> Result<char> {
    char::from_u32(code)
        .ok_or_else(|| ArrayError::InvalidValue(format!("{code:#x} is not a valid char")))
}

/// The char whose code point is `value`. Negative and non-finite values fail.
fn code_point<S>(value: S) -> Result<char>
where
    S: AsPrimitive<f64> + AsPrimitive<u32>,
{
    let wide = <S as AsPrimitive<f64>>::as_(value);
    if !wide.is_finite() || wide < 0.0 {
        return Err(ArrayError::InvalidValue(format!(
            "{wide} is not a valid char code"
        )));
    }
    char_from_code(<S as AsPrimitive<u32>>::as_(value))
}

// ============================================================================
// Native kinds
// ============================================================================

macro_rules! impl_native_kind {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl NativeKind for $t {
                const KIND: DataType = DataType::$variant;

                fn wrap(array: TypedArray<Self>) -> Array {
                    Array::$variant(array)
                }

                fn unwrap(array: &Array) -> Option<&TypedArray<Self>> {
                    match array {
                        Array::$variant(a) => Some(a),
                        _ => None,
                    }
                }

                fn into_value(self) -> Value {
                    Value::$variant(self)
                }
            }
        )*
    };
}

impl_native_kind!(
    bool => Boolean,
    i8 => Byte,
    u8 => UByte,
    i16 => Short,
    u16 => UShort,
    i32 => Int,
    u32 => UInt,
    i64 => Long,
    u64 => ULong,
    f32 => Float,
    f64 => Double,
    char => Char,
    String => String,
    Vec<u8> => Opaque,
);

impl<T: NativeKind> From<TypedArray<T>> for Array {
    fn from(array: TypedArray<T>) -> Self {
        T::wrap(array)
    }
}

// ============================================================================
// Construction
// ============================================================================

impl Array {
    /// Canonical array of `shape` filled with zeros (or the empty value of
    /// non-numeric kinds).
    pub fn zeros(kind: DataType, shape: &[usize]) -> Array {
        of_kind!(kind, TypedArray::zeros(shape))
    }

    /// Canonical array over `data`. The kind follows from `T`.
    pub fn from_vec<T: NativeKind>(shape: &[usize], data: Vec<T>) -> Result<Array> {
        Ok(T::wrap(TypedArray::from_vec(shape, data)?))
    }

    /// Object, structure or sequence array over `data`.
    pub fn from_objects(
        kind: DataType,
        shape: &[usize],
        data: Vec<Option<ObjectRef>>,
    ) -> Result<Array> {
        let typed = TypedArray::from_vec(shape, data)?;
        match kind {
            DataType::Object => Ok(Array::Object(typed)),
            DataType::Structure => Ok(Array::Structure(typed)),
            DataType::Sequence => Ok(Array::Sequence(typed)),
            other => Err(ArrayError::ForbiddenConversion {
                kind: other,
                target: "object",
            }),
        }
    }

    /// Canonical array of `kind` filled from dynamic values, each converted
    /// under the usual access rules.
    pub fn from_values(kind: DataType, shape: &[usize], values: Vec<Value>) -> Result<Array> {
        let expected: usize = shape.iter().product();
        if values.len() != expected {
            return Err(ArrayError::SizeMismatch {
                expected,
                got: values.len(),
            });
        }
        let array = Array::zeros(kind, shape);
        for (pos, value) in values.into_iter().enumerate() {
            array.set_value_at(pos, value)?;
        }
        Ok(array)
    }

    /// Every element of `shape` reads `value`, backed by a single element.
    pub fn constant(kind: DataType, shape: &[usize], value: Value) -> Result<Array> {
        let one = Array::zeros(kind, &[1]);
        one.set_value_at(0, value)?;
        let index = Index::constant(shape);
        Ok(map_kind!(one, a => TypedArray::from_parts(a.storage().clone(), index)?))
    }

    /// Rank-1 array of `npts` elements `start + i * incr`.
    pub fn linear(kind: DataType, npts: usize, start: f64, incr: f64) -> Result<Array> {
        if !kind.is_numeric() {
            return Err(ArrayError::ForbiddenConversion {
                kind,
                target: "double",
            });
        }
        let array = Array::zeros(kind, &[npts]);
        for i in 0..npts {
            array.set_double_at(i, start + i as f64 * incr)?;
        }
        Ok(array)
    }

    /// Rank-1 array parsed from text.
    ///
    /// String arrays keep the text. Long kinds parse integers; other numeric
    /// kinds parse a double and convert it.
    pub fn parse_values(kind: DataType, values: &[&str]) -> Result<Array> {
        let invalid = |s: &str| ArrayError::InvalidValue(format!("'{s}' is not a valid {kind}"));
        let n = values.len();
        let array = match kind {
            DataType::String => {
                Array::from_vec(&[n], values.iter().map(|s| s.to_string()).collect())?
            }
            DataType::Boolean => Array::from_vec(
                &[n],
                values
                    .iter()
                    .map(|&s| s.trim().parse::<bool>().map_err(|_| invalid(s)))
                    .collect::<Result<Vec<_>>>()?,
            )?,
            DataType::Char => Array::from_vec(
                &[n],
                values
                    .iter()
                    .map(|&s| {
                        let mut chars = s.chars();
                        match (chars.next(), chars.next()) {
                            (Some(c), None) => Ok(c),
                            _ => Err(invalid(s)),
                        }
                    })
                    .collect::<Result<Vec<_>>>()?,
            )?,
            DataType::Long => Array::from_vec(
                &[n],
                values
                    .iter()
                    .map(|&s| s.trim().parse::<i64>().map_err(|_| invalid(s)))
                    .collect::<Result<Vec<_>>>()?,
            )?,
            DataType::ULong => Array::from_vec(
                &[n],
                values
                    .iter()
                    .map(|&s| s.trim().parse::<u64>().map_err(|_| invalid(s)))
                    .collect::<Result<Vec<_>>>()?,
            )?,
            k if k.is_numeric() => {
                let parsed = values
                    .iter()
                    .map(|&s| s.trim().parse::<f64>().map_err(|_| invalid(s)))
                    .collect::<Result<Vec<_>>>()?;
                let array = Array::zeros(k, &[n]);
                for (pos, v) in parsed.into_iter().enumerate() {
                    array.set_double_at(pos, v)?;
                }
                array
            }
            other => {
                return Err(ArrayError::ForbiddenConversion {
                    kind: other,
                    target: "String",
                })
            }
        };
        Ok(array)
    }

    /// Array of `kind` and `shape` filled from nested values in canonical order.
    ///
    /// # Errors
    /// `SizeMismatch` if the nesting does not match `shape`.
    pub fn from_nested(kind: DataType, shape: &[usize], nested: &Nested<Value>) -> Result<Array> {
        let array = Array::zeros(kind, shape);
        let mut pos = 0;
        nested.visit(shape, &mut |v| {
            array.set_value_at(pos, v.clone())?;
            pos += 1;
            Ok(())
        })?;
        Ok(array)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn data_type(&self) -> DataType {
        match self {
            Array::Boolean(_) => DataType::Boolean,
            Array::Byte(_) => DataType::Byte,
            Array::UByte(_) => DataType::UByte,
            Array::Short(_) => DataType::Short,
            Array::UShort(_) => DataType::UShort,
            Array::Int(_) => DataType::Int,
            Array::UInt(_) => DataType::UInt,
            Array::Long(_) => DataType::Long,
            Array::ULong(_) => DataType::ULong,
            Array::Float(_) => DataType::Float,
            Array::Double(_) => DataType::Double,
            Array::Char(_) => DataType::Char,
            Array::String(_) => DataType::String,
            Array::Opaque(_) => DataType::Opaque,
            Array::Object(_) => DataType::Object,
            Array::Structure(_) => DataType::Structure,
            Array::Sequence(_) => DataType::Sequence,
        }
    }

    pub fn index(&self) -> &Index {
        for_each_kind!(self, a => a.index())
    }

    pub fn shape(&self) -> &[usize] {
        self.index().shape()
    }

    pub fn rank(&self) -> usize {
        self.index().rank()
    }

    pub fn size(&self) -> usize {
        self.index().size()
    }

    /// The inner typed array, if this array holds `T`.
    pub fn typed<T: NativeKind>(&self) -> Option<&TypedArray<T>> {
        T::unwrap(self)
    }

    /// True when both arrays alias the same storage.
    pub fn shares_storage_with(&self, other: &Array) -> bool {
        match (self, other) {
            (Array::Boolean(a), Array::Boolean(b)) => a.shares_storage_with(b),
            (Array::Byte(a), Array::Byte(b)) => a.shares_storage_with(b),
            (Array::UByte(a), Array::UByte(b)) => a.shares_storage_with(b),
            (Array::Short(a), Array::Short(b)) => a.shares_storage_with(b),
            (Array::UShort(a), Array::UShort(b)) => a.shares_storage_with(b),
            (Array::Int(a), Array::Int(b)) => a.shares_storage_with(b),
            (Array::UInt(a), Array::UInt(b)) => a.shares_storage_with(b),
            (Array::Long(a), Array::Long(b)) => a.shares_storage_with(b),
            (Array::ULong(a), Array::ULong(b)) => a.shares_storage_with(b),
            (Array::Float(a), Array::Float(b)) => a.shares_storage_with(b),
            (Array::Double(a), Array::Double(b)) => a.shares_storage_with(b),
            (Array::Char(a), Array::Char(b)) => a.shares_storage_with(b),
            (Array::String(a), Array::String(b)) => a.shares_storage_with(b),
            (Array::Opaque(a), Array::Opaque(b)) => a.shares_storage_with(b),
            (Array::Object(a), Array::Object(b))
            | (Array::Structure(a), Array::Structure(b))
            | (Array::Sequence(a), Array::Sequence(b)) => a.shares_storage_with(b),
            _ => false,
        }
    }

    /// `"(2,3)"` for a 2x3 array.
    pub fn shape_string(&self) -> String {
        let dims: Vec<String> = self.shape().iter().map(|n| n.to_string()).collect();
        format!("({})", dims.join(","))
    }

    fn forbidden(&self, target: &'static str) -> ArrayError {
        ArrayError::ForbiddenConversion {
            kind: self.data_type(),
            target,
        }
    }

    // ========================================================================
    // Views
    // ========================================================================

    /// Zero-copy restriction to `section`; dimensions of length 1 are dropped.
    pub fn section(&self, section: &Section) -> Result<Array> {
        Ok(map_kind!(self, a => a.section(section)?))
    }

    /// Zero-copy restriction to `section`, keeping every dimension.
    pub fn section_no_reduce(&self, section: &Section) -> Result<Array> {
        Ok(map_kind!(self, a => a.section_no_reduce(section)?))
    }

    /// [`Array::section`] with the ranges given as origin, shape and stride.
    pub fn section_origin(&self, origin: &[usize], shape: &[usize], stride: &[usize]) -> Result<Array> {
        self.section(&Section::from_origin_shape_stride(origin, shape, stride)?)
    }

    /// [`Array::section_no_reduce`] with the ranges given as origin, shape and stride.
    pub fn section_no_reduce_origin(
        &self,
        origin: &[usize],
        shape: &[usize],
        stride: &[usize],
    ) -> Result<Array> {
        self.section_no_reduce(&Section::from_origin_shape_stride(origin, shape, stride)?)
    }

    /// Fix dimension `dim` at `value`, lowering the rank by one.
    pub fn slice(&self, dim: usize, value: usize) -> Result<Array> {
        Ok(map_kind!(self, a => a.slice(dim, value)?))
    }

    pub fn flip(&self, dim: usize) -> Result<Array> {
        Ok(map_kind!(self, a => a.flip(dim)?))
    }

    pub fn transpose(&self, d1: usize, d2: usize) -> Result<Array> {
        Ok(map_kind!(self, a => a.transpose(d1, d2)?))
    }

    pub fn permute(&self, dims: &[usize]) -> Result<Array> {
        Ok(map_kind!(self, a => a.permute(dims)?))
    }

    pub fn reduce(&self) -> Array {
        map_kind!(self, a => a.reduce())
    }

    pub fn reduce_dim(&self, dim: usize) -> Result<Array> {
        Ok(map_kind!(self, a => a.reduce_dim(dim)?))
    }

    /// View with a leading dimension of length 1.
    pub fn rank_plus_one(&self) -> Array {
        map_kind!(self, a => a.rank_plus_one())
    }

    // ========================================================================
    // Copies
    // ========================================================================

    /// Fresh canonical storage with the same contents.
    ///
    /// # Errors
    /// `UnsupportedView` for structure-sequence arrays, whose elements are
    /// only reachable by iteration.
    pub fn copy(&self) -> Result<Array> {
        if let Array::Sequence(_) = self {
            return Err(ArrayError::UnsupportedView(
                "cannot copy a structure sequence".into(),
            ));
        }
        Ok(map_kind!(self, a => a.copy()))
    }

    /// Copy laid out with a new shape of the same size.
    pub fn reshape(&self, shape: &[usize]) -> Result<Array> {
        if let Array::Sequence(_) = self {
            return Err(ArrayError::UnsupportedView(
                "cannot reshape a structure sequence".into(),
            ));
        }
        Ok(map_kind!(self, a => a.reshape(shape)?))
    }

    /// Reinterpret a canonical array with a new shape, sharing storage.
    pub fn reshape_no_copy(&self, shape: &[usize]) -> Result<Array> {
        Ok(map_kind!(self, a => a.reshape_no_copy(shape)?))
    }

    /// Contents in canonical order, read under a single lock.
    pub fn to_values(&self) -> Vec<Value> {
        values_of!(self)
    }

    /// Contents in canonical order as `T`, which must be this array's kind.
    pub fn copy_to_vec<T: NativeKind>(&self) -> Result<Vec<T>> {
        self.typed::<T>()
            .map(TypedArray::to_vec)
            .ok_or_else(|| self.forbidden(T::KIND.name()))
    }

    // ========================================================================
    // Iteration
    // ========================================================================

    /// Canonical-order iterator: flat over a canonical layout, odometer otherwise.
    pub fn index_iterator(&self) -> IndexIterator<'_> {
        IndexIterator::new(Cow::Borrowed(self), Cursor::canonical(self.index()))
    }

    /// Iterator for work that does not depend on visiting order.
    ///
    /// Canonical arrays behave like [`Array::index_iterator`]. Flipped or
    /// permuted whole arrays are walked in memory order. Views with gaps use
    /// the odometer so that only their own elements are visited.
    pub fn index_iterator_fast(&self) -> IndexIterator<'_> {
        IndexIterator::new(Cow::Borrowed(self), Cursor::memory_order(self.index()))
    }

    /// Canonical-order iterator over the elements selected by `section`.
    pub fn section_iterator(&self, section: &Section) -> Result<IndexIterator<'static>> {
        let view = self.section(section)?;
        let cursor = Cursor::canonical(view.index());
        Ok(IndexIterator::new(Cow::Owned(view), cursor))
    }
}

// ============================================================================
// Element access
// ============================================================================

macro_rules! numeric_access_at {
    ($($t:ty => $get_at:ident, $set_at:ident, $target:literal;)*) => {
        $(
            pub(crate) fn $get_at(&self, pos: usize) -> Result<$t> {
                numeric_match!(self,
                    a => Ok(<$t as NumericTarget>::convert(a.get_at(pos)?)),
                    c => Ok(<$t as NumericTarget>::convert(u32::from(c.get_at(pos)?))),
                    other => Err(other.forbidden($target)))
            }

            pub(crate) fn $set_at(&self, pos: usize, value: $t) -> Result<()> {
                numeric_match!(self,
                    a => a.set_at(pos, NumericTarget::convert(value)),
                    c => c.set_at(pos, code_point(value)?),
                    other => Err(other.forbidden($target)))
            }
        )*
    };
}

macro_rules! exact_access_at {
    ($($t:ty => $variant:ident, $get_at:ident, $set_at:ident, $target:literal;)*) => {
        $(
            pub(crate) fn $get_at(&self, pos: usize) -> Result<$t> {
                match self {
                    Array::$variant(a) => a.get_at(pos),
                    other => Err(other.forbidden($target)),
                }
            }

            pub(crate) fn $set_at(&self, pos: usize, value: $t) -> Result<()> {
                match self {
                    Array::$variant(a) => a.set_at(pos, value),
                    other => Err(other.forbidden($target)),
                }
            }
        )*
    };
}

macro_rules! indexed_access {
    ($($t:ty => $get:ident, $set:ident, $get_at:ident, $set_at:ident;)*) => {
        $(
            pub fn $get(&self, idx: &[usize]) -> Result<$t> {
                self.$get_at(self.index().element_offset(idx)?)
            }

            pub fn $set(&self, idx: &[usize], value: $t) -> Result<()> {
                self.$set_at(self.index().element_offset(idx)?, value)
            }
        )*
    };
}

impl Array {
    numeric_access_at! {
        f64 => double_at, set_double_at, "double";
        f32 => float_at, set_float_at, "float";
        i64 => long_at, set_long_at, "long";
        i32 => int_at, set_int_at, "int";
        i16 => short_at, set_short_at, "short";
        i8 => byte_at, set_byte_at, "byte";
    }

    exact_access_at! {
        bool => Boolean, boolean_at, set_boolean_at, "boolean";
        String => String, string_at, set_string_at, "String";
        Vec<u8> => Opaque, opaque_at, set_opaque_at, "opaque";
    }

    pub(crate) fn char_at(&self, pos: usize) -> Result<char> {
        numeric_match!(self,
            a => code_point(a.get_at(pos)?),
            c => c.get_at(pos),
            other => Err(other.forbidden("char")))
    }

    pub(crate) fn set_char_at(&self, pos: usize, value: char) -> Result<()> {
        numeric_match!(self,
            a => a.set_at(pos, NumericTarget::convert(u32::from(value))),
            c => c.set_at(pos, value),
            other => Err(other.forbidden("char")))
    }

    pub(crate) fn value_at(&self, pos: usize) -> Result<Value> {
        Ok(match self {
            Array::Boolean(a) => Value::Boolean(a.get_at(pos)?),
            Array::Byte(a) => Value::Byte(a.get_at(pos)?),
            Array::UByte(a) => Value::UByte(a.get_at(pos)?),
            Array::Short(a) => Value::Short(a.get_at(pos)?),
            Array::UShort(a) => Value::UShort(a.get_at(pos)?),
            Array::Int(a) => Value::Int(a.get_at(pos)?),
            Array::UInt(a) => Value::UInt(a.get_at(pos)?),
            Array::Long(a) => Value::Long(a.get_at(pos)?),
            Array::ULong(a) => Value::ULong(a.get_at(pos)?),
            Array::Float(a) => Value::Float(a.get_at(pos)?),
            Array::Double(a) => Value::Double(a.get_at(pos)?),
            Array::Char(a) => Value::Char(a.get_at(pos)?),
            Array::String(a) => Value::String(a.get_at(pos)?),
            Array::Opaque(a) => Value::Opaque(a.get_at(pos)?),
            Array::Object(a) => Value::Object(a.get_at(pos)?),
            Array::Structure(a) => Value::Structure(a.get_at(pos)?),
            Array::Sequence(a) => Value::Sequence(a.get_at(pos)?),
        })
    }

    /// Store a dynamic value. Values of this array's kind are stored as is;
    /// numeric values of another kind are converted, with unsigned values
    /// widened first so their magnitude survives.
    pub(crate) fn set_value_at(&self, pos: usize, value: Value) -> Result<()> {
        match (self, value) {
            (Array::Boolean(a), Value::Boolean(v)) => a.set_at(pos, v),
            (Array::Byte(a), Value::Byte(v)) => a.set_at(pos, v),
            (Array::UByte(a), Value::UByte(v)) => a.set_at(pos, v),
            (Array::Short(a), Value::Short(v)) => a.set_at(pos, v),
            (Array::UShort(a), Value::UShort(v)) => a.set_at(pos, v),
            (Array::Int(a), Value::Int(v)) => a.set_at(pos, v),
            (Array::UInt(a), Value::UInt(v)) => a.set_at(pos, v),
            (Array::Long(a), Value::Long(v)) => a.set_at(pos, v),
            (Array::ULong(a), Value::ULong(v)) => a.set_at(pos, v),
            (Array::Float(a), Value::Float(v)) => a.set_at(pos, v),
            (Array::Double(a), Value::Double(v)) => a.set_at(pos, v),
            (Array::Char(a), Value::Char(v)) => a.set_at(pos, v),
            (Array::String(a), Value::String(v)) => a.set_at(pos, v),
            (Array::Opaque(a), Value::Opaque(v)) => a.set_at(pos, v),
            (Array::Object(a), Value::Object(v))
            | (Array::Structure(a), Value::Structure(v))
            | (Array::Sequence(a), Value::Sequence(v)) => a.set_at(pos, v),
            (_, v @ (Value::UByte(_) | Value::UShort(_) | Value::UInt(_))) => {
                self.set_value_at(pos, v.widen_unsigned())
            }
            (_, Value::Byte(v)) => self.set_byte_at(pos, v),
            (_, Value::Short(v)) => self.set_short_at(pos, v),
            (_, Value::Int(v)) => self.set_int_at(pos, v),
            (_, Value::Long(v)) => self.set_long_at(pos, v),
            (_, Value::ULong(v)) if self.data_type().is_floating_point() => {
                self.set_double_at(pos, v as f64)
            }
            (_, Value::ULong(v)) => self.set_long_at(pos, v as i64),
            (_, Value::Float(v)) => self.set_float_at(pos, v),
            (_, Value::Double(v)) => self.set_double_at(pos, v),
            (_, Value::Char(v)) => self.set_char_at(pos, v),
            (_, v) => Err(self.forbidden(v.data_type().name())),
        }
    }

    indexed_access! {
        f64 => get_double, set_double, double_at, set_double_at;
        f32 => get_float, set_float, float_at, set_float_at;
        i64 => get_long, set_long, long_at, set_long_at;
        i32 => get_int, set_int, int_at, set_int_at;
        i16 => get_short, set_short, short_at, set_short_at;
        i8 => get_byte, set_byte, byte_at, set_byte_at;
        char => get_char, set_char, char_at, set_char_at;
        bool => get_boolean, set_boolean, boolean_at, set_boolean_at;
        String => get_string, set_string, string_at, set_string_at;
        Vec<u8> => get_opaque, set_opaque, opaque_at, set_opaque_at;
        Value => get_object, set_object, value_at, set_value_at;
    }
}

impl fmt::Display for Array {
    /// Elements in canonical order separated by spaces.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, pos) in Cursor::canonical(self.index()).enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            let value = self.value_at(pos).map_err(|_| fmt::Error)?;
            write!(f, "{value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::sync::Arc;

    fn arange_2x3() -> Array {
        Array::linear(DataType::Double, 6, 0.0, 1.0)
            .unwrap()
            .reshape(&[2, 3])
            .unwrap()
    }

    #[test]
    fn test_zeros_every_kind() {
        for kind in [
            DataType::Boolean,
            DataType::Byte,
            DataType::UByte,
            DataType::Short,
            DataType::UShort,
            DataType::Int,
            DataType::UInt,
            DataType::Long,
            DataType::ULong,
            DataType::Float,
            DataType::Double,
            DataType::Char,
            DataType::String,
            DataType::Opaque,
            DataType::Object,
            DataType::Structure,
            DataType::Sequence,
        ] {
            let a = Array::zeros(kind, &[2, 2]);
            assert_eq!(a.data_type(), kind);
            assert_eq!(a.size(), 4);
        }
    }

    #[test]
    fn test_numeric_conversions() {
        let a = Array::from_vec(&[3], vec![1.75f64, -2.5, 300.0]).unwrap();
        assert_eq!(a.get_int(&[0]).unwrap(), 1);
        assert_eq!(a.get_long(&[1]).unwrap(), -2);
        assert_eq!(a.get_byte(&[2]).unwrap(), 44);
        assert_eq!(a.get_short(&[2]).unwrap(), 300);
        assert_abs_diff_eq!(a.get_float(&[0]).unwrap(), 1.75f32);

        a.set_int(&[0], 7).unwrap();
        assert_eq!(a.get_double(&[0]).unwrap(), 7.0);
        a.set_char(&[1], 'A').unwrap();
        assert_eq!(a.get_double(&[1]).unwrap(), 65.0);
        assert_eq!(a.get_char(&[1]).unwrap(), 'A');
    }

    #[test]
    fn test_float_to_narrow_int_wraps_through_int() {
        let a = Array::from_vec(&[4], vec![70000.0f64, -129.0, 1e10, f64::NAN]).unwrap();
        assert_eq!(a.get_short(&[0]).unwrap(), 4464);
        assert_eq!(a.get_byte(&[0]).unwrap(), 112);
        assert_eq!(a.get_byte(&[1]).unwrap(), 127);
        assert_eq!(a.get_int(&[2]).unwrap(), i32::MAX);
        assert_eq!(a.get_short(&[2]).unwrap(), -1);
        assert_eq!(a.get_byte(&[3]).unwrap(), 0);

        let b = Array::zeros(DataType::Byte, &[1]);
        b.set_double(&[0], 300.0).unwrap();
        assert_eq!(b.get_int(&[0]).unwrap(), 44);
        let s = Array::zeros(DataType::UShort, &[1]);
        s.set_float(&[0], 70000.0).unwrap();
        assert_eq!(s.get_int(&[0]).unwrap(), 4464);
    }

    #[test]
    fn test_unsigned_magnitude() {
        let a = Array::from_vec(&[2], vec![0xFFu8, 0x80]).unwrap();
        assert_eq!(a.get_double(&[0]).unwrap(), 255.0);
        assert_eq!(a.get_int(&[1]).unwrap(), 128);
        assert_eq!(a.get_short(&[0]).unwrap(), 255);
        assert_eq!(a.get_byte(&[0]).unwrap(), -1);
        assert_eq!(a.to_string(), "255 128");

        let b = Array::from_vec(&[1], vec![u32::MAX]).unwrap();
        assert_eq!(b.get_long(&[0]).unwrap(), 4_294_967_295);
    }

    #[test]
    fn test_forbidden_conversions() {
        let flags = Array::from_vec(&[2], vec![true, false]).unwrap();
        assert!(matches!(
            flags.get_double(&[0]),
            Err(ArrayError::ForbiddenConversion {
                kind: DataType::Boolean,
                target: "double"
            })
        ));
        assert!(flags.set_int(&[0], 1).is_err());
        assert!(flags.get_boolean(&[0]).unwrap());

        let d = Array::zeros(DataType::Double, &[2]);
        assert!(d.get_boolean(&[0]).is_err());
        assert!(d.get_string(&[0]).is_err());
        assert!(d.set_opaque(&[0], vec![1]).is_err());

        let s = Array::from_vec(&[1], vec!["hi".to_string()]).unwrap();
        assert!(s.get_int(&[0]).is_err());
        assert_eq!(s.get_string(&[0]).unwrap(), "hi");

        let objects = Array::zeros(DataType::Structure, &[1]);
        assert!(objects.get_double(&[0]).is_err());
    }

    #[test]
    fn test_invalid_char_code() {
        let a = Array::from_vec(&[1], vec![0xD800i32]).unwrap();
        assert!(matches!(
            a.get_char(&[0]),
            Err(ArrayError::InvalidValue(_))
        ));
        let c = Array::zeros(DataType::Char, &[1]);
        assert!(c.set_int(&[0], 0xD800).is_err());
        c.set_int(&[0], 0x41).unwrap();
        assert_eq!(c.get_char(&[0]).unwrap(), 'A');
    }

    #[test]
    fn test_char_from_negative_or_non_finite() {
        let c = Array::zeros(DataType::Char, &[1]);
        for bad in [-1.0, -0.5, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                c.set_double(&[0], bad),
                Err(ArrayError::InvalidValue(_))
            ));
        }
        assert!(matches!(
            c.set_long(&[0], -65),
            Err(ArrayError::InvalidValue(_))
        ));
        assert_eq!(c.get_char(&[0]).unwrap(), '\0');
        c.set_double(&[0], 66.9).unwrap();
        assert_eq!(c.get_char(&[0]).unwrap(), 'B');

        let d = Array::from_vec(&[2], vec![-3.0f64, f64::NAN]).unwrap();
        assert!(matches!(d.get_char(&[0]), Err(ArrayError::InvalidValue(_))));
        assert!(matches!(d.get_char(&[1]), Err(ArrayError::InvalidValue(_))));
    }

    #[test]
    fn test_set_char_on_non_numeric() {
        let flags = Array::zeros(DataType::Boolean, &[1]);
        assert!(matches!(
            flags.set_char(&[0], 'x'),
            Err(ArrayError::ForbiddenConversion {
                kind: DataType::Boolean,
                target: "char"
            })
        ));
        let s = Array::zeros(DataType::String, &[1]);
        assert!(matches!(
            s.set_char(&[0], 'x'),
            Err(ArrayError::ForbiddenConversion {
                kind: DataType::String,
                target: "char"
            })
        ));
        let u = Array::zeros(DataType::UShort, &[1]);
        u.set_char(&[0], '\u{FFFF}').unwrap();
        assert_eq!(u.get_int(&[0]).unwrap(), 0xFFFF);
    }

    #[test]
    fn test_get_after_transpose() {
        let a = arange_2x3();
        assert_eq!(a.get_double(&[1, 2]).unwrap(), 5.0);
        let t = a.transpose(0, 1).unwrap();
        assert_eq!(t.shape(), &[3, 2]);
        assert_eq!(t.get_double(&[2, 1]).unwrap(), 5.0);
        assert!(t.shares_storage_with(&a));
    }

    #[test]
    fn test_section_from_text() {
        let a = Array::linear(DataType::Int, 125, 0.0, 1.0)
            .unwrap()
            .reshape(&[5, 5, 5])
            .unwrap();
        let s: Section = "(1:3,:,2)".parse().unwrap();
        let v = a.section(&s).unwrap();
        assert_eq!(v.shape(), &[3, 5]);
        assert_eq!(v.get_int(&[0, 0]).unwrap(), 25 + 2);
        assert_eq!(v.get_int(&[2, 4]).unwrap(), 75 + 20 + 2);

        let kept = a.section_no_reduce_origin(&[1, 0, 2], &[3, 5, 1], &[1, 1, 1]).unwrap();
        assert_eq!(kept.shape(), &[3, 5, 1]);
        assert_eq!(kept.get_int(&[2, 4, 0]).unwrap(), 97);
    }

    #[test]
    fn test_copy_and_sequence() {
        let a = arange_2x3();
        let c = a.flip(1).unwrap().copy().unwrap();
        assert_eq!(c.to_string(), "2 1 0 5 4 3");
        assert!(!c.shares_storage_with(&a));

        let seq = Array::zeros(DataType::Sequence, &[2]);
        assert!(matches!(seq.copy(), Err(ArrayError::UnsupportedView(_))));
    }

    #[test]
    fn test_from_values() {
        let a = Array::from_values(
            DataType::Double,
            &[2, 2],
            vec![
                Value::UByte(255),
                Value::Int(-3),
                Value::Float(0.5),
                Value::Char('a'),
            ],
        )
        .unwrap();
        assert_eq!(a.to_string(), "255 -3 0.5 97");

        assert!(Array::from_values(DataType::Int, &[2], vec![Value::Int(1)]).is_err());
        assert!(matches!(
            Array::from_values(DataType::Int, &[1], vec![Value::from("x")]),
            Err(ArrayError::ForbiddenConversion { .. })
        ));
    }

    #[test]
    fn test_ulong_value_into_floating_kinds() {
        let big = Array::from_values(DataType::Double, &[1], vec![Value::ULong(u64::MAX)]).unwrap();
        assert_eq!(big.get_double(&[0]).unwrap(), 1.8446744073709552e19);
        let same = Array::from_vec(&[1], vec![u64::MAX]).unwrap();
        assert_eq!(big.get_double(&[0]).unwrap(), same.get_double(&[0]).unwrap());

        let f = Array::constant(DataType::Float, &[2], Value::ULong(1 << 63)).unwrap();
        assert_eq!(f.get_float(&[1]).unwrap(), 2f32.powi(63));

        let l = Array::from_values(DataType::Long, &[1], vec![Value::ULong(u64::MAX)]).unwrap();
        assert_eq!(l.get_long(&[0]).unwrap(), -1);
    }

    #[test]
    fn test_to_values_covers_strided_view() {
        let a = Array::linear(DataType::Int, 12, 0.0, 1.0)
            .unwrap()
            .reshape(&[3, 4])
            .unwrap();
        let v = a
            .section(&"(0:2:2,1:3:2)".parse().unwrap())
            .unwrap()
            .transpose(0, 1)
            .unwrap();
        let values = v.to_values();
        assert_eq!(values.len(), v.size());
        assert_eq!(
            values,
            vec![Value::Int(1), Value::Int(9), Value::Int(3), Value::Int(11)]
        );
    }

    #[test]
    fn test_constant() {
        let c = Array::constant(DataType::Float, &[3, 2], Value::Double(1.5)).unwrap();
        assert_eq!(c.size(), 6);
        assert_eq!(c.get_float(&[2, 1]).unwrap(), 1.5);
        c.set_float(&[0, 0], 2.0).unwrap();
        assert_eq!(c.get_float(&[1, 1]).unwrap(), 2.0);
    }

    #[test]
    fn test_linear_and_parse() {
        let a = Array::linear(DataType::Short, 4, 10.0, -2.5).unwrap();
        assert_eq!(a.to_string(), "10 7 5 2");
        assert!(Array::linear(DataType::String, 2, 0.0, 1.0).is_err());

        let p = Array::parse_values(DataType::Int, &["1", " 2 ", "3.9"]).unwrap();
        assert_eq!(p.to_string(), "1 2 3");
        let l = Array::parse_values(DataType::Long, &["9007199254740993"]).unwrap();
        assert_eq!(l.get_long(&[0]).unwrap(), 9_007_199_254_740_993);
        let s = Array::parse_values(DataType::String, &["a b", "c"]).unwrap();
        assert_eq!(s.get_string(&[0]).unwrap(), "a b");
        assert!(matches!(
            Array::parse_values(DataType::Double, &["x"]),
            Err(ArrayError::InvalidValue(_))
        ));
        assert!(Array::parse_values(DataType::Object, &["x"]).is_err());
    }

    #[test]
    fn test_from_nested() {
        let n = Nested::List(vec![
            Nested::from(vec![Value::Int(1), Value::Int(2)]),
            Nested::from(vec![Value::Int(3), Value::Int(4)]),
        ]);
        let a = Array::from_nested(DataType::Long, &[2, 2], &n).unwrap();
        assert_eq!(a.get_long(&[1, 1]).unwrap(), 4);
        assert!(Array::from_nested(DataType::Long, &[4], &n).is_err());
    }

    #[test]
    fn test_objects() {
        let obj: ObjectRef = Arc::new("payload".to_string());
        let a = Array::from_objects(DataType::Object, &[2], vec![Some(obj.clone()), None]).unwrap();
        match a.get_object(&[0]).unwrap() {
            Value::Object(Some(o)) => {
                assert_eq!(o.downcast_ref::<String>().unwrap(), "payload")
            }
            other => panic!("unexpected {other:?}"),
        }
        a.set_object(&[1], Value::Object(Some(obj))).unwrap();
        assert_eq!(a.to_string(), "object object");
        assert!(Array::from_objects(DataType::Int, &[0], vec![]).is_err());
    }

    #[test]
    fn test_typed_access() {
        let a = Array::from_vec(&[2], vec![1i16, 2]).unwrap();
        assert_eq!(a.data_type(), DataType::Short);
        assert_eq!(a.typed::<i16>().unwrap().get(&[1]).unwrap(), 2);
        assert!(a.typed::<i32>().is_none());
        assert_eq!(a.copy_to_vec::<i16>().unwrap(), vec![1, 2]);
        assert!(a.copy_to_vec::<f64>().is_err());
    }

    #[test]
    fn test_shape_string_and_rank_plus_one() {
        let a = arange_2x3();
        assert_eq!(a.shape_string(), "(2,3)");
        let p = a.rank_plus_one();
        assert_eq!(p.shape_string(), "(1,2,3)");
        assert_eq!(p.get_double(&[0, 1, 2]).unwrap(), 5.0);
    }
}
