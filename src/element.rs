//! Element kinds: the closed set of data types an array can hold.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::{Array, ArrayError, Result, TypedArray};

/// Shared handle to an arbitrary object stored in object, structure or
/// sequence arrays.
pub type ObjectRef = Arc<dyn Any + Send + Sync>;

/// The element kind of an [`Array`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Boolean,
    Byte,
    UByte,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    Float,
    Double,
    Char,
    String,
    Opaque,
    Object,
    Structure,
    Sequence,
}

impl DataType {
    pub fn name(self) -> &'static str {
        match self {
            DataType::Boolean => "boolean",
            DataType::Byte => "byte",
            DataType::UByte => "ubyte",
            DataType::Short => "short",
            DataType::UShort => "ushort",
            DataType::Int => "int",
            DataType::UInt => "uint",
            DataType::Long => "long",
            DataType::ULong => "ulong",
            DataType::Float => "float",
            DataType::Double => "double",
            DataType::Char => "char",
            DataType::String => "String",
            DataType::Opaque => "opaque",
            DataType::Object => "object",
            DataType::Structure => "Structure",
            DataType::Sequence => "Sequence",
        }
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            DataType::UByte | DataType::UShort | DataType::UInt | DataType::ULong
        )
    }

    /// Integer and floating-point kinds.
    pub fn is_numeric(self) -> bool {
        self.is_integral() || self.is_floating_point()
    }

    pub fn is_integral(self) -> bool {
        matches!(
            self,
            DataType::Byte
                | DataType::UByte
                | DataType::Short
                | DataType::UShort
                | DataType::Int
                | DataType::UInt
                | DataType::Long
                | DataType::ULong
        )
    }

    pub fn is_floating_point(self) -> bool {
        matches!(self, DataType::Float | DataType::Double)
    }

    /// Size in bytes of one element, for fixed-size kinds.
    pub fn size(self) -> Option<usize> {
        match self {
            DataType::Boolean | DataType::Byte | DataType::UByte => Some(1),
            DataType::Short | DataType::UShort | DataType::Char => Some(2),
            DataType::Int | DataType::UInt | DataType::Float => Some(4),
            DataType::Long | DataType::ULong | DataType::Double => Some(8),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Element
// ============================================================================

/// A type that can be stored in a [`TypedArray`].
pub trait Element: Clone + Send + Sync + fmt::Debug + 'static {
    /// Fill value for freshly allocated storage.
    fn zero() -> Self;
}

macro_rules! impl_element_default {
    ($($t:ty),* $(,)?) => {
        $(
            impl Element for $t {
                #[inline]
                fn zero() -> Self {
                    <$t>::default()
                }
            }
        )*
    };
}

impl_element_default!(bool, i8, u8, i16, u16, i32, u32, i64, u64, f32, f64, String, Vec<u8>);

impl Element for char {
    #[inline]
    fn zero() -> Self {
        '\0'
    }
}

impl Element for Option<ObjectRef> {
    #[inline]
    fn zero() -> Self {
        None
    }
}

/// Element types that map to exactly one [`DataType`].
pub trait NativeKind: Element {
    const KIND: DataType;

    fn wrap(array: TypedArray<Self>) -> Array;

    fn unwrap(array: &Array) -> Option<&TypedArray<Self>>;

    fn into_value(self) -> Value;
}

// ============================================================================
// Value
// ============================================================================

/// A single element of any kind.
#[derive(Clone)]
pub enum Value {
    Boolean(bool),
    Byte(i8),
    UByte(u8),
    Short(i16),
    UShort(u16),
    Int(i32),
    UInt(u32),
    Long(i64),
    ULong(u64),
    Float(f32),
    Double(f64),
    Char(char),
    String(String),
    Opaque(Vec<u8>),
    Object(Option<ObjectRef>),
    Structure(Option<ObjectRef>),
    Sequence(Option<ObjectRef>),
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Boolean(_) => DataType::Boolean,
            Value::Byte(_) => DataType::Byte,
            Value::UByte(_) => DataType::UByte,
            Value::Short(_) => DataType::Short,
            Value::UShort(_) => DataType::UShort,
            Value::Int(_) => DataType::Int,
            Value::UInt(_) => DataType::UInt,
            Value::Long(_) => DataType::Long,
            Value::ULong(_) => DataType::ULong,
            Value::Float(_) => DataType::Float,
            Value::Double(_) => DataType::Double,
            Value::Char(_) => DataType::Char,
            Value::String(_) => DataType::String,
            Value::Opaque(_) => DataType::Opaque,
            Value::Object(_) => DataType::Object,
            Value::Structure(_) => DataType::Structure,
            Value::Sequence(_) => DataType::Sequence,
        }
    }

    /// Promote an unsigned value to the next wider signed kind so that its
    /// magnitude survives: ubyte to short, ushort to int, uint to long.
    pub fn widen_unsigned(self) -> Value {
        match self {
            Value::UByte(v) => Value::Short(i16::from(v)),
            Value::UShort(v) => Value::Int(i32::from(v)),
            Value::UInt(v) => Value::Long(i64::from(v)),
            other => other,
        }
    }

    /// The value as `f64`, for numeric and char kinds.
    pub fn as_f64(&self) -> Result<f64> {
        Ok(match *self {
            Value::Byte(v) => f64::from(v),
            Value::UByte(v) => f64::from(v),
            Value::Short(v) => f64::from(v),
            Value::UShort(v) => f64::from(v),
            Value::Int(v) => f64::from(v),
            Value::UInt(v) => f64::from(v),
            Value::Long(v) => v as f64,
            Value::ULong(v) => v as f64,
            Value::Float(v) => f64::from(v),
            Value::Double(v) => v,
            Value::Char(c) => f64::from(u32::from(c)),
            _ => {
                return Err(ArrayError::ForbiddenConversion {
                    kind: self.data_type(),
                    target: "double",
                })
            }
        })
    }

    /// The value as `i64`, for integral and char kinds.
    pub fn as_i64(&self) -> Result<i64> {
        Ok(match *self {
            Value::Byte(v) => i64::from(v),
            Value::UByte(v) => i64::from(v),
            Value::Short(v) => i64::from(v),
            Value::UShort(v) => i64::from(v),
            Value::Int(v) => i64::from(v),
            Value::UInt(v) => i64::from(v),
            Value::Long(v) => v,
            Value::ULong(v) => v as i64,
            Value::Char(c) => i64::from(u32::from(c)),
            Value::Float(_) | Value::Double(_) => self.as_f64()? as i64,
            _ => {
                return Err(ArrayError::ForbiddenConversion {
                    kind: self.data_type(),
                    target: "long",
                })
            }
        })
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::UByte(a), Value::UByte(b)) => a == b,
            (Value::Short(a), Value::Short(b)) => a == b,
            (Value::UShort(a), Value::UShort(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::UInt(a), Value::UInt(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::ULong(a), Value::ULong(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Opaque(a), Value::Opaque(b)) => a == b,
            (Value::Object(a), Value::Object(b))
            | (Value::Structure(a), Value::Structure(b))
            | (Value::Sequence(a), Value::Sequence(b)) => match (a, b) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            },
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({self})", self.data_type())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Byte(v) => write!(f, "{v}"),
            Value::UByte(v) => write!(f, "{v}"),
            Value::Short(v) => write!(f, "{v}"),
            Value::UShort(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Long(v) => write!(f, "{v}"),
            Value::ULong(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Char(v) => write!(f, "{v}"),
            Value::String(v) => f.write_str(v),
            Value::Opaque(bytes) => {
                f.write_str("0x")?;
                for b in bytes {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
            Value::Object(obj) | Value::Structure(obj) | Value::Sequence(obj) => {
                f.write_str(if obj.is_some() { "object" } else { "null" })
            }
        }
    }
}

macro_rules! impl_value_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_value_from!(
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

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

// ============================================================================
// Nested
// ============================================================================

/// Nested native data: a scalar leaf or a list of sub-trees.
///
/// Used to build arrays from data whose shape is given by its nesting,
/// e.g. `List([List([1, 2]), List([3, 4])])` has shape `[2, 2]`.
#[derive(Debug, Clone, PartialEq)]
pub enum Nested<T> {
    Scalar(T),
    List(Vec<Nested<T>>),
}

impl<T> Nested<T> {
    /// Shape inferred from the first branch at every depth.
    pub fn shape(&self) -> Vec<usize> {
        let mut shape = Vec::new();
        let mut node = self;
        while let Nested::List(items) = node {
            shape.push(items.len());
            match items.first() {
                Some(first) => node = first,
                None => break,
            }
        }
        shape
    }

    /// Visit the leaves in canonical order, checking that the tree has
    /// exactly `shape`.
    pub(crate) fn visit(&self, shape: &[usize], f: &mut impl FnMut(&T) -> Result<()>) -> Result<()> {
        match (self, shape.split_first()) {
            (Nested::Scalar(v), None) => f(v),
            (Nested::Scalar(_), Some((&n, _))) => Err(ArrayError::SizeMismatch {
                expected: n,
                got: 1,
            }),
            (Nested::List(items), None) => Err(ArrayError::SizeMismatch {
                expected: 1,
                got: items.len(),
            }),
            (Nested::List(items), Some((&n, rest))) => {
                if items.len() != n {
                    return Err(ArrayError::SizeMismatch {
                        expected: n,
                        got: items.len(),
                    });
                }
                items.iter().try_for_each(|item| item.visit(rest, f))
            }
        }
    }
}

impl<T> From<Vec<T>> for Nested<T> {
    fn from(items: Vec<T>) -> Self {
        Nested::List(items.into_iter().map(Nested::Scalar).collect())
    }
}
