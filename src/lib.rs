//! In-memory multidimensional arrays with zero-copy strided views.
//!
//! An array holds homogeneous data of one element kind, addressed by an
//! N-dimensional logical index. Sections, slices, flips, transposes and
//! permutations are views: they build a new [`Index`] (shape, stride, offset)
//! over the same shared [`Storage`] and never copy elements.
//!
//! # Core Types
//!
//! - [`Range`] / [`Section`]: which subset of each dimension to keep, with a
//!   text grammar such as `"(1:3,:,2)"`
//! - [`Index`]: the shape/stride algebra mapping logical indices to storage positions
//! - [`TypedArray`]: an N-D container over one Rust element type
//! - [`Array`]: the closed set of element kinds with the typed access and
//!   conversion rules (`get_double`, `set_int`, ...)
//! - [`IndexIterator`]: canonical-order traversal with the get/set-next protocol
//!
//! # Example
//!
//! ```rust
//! use cdm_array::{Array, DataType, Section};
//!
//! let a = Array::linear(DataType::Double, 6, 0.0, 1.0)
//!     .unwrap()
//!     .reshape(&[2, 3])
//!     .unwrap();
//! assert_eq!(a.get_double(&[1, 2]).unwrap(), 5.0);
//!
//! // Views share storage
//! let t = a.transpose(0, 1).unwrap();
//! assert_eq!(t.get_double(&[2, 1]).unwrap(), 5.0);
//! t.set_double(&[0, 0], -1.0).unwrap();
//! assert_eq!(a.get_double(&[0, 0]).unwrap(), -1.0);
//!
//! // Sections from text
//! let s: Section = "(1,0:2:2)".parse().unwrap();
//! let row = a.section(&s).unwrap();
//! assert_eq!(row.shape(), &[2]);
//! assert_eq!(row.to_string(), "3 5");
//! ```
//!
//! # Iteration strategies
//!
//! A freshly allocated array has the canonical layout (last dimension
//! fastest, no gaps) and is iterated with a single flat counter. Any derived
//! view is iterated with an odometer that recomputes the storage position
//! from the strides. [`Array::index_iterator_fast`] additionally walks
//! flipped or permuted whole arrays in memory order when the visiting order
//! does not matter.

mod array;
mod element;
mod index;
mod iter;
mod range;
mod section;
mod storage;
mod typed;

// ============================================================================
// Index algebra
// ============================================================================
pub use index::{row_major_strides, Index};
pub use range::{Range, RangeIter};
pub use section::{Section, SectionIter};

// ============================================================================
// Arrays and element kinds
// ============================================================================
pub use array::Array;
pub use element::{DataType, Element, NativeKind, Nested, ObjectRef, Value};
pub use storage::Storage;
pub use typed::TypedArray;

// ============================================================================
// Iteration
// ============================================================================
pub use iter::{IndexIterator, TypedIter};

// ============================================================================
// Constants
// ============================================================================

/// Inline capacity of the shape and stride vectors.
///
/// Indexes of rank up to this value keep their shape and stride on the stack.
pub const INLINE_RANK: usize = 8;

pub(crate) type Dims<T> = smallvec::SmallVec<[T; INLINE_RANK]>;

// ============================================================================
// Error types
// ============================================================================

/// Errors raised by range, section, index and array operations.
#[derive(Debug, thiserror::Error)]
pub enum ArrayError {
    /// A range or section is malformed or does not fit a shape.
    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// Dimension argument outside `0..rank`, or not a permutation.
    #[error("invalid axis {axis} for rank {rank}")]
    InvalidAxis { axis: usize, rank: usize },

    /// Section-spec text that does not follow the grammar.
    #[error("illegal selector '{token}' in section spec '{spec}'")]
    IllegalSelector { token: String, spec: String },

    /// Element access outside the shape or with the wrong number of indices.
    #[error("index {index:?} out of bounds for shape {shape:?}")]
    IndexOutOfBounds { index: Vec<usize>, shape: Vec<usize> },

    /// The element kind cannot be read or written as the requested type.
    #[error("cannot access {kind} data as {target}")]
    ForbiddenConversion {
        kind: DataType,
        target: &'static str,
    },

    /// Element counts differ.
    #[error("size mismatch: expected {expected}, got {got}")]
    SizeMismatch { expected: usize, got: usize },

    /// The operation has no meaning for this array.
    #[error("unsupported view operation: {0}")]
    UnsupportedView(String),

    /// An index would reach outside its storage.
    #[error("offset overflow while computing storage position")]
    OffsetOverflow,

    /// Iterator read past the end, or `current` before the first `next`.
    #[error("iterator exhausted")]
    IteratorExhausted,

    /// Text that does not parse as the requested element kind.
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

/// Result type for array operations.
pub type Result<T> = std::result::Result<T, ArrayError>;
