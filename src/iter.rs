//! Canonical-order traversal of arrays.
//!
//! Two cursors produce storage positions: a flat counter over consecutive
//! positions, valid for canonical (and, order aside, dense) layouts, and an
//! odometer over the shape that steps by the strides and carries into the
//! next dimension when one wraps.

use std::borrow::Cow;

use crate::{Array, ArrayError, Dims, Element, Index, Result, TypedArray, Value};

// ============================================================================
// Cursors
// ============================================================================

/// Odometer over an index, last dimension fastest.
#[derive(Debug, Clone)]
pub(crate) struct Odometer {
    shape: Dims<usize>,
    stride: Dims<isize>,
    counter: Dims<usize>,
    pos: isize,
    remaining: usize,
}

impl Odometer {
    fn new(index: &Index) -> Self {
        Self {
            shape: index.shape().iter().copied().collect(),
            stride: index.stride().iter().copied().collect(),
            counter: index.shape().iter().map(|_| 0).collect(),
            pos: index.offset() as isize,
            remaining: index.size(),
        }
    }

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let current = self.pos as usize;
        self.remaining -= 1;
        if self.remaining > 0 {
            for d in (0..self.shape.len()).rev() {
                self.counter[d] += 1;
                self.pos += self.stride[d];
                if self.counter[d] < self.shape[d] {
                    break;
                }
                self.pos -= self.stride[d] * self.shape[d] as isize;
                self.counter[d] = 0;
            }
        }
        Some(current)
    }
}

/// Produces the storage positions of an array's elements.
#[derive(Debug, Clone)]
pub(crate) enum Cursor {
    Flat { next: usize, end: usize },
    General(Odometer),
}

impl Cursor {
    /// Canonical order: flat when the index is fast, odometer otherwise.
    pub(crate) fn canonical(index: &Index) -> Self {
        if index.is_fast() {
            Cursor::Flat {
                next: index.offset(),
                end: index.offset() + index.size(),
            }
        } else {
            Cursor::General(Odometer::new(index))
        }
    }

    /// Memory order where the layout allows it. Dense layouts are walked as
    /// one block; anything with gaps falls back to the odometer.
    pub(crate) fn memory_order(index: &Index) -> Self {
        if index.is_fast() {
            return Cursor::canonical(index);
        }
        match index.memory_span() {
            Some((lo, hi)) if index.is_dense() => Cursor::Flat {
                next: lo,
                end: hi + 1,
            },
            _ => Cursor::General(Odometer::new(index)),
        }
    }

    #[inline]
    pub(crate) fn remaining(&self) -> usize {
        match self {
            Cursor::Flat { next, end } => end - next,
            Cursor::General(odo) => odo.remaining,
        }
    }
}

impl Iterator for Cursor {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        match self {
            Cursor::Flat { next, end } => {
                if *next >= *end {
                    return None;
                }
                let current = *next;
                *next += 1;
                Some(current)
            }
            Cursor::General(odo) => odo.next(),
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining();
        (n, Some(n))
    }
}

impl ExactSizeIterator for Cursor {}

// ============================================================================
// TypedIter
// ============================================================================

/// Iterator over the elements of a [`TypedArray`] in canonical order.
#[derive(Debug, Clone)]
pub struct TypedIter<'a, T> {
    array: &'a TypedArray<T>,
    cursor: Cursor,
}

impl<'a, T: Element> TypedIter<'a, T> {
    pub(crate) fn new(array: &'a TypedArray<T>) -> Self {
        Self {
            cursor: Cursor::canonical(array.index()),
            array,
        }
    }
}

impl<T: Element> Iterator for TypedIter<'_, T> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        let pos = self.cursor.next()?;
        // Every index is validated against its storage when built.
        Some(
            self.array
                .get_at(pos)
                .expect("view positions lie inside storage"),
        )
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.cursor.size_hint()
    }
}

impl<T: Element> ExactSizeIterator for TypedIter<'_, T> {}

// ============================================================================
// IndexIterator
// ============================================================================

/// Single-pass cursor over an [`Array`] with typed get/set access.
///
/// Each `*_next` call moves to the next element and reads or writes it;
/// `*_current` calls act on the element the last `*_next` moved to.
///
/// ```
/// use cdm_array::{Array, DataType};
///
/// let a = Array::zeros(DataType::Int, &[2, 2]);
/// let mut it = a.index_iterator();
/// let mut k = 0;
/// while it.has_next() {
///     it.set_int_next(k).unwrap();
///     k += 1;
/// }
/// assert_eq!(a.get_int(&[1, 0]).unwrap(), 2);
/// ```
#[derive(Debug)]
pub struct IndexIterator<'a> {
    array: Cow<'a, Array>,
    cursor: Cursor,
    current: Option<usize>,
    count: usize,
}

macro_rules! typed_access {
    ($($ty:ty => $get_next:ident, $set_next:ident, $get_cur:ident, $set_cur:ident,
        $get_at:ident, $set_at:ident;)*) => {
        $(
            pub fn $get_next(&mut self) -> Result<$ty> {
                let pos = self.advance()?;
                self.array.$get_at(pos)
            }

            pub fn $set_next(&mut self, value: $ty) -> Result<()> {
                let pos = self.advance()?;
                self.array.$set_at(pos, value)
            }

            pub fn $get_cur(&self) -> Result<$ty> {
                self.array.$get_at(self.position()?)
            }

            pub fn $set_cur(&self, value: $ty) -> Result<()> {
                self.array.$set_at(self.position()?, value)
            }
        )*
    };
}

impl<'a> IndexIterator<'a> {
    pub(crate) fn new(array: Cow<'a, Array>, cursor: Cursor) -> Self {
        Self {
            array,
            cursor,
            current: None,
            count: 0,
        }
    }

    /// True if another `*_next` call will succeed.
    #[inline]
    pub fn has_next(&self) -> bool {
        self.cursor.remaining() > 0
    }

    /// Number of elements not yet visited.
    #[inline]
    pub fn len(&self) -> usize {
        self.cursor.remaining()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Canonical multi-index of the current element.
    ///
    /// For iterators in memory order this is the position in visiting order,
    /// not the logical index of the element.
    pub fn current_counter(&self) -> Result<Vec<usize>> {
        if self.current.is_none() {
            return Err(ArrayError::IteratorExhausted);
        }
        self.array.index().coordinates(self.count - 1)
    }

    fn advance(&mut self) -> Result<usize> {
        let pos = self.cursor.next().ok_or(ArrayError::IteratorExhausted)?;
        self.current = Some(pos);
        self.count += 1;
        Ok(pos)
    }

    fn position(&self) -> Result<usize> {
        self.current.ok_or(ArrayError::IteratorExhausted)
    }

    typed_access! {
        f64 => get_double_next, set_double_next, get_double_current, set_double_current,
            double_at, set_double_at;
        f32 => get_float_next, set_float_next, get_float_current, set_float_current,
            float_at, set_float_at;
        i64 => get_long_next, set_long_next, get_long_current, set_long_current,
            long_at, set_long_at;
        i32 => get_int_next, set_int_next, get_int_current, set_int_current,
            int_at, set_int_at;
        i16 => get_short_next, set_short_next, get_short_current, set_short_current,
            short_at, set_short_at;
        i8 => get_byte_next, set_byte_next, get_byte_current, set_byte_current,
            byte_at, set_byte_at;
        char => get_char_next, set_char_next, get_char_current, set_char_current,
            char_at, set_char_at;
        bool => get_boolean_next, set_boolean_next, get_boolean_current, set_boolean_current,
            boolean_at, set_boolean_at;
        Value => get_object_next, set_object_next, get_object_current, set_object_current,
            value_at, set_value_at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_odometer_matches_coordinates() {
        let index = Index::new(&[2, 3, 4])
            .section(&"(:,0:2:2,1:3)".parse().unwrap())
            .unwrap();
        let expected: Vec<usize> = (0..index.size())
            .map(|n| index.element_offset(&index.coordinates(n).unwrap()).unwrap())
            .collect();
        let got: Vec<usize> = Cursor::canonical(&index).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_flat_cursor_for_fast_index() {
        let index = Index::new(&[2, 2]);
        let cursor = Cursor::canonical(&index);
        assert!(matches!(cursor, Cursor::Flat { .. }));
        assert_eq!(cursor.collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_memory_order_cursor() {
        let index = Index::new(&[2, 3]).transpose(0, 1).unwrap();
        let cursor = Cursor::memory_order(&index);
        assert!(matches!(cursor, Cursor::Flat { .. }));
        assert_eq!(cursor.len(), 6);

        let strided = Index::new(&[6]).section(&"(0:4:2)".parse().unwrap()).unwrap();
        let cursor = Cursor::memory_order(&strided);
        assert!(matches!(cursor, Cursor::General(_)));
        assert_eq!(cursor.collect::<Vec<_>>(), vec![0, 2, 4]);
    }

    #[test]
    fn test_empty_and_scalar_cursors() {
        assert_eq!(Cursor::canonical(&Index::new(&[3, 0])).count(), 0);
        assert_eq!(
            Cursor::canonical(Index::scalar()).collect::<Vec<_>>(),
            vec![0]
        );
        let constant = Index::constant(&[2, 2]);
        assert_eq!(Cursor::canonical(&constant).collect::<Vec<_>>(), vec![0; 4]);
    }

    #[test]
    fn test_index_iterator_protocol() {
        let a = Array::from_vec(&[3], vec![1.0f64, 2.0, 3.0]).unwrap();
        let mut it = a.index_iterator();
        assert!(matches!(
            it.get_double_current(),
            Err(ArrayError::IteratorExhausted)
        ));
        assert_eq!(it.len(), 3);
        assert_eq!(it.get_double_next().unwrap(), 1.0);
        assert_eq!(it.current_counter().unwrap(), vec![0]);
        it.set_double_current(10.0).unwrap();
        assert_eq!(it.get_int_next().unwrap(), 2);
        assert_eq!(it.get_double_next().unwrap(), 3.0);
        assert!(!it.has_next());
        assert!(matches!(
            it.get_double_next(),
            Err(ArrayError::IteratorExhausted)
        ));
        assert_eq!(a.get_double(&[0]).unwrap(), 10.0);
    }

    #[test]
    fn test_typed_iter_yields_every_element() {
        let t = TypedArray::from_fn(&[4, 6], |idx| (idx[0] * 6 + idx[1]) as i32);
        let view = t
            .section(&"(1:3,0:5:2)".parse().unwrap())
            .unwrap()
            .flip(1)
            .unwrap();
        let it = view.iter();
        assert_eq!(it.len(), 9);
        let got: Vec<i32> = it.collect();
        assert_eq!(got, vec![10, 8, 6, 16, 14, 12, 22, 20, 18]);
        assert_eq!(got, view.to_vec());
    }

    #[test]
    fn test_index_iterator_objects() {
        let a = Array::from_vec(&[2], vec!["x".to_string(), "y".to_string()]).unwrap();
        let mut it = a.index_iterator();
        assert_eq!(it.get_object_next().unwrap(), Value::from("x"));
        it.set_object_current(Value::from("z")).unwrap();
        assert_eq!(a.get_string(&[0]).unwrap(), "z");
        assert!(it.get_double_next().is_err());
    }
}
