//! Monotonic integer ranges selecting a subset of one dimension.
//!
//! A [`Range`] is the immutable triple `(first, last, stride)` with a positive
//! stride. Ranges are the building blocks of a [`Section`](crate::Section):
//! one range per dimension describes which logical indices a view keeps.

use std::fmt;

use crate::{ArrayError, Result};

/// An immutable, optionally named sequence `first, first + stride, ..., last`.
///
/// The range is empty when `last == first - 1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Range {
    name: Option<String>,
    first: usize,
    len: usize,
    stride: usize,
}

impl Range {
    /// The range with no elements.
    pub const EMPTY: Range = Range {
        name: None,
        first: 0,
        len: 0,
        stride: 1,
    };

    /// Create the range `first..=last` stepping by `stride`.
    ///
    /// `last` is rounded down to the last element actually reached, so
    /// `Range::new(0, 10, 3)` holds `0, 3, 6, 9`.
    ///
    /// # Errors
    /// Returns [`ArrayError::InvalidRange`] if `first < 0`, `last < first - 1`
    /// or `stride < 1`.
    pub fn new(first: isize, last: isize, stride: isize) -> Result<Self> {
        if first < 0 {
            return Err(ArrayError::InvalidRange(format!(
                "first ({first}) must be >= 0"
            )));
        }
        if last < first - 1 {
            return Err(ArrayError::InvalidRange(format!(
                "last ({last}) must be >= first - 1 ({})",
                first - 1
            )));
        }
        if stride < 1 {
            return Err(ArrayError::InvalidRange(format!(
                "stride ({stride}) must be >= 1"
            )));
        }
        let len = if last < first {
            0
        } else {
            ((last - first) / stride + 1) as usize
        };
        Ok(Self {
            name: None,
            first: first as usize,
            len,
            stride: stride as usize,
        })
    }

    /// Create a named range. See [`Range::new`].
    pub fn named(name: impl Into<String>, first: isize, last: isize, stride: isize) -> Result<Self> {
        Ok(Self::new(first, last, stride)?.with_name(name))
    }

    /// The whole extent `0..=len-1` of a dimension of length `len`.
    pub fn with_length(len: usize) -> Self {
        Self {
            name: None,
            first: 0,
            len,
            stride: 1,
        }
    }

    /// Create a range from its first element, element count and stride.
    pub fn from_first_len(first: usize, len: usize, stride: usize) -> Result<Self> {
        if stride == 0 {
            return Err(ArrayError::InvalidRange("stride (0) must be >= 1".into()));
        }
        Ok(Self {
            name: None,
            first,
            len,
            stride,
        })
    }

    /// Return a copy of this range carrying `name`.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    pub fn first(&self) -> usize {
        self.first
    }

    /// The last element, or `first - 1` for an empty range.
    #[inline]
    pub fn last(&self) -> isize {
        self.first as isize + (self.len as isize - 1) * self.stride as isize
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Smallest element (strides are always positive).
    #[inline]
    pub fn min(&self) -> usize {
        self.first
    }

    /// Largest element, or `first - 1` for an empty range.
    #[inline]
    pub fn max(&self) -> isize {
        self.last()
    }

    /// The `i`-th element of the range.
    pub fn element(&self, i: usize) -> Result<usize> {
        if i >= self.len {
            return Err(ArrayError::InvalidRange(format!(
                "element {i} requested from range of length {}",
                self.len
            )));
        }
        Ok(self.first + i * self.stride)
    }

    /// The position of `elem` within the range; the inverse of [`Range::element`].
    pub fn index(&self, elem: usize) -> Result<usize> {
        if !self.contains(elem) {
            return Err(ArrayError::InvalidRange(format!(
                "{elem} is not an element of {self}"
            )));
        }
        Ok((elem - self.first) / self.stride)
    }

    /// True if `i` is one of the elements of this range.
    pub fn contains(&self, i: usize) -> bool {
        if self.is_empty() || i < self.min() || i as isize > self.max() {
            return false;
        }
        self.stride == 1 || (i - self.first) % self.stride == 0
    }

    /// The smallest element that is `>= start`, or `None` if `start` is past
    /// the last element.
    pub fn first_in_interval(&self, start: usize) -> Option<usize> {
        if self.is_empty() || start as isize > self.last() {
            return None;
        }
        if start <= self.first {
            return Some(self.first);
        }
        if self.stride == 1 {
            return Some(start);
        }
        let steps = (start - self.first).div_ceil(self.stride);
        Some(self.first + steps * self.stride)
    }

    /// Apply `r`, whose elements are positions inside `self`, and return the
    /// absolute elements it selects.
    ///
    /// ```
    /// use cdm_array::Range;
    ///
    /// let base = Range::new(10, 28, 2).unwrap(); // 10, 12, ..., 28
    /// let want = Range::new(1, 5, 2).unwrap(); // positions 1, 3, 5
    /// let r = base.compose(&want).unwrap();
    /// assert_eq!(r.iter().collect::<Vec<_>>(), vec![12, 16, 20]);
    /// ```
    pub fn compose(&self, r: &Range) -> Result<Range> {
        if self.is_empty() || r.is_empty() {
            return Ok(Range::EMPTY);
        }
        let first = self.element(r.first)?;
        // Validates that r stays inside self.
        self.element(r.last() as usize)?;
        Ok(Range {
            name: self.name.clone(),
            first,
            len: r.len,
            stride: self.stride * r.stride,
        })
    }

    /// Elements present in both ranges. The result strides by the least common
    /// multiple of the two strides.
    pub fn intersect(&self, r: &Range) -> Range {
        if self.is_empty() || r.is_empty() {
            return Range::EMPTY;
        }
        let lo = self.first.max(r.first);
        let hi = self.last().min(r.last());
        if lo as isize > hi {
            return Range::EMPTY;
        }
        let stride = lcm(self.stride, r.stride);
        let Some(mut candidate) = self.first_in_interval(lo) else {
            return Range::EMPTY;
        };
        // Common elements repeat every `stride`, so one period of candidates is enough.
        for _ in 0..stride / self.stride {
            if candidate as isize > hi {
                break;
            }
            if r.contains(candidate) {
                let len = (hi - candidate as isize) as usize / stride + 1;
                return Range {
                    name: self.name.clone(),
                    first: candidate,
                    len,
                    stride,
                };
            }
            candidate += self.stride;
        }
        Range::EMPTY
    }

    /// True if the two ranges share at least one element.
    pub fn intersects(&self, r: &Range) -> bool {
        !self.intersect(r).is_empty()
    }

    /// The smallest range covering both ranges. Both must share a stride
    /// and lie on the same lattice of that stride.
    pub fn union(&self, r: &Range) -> Result<Range> {
        if r.is_empty() {
            return Ok(self.clone());
        }
        if self.is_empty() {
            return Ok(r.clone());
        }
        if self.stride != r.stride {
            return Err(ArrayError::InvalidRange(format!(
                "cannot union ranges with strides {} and {}",
                self.stride, r.stride
            )));
        }
        if self.first.abs_diff(r.first) % self.stride != 0 {
            return Err(ArrayError::InvalidRange(format!(
                "cannot union {self} and {r}: firsts are out of phase for stride {}",
                self.stride
            )));
        }
        let first = self.first.min(r.first) as isize;
        let last = self.last().max(r.last());
        let mut result = Range::new(first, last, self.stride as isize)?;
        result.name = self.name.clone();
        Ok(result)
    }

    /// Move the range by `delta`, keeping length and stride.
    pub fn shift_origin(&self, delta: isize) -> Result<Range> {
        let first = self.first as isize + delta;
        if first < 0 {
            return Err(ArrayError::InvalidRange(format!(
                "shifting {self} by {delta} gives negative first ({first})"
            )));
        }
        Ok(Range {
            name: self.name.clone(),
            first: first as usize,
            len: self.len,
            stride: self.stride,
        })
    }

    /// The range `0..=len-1` with stride 1: same length, renormalized origin.
    pub fn compact(&self) -> Range {
        Range {
            name: self.name.clone(),
            first: 0,
            len: self.len,
            stride: 1,
        }
    }

    /// Iterate over the elements in increasing order.
    pub fn iter(&self) -> RangeIter {
        RangeIter {
            next: self.first,
            remaining: self.len,
            stride: self.stride,
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.first, self.last())?;
        if self.stride > 1 {
            write!(f, ":{}", self.stride)?;
        }
        Ok(())
    }
}

/// Iterator over the elements of a [`Range`].
#[derive(Debug, Clone)]
pub struct RangeIter {
    next: usize,
    remaining: usize,
    stride: usize,
}

impl Iterator for RangeIter {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let value = self.next;
        self.next += self.stride;
        self.remaining -= 1;
        Some(value)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for RangeIter {}

impl<'a> IntoIterator for &'a Range {
    type Item = usize;
    type IntoIter = RangeIter;

    fn into_iter(self) -> RangeIter {
        self.iter()
    }
}

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

fn lcm(a: usize, b: usize) -> usize {
    a / gcd(a, b) * b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_and_len() {
        let r = Range::new(2, 8, 3).unwrap();
        assert_eq!(r.first(), 2);
        assert_eq!(r.last(), 8);
        assert_eq!(r.len(), 3);
        assert_eq!(r.iter().collect::<Vec<_>>(), vec![2, 5, 8]);

        // last is rounded down to the last reachable element
        let r = Range::new(0, 10, 3).unwrap();
        assert_eq!(r.last(), 9);
        assert_eq!(r.len(), 4);
    }

    #[test]
    fn test_empty_range() {
        let r = Range::new(4, 3, 1).unwrap();
        assert!(r.is_empty());
        assert_eq!(r.last(), 3);
        assert_eq!(r.iter().count(), 0);
        assert!(Range::EMPTY.is_empty());
    }

    #[test]
    fn test_new_rejects_bad_arguments() {
        assert!(matches!(
            Range::new(-1, 3, 1),
            Err(ArrayError::InvalidRange(_))
        ));
        assert!(matches!(
            Range::new(5, 3, 1),
            Err(ArrayError::InvalidRange(_))
        ));
        assert!(matches!(
            Range::new(0, 3, 0),
            Err(ArrayError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_element_and_index() {
        let r = Range::new(3, 15, 4).unwrap();
        assert_eq!(r.element(0).unwrap(), 3);
        assert_eq!(r.element(3).unwrap(), 15);
        assert!(r.element(4).is_err());
        assert_eq!(r.index(11).unwrap(), 2);
        assert!(r.index(12).is_err());
    }

    #[test]
    fn test_contains() {
        let r = Range::new(1, 9, 2).unwrap();
        assert!(r.contains(1));
        assert!(r.contains(7));
        assert!(!r.contains(4));
        assert!(!r.contains(0));
        assert!(!r.contains(11));
        assert!(!Range::EMPTY.contains(0));
    }

    #[test]
    fn test_first_in_interval() {
        let r = Range::new(2, 20, 5).unwrap(); // 2, 7, 12, 17
        assert_eq!(r.first_in_interval(0), Some(2));
        assert_eq!(r.first_in_interval(3), Some(7));
        assert_eq!(r.first_in_interval(7), Some(7));
        assert_eq!(r.first_in_interval(13), Some(17));
        assert_eq!(r.first_in_interval(18), None);

        let unit = Range::new(4, 9, 1).unwrap();
        assert_eq!(unit.first_in_interval(6), Some(6));
    }

    #[test]
    fn test_compose() {
        let base = Range::new(5, 14, 1).unwrap();
        let want = Range::new(2, 6, 2).unwrap();
        let r = base.compose(&want).unwrap();
        assert_eq!(r.iter().collect::<Vec<_>>(), vec![7, 9, 11]);
        assert_eq!(r.stride(), 2);

        let too_long = Range::new(0, 10, 1).unwrap();
        assert!(base.compose(&too_long).is_err());
        assert!(base.compose(&Range::EMPTY).unwrap().is_empty());
    }

    #[test]
    fn test_intersect() {
        let a = Range::new(0, 20, 2).unwrap();
        let b = Range::new(3, 30, 3).unwrap();
        let c = a.intersect(&b);
        assert_eq!(c.iter().collect::<Vec<_>>(), vec![6, 12, 18]);
        assert_eq!(c.stride(), 6);

        let d = Range::new(0, 4, 1).unwrap();
        let e = Range::new(5, 9, 1).unwrap();
        assert!(d.intersect(&e).is_empty());
        assert!(!d.intersects(&e));

        let odd = Range::new(1, 11, 2).unwrap();
        let even = Range::new(0, 10, 2).unwrap();
        assert!(odd.intersect(&even).is_empty());
    }

    #[test]
    fn test_union() {
        let a = Range::new(0, 4, 1).unwrap();
        let b = Range::new(3, 9, 1).unwrap();
        let u = a.union(&b).unwrap();
        assert_eq!((u.first(), u.last()), (0, 9));
        assert!(a.union(&Range::new(0, 4, 2).unwrap()).is_err());
        assert_eq!(Range::EMPTY.union(&a).unwrap(), a);

        let even = Range::new(0, 4, 2).unwrap();
        assert!(matches!(
            even.union(&Range::new(1, 5, 2).unwrap()),
            Err(ArrayError::InvalidRange(_))
        ));
        let u = even.union(&Range::new(2, 8, 2).unwrap()).unwrap();
        assert_eq!((u.first(), u.last(), u.stride()), (0, 8, 2));
        assert_eq!(u.iter().collect::<Vec<_>>(), vec![0, 2, 4, 6, 8]);
    }

    #[test]
    fn test_shift_origin_and_compact() {
        let r = Range::new(4, 10, 3).unwrap().with_name("time");
        let s = r.shift_origin(-4).unwrap();
        assert_eq!(s.iter().collect::<Vec<_>>(), vec![0, 3, 6]);
        assert!(r.shift_origin(-5).is_err());

        let c = r.compact();
        assert_eq!((c.first(), c.last(), c.stride()), (0, 2, 1));
        assert_eq!(c.name(), Some("time"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Range::new(1, 3, 1).unwrap().to_string(), "1:3");
        assert_eq!(Range::new(0, 8, 4).unwrap().to_string(), "0:8:4");
        assert_eq!(Range::with_length(0).to_string(), "0:-1");
    }
}
