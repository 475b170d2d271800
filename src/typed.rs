//! N-D container over one Rust element type.

use std::fmt;

use crate::iter::Cursor;
use crate::{
    ArrayError, Element, Index, Nested, Range, Result, Section, Storage, TypedIter,
};

/// An [`Index`] paired with a handle to shared [`Storage`].
///
/// Views produced by `section`, `slice`, `flip`, `transpose`, `permute` and
/// `reduce` share the storage of the array they come from. Only the
/// constructors, [`TypedArray::copy`] and [`TypedArray::reshape`] allocate.
///
/// ```
/// use cdm_array::TypedArray;
///
/// let a = TypedArray::from_fn(&[2, 3], |idx| (idx[0] * 10 + idx[1]) as i32);
/// let col = a.slice(1, 2).unwrap();
/// assert_eq!(col.to_vec(), vec![2, 12]);
///
/// col.set(&[1], -1).unwrap();
/// assert_eq!(a.get(&[1, 2]).unwrap(), -1);
/// ```
#[derive(Clone)]
pub struct TypedArray<T> {
    storage: Storage<T>,
    index: Index,
}

impl<T> fmt::Debug for TypedArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedArray")
            .field("index", &self.index)
            .field("storage", &self.storage)
            .finish()
    }
}

impl<T: Element> TypedArray<T> {
    // ========================================================================
    // Construction
    // ========================================================================

    /// Canonical array of `shape` filled with [`Element::zero`].
    pub fn zeros(shape: &[usize]) -> Self {
        let size: usize = shape.iter().product();
        log::debug!("allocating {size} elements for shape {shape:?}");
        Self {
            storage: Storage::new(vec![T::zero(); size]),
            index: Index::new(shape),
        }
    }

    /// Canonical array over `data`, which must hold exactly `Π shape` elements.
    pub fn from_vec(shape: &[usize], data: Vec<T>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(ArrayError::SizeMismatch {
                expected,
                got: data.len(),
            });
        }
        log::debug!("wrapping {expected} elements as shape {shape:?}");
        Ok(Self {
            storage: Storage::new(data),
            index: Index::new(shape),
        })
    }

    /// Canonical array with values produced by `f`, called in canonical order.
    pub fn from_fn(shape: &[usize], mut f: impl FnMut(&[usize]) -> T) -> Self {
        let total: usize = shape.iter().product();
        let rank = shape.len();
        let mut data = Vec::with_capacity(total);
        let mut idx = vec![0usize; rank];
        for _ in 0..total {
            data.push(f(&idx));
            for d in (0..rank).rev() {
                idx[d] += 1;
                if idx[d] < shape[d] {
                    break;
                }
                idx[d] = 0;
            }
        }
        log::debug!("allocating {total} elements for shape {shape:?}");
        Self {
            storage: Storage::new(data),
            index: Index::new(shape),
        }
    }

    /// View an existing buffer through `index`.
    ///
    /// # Errors
    /// `OffsetOverflow` if some element of `index` lies outside `storage`.
    pub fn from_parts(storage: Storage<T>, index: Index) -> Result<Self> {
        index.validate_bounds(storage.len())?;
        Ok(Self { storage, index })
    }

    /// Every element of `shape` reads `value`; one element of storage backs them all.
    pub fn constant(shape: &[usize], value: T) -> Self {
        Self {
            storage: Storage::new(vec![value]),
            index: Index::constant(shape),
        }
    }

    /// Rank-0 array holding `value`.
    pub fn scalar(value: T) -> Self {
        Self {
            storage: Storage::new(vec![value]),
            index: Index::scalar().clone(),
        }
    }

    /// Build from nested lists; the shape comes from the first branch at
    /// every depth.
    ///
    /// # Errors
    /// `SizeMismatch` if the lists are ragged.
    pub fn from_nested(nested: &Nested<T>) -> Result<Self> {
        let shape = nested.shape();
        let mut data = Vec::with_capacity(shape.iter().product());
        nested.visit(&shape, &mut |v| {
            data.push(v.clone());
            Ok(())
        })?;
        Self::from_vec(&shape, data)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    #[inline]
    pub fn index(&self) -> &Index {
        &self.index
    }

    #[inline]
    pub fn storage(&self) -> &Storage<T> {
        &self.storage
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        self.index.shape()
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.index.rank()
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.index.size()
    }

    /// True when both arrays alias the same storage.
    pub fn shares_storage_with(&self, other: &TypedArray<T>) -> bool {
        self.storage.ptr_eq(&other.storage)
    }

    // ========================================================================
    // Element access
    // ========================================================================

    pub fn get(&self, idx: &[usize]) -> Result<T> {
        self.storage.get(self.index.element_offset(idx)?)
    }

    pub fn set(&self, idx: &[usize], value: T) -> Result<()> {
        self.storage.set(self.index.element_offset(idx)?, value)
    }

    #[inline]
    pub fn get_n<const N: usize>(&self, idx: [usize; N]) -> Result<T> {
        self.storage.get(self.index.element_offset_n(idx)?)
    }

    #[inline]
    pub fn set_n<const N: usize>(&self, idx: [usize; N], value: T) -> Result<()> {
        self.storage.set(self.index.element_offset_n(idx)?, value)
    }

    #[inline]
    pub(crate) fn get_at(&self, pos: usize) -> Result<T> {
        self.storage.get(pos)
    }

    #[inline]
    pub(crate) fn set_at(&self, pos: usize, value: T) -> Result<()> {
        self.storage.set(pos, value)
    }

    /// Write `value` to every element of this view.
    pub fn fill(&self, value: T) {
        let index = &self.index;
        self.storage.write(|data| {
            if index.is_fast() {
                data[index.offset()..index.offset() + index.size()].fill(value);
            } else {
                for pos in Cursor::canonical(index) {
                    data[pos] = value.clone();
                }
            }
        });
    }

    /// Elements in canonical order.
    pub fn iter(&self) -> TypedIter<'_, T> {
        TypedIter::new(self)
    }

    /// Contents in canonical order, read under a single lock.
    pub fn to_vec(&self) -> Vec<T> {
        let index = &self.index;
        self.storage.read(|data| {
            if index.is_fast() {
                data[index.offset()..index.offset() + index.size()].to_vec()
            } else {
                Cursor::canonical(index).map(|pos| data[pos].clone()).collect()
            }
        })
    }

    /// Fresh canonical storage with the same contents.
    pub fn copy(&self) -> TypedArray<T> {
        let data = self.to_vec();
        log::debug!("copying {} elements of shape {:?}", data.len(), self.shape());
        Self {
            storage: Storage::new(data),
            index: Index::new(self.shape()),
        }
    }

    /// Copy laid out with a new shape of the same size.
    pub fn reshape(&self, shape: &[usize]) -> Result<TypedArray<T>> {
        self.check_reshape(shape)?;
        Self::from_vec(shape, self.to_vec())
    }

    /// Reinterpret a canonical array's storage with a new shape.
    ///
    /// # Errors
    /// `UnsupportedView` if this array is not in canonical layout,
    /// `SizeMismatch` if the sizes differ.
    pub fn reshape_no_copy(&self, shape: &[usize]) -> Result<TypedArray<T>> {
        if !self.index.is_fast() {
            return Err(ArrayError::UnsupportedView(
                "reshape without copy needs a canonical layout".into(),
            ));
        }
        self.check_reshape(shape)?;
        Ok(self.with_index(Index::new(shape)))
    }

    fn check_reshape(&self, shape: &[usize]) -> Result<()> {
        let got: usize = shape.iter().product();
        if got != self.size() {
            return Err(ArrayError::SizeMismatch {
                expected: self.size(),
                got,
            });
        }
        Ok(())
    }

    // ========================================================================
    // Views
    // ========================================================================

    fn with_index(&self, index: Index) -> TypedArray<T> {
        Self {
            storage: self.storage.clone(),
            index,
        }
    }

    /// Restrict to `section`, dropping dimensions of length 1.
    pub fn section(&self, section: &Section) -> Result<TypedArray<T>> {
        Ok(self.with_index(self.index.section(section)?))
    }

    /// Restrict to `section`, keeping every dimension.
    pub fn section_no_reduce(&self, section: &Section) -> Result<TypedArray<T>> {
        Ok(self.with_index(self.index.section_no_reduce(section)?))
    }

    /// Fix dimension `dim` at `value`, lowering the rank by one.
    pub fn slice(&self, dim: usize, value: usize) -> Result<TypedArray<T>> {
        if dim >= self.rank() {
            return Err(ArrayError::InvalidAxis {
                axis: dim,
                rank: self.rank(),
            });
        }
        let mut ranges = vec![None; self.rank()];
        ranges[dim] = Some(Range::new(value as isize, value as isize, 1)?);
        let index = self
            .index
            .section_no_reduce(&Section::new(ranges))?
            .reduce_dim(dim)?;
        Ok(self.with_index(index))
    }

    pub fn flip(&self, dim: usize) -> Result<TypedArray<T>> {
        Ok(self.with_index(self.index.flip(dim)?))
    }

    pub fn transpose(&self, d1: usize, d2: usize) -> Result<TypedArray<T>> {
        Ok(self.with_index(self.index.transpose(d1, d2)?))
    }

    pub fn permute(&self, dims: &[usize]) -> Result<TypedArray<T>> {
        Ok(self.with_index(self.index.permute(dims)?))
    }

    /// Drop every dimension of length 1.
    pub fn reduce(&self) -> TypedArray<T> {
        self.with_index(self.index.reduce())
    }

    pub fn reduce_dim(&self, dim: usize) -> Result<TypedArray<T>> {
        Ok(self.with_index(self.index.reduce_dim(dim)?))
    }

    /// View with a leading dimension of length 1.
    pub fn rank_plus_one(&self) -> TypedArray<T> {
        self.with_index(self.index.prepend_dim())
    }

    /// Hand each slice along `dim` to a rayon worker.
    ///
    /// The slices are disjoint views of the same storage, so `f` may write
    /// through them.
    #[cfg(feature = "parallel")]
    pub fn par_for_each_slice<F>(&self, dim: usize, f: F) -> Result<()>
    where
        F: Fn(usize, TypedArray<T>) + Send + Sync,
    {
        use rayon::prelude::*;

        let n = self.shape().get(dim).copied().ok_or(ArrayError::InvalidAxis {
            axis: dim,
            rank: self.rank(),
        })?;
        let slices = (0..n)
            .map(|k| self.slice(dim, k))
            .collect::<Result<Vec<_>>>()?;
        slices
            .into_par_iter()
            .enumerate()
            .for_each(|(k, slice)| f(k, slice));
        Ok(())
    }
}

impl<'a, T: Element> IntoIterator for &'a TypedArray<T> {
    type Item = T;
    type IntoIter = TypedIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
