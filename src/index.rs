//! Shape/stride algebra mapping logical indices to storage positions.

use std::sync::OnceLock;

use crate::{ArrayError, Dims, Result, Section};

/// Compute row-major strides (last index varies fastest).
pub fn row_major_strides(dims: &[usize]) -> Vec<isize> {
    let rank = dims.len();
    if rank == 0 {
        return vec![];
    }
    let mut strides = vec![1isize; rank];
    for i in (0..rank - 1).rev() {
        strides[i] = strides[i + 1] * dims[i + 1] as isize;
    }
    strides
}

/// Layout of an N-D array over linear storage.
///
/// The storage position of logical index `idx` is
/// `offset + Σ idx[d] * stride[d]`. Derived indexes (sections, flips,
/// transposes, ...) are new values; an `Index` never changes after it is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    shape: Dims<usize>,
    stride: Dims<isize>,
    offset: usize,
    size: usize,
    names: Option<Vec<Option<String>>>,
    fast: bool,
}

impl Index {
    /// Canonical row-major layout starting at position 0.
    pub fn new(shape: &[usize]) -> Self {
        Self {
            shape: shape.iter().copied().collect(),
            stride: row_major_strides(shape).into_iter().collect(),
            offset: 0,
            size: shape.iter().product(),
            names: None,
            fast: true,
        }
    }

    /// Arbitrary layout. The index is fast only when `stride` is the
    /// canonical row-major stride of `shape` and `offset` is 0.
    ///
    /// # Errors
    /// `InvalidRange` if the lengths differ, `OffsetOverflow` if some element
    /// would sit at a negative position.
    pub fn with_strides(shape: &[usize], stride: &[isize], offset: usize) -> Result<Self> {
        if shape.len() != stride.len() {
            return Err(ArrayError::InvalidRange(format!(
                "stride length {} does not match rank {}",
                stride.len(),
                shape.len()
            )));
        }
        let fast = offset == 0 && stride == row_major_strides(shape).as_slice();
        let index = Self {
            shape: shape.iter().copied().collect(),
            stride: stride.iter().copied().collect(),
            offset,
            size: shape.iter().product(),
            names: None,
            fast,
        };
        index.memory_span_checked()?;
        Ok(index)
    }

    /// Every logical index maps to position 0.
    pub fn constant(shape: &[usize]) -> Self {
        Self {
            shape: shape.iter().copied().collect(),
            stride: shape.iter().map(|_| 0).collect(),
            offset: 0,
            size: shape.iter().product(),
            names: None,
            fast: false,
        }
    }

    /// The shared rank-0 index.
    pub fn scalar() -> &'static Index {
        static SCALAR: OnceLock<Index> = OnceLock::new();
        SCALAR.get_or_init(|| Index::new(&[]))
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    pub fn stride(&self) -> &[isize] {
        &self.stride
    }

    /// Storage position of the logical origin.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of logical elements.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// True when the layout is canonical and a flat counter visits the
    /// elements in logical order.
    #[inline]
    pub fn is_fast(&self) -> bool {
        self.fast
    }

    /// Name of dimension `d`, if any.
    pub fn name(&self, d: usize) -> Option<&str> {
        self.names.as_ref()?.get(d)?.as_deref()
    }

    /// Return a copy with dimension `d` named `name`.
    pub fn with_name(&self, d: usize, name: impl Into<String>) -> Result<Index> {
        self.check_axis(d)?;
        let mut result = self.clone();
        let names = result.names.get_or_insert_with(|| vec![None; self.rank()]);
        names[d] = Some(name.into());
        Ok(result)
    }

    fn check_axis(&self, d: usize) -> Result<()> {
        if d >= self.rank() {
            return Err(ArrayError::InvalidAxis {
                axis: d,
                rank: self.rank(),
            });
        }
        Ok(())
    }

    fn out_of_bounds(&self, idx: &[usize]) -> ArrayError {
        ArrayError::IndexOutOfBounds {
            index: idx.to_vec(),
            shape: self.shape.to_vec(),
        }
    }

    // ========================================================================
    // Element offsets
    // ========================================================================

    /// Storage position of `idx`.
    ///
    /// # Errors
    /// `IndexOutOfBounds` if `idx` has the wrong length or any entry is
    /// outside its dimension.
    pub fn element_offset(&self, idx: &[usize]) -> Result<usize> {
        if idx.len() != self.rank() {
            return Err(self.out_of_bounds(idx));
        }
        let mut pos = self.offset as isize;
        for ((&i, &n), &s) in idx.iter().zip(&self.shape).zip(&self.stride) {
            if i >= n {
                return Err(self.out_of_bounds(idx));
            }
            pos += i as isize * s;
        }
        Ok(pos as usize)
    }

    /// Fixed-rank variant of [`Index::element_offset`].
    #[inline]
    pub fn element_offset_n<const N: usize>(&self, idx: [usize; N]) -> Result<usize> {
        if N != self.rank() {
            return Err(self.out_of_bounds(&idx));
        }
        let mut pos = self.offset as isize;
        for d in 0..N {
            if idx[d] >= self.shape[d] {
                return Err(self.out_of_bounds(&idx));
            }
            pos += idx[d] as isize * self.stride[d];
        }
        Ok(pos as usize)
    }

    /// The multi-index of the `n`-th element in canonical order.
    pub fn coordinates(&self, n: usize) -> Result<Vec<usize>> {
        if n >= self.size {
            return Err(ArrayError::IndexOutOfBounds {
                index: vec![n],
                shape: vec![self.size],
            });
        }
        let mut coords = vec![0; self.rank()];
        let mut rest = n;
        for d in (0..self.rank()).rev() {
            coords[d] = rest % self.shape[d];
            rest /= self.shape[d];
        }
        Ok(coords)
    }

    // ========================================================================
    // Memory layout
    // ========================================================================

    fn memory_span_checked(&self) -> Result<Option<(usize, usize)>> {
        if self.size == 0 {
            return Ok(None);
        }
        let mut min = self.offset as isize;
        let mut max = self.offset as isize;
        for (&n, &s) in self.shape.iter().zip(&self.stride) {
            let end = s
                .checked_mul(n as isize - 1)
                .ok_or(ArrayError::OffsetOverflow)?;
            if end >= 0 {
                max = max.checked_add(end).ok_or(ArrayError::OffsetOverflow)?;
            } else {
                min = min.checked_add(end).ok_or(ArrayError::OffsetOverflow)?;
            }
        }
        if min < 0 {
            return Err(ArrayError::OffsetOverflow);
        }
        Ok(Some((min as usize, max as usize)))
    }

    /// Lowest and highest storage positions the index can reach, or `None`
    /// for an empty index.
    pub fn memory_span(&self) -> Option<(usize, usize)> {
        self.memory_span_checked().ok().flatten()
    }

    /// Check that every reachable position is below `len`.
    pub(crate) fn validate_bounds(&self, len: usize) -> Result<()> {
        match self.memory_span_checked()? {
            Some((_, max)) if max >= len => Err(ArrayError::OffsetOverflow),
            _ => Ok(()),
        }
    }

    /// True when the elements occupy a gap-free block of exactly `size`
    /// positions, i.e. a flipped or permuted canonical layout.
    pub fn is_dense(&self) -> bool {
        if self.size == 0 {
            return false;
        }
        let mut dims: Vec<(usize, usize)> = self
            .shape
            .iter()
            .zip(&self.stride)
            .filter(|&(&n, _)| n > 1)
            .map(|(&n, &s)| (s.unsigned_abs(), n))
            .collect();
        dims.sort_unstable();
        let mut expected = 1;
        for (stride, n) in dims {
            if stride != expected {
                return false;
            }
            expected *= n;
        }
        true
    }

    // ========================================================================
    // Derived indexes
    // ========================================================================

    /// Restrict to `section`, dropping dimensions whose range has length 1.
    pub fn section(&self, section: &Section) -> Result<Index> {
        self.section_impl(section, true)
    }

    /// Restrict to `section`, keeping every dimension.
    pub fn section_no_reduce(&self, section: &Section) -> Result<Index> {
        self.section_impl(section, false)
    }

    fn section_impl(&self, section: &Section, reduce: bool) -> Result<Index> {
        section.check_in_range(&self.shape)?;
        let mut shape = Dims::new();
        let mut stride = Dims::new();
        let mut names = Vec::with_capacity(self.rank());
        let mut offset = self.offset as isize;
        for d in 0..self.rank() {
            let name = self.name(d).map(str::to_string);
            match section.range(d) {
                None => {
                    shape.push(self.shape[d]);
                    stride.push(self.stride[d]);
                    names.push(name);
                }
                Some(r) => {
                    if !r.is_empty() {
                        offset += self.stride[d] * r.first() as isize;
                    }
                    if reduce && r.len() == 1 {
                        continue;
                    }
                    shape.push(r.len());
                    stride.push(self.stride[d] * r.stride() as isize);
                    names.push(r.name().map(str::to_string).or(name));
                }
            }
        }
        let offset = usize::try_from(offset).map_err(|_| ArrayError::OffsetOverflow)?;
        log::trace!("section {section} of {:?} gives shape {:?}", self.shape, shape);
        Ok(Index {
            size: shape.iter().product(),
            shape,
            stride,
            offset,
            names: collect_names(names),
            fast: false,
        })
    }

    /// Drop every dimension of length 1.
    pub fn reduce(&self) -> Index {
        if !self.shape.contains(&1) {
            return self.clone();
        }
        let keep: Vec<usize> = (0..self.rank()).filter(|&d| self.shape[d] != 1).collect();
        self.select_dims(&keep, self.fast)
    }

    /// Drop dimension `d`, which must have length 1.
    pub fn reduce_dim(&self, d: usize) -> Result<Index> {
        self.check_axis(d)?;
        if self.shape[d] != 1 {
            return Err(ArrayError::InvalidRange(format!(
                "cannot reduce dimension {d} of length {}",
                self.shape[d]
            )));
        }
        let keep: Vec<usize> = (0..self.rank()).filter(|&k| k != d).collect();
        Ok(self.select_dims(&keep, self.fast))
    }

    fn select_dims(&self, dims: &[usize], fast: bool) -> Index {
        let names = self
            .names
            .as_ref()
            .map(|names| dims.iter().map(|&d| names[d].clone()).collect());
        Index {
            shape: dims.iter().map(|&d| self.shape[d]).collect(),
            stride: dims.iter().map(|&d| self.stride[d]).collect(),
            offset: self.offset,
            size: self.size,
            names,
            fast,
        }
    }

    /// Reverse dimension `d`.
    pub fn flip(&self, d: usize) -> Result<Index> {
        self.check_axis(d)?;
        let mut result = self.clone();
        if self.shape[d] > 0 {
            let shift = self.stride[d] * (self.shape[d] as isize - 1);
            result.offset = usize::try_from(self.offset as isize + shift)
                .map_err(|_| ArrayError::OffsetOverflow)?;
        }
        result.stride[d] = -self.stride[d];
        result.fast = false;
        log::trace!("flip dimension {d} of {:?}", self.shape);
        Ok(result)
    }

    /// Swap dimensions `d1` and `d2`.
    pub fn transpose(&self, d1: usize, d2: usize) -> Result<Index> {
        self.check_axis(d1)?;
        self.check_axis(d2)?;
        let mut result = self.clone();
        result.shape.swap(d1, d2);
        result.stride.swap(d1, d2);
        if let Some(names) = result.names.as_mut() {
            names.swap(d1, d2);
        }
        result.fast = false;
        Ok(result)
    }

    /// Reorder dimensions: dimension `k` of the result is `dims[k]` of `self`.
    pub fn permute(&self, dims: &[usize]) -> Result<Index> {
        let rank = self.rank();
        if dims.len() != rank {
            return Err(ArrayError::InvalidAxis {
                axis: dims.len(),
                rank,
            });
        }
        let mut seen = vec![false; rank];
        for &p in dims {
            if p >= rank || seen[p] {
                return Err(ArrayError::InvalidAxis { axis: p, rank });
            }
            seen[p] = true;
        }
        let identity = dims.iter().enumerate().all(|(k, &p)| k == p);
        Ok(self.select_dims(dims, self.fast && identity))
    }

    /// Insert a length-1 dimension at position `d` (`0..=rank`).
    pub fn insert_dim(&self, d: usize) -> Result<Index> {
        if d > self.rank() {
            return Err(ArrayError::InvalidAxis {
                axis: d,
                rank: self.rank(),
            });
        }
        Ok(self.inserted_dim(d))
    }

    /// Insert a length-1 dimension in front.
    pub fn prepend_dim(&self) -> Index {
        self.inserted_dim(0)
    }

    fn inserted_dim(&self, d: usize) -> Index {
        let stride = if d < self.rank() {
            self.stride[d] * self.shape[d] as isize
        } else {
            1
        };
        let mut result = self.clone();
        result.shape.insert(d, 1);
        result.stride.insert(d, stride);
        if let Some(names) = result.names.as_mut() {
            names.insert(d, None);
        }
        result
    }
}

fn collect_names(names: Vec<Option<String>>) -> Option<Vec<Option<String>>> {
    names.iter().any(Option::is_some).then_some(names)
}
