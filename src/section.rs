//! Multi-dimensional selections: one optional [`Range`] per dimension.
//!
//! A `None` entry selects the whole dimension; its extent is only known once
//! the section is matched against a shape (see [`Section::fill`]).

use std::fmt;
use std::str::FromStr;

use crate::{row_major_strides, ArrayError, Range, Result};

/// An ordered list of per-dimension ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Section {
    ranges: Vec<Option<Range>>,
}

impl Section {
    pub fn new(ranges: Vec<Option<Range>>) -> Self {
        Self { ranges }
    }

    /// A section where every dimension has an explicit range.
    pub fn from_ranges(ranges: Vec<Range>) -> Self {
        Self {
            ranges: ranges.into_iter().map(Some).collect(),
        }
    }

    /// The whole array of the given shape.
    pub fn from_shape(shape: &[usize]) -> Self {
        Self::from_ranges(shape.iter().map(|&n| Range::with_length(n)).collect())
    }

    /// `shape[d]` elements starting at `origin[d]` in each dimension.
    pub fn from_origin_shape(origin: &[usize], shape: &[usize]) -> Result<Self> {
        let stride = vec![1; shape.len()];
        Self::from_origin_shape_stride(origin, shape, &stride)
    }

    /// `shape[d]` elements starting at `origin[d]`, stepping by `stride[d]`.
    pub fn from_origin_shape_stride(
        origin: &[usize],
        shape: &[usize],
        stride: &[usize],
    ) -> Result<Self> {
        if origin.len() != shape.len() || stride.len() != shape.len() {
            return Err(ArrayError::InvalidRange(format!(
                "origin ({}), shape ({}) and stride ({}) lengths differ",
                origin.len(),
                shape.len(),
                stride.len()
            )));
        }
        let ranges = origin
            .iter()
            .zip(shape)
            .zip(stride)
            .map(|((&o, &n), &s)| Range::from_first_len(o, n, s))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_ranges(ranges))
    }

    /// Replace `None` entries with the full extent of `shape`.
    ///
    /// A missing section becomes the whole shape. A section that already has
    /// a range in every dimension is returned unchanged.
    pub fn fill(section: Option<&Section>, shape: &[usize]) -> Result<Section> {
        let Some(section) = section else {
            return Ok(Section::from_shape(shape));
        };
        section.check_in_range(shape)?;
        if section.is_complete() {
            return Ok(section.clone());
        }
        let ranges = section
            .ranges
            .iter()
            .zip(shape)
            .map(|(r, &n)| Some(r.clone().unwrap_or_else(|| Range::with_length(n))))
            .collect();
        Ok(Section::new(ranges))
    }

    /// Check that the section fits `shape`: same rank and every range ends
    /// inside its dimension.
    pub fn check_in_range(&self, shape: &[usize]) -> Result<()> {
        if self.rank() != shape.len() {
            return Err(ArrayError::InvalidRange(format!(
                "number of ranges in section ({}) must be = {}",
                self.rank(),
                shape.len()
            )));
        }
        for (d, (r, &n)) in self.ranges.iter().zip(shape).enumerate() {
            let Some(r) = r else { continue };
            if r.first() > n || r.last() >= n as isize {
                return Err(ArrayError::InvalidRange(format!(
                    "range {r} for dimension {d} exceeds its length {n}"
                )));
            }
        }
        Ok(())
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.ranges.len()
    }

    #[inline]
    pub fn ranges(&self) -> &[Option<Range>] {
        &self.ranges
    }

    /// The range of dimension `i`, or `None` if it selects everything.
    pub fn range(&self, i: usize) -> Option<&Range> {
        self.ranges.get(i).and_then(Option::as_ref)
    }

    /// True when every dimension has an explicit range.
    pub fn is_complete(&self) -> bool {
        self.ranges.iter().all(Option::is_some)
    }

    /// True when any range steps by more than one.
    pub fn is_strided(&self) -> bool {
        self.ranges.iter().flatten().any(|r| r.stride() > 1)
    }

    fn complete_ranges(&self) -> Result<Vec<&Range>> {
        self.ranges
            .iter()
            .enumerate()
            .map(|(d, r)| {
                r.as_ref().ok_or_else(|| {
                    ArrayError::InvalidRange(format!("dimension {d} of {self} has no range"))
                })
            })
            .collect()
    }

    /// Length of every range. Fails if any dimension is `None`.
    pub fn shape(&self) -> Result<Vec<usize>> {
        Ok(self.complete_ranges()?.iter().map(|r| r.len()).collect())
    }

    /// First element of every range. Fails if any dimension is `None`.
    pub fn origin(&self) -> Result<Vec<usize>> {
        Ok(self.complete_ranges()?.iter().map(|r| r.first()).collect())
    }

    /// Stride of every range. Fails if any dimension is `None`.
    pub fn strides(&self) -> Result<Vec<usize>> {
        Ok(self.complete_ranges()?.iter().map(|r| r.stride()).collect())
    }

    /// Number of selected elements. Fails if any dimension is `None`.
    pub fn compute_size(&self) -> Result<usize> {
        Ok(self.complete_ranges()?.iter().map(|r| r.len()).product())
    }

    /// First range carrying `name`.
    pub fn find(&self, name: &str) -> Option<&Range> {
        self.ranges.iter().flatten().find(|r| r.name() == Some(name))
    }

    fn check_rank(&self, other: usize) -> Result<()> {
        if self.rank() != other {
            return Err(ArrayError::InvalidRange(format!(
                "section rank {} does not match {other}",
                self.rank()
            )));
        }
        Ok(())
    }

    /// Every range compacted to `0..=len-1`; `None` stays `None`.
    pub fn compact(&self) -> Section {
        Section::new(
            self.ranges
                .iter()
                .map(|r| r.as_ref().map(Range::compact))
                .collect(),
        )
    }

    /// Apply `want`, expressed relative to this section, and return the
    /// absolute selection. `None` in `want` keeps this section's range.
    pub fn compose(&self, want: &Section) -> Result<Section> {
        self.check_rank(want.rank())?;
        let ranges = self
            .ranges
            .iter()
            .zip(&want.ranges)
            .map(|(base, w)| match (base, w) {
                (_, None) => Ok(base.clone()),
                (None, Some(w)) => Ok(Some(w.clone())),
                (Some(b), Some(w)) => b.compose(w).map(Some),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Section::new(ranges))
    }

    /// Per-dimension intersection. `None` acts as the whole dimension.
    pub fn intersect(&self, other: &Section) -> Result<Section> {
        self.check_rank(other.rank())?;
        let ranges = self
            .ranges
            .iter()
            .zip(&other.ranges)
            .map(|(a, b)| match (a, b) {
                (Some(a), Some(b)) => Some(a.intersect(b)),
                (Some(r), None) | (None, Some(r)) => Some(r.clone()),
                (None, None) => None,
            })
            .collect();
        Ok(Section::new(ranges))
    }

    /// Per-dimension union. `None` absorbs the other side.
    pub fn union(&self, other: &Section) -> Result<Section> {
        self.check_rank(other.rank())?;
        let ranges = self
            .ranges
            .iter()
            .zip(&other.ranges)
            .map(|(a, b)| match (a, b) {
                (Some(a), Some(b)) => a.union(b).map(Some),
                _ => Ok(None),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Section::new(ranges))
    }

    /// Express this section relative to the origin of `new_origin`.
    pub fn shift_origin(&self, new_origin: &Section) -> Result<Section> {
        self.check_rank(new_origin.rank())?;
        let deltas: Vec<isize> = new_origin
            .ranges
            .iter()
            .map(|r| r.as_ref().map_or(0, |r| -(r.first() as isize)))
            .collect();
        self.shift_origin_by(&deltas)
    }

    /// Move every range by `deltas[d]`.
    pub fn shift_origin_by(&self, deltas: &[isize]) -> Result<Section> {
        self.check_rank(deltas.len())?;
        let ranges = self
            .ranges
            .iter()
            .zip(deltas)
            .map(|(r, &delta)| r.as_ref().map(|r| r.shift_origin(delta)).transpose())
            .collect::<Result<Vec<_>>>()?;
        Ok(Section::new(ranges))
    }

    /// True if every dimension overlaps. `None` overlaps anything.
    pub fn intersects(&self, other: &Section) -> Result<bool> {
        self.check_rank(other.rank())?;
        Ok(self
            .ranges
            .iter()
            .zip(&other.ranges)
            .all(|(a, b)| match (a, b) {
                (Some(a), Some(b)) => a.intersects(b),
                _ => true,
            }))
    }

    /// True if `other`'s bounding box lies inside this one's. Strides are ignored.
    pub fn contains(&self, other: &Section) -> bool {
        self.rank() == other.rank()
            && self
                .ranges
                .iter()
                .zip(&other.ranges)
                .all(|(a, b)| match (a, b) {
                    (None, _) => true,
                    (Some(_), None) => false,
                    (Some(a), Some(b)) => a.first() <= b.first() && a.last() >= b.last(),
                })
    }

    /// Canonical element offset, within the elements this section selects,
    /// of the origin of `intersect`.
    pub fn offset(&self, intersect: &Section) -> Result<usize> {
        self.check_rank(intersect.rank())?;
        let base = self.complete_ranges()?;
        let mut result = 0;
        let mut stride = 1;
        for d in (0..base.len()).rev() {
            let first = intersect.range(d).map_or(base[d].first(), Range::first);
            result += base[d].index(first)? * stride;
            stride *= base[d].len();
        }
        Ok(result)
    }

    /// True if the section selects the whole of `shape` with unit stride.
    pub fn equivalent(&self, shape: &[usize]) -> Result<bool> {
        self.check_rank(shape.len())?;
        Ok(self.ranges.iter().zip(shape).all(|(r, &n)| match r {
            None => true,
            Some(r) => r.first() == 0 && r.len() == n && (n <= 1 || r.stride() == 1),
        }))
    }

    /// Same rank and same length in every dimension.
    pub fn equal_shape(&self, other: &Section) -> bool {
        match (self.shape(), other.shape()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }

    /// Same size and same shape once length-1 dimensions are dropped.
    pub fn conformal(&self, other: &Section) -> bool {
        match (self.compute_size(), other.compute_size()) {
            (Ok(a), Ok(b)) if a == b => self.reduce().equal_shape(&other.reduce()),
            _ => false,
        }
    }

    /// Drop every range of length 1.
    pub fn reduce(&self) -> Section {
        Section::new(
            self.ranges
                .iter()
                .filter(|r| r.as_ref().map_or(true, |r| r.len() != 1))
                .cloned()
                .collect(),
        )
    }

    /// Name the ranges in order. `None` entries are left unnamed.
    pub fn with_range_names<S: AsRef<str>>(&self, names: &[S]) -> Result<Section> {
        self.check_rank(names.len())?;
        let ranges = self
            .ranges
            .iter()
            .zip(names)
            .map(|(r, name)| r.clone().map(|r| r.with_name(name.as_ref())))
            .collect();
        Ok(Section::new(ranges))
    }

    /// Dimensions `start..end` as a new section.
    pub fn sub_section(&self, start: usize, end: usize) -> Result<Section> {
        if start > end || end > self.rank() {
            return Err(ArrayError::InvalidRange(format!(
                "sub-section {start}..{end} of rank {} section",
                self.rank()
            )));
        }
        Ok(Section::new(self.ranges[start..end].to_vec()))
    }

    /// `parent`'s dimensions followed by this section's.
    pub fn prepend(&self, parent: &Section) -> Section {
        let mut ranges = parent.ranges.clone();
        ranges.extend(self.ranges.iter().cloned());
        Section::new(ranges)
    }

    /// Iterate over the canonical storage positions, in an array of `shape`,
    /// of every element this section selects. The last dimension varies fastest.
    pub fn iter(&self, shape: &[usize]) -> Result<SectionIter> {
        let filled = Section::fill(Some(self), shape)?;
        let ranges: Vec<Range> = filled.ranges.into_iter().flatten().collect();
        let remaining = ranges.iter().map(Range::len).product();
        Ok(SectionIter {
            counter: vec![0; ranges.len()],
            strides: row_major_strides(shape),
            ranges,
            remaining,
        })
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, r) in self.ranges.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            match r {
                Some(r) => write!(f, "{r}")?,
                None => f.write_str(":")?,
            }
        }
        Ok(())
    }
}

impl From<Vec<Range>> for Section {
    fn from(ranges: Vec<Range>) -> Self {
        Section::from_ranges(ranges)
    }
}

// ============================================================================
// Parsing
// ============================================================================

impl FromStr for Section {
    type Err = ArrayError;

    /// Parse `"(1:3,:,2)"` style selectors. Parentheses are optional.
    fn from_str(spec: &str) -> Result<Self> {
        let ranges = spec
            .split(['(', ')', ','])
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| parse_selector(token, spec))
            .collect::<Result<Vec<_>>>()?;
        Ok(Section::new(ranges))
    }
}

fn parse_selector(token: &str, spec: &str) -> Result<Option<Range>> {
    if token == ":" {
        return Ok(None);
    }
    let illegal = || ArrayError::IllegalSelector {
        token: token.to_string(),
        spec: spec.to_string(),
    };
    let numbers = token
        .split(':')
        .map(|part| part.trim().parse::<isize>().map_err(|_| illegal()))
        .collect::<Result<Vec<_>>>()?;
    let range = match numbers.as_slice() {
        [i] => Range::new(*i, *i, 1)?,
        [first, last] => Range::new(*first, *last, 1)?,
        [first, last, stride] => Range::new(*first, *last, *stride)?,
        _ => return Err(illegal()),
    };
    Ok(Some(range))
}

// ============================================================================
// SectionIter
// ============================================================================

/// Odometer over the elements of a section, yielding canonical positions.
#[derive(Debug, Clone)]
pub struct SectionIter {
    ranges: Vec<Range>,
    counter: Vec<usize>,
    strides: Vec<isize>,
    remaining: usize,
}

impl SectionIter {
    /// The multi-index, in the full shape, of the element `next` returns.
    pub fn current_index(&self) -> Vec<usize> {
        self.ranges
            .iter()
            .zip(&self.counter)
            .map(|(r, &k)| r.first() + k * r.stride())
            .collect()
    }
}

impl Iterator for SectionIter {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let position = self
            .current_index()
            .iter()
            .zip(&self.strides)
            .map(|(&i, &s)| i as isize * s)
            .sum::<isize>() as usize;
        self.remaining -= 1;
        for d in (0..self.counter.len()).rev() {
            self.counter[d] += 1;
            if self.counter[d] < self.ranges[d].len() {
                break;
            }
            self.counter[d] = 0;
        }
        Some(position)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for SectionIter {}
