//! Column-major shape and fiber arithmetic.
//!
//! Signals are dense `f64` buffers in column-major order: the first
//! dimension varies fastest in memory. A *fiber* along dimension `d` is
//! the 1-D slice obtained by fixing every other index; the 1-D proximity
//! kernels operate on fibers and the splitting solvers sweep over them.

/// Total element count of a shape.
pub(crate) fn total_len(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Addressing for the fibers along one dimension of a column-major tensor.
///
/// For dimension `d` of shape `(n_0, ..., n_{r-1})`:
///
/// - `len` is `n_d`, the fiber length;
/// - `stride` is the element step inside a fiber, `n_0 * ... * n_{d-1}`;
/// - `count` is the number of fibers, `total / n_d`.
///
/// Fibers are indexed `0..count`. Dimension-0 fibers are contiguous
/// slices, so sweeps over them avoid the gather/scatter copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FiberLayout {
    pub len: usize,
    pub stride: usize,
    pub count: usize,
}

impl FiberLayout {
    pub fn new(shape: &[usize], dim: usize) -> Self {
        debug_assert!(dim < shape.len());
        let stride: usize = shape[..dim].iter().product();
        let outer: usize = shape[dim + 1..].iter().product();
        FiberLayout {
            len: shape[dim],
            stride,
            count: stride * outer,
        }
    }

    /// Offset of the first element of fiber `f`.
    ///
    /// The fiber index splits as `f = outer * stride + inner` with
    /// `inner < stride`; each outer step skips a full `len * stride`
    /// block of the tensor.
    #[inline]
    pub fn base(&self, f: usize) -> usize {
        let outer = f / self.stride;
        let inner = f % self.stride;
        outer * self.len * self.stride + inner
    }

    /// True when fibers are contiguous slices (dimension 0).
    #[inline]
    pub fn contiguous(&self) -> bool {
        self.stride == 1
    }

    /// Copy fiber `f` of `src` into `buf[..len]`.
    #[inline]
    pub fn gather(&self, src: &[f64], f: usize, buf: &mut [f64]) {
        let base = self.base(f);
        for (t, slot) in buf[..self.len].iter_mut().enumerate() {
            *slot = src[base + t * self.stride];
        }
    }

    /// Write `buf[..len]` back over fiber `f` of `dst`.
    #[inline]
    pub fn scatter(&self, buf: &[f64], f: usize, dst: &mut [f64]) {
        let base = self.base(f);
        for (t, &v) in buf[..self.len].iter().enumerate() {
            dst[base + t * self.stride] = v;
        }
    }
}
