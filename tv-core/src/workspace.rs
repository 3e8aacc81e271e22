//! Reusable scratch buffers and warm-start state.
//!
//! The 1-D kernels need a handful of length-`n` scratch arrays per solve.
//! Allocating them on every call dominates the runtime for short fibers,
//! so solvers borrow scratch from a [`Workspace`] instead: `acquire_f64`
//! hands out a buffer of the requested length and `release_f64` returns
//! it to the pool for the next caller.
//!
//! Freshly allocated buffers are zero-filled. A reused buffer is resized
//! to the requested length with only the grown tail zeroed; contents
//! below that are stale, so kernels must write before they read. Pool
//! capacity only grows until the workspace is dropped.

/// Scratch-buffer pool plus warm-start state for repeated solves.
#[derive(Debug, Default)]
pub struct Workspace {
    dbl: Vec<Vec<f64>>,
    idx: Vec<Vec<usize>>,
    warm: Option<WarmState>,
}

/// Dual vector a previous solve converged at, with the weight it used.
#[derive(Debug, Clone)]
struct WarmState {
    dual: Vec<f64>,
    weight: f64,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow an `f64` scratch buffer of length `len`.
    pub fn acquire_f64(&mut self, len: usize) -> Vec<f64> {
        match self.dbl.pop() {
            Some(mut buf) => {
                buf.resize(len, 0.0);
                buf
            }
            None => vec![0.0; len],
        }
    }

    /// Return a buffer taken with [`Workspace::acquire_f64`].
    pub fn release_f64(&mut self, buf: Vec<f64>) {
        self.dbl.push(buf);
    }

    /// Borrow a `usize` scratch buffer of length `len`.
    pub fn acquire_usize(&mut self, len: usize) -> Vec<usize> {
        match self.idx.pop() {
            Some(mut buf) => {
                buf.resize(len, 0);
                buf
            }
            None => vec![0; len],
        }
    }

    /// Return a buffer taken with [`Workspace::acquire_usize`].
    pub fn release_usize(&mut self, buf: Vec<usize>) {
        self.idx.push(buf);
    }

    /// Record the dual vector a solve converged at, for later warm starts.
    ///
    /// `weight` is the penalty weight of that solve; warm consumers rescale
    /// the stored dual by the ratio of weights before projecting it onto
    /// their feasible set. Weighted solvers store `weight = 1.0` and reuse
    /// the dual unscaled.
    pub fn store_warm(&mut self, dual: &[f64], weight: f64) {
        match &mut self.warm {
            Some(w) => {
                w.dual.clear();
                w.dual.extend_from_slice(dual);
                w.weight = weight;
            }
            None => {
                self.warm = Some(WarmState {
                    dual: dual.to_vec(),
                    weight,
                });
            }
        }
    }

    /// Stored dual and its weight, if one of matching length exists.
    ///
    /// Purely a performance device: a solve seeded from this must reach the
    /// same answer (to solver tolerance) as a cold one.
    pub fn warm_dual(&self, len: usize) -> Option<(&[f64], f64)> {
        let warm = self.warm.as_ref()?;
        if warm.dual.len() != len || !(warm.weight > 0.0) {
            return None;
        }
        Some((&warm.dual, warm.weight))
    }

    /// Drop any stored warm-start state.
    pub fn clear_warm(&mut self) {
        self.warm = None;
    }
}
