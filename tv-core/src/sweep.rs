//! Fiber sweeps: apply a 1-D prox kernel across every fiber of one
//! dimension, optionally on a rayon pool.
//!
//! The splitting solvers spend nearly all their time here, so the sweep
//! has two layouts: dimension-0 fibers are contiguous and solve in place
//! over chunk pairs, other dimensions gather each fiber into scratch,
//! solve, and scatter the result back sequentially.
//!
//! Results are independent of the worker count. Fiber solves never share
//! state, scatters happen on the calling thread, and the per-sweep
//! diagnostics merge through max/and folds, which are associative and
//! commutative, so any split of the fiber range reduces to the same
//! answer.

use rayon::prelude::*;

use crate::problem::SolveInfo;
use crate::tensor::FiberLayout;
use crate::tv1d::{prox_fiber, EdgeWeights};
use crate::workspace::Workspace;

// ============================================================================
// Kernel description
// ============================================================================

/// Weights for the fibers of one sweep dimension.
#[derive(Debug, Clone, Copy)]
pub(crate) enum FiberWeights<'a> {
    /// Every edge of every fiber weighted by the same scalar.
    Uniform(f64),
    /// Per-edge weight tensor, shaped like the signal with the sweep
    /// dimension shortened by one. Its fiber layout shares `stride` and
    /// `count` with the signal layout, so weight fiber `f` belongs to
    /// signal fiber `f`.
    Tensor {
        data: &'a [f64],
        layout: FiberLayout,
    },
}

/// The 1-D prox applied to every fiber of a sweep.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FiberKernel<'a> {
    pub weights: FiberWeights<'a>,
    pub p: f64,
    pub tol_gap: f64,
    /// Per-fiber iteration cap; 0 selects the kernel default.
    pub max_iters: usize,
    /// Multiplier on the weights; splitting derivations assign each term
    /// a fraction of its nominal weight.
    pub scale: f64,
}

impl<'a> FiberKernel<'a> {
    pub fn new(weights: FiberWeights<'a>, p: f64, tol_gap: f64, max_iters: usize) -> Self {
        FiberKernel {
            weights,
            p,
            tol_gap,
            max_iters,
            scale: 1.0,
        }
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Solve one fiber; `x` and `y` are the fiber contents, `f` selects
    /// the matching weight fiber.
    fn solve_fiber(&self, x: &[f64], y: &mut [f64], f: usize, ws: &mut Workspace) -> SolveInfo {
        match self.weights {
            FiberWeights::Uniform(w) => prox_fiber(
                x,
                y,
                EdgeWeights::Uniform(w * self.scale),
                self.p,
                self.tol_gap,
                self.max_iters,
                ws,
            ),
            FiberWeights::Tensor { data, layout } => {
                if layout.contiguous() && self.scale == 1.0 {
                    let base = layout.base(f);
                    prox_fiber(
                        x,
                        y,
                        EdgeWeights::PerEdge(&data[base..base + layout.len]),
                        self.p,
                        self.tol_gap,
                        self.max_iters,
                        ws,
                    )
                } else {
                    let mut wbuf = ws.acquire_f64(layout.len);
                    layout.gather(data, f, &mut wbuf);
                    if self.scale != 1.0 {
                        wbuf.iter_mut().for_each(|t| *t *= self.scale);
                    }
                    let info = prox_fiber(
                        x,
                        y,
                        EdgeWeights::PerEdge(&wbuf),
                        self.p,
                        self.tol_gap,
                        self.max_iters,
                        ws,
                    );
                    ws.release_f64(wbuf);
                    info
                }
            }
        }
    }
}

// ============================================================================
// Sweep diagnostics
// ============================================================================

/// Worst-case fiber diagnostics of one sweep.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SweepInfo {
    pub max_gap: f64,
    pub max_iters: usize,
    pub all_converged: bool,
}

impl SweepInfo {
    pub fn identity() -> Self {
        SweepInfo {
            max_gap: 0.0,
            max_iters: 0,
            all_converged: true,
        }
    }

    pub fn merge(self, other: SweepInfo) -> Self {
        SweepInfo {
            max_gap: self.max_gap.max(other.max_gap),
            max_iters: self.max_iters.max(other.max_iters),
            all_converged: self.all_converged && other.all_converged,
        }
    }

    fn absorb(&mut self, info: SolveInfo) {
        self.max_gap = self.max_gap.max(info.gap);
        self.max_iters = self.max_iters.max(info.iters);
        self.all_converged = self.all_converged && info.converged();
    }
}

// ============================================================================
// Sweeps
// ============================================================================

/// Prox every fiber of `src` along `dim` into `dst`.
///
/// `ws` backs the sequential path and the scatter scratch; parallel
/// workers pool their own scratch.
pub(crate) fn prox_sweep_dim(
    src: &[f64],
    dst: &mut [f64],
    shape: &[usize],
    dim: usize,
    kernel: &FiberKernel<'_>,
    threads: usize,
    ws: &mut Workspace,
) -> SweepInfo {
    debug_assert_eq!(src.len(), dst.len());
    let layout = FiberLayout::new(shape, dim);

    if threads <= 1 {
        let mut acc = SweepInfo::identity();
        if layout.contiguous() {
            for (f, (yc, xc)) in dst
                .chunks_mut(layout.len)
                .zip(src.chunks(layout.len))
                .enumerate()
            {
                acc.absorb(kernel.solve_fiber(xc, yc, f, ws));
            }
        } else {
            let mut xbuf = ws.acquire_f64(layout.len);
            let mut ybuf = ws.acquire_f64(layout.len);
            for f in 0..layout.count {
                layout.gather(src, f, &mut xbuf);
                let info = kernel.solve_fiber(&xbuf, &mut ybuf, f, ws);
                acc.absorb(info);
                layout.scatter(&ybuf, f, dst);
            }
            ws.release_f64(xbuf);
            ws.release_f64(ybuf);
        }
        return acc;
    }

    if layout.contiguous() {
        dst.par_chunks_mut(layout.len)
            .zip(src.par_chunks(layout.len))
            .enumerate()
            .map_init(Workspace::new, |wsl, (f, (yc, xc))| {
                let mut acc = SweepInfo::identity();
                acc.absorb(kernel.solve_fiber(xc, yc, f, wsl));
                acc
            })
            .reduce(SweepInfo::identity, SweepInfo::merge)
    } else {
        // Workers fill a fiber-contiguous scratch; the interleaved writes
        // back into dst stay on this thread.
        let mut scratch = ws.acquire_f64(src.len());
        let acc = scratch
            .par_chunks_mut(layout.len)
            .enumerate()
            .map_init(Workspace::new, |wsl, (f, chunk)| {
                let mut xbuf = wsl.acquire_f64(layout.len);
                layout.gather(src, f, &mut xbuf);
                let mut acc = SweepInfo::identity();
                acc.absorb(kernel.solve_fiber(&xbuf, chunk, f, wsl));
                wsl.release_f64(xbuf);
                acc
            })
            .reduce(SweepInfo::identity, SweepInfo::merge);
        for f in 0..layout.count {
            layout.scatter(&scratch[f * layout.len..(f + 1) * layout.len], f, dst);
        }
        ws.release_f64(scratch);
        acc
    }
}

/// Run `f` on a dedicated pool of `threads` workers; on pool-build
/// failure the closure runs on the calling thread instead.
pub(crate) fn run_parallel<R: Send>(threads: usize, f: impl FnOnce() -> R + Send) -> R {
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool.install(f),
        Err(_) => f(),
    }
}
