//! Primal-dual hybrid gradient (PDHG) for anisotropic 2-D l1.
//!
//! Stacks one dual variable per vertical and per horizontal difference
//! and iterates Chambolle-Pock steps with `tau = sigma = 0.99/sqrt(8)`
//! (the squared operator norm of the stacked difference operator is at
//! most 8). The dual prox is a per-edge clamp onto `[-w_e, w_e]`, the
//! primal prox the quadratic shrink toward the input. Condat's variant
//! over-relaxes both updates with `rho = 1.9`; relaxed duals may leave
//! the box transiently, the fixed point is feasible.

use crate::problem::{SolveInfo, SolveOptions, SolveStatus};
use crate::tv1d::EdgeWeights;
use crate::tv2d::rel_change;
use crate::workspace::Workspace;

/// Outer-iteration cap when `SolveOptions::max_iters` is unset.
pub(crate) const PD_MAX_ITERS: usize = 2000;

/// Upper bound on `||K||^2` for the stacked 2-D difference operator.
const KNORM2: f64 = 8.0;

/// Relaxation flavor of the shared PDHG kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PdVariant {
    /// Unrelaxed `theta = 1` iteration.
    ChambollePock,
    /// Over-relaxed updates, `rho = 1.9`.
    Condat,
}

impl PdVariant {
    fn relaxation(self) -> f64 {
        match self {
            PdVariant::ChambollePock => 1.0,
            PdVariant::Condat => 1.9,
        }
    }
}

/// Vertical edge weights `wv` index column-major `(rows-1, cols)`,
/// horizontal edge weights `wh` index column-major `(rows, cols-1)`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn primal_dual(
    x: &[f64],
    shape: &[usize],
    wv: EdgeWeights<'_>,
    wh: EdgeWeights<'_>,
    variant: PdVariant,
    y: &mut [f64],
    opts: &SolveOptions,
    ws: &mut Workspace,
) -> SolveInfo {
    debug_assert_eq!(shape.len(), 2);
    let rows = shape[0];
    let cols = shape[1];
    let total = x.len();

    let step = 0.99 / KNORM2.sqrt();
    let rho = variant.relaxation();

    let mut uv = ws.acquire_f64((rows - 1) * cols);
    let mut uh = ws.acquire_f64(rows * (cols - 1));
    let mut kt = ws.acquire_f64(total);
    let mut yt = ws.acquire_f64(total);
    uv.iter_mut().for_each(|v| *v = 0.0);
    uh.iter_mut().for_each(|v| *v = 0.0);
    y.copy_from_slice(x);

    let cap = opts.iter_cap(PD_MAX_ITERS);
    let mut info = SolveInfo {
        iters: 0,
        gap: f64::INFINITY,
        status: SolveStatus::MaxIters,
    };
    for iter in 0..cap {
        // kt = K^T u, accumulated over both edge sets.
        kt.iter_mut().for_each(|v| *v = 0.0);
        for j in 0..cols {
            let base = j * rows;
            let ub = j * (rows - 1);
            for i in 0..rows - 1 {
                let u = uv[ub + i];
                kt[base + i] += u;
                kt[base + i + 1] -= u;
            }
        }
        for j in 0..cols - 1 {
            let b0 = j * rows;
            let b1 = (j + 1) * rows;
            for i in 0..rows {
                let u = uh[b0 + i];
                kt[b0 + i] += u;
                kt[b1 + i] -= u;
            }
        }

        // Primal candidate: prox of the quadratic data term.
        for i in 0..total {
            yt[i] = (y[i] - step * kt[i] + step * x[i]) / (1.0 + step);
        }

        // Dual ascent at the extrapolated point 2*yt - y, clamped to the
        // per-edge box, then relaxed.
        for j in 0..cols {
            let base = j * rows;
            let ub = j * (rows - 1);
            for i in 0..rows - 1 {
                let a = 2.0 * yt[base + i] - y[base + i];
                let b = 2.0 * yt[base + i + 1] - y[base + i + 1];
                let bound = wv.at(ub + i);
                let cand = (uv[ub + i] + step * (a - b)).clamp(-bound, bound);
                uv[ub + i] += rho * (cand - uv[ub + i]);
            }
        }
        for j in 0..cols - 1 {
            let b0 = j * rows;
            let b1 = (j + 1) * rows;
            for i in 0..rows {
                let a = 2.0 * yt[b0 + i] - y[b0 + i];
                let b = 2.0 * yt[b1 + i] - y[b1 + i];
                let bound = wh.at(b0 + i);
                let cand = (uh[b0 + i] + step * (a - b)).clamp(-bound, bound);
                uh[b0 + i] += rho * (cand - uh[b0 + i]);
            }
        }

        // Relaxed primal update, fused with the change residual.
        let mut num = 0.0;
        let mut den = 0.0;
        for i in 0..total {
            let d = rho * (yt[i] - y[i]);
            num += d * d;
            den += y[i] * y[i];
            y[i] += d;
        }
        let rel = num.sqrt() / (den.sqrt() + 1e-15);

        info.iters = iter + 1;
        info.gap = rel;
        if opts.verbose {
            println!("pdhg iter {:4} change={:.3e}", iter, rel);
        }
        if rel <= opts.tol_change {
            info.status = SolveStatus::Converged;
            break;
        }
    }

    ws.release_f64(uv);
    ws.release_f64(uh);
    ws.release_f64(kt);
    ws.release_f64(yt);
    info
}
