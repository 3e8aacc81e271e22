//! TV-l2 prox kernels.
//!
//! The penalty `w * ||Dy||_2` dualizes to a tridiagonal quadratic over the
//! Euclidean ball `||u||_2 <= w`. Three solvers share that dual:
//!
//! * [`more_sorensen`]: Newton on the secular equation `||u(sigma)|| = w`,
//!   one LDL^T factorization of `DD^T + sigma I` per step. If the
//!   unconstrained minimizer already sits inside the ball the first solve
//!   returns it exactly.
//! * [`projected_gradient`]: fixed `1/L` steps with a ball projection,
//!   cheap per iteration but linear convergence.
//! * [`hybrid`]: a short projected-gradient prelude to estimate the
//!   boundary multiplier, then the Newton phase. This is the kernel the
//!   sweeps use for l2 fibers.

use crate::problem::{SolveInfo, SolveStatus};
use crate::tv1d::{apply_dual_hessian, duality_gap, forward_diff, primal_from_dual, EdgeWeights};
use crate::workspace::Workspace;

/// Iteration caps when `SolveOptions::max_iters` is unset.
pub(crate) const MS_MAX_ITERS: usize = 50;
pub(crate) const PG_MAX_ITERS: usize = 10_000;
pub(crate) const HYBRID_MAX_ITERS: usize = 100;

/// Projected-gradient iterations the hybrid runs before switching.
const PG_WARM_ITERS: usize = 10;

/// `1/L` with `L = lambda_max(DD^T) < 4`.
const PG_STEP: f64 = 0.25;

#[inline]
fn l2(v: &[f64]) -> f64 {
    v.iter().map(|&t| t * t).sum::<f64>().sqrt()
}

/// Factor `DD^T + sigma I = L D L^T` (unit bidiagonal `L`) and solve for
/// `u`. `piv` receives the pivots, `mult` the subdiagonal multipliers;
/// both are reused by the secular-equation derivative.
fn factor_solve(sigma: f64, b: &[f64], u: &mut [f64], piv: &mut [f64], mult: &mut [f64]) {
    let m = b.len();
    let a = 2.0 + sigma;
    piv[0] = a;
    mult[0] = 0.0;
    for k in 1..m {
        let l = -1.0 / piv[k - 1];
        mult[k] = l;
        piv[k] = a - 1.0 / piv[k - 1];
    }
    u[0] = b[0];
    for k in 1..m {
        u[k] = b[k] - mult[k] * u[k - 1];
    }
    u[m - 1] /= piv[m - 1];
    for k in (0..m - 1).rev() {
        u[k] = u[k] / piv[k] - mult[k + 1] * u[k + 1];
    }
}

/// Caller guarantees `x.len() >= 2` and `w > 0`.
pub(crate) fn more_sorensen(
    x: &[f64],
    w: f64,
    y: &mut [f64],
    tol_gap: f64,
    max_iters: usize,
    ws: &mut Workspace,
) -> SolveInfo {
    ms_loop(x, w, 0.0, y, tol_gap, max_iters, ws)
}

fn ms_loop(
    x: &[f64],
    w: f64,
    mut sigma: f64,
    y: &mut [f64],
    tol_gap: f64,
    max_iters: usize,
    ws: &mut Workspace,
) -> SolveInfo {
    let n = x.len();
    debug_assert!(n >= 2 && w > 0.0);
    let m = n - 1;

    let mut b = ws.acquire_f64(m);
    let mut u = ws.acquire_f64(m);
    let mut v = ws.acquire_f64(m);
    let mut piv = ws.acquire_f64(m);
    let mut mult = ws.acquire_f64(m);
    forward_diff(x, &mut b);

    let mut info = SolveInfo {
        iters: 0,
        gap: f64::INFINITY,
        status: SolveStatus::MaxIters,
    };
    for iter in 0..max_iters {
        factor_solve(sigma, &b, &mut u, &mut piv, &mut mult);
        info.iters = iter + 1;

        let norm = l2(&u);
        if sigma == 0.0 && norm <= w {
            // Unconstrained minimizer inside the ball: Dy vanishes and the
            // prox output is exact.
            primal_from_dual(x, &u, y);
            info.gap = duality_gap(y, &u, EdgeWeights::Uniform(w), 2.0);
            info.status = SolveStatus::Converged;
            break;
        }

        // Newton step on ||u(sigma)|| = w. The derivative needs
        // u^T (DD^T + sigma I)^{-1} u = sum_k v_k^2 / piv_k, v = L^{-1} u.
        v[0] = u[0];
        for k in 1..m {
            v[k] = u[k] - mult[k] * v[k - 1];
        }
        let zsq: f64 = (0..m).map(|k| v[k] * v[k] / piv[k]).sum();
        sigma = (sigma + (norm * norm / zsq) * ((norm - w) / w)).max(0.0);

        // Certify at the projection of u onto the ball; the gap bound only
        // holds for feasible duals.
        if norm > w {
            let scale = w / norm;
            u.iter_mut().for_each(|t| *t *= scale);
        }
        primal_from_dual(x, &u, y);
        info.gap = duality_gap(y, &u, EdgeWeights::Uniform(w), 2.0);
        if info.gap <= tol_gap {
            info.status = SolveStatus::Converged;
            break;
        }
    }

    ws.release_f64(b);
    ws.release_f64(u);
    ws.release_f64(v);
    ws.release_f64(piv);
    ws.release_f64(mult);
    info
}

/// Caller guarantees `x.len() >= 2` and `w > 0`.
pub(crate) fn projected_gradient(
    x: &[f64],
    w: f64,
    y: &mut [f64],
    tol_gap: f64,
    max_iters: usize,
    ws: &mut Workspace,
) -> SolveInfo {
    let n = x.len();
    debug_assert!(n >= 2 && w > 0.0);
    let m = n - 1;

    let mut b = ws.acquire_f64(m);
    let mut u = ws.acquire_f64(m);
    let mut g = ws.acquire_f64(m);
    forward_diff(x, &mut b);
    u.iter_mut().for_each(|t| *t = 0.0);

    let mut info = SolveInfo {
        iters: 0,
        gap: f64::INFINITY,
        status: SolveStatus::MaxIters,
    };
    for iter in 0..max_iters {
        apply_dual_hessian(&u, &mut g);
        for i in 0..m {
            u[i] -= PG_STEP * (g[i] - b[i]);
        }
        let norm = l2(&u);
        if norm > w {
            let scale = w / norm;
            u.iter_mut().for_each(|t| *t *= scale);
        }

        primal_from_dual(x, &u, y);
        info.iters = iter + 1;
        info.gap = duality_gap(y, &u, EdgeWeights::Uniform(w), 2.0);
        if info.gap <= tol_gap {
            info.status = SolveStatus::Converged;
            break;
        }
    }

    ws.release_f64(b);
    ws.release_f64(u);
    ws.release_f64(g);
    info
}

/// Caller guarantees `x.len() >= 2` and `w > 0`.
pub(crate) fn hybrid(
    x: &[f64],
    w: f64,
    y: &mut [f64],
    tol_gap: f64,
    max_iters: usize,
    ws: &mut Workspace,
) -> SolveInfo {
    let n = x.len();
    debug_assert!(n >= 2 && w > 0.0);
    let m = n - 1;

    let mut b = ws.acquire_f64(m);
    let mut u = ws.acquire_f64(m);
    let mut g = ws.acquire_f64(m);
    forward_diff(x, &mut b);
    u.iter_mut().for_each(|t| *t = 0.0);

    // Prelude: land u near the right face of the ball.
    let prelude = PG_WARM_ITERS.min(max_iters.saturating_sub(1));
    for _ in 0..prelude {
        apply_dual_hessian(&u, &mut g);
        for i in 0..m {
            u[i] -= PG_STEP * (g[i] - b[i]);
        }
        let norm = l2(&u);
        if norm > w {
            let scale = w / norm;
            u.iter_mut().for_each(|t| *t *= scale);
        }
    }

    // KKT gives (DD^T + sigma I) u = Dx at a boundary solution; project
    // the residual onto u for a starting multiplier.
    apply_dual_hessian(&u, &mut g);
    let usq: f64 = u.iter().map(|&t| t * t).sum();
    let sigma0 = if usq > 0.0 {
        let resid: f64 = (0..m).map(|i| u[i] * (b[i] - g[i])).sum();
        (resid / usq).max(0.0)
    } else {
        0.0
    };

    ws.release_f64(b);
    ws.release_f64(u);
    ws.release_f64(g);

    let mut info = ms_loop(x, w, sigma0, y, tol_gap, max_iters - prelude, ws);
    info.iters += prelude;
    info
}
