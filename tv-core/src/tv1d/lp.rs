//! TV-lp prox kernels for general norm order `p >= 1`.
//!
//! The dual constraint set is the lq ball with `1/p + 1/q = 1`. None of
//! the direct tricks of the l1 and l2 cases apply here, so everything in
//! this module is a first-order method on the dual:
//!
//! * [`gradient_projection`]: fixed `1/L` steps plus an lq-ball projection.
//! * [`frank_wolfe`]: projection-free conditional gradient with the exact
//!   quadratic line search. Cheap steps, `O(1/k)` tail.
//! * [`hybrid`]: Frank-Wolfe while it makes progress, gradient projection
//!   once the objective stalls. This is the kernel the sweeps use for
//!   general-p fibers.
//! * [`fista`] and [`optimal_gradient`]: accelerated projections, the
//!   latter with an adaptive restart whenever the dual objective rises.

use crate::problem::{SolveInfo, SolveStatus};
use crate::tv1d::{
    apply_dual_hessian, dual_objective, duality_gap, forward_diff, lp_norm, primal_from_dual,
    EdgeWeights,
};
use crate::workspace::Workspace;

/// Iteration cap when `SolveOptions::max_iters` is unset.
pub(crate) const LP_MAX_ITERS: usize = 10_000;

/// Consecutive low-progress Frank-Wolfe steps before the hybrid switches.
const STALL_LIMIT: usize = 3;

/// Relative objective decrease under which a step counts as stalled.
const STALL_RTOL: f64 = 1e-3;

/// `1/L` with `L = lambda_max(DD^T) < 4`.
const STEP: f64 = 0.25;

/// Holder conjugate of `p`; `p = 1` maps to the sup norm.
fn dual_exponent(p: f64) -> f64 {
    if p == 1.0 {
        f64::INFINITY
    } else {
        p / (p - 1.0)
    }
}

// ============================================================================
// lq-ball projection
// ============================================================================

/// Project `v` onto `||v||_q <= r` in place.
///
/// The sup norm clamps and `q = 2` rescales. General `q` solves the KKT
/// system of the projection, `z_i + lam q z_i^{q-1} = |v_i|`, by bisecting
/// on the multiplier with a safeguarded Newton solve per coordinate. The
/// multiplier keeps the feasible endpoint of its bracket, so the returned
/// point never leaves the ball by more than roundoff.
pub(crate) fn project_lq_ball(v: &mut [f64], q: f64, r: f64) {
    if q.is_infinite() {
        for t in v.iter_mut() {
            *t = t.clamp(-r, r);
        }
        return;
    }
    let norm = lp_norm(v, q);
    if norm <= r {
        return;
    }
    if q == 2.0 {
        let scale = r / norm;
        v.iter_mut().for_each(|t| *t *= scale);
        return;
    }

    let excess = |lam: f64| -> f64 {
        v.iter()
            .map(|&t| shrink(t.abs(), q, lam).powf(q))
            .sum::<f64>()
            - r.powf(q)
    };
    let mut lo = 0.0;
    let mut hi = 1.0;
    while excess(hi) > 0.0 {
        lo = hi;
        hi *= 2.0;
    }
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if excess(mid) > 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo <= 1e-14 * hi {
            break;
        }
    }
    for t in v.iter_mut() {
        *t = shrink(t.abs(), q, hi).copysign(*t);
    }
}

/// Solve `z + lam q z^{q-1} = a` for `z` in `[0, a]`.
fn shrink(a: f64, q: f64, lam: f64) -> f64 {
    if a == 0.0 {
        return 0.0;
    }
    let mut lo = 0.0;
    let mut hi = a;
    let mut z = a;
    for _ in 0..60 {
        let h = z + lam * q * z.powf(q - 1.0) - a;
        if h > 0.0 {
            hi = z;
        } else {
            lo = z;
        }
        let dh = 1.0 + lam * q * (q - 1.0) * z.powf(q - 2.0);
        let mut next = z - h / dh;
        if !(next > lo && next < hi) {
            next = 0.5 * (lo + hi);
        }
        if (next - z).abs() <= 1e-15 * a {
            return next;
        }
        z = next;
    }
    z
}

// ============================================================================
// Solvers
// ============================================================================

/// Caller guarantees `x.len() >= 2`, `w > 0` and `p >= 1`.
pub(crate) fn gradient_projection(
    x: &[f64],
    w: f64,
    p: f64,
    y: &mut [f64],
    tol_gap: f64,
    max_iters: usize,
    ws: &mut Workspace,
) -> SolveInfo {
    let n = x.len();
    debug_assert!(n >= 2 && w > 0.0 && p >= 1.0);
    let m = n - 1;
    let q = dual_exponent(p);

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
            u[i] -= STEP * (g[i] - b[i]);
        }
        project_lq_ball(&mut u, q, w);

        primal_from_dual(x, &u, y);
        info.iters = iter + 1;
        info.gap = duality_gap(y, &u, EdgeWeights::Uniform(w), p);
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

/// Caller guarantees `x.len() >= 2`, `w > 0` and `p >= 1`.
pub(crate) fn frank_wolfe(
    x: &[f64],
    w: f64,
    p: f64,
    y: &mut [f64],
    tol_gap: f64,
    max_iters: usize,
    ws: &mut Workspace,
) -> SolveInfo {
    let n = x.len();
    debug_assert!(n >= 2 && w > 0.0 && p >= 1.0);
    let m = n - 1;

    let mut b = ws.acquire_f64(m);
    let mut u = ws.acquire_f64(m);
    let mut g = ws.acquire_f64(m);
    let mut d = ws.acquire_f64(m);
    let mut hd = ws.acquire_f64(m);
    forward_diff(x, &mut b);
    u.iter_mut().for_each(|t| *t = 0.0);

    let mut info = SolveInfo {
        iters: 0,
        gap: f64::INFINITY,
        status: SolveStatus::MaxIters,
    };
    for iter in 0..max_iters {
        info.iters = iter + 1;
        if fw_step(&b, w, p, &mut u, &mut g, &mut d, &mut hd).is_none() {
            // Zero gradient: u is already the unconstrained minimizer.
            primal_from_dual(x, &u, y);
            info.gap = duality_gap(y, &u, EdgeWeights::Uniform(w), p);
            info.status = SolveStatus::Converged;
            break;
        }

        primal_from_dual(x, &u, y);
        info.gap = duality_gap(y, &u, EdgeWeights::Uniform(w), p);
        if info.gap <= tol_gap {
            info.status = SolveStatus::Converged;
            break;
        }
    }

    ws.release_f64(b);
    ws.release_f64(u);
    ws.release_f64(g);
    ws.release_f64(d);
    ws.release_f64(hd);
    info
}

/// One conditional-gradient step; returns the dual objective after it,
/// or `None` when the gradient vanished and no step was possible.
fn fw_step(
    b: &[f64],
    w: f64,
    p: f64,
    u: &mut [f64],
    g: &mut [f64],
    d: &mut [f64],
    hd: &mut [f64],
) -> Option<f64> {
    let m = b.len();
    apply_dual_hessian(u, g);
    for i in 0..m {
        g[i] -= b[i];
    }
    let gp = lp_norm(g, p);
    if gp == 0.0 {
        return None;
    }

    // Linear minimizer over the lq ball lies at the dual-norm vertex
    // s_i = -w sign(g_i) (|g_i| / ||g||_p)^{p-1}; `d` holds s - u.
    for i in 0..m {
        let s = -w * g[i].signum() * (g[i].abs() / gp).powf(p - 1.0);
        d[i] = s - u[i];
    }
    apply_dual_hessian(d, hd);
    let gd: f64 = (0..m).map(|i| g[i] * d[i]).sum();
    let dhd: f64 = (0..m).map(|i| d[i] * hd[i]).sum();
    // Exact minimizing step of the quadratic along d, kept inside [0, 1].
    let alpha = if dhd > 0.0 {
        (-gd / dhd).clamp(0.0, 1.0)
    } else {
        1.0
    };
    for i in 0..m {
        u[i] += alpha * d[i];
    }
    Some(dual_objective(u, b))
}

/// Frank-Wolfe while it makes progress, gradient projection afterwards.
///
/// Caller guarantees `x.len() >= 2`, `w > 0` and `p >= 1`.
pub(crate) fn hybrid(
    x: &[f64],
    w: f64,
    p: f64,
    y: &mut [f64],
    tol_gap: f64,
    max_iters: usize,
    ws: &mut Workspace,
) -> SolveInfo {
    let n = x.len();
    debug_assert!(n >= 2 && w > 0.0 && p >= 1.0);
    let m = n - 1;
    let q = dual_exponent(p);

    let mut b = ws.acquire_f64(m);
    let mut u = ws.acquire_f64(m);
    let mut g = ws.acquire_f64(m);
    let mut d = ws.acquire_f64(m);
    let mut hd = ws.acquire_f64(m);
    forward_diff(x, &mut b);
    u.iter_mut().for_each(|t| *t = 0.0);

    let mut info = SolveInfo {
        iters: 0,
        gap: f64::INFINITY,
        status: SolveStatus::MaxIters,
    };

    let mut prev_obj = dual_objective(&u, &b);
    let mut stalled = 0;
    let mut used = 0;
    while used < max_iters {
        used += 1;
        info.iters = used;
        let obj = match fw_step(&b, w, p, &mut u, &mut g, &mut d, &mut hd) {
            Some(obj) => obj,
            None => {
                primal_from_dual(x, &u, y);
                info.gap = duality_gap(y, &u, EdgeWeights::Uniform(w), p);
                info.status = SolveStatus::Converged;
                break;
            }
        };

        primal_from_dual(x, &u, y);
        info.gap = duality_gap(y, &u, EdgeWeights::Uniform(w), p);
        if info.gap <= tol_gap {
            info.status = SolveStatus::Converged;
            break;
        }

        if prev_obj - obj <= STALL_RTOL * obj.abs().max(1e-12) {
            stalled += 1;
            if stalled >= STALL_LIMIT {
                break;
            }
        } else {
            stalled = 0;
        }
        prev_obj = obj;
    }

    // Projection phase from the Frank-Wolfe iterate.
    if !info.converged() {
        for iter in used..max_iters {
            apply_dual_hessian(&u, &mut g);
            for i in 0..m {
                u[i] -= STEP * (g[i] - b[i]);
            }
            project_lq_ball(&mut u, q, w);

            primal_from_dual(x, &u, y);
            info.iters = iter + 1;
            info.gap = duality_gap(y, &u, EdgeWeights::Uniform(w), p);
            if info.gap <= tol_gap {
                info.status = SolveStatus::Converged;
                break;
            }
        }
    }

    ws.release_f64(b);
    ws.release_f64(u);
    ws.release_f64(g);
    ws.release_f64(d);
    ws.release_f64(hd);
    info
}

/// Plain FISTA on the dual.
///
/// Caller guarantees `x.len() >= 2`, `w > 0` and `p >= 1`.
pub(crate) fn fista(
    x: &[f64],
    w: f64,
    p: f64,
    y: &mut [f64],
    tol_gap: f64,
    max_iters: usize,
    ws: &mut Workspace,
) -> SolveInfo {
    accel_loop(x, w, p, y, tol_gap, max_iters, false, ws)
}

/// FISTA with an adaptive restart whenever the dual objective rises.
///
/// Caller guarantees `x.len() >= 2`, `w > 0` and `p >= 1`.
pub(crate) fn optimal_gradient(
    x: &[f64],
    w: f64,
    p: f64,
    y: &mut [f64],
    tol_gap: f64,
    max_iters: usize,
    ws: &mut Workspace,
) -> SolveInfo {
    accel_loop(x, w, p, y, tol_gap, max_iters, true, ws)
}

fn accel_loop(
    x: &[f64],
    w: f64,
    p: f64,
    y: &mut [f64],
    tol_gap: f64,
    max_iters: usize,
    restart: bool,
    ws: &mut Workspace,
) -> SolveInfo {
    let n = x.len();
    debug_assert!(n >= 2 && w > 0.0 && p >= 1.0);
    let m = n - 1;
    let q = dual_exponent(p);

    let mut b = ws.acquire_f64(m);
    let mut u = ws.acquire_f64(m);
    let mut up = ws.acquire_f64(m);
    let mut z = ws.acquire_f64(m);
    let mut g = ws.acquire_f64(m);
    forward_diff(x, &mut b);
    u.iter_mut().for_each(|t| *t = 0.0);
    up.iter_mut().for_each(|t| *t = 0.0);
    z.iter_mut().for_each(|t| *t = 0.0);

    let mut theta = 1.0_f64;
    let mut prev_obj = dual_objective(&u, &b);
    let mut info = SolveInfo {
        iters: 0,
        gap: f64::INFINITY,
        status: SolveStatus::MaxIters,
    };
    for iter in 0..max_iters {
        apply_dual_hessian(&z, &mut g);
        for i in 0..m {
            u[i] = z[i] - STEP * (g[i] - b[i]);
        }
        project_lq_ball(&mut u, q, w);

        let obj = dual_objective(&u, &b);
        if restart && obj > prev_obj {
            // Momentum overshot; drop it and rebuild from the new point.
            theta = 1.0;
            z.copy_from_slice(&u);
        } else {
            let theta_new = 0.5 * (1.0 + (1.0 + 4.0 * theta * theta).sqrt());
            let beta = (theta - 1.0) / theta_new;
            for i in 0..m {
                z[i] = u[i] + beta * (u[i] - up[i]);
            }
            theta = theta_new;
        }
        prev_obj = obj;
        up.copy_from_slice(&u);

        primal_from_dual(x, &u, y);
        info.iters = iter + 1;
        info.gap = duality_gap(y, &u, EdgeWeights::Uniform(w), p);
        if info.gap <= tol_gap {
            info.status = SolveStatus::Converged;
            break;
        }
    }

    ws.release_f64(b);
    ws.release_f64(u);
    ws.release_f64(up);
    ws.release_f64(z);
    ws.release_f64(g);
    info
}
