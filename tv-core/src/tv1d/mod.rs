//! 1-D proximity solvers.
//!
//! Every family solves `min_y (1/2)||x - y||^2 + w * ||Dy||_p` over a
//! single fiber, where `(Dy)_i = y_i - y_{i+1}`. The l1 solvers are exact
//! direct methods; l2 and general lp work on the dual
//! `min_u (1/2)u^T DD^T u - u^T Dx` over `||u||_q <= w` (`q = p/(p-1)`),
//! recovering `y = x - D^T u`.

pub mod condat;
pub mod johnson;
pub mod lp;
pub mod newton;
pub mod quad;
pub mod tautstring;

use crate::problem::SolveInfo;
use crate::workspace::Workspace;

// ============================================================================
// Edge weights
// ============================================================================

/// Per-difference weights of one 1-D TV term.
#[derive(Debug, Clone, Copy)]
pub(crate) enum EdgeWeights<'a> {
    /// Every difference weighted by the same scalar.
    Uniform(f64),
    /// One weight per difference, length `n - 1`.
    PerEdge(&'a [f64]),
}

impl EdgeWeights<'_> {
    #[inline]
    pub fn at(&self, i: usize) -> f64 {
        match *self {
            EdgeWeights::Uniform(w) => w,
            EdgeWeights::PerEdge(w) => w[i],
        }
    }

    /// True when every edge weight is zero (the penalty vanishes).
    pub fn all_zero(&self, edges: usize) -> bool {
        match *self {
            EdgeWeights::Uniform(w) => w == 0.0 || edges == 0,
            EdgeWeights::PerEdge(w) => w.iter().all(|&v| v == 0.0),
        }
    }
}

// ============================================================================
// Difference-operator helpers shared by the dual solvers
// ============================================================================

/// `d = Dy`: forward differences, `d[i] = y[i] - y[i+1]`.
#[inline]
pub(crate) fn forward_diff(y: &[f64], d: &mut [f64]) {
    let m = y.len() - 1;
    for i in 0..m {
        d[i] = y[i] - y[i + 1];
    }
}

/// `y = x - D^T u`: primal point of a dual iterate.
#[inline]
pub(crate) fn primal_from_dual(x: &[f64], u: &[f64], y: &mut [f64]) {
    let n = x.len();
    y[0] = x[0] - u[0];
    for j in 1..n - 1 {
        y[j] = x[j] - u[j] + u[j - 1];
    }
    y[n - 1] = x[n - 1] + u[n - 2];
}

/// `out = DD^T u`: the tridiagonal dual Hessian applied to `u`.
#[inline]
pub(crate) fn apply_dual_hessian(u: &[f64], out: &mut [f64]) {
    let m = u.len();
    if m == 1 {
        out[0] = 2.0 * u[0];
        return;
    }
    out[0] = 2.0 * u[0] - u[1];
    for i in 1..m - 1 {
        out[i] = 2.0 * u[i] - u[i - 1] - u[i + 1];
    }
    out[m - 1] = 2.0 * u[m - 1] - u[m - 2];
}

/// Dual objective `(1/2)u^T DD^T u - b^T u` with `b = Dx`.
pub(crate) fn dual_objective(u: &[f64], b: &[f64]) -> f64 {
    let m = u.len();
    let mut quad = 0.0;
    let mut lin = 0.0;
    for i in 0..m {
        let prev = if i > 0 { u[i - 1] } else { 0.0 };
        let next = if i + 1 < m { u[i + 1] } else { 0.0 };
        quad += u[i] * (2.0 * u[i] - prev - next);
        lin += b[i] * u[i];
    }
    0.5 * quad - lin
}

/// `||v||_p`, scaled to avoid overflow for large `p`.
pub(crate) fn lp_norm(v: &[f64], p: f64) -> f64 {
    let mx = v.iter().fold(0.0_f64, |a, &x| a.max(x.abs()));
    if mx == 0.0 {
        return 0.0;
    }
    let sum: f64 = v.iter().map(|&x| (x.abs() / mx).powf(p)).sum();
    mx * sum.powf(1.0 / p)
}

/// Duality gap `w * ||Dy||_p - u^T Dy` at a primal/dual pair.
///
/// Nonnegative for any dual-feasible `u`; clamped at zero to keep
/// rounding noise out of the diagnostics.
pub(crate) fn duality_gap(y: &[f64], u: &[f64], weights: EdgeWeights<'_>, p: f64) -> f64 {
    let m = u.len();
    let mut penalty = 0.0;
    let mut inner = 0.0;
    match weights {
        EdgeWeights::Uniform(w) => {
            if p == 1.0 {
                for i in 0..m {
                    let d = y[i] - y[i + 1];
                    penalty += w * d.abs();
                    inner += u[i] * d;
                }
            } else {
                let mut nrm = 0.0;
                let mx = (0..m).fold(0.0_f64, |a, i| a.max((y[i] - y[i + 1]).abs()));
                if mx > 0.0 {
                    for i in 0..m {
                        let d = y[i] - y[i + 1];
                        nrm += (d.abs() / mx).powf(p);
                        inner += u[i] * d;
                    }
                    penalty = w * mx * nrm.powf(1.0 / p);
                }
            }
        }
        EdgeWeights::PerEdge(ws) => {
            // weighted penalties only arise for l1 terms
            for i in 0..m {
                let d = y[i] - y[i + 1];
                penalty += ws[i] * d.abs();
                inner += u[i] * d;
            }
        }
    }
    (penalty - inner).max(0.0)
}

// ============================================================================
// Fiber kernel
// ============================================================================

/// Route a single-fiber prox by norm order: exact taut string for l1, the
/// l2 hybrid for l2, the lp hybrid otherwise. This is the kernel the
/// 2-D/N-D splitting solvers compose.
pub(crate) fn prox_fiber(
    x: &[f64],
    y: &mut [f64],
    weights: EdgeWeights<'_>,
    p: f64,
    tol_gap: f64,
    max_iters: usize,
    ws: &mut Workspace,
) -> SolveInfo {
    let n = x.len();
    if n <= 1 || weights.all_zero(n.saturating_sub(1)) {
        y[..n].copy_from_slice(x);
        return SolveInfo::exact();
    }
    match weights {
        EdgeWeights::PerEdge(w) => {
            debug_assert!(p == 1.0, "per-edge weights are an l1 feature");
            tautstring::taut_string_weighted(x, w, y, ws);
            SolveInfo::exact()
        }
        EdgeWeights::Uniform(w) => {
            if p == 1.0 {
                tautstring::taut_string(x, w, y, ws);
                SolveInfo::exact()
            } else if p == 2.0 {
                let cap = if max_iters == 0 { quad::HYBRID_MAX_ITERS } else { max_iters };
                quad::hybrid(x, w, y, tol_gap, cap, ws)
            } else {
                let cap = if max_iters == 0 { lp::LP_MAX_ITERS } else { max_iters };
                lp::hybrid(x, w, p, y, tol_gap, cap, ws)
            }
        }
    }
}
