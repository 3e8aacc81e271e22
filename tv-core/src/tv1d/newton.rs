//! Projected Newton on the box-constrained dual.
//!
//! TV-l1 dualizes to `min (1/2) u^T DD^T u - u^T Dx` over the box
//! `|u_i| <= w_i`, with primal recovery `y = x - D^T u`. Each iteration
//! pins the coordinates that sit on a bound with an outward gradient,
//! takes a Newton step on the remaining free block, and backtracks along
//! the projected arc until the decrease matches a `sigma` fraction of the
//! first-order model (Bertsekas, 1982). The reduced Hessian keeps the
//! tridiagonal shape of `DD^T`, so each Newton solve is a single LDL^T
//! sweep over the free coordinates.

use crate::problem::{SolveInfo, SolveOptions, SolveStatus};
use crate::tv1d::{
    apply_dual_hessian, dual_objective, duality_gap, forward_diff, primal_from_dual, EdgeWeights,
};
use crate::workspace::Workspace;

/// Iteration cap when `SolveOptions::max_iters` is unset.
pub(crate) const PN_MAX_ITERS: usize = 100;

/// Halvings the line search tries before declaring the step stagnant.
const MAX_BACKTRACKS: usize = 60;

/// Caller guarantees `x.len() >= 2` and at least one nonzero weight.
pub(crate) fn projected_newton(
    x: &[f64],
    weights: EdgeWeights<'_>,
    y: &mut [f64],
    opts: &SolveOptions,
    ws: &mut Workspace,
) -> SolveInfo {
    let n = x.len();
    debug_assert!(n >= 2);
    let m = n - 1;

    let mut b = ws.acquire_f64(m);
    let mut u = ws.acquire_f64(m);
    let mut g = ws.acquire_f64(m);
    let mut step = ws.acquire_f64(m);
    let mut trial = ws.acquire_f64(m);
    let mut piv = ws.acquire_f64(m);
    let mut mult = ws.acquire_f64(m);
    let mut free = ws.acquire_usize(m);

    forward_diff(x, &mut b);

    // Seed from the previous dual on this workspace when the length
    // matches: rescale by the weight ratio, then project into the box.
    match ws.warm_dual(m) {
        Some((dual, from_w)) => match weights {
            EdgeWeights::Uniform(w) => {
                let scale = w / from_w;
                for i in 0..m {
                    u[i] = (dual[i] * scale).clamp(-w, w);
                }
            }
            EdgeWeights::PerEdge(wv) => {
                for i in 0..m {
                    u[i] = dual[i].clamp(-wv[i], wv[i]);
                }
            }
        },
        None => u.iter_mut().for_each(|v| *v = 0.0),
    }

    let cap = opts.iter_cap(PN_MAX_ITERS);
    let mut info = SolveInfo {
        iters: 0,
        gap: f64::INFINITY,
        status: SolveStatus::MaxIters,
    };

    for iter in 0..cap {
        apply_dual_hessian(&u, &mut g);
        for i in 0..m {
            g[i] -= b[i];
        }

        // Coordinates pinned at a bound whose gradient points outward.
        free.clear();
        for i in 0..m {
            let w = weights.at(i);
            let pinned = (u[i] >= w && g[i] <= 0.0) || (u[i] <= -w && g[i] >= 0.0);
            if !pinned {
                free.push(i);
            }
        }
        let nf = free.len();

        info.iters = iter + 1;
        if nf == 0 {
            // Projected gradient vanishes: KKT point.
            primal_from_dual(x, &u, y);
            info.gap = duality_gap(y, &u, weights, 1.0);
            info.status = SolveStatus::Converged;
            if opts.verbose {
                println!("pn iter {:3} gap={:.3e} free=0", iter, info.gap);
            }
            break;
        }

        // LDL^T of the reduced tridiagonal: diagonal 2 throughout, -1
        // couplings only between free coordinates adjacent in the
        // original ordering. Non-adjacent neighbors restart the chain.
        piv[0] = 2.0;
        mult[0] = 0.0;
        for k in 1..nf {
            let l = if free[k] == free[k - 1] + 1 {
                -1.0 / piv[k - 1]
            } else {
                0.0
            };
            mult[k] = l;
            piv[k] = 2.0 - l * l * piv[k - 1];
        }
        step[0] = g[free[0]];
        for k in 1..nf {
            step[k] = g[free[k]] - mult[k] * step[k - 1];
        }
        step[nf - 1] /= piv[nf - 1];
        for k in (0..nf - 1).rev() {
            step[k] = step[k] / piv[k] - mult[k + 1] * step[k + 1];
        }

        // Backtrack along the projected arc until the decrease reaches a
        // sigma fraction of the first-order model g^T (u - u_trial).
        let q0 = dual_objective(&u, &b);
        let mut alpha = 1.0;
        let mut accepted = false;
        for _ in 0..MAX_BACKTRACKS {
            trial.copy_from_slice(&u);
            for (k, &i) in free.iter().enumerate() {
                let w = weights.at(i);
                trial[i] = (u[i] - alpha * step[k]).clamp(-w, w);
            }
            let decrease = q0 - dual_objective(&trial, &b);
            let mut model = 0.0;
            for &i in free.iter() {
                model += g[i] * (u[i] - trial[i]);
            }
            if decrease >= opts.sigma * model {
                accepted = true;
                break;
            }
            alpha *= 0.5;
        }
        if accepted {
            u.copy_from_slice(&trial);
        }

        primal_from_dual(x, &u, y);
        info.gap = duality_gap(y, &u, weights, 1.0);
        if opts.verbose {
            println!(
                "pn iter {:3} gap={:.3e} free={:4} alpha={:.3e}",
                iter, info.gap, nf, alpha
            );
        }
        if info.gap <= opts.tol_gap {
            info.status = SolveStatus::Converged;
            break;
        }
        if !accepted {
            // Line search stagnated; the gap above is the best certificate
            // this iterate can produce.
            break;
        }
    }

    match weights {
        EdgeWeights::Uniform(w) => ws.store_warm(&u, w),
        EdgeWeights::PerEdge(_) => ws.store_warm(&u, 1.0),
    }

    ws.release_f64(b);
    ws.release_f64(u);
    ws.release_f64(g);
    ws.release_f64(step);
    ws.release_f64(trial);
    ws.release_f64(piv);
    ws.release_f64(mult);
    ws.release_usize(free);
    info
}
