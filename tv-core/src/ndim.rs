//! Multidimensional dispatcher.
//!
//! `dispatch` routes a list of per-dimension penalty terms to the
//! cheapest solver that covers it: a direct fiber sweep for one term,
//! the 2-D Douglas-Rachford loop when exactly two terms cover both
//! dimensions of a matrix, two-set proximal Dykstra for any other pair,
//! and Parallel-Proximal Dykstra in the k-fold product space for three
//! or more terms.
//!
//! The 2-D fast-path predicate is set-based: the two terms may name the
//! dimensions in either order and are mapped onto their axes before the
//! solve, so term order never changes the result.

use crate::problem::{Penalty, SolveInfo, SolveOptions, SolveStatus};
use crate::sweep::{prox_sweep_dim, FiberKernel, FiberWeights, SweepInfo};
use crate::tv2d::dr::douglas_rachford;
use crate::tv2d::{rel_change, AxisTerm};
use crate::workspace::Workspace;

/// Outer-iteration caps when `SolveOptions::max_iters` is unset.
pub(crate) const DYKSTRA_MAX_ITERS: usize = 100;
pub(crate) const PPD_MAX_ITERS: usize = 100;

fn kernel_for(t: &Penalty, opts: &SolveOptions) -> FiberKernel<'static> {
    FiberKernel::new(FiberWeights::Uniform(t.weight), t.p, opts.tol_gap, 0)
}

fn axis_term(t: &Penalty) -> AxisTerm<'static> {
    AxisTerm {
        weights: FiberWeights::Uniform(t.weight),
        p: t.p,
    }
}

fn sweep_to_solve(si: SweepInfo) -> SolveInfo {
    SolveInfo {
        iters: si.max_iters,
        gap: si.max_gap,
        status: if si.all_converged {
            SolveStatus::Converged
        } else {
            SolveStatus::MaxIters
        },
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Solve `min_y (1/2)||x - y||^2 + sum_k w_k ||D y||_{p_k} along dim_k`
/// for an already validated penalty list.
pub(crate) fn dispatch(
    x: &[f64],
    shape: &[usize],
    penalties: &[Penalty],
    y: &mut [f64],
    opts: &SolveOptions,
    ws: &mut Workspace,
) -> SolveInfo {
    let active: Vec<Penalty> = penalties
        .iter()
        .copied()
        .filter(|t| t.weight > 0.0)
        .collect();

    match active.len() {
        0 => {
            y.copy_from_slice(x);
            SolveInfo::exact()
        }
        1 => {
            // Direct sweep; the option cap applies to the fiber solves
            // themselves since there is no outer loop.
            let t = active[0];
            let kernel = FiberKernel {
                max_iters: opts.max_iters,
                ..kernel_for(&t, opts)
            };
            let si = prox_sweep_dim(x, y, shape, t.dim, &kernel, opts.threads, ws);
            sweep_to_solve(si)
        }
        2 if shape.len() == 2 && active[0].dim != active[1].dim => {
            // Matrix covered along both axes: Douglas-Rachford fast path,
            // terms mapped onto their dimensions.
            let (col, row) = if active[0].dim == 0 {
                (active[0], active[1])
            } else {
                (active[1], active[0])
            };
            douglas_rachford(x, shape, axis_term(&col), axis_term(&row), y, opts, ws)
        }
        2 => dykstra2(x, shape, active[0], active[1], y, opts, ws),
        _ => parallel_dykstra(x, shape, &active, y, opts, ws),
    }
}

// ============================================================================
// Two-set proximal Dykstra
// ============================================================================

/// Classic two-function proximal Dykstra: alternate the two proxes at
/// their nominal weights with one correction vector each. Also serves
/// the 2-D `pd` method selector.
pub(crate) fn dykstra2(
    x: &[f64],
    shape: &[usize],
    a: Penalty,
    b: Penalty,
    y: &mut [f64],
    opts: &SolveOptions,
    ws: &mut Workspace,
) -> SolveInfo {
    let total = x.len();
    let ka = kernel_for(&a, opts);
    let kb = kernel_for(&b, opts);

    let mut pa = ws.acquire_f64(total);
    let mut qb = ws.acquire_f64(total);
    let mut t = ws.acquire_f64(total);
    let mut z = ws.acquire_f64(total);
    let mut prev = ws.acquire_f64(total);
    pa.iter_mut().for_each(|v| *v = 0.0);
    qb.iter_mut().for_each(|v| *v = 0.0);
    y.copy_from_slice(x);

    let cap = opts.iter_cap(DYKSTRA_MAX_ITERS);
    let mut info = SolveInfo {
        iters: 0,
        gap: f64::INFINITY,
        status: SolveStatus::MaxIters,
    };
    for iter in 0..cap {
        prev.copy_from_slice(y);

        for i in 0..total {
            t[i] = y[i] + pa[i];
        }
        prox_sweep_dim(&t, &mut z, shape, a.dim, &ka, opts.threads, ws);
        for i in 0..total {
            pa[i] = t[i] - z[i];
        }

        for i in 0..total {
            t[i] = z[i] + qb[i];
        }
        prox_sweep_dim(&t, y, shape, b.dim, &kb, opts.threads, ws);
        for i in 0..total {
            qb[i] = t[i] - y[i];
        }

        let rel = rel_change(y, &prev);
        info.iters = iter + 1;
        info.gap = rel;
        if opts.verbose {
            println!("dykstra iter {:4} change={:.3e}", iter, rel);
        }
        if rel <= opts.tol_change {
            info.status = SolveStatus::Converged;
            break;
        }
    }

    ws.release_f64(pa);
    ws.release_f64(qb);
    ws.release_f64(t);
    ws.release_f64(z);
    ws.release_f64(prev);
    info
}

// ============================================================================
// Parallel-Proximal Dykstra
// ============================================================================

/// Dykstra in the k-fold product space with uniform averaging weights.
/// The consensus metric scales each term's prox by k, so every sweep
/// runs at weight `k * w_i`.
fn parallel_dykstra(
    x: &[f64],
    shape: &[usize],
    terms: &[Penalty],
    y: &mut [f64],
    opts: &SolveOptions,
    ws: &mut Workspace,
) -> SolveInfo {
    let total = x.len();
    let k = terms.len();

    let kernels: Vec<FiberKernel<'static>> = terms
        .iter()
        .map(|t| kernel_for(t, opts).with_scale(k as f64))
        .collect();

    let mut prox: Vec<Vec<f64>> = (0..k).map(|_| ws.acquire_f64(total)).collect();
    let mut corr_p: Vec<Vec<f64>> = (0..k).map(|_| ws.acquire_f64(total)).collect();
    let mut corr_q: Vec<Vec<f64>> = (0..k).map(|_| ws.acquire_f64(total)).collect();
    let mut t = ws.acquire_f64(total);
    let mut prev = ws.acquire_f64(total);
    for buf in corr_p.iter_mut().chain(corr_q.iter_mut()) {
        buf.iter_mut().for_each(|v| *v = 0.0);
    }
    y.copy_from_slice(x);

    let cap = opts.iter_cap(PPD_MAX_ITERS);
    let mut info = SolveInfo {
        iters: 0,
        gap: f64::INFINITY,
        status: SolveStatus::MaxIters,
    };
    for iter in 0..cap {
        prev.copy_from_slice(y);

        for (i, term) in terms.iter().enumerate() {
            for j in 0..total {
                t[j] = y[j] + corr_p[i][j];
            }
            prox_sweep_dim(&t, &mut prox[i], shape, term.dim, &kernels[i], opts.threads, ws);
            for j in 0..total {
                corr_p[i][j] = t[j] - prox[i][j];
            }
        }

        // Consensus average, then the corrections toward it.
        let inv = 1.0 / k as f64;
        for j in 0..total {
            let mut acc = 0.0;
            for i in 0..k {
                acc += prox[i][j] + corr_q[i][j];
            }
            y[j] = acc * inv;
        }
        for i in 0..k {
            for j in 0..total {
                corr_q[i][j] += prox[i][j] - y[j];
            }
        }

        let rel = rel_change(y, &prev);
        info.iters = iter + 1;
        info.gap = rel;
        if opts.verbose {
            println!("ppd iter {:4} change={:.3e} terms={}", iter, rel, k);
        }
        if rel <= opts.tol_change {
            info.status = SolveStatus::Converged;
            break;
        }
    }

    for buf in prox.into_iter().chain(corr_p).chain(corr_q) {
        ws.release_f64(buf);
    }
    ws.release_f64(t);
    ws.release_f64(prev);
    info
}
