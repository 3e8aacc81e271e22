//! Yang et al.'s consensus ADMM for the anisotropic 2-D case.
//!
//! One copy of the signal per penalty term. Each outer iteration proxes
//! both copies along their axes at the consensus point shifted by the
//! scaled duals, then re-averages the copies with the data term
//! (`rho = 1`, so the averaging weight is exactly 1/3).

use crate::problem::{SolveInfo, SolveOptions, SolveStatus};
use crate::sweep::{prox_sweep_dim, FiberKernel};
use crate::tv2d::{rel_change, AxisTerm};
use crate::workspace::Workspace;

/// Outer-iteration cap when `SolveOptions::max_iters` is unset.
pub(crate) const YANG_MAX_ITERS: usize = 200;

pub(crate) fn yang(
    x: &[f64],
    shape: &[usize],
    col: AxisTerm<'_>,
    row: AxisTerm<'_>,
    y: &mut [f64],
    opts: &SolveOptions,
    ws: &mut Workspace,
) -> SolveInfo {
    debug_assert_eq!(shape.len(), 2);
    let total = x.len();

    let col_kernel = FiberKernel::new(col.weights, col.p, opts.tol_gap, 0);
    let row_kernel = FiberKernel::new(row.weights, row.p, opts.tol_gap, 0);

    let mut z1 = ws.acquire_f64(total);
    let mut z2 = ws.acquire_f64(total);
    let mut u1 = ws.acquire_f64(total);
    let mut u2 = ws.acquire_f64(total);
    let mut t = ws.acquire_f64(total);
    let mut prev = ws.acquire_f64(total);

    u1.iter_mut().for_each(|v| *v = 0.0);
    u2.iter_mut().for_each(|v| *v = 0.0);
    y.copy_from_slice(x);

    let cap = opts.iter_cap(YANG_MAX_ITERS);
    let mut info = SolveInfo {
        iters: 0,
        gap: f64::INFINITY,
        status: SolveStatus::MaxIters,
    };
    for iter in 0..cap {
        // Column copy.
        for i in 0..total {
            t[i] = y[i] + u1[i];
        }
        prox_sweep_dim(&t, &mut z1, shape, 0, &col_kernel, opts.threads, ws);
        for i in 0..total {
            u1[i] = t[i] - z1[i];
        }

        // Row copy.
        for i in 0..total {
            t[i] = y[i] + u2[i];
        }
        prox_sweep_dim(&t, &mut z2, shape, 1, &row_kernel, opts.threads, ws);
        for i in 0..total {
            u2[i] = t[i] - z2[i];
        }

        // Consensus average with the data term.
        prev.copy_from_slice(y);
        for i in 0..total {
            y[i] = (x[i] + z1[i] - u1[i] + z2[i] - u2[i]) / 3.0;
        }
        let rel = rel_change(y, &prev);

        info.iters = iter + 1;
        info.gap = rel;
        if opts.verbose {
            println!("yang iter {:4} change={:.3e}", iter, rel);
        }
        if rel <= opts.tol_change {
            info.status = SolveStatus::Converged;
            break;
        }
    }

    ws.release_f64(z1);
    ws.release_f64(z2);
    ws.release_f64(u1);
    ws.release_f64(u2);
    ws.release_f64(t);
    ws.release_f64(prev);
    info
}
