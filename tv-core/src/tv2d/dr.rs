//! Douglas-Rachford splitting for two anisotropic penalty terms.
//!
//! `min_Y (1/2)||X - Y||^2 + g_col(Y) + g_row(Y)` splits as `F1 = g_row`
//! and `F2 = (1/2)||. - X||^2 + g_col`. Completing the square turns the
//! prox of `F2` at `T` into the column prox of `(T + X) / 2` at half
//! weight, so every iteration is one row sweep, one column sweep, and a
//! reflection update of the splitting variable. Both sweeps spread over
//! the worker pool; the 1-D kernels come from the axis terms, so the same
//! loop covers the scalar, per-edge-weighted, and general-norm variants.

use crate::problem::{SolveInfo, SolveOptions, SolveStatus};
use crate::sweep::{prox_sweep_dim, FiberKernel};
use crate::tv2d::AxisTerm;
use crate::workspace::Workspace;

/// Outer-iteration cap when `SolveOptions::max_iters` is unset.
pub(crate) const DR_MAX_ITERS: usize = 100;

pub(crate) fn douglas_rachford(
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

    let row_kernel = FiberKernel::new(row.weights, row.p, opts.tol_gap, 0);
    let col_kernel = FiberKernel::new(col.weights, col.p, opts.tol_gap, 0).with_scale(0.5);

    let mut s = ws.acquire_f64(total);
    let mut z = ws.acquire_f64(total);
    let mut t = ws.acquire_f64(total);
    s.copy_from_slice(x);

    let cap = opts.iter_cap(DR_MAX_ITERS);
    let mut info = SolveInfo {
        iters: 0,
        gap: f64::INFINITY,
        status: SolveStatus::MaxIters,
    };
    for iter in 0..cap {
        // Row prox at the splitting variable.
        let ri = prox_sweep_dim(&s, y, shape, 1, &row_kernel, opts.threads, ws);

        // Column prox of the reflection, averaged with the input.
        for i in 0..total {
            t[i] = 0.5 * (2.0 * y[i] - s[i] + x[i]);
        }
        let ci = prox_sweep_dim(&t, &mut z, shape, 0, &col_kernel, opts.threads, ws);

        let mut num = 0.0;
        let mut den = 0.0;
        for i in 0..total {
            let d = z[i] - y[i];
            s[i] += d;
            num += d * d;
            den += y[i] * y[i];
        }
        let rel = num.sqrt() / (den.sqrt() + 1e-15);

        info.iters = iter + 1;
        info.gap = rel;
        if opts.verbose {
            println!(
                "dr iter {:4} change={:.3e} row_gap={:.3e} col_gap={:.3e}",
                iter, rel, ri.max_gap, ci.max_gap
            );
        }
        if rel <= opts.tol_change {
            info.status = SolveStatus::Converged;
            break;
        }
    }

    y.copy_from_slice(&z);

    ws.release_f64(s);
    ws.release_f64(z);
    ws.release_f64(t);
    info
}
