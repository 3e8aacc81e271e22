//! Fast proximity operators for Total Variation penalties.
//!
//! Everything here solves one problem shape,
//!
//! ```text
//! min_y  (1/2) ||x - y||^2  +  sum_k  w_k * ||D_k y||_{p_k}
//! ```
//!
//! where each `D_k` takes forward differences along one dimension of a
//! dense column-major `f64` tensor. Specialized solvers cover the common
//! cases and a dispatcher composes them for everything else:
//!
//! - **1-D TV-l1** ([`tv1_1d`], [`tv1w_1d`]): exact direct methods (taut
//!   string, Condat's sweep, Johnson's dynamic programming) plus a
//!   warm-startable projected Newton on the box dual, with scalar or
//!   per-difference weights
//! - **1-D TV-l2** ([`tv2_1d`]): More-Sorensen, projected gradient, or a
//!   hybrid of the two on the ball-constrained dual
//! - **1-D TV-lp** ([`tvp_1d`]): gradient projection, Frank-Wolfe and
//!   accelerated variants for any norm order `p >= 1`
//! - **2-D anisotropic TV** ([`tv1_2d`], [`tv1w_2d`], [`tvp_2d`]):
//!   Douglas-Rachford, proximal Dykstra and Yang's consensus ADMM built
//!   from parallel row/column fiber sweeps, plus a primal-dual iteration
//!   on the full difference stencil
//! - **N-D TV** ([`tvgen`]): arbitrary per-dimension penalty lists routed
//!   to the cheapest applicable solver, with Parallel-Proximal Dykstra as
//!   the general fallback
//!
//! Iterative solvers stop on a duality gap (1-D duals) or relative-change
//! tolerance (splitting loops). Hitting the iteration cap is not an
//! error: the best iterate comes back with [`SolveStatus::MaxIters`] in
//! its diagnostics. Degenerate problems (signals of length <= 1 along the
//! penalized dimensions, all-zero weights) return the input unchanged.
//!
//! The free functions below are one-shot; keep a [`TvSolver`] instead to
//! reuse scratch allocations and warm starts across solves.
//!
//! # Example
//!
//! ```ignore
//! use tv_core::{tv1_1d, SolveOptions, Tv1Method};
//!
//! let x = [1.0, 2.0, 3.0, 10.0, 10.0, 10.0];
//! let sol = tv1_1d(&x, 1.0, Tv1Method::TautString, &SolveOptions::default())?;
//! assert_eq!(sol.y.len(), x.len());
//! println!("prox = {:?} ({})", sol.y, sol.info.status);
//! ```
//!
//! # References
//!
//! - A. Barbero and S. Sra, "Modular proximal optimization for
//!   multidimensional total-variation regularization", JMLR 2018
//! - L. Condat, "A direct algorithm for 1-D total variation denoising",
//!   IEEE SPL 2013
//! - N. Johnson, "A dynamic programming algorithm for the fused lasso
//!   and L0-segmentation", JCGS 2013

#![allow(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::too_many_arguments)]

pub mod problem;
pub mod workspace;

mod ndim;
mod solver;
mod sweep;
mod tensor;
mod tv1d;
mod tv2d;

pub use problem::{
    Penalty, SolveInfo, SolveOptions, SolveStatus, Tv1Method, Tv1wMethod, Tv2Method, Tv2dMethod,
    TvError, TvSolution, TvpMethod,
};
pub use solver::TvSolver;
pub use workspace::Workspace;

/// 1-D TV-l1 prox: `min_y (1/2)||x - y||^2 + w * sum_i |y_i - y_{i+1}|`.
pub fn tv1_1d(
    x: &[f64],
    w: f64,
    method: Tv1Method,
    opts: &SolveOptions,
) -> Result<TvSolution, TvError> {
    TvSolver::with_options(opts.clone()).tv1_1d(x, w, method)
}

/// Weighted 1-D TV-l1 prox with one weight per difference,
/// `w.len() == x.len() - 1`.
pub fn tv1w_1d(
    x: &[f64],
    w: &[f64],
    method: Tv1wMethod,
    opts: &SolveOptions,
) -> Result<TvSolution, TvError> {
    TvSolver::with_options(opts.clone()).tv1w_1d(x, w, method)
}

/// 1-D TV-l2 prox: `min_y (1/2)||x - y||^2 + w * ||Dy||_2`.
pub fn tv2_1d(
    x: &[f64],
    w: f64,
    method: Tv2Method,
    opts: &SolveOptions,
) -> Result<TvSolution, TvError> {
    TvSolver::with_options(opts.clone()).tv2_1d(x, w, method)
}

/// 1-D TV-lp prox for any norm order `p >= 1`; `p = 1` and `p = 2` route
/// to the specialized l1 and l2 families.
pub fn tvp_1d(
    x: &[f64],
    w: f64,
    p: f64,
    method: TvpMethod,
    opts: &SolveOptions,
) -> Result<TvSolution, TvError> {
    TvSolver::with_options(opts.clone()).tvp_1d(x, w, p, method)
}

/// 2-D anisotropic TV-l1 prox over a column-major `[rows, cols]` matrix.
pub fn tv1_2d(
    x: &[f64],
    shape: &[usize],
    w: f64,
    method: Tv2dMethod,
    opts: &SolveOptions,
) -> Result<TvSolution, TvError> {
    TvSolver::with_options(opts.clone()).tv1_2d(x, shape, w, method)
}

/// Weighted 2-D anisotropic TV-l1 prox; `w_col` is a column-major
/// `(rows - 1, cols)` tensor of dimension-0 edge weights, `w_row` a
/// `(rows, cols - 1)` tensor for dimension 1.
pub fn tv1w_2d(
    x: &[f64],
    shape: &[usize],
    w_col: &[f64],
    w_row: &[f64],
    opts: &SolveOptions,
) -> Result<TvSolution, TvError> {
    TvSolver::with_options(opts.clone()).tv1w_2d(x, shape, w_col, w_row)
}

/// 2-D TV prox with per-axis weights `(w_col, w_row)` and norm orders
/// `(p_col, p_row)`.
pub fn tvp_2d(
    x: &[f64],
    shape: &[usize],
    w: (f64, f64),
    p: (f64, f64),
    opts: &SolveOptions,
) -> Result<TvSolution, TvError> {
    TvSolver::with_options(opts.clone()).tvp_2d(x, shape, w, p)
}

/// General N-D TV prox over an arbitrary penalty list.
pub fn tvgen(
    x: &[f64],
    shape: &[usize],
    penalties: &[Penalty],
    opts: &SolveOptions,
) -> Result<TvSolution, TvError> {
    TvSolver::with_options(opts.clone()).tvgen(x, shape, penalties)
}
