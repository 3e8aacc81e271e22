//! Caller-facing solve surface.
//!
//! [`TvSolver`] owns the options plus a [`Workspace`], so a solver kept
//! across calls reuses its scratch buffers and lets projected Newton warm
//! start from the previous dual. The free functions in the crate root
//! wrap a one-shot solver around these same methods.
//!
//! Every method validates its inputs up front and returns the identity
//! for degenerate problems (signals of length <= 1 along every penalized
//! dimension, all weights zero) without touching a kernel.

use crate::ndim;
use crate::problem::{
    check_norm, check_rank, check_shape, check_signal, check_weight, check_weights, Penalty,
    SolveInfo, SolveOptions, Tv1Method, Tv1wMethod, Tv2Method, Tv2dMethod, TvError, TvSolution,
    TvpMethod,
};
use crate::sweep::{run_parallel, FiberWeights};
use crate::tensor::FiberLayout;
use crate::tv1d::{condat, johnson, lp, newton, quad, tautstring, EdgeWeights};
use crate::tv2d::dr::douglas_rachford;
use crate::tv2d::primal_dual::{primal_dual, PdVariant};
use crate::tv2d::yang::yang;
use crate::tv2d::AxisTerm;
use crate::workspace::Workspace;

/// Run `f` on a dedicated pool when more than one worker is requested;
/// single-threaded solves never touch rayon.
fn with_pool<R: Send>(threads: usize, f: impl FnOnce() -> R + Send) -> R {
    if threads <= 1 {
        f()
    } else {
        run_parallel(threads, f)
    }
}

/// Reusable solver: options plus scratch and warm-start state.
///
/// ```ignore
/// let mut solver = TvSolver::new();
/// let a = solver.tv1_1d(&x, 0.9, Tv1Method::ProjectedNewton)?;
/// // same solver again: buffers are reused and the Newton solve warm
/// // starts from the dual of the previous call
/// let b = solver.tv1_1d(&x, 1.1, Tv1Method::ProjectedNewton)?;
/// ```
#[derive(Debug, Default)]
pub struct TvSolver {
    opts: SolveOptions,
    ws: Workspace,
}

impl TvSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(opts: SolveOptions) -> Self {
        TvSolver {
            opts,
            ws: Workspace::new(),
        }
    }

    pub fn options(&self) -> &SolveOptions {
        &self.opts
    }

    pub fn options_mut(&mut self) -> &mut SolveOptions {
        &mut self.opts
    }

    /// Drop the stored warm-start dual, e.g. before moving the solver to
    /// an unrelated signal. Never required for correctness: stale duals
    /// are rescaled or rejected by shape before use.
    pub fn reset_warm(&mut self) {
        self.ws.clear_warm();
    }

    // ------------------------------------------------------------------
    // 1-D families
    // ------------------------------------------------------------------

    /// 1-D TV-l1 prox: `min_y (1/2)||x - y||^2 + w * sum_i |y_i - y_{i+1}|`.
    ///
    /// The taut-string, Condat and DP methods are direct and report an
    /// exact solve; projected Newton iterates on the box dual and is the
    /// one method that warm starts across calls.
    pub fn tv1_1d(&mut self, x: &[f64], w: f64, method: Tv1Method) -> Result<TvSolution, TvError> {
        self.opts.validate()?;
        check_signal(x)?;
        check_weight(w)?;
        if x.len() <= 1 || w == 0.0 {
            return Ok(TvSolution::identity(x));
        }

        let mut y = vec![0.0; x.len()];
        let info = match method {
            Tv1Method::TautString => {
                tautstring::taut_string(x, w, &mut y, &mut self.ws);
                SolveInfo::exact()
            }
            Tv1Method::ProjectedNewton => {
                newton::projected_newton(x, EdgeWeights::Uniform(w), &mut y, &self.opts, &mut self.ws)
            }
            Tv1Method::Condat => {
                condat::condat_sweep(x, w, &mut y);
                SolveInfo::exact()
            }
            Tv1Method::Dp => {
                johnson::johnson_dp(x, w, &mut y, &mut self.ws);
                SolveInfo::exact()
            }
        };
        Ok(TvSolution::new(y, info))
    }

    /// Weighted 1-D TV-l1 prox with one weight per difference,
    /// `w.len() == x.len() - 1`. Zero entries leave their jump untouched.
    pub fn tv1w_1d(
        &mut self,
        x: &[f64],
        w: &[f64],
        method: Tv1wMethod,
    ) -> Result<TvSolution, TvError> {
        self.opts.validate()?;
        check_signal(x)?;
        check_weights(w)?;
        let edges = x.len().saturating_sub(1);
        if w.len() != edges {
            return Err(TvError::EdgeWeightMismatch {
                dim: 0,
                expected: edges,
                got: w.len(),
            });
        }
        if edges == 0 || w.iter().all(|&v| v == 0.0) {
            return Ok(TvSolution::identity(x));
        }

        let mut y = vec![0.0; x.len()];
        let info = match method {
            Tv1wMethod::TautString => {
                tautstring::taut_string_weighted(x, w, &mut y, &mut self.ws);
                SolveInfo::exact()
            }
            Tv1wMethod::ProjectedNewton => {
                newton::projected_newton(x, EdgeWeights::PerEdge(w), &mut y, &self.opts, &mut self.ws)
            }
        };
        Ok(TvSolution::new(y, info))
    }

    /// 1-D TV-l2 prox: `min_y (1/2)||x - y||^2 + w * ||Dy||_2`.
    pub fn tv2_1d(&mut self, x: &[f64], w: f64, method: Tv2Method) -> Result<TvSolution, TvError> {
        self.opts.validate()?;
        check_signal(x)?;
        check_weight(w)?;
        if x.len() <= 1 || w == 0.0 {
            return Ok(TvSolution::identity(x));
        }

        let mut y = vec![0.0; x.len()];
        let tol = self.opts.tol_gap;
        let info = match method {
            Tv2Method::MoreSorensen => {
                let cap = self.opts.iter_cap(quad::MS_MAX_ITERS);
                quad::more_sorensen(x, w, &mut y, tol, cap, &mut self.ws)
            }
            Tv2Method::ProjectedGradient => {
                let cap = self.opts.iter_cap(quad::PG_MAX_ITERS);
                quad::projected_gradient(x, w, &mut y, tol, cap, &mut self.ws)
            }
            Tv2Method::Hybrid => {
                let cap = self.opts.iter_cap(quad::HYBRID_MAX_ITERS);
                quad::hybrid(x, w, &mut y, tol, cap, &mut self.ws)
            }
        };
        Ok(TvSolution::new(y, info))
    }

    /// 1-D TV-lp prox: `min_y (1/2)||x - y||^2 + w * ||Dy||_p`, `p >= 1`.
    ///
    /// `p = 1` routes to the taut string and `p = 2` to the l2 hybrid;
    /// the requested method only picks the solver for genuinely
    /// general norm orders.
    pub fn tvp_1d(
        &mut self,
        x: &[f64],
        w: f64,
        p: f64,
        method: TvpMethod,
    ) -> Result<TvSolution, TvError> {
        self.opts.validate()?;
        check_signal(x)?;
        check_weight(w)?;
        check_norm(p)?;
        if x.len() <= 1 || w == 0.0 {
            return Ok(TvSolution::identity(x));
        }
        if p == 1.0 {
            let mut y = vec![0.0; x.len()];
            tautstring::taut_string(x, w, &mut y, &mut self.ws);
            return Ok(TvSolution::new(y, SolveInfo::exact()));
        }
        if p == 2.0 {
            return self.tv2_1d(x, w, Tv2Method::Hybrid);
        }

        let mut y = vec![0.0; x.len()];
        let tol = self.opts.tol_gap;
        let cap = self.opts.iter_cap(lp::LP_MAX_ITERS);
        let ws = &mut self.ws;
        let info = match method {
            TvpMethod::GradientProjection => lp::gradient_projection(x, w, p, &mut y, tol, cap, ws),
            TvpMethod::FrankWolfe => lp::frank_wolfe(x, w, p, &mut y, tol, cap, ws),
            TvpMethod::Hybrid => lp::hybrid(x, w, p, &mut y, tol, cap, ws),
            TvpMethod::OptimalGradient => lp::optimal_gradient(x, w, p, &mut y, tol, cap, ws),
            TvpMethod::Fista => lp::fista(x, w, p, &mut y, tol, cap, ws),
        };
        Ok(TvSolution::new(y, info))
    }

    // ------------------------------------------------------------------
    // 2-D families
    // ------------------------------------------------------------------

    /// 2-D anisotropic TV-l1 prox over a column-major `shape = [rows,
    /// cols]` matrix: both axes penalized at weight `w` with the l1 norm.
    pub fn tv1_2d(
        &mut self,
        x: &[f64],
        shape: &[usize],
        w: f64,
        method: Tv2dMethod,
    ) -> Result<TvSolution, TvError> {
        self.opts.validate()?;
        check_rank(shape, 2)?;
        check_shape(shape, x.len())?;
        check_signal(x)?;
        check_weight(w)?;
        if x.is_empty() || w == 0.0 || (shape[0] <= 1 && shape[1] <= 1) {
            return Ok(TvSolution::identity(x));
        }

        let mut y = vec![0.0; x.len()];
        let threads = self.opts.threads;
        let opts = &self.opts;
        let ws = &mut self.ws;
        let col = AxisTerm {
            weights: FiberWeights::Uniform(w),
            p: 1.0,
        };
        let row = AxisTerm {
            weights: FiberWeights::Uniform(w),
            p: 1.0,
        };
        let info = match method {
            Tv2dMethod::DouglasRachford => {
                with_pool(threads, || douglas_rachford(x, shape, col, row, &mut y, opts, ws))
            }
            Tv2dMethod::ProximalDykstra => {
                let a = Penalty::new(w, 0, 1.0);
                let b = Penalty::new(w, 1, 1.0);
                with_pool(threads, || ndim::dykstra2(x, shape, a, b, &mut y, opts, ws))
            }
            Tv2dMethod::Yang => with_pool(threads, || yang(x, shape, col, row, &mut y, opts, ws)),
            Tv2dMethod::Condat => primal_dual(
                x,
                shape,
                EdgeWeights::Uniform(w),
                EdgeWeights::Uniform(w),
                PdVariant::Condat,
                &mut y,
                opts,
                ws,
            ),
            Tv2dMethod::ChambollePock => primal_dual(
                x,
                shape,
                EdgeWeights::Uniform(w),
                EdgeWeights::Uniform(w),
                PdVariant::ChambollePock,
                &mut y,
                opts,
                ws,
            ),
        };
        Ok(TvSolution::new(y, info))
    }

    /// Weighted 2-D anisotropic TV-l1 prox.
    ///
    /// `w_col` weighs the differences along dimension 0 and is a
    /// column-major `(rows - 1, cols)` tensor; `w_row` weighs dimension 1
    /// as `(rows, cols - 1)`. Solved with Douglas-Rachford over weighted
    /// fiber sweeps.
    pub fn tv1w_2d(
        &mut self,
        x: &[f64],
        shape: &[usize],
        w_col: &[f64],
        w_row: &[f64],
    ) -> Result<TvSolution, TvError> {
        self.opts.validate()?;
        check_rank(shape, 2)?;
        check_shape(shape, x.len())?;
        check_signal(x)?;
        check_weights(w_col)?;
        check_weights(w_row)?;
        let (rows, cols) = (shape[0], shape[1]);
        let col_edges = rows.saturating_sub(1) * cols;
        let row_edges = rows * cols.saturating_sub(1);
        if w_col.len() != col_edges {
            return Err(TvError::EdgeWeightMismatch {
                dim: 0,
                expected: col_edges,
                got: w_col.len(),
            });
        }
        if w_row.len() != row_edges {
            return Err(TvError::EdgeWeightMismatch {
                dim: 1,
                expected: row_edges,
                got: w_row.len(),
            });
        }
        let all_zero = w_col.iter().all(|&v| v == 0.0) && w_row.iter().all(|&v| v == 0.0);
        if x.is_empty() || all_zero {
            return Ok(TvSolution::identity(x));
        }

        let mut y = vec![0.0; x.len()];
        let threads = self.opts.threads;
        let opts = &self.opts;
        let ws = &mut self.ws;
        let col = AxisTerm {
            weights: FiberWeights::Tensor {
                data: w_col,
                layout: FiberLayout::new(&[rows - 1, cols], 0),
            },
            p: 1.0,
        };
        let row = AxisTerm {
            weights: FiberWeights::Tensor {
                data: w_row,
                layout: FiberLayout::new(&[rows, cols - 1], 1),
            },
            p: 1.0,
        };
        let info = with_pool(threads, || douglas_rachford(x, shape, col, row, &mut y, opts, ws));
        Ok(TvSolution::new(y, info))
    }

    /// 2-D TV prox with per-axis weights and norm orders,
    /// `w = (w_col, w_row)` and `p = (p_col, p_row)`.
    pub fn tvp_2d(
        &mut self,
        x: &[f64],
        shape: &[usize],
        w: (f64, f64),
        p: (f64, f64),
    ) -> Result<TvSolution, TvError> {
        self.opts.validate()?;
        check_rank(shape, 2)?;
        check_shape(shape, x.len())?;
        check_signal(x)?;
        check_weight(w.0)?;
        check_weight(w.1)?;
        check_norm(p.0)?;
        check_norm(p.1)?;
        if x.is_empty() || (w.0 == 0.0 && w.1 == 0.0) || (shape[0] <= 1 && shape[1] <= 1) {
            return Ok(TvSolution::identity(x));
        }

        let mut y = vec![0.0; x.len()];
        let threads = self.opts.threads;
        let opts = &self.opts;
        let ws = &mut self.ws;
        let col = AxisTerm {
            weights: FiberWeights::Uniform(w.0),
            p: p.0,
        };
        let row = AxisTerm {
            weights: FiberWeights::Uniform(w.1),
            p: p.1,
        };
        let info = with_pool(threads, || douglas_rachford(x, shape, col, row, &mut y, opts, ws));
        Ok(TvSolution::new(y, info))
    }

    // ------------------------------------------------------------------
    // General dispatcher
    // ------------------------------------------------------------------

    /// General TV prox: `min_y (1/2)||x - y||^2 + sum_k w_k ||D y||_{p_k}`
    /// with each term differencing along its own tensor dimension.
    ///
    /// Routes to the cheapest applicable solver: a direct sweep for one
    /// active term, Douglas-Rachford when two terms cover both axes of a
    /// matrix, two-set proximal Dykstra for any other pair, and
    /// Parallel-Proximal Dykstra beyond that. Zero-weight terms are
    /// dropped before routing.
    pub fn tvgen(
        &mut self,
        x: &[f64],
        shape: &[usize],
        penalties: &[Penalty],
    ) -> Result<TvSolution, TvError> {
        self.opts.validate()?;
        check_shape(shape, x.len())?;
        check_signal(x)?;
        for t in penalties {
            t.validate(shape.len())?;
        }
        if x.is_empty() {
            return Ok(TvSolution::identity(x));
        }

        let mut y = vec![0.0; x.len()];
        let threads = self.opts.threads;
        let opts = &self.opts;
        let ws = &mut self.ws;
        let info = with_pool(threads, || ndim::dispatch(x, shape, penalties, &mut y, opts, ws));
        Ok(TvSolution::new(y, info))
    }
}
