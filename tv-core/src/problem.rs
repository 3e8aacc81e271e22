//! Problem parameters, method selectors, diagnostics and validation.
//!
//! This module defines the types shared by every solver family: the
//! options struct, the per-family method tags, multidimensional penalty
//! terms, the solve diagnostics record and the error taxonomy.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

/// Contract violations detected before any solve begins.
///
/// Non-convergence is never an error: hitting the iteration cap returns
/// the best iterate with [`SolveStatus::MaxIters`]. Degenerate inputs
/// (signals of length <= 1, all-zero weights) return the input unchanged.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TvError {
    /// Penalty weights must be finite and nonnegative.
    #[error("penalty weight must be finite and nonnegative, got {0}")]
    BadWeight(f64),

    /// Norm orders must be finite and at least 1 (the penalty is convex).
    #[error("norm order must be finite and >= 1, got {0}")]
    BadNorm(f64),

    /// The line-search sufficient-decrease fraction must lie in (0, 1).
    #[error("line-search sigma must lie in (0, 1), got {0}")]
    BadSigma(f64),

    /// A method tag not recognized by the solver family it was passed to.
    #[error("unknown {family} method `{name}`")]
    UnknownMethod {
        family: &'static str,
        name: String,
    },

    /// Signal buffer does not match the declared shape.
    #[error("signal of shape {shape:?} needs {expected} samples, buffer has {got}")]
    ShapeMismatch {
        shape: Vec<usize>,
        expected: usize,
        got: usize,
    },

    /// Per-edge weight buffer of the wrong length for its dimension.
    #[error("edge weights along dim {dim}: expected {expected} entries, got {got}")]
    EdgeWeightMismatch {
        dim: usize,
        expected: usize,
        got: usize,
    },

    /// A penalty names a dimension the signal does not have.
    #[error("penalty dimension {dim} out of range for rank-{rank} signal")]
    DimOutOfRange { dim: usize, rank: usize },

    /// Operation requires a signal of a fixed rank.
    #[error("expected a rank-{expected} signal, got rank {got}")]
    RankMismatch { expected: usize, got: usize },

    /// Shapes must have at least one dimension.
    #[error("signal shape must have at least one dimension")]
    EmptyShape,

    /// Signal samples must be finite.
    #[error("signal sample {index} is not finite")]
    NonFinite { index: usize },

    /// At least one worker thread is required.
    #[error("thread count must be at least 1")]
    ZeroThreads,
}

pub(crate) fn check_weight(w: f64) -> Result<(), TvError> {
    if !w.is_finite() || w < 0.0 {
        return Err(TvError::BadWeight(w));
    }
    Ok(())
}

pub(crate) fn check_weights(ws: &[f64]) -> Result<(), TvError> {
    for &w in ws {
        check_weight(w)?;
    }
    Ok(())
}

pub(crate) fn check_norm(p: f64) -> Result<(), TvError> {
    if !p.is_finite() || p < 1.0 {
        return Err(TvError::BadNorm(p));
    }
    Ok(())
}

pub(crate) fn check_signal(x: &[f64]) -> Result<(), TvError> {
    match x.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(TvError::NonFinite { index }),
        None => Ok(()),
    }
}

pub(crate) fn check_shape(shape: &[usize], buf_len: usize) -> Result<(), TvError> {
    if shape.is_empty() {
        return Err(TvError::EmptyShape);
    }
    let expected = crate::tensor::total_len(shape);
    if expected != buf_len {
        return Err(TvError::ShapeMismatch {
            shape: shape.to_vec(),
            expected,
            got: buf_len,
        });
    }
    Ok(())
}

pub(crate) fn check_rank(shape: &[usize], expected: usize) -> Result<(), TvError> {
    if shape.len() != expected {
        return Err(TvError::RankMismatch {
            expected,
            got: shape.len(),
        });
    }
    Ok(())
}

// ============================================================================
// Options
// ============================================================================

/// Solver options shared by every family.
#[derive(Debug, Clone)]
pub struct SolveOptions {
    /// Iteration cap for iterative solvers; 0 selects the per-method default.
    pub max_iters: usize,

    /// Worker threads for fiber sweeps (>= 1). With 1 the engine runs fully
    /// sequential and never touches a thread pool.
    pub threads: usize,

    /// Sufficient-decrease fraction of the projected-Newton line search.
    pub sigma: f64,

    /// Absolute duality-gap tolerance of the 1-D dual solvers.
    pub tol_gap: f64,

    /// Relative-change tolerance of the splitting outer loops.
    pub tol_change: f64,

    /// Print per-iteration progress of iterative solvers.
    pub verbose: bool,
}

impl Default for SolveOptions {
    fn default() -> Self {
        // Environment overrides for retuning deployed binaries without a
        // rebuild; unset or unparsable values fall back to the defaults.
        let max_iters = std::env::var("TV_MAX_ITERS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(0);
        let threads = std::env::var("TV_THREADS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|&t| t >= 1)
            .unwrap_or(1);

        Self {
            max_iters,
            threads,
            sigma: 0.05,
            tol_gap: 1e-12,
            tol_change: 1e-10,
            verbose: std::env::var("TV_VERBOSE")
                .map(|s| s == "1" || s.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }
}

impl SolveOptions {
    /// Check option ranges before a solve.
    pub fn validate(&self) -> Result<(), TvError> {
        if self.threads == 0 {
            return Err(TvError::ZeroThreads);
        }
        if !self.sigma.is_finite() || self.sigma <= 0.0 || self.sigma >= 1.0 {
            return Err(TvError::BadSigma(self.sigma));
        }
        Ok(())
    }

    /// The effective iteration cap: `max_iters`, or `fallback` when unset.
    pub(crate) fn iter_cap(&self, fallback: usize) -> usize {
        if self.max_iters == 0 {
            fallback
        } else {
            self.max_iters
        }
    }
}

// ============================================================================
// Method selectors
// ============================================================================

/// 1-D TV-l1 methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tv1Method {
    /// Exact taut-string walk over the prefix-sum tube (default).
    #[default]
    TautString,
    /// Projected Newton on the box-constrained dual; warm-startable.
    ProjectedNewton,
    /// Condat's direct segment sweep.
    Condat,
    /// Johnson's dynamic programming over clipped derivative messages.
    Dp,
}

impl FromStr for Tv1Method {
    type Err = TvError;

    fn from_str(s: &str) -> Result<Self, TvError> {
        match s {
            "tautstring" => Ok(Self::TautString),
            "pn" => Ok(Self::ProjectedNewton),
            "condat" => Ok(Self::Condat),
            "dp" => Ok(Self::Dp),
            _ => Err(TvError::UnknownMethod {
                family: "tv1_1d",
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Tv1Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::TautString => "tautstring",
            Self::ProjectedNewton => "pn",
            Self::Condat => "condat",
            Self::Dp => "dp",
        };
        write!(f, "{tag}")
    }
}

/// 1-D weighted TV-l1 methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tv1wMethod {
    /// Weighted taut string with per-edge tube half-widths (default).
    #[default]
    TautString,
    /// Projected Newton with a per-coordinate dual box.
    ProjectedNewton,
}

impl FromStr for Tv1wMethod {
    type Err = TvError;

    fn from_str(s: &str) -> Result<Self, TvError> {
        match s {
            "tautstring" => Ok(Self::TautString),
            "pn" => Ok(Self::ProjectedNewton),
            _ => Err(TvError::UnknownMethod {
                family: "tv1w_1d",
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Tv1wMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::TautString => "tautstring",
            Self::ProjectedNewton => "pn",
        };
        write!(f, "{tag}")
    }
}

/// 1-D TV-l2 methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tv2Method {
    /// More-Sorensen trust-region solve of the ball-constrained dual.
    MoreSorensen,
    /// Projected gradient on the Euclidean dual ball.
    ProjectedGradient,
    /// Projected-gradient warm phase seeding More-Sorensen (default).
    #[default]
    Hybrid,
}

impl FromStr for Tv2Method {
    type Err = TvError;

    fn from_str(s: &str) -> Result<Self, TvError> {
        match s {
            "ms" => Ok(Self::MoreSorensen),
            "pg" => Ok(Self::ProjectedGradient),
            "mspg" => Ok(Self::Hybrid),
            _ => Err(TvError::UnknownMethod {
                family: "tv2_1d",
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Tv2Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::MoreSorensen => "ms",
            Self::ProjectedGradient => "pg",
            Self::Hybrid => "mspg",
        };
        write!(f, "{tag}")
    }
}

/// 1-D TV-lp methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TvpMethod {
    /// Gradient projection with an lq-ball projection oracle.
    GradientProjection,
    /// Frank-Wolfe with a closed-form linear minimization oracle.
    FrankWolfe,
    /// Frank-Wolfe until progress stalls, then gradient projection (default).
    #[default]
    Hybrid,
    /// Accelerated gradient projection with adaptive restart.
    OptimalGradient,
    /// FISTA momentum without restart.
    Fista,
}

impl FromStr for TvpMethod {
    type Err = TvError;

    fn from_str(s: &str) -> Result<Self, TvError> {
        match s {
            "gp" => Ok(Self::GradientProjection),
            "fw" => Ok(Self::FrankWolfe),
            "gpfw" => Ok(Self::Hybrid),
            "ogp" => Ok(Self::OptimalGradient),
            "fista" => Ok(Self::Fista),
            _ => Err(TvError::UnknownMethod {
                family: "tvp_1d",
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for TvpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::GradientProjection => "gp",
            Self::FrankWolfe => "fw",
            Self::Hybrid => "gpfw",
            Self::OptimalGradient => "ogp",
            Self::Fista => "fista",
        };
        write!(f, "{tag}")
    }
}

/// 2-D TV-l1 methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tv2dMethod {
    /// Douglas-Rachford splitting over row/column fiber sweeps (default).
    #[default]
    DouglasRachford,
    /// Two-set proximal Dykstra over row/column fiber sweeps.
    ProximalDykstra,
    /// Yang's consensus ADMM.
    Yang,
    /// Primal-dual splitting with over-relaxation.
    Condat,
    /// Primal-dual splitting, unrelaxed Chambolle-Pock iteration.
    ChambollePock,
}

impl FromStr for Tv2dMethod {
    type Err = TvError;

    fn from_str(s: &str) -> Result<Self, TvError> {
        match s {
            "dr" => Ok(Self::DouglasRachford),
            "pd" => Ok(Self::ProximalDykstra),
            "yang" => Ok(Self::Yang),
            "condat" => Ok(Self::Condat),
            "chambolle-pock" => Ok(Self::ChambollePock),
            _ => Err(TvError::UnknownMethod {
                family: "tv1_2d",
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Tv2dMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::DouglasRachford => "dr",
            Self::ProximalDykstra => "pd",
            Self::Yang => "yang",
            Self::Condat => "condat",
            Self::ChambollePock => "chambolle-pock",
        };
        write!(f, "{tag}")
    }
}

// ============================================================================
// Penalty terms
// ============================================================================

/// One TV penalty term of a multidimensional problem.
///
/// Penalizes `weight * ||D y||_p` where `D` takes forward differences of
/// `y` along tensor dimension `dim`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Penalty {
    /// Nonnegative penalty weight. Zero-weight terms are dropped up front.
    pub weight: f64,
    /// Tensor dimension the differences run along.
    pub dim: usize,
    /// Norm order, >= 1.
    pub p: f64,
}

impl Penalty {
    pub fn new(weight: f64, dim: usize, p: f64) -> Self {
        Penalty { weight, dim, p }
    }

    /// Check weight, norm order and dimension against a signal rank.
    pub fn validate(&self, rank: usize) -> Result<(), TvError> {
        check_weight(self.weight)?;
        check_norm(self.p)?;
        if self.dim >= rank {
            return Err(TvError::DimOutOfRange {
                dim: self.dim,
                rank,
            });
        }
        Ok(())
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Terminal condition of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Stopping tolerance reached. Direct (exact) methods report this
    /// immediately.
    Converged,
    /// Iteration cap hit; the best iterate found is still returned.
    MaxIters,
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStatus::Converged => write!(f, "Converged"),
            SolveStatus::MaxIters => write!(f, "MaxIters"),
        }
    }
}

/// Per-solve diagnostics.
///
/// `gap` is the final duality gap for the 1-D dual solvers and the final
/// outer stopping metric (relative change or residual) for the splitting
/// solvers. Direct methods report `iters = 0, gap = 0`.
#[derive(Debug, Clone, Copy)]
pub struct SolveInfo {
    /// Iterations completed.
    pub iters: usize,
    /// Final duality gap or outer stopping metric.
    pub gap: f64,
    /// Terminal condition.
    pub status: SolveStatus,
}

impl SolveInfo {
    /// Diagnostics of a direct, exact solve.
    pub fn exact() -> Self {
        SolveInfo {
            iters: 0,
            gap: 0.0,
            status: SolveStatus::Converged,
        }
    }

    /// True when the solve hit its stopping tolerance.
    pub fn converged(&self) -> bool {
        self.status == SolveStatus::Converged
    }
}

/// Solution buffer plus diagnostics.
#[derive(Debug, Clone)]
pub struct TvSolution {
    /// The proximity-operator output, same layout as the input signal.
    pub y: Vec<f64>,
    /// Diagnostics of the solve that produced `y`.
    pub info: SolveInfo,
}

impl TvSolution {
    pub(crate) fn new(y: Vec<f64>, info: SolveInfo) -> Self {
        TvSolution { y, info }
    }

    /// Identity result for degenerate inputs (length <= 1, zero weights).
    pub(crate) fn identity(x: &[f64]) -> Self {
        TvSolution {
            y: x.to_vec(),
            info: SolveInfo::exact(),
        }
    }
}
