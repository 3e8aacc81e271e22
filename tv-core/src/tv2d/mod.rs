//! 2-D solvers: splitting loops composed from row/column fiber sweeps,
//! plus a primal-dual iteration that works on the full stencil.

pub mod dr;
pub mod primal_dual;
pub mod yang;

use crate::sweep::FiberWeights;

/// One per-dimension penalty of a 2-D solve.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AxisTerm<'a> {
    pub weights: FiberWeights<'a>,
    pub p: f64,
}

/// Relative l2 change `||a - b|| / (||b|| + 1e-15)`.
pub(crate) fn rel_change(a: &[f64], b: &[f64]) -> f64 {
    let mut num = 0.0;
    let mut den = 0.0;
    for (s, t) in a.iter().zip(b) {
        let d = s - t;
        num += d * d;
        den += t * t;
    }
    num.sqrt() / (den.sqrt() + 1e-15)
}
