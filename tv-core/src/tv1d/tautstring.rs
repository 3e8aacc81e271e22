//! Exact TV-l1 prox via the taut string.
//!
//! The prox solution is the derivative of the taut string threaded through
//! the tube of half-width `w` around the running sums of `x`: the string
//! is pinned at `(0, 0)` and `(n, sum(x))`, and wherever it runs straight
//! the output is constant. The walk keeps the first-segment slopes of the
//! greatest convex minorant of the tube ceiling and the least concave
//! majorant of the tube floor; when those cross, the string is forced
//! onto the tube at the earlier of the two candidate knots, a segment is
//! emitted and the walk restarts from that knot. Linear time on typical
//! signals.
//!
//! The weighted variant only changes the tube: the half-width at
//! breakpoint `i` is the weight of edge `i - 1`.

use crate::tv1d::EdgeWeights;
use crate::workspace::Workspace;

/// Scalar-weight taut string. Caller guarantees `n >= 2` and `w >= 0`.
pub(crate) fn taut_string(x: &[f64], w: f64, y: &mut [f64], ws: &mut Workspace) {
    if w == 0.0 {
        y[..x.len()].copy_from_slice(x);
        return;
    }
    walk_tube(x, EdgeWeights::Uniform(w), y, ws);
}

/// Per-edge-weight taut string. `w.len() == x.len() - 1`; zero entries
/// leave the corresponding jump unpenalized.
pub(crate) fn taut_string_weighted(x: &[f64], w: &[f64], y: &mut [f64], ws: &mut Workspace) {
    walk_tube(x, EdgeWeights::PerEdge(w), y, ws);
}

fn walk_tube(x: &[f64], radius: EdgeWeights<'_>, y: &mut [f64], ws: &mut Workspace) {
    let n = x.len();
    debug_assert!(n >= 2);

    // running sums r[i] = x[0] + ... + x[i]
    let mut r = ws.acquire_f64(n);
    let mut acc = 0.0;
    for (ri, &xi) in r.iter_mut().zip(x) {
        acc += xi;
        *ri = acc;
    }

    // The string is anchored at sample index `a` (height `h`); breakpoints
    // i = 1..n-1 carry tube bounds r[i-1] +- radius(i-1) and i = n is
    // pinned to r[n-1] exactly.
    let mut a = 0usize;
    let mut h = 0.0;

    'outer: while a < n {
        // First-segment slopes of the two hulls seen from the anchor.
        let mut smin = f64::INFINITY;
        let mut ju = a;
        let mut smax = f64::NEG_INFINITY;
        let mut jl = a;

        let mut i = a + 1;
        while i <= n {
            let (ceil, floor) = if i < n {
                let rad = radius.at(i - 1);
                (r[i - 1] + rad, r[i - 1] - rad)
            } else {
                (r[n - 1], r[n - 1])
            };
            let step = (i - a) as f64;
            let su = (ceil - h) / step;
            if su < smin {
                smin = su;
                ju = i;
            }
            let sl = (floor - h) / step;
            if sl > smax {
                smax = sl;
                jl = i;
            }

            if smax > smin {
                // Infeasible straight run: the string bends at the earlier
                // of the two front knots and the walk restarts there.
                if ju < jl {
                    for v in &mut y[a..ju] {
                        *v = smin;
                    }
                    h = r[ju - 1] + radius.at(ju - 1);
                    a = ju;
                } else {
                    for v in &mut y[a..jl] {
                        *v = smax;
                    }
                    h = r[jl - 1] - radius.at(jl - 1);
                    a = jl;
                }
                continue 'outer;
            }
            i += 1;
        }

        // Tube never forced a bend: run straight to the pinned end.
        let slope = (r[n - 1] - h) / ((n - a) as f64);
        for v in &mut y[a..n] {
            *v = slope;
        }
        break;
    }

    ws.release_f64(r);
}
