//! TV-l1 prox by dynamic programming over clipped derivative messages.
//!
//! Forward pass: the derivative of each partial objective is piecewise
//! linear; clipping it at `-w` and `+w` adds one knot per side and the
//! knots in between survive untouched, so the whole pass is linear time.
//! The knot buffer stores, for each knot, the derivative delta picked up
//! when crossing it from the left. Backward pass: each sample clamps its
//! successor into that step's clip interval (N. Johnson, 2013).

use crate::workspace::Workspace;

/// Caller guarantees `x.len() >= 2` and `w > 0`.
pub(crate) fn johnson_dp(x: &[f64], w: f64, y: &mut [f64], ws: &mut Workspace) {
    let n = x.len();
    debug_assert!(n >= 2 && w > 0.0);

    // knot positions plus the (slope, intercept) delta across each knot
    let mut kx = ws.acquire_f64(2 * n);
    let mut ka = ws.acquire_f64(2 * n);
    let mut kb = ws.acquire_f64(2 * n);
    // clip interval of each step, consumed by the backward pass
    let mut clip_lo = ws.acquire_f64(n - 1);
    let mut clip_hi = ws.acquire_f64(n - 1);

    // first step by hand
    let mut l = n - 1;
    let mut r = n;
    clip_lo[0] = x[0] - w;
    clip_hi[0] = x[0] + w;
    kx[l] = clip_lo[0];
    kx[r] = clip_hi[0];
    ka[l] = 1.0;
    kb[l] = -x[0] + w;
    ka[r] = -1.0;
    kb[r] = x[0] + w;
    // derivative entering from far left, and (negated) from far right
    let mut afirst = 1.0;
    let mut bfirst = -w - x[1];
    let mut alast = -1.0;
    let mut blast = -w + x[1];

    for k in 1..n - 1 {
        // walk right until the derivative rises above -w
        let mut alo = afirst;
        let mut blo = bfirst;
        let mut lo = l;
        while lo <= r && alo * kx[lo] + blo <= -w {
            alo += ka[lo];
            blo += kb[lo];
            lo += 1;
        }

        // walk left until the (negated) derivative drops below w
        let mut ahi = alast;
        let mut bhi = blast;
        let mut hi = r as isize;
        while hi >= lo as isize && -(ahi * kx[hi as usize] + bhi) >= w {
            ahi += ka[hi as usize];
            bhi += kb[hi as usize];
            hi -= 1;
        }

        // new clip knots replace everything the walks consumed
        clip_lo[k] = (-w - blo) / alo;
        l = lo - 1;
        kx[l] = clip_lo[k];
        ka[l] = alo;
        kb[l] = blo + w;

        clip_hi[k] = (w + bhi) / (-ahi);
        r = (hi + 1) as usize;
        kx[r] = clip_hi[k];
        ka[r] = ahi;
        kb[r] = bhi + w;

        afirst = 1.0;
        bfirst = -w - x[k + 1];
        alast = -1.0;
        blast = -w + x[k + 1];
    }

    // final step minimizes without clipping: walk to the zero crossing
    let mut alo = afirst;
    let mut blo = bfirst;
    let mut lo = l;
    while lo <= r && alo * kx[lo] + blo <= 0.0 {
        alo += ka[lo];
        blo += kb[lo];
        lo += 1;
    }
    y[n - 1] = -blo / alo;
    for k in (0..n - 1).rev() {
        y[k] = y[k + 1].clamp(clip_lo[k], clip_hi[k]);
    }

    ws.release_f64(kx);
    ws.release_f64(ka);
    ws.release_f64(kb);
    ws.release_f64(clip_lo);
    ws.release_f64(clip_hi);
}
