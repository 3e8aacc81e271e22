//! Condat's direct TV-l1 solver.
//!
//! Single forward sweep maintaining a candidate segment value bracket
//! `[vmin, vmax]` and the running dual budgets `umin`/`umax`; when an
//! incoming sample cannot extend the current segment the segment is
//! flushed at the binding envelope and the sweep restarts just past it.
//! L. Condat, "A direct algorithm for 1-D total variation denoising"
//! (2013). Linear time on typical signals.

/// Caller guarantees `x.len() >= 2` and `w > 0`.
pub(crate) fn condat_sweep(x: &[f64], w: f64, y: &mut [f64]) {
    let n = x.len();
    debug_assert!(n >= 2 && w > 0.0);

    let mut k = 0usize; // current sample
    let mut k0 = 0usize; // start of the segment being built
    let mut km = 0usize; // last sample where umin clipped at +w
    let mut kp = 0usize; // last sample where umax clipped at -w
    let mut vmin = x[0] - w;
    let mut vmax = x[0] + w;
    let mut umin = w;
    let mut umax = -w;
    // set right after a flush: a lone trailing sample then closes directly
    let mut fresh = true;

    loop {
        if fresh && k == n - 1 {
            y[k] = vmin + umin;
            return;
        }
        fresh = false;

        if k < n - 1 {
            if x[k + 1] + umin < vmin - w {
                // negative jump: the segment ends here at vmin
                for v in &mut y[k0..=km] {
                    *v = vmin;
                }
                km += 1;
                k = km;
                k0 = km;
                kp = km;
                vmin = x[k];
                vmax = x[k] + 2.0 * w;
                umin = w;
                umax = -w;
                fresh = true;
            } else if x[k + 1] + umax > vmax + w {
                // positive jump: the segment ends here at vmax
                for v in &mut y[k0..=kp] {
                    *v = vmax;
                }
                kp += 1;
                k = kp;
                k0 = kp;
                km = kp;
                vmin = x[k] - 2.0 * w;
                vmax = x[k];
                umin = w;
                umax = -w;
                fresh = true;
            } else {
                // no jump: absorb the sample and re-clip the envelopes
                k += 1;
                umin += x[k] - vmin;
                umax += x[k] - vmax;
                if umin >= w {
                    vmin += (umin - w) / ((k - k0 + 1) as f64);
                    umin = w;
                    km = k;
                }
                if umax <= -w {
                    vmax += (umax + w) / ((k - k0 + 1) as f64);
                    umax = -w;
                    kp = k;
                }
            }
        } else {
            // reached the right boundary while scanning
            if umin < 0.0 {
                for v in &mut y[k0..=km] {
                    *v = vmin;
                }
                km += 1;
                k = km;
                k0 = km;
                vmin = x[k];
                umin = w;
                umax = x[k] + w - vmax;
                fresh = true;
            } else if umax > 0.0 {
                for v in &mut y[k0..=kp] {
                    *v = vmax;
                }
                kp += 1;
                k = kp;
                k0 = kp;
                vmax = x[k];
                umax = -w;
                umin = x[k] - w - vmin;
                fresh = true;
            } else {
                let v = vmin + umin / ((k - k0 + 1) as f64);
                for s in &mut y[k0..=k] {
                    *s = v;
                }
                return;
            }
        }
    }
}
