//! End-to-end properties of the prox engine.
//!
//! Each test states a fact the proximity operator must satisfy (identity
//! cases, fixed points, cross-method agreement, weight monotonicity,
//! thread invariance) and checks it through the public API across the
//! solve families and their method selectors.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tv_core::{
    tv1_1d, tv1_2d, tv1w_1d, tv1w_2d, tv2_1d, tvgen, tvp_1d, tvp_2d, Penalty, SolveOptions,
    SolveStatus, Tv1Method, Tv1wMethod, Tv2Method, Tv2dMethod, TvSolver, TvpMethod,
};

/// Allowed spread between 1-D methods once the dual gap is driven down.
const AGREE_1D: f64 = 1e-6;

/// Allowed spread between the 2-D splitting loops.
const AGREE_2D: f64 = 1e-4;

const L1_METHODS: [Tv1Method; 4] = [
    Tv1Method::TautString,
    Tv1Method::ProjectedNewton,
    Tv1Method::Condat,
    Tv1Method::Dp,
];

const L2_METHODS: [Tv2Method; 3] = [
    Tv2Method::MoreSorensen,
    Tv2Method::ProjectedGradient,
    Tv2Method::Hybrid,
];

const LP_METHODS: [TvpMethod; 5] = [
    TvpMethod::GradientProjection,
    TvpMethod::FrankWolfe,
    TvpMethod::Hybrid,
    TvpMethod::OptimalGradient,
    TvpMethod::Fista,
];

const TWO_D_METHODS: [Tv2dMethod; 5] = [
    Tv2dMethod::DouglasRachford,
    Tv2dMethod::ProximalDykstra,
    Tv2dMethod::Yang,
    Tv2dMethod::Condat,
    Tv2dMethod::ChambollePock,
];

fn assert_close(got: &[f64], want: &[f64], tol: f64, what: &str) {
    assert_eq!(got.len(), want.len(), "{what}: length mismatch");
    for (i, (a, b)) in got.iter().zip(want).enumerate() {
        assert!(
            (a - b).abs() <= tol,
            "{what}: index {i}, got {a}, want {b}, tol {tol}"
        );
    }
}

fn random_signal(rng: &mut ChaCha8Rng, n: usize) -> Vec<f64> {
    (0..n).map(|_| rng.gen_range(-5.0..5.0)).collect()
}

/// Piecewise-constant levels with small additive noise.
fn piecewise_signal(rng: &mut ChaCha8Rng, n: usize) -> Vec<f64> {
    let mut level = rng.gen_range(-3.0..3.0);
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        if rng.gen_bool(0.15) {
            level = rng.gen_range(-3.0..3.0);
        }
        out.push(level + rng.gen_range(-0.05..0.05));
    }
    out
}

/// `||Dy||_p` along a vector.
fn tv_seminorm(y: &[f64], p: f64) -> f64 {
    let sum: f64 = y.windows(2).map(|v| (v[1] - v[0]).abs().powf(p)).sum();
    sum.powf(1.0 / p)
}

#[test]
fn test_zero_weight_returns_input_unchanged() {
    let mut rng = ChaCha8Rng::seed_from_u64(101);
    let x = random_signal(&mut rng, 40);
    let opts = SolveOptions::default();

    for m in L1_METHODS {
        let sol = tv1_1d(&x, 0.0, m, &opts).unwrap();
        assert_eq!(sol.y, x, "tv1 {m}");
        assert_eq!(sol.info.iters, 0, "tv1 {m}");
    }
    for m in L2_METHODS {
        let sol = tv2_1d(&x, 0.0, m, &opts).unwrap();
        assert_eq!(sol.y, x, "tv2 {m}");
    }
    for m in LP_METHODS {
        let sol = tvp_1d(&x, 0.0, 2.5, m, &opts).unwrap();
        assert_eq!(sol.y, x, "tvp {m}");
    }
    let zeros = vec![0.0; x.len() - 1];
    for m in [Tv1wMethod::TautString, Tv1wMethod::ProjectedNewton] {
        let sol = tv1w_1d(&x, &zeros, m, &opts).unwrap();
        assert_eq!(sol.y, x, "tv1w {m}");
    }

    let x2 = random_signal(&mut rng, 30);
    let shape = [5, 6];
    for m in TWO_D_METHODS {
        let sol = tv1_2d(&x2, &shape, 0.0, m, &opts).unwrap();
        assert_eq!(sol.y, x2, "tv1 2d {m}");
    }
    let sol = tv1w_2d(&x2, &shape, &vec![0.0; 24], &vec![0.0; 25], &opts).unwrap();
    assert_eq!(sol.y, x2, "tv1w 2d");
    let sol = tvp_2d(&x2, &shape, (0.0, 0.0), (1.5, 3.0), &opts).unwrap();
    assert_eq!(sol.y, x2, "tvp 2d");

    let pens = [Penalty::new(0.0, 0, 1.0), Penalty::new(0.0, 1, 2.0)];
    let sol = tvgen(&x2, &shape, &pens, &opts).unwrap();
    assert_eq!(sol.y, x2, "tvgen");
}

#[test]
fn test_flat_signals_are_fixed_points() {
    let x = vec![2.5; 8];
    let opts = SolveOptions::default();

    for m in L1_METHODS {
        let sol = tv1_1d(&x, 1.7, m, &opts).unwrap();
        assert_close(&sol.y, &x, 1e-12, &format!("tv1 {m}"));
    }
    for m in L2_METHODS {
        let sol = tv2_1d(&x, 0.9, m, &opts).unwrap();
        assert_close(&sol.y, &x, 1e-12, &format!("tv2 {m}"));
    }
    for p in [1.5, 3.0] {
        for m in LP_METHODS {
            let sol = tvp_1d(&x, 1.2, p, m, &opts).unwrap();
            assert_close(&sol.y, &x, 1e-12, &format!("tvp p={p} {m}"));
        }
    }

    let x2 = vec![-1.3; 20];
    let shape = [4, 5];
    for m in TWO_D_METHODS {
        let sol = tv1_2d(&x2, &shape, 1.0, m, &opts).unwrap();
        assert_close(&sol.y, &x2, 1e-9, &format!("tv1 2d {m}"));
    }

    let x3 = vec![0.75; 24];
    let pens = [
        Penalty::new(0.5, 0, 1.0),
        Penalty::new(0.5, 1, 1.0),
        Penalty::new(0.5, 2, 1.0),
    ];
    let sol = tvgen(&x3, &[2, 3, 4], &pens, &opts).unwrap();
    assert_close(&sol.y, &x3, 1e-9, "tvgen rank 3");
}

#[test]
fn test_1d_l1_methods_agree() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    // Tight dual gap so the Newton answer sits well inside the band.
    let opts = SolveOptions {
        tol_gap: 1e-13,
        ..SolveOptions::default()
    };

    for n in [2usize, 3, 17, 64] {
        for w in [0.1, 1.0, 5.0] {
            let x = random_signal(&mut rng, n);
            let base = tv1_1d(&x, w, Tv1Method::TautString, &opts).unwrap();
            assert!(base.info.converged());
            for m in [Tv1Method::ProjectedNewton, Tv1Method::Condat, Tv1Method::Dp] {
                let sol = tv1_1d(&x, w, m, &opts).unwrap();
                assert_close(&sol.y, &base.y, AGREE_1D, &format!("n={n} w={w} {m}"));
            }
        }
    }
}

#[test]
fn test_known_prox_values() {
    // 1-D l1 with w = 1: the leading pair merges at 2, the middle sample
    // stays, and the plateau at 10 drops to 29/3. Verified against the
    // KKT system of the prox.
    let x = [1.0, 2.0, 3.0, 10.0, 10.0, 10.0];
    let want = [2.0, 2.0, 3.0, 29.0 / 3.0, 29.0 / 3.0, 29.0 / 3.0];
    let opts = SolveOptions::default();

    for m in [Tv1Method::TautString, Tv1Method::Condat, Tv1Method::Dp] {
        let sol = tv1_1d(&x, 1.0, m, &opts).unwrap();
        assert_close(&sol.y, &want, 1e-8, &format!("{m}"));
        assert!(sol.info.converged());
        assert_eq!(sol.info.iters, 0);
    }
    let pn = tv1_1d(&x, 1.0, Tv1Method::ProjectedNewton, &opts).unwrap();
    assert_close(&pn.y, &want, AGREE_1D, "pn");

    // Per-edge weights all equal to the scalar give the same prox.
    let we = [1.0; 5];
    for m in [Tv1wMethod::TautString, Tv1wMethod::ProjectedNewton] {
        let sol = tv1w_1d(&x, &we, m, &opts).unwrap();
        assert_close(&sol.y, &want, AGREE_1D, &format!("weighted {m}"));
    }

    // 1-D l2 with the ball radius past the critical weight: the prox is
    // the mean of the input.
    let x = [3.0, 1.0, 2.0];
    let sol = tv2_1d(&x, 10.0, Tv2Method::MoreSorensen, &opts).unwrap();
    assert_close(&sol.y, &[2.0; 3], 1e-9, "ms interior");
    let sol = tv2_1d(&x, 10.0, Tv2Method::Hybrid, &opts).unwrap();
    assert_close(&sol.y, &[2.0; 3], 1e-9, "mspg interior");
    let sol = tv2_1d(&x, 10.0, Tv2Method::ProjectedGradient, &opts).unwrap();
    assert_close(&sol.y, &[2.0; 3], 1e-5, "pg interior");
}

#[test]
fn test_penalty_monotone_in_weight() {
    let mut rng = ChaCha8Rng::seed_from_u64(23);
    let x = piecewise_signal(&mut rng, 24);
    let opts = SolveOptions::default();
    let weights = [0.05, 0.2, 0.5, 1.0, 2.0, 4.0];

    // Exact l1 solves: the seminorm of the answer never rises with w.
    let mut prev = f64::INFINITY;
    for &w in &weights {
        let sol = tv1_1d(&x, w, Tv1Method::TautString, &opts).unwrap();
        let pen = tv_seminorm(&sol.y, 1.0);
        assert!(pen <= prev + 1e-9, "l1 seminorm rose at w={w}: {pen} > {prev}");
        prev = pen;
    }

    // Iterative families get slack for their gap-level solution error.
    for (p, method) in [
        (2.0, TvpMethod::Hybrid),
        (3.0, TvpMethod::Hybrid),
        (1.5, TvpMethod::OptimalGradient),
    ] {
        let mut prev = f64::INFINITY;
        for &w in &weights {
            let sol = tvp_1d(&x, w, p, method, &opts).unwrap();
            let pen = tv_seminorm(&sol.y, p);
            assert!(
                pen <= prev + 1e-4,
                "p={p} seminorm rose at w={w}: {pen} > {prev}"
            );
            prev = pen;
        }
    }

    // Far past the critical weight every prox collapses to the mean.
    let mean = x.iter().sum::<f64>() / x.len() as f64;
    let flat = vec![mean; x.len()];
    let sol = tv1_1d(&x, 1e3, Tv1Method::TautString, &opts).unwrap();
    assert_close(&sol.y, &flat, 1e-6, "l1 large w");
    let sol = tv2_1d(&x, 1e3, Tv2Method::MoreSorensen, &opts).unwrap();
    assert_close(&sol.y, &flat, 1e-6, "l2 large w");
}

#[test]
fn test_dispatcher_routes_match() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let x = random_signal(&mut rng, 30);
    let opts = SolveOptions {
        max_iters: 3000,
        tol_change: 1e-12,
        ..SolveOptions::default()
    };

    // Two distinct-dimension l1 terms on a matrix take the same fast path
    // as the dedicated 2-D solve.
    let pens = [Penalty::new(0.8, 0, 1.0), Penalty::new(0.8, 1, 1.0)];
    let gen = tvgen(&x, &[5, 6], &pens, &opts).unwrap();
    let dedicated = tv1_2d(&x, &[5, 6], 0.8, Tv2dMethod::DouglasRachford, &opts).unwrap();
    assert_eq!(gen.y, dedicated.y);

    // Terms are routed by dimension, so their order is irrelevant.
    let rev = [Penalty::new(0.8, 1, 1.0), Penalty::new(0.8, 0, 1.0)];
    let gen_rev = tvgen(&x, &[5, 6], &rev, &opts).unwrap();
    assert_eq!(gen.y, gen_rev.y);

    // A trailing singleton dimension forces the generic pair solver;
    // the optimum does not move.
    let gen3 = tvgen(&x, &[5, 6, 1], &pens, &opts).unwrap();
    assert_close(&gen3.y, &gen.y, AGREE_2D, "trailing singleton");

    // A single term on a vector is the plain 1-D prox.
    let single = [Penalty::new(1.1, 0, 1.0)];
    let gen1 = tvgen(&x, &[30], &single, &opts).unwrap();
    let direct = tv1_1d(&x, 1.1, Tv1Method::TautString, &opts).unwrap();
    assert_eq!(gen1.y, direct.y);
}

#[test]
fn test_thread_count_does_not_change_answers() {
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let x = random_signal(&mut rng, 60);
    let shape = [4, 3, 5];
    let pens = [
        Penalty::new(0.6, 0, 1.0),
        Penalty::new(0.8, 1, 1.0),
        Penalty::new(0.4, 2, 1.0),
    ];

    let mut opts = SolveOptions::default();
    let base = tvgen(&x, &shape, &pens, &opts).unwrap();
    for threads in [2usize, 4] {
        opts.threads = threads;
        let sol = tvgen(&x, &shape, &pens, &opts).unwrap();
        assert_eq!(sol.y, base.y, "threads={threads}");
    }

    // Same through the 2-D splitting path, with mixed norms.
    let x2 = random_signal(&mut rng, 24);
    opts.threads = 1;
    let a = tvp_2d(&x2, &[6, 4], (0.7, 0.5), (2.0, 1.0), &opts).unwrap();
    opts.threads = 4;
    let b = tvp_2d(&x2, &[6, 4], (0.7, 0.5), (2.0, 1.0), &opts).unwrap();
    assert_close(&b.y, &a.y, 1e-12, "tvp 2d threads");
}

#[test]
fn test_warm_start_agrees_with_cold() {
    let mut rng = ChaCha8Rng::seed_from_u64(77);
    let x = piecewise_signal(&mut rng, 48);

    let mut warm = TvSolver::new();
    warm.tv1_1d(&x, 0.9, Tv1Method::ProjectedNewton).unwrap();
    let warm_11 = warm.tv1_1d(&x, 1.1, Tv1Method::ProjectedNewton).unwrap();

    let mut cold = TvSolver::new();
    let cold_11 = cold.tv1_1d(&x, 1.1, Tv1Method::ProjectedNewton).unwrap();
    assert_close(&warm_11.y, &cold_11.y, 1e-5, "warm vs cold");

    // Resolving the identical problem starts at the stored optimum.
    let again = warm.tv1_1d(&x, 1.1, Tv1Method::ProjectedNewton).unwrap();
    assert!(again.info.iters <= 2, "resolve took {} iters", again.info.iters);
    assert_close(&again.y, &cold_11.y, 1e-5, "resolve");
}

#[test]
fn test_iteration_cap_is_reported_not_an_error() {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let x = random_signal(&mut rng, 30);
    let opts = SolveOptions {
        max_iters: 3,
        tol_gap: 1e-15,
        ..SolveOptions::default()
    };
    let sol = tvp_1d(&x, 2.0, 3.0, TvpMethod::GradientProjection, &opts).unwrap();
    assert_eq!(sol.info.status, SolveStatus::MaxIters);
    assert_eq!(sol.info.iters, 3);
    assert!(sol.info.gap.is_finite());
    assert!(sol.y.iter().all(|v| v.is_finite()));

    let x2 = random_signal(&mut rng, 30);
    let opts = SolveOptions {
        max_iters: 2,
        tol_change: 1e-15,
        ..SolveOptions::default()
    };
    let sol = tv1_2d(&x2, &[6, 5], 1.0, Tv2dMethod::Yang, &opts).unwrap();
    assert_eq!(sol.info.status, SolveStatus::MaxIters);
    assert_eq!(sol.info.iters, 2);
    assert!(sol.y.iter().all(|v| v.is_finite()));
}
