//! Benchmarking CLI for the TV prox engine.
//!
//! Runs each solve family on synthetic piecewise-constant signals,
//! prints a timing table, and optionally writes the records to a JSON
//! report (pass the output path as the first argument).

mod report;

use std::time::Instant;

use anyhow::Result;
use tv_core::{
    tv1_1d, tv1_2d, tv1w_1d, tv1w_2d, tv2_1d, tvgen, tvp_1d, tvp_2d, Penalty, SolveOptions,
    Tv1Method, Tv1wMethod, Tv2Method, Tv2dMethod, TvError, TvSolution, TvpMethod,
};

use report::{Report, RunRecord};

/// Piecewise-constant signal with additive noise: a new level roughly
/// every `jump_every` samples.
fn generate_signal(n: usize, jump_every: usize, seed: u64) -> Vec<f64> {
    // Simple LCG random number generator
    let mut rng_state = seed;
    let mut rand = || -> f64 {
        rng_state = rng_state.wrapping_mul(6364136223846793005).wrapping_add(1);
        ((rng_state >> 33) as f64) / (u32::MAX as f64)
    };

    let mut level = 0.0;
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        if i % jump_every == 0 {
            level = 4.0 * rand() - 2.0;
        }
        out.push(level + 0.1 * (rand() - 0.5));
    }
    out
}

/// Nonnegative per-edge weights in [0, 1).
fn generate_weights(n: usize, seed: u64) -> Vec<f64> {
    let mut rng_state = seed;
    let mut rand = || -> f64 {
        rng_state = rng_state.wrapping_mul(6364136223846793005).wrapping_add(1);
        ((rng_state >> 33) as f64) / (u32::MAX as f64)
    };
    (0..n).map(|_| rand()).collect()
}

fn bench_opts() -> SolveOptions {
    SolveOptions {
        tol_gap: 1e-10,
        ..SolveOptions::default()
    }
}

fn banner(title: &str) {
    println!("\n{}", "=".repeat(88));
    println!("{}", title);
    println!("{}", "=".repeat(88));
    println!(
        "{:<10} {:<14} {:>9} {:>7} {:>7} {:>11} {:>10} {:>12}",
        "family", "method", "n", "w", "iters", "gap", "status", "time (ms)"
    );
}

fn time_solve(
    family: &str,
    method: &str,
    n: usize,
    weight: f64,
    runs: &mut Vec<RunRecord>,
    solve: impl FnOnce() -> std::result::Result<TvSolution, TvError>,
) -> Result<()> {
    let start = Instant::now();
    let sol = solve()?;
    let elapsed = start.elapsed().as_secs_f64() * 1000.0;
    println!(
        "{:<10} {:<14} {:>9} {:>7.2} {:>7} {:>11.3e} {:>10} {:>12.3}",
        family, method, n, weight, sol.info.iters, sol.info.gap, sol.info.status, elapsed
    );
    runs.push(RunRecord {
        family: family.to_string(),
        method: method.to_string(),
        n,
        weight,
        iters: sol.info.iters,
        gap: sol.info.gap,
        converged: sol.info.converged(),
        time_ms: elapsed,
    });
    Ok(())
}

fn bench_1d_l1(runs: &mut Vec<RunRecord>) -> Result<()> {
    banner("1-D l1 solvers");
    let opts = bench_opts();
    for n in [1_000usize, 10_000, 100_000] {
        let x = generate_signal(n, 97, 7);
        for m in [
            Tv1Method::TautString,
            Tv1Method::ProjectedNewton,
            Tv1Method::Condat,
            Tv1Method::Dp,
        ] {
            time_solve("tv1_1d", &m.to_string(), n, 1.0, runs, || {
                tv1_1d(&x, 1.0, m, &opts)
            })?;
        }
    }

    let n = 10_000;
    let x = generate_signal(n, 97, 11);
    let w = generate_weights(n - 1, 13);
    for m in [Tv1wMethod::TautString, Tv1wMethod::ProjectedNewton] {
        time_solve("tv1w_1d", &m.to_string(), n, 1.0, runs, || {
            tv1w_1d(&x, &w, m, &opts)
        })?;
    }
    Ok(())
}

fn bench_1d_general(runs: &mut Vec<RunRecord>) -> Result<()> {
    banner("1-D l2 and lp solvers");
    let opts = bench_opts();
    let n = 1_000;
    let x = generate_signal(n, 53, 17);

    for m in [Tv2Method::MoreSorensen, Tv2Method::Hybrid] {
        time_solve("tv2_1d", &m.to_string(), n, 2.0, runs, || {
            tv2_1d(&x, 2.0, m, &opts)
        })?;
    }
    for m in [TvpMethod::Hybrid, TvpMethod::OptimalGradient] {
        time_solve("tvp_1d", &m.to_string(), n, 1.0, runs, || {
            tvp_1d(&x, 1.0, 1.5, m, &opts)
        })?;
    }
    Ok(())
}

fn bench_2d(runs: &mut Vec<RunRecord>) -> Result<()> {
    banner("2-D solvers, 128 x 128");
    let opts = bench_opts();
    let shape = [128usize, 128];
    let total = shape[0] * shape[1];
    let x = generate_signal(total, 131, 23);

    for m in [
        Tv2dMethod::DouglasRachford,
        Tv2dMethod::ProximalDykstra,
        Tv2dMethod::Yang,
        Tv2dMethod::Condat,
        Tv2dMethod::ChambollePock,
    ] {
        time_solve("tv1_2d", &m.to_string(), total, 0.3, runs, || {
            tv1_2d(&x, &shape, 0.3, m, &opts)
        })?;
    }

    let wc = generate_weights((shape[0] - 1) * shape[1], 29);
    let wr = generate_weights(shape[0] * (shape[1] - 1), 31);
    time_solve("tv1w_2d", "dr", total, 1.0, runs, || {
        tv1w_2d(&x, &shape, &wc, &wr, &opts)
    })?;

    let shape = [64usize, 64];
    let total = shape[0] * shape[1];
    let x = generate_signal(total, 67, 37);
    time_solve("tvp_2d", "dr", total, 1.5, runs, || {
        tvp_2d(&x, &shape, (1.5, 0.7), (2.0, 1.0), &opts)
    })?;
    Ok(())
}

fn bench_threads(runs: &mut Vec<RunRecord>) -> Result<()> {
    banner("Thread scaling, Douglas-Rachford on 256 x 256");
    let shape = [256usize, 256];
    let total = shape[0] * shape[1];
    let x = generate_signal(total, 173, 41);

    for threads in [1usize, 2, 4] {
        let opts = SolveOptions {
            threads,
            ..bench_opts()
        };
        let label = format!("dr x{threads}");
        time_solve("tv1_2d", &label, total, 0.5, runs, || {
            tv1_2d(&x, &shape, 0.5, Tv2dMethod::DouglasRachford, &opts)
        })?;
    }
    Ok(())
}

fn bench_ndim(runs: &mut Vec<RunRecord>) -> Result<()> {
    banner("N-D dispatcher, 64 x 64 x 8");
    let opts = bench_opts();
    let shape = [64usize, 64, 8];
    let total: usize = shape.iter().product();
    let x = generate_signal(total, 149, 43);

    let pair = [Penalty::new(0.4, 0, 1.0), Penalty::new(0.4, 1, 1.0)];
    time_solve("tvgen", "dykstra", total, 0.4, runs, || {
        tvgen(&x, &shape, &pair, &opts)
    })?;

    let triple = [
        Penalty::new(0.4, 0, 1.0),
        Penalty::new(0.4, 1, 1.0),
        Penalty::new(0.8, 2, 1.0),
    ];
    time_solve("tvgen", "ppd", total, 0.4, runs, || {
        tvgen(&x, &shape, &triple, &opts)
    })?;
    Ok(())
}

fn main() -> Result<()> {
    println!("TV Prox Benchmarks");
    println!("==================");

    let total = Instant::now();
    let mut runs = Vec::new();

    bench_1d_l1(&mut runs)?;
    bench_1d_general(&mut runs)?;
    bench_2d(&mut runs)?;
    bench_threads(&mut runs)?;
    bench_ndim(&mut runs)?;

    let total_ms = total.elapsed().as_secs_f64() * 1000.0;
    println!("\n{}", "=".repeat(88));
    println!("Benchmarks complete in {:.1} ms", total_ms);
    println!("{}", "=".repeat(88));

    if let Some(path) = std::env::args().nth(1) {
        Report::new(runs, total_ms).save_json(&path)?;
        println!("Report written to {}", path);
    }
    Ok(())
}
