//! Portfolio QP benchmark
//!
//! Generates a seeded factor-model portfolio instance, formulates it in the
//! sparse encoding and solves the identical cached tuple with every
//! registered backend, printing objective values and timings.

use folioqp::solver::AdmmSettings;
use folioqp::{Backend, BackendConfig, PortfolioProblem, Reformulation};

fn main() -> folioqp::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let k = 20;
    let n = 10 * k;

    let config = BackendConfig {
        admm: AdmmSettings {
            eps_abs: 1e-5,
            eps_rel: 1e-5,
            alpha: 1.6,
            scaling: true,
            scale_steps: 20,
            polish: false,
            ..AdmmSettings::default()
        },
        ..BackendConfig::default()
    };

    let problem = PortfolioProblem::random(k, n, 0.3, Reformulation::Sparse, 1, config)?;
    println!(
        "portfolio QP: k = {}, n = {}, {} variables, {} constraints\n",
        k,
        n,
        problem.tuple().num_vars(),
        problem.tuple().num_constraints()
    );

    let reports: Vec<_> = Backend::all()
        .into_iter()
        .map(|backend| (backend, problem.solve(backend)))
        .collect();

    for (backend, report) in &reports {
        match report.objective {
            Some(obj) => println!("{:<11} objective value: {:.3}", backend.to_string(), obj),
            None => println!("{:<11} failed: {:?}", backend.to_string(), report.status),
        }
    }
    println!();
    for (backend, report) in &reports {
        println!(
            "{:<11} solve time: {:.3}s ({} iterations)",
            backend.to_string(),
            report.solve_time,
            report.iterations
        );
    }

    Ok(())
}
