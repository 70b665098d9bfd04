//! Coordinate-ascent driver: sweeps the update schedule, tracks the
//! ELBO and stops on a small relative change.

use crate::common::*;
use crate::graph::{FactorGraph, NodeKind};
use indicatif::{ProgressBar, ProgressDrawTarget};

/// Options for the coordinate ascent
#[derive(Debug, Clone)]
pub struct VbOptions {
    /// Maximum number of full sweeps. Default: 1000
    pub max_iter: usize,
    /// Relative ELBO change to declare convergence. Default: 1e-6
    pub tol: f64,
    /// Evaluate the ELBO every this many sweeps; 0 never. Default: 1
    pub elbo_freq: usize,
    /// Update order within a sweep; the graph's default if `None`
    pub schedule: Option<Vec<NodeKind>>,
    /// Draw a progress bar. Default: false
    pub show_progress: bool,
    /// Update the views of per-view nodes on the rayon pool. Default: false
    pub parallel_views: bool,
}

impl Default for VbOptions {
    fn default() -> Self {
        VbOptions {
            max_iter: 1000,
            tol: 1e-6,
            elbo_freq: 1,
            schedule: None,
            show_progress: false,
            parallel_views: false,
        }
    }
}

/// Outcome of `run_vb`
#[derive(Debug, Clone)]
pub struct VbTrace {
    /// ELBO after each evaluation
    pub elbo: Vec<f64>,
    /// Number of full sweeps done
    pub iterations: usize,
    pub converged: bool,
}

/// Check that every node is present and that Tau follows the last
/// update of SW and Z, so the likelihood term of the ELBO is exact.
pub fn validate_schedule(graph: &FactorGraph, schedule: &[NodeKind]) -> anyhow::Result<()> {
    if schedule.is_empty() {
        anyhow::bail!("empty update schedule");
    }

    if let Some(kind) = schedule.iter().find(|&&kind| !graph.has(kind)) {
        anyhow::bail!("schedule updates {}, which this graph lacks", kind);
    }

    let last = |kind: NodeKind| schedule.iter().rposition(|&x| x == kind);

    let Some(tau) = last(NodeKind::Tau) else {
        anyhow::bail!("schedule never updates Tau");
    };

    for kind in [NodeKind::SW, NodeKind::Z] {
        if let Some(pos) = last(kind) {
            if pos > tau {
                anyhow::bail!("{} is updated after Tau; the likelihood would be stale", kind);
            }
        }
    }
    Ok(())
}

/// Run coordinate ascent until the ELBO settles or `max_iter` sweeps
pub fn run_vb(graph: &mut FactorGraph, options: &VbOptions) -> anyhow::Result<VbTrace> {
    let schedule = match &options.schedule {
        Some(schedule) => schedule.clone(),
        None => graph.default_schedule(),
    };

    let track_elbo = options.elbo_freq > 0;
    if track_elbo {
        validate_schedule(graph, &schedule)?;
    }

    let pb = ProgressBar::new(options.max_iter as u64);
    if !options.show_progress {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }

    let mut elbo_trace = vec![];
    let mut prev_elbo = f64::NEG_INFINITY;
    let mut converged = false;
    let mut iterations = 0;

    for iter in 0..options.max_iter {
        for &kind in schedule.iter() {
            graph.update(kind, options.parallel_views)?;
        }
        iterations = iter + 1;
        pb.inc(1);

        if !track_elbo || (iter + 1) % options.elbo_freq != 0 {
            continue;
        }

        let elbo = graph.elbo()?.total();
        if !elbo.is_finite() {
            anyhow::bail!("ELBO is not finite at iteration {}", iter);
        }
        elbo_trace.push(elbo);

        let delta = elbo - prev_elbo;
        if delta < -options.tol * elbo.abs() {
            warn!("ELBO decreased at iteration {}: {:.4} -> {:.4}", iter, prev_elbo, elbo);
        }

        info!("iter {:4}: ELBO = {:14.4}", iter, elbo);

        if prev_elbo.is_finite() && delta.abs() < options.tol * prev_elbo.abs() {
            info!(
                "converged at iteration {} (relative ΔELBO = {:.2e})",
                iter,
                delta.abs() / prev_elbo.abs()
            );
            converged = true;
            break;
        }
        prev_elbo = elbo;
    }

    pb.finish_and_clear();

    if !converged && track_elbo {
        debug!("stopped after {} iterations without converging", iterations);
    }

    Ok(VbTrace {
        elbo: elbo_trace,
        iterations,
        converged,
    })
}
