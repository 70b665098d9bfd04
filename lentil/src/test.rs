//! Integration tests for the lentil crate.

use crate::ard::*;
use crate::cluster_mean::MuZNode;
use crate::common::*;
use crate::data::YNode;
use crate::factors::ZNode;
use crate::graph::*;
use crate::inference::*;
use crate::init::ModelPriors;
use crate::node::*;
use crate::noise::TauNode;
use crate::simulate::*;
use crate::sparsity::*;
use crate::weights::{SwBlanket, SwNode};
use approx::assert_abs_diff_eq;
use matrix_param::{BernoulliGaussianDist, BernoulliGaussianParams, GaussianDist, GaussianParams};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn simulated(num_features: Vec<usize>, missing_rate: f64, seed: u64) -> SimulatedViews {
    simulate_views(&SimParams {
        num_samples: 40,
        num_features,
        num_factors: 3,
        inactive_rate: 0.3,
        missing_rate,
        seed,
        ..Default::default()
    })
    .expect("simulation")
}

fn sweep(graph: &mut FactorGraph, n: usize) {
    let schedule = graph.default_schedule();
    for _ in 0..n {
        for &kind in schedule.iter() {
            graph.update(kind, false).expect("update");
        }
    }
}

fn assert_monotone(trace: &[f64]) {
    assert!(trace.len() > 1);
    for i in 1..trace.len() {
        let slack = 1e-6 * trace[i - 1].abs().max(1.0);
        assert!(
            trace[i] >= trace[i - 1] - slack,
            "ELBO decreased at {}: {} -> {}",
            i,
            trace[i - 1],
            trace[i]
        );
    }
}

/// Single view, factors and weights given, precisions at one
fn single_view_graph(y: Mat, z_mean: Mat, sw_mean: Mat) -> FactorGraph {
    let (nn, kk) = z_mean.dim();
    let dd = y.ncols();
    let z = ZNode::new(
        GaussianDist::new((nn, kk), 0.0, 1.0),
        GaussianDist::from_params(GaussianParams {
            mean: z_mean,
            var: Mat::from_elem((nn, kk), 0.1),
        })
        .expect("z"),
        None,
    )
    .expect("z node");

    let mut q = BernoulliGaussianDist::new((dd, kk), 0.0, 1.0, 0.5);
    let mut par = q.params().clone();
    par.mean_s1 = sw_mean;
    q.set_params(par).expect("sw params");
    let sw = SwNode::new(BernoulliGaussianDist::new((dd, kk), 0.0, 1.0, 0.5), q).expect("sw");

    FactorGraph::new(GraphNodes {
        z,
        y: Mixed::new(vec![YNode::new(y)]).expect("y"),
        tau: Mixed::new(vec![TauNode::new(dd, 1e-3, 1e-3, 1.0, 1.0)]).expect("tau"),
        sw: Mixed::new(vec![sw]).expect("sw"),
        alpha_w: Mixed::new(vec![AlphaWNode::new(
            kk,
            ArdGranularity::PerFactor,
            1e-3,
            1e-3,
            1.0,
            1.0,
        )])
        .expect("alpha"),
        theta: Mixed::new(vec![
            MixedThetaNode::learned(ThetaNode::new(kk, 1.0, 1.0, 1.0, 1.0)).expect("theta"),
        ])
        .expect("theta"),
        alpha_z: None,
        mu_z: None,
    })
    .expect("graph")
}

#[test]
fn gamma_posteriors_dominate_priors() {
    init_logger();
    let sim = simulated(vec![15, 10], 0.1, 1);
    let priors = ModelPriors {
        ard_factors: true,
        ..Default::default()
    };
    let mut graph = FactorGraph::initialize(sim.views, 3, &priors, 7).expect("init");
    sweep(&mut graph, 3);

    let ge = |q: &Mat, p: &Mat| q.iter().zip(p.iter()).all(|(q, p)| q >= p);

    for tau in graph.tau().iter() {
        assert!(ge(&tau.posterior().params().a, &tau.prior().params().a));
        assert!(ge(&tau.posterior().params().b, &tau.prior().params().b));
    }
    for alpha in graph.alpha_w().iter() {
        assert!(ge(&alpha.posterior().params().a, &alpha.prior().params().a));
        assert!(ge(&alpha.posterior().params().b, &alpha.prior().params().b));
    }
    let alpha_z = graph.alpha_z().expect("alpha z");
    assert!(ge(&alpha_z.posterior().params().a, &alpha_z.prior().params().a));
    assert!(ge(&alpha_z.posterior().params().b, &alpha_z.prior().params().b));
}

#[test]
fn beta_posterior_counts_every_feature() {
    init_logger();
    let sim = simulated(vec![12, 7], 0.0, 2);
    let mut graph =
        FactorGraph::initialize(sim.views, 3, &ModelPriors::default(), 3).expect("init");
    sweep(&mut graph, 2);

    for (m, theta) in graph.theta().iter().enumerate() {
        let dd = graph.y()[m].num_features() as f64;
        let node = theta.learned_part().expect("learned");
        let (p, q) = (node.prior().params(), node.posterior().params());
        for k in 0..3 {
            let lhs = q.a[(0, k)] + q.b[(0, k)];
            let rhs = p.a[(0, k)] + p.b[(0, k)] + dd;
            assert_abs_diff_eq!(lhs, rhs, epsilon = 1e-9);
        }
    }
}

#[test]
fn fully_missing_row_drops_out() {
    init_logger();
    let mut rng = StdRng::seed_from_u64(11);
    let (nn, dd, kk) = (20, 6, 2);

    let z_mean = Mat::rnorm(nn, kk, &mut rng);
    let sw_mean = Mat::rnorm(dd, kk, &mut rng);
    let mut y = z_mean.dot(&sw_mean.t()) + Mat::rnorm(nn, dd, &mut rng) * 0.1;

    let keep: Vec<usize> = (1..nn).collect();
    let y_kept = y.select(Axis(0), &keep);
    let z_kept = z_mean.select(Axis(0), &keep);
    y.row_mut(0).fill(f64::NAN);

    let mut full = single_view_graph(y, z_mean, sw_mean.clone());
    let mut kept = single_view_graph(y_kept, z_kept, sw_mean);

    for kind in [NodeKind::SW, NodeKind::AlphaW, NodeKind::Theta, NodeKind::Tau] {
        full.update(kind, false).expect("full");
        kept.update(kind, false).expect("kept");
    }

    let (a, b) = (&full.sw()[0], &kept.sw()[0]);
    for (x, y) in a.weights().iter().zip(b.weights().iter()) {
        assert_abs_diff_eq!(x, y, epsilon = 1e-10);
    }
    for (x, y) in a.spike().iter().zip(b.spike().iter()) {
        assert_abs_diff_eq!(x, y, epsilon = 1e-10);
    }

    let (a, b) = (full.tau()[0].precision(), kept.tau()[0].precision());
    for (x, y) in a.iter().zip(b.iter()) {
        assert_abs_diff_eq!(x, y, epsilon = 1e-10);
    }

    assert_abs_diff_eq!(
        full.elbo().expect("elbo").y,
        kept.elbo().expect("elbo").y,
        epsilon = 1e-8
    );
}

#[test]
fn fully_missing_feature_keeps_its_prior() {
    init_logger();
    let mut sim = simulated(vec![8], 0.0, 4);
    sim.views[0].column_mut(3).fill(f64::NAN);

    let mut graph =
        FactorGraph::initialize(sim.views, 3, &ModelPriors::default(), 5).expect("init");
    sweep(&mut graph, 2);

    let tau = &graph.tau()[0];
    assert_abs_diff_eq!(tau.posterior().params().a[(0, 3)], 1e-3, epsilon = 1e-12);
    assert_abs_diff_eq!(tau.posterior().params().b[(0, 3)], 1e-3, epsilon = 1e-12);

    let sw = &graph.sw()[0];
    for k in 0..3 {
        assert_abs_diff_eq!(sw.posterior().params().mean_s1[(3, k)], 0.0, epsilon = 1e-12);
    }
    assert_eq!(graph.y()[0].observed_per_feature()[(0, 3)], 0.0);
    assert!(graph.elbo().expect("elbo").total().is_finite());
}

#[test]
fn elbo_is_monotone_with_learned_sparsity_and_missing_data() {
    init_logger();
    let sim = simulate_views(&SimParams {
        num_samples: 60,
        num_features: vec![12, 8],
        num_factors: 3,
        inactive_rate: 0.3,
        missing_rate: 0.05,
        seed: 21,
        ..Default::default()
    })
    .expect("simulation");

    let mut graph =
        FactorGraph::initialize(sim.views, 4, &ModelPriors::default(), 13).expect("init");

    let options = VbOptions {
        max_iter: 50,
        tol: 1e-12,
        ..Default::default()
    };
    let trace = run_vb(&mut graph, &options).expect("vb");

    assert_monotone(&trace.elbo);
    assert_eq!(trace.elbo.len(), trace.iterations);
}

#[test]
fn elbo_is_monotone_with_factor_ard_and_cluster_means() {
    init_logger();
    let sim = simulated(vec![10, 10], 0.0, 31);
    let priors = ModelPriors {
        ard_factors: true,
        ard_granularity: ArdGranularity::PerView,
        ..Default::default()
    };
    let graph = FactorGraph::initialize(sim.views, 3, &priors, 17).expect("init");

    let mut nodes = graph.into_nodes();
    let clusters: Vec<usize> = (0..40).map(|n| n % 2).collect();
    nodes.mu_z = Some(
        MuZNode::new(
            clusters,
            GaussianDist::new((2, 3), 0.0, 1.0),
            GaussianDist::new((2, 3), 0.0, 1.0),
        )
        .expect("mu"),
    );
    let mut graph = FactorGraph::new(nodes).expect("graph");
    assert_eq!(
        graph.default_schedule(),
        vec![
            NodeKind::Z,
            NodeKind::AlphaZ,
            NodeKind::MuZ,
            NodeKind::SW,
            NodeKind::AlphaW,
            NodeKind::Theta,
            NodeKind::Tau
        ]
    );

    let options = VbOptions {
        max_iter: 40,
        tol: 1e-12,
        parallel_views: true,
        ..Default::default()
    };
    let trace = run_vb(&mut graph, &options).expect("vb");
    assert_monotone(&trace.elbo);
}

/// One view, N = 50, D = 10, K = 3, a single planted factor, fixed
/// α = 1 and θ = 0.5; one sweep Tau → SW → Z
#[test]
fn planted_factor_is_switched_on() {
    init_logger();
    let (nn, dd, kk) = (50, 10, 3);
    let mut rng = StdRng::seed_from_u64(42);

    let z0 = Mat::rnorm(nn, 1, &mut rng);
    let w0 = Mat::from_shape_fn((dd, 1), |(d, _)| {
        let sign = if d % 2 == 0 { 1.0 } else { -1.0 };
        sign * (1.0 + 0.05 * d as f64)
    });
    let y = z0.dot(&w0.t()) + Mat::rnorm(nn, dd, &mut rng) * 0.1;

    let mut z_mean = Mat::zeros((nn, kk));
    z_mean.column_mut(0).assign(&z0.column(0));
    let z = ZNode::new(
        GaussianDist::new((nn, kk), 0.0, 1.0),
        GaussianDist::from_params(GaussianParams {
            mean: z_mean,
            var: Mat::from_elem((nn, kk), 1e-4),
        })
        .expect("z"),
        None,
    )
    .expect("z node");

    let sw = SwNode::new(
        BernoulliGaussianDist::new((dd, kk), 0.0, 1.0, 0.5),
        BernoulliGaussianDist::new((dd, kk), 0.0, 1e-3, 1.0),
    )
    .expect("sw");

    let theta = ThetaConstantNode::new(Mat::from_elem((1, kk), 0.5), None).expect("theta");

    let mut graph = FactorGraph::new(GraphNodes {
        z,
        y: Mixed::new(vec![YNode::new(y)]).expect("y"),
        tau: Mixed::new(vec![TauNode::new(dd, 1e-3, 1e-3, 1e-3, 1e-3)]).expect("tau"),
        sw: Mixed::new(vec![sw]).expect("sw"),
        alpha_w: Mixed::new(vec![AlphaWNode::new(
            kk,
            ArdGranularity::PerFactor,
            1.0,
            1.0,
            1.0,
            1.0,
        )])
        .expect("alpha"),
        theta: Mixed::new(vec![MixedThetaNode::fixed(theta).expect("theta")]).expect("theta"),
        alpha_z: None,
        mu_z: None,
    })
    .expect("graph");

    for kind in [NodeKind::Tau, NodeKind::SW, NodeKind::Z] {
        graph.update(kind, false).expect("update");
    }

    let par = graph.sw()[0].posterior().params();
    for d in 0..dd {
        assert!(par.theta[(d, 0)] > 0.99, "feature {}: {}", d, par.theta[(d, 0)]);
        let w = w0[(d, 0)];
        let rel = (par.mean_s1[(d, 0)] - w).abs() / w.abs();
        assert!(rel < 0.1, "feature {}: {} vs {}", d, par.mean_s1[(d, 0)], w);

        for k in 1..kk {
            let theta = par.theta[(d, k)];
            assert!((theta - 0.5).abs() < 0.05, "null factor {}: {}", k, theta);
            assert!((theta - 0.5).abs() < (1.0 - 0.5));
        }
    }
}

#[test]
fn removing_a_factor_keeps_the_others() {
    init_logger();
    let sim = simulated(vec![9, 6], 0.0, 8);
    let priors = ModelPriors {
        ard_factors: true,
        ..Default::default()
    };
    let mut graph = FactorGraph::initialize(sim.views, 3, &priors, 9).expect("init");
    sweep(&mut graph, 2);

    let z_before = graph.z().factors().select(Axis(1), &[0, 2]);
    let w_before = graph.sw()[1].weights().select(Axis(1), &[0, 2]);

    graph.remove_factors(&[1]).expect("remove");

    assert_eq!(graph.num_factors(), 2);
    assert_eq!(graph.z().dim(), (40, 2));
    assert_eq!(graph.alpha_z().expect("alpha z").dim(), (1, 2));
    for m in 0..graph.num_views() {
        let dd = graph.y()[m].num_features();
        assert_eq!(graph.sw()[m].dim(), (dd, 2));
        assert_eq!(graph.alpha_w()[m].dim(), (1, 2));
        assert_eq!(graph.theta()[m].dim(), (1, 2));
        assert_eq!(graph.tau()[m].dim(), (1, dd));
    }
    assert_eq!(graph.z().factors(), &z_before);
    assert_eq!(graph.sw()[1].weights(), &w_before);

    sweep(&mut graph, 1);
    assert!(graph.elbo().expect("elbo").total().is_finite());

    assert!(graph.remove_factors(&[2]).is_err());
}

#[test]
fn mixed_theta_reindexes_on_removal() -> anyhow::Result<()> {
    let learned = ThetaNode::new(2, 1.0, 1.0, 2.0, 1.0);
    let fixed = ThetaConstantNode::new(Mat::from_elem((4, 1), 0.2), Some(2.0))?;
    let mut theta = MixedThetaNode::new(3, Some((learned, vec![0, 2])), Some((fixed, vec![1])))?;

    assert_eq!(theta.dim(), (4, 3));
    let lp = theta.log_prob();
    for d in 0..4 {
        assert_abs_diff_eq!(lp[(d, 1)], 2.0 * 0.2f64.ln(), epsilon = 1e-12);
        assert_abs_diff_eq!(lp[(d, 0)], lp[(0, 2)], epsilon = 1e-12);
    }
    let learned_lp = theta.learned_part().expect("learned").log_prob()[(0, 0)];
    assert_abs_diff_eq!(lp[(3, 0)], learned_lp, epsilon = 1e-12);

    theta.remove_factors(&[1], 1)?;
    assert_eq!(theta.dim(), (4, 2));
    assert_eq!(theta.learned_columns(), &[0, 1]);
    assert!(theta.fixed_columns().is_empty());
    assert_eq!(theta.fixed_part().expect("fixed").dim(), (4, 0));
    assert_abs_diff_eq!(theta.log_prob()[(2, 1)], learned_lp, epsilon = 1e-12);
    Ok(())
}

#[test]
fn mixed_theta_needs_a_partition() -> anyhow::Result<()> {
    let fixed = || ThetaConstantNode::new(Mat::from_elem((1, 1), 0.5), None);
    let learned = || ThetaNode::new(2, 1.0, 1.0, 1.0, 1.0);

    let mixed = |learned_cols: Vec<usize>, fixed_cols: Option<Vec<usize>>| -> anyhow::Result<_> {
        let fixed_part = match fixed_cols {
            Some(cols) => Some((fixed()?, cols)),
            None => None,
        };
        Ok(MixedThetaNode::new(3, Some((learned(), learned_cols)), fixed_part))
    };

    assert!(mixed(vec![0, 1], Some(vec![1]))?.is_err());
    assert!(mixed(vec![0, 1], None)?.is_err());
    assert!(mixed(vec![0, 3], Some(vec![1]))?.is_err());
    assert!(mixed(vec![0, 2], Some(vec![1]))?.is_ok());
    assert!(ThetaConstantNode::new(Mat::from_elem((1, 2), 1.5), None).is_err());
    Ok(())
}

#[test]
fn fixed_theta_trims_features_and_factors() -> anyhow::Result<()> {
    let value = array![[0.1, 0.2], [0.3, 0.4], [0.5, 0.6]];
    let mut theta = ThetaConstantNode::new(value, Some(2.0))?;

    theta.remove_factors(&[1], 0)?;
    assert_eq!(theta.dim(), (2, 2));
    assert_eq!(theta.value(), &array![[0.1, 0.2], [0.5, 0.6]]);
    for (&lp, &x) in theta.log_prob().iter().zip(theta.value().iter()) {
        assert_abs_diff_eq!(lp, 2.0 * x.ln(), epsilon = 1e-12);
    }
    for (&lpi, &x) in theta.log_prob_inv().iter().zip(theta.value().iter()) {
        assert_abs_diff_eq!(lpi, 2.0 * (1.0 - x).ln(), epsilon = 1e-12);
    }

    theta.remove_factors(&[0, 0], 1)?;
    assert_eq!(theta.dim(), (2, 1));
    assert_eq!(theta.log_prob().dim(), (2, 1));
    assert_abs_diff_eq!(theta.log_prob_inv()[(1, 0)], 2.0 * 0.4f64.ln(), epsilon = 1e-12);
    Ok(())
}

#[test]
fn weights_drop_repeated_factors_once() -> anyhow::Result<()> {
    let mut sw = SwNode::new(
        BernoulliGaussianDist::new((4, 3), 0.0, 1.0, 0.5),
        BernoulliGaussianDist::new((4, 3), 0.0, 1.0, 0.5),
    )?;

    sw.remove_factors(&[1, 1], 1)?;
    assert_eq!(sw.dim(), (4, 2));
    assert_eq!(sw.weights().dim(), (4, 2));
    assert_eq!(sw.prior().dim(), (4, 2));

    sw.remove_factors(&[0, 0, 0, 0], 1)?;
    assert_eq!(sw.dim(), (4, 1));
    assert_eq!(sw.posterior().params().theta.dim(), (4, 1));
    Ok(())
}

#[test]
fn weight_elbo_is_finite_at_certain_inclusion() -> anyhow::Result<()> {
    let (nn, dd) = (3, 2);
    let theta = array![[0.0, 1.0], [0.0, 1.0]];
    let q = BernoulliGaussianDist::from_params(BernoulliGaussianParams {
        mean_s0: Mat::zeros((dd, 2)),
        var_s0: Mat::ones((dd, 2)),
        mean_s1: array![[0.3, -0.7], [1.1, 0.4]],
        var_s1: Mat::from_elem((dd, 2), 0.2),
        theta,
    })?;
    let sw = SwNode::new(BernoulliGaussianDist::new((dd, 2), 0.0, 1.0, 0.5), q)?;

    let y = YNode::new(Mat::ones((nn, dd)));
    let tau = TauNode::new(dd, 1.0, 1.0, 1.0, 1.0);
    let z = ZNode::new(
        GaussianDist::new((nn, 2), 0.0, 1.0),
        GaussianDist::new((nn, 2), 0.5, 1.0),
        None,
    )?;
    let alpha = AlphaWNode::new(2, ArdGranularity::PerFactor, 1.0, 1.0, 1.0, 1.0);

    let learned = ThetaNode::new(2, 1.0, 1.0, 2.0, 2.0);
    let fixed = ThetaConstantNode::new(array![[0.0, 1.0]], None)?;
    let priors: [&dyn SparsityPrior; 2] = [&learned, &fixed];

    for theta in priors {
        let mb = SwBlanket {
            y: &y,
            tau: &tau,
            z: &z,
            alpha: &alpha,
            theta,
        };
        assert!(sw.calculate_elbo(&mb)?.is_finite());
    }
    Ok(())
}

#[test]
fn theta_selection_is_checked() -> anyhow::Result<()> {
    let sw = SwNode::new(
        BernoulliGaussianDist::new((5, 3), 0.0, 1.0, 0.5),
        BernoulliGaussianDist::new((5, 3), 0.0, 1.0, 0.25),
    )?;
    let mb = ThetaBlanket { sw: &sw };

    let mut theta = ThetaNode::new(2, 1.0, 1.0, 1.0, 1.0);
    assert!(theta.update_with_selection(&mb, Some(&[0, 5][..])).is_err());
    assert!(theta.update_with_selection(&mb, Some(&[0][..])).is_err());
    assert!(theta.update_with_selection(&mb, None).is_err());

    theta.update_with_selection(&mb, Some(&[0, 2][..]))?;
    let q = theta.posterior().params();
    assert_abs_diff_eq!(q.a[(0, 1)], 1.0 + 5.0 * 0.25, epsilon = 1e-12);
    assert_abs_diff_eq!(q.b[(0, 1)], 1.0 + 5.0 * 0.75, epsilon = 1e-12);
    Ok(())
}

#[test]
fn covariates_are_not_updated() {
    init_logger();
    let sim = simulated(vec![10], 0.0, 19);
    let priors = ModelPriors {
        ard_factors: true,
        ..Default::default()
    };
    let graph = FactorGraph::initialize(sim.views, 3, &priors, 23).expect("init");
    let mut nodes = graph.into_nodes();

    let mut q = nodes.z.posterior().params().clone();
    q.mean.column_mut(0).assign(&sim.factors.column(0));
    nodes.z = ZNode::new(
        nodes.z.prior().clone(),
        GaussianDist::from_params(q.clone()).expect("z"),
        Some(&[0][..]),
    )
    .expect("z node");
    assert_eq!(nodes.z.latent_indices(), vec![1, 2]);

    let mut graph = FactorGraph::new(nodes).expect("graph");
    sweep(&mut graph, 3);

    let after = graph.z().posterior().params();
    assert_eq!(after.mean.column(0), q.mean.column(0));
    assert_eq!(after.var.column(0), q.var.column(0));
    assert_ne!(after.mean.column(1), q.mean.column(1));

    let alpha_z = graph.alpha_z().expect("alpha z");
    assert_eq!(alpha_z.posterior().params().a[(0, 0)], 1.0);
    assert!(alpha_z.posterior().params().a[(0, 1)] > 1.0);
}

#[test]
fn covariate_precisions_stay_out_of_the_elbo() -> anyhow::Result<()> {
    let nn = 6;
    let z = ZNode::new(
        GaussianDist::new((nn, 2), 0.0, 1.0),
        GaussianDist::new((nn, 2), 0.3, 0.5),
        Some(&[1][..]),
    )?;
    let alpha = AlphaZNode::new(2, 1e-3, 1e-3, 1.0, 1.0);
    let lb = alpha.calculate_elbo(&AlphaZBlanket { z: &z, mu: None })?;

    let z_latent = ZNode::new(
        GaussianDist::new((nn, 1), 0.0, 1.0),
        GaussianDist::new((nn, 1), 0.3, 0.5),
        None,
    )?;
    let alpha_latent = AlphaZNode::new(1, 1e-3, 1e-3, 1.0, 1.0);
    let lb_latent = alpha_latent.calculate_elbo(&AlphaZBlanket {
        z: &z_latent,
        mu: None,
    })?;

    assert!(lb < 0.0);
    assert_abs_diff_eq!(lb, lb_latent, epsilon = 1e-12);
    Ok(())
}

#[test]
fn tau_must_follow_weights_and_factors() {
    init_logger();
    let sim = simulated(vec![6], 0.0, 5);
    let mut graph =
        FactorGraph::initialize(sim.views, 2, &ModelPriors::default(), 1).expect("init");

    use NodeKind::*;
    assert!(validate_schedule(&graph, &[Z, SW, AlphaW, Theta, Tau]).is_ok());
    assert!(validate_schedule(&graph, &[Tau, AlphaW, SW, Z]).is_err());
    assert!(validate_schedule(&graph, &[Z, SW, Tau, Z]).is_err());
    assert!(validate_schedule(&graph, &[Z, SW, AlphaW]).is_err());
    assert!(validate_schedule(&graph, &[Z, AlphaZ, SW, Tau]).is_err());
    assert!(validate_schedule(&graph, &[]).is_err());

    let options = VbOptions {
        max_iter: 3,
        schedule: Some(vec![Tau, SW, Z]),
        ..Default::default()
    };
    assert!(run_vb(&mut graph, &options).is_err());

    // without ELBO tracking any order runs
    let options = VbOptions {
        elbo_freq: 0,
        ..options
    };
    let trace = run_vb(&mut graph, &options).expect("vb");
    assert!(trace.elbo.is_empty());
    assert_eq!(trace.iterations, 3);
    assert!(!trace.converged);

    assert!(graph.update(MuZ, false).is_err());
}

#[test]
fn mismatched_shapes_are_rejected() {
    init_logger();
    let sim = simulated(vec![6, 4], 0.0, 6);
    let graph = FactorGraph::initialize(sim.views, 2, &ModelPriors::default(), 2).expect("init");
    let mut nodes = graph.into_nodes();

    nodes.sw[1] = SwNode::new(
        BernoulliGaussianDist::new((5, 2), 0.0, 1.0, 0.5),
        BernoulliGaussianDist::new((5, 2), 0.0, 1.0, 0.5),
    )
    .expect("sw");
    assert!(FactorGraph::new(nodes).is_err());

    let sim = simulated(vec![6], 0.0, 6);
    let graph = FactorGraph::initialize(sim.views, 2, &ModelPriors::default(), 2).expect("init");
    let mut nodes = graph.into_nodes();
    nodes.alpha_w[0] = AlphaWNode::new(3, ArdGranularity::PerFactor, 1.0, 1.0, 1.0, 1.0);
    assert!(FactorGraph::new(nodes).is_err());

    let bad = vec![Mat::zeros((10, 3)), Mat::zeros((9, 3))];
    assert!(FactorGraph::initialize(bad, 2, &ModelPriors::default(), 0).is_err());
    assert!(FactorGraph::initialize(vec![], 2, &ModelPriors::default(), 0).is_err());
}

#[test]
fn simulation_plants_missing_and_inactive_entries() {
    let sim = simulate_views(&SimParams {
        num_samples: 30,
        num_features: vec![5, 7],
        num_factors: 4,
        inactive_rate: 0.5,
        missing_rate: 0.2,
        seed: 3,
        ..Default::default()
    })
    .expect("simulation");

    assert_eq!(sim.factors.dim(), (30, 4));
    assert_eq!(sim.views[1].dim(), (30, 7));
    assert_eq!(sim.weights[0].dim(), (5, 4));

    let missing = sim.views.iter().flatten().filter(|x| x.is_nan()).count();
    assert!(missing > 0);

    let y = YNode::new(sim.views[0].clone());
    assert!(y.data().iter().all(|x| x.is_finite()));
    assert_eq!(
        y.get_mask().iter().filter(|&&m| m).count(),
        sim.views[0].iter().filter(|x| x.is_nan()).count()
    );

    assert!(
        simulate_views(&SimParams {
            missing_rate: 1.0,
            ..Default::default()
        })
        .is_err()
    );
}
