use crate::ard::*;
use crate::common::*;
use crate::data::YNode;
use crate::factors::ZNode;
use crate::graph::{FactorGraph, GraphNodes};
use crate::noise::TauNode;
use crate::sparsity::*;
use crate::weights::SwNode;
use matrix_param::{BernoulliGaussianDist, BernoulliGaussianParams, GaussianDist, GaussianParams};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Hyperparameters and structural choices of a default model
#[derive(Debug, Clone)]
pub struct ModelPriors {
    /// Gamma prior of the noise precision. Default: 1e-3
    pub tau_a0: f64,
    /// Default: 1e-3
    pub tau_b0: f64,
    /// Gamma prior of the ARD precisions. Default: 1e-3
    pub alpha_a0: f64,
    /// Default: 1e-3
    pub alpha_b0: f64,
    /// Beta prior of the inclusion probability. Default: 1
    pub theta_a0: f64,
    /// Default: 1
    pub theta_b0: f64,
    /// Prior mean of the factor scores. Default: 0
    pub z_mean0: f64,
    /// Prior variance of the factor scores. Default: 1
    pub z_var0: f64,
    /// Sharing of the weight precision. Default: per factor
    pub ard_granularity: ArdGranularity,
    /// Learn θ (Beta); otherwise fix it at 0.5. Default: true
    pub learn_theta: bool,
    /// Put an ARD prior on the factor scores. Default: false
    pub ard_factors: bool,
}

impl Default for ModelPriors {
    fn default() -> Self {
        ModelPriors {
            tau_a0: 1e-3,
            tau_b0: 1e-3,
            alpha_a0: 1e-3,
            alpha_b0: 1e-3,
            theta_a0: 1.0,
            theta_b0: 1.0,
            z_mean0: 0.0,
            z_var0: 1.0,
            ard_granularity: ArdGranularity::PerFactor,
            learn_theta: true,
            ard_factors: false,
        }
    }
}

impl FactorGraph {
    /// Build a model over `views` (each `(N, D_m)`, non-finite entries
    /// missing) with `num_factors` factors.
    ///
    /// Factor scores start from `N(0, 1)` draws, weights from small
    /// draws with θ = 0.5, precisions at one.
    pub fn initialize(
        views: Vec<Mat>,
        num_factors: usize,
        priors: &ModelPriors,
        seed: u64,
    ) -> anyhow::Result<Self> {
        if views.is_empty() {
            anyhow::bail!("no views to model");
        }
        if num_factors == 0 {
            anyhow::bail!("need at least one factor");
        }

        let nn = views[0].nrows();
        let kk = num_factors;
        let mut rng = StdRng::seed_from_u64(seed);

        let z = ZNode::new(
            GaussianDist::new((nn, kk), priors.z_mean0, priors.z_var0),
            GaussianDist::from_params(GaussianParams {
                mean: Mat::rnorm(nn, kk, &mut rng),
                var: Mat::ones((nn, kk)),
            })?,
            None,
        )?;

        let mut y = vec![];
        let mut tau = vec![];
        let mut sw = vec![];
        let mut alpha_w = vec![];
        let mut theta = vec![];

        for (m, x) in views.into_iter().enumerate() {
            if x.nrows() != nn {
                anyhow::bail!("view {} has {} samples, view 0 has {}", m, x.nrows(), nn);
            }
            let dd = x.ncols();

            y.push(YNode::new(x));
            tau.push(TauNode::new(dd, priors.tau_a0, priors.tau_b0, 1.0, 1.0));

            let mean_s1 = Mat::rnorm(dd, kk, &mut rng) * 0.1;
            sw.push(SwNode::new(
                BernoulliGaussianDist::new((dd, kk), 0.0, 1.0, 0.5),
                BernoulliGaussianDist::from_params(BernoulliGaussianParams {
                    mean_s0: Mat::zeros((dd, kk)),
                    var_s0: Mat::ones((dd, kk)),
                    mean_s1,
                    var_s1: Mat::ones((dd, kk)),
                    theta: Mat::from_elem((dd, kk), 0.5),
                })?,
            )?);

            alpha_w.push(AlphaWNode::new(
                kk,
                priors.ard_granularity,
                priors.alpha_a0,
                priors.alpha_b0,
                1.0,
                1.0,
            ));

            theta.push(if priors.learn_theta {
                MixedThetaNode::learned(ThetaNode::new(
                    kk,
                    priors.theta_a0,
                    priors.theta_b0,
                    priors.theta_a0,
                    priors.theta_b0,
                ))?
            } else {
                MixedThetaNode::fixed(ThetaConstantNode::new(
                    Mat::from_elem((1, kk), 0.5),
                    None,
                )?)?
            });
        }

        let alpha_z = priors
            .ard_factors
            .then(|| AlphaZNode::new(kk, priors.alpha_a0, priors.alpha_b0, 1.0, 1.0));

        info!(
            "initialized {} view(s), {} samples, {} factors",
            y.len(),
            nn,
            kk
        );

        FactorGraph::new(GraphNodes {
            z,
            y: Mixed::new(y)?,
            tau: Mixed::new(tau)?,
            sw: Mixed::new(sw)?,
            alpha_w: Mixed::new(alpha_w)?,
            theta: Mixed::new(theta)?,
            alpha_z,
            mu_z: None,
        })
    }
}
