use crate::common::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Shape and noise of planted multi-view data
#[derive(Debug, Clone)]
pub struct SimParams {
    pub num_samples: usize,
    /// number of features of each view
    pub num_features: Vec<usize>,
    pub num_factors: usize,
    /// standard deviation of the active weights. Default: 1
    pub weight_std: f64,
    /// standard deviation of the observation noise. Default: 0.1
    pub noise_std: f64,
    /// probability that a (view, factor) pair is inactive. Default: 0
    pub inactive_rate: f64,
    /// probability that an entry is missing. Default: 0
    pub missing_rate: f64,
    pub seed: u64,
}

impl Default for SimParams {
    fn default() -> Self {
        SimParams {
            num_samples: 100,
            num_features: vec![20, 20],
            num_factors: 3,
            weight_std: 1.0,
            noise_std: 0.1,
            inactive_rate: 0.0,
            missing_rate: 0.0,
            seed: 42,
        }
    }
}

/// Planted data and the parameters it was drawn from
#[derive(Debug, Clone)]
pub struct SimulatedViews {
    /// `(N, D_m)` per view; missing entries are NaN
    pub views: Vec<Mat>,
    /// `(N, K)`
    pub factors: Mat,
    /// `(D_m, K)` per view; inactive factors have zero columns
    pub weights: Vec<Mat>,
}

/// Simulate `Y_m = Z W_mᵀ + ε` with `Z ~ N(0, 1)`, weights shut off
/// per (view, factor) pair and entries dropped at random.
pub fn simulate_views(params: &SimParams) -> anyhow::Result<SimulatedViews> {
    let nn = params.num_samples;
    let kk = params.num_factors;

    if nn == 0 || kk == 0 || params.num_features.is_empty() {
        anyhow::bail!("need samples, factors and at least one view");
    }
    for (name, rate) in [
        ("inactive_rate", params.inactive_rate),
        ("missing_rate", params.missing_rate),
    ] {
        if !(0.0..1.0).contains(&rate) {
            anyhow::bail!("{} = {} is not in [0, 1)", name, rate);
        }
    }

    info!(
        "simulating {} view(s), {} samples, {} factors",
        params.num_features.len(),
        nn,
        kk
    );

    let mut rng = StdRng::seed_from_u64(params.seed);
    let noise = Normal::new(0.0, params.noise_std)?;

    let factors = Mat::rnorm(nn, kk, &mut rng);

    let mut views = Vec::with_capacity(params.num_features.len());
    let mut weights = Vec::with_capacity(params.num_features.len());

    for &dd in params.num_features.iter() {
        let mut w = Mat::rnorm(dd, kk, &mut rng) * params.weight_std;
        for k in 0..kk {
            if rng.random::<f64>() < params.inactive_rate {
                w.column_mut(k).fill(0.0);
            }
        }

        let mut y = factors.dot(&w.t());
        y.mapv_inplace(|x| x + noise.sample(&mut rng));

        if params.missing_rate > 0.0 {
            let missing = Mat::runif(nn, dd, &mut rng).mapv(|u| u < params.missing_rate);
            y.fill_masked(&missing, f64::NAN)?;
        }

        views.push(y);
        weights.push(w);
    }

    Ok(SimulatedViews {
        views,
        factors,
        weights,
    })
}
