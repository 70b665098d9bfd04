//! Automatic relevance determination: Gamma precisions over the
//! weights of a view and over the factor scores.

use crate::common::*;
use crate::factors::ZNode;
use crate::node::*;
use matrix_param::{GammaDist, GammaParams};

/// How finely the weight precision is shared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArdGranularity {
    /// one α for all factors of the view, `(1, 1)`
    PerView,
    /// one α per factor of the view, `(1, K)`
    PerFactor,
}

/// ARD precision over the weights of one view
///
/// w[d,k] ~ N(0, 1/α[k])
/// α[k] ~ Gamma(a0, b0)
#[derive(Debug, Clone)]
pub struct AlphaWNode {
    dim: Dim,
    granularity: ArdGranularity,
    p: GammaDist,
    q: GammaDist,
}

pub struct AlphaWBlanket<'a> {
    pub sw: &'a dyn WeightMoments,
}

impl AlphaWNode {
    pub fn new(
        num_factors: usize,
        granularity: ArdGranularity,
        pa: f64,
        pb: f64,
        qa: f64,
        qb: f64,
    ) -> Self {
        let dim = match granularity {
            ArdGranularity::PerView => (1, 1),
            ArdGranularity::PerFactor => (1, num_factors),
        };
        Self {
            dim,
            granularity,
            p: GammaDist::new(dim, pa, pb),
            q: GammaDist::new(dim, qa, qb),
        }
    }

    pub fn granularity(&self) -> ArdGranularity {
        self.granularity
    }

    pub fn prior(&self) -> &GammaDist {
        &self.p
    }

    pub fn posterior(&self) -> &GammaDist {
        &self.q
    }
}

impl ArdPrecision for AlphaWNode {
    fn precision(&self) -> &Mat {
        &self.q.expectations().mean
    }

    fn log_precision(&self) -> &Mat {
        &self.q.expectations().log_mean
    }
}

impl VariationalNode for AlphaWNode {
    type Blanket<'a> = AlphaWBlanket<'a>;

    fn dim(&self) -> Dim {
        self.dim
    }

    fn factors_axis(&self) -> Option<usize> {
        match self.granularity {
            ArdGranularity::PerView => None,
            ArdGranularity::PerFactor => Some(1),
        }
    }

    fn update_parameters(&mut self, mb: &AlphaWBlanket<'_>) -> anyhow::Result<()> {
        let eww = mb.sw.slab_sq();
        let (d, k) = eww.dim();
        let prior = self.p.params();

        let (qa, qb) = match self.granularity {
            ArdGranularity::PerView => (
                prior.a.mapv(|a| a + 0.5 * (d * k) as f64),
                prior.b.mapv(|b| b + 0.5 * eww.sum()),
            ),
            ArdGranularity::PerFactor => {
                if k != self.dim.1 {
                    anyhow::bail!("{} weight columns for {} ARD factors", k, self.dim.1);
                }
                let ss = eww.sum_axis(Axis(0)).insert_axis(Axis(0));
                (prior.a.mapv(|a| a + 0.5 * d as f64), &prior.b + &(ss * 0.5))
            }
        };

        self.q.set_params(GammaParams { a: qa, b: qb })
    }

    fn calculate_elbo(&self, _mb: &AlphaWBlanket<'_>) -> anyhow::Result<f64> {
        self.q.neg_kl(&self.p)
    }

    fn remove_factors(&mut self, idx: &[usize], axis: usize) -> anyhow::Result<()> {
        if applies_to(self.factors_axis(), axis)? {
            self.p.remove_factors(idx, axis)?;
            self.q.remove_factors(idx, axis)?;
            self.dim = self.q.dim();
        }
        Ok(())
    }
}

/// ARD precision over the factor scores, `(1, K)`
///
/// z[n,k] ~ N(μ[n,k], 1/α[k])
/// α[k] ~ Gamma(a0, b0)
///
/// Covariate columns are not inferred; they keep their posterior and
/// stay out of the ELBO.
#[derive(Debug, Clone)]
pub struct AlphaZNode {
    dim: Dim,
    p: GammaDist,
    q: GammaDist,
}

pub struct AlphaZBlanket<'a> {
    pub z: &'a ZNode,
    pub mu: Option<&'a dyn FactorMean>,
}

impl AlphaZNode {
    pub fn new(num_factors: usize, pa: f64, pb: f64, qa: f64, qb: f64) -> Self {
        let dim = (1, num_factors);
        Self {
            dim,
            p: GammaDist::new(dim, pa, pb),
            q: GammaDist::new(dim, qa, qb),
        }
    }

    pub fn prior(&self) -> &GammaDist {
        &self.p
    }

    pub fn posterior(&self) -> &GammaDist {
        &self.q
    }
}

impl ArdPrecision for AlphaZNode {
    fn precision(&self) -> &Mat {
        &self.q.expectations().mean
    }

    fn log_precision(&self) -> &Mat {
        &self.q.expectations().log_mean
    }
}

impl VariationalNode for AlphaZNode {
    type Blanket<'a> = AlphaZBlanket<'a>;

    fn dim(&self) -> Dim {
        self.dim
    }

    fn factors_axis(&self) -> Option<usize> {
        Some(1)
    }

    fn update_parameters(&mut self, mb: &AlphaZBlanket<'_>) -> anyhow::Result<()> {
        let (e, e2) = (mb.z.factors(), mb.z.factors_sq());
        let (n, k) = e.dim();
        if k != self.dim.1 {
            anyhow::bail!("{} factors for an AlphaZ of {:?}", k, self.dim);
        }

        let (mu, mu2) = match mb.mu {
            Some(mu) => (mu.sample_mean(), mu.sample_mean_sq()),
            None => {
                let m = mb.z.prior_mean().clone();
                let m2 = m.mapv(|x| x * x);
                (m, m2)
            }
        };

        // E[(z - μ)²]
        let dev = e2 - &(e * &mu * 2.0) + &mu2;
        let ss = dev.sum_axis(Axis(0));

        let prior = self.p.params();
        let mut qa = self.q.params().a.clone();
        let mut qb = self.q.params().b.clone();
        for kk in mb.z.latent_indices() {
            qa[(0, kk)] = prior.a[(0, kk)] + 0.5 * n as f64;
            qb[(0, kk)] = prior.b[(0, kk)] + 0.5 * ss[kk];
        }

        self.q.set_params(GammaParams { a: qa, b: qb })
    }

    fn calculate_elbo(&self, mb: &AlphaZBlanket<'_>) -> anyhow::Result<f64> {
        let latent = mb.z.latent_indices();
        let free = |dist: &GammaDist| {
            let par = dist.params();
            GammaDist::from_params(GammaParams {
                a: par.a.select(Axis(1), &latent),
                b: par.b.select(Axis(1), &latent),
            })
        };
        free(&self.q)?.neg_kl(&free(&self.p)?)
    }

    fn remove_factors(&mut self, idx: &[usize], axis: usize) -> anyhow::Result<()> {
        if applies_to(self.factors_axis(), axis)? {
            self.p.remove_factors(idx, axis)?;
            self.q.remove_factors(idx, axis)?;
            self.dim = self.q.dim();
        }
        Ok(())
    }
}
