use crate::common::*;
use crate::factors::ZNode;
use crate::node::*;
use matrix_param::{GaussianDist, GaussianParams};

/// Cluster-specific prior mean of the factor scores, Gaussian `(C, K)`
///
/// z[n,k] ~ N(μ[c(n),k], 1/α[n,k])
/// μ[c,k] ~ N(m0, v0)
#[derive(Debug, Clone)]
pub struct MuZNode {
    dim: Dim,
    /// cluster of each sample
    clusters: Vec<usize>,
    p: GaussianDist,
    q: GaussianDist,
}

pub struct MuZBlanket<'a> {
    pub z: &'a ZNode,
    pub alpha: Option<&'a dyn ArdPrecision>,
}

impl MuZNode {
    /// * `clusters` - cluster membership `c(n)` of every sample
    /// * `p` - prior over the `(C, K)` means
    /// * `q` - initial posterior
    pub fn new(clusters: Vec<usize>, p: GaussianDist, q: GaussianDist) -> anyhow::Result<Self> {
        if p.dim() != q.dim() {
            anyhow::bail!("prior {:?} and posterior {:?} differ", p.dim(), q.dim());
        }
        let dim = q.dim();
        if let Some(&bad) = clusters.iter().find(|&&c| c >= dim.0) {
            anyhow::bail!("cluster {} out of {} clusters", bad, dim.0);
        }
        Ok(Self {
            dim,
            clusters,
            p,
            q,
        })
    }

    pub fn clusters(&self) -> &[usize] {
        &self.clusters
    }

    pub fn num_clusters(&self) -> usize {
        self.dim.0
    }

    pub fn prior(&self) -> &GaussianDist {
        &self.p
    }

    pub fn posterior(&self) -> &GaussianDist {
        &self.q
    }
}

impl FactorMean for MuZNode {
    fn sample_mean(&self) -> Mat {
        self.q.expectation().select(Axis(0), &self.clusters)
    }

    fn sample_mean_sq(&self) -> Mat {
        self.q.expectations().mean_sq.select(Axis(0), &self.clusters)
    }
}

impl VariationalNode for MuZNode {
    type Blanket<'a> = MuZBlanket<'a>;

    fn dim(&self) -> Dim {
        self.dim
    }

    fn factors_axis(&self) -> Option<usize> {
        Some(1)
    }

    fn update_parameters(&mut self, mb: &MuZBlanket<'_>) -> anyhow::Result<()> {
        let z = mb.z.factors();
        let (nn, kk) = z.dim();
        if nn != self.clusters.len() || kk != self.dim.1 {
            anyhow::bail!(
                "factors {:?} for {} samples and cluster means {:?}",
                z.dim(),
                self.clusters.len(),
                self.dim
            );
        }

        let alpha = match mb.alpha {
            Some(alpha) => alpha.precision().repeat_to(nn, kk)?,
            None => mb.z.prior_var().mapv(f64::recip),
        };

        // per-cluster sums of α and α z
        let mut sa = Mat::zeros(self.dim);
        let mut saz = Mat::zeros(self.dim);
        for (n, &c) in self.clusters.iter().enumerate() {
            for k in 0..kk {
                sa[(c, k)] += alpha[(n, k)];
                saz[(c, k)] += alpha[(n, k)] * z[(n, k)];
            }
        }

        let prior = self.p.params();
        let mut qmean = self.q.params().mean.clone();
        let mut qvar = self.q.params().var.clone();

        for k in mb.z.latent_indices() {
            for c in 0..self.dim.0 {
                let (m0, v0) = (prior.mean[(c, k)], prior.var[(c, k)]);
                qvar[(c, k)] = 1.0 / (1.0 / v0 + sa[(c, k)]);
                qmean[(c, k)] = qvar[(c, k)] * (m0 / v0 + saz[(c, k)]);
            }
        }

        self.q.set_params(GaussianParams {
            mean: qmean,
            var: qvar,
        })
    }

    fn calculate_elbo(&self, _mb: &MuZBlanket<'_>) -> anyhow::Result<f64> {
        let prior = self.p.params();
        let ex = self.q.expectations();

        let lb_p = Zip::from(&prior.mean)
            .and(&prior.var)
            .and(&ex.mean)
            .and(&ex.mean_sq)
            .fold(0.0, |acc, &m0, &v0, &e, &e2| {
                acc - 0.5 * v0.ln() - 0.5 * (e2 - 2.0 * m0 * e + m0 * m0) / v0
            });
        let lb_q = -0.5 * self.q.params().var.fold(0.0, |acc, &v| acc + v.ln() + 1.0);

        Ok(lb_p - lb_q)
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
