use crate::common::*;
use crate::node::*;
use matrix_param::{BernoulliGaussianDist, BernoulliGaussianParams};

/// Spike-and-slab weights of one view, `(D, K)`
///
/// w[d,k] = s[d,k] * ŵ[d,k]
/// s[d,k] ~ Bernoulli(θ[k])
/// ŵ[d,k] ~ N(0, 1/α[k])
///
/// The posterior `q(s, ŵ)` is updated one factor at a time; the sweep
/// over `k` reads the freshly updated columns `j < k`.
#[derive(Debug, Clone)]
pub struct SwNode {
    dim: Dim,
    p: BernoulliGaussianDist,
    q: BernoulliGaussianDist,
}

pub struct SwBlanket<'a> {
    pub y: &'a dyn ObservedData,
    pub tau: &'a dyn NoisePrecision,
    pub z: &'a dyn FactorMoments,
    pub alpha: &'a dyn ArdPrecision,
    pub theta: &'a dyn SparsityPrior,
}

impl SwNode {
    /// * `p` - prior; only its shape is used by the updates, the
    ///   precision and the inclusion probability come from the blanket
    /// * `q` - initial posterior
    pub fn new(p: BernoulliGaussianDist, q: BernoulliGaussianDist) -> anyhow::Result<Self> {
        if p.dim() != q.dim() {
            anyhow::bail!("prior {:?} and posterior {:?} differ", p.dim(), q.dim());
        }
        Ok(Self { dim: q.dim(), p, q })
    }

    pub fn prior(&self) -> &BernoulliGaussianDist {
        &self.p
    }

    pub fn posterior(&self) -> &BernoulliGaussianDist {
        &self.q
    }

    pub fn num_features(&self) -> usize {
        self.dim.0
    }

    pub fn num_factors(&self) -> usize {
        self.dim.1
    }
}

impl WeightMoments for SwNode {
    fn weights(&self) -> &Mat {
        &self.q.expectations().mean
    }

    fn weights_sq(&self) -> &Mat {
        &self.q.expectations().mean_sq
    }

    fn slab_sq(&self) -> &Mat {
        &self.q.expectations().slab_sq
    }

    fn spike(&self) -> &Mat {
        &self.q.expectations().spike
    }
}

impl VariationalNode for SwNode {
    type Blanket<'a> = SwBlanket<'a>;

    fn dim(&self) -> Dim {
        self.dim
    }

    fn factors_axis(&self) -> Option<usize> {
        Some(1)
    }

    fn update_parameters(&mut self, mb: &SwBlanket<'_>) -> anyhow::Result<()> {
        let (dd, kk) = self.dim;
        let (z, zz) = (mb.z.factors(), mb.z.factors_sq());
        let nn = z.nrows();

        if z.ncols() != kk || mb.y.data().dim() != (nn, dd) {
            anyhow::bail!(
                "Y {:?} and Z {:?} do not match weights {:?}",
                mb.y.data().dim(),
                z.dim(),
                self.dim
            );
        }

        // expand to full shapes; missing entries drop out via τ = 0
        let mask = mb.y.mask();
        let mut tau = mb.tau.precision().repeat_to(nn, dd)?;
        tau.fill_masked(mask, 0.0)?;
        let tau_y = &tau * mb.y.data();

        let alpha = mb.alpha.precision().repeat_to(1, kk)?;
        let log_odds =
            mb.theta.log_prob().repeat_to(dd, kk)? - mb.theta.log_prob_inv().repeat_to(dd, kk)?;

        let par = self.q.params();
        let mut mean_s1 = par.mean_s1.clone();
        let mut var_s1 = par.var_s1.clone();
        let mut theta = par.theta.clone();
        let mut sw = self.q.expectation().clone();

        for k in 0..kk {
            let z_k = z.column(k);
            let alpha_k = alpha[(0, k)];

            // Σ_n E[z²] τ + α, per feature
            let prec = zz.column(k).dot(&tau) + alpha_k;

            // residual projected on factor k, leaving factor k out
            let mut resid = tau_y.t().dot(&z_k);
            for j in (0..kk).filter(|&j| j != k) {
                let zkzj = &z_k * &z.column(j);
                let cross = tau.t().dot(&zkzj);
                resid -= &(cross * &sw.column(j));
            }

            for d in 0..dd {
                let term1 = log_odds[(d, k)];
                let term2 = 0.5 * alpha_k.ln();
                let term3 = 0.5 * prec[d].ln();
                let term4 = 0.5 * resid[d] * resid[d] / prec[d];

                theta[(d, k)] = sigmoid(term1 + term2 - term3 + term4);
                var_s1[(d, k)] = 1.0 / prec[d];
                mean_s1[(d, k)] = var_s1[(d, k)] * resid[d];
                sw[(d, k)] = theta[(d, k)] * mean_s1[(d, k)];
            }
        }

        let var_s0 = alpha.mapv(f64::recip).repeat_to(dd, kk)?;

        self.q.set_params(BernoulliGaussianParams {
            mean_s0: Mat::zeros((dd, kk)),
            var_s0,
            mean_s1,
            var_s1,
            theta,
        })
    }

    /// Gaussian slab part plus Bernoulli spike part.
    ///
    /// The `ln 2π` terms of the slab prior and of the slab entropy
    /// cancel; the entropy keeps `-D K / 2` from `E[(ŵ - m)²] / v = 1`.
    fn calculate_elbo(&self, mb: &SwBlanket<'_>) -> anyhow::Result<f64> {
        let (dd, kk) = self.dim;
        let par = self.q.params();
        let ex = self.q.expectations();
        let (s, ww) = (&ex.spike, &ex.slab_sq);

        let alpha = mb.alpha.precision().repeat_to(1, kk)?;
        let log_alpha = mb.alpha.log_precision().repeat_to(1, kk)?;

        let lb_pw = 0.5 * (dd as f64 * log_alpha.sum() - (ww * &alpha).sum());
        let lb_qw = -0.5 * (dd * kk) as f64
            - 0.5
                * Zip::from(s)
                    .and(&par.var_s1)
                    .and(&par.var_s0)
                    .fold(0.0, |acc, &s, &v1, &v0| {
                        acc + s * v1.ln() + (1.0 - s) * v0.ln()
                    });
        let lb_w = lb_pw - lb_qw;

        let log_theta = mb.theta.log_prob().repeat_to(dd, kk)?;
        let log_theta_inv = mb.theta.log_prob_inv().repeat_to(dd, kk)?;

        let lb_ps = Zip::from(s)
            .and(&log_theta)
            .and(&log_theta_inv)
            .fold(0.0, |acc, &s, &lt, &lti| {
                acc + nan_to_zero(s * lt + (1.0 - s) * lti)
            });

        // 0 ln 0 = 0
        let lb_qs = s.fold(0.0, |acc, &s| {
            acc + nan_to_zero(s * s.ln() + (1.0 - s) * (1.0 - s).ln())
        });

        Ok(lb_w + lb_ps - lb_qs)
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
