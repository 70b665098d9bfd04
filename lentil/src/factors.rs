use crate::common::*;
use crate::node::*;
use matrix_param::{GaussianDist, GaussianParams};

/// Factor scores shared by all views, Gaussian `(N, K)`
///
/// z[n,k] ~ N(μ[n,k], 1/α[n,k])
///
/// Covariate columns hold observed values: they take part in the
/// likelihood of every view but are never updated and contribute no
/// ELBO term.
#[derive(Debug, Clone)]
pub struct ZNode {
    dim: Dim,
    p: GaussianDist,
    q: GaussianDist,
    covariates: Vec<bool>,
}

/// What one view contributes to the factor update
pub struct ViewMoments<'a> {
    pub y: &'a dyn ObservedData,
    pub tau: &'a dyn NoisePrecision,
    pub sw: &'a dyn WeightMoments,
}

pub struct ZBlanket<'a> {
    pub views: Vec<ViewMoments<'a>>,
    /// learned ARD precision; the prior variance is used if absent
    pub alpha: Option<&'a dyn ArdPrecision>,
    /// learned prior mean; the prior mean is used if absent
    pub mu: Option<&'a dyn FactorMean>,
}

impl ZNode {
    /// * `p` - prior mean and variance
    /// * `q` - initial posterior; covariate columns carry the covariates
    /// * `covariates` - factor columns that are observed covariates
    pub fn new(
        p: GaussianDist,
        q: GaussianDist,
        covariates: Option<&[usize]>,
    ) -> anyhow::Result<Self> {
        if p.dim() != q.dim() {
            anyhow::bail!("prior {:?} and posterior {:?} differ", p.dim(), q.dim());
        }
        let dim = q.dim();
        let mut flags = vec![false; dim.1];
        for &k in covariates.unwrap_or(&[]) {
            if k >= dim.1 {
                anyhow::bail!("covariate column {} out of {} factors", k, dim.1);
            }
            flags[k] = true;
        }
        Ok(Self {
            dim,
            p,
            q,
            covariates: flags,
        })
    }

    pub fn prior(&self) -> &GaussianDist {
        &self.p
    }

    pub fn posterior(&self) -> &GaussianDist {
        &self.q
    }

    pub fn prior_mean(&self) -> &Mat {
        &self.p.params().mean
    }

    pub fn prior_var(&self) -> &Mat {
        &self.p.params().var
    }

    /// Factor columns that are inferred (everything but covariates)
    pub fn latent_indices(&self) -> Vec<usize> {
        (0..self.dim.1).filter(|&k| !self.covariates[k]).collect()
    }

    pub fn covariate_indices(&self) -> Vec<usize> {
        (0..self.dim.1).filter(|&k| self.covariates[k]).collect()
    }

    pub fn num_samples(&self) -> usize {
        self.dim.0
    }

    pub fn num_factors(&self) -> usize {
        self.dim.1
    }

    fn prior_moments(&self, mb: &ZBlanket<'_>) -> anyhow::Result<(Mat, Mat)> {
        let (mu, mu2) = match mb.mu {
            Some(mu) => (mu.sample_mean(), mu.sample_mean_sq()),
            None => {
                let m = self.prior_mean().clone();
                let m2 = m.mapv(|x| x * x);
                (m, m2)
            }
        };
        if mu.dim() != self.dim {
            anyhow::bail!("prior mean {:?} for factors {:?}", mu.dim(), self.dim);
        }
        Ok((mu, mu2))
    }

    fn prior_precision(&self, mb: &ZBlanket<'_>) -> anyhow::Result<(Mat, Mat)> {
        let (nn, kk) = self.dim;
        match mb.alpha {
            Some(alpha) => Ok((
                alpha.precision().repeat_to(nn, kk)?,
                alpha.log_precision().repeat_to(nn, kk)?,
            )),
            None => {
                let var = self.prior_var();
                Ok((var.mapv(f64::recip), var.mapv(|v| -v.ln())))
            }
        }
    }
}

impl FactorMoments for ZNode {
    fn factors(&self) -> &Mat {
        &self.q.expectations().mean
    }

    fn factors_sq(&self) -> &Mat {
        &self.q.expectations().mean_sq
    }
}

/// One view with its precision expanded to `(N, D)` and zeroed at the
/// missing entries
struct ExpandedView<'a> {
    y: &'a Mat,
    tau: Mat,
    sw: &'a Mat,
    esww: &'a Mat,
}

impl VariationalNode for ZNode {
    type Blanket<'a> = ZBlanket<'a>;

    fn dim(&self) -> Dim {
        self.dim
    }

    fn factors_axis(&self) -> Option<usize> {
        Some(1)
    }

    fn update_parameters(&mut self, mb: &ZBlanket<'_>) -> anyhow::Result<()> {
        let (nn, kk) = self.dim;
        let (mu, _) = self.prior_moments(mb)?;
        let (alpha, _) = self.prior_precision(mb)?;

        let views = mb
            .views
            .iter()
            .map(|v| {
                let y = v.y.data();
                let (sw, esww) = (v.sw.weights(), v.sw.weights_sq());
                let dd = y.ncols();
                if y.nrows() != nn || sw.dim() != (dd, kk) {
                    anyhow::bail!(
                        "Y {:?} and SW {:?} do not match factors {:?}",
                        y.dim(),
                        sw.dim(),
                        self.dim
                    );
                }
                let mut tau = v.tau.precision().repeat_to(nn, dd)?;
                tau.fill_masked(v.y.mask(), 0.0)?;
                Ok(ExpandedView { y, tau, sw, esww })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let mut qmean = self.q.params().mean.clone();
        let mut qvar = self.q.params().var.clone();

        for k in self.latent_indices() {
            let others: Vec<usize> = (0..kk).filter(|&j| j != k).collect();
            let mut foo = Array1::<f64>::zeros(nn);
            let mut bar = Array1::<f64>::zeros(nn);

            for v in views.iter() {
                foo += &v.tau.dot(&v.esww.column(k));

                // residual without factor k, from the scores of this sweep
                let fitted = qmean
                    .select(Axis(1), &others)
                    .dot(&v.sw.select(Axis(1), &others).t());
                let resid = (v.y - &fitted) * &v.tau;
                bar += &resid.dot(&v.sw.column(k));
            }

            for n in 0..nn {
                let a = alpha[(n, k)];
                qvar[(n, k)] = 1.0 / (a + foo[n]);
                qmean[(n, k)] = qvar[(n, k)] * (a * mu[(n, k)] + bar[n]);
            }
        }

        self.q.set_params(GaussianParams {
            mean: qmean,
            var: qvar,
        })
    }

    fn calculate_elbo(&self, mb: &ZBlanket<'_>) -> anyhow::Result<f64> {
        let latent = self.latent_indices();
        let free = |x: &Mat| x.select(Axis(1), &latent);

        let (mu, mu2) = self.prior_moments(mb)?;
        let (alpha, log_alpha) = self.prior_precision(mb)?;
        let ex = self.q.expectations();

        let (e, e2) = (free(&ex.mean), free(&ex.mean_sq));
        let (mu, mu2) = (free(&mu), free(&mu2));
        let (alpha, log_alpha) = (free(&alpha), free(&log_alpha));
        let qvar = free(&self.q.params().var);

        let quad = &e2 * 0.5 - &(&mu * &e) + &(&mu2 * 0.5);
        let lb_p = -(quad * &alpha).sum() + 0.5 * log_alpha.sum();
        let lb_q = -0.5 * (qvar.mapv(f64::ln).sum() + (self.dim.0 * latent.len()) as f64);

        Ok(lb_p - lb_q)
    }

    fn remove_factors(&mut self, idx: &[usize], axis: usize) -> anyhow::Result<()> {
        if applies_to(self.factors_axis(), axis)? {
            self.p.remove_factors(idx, axis)?;
            self.q.remove_factors(idx, axis)?;
            self.covariates = self
                .covariates
                .iter()
                .enumerate()
                .filter(|(k, _)| !idx.contains(k))
                .map(|(_, &c)| c)
                .collect();
            self.dim = self.q.dim();
        }
        Ok(())
    }
}
