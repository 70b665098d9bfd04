use crate::common::*;
use crate::node::*;
use matrix_param::{GammaDist, GammaParams};
use matrix_util::ndarray_util::dotd;

/// Per-feature noise precision τ_d of one view
///
/// y[n,d] ~ N(Σ_k z[n,k] s[d,k] w[d,k], 1/τ[d])
/// τ[d] ~ Gamma(a0, b0)
#[derive(Debug, Clone)]
pub struct TauNode {
    dim: Dim,
    p: GammaDist,
    q: GammaDist,
}

pub struct TauBlanket<'a> {
    pub y: &'a dyn ObservedData,
    pub sw: &'a dyn WeightMoments,
    pub z: &'a dyn FactorMoments,
}

impl TauNode {
    /// * `num_features` - number of features D of the view
    /// * `pa`, `pb` - prior shape and rate
    /// * `qa`, `qb` - initial posterior shape and rate
    pub fn new(num_features: usize, pa: f64, pb: f64, qa: f64, qb: f64) -> Self {
        let dim = (1, num_features);
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

    /// Expected sum of squared residuals over the observed entries of
    /// each feature
    ///
    /// Σ_n y² - 2 y (Z Wᵀ) + (Z Wᵀ)² - (Z²)(W²)ᵀ + E[Z²] E[(SW)²]ᵀ
    ///
    /// The last three terms are `E[(Σ_k z_k w_k)²]`: the squared mean
    /// with its diagonal replaced by the second moments.
    fn expected_sumsq(mb: &TauBlanket<'_>) -> anyhow::Result<Mat> {
        let y = mb.y.data();
        let mask = mb.y.mask();
        let (z, zz) = (mb.z.factors(), mb.z.factors_sq());
        let (sw, esww) = (mb.sw.weights(), mb.sw.weights_sq());

        if z.nrows() != y.nrows() || sw.nrows() != y.ncols() || sw.ncols() != z.ncols() {
            anyhow::bail!(
                "Y {:?}, Z {:?} and SW {:?} are not conformable",
                y.dim(),
                z.dim(),
                sw.dim()
            );
        }

        let mut zw = z.dot(&sw.t());
        zw.fill_masked(mask, 0.0)?;

        let mut quad = zz.dot(&esww.t());
        quad.fill_masked(mask, 0.0)?;

        let mut diag = z.mapv(|x| x * x).dot(&sw.mapv(|x| x * x).t());
        diag.fill_masked(mask, 0.0)?;

        let zw_t = zw.t().to_owned();

        let term1 = y.mapv(|x| x * x).sum_axis(Axis(0));
        let term2 = (y * &zw).sum_axis(Axis(0)) * 2.0;
        let term3 = quad.sum_axis(Axis(0));
        let term4 = dotd(&zw_t, &zw_t)? - diag.sum_axis(Axis(0));

        let ret = term1 - term2 + term3 + term4;
        Ok(ret.insert_axis(Axis(0)))
    }
}

impl NoisePrecision for TauNode {
    fn precision(&self) -> &Mat {
        &self.q.expectations().mean
    }

    fn log_precision(&self) -> &Mat {
        &self.q.expectations().log_mean
    }

    fn rate_gain(&self) -> Mat {
        &self.q.params().b - &self.p.params().b
    }
}

impl VariationalNode for TauNode {
    type Blanket<'a> = TauBlanket<'a>;

    fn dim(&self) -> Dim {
        self.dim
    }

    fn factors_axis(&self) -> Option<usize> {
        None
    }

    fn update_parameters(&mut self, mb: &TauBlanket<'_>) -> anyhow::Result<()> {
        let sumsq = Self::expected_sumsq(mb)?;
        if sumsq.dim() != self.dim {
            anyhow::bail!("{:?} features for a Tau of {:?}", sumsq.dim(), self.dim);
        }

        let nobs = Mat::observed_per_column(mb.y.mask());
        let prior = self.p.params();

        let qa = &prior.a + &(nobs * 0.5);
        let qb = &prior.b + &(sumsq * 0.5);

        self.q.set_params(GammaParams { a: qa, b: qb })
    }

    fn calculate_elbo(&self, _mb: &TauBlanket<'_>) -> anyhow::Result<f64> {
        self.q.neg_kl(&self.p)
    }

    fn remove_factors(&mut self, _idx: &[usize], _axis: usize) -> anyhow::Result<()> {
        Ok(())
    }
}
