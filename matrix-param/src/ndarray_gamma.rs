use crate::stat::{digamma, ln_gamma};
use crate::traits::{check_dim, Dim, ExpFamily};
use matrix_util::traits::AxisOps;
use ndarray::prelude::*;
use ndarray::Zip;

/// shape `a` and rate `b`
#[derive(Debug, Clone)]
pub struct GammaParams {
    pub a: Array2<f64>,
    pub b: Array2<f64>,
}

#[derive(Debug, Clone)]
pub struct GammaExpectations {
    /// E[x] = a / b
    pub mean: Array2<f64>,
    /// E[ln x] = ψ(a) - ln(b)
    pub log_mean: Array2<f64>,
}

#[derive(Debug, Clone)]
pub struct GammaDist {
    dim: Dim,
    params: GammaParams,
    expectations: GammaExpectations,
}

impl GammaDist {
    /// Gamma parameter matrix filled with the same shape `a` and rate `b`
    ///
    /// x[i,j] ~ Gamma(a, b)
    ///
    /// # Arguments
    /// * `dim` - dimensions of the matrix (num of rows, num of columns)
    /// * `a` - shape
    /// * `b` - rate
    pub fn new(dim: Dim, a: f64, b: f64) -> Self {
        Self::build(GammaParams {
            a: Array2::from_elem(dim, a),
            b: Array2::from_elem(dim, b),
        })
    }

    pub fn from_params(params: GammaParams) -> anyhow::Result<Self> {
        let dim = params.a.dim();
        check_dim("b", dim, &params.b)?;
        Ok(Self::build(params))
    }

    fn build(params: GammaParams) -> Self {
        let dim = params.a.dim();
        let mut ret = Self {
            dim,
            params,
            expectations: GammaExpectations {
                mean: Array2::zeros(dim),
                log_mean: Array2::zeros(dim),
            },
        };
        ret.calibrate();
        ret
    }

    /// Gamma log-normaliser `Σ a ln(b) - lnΓ(a)`
    pub fn log_normalizer(&self) -> f64 {
        Zip::from(&self.params.a)
            .and(&self.params.b)
            .fold(0.0, |acc, &a, &b| acc + a * b.ln() - ln_gamma(a))
    }

    /// `E_q[ln p] - E_q[ln q]` of `self` as the posterior `q` against
    /// the `prior` p, i.e. the negative KL divergence
    pub fn neg_kl(&self, prior: &GammaDist) -> anyhow::Result<f64> {
        check_dim("prior", self.dim, &prior.params.a)?;

        let log_mean = &self.expectations.log_mean;
        let mean = &self.expectations.mean;

        let cross = |par: &GammaParams| -> f64 {
            Zip::from(&par.a)
                .and(&par.b)
                .and(log_mean)
                .and(mean)
                .fold(0.0, |acc, &a, &b, &lnx, &x| {
                    acc + (a - 1.0) * lnx - b * x
                })
        };

        let lb_p = prior.log_normalizer() + cross(&prior.params);
        let lb_q = self.log_normalizer() + cross(&self.params);
        Ok(lb_p - lb_q)
    }
}

impl ExpFamily for GammaDist {
    type Params = GammaParams;
    type Expectations = GammaExpectations;

    fn dim(&self) -> Dim {
        self.dim
    }

    fn params(&self) -> &GammaParams {
        &self.params
    }

    fn set_params(&mut self, params: GammaParams) -> anyhow::Result<()> {
        check_dim("a", self.dim, &params.a)?;
        check_dim("b", self.dim, &params.b)?;
        self.params = params;
        self.calibrate();
        Ok(())
    }

    fn expectations(&self) -> &GammaExpectations {
        &self.expectations
    }

    fn expectation(&self) -> &Array2<f64> {
        &self.expectations.mean
    }

    fn calibrate(&mut self) {
        self.expectations.mean = &self.params.a / &self.params.b;
        // digamma(a) - ln(b)
        self.expectations.log_mean =
            Zip::from(&self.params.a)
                .and(&self.params.b)
                .map_collect(|&a, &b| digamma(a) - b.ln());
    }

    fn remove_factors(&mut self, idx: &[usize], axis: usize) -> anyhow::Result<()> {
        self.params.a.remove_indices_inplace(axis, idx)?;
        self.params.b.remove_indices_inplace(axis, idx)?;
        self.dim = self.params.a.dim();
        self.calibrate();
        Ok(())
    }
}
