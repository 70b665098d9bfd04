use crate::stat::{digamma, ln_beta, nan_to_zero};
use crate::traits::{check_dim, Dim, ExpFamily};
use matrix_util::traits::AxisOps;
use ndarray::prelude::*;
use ndarray::Zip;

#[derive(Debug, Clone)]
pub struct BetaParams {
    pub a: Array2<f64>,
    pub b: Array2<f64>,
}

#[derive(Debug, Clone)]
pub struct BetaExpectations {
    /// E[x] = a / (a + b)
    pub mean: Array2<f64>,
    /// E[ln x] = ψ(a) - ψ(a + b)
    pub log_mean: Array2<f64>,
    /// E[ln(1 - x)] = ψ(b) - ψ(a + b)
    pub log_mean_inv: Array2<f64>,
}

#[derive(Debug, Clone)]
pub struct BetaDist {
    dim: Dim,
    params: BetaParams,
    expectations: BetaExpectations,
}

impl BetaDist {
    pub fn new(dim: Dim, a: f64, b: f64) -> Self {
        Self::build(BetaParams {
            a: Array2::from_elem(dim, a),
            b: Array2::from_elem(dim, b),
        })
    }

    pub fn from_params(params: BetaParams) -> anyhow::Result<Self> {
        check_dim("b", params.a.dim(), &params.b)?;
        Ok(Self::build(params))
    }

    fn build(params: BetaParams) -> Self {
        let dim = params.a.dim();
        let mut ret = Self {
            dim,
            params,
            expectations: BetaExpectations {
                mean: Array2::zeros(dim),
                log_mean: Array2::zeros(dim),
                log_mean_inv: Array2::zeros(dim),
            },
        };
        ret.calibrate();
        ret
    }

    /// Negative KL divergence of `self` (posterior) from `prior`.
    ///
    /// Degenerate probabilities give NaN element terms; those are
    /// counted as zero.
    pub fn neg_kl(&self, prior: &BetaDist) -> anyhow::Result<f64> {
        check_dim("prior", self.dim, &prior.params.a)?;

        let log_mean = &self.expectations.log_mean;
        let log_mean_inv = &self.expectations.log_mean_inv;

        let cross = |par: &BetaParams| -> f64 {
            Zip::from(&par.a)
                .and(&par.b)
                .and(log_mean)
                .and(log_mean_inv)
                .fold(0.0, |acc, &a, &b, &lnx, &ln1mx| {
                    acc + nan_to_zero((a - 1.0) * lnx + (b - 1.0) * ln1mx - ln_beta(a, b))
                })
        };

        Ok(cross(&prior.params) - cross(&self.params))
    }
}

impl ExpFamily for BetaDist {
    type Params = BetaParams;
    type Expectations = BetaExpectations;

    fn dim(&self) -> Dim {
        self.dim
    }

    fn params(&self) -> &BetaParams {
        &self.params
    }

    fn set_params(&mut self, params: BetaParams) -> anyhow::Result<()> {
        check_dim("a", self.dim, &params.a)?;
        check_dim("b", self.dim, &params.b)?;
        self.params = params;
        self.calibrate();
        Ok(())
    }

    fn expectations(&self) -> &BetaExpectations {
        &self.expectations
    }

    fn expectation(&self) -> &Array2<f64> {
        &self.expectations.mean
    }

    fn calibrate(&mut self) {
        let (a, b) = (&self.params.a, &self.params.b);
        self.expectations.mean = Zip::from(a).and(b).map_collect(|&a, &b| a / (a + b));
        self.expectations.log_mean =
            Zip::from(a).and(b).map_collect(|&a, &b| digamma(a) - digamma(a + b));
        self.expectations.log_mean_inv =
            Zip::from(a).and(b).map_collect(|&a, &b| digamma(b) - digamma(a + b));
    }

    fn remove_factors(&mut self, idx: &[usize], axis: usize) -> anyhow::Result<()> {
        self.params.a.remove_indices_inplace(axis, idx)?;
        self.params.b.remove_indices_inplace(axis, idx)?;
        self.dim = self.params.a.dim();
        self.calibrate();
        Ok(())
    }
}
