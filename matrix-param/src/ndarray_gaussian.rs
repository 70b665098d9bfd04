use crate::traits::{check_dim, Dim, ExpFamily};
use matrix_util::traits::AxisOps;
use ndarray::prelude::*;
use ndarray::Zip;

/// Element-wise univariate Gaussian with `mean` and `var`
#[derive(Debug, Clone)]
pub struct GaussianParams {
    pub mean: Array2<f64>,
    pub var: Array2<f64>,
}

#[derive(Debug, Clone)]
pub struct GaussianExpectations {
    pub mean: Array2<f64>,
    /// E[x²] = var + mean²
    pub mean_sq: Array2<f64>,
}

#[derive(Debug, Clone)]
pub struct GaussianDist {
    dim: Dim,
    params: GaussianParams,
    expectations: GaussianExpectations,
}

impl GaussianDist {
    pub fn new(dim: Dim, mean: f64, var: f64) -> Self {
        Self::build(GaussianParams {
            mean: Array2::from_elem(dim, mean),
            var: Array2::from_elem(dim, var),
        })
    }

    pub fn from_params(params: GaussianParams) -> anyhow::Result<Self> {
        check_dim("var", params.mean.dim(), &params.var)?;
        Ok(Self::build(params))
    }

    fn build(params: GaussianParams) -> Self {
        let dim = params.mean.dim();
        let mut ret = Self {
            dim,
            params,
            expectations: GaussianExpectations {
                mean: Array2::zeros(dim),
                mean_sq: Array2::zeros(dim),
            },
        };
        ret.calibrate();
        ret
    }
}

impl ExpFamily for GaussianDist {
    type Params = GaussianParams;
    type Expectations = GaussianExpectations;

    fn dim(&self) -> Dim {
        self.dim
    }

    fn params(&self) -> &GaussianParams {
        &self.params
    }

    fn set_params(&mut self, params: GaussianParams) -> anyhow::Result<()> {
        check_dim("mean", self.dim, &params.mean)?;
        check_dim("var", self.dim, &params.var)?;
        self.params = params;
        self.calibrate();
        Ok(())
    }

    fn expectations(&self) -> &GaussianExpectations {
        &self.expectations
    }

    fn expectation(&self) -> &Array2<f64> {
        &self.expectations.mean
    }

    fn calibrate(&mut self) {
        self.expectations.mean = self.params.mean.clone();
        self.expectations.mean_sq = Zip::from(&self.params.mean)
            .and(&self.params.var)
            .map_collect(|&m, &v| v + m * m);
    }

    fn remove_factors(&mut self, idx: &[usize], axis: usize) -> anyhow::Result<()> {
        self.params.mean.remove_indices_inplace(axis, idx)?;
        self.params.var.remove_indices_inplace(axis, idx)?;
        self.dim = self.params.mean.dim();
        self.calibrate();
        Ok(())
    }
}
