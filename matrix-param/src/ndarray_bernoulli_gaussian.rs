use crate::traits::{check_dim, Dim, ExpFamily};
use matrix_util::traits::AxisOps;
use ndarray::prelude::*;
use ndarray::Zip;

/// Joint spike-and-slab `q(s, w) = q(s) q(w | s)` with
///
/// s ~ Bernoulli(theta)
/// w | s=0 ~ N(mean_s0, var_s0)
/// w | s=1 ~ N(mean_s1, var_s1)
#[derive(Debug, Clone)]
pub struct BernoulliGaussianParams {
    pub mean_s0: Array2<f64>,
    pub var_s0: Array2<f64>,
    pub mean_s1: Array2<f64>,
    pub var_s1: Array2<f64>,
    pub theta: Array2<f64>,
}

#[derive(Debug, Clone)]
pub struct BernoulliGaussianExpectations {
    /// E[s w] = theta * mean_s1
    pub mean: Array2<f64>,
    /// E[s] = theta
    pub spike: Array2<f64>,
    /// E[w | s=0]
    pub mean_s0: Array2<f64>,
    /// E[w | s=1]
    pub mean_s1: Array2<f64>,
    /// E[(s w)²] = theta * (var_s1 + mean_s1²)
    pub mean_sq: Array2<f64>,
    /// E[w²] = theta * (var_s1 + mean_s1²) + (1 - theta) * (var_s0 + mean_s0²)
    pub slab_sq: Array2<f64>,
}

#[derive(Debug, Clone)]
pub struct BernoulliGaussianDist {
    dim: Dim,
    params: BernoulliGaussianParams,
    expectations: BernoulliGaussianExpectations,
}

impl BernoulliGaussianDist {
    pub fn new(dim: Dim, mean: f64, var: f64, theta: f64) -> Self {
        Self::build(BernoulliGaussianParams {
            mean_s0: Array2::zeros(dim),
            var_s0: Array2::from_elem(dim, var),
            mean_s1: Array2::from_elem(dim, mean),
            var_s1: Array2::from_elem(dim, var),
            theta: Array2::from_elem(dim, theta),
        })
    }

    pub fn from_params(params: BernoulliGaussianParams) -> anyhow::Result<Self> {
        let dim = params.theta.dim();
        check_dim("mean_s0", dim, &params.mean_s0)?;
        check_dim("var_s0", dim, &params.var_s0)?;
        check_dim("mean_s1", dim, &params.mean_s1)?;
        check_dim("var_s1", dim, &params.var_s1)?;
        Ok(Self::build(params))
    }

    fn build(params: BernoulliGaussianParams) -> Self {
        let dim = params.theta.dim();
        let mut ret = Self {
            dim,
            params,
            expectations: BernoulliGaussianExpectations {
                mean: Array2::zeros(dim),
                spike: Array2::zeros(dim),
                mean_s0: Array2::zeros(dim),
                mean_s1: Array2::zeros(dim),
                mean_sq: Array2::zeros(dim),
                slab_sq: Array2::zeros(dim),
            },
        };
        ret.calibrate();
        ret
    }
}

impl ExpFamily for BernoulliGaussianDist {
    type Params = BernoulliGaussianParams;
    type Expectations = BernoulliGaussianExpectations;

    fn dim(&self) -> Dim {
        self.dim
    }

    fn params(&self) -> &BernoulliGaussianParams {
        &self.params
    }

    fn set_params(&mut self, params: BernoulliGaussianParams) -> anyhow::Result<()> {
        check_dim("mean_s0", self.dim, &params.mean_s0)?;
        check_dim("var_s0", self.dim, &params.var_s0)?;
        check_dim("mean_s1", self.dim, &params.mean_s1)?;
        check_dim("var_s1", self.dim, &params.var_s1)?;
        check_dim("theta", self.dim, &params.theta)?;
        self.params = params;
        self.calibrate();
        Ok(())
    }

    fn expectations(&self) -> &BernoulliGaussianExpectations {
        &self.expectations
    }

    fn expectation(&self) -> &Array2<f64> {
        &self.expectations.mean
    }

    fn calibrate(&mut self) {
        let par = &self.params;
        let ex = &mut self.expectations;

        ex.spike = par.theta.clone();
        ex.mean_s0 = par.mean_s0.clone();
        ex.mean_s1 = par.mean_s1.clone();
        ex.mean = &par.theta * &par.mean_s1;
        ex.mean_sq = Zip::from(&par.theta)
            .and(&par.mean_s1)
            .and(&par.var_s1)
            .map_collect(|&t, &m, &v| t * (v + m * m));
        ex.slab_sq = Zip::from(&ex.mean_sq)
            .and(&par.theta)
            .and(&par.mean_s0)
            .and(&par.var_s0)
            .map_collect(|&sww, &t, &m, &v| sww + (1.0 - t) * (v + m * m));
    }

    fn remove_factors(&mut self, idx: &[usize], axis: usize) -> anyhow::Result<()> {
        let par = &mut self.params;
        par.mean_s0.remove_indices_inplace(axis, idx)?;
        par.var_s0.remove_indices_inplace(axis, idx)?;
        par.mean_s1.remove_indices_inplace(axis, idx)?;
        par.var_s1.remove_indices_inplace(axis, idx)?;
        par.theta.remove_indices_inplace(axis, idx)?;
        self.dim = par.theta.dim();
        self.calibrate();
        Ok(())
    }
}
