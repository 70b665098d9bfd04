use crate::traits::{check_dim, Dim, ExpFamily};
use matrix_util::traits::AxisOps;
use ndarray::prelude::*;

#[derive(Debug, Clone)]
pub struct ConstantExpectations {
    pub mean: Array2<f64>,
    pub mean_sq: Array2<f64>,
}

/// A point mass. The only parameter is the value itself.
#[derive(Debug, Clone)]
pub struct ConstantDist {
    dim: Dim,
    value: Array2<f64>,
    expectations: ConstantExpectations,
}

impl ConstantDist {
    pub fn new(value: Array2<f64>) -> Self {
        let dim = value.dim();
        let mut ret = Self {
            dim,
            value,
            expectations: ConstantExpectations {
                mean: Array2::zeros(dim),
                mean_sq: Array2::zeros(dim),
            },
        };
        ret.calibrate();
        ret
    }
}

impl ExpFamily for ConstantDist {
    type Params = Array2<f64>;
    type Expectations = ConstantExpectations;

    fn dim(&self) -> Dim {
        self.dim
    }

    fn params(&self) -> &Array2<f64> {
        &self.value
    }

    fn set_params(&mut self, value: Array2<f64>) -> anyhow::Result<()> {
        check_dim("value", self.dim, &value)?;
        self.value = value;
        self.calibrate();
        Ok(())
    }

    fn expectations(&self) -> &ConstantExpectations {
        &self.expectations
    }

    fn expectation(&self) -> &Array2<f64> {
        &self.expectations.mean
    }

    fn calibrate(&mut self) {
        self.expectations.mean = self.value.clone();
        self.expectations.mean_sq = self.value.mapv(|x| x * x);
    }

    fn remove_factors(&mut self, idx: &[usize], axis: usize) -> anyhow::Result<()> {
        self.value.remove_indices_inplace(axis, idx)?;
        self.dim = self.value.dim();
        self.calibrate();
        Ok(())
    }
}
