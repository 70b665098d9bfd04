use crate::common::*;
use crate::node::*;
use matrix_param::ConstantDist;
use matrix_param::stat::LN_2PI;

/// Observed data of one view with its missing-value mask.
///
/// Non-finite entries are masked on construction and stored as zero,
/// so they drop out of every sufficient statistic.
#[derive(Debug, Clone)]
pub struct YNode {
    dim: Dim,
    value: ConstantDist,
    mask: Mask,
    /// number of observed samples per feature, `(1, D)`
    nobs: Mat,
    likconst: f64,
}

pub struct YBlanket<'a> {
    pub tau: &'a dyn NoisePrecision,
}

impl YNode {
    pub fn new(value: Mat) -> Self {
        let mask = value.nonfinite_mask();
        Self::build(value, mask)
    }

    /// Data with an explicit mask; non-finite entries are masked too
    pub fn with_mask(value: Mat, mask: Mask) -> anyhow::Result<Self> {
        if mask.dim() != value.dim() {
            anyhow::bail!(
                "mask {:?} does not match the data {:?}",
                mask.dim(),
                value.dim()
            );
        }
        let mask = &mask | &value.nonfinite_mask();
        Ok(Self::build(value, mask))
    }

    fn build(mut value: Mat, mask: Mask) -> Self {
        let dim = value.dim();
        // shapes agree by construction
        Zip::from(&mut value).and(&mask).for_each(|x, &m| {
            if m {
                *x = 0.0;
            }
        });
        let mut ret = Self {
            dim,
            value: ConstantDist::new(value),
            mask,
            nobs: Mat::zeros((1, dim.1)),
            likconst: 0.0,
        };
        ret.precompute();
        ret
    }

    fn precompute(&mut self) {
        self.nobs = Mat::observed_per_column(&self.mask);
        self.likconst = -0.5 * self.nobs.sum() * LN_2PI;
    }

    pub fn get_mask(&self) -> &Mask {
        &self.mask
    }

    /// Number of observed samples per feature, `(1, D)`
    pub fn observed_per_feature(&self) -> &Mat {
        &self.nobs
    }

    pub fn num_samples(&self) -> usize {
        self.dim.0
    }

    pub fn num_features(&self) -> usize {
        self.dim.1
    }

    pub fn likconst(&self) -> f64 {
        self.likconst
    }
}

impl ObservedData for YNode {
    fn data(&self) -> &Mat {
        self.value.expectation()
    }

    fn mask(&self) -> &Mask {
        &self.mask
    }
}

impl VariationalNode for YNode {
    type Blanket<'a> = YBlanket<'a>;

    fn dim(&self) -> Dim {
        self.dim
    }

    fn factors_axis(&self) -> Option<usize> {
        None
    }

    fn update_parameters(&mut self, _mb: &YBlanket<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Expected Gaussian log-likelihood of the observed entries.
    ///
    /// The rate of the Tau posterior already holds the expected
    /// squared residuals, so this is only exact when Tau was updated
    /// after the last change of the weights and the factors.
    fn calculate_elbo(&self, mb: &YBlanket<'_>) -> anyhow::Result<f64> {
        let tau = mb.tau.precision();
        let log_tau = mb.tau.log_precision();
        let gain = mb.tau.rate_gain();

        if tau.dim() != self.nobs.dim() {
            anyhow::bail!(
                "noise precision {:?} does not match {} features",
                tau.dim(),
                self.dim.1
            );
        }

        let lik = self.likconst + 0.5 * (&self.nobs * log_tau).sum() - (tau * &gain).sum();
        Ok(lik)
    }

    fn remove_factors(&mut self, _idx: &[usize], _axis: usize) -> anyhow::Result<()> {
        Ok(())
    }
}
