use ndarray::Array2;

/// Shape of a parameter matrix (num of rows, num of columns)
pub type Dim = (usize, usize);

/// An exponential-family parameter matrix. Every element is an
/// independent distribution of the same family; parameters and
/// expectations share the shape `dim()`.
///
/// Expectations are recomputed eagerly: after `set_params` returns,
/// `expectations()` reflects the new parameters.
pub trait ExpFamily {
    type Params;
    type Expectations;

    fn dim(&self) -> Dim;

    fn params(&self) -> &Self::Params;

    /// Replace all parameters and recalibrate the expectations
    fn set_params(&mut self, params: Self::Params) -> anyhow::Result<()>;

    fn expectations(&self) -> &Self::Expectations;

    /// The canonical first moment
    fn expectation(&self) -> &Array2<f64>;

    /// Recompute the expectations from the current parameters
    fn calibrate(&mut self);

    /// Drop the factors `idx` along `axis` from every parameter, then
    /// recalibrate
    fn remove_factors(&mut self, idx: &[usize], axis: usize) -> anyhow::Result<()>;
}

pub(crate) fn check_dim(name: &str, dim: Dim, mat: &Array2<f64>) -> anyhow::Result<()> {
    if mat.dim() != dim {
        anyhow::bail!(
            "parameter `{}` has shape {:?}, expected {:?}",
            name,
            mat.dim(),
            dim
        );
    }
    Ok(())
}
