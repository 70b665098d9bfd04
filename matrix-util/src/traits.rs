use rand::Rng;

/// Explicit shape expansion. A vector of per-column (or per-row)
/// parameters is repeated into the full matrix shape before use;
/// anything that cannot be repeated into the target is an error.
pub trait BroadcastOps {
    type Mat;

    /// Repeat a `(1, c)`, `(r, 1)` or `(1, 1)` matrix into `(nrow, ncol)`.
    /// A matrix that already has the target shape is copied.
    fn repeat_to(&self, nrow: usize, ncol: usize) -> anyhow::Result<Self::Mat>;
}

/// Trimming of rows or columns
pub trait AxisOps {
    type Mat;

    /// Drop the entries `idx` along `axis` (0: rows, 1: columns)
    fn remove_indices(&self, axis: usize, idx: &[usize]) -> anyhow::Result<Self::Mat>;

    /// Same as `remove_indices`, in place
    fn remove_indices_inplace(&mut self, axis: usize, idx: &[usize]) -> anyhow::Result<()>;
}

/// Missing-value handling with a boolean mask (`true` = missing)
pub trait MaskOps {
    type Mat;
    type Mask;
    type Scalar;

    /// Mask of non-finite entries
    fn nonfinite_mask(&self) -> Self::Mask;

    /// `self[i,j] = value` wherever `mask[i,j]`
    fn fill_masked(&mut self, mask: &Self::Mask, value: Self::Scalar) -> anyhow::Result<()>;

    /// Number of unmasked entries in each column
    fn observed_per_column(mask: &Self::Mask) -> Self::Mat;
}

/// Operations to sample random matrices from a caller-owned generator
pub trait SampleOps {
    type Mat;

    /// Sample a matrix from a uniform distribution `U(0,1)`
    fn runif<R: Rng + ?Sized>(nrow: usize, ncol: usize, rng: &mut R) -> Self::Mat;

    /// Sample a matrix from a normal distribution `N(0,1)`
    fn rnorm<R: Rng + ?Sized>(nrow: usize, ncol: usize, rng: &mut R) -> Self::Mat;
}
