pub use ndarray::prelude::*;

use crate::traits::*;
use num_traits::{Float, FromPrimitive};
use rand::distr::StandardUniform;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

impl<T> BroadcastOps for Array2<T>
where
    T: Float,
{
    type Mat = Self;

    fn repeat_to(&self, nrow: usize, ncol: usize) -> anyhow::Result<Self::Mat> {
        match self.dim() {
            (r, c) if r == nrow && c == ncol => Ok(self.clone()),
            (1, 1) => Ok(Array2::from_elem((nrow, ncol), self[(0, 0)])),
            (1, c) if c == ncol => Ok(Array2::from_shape_fn((nrow, ncol), |(_, j)| {
                self[(0, j)]
            })),
            (r, 1) if r == nrow => Ok(Array2::from_shape_fn((nrow, ncol), |(i, _)| {
                self[(i, 0)]
            })),
            (r, c) => anyhow::bail!(
                "cannot repeat a {} x {} matrix into {} x {}",
                r,
                c,
                nrow,
                ncol
            ),
        }
    }
}

impl<T> AxisOps for Array2<T>
where
    T: Float,
{
    type Mat = Self;

    fn remove_indices(&self, axis: usize, idx: &[usize]) -> anyhow::Result<Self::Mat> {
        if axis > 1 {
            anyhow::bail!("axis {} is out of range for a matrix", axis);
        }
        let len = self.len_of(Axis(axis));
        if let Some(&bad) = idx.iter().find(|&&i| i >= len) {
            anyhow::bail!("index {} is out of range along axis {} ({})", bad, axis, len);
        }
        let keep: Vec<usize> = (0..len).filter(|i| !idx.contains(i)).collect();
        Ok(self.select(Axis(axis), &keep))
    }

    fn remove_indices_inplace(&mut self, axis: usize, idx: &[usize]) -> anyhow::Result<()> {
        *self = self.remove_indices(axis, idx)?;
        Ok(())
    }
}

impl<T> MaskOps for Array2<T>
where
    T: Float + FromPrimitive,
{
    type Mat = Self;
    type Mask = Array2<bool>;
    type Scalar = T;

    fn nonfinite_mask(&self) -> Self::Mask {
        self.mapv(|x| !x.is_finite())
    }

    fn fill_masked(&mut self, mask: &Self::Mask, value: Self::Scalar) -> anyhow::Result<()> {
        if mask.dim() != self.dim() {
            anyhow::bail!(
                "mask {:?} does not match the matrix {:?}",
                mask.dim(),
                self.dim()
            );
        }
        ndarray::Zip::from(self).and(mask).for_each(|x, &m| {
            if m {
                *x = value;
            }
        });
        Ok(())
    }

    fn observed_per_column(mask: &Self::Mask) -> Self::Mat {
        let ncol = mask.ncols();
        Array2::from_shape_fn((1, ncol), |(_, j)| {
            let nobs = mask.column(j).iter().filter(|&&m| !m).count();
            T::from_usize(nobs).unwrap_or_else(T::zero)
        })
    }
}

impl<T> SampleOps for Array2<T>
where
    T: Float + FromPrimitive,
{
    type Mat = Self;

    fn runif<R: Rng + ?Sized>(nrow: usize, ncol: usize, rng: &mut R) -> Self::Mat {
        Array2::from_shape_simple_fn((nrow, ncol), || {
            let x: f64 = StandardUniform.sample(rng);
            T::from_f64(x).unwrap_or_else(T::zero)
        })
    }

    fn rnorm<R: Rng + ?Sized>(nrow: usize, ncol: usize, rng: &mut R) -> Self::Mat {
        Array2::from_shape_simple_fn((nrow, ncol), || {
            let x: f64 = StandardNormal.sample(rng);
            T::from_f64(x).unwrap_or_else(T::zero)
        })
    }
}

/// Row-wise Hadamard sum `diag(A Bᵀ)` for two matrices of the same
/// shape, i.e. `Σ_j a[i,j] b[i,j]` for each row `i`
pub fn dotd<T: Float>(a: &Array2<T>, b: &Array2<T>) -> anyhow::Result<Array1<T>> {
    if a.dim() != b.dim() {
        anyhow::bail!("dotd: {:?} vs {:?}", a.dim(), b.dim());
    }
    Ok(Array1::from_shape_fn(a.nrows(), |i| {
        a.row(i)
            .iter()
            .zip(b.row(i).iter())
            .fold(T::zero(), |acc, (&x, &y)| acc + x * y)
    }))
}
