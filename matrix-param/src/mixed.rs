use crate::traits::ExpFamily;
use ndarray::{concatenate, Array2, ArrayView2, Axis};

/// A sequence of per-view items sharing the same role, e.g. one
/// weight distribution per data view. For exponential-family items
/// the expectations can be read as a sequence, summed, or
/// concatenated.
#[derive(Debug, Clone)]
pub struct Mixed<T> {
    views: Vec<T>,
}

impl<T> Mixed<T> {
    pub fn new(views: Vec<T>) -> anyhow::Result<Self> {
        if views.is_empty() {
            anyhow::bail!("a mixed node needs at least one view");
        }
        Ok(Self { views })
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn views(&self) -> &[T] {
        &self.views
    }

    pub fn views_mut(&mut self) -> &mut [T] {
        &mut self.views
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.views.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.views.iter_mut()
    }

    pub fn into_inner(self) -> Vec<T> {
        self.views
    }
}

impl<T> std::ops::Index<usize> for Mixed<T> {
    type Output = T;

    fn index(&self, m: usize) -> &T {
        &self.views[m]
    }
}

impl<T> std::ops::IndexMut<usize> for Mixed<T> {
    fn index_mut(&mut self, m: usize) -> &mut T {
        &mut self.views[m]
    }
}

impl<'a, T> IntoIterator for &'a Mixed<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.views.iter()
    }
}

impl<T> Mixed<T>
where
    T: ExpFamily,
{
    pub fn expectations(&self) -> Vec<&T::Expectations> {
        self.views.iter().map(|x| x.expectations()).collect()
    }

    /// Element-wise sum of the first moments; all views must share a
    /// shape
    pub fn expectation_sum(&self) -> anyhow::Result<Array2<f64>> {
        let mut ret = self.views[0].expectation().clone();
        for x in self.views.iter().skip(1) {
            let ex = x.expectation();
            if ex.dim() != ret.dim() {
                anyhow::bail!("cannot sum {:?} and {:?}", ret.dim(), ex.dim());
            }
            ret += ex;
        }
        Ok(ret)
    }

    /// Stack the first moments along `axis`, e.g. per-view weights
    /// `(D_m, K)` into `(ΣD_m, K)` along rows
    pub fn expectation_concat(&self, axis: usize) -> anyhow::Result<Array2<f64>> {
        let parts: Vec<ArrayView2<f64>> = self
            .views
            .iter()
            .map(|x| x.expectation().view())
            .collect();
        Ok(concatenate(Axis(axis), &parts)?)
    }

    pub fn remove_factors(&mut self, idx: &[usize], axis: usize) -> anyhow::Result<()> {
        for x in self.views.iter_mut() {
            x.remove_factors(idx, axis)?;
        }
        Ok(())
    }
}
