//! Inclusion probability of the spike-and-slab weights: learned (Beta),
//! fixed from annotations, or a mix of both over disjoint factor
//! columns.

use crate::common::*;
use crate::node::*;
use matrix_param::{BetaDist, BetaParams, ConstantDist};

pub struct ThetaBlanket<'a> {
    pub sw: &'a dyn WeightMoments,
}

/// Learned inclusion probability, Beta `(1, K)`
///
/// s[d,k] ~ Bernoulli(θ[k])
/// θ[k] ~ Beta(a0, b0)
#[derive(Debug, Clone)]
pub struct ThetaNode {
    dim: Dim,
    p: BetaDist,
    q: BetaDist,
}

impl ThetaNode {
    pub fn new(num_factors: usize, pa: f64, pb: f64, qa: f64, qb: f64) -> Self {
        let dim = (1, num_factors);
        Self {
            dim,
            p: BetaDist::new(dim, pa, pb),
            q: BetaDist::new(dim, qa, qb),
        }
    }

    pub fn prior(&self) -> &BetaDist {
        &self.p
    }

    pub fn posterior(&self) -> &BetaDist {
        &self.q
    }

    /// Update from the spike columns `selection` only (all columns if
    /// `None`). The selection must match the number of factors of this
    /// node.
    pub fn update_with_selection(
        &mut self,
        mb: &ThetaBlanket<'_>,
        selection: Option<&[usize]>,
    ) -> anyhow::Result<()> {
        let s = mb.sw.spike();
        let (dd, kk) = s.dim();

        let s = match selection {
            Some(cols) => {
                if let Some(&bad) = cols.iter().find(|&&k| k >= kk) {
                    anyhow::bail!("selected factor {} out of {} factors", bad, kk);
                }
                s.select(Axis(1), cols)
            }
            None => s.clone(),
        };

        if s.ncols() != self.dim.1 {
            anyhow::bail!(
                "{} spike columns for a Theta of {:?}",
                s.ncols(),
                self.dim
            );
        }

        let ns = s.sum_axis(Axis(0)).insert_axis(Axis(0));
        let prior = self.p.params();

        let qa = &prior.a + &ns;
        let qb = &prior.b + &ns.mapv(|x| dd as f64 - x);

        self.q.set_params(BetaParams { a: qa, b: qb })
    }
}

impl SparsityPrior for ThetaNode {
    fn log_prob(&self) -> &Mat {
        &self.q.expectations().log_mean
    }

    fn log_prob_inv(&self) -> &Mat {
        &self.q.expectations().log_mean_inv
    }
}

impl VariationalNode for ThetaNode {
    type Blanket<'a> = ThetaBlanket<'a>;

    fn dim(&self) -> Dim {
        self.dim
    }

    fn factors_axis(&self) -> Option<usize> {
        Some(1)
    }

    fn update_parameters(&mut self, mb: &ThetaBlanket<'_>) -> anyhow::Result<()> {
        self.update_with_selection(mb, None)
    }

    fn calculate_elbo(&self, _mb: &ThetaBlanket<'_>) -> anyhow::Result<f64> {
        self.q.neg_kl(&self.p)
    }

    fn remove_factors(&mut self, idx: &[usize], axis: usize) -> anyhow::Result<()> {
        if applies_to(self.factors_axis(), axis)? {
            self.p.remove_factors(idx, axis)?;
            self.q.remove_factors(idx, axis)?;
            self.dim = self.q.dim();
        }
        Ok(())
    }
}

/// Fixed inclusion probability, `(D, K)` or `(1, K)`
///
/// The log-probabilities are scaled by the number of cells the
/// probability was pooled over.
#[derive(Debug, Clone)]
pub struct ThetaConstantNode {
    value: ConstantDist,
    n_cells: f64,
    log_prob: Mat,
    log_prob_inv: Mat,
}

impl ThetaConstantNode {
    /// * `value` - probabilities in `[0, 1]`
    /// * `n_cells` - replication count (1 if `None`)
    pub fn new(value: Mat, n_cells: Option<f64>) -> anyhow::Result<Self> {
        if value.iter().any(|&x| !(0.0..=1.0).contains(&x)) {
            anyhow::bail!("fixed inclusion probabilities must lie in [0, 1]");
        }
        let mut ret = Self {
            value: ConstantDist::new(value),
            n_cells: n_cells.unwrap_or(1.0),
            log_prob: Mat::zeros((0, 0)),
            log_prob_inv: Mat::zeros((0, 0)),
        };
        ret.precompute();
        Ok(ret)
    }

    fn precompute(&mut self) {
        let n = self.n_cells;
        let value = self.value.expectation();
        self.log_prob = value.mapv(|x| n * x.ln());
        self.log_prob_inv = value.mapv(|x| n * (1.0 - x).ln());
    }

    pub fn value(&self) -> &Mat {
        self.value.expectation()
    }

    pub fn n_cells(&self) -> f64 {
        self.n_cells
    }
}

impl SparsityPrior for ThetaConstantNode {
    fn log_prob(&self) -> &Mat {
        &self.log_prob
    }

    fn log_prob_inv(&self) -> &Mat {
        &self.log_prob_inv
    }
}

impl VariationalNode for ThetaConstantNode {
    type Blanket<'a> = ThetaBlanket<'a>;

    fn dim(&self) -> Dim {
        self.value.dim()
    }

    fn factors_axis(&self) -> Option<usize> {
        Some(1)
    }

    fn update_parameters(&mut self, _mb: &ThetaBlanket<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn calculate_elbo(&self, _mb: &ThetaBlanket<'_>) -> anyhow::Result<f64> {
        Ok(0.0)
    }

    /// Trims along any axis: fixed annotations may also lose features
    fn remove_factors(&mut self, idx: &[usize], axis: usize) -> anyhow::Result<()> {
        self.value.remove_factors(idx, axis)?;
        self.precompute();
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct ThetaPart<T> {
    node: T,
    /// factor columns of the view covered by this part
    columns: Vec<usize>,
}

/// Sparsity source of one view over all its factors, `(rows, K)`
///
/// Non-annotated factors take a learned `ThetaNode`, annotated ones a
/// `ThetaConstantNode`. Either part may be absent.
#[derive(Debug, Clone)]
pub struct MixedThetaNode {
    dim: Dim,
    learned: Option<ThetaPart<ThetaNode>>,
    fixed: Option<ThetaPart<ThetaConstantNode>>,
    log_prob: Mat,
    log_prob_inv: Mat,
}

impl MixedThetaNode {
    /// * `learned` - learned node with the factor columns it covers
    /// * `fixed` - fixed node with the factor columns it covers
    ///
    /// The two column lists must partition `0..num_factors`.
    pub fn new(
        num_factors: usize,
        learned: Option<(ThetaNode, Vec<usize>)>,
        fixed: Option<(ThetaConstantNode, Vec<usize>)>,
    ) -> anyhow::Result<Self> {
        let mut covered = vec![false; num_factors];
        let mut claim = |cols: &[usize], ncols: usize, what: &str| -> anyhow::Result<()> {
            if cols.len() != ncols {
                anyhow::bail!("{} {} columns for {} factors", cols.len(), what, ncols);
            }
            for &k in cols {
                if k >= num_factors || covered[k] {
                    anyhow::bail!("factor {} is out of range or covered twice", k);
                }
                covered[k] = true;
            }
            Ok(())
        };

        if let Some((node, cols)) = &learned {
            claim(cols, node.dim().1, "learned")?;
        }
        if let Some((node, cols)) = &fixed {
            claim(cols, node.dim().1, "fixed")?;
        }
        if covered.iter().any(|&c| !c) {
            anyhow::bail!("every factor needs a sparsity prior");
        }

        let nrows = fixed.as_ref().map(|(x, _)| x.dim().0).unwrap_or(1);

        let mut ret = Self {
            dim: (nrows, num_factors),
            learned: learned.map(|(node, columns)| ThetaPart { node, columns }),
            fixed: fixed.map(|(node, columns)| ThetaPart { node, columns }),
            log_prob: Mat::zeros((nrows, num_factors)),
            log_prob_inv: Mat::zeros((nrows, num_factors)),
        };
        ret.assemble()?;
        Ok(ret)
    }

    /// Every factor is learned
    pub fn learned(node: ThetaNode) -> anyhow::Result<Self> {
        let kk = node.dim().1;
        Self::new(kk, Some((node, (0..kk).collect())), None)
    }

    /// Every factor is fixed
    pub fn fixed(node: ThetaConstantNode) -> anyhow::Result<Self> {
        let kk = node.dim().1;
        Self::new(kk, None, Some((node, (0..kk).collect())))
    }

    pub fn learned_part(&self) -> Option<&ThetaNode> {
        self.learned.as_ref().map(|x| &x.node)
    }

    pub fn fixed_part(&self) -> Option<&ThetaConstantNode> {
        self.fixed.as_ref().map(|x| &x.node)
    }

    pub fn learned_columns(&self) -> &[usize] {
        self.learned.as_ref().map(|x| x.columns.as_slice()).unwrap_or(&[])
    }

    pub fn fixed_columns(&self) -> &[usize] {
        self.fixed.as_ref().map(|x| x.columns.as_slice()).unwrap_or(&[])
    }

    fn assemble(&mut self) -> anyhow::Result<()> {
        let (nrows, kk) = self.dim;
        let mut lp = Mat::zeros((nrows, kk));
        let mut lpi = Mat::zeros((nrows, kk));

        let mut fill = |src: &dyn SparsityPrior, cols: &[usize]| -> anyhow::Result<()> {
            let a = src.log_prob().repeat_to(nrows, cols.len())?;
            let b = src.log_prob_inv().repeat_to(nrows, cols.len())?;
            for (j, &k) in cols.iter().enumerate() {
                lp.column_mut(k).assign(&a.column(j));
                lpi.column_mut(k).assign(&b.column(j));
            }
            Ok(())
        };

        if let Some(part) = &self.learned {
            fill(&part.node, &part.columns)?;
        }
        if let Some(part) = &self.fixed {
            fill(&part.node, &part.columns)?;
        }

        self.log_prob = lp;
        self.log_prob_inv = lpi;
        Ok(())
    }
}

impl SparsityPrior for MixedThetaNode {
    fn log_prob(&self) -> &Mat {
        &self.log_prob
    }

    fn log_prob_inv(&self) -> &Mat {
        &self.log_prob_inv
    }
}

impl VariationalNode for MixedThetaNode {
    type Blanket<'a> = ThetaBlanket<'a>;

    fn dim(&self) -> Dim {
        self.dim
    }

    fn factors_axis(&self) -> Option<usize> {
        Some(1)
    }

    fn update_parameters(&mut self, mb: &ThetaBlanket<'_>) -> anyhow::Result<()> {
        if let Some(part) = &mut self.learned {
            part.node.update_with_selection(mb, Some(&part.columns))?;
        }
        self.assemble()
    }

    fn calculate_elbo(&self, mb: &ThetaBlanket<'_>) -> anyhow::Result<f64> {
        match &self.learned {
            Some(part) => part.node.calculate_elbo(mb),
            None => Ok(0.0),
        }
    }

    fn remove_factors(&mut self, idx: &[usize], axis: usize) -> anyhow::Result<()> {
        if !applies_to(self.factors_axis(), axis)? {
            return Ok(());
        }

        if let Some(part) = &mut self.learned {
            let local = local_positions(&part.columns, idx);
            part.node.remove_factors(&local, axis)?;
            part.columns = reindex(&part.columns, idx);
        }
        if let Some(part) = &mut self.fixed {
            let local = local_positions(&part.columns, idx);
            part.node.remove_factors(&local, axis)?;
            part.columns = reindex(&part.columns, idx);
        }

        self.dim.1 = self.learned_columns().len() + self.fixed_columns().len();
        self.assemble()
    }
}

/// Positions within `columns` of the factors in `idx`
fn local_positions(columns: &[usize], idx: &[usize]) -> Vec<usize> {
    columns
        .iter()
        .enumerate()
        .filter(|(_, k)| idx.contains(k))
        .map(|(j, _)| j)
        .collect()
}
