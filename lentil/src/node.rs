//! Node contract and the capability traits that make up Markov
//! blankets.
//!
//! A node reads its collaborators only through these traits. The
//! blanket of each node type is a plain struct of shared references,
//! built by the caller for every `update_parameters` or
//! `calculate_elbo` call, so a node can never mutate another node.

use crate::common::*;

/// A variational (or observed) node of the factor graph
pub trait VariationalNode {
    /// Collaborators whose expectations this node reads
    type Blanket<'a>;

    fn dim(&self) -> Dim;

    /// Axis indexing the factors, `None` if the node has no factor axis
    fn factors_axis(&self) -> Option<usize>;

    /// Closed-form coordinate update of the posterior `Q`
    fn update_parameters(&mut self, mb: &Self::Blanket<'_>) -> anyhow::Result<()>;

    /// This node's additive contribution to the evidence lower bound
    fn calculate_elbo(&self, mb: &Self::Blanket<'_>) -> anyhow::Result<f64>;

    /// Drop the factors `idx` along `axis`
    fn remove_factors(&mut self, idx: &[usize], axis: usize) -> anyhow::Result<()>;
}

/// Observed data of one view, `(N, D)`
pub trait ObservedData {
    /// Values with the missing entries set to zero
    fn data(&self) -> &Mat;

    /// `true` where the value is missing
    fn mask(&self) -> &Mask;
}

/// Per-feature noise precision of one view, `(1, D)`
pub trait NoisePrecision {
    /// E[τ]
    fn precision(&self) -> &Mat;

    /// E[ln τ]
    fn log_precision(&self) -> &Mat;

    /// `Qb - Pb`: half the expected sum of squared residuals per feature
    /// at the time of the last update
    fn rate_gain(&self) -> Mat;
}

/// Moments of the spike-and-slab weights of one view, `(D, K)`
pub trait WeightMoments {
    /// E[s w]
    fn weights(&self) -> &Mat;

    /// E[(s w)²]
    fn weights_sq(&self) -> &Mat;

    /// E[w²] marginalised over the spike
    fn slab_sq(&self) -> &Mat;

    /// E[s]
    fn spike(&self) -> &Mat;
}

/// Moments of the factor scores, `(N, K)`
pub trait FactorMoments {
    fn factors(&self) -> &Mat;

    fn factors_sq(&self) -> &Mat;
}

/// ARD precision, `(1, K)` or `(1, 1)`
pub trait ArdPrecision {
    /// E[α]
    fn precision(&self) -> &Mat;

    /// E[ln α]
    fn log_precision(&self) -> &Mat;
}

/// Prior inclusion probability of the spike, `(1, K)` or `(D, K)`
pub trait SparsityPrior {
    /// E[ln θ]
    fn log_prob(&self) -> &Mat;

    /// E[ln (1 - θ)]
    fn log_prob_inv(&self) -> &Mat;
}

/// Prior mean of the factor scores, expanded to `(N, K)`
pub trait FactorMean {
    fn sample_mean(&self) -> Mat;

    fn sample_mean_sq(&self) -> Mat;
}

/// Decide whether a removal request applies to a node with the given
/// factor axis. Nodes without a factor axis ignore it.
pub(crate) fn applies_to(factors_axis: Option<usize>, axis: usize) -> anyhow::Result<bool> {
    match factors_axis {
        None => Ok(false),
        Some(ax) if ax == axis => Ok(true),
        Some(ax) => anyhow::bail!("factors are along axis {}, not {}", ax, axis),
    }
}

/// Surviving `indices`, shifted down past the `removed` ones
pub(crate) fn reindex(indices: &[usize], removed: &[usize]) -> Vec<usize> {
    indices
        .iter()
        .filter(|i| !removed.contains(i))
        .map(|&i| i - removed.iter().filter(|&&r| r < i).count())
        .collect()
}
