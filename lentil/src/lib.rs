//! Mean-field variational Bayes for multi-view sparse factor analysis.
//!
//! Views `Y_m` (`N × D_m`) share factor scores `Z` (`N × K`):
//!
//! y[n,d] ~ N(Σ_k z[n,k] s[d,k] w[d,k], 1/τ[d])
//!
//! with ARD precisions on the weights (and optionally the factors),
//! spike-and-slab sparsity on the weights, and missing entries masked
//! out of every term. Each node owns a closed-form coordinate update
//! and its additive share of the evidence lower bound.

/// Shared aliases and re-exports
pub mod common;

/// Node contract and the capability traits of Markov blankets
pub mod node;

/// Observed data with missing-value mask
pub mod data;

/// Noise precision per feature
pub mod noise;

/// ARD precisions on weights and factors
pub mod ard;

/// Spike-and-slab weights
pub mod weights;

/// Learned, fixed and mixed inclusion probabilities
pub mod sparsity;

/// Factor scores
pub mod factors;

/// Cluster-specific factor means
pub mod cluster_mean;

/// Container of all nodes
pub mod graph;

/// Default priors and initialization
pub mod init;

/// Coordinate-ascent driver
pub mod inference;

/// Planted multi-view data
pub mod simulate;

#[cfg(test)]
mod test;

pub use ard::{AlphaWNode, AlphaZNode, ArdGranularity};
pub use cluster_mean::MuZNode;
pub use data::YNode;
pub use factors::ZNode;
pub use graph::{ElboTerms, FactorGraph, GraphNodes, NodeKind};
pub use inference::{run_vb, validate_schedule, VbOptions, VbTrace};
pub use init::ModelPriors;
pub use noise::TauNode;
pub use simulate::{simulate_views, SimParams, SimulatedViews};
pub use sparsity::{MixedThetaNode, ThetaConstantNode, ThetaNode};
pub use weights::SwNode;
