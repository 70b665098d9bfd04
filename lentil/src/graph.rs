//! Owner of all nodes. Resolves the Markov blanket of each node from
//! its sibling fields and applies one coordinate update at a time.

use crate::ard::*;
use crate::cluster_mean::*;
use crate::common::*;
use crate::data::*;
use crate::factors::*;
use crate::node::*;
use crate::noise::*;
use crate::sparsity::*;
use crate::weights::*;
use rayon::prelude::*;

/// Node types the coordinate ascent visits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Z,
    AlphaZ,
    MuZ,
    SW,
    AlphaW,
    Theta,
    Tau,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NodeKind::Z => "Z",
            NodeKind::AlphaZ => "AlphaZ",
            NodeKind::MuZ => "MuZ",
            NodeKind::SW => "SW",
            NodeKind::AlphaW => "AlphaW",
            NodeKind::Theta => "Theta",
            NodeKind::Tau => "Tau",
        };
        write!(f, "{}", name)
    }
}

/// All nodes of a model with `M` views
pub struct GraphNodes {
    pub z: ZNode,
    pub y: Mixed<YNode>,
    pub tau: Mixed<TauNode>,
    pub sw: Mixed<SwNode>,
    pub alpha_w: Mixed<AlphaWNode>,
    pub theta: Mixed<MixedThetaNode>,
    pub alpha_z: Option<AlphaZNode>,
    pub mu_z: Option<MuZNode>,
}

/// ELBO broken down by node type, summed over views
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ElboTerms {
    pub y: f64,
    pub tau: f64,
    pub sw: f64,
    pub alpha_w: f64,
    pub theta: f64,
    pub z: f64,
    pub alpha_z: f64,
    pub mu_z: f64,
}

impl ElboTerms {
    pub fn total(&self) -> f64 {
        self.y + self.tau + self.sw + self.alpha_w + self.theta + self.z + self.alpha_z + self.mu_z
    }
}

pub struct FactorGraph {
    nodes: GraphNodes,
}

impl FactorGraph {
    /// Take ownership of the nodes after checking that all shapes agree
    pub fn new(nodes: GraphNodes) -> anyhow::Result<Self> {
        let (nn, kk) = nodes.z.dim();
        let mm = nodes.y.len();

        if nodes.tau.len() != mm
            || nodes.sw.len() != mm
            || nodes.alpha_w.len() != mm
            || nodes.theta.len() != mm
        {
            anyhow::bail!(
                "views disagree: Y {}, Tau {}, SW {}, AlphaW {}, Theta {}",
                mm,
                nodes.tau.len(),
                nodes.sw.len(),
                nodes.alpha_w.len(),
                nodes.theta.len()
            );
        }

        for m in 0..mm {
            let (ny, dd) = nodes.y[m].dim();
            if ny != nn {
                anyhow::bail!("view {}: {} samples, factors have {}", m, ny, nn);
            }
            if nodes.tau[m].dim() != (1, dd) {
                anyhow::bail!("view {}: Tau {:?} for {} features", m, nodes.tau[m].dim(), dd);
            }
            if nodes.sw[m].dim() != (dd, kk) {
                anyhow::bail!(
                    "view {}: SW {:?}, expected {:?}",
                    m,
                    nodes.sw[m].dim(),
                    (dd, kk)
                );
            }
            let alpha = &nodes.alpha_w[m];
            let expected = match alpha.granularity() {
                ArdGranularity::PerView => (1, 1),
                ArdGranularity::PerFactor => (1, kk),
            };
            if alpha.dim() != expected {
                anyhow::bail!("view {}: AlphaW {:?}, expected {:?}", m, alpha.dim(), expected);
            }
            let (nt, kt) = nodes.theta[m].dim();
            if kt != kk || (nt != 1 && nt != dd) {
                anyhow::bail!("view {}: Theta {:?} for SW {:?}", m, (nt, kt), (dd, kk));
            }
        }

        if let Some(alpha_z) = &nodes.alpha_z {
            if alpha_z.dim() != (1, kk) {
                anyhow::bail!("AlphaZ {:?} for {} factors", alpha_z.dim(), kk);
            }
        }

        if let Some(mu_z) = &nodes.mu_z {
            if mu_z.dim().1 != kk || mu_z.clusters().len() != nn {
                anyhow::bail!(
                    "MuZ {:?} over {} samples for factors {:?}",
                    mu_z.dim(),
                    mu_z.clusters().len(),
                    (nn, kk)
                );
            }
        }

        Ok(Self { nodes })
    }

    pub fn nodes(&self) -> &GraphNodes {
        &self.nodes
    }

    pub fn into_nodes(self) -> GraphNodes {
        self.nodes
    }

    pub fn z(&self) -> &ZNode {
        &self.nodes.z
    }

    pub fn y(&self) -> &Mixed<YNode> {
        &self.nodes.y
    }

    pub fn tau(&self) -> &Mixed<TauNode> {
        &self.nodes.tau
    }

    pub fn sw(&self) -> &Mixed<SwNode> {
        &self.nodes.sw
    }

    pub fn alpha_w(&self) -> &Mixed<AlphaWNode> {
        &self.nodes.alpha_w
    }

    pub fn theta(&self) -> &Mixed<MixedThetaNode> {
        &self.nodes.theta
    }

    pub fn alpha_z(&self) -> Option<&AlphaZNode> {
        self.nodes.alpha_z.as_ref()
    }

    pub fn mu_z(&self) -> Option<&MuZNode> {
        self.nodes.mu_z.as_ref()
    }

    pub fn num_views(&self) -> usize {
        self.nodes.y.len()
    }

    pub fn num_samples(&self) -> usize {
        self.nodes.z.dim().0
    }

    pub fn num_factors(&self) -> usize {
        self.nodes.z.dim().1
    }

    pub fn has(&self, kind: NodeKind) -> bool {
        match kind {
            NodeKind::AlphaZ => self.nodes.alpha_z.is_some(),
            NodeKind::MuZ => self.nodes.mu_z.is_some(),
            _ => true,
        }
    }

    /// Z, then its priors, then the per-view nodes with Tau last
    pub fn default_schedule(&self) -> Vec<NodeKind> {
        [
            NodeKind::Z,
            NodeKind::AlphaZ,
            NodeKind::MuZ,
            NodeKind::SW,
            NodeKind::AlphaW,
            NodeKind::Theta,
            NodeKind::Tau,
        ]
        .into_iter()
        .filter(|&kind| self.has(kind))
        .collect()
    }

    /// Coordinate update of every node of type `kind`
    ///
    /// * `parallel` - update the views of a per-view node concurrently
    pub fn update(&mut self, kind: NodeKind, parallel: bool) -> anyhow::Result<()> {
        let GraphNodes {
            z,
            y,
            tau,
            sw,
            alpha_w,
            theta,
            alpha_z,
            mu_z,
        } = &mut self.nodes;

        match kind {
            NodeKind::Z => {
                let mb = z_blanket(y, tau, sw, alpha_z.as_ref(), mu_z.as_ref());
                z.update_parameters(&mb)
            }
            NodeKind::AlphaZ => {
                let Some(alpha_z) = alpha_z.as_mut() else {
                    anyhow::bail!("no AlphaZ node in this graph");
                };
                let mb = AlphaZBlanket {
                    z,
                    mu: mu_z.as_ref().map(|x| x as &dyn FactorMean),
                };
                alpha_z.update_parameters(&mb)
            }
            NodeKind::MuZ => {
                let Some(mu_z) = mu_z.as_mut() else {
                    anyhow::bail!("no MuZ node in this graph");
                };
                let mb = MuZBlanket {
                    z,
                    alpha: alpha_z.as_ref().map(|x| x as &dyn ArdPrecision),
                };
                mu_z.update_parameters(&mb)
            }
            NodeKind::SW => {
                let (y, tau, z, alpha_w, theta) = (&*y, &*tau, &*z, &*alpha_w, &*theta);
                for_each_view(sw, parallel, |m, sw_m| {
                    sw_m.update_parameters(&SwBlanket {
                        y: &y[m],
                        tau: &tau[m],
                        z,
                        alpha: &alpha_w[m],
                        theta: &theta[m],
                    })
                })
            }
            NodeKind::AlphaW => {
                let sw = &*sw;
                for_each_view(alpha_w, parallel, |m, alpha_m| {
                    alpha_m.update_parameters(&AlphaWBlanket { sw: &sw[m] })
                })
            }
            NodeKind::Theta => {
                let sw = &*sw;
                for_each_view(theta, parallel, |m, theta_m| {
                    theta_m.update_parameters(&ThetaBlanket { sw: &sw[m] })
                })
            }
            NodeKind::Tau => {
                let (y, sw, z) = (&*y, &*sw, &*z);
                for_each_view(tau, parallel, |m, tau_m| {
                    tau_m.update_parameters(&TauBlanket {
                        y: &y[m],
                        sw: &sw[m],
                        z,
                    })
                })
            }
        }
    }

    /// Sum of the ELBO terms of all nodes.
    ///
    /// The likelihood term reads the rate of the Tau posterior, so it is
    /// only exact right after Tau was updated from the current weights
    /// and factors.
    pub fn elbo(&self) -> anyhow::Result<ElboTerms> {
        let nodes = &self.nodes;
        let mut ret = ElboTerms::default();

        for m in 0..self.num_views() {
            let (y, tau, sw) = (&nodes.y[m], &nodes.tau[m], &nodes.sw[m]);

            ret.y += y.calculate_elbo(&YBlanket { tau })?;
            ret.tau += tau.calculate_elbo(&TauBlanket {
                y,
                sw,
                z: &nodes.z,
            })?;
            ret.sw += sw.calculate_elbo(&SwBlanket {
                y,
                tau,
                z: &nodes.z,
                alpha: &nodes.alpha_w[m],
                theta: &nodes.theta[m],
            })?;
            ret.alpha_w += nodes.alpha_w[m].calculate_elbo(&AlphaWBlanket { sw })?;
            ret.theta += nodes.theta[m].calculate_elbo(&ThetaBlanket { sw })?;
        }

        let mb = z_blanket(
            &nodes.y,
            &nodes.tau,
            &nodes.sw,
            nodes.alpha_z.as_ref(),
            nodes.mu_z.as_ref(),
        );
        ret.z = nodes.z.calculate_elbo(&mb)?;

        if let Some(alpha_z) = &nodes.alpha_z {
            ret.alpha_z = alpha_z.calculate_elbo(&AlphaZBlanket {
                z: &nodes.z,
                mu: nodes.mu_z.as_ref().map(|x| x as &dyn FactorMean),
            })?;
        }

        if let Some(mu_z) = &nodes.mu_z {
            ret.mu_z = mu_z.calculate_elbo(&MuZBlanket {
                z: &nodes.z,
                alpha: nodes.alpha_z.as_ref().map(|x| x as &dyn ArdPrecision),
            })?;
        }

        Ok(ret)
    }

    /// Drop the factors `idx` from every node that carries a factor axis
    pub fn remove_factors(&mut self, idx: &[usize]) -> anyhow::Result<()> {
        let kk = self.num_factors();
        let mut idx = idx.to_vec();
        idx.sort_unstable();
        idx.dedup();

        if let Some(&bad) = idx.iter().find(|&&k| k >= kk) {
            anyhow::bail!("factor {} out of {} factors", bad, kk);
        }
        if idx.is_empty() {
            return Ok(());
        }

        let nodes = &mut self.nodes;
        nodes.z.remove_factors(&idx, 1)?;
        if let Some(alpha_z) = nodes.alpha_z.as_mut() {
            alpha_z.remove_factors(&idx, 1)?;
        }
        if let Some(mu_z) = nodes.mu_z.as_mut() {
            mu_z.remove_factors(&idx, 1)?;
        }
        for m in 0..nodes.y.len() {
            nodes.sw[m].remove_factors(&idx, 1)?;
            nodes.alpha_w[m].remove_factors(&idx, 1)?;
            nodes.theta[m].remove_factors(&idx, 1)?;
        }

        info!("removed factors {:?}, {} left", idx, self.num_factors());
        Ok(())
    }
}

fn z_blanket<'a>(
    y: &'a Mixed<YNode>,
    tau: &'a Mixed<TauNode>,
    sw: &'a Mixed<SwNode>,
    alpha_z: Option<&'a AlphaZNode>,
    mu_z: Option<&'a MuZNode>,
) -> ZBlanket<'a> {
    let views = (0..y.len())
        .map(|m| ViewMoments {
            y: &y[m],
            tau: &tau[m],
            sw: &sw[m],
        })
        .collect();

    ZBlanket {
        views,
        alpha: alpha_z.map(|x| x as &dyn ArdPrecision),
        mu: mu_z.map(|x| x as &dyn FactorMean),
    }
}

/// Apply `visit` to every view, on the rayon pool if `parallel`
fn for_each_view<T, F>(items: &mut Mixed<T>, parallel: bool, visit: F) -> anyhow::Result<()>
where
    T: Send,
    F: Fn(usize, &mut T) -> anyhow::Result<()> + Sync + Send,
{
    if parallel {
        items
            .views_mut()
            .par_iter_mut()
            .enumerate()
            .try_for_each(|(m, x)| visit(m, x))
    } else {
        items
            .iter_mut()
            .enumerate()
            .try_for_each(|(m, x)| visit(m, x))
    }
}
