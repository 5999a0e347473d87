//! Bottom-up subtree table
//!
//! Subtrees are built for every subset of the legs `2..=n`, smallest subsets
//! first; a subset's subtrees combine the subtrees of the blocks of each of
//! its set partitions through the `ref_dict_to1` lookup. Leg 1 is only
//! attached at the end, when the blocks of `{2..n}` are closed into a root
//! vertex through `ref_dict_to0`. Subtrees live in an arena and refer to
//! their children by index.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use super::partition::{cartesian_product, set_partitions};
use crate::diagram::{Diagram, Leg, Vertex};
use crate::error::CoreResult;
use crate::id::{InteractionId, LegSet, PdgCode};
use crate::model::{Interaction, Model};
use crate::process::{OrderConstraint, WEIGHTED};
use crate::session::CancelToken;

pub(crate) type TreeId = usize;

#[derive(Clone, Debug)]
pub(crate) enum TreeNode {
    Leaf(Leg),
    Vertex {
        interaction: InteractionId,
        children: Vec<TreeId>,
    },
}

#[derive(Clone, Debug)]
pub(crate) struct SubTree {
    pub id: PdgCode,
    pub legset: LegSet,
    pub node: TreeNode,
    pub orders: Vec<u32>,
}

// ============================================================================
// ORDER BUDGET
// ============================================================================

/// Upper bounds on coupling orders, indexed like `Model::order_keys`
#[derive(Clone, Debug)]
pub(crate) struct OrderBudget {
    keys: Vec<String>,
    bounds: Vec<Option<u32>>,
    weights: Vec<u32>,
    weighted_bound: Option<u32>,
}

impl OrderBudget {
    pub fn from_constraints(model: &Model, orders: &BTreeMap<String, OrderConstraint>) -> Self {
        let keys = model.order_keys();
        let bounds = keys
            .iter()
            .map(|k| orders.get(k).and_then(|c| c.upper_bound()))
            .collect();
        let weights = keys.iter().map(|k| model.hierarchy_weight(k)).collect();
        OrderBudget {
            bounds,
            weights,
            weighted_bound: orders.get(WEIGHTED).and_then(|c| c.upper_bound()),
            keys,
        }
    }

    pub fn from_bounds(model: &Model, bounds: &BTreeMap<String, u32>) -> Self {
        let keys = model.order_keys();
        OrderBudget {
            bounds: keys.iter().map(|k| bounds.get(k).copied()).collect(),
            weights: keys.iter().map(|k| model.hierarchy_weight(k)).collect(),
            weighted_bound: None,
            keys,
        }
    }

    pub fn zero(&self) -> Vec<u32> {
        vec![0; self.keys.len()]
    }

    pub fn of_interaction(&self, inter: &Interaction) -> Vec<u32> {
        self.keys.iter().map(|k| inter.order(k)).collect()
    }

    /// Orders only grow while combining, so exceeding a bound is final
    pub fn admits(&self, orders: &[u32]) -> bool {
        let within = orders
            .iter()
            .zip(&self.bounds)
            .all(|(v, b)| b.map_or(true, |b| *v <= b));
        let weighted: u32 = orders.iter().zip(&self.weights).map(|(v, w)| v * w).sum();
        within && self.weighted_bound.map_or(true, |b| weighted <= b)
    }

    pub fn to_map(&self, orders: &[u32]) -> BTreeMap<String, u32> {
        self.keys.iter().cloned().zip(orders.iter().copied()).collect()
    }
}

fn add_orders(acc: &mut [u32], other: &[u32]) {
    for (a, b) in acc.iter_mut().zip(other) {
        *a += b;
    }
}

// ============================================================================
// TABLE
// ============================================================================

/// Restrictions applied while subtrees are combined
pub(crate) struct TreeRules {
    pub budget: OrderBudget,
    /// Codes (both orientations) that may not propagate
    pub forbidden: HashSet<PdgCode>,
    /// Codes (both orientations) that may not propagate in the s-channel
    pub forbidden_s: HashSet<PdgCode>,
    pub initial: LegSet,
}

impl TreeRules {
    fn allows(&self, id: PdgCode, legset: LegSet) -> bool {
        if self.forbidden.contains(&id) {
            return false;
        }
        !(legset.is_disjoint(self.initial) && self.forbidden_s.contains(&id))
    }
}

pub(crate) struct TreeTable<'a> {
    model: &'a Model,
    rules: &'a TreeRules,
    arena: Vec<SubTree>,
    by_legset: HashMap<LegSet, Vec<TreeId>>,
}

impl<'a> TreeTable<'a> {
    pub fn new(model: &'a Model, rules: &'a TreeRules) -> Self {
        TreeTable {
            model,
            rules,
            arena: Vec::new(),
            by_legset: HashMap::new(),
        }
    }

    fn push(&mut self, tree: SubTree) -> TreeId {
        let id = self.arena.len();
        self.by_legset.entry(tree.legset).or_default().push(id);
        self.arena.push(tree);
        id
    }

    /// Subtrees of each block grouped by code, in first-seen order
    fn grouped(&self, block: LegSet) -> Vec<(PdgCode, Vec<TreeId>)> {
        let mut groups: Vec<(PdgCode, Vec<TreeId>)> = Vec::new();
        for &t in self.by_legset.get(&block).map(|v| v.as_slice()).unwrap_or(&[]) {
            let id = self.arena[t].id;
            match groups.iter_mut().find(|(g, _)| *g == id) {
                Some((_, list)) => list.push(t),
                None => groups.push((id, vec![t])),
            }
        }
        groups
    }

    /// Code choices per block, each with the matching subtrees
    fn block_choices(&self, blocks: &[LegSet]) -> Option<Vec<Vec<(PdgCode, Vec<TreeId>)>>> {
        let mut per_block = Vec::with_capacity(blocks.len());
        for b in blocks {
            let g = self.grouped(*b);
            if g.is_empty() {
                return None;
            }
            per_block.push(g);
        }
        Some(per_block)
    }

    /// Build every diagram for the legs `1..=n` (diagram convention)
    pub fn build(mut self, legs: &[Leg], cancel: &CancelToken) -> CoreResult<Vec<Diagram>> {
        let n = legs.len() as u32;
        let zero = self.rules.budget.zero();
        for leg in &legs[1..] {
            self.push(SubTree {
                id: leg.id,
                legset: leg.legset,
                node: TreeNode::Leaf(leg.clone()),
                orders: zero.clone(),
            });
        }
        let full = LegSet::first(n).difference(LegSet::single(1));
        let max_children = self.model.max_arity().saturating_sub(1);

        let mut subsets: Vec<LegSet> = (1..full.bits())
            .map(LegSet::from_bits)
            .filter(|s| s.is_subset(full) && s.len() >= 2 && *s != full)
            .collect();
        subsets.sort_by_key(|s| (s.len(), s.bits()));

        for subset in subsets {
            cancel.check()?;
            for blocks in set_partitions(subset, 2, max_children) {
                self.combine(subset, &blocks);
            }
        }

        let root_leg = &legs[0];
        let mut diagrams = Vec::new();
        for blocks in set_partitions(full, 2, max_children) {
            cancel.check()?;
            self.close(root_leg, &blocks, &mut diagrams);
        }
        debug!(
            subtrees = self.arena.len(),
            diagrams = diagrams.len(),
            "subtree table complete"
        );
        Ok(diagrams)
    }

    fn combine(&mut self, subset: LegSet, blocks: &[LegSet]) {
        let Some(per_block) = self.block_choices(blocks) else {
            return;
        };
        let mut new_trees = Vec::new();
        for choice in cartesian_product(&per_block) {
            let mut ids: Vec<PdgCode> = choice.iter().map(|(id, _)| *id).collect();
            ids.sort_unstable();
            for &(out_id, inter_id) in self.model.vertices_to1(&ids) {
                if !self.rules.allows(out_id, subset) {
                    continue;
                }
                let Some(inter) = self.model.interaction(inter_id) else {
                    continue;
                };
                let base = self.rules.budget.of_interaction(inter);
                if !self.rules.budget.admits(&base) {
                    continue;
                }
                let trees: Vec<Vec<TreeId>> = choice.iter().map(|(_, t)| t.clone()).collect();
                for children in cartesian_product(&trees) {
                    let mut orders = base.clone();
                    for &c in &children {
                        add_orders(&mut orders, &self.arena[c].orders);
                    }
                    if self.rules.budget.admits(&orders) {
                        new_trees.push(SubTree {
                            id: out_id,
                            legset: subset,
                            node: TreeNode::Vertex {
                                interaction: inter_id,
                                children,
                            },
                            orders,
                        });
                    }
                }
            }
        }
        for t in new_trees {
            self.push(t);
        }
    }

    fn close(&self, root_leg: &Leg, blocks: &[LegSet], diagrams: &mut Vec<Diagram>) {
        let Some(per_block) = self.block_choices(blocks) else {
            return;
        };
        for choice in cartesian_product(&per_block) {
            let mut ids: Vec<PdgCode> = choice.iter().map(|(id, _)| *id).collect();
            ids.push(root_leg.id);
            ids.sort_unstable();
            for &inter_id in self.model.vertices_to0(&ids) {
                let Some(inter) = self.model.interaction(inter_id) else {
                    continue;
                };
                let base = self.rules.budget.of_interaction(inter);
                let trees: Vec<Vec<TreeId>> = choice.iter().map(|(_, t)| t.clone()).collect();
                for children in cartesian_product(&trees) {
                    let mut orders = base.clone();
                    for &c in &children {
                        add_orders(&mut orders, &self.arena[c].orders);
                    }
                    if !self.rules.budget.admits(&orders) {
                        continue;
                    }
                    let mut vertices = Vec::new();
                    let mut legs: Vec<Leg> = children
                        .iter()
                        .map(|&c| self.emit(c, &mut vertices))
                        .collect();
                    legs.push(root_leg.clone());
                    vertices.push(Vertex {
                        interaction: inter_id,
                        legs,
                    });
                    diagrams.push(Diagram::new(vertices, self.rules.budget.to_map(&orders)));
                }
            }
        }
    }

    /// Append the vertices of a subtree in post-order; returns its output leg
    fn emit(&self, tree: TreeId, vertices: &mut Vec<Vertex>) -> Leg {
        let t = &self.arena[tree];
        match &t.node {
            TreeNode::Leaf(leg) => leg.clone(),
            TreeNode::Vertex {
                interaction,
                children,
            } => {
                let mut legs: Vec<Leg> = children.iter().map(|&c| self.emit(c, vertices)).collect();
                let out = Leg::internal(t.id, t.legset);
                legs.push(out.clone());
                vertices.push(Vertex {
                    interaction: *interaction,
                    legs,
                });
                out
            }
        }
    }
}
