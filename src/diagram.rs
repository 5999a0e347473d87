//! Legs, vertex instances and diagrams
//!
//! Diagrams use the all-outgoing convention: initial-state legs carry the
//! code of their antiparticle. A non-root vertex lists its inputs followed
//! by its output leg; the root vertex (always the last one) lists only
//! inputs, with leg 1 last. An internal leg is identified by its [`LegSet`],
//! the set of external legs whose momenta it carries.

use std::collections::{BTreeMap, HashMap};

use crate::error::{CoreError, CoreResult};
use crate::id::{InteractionId, LegNumber, LegSet, PdgCode};
use crate::model::{Interaction, Model, PhysicsObject};

/// Where a leg sits in a diagram
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LegState {
    Initial,
    Final,
    Internal,
}

/// A line of a diagram
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Leg {
    pub id: PdgCode,
    pub number: LegNumber,
    pub state: LegState,
    /// `Some(false)`: must not go on shell; `Some(true)`: forced on shell
    pub onshell: Option<bool>,
    pub legset: LegSet,
}

impl Leg {
    /// An external leg; `id` is taken as given
    pub fn external(id: PdgCode, number: LegNumber, state: LegState) -> Self {
        Leg {
            id,
            number,
            state,
            onshell: None,
            legset: LegSet::single(number),
        }
    }

    /// Output leg of a vertex combining `legset`
    pub fn internal(id: PdgCode, legset: LegSet) -> Self {
        Leg {
            id,
            number: legset.min_leg().unwrap_or(0),
            state: LegState::Internal,
            onshell: None,
            legset,
        }
    }

    pub fn is_external(&self) -> bool {
        self.state != LegState::Internal
    }

    pub fn is_initial(&self) -> bool {
        self.state == LegState::Initial
    }
}

impl PhysicsObject for Leg {
    const KIND: &'static str = "leg";

    fn validate(&self) -> CoreResult<()> {
        if self.id == 0 {
            return Err(CoreError::invalid_attribute("id", "pdg code 0"));
        }
        if self.number == 0 {
            return Err(CoreError::invalid_attribute("number", "leg numbers start at 1"));
        }
        if self.legset.min_leg() != Some(self.number) {
            return Err(CoreError::invalid_attribute(
                "legset",
                format!("{} does not start at leg {}", self.legset, self.number),
            ));
        }
        if self.is_external() && self.legset.len() != 1 {
            return Err(CoreError::invalid_attribute(
                "legset",
                "external legs carry exactly their own momentum",
            ));
        }
        Ok(())
    }
}

/// An interaction instance inside a diagram
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Vertex {
    pub interaction: InteractionId,
    pub legs: Vec<Leg>,
}

impl Vertex {
    /// Output leg of a non-root vertex
    pub fn output(&self) -> Option<&Leg> {
        self.legs.last()
    }

    /// All legs but the output
    pub fn inputs(&self) -> &[Leg] {
        &self.legs[..self.legs.len().saturating_sub(1)]
    }

    /// Vertex-convention codes: inputs as is, output conjugated (non-root)
    /// or every leg as is (root)
    pub fn slot_ids(&self, model: &Model, is_root: bool) -> Vec<PdgCode> {
        if is_root {
            return self.legs.iter().map(|l| l.id).collect();
        }
        let mut ids: Vec<PdgCode> = self.inputs().iter().map(|l| l.id).collect();
        if let Some(out) = self.output() {
            ids.push(model.anti(out.id));
        }
        ids
    }

    /// For every slot of `inter`, the index of the leg filling it
    ///
    /// Identical particles fill slots in leg order.
    pub fn match_slots(
        &self,
        model: &Model,
        inter: &Interaction,
        is_root: bool,
    ) -> CoreResult<Vec<usize>> {
        let ids = self.slot_ids(model, is_root);
        let mut used = vec![false; ids.len()];
        let mut slots = Vec::with_capacity(inter.particles.len());
        for &p in &inter.particles {
            let leg = (0..ids.len())
                .find(|&i| !used[i] && ids[i] == p)
                .ok_or_else(|| {
                    CoreError::amplitude(
                        format!("no leg fills slot {} of interaction {}", p, inter.id),
                        vec![format!("vertex codes {:?}", ids)],
                    )
                })?;
            used[leg] = true;
            slots.push(leg);
        }
        if used.iter().any(|u| !u) {
            return Err(CoreError::amplitude(
                format!("vertex has more legs than interaction {}", inter.id),
                vec![format!("vertex codes {:?}", ids)],
            ));
        }
        Ok(slots)
    }
}

/// Loop structure attached to a one-loop diagram
///
/// The diagram itself is the tree with the loop cut open: the two extra
/// final legs `cut_legs` are the two halves of the cut loop line.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LoopInfo {
    /// Code of the cut loop line (leg `cut_legs.0`)
    pub loop_particle: PdgCode,
    pub cut_legs: (LegNumber, LegNumber),
    /// Indices into `Diagram::vertices`, in loop order
    pub loop_vertices: Vec<usize>,
    /// Codes flowing from each loop vertex to the next
    pub loop_lines: Vec<PdgCode>,
    /// Canonical tag shared by every cut of the same loop
    pub tag: LoopTag,
    pub fermion_loop: bool,
}

/// Canonical representation of a loop: per vertex, the interaction, the
/// labels of the attached trees and the code flowing to the next vertex
pub type LoopTag = Vec<(InteractionId, Vec<String>, PdgCode)>;

/// A Feynman diagram
#[derive(Clone, Debug, PartialEq)]
pub struct Diagram {
    pub vertices: Vec<Vertex>,
    pub orders: BTreeMap<String, u32>,
    pub symmetry_factor: u32,
    pub loop_info: Option<LoopInfo>,
}

impl Diagram {
    pub fn new(vertices: Vec<Vertex>, orders: BTreeMap<String, u32>) -> Self {
        Diagram {
            vertices,
            orders,
            symmetry_factor: 1,
            loop_info: None,
        }
    }

    pub fn root(&self) -> Option<&Vertex> {
        self.vertices.last()
    }

    pub fn is_loop(&self) -> bool {
        self.loop_info.is_some()
    }

    pub fn order(&self, key: &str) -> u32 {
        self.orders.get(key).copied().unwrap_or(0)
    }

    /// Σ weight(key) · order(key)
    pub fn weighted_order(&self, model: &Model) -> u32 {
        self.orders
            .iter()
            .map(|(k, v)| model.hierarchy_weight(k) * v)
            .sum()
    }

    /// Inputs of every vertex, where the root's legs all count as inputs
    fn all_inputs(&self) -> impl Iterator<Item = &Leg> {
        let n = self.vertices.len();
        self.vertices.iter().enumerate().flat_map(move |(i, v)| {
            if i + 1 == n {
                v.legs.iter()
            } else {
                v.inputs().iter()
            }
        })
    }

    /// External legs sorted by number
    pub fn external_legs(&self) -> Vec<&Leg> {
        let mut legs: Vec<&Leg> = self.all_inputs().filter(|l| l.is_external()).collect();
        legs.sort_by_key(|l| l.number);
        legs
    }

    /// Output legs of non-root vertices (propagators)
    pub fn internal_legs(&self) -> Vec<&Leg> {
        let n = self.vertices.len();
        self.vertices
            .iter()
            .take(n.saturating_sub(1))
            .filter_map(|v| v.output())
            .collect()
    }

    /// Propagators carrying only final-state momenta
    pub fn s_channel_legs(&self, initial: LegSet) -> Vec<&Leg> {
        self.internal_legs()
            .into_iter()
            .filter(|l| l.legset.is_disjoint(initial))
            .collect()
    }

    /// Check structural invariants against the model: every external leg
    /// enters exactly once, every propagator is produced once and consumed
    /// once, and every vertex matches its interaction
    pub fn check(&self, model: &Model) -> CoreResult<()> {
        let n = self.vertices.len();
        if n == 0 {
            return Err(CoreError::amplitude("diagram has no vertices", vec![]));
        }
        let mut consumed: HashMap<LegSet, usize> = HashMap::new();
        for leg in self.all_inputs() {
            *consumed.entry(leg.legset).or_insert(0) += 1;
        }
        for (legset, count) in &consumed {
            if *count != 1 {
                return Err(CoreError::amplitude(
                    format!("leg {} is used {} times", legset, count),
                    vec![],
                ));
            }
        }
        for leg in self.internal_legs() {
            if !consumed.contains_key(&leg.legset) {
                return Err(CoreError::amplitude(
                    format!("propagator {} is never consumed", leg.legset),
                    vec![],
                ));
            }
        }
        let mut covered = LegSet::EMPTY;
        for leg in self.external_legs() {
            covered.insert(leg.number);
        }
        let produced = self.internal_legs().len();
        if consumed.len() != covered.len() + produced {
            return Err(CoreError::amplitude(
                "diagram is not a connected tree over its legs",
                vec![],
            ));
        }
        for (i, v) in self.vertices.iter().enumerate() {
            let inter = model.interaction(v.interaction).ok_or_else(|| {
                CoreError::amplitude(format!("unknown interaction {}", v.interaction), vec![])
            })?;
            let mut ids = v.slot_ids(model, i + 1 == n);
            ids.sort_unstable();
            if ids != inter.sorted_ids() {
                return Err(CoreError::amplitude(
                    format!(
                        "vertex {} does not match interaction {}: {:?}",
                        i, inter.id, ids
                    ),
                    vec![],
                ));
            }
            if i + 1 < n {
                let out = v.output().map(|l| l.legset).unwrap_or_default();
                let union = v
                    .inputs()
                    .iter()
                    .fold(LegSet::EMPTY, |acc, l| acc | l.legset);
                if out != union {
                    return Err(CoreError::amplitude(
                        format!("vertex {} output {} is not the union {}", i, out, union),
                        vec![],
                    ));
                }
            }
        }
        Ok(())
    }
}
