//! One-loop diagrams by cutting the loop open
//!
//! For every candidate loop particle L the tree generator runs on the
//! process augmented with two final legs L and anti-L. Gluing those two
//! legs back together closes exactly one loop: the vertex path between
//! them. Every cut of the same loop gives the same [`LoopTag`], the minimum
//! over rotations and reflections of the (interaction, attached trees,
//! loop line) sequence, so keeping one diagram per tag removes the
//! duplicates.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use super::canonical::DiagramGraph;
use super::table::{OrderBudget, TreeRules, TreeTable};
use crate::color::simplify;
use crate::diagram::{Diagram, Leg, LegState, LoopInfo, LoopTag};
use crate::error::{CoreError, CoreResult};
use crate::helas::diagram_color_strings;
use crate::id::{LegNumber, PdgCode};
use crate::model::Model;
use crate::process::{Perturbation, Process};
use crate::session::{CancelToken, SessionConfig};

/// Order bounds of the loop diagrams: the largest born orders, with two more
/// powers of every perturbed key
fn loop_bounds(
    model: &Model,
    process: &Process,
    born: &[Diagram],
    pert: &Perturbation,
) -> BTreeMap<String, u32> {
    let mut bounds = BTreeMap::new();
    for key in model.order_keys() {
        let born_max = if born.is_empty() {
            process.orders.get(&key).and_then(|c| c.upper_bound()).unwrap_or(0)
        } else {
            born.iter().map(|d| d.order(&key)).max().unwrap_or(0)
        };
        let extra = if pert.orders.contains(&key) { 2 } else { 0 };
        bounds.insert(key, born_max + extra);
    }
    bounds
}

/// Codes that may run in the loop: those touching a perturbing interaction
fn loop_particles(model: &Model, process: &Process, pert: &Perturbation) -> Vec<PdgCode> {
    let mut seen = HashSet::new();
    for inter in model.interactions().iter() {
        if inter.is_perturbating(&pert.orders) {
            seen.extend(inter.particles.iter().copied());
        }
    }
    let mut out: Vec<PdgCode> = model
        .all_pdgs()
        .into_iter()
        .filter(|p| seen.contains(p))
        .filter(|p| {
            !process
                .forbidden_particles
                .iter()
                .any(|&f| f == *p || model.anti(f) == *p)
        })
        .collect();
    out.sort_unstable();
    out
}

/// Loop structure read off a cut diagram, before tagging
struct CutLoop {
    vertices: Vec<usize>,
    lines: Vec<PdgCode>,
    attachments: Vec<Vec<String>>,
    /// Total number of lines leaving the loop
    n_attached: usize,
    /// Some line leaving the loop is an external leg
    external_attached: bool,
}

fn read_loop(model: &Model, diagram: &Diagram, cut: (LegNumber, LegNumber)) -> Option<CutLoop> {
    let graph = DiagramGraph::new(diagram);
    let ea = graph.external_edge(cut.0)?;
    let eb = graph.external_edge(cut.1)?;
    let va = graph.edges[ea].consumer;
    let vb = graph.edges[eb].consumer;
    let (vertices, path) = graph.path(va, vb)?;

    let mut lines: Vec<PdgCode> = path
        .iter()
        .zip(&vertices)
        .map(|(&e, &v)| graph.flow_from(model, e, v))
        .collect();
    // Closing line through the cut, seen from the last vertex
    lines.push(graph.flow_from(model, eb, vb));

    let mut attachments = Vec::with_capacity(vertices.len());
    let mut n_attached = 0;
    let mut external_attached = false;
    for &v in &vertices {
        let mut labels = Vec::new();
        for &e in &graph.incident[v] {
            if e == ea || e == eb || path.contains(&e) {
                continue;
            }
            n_attached += 1;
            if graph.edges[e].producer.is_none() {
                external_attached = true;
            }
            labels.push(graph.label_beyond(model, v, e).to_string());
        }
        labels.sort();
        attachments.push(labels);
    }
    Some(CutLoop {
        vertices,
        lines,
        attachments,
        n_attached,
        external_attached,
    })
}

/// Canonical tag and the number of symmetries mapping the loop onto it
fn canonical_tag(model: &Model, diagram: &Diagram, cut: &CutLoop) -> (LoopTag, u32) {
    let k = cut.vertices.len();
    let inter: Vec<_> = cut
        .vertices
        .iter()
        .map(|&v| diagram.vertices[v].interaction)
        .collect();
    let mut forms: Vec<LoopTag> = Vec::with_capacity(2 * k);
    for r in 0..k {
        forms.push(
            (0..k)
                .map(|i| {
                    let j = (i + r) % k;
                    (inter[j], cut.attachments[j].clone(), cut.lines[j])
                })
                .collect(),
        );
        // Reversed orientation: vertices in the opposite order, lines conjugated
        forms.push(
            (0..k)
                .map(|i| {
                    let j = (k + r - i) % k;
                    let line = (2 * k + r - i - 1) % k;
                    (inter[j], cut.attachments[j].clone(), model.anti(cut.lines[line]))
                })
                .collect(),
        );
    }
    let best = forms.iter().min().cloned().unwrap_or_default();
    let symmetry = forms.iter().filter(|f| **f == best).count() as u32;
    (best, symmetry.max(1))
}

/// Whether every color structure of the loop diagram reduces to zero
fn color_vanishes(model: &Model, diagram: &Diagram) -> CoreResult<bool> {
    for (_, cs) in diagram_color_strings(model, diagram)? {
        if !simplify(&cs)?.is_empty() {
            return Ok(false);
        }
    }
    Ok(true)
}

/// One-loop diagrams of `process`, sorted by (tag, orders)
pub(crate) fn generate_loop_diagrams(
    model: &Model,
    process: &Process,
    born: &[Diagram],
    config: &SessionConfig,
    cancel: &CancelToken,
) -> CoreResult<Vec<Diagram>> {
    let Some(pert) = process.perturbation.as_ref() else {
        return Ok(Vec::new());
    };
    let bounds = loop_bounds(model, process, born, pert);
    let forbidden: HashSet<PdgCode> = process
        .forbidden_particles
        .iter()
        .flat_map(|&p| [p, model.anti(p)])
        .collect();
    let rules = TreeRules {
        budget: OrderBudget::from_bounds(model, &bounds),
        forbidden,
        forbidden_s: HashSet::new(),
        initial: process.initial_legset(),
    };
    let n = process.legs.len() as LegNumber;
    let cut = (n + 1, n + 2);
    let perturbed: Vec<String> = pert.orders.clone();

    let mut by_tag: HashMap<LoopTag, Diagram> = HashMap::new();
    let mut vanished: HashSet<LoopTag> = HashSet::new();
    for l in loop_particles(model, process, pert) {
        cancel.check()?;
        let mut legs: Vec<Leg> = process.legs.to_vec();
        legs.push(Leg::external(l, cut.0, LegState::Final));
        legs.push(Leg::external(model.anti(l), cut.1, LegState::Final));
        let trees = TreeTable::new(model, &rules).build(&legs, cancel)?;
        let n_trees = trees.len();

        for mut d in trees {
            let Some(found) = read_loop(model, &d, cut) else {
                return Err(CoreError::amplitude(
                    "cut legs are not connected",
                    vec![format!("loop particle {}", model.name_of(l))],
                ));
            };
            if found.n_attached == 1 && !config.keep_tadpoles {
                continue;
            }
            if found.n_attached == 2 && found.external_attached {
                continue;
            }
            let perturbing = found.vertices.iter().any(|&v| {
                model
                    .interaction(d.vertices[v].interaction)
                    .is_some_and(|i| i.is_perturbating(&perturbed))
            });
            if !perturbing {
                continue;
            }
            let (tag, symmetry) = canonical_tag(model, &d, &found);
            if by_tag.contains_key(&tag) || vanished.contains(&tag) {
                continue;
            }
            d.symmetry_factor = symmetry;
            d.loop_info = Some(LoopInfo {
                loop_particle: l,
                cut_legs: cut,
                loop_vertices: found.vertices,
                loop_lines: found.lines,
                tag: tag.clone(),
                fermion_loop: model.is_fermion(l),
            });
            if config.remove_vanishing_color && color_vanishes(model, &d)? {
                debug!(particle = %model.name_of(l), "dropped loop with vanishing color");
                vanished.insert(tag);
                continue;
            }
            by_tag.insert(tag, d);
        }
        debug!(
            particle = %model.name_of(l),
            trees = n_trees,
            loops = by_tag.len(),
            "loop particle done"
        );
    }

    let mut loops: Vec<Diagram> = by_tag.into_values().collect();
    loops.sort_by(|a, b| {
        let ta = a.loop_info.as_ref().map(|i| &i.tag);
        let tb = b.loop_info.as_ref().map(|i| &i.tag);
        ta.cmp(&tb).then_with(|| a.orders.cmp(&b.orders))
    });
    Ok(loops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::Vertex;
    use crate::model::sm::standard_model;

    #[test]
    fn test_loop_particles_follow_perturbation() {
        let model = standard_model().unwrap();
        let process = Process::new(&model, &[-11, 11], &[2, -2]).unwrap();
        let pert = Perturbation {
            mode: crate::process::PerturbationMode::Virt,
            orders: vec!["QCD".to_string()],
        };
        let ls = loop_particles(&model, &process, &pert);
        assert!(ls.contains(&21));
        assert!(ls.contains(&2) && ls.contains(&-2));
        assert!(!ls.contains(&11));
        assert!(!ls.contains(&22));
    }

    #[test]
    fn test_single_vertex_loop_tag() {
        let model = standard_model().unwrap();
        // Any 3-point vertex with a g g pair closes a one-vertex loop
        let inter = model
            .interactions()
            .iter()
            .find(|i| i.sorted_ids() == vec![21, 21, 21])
            .unwrap()
            .id;
        let d = Diagram::new(
            vec![Vertex {
                interaction: inter,
                legs: vec![
                    Leg::external(21, 2, LegState::Final),
                    Leg::external(21, 3, LegState::Final),
                    Leg::external(21, 1, LegState::Initial),
                ],
            }],
            BTreeMap::new(),
        );
        let found = read_loop(&model, &d, (2, 3)).unwrap();
        assert_eq!(found.vertices, vec![0]);
        assert_eq!(found.n_attached, 1);
        assert!(found.external_attached);
        let (tag, symmetry) = canonical_tag(&model, &d, &found);
        assert_eq!(tag.len(), 1);
        assert_eq!(symmetry, 2);
    }
}
