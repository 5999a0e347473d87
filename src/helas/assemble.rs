use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use tracing::{debug, info};

use super::fermion::fermion_factor;
use super::{Amplitude, HelasAmplitude, HelasWavefunction};
use crate::color::{simplify, ColorBasis, ColorString};
use crate::diagram::{Diagram, Leg};
use crate::error::{CoreError, CoreResult};
use crate::generate::partition::cartesian_product;
use crate::id::{InteractionId, LegSet, PdgCode};
use crate::model::{Interaction, Model};
use crate::process::Process;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct WavefunctionKey {
    pdg: PdgCode,
    legset: LegSet,
    interaction: InteractionId,
    color_index: usize,
    mothers: Vec<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct AmplitudeKey {
    interaction: InteractionId,
    color_index: usize,
    mothers: Vec<usize>,
}

// ============================================================================
// COLOR LABELS
// ============================================================================

/// Color index assigned to every line of a diagram
///
/// External legs use their leg number, internal lines negative labels in
/// vertex order. The two halves of a cut loop line share one label.
#[derive(Clone, Debug)]
pub struct ColorLabels {
    labels: HashMap<LegSet, i32>,
    next: i32,
}

impl ColorLabels {
    pub fn new(diagram: &Diagram) -> Self {
        let mut labels = HashMap::new();
        let mut next = -1;
        for leg in diagram.external_legs() {
            labels.insert(leg.legset, leg.number as i32);
        }
        for leg in diagram.internal_legs() {
            labels.insert(leg.legset, next);
            next -= 1;
        }
        if let Some(info) = &diagram.loop_info {
            labels.insert(LegSet::single(info.cut_legs.0), next);
            labels.insert(LegSet::single(info.cut_legs.1), next);
            next -= 1;
        }
        ColorLabels { labels, next }
    }

    pub fn label(&self, legset: LegSet) -> Option<i32> {
        self.labels.get(&legset).copied()
    }

    /// Color string of one vertex with its slots relabelled; dummy indices
    /// get fresh labels
    fn vertex_string(
        &mut self,
        inter: &Interaction,
        color_index: usize,
        legs: &[Leg],
        slots: &[usize],
    ) -> CoreResult<ColorString> {
        let cs = inter.color.get(color_index).ok_or_else(|| {
            CoreError::amplitude(
                format!("interaction {} has no color structure {}", inter.id, color_index),
                vec![],
            )
        })?;
        let mut map: HashMap<i32, i32> = HashMap::new();
        for idx in cs.indices() {
            if map.contains_key(&idx) {
                continue;
            }
            let target = if idx > 0 {
                let leg = slots
                    .get(idx as usize - 1)
                    .map(|&l| &legs[l])
                    .ok_or_else(|| CoreError::ColorSyntax(format!("index {} out of range", idx)))?;
                self.label(leg.legset).ok_or_else(|| {
                    CoreError::amplitude(format!("line {} has no color label", leg.legset), vec![])
                })?
            } else {
                let fresh = self.next;
                self.next -= 1;
                fresh
            };
            map.insert(idx, target);
        }
        Ok(cs.map_indices(|i| map.get(&i).copied().unwrap_or(i)))
    }
}

fn interaction<'m>(model: &'m Model, id: InteractionId) -> CoreResult<&'m Interaction> {
    model
        .interaction(id)
        .ok_or_else(|| CoreError::amplitude(format!("unknown interaction {}", id), vec![]))
}

/// Color string of a diagram for one color structure per vertex
fn color_string_for(model: &Model, diagram: &Diagram, choices: &[usize]) -> CoreResult<ColorString> {
    let mut labels = ColorLabels::new(diagram);
    let n = diagram.vertices.len();
    let mut out = ColorString::one();
    for (i, v) in diagram.vertices.iter().enumerate() {
        let inter = interaction(model, v.interaction)?;
        let slots = v.match_slots(model, inter, i + 1 == n)?;
        let cs = labels.vertex_string(inter, choices[i], &v.legs, &slots)?;
        out = out.multiply(&cs);
    }
    Ok(out)
}

/// Unsimplified color strings of a diagram, one per combination of vertex
/// color structures
pub fn diagram_color_strings(
    model: &Model,
    diagram: &Diagram,
) -> CoreResult<Vec<(Vec<usize>, ColorString)>> {
    let mut ranges = Vec::with_capacity(diagram.vertices.len());
    for v in &diagram.vertices {
        let inter = interaction(model, v.interaction)?;
        ranges.push((0..inter.color.len()).collect::<Vec<usize>>());
    }
    cartesian_product(&ranges)
        .into_iter()
        .map(|choices| {
            let cs = color_string_for(model, diagram, &choices)?;
            Ok((choices, cs))
        })
        .collect()
}

// ============================================================================
// ASSEMBLY
// ============================================================================

/// Wavefunction choices for a line: (wavefunction number, (vertex, color index) picks)
type Options = Vec<(usize, Vec<(usize, usize)>)>;

struct Assembler<'m> {
    model: &'m Model,
    wavefunctions: IndexMap<WavefunctionKey, HelasWavefunction>,
    amplitudes: Vec<HelasAmplitude>,
    amplitude_keys: HashSet<AmplitudeKey>,
    basis: ColorBasis,
}

impl<'m> Assembler<'m> {
    fn external(&mut self, leg: &Leg) -> usize {
        let key = WavefunctionKey {
            pdg: leg.id,
            legset: leg.legset,
            interaction: 0,
            color_index: 0,
            mothers: Vec::new(),
        };
        let number = self.wavefunctions.len() + 1;
        self.wavefunctions
            .entry(key)
            .or_insert_with(|| HelasWavefunction {
                number,
                pdg: leg.id,
                legset: leg.legset,
                interaction: 0,
                color_index: 0,
                mothers: Vec::new(),
                lorentz: Vec::new(),
                couplings: Vec::new(),
                state: leg.state,
                onshell: leg.onshell,
            })
            .number
    }

    fn options_of(&mut self, options: &HashMap<LegSet, Options>, leg: &Leg) -> CoreResult<Options> {
        if leg.is_external() {
            return Ok(vec![(self.external(leg), Vec::new())]);
        }
        options.get(&leg.legset).cloned().ok_or_else(|| {
            CoreError::amplitude(
                format!("line {} used before it is produced", leg.legset),
                vec![],
            )
        })
    }

    fn add_diagram(&mut self, index: usize, diagram: &Diagram) -> CoreResult<()> {
        let model = self.model;
        let n = diagram.vertices.len();
        let fermion = fermion_factor(model, diagram)?;
        let mut options: HashMap<LegSet, Options> = HashMap::new();

        for (i, v) in diagram.vertices.iter().enumerate() {
            let inter = interaction(model, v.interaction)?;
            let is_root = i + 1 == n;
            let slots = v.match_slots(model, inter, is_root)?;
            let out_index = v.legs.len() - 1;
            let mut mother_options = Vec::new();
            for &l in &slots {
                if is_root || l != out_index {
                    mother_options.push(self.options_of(&options, &v.legs[l])?);
                }
            }

            let mut produced: Options = Vec::new();
            for combo in cartesian_product(&mother_options) {
                let mothers: Vec<usize> = combo.iter().map(|(w, _)| *w).collect();
                let picks: Vec<(usize, usize)> =
                    combo.iter().flat_map(|(_, p)| p.iter().copied()).collect();
                let mut sorted = mothers.clone();
                sorted.sort_unstable();
                for ci in 0..inter.color.len() {
                    let lc = inter.lorentz_couplings(ci);
                    if lc.is_empty() {
                        continue;
                    }
                    let (lorentz, couplings): (Vec<String>, Vec<String>) = lc.into_iter().unzip();
                    let mut picks = picks.clone();
                    picks.push((i, ci));
                    if is_root {
                        self.add_amplitude(
                            index, diagram, inter, ci, mothers.clone(), sorted.clone(), lorentz,
                            couplings, picks, fermion,
                        )?;
                    } else {
                        let out = &v.legs[out_index];
                        let key = WavefunctionKey {
                            pdg: out.id,
                            legset: out.legset,
                            interaction: inter.id,
                            color_index: ci,
                            mothers: sorted.clone(),
                        };
                        let number = self.wavefunctions.len() + 1;
                        let wf = self.wavefunctions.entry(key).or_insert_with(|| HelasWavefunction {
                            number,
                            pdg: out.id,
                            legset: out.legset,
                            interaction: inter.id,
                            color_index: ci,
                            mothers: mothers.clone(),
                            lorentz,
                            couplings,
                            state: out.state,
                            onshell: out.onshell,
                        });
                        produced.push((wf.number, picks));
                    }
                }
            }
            if !is_root {
                if produced.is_empty() {
                    return Err(CoreError::amplitude(
                        format!("interaction {} yields no wavefunction", inter.id),
                        vec![format!("diagram {}", index + 1)],
                    ));
                }
                options.insert(v.legs[out_index].legset, produced);
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn add_amplitude(
        &mut self,
        index: usize,
        diagram: &Diagram,
        inter: &Interaction,
        color_index: usize,
        mothers: Vec<usize>,
        sorted: Vec<usize>,
        lorentz: Vec<String>,
        couplings: Vec<String>,
        picks: Vec<(usize, usize)>,
        fermion: i32,
    ) -> CoreResult<()> {
        let key = AmplitudeKey {
            interaction: inter.id,
            color_index,
            mothers: sorted,
        };
        if !self.amplitude_keys.insert(key.clone()) {
            return Err(CoreError::amplitude(
                format!("duplicate amplitude for interaction {}", inter.id),
                vec![
                    format!("diagram {}", index + 1),
                    format!("mothers {:?}", key.mothers),
                ],
            ));
        }
        let mut choices = vec![0; diagram.vertices.len()];
        for (v, ci) in picks {
            choices[v] = ci;
        }
        let cs = color_string_for(self.model, diagram, &choices)?;
        let factor = simplify(&cs)?;
        let color = self.basis.extend_from_factor(&factor);
        self.amplitudes.push(HelasAmplitude {
            number: self.amplitudes.len() + 1,
            interaction: inter.id,
            color_index,
            mothers,
            lorentz,
            couplings,
            diagram: index,
            fermion_factor: fermion,
            symmetry_factor: diagram.symmetry_factor,
            color,
        });
        Ok(())
    }
}

impl Amplitude {
    /// Assemble the diagrams of `process` into wavefunction and amplitude calls
    pub fn assemble(model: &Model, process: &Process, diagrams: Vec<Diagram>) -> CoreResult<Amplitude> {
        let mut asm = Assembler {
            model,
            wavefunctions: IndexMap::new(),
            amplitudes: Vec::new(),
            amplitude_keys: HashSet::new(),
            basis: ColorBasis::new(),
        };
        for leg in process.legs.iter() {
            asm.external(leg);
        }
        for (i, d) in diagrams.iter().enumerate() {
            asm.add_diagram(i, d)?;
            debug!(
                diagram = i + 1,
                wavefunctions = asm.wavefunctions.len(),
                amplitudes = asm.amplitudes.len(),
                "diagram assembled"
            );
        }
        info!(
            diagrams = diagrams.len(),
            wavefunctions = asm.wavefunctions.len(),
            amplitudes = asm.amplitudes.len(),
            color_basis = asm.basis.len(),
            "amplitude assembled"
        );
        Ok(Amplitude {
            process: process.clone(),
            diagrams,
            wavefunctions: asm.wavefunctions.into_values().collect(),
            amplitudes: asm.amplitudes,
            color_basis: asm.basis,
        })
    }
}
