//! Helicity-amplitude assembly
//!
//! An [`Amplitude`] turns the diagrams of one process into a flat list of
//! wavefunction calls and amplitude calls:
//!
//! - every external leg gets a wavefunction first, in leg order
//! - every internal line gets one wavefunction per color structure of the
//!   interaction producing it, keyed by (code, momentum routing,
//!   interaction, color index, sorted mothers); equal keys are interned
//!   once, so diagrams sharing a subtree share its wavefunctions
//! - every root vertex gives one amplitude per color structure and choice
//!   of mothers
//!
//! Wavefunctions are numbered from 1 in the order they are first interned,
//! and every mother precedes its children. Each amplitude carries its
//! relative fermion sign, the symmetry factor of its diagram and its
//! projection on the process color basis.

mod assemble;
pub mod fermion;

pub use assemble::{diagram_color_strings, ColorLabels};
pub use fermion::{fermion_factor, fermion_lines, permutation_sign};

use crate::color::{ColorBasis, ColorCoefficient, ColorValue};
use crate::diagram::{Diagram, LegState};
use crate::error::CoreResult;
use crate::id::{InteractionId, LegSet, PdgCode};
use crate::process::Process;

/// A propagated or external wavefunction
#[derive(Clone, Debug, PartialEq)]
pub struct HelasWavefunction {
    /// 1-based position in `Amplitude::wavefunctions`
    pub number: usize,
    pub pdg: PdgCode,
    pub legset: LegSet,
    /// 0 for external wavefunctions
    pub interaction: InteractionId,
    pub color_index: usize,
    /// Wavefunction numbers in interaction slot order
    pub mothers: Vec<usize>,
    pub lorentz: Vec<String>,
    pub couplings: Vec<String>,
    pub state: LegState,
    pub onshell: Option<bool>,
}

impl HelasWavefunction {
    pub fn is_external(&self) -> bool {
        self.interaction == 0
    }
}

/// A closing vertex call
#[derive(Clone, Debug, PartialEq)]
pub struct HelasAmplitude {
    /// 1-based position in `Amplitude::amplitudes`
    pub number: usize,
    pub interaction: InteractionId,
    pub color_index: usize,
    pub mothers: Vec<usize>,
    pub lorentz: Vec<String>,
    pub couplings: Vec<String>,
    /// Index into `Amplitude::diagrams`
    pub diagram: usize,
    pub fermion_factor: i32,
    pub symmetry_factor: u32,
    /// Coefficients on `Amplitude::color_basis`
    pub color: Vec<(usize, ColorCoefficient)>,
}

impl HelasAmplitude {
    /// Overall numerical prefactor: fermion sign over symmetry factor
    pub fn prefactor(&self) -> f64 {
        f64::from(self.fermion_factor) / f64::from(self.symmetry_factor.max(1))
    }
}

/// Assembled amplitude of one process
#[derive(Clone, Debug)]
pub struct Amplitude {
    pub process: Process,
    pub diagrams: Vec<Diagram>,
    pub wavefunctions: Vec<HelasWavefunction>,
    pub amplitudes: Vec<HelasAmplitude>,
    pub color_basis: ColorBasis,
}

impl Amplitude {
    pub fn wavefunction(&self, number: usize) -> Option<&HelasWavefunction> {
        number.checked_sub(1).and_then(|i| self.wavefunctions.get(i))
    }

    pub fn amplitudes_of_diagram(&self, diagram: usize) -> impl Iterator<Item = &HelasAmplitude> {
        self.amplitudes.iter().filter(move |a| a.diagram == diagram)
    }

    /// Every mother refers to an earlier wavefunction
    pub fn is_prefix_closed(&self) -> bool {
        let wf_ok = self
            .wavefunctions
            .iter()
            .all(|w| w.mothers.iter().all(|&m| m >= 1 && m < w.number));
        let amp_ok = self
            .amplitudes
            .iter()
            .all(|a| a.mothers.iter().all(|&m| m >= 1 && m <= self.wavefunctions.len()));
        wf_ok && amp_ok
    }

    pub fn color_matrix(&self, nc: i64) -> CoreResult<Vec<Vec<ColorValue>>> {
        self.color_basis.color_matrix(nc)
    }

    /// Number of external legs including decay products
    pub fn n_external(&self) -> usize {
        self.process.legs.len()
    }
}
