//! feyncore: Feynman diagram generation and helicity-amplitude assembly
//!
//! The engine takes a validated particle physics [`Model`] and a [`Process`]
//! and produces:
//!
//! - tree and one-loop [`Diagram`]s ([`generate`])
//! - an [`Amplitude`] of interned wavefunction and amplitude calls with
//!   color decompositions ([`helas`], [`color`])
//! - decay channels and approximate widths of unstable particles ([`decay`])
//! - production amplitudes with decays spliced in ([`decay_chain`])
//!
//! Processes can be written in the textual syntax of [`parser`]:
//!
//! ```text
//! p p > t t~ QCD<=2, t > b w+
//! ```

pub mod ast;
pub mod color;
pub mod decay;
pub mod decay_chain;
pub mod diagram;
pub mod error;
pub mod generate;
pub mod helas;
pub mod id;
pub mod lexer;
pub mod model;
pub mod multiprocess;
pub mod parser;
pub mod pretty;
pub mod process;
pub mod serialize;
pub mod session;

pub use diagram::{Diagram, Leg, LegState, LoopInfo, Vertex};
pub use error::{CoreError, CoreResult};
pub use generate::generate_diagrams;
pub use helas::Amplitude;
pub use id::{InteractionId, LegNumber, LegSet, PdgCode};
pub use model::{Interaction, Model, Particle};
pub use process::{OrderConstraint, Process};
pub use session::{CancelToken, Session, SessionConfig};
