//! SU(N) color algebra
//!
//! - [`object`]: the tensors (`T`, `f`, `d`, `Tr`, epsilons, deltas, sextets)
//! - [`string`]: products of tensors with exact coefficients
//! - [`simplify`]: the rewrite engine producing canonical sums
//! - [`basis`]: basis interning, projection and the color matrix
//!
//! The UFO text form (`T(3,2,1)*f(1,2,-1)`) is parsed by
//! [`crate::parser::parse_color_string`] and printed by `Display`.

pub mod basis;
pub mod object;
pub mod simplify;
pub mod string;

pub use basis::{to_canonical_basis, ColorBasis};
pub use object::ColorObject;
pub use simplify::{merge_terms, normalize, simplify, simplify_factor, simplify_step};
pub use string::{ColorCoefficient, ColorFactor, ColorString, ColorValue};
