//! Part record types and their upstream formats

pub mod brick;
pub mod extended;

pub use brick::{Biobrick, BiobrickReader};
pub use extended::{parse_rsbpml, ExtendedBiobrick, Feature, Parameter, SubPart};
