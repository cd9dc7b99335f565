pub mod prediction;
pub mod source;

pub use prediction::*;
pub use source::*;
