pub mod codec;
pub mod document;
pub mod error;
pub mod hash;
pub mod normalize;

pub use document::*;
pub use error::*;
pub use hash::*;
pub use normalize::{normalize, normalize_text, Normalized};
