pub mod classify;
pub mod clause;
pub mod segment;
pub mod subdivide;

pub use classify::{classify, ParagraphRole};
pub use clause::{Clause, ClauseKind};
pub use segment::{segment, segment_whole, ClauseSegmenter, SegmenterConfig};
