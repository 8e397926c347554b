pub mod batch;
pub mod extractor;
pub mod markup;
pub mod record;
pub mod strategy;

pub use batch::extract_batch;
pub use extractor::{extract, ChangeExtractor, ExtractConfig, ExtractionReport};
pub use markup::{section_events, MarkupEvent};
pub use record::{ChangeKind, ChangeRecord, ConsolidatedRecord, HierarchicalRecord, LinearRecord};
pub use strategy::{HierarchyFilter, Strategy};
