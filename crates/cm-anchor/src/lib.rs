pub mod annotate;
pub mod index;
pub mod locate;
pub mod materialize;
pub mod refine;

pub use annotate::{
    AnchorStatus, AnnotationOutcome, AnnotationReport, AnnotationRequest, Annotator, AnnotatorConfig,
    ClauseFindings, Finding,
};
pub use index::{ParagraphIndex, RunSpan};
pub use locate::{locate, LocatorConfig, MatchRange};
pub use materialize::materialize;
