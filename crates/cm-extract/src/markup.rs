//! Flat markup event stream over one document section.
//!
//! The extractor never looks at the run tree directly. It consumes the
//! sequence produced here, in which every maximal group of adjacent runs
//! sharing one tracked revision is bracketed by [`MarkupEvent::RevisionStart`]
//! and [`MarkupEvent::RevisionEnd`], the way `w:ins` / `w:del` wrap runs in
//! the source markup.

use serde::Serialize;

use cm_core::{Document, Inline, ParagraphId, Revision, RunKind, SectionKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "value", rename_all = "snake_case")]
pub enum MarkupEvent<'a> {
    ParagraphStart(ParagraphId),
    ParagraphEnd(ParagraphId),
    /// Opens a tracked revision wrapper. Never carries [`Revision::Normal`].
    RevisionStart(&'a Revision),
    RevisionEnd,
    Text(&'a str),
    DeletedText(&'a str),
    CommentRangeStart(&'a str),
    CommentRangeEnd(&'a str),
    Break,
    Tab,
}

/// Events of every paragraph of `kind`, in reading order.
///
/// Field-instruction runs produce no events. A revision group is closed
/// before any non-run item and at the end of each paragraph.
pub fn section_events(doc: &Document, kind: SectionKind) -> Vec<MarkupEvent<'_>> {
    let mut events = Vec::new();
    for pid in doc.paragraph_ids(kind) {
        let Some(paragraph) = doc.paragraph(pid) else { continue };
        events.push(MarkupEvent::ParagraphStart(pid));

        let mut open: Option<&Revision> = None;
        for item in &paragraph.content {
            match item {
                Inline::Run(run_id) => {
                    let Some(run) = doc.run(*run_id) else { continue };
                    if run.kind == RunKind::FieldInstruction {
                        continue;
                    }
                    let revision = &run.revision;
                    if open != Some(revision) {
                        if open.take().is_some() {
                            events.push(MarkupEvent::RevisionEnd);
                        }
                        if *revision != Revision::Normal {
                            events.push(MarkupEvent::RevisionStart(revision));
                            open = Some(revision);
                        }
                    }
                    events.push(match revision {
                        Revision::Deleted(_) => MarkupEvent::DeletedText(&run.text),
                        _ => MarkupEvent::Text(&run.text),
                    });
                }
                marker => {
                    if open.take().is_some() {
                        events.push(MarkupEvent::RevisionEnd);
                    }
                    events.push(match marker {
                        Inline::CommentStart(id) => MarkupEvent::CommentRangeStart(id),
                        Inline::CommentEnd(id) => MarkupEvent::CommentRangeEnd(id),
                        Inline::Break => MarkupEvent::Break,
                        _ => MarkupEvent::Tab,
                    });
                }
            }
        }
        if open.is_some() {
            events.push(MarkupEvent::RevisionEnd);
        }
        events.push(MarkupEvent::ParagraphEnd(pid));
    }
    events
}

/// `true` when some run of the paragraph has non-blank text. Deleted text
/// and field instructions both count, although neither is visible.
pub fn paragraph_has_text(doc: &Document, id: ParagraphId) -> bool {
    doc.paragraph_runs(id)
        .into_iter()
        .filter_map(|run_id| doc.run(run_id))
        .any(|run| !run.text.trim().is_empty())
}
