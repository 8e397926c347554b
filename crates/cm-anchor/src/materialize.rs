use tracing::debug;

use cm_core::{Document, Result, RunId};

use crate::index::{ParagraphIndex, RunSpan};
use crate::locate::MatchRange;

/// Split the runs under `range` so that the returned runs cover the match
/// and nothing else.
///
/// Runs strictly inside the match are returned whole, including runs that
/// only hold collapsed whitespace; the returned text is therefore exactly
/// the raw text between the first and last matched characters.
///
/// `index` must have been built from the current state of the paragraph.
/// Each run is split at most once, so the run-local offsets it holds stay
/// valid while the loop mutates earlier runs.
pub fn materialize(doc: &mut Document, index: &ParagraphIndex, range: &MatchRange) -> Result<Vec<RunId>> {
    let mut out = Vec::new();
    if range.is_empty() {
        return Ok(out);
    }

    let overlapping: Vec<&RunSpan> = index
        .spans
        .iter()
        .filter(|span| span.norm_end > range.start && span.norm_start < range.end)
        .collect();
    let (Some(first), Some(last)) = (overlapping.first(), overlapping.last()) else {
        return Ok(out);
    };

    for run_index in first.run_index..=last.run_index {
        let Some(&run) = index.runs.get(run_index) else { continue };
        let run_len = doc.run(run).map(|r| r.text.chars().count()).unwrap_or(0);
        if run_len == 0 {
            continue;
        }
        let (offset_start, offset_end) = match overlapping.iter().find(|s| s.run_index == run_index) {
            Some(span) => match run_bounds(index, span, range, run_len) {
                Some(bounds) => bounds,
                None => continue,
            },
            None => (0, run_len - 1),
        };

        let Some(piece) = doc.split_run(index.paragraph, run, offset_start, offset_end + 1)? else {
            continue;
        };
        let has_text = doc.run(piece).map(|r| !r.text.is_empty()).unwrap_or(false);
        if has_text {
            debug!(run = %run, piece = %piece, offset_start, offset_end, "run materialized");
            out.push(piece);
        }
    }
    Ok(out)
}

/// Inclusive run-local bounds of the part of `span` under `range`.
fn run_bounds(index: &ParagraphIndex, span: &RunSpan, range: &MatchRange, run_len: usize) -> Option<(usize, usize)> {
    let seg_start = range.start.max(span.norm_start);
    let seg_end = range.end.min(span.norm_end);
    if seg_start >= seg_end {
        return None;
    }

    let raw_first = *index.norm_to_raw.get(seg_start)?;
    let raw_last = *index.norm_to_raw.get(seg_end - 1)?;
    let &(run_first, mut offset_start) = index.raw_to_run.get(raw_first)?;
    let &(run_last, mut offset_end) = index.raw_to_run.get(raw_last)?;

    if run_first != span.run_index {
        offset_start = span.raw_start;
    }
    if run_last != span.run_index {
        offset_end = span.raw_end - 1;
    }
    // The match continues on both sides of an interior run.
    if seg_start > range.start {
        offset_start = 0;
    }
    if seg_end < range.end {
        offset_end = run_len - 1;
    }
    Some((offset_start, offset_end))
}

/// Concatenated text of `runs`.
pub fn runs_text(doc: &Document, runs: &[RunId]) -> String {
    runs.iter()
        .filter_map(|id| doc.run(*id))
        .map(|run| run.text.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locate::{locate, LocatorConfig};
    use cm_core::{DocumentBuilder, ParagraphId, RevisionMeta};

    fn anchor(doc: &mut Document, query: &str) -> Vec<RunId> {
        let index = ParagraphIndex::build(doc, ParagraphId(0));
        let range = locate(&index, query, &LocatorConfig::default()).unwrap();
        materialize(doc, &index, &range).unwrap()
    }

    #[test]
    fn match_inside_one_run_splits_it_in_three() {
        let mut doc = DocumentBuilder::new("t.docx")
            .paragraph(|p| p.bold("Em caso de atraso, multa de 20% ao mês."))
            .build();
        let before = doc.paragraph_text(ParagraphId(0));
        let runs = anchor(&mut doc, "multa de 20%");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs_text(&doc, &runs), "multa de 20%");
        assert_eq!(doc.paragraph_runs(ParagraphId(0)).len(), 3);
        assert_eq!(doc.paragraph_text(ParagraphId(0)), before);
        assert!(doc.run(runs[0]).unwrap().formatting.bold);
    }

    #[test]
    fn match_across_runs_keeps_underlying_spacing() {
        let mut doc = DocumentBuilder::new("t.docx")
            .paragraph(|p| p.text("a multa ").text(" de 2").text("0% incide"))
            .build();
        let index = ParagraphIndex::build(&doc, ParagraphId(0));
        let range = locate(&index, "multa de 20%", &LocatorConfig::default()).unwrap();
        let expected = index.raw_slice(range.start, range.end);
        let runs = materialize(&mut doc, &index, &range).unwrap();
        assert_eq!(runs.len(), 3);
        assert_eq!(runs_text(&doc, &runs), expected);
        assert_eq!(expected, "multa  de 20%");
    }

    #[test]
    fn deleted_text_is_anchorable() {
        let mut doc = DocumentBuilder::new("t.docx")
            .paragraph(|p| {
                p.text("prazo de ")
                    .deleted("30 dias", RevisionMeta::new("Ana", None))
                    .inserted("60 dias", RevisionMeta::new("Ana", None))
            })
            .build();
        let runs = anchor(&mut doc, "30 dias");
        assert_eq!(runs, vec![RunId(1)]);
        assert_eq!(doc.runs.len(), 3, "whole-run match needs no split");
    }

    #[test]
    fn empty_range_materializes_nothing() {
        let mut doc = DocumentBuilder::new("t.docx").paragraph(|p| p.text("abc")).build();
        let index = ParagraphIndex::build(&doc, ParagraphId(0));
        let range = MatchRange { start: 1, end: 1, exact: true };
        assert!(materialize(&mut doc, &index, &range).unwrap().is_empty());
    }
}
