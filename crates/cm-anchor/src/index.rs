//! Per-paragraph offset index.
//!
//! Three coordinate systems meet here:
//!
//! - **normalized**: char offsets into the normalized paragraph text, where
//!   snippets are searched;
//! - **raw**: char offsets into the concatenated canonical text of the
//!   paragraph's non-empty runs;
//! - **run-local**: `(run position, char offset inside that run)`.
//!
//! `norm_to_raw` and `raw_to_run` chain the first to the last.

use serde::{Deserialize, Serialize};

use cm_core::{normalize, Document, ParagraphId, RunId};

/// Normalized coverage of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSpan {
    pub run: RunId,
    /// Position of the run in [`ParagraphIndex::runs`].
    pub run_index: usize,
    /// Half-open normalized range the run contributes to.
    pub norm_start: usize,
    pub norm_end: usize,
    /// Half-open run-local range of the characters behind that range.
    pub raw_start: usize,
    pub raw_end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParagraphIndex {
    pub paragraph: ParagraphId,
    pub normalized_text: String,
    /// Concatenated canonical text of [`ParagraphIndex::runs`].
    pub raw_text: String,
    pub spans: Vec<RunSpan>,
    pub norm_to_raw: Vec<usize>,
    /// `(run position, run-local offset)` for every raw char.
    pub raw_to_run: Vec<(usize, usize)>,
    /// Runs with non-empty canonical text, in paragraph order.
    pub runs: Vec<RunId>,
}

impl ParagraphIndex {
    /// Index paragraph `id` of `doc`. A missing paragraph, or one without
    /// canonical text, yields an empty index.
    pub fn build(doc: &Document, id: ParagraphId) -> Self {
        let mut runs = Vec::new();
        let mut raw_text = String::new();
        let mut raw_to_run = Vec::new();

        for run_id in doc.paragraph_runs(id) {
            let Some(run) = doc.run(run_id) else { continue };
            let text = run.canonical_text();
            if text.is_empty() {
                continue;
            }
            let run_index = runs.len();
            runs.push(run_id);
            for (offset, ch) in text.chars().enumerate() {
                raw_text.push(ch);
                raw_to_run.push((run_index, offset));
            }
        }

        let normalized = normalize(&raw_text);
        let spans = build_spans(&runs, &normalized.offsets, &raw_to_run);

        Self {
            paragraph: id,
            normalized_text: normalized.text,
            raw_text,
            spans,
            norm_to_raw: normalized.offsets,
            raw_to_run,
            runs,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.norm_to_raw.is_empty()
    }

    /// Normalized length in chars.
    pub fn len(&self) -> usize {
        self.norm_to_raw.len()
    }

    /// Raw text behind the normalized range `[start, end)`, from the first
    /// mapped raw char through the last one.
    pub fn raw_slice(&self, start: usize, end: usize) -> String {
        if start >= end || end > self.norm_to_raw.len() {
            return String::new();
        }
        let raw_start = self.norm_to_raw[start];
        let raw_end = self.norm_to_raw[end - 1] + 1;
        self.raw_text
            .chars()
            .skip(raw_start)
            .take(raw_end - raw_start)
            .collect()
    }
}

/// For each run, the normalized chars whose raw source lies inside it. Runs
/// with no surviving char get no span.
fn build_spans(runs: &[RunId], norm_to_raw: &[usize], raw_to_run: &[(usize, usize)]) -> Vec<RunSpan> {
    // (first norm, last norm, first local, last local) per run position
    let mut bounds: Vec<Option<(usize, usize, usize, usize)>> = vec![None; runs.len()];
    for (norm_idx, &raw_idx) in norm_to_raw.iter().enumerate() {
        let Some(&(run_index, offset)) = raw_to_run.get(raw_idx) else { continue };
        let entry = bounds[run_index].get_or_insert((norm_idx, norm_idx, offset, offset));
        entry.1 = norm_idx;
        entry.3 = offset;
    }

    bounds
        .into_iter()
        .enumerate()
        .filter_map(|(run_index, b)| {
            b.map(|(first_norm, last_norm, first_local, last_local)| RunSpan {
                run: runs[run_index],
                run_index,
                norm_start: first_norm,
                norm_end: last_norm + 1,
                raw_start: first_local,
                raw_end: last_local + 1,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cm_core::{DocumentBuilder, RevisionMeta};

    #[test]
    fn spans_follow_run_order() {
        let doc = DocumentBuilder::new("t.docx")
            .paragraph(|p| p.text("multa ").bold(" de").text("  20%"))
            .build();
        let index = ParagraphIndex::build(&doc, ParagraphId(0));
        assert_eq!(index.normalized_text, "multa de 20%");
        assert_eq!(index.runs, vec![RunId(0), RunId(1), RunId(2)]);
        let ranges: Vec<(usize, usize)> = index.spans.iter().map(|s| (s.norm_start, s.norm_end)).collect();
        assert_eq!(ranges, vec![(0, 6), (6, 8), (8, 12)]);
        // "  20%": the collapsed space maps to the run's first space
        assert_eq!(index.spans[2].raw_start, 0);
        assert_eq!(index.spans[2].raw_end, 5);
    }

    #[test]
    fn inserted_runs_are_not_indexed() {
        let ana = RevisionMeta::new("Ana", None);
        let doc = DocumentBuilder::new("t.docx")
            .paragraph(|p| p.text("prazo de ").inserted("60", ana.clone()).deleted("30", ana).text(" dias"))
            .build();
        let index = ParagraphIndex::build(&doc, ParagraphId(0));
        assert_eq!(index.normalized_text, "prazo de 30 dias");
        assert_eq!(index.runs, vec![RunId(0), RunId(2), RunId(3)]);
        assert_eq!(index.spans[1].run, RunId(2));
        assert_eq!(index.spans[1].run_index, 1);
    }

    #[test]
    fn whitespace_only_run_may_have_no_span() {
        let doc = DocumentBuilder::new("t.docx")
            .paragraph(|p| p.text("fim").text("   "))
            .build();
        let index = ParagraphIndex::build(&doc, ParagraphId(0));
        assert_eq!(index.runs.len(), 2);
        assert_eq!(index.spans.len(), 1);
    }

    #[test]
    fn empty_paragraph_gives_empty_index() {
        let doc = DocumentBuilder::new("t.docx").paragraph(|p| p.text("")).build();
        let index = ParagraphIndex::build(&doc, ParagraphId(0));
        assert!(index.is_empty());
        assert!(index.spans.is_empty());
        assert!(ParagraphIndex::build(&doc, ParagraphId(7)).is_empty());
    }

    #[test]
    fn every_normalized_char_maps_inside_its_run() {
        let doc = DocumentBuilder::new("t.docx")
            .paragraph(|p| p.text("Art.\u{a0} 5").text("\u{200b} bis").text("..  fim"))
            .build();
        let index = ParagraphIndex::build(&doc, ParagraphId(0));
        for span in &index.spans {
            let run_len = doc.run(span.run).unwrap().text.chars().count();
            assert!(span.raw_start < span.raw_end);
            assert!(span.raw_end <= run_len);
        }
        for pair in index.norm_to_raw.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
    }

    #[test]
    fn raw_slice_returns_underlying_text() {
        let doc = DocumentBuilder::new("t.docx")
            .paragraph(|p| p.text("a multa  de 20% incide"))
            .build();
        let index = ParagraphIndex::build(&doc, ParagraphId(0));
        assert_eq!(index.raw_slice(2, 14), "multa  de 20%");
    }
}
