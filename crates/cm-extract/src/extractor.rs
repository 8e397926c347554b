//! Track-change and comment extraction.
//!
//! [`ChangeExtractor`] walks the markup events of the header, body and footer
//! (in that order) through a single state machine. The configured
//! [`Strategy`] only decides what a buffer flush and a paragraph commit emit;
//! the revision stack, the open comment stack and the original-text cursor
//! are shared by all of them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use cm_core::{CmError, Comment, Document, ParagraphId, Result, Revision, SectionKind};

use crate::markup::{paragraph_has_text, section_events, MarkupEvent};
use crate::record::{ChangeKind, ChangeRecord, ConsolidatedRecord, HierarchicalRecord, LinearRecord};
use crate::strategy::{HierarchyFilter, Strategy};

// ---------------------------------------------------------------------------
// Configuration / report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// File name written into every record. Defaults to the document name.
    pub file_name: Option<String>,
    pub strategy: Strategy,
}

/// Records extracted from one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub run_id: Uuid,
    pub document_id: Uuid,
    pub file: String,
    pub strategy: Strategy,
    pub columns: Vec<String>,
    pub records: Vec<ChangeRecord>,
}

impl ExtractionReport {
    /// Record cells, one row per record, in `columns` order.
    pub fn rows(&self) -> Vec<Vec<String>> {
        self.records.iter().map(ChangeRecord::cells).collect()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct ChangeExtractor {
    config: ExtractConfig,
}

impl ChangeExtractor {
    pub fn new(config: ExtractConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Extract the records of `doc`. Fails only on a document without
    /// paragraphs.
    pub fn extract(&self, doc: &Document) -> Result<ExtractionReport> {
        if doc.is_empty() {
            return Err(CmError::EmptyDocument);
        }
        let file = self.config.file_name.clone().unwrap_or_else(|| doc.name.clone());
        let strategy = self.config.strategy;

        let mut state = ExtractionState::new(doc, &file, strategy);
        for section in SectionKind::ORDERED {
            state.section = section;
            for event in section_events(doc, section) {
                state.handle(event);
            }
            state.flush();
        }
        let records = state.records;

        info!(
            document = %doc.name,
            strategy = %strategy,
            records = records.len(),
            "changes extracted"
        );
        Ok(ExtractionReport {
            run_id: Uuid::new_v4(),
            document_id: doc.id,
            file,
            strategy,
            columns: strategy.columns().iter().map(|c| c.to_string()).collect(),
            records,
        })
    }
}

/// Extract `doc` with `config`.
pub fn extract(doc: &Document, config: &ExtractConfig) -> Result<ExtractionReport> {
    ChangeExtractor::new(config.clone()).extract(doc)
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Per-paragraph accumulators of the consolidated and hierarchical shapes.
#[derive(Debug, Default)]
struct ParagraphBuffer {
    /// Pre-edit text: normal and deleted text.
    original: String,
    /// Post-edit text: normal and inserted text.
    final_text: String,
    interventions: Vec<String>,
    changes: Vec<HierarchicalRecord>,
    /// Char offset in `original`.
    cursor: usize,
}

struct ExtractionState<'a> {
    doc: &'a Document,
    file: &'a str,
    strategy: Strategy,
    section: SectionKind,
    paragraph_index: usize,
    /// Open revision wrappers, innermost last.
    revisions: Vec<&'a Revision>,
    buffer: String,
    /// Revision the buffered text was written under.
    buffer_revision: Revision,
    open_comments: Vec<&'a str>,
    /// Whether any text was flushed while the comment range was open.
    captured: HashMap<&'a str, bool>,
    paragraph: ParagraphBuffer,
    records: Vec<ChangeRecord>,
}

impl<'a> ExtractionState<'a> {
    fn new(doc: &'a Document, file: &'a str, strategy: Strategy) -> Self {
        Self {
            doc,
            file,
            strategy,
            section: SectionKind::Body,
            paragraph_index: 0,
            revisions: Vec::new(),
            buffer: String::new(),
            buffer_revision: Revision::Normal,
            open_comments: Vec::new(),
            captured: HashMap::new(),
            paragraph: ParagraphBuffer::default(),
            records: Vec::new(),
        }
    }

    fn handle(&mut self, event: MarkupEvent<'a>) {
        match event {
            MarkupEvent::ParagraphStart(id) => self.paragraph_start(id),
            MarkupEvent::ParagraphEnd(id) => self.paragraph_end(id),
            MarkupEvent::RevisionStart(revision) => self.revisions.push(revision),
            MarkupEvent::RevisionEnd => {
                self.revisions.pop();
            }
            MarkupEvent::Text(text) | MarkupEvent::DeletedText(text) => self.text(text),
            MarkupEvent::CommentRangeStart(id) => self.comment_start(id),
            MarkupEvent::CommentRangeEnd(id) => self.comment_end(id),
            MarkupEvent::Break | MarkupEvent::Tab => {
                self.flush();
                self.buffer_revision = Revision::Normal;
            }
        }
    }

    fn current_revision(&self) -> Revision {
        self.revisions.last().map(|r| (*r).clone()).unwrap_or_default()
    }

    fn paragraph_start(&mut self, id: ParagraphId) {
        self.flush();
        self.buffer_revision = Revision::Normal;
        self.revisions.clear();
        self.paragraph = ParagraphBuffer::default();
        if self.strategy == Strategy::Linear && paragraph_has_text(self.doc, id) {
            self.paragraph_index += 1;
        }
    }

    fn paragraph_end(&mut self, id: ParagraphId) {
        self.flush();
        self.buffer_revision = Revision::Normal;
        match self.strategy {
            Strategy::Linear => {}
            Strategy::Consolidated => self.commit_consolidated(id),
            Strategy::Hierarchical(filter) => self.commit_hierarchical(id, filter),
        }
    }

    fn text(&mut self, text: &str) {
        let revision = self.current_revision();
        if revision != self.buffer_revision {
            self.flush();
            self.buffer_revision = revision.clone();
        }
        self.buffer.push_str(text);

        if text.is_empty() {
            return;
        }
        match self.strategy {
            Strategy::Linear => {}
            Strategy::Consolidated => self.consolidate_text(&revision, text),
            Strategy::Hierarchical(_) => self.position_text(&revision, text),
        }
    }

    fn comment_start(&mut self, id: &'a str) {
        self.flush();
        if !self.open_comments.contains(&id) {
            self.open_comments.push(id);
            self.captured.insert(id, false);
        }

        let doc = self.doc;
        let Some(comment) = doc.comment(id) else {
            warn!(comment = id, section = %self.section, "comment range references unknown comment");
            return;
        };
        match self.strategy {
            Strategy::Linear => {}
            Strategy::Consolidated => {
                let date = comment.date.as_deref().unwrap_or("");
                self.intervention("COMENTOU", &comment.author, date, &comment.text);
            }
            Strategy::Hierarchical(_) => {
                let at = self.paragraph.cursor;
                let record = self.hierarchical_row(
                    String::new(),
                    ChangeKind::Comment,
                    Some((at, at)),
                    comment.text.clone(),
                    comment.author.clone(),
                    comment.date.clone().unwrap_or_default(),
                );
                self.paragraph.changes.push(record);
            }
        }
    }

    fn comment_end(&mut self, id: &'a str) {
        self.flush();
        if let Some(captured) = self.captured.remove(id) {
            if !captured && self.strategy == Strategy::Linear {
                let doc = self.doc;
                if let Some(comment) = doc.comment(id) {
                    self.empty_comment_record(comment);
                }
            }
        }
        self.open_comments.retain(|open| *open != id);
    }

    // -- linear --------------------------------------------------------------

    /// Emit the buffered text as one linear record and mark every open
    /// comment as captured.
    fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.buffer);
        let doc = self.doc;

        let mut comments = Vec::new();
        let mut comment_author = None;
        for id in &self.open_comments {
            if let Some(comment) = doc.comment(id) {
                comments.push(comment.text.as_str());
                if comment_author.is_none() && !comment.author.is_empty() {
                    comment_author = Some(comment);
                }
            }
            self.captured.insert(*id, true);
        }
        if self.strategy != Strategy::Linear {
            return;
        }

        let has_comments = !self.open_comments.is_empty();
        let (original, final_text, kind, meta) = match &self.buffer_revision {
            Revision::Inserted(meta) => ("", text.as_str(), ChangeKind::Insertion, Some(meta)),
            Revision::Deleted(meta) => (text.as_str(), "", ChangeKind::Deletion, Some(meta)),
            Revision::Normal => {
                let kind = if has_comments { ChangeKind::Comment } else { ChangeKind::Text };
                (text.as_str(), "", kind, None)
            }
        };
        let mut author = meta.and_then(|m| m.author.clone()).unwrap_or_default();
        let mut timestamp = meta.and_then(|m| m.date.clone()).unwrap_or_default();
        if author.is_empty() {
            if let Some(comment) = comment_author {
                author = comment.author.clone();
                timestamp = comment.date.clone().unwrap_or_default();
            }
        }

        self.records.push(ChangeRecord::Linear(LinearRecord {
            file: self.file.to_string(),
            paragraph_index: self.paragraph_index,
            section: self.section,
            original_text: sanitize(original),
            final_text: sanitize(final_text),
            commented_text: if has_comments { sanitize(&text) } else { String::new() },
            comment: sanitize(&comments.join(" | ")),
            kind,
            author,
            timestamp,
        }));
    }

    /// Record for a comment whose range closed without covering any text.
    fn empty_comment_record(&mut self, comment: &Comment) {
        self.records.push(ChangeRecord::Linear(LinearRecord {
            file: self.file.to_string(),
            paragraph_index: self.paragraph_index,
            section: self.section,
            original_text: String::new(),
            final_text: String::new(),
            commented_text: String::new(),
            comment: sanitize(&comment.text),
            kind: ChangeKind::Comment,
            author: comment.author.clone(),
            timestamp: comment.date.clone().unwrap_or_default(),
        }));
    }

    // -- consolidated --------------------------------------------------------

    fn consolidate_text(&mut self, revision: &Revision, text: &str) {
        match revision {
            Revision::Deleted(meta) => {
                self.paragraph.original.push_str(text);
                self.intervention("DELETOU", meta_author(meta), meta_date(meta), text);
            }
            Revision::Inserted(meta) => {
                self.paragraph.final_text.push_str(text);
                self.intervention("INSERIU", meta_author(meta), meta_date(meta), text);
            }
            Revision::Normal => {
                self.paragraph.original.push_str(text);
                self.paragraph.final_text.push_str(text);
            }
        }
    }

    /// Append `[author [date]] VERB: 'text'` to the paragraph log.
    fn intervention(&mut self, verb: &str, author: &str, date: &str, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        let stamp = match (author.is_empty(), date.is_empty()) {
            (true, _) => "[Desconhecido]".to_string(),
            (false, true) => format!("[{author}]"),
            (false, false) => format!("[{author} [{date}]]"),
        };
        self.paragraph
            .interventions
            .push(format!("{stamp} {verb}: '{}'", sanitize(text)));
    }

    fn commit_consolidated(&mut self, id: ParagraphId) {
        let buffer = std::mem::take(&mut self.paragraph);
        let original = buffer.original.trim();
        let final_text = buffer.final_text.trim();
        if original.is_empty() && final_text.is_empty() && buffer.interventions.is_empty() {
            return;
        }
        self.paragraph_index += 1;
        debug!(paragraph = %id, index = self.paragraph_index, interventions = buffer.interventions.len(), "paragraph consolidated");
        self.records.push(ChangeRecord::Consolidated(ConsolidatedRecord {
            file: self.file.to_string(),
            paragraph_index: self.paragraph_index,
            section: self.section,
            original_text: original.to_string(),
            final_text: final_text.to_string(),
            intervention_log: buffer.interventions.join("\n"),
        }));
    }

    // -- hierarchical --------------------------------------------------------

    /// Inserted text is recorded at the cursor without moving it; normal and
    /// deleted text extend the original text and advance it.
    fn position_text(&mut self, revision: &Revision, text: &str) {
        let start = self.paragraph.cursor;
        let (kind, meta) = match revision {
            Revision::Inserted(meta) => {
                let record = self.hierarchical_row(
                    text.to_string(),
                    ChangeKind::Insertion,
                    Some((start, start)),
                    String::new(),
                    meta_author(meta).to_string(),
                    meta_date(meta).to_string(),
                );
                self.paragraph.changes.push(record);
                return;
            }
            Revision::Deleted(meta) => (Some(ChangeKind::Deletion), Some(meta)),
            Revision::Normal => (None, None),
        };

        let end = start + text.chars().count();
        self.paragraph.original.push_str(text);
        self.paragraph.cursor = end;
        if let (Some(kind), Some(meta)) = (kind, meta) {
            let record = self.hierarchical_row(
                text.to_string(),
                kind,
                Some((start, end)),
                String::new(),
                meta_author(meta).to_string(),
                meta_date(meta).to_string(),
            );
            self.paragraph.changes.push(record);
        }
    }

    fn hierarchical_row(
        &self,
        text: String,
        kind: ChangeKind,
        position: Option<(usize, usize)>,
        comment: String,
        author: String,
        timestamp: String,
    ) -> HierarchicalRecord {
        HierarchicalRecord {
            file: self.file.to_string(),
            paragraph_index: self.paragraph_index,
            section: self.section,
            text,
            kind,
            position,
            comment,
            author,
            timestamp,
        }
    }

    /// The counter advances for every paragraph with original text or an
    /// intervention, whether or not `filter` keeps the group.
    fn commit_hierarchical(&mut self, id: ParagraphId, filter: HierarchyFilter) {
        let buffer = std::mem::take(&mut self.paragraph);
        let original = buffer.original.trim();
        if original.is_empty() && buffer.changes.is_empty() {
            return;
        }
        self.paragraph_index += 1;
        if !filter.admits(&buffer.changes) {
            debug!(paragraph = %id, index = self.paragraph_index, "paragraph filtered out");
            return;
        }

        let index = self.paragraph_index;
        let parent = self.hierarchical_row(
            original.to_string(),
            ChangeKind::Paragraph,
            None,
            String::new(),
            String::new(),
            String::new(),
        );
        self.records.push(ChangeRecord::Hierarchical(parent));
        for mut change in buffer.changes {
            change.paragraph_index = index;
            self.records.push(ChangeRecord::Hierarchical(change));
        }
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn meta_author(meta: &cm_core::RevisionMeta) -> &str {
    meta.author.as_deref().unwrap_or("")
}

fn meta_date(meta: &cm_core::RevisionMeta) -> &str {
    meta.date.as_deref().unwrap_or("")
}

/// Line breaks become spaces and double quotes single quotes; trimmed.
fn sanitize(value: &str) -> String {
    value
        .replace(['\n', '\r'], " ")
        .replace('"', "'")
        .trim()
        .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use cm_core::{DocumentBuilder, RevisionMeta};

    fn ana() -> RevisionMeta {
        RevisionMeta::new("Ana", Some("2024-05-02T09:00:00Z"))
    }

    fn comment(id: &str, text: &str) -> Comment {
        Comment {
            id: id.into(),
            author: "Bruno".into(),
            initials: None,
            date: Some("2024-05-03T10:00:00Z".into()),
            text: text.into(),
        }
    }

    fn run(doc: &Document, strategy: Strategy) -> Vec<ChangeRecord> {
        let config = ExtractConfig { file_name: None, strategy };
        extract(doc, &config).unwrap().records
    }

    fn linear(doc: &Document) -> Vec<LinearRecord> {
        run(doc, Strategy::Linear)
            .into_iter()
            .map(|r| match r {
                ChangeRecord::Linear(r) => r,
                other => panic!("unexpected record {other:?}"),
            })
            .collect()
    }

    fn hierarchical(doc: &Document, filter: HierarchyFilter) -> Vec<HierarchicalRecord> {
        run(doc, Strategy::Hierarchical(filter))
            .into_iter()
            .map(|r| match r {
                ChangeRecord::Hierarchical(r) => r,
                other => panic!("unexpected record {other:?}"),
            })
            .collect()
    }

    fn rent() -> Document {
        DocumentBuilder::new("locacao.docx")
            .paragraph(|p| {
                p.text("O aluguel é de ")
                    .deleted("R$ 1.000,00", ana())
                    .inserted("R$ 1.200,00", ana())
                    .text(".")
            })
            .build()
    }

    #[test]
    fn linear_flushes_on_revision_change() {
        let records = linear(&rent());
        let kinds: Vec<ChangeKind> = records.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![ChangeKind::Text, ChangeKind::Deletion, ChangeKind::Insertion, ChangeKind::Text]
        );
        assert_eq!(records[0].original_text, "O aluguel é de");
        assert_eq!(records[1].original_text, "R$ 1.000,00");
        assert_eq!(records[1].author, "Ana");
        assert_eq!(records[1].timestamp, "2024-05-02T09:00:00Z");
        assert_eq!(records[2].final_text, "R$ 1.200,00");
        assert_eq!(records[2].original_text, "");
        assert!(records.iter().all(|r| r.paragraph_index == 1 && r.file == "locacao.docx"));
    }

    #[test]
    fn empty_range_comment_yields_one_comment_record() {
        let doc = DocumentBuilder::new("t.docx")
            .paragraph(|p| p.text("abc").comment_start("7").comment_end("7").text("def"))
            .comment(comment("7", "Verificar"))
            .build();
        let records = linear(&doc);
        let comments: Vec<&LinearRecord> = records.iter().filter(|r| r.kind == ChangeKind::Comment).collect();
        assert_eq!(comments.len(), 1);
        let only = comments[0];
        assert_eq!(only.original_text, "");
        assert_eq!(only.final_text, "");
        assert_eq!(only.commented_text, "");
        assert_eq!(only.comment, "Verificar");
        assert_eq!(only.author, "Bruno");
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn commented_text_takes_comment_author_unless_revised() {
        let doc = DocumentBuilder::new("t.docx")
            .paragraph(|p| {
                p.comment_start("1")
                    .text("multa de 20%")
                    .inserted(" ao mês", ana())
                    .comment_end("1")
            })
            .comment(comment("1", "Multa alta"))
            .build();
        let records = linear(&doc);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind, ChangeKind::Comment);
        assert_eq!(records[0].commented_text, "multa de 20%");
        assert_eq!(records[0].comment, "Multa alta");
        assert_eq!(records[0].author, "Bruno");
        assert_eq!(records[1].kind, ChangeKind::Insertion);
        assert_eq!(records[1].comment, "Multa alta");
        assert_eq!(records[1].author, "Ana");
    }

    #[test]
    fn overlapping_comments_are_joined() {
        let doc = DocumentBuilder::new("t.docx")
            .paragraph(|p| p.comment_start("1").comment_start("2").text("prazo").comment_end("2").comment_end("1"))
            .comment(comment("1", "um"))
            .comment(comment("2", "dois"))
            .build();
        let records = linear(&doc);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].comment, "um | dois");
    }

    #[test]
    fn breaks_split_and_text_is_sanitized() {
        let doc = DocumentBuilder::new("t.docx")
            .paragraph(|p| p.text("Diz \"sim\"").line_break().text(" depois "))
            .build();
        let records = linear(&doc);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].original_text, "Diz 'sim'");
        assert_eq!(records[1].original_text, "depois");
    }

    #[test]
    fn linear_counter_skips_blank_paragraphs_and_spans_sections() {
        let doc = DocumentBuilder::new("t.docx")
            .header_paragraph(|p| p.text("Cabeçalho"))
            .paragraph(|p| p.text("   "))
            .paragraph(|p| p.deleted("removido", ana()))
            .footer_paragraph(|p| p.text("Rodapé").field("PAGE"))
            .build();
        let records = linear(&doc);
        let summary: Vec<(usize, SectionKind)> = records
            .iter()
            .filter(|r| !r.original_text.is_empty())
            .map(|r| (r.paragraph_index, r.section))
            .collect();
        assert_eq!(
            summary,
            vec![(1, SectionKind::Header), (2, SectionKind::Body), (3, SectionKind::Footer)]
        );
        assert!(!records.iter().any(|r| r.original_text.contains("PAGE")));
    }

    #[test]
    fn field_only_paragraph_advances_linear_counter() {
        let doc = DocumentBuilder::new("t.docx")
            .paragraph(|p| p.field("TOC \\o \"1-3\""))
            .paragraph(|p| p.text("Objeto do contrato."))
            .build();
        let records = linear(&doc);
        let indexed: Vec<usize> = records
            .iter()
            .filter(|r| !r.original_text.is_empty())
            .map(|r| r.paragraph_index)
            .collect();
        assert_eq!(indexed, vec![2]);
    }

    #[test]
    fn consolidated_logs_interventions() {
        let doc = DocumentBuilder::new("t.docx")
            .paragraph(|p| p.text(""))
            .paragraph(|p| {
                p.comment_start("3")
                    .text("O aluguel é de ")
                    .deleted("R$ 1.000,00", ana())
                    .inserted("R$ 1.200,00", RevisionMeta::default())
                    .comment_end("3")
            })
            .comment(comment("3", "Conferir valor"))
            .build();
        let records = run(&doc, Strategy::Consolidated);
        assert_eq!(records.len(), 1);
        let ChangeRecord::Consolidated(record) = &records[0] else { panic!("consolidated record") };
        assert_eq!(record.paragraph_index, 1);
        assert_eq!(record.original_text, "O aluguel é de R$ 1.000,00");
        assert_eq!(record.final_text, "O aluguel é de R$ 1.200,00");
        let lines: Vec<&str> = record.intervention_log.lines().collect();
        assert_eq!(
            lines,
            vec![
                "[Bruno [2024-05-03T10:00:00Z]] COMENTOU: 'Conferir valor'",
                "[Ana [2024-05-02T09:00:00Z]] DELETOU: 'R$ 1.000,00'",
                "[Desconhecido] INSERIU: 'R$ 1.200,00'",
            ]
        );
    }

    #[test]
    fn hierarchical_positions_follow_original_text() {
        let doc = DocumentBuilder::new("t.docx")
            .paragraph(|p| {
                p.text("Casa ")
                    .inserted("azul ", ana())
                    .text("bonita")
                    .deleted(" velha", ana())
                    .comment_start("1")
                    .comment_end("1")
            })
            .comment(comment("1", "ok"))
            .build();
        let rows = hierarchical(&doc, HierarchyFilter::All);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].kind, ChangeKind::Paragraph);
        assert_eq!(rows[0].text, "Casa bonita velha");
        assert_eq!(rows[0].position_label(), "");
        assert_eq!((rows[1].kind, rows[1].position), (ChangeKind::Insertion, Some((5, 5))));
        assert_eq!(rows[1].text, "azul ");
        assert_eq!((rows[2].kind, rows[2].position), (ChangeKind::Deletion, Some((11, 17))));
        assert_eq!((rows[3].kind, rows[3].position), (ChangeKind::Comment, Some((17, 17))));
        assert_eq!(rows[3].comment, "ok");
        assert!(rows.iter().all(|r| r.paragraph_index == 1));
    }

    #[test]
    fn hierarchical_counter_is_identical_across_filters() {
        let doc = DocumentBuilder::new("t.docx")
            .paragraph(|p| p.text("Sem alterações."))
            .paragraph(|p| p.inserted("Parágrafo novo.", ana()))
            .paragraph(|p| p.text(" "))
            .paragraph(|p| p.comment_start("1").text("Comentado.").comment_end("1"))
            .paragraph(|p| p.text("Prazo de ").deleted("30", ana()).text(" dias."))
            .comment(comment("1", "ver"))
            .build();

        let all = hierarchical(&doc, HierarchyFilter::All);
        let parents = |rows: &[HierarchicalRecord]| -> Vec<(usize, String)> {
            rows.iter()
                .filter(|r| r.kind == ChangeKind::Paragraph)
                .map(|r| (r.paragraph_index, r.text.clone()))
                .collect()
        };
        let all_parents = parents(&all);
        assert_eq!(all_parents.len(), 4);
        assert_eq!(all_parents[1], (2, String::new()));

        for filter in [HierarchyFilter::WithInterventions, HierarchyFilter::WithComments] {
            for parent in parents(&hierarchical(&doc, filter)) {
                assert!(all_parents.contains(&parent), "{filter:?} renumbered {parent:?}");
            }
        }
        let with_comments = parents(&hierarchical(&doc, HierarchyFilter::WithComments));
        assert_eq!(with_comments, vec![(3, "Comentado.".to_string())]);
        let with_changes = parents(&hierarchical(&doc, HierarchyFilter::WithInterventions));
        assert_eq!(with_changes.iter().map(|p| p.0).collect::<Vec<_>>(), vec![2, 3, 4]);
    }

    #[test]
    fn report_names_file_and_columns() {
        let config = ExtractConfig {
            file_name: Some("entrada.docx".into()),
            strategy: Strategy::Consolidated,
        };
        let report = extract(&rent(), &config).unwrap();
        assert_eq!(report.file, "entrada.docx");
        assert_eq!(report.columns.len(), 6);
        let rows = report.rows();
        assert_eq!(rows[0][0], "entrada.docx");
        assert_eq!(rows[0].len(), report.columns.len());
    }

    #[test]
    fn empty_document_is_rejected() {
        let doc = Document::new("vazio.docx");
        assert!(matches!(extract(&doc, &ExtractConfig::default()), Err(CmError::EmptyDocument)));
    }

    #[test]
    fn config_accepts_method_name() {
        let config: ExtractConfig = serde_json::from_str(r#"{"strategy": "hierarquico_filtrado"}"#).unwrap();
        assert_eq!(config.strategy, Strategy::Hierarchical(HierarchyFilter::WithInterventions));
        assert_eq!(config.file_name, None);
    }
}
