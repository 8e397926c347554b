use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use cm_core::{Document, ParagraphId, SectionKind};

use crate::classify::{classify, ParagraphRole};
use crate::clause::{Clause, ClauseKind};
use crate::subdivide::subdivide;

/// Tunables for [`ClauseSegmenter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Title of the implicit clause before the first heading.
    pub preamble_title: String,
    /// Title used by [`segment_whole`].
    pub whole_document_title: String,
    /// A chunk is cut once it holds this many paragraphs.
    pub max_paragraphs: usize,
    /// A chunk is cut once its `\n`-joined visible text reaches this many chars.
    pub max_chars: usize,
    /// Paragraphs shorter than this that are not all caps count as subtitles.
    pub subtitle_max_chars: usize,
    /// Length of the first-paragraph excerpt in single-paragraph chunk titles.
    pub title_excerpt_chars: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            preamble_title: "Preâmbulo".into(),
            whole_document_title: "Documento inteiro".into(),
            max_paragraphs: 10,
            max_chars: 4000,
            subtitle_max_chars: 100,
            title_excerpt_chars: 80,
        }
    }
}

/// Groups body paragraphs into titled clauses.
#[derive(Debug, Clone, Default)]
pub struct ClauseSegmenter {
    config: SegmenterConfig,
}

impl ClauseSegmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Segment the body of `doc`.
    ///
    /// Every body paragraph with analysis text ends up in exactly one clause
    /// unless it was recognized as a document title or clause heading.
    pub fn segment(&self, doc: &Document) -> Vec<Clause> {
        let mut current = Clause::new(self.config.preamble_title.clone(), ClauseKind::Preamble);
        let mut closed: Vec<Clause> = Vec::new();

        for id in doc.paragraph_ids(SectionKind::Body) {
            match classify(doc, id) {
                ParagraphRole::DocumentTitle => {
                    debug!(paragraph = %id, "document title skipped");
                }
                ParagraphRole::ClauseHeading => {
                    let title = doc.paragraph_text(id).trim().to_string();
                    debug!(paragraph = %id, %title, closing = ?current.kind, "clause heading");
                    let next = Clause::new(title, ClauseKind::Clause);
                    let finished = std::mem::replace(&mut current, next);
                    if !finished.is_empty() {
                        closed.push(finished);
                    }
                }
                ParagraphRole::SubClause | ParagraphRole::Body => {
                    push_if_text(doc, &mut current, id);
                }
            }
        }
        if !current.is_empty() {
            closed.push(current);
        }

        let mut clauses = Vec::with_capacity(closed.len());
        for clause in closed {
            if clause.kind == ClauseKind::Preamble {
                clauses.push(clause);
            } else {
                clauses.extend(subdivide(doc, clause, &self.config));
            }
        }
        info!(document = %doc.name, clauses = clauses.len(), "document segmented");
        clauses
    }

    /// One clause holding every body paragraph, for callers that skip
    /// segmentation.
    pub fn segment_whole(&self, doc: &Document) -> Clause {
        let mut clause = Clause::new(self.config.whole_document_title.clone(), ClauseKind::WholeDocument);
        clause.paragraphs = doc.paragraph_ids(SectionKind::Body);
        clause
    }
}

/// Segment with the default configuration.
pub fn segment(doc: &Document) -> Vec<Clause> {
    ClauseSegmenter::default().segment(doc)
}

/// Whole-document clause with the default configuration.
pub fn segment_whole(doc: &Document) -> Clause {
    ClauseSegmenter::default().segment_whole(doc)
}

fn push_if_text(doc: &Document, clause: &mut Clause, id: ParagraphId) {
    if !doc.paragraph_analysis_text(id).is_empty() {
        clause.paragraphs.push(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cm_core::{DocumentBuilder, RevisionMeta};

    #[test]
    fn heading_paragraph_is_not_clause_content() {
        let doc = DocumentBuilder::new("t.docx")
            .paragraph(|p| p.style("Heading 1").text("CLÁUSULA PRIMEIRA"))
            .paragraph(|p| p.text("O valor é R$xx,00."))
            .build();
        let clauses = segment(&doc);
        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0].title, "CLÁUSULA PRIMEIRA");
        assert_eq!(clauses[0].kind, ClauseKind::Clause);
        assert_eq!(clauses[0].paragraphs, vec![ParagraphId(1)]);
    }

    #[test]
    fn preamble_collects_content_before_first_heading() {
        let doc = DocumentBuilder::new("t.docx")
            .paragraph(|p| p.text("CONTRATO DE PRESTAÇÃO DE SERVIÇOS"))
            .paragraph(|p| p.text("Pelo presente instrumento particular, as partes qualificadas abaixo firmam este contrato de prestação de serviços."))
            .paragraph(|p| p.style("Heading 1").text("DO OBJETO"))
            .paragraph(|p| p.text("Prestação de serviços de consultoria."))
            .build();
        let clauses = segment(&doc);
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].title, "Preâmbulo");
        assert_eq!(clauses[0].kind, ClauseKind::Preamble);
        assert_eq!(clauses[0].paragraphs, vec![ParagraphId(1)]);
        assert_eq!(clauses[1].title, "DO OBJETO");
    }

    #[test]
    fn empty_preamble_is_not_emitted() {
        let doc = DocumentBuilder::new("t.docx")
            .paragraph(|p| p.style("Heading 1").text("DO PRAZO"))
            .paragraph(|p| p.text("Doze meses."))
            .build();
        let clauses = segment(&doc);
        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0].title, "DO PRAZO");
    }

    #[test]
    fn consecutive_headings_drop_the_empty_clause() {
        let doc = DocumentBuilder::new("t.docx")
            .paragraph(|p| p.style("Heading 1").text("CAPÍTULO I"))
            .paragraph(|p| p.style("Heading 2").text("DAS PARTES"))
            .paragraph(|p| p.text("Locador e locatário."))
            .build();
        let titles: Vec<String> = segment(&doc).into_iter().map(|c| c.title).collect();
        assert_eq!(titles, vec!["DAS PARTES"]);
    }

    #[test]
    fn deleted_only_paragraph_still_counts_as_content() {
        let doc = DocumentBuilder::new("t.docx")
            .paragraph(|p| p.style("Heading 1").text("DA MULTA"))
            .paragraph(|p| p.deleted("Multa de 2% ao mês.", RevisionMeta::new("Ana", None)))
            .build();
        let clauses = segment(&doc);
        assert_eq!(clauses[0].paragraphs, vec![ParagraphId(1)]);
    }

    #[test]
    fn every_text_paragraph_lands_in_exactly_one_clause() {
        let doc = DocumentBuilder::new("t.docx")
            .paragraph(|p| p.text("CONTRATO DE LOCAÇÃO RESIDENCIAL"))
            .paragraph(|p| p.text("Entre as partes abaixo qualificadas, fica justo e contratado o que segue, em caráter irrevogável."))
            .paragraph(|p| p.bold("Do Objeto"))
            .paragraph(|p| p.text("1.1 O imóvel situado na rua XXXXX."))
            .paragraph(|p| p.text("destinado exclusivamente a fins residenciais, vedada a sublocação sem anuência expressa."))
            .paragraph(|p| p.text("1.2 A posse é transferida na assinatura."))
            .paragraph(|p| p.text(""))
            .paragraph(|p| p.style("Heading 1").text("CLÁUSULA SEGUNDA"))
            .paragraph(|p| p.text("Aluguel mensal de R$ 1.000,00."))
            .paragraph(|p| p.text("Reajuste anual pelo IGP-M."))
            .build();
        let clauses = segment(&doc);

        let mut seen: Vec<ParagraphId> = clauses.iter().flat_map(|c| c.paragraphs.clone()).collect();
        let before = seen.len();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), before, "no paragraph in two clauses");

        for id in doc.paragraph_ids(SectionKind::Body) {
            let role = classify(&doc, id);
            let has_text = !doc.paragraph_analysis_text(id).is_empty();
            let structural = matches!(role, ParagraphRole::DocumentTitle | ParagraphRole::ClauseHeading);
            assert_eq!(seen.contains(&id), has_text && !structural, "paragraph {id}");
        }
    }

    #[test]
    fn segment_whole_takes_every_body_paragraph() {
        let doc = DocumentBuilder::new("t.docx")
            .header_paragraph(|p| p.text("Cabeçalho"))
            .paragraph(|p| p.text("CLÁUSULA PRIMEIRA"))
            .paragraph(|p| p.text(""))
            .build();
        let clause = segment_whole(&doc);
        assert_eq!(clause.title, "Documento inteiro");
        assert_eq!(clause.kind, ClauseKind::WholeDocument);
        assert_eq!(clause.paragraphs, vec![ParagraphId(1), ParagraphId(2)]);
    }

    #[test]
    fn config_deserializes_partial_overrides() {
        let config: SegmenterConfig = serde_json::from_str(r#"{"max_paragraphs": 4}"#).unwrap();
        assert_eq!(config.max_paragraphs, 4);
        assert_eq!(config.preamble_title, "Preâmbulo");
    }
}
