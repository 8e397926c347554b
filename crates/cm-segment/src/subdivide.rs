//! Cutting a heading-delimited clause into analysis-sized pieces.
//!
//! Numbered paragraphs (`1.1`, `2.3.4`) are natural cut points. Without
//! them the clause is chunked greedily by paragraph count, size and short
//! subtitle-like lines.

use tracing::debug;

use cm_core::{Document, ParagraphId};

use crate::classify::{is_subclause, is_upper, leading_token};
use crate::clause::{Clause, ClauseKind};
use crate::segment::SegmenterConfig;

/// Subdivide `clause`.
///
/// Paragraphs without analysis text are dropped first; a clause left with
/// none yields nothing. When the cut produces a single piece the clause is
/// returned unchanged apart from that filtering.
pub fn subdivide(doc: &Document, clause: Clause, config: &SegmenterConfig) -> Vec<Clause> {
    let paragraphs: Vec<ParagraphId> = clause
        .paragraphs
        .iter()
        .copied()
        .filter(|id| !doc.paragraph_analysis_text(*id).is_empty())
        .collect();
    if paragraphs.is_empty() {
        debug!(title = %clause.title, "clause has no analysis text, dropped");
        return Vec::new();
    }

    let numbered: Vec<usize> = paragraphs
        .iter()
        .enumerate()
        .filter(|(_, id)| is_subclause(&doc.paragraph_text(**id)))
        .map(|(idx, _)| idx)
        .collect();

    let pieces = if numbered.is_empty() {
        chunk(doc, &clause.title, &paragraphs, config)
    } else {
        split_numbered(doc, &clause.title, &paragraphs, &numbered)
    };

    if pieces.len() <= 1 {
        return vec![Clause { paragraphs, ..clause }];
    }
    debug!(title = %clause.title, pieces = pieces.len(), "clause subdivided");
    pieces
}

/// One sub-clause per numbered paragraph, running up to the next one.
/// Paragraphs before the first numbered one keep the parent title.
fn split_numbered(
    doc: &Document,
    title: &str,
    paragraphs: &[ParagraphId],
    numbered: &[usize],
) -> Vec<Clause> {
    let mut bounds = numbered.to_vec();
    bounds.push(paragraphs.len());

    let mut out = Vec::with_capacity(bounds.len());
    if bounds[0] > 0 {
        out.push(sub_clause(title.to_string(), title, paragraphs[..bounds[0]].to_vec()));
    }
    for pair in bounds.windows(2) {
        let (start, end) = (pair[0], pair[1]);
        let heading = doc.paragraph_text(paragraphs[start]);
        let token = leading_token(heading.trim()).to_string();
        out.push(sub_clause(token, title, paragraphs[start..end].to_vec()));
    }
    out
}

fn chunk(
    doc: &Document,
    title: &str,
    paragraphs: &[ParagraphId],
    config: &SegmenterConfig,
) -> Vec<Clause> {
    let mut out = Vec::new();
    let mut current: Vec<ParagraphId> = Vec::new();
    let mut current_chars = 0usize;
    let mut part = 1usize;

    for &id in paragraphs {
        let text = doc.paragraph_text(id);
        if !current.is_empty() {
            current_chars += 1; // joining "\n"
        }
        current_chars += text.chars().count();
        current.push(id);

        let trimmed = text.trim();
        let subtitle = !trimmed.is_empty()
            && trimmed.chars().count() < config.subtitle_max_chars
            && !is_upper(&text);
        if current.len() >= config.max_paragraphs || current_chars >= config.max_chars || subtitle {
            let piece = std::mem::take(&mut current);
            out.push(sub_clause(chunk_title(doc, title, &piece, part, config), title, piece));
            current_chars = 0;
            part += 1;
        }
    }
    if !current.is_empty() {
        out.push(sub_clause(chunk_title(doc, title, &current, part, config), title, current));
    }
    out
}

fn chunk_title(
    doc: &Document,
    title: &str,
    piece: &[ParagraphId],
    part: usize,
    config: &SegmenterConfig,
) -> String {
    if piece.len() > 1 {
        return format!("{title} (Parte {part})");
    }
    let first = doc.paragraph_text(piece[0]);
    let excerpt: String = first.trim().chars().take(config.title_excerpt_chars).collect();
    format!("{title} - {excerpt}...")
}

fn sub_clause(title: String, parent: &str, paragraphs: Vec<ParagraphId>) -> Clause {
    Clause {
        title,
        kind: ClauseKind::SubClause,
        parent_title: Some(parent.to_string()),
        paragraphs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cm_core::{DocumentBuilder, SectionKind};

    fn clause_over(doc: &Document) -> Clause {
        let mut clause = Clause::new("CLÁUSULA TERCEIRA", ClauseKind::Clause);
        clause.paragraphs = doc.paragraph_ids(SectionKind::Body);
        clause
    }

    #[test]
    fn numbered_paragraphs_become_sub_clauses() {
        let doc = DocumentBuilder::new("t.docx")
            .paragraph(|p| p.text("As partes acordam o seguinte, conforme as condições abaixo descritas e aceitas por ambas."))
            .paragraph(|p| p.text("3.1 O pagamento será mensal."))
            .paragraph(|p| p.text("até o quinto dia útil de cada mês, mediante boleto bancário."))
            .paragraph(|p| p.text("3.2 O atraso gera multa."))
            .build();
        let pieces = subdivide(&doc, clause_over(&doc), &SegmenterConfig::default());
        let titles: Vec<&str> = pieces.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["CLÁUSULA TERCEIRA", "3.1", "3.2"]);
        assert_eq!(pieces[1].paragraphs, vec![ParagraphId(1), ParagraphId(2)]);
        assert!(pieces.iter().all(|c| c.kind == ClauseKind::SubClause));
        assert!(pieces
            .iter()
            .all(|c| c.parent_title.as_deref() == Some("CLÁUSULA TERCEIRA")));
    }

    #[test]
    fn short_subtitles_cut_chunks() {
        let long = "A".repeat(10) + &" texto corrido sem pontuação final".repeat(4);
        let doc = DocumentBuilder::new("t.docx")
            .paragraph(|p| p.text(long.clone()))
            .paragraph(|p| p.text("Do reajuste"))
            .paragraph(|p| p.text("Das penalidades"))
            .build();
        let pieces = subdivide(&doc, clause_over(&doc), &SegmenterConfig::default());
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].title, "CLÁUSULA TERCEIRA (Parte 1)");
        assert_eq!(pieces[0].paragraphs, vec![ParagraphId(0), ParagraphId(1)]);
        assert_eq!(pieces[1].title, "CLÁUSULA TERCEIRA - Das penalidades...");
    }

    #[test]
    fn paragraph_count_limit_cuts_chunks() {
        let mut builder = DocumentBuilder::new("t.docx");
        for _ in 0..12 {
            builder = builder.paragraph(|p| p.text("CONDIÇÃO GERAL APLICÁVEL"));
        }
        let doc = builder.build();
        let pieces = subdivide(&doc, clause_over(&doc), &SegmenterConfig::default());
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].paragraphs.len(), 10);
        assert_eq!(pieces[1].title, "CLÁUSULA TERCEIRA (Parte 2)");
    }

    #[test]
    fn excerpt_is_truncated_to_configured_chars() {
        let config = SegmenterConfig { title_excerpt_chars: 5, ..SegmenterConfig::default() };
        let doc = DocumentBuilder::new("t.docx")
            .paragraph(|p| p.text("Primeira parte"))
            .paragraph(|p| p.text("Segunda parte"))
            .build();
        let pieces = subdivide(&doc, clause_over(&doc), &config);
        assert_eq!(pieces[0].title, "CLÁUSULA TERCEIRA - Prime...");
    }

    #[test]
    fn single_piece_keeps_the_clause_whole() {
        let doc = DocumentBuilder::new("t.docx")
            .paragraph(|p| p.text("O valor é R$xx,00."))
            .build();
        let pieces = subdivide(&doc, clause_over(&doc), &SegmenterConfig::default());
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].title, "CLÁUSULA TERCEIRA");
        assert_eq!(pieces[0].kind, ClauseKind::Clause);
    }

    #[test]
    fn clause_without_text_vanishes() {
        let doc = DocumentBuilder::new("t.docx")
            .paragraph(|p| p.text("  \u{200b} "))
            .build();
        assert!(subdivide(&doc, clause_over(&doc), &SegmenterConfig::default()).is_empty());
    }
}
