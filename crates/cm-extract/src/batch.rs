//! Parallel extraction over many documents.
//!
//! Each document is an independent rayon task; results come back in input
//! order regardless of completion order.

use rayon::prelude::*;
use tracing::info;

use cm_core::{Document, Result};

use crate::extractor::{ChangeExtractor, ExtractConfig, ExtractionReport};

/// Extract every document of `docs` with the same `config`.
///
/// `config.file_name` is ignored: each report is named after its document.
pub fn extract_batch(docs: &[Document], config: &ExtractConfig) -> Vec<Result<ExtractionReport>> {
    let extractor = ChangeExtractor::new(ExtractConfig {
        file_name: None,
        strategy: config.strategy,
    });

    // Step 1: extract in parallel, keeping each input position.
    let mut indexed: Vec<(usize, Result<ExtractionReport>)> = docs
        .par_iter()
        .enumerate()
        .map(|(idx, doc)| (idx, extractor.extract(doc)))
        .collect();

    // Step 2: restore input order.
    indexed.sort_by_key(|(idx, _)| *idx);
    let reports: Vec<Result<ExtractionReport>> = indexed.into_iter().map(|(_, r)| r).collect();

    info!(
        documents = docs.len(),
        failed = reports.iter().filter(|r| r.is_err()).count(),
        strategy = %config.strategy,
        "batch extraction finished"
    );
    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::Strategy;
    use cm_core::{CmError, DocumentBuilder};

    #[test]
    fn batch_preserves_input_order() {
        let docs: Vec<Document> = (0..16)
            .map(|i| {
                DocumentBuilder::new(format!("doc{i}.docx"))
                    .paragraph(|p| p.text(format!("cláusula {i}")))
                    .build()
            })
            .collect();
        let reports = extract_batch(&docs, &ExtractConfig::default());
        assert_eq!(reports.len(), 16);
        for (i, report) in reports.iter().enumerate() {
            let report = report.as_ref().unwrap();
            assert_eq!(report.file, format!("doc{i}.docx"));
            assert_eq!(report.document_id, docs[i].id);
        }
    }

    #[test]
    fn one_failure_does_not_abort_the_batch() {
        let docs = vec![
            DocumentBuilder::new("a.docx").paragraph(|p| p.text("texto")).build(),
            Document::new("vazio.docx"),
        ];
        let config = ExtractConfig {
            file_name: Some("ignorado.docx".into()),
            strategy: Strategy::Consolidated,
        };
        let reports = extract_batch(&docs, &config);
        assert_eq!(reports[0].as_ref().unwrap().file, "a.docx");
        assert!(matches!(reports[1], Err(CmError::EmptyDocument)));
    }

    #[test]
    fn empty_batch() {
        assert!(extract_batch(&[], &ExtractConfig::default()).is_empty());
    }
}
