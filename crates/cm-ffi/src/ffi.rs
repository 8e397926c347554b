use std::os::raw::c_char;

use serde::{Deserialize, Serialize};
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cm_anchor::{AnnotationReport, AnnotationRequest, Annotator, AnnotatorConfig};
use cm_core::{codec, normalize, Document, ParagraphId};
use cm_extract::{extract, extract_batch, ExtractConfig, ExtractionReport};
use cm_segment::{Clause, ClauseKind, ClauseSegmenter, SegmenterConfig};

use crate::marshal::{cstring_to_str, deserialize_json, optional_config, to_json};
use crate::result::CmarkResult;

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Segmenter overrides plus the whole-document switch.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SegmentOptions {
    whole_document: bool,
    #[serde(flatten)]
    segmenter: SegmenterConfig,
}

/// A clause with its analysis text resolved, as handed to the classifier.
#[derive(Debug, Serialize)]
struct ClauseView {
    title: String,
    kind: ClauseKind,
    parent_title: Option<String>,
    paragraphs: Vec<ParagraphId>,
    text: String,
    fingerprint: String,
}

impl ClauseView {
    fn new(doc: &Document, clause: Clause) -> Self {
        Self {
            text: clause.analysis_text(doc),
            fingerprint: clause.fingerprint(doc),
            title: clause.title,
            kind: clause.kind,
            parent_title: clause.parent_title,
            paragraphs: clause.paragraphs,
        }
    }
}

#[derive(Debug, Serialize)]
struct AnnotateOutput<'a> {
    document: &'a Document,
    report: AnnotationReport,
}

#[derive(Debug, Serialize)]
struct BatchEntry {
    ok: bool,
    report: Option<ExtractionReport>,
    error: Option<String>,
}

/// Unwrap `$expr` or return its error as a failed envelope.
macro_rules! try_ffi {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(e) => return CmarkResult::failure(&e.to_string()),
        }
    };
}

fn respond(value: &impl Serialize) -> *mut CmarkResult {
    match to_json(value) {
        Ok(json) => CmarkResult::success(&json),
        Err(e) => CmarkResult::failure(&e),
    }
}

// ---------------------------------------------------------------------------
// Memory management
// ---------------------------------------------------------------------------

/// Free a `CmarkResult` returned by any `cmark_*` function.
///
/// Passing a null pointer is a no-op.
///
/// # Safety
///
/// `ptr` must be either null or a pointer previously returned by one of the
/// `cmark_*` functions that has not yet been freed.
#[no_mangle]
pub unsafe extern "C" fn cmark_free(ptr: *mut CmarkResult) {
    CmarkResult::free(ptr);
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Install the global `tracing` subscriber, filtered by `RUST_LOG` (default
/// `info`).
///
/// Only the first call succeeds; later calls return a failure envelope.
#[no_mangle]
pub extern "C" fn cmark_init_logging() -> *mut CmarkResult {
    let installed = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
    match installed {
        Ok(()) => CmarkResult::success("{}"),
        Err(e) => CmarkResult::failure(&format!("logging already initialized: {e}")),
    }
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

/// Normalize `text`.
///
/// `data` is `{"text": ..., "offsets": [...]}` where `offsets[i]` is the
/// input char index of normalized char `i`.
///
/// # Safety
///
/// `text` must be a valid, non-null, null-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn cmark_normalize(text: *const c_char) -> *mut CmarkResult {
    let raw = try_ffi!(cstring_to_str(text));
    respond(&normalize(&raw))
}

// ---------------------------------------------------------------------------
// Segmentation
// ---------------------------------------------------------------------------

/// Split the body of a JSON document into clauses.
///
/// `options_json` may be null or a partial `SegmenterConfig` object with an
/// extra `whole_document` flag. `data` is an array of clauses, each with its
/// analysis `text` and `fingerprint`.
///
/// # Safety
///
/// `document_json` must be a valid, non-null, null-terminated C string;
/// `options_json` must be null or one.
#[no_mangle]
pub unsafe extern "C" fn cmark_segment(
    document_json: *const c_char,
    options_json: *const c_char,
) -> *mut CmarkResult {
    let json = try_ffi!(cstring_to_str(document_json));
    let options: SegmentOptions = try_ffi!(optional_config(options_json));
    let doc = try_ffi!(codec::decode_str(&json));

    let segmenter = ClauseSegmenter::new(options.segmenter);
    let clauses = if options.whole_document {
        vec![segmenter.segment_whole(&doc)]
    } else {
        segmenter.segment(&doc)
    };
    let views: Vec<ClauseView> = clauses.into_iter().map(|c| ClauseView::new(&doc, c)).collect();
    respond(&views)
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Extract tracked changes and comments from one JSON document.
///
/// `config_json` may be null or a partial `ExtractConfig`, e.g.
/// `{"strategy": "hierarquico"}`. `data` is an `ExtractionReport`.
///
/// # Safety
///
/// `document_json` must be a valid, non-null, null-terminated C string;
/// `config_json` must be null or one.
#[no_mangle]
pub unsafe extern "C" fn cmark_extract(
    document_json: *const c_char,
    config_json: *const c_char,
) -> *mut CmarkResult {
    let json = try_ffi!(cstring_to_str(document_json));
    let config: ExtractConfig = try_ffi!(optional_config(config_json));
    let doc = try_ffi!(codec::decode_str(&json));
    let report = try_ffi!(extract(&doc, &config));
    respond(&report)
}

/// Extract a JSON array of documents in parallel.
///
/// `data` is an array with one `{ok, report, error}` entry per input
/// document, in input order. A document that fails to decode or extract only
/// fails its own entry.
///
/// # Safety
///
/// `documents_json` must be a valid, non-null, null-terminated C string;
/// `config_json` must be null or one.
#[no_mangle]
pub unsafe extern "C" fn cmark_extract_batch(
    documents_json: *const c_char,
    config_json: *const c_char,
) -> *mut CmarkResult {
    let json = try_ffi!(cstring_to_str(documents_json));
    let config: ExtractConfig = try_ffi!(optional_config(config_json));
    let values: Vec<serde_json::Value> = try_ffi!(deserialize_json(&json));

    // Step 1: decode each document on its own.
    let decoded: Vec<Result<Document, String>> = values
        .iter()
        .map(|value| codec::decode_str(&value.to_string()).map_err(|e| e.to_string()))
        .collect();
    let docs: Vec<Document> = decoded.iter().filter_map(|d| d.as_ref().ok().cloned()).collect();

    // Step 2: extract the decoded ones in parallel.
    let mut reports = extract_batch(&docs, &config).into_iter();

    // Step 3: merge back into input order.
    let entries: Vec<BatchEntry> = decoded
        .into_iter()
        .enumerate()
        .map(|(idx, doc)| {
            let outcome = match doc {
                Ok(_) => match reports.next() {
                    Some(Ok(report)) => Ok(report),
                    Some(Err(e)) => Err(e.to_string()),
                    None => Err("missing batch result".to_string()),
                },
                Err(e) => Err(e),
            };
            match outcome {
                Ok(report) => BatchEntry { ok: true, report: Some(report), error: None },
                Err(error) => {
                    warn!(index = idx, %error, "batch document failed");
                    BatchEntry { ok: false, report: None, error: Some(error) }
                }
            }
        })
        .collect();
    respond(&entries)
}

// ---------------------------------------------------------------------------
// Annotation
// ---------------------------------------------------------------------------

/// Anchor the findings of `request_json` as comments on a JSON document.
///
/// `config_json` may be null or a partial `AnnotatorConfig`. `data` is
/// `{"document": <annotated document>, "report": <AnnotationReport>}`.
///
/// # Safety
///
/// `document_json` and `request_json` must be valid, non-null,
/// null-terminated C strings; `config_json` must be null or one.
#[no_mangle]
pub unsafe extern "C" fn cmark_annotate(
    document_json: *const c_char,
    request_json: *const c_char,
    config_json: *const c_char,
) -> *mut CmarkResult {
    let json = try_ffi!(cstring_to_str(document_json));
    let request_str = try_ffi!(cstring_to_str(request_json));
    let config: AnnotatorConfig = try_ffi!(optional_config(config_json));
    let request: AnnotationRequest = try_ffi!(deserialize_json(&request_str));
    let mut doc = try_ffi!(codec::decode_str(&json));

    let report = try_ffi!(Annotator::new(config).annotate(&mut doc, &request));
    respond(&AnnotateOutput { document: &doc, report })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
