//! Annotation entry point: anchor review findings as comments.
//!
//! For each finding the snippet is searched paragraph by paragraph in the
//! named clause (the last clause with that title or cut from it, then the
//! first title containing it), then in the rest of the body. When no
//! paragraph matches, the comment lands on the last run of the paragraph
//! whose vocabulary overlaps the snippet most.
//! Each finding is independent: a failure is recorded in the report and the
//! next finding is processed.

use std::collections::HashSet;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use cm_core::{normalize_text, CmError, Comment, Document, ParagraphId, Result, RunId, SectionKind};
use cm_segment::{Clause, ClauseKind, ClauseSegmenter};

use crate::index::ParagraphIndex;
use crate::locate::{locate, LocatorConfig};
use crate::materialize::{materialize, runs_text};
use crate::refine::refine_placeholder_snippet;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How anchored comments are authored and decorated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotatorConfig {
    pub author: String,
    pub initials: String,
    /// RGB hex colour applied to anchored runs.
    pub highlight_color: String,
    pub underline: bool,
    /// Rule ids whose snippets go through placeholder refinement.
    pub placeholder_rules: Vec<String>,
    pub locator: LocatorConfig,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            author: "Revisor IA".into(),
            initials: "RIA".into(),
            highlight_color: "FF0000".into(),
            underline: true,
            placeholder_rules: vec!["RBRA".into()],
            locator: LocatorConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Request / report
// ---------------------------------------------------------------------------

/// One review finding produced by the external classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    #[serde(default)]
    pub rule_id: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub snippet: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClauseFindings {
    pub clause_title: String,
    #[serde(default)]
    pub findings: Vec<Finding>,
}

/// Findings grouped by clause title, in the order they should be applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationRequest {
    #[serde(default)]
    pub clauses: Vec<ClauseFindings>,
}

/// How a finding ended up anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorStatus {
    /// The snippet was found verbatim (after normalization).
    Exact,
    /// A long enough part of the snippet was found.
    Approximate,
    /// No match; anchored on the best-overlap paragraph's last run.
    Fallback,
    /// Nothing to anchor: empty snippet, duplicate, or no candidate run.
    Skipped,
    /// Anchoring started but mutating the document failed.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationOutcome {
    pub clause_title: String,
    pub rule_id: String,
    /// Snippet actually searched, after refinement.
    pub snippet: Option<String>,
    pub status: AnchorStatus,
    /// Literal text of the anchored runs; `None` when nothing was anchored.
    pub anchored_text: Option<String>,
    pub comment_id: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationReport {
    /// Identifier of this annotation pass.
    pub run_id: Uuid,
    pub document_id: Uuid,
    pub outcomes: Vec<AnnotationOutcome>,
}

impl AnnotationReport {
    /// Number of findings that received a comment.
    pub fn anchored(&self) -> usize {
        self.outcomes.iter().filter(|o| o.comment_id.is_some()).count()
    }
}

// ---------------------------------------------------------------------------
// Annotator
// ---------------------------------------------------------------------------

/// Where a finding was anchored.
struct Anchor {
    status: AnchorStatus,
    paragraph: ParagraphId,
    runs: Vec<RunId>,
}

#[derive(Debug, Clone, Default)]
pub struct Annotator {
    config: AnnotatorConfig,
    segmenter: ClauseSegmenter,
}

impl Annotator {
    pub fn new(config: AnnotatorConfig) -> Self {
        Self {
            config,
            segmenter: ClauseSegmenter::default(),
        }
    }

    /// Use `segmenter` to resolve clause titles.
    pub fn with_segmenter(mut self, segmenter: ClauseSegmenter) -> Self {
        self.segmenter = segmenter;
        self
    }

    /// Apply every finding of `request` to `doc`.
    ///
    /// Per-finding failures never abort the pass; they are reported as
    /// [`AnchorStatus::Failed`]. A request that anchors nothing leaves `doc`
    /// untouched. Only a document without paragraphs is an error.
    pub fn annotate(&self, doc: &mut Document, request: &AnnotationRequest) -> Result<AnnotationReport> {
        if doc.is_empty() {
            return Err(CmError::EmptyDocument);
        }
        let run_id = Uuid::new_v4();
        // Paragraph ids survive run splits, so one segmentation serves the pass.
        let clauses = self.segmenter.segment(doc);
        let body = doc.paragraph_ids(SectionKind::Body);
        let mut outcomes = Vec::new();

        for group in &request.clauses {
            let target = resolve_clause(&clauses, &group.clause_title);
            let resolved = target.is_some();
            let candidates = target.unwrap_or_else(|| body.clone());
            let clause_text = candidates
                .iter()
                .map(|id| doc.paragraph_analysis_text(*id))
                .collect::<Vec<_>>()
                .join("\n");
            debug!(
                clause = %group.clause_title,
                resolved,
                candidates = candidates.len(),
                "clause resolved"
            );

            let mut seen: HashSet<(String, String, String)> = HashSet::new();
            for finding in &group.findings {
                let key = (
                    finding.rule_id.clone(),
                    finding.snippet.as_deref().unwrap_or("").trim().to_string(),
                    finding.comment.clone(),
                );
                if !seen.insert(key) {
                    debug!(clause = %group.clause_title, rule = %finding.rule_id, "duplicate finding skipped");
                    outcomes.push(skipped(group, finding, finding.snippet.clone()));
                    continue;
                }
                outcomes.push(self.apply_finding(doc, group, finding, &candidates, &clause_text));
            }
        }

        let report = AnnotationReport {
            run_id,
            document_id: doc.id,
            outcomes,
        };
        info!(
            document = %doc.name,
            run_id = %run_id,
            findings = report.outcomes.len(),
            anchored = report.anchored(),
            "annotation pass finished"
        );
        Ok(report)
    }

    fn apply_finding(
        &self,
        doc: &mut Document,
        group: &ClauseFindings,
        finding: &Finding,
        candidates: &[ParagraphId],
        clause_text: &str,
    ) -> AnnotationOutcome {
        let snippet = if self.config.placeholder_rules.iter().any(|r| *r == finding.rule_id) {
            refine_placeholder_snippet(&finding.comment, finding.snippet.as_deref(), clause_text)
        } else {
            finding.snippet.clone()
        };
        let query = normalize_text(snippet.as_deref().unwrap_or(""));
        if query.is_empty() {
            return skipped(group, finding, snippet);
        }

        match self.anchor_finding(doc, candidates, &query, finding) {
            Ok(Some((anchor, comment_id))) => {
                let mut anchored = runs_text(doc, &anchor.runs);
                if anchored.is_empty() {
                    anchored = doc.paragraph_text(anchor.paragraph);
                }
                AnnotationOutcome {
                    clause_title: group.clause_title.clone(),
                    rule_id: finding.rule_id.clone(),
                    snippet,
                    status: anchor.status,
                    anchored_text: (!anchored.is_empty()).then_some(anchored),
                    comment_id: Some(comment_id),
                    error: None,
                }
            }
            Ok(None) => {
                warn!(clause = %group.clause_title, rule = %finding.rule_id, %query, "finding not anchored");
                skipped(group, finding, snippet)
            }
            Err(source) => {
                let cause = source.to_string();
                let err = CmError::AnnotationFailed {
                    snippet: query.clone(),
                    source: Box::new(source),
                };
                warn!(clause = %group.clause_title, rule = %finding.rule_id, error = %err, %cause, "annotation failed");
                AnnotationOutcome {
                    clause_title: group.clause_title.clone(),
                    rule_id: finding.rule_id.clone(),
                    snippet,
                    status: AnchorStatus::Failed,
                    anchored_text: None,
                    comment_id: None,
                    error: Some(format!("{err}: {cause}")),
                }
            }
        }
    }

    /// Locate, materialize and decorate. `Ok(None)` means no run could be
    /// chosen at all.
    fn anchor_finding(
        &self,
        doc: &mut Document,
        candidates: &[ParagraphId],
        query: &str,
        finding: &Finding,
    ) -> Result<Option<(Anchor, String)>> {
        let Some(anchor) = self.find_anchor(doc, candidates, query)? else {
            return Ok(None);
        };
        let comment_id = self.decorate(doc, &anchor, finding)?;
        Ok(Some((anchor, comment_id)))
    }

    fn find_anchor(&self, doc: &mut Document, candidates: &[ParagraphId], query: &str) -> Result<Option<Anchor>> {
        // Step 1: paragraphs of the resolved clause.
        let mut search = self.search(doc, candidates, query)?;

        // Step 2: the body paragraphs the clause did not cover.
        if let Search::Missed = search {
            let tried: HashSet<ParagraphId> = candidates.iter().copied().collect();
            let rest: Vec<ParagraphId> = doc
                .paragraph_ids(SectionKind::Body)
                .into_iter()
                .filter(|id| !tried.contains(id))
                .collect();
            if !rest.is_empty() {
                debug!(%query, remaining = rest.len(), "not in clause, searching rest of body");
                search = self.search(doc, &rest, query)?;
            }
        }

        // Step 3: last run of the located or best-vocabulary paragraph.
        let matched_paragraph = match search {
            Search::Anchored(anchor) => return Ok(Some(anchor)),
            Search::Located(id) => Some(id),
            Search::Missed => None,
        };
        let paragraph = matched_paragraph.or_else(|| best_vocabulary_paragraph(doc, query));
        let Some(paragraph) = paragraph else {
            return Ok(None);
        };
        let Some(&last) = doc.paragraph_runs(paragraph).last() else {
            return Ok(None);
        };
        debug!(paragraph = %paragraph, run = %last, "falling back to last run");
        Ok(Some(Anchor {
            status: AnchorStatus::Fallback,
            paragraph,
            runs: vec![last],
        }))
    }

    /// Locate `query` in the first matching paragraph of `ids` and
    /// materialize its runs.
    fn search(&self, doc: &mut Document, ids: &[ParagraphId], query: &str) -> Result<Search> {
        for &id in ids {
            let index = ParagraphIndex::build(doc, id);
            let Some(range) = locate(&index, query, &self.config.locator) else {
                continue;
            };
            let runs = materialize(doc, &index, &range)?;
            if runs.is_empty() {
                return Ok(Search::Located(id));
            }
            let status = if range.exact {
                AnchorStatus::Exact
            } else {
                AnchorStatus::Approximate
            };
            return Ok(Search::Anchored(Anchor { status, paragraph: id, runs }));
        }
        Ok(Search::Missed)
    }

    /// Attach the comment and highlight the anchored runs. Returns the new
    /// comment id.
    fn decorate(&self, doc: &mut Document, anchor: &Anchor, finding: &Finding) -> Result<String> {
        let (Some(&first), Some(&last)) = (anchor.runs.first(), anchor.runs.last()) else {
            return Err(CmError::Internal("anchor without runs".into()));
        };
        let rule = if finding.rule_id.is_empty() { "N/A" } else { finding.rule_id.as_str() };
        let comment = Comment {
            id: doc.next_comment_id(),
            author: self.config.author.clone(),
            initials: Some(self.config.initials.clone()),
            date: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
            text: format!("[{rule}] {}", finding.comment),
        };
        let comment_id = comment.id.clone();
        doc.add_comment(anchor.paragraph, first, last, comment)?;

        for &id in &anchor.runs {
            let run = doc.run_mut(id).ok_or_else(|| CmError::Mutation {
                run: id,
                reason: "anchored run vanished".into(),
            })?;
            if self.config.underline {
                run.formatting.underline = true;
            }
            run.formatting.color = Some(self.config.highlight_color.clone());
        }
        Ok(comment_id)
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Outcome of searching one list of paragraphs.
enum Search {
    Anchored(Anchor),
    /// A match was located but covered no run.
    Located(ParagraphId),
    Missed,
}

/// Paragraphs of the clause named `title`.
///
/// The last clause answering to `title` wins, together with the adjacent
/// pieces cut from the same parent. Otherwise the first clause whose title
/// contains `title` is used.
fn resolve_clause(clauses: &[Clause], title: &str) -> Option<Vec<ParagraphId>> {
    if let Some(end) = clauses.iter().rposition(|c| c.answers_to(title)) {
        let mut start = end;
        while start > 0 && is_piece_of(&clauses[start], title) && is_piece_of(&clauses[start - 1], title) {
            start -= 1;
        }
        return Some(
            clauses[start..=end]
                .iter()
                .flat_map(|c| c.paragraphs.iter().copied())
                .collect(),
        );
    }
    if title.is_empty() {
        return None;
    }
    clauses
        .iter()
        .find(|c| c.title.contains(title))
        .map(|c| c.paragraphs.clone())
}

fn is_piece_of(clause: &Clause, title: &str) -> bool {
    clause.kind == ClauseKind::SubClause && clause.parent_title.as_deref() == Some(title)
}

/// Body paragraph with the highest word-set Jaccard overlap with `query`.
/// Ties keep the earliest paragraph; zero overlap never wins.
fn best_vocabulary_paragraph(doc: &Document, query: &str) -> Option<ParagraphId> {
    let target = word_set(query);
    let mut best: Option<(f64, ParagraphId)> = None;
    for id in doc.paragraph_ids(SectionKind::Body) {
        let text = doc.paragraph_text(id);
        let words = word_set(&text);
        if words.is_empty() {
            continue;
        }
        let shared = target.intersection(&words).count();
        let union = target.union(&words).count();
        let ratio = shared as f64 / union as f64;
        if ratio > best.map(|(r, _)| r).unwrap_or(0.0) {
            best = Some((ratio, id));
        }
    }
    best.map(|(_, id)| id)
}

fn word_set(text: &str) -> HashSet<String> {
    text.split_whitespace().map(|w| w.to_lowercase()).collect()
}

fn skipped(group: &ClauseFindings, finding: &Finding, snippet: Option<String>) -> AnnotationOutcome {
    AnnotationOutcome {
        clause_title: group.clause_title.clone(),
        rule_id: finding.rule_id.clone(),
        snippet,
        status: AnchorStatus::Skipped,
        anchored_text: None,
        comment_id: None,
        error: None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
