use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CmError, Result};
use crate::normalize::normalize;

// ---------------------------------------------------------------------------
// Arena ids
// ---------------------------------------------------------------------------

/// Stable index of a [`Run`] in [`Document::runs`].
///
/// Ids never move: splitting a run appends new arena entries and only the
/// owning paragraph's `content` order changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub usize);

/// Stable index of a [`Paragraph`] in [`Document::paragraphs`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParagraphId(pub usize);

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r{}", self.0)
    }
}

impl std::fmt::Display for ParagraphId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "p{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// SectionKind
// ---------------------------------------------------------------------------

/// Document part a block belongs to. Extraction walks them in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Header,
    Body,
    Footer,
}

impl SectionKind {
    /// All sections in extraction order.
    pub const ORDERED: [SectionKind; 3] = [SectionKind::Header, SectionKind::Body, SectionKind::Footer];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Header => "header",
            SectionKind::Body => "body",
            SectionKind::Footer => "footer",
        }
    }
}

impl std::fmt::Display for SectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RunFormatting / Revision / Run
// ---------------------------------------------------------------------------

/// Typographic attributes attached to a [`Run`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunFormatting {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    /// Point size, if explicitly set; `None` means "inherit from style".
    pub font_size: Option<f32>,
    /// RGB hex colour without the leading `#` (e.g. `"FF0000"`).
    pub color: Option<String>,
}

/// Author and timestamp of a tracked revision wrapper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevisionMeta {
    pub author: Option<String>,
    /// Timestamp exactly as stored in the source markup.
    pub date: Option<String>,
}

impl RevisionMeta {
    pub fn new(author: impl Into<String>, date: Option<&str>) -> Self {
        Self {
            author: Some(author.into()),
            date: date.map(str::to_string),
        }
    }
}

/// Revision state a run inherits from its enclosing markup.
///
/// Moves are folded by the codec: a move destination is an insertion and a
/// move source is a deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Revision {
    #[default]
    Normal,
    Inserted(RevisionMeta),
    Deleted(RevisionMeta),
}

/// Meta-free view of [`Revision`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionKind {
    Normal,
    Inserted,
    Deleted,
}

impl Revision {
    pub fn kind(&self) -> RevisionKind {
        match self {
            Revision::Normal => RevisionKind::Normal,
            Revision::Inserted(_) => RevisionKind::Inserted,
            Revision::Deleted(_) => RevisionKind::Deleted,
        }
    }

    pub fn meta(&self) -> Option<&RevisionMeta> {
        match self {
            Revision::Normal => None,
            Revision::Inserted(meta) | Revision::Deleted(meta) => Some(meta),
        }
    }
}

/// What a run's characters represent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    #[default]
    Text,
    /// Literal field instruction (e.g. `PAGE \* MERGEFORMAT`).
    FieldInstruction,
}

/// A contiguous span of text that shares a single set of formatting attributes
/// and a single revision state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub text: String,
    #[serde(default)]
    pub kind: RunKind,
    #[serde(default)]
    pub formatting: RunFormatting,
    #[serde(default)]
    pub revision: Revision,
}

impl Run {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: RunKind::Text,
            formatting: RunFormatting::default(),
            revision: Revision::Normal,
        }
    }

    /// Pre-edit text: inserted runs contribute nothing, deleted runs keep
    /// their text, field instructions are included.
    pub fn canonical_text(&self) -> &str {
        match self.revision {
            Revision::Inserted(_) => "",
            _ => &self.text,
        }
    }

    /// Rendered text: deleted runs and field instructions are hidden.
    pub fn visible_text(&self) -> &str {
        match (&self.revision, self.kind) {
            (Revision::Deleted(_), _) | (_, RunKind::FieldInstruction) => "",
            _ => &self.text,
        }
    }

    /// Copy of this run with the same formatting, kind and revision but new text.
    fn sibling(&self, text: String) -> Self {
        Self {
            text,
            kind: self.kind,
            formatting: self.formatting.clone(),
            revision: self.revision.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Comment
// ---------------------------------------------------------------------------

/// A review comment. Anchored by [`Inline::CommentStart`] / [`Inline::CommentEnd`]
/// markers that carry the same `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub initials: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub text: String,
}

// ---------------------------------------------------------------------------
// Paragraph / Block / Table
// ---------------------------------------------------------------------------

/// One item of paragraph content, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Inline {
    Run(RunId),
    CommentStart(String),
    CommentEnd(String),
    Break,
    Tab,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub content: Vec<Inline>,
}

impl Paragraph {
    /// Run ids in content order.
    pub fn run_ids(&self) -> impl Iterator<Item = RunId> + '_ {
        self.content.iter().filter_map(|item| match item {
            Inline::Run(id) => Some(*id),
            _ => None,
        })
    }

    fn position_of(&self, run: RunId) -> Option<usize> {
        self.content
            .iter()
            .position(|item| matches!(item, Inline::Run(id) if *id == run))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    #[serde(default)]
    pub paragraphs: Vec<ParagraphId>,
}

/// A table whose grid slots reference cells by index; a merged cell repeats
/// its index in every slot it spans.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    #[serde(default)]
    pub cells: Vec<TableCell>,
    #[serde(default)]
    pub rows: Vec<Vec<usize>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Block {
    Paragraph(ParagraphId),
    Table(Table),
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Decoded document: section block lists plus the paragraph and run arenas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    /// Source file name, carried into extraction records.
    pub name: String,
    #[serde(default)]
    pub header: Vec<Block>,
    #[serde(default)]
    pub body: Vec<Block>,
    #[serde(default)]
    pub footer: Vec<Block>,
    #[serde(default, deserialize_with = "crate::codec::lenient_comments")]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub paragraphs: Vec<Paragraph>,
    #[serde(default)]
    pub runs: Vec<Run>,
}

impl Document {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            header: Vec::new(),
            body: Vec::new(),
            footer: Vec::new(),
            comments: Vec::new(),
            paragraphs: Vec::new(),
            runs: Vec::new(),
        }
    }

    pub fn section(&self, kind: SectionKind) -> &[Block] {
        match kind {
            SectionKind::Header => &self.header,
            SectionKind::Body => &self.body,
            SectionKind::Footer => &self.footer,
        }
    }

    pub fn paragraph(&self, id: ParagraphId) -> Option<&Paragraph> {
        self.paragraphs.get(id.0)
    }

    pub fn run(&self, id: RunId) -> Option<&Run> {
        self.runs.get(id.0)
    }

    pub fn run_mut(&mut self, id: RunId) -> Option<&mut Run> {
        self.runs.get_mut(id.0)
    }

    pub fn comment(&self, id: &str) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == id)
    }

    /// `true` when no section references any paragraph.
    pub fn is_empty(&self) -> bool {
        SectionKind::ORDERED
            .iter()
            .all(|kind| self.paragraph_ids(*kind).is_empty())
    }

    /// Paragraphs of `kind` in reading order. Table cells are flattened row by
    /// row; a merged cell is visited once.
    pub fn paragraph_ids(&self, kind: SectionKind) -> Vec<ParagraphId> {
        let mut out = Vec::new();
        for block in self.section(kind) {
            match block {
                Block::Paragraph(id) => out.push(*id),
                Block::Table(table) => {
                    let mut seen_cells: HashSet<usize> = HashSet::new();
                    for row in &table.rows {
                        for &cell_idx in row {
                            if !seen_cells.insert(cell_idx) {
                                continue;
                            }
                            if let Some(cell) = table.cells.get(cell_idx) {
                                out.extend(cell.paragraphs.iter().copied());
                            }
                        }
                    }
                }
            }
        }
        out
    }

    /// Runs of a paragraph in content order.
    pub fn paragraph_runs(&self, id: ParagraphId) -> Vec<RunId> {
        self.paragraph(id)
            .map(|p| p.run_ids().collect())
            .unwrap_or_default()
    }

    /// Visible rendering: inserted text included, deleted text excluded,
    /// tabs and breaks rendered as `\t` and `\n`.
    pub fn paragraph_text(&self, id: ParagraphId) -> String {
        let Some(paragraph) = self.paragraph(id) else {
            return String::new();
        };
        let mut text = String::new();
        for item in &paragraph.content {
            match item {
                Inline::Run(run_id) => {
                    if let Some(run) = self.run(*run_id) {
                        text.push_str(run.visible_text());
                    }
                }
                Inline::Tab => text.push('\t'),
                Inline::Break => text.push('\n'),
                Inline::CommentStart(_) | Inline::CommentEnd(_) => {}
            }
        }
        text
    }

    /// Pre-edit text of the paragraph (the concatenated canonical run text).
    pub fn paragraph_canonical_text(&self, id: ParagraphId) -> String {
        self.paragraph_runs(id)
            .into_iter()
            .filter_map(|run_id| self.run(run_id))
            .map(Run::canonical_text)
            .collect()
    }

    /// Normalized canonical text, falling back to the normalized visible text
    /// when the paragraph has no canonical text at all.
    pub fn paragraph_analysis_text(&self, id: ParagraphId) -> String {
        let canonical = normalize(&self.paragraph_canonical_text(id)).text;
        if !canonical.is_empty() {
            return canonical;
        }
        normalize(&self.paragraph_text(id)).text
    }

    pub fn paragraph_style(&self, id: ParagraphId) -> Option<&str> {
        self.paragraph(id).and_then(|p| p.style.as_deref())
    }

    /// Whether the paragraph's first run is bold.
    pub fn first_run_bold(&self, id: ParagraphId) -> bool {
        self.paragraph_runs(id)
            .first()
            .and_then(|run_id| self.run(*run_id))
            .map(|run| run.formatting.bold)
            .unwrap_or(false)
    }

    /// Split `run` (owned by `paragraph`) so that chars `[start, end)` form a
    /// run of their own, returning that run's id.
    ///
    /// The prefix keeps the original id; the middle and suffix pieces are new
    /// arena entries placed right after it in the paragraph. Offsets are
    /// clamped to the run's length. Returns `Ok(None)` when the clamped range
    /// is empty.
    pub fn split_run(
        &mut self,
        paragraph: ParagraphId,
        run: RunId,
        start: usize,
        end: usize,
    ) -> Result<Option<RunId>> {
        let original = self
            .run(run)
            .cloned()
            .ok_or_else(|| CmError::Mutation { run, reason: "run does not exist".into() })?;
        if self.paragraph(paragraph).and_then(|p| p.position_of(run)).is_none() {
            return Err(CmError::Mutation {
                run,
                reason: format!("run is not part of paragraph {paragraph}"),
            });
        }
        if original.text.is_empty() {
            return Err(CmError::Mutation { run, reason: "run has no text to split".into() });
        }

        let chars: Vec<char> = original.text.chars().collect();
        let len = chars.len();
        let start = start.min(len);
        let end = end.min(len).max(start);
        if start == end {
            return Ok(None);
        }
        if start == 0 && end == len {
            return Ok(Some(run));
        }

        let prefix: String = chars[..start].iter().collect();
        let target: String = chars[start..end].iter().collect();
        let suffix: String = chars[end..].iter().collect();

        let match_id = if prefix.is_empty() {
            self.runs[run.0].text = target;
            run
        } else {
            self.runs[run.0].text = prefix;
            self.insert_run_after(paragraph, run, original.sibling(target))?
        };
        if !suffix.is_empty() {
            self.insert_run_after(paragraph, match_id, original.sibling(suffix))?;
        }
        Ok(Some(match_id))
    }

    fn insert_run_after(&mut self, paragraph: ParagraphId, after: RunId, run: Run) -> Result<RunId> {
        let new_id = RunId(self.runs.len());
        let para = self
            .paragraphs
            .get_mut(paragraph.0)
            .ok_or_else(|| CmError::NotFound(format!("paragraph {paragraph}")))?;
        let pos = para.position_of(after).ok_or_else(|| CmError::Mutation {
            run: after,
            reason: format!("run is not part of paragraph {paragraph}"),
        })?;
        para.content.insert(pos + 1, Inline::Run(new_id));
        self.runs.push(run);
        Ok(new_id)
    }

    /// One past the largest numeric comment id, or `0` when there is none.
    pub fn next_comment_id(&self) -> String {
        let next = self
            .comments
            .iter()
            .filter_map(|c| c.id.parse::<u64>().ok())
            .max()
            .map(|max| max + 1)
            .unwrap_or(0);
        next.to_string()
    }

    /// Register `comment` and anchor it on the run range `first..=last` of
    /// `paragraph`.
    pub fn add_comment(
        &mut self,
        paragraph: ParagraphId,
        first: RunId,
        last: RunId,
        comment: Comment,
    ) -> Result<()> {
        let para = self
            .paragraphs
            .get_mut(paragraph.0)
            .ok_or_else(|| CmError::NotFound(format!("paragraph {paragraph}")))?;
        let start = para.position_of(first).ok_or_else(|| CmError::Mutation {
            run: first,
            reason: format!("run is not part of paragraph {paragraph}"),
        })?;
        let end = para.position_of(last).ok_or_else(|| CmError::Mutation {
            run: last,
            reason: format!("run is not part of paragraph {paragraph}"),
        })?;
        if end < start {
            return Err(CmError::InvalidInput(format!(
                "comment range ends ({last}) before it starts ({first})"
            )));
        }
        para.content.insert(end + 1, Inline::CommentEnd(comment.id.clone()));
        para.content.insert(start, Inline::CommentStart(comment.id.clone()));
        self.comments.push(comment);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Pending paragraph item; runs are moved into the arena on build.
#[derive(Debug, Clone)]
enum PendingInline {
    Run(Run),
    Marker(Inline),
}

/// Fluent construction of one paragraph.
#[derive(Debug, Clone, Default)]
pub struct ParagraphBuilder {
    style: Option<String>,
    items: Vec<PendingInline>,
}

impl ParagraphBuilder {
    pub fn style(mut self, name: impl Into<String>) -> Self {
        self.style = Some(name.into());
        self
    }

    pub fn run(mut self, run: Run) -> Self {
        self.items.push(PendingInline::Run(run));
        self
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        self.run(Run::new(text))
    }

    pub fn bold(self, text: impl Into<String>) -> Self {
        let mut run = Run::new(text);
        run.formatting.bold = true;
        self.run(run)
    }

    pub fn inserted(self, text: impl Into<String>, meta: RevisionMeta) -> Self {
        let mut run = Run::new(text);
        run.revision = Revision::Inserted(meta);
        self.run(run)
    }

    pub fn deleted(self, text: impl Into<String>, meta: RevisionMeta) -> Self {
        let mut run = Run::new(text);
        run.revision = Revision::Deleted(meta);
        self.run(run)
    }

    pub fn field(self, instruction: impl Into<String>) -> Self {
        let mut run = Run::new(instruction);
        run.kind = RunKind::FieldInstruction;
        self.run(run)
    }

    pub fn comment_start(mut self, id: impl Into<String>) -> Self {
        self.items.push(PendingInline::Marker(Inline::CommentStart(id.into())));
        self
    }

    pub fn comment_end(mut self, id: impl Into<String>) -> Self {
        self.items.push(PendingInline::Marker(Inline::CommentEnd(id.into())));
        self
    }

    pub fn tab(mut self) -> Self {
        self.items.push(PendingInline::Marker(Inline::Tab));
        self
    }

    pub fn line_break(mut self) -> Self {
        self.items.push(PendingInline::Marker(Inline::Break));
        self
    }
}

/// Rows of cells; each cell is a list of paragraphs. `span_previous` repeats
/// the previous cell in the grid, as a horizontal merge does.
#[derive(Debug, Clone, Default)]
pub struct TableBuilder {
    rows: Vec<Vec<CellSlot>>,
}

#[derive(Debug, Clone)]
enum CellSlot {
    New(Vec<ParagraphBuilder>),
    SpanPrevious,
}

#[derive(Debug, Clone, Default)]
pub struct RowBuilder {
    slots: Vec<CellSlot>,
}

impl RowBuilder {
    pub fn cell(mut self, paragraphs: Vec<ParagraphBuilder>) -> Self {
        self.slots.push(CellSlot::New(paragraphs));
        self
    }

    pub fn span_previous(mut self) -> Self {
        self.slots.push(CellSlot::SpanPrevious);
        self
    }
}

impl TableBuilder {
    pub fn row(mut self, f: impl FnOnce(RowBuilder) -> RowBuilder) -> Self {
        self.rows.push(f(RowBuilder::default()).slots);
        self
    }
}

/// Fluent construction of a [`Document`], mostly for codecs and tests.
#[derive(Debug)]
pub struct DocumentBuilder {
    doc: Document,
}

impl DocumentBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self { doc: Document::new(name) }
    }

    pub fn paragraph(self, f: impl FnOnce(ParagraphBuilder) -> ParagraphBuilder) -> Self {
        self.section_paragraph(SectionKind::Body, f)
    }

    pub fn header_paragraph(self, f: impl FnOnce(ParagraphBuilder) -> ParagraphBuilder) -> Self {
        self.section_paragraph(SectionKind::Header, f)
    }

    pub fn footer_paragraph(self, f: impl FnOnce(ParagraphBuilder) -> ParagraphBuilder) -> Self {
        self.section_paragraph(SectionKind::Footer, f)
    }

    pub fn table(mut self, f: impl FnOnce(TableBuilder) -> TableBuilder) -> Self {
        let layout = f(TableBuilder::default());
        let mut table = Table::default();
        for slots in layout.rows {
            let mut row = Vec::with_capacity(slots.len());
            for slot in slots {
                match slot {
                    CellSlot::New(paragraphs) => {
                        let ids = paragraphs.into_iter().map(|p| self.push_paragraph(p)).collect();
                        table.cells.push(TableCell { paragraphs: ids });
                        row.push(table.cells.len() - 1);
                    }
                    CellSlot::SpanPrevious => {
                        if let Some(&prev) = row.last() {
                            row.push(prev);
                        }
                    }
                }
            }
            table.rows.push(row);
        }
        self.doc.body.push(Block::Table(table));
        self
    }

    pub fn comment(mut self, comment: Comment) -> Self {
        self.doc.comments.push(comment);
        self
    }

    pub fn build(self) -> Document {
        self.doc
    }

    fn section_paragraph(
        mut self,
        kind: SectionKind,
        f: impl FnOnce(ParagraphBuilder) -> ParagraphBuilder,
    ) -> Self {
        let id = self.push_paragraph(f(ParagraphBuilder::default()));
        let block = Block::Paragraph(id);
        match kind {
            SectionKind::Header => self.doc.header.push(block),
            SectionKind::Body => self.doc.body.push(block),
            SectionKind::Footer => self.doc.footer.push(block),
        }
        self
    }

    fn push_paragraph(&mut self, builder: ParagraphBuilder) -> ParagraphId {
        let mut content = Vec::with_capacity(builder.items.len());
        for item in builder.items {
            match item {
                PendingInline::Run(run) => {
                    content.push(Inline::Run(RunId(self.doc.runs.len())));
                    self.doc.runs.push(run);
                }
                PendingInline::Marker(marker) => content.push(marker),
            }
        }
        self.doc.paragraphs.push(Paragraph { style: builder.style, content });
        ParagraphId(self.doc.paragraphs.len() - 1)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
