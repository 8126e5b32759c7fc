//! Markdown layout for assistant answers
//!
//! Answers are parsed into a small typed AST, then laid out into
//! [`RenderBlock`]s that any front end can style. The one piece of real
//! logic is section-header detection: list items and paragraphs that
//! consist only of bold text become labelled dividers instead of bullets.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag};

/// Inline content
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(String),
    Strong(Vec<Inline>),
    Emphasis(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    Code(String),
    Link { url: String, children: Vec<Inline> },
    SoftBreak,
    HardBreak,
}

impl Inline {
    fn is_strong(&self) -> bool {
        matches!(self, Inline::Strong(_))
    }

    fn is_blank(&self) -> bool {
        match self {
            Inline::Text(text) => text.trim().is_empty(),
            Inline::SoftBreak => true,
            _ => false,
        }
    }
}

/// Block content
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { level: u8, content: Vec<Inline> },
    Paragraph(Vec<Inline>),
    List { start: Option<u64>, items: Vec<ListItem> },
    BlockQuote(Vec<Block>),
    Table { head: Vec<Vec<Inline>>, rows: Vec<Vec<Vec<Inline>>> },
    CodeBlock { lang: Option<String>, code: String },
    Rule,
}

/// Tight list items hold inlines directly; loose ones wrap them in paragraphs.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemChild {
    Inline(Inline),
    Block(Block),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListItem {
    pub children: Vec<ItemChild>,
}

impl ListItem {
    fn has_nested_list(&self) -> bool {
        self.children
            .iter()
            .any(|child| matches!(child, ItemChild::Block(Block::List { .. })))
    }
}

/// True when a list item should render as a section header rather than a bullet.
///
/// Looks only at the item's immediate children: a sole bold span, a bold
/// span trailed by whitespace, or any nested list.
pub fn is_section_header(item: &ListItem) -> bool {
    if item.has_nested_list() {
        return true;
    }

    let Some(ItemChild::Inline(first)) = item.children.first() else {
        return false;
    };
    if !first.is_strong() {
        return false;
    }

    item.children[1..]
        .iter()
        .all(|child| matches!(child, ItemChild::Inline(inline) if inline.is_blank()))
}

/// True when a paragraph is nothing but one bold span.
pub fn is_header_paragraph(content: &[Inline]) -> bool {
    matches!(content, [Inline::Strong(_)])
}

/// A parsed markdown document
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn parse(markdown: &str) -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);

        let mut builder = Builder {
            events: Parser::new_ext(markdown, options),
        };
        Self {
            blocks: builder.blocks_until_end(),
        }
    }

    /// Lay the document out as visual blocks, in document order.
    pub fn layout(&self) -> Vec<RenderBlock> {
        let mut out = Vec::new();
        for block in &self.blocks {
            layout_block(block, 0, &mut out);
        }
        out
    }
}

/// Parse and lay out in one go.
pub fn render(markdown: &str) -> Vec<RenderBlock> {
    Document::parse(markdown).layout()
}

struct Builder<'a> {
    events: Parser<'a>,
}

impl<'a> Builder<'a> {
    /// Collect blocks until the enclosing tag closes (or input ends).
    fn blocks_until_end(&mut self) -> Vec<Block> {
        let mut blocks = Vec::new();
        while let Some(event) = self.events.next() {
            match event {
                Event::End(_) => break,
                Event::Start(tag) => {
                    if let Some(block) = self.block(tag) {
                        blocks.push(block);
                    }
                }
                Event::Rule => blocks.push(Block::Rule),
                Event::Html(raw) | Event::Text(raw) => {
                    blocks.push(Block::Paragraph(vec![Inline::Text(raw.trim().to_string())]));
                }
                _ => {}
            }
        }
        blocks
    }

    fn block(&mut self, tag: Tag<'a>) -> Option<Block> {
        match tag {
            Tag::Paragraph => Some(Block::Paragraph(self.inlines_until_end())),
            Tag::Heading { level, .. } => Some(Block::Heading {
                level: heading_level(level),
                content: self.inlines_until_end(),
            }),
            Tag::BlockQuote(_) => Some(Block::BlockQuote(self.blocks_until_end())),
            Tag::CodeBlock(kind) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(lang) if !lang.is_empty() => Some(lang.into_string()),
                    _ => None,
                };
                Some(Block::CodeBlock {
                    lang,
                    code: self.text_until_end(),
                })
            }
            Tag::HtmlBlock => {
                let raw = self.text_until_end();
                Some(Block::Paragraph(vec![Inline::Text(raw.trim().to_string())]))
            }
            Tag::List(start) => Some(Block::List {
                start,
                items: self.list_items(),
            }),
            Tag::Table(_) => Some(self.table()),
            _ => {
                self.skip_until_end();
                None
            }
        }
    }

    fn list_items(&mut self) -> Vec<ListItem> {
        let mut items = Vec::new();
        while let Some(event) = self.events.next() {
            match event {
                Event::Start(Tag::Item) => items.push(self.list_item()),
                Event::End(_) => break,
                _ => {}
            }
        }
        items
    }

    fn list_item(&mut self) -> ListItem {
        let mut item = ListItem::default();
        while let Some(event) = self.events.next() {
            match event {
                Event::End(_) => break,
                Event::Start(tag) if !is_inline_tag(&tag) => {
                    if let Some(block) = self.block(tag) {
                        item.children.push(ItemChild::Block(block));
                    }
                }
                Event::Rule => item.children.push(ItemChild::Block(Block::Rule)),
                event => {
                    if let Some(inline) = self.inline(event) {
                        if let (Inline::Text(next), Some(ItemChild::Inline(Inline::Text(prev)))) =
                            (&inline, item.children.last_mut())
                        {
                            prev.push_str(next);
                            continue;
                        }
                        item.children.push(ItemChild::Inline(inline));
                    }
                }
            }
        }
        item
    }

    fn table(&mut self) -> Block {
        let mut head = Vec::new();
        let mut rows = Vec::new();
        while let Some(event) = self.events.next() {
            match event {
                Event::Start(Tag::TableHead) => head = self.table_cells(),
                Event::Start(Tag::TableRow) => rows.push(self.table_cells()),
                Event::End(_) => break,
                _ => {}
            }
        }
        Block::Table { head, rows }
    }

    fn table_cells(&mut self) -> Vec<Vec<Inline>> {
        let mut cells = Vec::new();
        while let Some(event) = self.events.next() {
            match event {
                Event::Start(Tag::TableCell) => cells.push(self.inlines_until_end()),
                Event::End(_) => break,
                _ => {}
            }
        }
        cells
    }

    fn inlines_until_end(&mut self) -> Vec<Inline> {
        let mut inlines: Vec<Inline> = Vec::new();
        while let Some(event) = self.events.next() {
            if matches!(event, Event::End(_)) {
                break;
            }
            if let Some(inline) = self.inline(event) {
                // Parser splits text at special characters; keep runs whole.
                if let (Inline::Text(next), Some(Inline::Text(prev))) = (&inline, inlines.last_mut()) {
                    prev.push_str(next);
                    continue;
                }
                inlines.push(inline);
            }
        }
        inlines
    }

    fn inline(&mut self, event: Event<'a>) -> Option<Inline> {
        match event {
            Event::Text(text) | Event::InlineHtml(text) | Event::Html(text) => {
                Some(Inline::Text(text.into_string()))
            }
            Event::Code(code) | Event::InlineMath(code) | Event::DisplayMath(code) => {
                Some(Inline::Code(code.into_string()))
            }
            Event::SoftBreak => Some(Inline::SoftBreak),
            Event::HardBreak => Some(Inline::HardBreak),
            Event::Start(Tag::Strong) => Some(Inline::Strong(self.inlines_until_end())),
            Event::Start(Tag::Emphasis) => Some(Inline::Emphasis(self.inlines_until_end())),
            Event::Start(Tag::Strikethrough) => {
                Some(Inline::Strikethrough(self.inlines_until_end()))
            }
            Event::Start(Tag::Link { dest_url, .. }) | Event::Start(Tag::Image { dest_url, .. }) => {
                Some(Inline::Link {
                    url: dest_url.into_string(),
                    children: self.inlines_until_end(),
                })
            }
            Event::Start(_) => {
                self.skip_until_end();
                None
            }
            _ => None,
        }
    }

    fn text_until_end(&mut self) -> String {
        let mut text = String::new();
        while let Some(event) = self.events.next() {
            match event {
                Event::End(_) => break,
                Event::Text(chunk) | Event::Html(chunk) => text.push_str(&chunk),
                _ => {}
            }
        }
        text
    }

    fn skip_until_end(&mut self) {
        let mut depth = 0usize;
        for event in self.events.by_ref() {
            match event {
                Event::Start(_) => depth += 1,
                Event::End(_) if depth == 0 => break,
                Event::End(_) => depth -= 1,
                _ => {}
            }
        }
    }
}

fn is_inline_tag(tag: &Tag) -> bool {
    matches!(
        tag,
        Tag::Strong | Tag::Emphasis | Tag::Strikethrough | Tag::Link { .. } | Tag::Image { .. }
    )
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InlineStyle {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub code: bool,
    pub link: bool,
}

/// A run of text with one style. Hard line breaks arrive as `"\n"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledSpan {
    pub text: String,
    pub style: InlineStyle,
}

/// A visual block ready for styling by a front end
#[derive(Debug, Clone, PartialEq)]
pub enum RenderBlock {
    /// Pill label. `divider` is false for the first block of a document.
    SectionHeader { label: Vec<StyledSpan>, divider: bool },
    Heading { level: u8, spans: Vec<StyledSpan> },
    Paragraph { indent: usize, spans: Vec<StyledSpan> },
    /// `marker` is `"1."` style for ordered lists, empty for unordered ones.
    Bullet { depth: usize, marker: String, spans: Vec<StyledSpan> },
    Quote { blocks: Vec<RenderBlock> },
    Table { header: Vec<Vec<StyledSpan>>, rows: Vec<Vec<Vec<StyledSpan>>> },
    Code { lang: Option<String>, lines: Vec<String> },
    Rule,
}

impl RenderBlock {
    /// Plain text of the block, without markers. Mostly useful for tests and logs.
    pub fn plain_text(&self) -> String {
        fn join(spans: &[StyledSpan]) -> String {
            spans.iter().map(|s| s.text.as_str()).collect()
        }
        match self {
            RenderBlock::SectionHeader { label: spans, .. }
            | RenderBlock::Heading { spans, .. }
            | RenderBlock::Paragraph { spans, .. }
            | RenderBlock::Bullet { spans, .. } => join(spans),
            RenderBlock::Quote { blocks } => blocks
                .iter()
                .map(RenderBlock::plain_text)
                .collect::<Vec<_>>()
                .join("\n"),
            RenderBlock::Table { header, rows } => std::iter::once(header)
                .chain(rows.iter())
                .map(|row| row.iter().map(|c| join(c)).collect::<Vec<_>>().join(" | "))
                .collect::<Vec<_>>()
                .join("\n"),
            RenderBlock::Code { lines, .. } => lines.join("\n"),
            RenderBlock::Rule => String::new(),
        }
    }
}

fn spans_of(inlines: &[Inline]) -> Vec<StyledSpan> {
    let mut out = Vec::new();
    collect_spans(inlines, InlineStyle::default(), &mut out);
    out
}

fn collect_spans(inlines: &[Inline], style: InlineStyle, out: &mut Vec<StyledSpan>) {
    for inline in inlines {
        match inline {
            Inline::Text(text) => push_span(out, text, style),
            Inline::Code(code) => push_span(out, code, InlineStyle { code: true, ..style }),
            Inline::SoftBreak => push_span(out, " ", style),
            Inline::HardBreak => push_span(out, "\n", style),
            Inline::Strong(children) => {
                collect_spans(children, InlineStyle { bold: true, ..style }, out)
            }
            Inline::Emphasis(children) => {
                collect_spans(children, InlineStyle { italic: true, ..style }, out)
            }
            Inline::Strikethrough(children) => {
                collect_spans(children, InlineStyle { strikethrough: true, ..style }, out)
            }
            Inline::Link { children, .. } => {
                collect_spans(children, InlineStyle { link: true, ..style }, out)
            }
        }
    }
}

fn push_span(out: &mut Vec<StyledSpan>, text: &str, style: InlineStyle) {
    if text.is_empty() {
        return;
    }
    if let Some(last) = out.last_mut() {
        if last.style == style {
            last.text.push_str(text);
            return;
        }
    }
    out.push(StyledSpan {
        text: text.to_string(),
        style,
    });
}

fn layout_block(block: &Block, depth: usize, out: &mut Vec<RenderBlock>) {
    match block {
        Block::Paragraph(content) if is_header_paragraph(content) => {
            let divider = !out.is_empty();
            out.push(RenderBlock::SectionHeader {
                label: spans_of(content),
                divider,
            });
        }
        Block::Paragraph(content) => out.push(RenderBlock::Paragraph {
            indent: depth,
            spans: spans_of(content),
        }),
        Block::Heading { level, content } => out.push(RenderBlock::Heading {
            level: *level,
            spans: spans_of(content),
        }),
        Block::List { start, items } => {
            for (i, item) in items.iter().enumerate() {
                let marker = start.map(|n| format!("{}.", n + i as u64)).unwrap_or_default();
                layout_item(item, depth, &marker, out);
            }
        }
        Block::BlockQuote(blocks) => {
            let mut inner = Vec::new();
            for block in blocks {
                layout_block(block, 0, &mut inner);
            }
            // A pill opening the quote still follows whatever came before it.
            if let Some(RenderBlock::SectionHeader { divider, .. }) = inner.first_mut() {
                *divider = !out.is_empty();
            }
            out.push(RenderBlock::Quote { blocks: inner });
        }
        Block::Table { head, rows } => out.push(RenderBlock::Table {
            header: head.iter().map(|cell| spans_of(cell)).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|cell| spans_of(cell)).collect())
                .collect(),
        }),
        Block::CodeBlock { lang, code } => out.push(RenderBlock::Code {
            lang: lang.clone(),
            lines: code.trim_end_matches('\n').lines().map(str::to_string).collect(),
        }),
        Block::Rule => out.push(RenderBlock::Rule),
    }
}

/// Emits the item's first line (pill or bullet), then any further content
/// indented beneath it, in original order.
fn layout_item(item: &ListItem, depth: usize, marker: &str, out: &mut Vec<RenderBlock>) {
    let header = is_section_header(item);
    let mut lead_done = false;
    let mut run: Vec<Inline> = Vec::new();

    for child in &item.children {
        match child {
            ItemChild::Inline(inline) => run.push(inline.clone()),
            ItemChild::Block(block) => {
                flush_run(&mut run, header, &mut lead_done, depth, marker, out);
                match block {
                    Block::Paragraph(content) if !lead_done => {
                        let pill = header || is_header_paragraph(content);
                        emit_line(spans_of(content), pill, &mut lead_done, depth, marker, out);
                    }
                    other => layout_block(other, depth + 1, out),
                }
            }
        }
    }
    flush_run(&mut run, header, &mut lead_done, depth, marker, out);

    if !lead_done && !header {
        out.push(RenderBlock::Bullet {
            depth,
            marker: marker.to_string(),
            spans: Vec::new(),
        });
    }
}

fn flush_run(
    run: &mut Vec<Inline>,
    header: bool,
    lead_done: &mut bool,
    depth: usize,
    marker: &str,
    out: &mut Vec<RenderBlock>,
) {
    if run.iter().all(Inline::is_blank) {
        run.clear();
        return;
    }
    let mut spans = spans_of(run);
    run.clear();
    if let Some(last) = spans.last_mut() {
        let trimmed = last.text.trim_end().len();
        last.text.truncate(trimmed);
    }
    emit_line(spans, header, lead_done, depth, marker, out);
}

fn emit_line(
    spans: Vec<StyledSpan>,
    header: bool,
    lead_done: &mut bool,
    depth: usize,
    marker: &str,
    out: &mut Vec<RenderBlock>,
) {
    if *lead_done {
        out.push(RenderBlock::Paragraph {
            indent: depth + 1,
            spans,
        });
        return;
    }
    *lead_done = true;
    if header {
        let divider = !out.is_empty();
        out.push(RenderBlock::SectionHeader {
            label: spans,
            divider,
        });
    } else {
        out.push(RenderBlock::Bullet {
            depth,
            marker: marker.to_string(),
            spans,
        });
    }
}
