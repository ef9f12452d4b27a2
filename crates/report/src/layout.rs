//! Pagination: places a [`Document`]'s blocks onto fixed-size pages.
//!
//! Text is measured with Courier metrics, so every glyph advances the same width. Blocks are
//! first broken into atomic horizontal strips (a wrapped text line, a table row, a set of
//! columns) and the strips are then flowed onto pages, honouring forced page breaks,
//! keep-together stacks and repeated table headers. Coordinates are points from the top-left
//! corner of the page; `y` grows downwards.

use crate::compose::footer_blocks;
use crate::document::{
    Align, Block, Boxed, Cell, ColumnWidth, Columns, Document, ImageBlock, PageBreak, Paragraph,
    Rgb, Rule, Span, Table, TextStyle,
};
use crate::image;

/// Glyph advance as a fraction of the font size.
pub const CHAR_ADVANCE: f32 = 0.6;
/// Line height as a multiple of the font size.
pub const LINE_HEIGHT: f32 = 1.2;

const CELL_PADDING_X: f32 = 4.0;
const CELL_PADDING_Y: f32 = 2.0;
const FIT_TOLERANCE: f32 = 0.01;

/// A positioned drawing instruction.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    /// `y` is the text baseline.
    Text {
        x: f32,
        y: f32,
        text: String,
        style: TextStyle,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        thickness: f32,
        color: Rgb,
    },
    /// Outline only.
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        thickness: f32,
        color: Rgb,
    },
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        data_url: String,
    },
}

impl DrawOp {
    fn shifted(self, dy: f32) -> Self {
        match self {
            DrawOp::Text { x, y, text, style } => DrawOp::Text {
                x,
                y: y + dy,
                text,
                style,
            },
            DrawOp::Line {
                x1,
                y1,
                x2,
                y2,
                thickness,
                color,
            } => DrawOp::Line {
                x1,
                y1: y1 + dy,
                x2,
                y2: y2 + dy,
                thickness,
                color,
            },
            DrawOp::Rect {
                x,
                y,
                width,
                height,
                thickness,
                color,
            } => DrawOp::Rect {
                x,
                y: y + dy,
                width,
                height,
                thickness,
                color,
            },
            DrawOp::Image {
                x,
                y,
                width,
                height,
                data_url,
            } => DrawOp::Image {
                x,
                y: y + dy,
                width,
                height,
                data_url,
            },
        }
    }
}

/// One laid-out page, numbered from 1.
#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    pub number: usize,
    pub ops: Vec<DrawOp>,
}

impl Page {
    /// Text of every text op, in drawing order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

/// Width of `text` set in Courier at `size`.
pub fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * CHAR_ADVANCE
}

/// Lays the document out into pages, with the header and the page-numbered footer drawn on
/// each one.
pub fn paginate(doc: &Document) -> Vec<Page> {
    let margins = doc.page_margins;
    let content_width = doc.page_width - margins.left - margins.right;

    let hm = doc.header_margin;
    let header = flatten(layout_blocks(
        &doc.header,
        hm.left,
        doc.page_width - hm.left - hm.right,
    ));
    // The body never starts above the end of the header.
    let body_top = margins.top.max(hm.top + header.height);
    if body_top > margins.top {
        tracing::debug!(
            "header ends at {:.1}pt, below the {:.1}pt top margin",
            hm.top + header.height,
            margins.top
        );
    }

    let mut paginator = Paginator::new(body_top, doc.page_height - margins.bottom);
    for item in layout_blocks(&doc.content, margins.left, content_width) {
        paginator.place(item);
    }
    let bodies = paginator.pages;
    let count = bodies.len();
    tracing::debug!("laid out {} page(s) for {:?}", count, doc.title);

    let fm = doc.footer_margin;
    let footer_top = doc.page_height - margins.bottom + fm.top;

    bodies
        .into_iter()
        .enumerate()
        .map(|(index, body)| {
            let number = index + 1;
            let footer = flatten(layout_blocks(
                &footer_blocks(&doc.footer, number, count),
                fm.left,
                doc.page_width - fm.left - fm.right,
            ));

            let mut ops = Vec::with_capacity(header.ops.len() + body.len() + footer.ops.len());
            ops.extend(header.ops.iter().cloned().map(|op| op.shifted(hm.top)));
            ops.extend(body);
            ops.extend(footer.ops.into_iter().map(|op| op.shifted(footer_top)));
            Page { number, ops }
        })
        .collect()
}

// ===== STRIPS =====

/// An unbreakable horizontal band. Op `y` values are relative to the top of the band.
#[derive(Clone, Debug, Default)]
struct Strip {
    height: f32,
    ops: Vec<DrawOp>,
}

impl Strip {
    fn blank(height: f32) -> Self {
        Self {
            height,
            ops: Vec::new(),
        }
    }

    fn append(&mut self, other: Strip) {
        let dy = self.height;
        self.ops
            .extend(other.ops.into_iter().map(|op| op.shifted(dy)));
        self.height += other.height;
    }
}

enum Item {
    Strip(Strip),
    /// Moves to a fresh page as a whole when it would otherwise be split.
    Keep(Vec<Item>),
    /// Header strips are repeated on each page the rows continue onto.
    Table {
        header: Vec<Strip>,
        rows: Vec<Strip>,
    },
    PageBreak,
}

impl Item {
    fn height(&self) -> f32 {
        match self {
            Item::Strip(s) => s.height,
            Item::Keep(items) => items.iter().map(Item::height).sum(),
            Item::Table { header, rows } => header.iter().chain(rows).map(|s| s.height).sum(),
            Item::PageBreak => 0.0,
        }
    }
}

/// Stacks items into one strip, ignoring page boundaries.
fn flatten(items: Vec<Item>) -> Strip {
    let mut strip = Strip::default();
    for item in items {
        match item {
            Item::Strip(s) => strip.append(s),
            Item::Keep(inner) => strip.append(flatten(inner)),
            Item::Table { header, rows } => header
                .into_iter()
                .chain(rows)
                .for_each(|s| strip.append(s)),
            Item::PageBreak => {}
        }
    }
    strip
}

fn layout_blocks(blocks: &[Block], x: f32, width: f32) -> Vec<Item> {
    let mut items = Vec::new();
    for block in blocks {
        layout_block(block, x, width, &mut items);
    }
    items
}

fn layout_block(block: &Block, x: f32, width: f32, out: &mut Vec<Item>) {
    match block {
        Block::Text(p) => out.extend(paragraph_strips(p, x, width).into_iter().map(Item::Strip)),
        Block::Stack(stack) => {
            let m = stack.margin;
            let mut inner = Vec::new();
            if m.top > 0.0 {
                inner.push(Item::Strip(Strip::blank(m.top)));
            }
            inner.extend(layout_blocks(
                &stack.blocks,
                x + m.left,
                width - m.left - m.right,
            ));
            if m.bottom > 0.0 {
                inner.push(Item::Strip(Strip::blank(m.bottom)));
            }

            if stack.page_break == Some(PageBreak::Before) {
                out.push(Item::PageBreak);
            }
            if stack.keep_together {
                out.push(Item::Keep(inner));
            } else {
                out.extend(inner);
            }
            if stack.page_break == Some(PageBreak::After) {
                out.push(Item::PageBreak);
            }
        }
        Block::Table(table) => out.push(table_item(table, x, width)),
        Block::Columns(columns) => out.push(Item::Strip(columns_strip(columns, x, width))),
        Block::Boxed(boxed) => out.push(Item::Strip(boxed_strip(boxed, x, width))),
        Block::Rule(rule) => out.push(Item::Strip(rule_strip(rule, x))),
        Block::Image(img) => out.push(Item::Strip(image_strip(img, x, width))),
        Block::Spacer { height } => out.push(Item::Strip(Strip::blank(*height))),
    }
}

// ===== TEXT =====

#[derive(Debug, Default)]
struct Line {
    segments: Vec<Span>,
    width: f32,
    size: f32,
}

impl Line {
    fn starting(size: f32) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    fn push(&mut self, text: &str, style: TextStyle) {
        self.width += text_width(text, style.size);
        self.size = self.size.max(style.size);
        match self.segments.last_mut() {
            Some(last) if last.style == style => last.text.push_str(text),
            _ => self.segments.push(Span::new(text, style)),
        }
    }

    /// Drops trailing whitespace so aligned lines line up on their last glyph.
    fn finish(mut self) -> Self {
        while let Some(last) = self.segments.last_mut() {
            let trimmed = last.text.trim_end().len();
            if trimmed == last.text.len() {
                break;
            }
            last.text.truncate(trimmed);
            if last.text.is_empty() {
                self.segments.pop();
            }
        }
        self.width = self
            .segments
            .iter()
            .map(|s| text_width(&s.text, s.style.size))
            .sum();
        self
    }
}

/// Splits text into alternating runs of whitespace and non-whitespace.
fn tokens(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_space = None;
    for (i, c) in text.char_indices() {
        let space = c.is_whitespace();
        if in_space.is_some_and(|s| s != space) {
            out.push(&text[start..i]);
            start = i;
        }
        in_space = Some(space);
    }
    if start < text.len() {
        out.push(&text[start..]);
    }
    out
}

/// Greedy word wrap. `\n` always breaks; words wider than the line are split by character.
fn wrap(spans: &[Span], width: f32, no_wrap: bool) -> Vec<Line> {
    let first_size = spans
        .first()
        .map_or(TextStyle::default().size, |s| s.style.size);
    let mut lines = Vec::new();
    let mut current = Line::starting(first_size);

    for span in spans {
        let style = span.style;
        for (n, hard) in span.text.split('\n').enumerate() {
            if n > 0 {
                lines.push(std::mem::replace(&mut current, Line::starting(style.size)).finish());
            }
            current.size = current.size.max(style.size);

            for token in tokens(hard) {
                let token_width = text_width(token, style.size);
                let overflows = current.width + token_width > width + FIT_TOLERANCE;
                if no_wrap || !overflows {
                    current.push(token, style);
                    continue;
                }
                if token.trim().is_empty() {
                    // whitespace at a wrap point is dropped
                    continue;
                }
                if current.width > 0.0 {
                    lines.push(
                        std::mem::replace(&mut current, Line::starting(style.size)).finish(),
                    );
                }
                if token_width <= width + FIT_TOLERANCE {
                    current.push(token, style);
                    continue;
                }

                let advance = style.size * CHAR_ADVANCE;
                let per_line = (((width + FIT_TOLERANCE) / advance).floor() as usize).max(1);
                let chars: Vec<char> = token.chars().collect();
                let mut chunks = chars.chunks(per_line).peekable();
                while let Some(chunk) = chunks.next() {
                    let piece: String = chunk.iter().collect();
                    current.push(&piece, style);
                    if chunks.peek().is_some() {
                        lines.push(
                            std::mem::replace(&mut current, Line::starting(style.size)).finish(),
                        );
                    }
                }
            }
        }
    }
    lines.push(current.finish());
    lines
}

/// Widest line when nothing wraps.
fn natural_text_width(p: &Paragraph) -> f32 {
    wrap(&p.spans, f32::INFINITY, true)
        .iter()
        .map(|l| l.width)
        .fold(0.0, f32::max)
}

fn paragraph_strips(p: &Paragraph, x: f32, width: f32) -> Vec<Strip> {
    let m = p.margin;
    let mut strips = Vec::new();
    if m.top > 0.0 {
        strips.push(Strip::blank(m.top));
    }

    // empty text contributes only its margins
    if p.spans.iter().any(|s| !s.text.is_empty()) {
        let left = x + m.left;
        let inner = (width - m.left - m.right).max(0.0);
        for line in wrap(&p.spans, inner, p.no_wrap) {
            strips.push(line_strip(&line, left, inner, p.align));
        }
    }

    if m.bottom > 0.0 {
        strips.push(Strip::blank(m.bottom));
    }
    strips
}

fn line_strip(line: &Line, left: f32, width: f32, align: Align) -> Strip {
    let height = line.size * LINE_HEIGHT;
    let baseline = height - line.size * 0.3;
    let mut cursor = match align {
        Align::Left => left,
        Align::Center => left + (width - line.width) / 2.0,
        Align::Right => left + width - line.width,
    };

    let mut ops = Vec::new();
    for segment in &line.segments {
        let advance = text_width(&segment.text, segment.style.size);
        ops.push(DrawOp::Text {
            x: cursor,
            y: baseline,
            text: segment.text.clone(),
            style: segment.style,
        });
        if segment.style.underline && !segment.text.trim().is_empty() {
            let y = baseline + segment.style.size * 0.15;
            ops.push(DrawOp::Line {
                x1: cursor,
                y1: y,
                x2: cursor + advance,
                y2: y,
                thickness: (segment.style.size * 0.05).max(0.4),
                color: segment.style.color,
            });
        }
        cursor += advance;
    }
    Strip { height, ops }
}

// ===== TABLES & COLUMNS =====

/// Natural (unwrapped) width of a block, used by `Auto` columns.
fn natural_width(block: &Block) -> f32 {
    match block {
        Block::Text(p) => p.margin.left + p.margin.right + natural_text_width(p),
        Block::Stack(s) => {
            s.margin.left + s.margin.right + s.blocks.iter().map(natural_width).fold(0.0, f32::max)
        }
        Block::Columns(c) => {
            let gaps = c.gap * c.columns.len().saturating_sub(1) as f32;
            gaps + c
                .columns
                .iter()
                .map(|col| col.blocks.iter().map(natural_width).fold(0.0, f32::max))
                .sum::<f32>()
        }
        Block::Rule(r) => r.margin.left + r.margin.right + r.length,
        Block::Image(i) => i.margin.left + i.margin.right + i.width,
        Block::Table(_) | Block::Boxed(_) | Block::Spacer { .. } => 0.0,
    }
}

/// Resolves declared widths against the available width. `Star` columns share what the
/// others leave over.
fn resolve_widths(widths: &[ColumnWidth], natural: &[f32], available: f32) -> Vec<f32> {
    let mut resolved: Vec<Option<f32>> = widths
        .iter()
        .zip(natural)
        .map(|(w, n)| match w {
            ColumnWidth::Percent(p) => Some(available * p / 100.0),
            ColumnWidth::Auto => Some(n.min(available)),
            ColumnWidth::Star => None,
        })
        .collect();
    let used: f32 = resolved.iter().flatten().sum();
    let stars = resolved.iter().filter(|w| w.is_none()).count();
    let share = if stars > 0 {
        (available - used).max(0.0) / stars as f32
    } else {
        0.0
    };
    resolved
        .iter_mut()
        .map(|w| w.unwrap_or(share))
        .collect()
}

fn table_item(table: &Table, x: f32, width: f32) -> Item {
    let columns = table.widths.len();
    let mut natural = vec![0.0_f32; columns];
    for row in &table.rows {
        let mut col = 0;
        for cell in row {
            if col >= columns {
                break;
            }
            if cell.col_span == 1 {
                let w = cell.blocks.iter().map(natural_width).fold(0.0, f32::max);
                natural[col] = natural[col].max(w + 2.0 * CELL_PADDING_X);
            }
            col += cell.col_span;
        }
    }
    let widths = resolve_widths(&table.widths, &natural, width);

    let mut strips: Vec<Strip> = table
        .rows
        .iter()
        .map(|row| row_strip(row, &widths, x))
        .collect();
    let rows = strips.split_off(table.header_rows.min(strips.len()));
    Item::Table {
        header: strips,
        rows,
    }
}

fn row_strip(row: &[Cell], widths: &[f32], x: f32) -> Strip {
    let mut col = 0;
    let mut left = x;
    let mut height: f32 = 0.0;
    let mut ops = Vec::new();

    for cell in row {
        if col >= widths.len() {
            break;
        }
        let span = cell.col_span.min(widths.len() - col);
        let cell_width: f32 = widths[col..col + span].iter().sum();
        let content = flatten(layout_blocks(
            &cell.blocks,
            left + CELL_PADDING_X,
            (cell_width - 2.0 * CELL_PADDING_X).max(0.0),
        ));
        height = height.max(content.height + 2.0 * CELL_PADDING_Y);
        ops.extend(
            content
                .ops
                .into_iter()
                .map(|op| op.shifted(CELL_PADDING_Y)),
        );
        left += cell_width;
        col += span;
    }
    Strip { height, ops }
}

fn columns_strip(columns: &Columns, x: f32, width: f32) -> Strip {
    let m = columns.margin;
    let gaps = columns.gap * columns.columns.len().saturating_sub(1) as f32;
    let available = (width - m.left - m.right - gaps).max(0.0);
    let declared: Vec<ColumnWidth> = columns.columns.iter().map(|c| c.width).collect();
    let natural: Vec<f32> = columns
        .columns
        .iter()
        .map(|c| c.blocks.iter().map(natural_width).fold(0.0, f32::max))
        .collect();
    let widths = resolve_widths(&declared, &natural, available);

    let mut strip = Strip::blank(m.top);
    let mut left = x + m.left;
    let mut height: f32 = 0.0;
    for (column, w) in columns.columns.iter().zip(widths) {
        let content = flatten(layout_blocks(&column.blocks, left, w));
        height = height.max(content.height);
        strip
            .ops
            .extend(content.ops.into_iter().map(|op| op.shifted(m.top)));
        left += w + columns.gap;
    }
    strip.height += height + m.bottom;
    strip
}

fn boxed_strip(boxed: &Boxed, x: f32, width: f32) -> Strip {
    let m = boxed.margin;
    let outer_x = x + m.left;
    let outer_width = width - m.left - m.right;
    let half = (outer_width - 2.0 * CELL_PADDING_X) / 2.0;

    let mut height: f32 = 0.0;
    let mut ops = Vec::new();
    for (n, blocks) in [&boxed.left, &boxed.right].into_iter().enumerate() {
        let left = outer_x + CELL_PADDING_X + n as f32 * half + CELL_PADDING_X;
        let content = flatten(layout_blocks(
            blocks,
            left,
            (half - 2.0 * CELL_PADDING_X).max(0.0),
        ));
        height = height.max(content.height);
        let dy = m.top + 2.0 * CELL_PADDING_Y;
        ops.extend(content.ops.into_iter().map(|op| op.shifted(dy)));
    }

    let box_height = height + 4.0 * CELL_PADDING_Y;
    ops.push(DrawOp::Rect {
        x: outer_x,
        y: m.top,
        width: outer_width,
        height: box_height,
        thickness: boxed.border,
        color: boxed.border_color,
    });
    Strip {
        height: m.top + box_height + m.bottom,
        ops,
    }
}

fn rule_strip(rule: &Rule, x: f32) -> Strip {
    let m = rule.margin;
    let y = m.top + rule.thickness / 2.0;
    Strip {
        height: m.top + rule.thickness + m.bottom,
        ops: vec![DrawOp::Line {
            x1: x + m.left,
            y1: y,
            x2: x + m.left + rule.length,
            y2: y,
            thickness: rule.thickness,
            color: rule.color,
        }],
    }
}

fn image_strip(img: &ImageBlock, x: f32, width: f32) -> Strip {
    let (px_width, px_height) = match image::dimensions(&img.data_url) {
        Ok((w, h)) if w > 0 && h > 0 => (w, h),
        Ok(_) => {
            tracing::warn!("skipping empty image");
            return Strip::default();
        }
        Err(e) => {
            tracing::warn!("skipping unreadable image: {e}");
            return Strip::default();
        }
    };

    let m = img.margin;
    let aspect = px_height as f32 / px_width as f32;
    let (draw_width, draw_height) = match img.max_height {
        Some(max) if img.width * aspect > max => (max / aspect, max),
        _ => (img.width, img.width * aspect),
    };
    let inner = width - m.left - m.right;
    let left = match img.align {
        Align::Left => x + m.left,
        Align::Center => x + m.left + (inner - draw_width) / 2.0,
        Align::Right => x + m.left + inner - draw_width,
    };

    Strip {
        height: m.top + draw_height + m.bottom,
        ops: vec![DrawOp::Image {
            x: left,
            y: m.top,
            width: draw_width,
            height: draw_height,
            data_url: img.data_url.clone(),
        }],
    }
}

// ===== PAGINATION =====

struct Paginator {
    top: f32,
    bottom: f32,
    cursor: f32,
    pages: Vec<Vec<DrawOp>>,
}

impl Paginator {
    fn new(top: f32, bottom: f32) -> Self {
        Self {
            top,
            bottom,
            cursor: top,
            pages: vec![Vec::new()],
        }
    }

    fn at_top(&self) -> bool {
        self.cursor <= self.top
    }

    fn fits(&self, height: f32) -> bool {
        self.cursor + height <= self.bottom + FIT_TOLERANCE
    }

    fn new_page(&mut self) {
        self.pages.push(Vec::new());
        self.cursor = self.top;
    }

    fn place_strip(&mut self, strip: Strip) {
        if !self.fits(strip.height) && !self.at_top() {
            self.new_page();
        }
        let dy = self.cursor;
        if let Some(page) = self.pages.last_mut() {
            page.extend(strip.ops.into_iter().map(|op| op.shifted(dy)));
        }
        self.cursor += strip.height;
    }

    fn place(&mut self, item: Item) {
        match item {
            Item::Strip(strip) => self.place_strip(strip),
            Item::Keep(items) => {
                let height: f32 = items.iter().map(Item::height).sum();
                let page_height = self.bottom - self.top;
                if !self.fits(height) && !self.at_top() && height <= page_height {
                    tracing::debug!("moving {height:.1}pt block to page {}", self.pages.len() + 1);
                    self.new_page();
                }
                for item in items {
                    self.place(item);
                }
            }
            Item::Table { header, rows } => {
                let header_height: f32 = header.iter().map(|s| s.height).sum();
                let first_row = rows.first().map_or(0.0, |s| s.height);
                if !self.fits(header_height + first_row) && !self.at_top() {
                    self.new_page();
                }
                header.iter().cloned().for_each(|s| self.place_strip(s));
                for row in rows {
                    if !self.fits(row.height) && !self.at_top() {
                        self.new_page();
                        header.iter().cloned().for_each(|s| self.place_strip(s));
                    }
                    self.place_strip(row);
                }
            }
            Item::PageBreak => {
                if !self.at_top() {
                    self.new_page();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::{
        compose, ReportOptions, CORRELATE_NOTE, END_OF_REPORT, SIGNATURE_MAX_HEIGHT,
    };
    use crate::document::{FooterData, Margin, Stack, A4_HEIGHT, A4_WIDTH};
    use pathlab_core::models::{Gender, Group, GroupDetails, LabDetails, Parameter, Patient, Subgroup};
    use pathlab_core::{NonEmptyText, RecordId, ReportData, Taxonomy};

    fn id(s: &str) -> RecordId {
        RecordId::parse(s).unwrap()
    }

    fn text(s: &str) -> NonEmptyText {
        NonEmptyText::new(s).unwrap()
    }

    fn document(content: Vec<Block>) -> Document {
        Document {
            title: "Test".into(),
            page_width: A4_WIDTH,
            page_height: A4_HEIGHT,
            page_margins: Margin::new(20.0, 150.0, 20.0, 105.0),
            header_margin: Margin::new(20.0, 20.0, 20.0, 0.0),
            footer_margin: Margin::new(40.0, 0.0, 40.0, 40.0),
            header: vec![Block::text("Header", TextStyle::default())],
            footer: FooterData::default(),
            content,
        }
    }

    fn style() -> TextStyle {
        TextStyle::default()
    }

    #[test]
    fn wraps_on_words_and_hard_breaks() {
        // 10pt Courier: 6pt per glyph, so 60pt holds ten glyphs
        let spans = vec![Span::new("alpha beta gamma\ndelta", style())];
        let lines: Vec<String> = wrap(&spans, 60.0, false)
            .iter()
            .map(|l| l.segments.iter().map(|s| s.text.as_str()).collect())
            .collect();
        assert_eq!(lines, vec!["alpha beta", "gamma", "delta"]);
    }

    #[test]
    fn splits_words_longer_than_the_line() {
        let spans = vec![Span::new("abcdefghijklmnop", style())];
        let lines = wrap(&spans, 60.0, false);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].segments[0].text, "abcdefghij");
    }

    #[test]
    fn no_wrap_keeps_one_line() {
        let spans = vec![Span::new("12–15 (g/dL) and more", style())];
        assert_eq!(wrap(&spans, 30.0, true).len(), 1);
    }

    #[test]
    fn right_alignment_ends_at_the_edge() {
        let p = Paragraph::new("abc", style()).align(Align::Right);
        let strips = paragraph_strips(&p, 0.0, 100.0);
        let DrawOp::Text { x, .. } = strips[0].ops[0] else {
            panic!("text op")
        };
        assert!((x - 82.0).abs() < 0.001);
    }

    #[test]
    fn empty_text_only_takes_its_margins() {
        let p = Paragraph::new("", style()).margin(Margin::vertical(20.0, 0.0));
        let total: f32 = paragraph_strips(&p, 0.0, 100.0)
            .iter()
            .map(|s| s.height)
            .sum();
        assert_eq!(total, 20.0);
    }

    #[test]
    fn star_columns_share_the_rest() {
        let widths = resolve_widths(
            &[ColumnWidth::Star, ColumnWidth::Auto],
            &[0.0, 40.0],
            200.0,
        );
        assert_eq!(widths, vec![160.0, 40.0]);
    }

    #[test]
    fn overflow_starts_new_pages_with_header_and_footer() {
        let lines: Vec<Block> = (0..100)
            .map(|n| Block::text(format!("line {n}"), style()))
            .collect();
        let pages = paginate(&document(lines));
        assert!(pages.len() > 1);
        for page in &pages {
            assert_eq!(page.texts().next(), Some("Header"));
            let footer = format!("Page {} of {}", page.number, pages.len());
            assert!(page.texts().any(|t| t == footer));
        }
        let last = pages.last().unwrap();
        assert!(last.texts().any(|t| t == CORRELATE_NOTE));
        assert!(!pages[0].texts().any(|t| t == CORRELATE_NOTE));
    }

    #[test]
    fn tall_header_pushes_the_body_down() {
        let mut doc = document(vec![Block::text("first body line", style())]);
        doc.header = (0..20)
            .map(|n| Block::text(format!("header {n}"), style()))
            .collect();
        let pages = paginate(&doc);
        let header_bottom = doc.header_margin.top + 20.0 * 12.0;
        let body_y = pages[0]
            .ops
            .iter()
            .find_map(|op| match op {
                DrawOp::Text { text, y, .. } if text == "first body line" => Some(*y),
                _ => None,
            })
            .unwrap();
        assert!(body_y > header_bottom, "body at {body_y}, header ends at {header_bottom}");
    }

    #[test]
    fn short_header_keeps_the_top_margin() {
        let pages = paginate(&document(vec![Block::text("first body line", style())]));
        let body_y = pages[0]
            .ops
            .iter()
            .find_map(|op| match op {
                DrawOp::Text { text, y, .. } if text == "first body line" => Some(*y),
                _ => None,
            })
            .unwrap();
        assert!(body_y > 150.0 && body_y < 150.0 + 12.0);
    }

    #[test]
    fn tall_signature_is_capped_inside_the_page() {
        let mut doc = document(vec![Block::text("body", style())]);
        doc.footer.signature = Some(crate::image::tests::png_data_url(20, 400));
        let pages = paginate(&doc);
        let (y, height) = pages[0]
            .ops
            .iter()
            .find_map(|op| match op {
                DrawOp::Image { y, height, .. } => Some((*y, *height)),
                _ => None,
            })
            .unwrap();
        assert!((height - SIGNATURE_MAX_HEIGHT).abs() < 0.001);
        assert!(y + height < doc.page_height - doc.footer_margin.bottom);
        for op in &pages[0].ops {
            if let DrawOp::Text { y, .. } = op {
                assert!(*y < doc.page_height);
            }
        }
    }

    #[test]
    fn page_breaks_skip_empty_pages() {
        let content = vec![
            Stack::new(vec![Block::text("one", style())])
                .page_break(PageBreak::Before)
                .into(),
            Stack::default().page_break(PageBreak::After).into(),
            Stack::new(vec![Block::text("two", style())])
                .page_break(PageBreak::Before)
                .into(),
        ];
        let pages = paginate(&document(content));
        assert_eq!(pages.len(), 2);
        assert!(pages[0].texts().any(|t| t == "one"));
        assert!(pages[1].texts().any(|t| t == "two"));
    }

    #[test]
    fn keep_together_moves_whole_stack() {
        let mut content: Vec<Block> = vec![Block::Spacer { height: 500.0 }];
        let kept: Vec<Block> = (0..10)
            .map(|n| Block::text(format!("kept {n}"), style()))
            .collect();
        content.push(Stack::new(kept).keep_together().into());
        let pages = paginate(&document(content));
        assert_eq!(pages.len(), 2);
        assert!(!pages[0].texts().any(|t| t.starts_with("kept")));
        assert_eq!(pages[1].texts().filter(|t| t.starts_with("kept")).count(), 10);
    }

    #[test]
    fn long_tables_repeat_their_header() {
        let rows: Vec<Vec<Cell>> = std::iter::once(vec![Cell::new(Paragraph::new("HEAD", style()))])
            .chain((0..80).map(|n| vec![Cell::new(Paragraph::new(format!("row {n}"), style()))]))
            .collect();
        let table = Table {
            widths: vec![ColumnWidth::Star],
            header_rows: 1,
            rows,
        };
        let pages = paginate(&document(vec![table.into()]));
        assert!(pages.len() > 1);
        for page in &pages {
            assert_eq!(page.texts().filter(|t| *t == "HEAD").count(), 1);
        }
    }

    #[test]
    fn underlines_become_lines() {
        let p = Paragraph::new("10", style().underline());
        let strips = paragraph_strips(&p, 0.0, 100.0);
        assert!(strips[0]
            .ops
            .iter()
            .any(|op| matches!(op, DrawOp::Line { .. })));
    }

    #[test]
    fn signature_image_is_sized_by_width() {
        let img = ImageBlock {
            data_url: crate::image::tests::png_data_url(120, 40),
            width: 60.0,
            max_height: None,
            align: Align::Right,
            margin: Margin::ZERO,
        };
        let strip = image_strip(&img, 0.0, 200.0);
        assert_eq!(strip.height, 20.0);
        assert!(matches!(
            strip.ops[0],
            DrawOp::Image { x, width, .. } if x == 140.0 && width == 60.0
        ));

        let broken = ImageBlock {
            data_url: "data:image/png;base64,AAAA".into(),
            ..img
        };
        assert_eq!(image_strip(&broken, 0.0, 200.0).height, 0.0);
    }

    #[test]
    fn composed_report_isolates_large_groups() {
        let mut groups = Vec::new();
        let mut results = Vec::new();
        for (gid, count) in [("small", 2), ("large", 12)] {
            let mut g = Group::new(id(gid), GroupDetails::named(text(gid)));
            let mut sub = Subgroup::new(id(&format!("{gid}-s")), text("Sub"));
            for n in 0..count {
                let pid = format!("{gid}-p{n}");
                sub.parameters.push(Parameter::new(id(&pid), text(&pid)));
                results.push((id(&pid), "5".to_string()));
            }
            g.sub_groups.push(sub);
            groups.push(g);
        }
        let mut patient = Patient::new(id("p1"));
        patient.name = "Ravi".into();
        patient.gender = Gender::Male;
        patient.selected_tests = vec![id("small"), id("large")];

        let data = ReportData::assemble(
            patient,
            LabDetails::default(),
            &Taxonomy::new(groups),
            results.into_iter().collect(),
        );
        let pages = paginate(&compose(&data, &ReportOptions::default()));
        assert_eq!(pages.len(), 2);
        assert!(pages[0].texts().any(|t| t == "small-p0"));
        assert!(pages[0].texts().any(|t| t == END_OF_REPORT));
        assert!(!pages[0].texts().any(|t| t == "large-p0"));
        assert!(pages[1].texts().any(|t| t == "large-p0"));
        assert!(pages[1].texts().any(|t| t == END_OF_REPORT));
    }
}
