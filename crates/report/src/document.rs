//! Page-independent description of a report.
//!
//! The composer builds a [`Document`] out of [`Block`]s; the layout engine decides where
//! each block lands on which page. Sizes are PDF points (1/72 inch).

use serde::Serialize;

/// A4 portrait, in points.
pub const A4_WIDTH: f32 = 595.28;
pub const A4_HEIGHT: f32 = 841.89;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Margin {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Margin {
    pub const ZERO: Margin = Margin::new(0.0, 0.0, 0.0, 0.0);

    /// Margins in left, top, right, bottom order.
    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub const fn vertical(top: f32, bottom: f32) -> Self {
        Self::new(0.0, top, 0.0, bottom)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0x00, 0x00, 0x00);
    pub const WHITE: Rgb = Rgb(0xff, 0xff, 0xff);
    pub const INK: Rgb = Rgb(0x22, 0x22, 0x22);
    pub const DARK: Rgb = Rgb(0x33, 0x33, 0x33);
    pub const MUTED: Rgb = Rgb(0x55, 0x55, 0x55);
    pub const FAINT: Rgb = Rgb(0x77, 0x77, 0x77);
    pub const LINK: Rgb = Rgb(0x2a, 0x5d, 0xb0);
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TextStyle {
    pub size: f32,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub color: Rgb,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            size: 10.0,
            bold: false,
            italic: false,
            underline: false,
            color: Rgb::BLACK,
        }
    }
}

impl TextStyle {
    pub fn sized(size: f32) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    pub fn underline(mut self) -> Self {
        self.underline = true;
        self
    }

    pub fn color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }
}

/// A run of text in one style.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Span {
    pub text: String,
    pub style: TextStyle,
}

impl Span {
    pub fn new(text: impl Into<String>, style: TextStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

/// Wrapped text made of styled spans. `\n` forces a line break.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Paragraph {
    pub spans: Vec<Span>,
    pub align: Align,
    pub margin: Margin,
    pub no_wrap: bool,
}

impl Paragraph {
    pub fn new(text: impl Into<String>, style: TextStyle) -> Self {
        Self::from_spans(vec![Span::new(text, style)])
    }

    pub fn from_spans(spans: Vec<Span>) -> Self {
        Self {
            spans,
            align: Align::Left,
            margin: Margin::ZERO,
            no_wrap: false,
        }
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn margin(mut self, margin: Margin) -> Self {
        self.margin = margin;
        self
    }

    pub fn no_wrap(mut self) -> Self {
        self.no_wrap = true;
        self
    }

    pub fn plain_text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    pub fn is_blank(&self) -> bool {
        self.spans.iter().all(|s| s.text.trim().is_empty())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PageBreak {
    Before,
    After,
}

/// Blocks laid out top to bottom.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Stack {
    pub blocks: Vec<Block>,
    /// Move the whole stack to the next page rather than split it, when it fits on one.
    pub keep_together: bool,
    pub page_break: Option<PageBreak>,
    pub margin: Margin,
}

impl Stack {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            ..Self::default()
        }
    }

    pub fn keep_together(mut self) -> Self {
        self.keep_together = true;
        self
    }

    pub fn page_break(mut self, page_break: PageBreak) -> Self {
        self.page_break = Some(page_break);
        self
    }

    pub fn margin(mut self, margin: Margin) -> Self {
        self.margin = margin;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum ColumnWidth {
    /// Share of the available width, in percent.
    Percent(f32),
    /// Width of the widest unwrapped content.
    Auto,
    /// An equal share of whatever is left.
    Star,
}

/// A table cell. A cell spanning several columns replaces that many cells in its row.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Cell {
    pub blocks: Vec<Block>,
    pub col_span: usize,
}

impl Cell {
    pub fn new(block: impl Into<Block>) -> Self {
        Self::stacked(vec![block.into()])
    }

    pub fn stacked(blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            col_span: 1,
        }
    }

    pub fn span(mut self, col_span: usize) -> Self {
        self.col_span = col_span.max(1);
        self
    }

    pub fn with(mut self, block: impl Into<Block>) -> Self {
        self.blocks.push(block.into());
        self
    }
}

/// A borderless table. The first `header_rows` rows repeat on every page the table spans.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Table {
    pub widths: Vec<ColumnWidth>,
    pub header_rows: usize,
    pub rows: Vec<Vec<Cell>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Column {
    pub width: ColumnWidth,
    pub blocks: Vec<Block>,
}

/// Side-by-side columns separated by `gap`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Columns {
    pub columns: Vec<Column>,
    pub gap: f32,
    pub margin: Margin,
}

/// Two half-width stacks inside a thin border.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Boxed {
    pub left: Vec<Block>,
    pub right: Vec<Block>,
    pub border: f32,
    pub border_color: Rgb,
    pub margin: Margin,
}

/// A horizontal line.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Rule {
    pub length: f32,
    pub thickness: f32,
    pub color: Rgb,
    pub margin: Margin,
}

/// An embedded bitmap given as a data URL, scaled to `width` with its aspect ratio kept.
/// A taller result is shrunk to `max_height`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageBlock {
    #[serde(skip)]
    pub data_url: String,
    pub width: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_height: Option<f32>,
    pub align: Align,
    pub margin: Margin,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Block {
    Text(Paragraph),
    Stack(Stack),
    Table(Table),
    Columns(Columns),
    Boxed(Boxed),
    Rule(Rule),
    Image(ImageBlock),
    Spacer { height: f32 },
}

impl Block {
    pub fn text(text: impl Into<String>, style: TextStyle) -> Self {
        Block::Text(Paragraph::new(text, style))
    }
}

impl From<Paragraph> for Block {
    fn from(p: Paragraph) -> Self {
        Block::Text(p)
    }
}

impl From<Stack> for Block {
    fn from(s: Stack) -> Self {
        Block::Stack(s)
    }
}

impl From<Table> for Block {
    fn from(t: Table) -> Self {
        Block::Table(t)
    }
}

impl From<Columns> for Block {
    fn from(c: Columns) -> Self {
        Block::Columns(c)
    }
}

/// Data the page footer needs; the footer itself depends on the page number.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FooterData {
    #[serde(skip)]
    pub signature: Option<String>,
    pub doctor_name: String,
    pub doctor_qualification: String,
}

/// A composed report.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub title: String,
    pub page_width: f32,
    pub page_height: f32,
    /// Body margins; the header sits inside the top margin and the footer inside the bottom.
    pub page_margins: Margin,
    pub header_margin: Margin,
    pub footer_margin: Margin,
    pub header: Vec<Block>,
    pub footer: FooterData,
    pub content: Vec<Block>,
}
