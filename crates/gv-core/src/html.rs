//! Parser for HTML-like labels → a tree of tables, rows, cells,
//! images, fonts and text spans.
//!
//! The accepted language is a tag-balanced subset of HTML: `TABLE`,
//! `TR`, `TD`, `FONT`, `BR`, `HR`, `VR`, `IMG`, `I`, `B`, `S`, `U`,
//! `O`, `SUP`, `SUB`. Tags are case-insensitive, attribute values are
//! quoted. One diagnostic is emitted per rejected label; the caller
//! continues with the label discarded.

use crate::error::LabelError;
use bitflags::bitflags;
use smallvec::SmallVec;

bitflags! {
    /// Subset of box sides, for `SIDES` attributes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Sides: u8 {
        const LEFT   = 1 << 0;
        const TOP    = 1 << 1;
        const RIGHT  = 1 << 2;
        const BOTTOM = 1 << 3;
    }
}

bitflags! {
    /// Character-level styling accumulated through the font stack.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FontStyle: u16 {
        const BOLD      = 1 << 0;
        const ITALIC    = 1 << 1;
        const UNDERLINE = 1 << 2;
        const STRIKE    = 1 << 3;
        const OVERLINE  = 1 << 4;
        const SUPERSCRIPT = 1 << 5;
        const SUBSCRIPT   = 1 << 6;
    }
}

/// Font state; unset fields inherit from the enclosing font element.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Font {
    pub face: Option<String>,
    pub color: Option<String>,
    pub point_size: Option<f64>,
    pub style: FontStyle,
}

impl Font {
    /// Child font over `self`: explicit fields win, styles accumulate.
    fn layered(&self, over: &Font) -> Font {
        Font {
            face: over.face.clone().or_else(|| self.face.clone()),
            color: over.color.clone().or_else(|| self.color.clone()),
            point_size: over.point_size.or(self.point_size),
            style: self.style | over.style,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    Left,
    #[default]
    Center,
    Right,
    /// Cell-level "TEXT" alignment (justify lines individually).
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VAlign {
    Top,
    #[default]
    Middle,
    Bottom,
}

/// One run of identically-styled text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub text: String,
    pub font: Font,
}

/// A line of spans, ended by `<BR>` or the end of the text flow.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextLine {
    pub spans: SmallVec<[TextSpan; 2]>,
    /// Justification requested on the terminating `<BR ALIGN="...">`.
    pub align: Option<Align>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Img {
    pub src: String,
    /// `SCALE`: false, true, width, height, or both.
    pub scale: ImgScale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImgScale {
    #[default]
    None,
    Uniform,
    Width,
    Height,
    Both,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableAttrs {
    pub align: Option<Align>,
    pub valign: Option<VAlign>,
    pub bgcolor: Option<String>,
    pub border: Option<u8>,
    pub cellborder: Option<u8>,
    pub cellpadding: Option<u8>,
    pub cellspacing: Option<u8>,
    pub width: Option<u16>,
    pub height: Option<u16>,
    pub fixedsize: bool,
    pub gradientangle: Option<u16>,
    pub sides: Sides,
}

impl TableAttrs {
    fn new() -> Self {
        Self {
            sides: Sides::all(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellAttrs {
    pub align: Option<Align>,
    pub valign: Option<VAlign>,
    pub bgcolor: Option<String>,
    pub border: Option<u8>,
    pub cellpadding: Option<u8>,
    pub cellspacing: Option<u8>,
    pub width: Option<u16>,
    pub height: Option<u16>,
    pub fixedsize: bool,
    pub colspan: u16,
    pub rowspan: u16,
    pub port: Option<String>,
    pub sides: Sides,
}

impl Default for CellAttrs {
    fn default() -> Self {
        Self {
            align: None,
            valign: None,
            bgcolor: None,
            border: None,
            cellpadding: None,
            cellspacing: None,
            width: None,
            height: None,
            fixedsize: false,
            colspan: 1,
            rowspan: 1,
            port: None,
            sides: Sides::all(),
        }
    }
}

/// A cell holds exactly one of: a text flow, a nested table, or an
/// image; never a mixture.
#[derive(Debug, Clone, PartialEq)]
pub enum CellContent {
    Text(Vec<TextLine>),
    Table(Table),
    Image(Img),
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub attrs: CellAttrs,
    pub content: CellContent,
    /// A `<VR/>` separated this cell from its predecessor.
    pub vrule_before: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    pub cells: Vec<Cell>,
    /// An `<HR/>` separated this row from its predecessor.
    pub hrule_before: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub attrs: TableAttrs,
    pub rows: Vec<Row>,
}

impl Table {
    /// Column count implied by the tiling (max extent over all rows).
    pub fn column_count(&self) -> usize {
        tiling_columns(self).unwrap_or(0)
    }
}

/// A parsed label: either a text flow or a table.
#[derive(Debug, Clone, PartialEq)]
pub enum Label {
    Text(Vec<TextLine>),
    Table(Table),
}

// ─── Entities ────────────────────────────────────────────────────────

/// Decode the recognized character entities. Unrecognized sequences are
/// kept literally (with a one-shot warning).
pub fn decode_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(at) = rest.find('&') {
        out.push_str(&rest[..at]);
        rest = &rest[at..];
        let end = match rest.find(';') {
            Some(e) if e <= 32 => e,
            _ => {
                out.push('&');
                rest = &rest[1..];
                continue;
            }
        };
        let entity = &rest[1..end];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            _ => entity
                .strip_prefix('#')
                .and_then(|num| {
                    if let Some(hex) = num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                        u32::from_str_radix(hex, 16).ok()
                    } else {
                        num.parse::<u32>().ok()
                    }
                })
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                crate::warn_once!("unknown entity '&{entity};' kept literally");
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Escape text for embedding in markup output (the inverse of
/// `decode_entities` for the named entities).
pub fn escape_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

// ─── Lexer ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum HTok {
    Text(String),
    /// `<NAME k="v" ...>`; `closed` for `<NAME .../>`.
    Open {
        name: String,
        attrs: Vec<(String, String)>,
        closed: bool,
    },
    Close(String),
}

struct HLexer<'s> {
    full: &'s str,
    rest: &'s str,
}

impl<'s> HLexer<'s> {
    fn line(&self) -> usize {
        let consumed = self.full.len() - self.rest.len();
        self.full[..consumed].matches('\n').count() + 1
    }

    fn err(&self, message: impl Into<String>) -> LabelError {
        LabelError::new(self.line(), message)
    }

    fn next(&mut self) -> Result<Option<HTok>, LabelError> {
        if self.rest.is_empty() {
            return Ok(None);
        }
        if !self.rest.starts_with('<') {
            let end = self.rest.find('<').unwrap_or(self.rest.len());
            let (text, rest) = self.rest.split_at(end);
            self.rest = rest;
            return Ok(Some(HTok::Text(decode_entities(text))));
        }
        // a tag
        let close = self.rest[1..].starts_with('/');
        let body_start = if close { 2 } else { 1 };
        let end = self
            .rest
            .find('>')
            .ok_or_else(|| self.err("unterminated tag"))?;
        let body = &self.rest[body_start..end];
        self.rest = &self.rest[end + 1..];
        if close {
            return Ok(Some(HTok::Close(body.trim().to_ascii_uppercase())));
        }
        let (body, closed) = match body.strip_suffix('/') {
            Some(b) => (b, true),
            None => (body, false),
        };
        let mut parts = body.trim().splitn(2, char::is_whitespace);
        let name = parts
            .next()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| self.err("empty tag"))?
            .to_ascii_uppercase();
        let mut attrs = Vec::new();
        let mut attr_src = parts.next().unwrap_or("").trim();
        while !attr_src.is_empty() {
            let eq = attr_src
                .find('=')
                .ok_or_else(|| self.err(format!("malformed attribute in <{name}>")))?;
            let key = attr_src[..eq].trim().to_ascii_uppercase();
            let after = attr_src[eq + 1..].trim_start();
            let val_end;
            let value;
            if let Some(stripped) = after.strip_prefix('"') {
                let q = stripped
                    .find('"')
                    .ok_or_else(|| self.err(format!("unterminated attribute value in <{name}>")))?;
                value = decode_entities(&stripped[..q]);
                val_end = after.len() - stripped.len() + q + 1;
            } else {
                return Err(self.err(format!("attribute value in <{name}> must be quoted")));
            }
            attrs.push((key, value));
            attr_src = after[val_end..].trim_start();
        }
        Ok(Some(HTok::Open {
            name,
            attrs,
            closed,
        }))
    }
}

// ─── Parser ──────────────────────────────────────────────────────────

/// Parse a label body (the text between the outer `<` and `>` of the
/// attribute value).
pub fn parse_label(input: &str) -> Result<Label, LabelError> {
    let mut p = HParser {
        lx: HLexer {
            full: input,
            rest: input,
        },
        pending: None,
        fonts: vec![Font::default()],
    };
    let label = match p.parse_flow(None)? {
        Label::Text(mut lines) => {
            pop_unfinished(&mut lines);
            Label::Text(lines)
        }
        table => table,
    };
    if let Some(tok) = p.take()? {
        return Err(p.lx.err(format!("trailing content after label: {tok:?}")));
    }
    Ok(label)
}

/// Drop the trailing not-yet-terminated line if it carries nothing.
fn pop_unfinished(lines: &mut Vec<TextLine>) {
    if lines
        .last()
        .is_some_and(|l| l.spans.is_empty() && l.align.is_none())
    {
        lines.pop();
    }
}

struct HParser<'s> {
    lx: HLexer<'s>,
    pending: Option<HTok>,
    fonts: Vec<Font>,
}

impl<'s> HParser<'s> {
    fn take(&mut self) -> Result<Option<HTok>, LabelError> {
        match self.pending.take() {
            Some(t) => Ok(Some(t)),
            None => self.lx.next(),
        }
    }

    fn put_back(&mut self, t: HTok) {
        debug_assert!(self.pending.is_none());
        self.pending = Some(t);
    }

    fn font(&self) -> &Font {
        self.fonts.last().expect("font stack never empty")
    }

    /// Parse a flow (text or a single table) until `stop` closes. A
    /// `stop` of `None` reads to end of input.
    fn parse_flow(&mut self, stop: Option<&str>) -> Result<Label, LabelError> {
        let mut lines: Vec<TextLine> = Vec::new();
        let mut cur = TextLine::default();
        let mut table: Option<Table> = None;
        loop {
            let Some(tok) = self.take()? else {
                if stop.is_some() {
                    return Err(self.lx.err(format!("missing </{}>", stop.unwrap())));
                }
                break;
            };
            match tok {
                HTok::Text(text) => {
                    let collapsed = collapse_space(&text);
                    if !collapsed.trim().is_empty() {
                        if table.is_some() {
                            return Err(self.lx.err("text and table mixed in one context"));
                        }
                        cur.spans.push(TextSpan {
                            text: collapsed,
                            font: self.font().clone(),
                        });
                    }
                }
                HTok::Close(name) => {
                    if Some(name.as_str()) == stop {
                        self.put_back(HTok::Close(name));
                        break;
                    }
                    return Err(self.lx.err(format!("unexpected </{name}>")));
                }
                HTok::Open { name, attrs, closed } => match name.as_str() {
                    "TABLE" => {
                        if closed {
                            return Err(self.lx.err("<TABLE/> cannot be empty-closed"));
                        }
                        if table.is_some() || !lines.is_empty() || !cur.spans.is_empty() {
                            return Err(self.lx.err("text and table mixed in one context"));
                        }
                        table = Some(self.parse_table(attrs)?);
                    }
                    "BR" => {
                        cur.align = attr_align(&attrs);
                        lines.push(std::mem::take(&mut cur));
                        if !closed {
                            self.expect_close("BR")?;
                        }
                    }
                    "FONT" | "I" | "B" | "S" | "U" | "O" | "SUP" | "SUB" => {
                        if closed {
                            return Err(self.lx.err(format!("<{name}/> needs content")));
                        }
                        let over = font_of(&name, &attrs);
                        let layered = self.font().layered(&over);
                        self.fonts.push(layered);
                        // the styled run merges into the current flow
                        let inner = self.parse_flow(Some(&name))?;
                        self.fonts.pop();
                        self.expect_close(&name)?;
                        match inner {
                            Label::Text(inner_lines) => {
                                merge_flow(&mut lines, &mut cur, inner_lines);
                            }
                            Label::Table(_) => {
                                return Err(self
                                    .lx
                                    .err(format!("a table cannot appear inside <{name}>")));
                            }
                        }
                    }
                    other => {
                        return Err(self.lx.err(format!("unexpected <{other}> in label")));
                    }
                },
            }
        }
        if let Some(t) = table {
            return Ok(Label::Table(t));
        }
        // the unfinished trailing line is always returned; callers trim
        // or splice it as their context requires
        lines.push(cur);
        Ok(Label::Text(lines))
    }

    fn expect_close(&mut self, name: &str) -> Result<(), LabelError> {
        match self.take()? {
            Some(HTok::Close(n)) if n == name => Ok(()),
            _ => Err(self.lx.err(format!("missing </{name}>"))),
        }
    }

    fn parse_table(&mut self, attrs: Vec<(String, String)>) -> Result<Table, LabelError> {
        let mut t = Table {
            attrs: table_attrs(&attrs),
            rows: Vec::new(),
        };
        let mut hrule_pending = false;
        loop {
            match self.take()? {
                None => return Err(self.lx.err("missing </TABLE>")),
                Some(HTok::Text(s)) if s.trim().is_empty() => {}
                Some(HTok::Close(n)) if n == "TABLE" => break,
                Some(HTok::Open { name, attrs, closed }) => match name.as_str() {
                    "TR" if !closed => {
                        let mut row = self.parse_row(attrs)?;
                        row.hrule_before = std::mem::take(&mut hrule_pending);
                        t.rows.push(row);
                    }
                    "HR" => {
                        hrule_pending = true;
                        if !closed {
                            self.expect_close("HR")?;
                        }
                    }
                    other => {
                        return Err(self.lx.err(format!("unexpected <{other}> in table")));
                    }
                },
                Some(tok) => {
                    return Err(self.lx.err(format!("unexpected {tok:?} in table")));
                }
            }
        }
        if t.rows.is_empty() {
            return Err(self.lx.err("table has no rows"));
        }
        validate_tiling(&t).map_err(|m| self.lx.err(m))?;
        Ok(t)
    }

    fn parse_row(&mut self, _attrs: Vec<(String, String)>) -> Result<Row, LabelError> {
        let mut row = Row::default();
        let mut vrule_pending = false;
        loop {
            match self.take()? {
                None => return Err(self.lx.err("missing </TR>")),
                Some(HTok::Text(s)) if s.trim().is_empty() => {}
                Some(HTok::Close(n)) if n == "TR" => break,
                Some(HTok::Open { name, attrs, closed }) => match name.as_str() {
                    "TD" if !closed => {
                        let mut cell = self.parse_cell(attrs)?;
                        cell.vrule_before = std::mem::take(&mut vrule_pending);
                        row.cells.push(cell);
                    }
                    "VR" => {
                        vrule_pending = true;
                        if !closed {
                            self.expect_close("VR")?;
                        }
                    }
                    other => {
                        return Err(self.lx.err(format!("unexpected <{other}> in row")));
                    }
                },
                Some(tok) => {
                    return Err(self.lx.err(format!("unexpected {tok:?} in row")));
                }
            }
        }
        if row.cells.is_empty() {
            return Err(self.lx.err("row has no cells"));
        }
        Ok(row)
    }

    fn parse_cell(&mut self, attrs: Vec<(String, String)>) -> Result<Cell, LabelError> {
        let cattrs = cell_attrs(&attrs);
        // image cell?
        loop {
            match self.take()? {
                None => return Err(self.lx.err("missing </TD>")),
                Some(HTok::Text(s)) if s.trim().is_empty() => {}
                Some(HTok::Open { name, attrs, closed }) if name == "IMG" => {
                    let img = img_attrs(&attrs, &self.lx)?;
                    if !closed {
                        self.expect_close("IMG")?;
                    }
                    self.skip_space_until_close("TD")?;
                    return Ok(Cell {
                        attrs: cattrs,
                        content: CellContent::Image(img),
                        vrule_before: false,
                    });
                }
                Some(tok) => {
                    self.put_back(tok);
                    break;
                }
            }
        }
        let flow = self.parse_flow(Some("TD"))?;
        self.expect_close("TD")?;
        let content = match flow {
            Label::Table(t) => CellContent::Table(t),
            Label::Text(mut lines) => {
                pop_unfinished(&mut lines);
                if lines.is_empty() {
                    CellContent::Empty
                } else {
                    CellContent::Text(lines)
                }
            }
        };
        Ok(Cell {
            attrs: cattrs,
            content,
            vrule_before: false,
        })
    }

    fn skip_space_until_close(&mut self, name: &str) -> Result<(), LabelError> {
        loop {
            match self.take()? {
                Some(HTok::Text(s)) if s.trim().is_empty() => {}
                Some(HTok::Close(n)) if n == name => return Ok(()),
                _ => {
                    return Err(self
                        .lx
                        .err("cell content must be text, a table, or an image"));
                }
            }
        }
    }
}

/// Splice an inner styled flow into the enclosing one. All inner lines
/// but the last were `<BR>`-terminated and complete the current line;
/// the last is the inner flow's unfinished tail and stays open.
fn merge_flow(lines: &mut Vec<TextLine>, cur: &mut TextLine, inner: Vec<TextLine>) {
    let n = inner.len();
    for (i, line) in inner.into_iter().enumerate() {
        cur.spans.extend(line.spans);
        if i + 1 < n {
            cur.align = line.align;
            lines.push(std::mem::take(cur));
        }
    }
}

fn collapse_space(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_space = false;
    for c in s.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

// ─── Attribute readers ───────────────────────────────────────────────

fn attr_of<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn attr_align(attrs: &[(String, String)]) -> Option<Align> {
    attr_of(attrs, "ALIGN").and_then(parse_align)
}

fn parse_align(v: &str) -> Option<Align> {
    match v.to_ascii_uppercase().as_str() {
        "LEFT" => Some(Align::Left),
        "CENTER" => Some(Align::Center),
        "RIGHT" => Some(Align::Right),
        "TEXT" => Some(Align::Text),
        _ => {
            crate::warn_once!("unknown alignment '{v}'");
            None
        }
    }
}

fn parse_valign(v: &str) -> Option<VAlign> {
    match v.to_ascii_uppercase().as_str() {
        "TOP" => Some(VAlign::Top),
        "MIDDLE" => Some(VAlign::Middle),
        "BOTTOM" => Some(VAlign::Bottom),
        _ => {
            crate::warn_once!("unknown vertical alignment '{v}'");
            None
        }
    }
}

fn parse_sides(v: &str) -> Sides {
    let mut s = Sides::empty();
    for c in v.chars() {
        match c.to_ascii_uppercase() {
            'L' => s |= Sides::LEFT,
            'T' => s |= Sides::TOP,
            'R' => s |= Sides::RIGHT,
            'B' => s |= Sides::BOTTOM,
            _ => crate::warn_once!("unknown side '{c}' in SIDES"),
        }
    }
    s
}

/// Integer attribute clipped into `[0, max]`; out-of-range warns.
fn clipped_int(v: &str, max: u32, what: &str) -> Option<u32> {
    match v.trim().parse::<i64>() {
        Ok(n) => {
            let clipped = n.clamp(0, max as i64) as u32;
            if clipped as i64 != n {
                crate::warn_once!("{what} value {n} out of range, clipped to {clipped}");
            }
            Some(clipped)
        }
        Err(_) => {
            crate::warn_once!("{what} value '{v}' is not an integer");
            None
        }
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => {
            crate::warn_once!("expected true/false, got '{v}'");
            None
        }
    }
}

fn table_attrs(attrs: &[(String, String)]) -> TableAttrs {
    let mut t = TableAttrs::new();
    for (k, v) in attrs {
        match k.as_str() {
            "ALIGN" => t.align = parse_align(v),
            "VALIGN" => t.valign = parse_valign(v),
            "BGCOLOR" => t.bgcolor = Some(v.clone()),
            "BORDER" => t.border = clipped_int(v, 255, "BORDER").map(|n| n as u8),
            "CELLBORDER" => t.cellborder = clipped_int(v, 255, "CELLBORDER").map(|n| n as u8),
            "CELLPADDING" => t.cellpadding = clipped_int(v, 255, "CELLPADDING").map(|n| n as u8),
            "CELLSPACING" => t.cellspacing = clipped_int(v, 127, "CELLSPACING").map(|n| n as u8),
            "WIDTH" => t.width = clipped_int(v, 65_535, "WIDTH").map(|n| n as u16),
            "HEIGHT" => t.height = clipped_int(v, 65_535, "HEIGHT").map(|n| n as u16),
            "FIXEDSIZE" => t.fixedsize = parse_bool(v).unwrap_or(false),
            "GRADIENTANGLE" => {
                t.gradientangle = clipped_int(v, 360, "GRADIENTANGLE").map(|n| n as u16)
            }
            "SIDES" => t.sides = parse_sides(v),
            other => crate::warn_once!("unknown attribute {other} on <TABLE>"),
        }
    }
    t
}

fn cell_attrs(attrs: &[(String, String)]) -> CellAttrs {
    let mut c = CellAttrs::default();
    for (k, v) in attrs {
        match k.as_str() {
            "ALIGN" => c.align = parse_align(v),
            "VALIGN" => c.valign = parse_valign(v),
            "BGCOLOR" => c.bgcolor = Some(v.clone()),
            "BORDER" => c.border = clipped_int(v, 255, "BORDER").map(|n| n as u8),
            "CELLPADDING" => c.cellpadding = clipped_int(v, 255, "CELLPADDING").map(|n| n as u8),
            "CELLSPACING" => c.cellspacing = clipped_int(v, 127, "CELLSPACING").map(|n| n as u8),
            "WIDTH" => c.width = clipped_int(v, 65_535, "WIDTH").map(|n| n as u16),
            "HEIGHT" => c.height = clipped_int(v, 65_535, "HEIGHT").map(|n| n as u16),
            "FIXEDSIZE" => c.fixedsize = parse_bool(v).unwrap_or(false),
            "COLSPAN" => {
                c.colspan = clipped_int(v, 65_535, "COLSPAN").map(|n| n as u16).unwrap_or(1).max(1)
            }
            "ROWSPAN" => {
                c.rowspan = clipped_int(v, 65_535, "ROWSPAN").map(|n| n as u16).unwrap_or(1).max(1)
            }
            "PORT" => c.port = Some(v.clone()),
            "SIDES" => c.sides = parse_sides(v),
            other => crate::warn_once!("unknown attribute {other} on <TD>"),
        }
    }
    c
}

fn img_attrs(attrs: &[(String, String)], lx: &HLexer<'_>) -> Result<Img, LabelError> {
    let mut src = None;
    let mut scale = ImgScale::None;
    for (k, v) in attrs {
        match k.as_str() {
            "SRC" => src = Some(v.clone()),
            "SCALE" => {
                scale = match v.to_ascii_uppercase().as_str() {
                    "TRUE" => ImgScale::Uniform,
                    "FALSE" => ImgScale::None,
                    "WIDTH" => ImgScale::Width,
                    "HEIGHT" => ImgScale::Height,
                    "BOTH" => ImgScale::Both,
                    other => {
                        crate::warn_once!("unknown SCALE '{other}'");
                        ImgScale::None
                    }
                }
            }
            other => crate::warn_once!("unknown attribute {other} on <IMG>"),
        }
    }
    Ok(Img {
        src: src.ok_or_else(|| lx.err("<IMG> requires SRC"))?,
        scale,
    })
}

fn font_of(name: &str, attrs: &[(String, String)]) -> Font {
    let mut f = Font::default();
    match name {
        "B" => f.style |= FontStyle::BOLD,
        "I" => f.style |= FontStyle::ITALIC,
        "U" => f.style |= FontStyle::UNDERLINE,
        "S" => f.style |= FontStyle::STRIKE,
        "O" => f.style |= FontStyle::OVERLINE,
        "SUP" => f.style |= FontStyle::SUPERSCRIPT,
        "SUB" => f.style |= FontStyle::SUBSCRIPT,
        "FONT" => {
            for (k, v) in attrs {
                match k.as_str() {
                    "FACE" => f.face = Some(v.clone()),
                    "COLOR" => f.color = Some(v.clone()),
                    "POINT-SIZE" => f.point_size = v.trim().parse().ok(),
                    other => crate::warn_once!("unknown attribute {other} on <FONT>"),
                }
            }
        }
        _ => {}
    }
    f
}

// ─── Tiling validation ───────────────────────────────────────────────

/// Check that rowspan/colspan declarations tile the table exactly:
/// every grid position covered once, no overlap, no ragged rows.
fn validate_tiling(t: &Table) -> Result<(), String> {
    tiling_columns(t).map(|_| ())
}

fn tiling_columns(t: &Table) -> Result<usize, String> {
    let nrows = t.rows.len();
    // occupancy per row: sorted free intervals are overkill; a plain
    // grid of booleans works at label scale
    let mut grid: Vec<Vec<bool>> = vec![Vec::new(); nrows];
    for (r, row) in t.rows.iter().enumerate() {
        let mut col = 0usize;
        for cell in &row.cells {
            while grid[r].get(col).copied().unwrap_or(false) {
                col += 1;
            }
            let (cs, rs) = (cell.attrs.colspan as usize, cell.attrs.rowspan as usize);
            if r + rs > nrows {
                return Err(format!(
                    "cell rowspan {rs} exceeds the table's {nrows} rows"
                ));
            }
            for rr in r..r + rs {
                for cc in col..col + cs {
                    if grid[rr].len() <= cc {
                        grid[rr].resize(cc + 1, false);
                    }
                    if grid[rr][cc] {
                        return Err("cell spans overlap".into());
                    }
                    grid[rr][cc] = true;
                }
            }
            col += cs;
        }
    }
    let ncols = grid.iter().map(Vec::len).max().unwrap_or(0);
    for (r, row) in grid.iter().enumerate() {
        if row.len() != ncols || row.iter().any(|&b| !b) {
            return Err(format!(
                "row {} does not tile the table's {ncols} columns",
                r + 1
            ));
        }
    }
    Ok(ncols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn plain_text_label() {
        let l = parse_label("hello world").unwrap();
        match l {
            Label::Text(lines) => {
                assert_eq!(lines.len(), 1);
                assert_eq!(lines[0].spans[0].text, "hello world");
            }
            _ => panic!("expected text"),
        }
    }

    #[test]
    fn simple_table() {
        let l = parse_label(
            r#"<TABLE BORDER="1" CELLBORDER="1"><TR><TD>x</TD><TD>y</TD></TR></TABLE>"#,
        )
        .unwrap();
        let Label::Table(t) = l else {
            panic!("expected table")
        };
        assert_eq!(t.attrs.border, Some(1));
        assert_eq!(t.attrs.cellborder, Some(1));
        assert_eq!(t.rows.len(), 1);
        assert_eq!(t.rows[0].cells.len(), 2);
        assert_eq!(t.column_count(), 2);
    }

    #[test]
    fn font_stack_inherits() {
        let l = parse_label(r#"<FONT COLOR="red">a<B>b</B></FONT>"#).unwrap();
        let Label::Text(lines) = l else {
            panic!("expected text")
        };
        let spans = &lines[0].spans;
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].font.color.as_deref(), Some("red"));
        assert!(!spans[0].font.style.contains(FontStyle::BOLD));
        assert_eq!(spans[1].font.color.as_deref(), Some("red"));
        assert!(spans[1].font.style.contains(FontStyle::BOLD));
    }

    #[test]
    fn br_splits_lines() {
        let l = parse_label(r#"one<BR ALIGN="LEFT"/>two"#).unwrap();
        let Label::Text(lines) = l else {
            panic!("expected text")
        };
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].align, Some(Align::Left));
        assert_eq!(lines[1].spans[0].text, "two");
    }

    #[test]
    fn spans_tile_exactly() {
        // 2x2 with a rowspan-2 first column
        let ok = parse_label(
            r#"<TABLE><TR><TD ROWSPAN="2">a</TD><TD>b</TD></TR><TR><TD>c</TD></TR></TABLE>"#,
        );
        assert!(ok.is_ok());
        let bad = parse_label(
            r#"<TABLE><TR><TD ROWSPAN="2">a</TD><TD>b</TD></TR><TR><TD>c</TD><TD>d</TD></TR></TABLE>"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn unbalanced_tag_is_one_error() {
        let e = parse_label("<B>oops").unwrap_err();
        assert!(e.message.contains("</B>"));
    }

    #[test]
    fn unknown_tag_rejected() {
        assert!(parse_label("<MARQUEE>no</MARQUEE>").is_err());
    }

    #[test]
    fn unknown_attributes_are_ignored_not_fatal() {
        // unrecognized attributes only warn; the label survives
        let l = parse_label(
            r#"<TABLE FRAME="void" BORDER="1"><TR><TD VENDOR-HINT="x">a</TD></TR></TABLE>"#,
        )
        .unwrap();
        let Label::Table(t) = l else {
            panic!("expected table")
        };
        assert_eq!(t.attrs.border, Some(1));
        assert_eq!(t.rows[0].cells.len(), 1);
        let img = parse_label(
            r#"<TABLE><TR><TD><IMG SRC="x.png" CACHE="no"/></TD></TR></TABLE>"#,
        );
        assert!(img.is_ok());
        // a missing SRC is still a real error
        assert!(parse_label(r#"<TABLE><TR><TD><IMG/></TD></TR></TABLE>"#).is_err());
    }

    #[test]
    fn entities_decode() {
        assert_eq!(decode_entities("a &lt; b &amp; c &#65; &#x42;"), "a < b & c A B");
        assert_eq!(escape_entities("a<b&c"), "a&lt;b&amp;c");
    }

    #[test]
    fn nested_table_in_cell() {
        let l = parse_label(
            r#"<TABLE><TR><TD><TABLE><TR><TD>inner</TD></TR></TABLE></TD></TR></TABLE>"#,
        )
        .unwrap();
        let Label::Table(t) = l else {
            panic!("expected table")
        };
        assert!(matches!(t.rows[0].cells[0].content, CellContent::Table(_)));
    }

    #[test]
    fn image_cell() {
        let l =
            parse_label(r#"<TABLE><TR><TD><IMG SRC="x.png" SCALE="TRUE"/></TD></TR></TABLE>"#)
                .unwrap();
        let Label::Table(t) = l else {
            panic!("expected table")
        };
        match &t.rows[0].cells[0].content {
            CellContent::Image(img) => {
                assert_eq!(img.src, "x.png");
                assert_eq!(img.scale, ImgScale::Uniform);
            }
            other => panic!("expected image, got {other:?}"),
        }
    }
}
