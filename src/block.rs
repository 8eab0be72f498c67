use crate::canvas::Canvas;
use crate::font::FontRegistry;
use crate::types::{Color, Pt, Size};
use std::sync::Arc;

/// Vertically flowed content. `wrap` reports the size the block wants
/// within the available region, `split` cuts it at a safe boundary when
/// it does not fit, and `draw` records commands at a fixed position.
pub trait Block {
    fn wrap(&self, avail_width: Pt, avail_height: Pt) -> Size;
    fn split(&self, avail_width: Pt, avail_height: Pt) -> Option<(Box<dyn Block>, Box<dyn Block>)>;
    fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, avail_width: Pt, avail_height: Pt);
    fn debug_name(&self) -> &'static str;
}

#[derive(Debug, Clone)]
pub struct TextStyle {
    pub font_name: Arc<str>,
    pub font_size: Pt,
    pub leading: Pt,
    pub color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

fn measure(fonts: &FontRegistry, style: &TextStyle, text: &str) -> Pt {
    fonts.measure_text_width(&style.font_name, style.font_size, text)
}

/// Greedy word wrap. Explicit newlines are hard breaks; a word wider
/// than the region gets a line of its own rather than failing.
fn layout_lines(fonts: &FontRegistry, style: &TextStyle, text: &str, max_width: Pt) -> Vec<String> {
    let mut lines = Vec::new();
    for segment in text.split('\n') {
        let mut current = String::new();
        for word in segment.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current, word)
            };
            if current.is_empty() || measure(fonts, style, &candidate) <= max_width {
                current = candidate;
            } else {
                lines.push(std::mem::take(&mut current));
                current = word.to_string();
            }
        }
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn same_face(a: &TextStyle, b: &TextStyle) -> bool {
    a.font_name == b.font_name && a.font_size == b.font_size && a.color == b.color
}

/// Wraps styled runs as one flow, for inline emphasis inside a cell.
/// Words keep their run's style and are joined by single spaces;
/// explicit newlines are hard breaks. Adjacent words sharing a face
/// merge into one segment, and a separating space binds to the segment
/// before it.
fn layout_rich_lines(
    fonts: &FontRegistry,
    runs: &[(String, TextStyle)],
    max_width: Pt,
) -> Vec<Vec<(String, TextStyle)>> {
    enum Tok<'a> {
        Word(&'a str, &'a TextStyle),
        Break,
    }
    let mut tokens = Vec::new();
    for (text, style) in runs {
        for (index, segment) in text.split('\n').enumerate() {
            if index > 0 {
                tokens.push(Tok::Break);
            }
            for word in segment.split_whitespace() {
                tokens.push(Tok::Word(word, style));
            }
        }
    }

    let mut lines: Vec<Vec<(String, TextStyle)>> = Vec::new();
    let mut current: Vec<(String, TextStyle)> = Vec::new();
    let mut current_width = Pt::ZERO;
    for token in tokens {
        match token {
            Tok::Break => {
                lines.push(std::mem::take(&mut current));
                current_width = Pt::ZERO;
            }
            Tok::Word(word, style) => {
                let word_width = measure(fonts, style, word);
                if !current.is_empty() {
                    let space = measure(fonts, style, " ");
                    if current_width + space + word_width > max_width {
                        lines.push(std::mem::take(&mut current));
                        current_width = Pt::ZERO;
                    }
                }
                let mut merged = false;
                let mut space = Pt::ZERO;
                if let Some((text, last_style)) = current.last_mut() {
                    space = measure(fonts, last_style, " ");
                    text.push(' ');
                    if same_face(last_style, style) {
                        text.push_str(word);
                        merged = true;
                    }
                }
                if !merged {
                    current.push((word.to_string(), style.clone()));
                }
                current_width += space + word_width;
            }
        }
    }
    lines.push(current);
    lines
}

fn stroke_rect(canvas: &mut Canvas, x: Pt, y: Pt, width: Pt, height: Pt) {
    canvas.move_to(x, y);
    canvas.line_to(x + width, y);
    canvas.line_to(x + width, y + height);
    canvas.line_to(x, y + height);
    canvas.line_to(x, y);
    canvas.stroke();
}

#[derive(Clone)]
pub struct Paragraph {
    text: String,
    style: TextStyle,
    align: TextAlign,
    background: Option<Color>,
    padding: Pt,
    fonts: Arc<FontRegistry>,
}

impl Paragraph {
    pub(crate) fn new(text: impl Into<String>, style: TextStyle, fonts: Arc<FontRegistry>) -> Self {
        Self {
            text: text.into(),
            style,
            align: TextAlign::Left,
            background: None,
            padding: Pt::ZERO,
            fonts,
        }
    }

    pub fn with_align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }

    pub fn with_padding(mut self, padding: Pt) -> Self {
        self.padding = padding;
        self
    }

    fn text_width(&self, avail_width: Pt) -> Pt {
        (avail_width - self.padding * 2).max(Pt::ZERO)
    }

    fn height_for_lines(&self, line_count: usize) -> Pt {
        self.style.leading * (line_count as i32) + self.padding * 2
    }
}

impl Block for Paragraph {
    fn wrap(&self, avail_width: Pt, _avail_height: Pt) -> Size {
        let lines = layout_lines(
            &self.fonts,
            &self.style,
            &self.text,
            self.text_width(avail_width),
        );
        Size {
            width: avail_width,
            height: self.height_for_lines(lines.len()),
        }
    }

    fn split(&self, avail_width: Pt, avail_height: Pt) -> Option<(Box<dyn Block>, Box<dyn Block>)> {
        let lines = layout_lines(
            &self.fonts,
            &self.style,
            &self.text,
            self.text_width(avail_width),
        );
        if lines.len() < 2 {
            return None;
        }
        let mut fit = 0usize;
        while fit < lines.len() && self.height_for_lines(fit + 1) <= avail_height {
            fit += 1;
        }
        if fit == 0 || fit >= lines.len() {
            return None;
        }
        let first = Self {
            text: lines[..fit].join("\n"),
            ..self.clone()
        };
        let second = Self {
            text: lines[fit..].join("\n"),
            ..self.clone()
        };
        Some((Box::new(first), Box::new(second)))
    }

    fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, avail_width: Pt, _avail_height: Pt) {
        let lines = layout_lines(
            &self.fonts,
            &self.style,
            &self.text,
            self.text_width(avail_width),
        );
        if let Some(background) = self.background {
            canvas.set_fill_color(background);
            canvas.draw_rect(x, y, avail_width, self.height_for_lines(lines.len()));
        }
        canvas.set_font_name(&self.style.font_name);
        canvas.set_font_size(self.style.font_size);
        canvas.set_fill_color(self.style.color);
        for (index, line) in lines.iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            let line_width = measure(&self.fonts, &self.style, line);
            let tx = match self.align {
                TextAlign::Left => x + self.padding,
                TextAlign::Center => x + (avail_width - line_width) / 2,
                TextAlign::Right => x + avail_width - self.padding - line_width,
            };
            let ty = y + self.padding
                + self.style.leading * (index as i32)
                + (self.style.leading - self.style.font_size) / 2;
            canvas.draw_string(tx, ty, line.clone());
        }
    }

    fn debug_name(&self) -> &'static str {
        "Paragraph"
    }
}

#[derive(Clone)]
pub struct Spacer {
    height: Pt,
}

impl Spacer {
    pub fn new(height: Pt) -> Self {
        Self { height }
    }
}

impl Block for Spacer {
    fn wrap(&self, avail_width: Pt, _avail_height: Pt) -> Size {
        Size {
            width: avail_width,
            height: self.height,
        }
    }

    fn split(
        &self,
        _avail_width: Pt,
        _avail_height: Pt,
    ) -> Option<(Box<dyn Block>, Box<dyn Block>)> {
        None
    }

    fn draw(&self, _canvas: &mut Canvas, _x: Pt, _y: Pt, _avail_width: Pt, _avail_height: Pt) {}

    fn debug_name(&self) -> &'static str {
        "Spacer"
    }
}

#[derive(Clone)]
pub enum CellContent {
    Text(String),
    /// Styled runs wrapped as one flow, for inline bold emphasis.
    Rich(Vec<(String, TextStyle)>),
    Image {
        source: String,
        width: Pt,
        height: Pt,
    },
}

#[derive(Clone)]
pub struct Cell {
    content: CellContent,
    style: TextStyle,
    align: TextAlign,
    background: Option<Color>,
    col_span: usize,
    row_span: usize,
}

impl Cell {
    pub fn text(text: impl Into<String>, style: TextStyle) -> Self {
        Self {
            content: CellContent::Text(text.into()),
            style,
            align: TextAlign::Left,
            background: None,
            col_span: 1,
            row_span: 1,
        }
    }

    /// `style` carries the leading and size the cell is measured with;
    /// each run draws in its own face.
    pub fn rich(runs: Vec<(String, TextStyle)>, style: TextStyle) -> Self {
        Self {
            content: CellContent::Rich(runs),
            style,
            align: TextAlign::Left,
            background: None,
            col_span: 1,
            row_span: 1,
        }
    }

    pub fn image(source: impl Into<String>, width: Pt, height: Pt, style: TextStyle) -> Self {
        Self {
            content: CellContent::Image {
                source: source.into(),
                width,
                height,
            },
            style,
            align: TextAlign::Left,
            background: None,
            col_span: 1,
            row_span: 1,
        }
    }

    pub fn with_align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }

    pub fn with_col_span(mut self, span: usize) -> Self {
        self.col_span = span.max(1);
        self
    }

    pub fn with_row_span(mut self, span: usize) -> Self {
        self.row_span = span.max(1);
        self
    }
}

/// Fixed-column table. Header rows are repeated after every split, and
/// splits only ever happen between body rows.
#[derive(Clone)]
pub struct TableBlock {
    col_widths: Vec<Pt>,
    header_rows: Vec<Vec<Cell>>,
    body_rows: Vec<Vec<Cell>>,
    grid: Option<(Pt, Color)>,
    outline: Option<(Pt, Color)>,
    h_padding: Pt,
    v_padding: Pt,
    fonts: Arc<FontRegistry>,
}

impl TableBlock {
    pub(crate) fn new(col_widths: Vec<Pt>, fonts: Arc<FontRegistry>) -> Self {
        Self {
            col_widths,
            header_rows: Vec::new(),
            body_rows: Vec::new(),
            grid: None,
            outline: None,
            h_padding: Pt::from_f32(3.0),
            v_padding: Pt::from_f32(2.0),
            fonts,
        }
    }

    pub fn with_header_rows(mut self, rows: Vec<Vec<Cell>>) -> Self {
        self.header_rows = rows;
        self
    }

    pub fn add_row(&mut self, row: Vec<Cell>) {
        self.body_rows.push(row);
    }

    pub fn with_rows(mut self, rows: Vec<Vec<Cell>>) -> Self {
        self.body_rows = rows;
        self
    }

    pub fn with_grid(mut self, line_width: Pt, color: Color) -> Self {
        self.grid = Some((line_width, color));
        self
    }

    pub fn with_outline(mut self, line_width: Pt, color: Color) -> Self {
        self.outline = Some((line_width, color));
        self
    }

    pub fn with_cell_padding(mut self, horizontal: Pt, vertical: Pt) -> Self {
        self.h_padding = horizontal;
        self.v_padding = vertical;
        self
    }

    pub fn body_row_count(&self) -> usize {
        self.body_rows.len()
    }

    fn total_width(&self) -> Pt {
        self.col_widths.iter().copied().sum()
    }

    fn col_offsets(&self) -> Vec<Pt> {
        let mut offsets = Vec::with_capacity(self.col_widths.len() + 1);
        let mut x = Pt::ZERO;
        offsets.push(x);
        for width in &self.col_widths {
            x += *width;
            offsets.push(x);
        }
        offsets
    }

    fn span_width(&self, col: usize, span: usize) -> Pt {
        self.col_widths
            .iter()
            .skip(col)
            .take(span.max(1))
            .copied()
            .sum()
    }

    fn cell_height(&self, cell: &Cell, region_width: Pt) -> Pt {
        match &cell.content {
            CellContent::Text(text) => {
                let lines = layout_lines(
                    &self.fonts,
                    &cell.style,
                    text,
                    (region_width - self.h_padding * 2).max(Pt::ZERO),
                );
                cell.style.leading * (lines.len() as i32) + self.v_padding * 2
            }
            CellContent::Rich(runs) => {
                let lines = layout_rich_lines(
                    &self.fonts,
                    runs,
                    (region_width - self.h_padding * 2).max(Pt::ZERO),
                );
                cell.style.leading * (lines.len() as i32) + self.v_padding * 2
            }
            CellContent::Image { height, .. } => *height + self.v_padding * 2,
        }
    }

    /// Heights for a slice of rows. Single-row cells set the base row
    /// height; a multi-row anchor grows the last row it spans when the
    /// spanned rows are together too short for it.
    fn row_heights(&self, rows: &[Vec<Cell>]) -> Vec<Pt> {
        let mut heights = vec![Pt::ZERO; rows.len()];
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                if cell.row_span > 1 {
                    continue;
                }
                let width = self.span_width(c, cell.col_span);
                heights[r] = heights[r].max(self.cell_height(cell, width));
            }
        }
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                if cell.row_span <= 1 {
                    continue;
                }
                let width = self.span_width(c, cell.col_span);
                let needed = self.cell_height(cell, width);
                let end = (r + cell.row_span).min(rows.len());
                let covered: Pt = heights[r..end].iter().copied().sum();
                if needed > covered {
                    heights[end - 1] += needed - covered;
                }
            }
        }
        heights
    }

    fn header_height(&self) -> Pt {
        self.row_heights(&self.header_rows).iter().copied().sum()
    }

    /// Grid positions shadowed by a span anchor elsewhere in the grid.
    fn covered_cells(rows: &[Vec<Cell>]) -> Vec<(usize, usize)> {
        let mut covered = Vec::new();
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                for dr in 0..cell.row_span {
                    for dc in 0..cell.col_span {
                        if dr == 0 && dc == 0 {
                            continue;
                        }
                        covered.push((r + dr, c + dc));
                    }
                }
            }
        }
        covered
    }

    fn draw_rows(&self, canvas: &mut Canvas, x: Pt, y: Pt, rows: &[Vec<Cell>]) -> Pt {
        let col_offsets = self.col_offsets();
        let heights = self.row_heights(rows);
        let mut row_offsets = Vec::with_capacity(rows.len() + 1);
        let mut acc = Pt::ZERO;
        row_offsets.push(acc);
        for height in &heights {
            acc += *height;
            row_offsets.push(acc);
        }
        let covered = Self::covered_cells(rows);

        let mut regions: Vec<(Pt, Pt, Pt, Pt)> = Vec::new();
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                if covered.contains(&(r, c)) {
                    continue;
                }
                let rx = x + col_offsets[c];
                let ry = y + row_offsets[r];
                let rw = self.span_width(c, cell.col_span);
                let end = (r + cell.row_span).min(rows.len());
                let rh = row_offsets[end] - row_offsets[r];
                regions.push((rx, ry, rw, rh));

                if let Some(background) = cell.background {
                    canvas.set_fill_color(background);
                    canvas.draw_rect(rx, ry, rw, rh);
                }

                match &cell.content {
                    CellContent::Text(text) => {
                        if text.is_empty() {
                            continue;
                        }
                        let lines = layout_lines(
                            &self.fonts,
                            &cell.style,
                            text,
                            (rw - self.h_padding * 2).max(Pt::ZERO),
                        );
                        let text_height = cell.style.leading * (lines.len() as i32);
                        let ty0 = ry + ((rh - text_height) / 2).max(Pt::ZERO);
                        canvas.set_font_name(&cell.style.font_name);
                        canvas.set_font_size(cell.style.font_size);
                        canvas.set_fill_color(cell.style.color);
                        for (index, line) in lines.iter().enumerate() {
                            if line.is_empty() {
                                continue;
                            }
                            let line_width = measure(&self.fonts, &cell.style, line);
                            let tx = match cell.align {
                                TextAlign::Left => rx + self.h_padding,
                                TextAlign::Center => rx + (rw - line_width) / 2,
                                TextAlign::Right => rx + rw - self.h_padding - line_width,
                            };
                            let ty = ty0
                                + cell.style.leading * (index as i32)
                                + (cell.style.leading - cell.style.font_size) / 2;
                            canvas.draw_string(tx, ty, line.clone());
                        }
                    }
                    CellContent::Rich(runs) => {
                        let lines = layout_rich_lines(
                            &self.fonts,
                            runs,
                            (rw - self.h_padding * 2).max(Pt::ZERO),
                        );
                        let text_height = cell.style.leading * (lines.len() as i32);
                        let ty0 = ry + ((rh - text_height) / 2).max(Pt::ZERO);
                        for (index, line) in lines.iter().enumerate() {
                            let line_width: Pt = line
                                .iter()
                                .map(|(text, style)| measure(&self.fonts, style, text))
                                .sum();
                            let mut tx = match cell.align {
                                TextAlign::Left => rx + self.h_padding,
                                TextAlign::Center => rx + (rw - line_width) / 2,
                                TextAlign::Right => rx + rw - self.h_padding - line_width,
                            };
                            let ty = ty0
                                + cell.style.leading * (index as i32)
                                + (cell.style.leading - cell.style.font_size) / 2;
                            for (text, style) in line {
                                if text.is_empty() {
                                    continue;
                                }
                                canvas.set_font_name(&style.font_name);
                                canvas.set_font_size(style.font_size);
                                canvas.set_fill_color(style.color);
                                canvas.draw_string(tx, ty, text.clone());
                                tx += measure(&self.fonts, style, text);
                            }
                        }
                    }
                    CellContent::Image {
                        source,
                        width,
                        height,
                    } => {
                        let iy = ry + ((rh - *height) / 2).max(Pt::ZERO);
                        canvas.draw_image(rx + self.h_padding, iy, *width, *height, source.clone());
                    }
                }
            }
        }

        if let Some((line_width, color)) = self.grid {
            canvas.set_stroke_color(color);
            canvas.set_line_width(line_width);
            for (rx, ry, rw, rh) in &regions {
                stroke_rect(canvas, *rx, *ry, *rw, *rh);
            }
        }
        acc
    }
}

impl Block for TableBlock {
    fn wrap(&self, _avail_width: Pt, _avail_height: Pt) -> Size {
        let header: Pt = self.row_heights(&self.header_rows).iter().copied().sum();
        let body: Pt = self.row_heights(&self.body_rows).iter().copied().sum();
        Size {
            width: self.total_width(),
            height: header + body,
        }
    }

    fn split(
        &self,
        _avail_width: Pt,
        avail_height: Pt,
    ) -> Option<(Box<dyn Block>, Box<dyn Block>)> {
        if self.body_rows.len() < 2 {
            return None;
        }
        let header_height = self.header_height();
        let body_heights = self.row_heights(&self.body_rows);
        let mut used = header_height;
        let mut fit = 0usize;
        for height in &body_heights {
            if used + *height > avail_height {
                break;
            }
            used += *height;
            fit += 1;
        }
        if fit == 0 || fit >= self.body_rows.len() {
            return None;
        }
        let first = Self {
            body_rows: self.body_rows[..fit].to_vec(),
            ..self.clone()
        };
        let second = Self {
            body_rows: self.body_rows[fit..].to_vec(),
            ..self.clone()
        };
        Some((Box::new(first), Box::new(second)))
    }

    fn draw(&self, canvas: &mut Canvas, x: Pt, y: Pt, _avail_width: Pt, _avail_height: Pt) {
        let header_height = self.draw_rows(canvas, x, y, &self.header_rows);
        let body_height = self.draw_rows(canvas, x, y + header_height, &self.body_rows);
        if let Some((line_width, color)) = self.outline {
            canvas.set_stroke_color(color);
            canvas.set_line_width(line_width);
            stroke_rect(canvas, x, y, self.total_width(), header_height + body_height);
        }
    }

    fn debug_name(&self) -> &'static str {
        "TableBlock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Command;
    use crate::types::Size as PageSize;

    fn fonts() -> Arc<FontRegistry> {
        Arc::new(FontRegistry::new())
    }

    fn style() -> TextStyle {
        TextStyle {
            font_name: Arc::from("Helvetica"),
            font_size: Pt::from_i32(10),
            leading: Pt::from_i32(12),
            color: Color::BLACK,
        }
    }

    fn strings(canvas: Canvas) -> Vec<String> {
        let doc = canvas.finish();
        doc.pages
            .iter()
            .flat_map(|p| p.commands.iter())
            .filter_map(|c| match c {
                Command::DrawString { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn paragraph_wraps_greedily() {
        // Unresolved fonts measure 6 pt per char at size 10, so each
        // seven-char word is 42 pt wide and only one fits per 50 pt line.
        let p = Paragraph::new("alfa bravo charli", style(), fonts());
        let size = p.wrap(Pt::from_i32(50), Pt::from_i32(500));
        assert_eq!(size.height.to_milli_i64(), 3 * 12_000);
    }

    #[test]
    fn paragraph_honors_explicit_newlines() {
        let p = Paragraph::new("a\n\nb", style(), fonts());
        let size = p.wrap(Pt::from_i32(200), Pt::from_i32(500));
        assert_eq!(size.height.to_milli_i64(), 3 * 12_000);
    }

    #[test]
    fn paragraph_splits_at_line_boundary() {
        let p = Paragraph::new("alfa bravo charli delta", style(), fonts());
        // Room for two 12 pt lines.
        let (first, second) = p.split(Pt::from_i32(50), Pt::from_i32(25)).unwrap();
        assert_eq!(
            first.wrap(Pt::from_i32(50), Pt::from_i32(25)).height.to_milli_i64(),
            2 * 12_000
        );
        assert_eq!(
            second.wrap(Pt::from_i32(50), Pt::from_i32(500)).height.to_milli_i64(),
            2 * 12_000
        );
    }

    #[test]
    fn single_line_paragraph_does_not_split() {
        let p = Paragraph::new("alfa", style(), fonts());
        assert!(p.split(Pt::from_i32(100), Pt::from_i32(5)).is_none());
    }

    fn bold() -> TextStyle {
        TextStyle {
            font_name: Arc::from("Helvetica-Bold"),
            ..style()
        }
    }

    #[test]
    fn rich_text_wraps_across_style_runs() {
        let runs = vec![
            ("alfa bravo".to_string(), style()),
            ("charli".to_string(), bold()),
        ];
        // 6 pt per char at size 10: the 36 pt bold word does not fit
        // after the 60 pt regular run and wraps to its own line.
        let lines = layout_rich_lines(&fonts(), &runs, Pt::from_i32(70));
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), 1);
        assert_eq!(lines[0][0].0, "alfa bravo");
        assert_eq!(lines[1][0].0, "charli");
        assert_eq!(lines[1][0].1.font_name.as_ref(), "Helvetica-Bold");
    }

    #[test]
    fn rich_cell_draws_each_run_in_its_own_face() {
        let cell = Cell::rich(
            vec![("Typ:".to_string(), bold()), ("B16".to_string(), style())],
            style(),
        );
        let table =
            TableBlock::new(vec![Pt::from_i32(200)], fonts()).with_rows(vec![vec![cell]]);
        let mut canvas = Canvas::new(PageSize::a4());
        table.draw(&mut canvas, Pt::ZERO, Pt::ZERO, Pt::from_i32(200), Pt::from_i32(100));
        let doc = canvas.finish();
        let mut font = String::from("Helvetica");
        let mut drawn = Vec::new();
        for command in doc.pages.iter().flat_map(|p| p.commands.iter()) {
            match command {
                Command::SetFontName(name) => font = name.clone(),
                Command::DrawString { text, .. } => drawn.push((font.clone(), text.clone())),
                _ => {}
            }
        }
        // The separating space binds to the bold segment before it.
        assert_eq!(drawn.len(), 2);
        assert_eq!(drawn[0], ("Helvetica-Bold".to_string(), "Typ: ".to_string()));
        assert_eq!(drawn[1], ("Helvetica".to_string(), "B16".to_string()));
    }

    #[test]
    fn table_split_repeats_header_rows() {
        let header = vec![vec![Cell::text("H", style())]];
        let rows: Vec<Vec<Cell>> = (0..10)
            .map(|i| vec![Cell::text(format!("row {}", i), style())])
            .collect();
        let table = TableBlock::new(vec![Pt::from_i32(100)], fonts())
            .with_header_rows(header)
            .with_rows(rows);
        // Header and each row are 16 pt (one 12 pt line + 2x2 pt pad);
        // 60 pt fits the header plus two rows.
        let (first, second) = table
            .split(Pt::from_i32(100), Pt::from_i32(60))
            .expect("table should split");

        let mut canvas = Canvas::new(PageSize::a4());
        first.draw(&mut canvas, Pt::ZERO, Pt::ZERO, Pt::from_i32(100), Pt::from_i32(60));
        let first_strings = strings(canvas);
        assert!(first_strings.contains(&"H".to_string()));
        assert!(first_strings.contains(&"row 1".to_string()));
        assert!(!first_strings.contains(&"row 2".to_string()));

        let mut canvas = Canvas::new(PageSize::a4());
        second.draw(&mut canvas, Pt::ZERO, Pt::ZERO, Pt::from_i32(100), Pt::from_i32(500));
        let second_strings = strings(canvas);
        assert!(second_strings.contains(&"H".to_string()));
        assert!(second_strings.contains(&"row 2".to_string()));
        assert!(second_strings.contains(&"row 9".to_string()));
    }

    #[test]
    fn table_never_splits_below_one_body_row() {
        let table = TableBlock::new(vec![Pt::from_i32(100)], fonts())
            .with_rows(vec![vec![Cell::text("only", style())]]);
        assert!(table.split(Pt::from_i32(100), Pt::from_i32(5)).is_none());
    }

    #[test]
    fn spanned_cells_are_drawn_once() {
        let rows = vec![
            vec![
                Cell::text("merged", style()).with_col_span(2),
                Cell::text("", style()),
            ],
            vec![Cell::text("a", style()), Cell::text("b", style())],
        ];
        let table = TableBlock::new(vec![Pt::from_i32(50), Pt::from_i32(50)], fonts())
            .with_rows(rows)
            .with_grid(Pt::from_f32(0.5), Color::BLACK);
        let mut canvas = Canvas::new(PageSize::a4());
        table.draw(&mut canvas, Pt::ZERO, Pt::ZERO, Pt::from_i32(100), Pt::from_i32(100));
        let texts = strings(canvas);
        assert_eq!(texts.iter().filter(|t| t.as_str() == "merged").count(), 1);
        assert!(texts.contains(&"a".to_string()));
        assert!(texts.contains(&"b".to_string()));
    }

    #[test]
    fn row_span_grows_short_rows() {
        let rows = vec![
            vec![
                Cell::text("tall\ncell\nhere", style()).with_row_span(2),
                Cell::text("r1", style()),
            ],
            vec![Cell::text("", style()), Cell::text("r2", style())],
        ];
        let table =
            TableBlock::new(vec![Pt::from_i32(80), Pt::from_i32(80)], fonts()).with_rows(rows);
        let size = table.wrap(Pt::from_i32(160), Pt::from_i32(500));
        // Anchor needs 3 lines + padding = 40 pt; two base rows give 32.
        assert_eq!(size.height.to_milli_i64(), 40_000);
    }
}
