//! Assembles the protocol story: the ordered block sequence the page
//! flow lays out. Section order and geometry follow the printed form,
//! with all user text routed through the charset policy.

use crate::block::{Block, Cell, Paragraph, Spacer, TableBlock, TextAlign};
use crate::charset::Charset;
use crate::font::FontRegistry;
use crate::record::{CheckOutcome, CircuitRow, ReportRecord};
use crate::style::{
    BANNER_TINT, BRAND_COLOR, GRID_LINE, GRID_SHADE, LABEL_SHADE, PANEL_SHADE, StyleSheet,
};
use crate::types::{Color, Pt};
use std::sync::Arc;

fn mm(value: f32) -> Pt {
    Pt::from_mm(value)
}

fn rule_width() -> Pt {
    Pt::from_f32(0.5)
}

/// A pre-measured logo image, scaled to the fixed 40 mm slot.
pub(crate) struct LogoPlacement {
    pub source: String,
    pub width: Pt,
    pub height: Pt,
}

pub(crate) struct ReportBuilder<'a> {
    record: &'a ReportRecord,
    styles: &'a StyleSheet,
    charset: Charset,
    logo: Option<LogoPlacement>,
    fonts: Arc<FontRegistry>,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(
        record: &'a ReportRecord,
        styles: &'a StyleSheet,
        charset: Charset,
        logo: Option<LogoPlacement>,
        fonts: Arc<FontRegistry>,
    ) -> Self {
        Self {
            record,
            styles,
            charset,
            logo,
            fonts,
        }
    }

    fn t(&self, text: &str) -> String {
        self.charset.clean(text)
    }

    fn label(&self, text: &str, shade: Color) -> Cell {
        Cell::text(self.t(text), self.styles.label.clone()).with_background(shade)
    }

    fn value(&self, text: &str) -> Cell {
        Cell::text(self.t(text), self.styles.value.clone())
    }

    /// White-on-navy band introducing a numbered section.
    fn section(&self, story: &mut Vec<Box<dyn Block>>, text: &str) {
        story.push(Box::new(Spacer::new(Pt::from_i32(6))));
        story.push(Box::new(
            Paragraph::new(self.t(text), self.styles.section.clone(), self.fonts.clone())
                .with_background(BRAND_COLOR)
                .with_padding(Pt::from_i32(2)),
        ));
    }

    fn header_block(&mut self) -> TableBlock {
        let logo_cell = match self.logo.take() {
            Some(logo) => Cell::image(
                logo.source,
                logo.width,
                logo.height,
                self.styles.value.clone(),
            ),
            None => Cell::text(self.t("[BRAK LOGO]"), self.styles.value.clone()),
        };
        let title = format!(
            "{}\n{}",
            self.t("PROTOKÓŁ BADAŃ INSTALACJI ELEKTRYCZNEJ"),
            self.t("zgodny z PN-HD 60364-6")
        );
        let title_cell =
            Cell::text(title, self.styles.header.clone()).with_align(TextAlign::Right);
        TableBlock::new(vec![mm(50.0), mm(140.0)], self.fonts.clone())
            .with_rows(vec![vec![logo_cell, title_cell]])
    }

    fn meta_block(&self) -> TableBlock {
        let meta = &self.record.meta;
        let rows = vec![
            vec![
                self.label("ZLECENIODAWCA:", LABEL_SHADE),
                self.value(&meta.client),
                self.label("OBIEKT:", LABEL_SHADE),
                self.value(&meta.site),
            ],
            vec![
                self.label("DATA BADANIA:", LABEL_SHADE),
                self.value(&meta.test_date),
                self.label("PROTOKÓŁ NR:", LABEL_SHADE),
                self.value(&meta.protocol_no),
            ],
        ];
        TableBlock::new(vec![mm(30.0), mm(65.0), mm(30.0), mm(65.0)], self.fonts.clone())
            .with_rows(rows)
            .with_grid(rule_width(), GRID_LINE)
    }

    fn instrument_block(&self) -> TableBlock {
        let dev = &self.record.instrument;
        let runs = vec![
            (self.t("Użyty przyrząd:"), self.styles.small_bold.clone()),
            (format!("{} |", self.t(&dev.name)), self.styles.small.clone()),
            (self.t("Producent:"), self.styles.small_bold.clone()),
            (
                format!("{} |", self.t(&dev.manufacturer)),
                self.styles.small.clone(),
            ),
            (self.t("Typ:"), self.styles.small_bold.clone()),
            (format!("{} |", self.t(&dev.model)), self.styles.small.clone()),
            (self.t("Nr seryjny:"), self.styles.small_bold.clone()),
            (self.t(&dev.serial), self.styles.small.clone()),
        ];
        let cell = Cell::rich(runs, self.styles.small.clone()).with_background(BANNER_TINT);
        TableBlock::new(vec![mm(190.0)], self.fonts.clone())
            .with_rows(vec![vec![cell]])
            .with_outline(rule_width(), BRAND_COLOR)
            .with_cell_padding(Pt::from_i32(6), Pt::from_i32(2))
    }

    fn supply_block(&self) -> TableBlock {
        let supply = &self.record.supply;
        let rows = vec![
            vec![
                self.label("Układ sieci", PANEL_SHADE),
                self.value(supply.network.as_str()),
                self.label("Napięcie", PANEL_SHADE),
                self.value(&format!("{} V", supply.voltage)),
            ],
            vec![
                self.label("Uziom", PANEL_SHADE),
                self.value(&supply.earth_electrode),
                self.label("Częstotliwość", PANEL_SHADE),
                self.value(&format!("{} Hz", supply.frequency)),
            ],
            vec![
                self.label("Rez. Uziomu RA", PANEL_SHADE),
                self.value(&format!("{} Ohm", supply.earth_resistance)),
                self.label("Zab. Przedlicz.", PANEL_SHADE),
                self.value(&format!(
                    "{} {}A",
                    supply.main_fuse_kind, supply.main_fuse_rating
                )),
            ],
            vec![
                self.label("Impedancja Ze", PANEL_SHADE),
                self.value(&format!("{} Ohm", supply.source_impedance)),
                self.label("Spodziewany Ipf", PANEL_SHADE),
                self.value(&format!("{} kA", supply.prospective_fault_current)),
            ],
            vec![
                self.label("Przewód PE", PANEL_SHADE),
                self.value(&supply.pe_conductor),
                self.label("Wyłącznik Gł.", PANEL_SHADE),
                self.value(&supply.main_switch),
            ],
        ];
        TableBlock::new(vec![mm(30.0), mm(65.0), mm(30.0), mm(65.0)], self.fonts.clone())
            .with_rows(rows)
            .with_grid(rule_width(), GRID_LINE)
    }

    fn bonding_block(&self) -> TableBlock {
        let summary = self.record.supply.bonding.summary();
        let row = vec![
            self.label("Połączenia wyrównawcze główne:", PANEL_SHADE),
            self.value(&summary),
        ];
        TableBlock::new(vec![mm(60.0), mm(130.0)], self.fonts.clone())
            .with_rows(vec![row])
            .with_outline(rule_width(), GRID_LINE)
    }

    /// Two balanced columns; with an odd item count the left column
    /// carries the extra entry.
    fn inspection_block(&self) -> Option<TableBlock> {
        let items = &self.record.inspection;
        if items.is_empty() {
            return None;
        }
        // The outcome carries the bold emphasis, not the item label.
        let format_item = |(label, outcome): &(String, CheckOutcome)| {
            vec![
                (format!("{}:", self.t(label)), self.styles.small.clone()),
                (
                    self.t(outcome.report_text()),
                    self.styles.small_bold.clone(),
                ),
            ]
        };
        let half = items.len().div_ceil(2);
        let mut rows = Vec::with_capacity(half);
        for i in 0..half {
            let left = format_item(&items[i]);
            let right = items.get(half + i).map(format_item).unwrap_or_default();
            rows.push(vec![
                Cell::rich(left, self.styles.small.clone()),
                Cell::rich(right, self.styles.small.clone()),
            ]);
        }
        Some(
            TableBlock::new(vec![mm(95.0), mm(95.0)], self.fonts.clone())
                .with_rows(rows)
                .with_grid(rule_width(), GRID_SHADE),
        )
    }

    fn header_cell(&self, text: &str) -> Cell {
        Cell::text(self.t(text), self.styles.table_header.clone())
            .with_align(TextAlign::Center)
            .with_background(BRAND_COLOR)
    }

    fn measurement_header(&self) -> Vec<Vec<Cell>> {
        let labels = &self.record.column_labels;
        // Row-spanning cells shadow the unit row beneath them.
        let top = vec![
            self.header_cell(labels.circuit_label()).with_row_span(2),
            self.header_cell("Przewody").with_col_span(2),
            self.header_cell(""),
            self.header_cell("Zabezp.").with_col_span(2),
            self.header_cell(""),
            self.header_cell(labels.insulation_label()).with_row_span(2),
            self.header_cell(labels.loop_label()).with_col_span(2),
            self.header_cell(""),
            self.header_cell("RCD").with_row_span(2),
            self.header_cell("Ocena").with_row_span(2),
        ];
        let units = vec![
            self.header_cell(""),
            self.header_cell("Typ"),
            self.header_cell("mm2"),
            self.header_cell("Typ"),
            self.header_cell("In"),
            self.header_cell(""),
            self.header_cell("Z_pom"),
            self.header_cell("Z_dop"),
            self.header_cell(""),
            self.header_cell(""),
        ];
        vec![top, units]
    }

    fn measurement_row(&self, row: &CircuitRow) -> Vec<Cell> {
        let body = |text: &str| {
            Cell::text(self.t(text), self.styles.small.clone()).with_align(TextAlign::Center)
        };
        vec![
            Cell::text(self.t(&row.circuit), self.styles.small.clone()),
            body(&row.conductor),
            body(&row.cross_section),
            body(&row.device_kind),
            body(&row.device_rating),
            body(&row.insulation_res),
            body(&row.loop_measured),
            body(&row.loop_permissible),
            body(&row.rcd_trip_ms),
            body(row.status().label()),
        ]
    }

    fn measurement_block(&self, rows: &[CircuitRow]) -> TableBlock {
        let widths = [48.0, 15.0, 10.0, 14.0, 11.0, 18.0, 18.0, 18.0, 15.0, 23.0]
            .iter()
            .map(|w| mm(*w))
            .collect();
        let mut table = TableBlock::new(widths, self.fonts.clone())
            .with_header_rows(self.measurement_header())
            .with_grid(rule_width(), GRID_LINE)
            .with_cell_padding(Pt::from_i32(2), Pt::from_i32(2));
        for row in rows {
            table.add_row(self.measurement_row(row));
        }
        table
    }

    fn verdict_block(&self) -> TableBlock {
        let runs = vec![
            (self.t("Orzeczenie:"), self.styles.body_bold.clone()),
            (
                format!("{}\n\n", self.t(self.record.meta.verdict.report_text())),
                self.styles.body.clone(),
            ),
            (self.t("Uwagi:"), self.styles.body_bold.clone()),
            (self.t(&self.record.remarks), self.styles.body.clone()),
        ];
        let cell = Cell::rich(runs, self.styles.body.clone()).with_background(PANEL_SHADE);
        TableBlock::new(vec![mm(190.0)], self.fonts.clone())
            .with_rows(vec![vec![cell]])
            .with_outline(rule_width(), Color::BLACK)
    }

    fn signature_block(&self) -> TableBlock {
        let meta = &self.record.meta;
        let row = vec![
            Cell::text(
                self.t(&format!("Badanie wykonał:\n{}", meta.inspector)),
                self.styles.body.clone(),
            ),
            Cell::text(
                self.t(&format!("Nr uprawnień:\n{}", meta.license_no)),
                self.styles.body.clone(),
            ),
            Cell::text(
                self.t("Podpis: ............................."),
                self.styles.body.clone(),
            ),
        ];
        TableBlock::new(vec![mm(63.0), mm(63.0), mm(64.0)], self.fonts.clone())
            .with_rows(vec![row])
    }

    pub fn build_story(mut self) -> Vec<Box<dyn Block>> {
        let mut story: Vec<Box<dyn Block>> = Vec::new();

        story.push(Box::new(self.header_block()));
        story.push(Box::new(Spacer::new(mm(2.0))));

        story.push(Box::new(self.meta_block()));
        story.push(Box::new(Spacer::new(mm(2.0))));

        story.push(Box::new(self.instrument_block()));
        story.push(Box::new(Spacer::new(mm(3.0))));

        self.section(&mut story, "I. CHARAKTERYSTYKA ZASILANIA (PN-HD 60364)");
        story.push(Box::new(self.supply_block()));
        story.push(Box::new(self.bonding_block()));
        story.push(Box::new(Spacer::new(mm(4.0))));

        self.section(&mut story, "II. WYNIKI OGLĘDZIN (PN-HD 60364-6 p. 6.4.2)");
        if let Some(inspection) = self.inspection_block() {
            story.push(Box::new(inspection));
        }
        story.push(Box::new(Spacer::new(mm(4.0))));

        for (name, rows) in &self.record.tables {
            self.section(&mut story, &format!("III. WYNIKI POMIARÓW: {}", name));
            story.push(Box::new(self.measurement_block(rows)));
            story.push(Box::new(Spacer::new(mm(5.0))));
        }

        story.push(Box::new(Spacer::new(mm(5.0))));
        story.push(Box::new(Paragraph::new(
            self.t("IV. UWAGI KOŃCOWE I ORZECZENIE"),
            self.styles.header.clone(),
            self.fonts.clone(),
        )));
        story.push(Box::new(Spacer::new(Pt::from_i32(5))));
        story.push(Box::new(self.verdict_block()));
        story.push(Box::new(Spacer::new(mm(10.0))));
        story.push(Box::new(self.signature_block()));

        story
    }
}
