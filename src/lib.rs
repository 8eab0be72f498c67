//! Renders electrical installation inspection records into paginated
//! A4 PDF protocols. The record is assembled by the caller; rendering
//! is deterministic for a given record, font file and logo file.

mod block;
mod canvas;
mod charset;
mod doc_template;
mod error;
mod font;
mod frame;
mod pdf;
mod record;
mod report;
mod style;
mod types;

pub use block::{Block, Cell, CellContent, Paragraph, Spacer, TableBlock, TextAlign, TextStyle};
pub use canvas::{Canvas, Command, Document, Page};
pub use charset::{Charset, ascii_fold};
pub use doc_template::DocTemplate;
pub use error::RenderError;
pub use font::FontSelection;
pub use frame::{AddResult, Frame};
pub use record::{
    BondingFlags, CheckOutcome, CircuitRow, ColumnLabels, DEFAULT_CIRCUIT_LABEL,
    DEFAULT_INSULATION_LABEL, DEFAULT_LOOP_LABEL, Instrument, NetworkSystem, ReportMeta,
    ReportRecord, RowStatus, Supply, Verdict, classify, default_inspection_items,
};
pub use style::StyleSheet;
pub use types::{Color, Margins, Pt, Rect, Size};

use font::FontRegistry;
use report::{LogoPlacement, ReportBuilder};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Configures a [`Renderer`]. The font file is probed once at build
/// time; the logo file is probed on every render so it can appear
/// between runs without rebuilding.
#[derive(Debug, Clone)]
pub struct RendererBuilder {
    font_file: PathBuf,
    logo_file: PathBuf,
    page_size: Size,
    margins: Margins,
}

impl Default for RendererBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RendererBuilder {
    pub fn new() -> Self {
        Self {
            font_file: PathBuf::from("font.ttf"),
            logo_file: PathBuf::from("logo.png"),
            page_size: Size::a4(),
            margins: Margins::all_mm(10.0),
        }
    }

    pub fn font_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_file = path.into();
        self
    }

    pub fn logo_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.logo_file = path.into();
        self
    }

    pub fn page_size(mut self, size: Size) -> Self {
        self.page_size = size;
        self
    }

    pub fn margins(mut self, margins: Margins) -> Self {
        self.margins = margins;
        self
    }

    pub fn build(self) -> Renderer {
        let mut registry = FontRegistry::new();
        let selection = font::resolve_fonts(&mut registry, &self.font_file);
        let styles = StyleSheet::new(&selection);
        Renderer {
            fonts: Arc::new(registry),
            selection,
            styles,
            logo_file: self.logo_file,
            page_size: self.page_size,
            margins: self.margins,
        }
    }
}

pub struct Renderer {
    fonts: Arc<FontRegistry>,
    selection: FontSelection,
    styles: StyleSheet,
    logo_file: PathBuf,
    page_size: Size,
    margins: Margins,
}

impl Renderer {
    /// Whether the embedded font pair is active, which keeps Polish
    /// diacritics intact instead of folding them to ASCII.
    pub fn extended_charset(&self) -> bool {
        self.selection.extended
    }

    /// Lays out and serializes one protocol. The record must carry at
    /// least one measurement table.
    pub fn render(&self, record: &ReportRecord) -> Result<Vec<u8>, RenderError> {
        if record.tables.is_empty() {
            return Err(RenderError::InvalidRecord(
                "record has no measurement tables".to_string(),
            ));
        }

        let charset = Charset::new(self.selection.extended);
        let logo = probe_logo(&self.logo_file);
        let builder = ReportBuilder::new(
            record,
            &self.styles,
            charset,
            logo,
            self.fonts.clone(),
        );

        let mut doc = DocTemplate::new(self.page_size, self.margins);
        for block in builder.build_story() {
            doc.add_block(block);
        }
        let document = doc.build()?;
        let bytes = pdf::document_to_pdf(&document, &self.fonts, Some(&record.meta.protocol_no))?;
        Ok(bytes)
    }
}

/// Scales the logo into its fixed 40 mm slot, preserving aspect ratio.
/// The whole image is decoded here, not just its header, so a file
/// whose pixel data is truncated or corrupt lands on the placeholder
/// path instead of an empty header cell. Any probe failure renders the
/// text placeholder instead.
fn probe_logo(path: &Path) -> Option<LogoPlacement> {
    use image::GenericImageView;

    let data = std::fs::read(path).ok()?;
    let decoded = image::load_from_memory(&data).ok()?;
    let (width, height) = decoded.dimensions();
    if width == 0 || height == 0 {
        return None;
    }
    let target_width = Pt::from_mm(40.0);
    let target_height = target_width.mul_ratio(height as i32, width as i32);
    Some(LogoPlacement {
        source: path.to_string_lossy().into_owned(),
        width: target_width,
        height: target_height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> ReportRecord {
        let inspection = default_inspection_items()
            .into_iter()
            .map(|item| (item.to_string(), CheckOutcome::Positive))
            .collect();
        ReportRecord {
            meta: ReportMeta {
                client: "Jan Kowalski".to_string(),
                site: "ul. Polna 1, Warszawa".to_string(),
                test_date: "2026-08-27".to_string(),
                protocol_no: "EL/105/2026".to_string(),
                inspector: "Adam Nowak".to_string(),
                license_no: "E/123/2020".to_string(),
                verdict: Verdict::Fit,
            },
            instrument: Instrument {
                name: "Sonel MPI-530".to_string(),
                manufacturer: "Sonel".to_string(),
                model: "MPI-530".to_string(),
                serial: "A12345".to_string(),
            },
            supply: Supply {
                network: NetworkSystem::TnCS,
                voltage: "230/400".to_string(),
                frequency: "50".to_string(),
                earth_electrode: "Otokowy".to_string(),
                earth_resistance: "8.4".to_string(),
                source_impedance: "0.32".to_string(),
                prospective_fault_current: "0.7".to_string(),
                main_fuse_kind: "gG".to_string(),
                main_fuse_rating: "25".to_string(),
                main_switch: "FR 303".to_string(),
                pe_conductor: "6 mm2 Cu".to_string(),
                bonding: BondingFlags {
                    water: true,
                    gas: true,
                    structure: false,
                    heating: false,
                },
            },
            inspection,
            tables: vec![("Rozdzielnica RG".to_string(), vec![row("Gniazda parter")])],
            column_labels: ColumnLabels::default(),
            remarks: "Brak uwag".to_string(),
        }
    }

    fn row(circuit: &str) -> CircuitRow {
        CircuitRow {
            circuit: circuit.to_string(),
            conductor: "YDYp 3x2.5".to_string(),
            cross_section: "2.5".to_string(),
            device_kind: "B".to_string(),
            device_rating: "16".to_string(),
            insulation_res: ">500".to_string(),
            loop_measured: "1.21".to_string(),
            loop_permissible: "1.44".to_string(),
            rcd_trip_ms: "24".to_string(),
        }
    }

    fn renderer() -> Renderer {
        // Nonexistent assets: base-14 fonts, text logo placeholder.
        RendererBuilder::new()
            .font_file("missing-font.ttf")
            .logo_file("missing-logo.png")
            .build()
    }

    #[test]
    fn renders_a_complete_protocol() {
        let renderer = renderer();
        assert!(!renderer.extended_charset());
        let bytes = renderer.render(&sample_record()).expect("renders");
        assert!(bytes.starts_with(b"%PDF-1.7\n"));
        assert!(bytes.ends_with(b"%%EOF"));
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Title (EL/105/2026)"));
        assert!(text.contains("PROTOKOL BADAN INSTALACJI ELEKTRYCZNEJ"));
        assert!(text.contains("[BRAK LOGO]"));
        assert!(text.contains("INSTALACJA NADAJE SIE DO EKSPLOATACJI"));
    }

    #[test]
    fn long_tables_paginate_with_repeated_headers() {
        let mut record = sample_record();
        let rows = (0..60).map(|i| row(&format!("Obwod {}", i))).collect();
        record.tables = vec![("Rozdzielnica RG".to_string(), rows)];
        let bytes = renderer().render(&record).expect("renders");
        let text = String::from_utf8_lossy(&bytes);
        let pages = text.matches("/Type /Page ").count();
        assert!(pages >= 2, "expected at least two pages, got {}", pages);
        let headers = text.matches("Obwod / Opis").count();
        assert!(headers >= 2, "header should repeat after a split");
        assert!(text.contains("Obwod 59"));
    }

    #[test]
    fn record_without_tables_is_rejected() {
        let mut record = sample_record();
        record.tables.clear();
        let err = renderer().render(&record).unwrap_err();
        assert!(matches!(err, RenderError::InvalidRecord(_)));
        // The same renderer still works on a valid record afterwards.
        assert!(renderer().render(&sample_record()).is_ok());
    }

    #[test]
    fn diacritics_fold_without_an_embedded_font() {
        let mut record = sample_record();
        record.meta.client = "Żółć Jaźń".to_string();
        let bytes = renderer().render(&record).expect("renders");
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("Zolc Jazn"));
    }

    #[test]
    fn corrupt_logo_body_falls_back_to_the_placeholder() {
        let dir = std::env::temp_dir();
        let full = dir.join("eicr-render-logo-full.png");
        let truncated = dir.join("eicr-render-logo-truncated.png");
        image::RgbImage::new(4, 2).save(&full).expect("writes png");
        let bytes = std::fs::read(&full).expect("reads png");
        // Keep the signature, the IHDR chunk, and the next chunk's
        // length/type; drop the pixel data. The header still yields
        // dimensions but the body cannot decode.
        std::fs::write(&truncated, &bytes[..41]).expect("writes stub");
        assert!(image::image_dimensions(&truncated).is_ok());
        assert!(probe_logo(&truncated).is_none());

        let renderer = RendererBuilder::new()
            .font_file("missing-font.ttf")
            .logo_file(&truncated)
            .build();
        let bytes = renderer.render(&sample_record()).expect("renders");
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("[BRAK LOGO]"));
        assert!(!text.contains("/XObject"));
        std::fs::remove_file(&full).ok();
        std::fs::remove_file(&truncated).ok();
    }

    #[test]
    fn present_logo_scales_into_the_fixed_slot() {
        let path = std::env::temp_dir().join("eicr-render-logo-probe.png");
        image::RgbImage::new(4, 2).save(&path).expect("writes png");
        let placement = probe_logo(&path).expect("probes");
        assert_eq!(placement.width, Pt::from_mm(40.0));
        assert_eq!(placement.height, Pt::from_mm(20.0));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn negative_checks_appear_in_the_checklist() {
        let mut record = sample_record();
        record.inspection = vec![
            ("Stan izolacji".to_string(), CheckOutcome::Negative),
            ("Ochrona podstawowa".to_string(), CheckOutcome::NotApplicable),
        ];
        let bytes = renderer().render(&record).expect("renders");
        let text = String::from_utf8_lossy(&bytes);
        // The outcome is a separate bold text run after the label.
        assert!(text.contains("Stan izolacji:"));
        assert!(text.contains("NEGATYWNY"));
        assert!(text.contains("Ochrona podstawowa:"));
        assert!(text.contains("N/D"));
    }
}
