use crate::error::RenderError;
use crate::types::Pt;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Logical name the report styles use for the embedded regular face.
pub(crate) const EMBEDDED_REGULAR: &str = "Protocol";
/// Logical name for the bold face. The same font program backs both
/// names when only a single file is supplied.
pub(crate) const EMBEDDED_BOLD: &str = "Protocol-Bold";

/// Outcome of probing the configured font file: either the embedded
/// pair with full diacritic coverage, or the base-14 ASCII-safe pair.
#[derive(Debug, Clone)]
pub struct FontSelection {
    pub regular: Arc<str>,
    pub bold: Arc<str>,
    pub extended: bool,
}

impl FontSelection {
    pub(crate) fn base14() -> Self {
        Self {
            regular: Arc::from("Helvetica"),
            bold: Arc::from("Helvetica-Bold"),
            extended: false,
        }
    }
}

/// Probes `font_file` once. A parseable TrueType face is registered
/// under both logical names; anything else degrades silently to the
/// base-14 pair.
pub(crate) fn resolve_fonts(registry: &mut FontRegistry, font_file: &Path) -> FontSelection {
    let Ok(data) = fs::read(font_file) else {
        return FontSelection::base14();
    };
    if registry
        .register_bytes(data, &[EMBEDDED_REGULAR, EMBEDDED_BOLD])
        .is_err()
    {
        return FontSelection::base14();
    }
    FontSelection {
        regular: Arc::from(EMBEDDED_REGULAR),
        bold: Arc::from(EMBEDDED_BOLD),
        extended: true,
    }
}

#[derive(Debug)]
pub(crate) struct FontRegistry {
    fonts: Vec<RegisteredFont>,
    lookup: HashMap<String, usize>,
}

#[derive(Debug)]
pub(crate) struct RegisteredFont {
    pub(crate) name: String,
    pub(crate) data: Vec<u8>,
    pub(crate) metrics: FontMetrics,
}

#[derive(Debug)]
pub(crate) struct FontMetrics {
    pub(crate) first_char: u8,
    pub(crate) last_char: u8,
    pub(crate) widths: Vec<u16>,
    pub(crate) ascent: i16,
    pub(crate) descent: i16,
    pub(crate) cap_height: i16,
    pub(crate) italic_angle: i16,
    pub(crate) stem_v: i16,
    pub(crate) bbox: (i16, i16, i16, i16),
    pub(crate) missing_width: u16,
    pub(crate) is_fixed_pitch: bool,
}

impl FontRegistry {
    pub(crate) fn new() -> Self {
        Self {
            fonts: Vec::new(),
            lookup: HashMap::new(),
        }
    }

    /// Registers one font program under several logical names.
    /// Aliases that are already taken are skipped, so re-registration
    /// is idempotent rather than an error.
    pub(crate) fn register_bytes(
        &mut self,
        data: Vec<u8>,
        aliases: &[&str],
    ) -> Result<(), RenderError> {
        let mut free_keys: Vec<String> = Vec::new();
        for alias in aliases {
            let key = normalize_name(alias);
            if key.is_empty() || self.lookup.contains_key(&key) || free_keys.contains(&key) {
                continue;
            }
            free_keys.push(key);
        }
        // Every alias taken: re-registration is a no-op, not a second
        // unreachable copy of the font program.
        if free_keys.is_empty() {
            return Ok(());
        }

        let Ok(face) = ttf_parser::Face::parse(&data, 0) else {
            return Err(RenderError::InvalidConfiguration(
                "font data is not a parseable TrueType face".to_string(),
            ));
        };
        // CFF-flavoured OpenType needs a different embedding path; the
        // writer only emits FontFile2 glyf programs.
        if face.tables().cff.is_some() {
            return Err(RenderError::InvalidConfiguration(
                "CFF font programs are not supported for embedding".to_string(),
            ));
        }

        let metrics = FontMetrics::from_face(&face);
        let name = aliases.first().copied().unwrap_or("EmbeddedFont");
        let index = self.fonts.len();
        self.fonts.push(RegisteredFont {
            name: name.to_string(),
            data,
            metrics,
        });

        for key in free_keys {
            self.lookup.insert(key, index);
        }
        Ok(())
    }

    pub(crate) fn resolve(&self, name: &str) -> Option<&RegisteredFont> {
        let key = normalize_name(name);
        self.lookup
            .get(&key)
            .and_then(|index| self.fonts.get(*index))
    }

    /// Advance width of `text` at `font_size`. Unresolved names get a
    /// 0.6 em per-char estimate, matching the base-14 approximation.
    pub(crate) fn measure_text_width(&self, name: &str, font_size: Pt, text: &str) -> Pt {
        let Some(font) = self.resolve(name) else {
            let char_width = (font_size * 0.6).max(Pt::from_f32(1.0));
            return char_width * (text.chars().count() as i32);
        };
        if font.metrics.is_within_basic_range(text) {
            return font.metrics.measure_text_width(font_size, text);
        }
        measure_text_width_full(font, font_size, text)
            .unwrap_or_else(|| font.metrics.measure_text_width(font_size, text))
    }

    pub(crate) fn map_glyph_id_for_char(&self, name: &str, ch: char) -> u16 {
        let Some(font) = self.resolve(name) else {
            return 0;
        };
        if let Ok(face) = ttf_parser::Face::parse(&font.data, 0) {
            if let Some(gid) = face.glyph_index(ch) {
                return gid.0;
            }
        }
        0
    }

    /// Glyph advance in 1000-unit font space, for CID /W arrays.
    pub(crate) fn glyph_advance(&self, name: &str, gid: u16) -> u16 {
        let Some(font) = self.resolve(name) else {
            return 0;
        };
        if let Ok(face) = ttf_parser::Face::parse(&font.data, 0) {
            let advance = face.glyph_hor_advance(ttf_parser::GlyphId(gid)).unwrap_or(0);
            let units = face.units_per_em().max(1) as i64;
            let scaled = ((advance as i64) * 1000 + (units / 2)) / units;
            return scaled.clamp(0, u16::MAX as i64) as u16;
        }
        0
    }
}

impl FontMetrics {
    fn from_face(face: &ttf_parser::Face<'_>) -> Self {
        let units_per_em = face.units_per_em().max(1);
        let scale = 1000.0 / units_per_em as f32;
        let first_char = 32u8;
        let last_char = 255u8;
        let widths = build_widths(face, scale, first_char, last_char);
        let missing_width = widths
            .get((b' ' - first_char) as usize)
            .copied()
            .unwrap_or(0);

        let ascent = scale_i16(face.ascender(), scale);
        let descent = scale_i16(face.descender(), scale);
        let cap_height = face
            .capital_height()
            .map(|value| scale_i16(value, scale))
            .unwrap_or(ascent);
        let bbox = face.global_bounding_box();
        let bbox = (
            scale_i16(bbox.x_min, scale),
            scale_i16(bbox.y_min, scale),
            scale_i16(bbox.x_max, scale),
            scale_i16(bbox.y_max, scale),
        );
        let italic_angle = face
            .italic_angle()
            .map(|value| value.round() as i16)
            .unwrap_or(0);

        Self {
            first_char,
            last_char,
            widths,
            ascent,
            descent,
            cap_height,
            italic_angle,
            stem_v: 80,
            bbox,
            missing_width,
            is_fixed_pitch: face.is_monospaced(),
        }
    }

    fn advance_for_char(&self, ch: char) -> u16 {
        let code = ch as u32;
        let first = self.first_char as u32;
        let last = self.last_char as u32;
        if code < first || code > last {
            return self.missing_width;
        }
        let idx = (code - first) as usize;
        self.widths.get(idx).copied().unwrap_or(self.missing_width)
    }

    fn measure_text_width(&self, font_size: Pt, text: &str) -> Pt {
        let mut total_units: i32 = 0;
        for ch in text.chars() {
            total_units = total_units.saturating_add(self.advance_for_char(ch) as i32);
        }
        if total_units <= 0 {
            return Pt::ZERO;
        }
        font_size.mul_ratio(total_units, 1000)
    }

    fn is_within_basic_range(&self, text: &str) -> bool {
        let first = self.first_char as u32;
        let last = self.last_char as u32;
        text.chars().all(|ch| {
            let code = ch as u32;
            code >= first && code <= last
        })
    }
}

/// Re-parses the face to measure text outside the precomputed Latin-1
/// width table (Polish diacritics land here).
fn measure_text_width_full(font: &RegisteredFont, font_size: Pt, text: &str) -> Option<Pt> {
    let face = ttf_parser::Face::parse(&font.data, 0).ok()?;
    let units_per_em = face.units_per_em().max(1) as i64;
    let mut total_units: i32 = 0;
    for ch in text.chars() {
        let advance = face
            .glyph_index(ch)
            .and_then(|gid| face.glyph_hor_advance(gid))
            .map(|adv| (((adv as i64) * 1000 + (units_per_em / 2)) / units_per_em) as i32)
            .unwrap_or(font.metrics.missing_width as i32);
        total_units = total_units.saturating_add(advance);
    }
    if total_units <= 0 {
        return Some(Pt::ZERO);
    }
    Some(font_size.mul_ratio(total_units, 1000))
}

fn build_widths(face: &ttf_parser::Face<'_>, scale: f32, first: u8, last: u8) -> Vec<u16> {
    let mut widths = Vec::with_capacity((last - first + 1) as usize);
    for code in first..=last {
        let width = char::from_u32(code as u32)
            .and_then(|ch| face.glyph_index(ch))
            .and_then(|id| face.glyph_hor_advance(id))
            .unwrap_or(0);
        let scaled = (width as f32 * scale).round() as i32;
        widths.push(scaled.clamp(0, u16::MAX as i32) as u16);
    }
    widths
}

fn scale_i16(value: i16, scale: f32) -> i16 {
    let scaled = (value as f32 * scale).round() as i32;
    scaled.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

fn normalize_name(name: &str) -> String {
    name.trim()
        .trim_matches('"')
        .trim_matches('\'')
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_font_uses_approximate_width() {
        let registry = FontRegistry::new();
        let width = registry.measure_text_width("Helvetica", Pt::from_i32(10), "abcd");
        assert_eq!(width.to_milli_i64(), 4 * 6000);
    }

    #[test]
    fn resolver_falls_back_when_file_is_missing() {
        let mut registry = FontRegistry::new();
        let selection = resolve_fonts(&mut registry, Path::new("no-such-font.ttf"));
        assert!(!selection.extended);
        assert_eq!(selection.regular.as_ref(), "Helvetica");
        assert_eq!(selection.bold.as_ref(), "Helvetica-Bold");
        assert!(registry.resolve(EMBEDDED_REGULAR).is_none());
    }

    #[test]
    fn register_bytes_rejects_garbage() {
        let mut registry = FontRegistry::new();
        let err = registry.register_bytes(vec![0u8; 16], &[EMBEDDED_REGULAR]);
        assert!(err.is_err());
    }

    #[test]
    fn re_registration_under_taken_aliases_is_a_no_op() {
        let mut registry = FontRegistry::new();
        registry.fonts.push(RegisteredFont {
            name: EMBEDDED_REGULAR.to_string(),
            data: Vec::new(),
            metrics: stub_metrics(),
        });
        registry.lookup.insert(normalize_name(EMBEDDED_REGULAR), 0);
        registry.lookup.insert(normalize_name(EMBEDDED_BOLD), 0);
        // Taken aliases short-circuit before the bytes are parsed or
        // stored, so even unparseable data is accepted as a no-op.
        let result = registry.register_bytes(vec![0u8; 16], &[EMBEDDED_REGULAR, EMBEDDED_BOLD]);
        assert!(result.is_ok());
        assert_eq!(registry.fonts.len(), 1);
    }

    fn stub_metrics() -> FontMetrics {
        FontMetrics {
            first_char: 32,
            last_char: 255,
            widths: vec![600; 224],
            ascent: 800,
            descent: -200,
            cap_height: 700,
            italic_angle: 0,
            stem_v: 80,
            bbox: (0, -200, 1000, 800),
            missing_width: 600,
            is_fixed_pitch: false,
        }
    }

    #[test]
    fn normalize_name_is_case_insensitive() {
        assert_eq!(normalize_name(" Protocol-Bold "), "protocol-bold");
        assert_eq!(normalize_name("\"Protocol\""), "protocol");
    }
}
