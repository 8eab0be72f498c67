//! Streaming PDF serializer. Objects are written as soon as they are
//! complete; only object offsets and resource tables are held back for
//! the xref section at the end.

use crate::canvas::{Command, Document, Page};
use crate::charset::ascii_fold;
use crate::font::{FontRegistry, RegisteredFont};
use crate::types::{Color, Pt, Size};
use fixed::types::I32F32;
use image::GenericImageView;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::{self, Write};
use std::path::Path;

const PDF_CATALOG_ID: usize = 1;
const PDF_PAGES_ID: usize = 2;
const PDF_RESOURCES_ID: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FontEncoding {
    WinAnsi,
    IdentityH,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamFontKind {
    Type1,
    TrueTypeIdentityH,
}

struct StreamFont {
    logical_name: String,
    resource: String,
    encoding: FontEncoding,
    start_id: usize,
    kind: StreamFontKind,
    glyph_map: BTreeMap<u16, String>,
}

impl StreamFont {
    fn font_object_id(&self) -> usize {
        match self.kind {
            StreamFontKind::Type1 => self.start_id,
            // Identity-H allocates font file, descriptor, CID font and
            // ToUnicode before the Type0 object.
            StreamFontKind::TrueTypeIdentityH => self.start_id + 4,
        }
    }
}

pub(crate) struct PdfStreamWriter<'a, W: Write> {
    writer: &'a mut W,
    offset: usize,
    offsets: Vec<usize>, // indexed by object id; 0 is the free object.
    next_id: usize,
    page_size: Size,
    registry: &'a FontRegistry,
    title: Option<String>,

    fonts: BTreeMap<String, StreamFont>,
    next_font_resource: usize,

    image_resources: Vec<(String, usize)>,
    image_name_map: HashMap<String, String>,
    image_content_map: HashMap<u64, String>,
    next_image_index: usize,

    page_ids: Vec<usize>,
}

impl<'a, W: Write> PdfStreamWriter<'a, W> {
    pub(crate) fn new(
        writer: &'a mut W,
        page_size: Size,
        registry: &'a FontRegistry,
        title: Option<&str>,
    ) -> io::Result<Self> {
        let mut offset: usize = 0;
        write_bytes(writer, b"%PDF-1.7\n", &mut offset)?;
        write_bytes(writer, b"%\xE2\xE3\xCF\xD3\n", &mut offset)?;

        Ok(Self {
            writer,
            offset,
            offsets: vec![0; PDF_RESOURCES_ID + 1],
            next_id: PDF_RESOURCES_ID + 1,
            page_size,
            registry,
            title: title.map(|t| t.to_string()),
            fonts: BTreeMap::new(),
            next_font_resource: 1,
            image_resources: Vec::new(),
            image_name_map: HashMap::new(),
            image_content_map: HashMap::new(),
            next_image_index: 1,
            page_ids: Vec::new(),
        })
    }

    pub(crate) fn add_page(&mut self, page: &Page) -> io::Result<()> {
        let start = self.alloc_ids(2);
        let content_id = start;
        let page_id = start + 1;

        let content_stream = self.render_commands(&page.commands, self.page_size.height)?;
        self.write_object(content_id, &stream_object(&content_stream))?;

        let page_obj = format!(
            "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {} {}] /Resources {} 0 R /Contents {} 0 R >>",
            PDF_PAGES_ID,
            fmt_pt(self.page_size.width),
            fmt_pt(self.page_size.height),
            PDF_RESOURCES_ID,
            content_id
        );
        self.write_object(page_id, &page_obj)?;
        self.page_ids.push(page_id);
        Ok(())
    }

    pub(crate) fn finish(mut self) -> io::Result<usize> {
        // 1) Font objects, deferred until every used glyph is known.
        let fonts = std::mem::take(&mut self.fonts);
        for font_state in fonts.values() {
            match font_state.kind {
                StreamFontKind::Type1 => {
                    self.write_object(
                        font_state.start_id,
                        &font_object(&font_state.logical_name),
                    )?;
                }
                StreamFontKind::TrueTypeIdentityH => {
                    let Some(font) = self.registry.resolve(&font_state.logical_name) else {
                        return Err(io::Error::new(
                            io::ErrorKind::NotFound,
                            format!("font not found in registry: {}", font_state.logical_name),
                        ));
                    };
                    let objects = build_cidfont_objects(
                        font,
                        self.registry,
                        &font_state.glyph_map,
                        font_state.start_id,
                    );
                    for (i, obj) in objects.iter().enumerate() {
                        self.write_object(font_state.start_id + i, obj)?;
                    }
                }
            }
        }

        // 2) Resources dictionary, referenced by every page.
        let font_entries: Vec<(String, usize)> = fonts
            .values()
            .map(|f| (f.resource.clone(), f.font_object_id()))
            .collect();
        let mut resources = vec![format!("/Font {}", font_resources(&font_entries))];
        if !self.image_resources.is_empty() {
            resources.push(format!(
                "/XObject {}",
                xobject_resources(&self.image_resources)
            ));
        }
        self.write_object(PDF_RESOURCES_ID, &format!("<< {} >>", resources.join(" ")))?;

        // 3) Page tree root.
        let kids = self
            .page_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");
        self.write_object(
            PDF_PAGES_ID,
            &format!(
                "<< /Type /Pages /Count {} /Kids [{}] >>",
                self.page_ids.len(),
                kids
            ),
        )?;

        // 4) Info + catalog.
        let title = self.title.take();
        let mut info_id = None;
        if title.is_some() {
            let id = self.alloc_ids(1);
            self.write_object(id, &info_object(title.as_deref()))?;
            info_id = Some(id);
        }
        let mut catalog = format!("<< /Type /Catalog /Pages {} 0 R", PDF_PAGES_ID);
        if title.is_some() {
            catalog.push_str(" /ViewerPreferences << /DisplayDocTitle true >>");
        }
        catalog.push_str(" >>");
        self.write_object(PDF_CATALOG_ID, &catalog)?;

        // 5) XRef + trailer.
        let total_objects = self.next_id.saturating_sub(1);
        let xref_start = self.offset;
        write_str(
            self.writer,
            &format!("xref\n0 {}\n", total_objects + 1),
            &mut self.offset,
        )?;
        write_bytes(self.writer, b"0000000000 65535 f \n", &mut self.offset)?;
        for id in 1..=total_objects {
            let obj_offset = self.offsets.get(id).copied().unwrap_or(0);
            write_str(
                self.writer,
                &format!("{:010} 00000 n \n", obj_offset),
                &mut self.offset,
            )?;
        }
        let mut trailer = format!(
            "trailer\n<< /Size {} /Root {} 0 R",
            total_objects + 1,
            PDF_CATALOG_ID
        );
        if let Some(id) = info_id {
            trailer.push_str(&format!(" /Info {} 0 R", id));
        }
        trailer.push_str(&format!(" >>\nstartxref\n{}\n%%EOF", xref_start));
        write_str(self.writer, &trailer, &mut self.offset)?;

        Ok(self.offset)
    }

    fn render_commands(&mut self, commands: &[Command], page_height: Pt) -> io::Result<String> {
        let mut out = String::new();
        let mut current_font_size = Pt::from_f32(12.0);
        let mut current_font_name = "Helvetica".to_string();
        let mut current_fill = Color::BLACK;

        for cmd in commands {
            match cmd {
                Command::SetFillColor(color) => {
                    current_fill = *color;
                    out.push_str(&color_to_pdf_fill(*color));
                }
                Command::SetStrokeColor(color) => {
                    out.push_str(&color_to_pdf_stroke(*color));
                }
                Command::SetLineWidth(width) => {
                    out.push_str(&format!("{} w\n", fmt_pt(*width)));
                }
                Command::SetFontName(name) => {
                    current_font_name = name.clone();
                }
                Command::SetFontSize(size) => {
                    current_font_size = *size;
                }
                Command::MoveTo { x, y } => {
                    out.push_str(&format!("{} {} m\n", fmt_pt(*x), fmt_pt(page_height - *y)));
                }
                Command::LineTo { x, y } => {
                    out.push_str(&format!("{} {} l\n", fmt_pt(*x), fmt_pt(page_height - *y)));
                }
                Command::Stroke => out.push_str("S\n"),
                Command::DrawString { x, y, text } => {
                    if !self.fonts.contains_key(&current_font_name) {
                        self.ensure_font(&current_font_name)?;
                    }
                    let Some((resource, encoding)) = self
                        .fonts
                        .get(&current_font_name)
                        .map(|f| (f.resource.clone(), f.encoding))
                    else {
                        continue;
                    };
                    out.push_str("BT\n");
                    out.push_str(&format!("/{} {} Tf\n", resource, fmt_pt(current_font_size)));
                    out.push_str(&format!(
                        "{} {} Td\n",
                        fmt_pt(*x),
                        fmt_pt(page_height - *y - current_font_size)
                    ));
                    match encoding {
                        FontEncoding::WinAnsi => {
                            out.push_str(&format!("({}) Tj\n", encode_winansi_pdf_string(text)));
                        }
                        FontEncoding::IdentityH => {
                            let hex = self.encode_cid_hex(&current_font_name, text);
                            out.push_str(&format!("{} Tj\n", hex));
                        }
                    }
                    out.push_str("ET\n");
                }
                Command::DrawRect {
                    x,
                    y,
                    width,
                    height,
                } => {
                    let draw_y = page_height - *y - *height;
                    out.push_str(&format!(
                        "{} {} {} {} re\nf\n",
                        fmt_pt(*x),
                        fmt_pt(draw_y),
                        fmt_pt(*width),
                        fmt_pt(*height)
                    ));
                }
                Command::DrawImage {
                    x,
                    y,
                    width,
                    height,
                    resource_id,
                } => {
                    if let Some(name) = self.ensure_image(resource_id)? {
                        let draw_y = page_height - *y - *height;
                        out.push_str("q\n");
                        out.push_str(&format!(
                            "{} 0 0 {} {} {} cm\n",
                            fmt_pt(*width),
                            fmt_pt(*height),
                            fmt_pt(*x),
                            fmt_pt(draw_y)
                        ));
                        out.push_str(&format!("/{} Do\n", name));
                        out.push_str("Q\n");
                    } else {
                        // Image missing: re-assert the fill so later
                        // operators are unaffected.
                        out.push_str(&color_to_pdf_fill(current_fill));
                    }
                }
            }
        }
        Ok(out)
    }

    fn ensure_offsets_len(&mut self, required_len: usize) {
        if self.offsets.len() < required_len {
            self.offsets.resize(required_len, 0);
        }
    }

    fn alloc_ids(&mut self, count: usize) -> usize {
        let start = self.next_id;
        self.next_id = self.next_id.saturating_add(count);
        self.ensure_offsets_len(self.next_id);
        start
    }

    fn write_object(&mut self, obj_id: usize, body: &str) -> io::Result<()> {
        write_pdf_object(
            self.writer,
            &mut self.offset,
            &mut self.offsets,
            obj_id,
            body,
        )
    }

    fn ensure_font(&mut self, name: &str) -> io::Result<()> {
        if self.fonts.contains_key(name) {
            return Ok(());
        }

        let resource = format!("F{}", self.next_font_resource);
        self.next_font_resource += 1;

        // Registered faces go out as embedded Identity-H Type0 fonts;
        // base-14 names and unresolved logical names degrade to Type1
        // with WinAnsi encoding.
        let (kind, encoding) = if !is_base14_font(name) && self.registry.resolve(name).is_some() {
            (StreamFontKind::TrueTypeIdentityH, FontEncoding::IdentityH)
        } else {
            (StreamFontKind::Type1, FontEncoding::WinAnsi)
        };

        let start_id = self.alloc_ids(match kind {
            StreamFontKind::Type1 => 1,
            StreamFontKind::TrueTypeIdentityH => 5,
        });

        self.fonts.insert(
            name.to_string(),
            StreamFont {
                logical_name: name.to_string(),
                resource,
                encoding,
                start_id,
                kind,
                glyph_map: BTreeMap::new(),
            },
        );
        Ok(())
    }

    /// Hex-encoded glyph string for Identity-H text, recording every
    /// glyph so the /W array and ToUnicode CMap cover exactly the used
    /// set.
    fn encode_cid_hex(&mut self, font_name: &str, text: &str) -> String {
        let mut out = String::new();
        out.push('<');
        for ch in text.chars() {
            let gid = self.registry.map_glyph_id_for_char(font_name, ch);
            if gid != 0 {
                if let Some(font_state) = self.fonts.get_mut(font_name) {
                    font_state
                        .glyph_map
                        .entry(gid)
                        .or_insert_with(|| ch.to_string());
                }
            }
            out.push_str(&format!("{:04X}", gid));
        }
        out.push('>');
        out
    }

    fn ensure_image(&mut self, source: &str) -> io::Result<Option<String>> {
        if let Some(name) = self.image_name_map.get(source) {
            return Ok(Some(name.clone()));
        }
        let Some(image) = load_image(source) else {
            return Ok(None);
        };

        let hash = hash_image(&image);
        if let Some(name) = self.image_content_map.get(&hash) {
            let name = name.clone();
            self.image_name_map.insert(source.to_string(), name.clone());
            return Ok(Some(name));
        }

        let smask_id = image.alpha.as_ref().map(|_| self.alloc_ids(1));
        let obj_id = self.alloc_ids(1);
        let name = format!("Im{}", self.next_image_index);
        self.next_image_index += 1;

        if let (Some(alpha), Some(mask_id)) = (image.alpha.as_ref(), smask_id) {
            self.write_object(mask_id, &image_smask_object(alpha))?;
        }
        self.write_object(obj_id, &image_object(&image, smask_id))?;
        self.image_resources.push((name.clone(), obj_id));
        self.image_name_map.insert(source.to_string(), name.clone());
        self.image_content_map.insert(hash, name.clone());
        Ok(Some(name))
    }
}

/// Serializes a finished document, embedding fonts from `registry` and
/// stamping `title` into the Info dictionary when present.
pub(crate) fn document_to_pdf(
    document: &Document,
    registry: &FontRegistry,
    title: Option<&str>,
) -> io::Result<Vec<u8>> {
    let mut out: Vec<u8> = Vec::new();
    let mut writer = PdfStreamWriter::new(&mut out, document.page_size, registry, title)?;
    for page in &document.pages {
        writer.add_page(page)?;
    }
    writer.finish()?;
    Ok(out)
}

fn is_base14_font(name: &str) -> bool {
    let n = name
        .trim()
        .trim_matches('"')
        .trim_matches('\'')
        .to_ascii_lowercase();
    matches!(
        n.as_str(),
        "courier"
            | "courier-bold"
            | "courier-oblique"
            | "courier-boldoblique"
            | "helvetica"
            | "helvetica-bold"
            | "helvetica-oblique"
            | "helvetica-boldoblique"
            | "times-roman"
            | "times-bold"
            | "times-italic"
            | "times-bolditalic"
            | "symbol"
            | "zapfdingbats"
    )
}

fn build_cidfont_objects(
    font: &RegisteredFont,
    registry: &FontRegistry,
    used_glyphs: &BTreeMap<u16, String>,
    start_id: usize,
) -> Vec<String> {
    let font_file_id = start_id;
    let descriptor_id = start_id + 1;
    let cid_font_id = start_id + 2;
    let to_unicode_id = start_id + 3;

    let mut objects = Vec::new();
    objects.push(font_file_object(&font.data));
    objects.push(font_descriptor_object(font, font_file_id));

    let mut glyph_map = used_glyphs.clone();
    if glyph_map.is_empty() {
        // At least include space so the CMap is never empty.
        let gid = registry.map_glyph_id_for_char(&font.name, ' ');
        if gid != 0 {
            glyph_map.insert(gid, " ".to_string());
        }
    }
    let used_gids: BTreeSet<u16> = glyph_map.keys().copied().collect();

    let mut w_entries: Vec<String> = Vec::new();
    for gid in &used_gids {
        let adv = registry.glyph_advance(&font.name, *gid);
        let width = if adv > 0 {
            adv
        } else {
            font.metrics.missing_width
        };
        w_entries.push(format!("{} [{}]", gid, width));
    }
    let w_array = if w_entries.is_empty() {
        String::new()
    } else {
        format!("/W [{}]", w_entries.join(" "))
    };

    objects.push(format!(
        "<< /Type /Font /Subtype /CIDFontType2 /BaseFont /{} /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> /FontDescriptor {} 0 R {} /CIDToGIDMap /Identity >>",
        sanitize_font_name(&font.name),
        descriptor_id,
        w_array
    ));

    objects.push(stream_object(&to_unicode_cmap(&glyph_map)));

    objects.push(format!(
        "<< /Type /Font /Subtype /Type0 /BaseFont /{} /Encoding /Identity-H /DescendantFonts [{} 0 R] /ToUnicode {} 0 R >>",
        sanitize_font_name(&font.name),
        cid_font_id,
        to_unicode_id
    ));

    objects
}

fn font_descriptor_object(font: &RegisteredFont, font_file_id: usize) -> String {
    let base = sanitize_font_name(&font.name);
    let metrics = &font.metrics;
    let mut flags = 32;
    if metrics.is_fixed_pitch {
        flags |= 1;
    }
    format!(
        "<< /Type /FontDescriptor /FontName /{} /Flags {} /FontBBox [{} {} {} {}] /ItalicAngle {} /Ascent {} /Descent {} /CapHeight {} /StemV {} /MissingWidth {} /FontFile2 {} 0 R >>",
        base,
        flags,
        metrics.bbox.0,
        metrics.bbox.1,
        metrics.bbox.2,
        metrics.bbox.3,
        metrics.italic_angle,
        metrics.ascent,
        metrics.descent,
        metrics.cap_height,
        metrics.stem_v,
        metrics.missing_width,
        font_file_id
    )
}

fn font_file_object(data: &[u8]) -> String {
    let hex = ascii_hex_encode(data);
    let mut stream_data = String::new();
    stream_data.push_str(&hex);
    stream_data.push('>');
    stream_data.push('\n');
    let length = stream_data.as_bytes().len();
    format!(
        "<< /Length {} /Length1 {} /Filter /ASCIIHexDecode >>\nstream\n{}endstream",
        length,
        data.len(),
        stream_data
    )
}

fn font_object(name: &str) -> String {
    format!(
        "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
        sanitize_font_name(name)
    )
}

fn font_resources(fonts: &[(String, usize)]) -> String {
    let mut entries = Vec::new();
    for (resource, font_id) in fonts {
        entries.push(format!("/{} {} 0 R", resource, font_id));
    }
    format!("<< {} >>", entries.join(" "))
}

fn xobject_resources(images: &[(String, usize)]) -> String {
    let mut entries = Vec::new();
    for (resource, image_id) in images {
        entries.push(format!("/{} {} 0 R", resource, image_id));
    }
    format!("<< {} >>", entries.join(" "))
}

fn sanitize_font_name(name: &str) -> String {
    let mut out = String::new();
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' {
            out.push(ch);
        } else if ch == ' ' {
            out.push('-');
        }
    }
    if out.is_empty() {
        "EmbeddedFont".to_string()
    } else {
        out
    }
}

struct ImageData {
    width: u32,
    height: u32,
    color_space: &'static str,
    bits_per_component: u8,
    filter: &'static str,
    data: Vec<u8>,
    alpha: Option<AlphaData>,
}

struct AlphaData {
    width: u32,
    height: u32,
    bits_per_component: u8,
    data: Vec<u8>,
}

fn load_image(source: &str) -> Option<ImageData> {
    let bytes = std::fs::read(Path::new(source)).ok()?;
    decode_image_bytes(&bytes)
}

fn decode_image_bytes(data: &[u8]) -> Option<ImageData> {
    let format = image::guess_format(data).ok();
    let decoded = image::load_from_memory(data).ok()?;
    let (width, height) = decoded.dimensions();

    // JPEG passes through untouched; PDF viewers decode DCT natively.
    if matches!(format, Some(image::ImageFormat::Jpeg)) {
        let color_space = match decoded.color() {
            image::ColorType::L8 | image::ColorType::La8 => "/DeviceGray",
            _ => "/DeviceRGB",
        };
        return Some(ImageData {
            width,
            height,
            color_space,
            bits_per_component: 8,
            filter: "/DCTDecode",
            data: data.to_vec(),
            alpha: None,
        });
    }

    let rgba = decoded.to_rgba8();
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    let mut has_alpha = false;
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        if a != 255 {
            has_alpha = true;
        }
        rgb.extend_from_slice(&[r, g, b]);
        alpha.push(a);
    }

    let alpha = if has_alpha {
        Some(AlphaData {
            width,
            height,
            bits_per_component: 8,
            data: flate_compress(&alpha),
        })
    } else {
        None
    };
    Some(ImageData {
        width,
        height,
        color_space: "/DeviceRGB",
        bits_per_component: 8,
        filter: "/FlateDecode",
        data: flate_compress(&rgb),
        alpha,
    })
}

fn flate_compress(data: &[u8]) -> Vec<u8> {
    use flate2::Compression;
    use flate2::write::ZlibEncoder;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    let _ = encoder.write_all(data);
    encoder.finish().unwrap_or_default()
}

fn hash_image(image: &ImageData) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    image.data.hash(&mut hasher);
    if let Some(alpha) = &image.alpha {
        alpha.data.hash(&mut hasher);
    }
    hasher.finish()
}

fn image_object(image: &ImageData, smask_id: Option<usize>) -> String {
    let stream_data = encode_stream_data(&image.data);
    let filters = match image.filter {
        "/DCTDecode" => "[/ASCIIHexDecode /DCTDecode]",
        _ => "[/ASCIIHexDecode /FlateDecode]",
    };
    let smask = smask_id
        .map(|id| format!(" /SMask {} 0 R", id))
        .unwrap_or_default();
    format!(
        "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace {} /BitsPerComponent {} /Length {} /Filter {}{} >>
stream
{}
endstream",
        image.width,
        image.height,
        image.color_space,
        image.bits_per_component,
        stream_data.as_bytes().len(),
        filters,
        smask,
        stream_data
    )
}

fn image_smask_object(alpha: &AlphaData) -> String {
    let stream_data = encode_stream_data(&alpha.data);
    format!(
        "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceGray /BitsPerComponent {} /Length {} /Filter [/ASCIIHexDecode /FlateDecode] >>
stream
{}
endstream",
        alpha.width,
        alpha.height,
        alpha.bits_per_component,
        stream_data.as_bytes().len(),
        stream_data
    )
}

fn encode_stream_data(data: &[u8]) -> String {
    let mut hex = ascii_hex_encode(data);
    hex.push('>');
    hex
}

fn ascii_hex_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for (index, byte) in data.iter().enumerate() {
        use std::fmt::Write;
        let _ = write!(&mut out, "{:02X}", byte);
        if index % 32 == 31 {
            out.push('\n');
        }
    }
    out
}

fn stream_object(content: &str) -> String {
    let length = content.as_bytes().len();
    format!("<< /Length {} >>\nstream\n{}\nendstream", length, content)
}

fn info_object(title: Option<&str>) -> String {
    let mut entries: Vec<String> = Vec::new();
    if let Some(title) = title {
        entries.push(format!("/Title ({})", escape_pdf_string(title)));
    }
    if entries.is_empty() {
        entries.push("/Producer (eicr-render)".to_string());
    }
    format!("<< {} >>", entries.join(" "))
}

fn write_pdf_object<W: Write>(
    writer: &mut W,
    offset: &mut usize,
    offsets: &mut [usize],
    obj_id: usize,
    body: &str,
) -> io::Result<()> {
    if let Some(slot) = offsets.get_mut(obj_id) {
        *slot = *offset;
    }
    write_str(writer, &format!("{} 0 obj\n", obj_id), offset)?;
    write_bytes(writer, body.as_bytes(), offset)?;
    write_bytes(writer, b"\nendobj\n", offset)?;
    Ok(())
}

fn write_bytes<W: Write>(writer: &mut W, data: &[u8], offset: &mut usize) -> io::Result<()> {
    writer.write_all(data)?;
    *offset += data.len();
    Ok(())
}

fn write_str<W: Write>(writer: &mut W, data: &str, offset: &mut usize) -> io::Result<()> {
    write_bytes(writer, data.as_bytes(), offset)
}

/// Escapes document-information strings. Literal strings carry
/// PDFDocEncoding, which tracks Latin-1 over A0..FF, so that range is
/// octal-escaped; anything beyond it folds to ASCII or `?`.
fn escape_pdf_string(input: &str) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ' '..='~' => out.push(ch),
            '\u{00A0}'..='\u{00FF}' => {
                let _ = write!(&mut out, "\\{:03o}", ch as u32);
            }
            _ => {
                let folded = ascii_fold(&ch.to_string());
                match folded.chars().next() {
                    Some(sub) if sub.is_ascii_graphic() || sub == ' ' => out.push(sub),
                    _ => out.push('?'),
                }
            }
        }
    }
    out
}

fn encode_winansi_pdf_string(input: &str) -> String {
    let mut out = String::new();
    for ch in input.chars() {
        // ASCII fallbacks for comparison symbols outside WinAnsi.
        match ch {
            '\u{2265}' => {
                out.push_str(">=");
                continue;
            }
            '\u{2264}' => {
                out.push_str("<=");
                continue;
            }
            _ => {}
        }

        let byte = match ch {
            '\u{0000}'..='\u{007F}' => ch as u8,
            '\u{00A0}'..='\u{00FF}' => ch as u8,
            // WinAnsi extensions (cp1252).
            '\u{20AC}' => 0x80,
            '\u{201A}' => 0x82,
            '\u{0192}' => 0x83,
            '\u{201E}' => 0x84,
            '\u{2026}' => 0x85,
            '\u{2020}' => 0x86,
            '\u{2021}' => 0x87,
            '\u{02C6}' => 0x88,
            '\u{2030}' => 0x89,
            '\u{0160}' => 0x8A,
            '\u{2039}' => 0x8B,
            '\u{0152}' => 0x8C,
            '\u{017D}' => 0x8E,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{02DC}' => 0x98,
            '\u{2122}' => 0x99,
            '\u{0161}' => 0x9A,
            '\u{203A}' => 0x9B,
            '\u{0153}' => 0x9C,
            '\u{017E}' => 0x9E,
            '\u{0178}' => 0x9F,
            _ => b'?',
        };

        match byte {
            b'\\' => out.push_str("\\\\"),
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b if b < 0x20 || b >= 0x7f => out.push_str(&format!("\\{:03o}", b)),
            b => out.push(b as char),
        }
    }
    out
}

fn to_unicode_cmap(glyph_map: &BTreeMap<u16, String>) -> String {
    let entries: Vec<(u16, String)> = glyph_map.iter().map(|(g, s)| (*g, s.clone())).collect();

    let mut out = String::new();
    out.push_str("/CIDInit /ProcSet findresource begin\n");
    out.push_str("12 dict begin\n");
    out.push_str("begincmap\n");
    out.push_str("/CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> def\n");
    out.push_str("/CMapName /Adobe-Identity-UCS def\n");
    out.push_str("/CMapType 2 def\n");
    out.push_str("1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n");

    let mut idx = 0usize;
    while idx < entries.len() {
        let end = (idx + 100).min(entries.len());
        out.push_str(&format!("{} beginbfchar\n", end - idx));
        for (gid, s) in &entries[idx..end] {
            let mut uni = String::new();
            for ch in s.chars() {
                let code = ch as u32;
                if code <= 0xFFFF {
                    uni.push_str(&format!("{:04X}", code));
                } else {
                    let code = code - 0x1_0000;
                    let high = 0xD800 | (code >> 10);
                    let low = 0xDC00 | (code & 0x3FF);
                    uni.push_str(&format!("{:04X}{:04X}", high, low));
                }
            }
            out.push_str(&format!("<{:04X}> <{}>\n", gid, uni));
        }
        out.push_str("endbfchar\n");
        idx = end;
    }

    out.push_str("endcmap\n");
    out.push_str("CMapName currentdict /CMap defineresource pop\n");
    out.push_str("end\nend\n");
    out
}

fn fmt(value: f32) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let fixed = I32F32::from_num(value);
    let scaled = (fixed * I32F32::from_num(1000)).round();
    let milli: i64 = scaled.to_num();
    format_milli(milli)
}

fn format_milli(milli: i64) -> String {
    if milli == 0 {
        return "0".to_string();
    }
    let sign = if milli < 0 { "-" } else { "" };
    let abs = milli.abs();
    let int_part = abs / 1000;
    let frac_part = abs % 1000;
    if frac_part == 0 {
        format!("{}{}", sign, int_part)
    } else {
        let mut s = format!("{}{}.{:03}", sign, int_part, frac_part);
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
        s
    }
}

fn fmt_pt(value: Pt) -> String {
    format_milli(value.to_milli_i64())
}

fn color_to_pdf_fill(color: Color) -> String {
    format!("{} {} {} rg\n", fmt(color.r), fmt(color.g), fmt(color.b))
}

fn color_to_pdf_stroke(color: Color) -> String {
    format!("{} {} {} RG\n", fmt(color.r), fmt(color.g), fmt(color.b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Canvas;

    fn pdf_text(bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).to_string()
    }

    #[test]
    fn serialized_document_has_header_and_trailer() {
        let mut canvas = Canvas::new(Size::a4());
        canvas.draw_string(Pt::from_i32(10), Pt::from_i32(10), "hello");
        let doc = canvas.finish();
        let registry = FontRegistry::new();
        let bytes = document_to_pdf(&doc, &registry, Some("Report")).expect("serializes");
        assert!(bytes.starts_with(b"%PDF-1.7\n"));
        assert!(bytes.ends_with(b"%%EOF"));
        let text = pdf_text(&bytes);
        assert!(text.contains("/Title (Report)"));
        assert!(text.contains("/Count 1"));
    }

    #[test]
    fn unresolved_font_degrades_to_winansi_type1() {
        let mut canvas = Canvas::new(Size::a4());
        canvas.set_font_name("Protocol");
        canvas.draw_string(Pt::ZERO, Pt::ZERO, "abc");
        let doc = canvas.finish();
        let registry = FontRegistry::new();
        let bytes = document_to_pdf(&doc, &registry, None).expect("serializes");
        let text = pdf_text(&bytes);
        assert!(text.contains("/Subtype /Type1 /BaseFont /Protocol /Encoding /WinAnsiEncoding"));
        assert!(text.contains("(abc) Tj"));
    }

    #[test]
    fn baseline_is_flipped_into_pdf_space() {
        let mut canvas = Canvas::new(Size::a4());
        canvas.set_font_size(Pt::from_i32(10));
        canvas.draw_string(Pt::from_i32(20), Pt::from_i32(30), "x");
        let doc = canvas.finish();
        let registry = FontRegistry::new();
        let bytes = document_to_pdf(&doc, &registry, None).expect("serializes");
        // 841.89 - 30 - 10 = 801.89
        assert!(pdf_text(&bytes).contains("20 801.89 Td"));
    }

    #[test]
    fn rect_origin_is_flipped_and_filled() {
        let mut canvas = Canvas::new(Size::a4());
        canvas.draw_rect(
            Pt::from_i32(10),
            Pt::from_i32(10),
            Pt::from_i32(100),
            Pt::from_i32(50),
        );
        let doc = canvas.finish();
        let registry = FontRegistry::new();
        let bytes = document_to_pdf(&doc, &registry, None).expect("serializes");
        // 841.89 - 10 - 50 = 781.89
        assert!(pdf_text(&bytes).contains("10 781.89 100 50 re\nf\n"));
    }

    #[test]
    fn missing_image_is_skipped_without_xobject() {
        let mut canvas = Canvas::new(Size::a4());
        canvas.draw_image(
            Pt::ZERO,
            Pt::ZERO,
            Pt::from_i32(40),
            Pt::from_i32(40),
            "no-such-image.png",
        );
        let doc = canvas.finish();
        let registry = FontRegistry::new();
        let bytes = document_to_pdf(&doc, &registry, None).expect("serializes");
        let text = pdf_text(&bytes);
        assert!(!text.contains("/XObject"));
        assert!(!text.contains(" Do\n"));
    }

    #[test]
    fn xref_counts_every_object() {
        let doc = Canvas::new(Size::a4()).finish();
        let registry = FontRegistry::new();
        let bytes = document_to_pdf(&doc, &registry, None).expect("serializes");
        let text = pdf_text(&bytes);
        // Catalog, pages, resources, content, page.
        assert!(text.contains("xref\n0 6\n"));
        let xref_start: usize = text
            .rsplit("startxref\n")
            .next()
            .and_then(|tail| tail.split('\n').next())
            .and_then(|v| v.parse().ok())
            .expect("startxref offset");
        assert_eq!(&bytes[xref_start..xref_start + 4], b"xref");
    }

    #[test]
    fn winansi_encoding_escapes_and_substitutes() {
        assert_eq!(encode_winansi_pdf_string("a(b)c"), "a\\(b\\)c");
        assert_eq!(encode_winansi_pdf_string("R \u{2265} 1"), "R >= 1");
        // Polish diacritics are outside WinAnsi and become '?'.
        assert_eq!(encode_winansi_pdf_string("Pętla"), "P?tla");
        // Latin-1 high bytes are octal-escaped.
        assert_eq!(encode_winansi_pdf_string("\u{00F3}"), "\\363");
    }

    #[test]
    fn info_strings_never_carry_raw_non_ascii() {
        assert_eq!(escape_pdf_string("EL/105 (A)"), "EL/105 \\(A\\)");
        // Latin-1 octal-escapes; outside Latin-1 folds to ASCII.
        assert_eq!(escape_pdf_string("\u{00F3}"), "\\363");
        assert_eq!(escape_pdf_string("Żółć"), "Z\\363lc");
        assert_eq!(escape_pdf_string("\u{2265}"), "?");
        assert!(escape_pdf_string("Protokół Żółć").is_ascii());
    }

    #[test]
    fn format_milli_trims_trailing_zeros() {
        assert_eq!(format_milli(0), "0");
        assert_eq!(format_milli(12_000), "12");
        assert_eq!(format_milli(12_500), "12.5");
        assert_eq!(format_milli(-1_050), "-1.05");
        assert_eq!(format_milli(841_890), "841.89");
    }

    #[test]
    fn to_unicode_cmap_handles_surrogates() {
        let mut map = BTreeMap::new();
        map.insert(5u16, "\u{1F600}".to_string());
        let cmap = to_unicode_cmap(&map);
        assert!(cmap.contains("<0005> <D83DDE00>"));
    }
}
