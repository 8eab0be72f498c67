use crate::block::TextStyle;
use crate::font::FontSelection;
use crate::types::{Color, Pt};

/// Brand navy used for headings, section bands and the table frame.
pub const BRAND_COLOR: Color = Color {
    r: 0.0,
    g: 0.2,
    b: 0.4,
};

/// Label-column shading in the metadata and supply grids.
pub const LABEL_SHADE: Color = Color {
    r: 0.94,
    g: 0.94,
    b: 0.94,
};

/// Background of the instrument banner and the verdict box.
pub const PANEL_SHADE: Color = Color {
    r: 0.96,
    g: 0.96,
    b: 0.96,
};

/// Light grid lines inside the inspection checklist.
pub const GRID_SHADE: Color = Color {
    r: 0.83,
    g: 0.83,
    b: 0.83,
};

/// Mid-grey grid lines of the data and measurement tables.
pub const GRID_LINE: Color = Color {
    r: 0.5,
    g: 0.5,
    b: 0.5,
};

/// Pale blue fill behind the instrument banner.
pub const BANNER_TINT: Color = Color {
    r: 0.902,
    g: 0.937,
    b: 1.0,
};

/// Fixed named styles for the protocol. Built once per renderer from
/// the resolved font pair; pure configuration after that.
#[derive(Debug, Clone)]
pub struct StyleSheet {
    /// Document title, 14 pt bold navy.
    pub header: TextStyle,
    /// Section band text, 10 pt bold white on navy.
    pub section: TextStyle,
    /// Grid label cells, 8 pt bold.
    pub label: TextStyle,
    /// Grid value cells, 8 pt.
    pub value: TextStyle,
    /// Dense measurement-table cells, 7 pt.
    pub small: TextStyle,
    /// Bold counterpart of `small`, for inline emphasis.
    pub small_bold: TextStyle,
    /// Header cells of the measurement table, 7 pt bold white.
    pub table_header: TextStyle,
    /// Running text (verdict, remarks, signatures), 9 pt.
    pub body: TextStyle,
    /// Bold counterpart of `body`, for inline emphasis.
    pub body_bold: TextStyle,
}

impl StyleSheet {
    pub fn new(fonts: &FontSelection) -> Self {
        Self {
            header: TextStyle {
                font_name: fonts.bold.clone(),
                font_size: Pt::from_i32(14),
                leading: Pt::from_i32(16),
                color: BRAND_COLOR,
            },
            section: TextStyle {
                font_name: fonts.bold.clone(),
                font_size: Pt::from_i32(10),
                leading: Pt::from_i32(14),
                color: Color::WHITE,
            },
            label: TextStyle {
                font_name: fonts.bold.clone(),
                font_size: Pt::from_i32(8),
                leading: Pt::from_i32(10),
                color: Color::BLACK,
            },
            value: TextStyle {
                font_name: fonts.regular.clone(),
                font_size: Pt::from_i32(8),
                leading: Pt::from_i32(10),
                color: Color::BLACK,
            },
            small: TextStyle {
                font_name: fonts.regular.clone(),
                font_size: Pt::from_i32(7),
                leading: Pt::from_i32(9),
                color: Color::BLACK,
            },
            small_bold: TextStyle {
                font_name: fonts.bold.clone(),
                font_size: Pt::from_i32(7),
                leading: Pt::from_i32(9),
                color: Color::BLACK,
            },
            table_header: TextStyle {
                font_name: fonts.bold.clone(),
                font_size: Pt::from_i32(7),
                leading: Pt::from_i32(9),
                color: Color::WHITE,
            },
            body: TextStyle {
                font_name: fonts.regular.clone(),
                font_size: Pt::from_i32(9),
                leading: Pt::from_i32(11),
                color: Color::BLACK,
            },
            body_bold: TextStyle {
                font_name: fonts.bold.clone(),
                font_size: Pt::from_i32(9),
                leading: Pt::from_i32(11),
                color: Color::BLACK,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn styles_use_the_resolved_font_pair() {
        let selection = FontSelection {
            regular: Arc::from("Protocol"),
            bold: Arc::from("Protocol-Bold"),
            extended: true,
        };
        let styles = StyleSheet::new(&selection);
        assert_eq!(styles.value.font_name.as_ref(), "Protocol");
        assert_eq!(styles.header.font_name.as_ref(), "Protocol-Bold");
        assert_eq!(styles.section.color, Color::WHITE);
        assert_eq!(styles.header.color, BRAND_COLOR);
    }
}
