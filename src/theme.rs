// Box colors: fixed outline per category, translucent fill per element label
use image::Rgba;

use crate::types::BoxCategory;

pub const CLUSTER_OUTLINE: Rgba<u8> = Rgba([255, 0, 0, 255]);
pub const TEXT_CELL_OUTLINE: Rgba<u8> = Rgba([0, 90, 255, 255]);
pub const PAGE_FRAME: Rgba<u8> = Rgba([0, 0, 0, 255]);
pub const BLANK_CANVAS: Rgba<u8> = Rgba([255, 255, 255, 255]);

// Fill for labels missing from the table below
pub const DEFAULT_FILL: Rgba<u8> = Rgba([128, 128, 128, 100]);

const LABEL_FILLS: &[(&str, Rgba<u8>)] = &[
    ("table", Rgba([240, 128, 128, 100])),
    ("caption", Rgba([243, 156, 18, 100])),
    ("citation", Rgba([14, 210, 234, 100])),
    ("picture", Rgba([255, 236, 204, 100])),
    ("formula", Rgba([128, 139, 150, 100])),
    ("subtitle-level-1", Rgba([204, 51, 102, 100])),
    ("paragraph", Rgba([234, 234, 43, 100])),
];

pub fn outline_color(category: BoxCategory) -> Rgba<u8> {
    match category {
        BoxCategory::Cluster => CLUSTER_OUTLINE,
        BoxCategory::TextCell => TEXT_CELL_OUTLINE,
    }
}

/// Fill color for an element label, matched case-insensitively
pub fn fill_color(label: Option<&str>) -> Rgba<u8> {
    label
        .and_then(|label| {
            LABEL_FILLS
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(label))
                .map(|(_, color)| *color)
        })
        .unwrap_or(DEFAULT_FILL)
}
