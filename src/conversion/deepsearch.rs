// Parser for converted-document JSON (`<name>.json`) and its text cells (`<name>.cells`)
//
// Both files use PDF coordinates (origin bottom-left). Pages are 1-based in
// `page-dimensions` and `prov`, 0-based in the cells rows.
use serde_json::Value;
use std::collections::BTreeMap;

use crate::types::{BoundingBox, BoxCategory, BoxpeekError, Document, DocumentPage, Page, Result};

/// Build a [`Document`] from the parsed JSON files
pub fn parse_document(name: &str, doc: &Value, cells: Option<&Value>) -> Result<Document> {
    let mut pages = page_dimensions(doc)?;

    let items = doc
        .get("main-text")
        .and_then(Value::as_array)
        .ok_or_else(|| BoxpeekError::Format(format!("{}: missing main-text array", name)))?;

    for raw_item in items {
        let Some(item) = resolve_item(raw_item, doc) else {
            continue;
        };
        match cluster_from_item(item, &pages) {
            Some((index, bbox)) => {
                if let Some(page) = pages.get_mut(&index) {
                    page.clusters.push(bbox);
                }
            }
            None => log::warn!("{}: skipping main-text item without usable prov: {}", name, short(item)),
        }
    }

    if let Some(cells) = cells {
        add_text_cells(name, cells, &mut pages);
    }

    Ok(Document { name: name.to_string(), pages: pages.into_values().collect() })
}

/// Follow a `{"$ref": "#/tables/0"}` pointer into the root document.
/// Items without `$ref` are returned as is.
pub fn resolve_item<'a>(raw_item: &'a Value, doc: &'a Value) -> Option<&'a Value> {
    let Some(reference) = raw_item.get("$ref").and_then(Value::as_str) else {
        return Some(raw_item);
    };

    let mut item = doc;
    for key in reference.split('/').skip(1) {
        item = match item {
            Value::Object(map) => match map.get(key) {
                Some(next) => next,
                None => {
                    log::warn!("reference {}: key {} not found", reference, key);
                    return None;
                }
            },
            Value::Array(list) => match key.parse::<usize>().ok().and_then(|i| list.get(i)) {
                Some(next) => next,
                None => {
                    log::warn!("reference {}: bad index {}", reference, key);
                    return None;
                }
            },
            _ => {
                log::warn!("reference {}: cannot descend into scalar at {}", reference, key);
                return None;
            }
        };
    }
    Some(item)
}

// Keyed by 0-based index
fn page_dimensions(doc: &Value) -> Result<BTreeMap<usize, DocumentPage>> {
    let dims = doc
        .get("page-dimensions")
        .and_then(Value::as_array)
        .ok_or_else(|| BoxpeekError::Format("missing page-dimensions array".to_string()))?;

    let mut pages = BTreeMap::new();
    for entry in dims {
        let number = entry.get("page").and_then(Value::as_u64);
        let width = entry.get("width").and_then(Value::as_f64);
        let height = entry.get("height").and_then(Value::as_f64);
        match (number, width, height) {
            (Some(number), Some(width), Some(height)) if number >= 1 => {
                let index = (number - 1) as usize;
                pages.insert(index, DocumentPage::new(Page::new(index, width as f32, height as f32)));
            }
            _ => log::warn!("ignoring malformed page-dimensions entry: {}", short(entry)),
        }
    }
    Ok(pages)
}

fn cluster_from_item(item: &Value, pages: &BTreeMap<usize, DocumentPage>) -> Option<(usize, BoundingBox)> {
    let prov = item.get("prov")?.as_array()?.first()?;
    let number = prov.get("page")?.as_u64()?;
    let index = (number as usize).checked_sub(1)?;
    let coords = coords(prov.get("bbox")?)?;
    let label = item.get("type").and_then(Value::as_str).map(str::to_lowercase);

    let Some(page) = pages.get(&index) else {
        log::warn!("cluster refers to page {} with no dimensions", number);
        return None;
    };
    let bbox = make_box(coords, page.page.height, BoxCategory::Cluster, label)?;
    Some((index, bbox))
}

fn add_text_cells(name: &str, cells: &Value, pages: &mut BTreeMap<usize, DocumentPage>) {
    let Some(rows) = cells.pointer("/cells/data").and_then(Value::as_array) else {
        log::warn!("{}: cells document has no cells.data array", name);
        return;
    };

    let mut dropped = 0usize;
    for row in rows {
        let Some(row) = row.as_array() else {
            dropped += 1;
            continue;
        };
        let index = row.first().and_then(Value::as_u64).map(|i| i as usize);
        let coords = (row.len() >= 5)
            .then(|| coords(&Value::Array(row[1..5].to_vec())))
            .flatten();
        let label = row.get(5).and_then(Value::as_str).map(str::to_lowercase);

        let (Some(index), Some(coords)) = (index, coords) else {
            dropped += 1;
            continue;
        };
        let Some(page) = pages.get_mut(&index) else {
            dropped += 1;
            continue;
        };
        match make_box(coords, page.page.height, BoxCategory::TextCell, label) {
            Some(bbox) => page.cells.push(bbox),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        log::warn!("{}: dropped {} malformed text cells", name, dropped);
    }
}

fn coords(bbox: &Value) -> Option<[f32; 4]> {
    let list = bbox.as_array()?;
    if list.len() != 4 {
        return None;
    }
    let mut out = [0.0f32; 4];
    for (slot, value) in out.iter_mut().zip(list) {
        *slot = value.as_f64()? as f32;
    }
    Some(out)
}

fn make_box(c: [f32; 4], page_height: f32, category: BoxCategory, label: Option<String>) -> Option<BoundingBox> {
    BoundingBox::from_bottom_left(c[0], c[1], c[2], c[3], page_height, category, label)
        .map_err(|e| log::warn!("{}", e))
        .ok()
}

fn short(value: &Value) -> String {
    let text = value.to_string();
    if text.len() > 120 {
        let cut = (0..=120).rev().find(|i| text.is_char_boundary(*i)).unwrap_or(0);
        format!("{}...", &text[..cut])
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "page-dimensions": [
                {"page": 1, "width": 612.0, "height": 792.0},
                {"page": 2, "width": 612.0, "height": 792.0}
            ],
            "main-text": [
                {"type": "paragraph", "prov": [{"page": 1, "bbox": [72.0, 700.0, 540.0, 750.0]}]},
                {"$ref": "#/tables/0"},
                {"$ref": "#/figures/3"},
                {"type": "page-header", "text": "no provenance"}
            ],
            "tables": [
                {"type": "Table", "prov": [{"page": 2, "bbox": [100, 100, 500, 300]}]}
            ]
        })
    }

    #[test]
    fn test_clusters_per_page() {
        let doc = parse_document("sample", &sample(), None).unwrap();
        assert_eq!(doc.pages.len(), 2);

        let first = &doc.pages[0];
        assert_eq!(first.page.index, 0);
        assert_eq!(first.clusters.len(), 1);
        let para = &first.clusters[0];
        assert_eq!((para.left(), para.top(), para.right(), para.bottom()), (72.0, 42.0, 540.0, 92.0));
        assert_eq!(para.label(), Some("paragraph"));

        let second = &doc.pages[1];
        assert_eq!(second.clusters.len(), 1);
        assert_eq!(second.clusters[0].label(), Some("table"));
        assert_eq!(second.clusters[0].top(), 492.0);
    }

    #[test]
    fn test_resolve_item() {
        let doc = sample();
        let table_ref = json!({"$ref": "#/tables/0"});
        let table = resolve_item(&table_ref, &doc).unwrap();
        assert_eq!(table["type"], "Table");
        assert!(resolve_item(&json!({"$ref": "#/tables/7"}), &doc).is_none());
        assert!(resolve_item(&json!({"$ref": "#/nothing/0"}), &doc).is_none());
        let inline = json!({"type": "caption"});
        assert_eq!(resolve_item(&inline, &doc), Some(&inline));
    }

    #[test]
    fn test_text_cells_are_zero_based() {
        let cells = json!({"cells": {"data": [
            [0, 10.0, 780.0, 50.0, 790.0, "paragraph"],
            [1, 10.0, 10.0, 20.0, 20.0],
            [5, 0, 0, 1, 1, "orphan"],
            "garbage"
        ]}});
        let doc = parse_document("sample", &sample(), Some(&cells)).unwrap();
        assert_eq!(doc.pages[0].cells.len(), 1);
        assert_eq!(doc.pages[0].cells[0].top(), 2.0);
        assert_eq!(doc.pages[0].cells[0].category(), BoxCategory::TextCell);
        assert_eq!(doc.pages[1].cells.len(), 1);
        assert_eq!(doc.pages[1].cells[0].label(), None);
    }

    #[test]
    fn test_missing_sections_are_format_errors() {
        let err = parse_document("x", &json!({"main-text": []}), None);
        assert!(matches!(err, Err(BoxpeekError::Format(_))));
        let err = parse_document("x", &json!({"page-dimensions": []}), None);
        assert!(matches!(err, Err(BoxpeekError::Format(_))));
    }
}
