//! Box overlay rendering
//!
//! Draws detected layout boxes on top of a rasterized page, or on a blank
//! canvas of the page's pixel size. Rendering is a pure function of its
//! inputs: the same page, boxes, base and config always give the same pixels.

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Pixel, RgbaImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::io::Cursor;

use crate::config::RenderConfig;
use crate::theme;
use crate::types::{BoundingBox, BoxCategory, DocumentPage, Page, Result};

/// What to draw the boxes on
#[derive(Debug, Clone)]
pub enum BaseImage {
    /// Rasterized page
    Raster(DynamicImage),
    /// Uniform white canvas of the page's pixel size
    Blank,
}

/// Inclusive pixel rectangle already clipped to the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PixelRect {
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
}

/// Render `boxes` over `base` for one page.
///
/// Passes run background, then cluster boxes, then text-cell boxes, so later
/// passes draw on top. Fails with `InvalidGeometry` when the page size or
/// scale is not positive.
pub fn render(
    page: &Page,
    boxes: &[BoundingBox],
    base: BaseImage,
    config: &RenderConfig,
) -> Result<RgbaImage> {
    let (width, height) = page.pixel_size()?;
    let scale = page.scale_factor();

    let mut canvas = match base {
        BaseImage::Raster(image) if config.show_background_image => {
            let rgba = image.to_rgba8();
            if rgba.dimensions() != (width, height) {
                log::debug!(
                    "page {}: resizing raster {}x{} to {}x{}",
                    page.index,
                    rgba.width(),
                    rgba.height(),
                    width,
                    height
                );
                imageops::resize(&rgba, width, height, FilterType::Triangle)
            } else {
                rgba
            }
        }
        _ => RgbaImage::from_pixel(width, height, theme::BLANK_CANVAS),
    };

    if config.page_frame {
        draw_outline(&mut canvas, PixelRect { x0: 0, y0: 0, x1: width - 1, y1: height - 1 }, 1, theme::PAGE_FRAME);
    }

    if config.show_cluster_boxes {
        draw_pass(&mut canvas, boxes, BoxCategory::Cluster, scale, config);
    }
    if config.show_text_cell_boxes {
        draw_pass(&mut canvas, boxes, BoxCategory::TextCell, scale, config);
    }

    Ok(canvas)
}

/// Render every box of a converted page
pub fn render_page(page: &DocumentPage, base: BaseImage, config: &RenderConfig) -> Result<RgbaImage> {
    render(&page.page, &page.all_boxes(), base, config)
}

/// Encode a rendered page as PNG bytes
pub fn to_png_bytes(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

fn draw_pass(
    canvas: &mut RgbaImage,
    boxes: &[BoundingBox],
    category: BoxCategory,
    scale: f32,
    config: &RenderConfig,
) {
    let mut drawn = 0usize;
    for bbox in boxes.iter().filter(|b| b.category() == category) {
        let Some(rect) = clip_to_canvas(bbox.to_pixels(scale), canvas.width(), canvas.height()) else {
            log::trace!("skipping {} box outside the canvas: {:?}", category.as_str(), bbox);
            continue;
        };

        if config.fill_boxes {
            fill_rect(canvas, rect, theme::fill_color(bbox.label()));
        }
        draw_outline(canvas, rect, config.line_width, theme::outline_color(category));
        drawn += 1;
    }
    log::trace!("drew {} {} boxes", drawn, category.as_str());
}

fn clip_to_canvas((x0, y0, x1, y1): (i64, i64, i64, i64), width: u32, height: u32) -> Option<PixelRect> {
    let (w, h) = (width as i64, height as i64);
    if w == 0 || h == 0 || x1 < 0 || y1 < 0 || x0 >= w || y0 >= h {
        return None;
    }
    Some(PixelRect {
        x0: x0.max(0) as u32,
        y0: y0.max(0) as u32,
        x1: x1.min(w - 1) as u32,
        y1: y1.min(h - 1) as u32,
    })
}

// Outline grows inward from the box edge, one ring per pixel of width
fn draw_outline(canvas: &mut RgbaImage, rect: PixelRect, line_width: u32, color: image::Rgba<u8>) {
    for t in 0..line_width.max(1) {
        let (left, top) = (rect.x0 + t, rect.y0 + t);
        let (right, bottom) = (rect.x1.saturating_sub(t), rect.y1.saturating_sub(t));
        if left > right || top > bottom {
            break;
        }
        let ring = Rect::at(left as i32, top as i32).of_size(right - left + 1, bottom - top + 1);
        draw_hollow_rect_mut(canvas, ring, color);
    }
}

fn fill_rect(canvas: &mut RgbaImage, rect: PixelRect, color: image::Rgba<u8>) {
    for y in rect.y0..=rect.y1 {
        for x in rect.x0..=rect.x1 {
            canvas.get_pixel_mut(x, y).blend(&color);
        }
    }
}
