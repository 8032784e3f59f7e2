//! Annotation - which detections get drawn, with what text
//!
//! The core decides the content; an `AnnotationRenderer` owns the pixels.
//! Every retained detection gets one box and one `"{label} {conf%}"` label
//! in a single style.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use ab_glyph::{FontRef, PxScale};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::logic::detection::{BoundingBox, Detection, IssueClass};

// ============================================================================
// STYLE
// ============================================================================

/// Orange
pub const ANNOTATION_COLOR: [u8; 3] = [255, 165, 0];
pub const ANNOTATION_THICKNESS: u32 = 2;
/// Label baseline sits this far above the box
pub const LABEL_OFFSET_PX: f32 = 5.0;
pub const LABEL_HEIGHT_PX: u32 = 16;

/// DejaVu Sans, see assets/fonts/LICENSE
static LABEL_FONT: &[u8] = include_bytes!("../../../assets/fonts/DejaVuSans.ttf");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationStyle {
    pub color: [u8; 3],
    pub thickness: u32,
    pub label_height_px: u32,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            color: ANNOTATION_COLOR,
            thickness: ANNOTATION_THICKNESS,
            label_height_px: LABEL_HEIGHT_PX,
        }
    }
}

// ============================================================================
// ANNOTATIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub issue: IssueClass,
    pub confidence: f32,
    pub bbox: BoundingBox,
    pub text: String,
    /// Left end of the label baseline, in image pixels
    pub text_origin: (f32, f32),
}

/// `"Acne 87%"`
pub fn annotation_text(issue: IssueClass, confidence: f32) -> String {
    format!("{} {:.0}%", issue.label(), confidence * 100.0)
}

pub fn annotations_for(detections: &[Detection]) -> Vec<Annotation> {
    detections
        .iter()
        .map(|d| Annotation {
            issue: d.issue,
            confidence: d.confidence,
            bbox: d.bbox,
            text: annotation_text(d.issue, d.confidence),
            text_origin: (d.bbox.x1, d.bbox.y1 - LABEL_OFFSET_PX),
        })
        .collect()
}

// ============================================================================
// RENDERER
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RenderError(pub String);

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RenderError: {}", self.0)
    }
}

impl std::error::Error for RenderError {}

/// Draws annotations and returns a reference to the result
pub trait AnnotationRenderer: Send + Sync {
    fn render(
        &self,
        image: &DynamicImage,
        annotations: &[Annotation],
        style: &AnnotationStyle,
    ) -> Result<String, RenderError>;
}

/// Writes `<sha256>.png` (boxes and labels) and `<sha256>.json` (the
/// annotations) into `output_dir`.
///
/// The name is derived from the encoded PNG, so identical inputs give the
/// same reference.
pub struct PngAnnotationRenderer {
    output_dir: PathBuf,
}

impl PngAnnotationRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self { output_dir: output_dir.into() }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl AnnotationRenderer for PngAnnotationRenderer {
    fn render(
        &self,
        image: &DynamicImage,
        annotations: &[Annotation],
        style: &AnnotationStyle,
    ) -> Result<String, RenderError> {
        let font = FontRef::try_from_slice(LABEL_FONT)
            .map_err(|e| RenderError(format!("Failed to load label font: {}", e)))?;

        let mut canvas = image.to_rgb8();
        for annotation in annotations {
            draw_box(&mut canvas, &annotation.bbox, style);
            draw_label(&mut canvas, annotation, style, &font);
        }

        let mut png = Vec::new();
        DynamicImage::ImageRgb8(canvas)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| RenderError(format!("Failed to encode PNG: {}", e)))?;

        let digest = hex::encode(Sha256::digest(&png));
        let stem = &digest[..32];
        let image_path = self.output_dir.join(format!("{}.png", stem));
        let sidecar_path = self.output_dir.join(format!("{}.json", stem));

        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| RenderError(format!("Failed to create {}: {}", self.output_dir.display(), e)))?;
        std::fs::write(&image_path, &png)
            .map_err(|e| RenderError(format!("Failed to write {}: {}", image_path.display(), e)))?;

        let json = serde_json::to_string_pretty(annotations)
            .map_err(|e| RenderError(format!("Failed to serialize annotations: {}", e)))?;
        std::fs::write(&sidecar_path, json)
            .map_err(|e| RenderError(format!("Failed to write {}: {}", sidecar_path.display(), e)))?;

        log::debug!("Annotated image written to {}", image_path.display());
        Ok(image_path.display().to_string())
    }
}

/// Hollow rectangle, `thickness` pixels inward from the box edge, clipped
fn draw_box(canvas: &mut RgbImage, bbox: &BoundingBox, style: &AnnotationStyle) {
    let (width, height) = canvas.dimensions();
    if width == 0 || height == 0 || !bbox.is_finite() {
        return;
    }

    let clamp_x = |v: f32| (v.round().max(0.0) as u32).min(width - 1);
    let clamp_y = |v: f32| (v.round().max(0.0) as u32).min(height - 1);
    let (x1, x2) = (clamp_x(bbox.x1), clamp_x(bbox.x2));
    let (y1, y2) = (clamp_y(bbox.y1), clamp_y(bbox.y2));
    if x2 < x1 || y2 < y1 {
        return;
    }

    let color = Rgb(style.color);
    for t in 0..style.thickness {
        let (left, right) = (x1.saturating_add(t).min(x2), x2.saturating_sub(t).max(x1));
        let (top, bottom) = (y1.saturating_add(t).min(y2), y2.saturating_sub(t).max(y1));
        for x in left..=right {
            canvas.put_pixel(x, top, color);
            canvas.put_pixel(x, bottom, color);
        }
        for y in top..=bottom {
            canvas.put_pixel(left, y, color);
            canvas.put_pixel(right, y, color);
        }
    }
}

/// Label text with its baseline at `text_origin`. A label that would leave
/// the top of the image moves just inside the box instead.
fn draw_label(canvas: &mut RgbImage, annotation: &Annotation, style: &AnnotationStyle, font: &FontRef<'_>) {
    if annotation.text.is_empty() || style.label_height_px == 0 || !annotation.bbox.is_finite() {
        return;
    }

    let scale = PxScale::from(style.label_height_px as f32);
    let (_, text_height) = text_size(scale, font, &annotation.text);
    let (x, baseline) = annotation.text_origin;

    let mut top = baseline.round() as i32 - text_height as i32;
    if top < 0 {
        top = annotation.bbox.y1.round() as i32 + style.thickness as i32;
    }
    let left = (x.round() as i32).max(0);

    draw_text_mut(canvas, Rgb(style.color), left, top.max(0), scale, font, &annotation.text);
}
