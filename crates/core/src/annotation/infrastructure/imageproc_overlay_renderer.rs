use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{ImageBuffer, Rgb};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::annotation::domain::attribute_aggregator::SeverityTier;
use crate::annotation::domain::face_annotation::FaceAnnotation;
use crate::annotation::domain::overlay_renderer::OverlayRenderer;
use crate::shared::frame::Frame;

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const BOX_THICKNESS: i32 = 2;
const GENDER_COLOR: Rgb<u8> = Rgb([0, 255, 255]);
const HIGH_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const MEDIUM_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
const LOW_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

// Baseline offsets relative to the face box.
const HEADLINE_OFFSET: i32 = 35;
const GENDER_OFFSET: i32 = 10;
const LIST_X_GAP: i32 = 10;
const LIST_FIRST_OFFSET: i32 = 20;
const LIST_STEP: i32 = 25;

const HEADLINE_SCALE: f32 = 26.0;
const GENDER_SCALE: f32 = 20.0;
const LIST_SCALE: f32 = 18.0;

const SWATCH_HEIGHT: u32 = 12;

// Drawing coordinates are pinned to this range so imageproc's own edge
// arithmetic cannot overflow. Anything this far out is off-frame anyway.
const COORD_LIMIT: i32 = 1 << 20;

fn pin(value: i32) -> i32 {
    value.clamp(-COORD_LIMIT, COORD_LIMIT)
}

pub fn tier_color(tier: SeverityTier) -> Rgb<u8> {
    match tier {
        SeverityTier::High => HIGH_COLOR,
        SeverityTier::Medium => MEDIUM_COLOR,
        SeverityTier::Low => LOW_COLOR,
    }
}

/// Draws boxes, labels and the ranked emotion list with imageproc.
///
/// Without a font only geometry is drawn: the box plus one tier-colored
/// bar per ranked line, its length proportional to the score.
pub struct ImageprocOverlayRenderer {
    font: Option<FontVec>,
}

impl ImageprocOverlayRenderer {
    pub fn new() -> Self {
        Self { font: None }
    }

    pub fn with_font(font: FontVec) -> Self {
        Self { font: Some(font) }
    }

    pub fn with_font_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let bytes = std::fs::read(path)
            .map_err(|e| format!("Failed to read font {}: {e}", path.display()))?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|e| format!("Invalid font {}: {e}", path.display()))?;
        Ok(Self::with_font(font))
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }
}

impl Default for ImageprocOverlayRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayRenderer for ImageprocOverlayRenderer {
    fn render(
        &self,
        frame: &mut Frame,
        annotations: &[FaceAnnotation],
    ) -> Result<(), Box<dyn std::error::Error>> {
        if annotations.is_empty() {
            return Ok(());
        }
        let channels = frame.channels();
        let (frame_width, frame_height) = (frame.width(), frame.height());
        let mut img = frame
            .as_rgb_image_mut()
            .ok_or_else(|| format!("Overlay needs an RGB frame, got {channels} channels"))?;

        for annotation in annotations {
            let region = annotation.region;
            let (x, y) = (pin(region.x), pin(region.y));

            if region.clamped(frame_width, frame_height).is_some() {
                let (width, height) = (pin(region.width), pin(region.height));
                for inset in 0..BOX_THICKNESS {
                    let w = width - 2 * inset;
                    let h = height - 2 * inset;
                    if w > 0 && h > 0 {
                        let rect = Rect::at(x + inset, y + inset).of_size(w as u32, h as u32);
                        draw_hollow_rect_mut(&mut img, rect, BOX_COLOR);
                    }
                }
            }

            let list_x = pin(region.right().saturating_add(LIST_X_GAP));
            let baselines = (0..).map(|i| y + LIST_FIRST_OFFSET + i * LIST_STEP);

            match &self.font {
                Some(font) => {
                    draw_line(
                        &mut img,
                        font,
                        BOX_COLOR,
                        x,
                        y - HEADLINE_OFFSET,
                        HEADLINE_SCALE,
                        &annotation.headline(),
                    );
                    draw_line(
                        &mut img,
                        font,
                        GENDER_COLOR,
                        x,
                        y - GENDER_OFFSET,
                        GENDER_SCALE,
                        &annotation.gender_text(),
                    );
                    for (line, baseline) in annotation.lines.iter().zip(baselines) {
                        draw_line(
                            &mut img,
                            font,
                            tier_color(line.tier),
                            list_x,
                            baseline,
                            LIST_SCALE,
                            &line.text(),
                        );
                    }
                }
                None => {
                    for (line, baseline) in annotation.lines.iter().zip(baselines) {
                        let length = line.score.round().clamp(1.0, 100.0) as u32;
                        let rect = Rect::at(list_x, baseline - SWATCH_HEIGHT as i32)
                            .of_size(length, SWATCH_HEIGHT);
                        draw_filled_rect_mut(&mut img, rect, tier_color(line.tier));
                    }
                }
            }
        }

        Ok(())
    }
}

/// imageproc positions text by its top edge; callers pass a baseline.
fn draw_line(
    img: &mut ImageBuffer<Rgb<u8>, &mut [u8]>,
    font: &FontVec,
    color: Rgb<u8>,
    x: i32,
    baseline: i32,
    scale: f32,
    text: &str,
) {
    let top = baseline - scale as i32;
    draw_text_mut(img, color, x, top, PxScale::from(scale), font, text);
}
