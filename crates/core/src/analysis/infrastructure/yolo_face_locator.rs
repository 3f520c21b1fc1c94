/// YOLO face locator using ONNX Runtime via `ort`.
///
/// Handles letterbox preprocessing, inference and NMS; only the boxes are
/// kept, since attribute classification works on plain crops.
use std::path::Path;

use crate::analysis::domain::analyzer_error::AnalyzerError;
use crate::shared::frame::Frame;
use crate::shared::region::FaceRegion;

use super::execution_provider::build_session;
use super::onnx_attribute_analyzer::FaceLocator;

/// Fallback YOLO model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// Default confidence threshold for face detection.
pub const DEFAULT_CONFIDENCE: f64 = 0.25;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

pub struct YoloFaceLocator {
    session: ort::session::Session,
    confidence: f64,
    input_size: u32,
}

impl YoloFaceLocator {
    /// Load a YOLO ONNX model. The input resolution is read from the model's
    /// NCHW input shape, falling back to 640 when it is dynamic.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = build_session(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        Ok(Self {
            session,
            confidence,
            input_size,
        })
    }

    fn run(&mut self, frame: &Frame) -> Result<Vec<FaceRegion>, Box<dyn std::error::Error>> {
        let (input_tensor, scale, pad_x, pad_y) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        if shape.len() != 3 {
            return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
        }

        // [1, features, detections] is transposed relative to [1, detections, features].
        let transposed = shape[1] < shape[2];
        let (num_dets, num_feats) = if transposed {
            (shape[2], shape[1])
        } else {
            (shape[1], shape[2])
        };
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let mut raw = Vec::new();
        for i in 0..num_dets {
            let feature = |f: usize| {
                if transposed {
                    data[f * num_dets + i]
                } else {
                    data[i * num_feats + f]
                }
            };
            if num_feats < 5 {
                break;
            }
            let conf = feature(4) as f64;
            if conf < self.confidence {
                continue;
            }
            let (cx, cy, w, h) = (
                feature(0) as f64,
                feature(1) as f64,
                feature(2) as f64,
                feature(3) as f64,
            );
            raw.push(RawDetection {
                bbox: [
                    ((cx - w / 2.0) - pad_x as f64) / scale,
                    ((cy - h / 2.0) - pad_y as f64) / scale,
                    ((cx + w / 2.0) - pad_x as f64) / scale,
                    ((cy + h / 2.0) - pad_y as f64) / scale,
                ],
                confidence: conf,
            });
        }

        Ok(nms(&mut raw, NMS_IOU_THRESH)
            .into_iter()
            .map(|d| d.to_region())
            .collect())
    }
}

impl FaceLocator for YoloFaceLocator {
    fn locate(&mut self, frame: &Frame) -> Result<Vec<FaceRegion>, AnalyzerError> {
        self.run(frame)
            .map_err(|e| AnalyzerError::Detection(e.to_string()))
    }
}

/// Letterbox-resize a frame to `target_size` x `target_size`.
///
/// Returns `(NCHW float32 tensor, scale, pad_x, pad_y)`.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, f64, u32, u32) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = (fw * scale).round() as u32;
    let new_h = (fh * scale).round() as u32;
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // Padding is 114/255 gray, the YOLO convention.
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (tensor, scale, pad_x, pad_y)
}

#[derive(Clone, Debug)]
struct RawDetection {
    bbox: [f64; 4],
    confidence: f64,
}

impl RawDetection {
    fn to_region(&self) -> FaceRegion {
        let [x1, y1, x2, y2] = self.bbox;
        FaceRegion::new(
            x1.round() as i32,
            y1.round() as i32,
            (x2 - x1).round() as i32,
            (y2 - y1).round() as i32,
        )
    }
}

/// Greedy NMS: sort by confidence descending, suppress overlapping boxes.
fn nms(dets: &mut [RawDetection], iou_thresh: f64) -> Vec<RawDetection> {
    dets.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<RawDetection> = Vec::new();
    for det in dets.iter() {
        if keep.iter().all(|k| bbox_iou(&k.bbox, &det.bbox) <= iou_thresh) {
            keep.push(det.clone());
        }
    }
    keep
}

fn bbox_iou(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(bbox: [f64; 4], confidence: f64) -> RawDetection {
        RawDetection { bbox, confidence }
    }

    #[test]
    fn test_letterbox_preserves_aspect_ratio() {
        // 200x100 -> 640: scale 3.2, new 640x320, pad_y 160
        let frame = Frame::new(vec![128u8; 200 * 100 * 3], 200, 100, 3, 0);
        let (tensor, scale, pad_x, pad_y) = letterbox(&frame, 640);

        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert!((scale - 3.2).abs() < 0.01);
        assert_eq!(pad_x, 0);
        assert_eq!(pad_y, 160);
    }

    #[test]
    fn test_letterbox_values_normalized() {
        let frame = Frame::new(vec![255u8; 100 * 50 * 3], 100, 50, 3, 0);
        let (tensor, _, pad_x, pad_y) = letterbox(&frame, 640);

        let y = pad_y as usize + 1;
        let x = pad_x as usize + 1;
        assert!((tensor[[0, 0, y, x]] - 1.0).abs() < 0.01);
        assert!((tensor[[0, 0, 0, 0]] - 114.0 / 255.0).abs() < 0.01);
    }

    #[test]
    fn test_nms_keeps_highest_confidence_of_overlap() {
        let mut dets = vec![
            det([0.0, 0.0, 100.0, 100.0], 0.5),
            det([2.0, 2.0, 102.0, 102.0], 0.9),
        ];
        let kept = nms(&mut dets, 0.3);
        assert_eq!(kept.len(), 1);
        assert!((kept[0].confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_nms_keeps_non_overlapping() {
        let mut dets = vec![
            det([0.0, 0.0, 50.0, 50.0], 0.9),
            det([200.0, 200.0, 250.0, 250.0], 0.8),
        ];
        assert_eq!(nms(&mut dets, 0.3).len(), 2);
    }

    #[test]
    fn test_nms_empty_input() {
        let mut dets: Vec<RawDetection> = Vec::new();
        assert!(nms(&mut dets, 0.3).is_empty());
    }

    #[test]
    fn test_to_region_rounds_box() {
        let region = det([10.4, 20.6, 50.5, 80.2], 0.9).to_region();
        assert_eq!(region, FaceRegion::new(10, 21, 40, 60));
    }
}
