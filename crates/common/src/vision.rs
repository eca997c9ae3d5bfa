//! Frame and plugin contracts shared between the threat engine and its callers.
//!
//! These types describe what flows into an analysis plugin (a `VideoFrame`)
//! and what comes back out (an `AiResult` carrying `Detection`s).

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in pixel units, top-left origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Integer center of the box: `(x + floor(w/2), y + floor(h/2))`
    pub fn center(&self) -> (u32, u32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    /// Euclidean distance between the centers of two boxes
    pub fn center_distance(&self, other: &BoundingBox) -> f64 {
        let (x1, y1) = self.center();
        let (x2, y2) = other.center();
        let dx = x1 as f64 - x2 as f64;
        let dy = y1 as f64 - y2 as f64;
        dx.hypot(dy)
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Signed pixel rectangle as reported by a tracker, before clipping.
///
/// Trackers extrapolate positions and may report boxes that leave the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl PixelRect {
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from left/top/right/bottom corners
    pub fn from_ltrb(left: i64, top: i64, right: i64, bottom: i64) -> Self {
        Self {
            x: left,
            y: top,
            width: right - left,
            height: bottom - top,
        }
    }

    /// Clip to a `frame_width` x `frame_height` frame.
    ///
    /// The origin is clamped to zero and the extent is cut at the frame edge.
    /// Returns `None` when nothing with a positive area is left.
    pub fn clip(&self, frame_width: u32, frame_height: u32) -> Option<BoundingBox> {
        let x = self.x.max(0);
        let y = self.y.max(0);
        let width = self.width.min(frame_width as i64 - x);
        let height = self.height.min(frame_height as i64 - y);

        if width <= 0 || height <= 0 {
            return None;
        }

        Some(BoundingBox {
            x: x as u32,
            y: y as u32,
            width: width as u32,
            height: height as u32,
        })
    }
}

impl From<BoundingBox> for PixelRect {
    fn from(bbox: BoundingBox) -> Self {
        Self {
            x: bbox.x as i64,
            y: bbox.y as i64,
            width: bbox.width as i64,
            height: bbox.height as i64,
        }
    }
}

/// Video frame handed to an analysis plugin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoFrame {
    /// Source camera or stream ID
    pub source_id: String,

    /// Frame timestamp (Unix timestamp in milliseconds)
    pub timestamp: u64,

    /// Frame sequence number
    pub sequence: u64,

    /// Frame width in pixels
    pub width: u32,

    /// Frame height in pixels
    pub height: u32,

    /// Payload format (e.g., "jpeg", "observations+json")
    pub format: String,

    /// Frame payload; JSON text for observation frames
    pub data: String,
}

/// Detection result from a plugin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    /// Object class/label
    pub class: String,

    /// Detection confidence (0.0 to 1.0)
    pub confidence: f32,

    /// Bounding box (x, y, width, height)
    pub bbox: BoundingBox,

    /// Additional metadata (plugin-specific)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Plugin processing result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiResult {
    /// Source that produced the frame
    pub source_id: String,

    /// Frame timestamp
    pub timestamp: u64,

    /// Plugin that produced the result
    pub plugin_type: String,

    /// Detected objects/entities
    pub detections: Vec<Detection>,

    /// Processing latency in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,

    /// Additional metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Plugin metadata and capabilities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub version: String,

    /// Configuration schema (JSON Schema)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_schema: Option<serde_json::Value>,

    /// Supported payload formats
    pub supported_formats: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginListResponse {
    pub plugins: Vec<PluginInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_uses_floor_division() {
        let bbox = BoundingBox::new(10, 20, 31, 41);
        assert_eq!(bbox.center(), (25, 40));
    }

    #[test]
    fn test_center_distance() {
        let a = BoundingBox::new(0, 0, 10, 10);
        let b = BoundingBox::new(30, 40, 10, 10);
        assert!((a.center_distance(&b) - 50.0).abs() < f64::EPSILON);
        assert!((b.center_distance(&a) - 50.0).abs() < f64::EPSILON);
        assert_eq!(a.center_distance(&a), 0.0);
    }

    #[test]
    fn test_clip_inside_frame_is_unchanged() {
        let rect = PixelRect::new(10, 10, 50, 100);
        assert_eq!(rect.clip(640, 480), Some(BoundingBox::new(10, 10, 50, 100)));
    }

    #[test]
    fn test_clip_negative_origin() {
        // origin clamps to zero, width is not shrunk by the clamped offset
        let rect = PixelRect::new(-20, -5, 60, 80);
        assert_eq!(rect.clip(640, 480), Some(BoundingBox::new(0, 0, 60, 80)));
    }

    #[test]
    fn test_clip_at_far_edge() {
        let rect = PixelRect::new(600, 400, 100, 100);
        assert_eq!(rect.clip(640, 480), Some(BoundingBox::new(600, 400, 40, 80)));
    }

    #[test]
    fn test_clip_rejects_degenerate_boxes() {
        assert_eq!(PixelRect::new(10, 10, 0, 50).clip(640, 480), None);
        assert_eq!(PixelRect::new(10, 10, 50, -3).clip(640, 480), None);
        assert_eq!(PixelRect::new(700, 10, 50, 50).clip(640, 480), None);
    }

    #[test]
    fn test_from_ltrb() {
        let rect = PixelRect::from_ltrb(5, 10, 45, 110);
        assert_eq!(rect, PixelRect::new(5, 10, 40, 100));
    }
}
