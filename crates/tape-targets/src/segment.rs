//! Boundary to the upstream segmentation stage.
//!
//! Thresholding and contour filtering happen outside this crate; the
//! pipeline only requires something that turns a color frame into a
//! contour list plus a binary mask. Swapping the segmentation backend
//! means swapping the [`Segmenter`] implementation, nothing else.

use image::RgbImage;
use tape_targets_core::{BinaryImage, Contour};

/// Output of the segmentation stage for one frame: an ordered list of
/// closed contours and the single-channel threshold mask they came from.
#[derive(Clone, Debug)]
pub struct Segmentation {
    pub contours: Vec<Contour>,
    pub mask: BinaryImage,
}

/// Produces contours + mask from a raw frame.
pub trait Segmenter {
    fn segment(&mut self, frame: &RgbImage) -> Segmentation;
}

/// Segmentation artifacts computed elsewhere — replayed captures, test
/// fixtures, or the offline CLI. Returns the same artifacts for every
/// frame.
#[derive(Clone, Debug)]
pub struct PrecomputedSegmenter {
    segmentation: Segmentation,
}

impl PrecomputedSegmenter {
    pub fn new(segmentation: Segmentation) -> Self {
        Self { segmentation }
    }
}

impl Segmenter for PrecomputedSegmenter {
    fn segment(&mut self, _frame: &RgbImage) -> Segmentation {
        self.segmentation.clone()
    }
}
