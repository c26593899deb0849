//! Core types and utilities for tape target ranging.
//!
//! This crate is intentionally small and purely geometric. It does *not*
//! depend on any concrete segmentation backend or pose solver.

mod contour;
mod image;
mod logger;

pub use contour::{min_area_rect, Contour, ContourRect};
pub use image::{morph_close_3x3, sample_bilinear, BinaryImage, BinaryImageView};
pub use logger::init_with_level;
