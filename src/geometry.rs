//! Pixel coordinate grids and the cache that hands them out.
//!
//! Shape parameters are computed in physical coordinates, so every image in
//! the corpus is paired with a [`PixelCoordinates`] grid of the same shape.
//! Grids are immutable for the lifetime of a run and shared through `Arc`.

use crate::error::ProcessingError;
use crate::image::ImageF64;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Physical position of every pixel, congruent with the image it describes.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelCoordinates {
    pub x: ImageF64,
    pub y: ImageF64,
}

impl PixelCoordinates {
    pub fn new(x: ImageF64, y: ImageF64) -> Result<Self, ProcessingError> {
        if !x.same_shape(&y) {
            return Err(ProcessingError::Other(format!(
                "pixel coordinate grids disagree: x is {:?}, y is {:?}",
                x.shape(),
                y.shape()
            )));
        }
        Ok(Self { x, y })
    }

    /// Regular grid with `x = column` and `y = row`.
    pub fn grid(w: usize, h: usize) -> Self {
        let mut x = ImageF64::new(w, h);
        let mut y = ImageF64::new(w, h);
        for row in 0..h {
            for col in 0..w {
                x.set(col, row, col as f64);
                y.set(col, row, row as f64);
            }
        }
        Self { x, y }
    }

    /// Regular grid with unit pitch `pitch` centred on the image centre.
    pub fn centered_grid(w: usize, h: usize, pitch: f64) -> Self {
        let cx = (w as f64 - 1.0) / 2.0;
        let cy = (h as f64 - 1.0) / 2.0;
        let mut coords = Self::grid(w, h);
        for v in coords.x.data.iter_mut() {
            *v = (*v - cx) * pitch;
        }
        for v in coords.y.data.iter_mut() {
            *v = (*v - cy) * pitch;
        }
        coords
    }

    pub fn shape(&self) -> [usize; 2] {
        self.x.shape()
    }

    /// Fails with `WrongDimension` unless `image` has the grid's shape.
    pub fn check_matches(&self, image: &ImageF64) -> Result<(), ProcessingError> {
        if self.x.same_shape(image) {
            Ok(())
        } else {
            Err(ProcessingError::wrong_dimension(&image.shape()))
        }
    }
}

/// Explicit cache of coordinate grids, owned by whoever loads the corpus.
///
/// Geometries never change during a run, so entries are never invalidated.
/// Named geometries are registered up front; regular grids are built on
/// first use per `(w, h)`.
#[derive(Debug, Default)]
pub struct GeometryCache {
    named: HashMap<String, Arc<PixelCoordinates>>,
    grids: Mutex<HashMap<(usize, usize), Arc<PixelCoordinates>>>,
}

impl GeometryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, coords: PixelCoordinates) {
        self.named.insert(name.into(), Arc::new(coords));
    }

    pub fn named(&self, name: &str) -> Option<Arc<PixelCoordinates>> {
        self.named.get(name).cloned()
    }

    pub fn grid(&self, w: usize, h: usize) -> Arc<PixelCoordinates> {
        let mut grids = match self.grids.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        grids
            .entry((w, h))
            .or_insert_with(|| Arc::new(PixelCoordinates::grid(w, h)))
            .clone()
    }

    pub fn len(&self) -> usize {
        let grids = match self.grids.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        };
        self.named.len() + grids
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_matches_pixel_indices() {
        let g = PixelCoordinates::grid(3, 2);
        assert_eq!(g.x.get(2, 1), 2.0);
        assert_eq!(g.y.get(2, 1), 1.0);
    }

    #[test]
    fn cache_reuses_grids() {
        let cache = GeometryCache::new();
        let a = cache.grid(4, 4);
        let b = cache.grid(4, 4);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn centered_grid_is_symmetric() {
        let g = PixelCoordinates::centered_grid(3, 3, 2.0);
        assert_eq!(g.x.get(0, 0), -2.0);
        assert_eq!(g.x.get(1, 1), 0.0);
        assert_eq!(g.y.get(2, 2), 2.0);
    }

    #[test]
    fn mismatched_image_is_rejected() {
        let g = PixelCoordinates::grid(3, 3);
        let err = g.check_matches(&ImageF64::new(2, 3)).unwrap_err();
        assert_eq!(err.kind(), "WrongDimension");
    }
}
