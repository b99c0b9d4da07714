//! I/O helpers for float images and JSON.
//!
//! - `save_image_png`: write an `ImageF64` to an 8-bit grayscale PNG.
//! - `write_json_file`: pretty-print a serializable value to disk with sorted keys.
use super::{ImageF64, ImageView};
use image::{GrayImage, Luma};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Save a float image to a grayscale PNG.
///
/// Finite pixels are min-max stretched to `[0, 255]`; missing pixels are
/// written black.
pub fn save_image_png(image: &ImageF64, path: &Path) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let (lo, hi) = image.finite_min_max().unwrap_or((0.0, 0.0));
    let span = hi - lo;
    let mut out = GrayImage::new(image.w as u32, image.h as u32);
    for (y, row) in image.rows().enumerate() {
        for (x, &px) in row.iter().enumerate() {
            let v = if !px.is_finite() || span <= 0.0 {
                0.0
            } else {
                ((px - lo) / span * 255.0).clamp(0.0, 255.0)
            };
            out.put_pixel(x as u32, y as u32, Luma([v.round() as u8]));
        }
    }
    out.save(path)
        .map_err(|e| format!("Failed to save {}: {e}", path.display()))
}

/// Serialize a value as pretty JSON to a string with object keys sorted.
pub fn to_sorted_json<T: Serialize>(value: &T) -> Result<String, String> {
    // `serde_json::Map` is ordered by key unless `preserve_order` is enabled.
    let tree =
        serde_json::to_value(value).map_err(|e| format!("Failed to serialize JSON: {e}"))?;
    serde_json::to_string_pretty(&tree).map_err(|e| format!("Failed to serialize JSON: {e}"))
}

/// Serialize a value as pretty, key-sorted JSON to `path`, creating parent
/// directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let json = to_sorted_json(value)
        .map_err(|e| format!("{e} (while writing {})", path.display()))?;
    fs::write(path, json).map_err(|e| format!("Failed to write JSON {}: {e}", path.display()))
}

pub(crate) fn ensure_parent_dir(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Unordered {
        zeta: u8,
        alpha: u8,
    }

    #[test]
    fn json_keys_come_out_sorted() {
        let json = to_sorted_json(&Unordered { zeta: 1, alpha: 2 }).unwrap();
        let a = json.find("alpha").unwrap();
        let z = json.find("zeta").unwrap();
        assert!(a < z, "keys not sorted: {json}");
    }

    #[test]
    fn png_dump_handles_missing_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/cleaned.png");
        let img = ImageF64::from_rows(&[vec![0.0, 1.0], vec![f64::NAN, 2.0]]).unwrap();
        save_image_png(&img, &path).unwrap();
        let back = image::open(&path).unwrap().into_luma8();
        assert_eq!(back.get_pixel(0, 1)[0], 0);
        assert_eq!(back.get_pixel(1, 1)[0], 255);
    }
}
