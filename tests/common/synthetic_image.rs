#![allow(dead_code)]

use clean_bench::ImageF64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Elongated Gaussian blob centred in an `n`×`n` image, major axis at `angle`
/// radians.
pub fn shower_image(n: usize, amplitude: f64, angle: f64) -> ImageF64 {
    assert!(n > 0, "image size must be positive");
    let c = (n - 1) as f64 / 2.0;
    let (sin, cos) = angle.sin_cos();
    let mut img = ImageF64::new(n, n);
    for y in 0..n {
        for x in 0..n {
            let dx = x as f64 - c;
            let dy = y as f64 - c;
            let u = dx * cos + dy * sin;
            let v = -dx * sin + dy * cos;
            let value = amplitude * (-(u * u) / (2.0 * 9.0) - (v * v) / (2.0 * 2.25)).exp();
            img.set(x, y, value);
        }
    }
    img
}

/// Copy of `image` with uniform noise in `[-amplitude, amplitude)` added.
pub fn add_uniform_noise(image: &ImageF64, amplitude: f64, seed: u64) -> ImageF64 {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut noisy = image.clone();
    for y in 0..image.h {
        for x in 0..image.w {
            noisy.set(x, y, image.get(x, y) + rng.gen_range(-amplitude..amplitude));
        }
    }
    noisy
}

pub fn image_to_json(image: &ImageF64) -> Value {
    let rows: Vec<Vec<f64>> = (0..image.h)
        .map(|y| (0..image.w).map(|x| image.get(x, y)).collect())
        .collect();
    json!(rows)
}

/// Write one corpus document `<name>.json` into `dir`.
pub fn write_corpus_file(dir: &Path, name: &str, document: &Value) -> PathBuf {
    let path = dir.join(format!("{name}.json"));
    fs::write(&path, document.to_string()).expect("write corpus file");
    path
}

/// Noisy shower with its noise-free reference.
pub fn shower_document(n: usize, angle: f64, noise: f64, seed: u64) -> Value {
    let reference = shower_image(n, 50.0, angle);
    let raw = add_uniform_noise(&reference, noise, seed);
    json!({
        "raw": image_to_json(&raw),
        "reference": image_to_json(&reference),
        "metadata": {"seed": seed},
    })
}
