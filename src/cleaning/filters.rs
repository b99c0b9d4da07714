use crate::image::{reflect_index, ImageF64, ImageView};

/// Cubic B-spline scaling kernel `[1, 4, 6, 4, 1] / 16` of the starlet
/// transform.
pub const B3_TAPS: [f64; 5] = [0.0625, 0.25, 0.375, 0.25, 0.0625];

/// Separable convolution with the taps spread `step` pixels apart ("à trous"
/// holes), mirrored at the borders.
pub fn convolve_a_trous(src: &ImageF64, taps: &[f64], step: usize) -> ImageF64 {
    let half = (taps.len() / 2) as isize;
    let step = step as isize;
    let (w, h) = (src.w, src.h);

    let mut tmp = ImageF64::new(w, h);
    for y in 0..h {
        let row = src.row(y);
        for x in 0..w {
            let mut acc = 0.0;
            for (k, t) in taps.iter().enumerate() {
                let sx = x as isize + (k as isize - half) * step;
                acc += t * row[reflect_index(sx, w)];
            }
            tmp.set(x, y, acc);
        }
    }

    let mut dst = ImageF64::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (k, t) in taps.iter().enumerate() {
                let sy = y as isize + (k as isize - half) * step;
                acc += t * tmp.get(x, reflect_index(sy, h));
            }
            dst.set(x, y, acc);
        }
    }
    dst
}
