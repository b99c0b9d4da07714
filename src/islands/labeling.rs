use crate::image::{ImageF64, ImageView};

/// Flood-fill labeler over the non-zero, finite pixels of a thresholded image.
///
/// Islands are numbered from 1 in raster order of their first pixel; 0 means
/// "no island". Connectivity is 4-neighbour.
pub(crate) struct IslandLabeler<'a> {
    image: &'a ImageF64,
    labels: Vec<u32>,
    stack: Vec<(usize, usize)>,
    sums: Vec<f64>,
}

impl<'a> IslandLabeler<'a> {
    pub(crate) fn new(image: &'a ImageF64) -> Self {
        Self {
            image,
            labels: vec![0; image.w * image.h],
            stack: Vec::with_capacity(64),
            sums: Vec::new(),
        }
    }

    #[inline]
    fn is_foreground(v: f64) -> bool {
        v != 0.0 && v.is_finite()
    }

    /// Label every island. Returns the row-major `w`×`h` label grid and the
    /// per-island sums (`sums[k]` belongs to label `k + 1`).
    pub(crate) fn run(mut self) -> (Vec<u32>, Vec<f64>) {
        let w = self.image.w;
        for y in 0..self.image.h {
            for x in 0..w {
                if self.labels[y * w + x] != 0 || !Self::is_foreground(self.image.get(x, y)) {
                    continue;
                }
                let label = self.sums.len() as u32 + 1;
                let sum = self.grow(x, y, label);
                self.sums.push(sum);
            }
        }
        (self.labels, self.sums)
    }

    /// Label the island containing `(seed_x, seed_y)`; returns its sum.
    fn grow(&mut self, seed_x: usize, seed_y: usize, label: u32) -> f64 {
        let w = self.image.w;
        let mut sum = 0.0;
        self.labels[seed_y * w + seed_x] = label;
        self.stack.clear();
        self.stack.push((seed_x, seed_y));
        while let Some((x, y)) = self.stack.pop() {
            sum += self.image.get(x, y);
            for (nx, ny) in self.image.neighbors4(x, y) {
                let n = ny * w + nx;
                if self.labels[n] == 0 && Self::is_foreground(self.image.get(nx, ny)) {
                    self.labels[n] = label;
                    self.stack.push((nx, ny));
                }
            }
        }
        sum
    }
}
