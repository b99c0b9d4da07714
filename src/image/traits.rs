pub trait ImageView {
    type Pixel: Copy;

    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn stride(&self) -> usize;

    fn row(&self, y: usize) -> &[Self::Pixel];

    fn rows(&self) -> Rows<'_, Self>
    where
        Self: Sized,
    {
        Rows { image: self, y: 0 }
    }

    /// 4-connected neighbours of `(x, y)` that lie inside the image.
    fn neighbors4(&self, x: usize, y: usize) -> Neighbors4 {
        Neighbors4::new(x, y, self.width(), self.height())
    }
}

pub struct Rows<'a, I: ?Sized + ImageView> {
    image: &'a I,
    y: usize,
}

impl<'a, I: ImageView> Iterator for Rows<'a, I> {
    type Item = &'a [I::Pixel];

    fn next(&mut self) -> Option<Self::Item> {
        if self.y >= self.image.height() {
            return None;
        }
        let y = self.y;
        self.y += 1;
        Some(self.image.row(y))
    }
}

/// Up/down/left/right neighbours, clipped at the borders.
pub struct Neighbors4 {
    candidates: [Option<(usize, usize)>; 4],
    next: usize,
}

impl Neighbors4 {
    fn new(x: usize, y: usize, w: usize, h: usize) -> Self {
        let candidates = [
            (y > 0).then(|| (x, y - 1)),
            (y + 1 < h).then_some((x, y + 1)),
            (x > 0).then(|| (x - 1, y)),
            (x + 1 < w).then_some((x + 1, y)),
        ];
        Self {
            candidates,
            next: 0,
        }
    }
}

impl Iterator for Neighbors4 {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        while self.next < self.candidates.len() {
            let c = self.candidates[self.next];
            self.next += 1;
            if c.is_some() {
                return c;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageF64;

    #[test]
    fn corner_has_two_neighbors() {
        let img = ImageF64::new(3, 3);
        let n: Vec<_> = img.neighbors4(0, 0).collect();
        assert_eq!(n, vec![(0, 1), (1, 0)]);
        assert_eq!(img.neighbors4(1, 1).count(), 4);
    }

    #[test]
    fn rows_iterate_top_to_bottom() {
        let img = ImageF64::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let rows: Vec<&[f64]> = img.rows().collect();
        assert_eq!(rows, vec![&[1.0, 2.0][..], &[3.0, 4.0][..]]);
    }
}
