/// Rows shared by consecutive windows: `floor(window_size * overlap_ratio)`.
pub fn overlap_rows(window_size: usize, overlap_ratio: f64) -> usize {
    (window_size as f64 * overlap_ratio).floor() as usize
}

/// Number of full windows over `n` rows.
pub fn window_count(n: usize, window_size: usize, overlap_rows: usize) -> usize {
    if window_size == 0 || n < window_size {
        return 0;
    }
    (n - window_size) / stride(window_size, overlap_rows) + 1
}

fn stride(window_size: usize, overlap_rows: usize) -> usize {
    window_size.saturating_sub(overlap_rows).max(1)
}

/// Lazy fixed-size windows over a slice. Window `i` starts at
/// `i * (size - overlap)`; a trailing partial window is never yielded.
#[derive(Debug, Clone)]
pub struct Windows<'a, T> {
    data: &'a [T],
    size: usize,
    step: usize,
    start: usize,
}

pub fn windows<T>(data: &[T], size: usize, overlap_rows: usize) -> Windows<'_, T> {
    Windows {
        data,
        size,
        step: stride(size, overlap_rows),
        start: 0,
    }
}

impl<'a, T> Iterator for Windows<'a, T> {
    type Item = &'a [T];

    fn next(&mut self) -> Option<Self::Item> {
        if self.size == 0 || self.start + self.size > self.data.len() {
            return None;
        }
        let window = &self.data[self.start..self.start + self.size];
        self.start += self.step;
        Some(window)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.data.len().saturating_sub(self.start);
        let n = if self.size == 0 || remaining < self.size {
            0
        } else {
            (remaining - self.size) / self.step + 1
        };
        (n, Some(n))
    }
}

impl<T> ExactSizeIterator for Windows<'_, T> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn formula(n: usize, w: usize, r: f64) -> usize {
        let o = overlap_rows(w, r);
        if n >= w {
            (n - w) / (w - o) + 1
        } else {
            0
        }
    }

    #[test]
    fn count_matches_closed_form() {
        for n in [0usize, 1, 99, 100, 149, 150, 151, 299, 300, 301, 1000] {
            for w in [1usize, 7, 50, 150] {
                for r in [0.0, 0.1, 0.25, 0.5, 0.9] {
                    let o = overlap_rows(w, r);
                    let data: Vec<usize> = (0..n).collect();
                    let produced = windows(&data, w, o).count();
                    assert_eq!(produced, formula(n, w, r), "n={n} w={w} r={r}");
                    assert_eq!(window_count(n, w, o), produced);
                    assert_eq!(windows(&data, w, o).len(), produced);
                }
            }
        }
    }

    #[test]
    fn disjoint_windows_partition_all_but_remainder() {
        let data: Vec<usize> = (0..310).collect();
        let covered: Vec<usize> = windows(&data, 150, 0).flatten().copied().collect();
        assert_eq!(covered, (0..300).collect::<Vec<_>>());
    }

    #[test]
    fn overlapping_windows_share_rows() {
        let data: Vec<usize> = (0..10).collect();
        let starts: Vec<usize> = windows(&data, 4, overlap_rows(4, 0.5))
            .map(|w| w[0])
            .collect();
        assert_eq!(starts, vec![0, 2, 4, 6]);
    }

    #[test]
    fn short_input_yields_nothing() {
        let data: Vec<usize> = (0..100).collect();
        assert_eq!(windows(&data, 150, 0).next(), None);
        assert_eq!(window_count(100, 150, 0), 0);
    }
}
