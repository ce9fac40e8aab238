use super::{Rect, Viewport};

/// Merge the client rectangles of one selection into one rectangle per row.
///
/// Only rectangles of the most common height are kept; the others are
/// inline boxes of nested elements and would draw as noise. Rows are keyed
/// by their top edge and returned top to bottom, in document coordinates.
pub fn recompute_highlights(rects: &[Rect], viewport: &Viewport) -> Vec<Rect> {
    let Some(height) = dominant_height(rects) else {
        return Vec::new();
    };

    let mut rows: Vec<(f64, f64, f64)> = Vec::new();
    for rect in rects.iter().filter(|r| r.height == height) {
        match rows.iter_mut().find(|(top, _, _)| *top == rect.top) {
            Some((_, left, right)) => {
                *left = left.min(rect.left);
                *right = right.max(rect.right());
            }
            None => rows.push((rect.top, rect.left, rect.right())),
        }
    }
    rows.sort_by(|a, b| a.0.total_cmp(&b.0));

    rows.into_iter()
        .map(|(top, left, right)| Rect {
            top: top - viewport.origin_top + viewport.scroll_top,
            left: left - viewport.origin_left + viewport.scroll_left,
            width: right - left,
            height,
        })
        .collect()
}

/// Most frequent height; ties go to the one seen first.
fn dominant_height(rects: &[Rect]) -> Option<f64> {
    let mut counts: Vec<(f64, usize)> = Vec::new();
    for rect in rects {
        match counts.iter_mut().find(|(h, _)| *h == rect.height) {
            Some((_, n)) => *n += 1,
            None => counts.push((rect.height, 1)),
        }
    }
    counts
        .iter()
        .fold(None, |best: Option<(f64, usize)>, &(h, n)| match best {
            Some((_, m)) if m >= n => best,
            _ => Some((h, n)),
        })
        .map(|(h, _)| h)
}
