//! Viewport visibility of rendered articles
//!
//! The rendering layer reports where each article element sits relative to
//! the viewport; the feed uses that to decide which article the reader is
//! looking at.

use serde::{Deserialize, Serialize};

use super::article::Slug;

/// Vertical extent of one rendered article, in viewport coordinates
/// (0 is the top edge of the viewport).
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleBounds {
    pub slug: Slug,
    pub top: f64,
    pub bottom: f64,
}

impl ArticleBounds {
    /// Fraction of the viewport this element covers, in `[0, 1]`
    pub fn visible_fraction(&self, viewport_height: f64) -> f64 {
        if viewport_height <= 0.0 || !viewport_height.is_finite() {
            return 0.0;
        }
        let top = self.top.max(0.0);
        let bottom = self.bottom.min(viewport_height);
        if bottom <= top {
            return 0.0;
        }
        ((bottom - top) / viewport_height).clamp(0.0, 1.0)
    }
}

/// Pick the element covering the largest share of the viewport.
/// Ties keep the first element in document order.
pub fn most_visible(viewport_height: f64, bounds: &[ArticleBounds]) -> Option<(&Slug, f64)> {
    let mut best: Option<(&Slug, f64)> = None;
    for b in bounds {
        let fraction = b.visible_fraction(viewport_height);
        match best {
            Some((_, current)) if current >= fraction => {}
            _ => best = Some((&b.slug, fraction)),
        }
    }
    best
}

/// New shareable address for the page after the reader scrolled onto
/// another article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressBarUpdate {
    pub slug: String,
    pub title: String,
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(slug: &str, top: f64, bottom: f64) -> ArticleBounds {
        ArticleBounds {
            slug: Slug::parse(slug).unwrap(),
            top,
            bottom,
        }
    }

    #[test]
    fn fully_covering_element() {
        assert_eq!(bounds("a", -100.0, 2000.0).visible_fraction(800.0), 1.0);
    }

    #[test]
    fn partially_visible_element() {
        let f = bounds("a", 600.0, 1400.0).visible_fraction(800.0);
        assert!((f - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn element_outside_viewport() {
        assert_eq!(bounds("a", 900.0, 1200.0).visible_fraction(800.0), 0.0);
        assert_eq!(bounds("a", -500.0, -10.0).visible_fraction(800.0), 0.0);
    }

    #[test]
    fn degenerate_viewport() {
        assert_eq!(bounds("a", 0.0, 100.0).visible_fraction(0.0), 0.0);
        assert_eq!(bounds("a", 0.0, 100.0).visible_fraction(f64::NAN), 0.0);
    }

    #[test]
    fn most_visible_picks_largest_share() {
        let all = vec![
            bounds("first", -900.0, 200.0),
            bounds("second", 200.0, 1500.0),
        ];
        let (slug, fraction) = most_visible(800.0, &all).unwrap();
        assert_eq!(slug.as_str(), "second");
        assert!((fraction - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn most_visible_empty() {
        assert!(most_visible(800.0, &[]).is_none());
    }
}
