pub mod composite;
pub mod normalize;
pub mod stylize;

pub use composite::composite;
pub use normalize::normalize;
pub use stylize::stylize;

/// Dimensions of `(width, height)` shrunk to fit a `bound`×`bound` box with the
/// aspect ratio kept. Never enlarges.
pub fn fit_within(width: u32, height: u32, bound: u32) -> (u32, u32) {
    if width <= bound && height <= bound {
        return (width, height);
    }
    let bound = bound.max(1);
    let scale = f64::min(bound as f64 / width as f64, bound as f64 / height as f64);
    let fit = |side: u32| ((side as f64 * scale).round() as u32).clamp(1, bound);
    (fit(width), fit(height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_within_keeps_small_images() {
        assert_eq!(fit_within(50, 50, 50), (50, 50));
        assert_eq!(fit_within(10, 40, 1024), (10, 40));
    }

    #[test]
    fn test_fit_within_shrinks_longest_side() {
        assert_eq!(fit_within(2048, 1024, 1024), (1024, 512));
        assert_eq!(fit_within(300, 1200, 600), (150, 600));
        assert_eq!(fit_within(1000, 3, 100), (100, 1));
    }
}
