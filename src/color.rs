use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use rent_scope::data::aggregate::MapPoint;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

fn hsl_to_color32(hue: f32, saturation: f32, lightness: f32) -> Color32 {
    let rgb: Srgb = Hsl::new(hue, saturation, lightness).into_color();
    Color32::from_rgb(
        (rgb.red * 255.0) as u8,
        (rgb.green * 255.0) as u8,
        (rgb.blue * 255.0) as u8,
    )
}

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    (0..n)
        .map(|i| hsl_to_color32((i as f32 / n as f32) * 360.0, 0.75, 0.55))
        .collect()
}

// ---------------------------------------------------------------------------
// Price scale: price → Color32 (cheap = blue, expensive = red)
// ---------------------------------------------------------------------------

/// Continuous colour scale over the prices shown on the map.
#[derive(Debug, Clone, Copy)]
pub struct PriceScale {
    min: f64,
    max: f64,
}

impl PriceScale {
    /// Number of buckets the map draws (one point series per bucket).
    pub const BUCKETS: usize = 8;

    /// Build the scale from the points on screen; `None` if there are none.
    pub fn from_points(points: &[MapPoint]) -> Option<Self> {
        let (min, max) = points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.price), hi.max(p.price))
        });
        (min <= max).then_some(Self { min, max })
    }

    /// Position of `price` on the scale, 0.0 ..= 1.0.
    pub fn fraction(&self, price: f64) -> f64 {
        let range = self.max - self.min;
        if range.abs() < f64::EPSILON {
            0.0
        } else {
            ((price - self.min) / range).clamp(0.0, 1.0)
        }
    }

    /// Bucket index for `price`.
    pub fn bucket(&self, price: f64) -> usize {
        ((self.fraction(price) * Self::BUCKETS as f64) as usize).min(Self::BUCKETS - 1)
    }

    pub fn bucket_color(&self, bucket: usize) -> Color32 {
        let t = bucket as f32 / (Self::BUCKETS - 1) as f32;
        hsl_to_color32(240.0 * (1.0 - t), 0.8, 0.5)
    }

    /// Lower price bound of a bucket, used as its legend label.
    pub fn bucket_floor(&self, bucket: usize) -> f64 {
        self.min + (self.max - self.min) * bucket as f64 / Self::BUCKETS as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(price: f64) -> MapPoint {
        MapPoint {
            longitude: 0.0,
            latitude: 0.0,
            price,
        }
    }

    #[test]
    fn test_palette_size() {
        assert!(generate_palette(0).is_empty());
        assert_eq!(generate_palette(4).len(), 4);
    }

    #[test]
    fn test_price_scale_buckets() {
        assert!(PriceScale::from_points(&[]).is_none());
        let scale = PriceScale::from_points(&[point(1000.0), point(3000.0)]).unwrap();
        assert_eq!(scale.bucket(1000.0), 0);
        assert_eq!(scale.bucket(3000.0), PriceScale::BUCKETS - 1);
        assert_eq!(scale.fraction(2000.0), 0.5);
        assert_eq!(scale.bucket_floor(0), 1000.0);
    }

    #[test]
    fn test_flat_prices_land_in_first_bucket() {
        let scale = PriceScale::from_points(&[point(900.0), point(900.0)]).unwrap();
        assert_eq!(scale.bucket(900.0), 0);
    }
}
