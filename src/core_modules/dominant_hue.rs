// THEORY:
// Dominant-hue selective desaturation needs a global statistic before it can touch
// a single pixel, so it runs as two passes separated by a barrier:
//
// 1.  **Reduce**: every leaf region builds its own 360-bucket histogram of
//     (count, saturation sum, value sum). Siblings are merged when they join, so
//     the histogram the barrier sees covers every pixel exactly once and no task
//     ever shares a bucket with another.
// 2.  **Barrier**: single-threaded. The bucket with the highest count is the
//     dominant hue; its mean saturation and value give the reference color.
// 3.  **Map**: a tolerance window is centered on the dominant hue. Its half-width
//     shrinks as |intensity| grows and it wraps around 0/360. Negative intensity
//     grays out pixels inside the window, positive intensity grays out everything
//     outside it. Phase 2 is a pure per-pixel map, so it runs in place.

use crate::core_modules::pixel::pixel::{Channel, Pixel};
use crate::core_modules::pixel_buffer::PixelBuffer;
use crate::core_modules::region::Region;
use crate::core_modules::scheduler::{schedule, schedule_reduce};
use log::debug;

pub const HUE_BUCKETS: usize = 360;

pub type Hue = u16;

/// Hue in integer degrees, saturation and value in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
    pub hue: Hue,
    pub saturation: f64,
    pub value: f64,
}

impl Hsv {
    pub fn from_pixel(pixel: Pixel) -> Self {
        let [r, g, b] = pixel.channels();
        let max = r.max(g).max(b) as f64;
        let min = r.min(g).min(b) as f64;
        let saturation = if max > 0.0 { 1.0 - min / max } else { 0.0 };

        Self {
            hue: hue_of(pixel),
            saturation,
            value: max / 255.0,
        }
    }

    /// Reconstructs an RGB color, used to report the reference color.
    pub fn to_rgb(&self) -> Pixel {
        let max = (255.0 * self.value) as i32;
        let min = (max as f64 * (1.0 - self.saturation)) as i32;
        let h = self.hue as f64;
        let z = ((max - min) as f64 * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs())) as i32;
        let (r, g, b) = match self.hue {
            0..60 => (max, z + min, min),
            60..120 => (z + min, max, min),
            120..180 => (min, max, z + min),
            180..240 => (min, z + min, max),
            240..300 => (z + min, min, max),
            _ => (max, min, z + min),
        };
        let c = |v: i32| v.clamp(0, 255) as Channel;
        Pixel::new(c(r), c(g), c(b), 255)
    }
}

/// `round(acos((R - G/2 - B/2) / sqrt(R^2 + G^2 + B^2 - RG - RB - GB)))` in degrees,
/// mirrored to `360 - h` when `B > G`. Achromatic pixels map to 0.
pub fn hue_of(pixel: Pixel) -> Hue {
    let [r, g, b] = pixel.channels().map(f64::from);
    let denominator = (r * r + g * g + b * b - r * g - r * b - g * b).sqrt();
    if denominator == 0.0 {
        return 0;
    }
    let cosine = ((r - g / 2.0 - b / 2.0) / denominator).clamp(-1.0, 1.0);
    let mut hue = cosine.acos().to_degrees().round() as u32;
    if b > g {
        hue = 360 - hue;
    }
    (hue % 360) as Hue
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HueBucket {
    pub count: u64,
    pub sat_sum: f64,
    pub val_sum: f64,
}

/// Per-hue pixel statistics for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct HueHistogram {
    buckets: Vec<HueBucket>,
}

impl Default for HueHistogram {
    fn default() -> Self {
        Self {
            buckets: vec![HueBucket::default(); HUE_BUCKETS],
        }
    }
}

impl HueHistogram {
    pub fn add(&mut self, hsv: &Hsv) {
        let bucket = &mut self.buckets[hsv.hue as usize];
        bucket.count += 1;
        bucket.sat_sum += hsv.saturation;
        bucket.val_sum += hsv.value;
    }

    pub fn merge(mut self, other: HueHistogram) -> HueHistogram {
        for (mine, theirs) in self.buckets.iter_mut().zip(other.buckets) {
            mine.count += theirs.count;
            mine.sat_sum += theirs.sat_sum;
            mine.val_sum += theirs.val_sum;
        }
        self
    }

    pub fn buckets(&self) -> &[HueBucket] {
        &self.buckets
    }

    pub fn total_count(&self) -> u64 {
        self.buckets.iter().map(|b| b.count).sum()
    }

    /// Lowest hue among those with the highest count, with its mean saturation and
    /// value. `None` when the histogram is empty.
    pub fn dominant(&self) -> Option<Hsv> {
        let mut best = 0;
        for (hue, bucket) in self.buckets.iter().enumerate().skip(1) {
            if bucket.count > self.buckets[best].count {
                best = hue;
            }
        }
        let bucket = &self.buckets[best];
        if bucket.count == 0 {
            return None;
        }
        Some(Hsv {
            hue: best as Hue,
            saturation: bucket.sat_sum / bucket.count as f64,
            value: bucket.val_sum / bucket.count as f64,
        })
    }
}

/// A circular hue window and which side of it gets grayed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HueWindow {
    pub center: Hue,
    /// Half-width in degrees, `0..=180`.
    pub tolerance: Hue,
    pub remove_inside: bool,
}

impl HueWindow {
    pub fn new(center: Hue, intensity: i32) -> Self {
        let narrowing = (intensity.unsigned_abs() as f64 * 1.8).round() as i64;
        Self {
            center,
            tolerance: (180 - narrowing).clamp(0, 180) as Hue,
            remove_inside: intensity < 0,
        }
    }

    pub fn contains(&self, hue: Hue) -> bool {
        let diff = (hue as i32 - self.center as i32).rem_euclid(360);
        let distance = diff.min(360 - diff);
        distance <= self.tolerance as i32
    }

    /// Whether a pixel of this hue gets desaturated.
    pub fn selects(&self, hue: Hue) -> bool {
        self.contains(hue) == self.remove_inside
    }
}

/// The "dom" filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DominantHue {
    pub intensity: i32,
}

impl DominantHue {
    pub fn new(intensity: i32) -> Self {
        Self { intensity }
    }

    /// Phase 1 unit transform.
    pub fn histogram_region(buffer: &PixelBuffer, region: Region) -> HueHistogram {
        let mut histogram = HueHistogram::default();
        region.for_each(|x, y| histogram.add(&Hsv::from_pixel(buffer.pixel(x, y))));
        histogram
    }

    /// Phase 1 over the whole buffer.
    pub fn histogram(buffer: &PixelBuffer, cutoff: u64) -> HueHistogram {
        schedule_reduce(
            buffer.bounds(),
            cutoff,
            &|region| Self::histogram_region(buffer, region),
            &HueHistogram::merge,
        )
    }

    /// Phase 2 unit transform.
    pub fn desaturate_region(window: &HueWindow, buffer: &PixelBuffer, region: Region) {
        region.for_each(|x, y| {
            let pixel = buffer.pixel(x, y);
            if window.selects(hue_of(pixel)) {
                buffer.set_pixel(x, y, pixel.gray(pixel.average() as Channel));
            }
        });
    }

    pub fn apply(&self, buffer: &PixelBuffer, cutoff: u64) {
        let histogram = Self::histogram(buffer, cutoff);
        let Some(dominant) = histogram.dominant() else {
            return;
        };

        let window = HueWindow::new(dominant.hue, self.intensity);
        let reference = dominant.to_rgb();
        debug!(
            "dominant hue {} (s={:.3}, v={:.3}, #{:06X}), tolerance {}, remove_inside={}",
            dominant.hue,
            dominant.saturation,
            dominant.value,
            reference.to_argb() & 0xFF_FFFF,
            window.tolerance,
            window.remove_inside
        );

        schedule(buffer.bounds(), cutoff, &|region| {
            Self::desaturate_region(&window, buffer, region)
        });
    }
}
