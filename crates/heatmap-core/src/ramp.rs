//! Grid-to-pixel mapping with a saturating "hot" color ramp.
//!
//! Zero cells are fully transparent. Non-zero cells are normalised on
//! `[0, ceiling]` and walk black → red → yellow → white; anything above the
//! ceiling renders as the ramp maximum.

use crate::constants::MAX_IMAGE_SIDE;
use crate::error::{CoreError, Result};
use crate::grid::DensityGrid;

/// Where the red channel saturates and green starts rising.
const RED_KNEE: f64 = 0.365;
/// Where the green channel saturates and blue starts rising.
const GREEN_KNEE: f64 = 0.746;

pub const TRANSPARENT: [u8; 4] = [0, 0, 0, 0];

/// RGBA color for a single cell count.
pub fn heat_color(value: u32, ceiling: u32) -> [u8; 4] {
    if value == 0 {
        return TRANSPARENT;
    }
    let ceiling = ceiling.max(1);
    let t = f64::from(value.min(ceiling)) / f64::from(ceiling);

    let r = unit(t / RED_KNEE);
    let g = unit((t - RED_KNEE) / (GREEN_KNEE - RED_KNEE));
    let b = unit((t - GREEN_KNEE) / (1.0 - GREEN_KNEE));
    [r, g, b, u8::MAX]
}

fn unit(x: f64) -> u8 {
    (x.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Rasterise a grid into a row-major RGBA8 buffer, each cell becoming a
/// `scale × scale` block. Returns `(width, height, pixels)`; row 0 of the
/// grid is the top of the image.
pub fn grid_to_rgba(grid: &DensityGrid, ceiling: u32, scale: u32) -> Result<(u32, u32, Vec<u8>)> {
    let side_px = image_side(grid.resolution(), scale)?;
    let scale = scale.max(1) as usize;
    let side = side_px as usize;
    let mut pixels = Vec::with_capacity(side * side * 4);

    for (_, row) in grid.rows() {
        let mut line = Vec::with_capacity(side * 4);
        for &value in row {
            let rgba = heat_color(value, ceiling);
            for _ in 0..scale {
                line.extend_from_slice(&rgba);
            }
        }
        for _ in 0..scale {
            pixels.extend_from_slice(&line);
        }
    }

    Ok((side_px, side_px, pixels))
}

/// Edge length in pixels of a `resolution`-cell grid drawn at `scale`.
/// Fails past `MAX_IMAGE_SIDE`.
pub fn image_side(resolution: usize, scale: u32) -> Result<u32> {
    let scale = scale.max(1);
    resolution
        .checked_mul(scale as usize)
        .filter(|&side| side <= MAX_IMAGE_SIDE)
        .and_then(|side| u32::try_from(side).ok())
        .ok_or_else(|| {
            CoreError::InvalidGrid(format!(
                "{resolution} cells at scale {scale} exceeds the {MAX_IMAGE_SIDE}px image limit"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::GridCell;

    #[test]
    fn test_zero_is_transparent() {
        assert_eq!(heat_color(0, 10), TRANSPARENT);
    }

    #[test]
    fn test_nonzero_is_opaque() {
        for v in 1..=20 {
            assert_eq!(heat_color(v, 10)[3], 255, "value {v} should be opaque");
        }
    }

    #[test]
    fn test_saturates_at_ceiling() {
        let max = heat_color(10, 10);
        assert_eq!(max, [255, 255, 255, 255]);
        assert_eq!(heat_color(11, 10), max);
        assert_eq!(heat_color(u32::MAX, 10), max);
    }

    #[test]
    fn test_ramp_is_monotonic() {
        let mut prev = [0u8; 4];
        for v in 1..=10 {
            let c = heat_color(v, 10);
            assert!(c[0] >= prev[0] && c[1] >= prev[1] && c[2] >= prev[2]);
            prev = c;
        }
    }

    #[test]
    fn test_low_values_are_red() {
        let c = heat_color(2, 10);
        assert!(c[0] > 0);
        assert_eq!(c[1], 0);
        assert_eq!(c[2], 0);
    }

    #[test]
    fn test_zero_ceiling_does_not_panic() {
        assert_eq!(heat_color(1, 0), [255, 255, 255, 255]);
    }

    #[test]
    fn test_grid_to_rgba_dimensions_and_placement() {
        let mut grid = DensityGrid::new(3);
        grid.increment(GridCell::new(0, 2));
        let (w, h, px) = grid_to_rgba(&grid, 10, 2).unwrap();
        assert_eq!((w, h), (6, 6));
        assert_eq!(px.len(), 6 * 6 * 4);

        let pixel = |x: usize, y: usize| &px[(y * 6 + x) * 4..(y * 6 + x) * 4 + 4];
        // cell (0, 2) covers x in 4..6, y in 0..2
        assert_eq!(pixel(4, 0)[3], 255);
        assert_eq!(pixel(5, 1)[3], 255);
        assert_eq!(pixel(3, 0)[3], 0);
        assert_eq!(pixel(4, 2)[3], 0);
    }

    #[test]
    fn test_empty_grid_fully_transparent() {
        let grid = DensityGrid::new(4);
        let (_, _, px) = grid_to_rgba(&grid, 10, 1).unwrap();
        assert!(px.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_image_side_limits() {
        assert_eq!(image_side(200, 4).unwrap(), 800);
        assert_eq!(image_side(200, 0).unwrap(), 200);
        assert_eq!(image_side(MAX_IMAGE_SIDE, 1).unwrap(), MAX_IMAGE_SIDE as u32);
        assert!(image_side(MAX_IMAGE_SIDE, 2).is_err());
        assert!(image_side(4096, u32::MAX).is_err());
        assert!(image_side(usize::MAX, 2).is_err());
    }
}
