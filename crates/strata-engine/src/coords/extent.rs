use super::Vec2;

/// Size of a render target in physical pixels.
///
/// Conversions between NDC and pixel space go through the extent so every
/// backend (and the effect blit region) agrees on where a pixel centre lands.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Maps an NDC point (+Y up) to pixel space (+Y down).
    #[inline]
    pub fn ndc_to_pixel(self, p: Vec2) -> Vec2 {
        Vec2::new(
            (p.x + 1.0) * 0.5 * self.width as f32,
            (1.0 - p.y) * 0.5 * self.height as f32,
        )
    }

    /// Inverse of [`ndc_to_pixel`](Self::ndc_to_pixel).
    #[inline]
    pub fn pixel_to_ndc(self, p: Vec2) -> Vec2 {
        Vec2::new(
            p.x / self.width.max(1) as f32 * 2.0 - 1.0,
            1.0 - p.y / self.height.max(1) as f32 * 2.0,
        )
    }
}

impl From<winit::dpi::PhysicalSize<u32>> for Extent {
    #[inline]
    fn from(size: winit::dpi::PhysicalSize<u32>) -> Self {
        Extent::new(size.width, size.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ndc_corners_map_to_target_corners() {
        let e = Extent::new(600, 400);
        assert_eq!(e.ndc_to_pixel(Vec2::new(-1.0, 1.0)), Vec2::new(0.0, 0.0));
        assert_eq!(e.ndc_to_pixel(Vec2::new(1.0, -1.0)), Vec2::new(600.0, 400.0));
        assert_eq!(e.ndc_to_pixel(Vec2::zero()), Vec2::new(300.0, 200.0));
    }

    #[test]
    fn pixel_to_ndc_inverts_ndc_to_pixel() {
        let e = Extent::new(640, 480);
        let p = Vec2::new(0.25, -0.5);
        let back = e.pixel_to_ndc(e.ndc_to_pixel(p));
        assert!((back.x - p.x).abs() < 1e-6);
        assert!((back.y - p.y).abs() < 1e-6);
    }

    #[test]
    fn empty_extent() {
        assert!(Extent::new(0, 10).is_empty());
        assert!(!Extent::new(1, 1).is_empty());
        assert_eq!(Extent::new(3, 4).pixel_count(), 12);
    }
}
