/// Linear premultiplied RGBA color.
///
/// Invariant:
/// - `rgb` components are expected to be multiplied by `a` (premultiplied alpha).
///
/// The `#[repr(C)]` layout matches the `vec4<f32>` parameter block read by
/// brush and effect shaders, so a color is uploaded as-is.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Color {
    pub r: f32, // premultiplied
    pub g: f32, // premultiplied
    pub b: f32, // premultiplied
    pub a: f32,
}

impl Color {
    pub const TRANSPARENT: Color = Color::from_premul(0.0, 0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::from_premul(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::from_premul(0.0, 0.0, 0.0, 1.0);

    /// Creates a premultiplied color from premultiplied components.
    #[inline]
    pub const fn from_premul(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Fully opaque color; premultiplication is the identity.
    #[inline]
    pub const fn opaque(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Creates a premultiplied color from straight alpha components.
    #[inline]
    pub fn from_straight(r: f32, g: f32, b: f32, a: f32) -> Self {
        let a = a.clamp(0.0, 1.0);
        Self {
            r: r.clamp(0.0, 1.0) * a,
            g: g.clamp(0.0, 1.0) * a,
            b: b.clamp(0.0, 1.0) * a,
            a,
        }
    }

    /// Creates a premultiplied color from straight RGBA bytes.
    #[inline]
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::from_straight(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, a as f32 / 255.0)
    }

    #[inline]
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    #[inline]
    pub fn from_array(c: [f32; 4]) -> Self {
        Self::from_premul(c[0], c[1], c[2], c[3])
    }

    /// Quantizes the premultiplied channels to bytes (round to nearest).
    #[inline]
    pub fn to_rgba8(self) -> [u8; 4] {
        self.to_array().map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
    }

    /// Component-wise product, used by tinting effects.
    #[inline]
    pub fn modulate(self, other: Color) -> Color {
        Color::from_premul(self.r * other.r, self.g * other.g, self.b * other.b, self.a * other.a)
    }

    /// Premultiplied source-over: `self` drawn over `dst`.
    #[inline]
    pub fn over(self, dst: Color) -> Color {
        let inv = 1.0 - self.a;
        Color::from_premul(
            self.r + dst.r * inv,
            self.g + dst.g * inv,
            self.b + dst.b * inv,
            self.a + dst.a * inv,
        )
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.r.is_finite() && self.g.is_finite() && self.b.is_finite() && self.a.is_finite()
    }

    /// Debug-only validation: RGB must not exceed alpha.
    #[inline]
    pub fn debug_assert_premul(self) {
        debug_assert!(
            self.r <= self.a + f32::EPSILON
                && self.g <= self.a + f32::EPSILON
                && self.b <= self.a + f32::EPSILON,
            "Color::debug_assert_premul: {self:?} looks like straight alpha passed as premultiplied"
        );
    }
}

impl From<Color> for wgpu::Color {
    #[inline]
    fn from(c: Color) -> Self {
        wgpu::Color {
            r: c.r as f64,
            g: c.g as f64,
            b: c.b as f64,
            a: c.a as f64,
        }
    }
}
