use serde::{Deserialize, Deserializer, Serialize};

/// A marker color unpacked from its wire integer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Color {
    /// `0xRRGGBB`
    pub rgb: u32,
    /// 0.0..=1.0
    pub opacity: f64,
}

impl Color {
    /// Unpack a wire color. Eight hex digits means `AARRGGBB`; anything shorter is opaque RGB.
    ///
    /// Signed inputs are accepted because ARGB values with a high alpha overflow a signed
    /// 32-bit integer on the producing side.
    pub fn unpack(packed: i64) -> Self {
        let value = packed as u32;
        if value > 0x0FFF_FFFF {
            Self {
                rgb: value & 0x00FF_FFFF,
                opacity: (value >> 24) as f64 / 255.0,
            }
        } else {
            Self {
                rgb: value & 0x00FF_FFFF,
                opacity: 1.0,
            }
        }
    }

    pub fn rgb_bytes(&self) -> (u8, u8, u8) {
        (
            (self.rgb >> 16) as u8,
            (self.rgb >> 8) as u8,
            self.rgb as u8,
        )
    }

    /// `#rrggbb`
    pub fn hex(&self) -> String {
        format!("#{:06x}", self.rgb)
    }

    pub fn rgba_css(&self) -> String {
        let (r, g, b) = self.rgb_bytes();
        rgba_css(r, g, b, self.opacity)
    }

    /// Same color with its opacity multiplied by `factor`.
    pub fn faded(&self, factor: f64) -> Self {
        Self {
            rgb: self.rgb,
            opacity: (self.opacity * factor).clamp(0.0, 1.0),
        }
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        i64::deserialize(deserializer).map(Color::unpack)
    }
}

/// Format RGBA as a CSS color string.
pub fn rgba_css(r: u8, g: u8, b: u8, a: f64) -> String {
    format!("rgba({r},{g},{b},{a})")
}

#[cfg(test)]
mod tests {
    use super::Color;

    fn assert_close(actual: f64, expected: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff < 1e-9,
            "expected {expected}, got {actual} (diff: {diff})"
        );
    }

    #[test]
    fn eight_digit_color_carries_alpha() {
        let color = Color::unpack(0x80FF_0000);
        assert_eq!(color.hex(), "#ff0000");
        assert_close(color.opacity, 128.0 / 255.0);
    }

    #[test]
    fn six_digit_color_is_opaque() {
        let color = Color::unpack(0x00FF00);
        assert_eq!(color.hex(), "#00ff00");
        assert_close(color.opacity, 1.0);
    }

    #[test]
    fn seven_digit_color_is_opaque_rgb() {
        let color = Color::unpack(0x0A12_3456);
        assert_eq!(color.hex(), "#123456");
        assert_close(color.opacity, 1.0);
    }

    #[test]
    fn negative_signed_argb_unpacks_like_unsigned() {
        let signed = 0xFF33_6699u32 as i32 as i64;
        assert!(signed < 0);
        assert_eq!(Color::unpack(signed), Color::unpack(0xFF33_6699));
        assert_close(Color::unpack(signed).opacity, 1.0);
    }

    #[test]
    fn css_output() {
        let color = Color::unpack(0xFF00_80FF);
        assert_eq!(color.rgb_bytes(), (0, 128, 255));
        assert_eq!(color.rgba_css(), "rgba(0,128,255,1)");
        assert_eq!(color.faded(0.5).rgba_css(), "rgba(0,128,255,0.5)");
    }

    #[test]
    fn deserializes_from_json_number() {
        let color: Color = serde_json::from_str("4294901760").unwrap();
        assert_eq!(color.hex(), "#ff0000");
        assert_close(color.opacity, 1.0);
    }
}
