//! Page geometry for monospaced text.
//!
//! All measurements are PDF points (1/72 inch). Text is set in Courier, so
//! every glyph advances by the same width and a page is a plain grid of
//! character cells.

use crate::error::LayoutError;

/// Courier glyph advance as a fraction of the font size.
pub const MONO_ADVANCE: f32 = 0.6;

/// Smallest text grid that still fits a banner, one body row and a footer.
const MIN_COLUMNS: usize = 20;
const MIN_ROWS: usize = 10;

/// Page size, margin and type size for a text page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
    pub font_size: f32,
    pub leading: f32,
}

impl PageGeometry {
    /// ISO A4 portrait with a 10pt type grid
    pub const A4: Self = Self {
        width: 595.28,
        height: 841.89,
        margin: 48.0,
        font_size: 10.0,
        leading: 13.0,
    };

    /// US Letter portrait with the same type grid as A4
    pub const LETTER: Self = Self {
        width: 612.0,
        height: 792.0,
        ..Self::A4
    };

    /// Page of the given size using the default margin and type size.
    pub fn with_size(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            ..Self::A4
        }
    }

    /// Check that the geometry describes a usable text grid.
    pub fn validate(&self) -> Result<(), LayoutError> {
        let values = [
            self.width,
            self.height,
            self.margin,
            self.font_size,
            self.leading,
        ];
        if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(LayoutError::InvalidGeometry(
                "dimensions must be finite and non-negative",
            ));
        }
        if self.font_size == 0.0 || self.leading == 0.0 {
            return Err(LayoutError::InvalidGeometry(
                "font size and leading must be positive",
            ));
        }

        let (columns, rows) = (self.columns(), self.rows());
        if columns < MIN_COLUMNS || rows < MIN_ROWS {
            return Err(LayoutError::PageTooSmall { columns, rows });
        }
        Ok(())
    }

    /// Number of character cells between the left and right margins.
    pub fn columns(&self) -> usize {
        let usable = self.width - 2.0 * self.margin;
        let advance = self.font_size * MONO_ADVANCE;
        if usable <= 0.0 || advance <= 0.0 {
            return 0;
        }
        (usable / advance).floor() as usize
    }

    /// Number of text rows between the top and bottom margins.
    pub fn rows(&self) -> usize {
        let usable = self.height - 2.0 * self.margin;
        if usable <= 0.0 || self.leading <= 0.0 {
            return 0;
        }
        (usable / self.leading).floor() as usize
    }

    /// Baseline of `row` (0 is the top row) in PDF user space.
    pub fn baseline(&self, row: usize) -> f32 {
        self.height - self.margin - self.font_size - row as f32 * self.leading
    }

    /// Rendered width of `chars` glyphs.
    pub fn text_width(&self, chars: usize) -> f32 {
        chars as f32 * self.font_size * MONO_ADVANCE
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::A4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_a4_grid() {
        let geometry = PageGeometry::A4;
        assert!(geometry.validate().is_ok());
        // (595.28 - 96) / 6 = 83.2
        assert_eq!(geometry.columns(), 83);
        // (841.89 - 96) / 13 = 57.3
        assert_eq!(geometry.rows(), 57);
    }

    #[test]
    fn test_letter_shares_type_grid() {
        assert_eq!(PageGeometry::LETTER.font_size, PageGeometry::A4.font_size);
        assert_eq!(PageGeometry::LETTER.width, 612.0);
    }

    #[test]
    fn test_rejects_negative_dimensions() {
        let geometry = PageGeometry {
            margin: -1.0,
            ..PageGeometry::A4
        };
        assert!(matches!(
            geometry.validate(),
            Err(LayoutError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_rejects_nan() {
        let geometry = PageGeometry {
            width: f32::NAN,
            ..PageGeometry::A4
        };
        assert!(geometry.validate().is_err());
    }

    #[test]
    fn test_rejects_tiny_page() {
        let geometry = PageGeometry::with_size(120.0, 120.0);
        assert!(matches!(
            geometry.validate(),
            Err(LayoutError::PageTooSmall { .. })
        ));
    }

    #[test]
    fn test_margins_larger_than_page() {
        let geometry = PageGeometry {
            margin: 400.0,
            ..PageGeometry::A4
        };
        assert_eq!(geometry.columns(), 0);
        assert_eq!(geometry.rows(), 0);
    }

    #[test]
    fn test_baselines_descend() {
        let geometry = PageGeometry::A4;
        assert!(geometry.baseline(0) > geometry.baseline(1));
        let step = geometry.baseline(0) - geometry.baseline(1);
        assert!((step - geometry.leading).abs() < 0.01);
    }
}
