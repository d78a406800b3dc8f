use serde::{Deserialize, Serialize};

/// Physical page sizes in PDF points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSpec {
    pub name: &'static str,
    pub width: f32,
    pub height: f32,
}

impl PageSpec {
    /// ISO A4: 210 x 297 mm
    pub const A4: Self = Self {
        name: "a4",
        width: 595.28,
        height: 841.89,
    };

    /// ISO A5: 148 x 210 mm
    pub const A5: Self = Self {
        name: "a5",
        width: 419.53,
        height: 595.28,
    };

    /// US Letter: 8.5 x 11 in
    pub const LETTER: Self = Self {
        name: "letter",
        width: 612.0,
        height: 792.0,
    };

    /// US Legal: 8.5 x 14 in
    pub const LEGAL: Self = Self {
        name: "legal",
        width: 612.0,
        height: 1008.0,
    };

    const ALL: [Self; 4] = [Self::A4, Self::A5, Self::LETTER, Self::LEGAL];

    /// Look up a page size by name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|spec| spec.name.eq_ignore_ascii_case(name))
    }

    /// Geometry for the monospaced fallback layout on this page size
    pub fn text_geometry(&self) -> plain_pages::PageGeometry {
        plain_pages::PageGeometry::with_size(self.width, self.height)
    }
}

impl Default for PageSpec {
    fn default() -> Self {
        Self::A4
    }
}

/// Page margins in points
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Margins {
    #[serde(default = "default_vertical_margin")]
    pub top: f32,
    #[serde(default = "default_horizontal_margin")]
    pub right: f32,
    #[serde(default = "default_vertical_margin")]
    pub bottom: f32,
    #[serde(default = "default_horizontal_margin")]
    pub left: f32,
}

fn default_vertical_margin() -> f32 {
    56.0
}

fn default_horizontal_margin() -> f32 {
    50.0
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            top: default_vertical_margin(),
            right: default_horizontal_margin(),
            bottom: default_vertical_margin(),
            left: default_horizontal_margin(),
        }
    }
}

/// Everything the primary engine needs to paginate a document
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PrintOptions {
    pub page: PageSpec,
    pub margins: Margins,
    /// Header template; supports `{title}`, `{page}` and `{pages}`
    pub header: Option<String>,
    /// Footer template; supports `{title}`, `{page}` and `{pages}`
    pub footer: Option<String>,
}

impl PrintOptions {
    pub fn content_width(&self) -> f32 {
        self.page.width - self.margins.left - self.margins.right
    }

    pub fn content_height(&self) -> f32 {
        self.page.height - self.margins.top - self.margins.bottom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(PageSpec::from_name("a4"), Some(PageSpec::A4));
        assert_eq!(PageSpec::from_name("Letter"), Some(PageSpec::LETTER));
        assert_eq!(PageSpec::from_name(" LEGAL "), Some(PageSpec::LEGAL));
        assert_eq!(PageSpec::from_name("a5"), Some(PageSpec::A5));
        assert_eq!(PageSpec::from_name("tabloid"), None);
    }

    #[test]
    fn test_default_margins() {
        let margins = Margins::default();
        assert_eq!(margins.top, 56.0);
        assert_eq!(margins.left, 50.0);
    }

    #[test]
    fn test_content_box() {
        let options = PrintOptions::default();
        assert!((options.content_width() - 495.28).abs() < 0.01);
        assert!((options.content_height() - 729.89).abs() < 0.01);
    }

    #[test]
    fn test_text_geometry_matches_page() {
        let geometry = PageSpec::LETTER.text_geometry();
        assert_eq!(geometry.width, 612.0);
        assert_eq!(geometry.height, 792.0);
    }
}
