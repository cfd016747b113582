//! 2D drawing surface used by the layer preview

use glam::DVec2;
use layerview_core::Rgba;
use std::fmt::Write;

/// Immediate-mode 2D drawing context
pub trait Canvas2D {
    /// Stroke a line with rounded ends
    fn line(&mut self, from: DVec2, to: DVec2, width: f64, color: Rgba);

    /// Fill a circle
    fn circle(&mut self, center: DVec2, radius: f64, color: Rgba);
}

/// Canvas that records drawing as SVG elements
#[derive(Debug, Clone)]
pub struct SvgCanvas {
    width: f64,
    height: f64,
    background: Option<Rgba>,
    body: String,
    elements: usize,
}

impl SvgCanvas {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            background: None,
            body: String::new(),
            elements: 0,
        }
    }

    pub fn with_background(mut self, color: Rgba) -> Self {
        self.background = Some(color);
        self
    }

    /// Number of shapes drawn so far
    pub fn element_count(&self) -> usize {
        self.elements
    }

    /// The complete SVG document
    pub fn finish(&self) -> String {
        let mut svg = String::with_capacity(self.body.len() + 256);
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{:.0}" height="{:.0}" viewBox="0 0 {:.2} {:.2}">"#,
            self.width, self.height, self.width, self.height
        );
        if let Some(bg) = self.background {
            let _ = writeln!(
                svg,
                r#"<rect width="100%" height="100%" fill="{}"/>"#,
                bg.to_hex()
            );
        }
        svg.push_str(&self.body);
        svg.push_str("</svg>\n");
        svg
    }
}

impl Canvas2D for SvgCanvas {
    fn line(&mut self, from: DVec2, to: DVec2, width: f64, color: Rgba) {
        let _ = writeln!(
            self.body,
            r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{}" stroke-opacity="{:.2}" stroke-width="{:.3}" stroke-linecap="round"/>"#,
            from.x,
            from.y,
            to.x,
            to.y,
            color.to_hex(),
            color.opacity(),
            width
        );
        self.elements += 1;
    }

    fn circle(&mut self, center: DVec2, radius: f64, color: Rgba) {
        let _ = writeln!(
            self.body,
            r#"<circle cx="{:.2}" cy="{:.2}" r="{:.3}" fill="{}" fill-opacity="{:.2}"/>"#,
            center.x,
            center.y,
            radius,
            color.to_hex(),
            color.opacity()
        );
        self.elements += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_svg_elements() {
        let mut canvas = SvgCanvas::new(100.0, 50.0).with_background(Rgba::WHITE);
        canvas.line(DVec2::new(1.0, 2.0), DVec2::new(3.0, 4.0), 0.5, Rgba::RED);
        canvas.circle(DVec2::new(5.0, 5.0), 1.5, Rgba::BLUE.with_alpha(0));

        let svg = canvas.finish();
        assert_eq!(canvas.element_count(), 2);
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r##"fill="#ffffff""##));
        assert!(svg.contains(
            r##"<line x1="1.00" y1="2.00" x2="3.00" y2="4.00" stroke="#ff0000" stroke-opacity="1.00" stroke-width="0.500""##
        ));
        assert!(svg.contains(r##"<circle cx="5.00" cy="5.00" r="1.500" fill="#0000ff" fill-opacity="0.00"/>"##));
        assert!(svg.trim_end().ends_with("</svg>"));
    }
}
