//! Pixel-space sampling of the parabola for the plotting canvas.
//!
//! Math coordinates map to pixels with `px = origin.x + x * scale` and
//! `py = origin.y - y * scale`, so the y axis grows upwards on screen.

use serde::{Deserialize, Serialize};

use crate::coefficients::Coefficients;
use crate::error::Error;

/// Largest accepted canvas edge, in pixels.
pub const MAX_VIEWPORT_PIXELS: u32 = 8192;

/// Largest number of grid lines along either axis.
pub const MAX_GRID_LINES: f64 = 10_000.0;

/// Pixel position of the math-space origin on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Origin {
    pub x: f64,
    pub y: f64,
}

/// Drawable window and scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    /// Pixels per math unit.
    pub scale: f64,
    /// Defaults to the geometric center when unset.
    pub origin: Option<Origin>,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 400,
            height: 300,
            scale: 20.0,
            origin: None,
        }
    }
}

impl Viewport {
    pub fn origin(&self) -> Origin {
        self.origin.unwrap_or(Origin {
            x: f64::from(self.width) / 2.0,
            y: f64::from(self.height) / 2.0,
        })
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidViewport(format!(
                "{}x{} has no drawable area",
                self.width, self.height
            )));
        }
        if self.width > MAX_VIEWPORT_PIXELS || self.height > MAX_VIEWPORT_PIXELS {
            return Err(Error::InvalidViewport(format!(
                "{}x{} exceeds the {MAX_VIEWPORT_PIXELS} px limit",
                self.width, self.height
            )));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(Error::InvalidViewport(format!(
                "scale must be positive, got {}",
                self.scale
            )));
        }
        let longest = f64::from(self.width.max(self.height));
        if longest / self.scale > MAX_GRID_LINES {
            return Err(Error::InvalidViewport(format!(
                "scale {} yields more than {MAX_GRID_LINES} grid lines",
                self.scale
            )));
        }
        let origin = self.origin();
        if !origin.x.is_finite() || !origin.y.is_finite() {
            return Err(Error::InvalidViewport("origin must be finite".into()));
        }
        Ok(())
    }

    pub fn to_math_x(&self, px: f64) -> f64 {
        (px - self.origin().x) / self.scale
    }

    pub fn to_pixel_x(&self, x: f64) -> f64 {
        self.origin().x + x * self.scale
    }

    pub fn to_pixel_y(&self, y: f64) -> f64 {
        self.origin().y - y * self.scale
    }

    fn contains_y(&self, py: f64) -> bool {
        (0.0..=f64::from(self.height)).contains(&py)
    }
}

/// One visible sample of the curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub px: f64,
    pub py: f64,
    pub x: f64,
    pub y: f64,
}

/// Marker drawn on the x axis at a real root.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RootMarker {
    pub x: f64,
    pub px: f64,
    pub py: f64,
}

/// Pixel offsets of the background grid lines.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GridLines {
    pub vertical: Vec<f64>,
    pub horizontal: Vec<f64>,
}

/// Pixel row of the x axis and pixel column of the y axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Axes {
    pub x_axis: f64,
    pub y_axis: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveSample {
    pub viewport: Viewport,
    pub points: Vec<CurvePoint>,
    pub root_markers: Vec<RootMarker>,
    pub grid: GridLines,
    pub axes: Axes,
}

/// Sample `ax² + bx + c` at every pixel column of the viewport.
///
/// Columns whose value falls outside the vertical range are dropped, so the
/// polyline may have gaps. Root markers are only produced for real roots.
pub fn sample(coef: &Coefficients, viewport: &Viewport) -> Result<CurveSample, Error> {
    viewport.validate()?;

    let points = (0..=viewport.width)
        .filter_map(|column| {
            let px = f64::from(column);
            let x = viewport.to_math_x(px);
            let y = coef.evaluate(x);
            let py = viewport.to_pixel_y(y);
            viewport.contains_y(py).then_some(CurvePoint { px, py, x, y })
        })
        .collect();

    let origin = viewport.origin();
    let root_markers = match coef.solve().real_roots() {
        Some((x1, x2)) => [x1, x2]
            .into_iter()
            .map(|x| RootMarker {
                x,
                px: viewport.to_pixel_x(x),
                py: origin.y,
            })
            .collect(),
        None => Vec::new(),
    };

    Ok(CurveSample {
        viewport: *viewport,
        points,
        root_markers,
        grid: grid_lines(viewport),
        axes: Axes {
            x_axis: origin.y,
            y_axis: origin.x,
        },
    })
}

fn grid_lines(viewport: &Viewport) -> GridLines {
    let steps = |extent: u32| {
        let extent = f64::from(extent);
        let count = (extent / viewport.scale).floor() as usize;
        (0..=count)
            .map(|i| i as f64 * viewport.scale)
            .collect::<Vec<_>>()
    };
    GridLines {
        vertical: steps(viewport.width),
        horizontal: steps(viewport.height),
    }
}
