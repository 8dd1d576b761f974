//! Click coordinates and risk-zone shapes, all in image pixel space.
//!
//! Shapes are validated when they are built from raw coordinates, so
//! [`Shape::contains`] never has to deal with malformed input.

use serde::{Deserialize, Serialize};

/// Tolerance used when deciding whether a point sits on a polygon edge.
const EDGE_EPSILON: f64 = 1e-9;

/// A click position. Coordinates are always finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Result<Self, ShapeError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(ShapeError::NonFinite);
        }
        Ok(Self { x, y })
    }
}

/// Shape discriminator as it appears in stored zone documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Circle,
    Rectangle,
    Polygon,
}

impl ShapeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Circle => "circle",
            Self::Rectangle => "rectangle",
            Self::Polygon => "polygon",
        }
    }
}

impl std::fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ShapeError {
    #[error("{kind} expects {expected} coordinates, got {got}")]
    WrongArity {
        kind: ShapeKind,
        expected: &'static str,
        got: usize,
    },
    #[error("coordinates must be finite numbers")]
    NonFinite,
    #[error("{0} must not be negative")]
    Negative(&'static str),
    #[error("polygon needs at least 3 vertices, got {0}")]
    TooFewVertices(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Circle { cx: f64, cy: f64, r: f64 },
    Rectangle { x: f64, y: f64, w: f64, h: f64 },
    Polygon { vertices: Vec<Point> },
}

impl Shape {
    /// Build a shape from the flat coordinate list used by zone documents:
    /// `[cx, cy, r]`, `[x, y, w, h]` or `[x1, y1, x2, y2, ...]`.
    pub fn from_coordinates(kind: ShapeKind, coords: &[f64]) -> Result<Self, ShapeError> {
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(ShapeError::NonFinite);
        }

        match kind {
            ShapeKind::Circle => {
                let &[cx, cy, r] = coords else {
                    return Err(ShapeError::WrongArity {
                        kind,
                        expected: "3",
                        got: coords.len(),
                    });
                };
                if r < 0.0 {
                    return Err(ShapeError::Negative("radius"));
                }
                Ok(Self::Circle { cx, cy, r })
            }
            ShapeKind::Rectangle => {
                let &[x, y, w, h] = coords else {
                    return Err(ShapeError::WrongArity {
                        kind,
                        expected: "4",
                        got: coords.len(),
                    });
                };
                if w < 0.0 {
                    return Err(ShapeError::Negative("width"));
                }
                if h < 0.0 {
                    return Err(ShapeError::Negative("height"));
                }
                Ok(Self::Rectangle { x, y, w, h })
            }
            ShapeKind::Polygon => {
                if coords.len() % 2 != 0 {
                    return Err(ShapeError::WrongArity {
                        kind,
                        expected: "an even number of",
                        got: coords.len(),
                    });
                }
                let vertices: Vec<Point> = coords
                    .chunks_exact(2)
                    .map(|pair| Point {
                        x: pair[0],
                        y: pair[1],
                    })
                    .collect();
                if vertices.len() < 3 {
                    return Err(ShapeError::TooFewVertices(vertices.len()));
                }
                Ok(Self::Polygon { vertices })
            }
        }
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Self::Circle { .. } => ShapeKind::Circle,
            Self::Rectangle { .. } => ShapeKind::Rectangle,
            Self::Polygon { .. } => ShapeKind::Polygon,
        }
    }

    /// Flatten back into the document coordinate list.
    pub fn to_coordinates(&self) -> Vec<f64> {
        match self {
            Self::Circle { cx, cy, r } => vec![*cx, *cy, *r],
            Self::Rectangle { x, y, w, h } => vec![*x, *y, *w, *h],
            Self::Polygon { vertices } => vertices.iter().flat_map(|v| [v.x, v.y]).collect(),
        }
    }

    /// Boundary-inclusive containment test.
    pub fn contains(&self, p: Point) -> bool {
        match self {
            Self::Circle { cx, cy, r } => {
                let dx = p.x - cx;
                let dy = p.y - cy;
                (dx * dx + dy * dy).sqrt() <= *r
            }
            Self::Rectangle { x, y, w, h } => {
                *x <= p.x && p.x <= x + w && *y <= p.y && p.y <= y + h
            }
            Self::Polygon { vertices } => polygon_contains(vertices, p),
        }
    }
}

/// Even-odd rule. Points on an edge or vertex count as inside.
fn polygon_contains(vertices: &[Point], p: Point) -> bool {
    let n = vertices.len();
    let mut inside = false;
    let mut j = n - 1;

    for i in 0..n {
        let a = vertices[i];
        let b = vertices[j];

        if on_segment(a, b, p) {
            return true;
        }

        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }

    inside
}

fn on_segment(a: Point, b: Point, p: Point) -> bool {
    let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
    let scale = (b.x - a.x).abs().max((b.y - a.y).abs()).max(1.0);
    if cross.abs() > EDGE_EPSILON * scale {
        return false;
    }
    p.x >= a.x.min(b.x) - EDGE_EPSILON
        && p.x <= a.x.max(b.x) + EDGE_EPSILON
        && p.y >= a.y.min(b.y) - EDGE_EPSILON
        && p.y <= a.y.max(b.y) + EDGE_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: f64, y: f64) -> Point {
        Point::new(x, y).unwrap()
    }

    fn square() -> Shape {
        Shape::from_coordinates(ShapeKind::Polygon, &[0.0, 0.0, 10.0, 0.0, 10.0, 10.0, 0.0, 10.0])
            .unwrap()
    }

    #[test]
    fn test_point_rejects_non_finite() {
        assert_eq!(Point::new(f64::NAN, 1.0), Err(ShapeError::NonFinite));
        assert_eq!(Point::new(1.0, f64::INFINITY), Err(ShapeError::NonFinite));
    }

    #[test]
    fn test_circle_boundary_inclusive() {
        let c = Shape::from_coordinates(ShapeKind::Circle, &[50.0, 30.0, 15.0]).unwrap();
        assert!(c.contains(pt(50.0, 30.0)));
        assert!(c.contains(pt(65.0, 30.0)));
        assert!(c.contains(pt(50.0, 15.0)));
        assert!(!c.contains(pt(65.1, 30.0)));
    }

    #[test]
    fn test_rectangle_boundary_inclusive() {
        let r = Shape::from_coordinates(ShapeKind::Rectangle, &[20.0, 60.0, 30.0, 20.0]).unwrap();
        assert!(r.contains(pt(20.0, 60.0)));
        assert!(r.contains(pt(50.0, 80.0)));
        assert!(r.contains(pt(35.0, 70.0)));
        assert!(!r.contains(pt(50.5, 70.0)));
        assert!(!r.contains(pt(35.0, 59.9)));
    }

    #[test]
    fn test_polygon_even_odd() {
        let sq = square();
        assert!(sq.contains(pt(5.0, 5.0)));
        assert!(!sq.contains(pt(15.0, 5.0)));
        assert!(!sq.contains(pt(-1.0, 5.0)));
    }

    #[test]
    fn test_polygon_edges_and_vertices_count() {
        let sq = square();
        assert!(sq.contains(pt(0.0, 0.0)));
        assert!(sq.contains(pt(10.0, 5.0)));
        assert!(sq.contains(pt(5.0, 10.0)));
    }

    #[test]
    fn test_concave_polygon_notch_is_outside() {
        // U shape: notch between x=4..6 from y=4 upwards
        let u = Shape::from_coordinates(
            ShapeKind::Polygon,
            &[0.0, 0.0, 10.0, 0.0, 10.0, 10.0, 6.0, 10.0, 6.0, 4.0, 4.0, 4.0, 4.0, 10.0, 0.0, 10.0],
        )
        .unwrap();
        assert!(u.contains(pt(2.0, 8.0)));
        assert!(u.contains(pt(8.0, 8.0)));
        assert!(!u.contains(pt(5.0, 8.0)));
        assert!(u.contains(pt(5.0, 2.0)));
    }

    #[test]
    fn test_wrong_arity_rejected() {
        let err = Shape::from_coordinates(ShapeKind::Circle, &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, ShapeError::WrongArity { got: 2, .. }));

        let err = Shape::from_coordinates(ShapeKind::Rectangle, &[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, ShapeError::WrongArity { got: 3, .. }));

        let err = Shape::from_coordinates(ShapeKind::Polygon, &[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, ShapeError::WrongArity { got: 3, .. }));
    }

    #[test]
    fn test_degenerate_shapes_rejected() {
        assert_eq!(
            Shape::from_coordinates(ShapeKind::Polygon, &[0.0, 0.0, 1.0, 1.0]),
            Err(ShapeError::TooFewVertices(2))
        );
        assert_eq!(
            Shape::from_coordinates(ShapeKind::Circle, &[0.0, 0.0, -1.0]),
            Err(ShapeError::Negative("radius"))
        );
        assert_eq!(
            Shape::from_coordinates(ShapeKind::Rectangle, &[0.0, f64::NAN, 1.0, 1.0]),
            Err(ShapeError::NonFinite)
        );
    }

    #[test]
    fn test_coordinates_roundtrip() {
        let coords = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let shape = Shape::from_coordinates(ShapeKind::Polygon, &coords).unwrap();
        assert_eq!(shape.kind(), ShapeKind::Polygon);
        assert_eq!(shape.to_coordinates(), coords.to_vec());
    }
}
