//! Shape illustrations as flattened vector geometry.
//!
//! Every shape is expressed in its own view box (y grows downwards). Curves are
//! flattened into line segments so any line-drawing surface can render them.

use std::f64::consts::PI;

use crate::Rgb;

const SIDE_COLORS: [Rgb; 6] = [
    Rgb(0xE5, 0x39, 0x35),
    Rgb(0x15, 0x65, 0xC0),
    Rgb(0x2E, 0x7D, 0x32),
    Rgb(0xF9, 0xA8, 0x25),
    Rgb(0x7B, 0x1F, 0xA2),
    Rgb(0xEF, 0x6C, 0x00),
];
const CORNER_RADIUS: f64 = 5.0;
const CURVE_STEPS: usize = 48;

pub type Point = (f64, f64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub from: Point,
    pub to: Point,
    pub color: Rgb,
}

/// Corner marker drawn as a filled dot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dot {
    pub center: Point,
    pub radius: f64,
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Icon {
    pub view_box: (f64, f64),
    pub segments: Vec<Segment>,
    pub dots: Vec<Dot>,
}

pub const SHAPE_NAMES: [&str; 10] = [
    "Circle",
    "Oval",
    "Triangle",
    "Square",
    "Rectangle",
    "Diamond",
    "Star",
    "Heart",
    "Crescent",
    "Cross",
];

/// Looks a shape up by name. Unknown names have no illustration.
pub fn shape_icon(name: &str) -> Option<Icon> {
    let icon = match name.trim() {
        "Circle" => Icon {
            view_box: (120.0, 120.0),
            segments: polyline(&ellipse((60.0, 60.0), 48.0, 48.0), true, SIDE_COLORS[0]),
            dots: Vec::new(),
        },
        "Oval" => Icon {
            view_box: (140.0, 100.0),
            segments: polyline(&ellipse((70.0, 50.0), 58.0, 38.0), true, SIDE_COLORS[5]),
            dots: Vec::new(),
        },
        "Triangle" => polygon((120.0, 110.0), &[(60.0, 10.0), (110.0, 95.0), (10.0, 95.0)]),
        "Square" => polygon(
            (120.0, 120.0),
            &[(15.0, 15.0), (105.0, 15.0), (105.0, 105.0), (15.0, 105.0)],
        ),
        "Rectangle" => polygon(
            (140.0, 120.0),
            &[(10.0, 25.0), (130.0, 25.0), (130.0, 95.0), (10.0, 95.0)],
        ),
        "Diamond" => polygon(
            (120.0, 120.0),
            &[(60.0, 8.0), (112.0, 60.0), (60.0, 112.0), (8.0, 60.0)],
        ),
        "Star" => star(),
        "Heart" => heart(),
        "Crescent" => crescent(),
        "Cross" => cross(),
        _ => return None,
    };
    Some(icon)
}

fn polygon(view_box: (f64, f64), points: &[Point]) -> Icon {
    let segments = (0..points.len())
        .map(|i| Segment {
            from: points[i],
            to: points[(i + 1) % points.len()],
            color: SIDE_COLORS[i % SIDE_COLORS.len()],
        })
        .collect();
    Icon {
        view_box,
        segments,
        dots: corners(points.iter().copied()),
    }
}

fn corners(points: impl Iterator<Item = Point>) -> Vec<Dot> {
    points
        .enumerate()
        .map(|(i, center)| Dot {
            center,
            radius: CORNER_RADIUS,
            color: SIDE_COLORS[i % SIDE_COLORS.len()],
        })
        .collect()
}

fn star() -> Icon {
    let mut points = Vec::with_capacity(10);
    for i in 0..5 {
        let outer = (i as f64 * 72.0 - 90.0).to_radians();
        points.push((60.0 + 50.0 * outer.cos(), 60.0 + 50.0 * outer.sin()));
        let inner = (i as f64 * 72.0 + 36.0 - 90.0).to_radians();
        points.push((60.0 + 22.0 * inner.cos(), 60.0 + 22.0 * inner.sin()));
    }
    Icon {
        view_box: (120.0, 120.0),
        segments: polyline(&points, true, SIDE_COLORS[3]),
        dots: corners(points.iter().copied().step_by(2)),
    }
}

fn heart() -> Icon {
    let color = Rgb(0xE9, 0x1E, 0x63);
    let curves = [
        [(60.0, 100.0), (20.0, 70.0), (0.0, 40.0), (20.0, 20.0)],
        [(20.0, 20.0), (35.0, 5.0), (55.0, 15.0), (60.0, 35.0)],
        [(60.0, 35.0), (65.0, 15.0), (85.0, 5.0), (100.0, 20.0)],
        [(100.0, 20.0), (120.0, 40.0), (100.0, 70.0), (60.0, 100.0)],
    ];
    let mut points = Vec::new();
    for curve in curves {
        let flattened = cubic(curve);
        points.extend_from_slice(&flattened[..flattened.len() - 1]);
    }
    Icon {
        view_box: (120.0, 120.0),
        segments: polyline(&points, true, color),
        dots: Vec::new(),
    }
}

fn crescent() -> Icon {
    let color = Rgb(0x5C, 0x6B, 0xC0);
    // Outer arc runs bottom -> left -> top; the inner arc shares both tips.
    let (outer_r, inner_r) = (50.0, 45.0);
    let mut points = arc((60.0, 60.0), outer_r, 60.0, 300.0);
    let (tip_x, tip_dy) = (60.0 + outer_r / 2.0, outer_r * 60f64.to_radians().sin());
    let inner_cx = tip_x + (inner_r * inner_r - tip_dy * tip_dy).sqrt();
    let tip_deg = ((tip_x - inner_cx) / inner_r).acos().to_degrees();
    let inner = arc((inner_cx, 60.0), inner_r, 360.0 - tip_deg, tip_deg);
    points.extend(&inner[1..inner.len() - 1]);
    Icon {
        view_box: (120.0, 120.0),
        segments: polyline(&points, true, color),
        dots: Vec::new(),
    }
}

fn cross() -> Icon {
    let points = [
        (45.0, 10.0),
        (75.0, 10.0),
        (75.0, 45.0),
        (110.0, 45.0),
        (110.0, 75.0),
        (75.0, 75.0),
        (75.0, 110.0),
        (45.0, 110.0),
        (45.0, 75.0),
        (10.0, 75.0),
        (10.0, 45.0),
        (45.0, 45.0),
    ];
    Icon {
        view_box: (120.0, 120.0),
        segments: polyline(&points, true, Rgb(0x00, 0x89, 0x7B)),
        dots: corners(points.iter().copied()),
    }
}

fn polyline(points: &[Point], closed: bool, color: Rgb) -> Vec<Segment> {
    let count = if closed {
        points.len()
    } else {
        points.len().saturating_sub(1)
    };
    (0..count)
        .map(|i| Segment {
            from: points[i],
            to: points[(i + 1) % points.len()],
            color,
        })
        .collect()
}

fn ellipse(center: Point, rx: f64, ry: f64) -> Vec<Point> {
    (0..CURVE_STEPS)
        .map(|i| {
            let t = 2.0 * PI * i as f64 / CURVE_STEPS as f64;
            (center.0 + rx * t.cos(), center.1 + ry * t.sin())
        })
        .collect()
}

/// Points along a circular arc between two angles in degrees, inclusive.
fn arc(center: Point, r: f64, from_deg: f64, to_deg: f64) -> Vec<Point> {
    (0..=CURVE_STEPS)
        .map(|i| {
            let deg = from_deg + (to_deg - from_deg) * i as f64 / CURVE_STEPS as f64;
            let t = deg.to_radians();
            (center.0 + r * t.cos(), center.1 + r * t.sin())
        })
        .collect()
}

fn cubic([p0, p1, p2, p3]: [Point; 4]) -> Vec<Point> {
    let steps = CURVE_STEPS / 4;
    (0..=steps)
        .map(|i| {
            let t = i as f64 / steps as f64;
            let u = 1.0 - t;
            let w = [u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t];
            (
                w[0] * p0.0 + w[1] * p1.0 + w[2] * p2.0 + w[3] * p3.0,
                w[0] * p0.1 + w[1] * p1.1 + w[2] * p2.1 + w[3] * p3.1,
            )
        })
        .collect()
}
