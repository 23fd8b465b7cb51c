//! Plain geometry records as the two file formats see them.
//!
//! Everything here is dumb data: points, parts, measures, bounding boxes.
//! Translating to a richer geometry model (ring winding, shells vs. holes,
//! coordinate sequences) is the consumer's concern, not this crate's.
//!
//! Coordinates are `f64`, with NaN meaning "no data" on the Z and M axes.
//! Because NaN breaks `PartialEq`, every type also offers `close_to`, a
//! tolerance comparison under which NaN equals NaN, so round-tripped
//! no-data values compare equal.

use std::error;
use std::fmt;
use itertools::Itertools;
use units::Tolerance;

#[derive(Debug, Clone, PartialEq)]
pub enum GeometryError {
    InvalidParts(String),
    InvalidMeasures(String),
}

impl error::Error for GeometryError {
    fn description(&self) -> &str {
        match *self {
            GeometryError::InvalidParts(ref description) => description,
            GeometryError::InvalidMeasures(ref description) => description,
        }
    }
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            GeometryError::InvalidParts(ref description) => write!(f, "Invalid parts: {}", description),
            GeometryError::InvalidMeasures(ref description) => write!(f, "Invalid measures: {}", description),
        }
    }
}

fn close_f64(a: f64, b: f64, tolerance: Tolerance) -> bool {
    (a.is_nan() && b.is_nan()) || (a - b).abs() <= tolerance.value()
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Point(pub f64, pub f64);

impl Point {
    pub fn x(&self) -> f64 {
        self.0
    }

    pub fn y(&self) -> f64 {
        self.1
    }

    pub fn close_to(&self, other: &Point, tolerance: Tolerance) -> bool {
        close_f64(self.0, other.0, tolerance) && close_f64(self.1, other.1, tolerance)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({},{})", self.0, self.1)
    }
}

/// Min/max per measure axis. The empty range is `(+inf, -inf)`, which no
/// real measure can produce, so it is distinguishable from every actual
/// range. NaN min/max means the axis carries no data at all.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasureRange {
    pub min: f64,
    pub max: f64,
}

impl MeasureRange {
    pub fn new(min: f64, max: f64) -> MeasureRange {
        MeasureRange { min: min, max: max }
    }

    pub fn empty() -> MeasureRange {
        MeasureRange { min: ::std::f64::INFINITY, max: ::std::f64::NEG_INFINITY }
    }

    pub fn no_data() -> MeasureRange {
        MeasureRange { min: ::std::f64::NAN, max: ::std::f64::NAN }
    }

    pub fn is_empty(&self) -> bool {
        self.min == ::std::f64::INFINITY && self.max == ::std::f64::NEG_INFINITY
    }

    pub fn expand(&self, measure: f64) -> MeasureRange {
        if measure.is_nan() {
            *self
        } else {
            MeasureRange {
                min: if measure < self.min || self.min.is_nan() { measure } else { self.min },
                max: if measure > self.max || self.max.is_nan() { measure } else { self.max },
            }
        }
    }

    pub fn from_measures(measures: &[f64]) -> MeasureRange {
        measures.iter().fold(MeasureRange::empty(), |range, &m| range.expand(m))
    }

    pub fn close_to(&self, other: &MeasureRange, tolerance: Tolerance) -> bool {
        (self.is_empty() && other.is_empty())
            || (close_f64(self.min, other.min, tolerance) && close_f64(self.max, other.max, tolerance))
    }
}

impl fmt::Display for MeasureRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{},{}]", self.min, self.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox2D {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl BoundingBox2D {
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> BoundingBox2D {
        BoundingBox2D { x_min: x_min, y_min: y_min, x_max: x_max, y_max: y_max }
    }

    pub fn empty() -> BoundingBox2D {
        BoundingBox2D {
            x_min: ::std::f64::INFINITY,
            y_min: ::std::f64::INFINITY,
            x_max: ::std::f64::NEG_INFINITY,
            y_max: ::std::f64::NEG_INFINITY,
        }
    }

    pub fn expand(&self, point: &Point) -> BoundingBox2D {
        BoundingBox2D {
            x_min: if point.0 < self.x_min { point.0 } else { self.x_min },
            y_min: if point.1 < self.y_min { point.1 } else { self.y_min },
            x_max: if point.0 > self.x_max { point.0 } else { self.x_max },
            y_max: if point.1 > self.y_max { point.1 } else { self.y_max },
        }
    }

    pub fn union(&self, other: &BoundingBox2D) -> BoundingBox2D {
        BoundingBox2D {
            x_min: if other.x_min < self.x_min { other.x_min } else { self.x_min },
            y_min: if other.y_min < self.y_min { other.y_min } else { self.y_min },
            x_max: if other.x_max > self.x_max { other.x_max } else { self.x_max },
            y_max: if other.y_max > self.y_max { other.y_max } else { self.y_max },
        }
    }

    pub fn from_points(points: &[Point]) -> BoundingBox2D {
        points.iter().fold(BoundingBox2D::empty(), |bbox, point| bbox.expand(point))
    }

    pub fn close_to(&self, other: &BoundingBox2D, tolerance: Tolerance) -> bool {
        close_f64(self.x_min, other.x_min, tolerance)
            && close_f64(self.y_min, other.y_min, tolerance)
            && close_f64(self.x_max, other.x_max, tolerance)
            && close_f64(self.y_max, other.y_max, tolerance)
    }
}

impl fmt::Display for BoundingBox2D {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({},{})-({},{})", self.x_min, self.y_min, self.x_max, self.y_max)
    }
}

/// The 8-double bounding box a shapefile header stores: XY extent, Z range,
/// M range. NaN on Z or M means the file carries no data for that axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox3D {
    pub xy: BoundingBox2D,
    pub z_min: f64,
    pub z_max: f64,
    pub measure_range: MeasureRange,
}

impl BoundingBox3D {
    pub fn new(xy: BoundingBox2D, z_min: f64, z_max: f64, measure_range: MeasureRange) -> BoundingBox3D {
        BoundingBox3D { xy: xy, z_min: z_min, z_max: z_max, measure_range: measure_range }
    }

    /// A box for 2-D data: no Z, no M.
    pub fn flat(xy: BoundingBox2D) -> BoundingBox3D {
        BoundingBox3D {
            xy: xy,
            z_min: ::std::f64::NAN,
            z_max: ::std::f64::NAN,
            measure_range: MeasureRange::no_data(),
        }
    }

    pub fn close_to(&self, other: &BoundingBox3D, tolerance: Tolerance) -> bool {
        self.xy.close_to(&other.xy, tolerance)
            && close_f64(self.z_min, other.z_min, tolerance)
            && close_f64(self.z_max, other.z_max, tolerance)
            && self.measure_range.close_to(&other.measure_range, tolerance)
    }
}

/// Part starts must begin at 0, strictly increase, and stay inside the point
/// array. The shapefile format shares one point array across parts; a part
/// runs from its start index to the next part's start (or the end).
fn validate_parts(parts: &[usize], n_points: usize) -> Result<(), GeometryError> {
    if parts.is_empty() {
        return Err(GeometryError::InvalidParts(String::from("a shape needs at least one part")));
    }
    if parts[0] != 0 {
        return Err(GeometryError::InvalidParts(format!("the first part must start at point 0, got {}", parts[0])));
    }
    for (&a, &b) in parts.iter().tuple_windows() {
        if b <= a {
            return Err(GeometryError::InvalidParts(format!("part starts must strictly increase, got {} then {}", a, b)));
        }
    }
    let last = *parts.last().unwrap();
    if last >= n_points {
        return Err(GeometryError::InvalidParts(format!(
            "a part starts at point {}, but there are only {} points", last, n_points
        )));
    }
    Ok(())
}

fn close_points(a: &[Point], b: &[Point], tolerance: Tolerance) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(p, q)| p.close_to(q, tolerance))
}

/// A polygon record: ordered rings sharing one point array. Ring winding
/// (shell vs. hole) is not interpreted here.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub bounding_box: BoundingBox2D,
    pub parts: Box<[usize]>,
    pub points: Box<[Point]>,
}

impl Polygon {
    /// Builds a polygon, computing its bounding box from the points.
    pub fn new(parts: Vec<usize>, points: Vec<Point>) -> Result<Polygon, GeometryError> {
        let bounding_box = BoundingBox2D::from_points(&points);
        Polygon::with_bounding_box(bounding_box, parts, points)
    }

    /// Builds a polygon around a caller-supplied box. The decoder uses this
    /// so a file's own (possibly loose) box survives a round trip.
    pub fn with_bounding_box(bounding_box: BoundingBox2D, parts: Vec<usize>, points: Vec<Point>) -> Result<Polygon, GeometryError> {
        validate_parts(&parts, points.len())?;
        Ok(Polygon {
            bounding_box: bounding_box,
            parts: parts.into_boxed_slice(),
            points: points.into_boxed_slice(),
        })
    }

    pub fn close_to(&self, other: &Polygon, tolerance: Tolerance) -> bool {
        self.parts == other.parts
            && self.bounding_box.close_to(&other.bounding_box, tolerance)
            && close_points(&self.points, &other.points, tolerance)
    }
}

/// A measured polyline record: parts and points as `Polygon`, plus zero or
/// one measure per point. An empty measure array means the file omitted the
/// measure block entirely, which the format permits.
#[derive(Debug, Clone, PartialEq)]
pub struct PolyLineM {
    pub bounding_box: BoundingBox2D,
    pub parts: Box<[usize]>,
    pub points: Box<[Point]>,
    pub measure_range: MeasureRange,
    pub measures: Box<[f64]>,
}

impl PolyLineM {
    /// Builds a polyline, computing box and measure range from the data.
    pub fn new(parts: Vec<usize>, points: Vec<Point>, measures: Vec<f64>) -> Result<PolyLineM, GeometryError> {
        let bounding_box = BoundingBox2D::from_points(&points);
        let measure_range = MeasureRange::from_measures(&measures);
        PolyLineM::with_bounding_box(bounding_box, parts, points, measure_range, measures)
    }

    pub fn with_bounding_box(
        bounding_box: BoundingBox2D,
        parts: Vec<usize>,
        points: Vec<Point>,
        measure_range: MeasureRange,
        measures: Vec<f64>,
    ) -> Result<PolyLineM, GeometryError> {
        validate_parts(&parts, points.len())?;
        if !measures.is_empty() && measures.len() != points.len() {
            return Err(GeometryError::InvalidMeasures(format!(
                "got {} measures for {} points; need none or one per point",
                measures.len(), points.len()
            )));
        }
        Ok(PolyLineM {
            bounding_box: bounding_box,
            parts: parts.into_boxed_slice(),
            points: points.into_boxed_slice(),
            measure_range: measure_range,
            measures: measures.into_boxed_slice(),
        })
    }

    pub fn has_measures(&self) -> bool {
        !self.measures.is_empty()
    }

    pub fn close_to(&self, other: &PolyLineM, tolerance: Tolerance) -> bool {
        self.parts == other.parts
            && self.bounding_box.close_to(&other.bounding_box, tolerance)
            && close_points(&self.points, &other.points, tolerance)
            && self.measure_range.close_to(&other.measure_range, tolerance)
            && self.measures.len() == other.measures.len()
            && self.measures.iter().zip(other.measures.iter()).all(|(&a, &b)| close_f64(a, b, tolerance))
    }
}

#[cfg(test)]
mod test {
    use units::Tolerance;
    use super::*;

    fn tol(t: f64) -> Tolerance {
        Tolerance::new(t).unwrap()
    }

    #[test]
    fn point_close_to() {
        let a = Point(1., 2.);
        let b = Point(1.004, 1.996);
        assert!(a.close_to(&b, tol(0.01)));
        assert!(!a.close_to(&b, tol(0.001)));
        assert_eq!(a, a);
    }

    #[test]
    fn nan_equals_nan_under_tolerance() {
        let nan = ::std::f64::NAN;
        let a = Point(nan, 1.);
        let b = Point(nan, 1.);
        assert!(a != b); // IEEE equality
        assert!(a.close_to(&b, tol(0.)));
    }

    #[test]
    fn empty_measure_range_is_distinguishable() {
        let empty = MeasureRange::empty();
        assert!(empty.is_empty());
        assert!(!MeasureRange::new(0., 0.).is_empty());
        assert!(!MeasureRange::no_data().is_empty());
    }

    #[test]
    fn measure_range_from_measures() {
        let range = MeasureRange::from_measures(&[ 3., -1., 7. ]);
        assert_eq!(MeasureRange::new(-1., 7.), range);
        assert!(MeasureRange::from_measures(&[]).is_empty());
    }

    #[test]
    fn bounding_box_from_points() {
        let bbox = BoundingBox2D::from_points(&[ Point(1., 5.), Point(-2., 3.), Point(4., 4.) ]);
        assert_eq!(BoundingBox2D::new(-2., 3., 4., 5.), bbox);
    }

    #[test]
    fn polygon_computes_its_box() {
        let polygon = Polygon::new(
            vec![ 0 ],
            vec![ Point(0., 0.), Point(1., 0.), Point(1., 1.), Point(0., 0.) ],
        ).unwrap();
        assert_eq!(BoundingBox2D::new(0., 0., 1., 1.), polygon.bounding_box);
    }

    #[test]
    fn parts_must_start_at_zero_and_increase() {
        let points = vec![ Point(0., 0.), Point(1., 0.), Point(1., 1.), Point(0., 0.) ];
        assert!(Polygon::new(vec![], points.clone()).is_err());
        assert!(Polygon::new(vec![ 1 ], points.clone()).is_err());
        assert!(Polygon::new(vec![ 0, 2, 2 ], points.clone()).is_err());
        assert!(Polygon::new(vec![ 0, 9 ], points.clone()).is_err());
        assert!(Polygon::new(vec![ 0, 2 ], points).is_ok());
    }

    #[test]
    fn polyline_measures_must_match_points_or_be_absent() {
        let points = vec![ Point(0., 0.), Point(1., 1.) ];
        assert!(PolyLineM::new(vec![ 0 ], points.clone(), vec![]).is_ok());
        assert!(PolyLineM::new(vec![ 0 ], points.clone(), vec![ 1., 2. ]).is_ok());
        assert!(PolyLineM::new(vec![ 0 ], points, vec![ 1. ]).is_err());
    }

    #[test]
    fn polyline_measure_range_skips_nan() {
        let line = PolyLineM::new(
            vec![ 0 ],
            vec![ Point(0., 0.), Point(1., 1.), Point(2., 2.) ],
            vec![ 5., ::std::f64::NAN, 1. ],
        ).unwrap();
        assert_eq!(MeasureRange::new(1., 5.), line.measure_range);
    }
}
