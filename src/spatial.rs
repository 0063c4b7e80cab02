//! Immutable point and rectangle value types used by the vessel index.
//!
//! Coordinates are plain WGS84 degrees. A [`Point`] is modeled everywhere
//! else in this crate as a zero-area [`Rectangle`] (`min == max`), so the
//! R*-tree only ever has to reason about one geometry type.

/// A geographic point. `lat` is constrained to `[-90, 90]`, `lon` to
/// `(-180, 180]`; both are validated at the edges that accept raw
/// coordinates (vessel store, HTTP query parsing), not here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub lat: f64,
    pub lon: f64,
}

impl Point {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && self.lon > -180.0
            && self.lon <= 180.0
    }

    /// This point as a zero-area rectangle, the representation the R*-tree
    /// actually stores.
    pub fn as_rectangle(&self) -> Rectangle {
        Rectangle {
            min: *self,
            max: *self,
        }
    }
}

/// An axis-aligned bounding box. `min.lat <= max.lat` and
/// `min.lon <= max.lon` always hold for a valid rectangle; callers that
/// build rectangles from longitudes spanning the antimeridian must first
/// split them with [`split_antimeridian`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    pub min: Point,
    pub max: Point,
}

impl Rectangle {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_valid() && self.max.is_valid() && self.min.lat <= self.max.lat && self.min.lon <= self.max.lon
    }

    pub fn width(&self) -> f64 {
        self.max.lon - self.min.lon
    }

    pub fn height(&self) -> f64 {
        self.max.lat - self.min.lat
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Sum of the rectangle's two edge lengths (half the perimeter). This
    /// is the quantity R*-tree split/reinsert heuristics call "margin".
    pub fn margin(&self) -> f64 {
        self.width() + self.height()
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.min.lat + self.height() / 2.0,
            self.min.lon + self.width() / 2.0,
        )
    }

    /// Smallest rectangle containing both `self` and `other`.
    pub fn union(&self, other: &Rectangle) -> Rectangle {
        Rectangle {
            min: Point::new(self.min.lat.min(other.min.lat), self.min.lon.min(other.min.lon)),
            max: Point::new(self.max.lat.max(other.max.lat), self.max.lon.max(other.max.lon)),
        }
    }

    /// Union of an arbitrary non-empty slice of rectangles.
    pub fn union_all<'a>(rects: impl IntoIterator<Item = &'a Rectangle>) -> Option<Rectangle> {
        rects.into_iter().copied().reduce(|a, b| a.union(&b))
    }

    /// Area of the union minus the area of `self`; how much enlarging
    /// `self` to cover `other` would cost.
    pub fn enlargement(&self, other: &Rectangle) -> f64 {
        self.union(other).area() - self.area()
    }

    pub fn contains(&self, other: &Rectangle) -> bool {
        self.min.lat <= other.min.lat
            && self.min.lon <= other.min.lon
            && self.max.lat >= other.max.lat
            && self.max.lon >= other.max.lon
    }

    pub fn contains_point(&self, p: &Point) -> bool {
        self.min.lat <= p.lat && p.lat <= self.max.lat && self.min.lon <= p.lon && p.lon <= self.max.lon
    }

    /// Whether the two rectangles share any area (or, for zero-area
    /// rectangles/points, any boundary).
    pub fn overlaps(&self, other: &Rectangle) -> bool {
        self.min.lat <= other.max.lat
            && self.max.lat >= other.min.lat
            && self.min.lon <= other.max.lon
            && self.max.lon >= other.min.lon
    }

    /// Area of intersection with `other`, or `0.0` if they don't overlap.
    pub fn overlap_area(&self, other: &Rectangle) -> f64 {
        if !self.overlaps(other) {
            return 0.0;
        }
        let lat = (self.max.lat.min(other.max.lat) - self.min.lat.max(other.min.lat)).max(0.0);
        let lon = (self.max.lon.min(other.max.lon) - self.min.lon.max(other.min.lon)).max(0.0);
        lat * lon
    }
}

/// Normalizes a raw longitude into `(-180, 180]`.
pub fn normalize_longitude(lon: f64) -> f64 {
    let mut l = lon % 360.0;
    if l <= -180.0 {
        l += 360.0;
    } else if l > 180.0 {
        l -= 360.0;
    }
    l
}

/// Splits a bounding box query that crosses the antimeridian (`west > east`
/// once both are normalized into `(-180, 180]`) into one or two rectangles
/// that each stay on one side of the date line. A non-crossing box is
/// returned unchanged as a single-element vector.
pub fn split_antimeridian(sw: Point, ne: Point) -> Vec<Rectangle> {
    let west = normalize_longitude(sw.lon);
    let east = normalize_longitude(ne.lon);
    if west <= east {
        vec![Rectangle::new(Point::new(sw.lat, west), Point::new(ne.lat, east))]
    } else {
        vec![
            Rectangle::new(Point::new(sw.lat, west), Point::new(ne.lat, 180.0)),
            Rectangle::new(Point::new(sw.lat, -180.0), Point::new(ne.lat, east)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_validity() {
        assert!(Point::new(0.0, 0.0).is_valid());
        assert!(Point::new(90.0, 180.0).is_valid());
        assert!(!Point::new(91.0, 0.0).is_valid());
        assert!(!Point::new(0.0, -180.0).is_valid());
        assert!(!Point::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn rectangle_union_and_area() {
        let a = Rectangle::new(Point::new(0.0, 0.0), Point::new(1.0, 1.0));
        let b = Rectangle::new(Point::new(2.0, 2.0), Point::new(3.0, 3.0));
        let u = a.union(&b);
        assert_eq!(u.min, Point::new(0.0, 0.0));
        assert_eq!(u.max, Point::new(3.0, 3.0));
        assert_eq!(a.area(), 1.0);
        assert_eq!(u.area(), 9.0);
    }

    #[test]
    fn rectangle_overlap() {
        let a = Rectangle::new(Point::new(0.0, 0.0), Point::new(2.0, 2.0));
        let b = Rectangle::new(Point::new(1.0, 1.0), Point::new(3.0, 3.0));
        let c = Rectangle::new(Point::new(5.0, 5.0), Point::new(6.0, 6.0));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert_eq!(a.overlap_area(&b), 1.0);
    }

    #[test]
    fn point_as_zero_area_rectangle() {
        let p = Point::new(10.0, 20.0);
        let r = p.as_rectangle();
        assert_eq!(r.area(), 0.0);
        assert!(r.contains_point(&p));
    }

    #[test]
    fn longitude_normalization() {
        assert_eq!(normalize_longitude(180.0), 180.0);
        assert_eq!(normalize_longitude(-180.0), 180.0);
        assert_eq!(normalize_longitude(190.0), -170.0);
        assert_eq!(normalize_longitude(-190.0), 170.0);
    }

    #[test]
    fn antimeridian_split_noncrossing() {
        let rects = split_antimeridian(Point::new(-10.0, 10.0), Point::new(10.0, 20.0));
        assert_eq!(rects.len(), 1);
    }

    #[test]
    fn antimeridian_split_crossing() {
        let rects = split_antimeridian(Point::new(-10.0, 170.0), Point::new(10.0, -170.0));
        assert_eq!(rects.len(), 2);
        assert_eq!(rects[0].max.lon, 180.0);
        assert_eq!(rects[1].min.lon, -180.0);
    }
}
