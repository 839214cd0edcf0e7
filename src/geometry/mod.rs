//! Geometric primitives for network assets.
//!
//! This module turns raw KML coordinate text into typed coordinates and
//! provides the point-in-ring test used by spatial assignment.
//!
//! KML writes tuples as `longitude,latitude[,altitude]`. Every [`Coordinate`]
//! produced here is stored latitude-first.

/// A geographic position, latitude first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub lon: f64,
}

impl Coordinate {
    /// Create a new coordinate.
    ///
    /// # Examples
    ///
    /// ```
    /// use kmz_oxide::geometry::Coordinate;
    ///
    /// let c = Coordinate::new(-6.2, 106.8);
    /// assert_eq!(c.lat, -6.2);
    /// assert_eq!(c.lon, 106.8);
    /// ```
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Parse a single KML coordinate tuple (`lon,lat[,alt]`).
///
/// Returns `None` when the text has fewer than two comma-separated tokens or
/// when either of the first two tokens is not a finite number. An altitude
/// token is ignored.
///
/// # Examples
///
/// ```
/// use kmz_oxide::geometry::parse_point;
///
/// let c = parse_point("106.8272,-6.1754,0").unwrap();
/// assert_eq!(c.lat, -6.1754);
/// assert_eq!(c.lon, 106.8272);
///
/// assert!(parse_point("106.8272").is_none());
/// ```
pub fn parse_point(text: &str) -> Option<Coordinate> {
    let mut tokens = text.trim().split(',');
    let lon = tokens.next()?;
    let lat = tokens.next()?;
    Some(Coordinate::new(parse_number(lat)?, parse_number(lon)?))
}

/// Parse a whitespace-separated list of KML tuples into ring vertices.
///
/// Malformed tuples are dropped; the result may be shorter than the input
/// (or empty) but parsing never fails.
pub fn parse_ring(text: &str) -> Vec<Coordinate> {
    let mut vertices = Vec::new();
    for tuple in text.split_whitespace() {
        match parse_point(tuple) {
            Some(c) => vertices.push(c),
            None => log::debug!("Dropping malformed ring vertex '{}'", tuple),
        }
    }
    vertices
}

fn parse_number(token: &str) -> Option<f64> {
    token.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// A closed boundary ring.
///
/// The closing vertex may or may not repeat the first one; the crossing test
/// treats the last vertex as connected to the first either way.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ring<'a> {
    vertices: &'a [Coordinate],
}

impl<'a> Ring<'a> {
    /// Minimum vertex count for a ring to enclose anything.
    pub const MIN_VERTICES: usize = 3;

    /// Wrap a vertex slice as a ring.
    pub fn new(vertices: &'a [Coordinate]) -> Self {
        Self { vertices }
    }

    /// Whether the ring has too few vertices to contain any point.
    pub fn is_degenerate(&self) -> bool {
        self.vertices.len() < Self::MIN_VERTICES
    }

    /// Ray-casting point-in-ring test.
    ///
    /// Casts a horizontal ray from the point towards increasing longitude and
    /// counts edge crossings. An edge counts when exactly one endpoint lies
    /// strictly above the point's latitude and the crossing lies strictly to
    /// the right of the point (half-open rule), so shared vertices and
    /// horizontal edges are counted at most once. Degenerate rings contain
    /// nothing.
    ///
    /// # Examples
    ///
    /// ```
    /// use kmz_oxide::geometry::{Coordinate, Ring};
    ///
    /// let square = [
    ///     Coordinate::new(0.0, 0.0),
    ///     Coordinate::new(0.0, 2.0),
    ///     Coordinate::new(2.0, 2.0),
    ///     Coordinate::new(2.0, 0.0),
    /// ];
    /// let ring = Ring::new(&square);
    /// assert!(ring.contains(&Coordinate::new(1.0, 1.0)));
    /// assert!(!ring.contains(&Coordinate::new(3.0, 1.0)));
    /// ```
    pub fn contains(&self, point: &Coordinate) -> bool {
        if self.is_degenerate() {
            return false;
        }

        let x = point.lon;
        let y = point.lat;
        let mut inside = false;

        let mut j = self.vertices.len() - 1;
        for i in 0..self.vertices.len() {
            let (xi, yi) = (self.vertices[i].lon, self.vertices[i].lat);
            let (xj, yj) = (self.vertices[j].lon, self.vertices[j].lat);

            if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
                inside = !inside;
            }
            j = i;
        }

        inside
    }
}
