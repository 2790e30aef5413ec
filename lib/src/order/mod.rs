//! Path ordering for single-layer toolpath planning.
//!
//! Orderers take a bag of closed polygons and open polylines, decide the
//! sequence in which they should be extruded and where the nozzle should
//! enter each of them, and hand the reordered list back to the layer
//! planner. The path records in this module are the stable interface between
//! the two: vertex data stays owned by the caller and is only borrowed for
//! the duration of the optimization.

pub mod monotonic;

use crate::geometry::{Point, Polygon, Polyline};
use crate::Coord;
use thiserror::Error;

/// Ordering configuration errors.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The monotonic direction angle is NaN or infinite.
    #[error("monotonic direction angle must be finite, got {0}")]
    NonFiniteDirection(f64),

    /// A distance tolerance was configured negative.
    #[error("{name} must not be negative, got {value}")]
    NegativeTolerance {
        /// Name of the offending parameter.
        name: &'static str,
        /// The configured value.
        value: Coord,
    },

    /// The spatial hash bucket size must be positive.
    #[error("grid cell size must be positive, got {0}")]
    InvalidGridCellSize(Coord),
}

/// Result type for ordering configuration.
pub type OrderResult<T> = Result<T, OrderError>;

/// One path staged for ordering: a borrowed vertex sequence plus the
/// planning metadata the orderer fills in.
///
/// After optimization, [`start_vertex`](Self::start_vertex) names the vertex
/// to begin extruding from and [`backwards`](Self::backwards) tells the
/// consumer to visit the vertices in reverse. For open paths the start is
/// always one of the two endpoints; `None` survives only on degenerate
/// single-vertex paths.
#[derive(Clone, Debug)]
pub struct PlannedPath<'a> {
    vertices: &'a [Point],
    is_closed: bool,
    start_vertex: Option<usize>,
    backwards: bool,
}

impl<'a> PlannedPath<'a> {
    /// Stage a closed polygon.
    pub fn from_polygon(polygon: &'a Polygon) -> Self {
        Self {
            vertices: polygon.points(),
            is_closed: true,
            start_vertex: None,
            backwards: false,
        }
    }

    /// Stage an open polyline.
    pub fn from_polyline(polyline: &'a Polyline) -> Self {
        Self {
            vertices: polyline.points(),
            is_closed: false,
            start_vertex: None,
            backwards: false,
        }
    }

    /// The borrowed vertex data, in its original order.
    #[inline]
    pub fn vertices(&self) -> &'a [Point] {
        self.vertices
    }

    /// Number of vertices.
    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Whether the path has no vertices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Whether the path is a closed loop (implicit last-to-first edge).
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.is_closed
    }

    /// The chosen start vertex, or `None` while unassigned.
    #[inline]
    pub fn start_vertex(&self) -> Option<usize> {
        self.start_vertex
    }

    /// Whether traversal visits the vertices in reverse.
    #[inline]
    pub fn backwards(&self) -> bool {
        self.backwards
    }

    /// First vertex in storage order, if any.
    #[inline]
    pub fn first_point(&self) -> Option<Point> {
        self.vertices.first().copied()
    }

    /// Last vertex in storage order, if any.
    #[inline]
    pub fn last_point(&self) -> Option<Point> {
        self.vertices.last().copied()
    }

    /// The point extrusion enters at, honoring start vertex and direction.
    pub fn first_traversed_point(&self) -> Option<Point> {
        self.iter_vertices().next()
    }

    /// Vertices in traversal order: starting from the chosen start vertex and
    /// honoring the reverse flag. Closed paths wrap around to cover the full
    /// loop; open paths run endpoint to endpoint.
    pub fn iter_vertices(&self) -> impl Iterator<Item = Point> + '_ {
        let n = self.vertices.len();
        let start = self.start_vertex.unwrap_or(0);
        let closed = self.is_closed;
        let backwards = self.backwards;
        (0..n).map(move |i| {
            let idx = if closed {
                (start + i) % n
            } else if backwards {
                n - 1 - i
            } else {
                i
            };
            self.vertices[idx]
        })
    }

    /// Configure the path to start printing from the best endpoint.
    ///
    /// If the start vertex is unassigned, picks whichever endpoint is closer
    /// to `current_pos` (ties go to the first vertex) and sets the reverse
    /// flag to match. An already-assigned start is left alone. Either way,
    /// `current_pos` advances to the opposite endpoint, where the nozzle will
    /// be once this path has been printed.
    ///
    /// # Panics
    ///
    /// Panics if the path has no vertices.
    pub fn optimize_closest_start_point(&mut self, current_pos: &mut Point) {
        assert!(
            !self.vertices.is_empty(),
            "cannot plan a start point on an empty path"
        );
        if self.start_vertex.is_none() {
            let dist_first = current_pos.distance_squared(&self.vertices[0]);
            let dist_last = current_pos.distance_squared(&self.vertices[self.vertices.len() - 1]);
            if dist_first <= dist_last {
                self.assign_endpoint_start(0);
            } else {
                self.assign_endpoint_start(self.vertices.len() - 1);
            }
        }
        if let Some(start) = self.start_vertex {
            // Exit at the opposite endpoint.
            *current_pos = self.vertices[self.vertices.len() - 1 - start];
        }
    }

    /// The vertex closest to the "earlier side" of a direction vector: the
    /// one with the smallest projection. Used to place the seam of closed
    /// paths at the source of the print direction.
    pub fn seam_vertex_toward(&self, direction: Point) -> Option<usize> {
        self.vertices
            .iter()
            .enumerate()
            .min_by_key(|(_, v)| v.dot(&direction))
            .map(|(i, _)| i)
    }

    /// The endpoint (vertex index) farthest from `point`.
    pub(crate) fn farthest_endpoint(&self, point: Point) -> usize {
        let front_dist = point.distance_squared(&self.vertices[0]);
        let back_dist = point.distance_squared(&self.vertices[self.vertices.len() - 1]);
        if front_dist < back_dist {
            self.vertices.len() - 1
        } else {
            0
        }
    }

    /// Set an endpoint start vertex; the reverse flag follows from it.
    pub(crate) fn assign_endpoint_start(&mut self, start: usize) {
        self.start_vertex = Some(start);
        self.backwards = start != 0;
    }

    /// Swap the start to the opposite endpoint.
    pub(crate) fn flip_endpoint_start(&mut self) {
        if let Some(start) = self.start_vertex {
            self.start_vertex = Some(self.vertices.len() - 1 - start);
            self.backwards = !self.backwards;
        }
    }

    /// Forget the start assignment.
    pub(crate) fn clear_start(&mut self) {
        self.start_vertex = None;
        self.backwards = false;
    }

    /// Fix the seam of a closed path. Closed paths are never traversed in
    /// reverse.
    pub(crate) fn set_seam(&mut self, start: usize) {
        self.start_vertex = Some(start);
        self.backwards = false;
    }

    pub(crate) fn set_closed(&mut self) {
        self.is_closed = true;
    }
}

/// Reclassify polylines that loop back on themselves as closed paths.
///
/// Upstream stages sometimes hand over a loop as an open polyline whose two
/// endpoints coincide. Treating it as closed keeps it out of the open-path
/// ordering, which is meant for genuine lines.
pub fn detect_loops(paths: &mut [PlannedPath<'_>], coincident_point_distance: Coord) {
    let tolerance2 = (coincident_point_distance as i128) * (coincident_point_distance as i128);
    for path in paths {
        if path.is_closed() || path.len() < 3 {
            continue;
        }
        let first = path.vertices()[0];
        let last = path.vertices()[path.len() - 1];
        if first.distance_squared(&last) < tolerance2 {
            path.set_closed();
        }
    }
}
