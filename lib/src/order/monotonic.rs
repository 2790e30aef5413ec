//! Monotonic path ordering.
//!
//! Prints a layer's open lines in one major direction: lines that lie in the
//! same band perpendicular to that direction are extruded strictly in order
//! along it, so adjacent extrusions always land against an already-printed
//! neighbour from the same side. That keeps top surfaces visually uniform
//! and mechanically consistent.
//!
//! To use, create a [`MonotonicOrder`] with a direction angle, an adjacency
//! tolerance and the nozzle's current position, stage paths with
//! [`add_polygon`](MonotonicOrder::add_polygon) and
//! [`add_polyline`](MonotonicOrder::add_polyline), call
//! [`optimize`](MonotonicOrder::optimize), then print the paths in the order
//! of [`paths`](MonotonicOrder::paths).
//!
//! Closed paths are not ordered monotonically; they are emitted first, with
//! their seam placed at the vertex nearest the source of the direction
//! vector.

use std::collections::VecDeque;

use log::debug;
use serde::{Deserialize, Serialize};

use super::{detect_loops, OrderResult, PlannedPath};
use crate::geometry::{Point, Polygon, Polyline};
use crate::grid::SparsePointGrid;
use crate::order::OrderError;
use crate::{scale, Coord, CoordF};

/// Length of the stored direction vector.
///
/// Long enough that rounding the unit direction to integer coordinates
/// cannot skew the ordering, short enough that projecting build-volume
/// coordinates onto the vector stays far from the 64-bit limits.
pub const MONOTONIC_VECTOR_RESOLUTION: Coord = 1000;

/// Configuration for monotonic ordering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonotonicConfig {
    /// Direction angle in radians. The stored direction vector for an angle
    /// θ is `(-cos θ, sin θ)` scaled to [`MONOTONIC_VECTOR_RESOLUTION`]; the
    /// negated x keeps the progression aligned with how the line infill
    /// generator interprets the same angle.
    pub direction: CoordF,

    /// Maximum distance (scaled units) at which lines count as adjacent.
    /// The monotonicity constraint only binds lines closer than this.
    pub max_adjacent_distance: Coord,

    /// Two endpoints closer than this (scaled units) are the same junction;
    /// polylines meeting at one are printed as a single string.
    pub coincident_point_distance: Coord,

    /// Bucket side of the endpoint lookup grid (scaled units).
    pub grid_cell_size: Coord,
}

impl Default for MonotonicConfig {
    fn default() -> Self {
        Self {
            direction: 0.0,
            max_adjacent_distance: 400, // about one line width
            coincident_point_distance: 10,
            grid_cell_size: scale(2.0),
        }
    }
}

impl MonotonicConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the direction angle (radians).
    pub fn with_direction(mut self, direction: CoordF) -> Self {
        self.direction = direction;
        self
    }

    /// Set the adjacency distance (scaled units).
    pub fn with_max_adjacent_distance(mut self, distance: Coord) -> Self {
        self.max_adjacent_distance = distance;
        self
    }

    /// Set the endpoint coincidence distance (scaled units).
    pub fn with_coincident_point_distance(mut self, distance: Coord) -> Self {
        self.coincident_point_distance = distance;
        self
    }

    /// Set the lookup grid bucket size (scaled units).
    pub fn with_grid_cell_size(mut self, cell_size: Coord) -> Self {
        self.grid_cell_size = cell_size;
        self
    }

    /// Check the configuration for values the orderer cannot work with.
    pub fn validate(&self) -> OrderResult<()> {
        if !self.direction.is_finite() {
            return Err(OrderError::NonFiniteDirection(self.direction));
        }
        if self.max_adjacent_distance < 0 {
            return Err(OrderError::NegativeTolerance {
                name: "max_adjacent_distance",
                value: self.max_adjacent_distance,
            });
        }
        if self.coincident_point_distance < 0 {
            return Err(OrderError::NegativeTolerance {
                name: "coincident_point_distance",
                value: self.coincident_point_distance,
            });
        }
        if self.grid_cell_size <= 0 {
            return Err(OrderError::InvalidGridCellSize(self.grid_cell_size));
        }
        Ok(())
    }
}

/// Orders paths so that adjacent lines are printed monotonically along a
/// direction vector.
///
/// The orderer owns its path records for the duration of
/// [`optimize`](Self::optimize); vertex data stays borrowed from the caller.
/// One instance handles one `(direction, tolerance, start point)` tuple -
/// independent instances are free to run on separate threads.
pub struct MonotonicOrder<'a> {
    paths: Vec<PlannedPath<'a>>,
    monotonic_vector: Point,
    max_adjacent_distance: Coord,
    coincident_point_distance: Coord,
    grid_cell_size: Coord,
    start_point: Point,
}

impl<'a> MonotonicOrder<'a> {
    /// Create an orderer for a direction angle (radians), an adjacency
    /// distance (scaled units) and the nozzle's current position.
    pub fn new(direction: CoordF, max_adjacent_distance: Coord, start_point: Point) -> Self {
        let config = MonotonicConfig::default()
            .with_direction(direction)
            .with_max_adjacent_distance(max_adjacent_distance);
        Self::from_config(config, start_point)
    }

    /// Create an orderer from a full configuration, validating it first.
    pub fn with_config(config: MonotonicConfig, start_point: Point) -> OrderResult<Self> {
        config.validate()?;
        Ok(Self::from_config(config, start_point))
    }

    fn from_config(config: MonotonicConfig, start_point: Point) -> Self {
        Self {
            paths: Vec::new(),
            monotonic_vector: direction_vector(config.direction),
            max_adjacent_distance: config.max_adjacent_distance,
            coincident_point_distance: config.coincident_point_distance,
            grid_cell_size: config.grid_cell_size,
            start_point,
        }
    }

    /// Stage a closed polygon.
    pub fn add_polygon(&mut self, polygon: &'a Polygon) {
        self.paths.push(PlannedPath::from_polygon(polygon));
    }

    /// Stage an open polyline.
    pub fn add_polyline(&mut self, polyline: &'a Polyline) {
        self.paths.push(PlannedPath::from_polyline(polyline));
    }

    /// The staged paths; after [`optimize`](Self::optimize), in print order.
    pub fn paths(&self) -> &[PlannedPath<'a>] {
        &self.paths
    }

    /// Consume the orderer and return the path list.
    pub fn into_paths(self) -> Vec<PlannedPath<'a>> {
        self.paths
    }

    /// Number of staged paths.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether no paths are staged.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Reorder the staged paths monotonically and pick per-path start
    /// vertices and directions.
    ///
    /// Closed paths (including open inputs that loop back onto themselves)
    /// come first, unordered, with their seam set toward the source of the
    /// direction vector. Open paths follow, grouped into runs that are
    /// visited in order of their earliest projection onto the direction
    /// vector.
    pub fn optimize(&mut self) {
        if self.paths.is_empty() {
            return;
        }

        let mut paths = std::mem::take(&mut self.paths);
        detect_loops(&mut paths, self.coincident_point_distance);

        // Closed and degenerate paths go first, untouched apart from the
        // seam. The rest are the lines to order.
        let mut reordered = Vec::with_capacity(paths.len());
        let mut open: Vec<PlannedPath<'a>> = Vec::new();
        for mut path in paths {
            if path.is_closed() || path.len() <= 1 {
                if path.is_closed() && path.start_vertex().is_none() {
                    if let Some(seam) = path.seam_vertex_toward(self.monotonic_vector) {
                        path.set_seam(seam);
                    }
                }
                reordered.push(path);
            } else {
                path.clear_start();
                open.push(path);
            }
        }

        // Sort by the projection of the earlier endpoint. Stable, so
        // co-projected paths keep their staging order, and adjacency scans
        // only ever have to look forward.
        open.sort_by_key(|p| projected_span(p, &self.monotonic_vector).0);

        let mut grid = SparsePointGrid::new(self.grid_cell_size);
        for (handle, path) in open.iter().enumerate() {
            grid.insert(path.vertices()[0], handle);
            grid.insert(path.vertices()[path.len() - 1], handle);
        }

        // Build the precedence relation over the sorted handles:
        //  - `connections` chains each line to the one printed right after
        //    it, when that successor is unique;
        //  - `starting` marks the lines an emission run may begin at;
        //  - `connected` marks lines some other line already chains into.
        let n = open.len();
        let perpendicular = self.monotonic_vector.rotate_90_ccw();
        let mut connections: Vec<Option<usize>> = vec![None; n];
        let mut starting = vec![false; n];
        let mut connected = vec![false; n];

        for handle in 0..n {
            if connections[handle].is_some() {
                // Already chained into a polyline string.
                continue;
            }

            let string = self.find_polyline_string(handle, &grid, &mut open);
            if string.len() > 1 {
                starting[string[0]] = true;
                for i in 0..string.len() - 1 {
                    let link = string[i];
                    let next = string[i + 1];
                    connections[link] = Some(next);
                    connected[next] = true;

                    // A string can interweave with loose lines or other
                    // strings. Wherever it touches one, the touched line and
                    // the remainder of the string both become starting
                    // points, so the contact works as a junction that keeps
                    // the monotonic order intact.
                    for overlap in self.overlapping_lines(link, perpendicular, &open) {
                        if !string.contains(&overlap) {
                            starting[overlap] = true;
                            starting[next] = true;
                        }
                    }
                }
            } else {
                if !connected[handle] {
                    starting[handle] = true;
                }
                let overlapping = self.overlapping_lines(handle, perpendicular, &open);
                if overlapping.len() == 1 {
                    let next = overlapping[0];
                    connections[handle] = Some(next);
                    if connected[next] {
                        // A second line chains into it; it has to stay
                        // reachable as a run of its own.
                        starting[next] = true;
                    } else {
                        connected[next] = true;
                    }
                } else {
                    // Zero or several successors; each fans out into a run
                    // of its own.
                    for overlap in overlapping {
                        starting[overlap] = true;
                    }
                }
            }
        }

        debug!(
            "monotonic order: {} closed or degenerate, {} lines, {} starting lines",
            reordered.len(),
            n,
            starting.iter().filter(|s| **s).count()
        );

        let emission = emit_in_monotonic_order(
            &mut open,
            &connections,
            &starting,
            self.monotonic_vector,
            self.start_point,
        );
        for handle in emission {
            reordered.push(open[handle].clone());
        }

        self.paths = reordered;
    }

    /// Collect the string of polylines `seed` belongs to, in print order.
    ///
    /// Walks the endpoint grid off both ends of the seed, claiming each
    /// extension by assigning its start vertex so traversal keeps running
    /// outward. The string is oriented so its monotonically earlier extreme
    /// prints first. A seed with no neighbours comes back as a singleton
    /// with its start assignment cleared again.
    fn find_polyline_string(
        &self,
        seed: usize,
        grid: &SparsePointGrid<usize>,
        open: &mut [PlannedPath<'a>],
    ) -> VecDeque<usize> {
        let mut string = VecDeque::new();
        if open[seed].is_empty() {
            return string;
        }
        string.push_back(seed);
        open[seed].assign_endpoint_start(0);

        let radius = self.coincident_point_distance;
        let coincident2 = (radius as i128) * (radius as i128);

        // Walk off the front of the string.
        let mut first_endpoint = open[seed].vertices()[0];
        loop {
            let found = grid.find_nearby(&first_endpoint, radius, |record| {
                open[record.value].start_vertex().is_none()
                    && record.point.distance_squared(&first_endpoint) < coincident2
            });
            let Some(record) = found else { break };
            let extension = record.value;
            string.push_front(extension);
            // Start from the far side, so the extension prints toward the
            // junction and on into the rest of the string.
            let far = open[extension].farthest_endpoint(record.point);
            open[extension].assign_endpoint_start(far);
            first_endpoint = open[extension].vertices()[far];
        }

        // And off the back.
        let mut last_endpoint = open[seed].vertices()[open[seed].len() - 1];
        loop {
            let found = grid.find_nearby(&last_endpoint, radius, |record| {
                open[record.value].start_vertex().is_none()
                    && record.point.distance_squared(&last_endpoint) < coincident2
            });
            let Some(record) = found else { break };
            let extension = record.value;
            string.push_back(extension);
            // Enter on the joining side, run out to the far side.
            let far = open[extension].farthest_endpoint(record.point);
            let near = open[extension].len() - 1 - far;
            open[extension].assign_endpoint_start(near);
            last_endpoint = open[extension].vertices()[far];
        }

        let first_projection = first_endpoint.dot(&self.monotonic_vector);
        let last_projection = last_endpoint.dot(&self.monotonic_vector);
        if last_projection < first_projection {
            string.make_contiguous().reverse();
            for &member in &string {
                open[member].flip_endpoint_start();
            }
        }

        if string.len() == 1 {
            // Not a string after all; the start point is chosen at emission.
            open[seed].clear_start();
        }
        string
    }

    /// Every line after `handle` in the sorted list that must be printed
    /// after it under the monotonic constraint.
    ///
    /// A candidate qualifies when its span along the direction vector comes
    /// within the adjacency distance of ours and its span across it overlaps
    /// ours. The scan stops at the first candidate too far along the
    /// direction: the sort guarantees everything later is at least as far.
    fn overlapping_lines(
        &self,
        handle: usize,
        perpendicular: Point,
        open: &[PlannedPath<'a>],
    ) -> Vec<usize> {
        // Projections carry the direction vector's length as a factor, so
        // the tolerance has to as well.
        let padding = (self.max_adjacent_distance as i128) * (MONOTONIC_VECTOR_RESOLUTION as i128);

        let (monotonic_lo, monotonic_hi) = projected_span(&open[handle], &self.monotonic_vector);
        let monotonic_lo = monotonic_lo - padding;
        let monotonic_hi = monotonic_hi + padding;
        let (perp_lo, perp_hi) = projected_span(&open[handle], &perpendicular);
        let perp_lo = perp_lo - padding;
        let perp_hi = perp_hi + padding;

        let mut overlapping = Vec::new();
        for candidate in handle + 1..open.len() {
            let (their_lo, their_hi) = projected_span(&open[candidate], &self.monotonic_vector);
            if their_lo > monotonic_hi || monotonic_lo > their_hi {
                break;
            }

            let (their_perp_lo, their_perp_hi) = projected_span(&open[candidate], &perpendicular);
            // Overlap if either of our padded extremes lands inside their
            // span, or their span sits entirely within our padded one.
            if (perp_lo >= their_perp_lo && perp_lo <= their_perp_hi)
                || (perp_hi >= their_perp_lo && perp_hi <= their_perp_hi)
                || (their_perp_lo >= perp_lo && their_perp_hi <= perp_hi)
            {
                overlapping.push(candidate);
            }
        }
        overlapping
    }
}

/// The integer direction vector for an angle, scaled to
/// [`MONOTONIC_VECTOR_RESOLUTION`].
fn direction_vector(direction: CoordF) -> Point {
    let resolution = MONOTONIC_VECTOR_RESOLUTION as CoordF;
    Point::new(
        (-direction.cos() * resolution).round() as Coord,
        (direction.sin() * resolution).round() as Coord,
    )
}

/// Projections of a path's two endpoints onto `direction`, as `(min, max)`.
fn projected_span(path: &PlannedPath<'_>, direction: &Point) -> (i128, i128) {
    let front = path.vertices()[0].dot(direction);
    let back = path.vertices()[path.len() - 1].dot(direction);
    (front.min(back), front.max(back))
}

/// Emit every line, one monotonic run at a time.
///
/// Starting lines are visited by `(earliest projection, other endpoint's
/// projection)`; from each, the run follows `connections` until it ends,
/// reaches another starting line, or would revisit a line. The emitted flags
/// double as the cycle guard: the relation is built locally and nothing
/// forbids a cycle, but no line is ever emitted twice. Lines reachable from
/// no starting line (a cycle with no way in) are swept up at the end in
/// sorted order, so the result is always a permutation of the input.
fn emit_in_monotonic_order(
    open: &mut [PlannedPath<'_>],
    connections: &[Option<usize>],
    starting: &[bool],
    monotonic_vector: Point,
    start_point: Point,
) -> Vec<usize> {
    let n = open.len();
    let mut starting_handles: Vec<usize> = (0..n).filter(|&h| starting[h]).collect();
    starting_handles.sort_by_key(|&h| projected_span(&open[h], &monotonic_vector));

    let mut current_pos = start_point;
    let mut emitted = vec![false; n];
    let mut emission = Vec::with_capacity(n);

    for &start_handle in &starting_handles {
        if emitted[start_handle] {
            continue;
        }
        emitted[start_handle] = true;
        open[start_handle].optimize_closest_start_point(&mut current_pos);
        emission.push(start_handle);

        let mut line = start_handle;
        while let Some(next) = connections[line] {
            if starting[next] || emitted[next] {
                break;
            }
            emitted[next] = true;
            open[next].optimize_closest_start_point(&mut current_pos);
            emission.push(next);
            line = next;
        }
    }

    for handle in 0..n {
        if !emitted[handle] {
            open[handle].optimize_closest_start_point(&mut current_pos);
            emission.push(handle);
        }
    }

    emission
}
