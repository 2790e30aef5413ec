//! Toolpath ordering for fused-filament layer planning.
//!
//! This crate decides the order in which the printable paths of a single
//! layer are extruded, and where the nozzle enters each path. The main entry
//! point is [`MonotonicOrder`], which prints adjacent lines in the same major
//! direction so that they layer onto each other consistently and the finished
//! surface looks uniform.
//!
//! Coordinates are scaled integers (see [`Coord`] and [`SCALING_FACTOR`]), so
//! every geometric predicate used by the ordering is exact integer arithmetic
//! and the result is deterministic across platforms.
//!
//! # Example
//!
//! ```
//! use pathorder::{MonotonicOrder, Point, Polyline};
//!
//! let a = Polyline::from_points(vec![Point::new(0, 0), Point::new(1000, 0)]);
//! let b = Polyline::from_points(vec![Point::new(0, 200), Point::new(1000, 200)]);
//!
//! let mut order = MonotonicOrder::new(std::f64::consts::PI, 500, Point::zero());
//! order.add_polyline(&a);
//! order.add_polyline(&b);
//! order.optimize();
//!
//! for path in order.paths() {
//!     let _entry = path.first_traversed_point();
//! }
//! ```

pub mod geometry;
pub mod grid;
pub mod order;

/// Scaled integer coordinate type. 1 unit = 1 micrometre.
pub type Coord = i64;

/// Unscaled floating-point coordinate type, in millimetres.
pub type CoordF = f64;

/// Number of scaled units per millimetre.
pub const SCALING_FACTOR: CoordF = 1000.0;

/// Convert millimetres to scaled units.
#[inline]
pub fn scale(v: CoordF) -> Coord {
    (v * SCALING_FACTOR).round() as Coord
}

/// Convert scaled units to millimetres.
#[inline]
pub fn unscale(v: Coord) -> CoordF {
    v as CoordF / SCALING_FACTOR
}

pub use geometry::{Point, Polygon, Polyline};
pub use grid::{GridPoint, SparsePointGrid};
pub use order::monotonic::{MonotonicConfig, MonotonicOrder, MONOTONIC_VECTOR_RESOLUTION};
pub use order::{OrderError, OrderResult, PlannedPath};
