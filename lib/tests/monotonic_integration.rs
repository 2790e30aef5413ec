//! End-to-end tests for monotonic path ordering.
//!
//! These tests drive the public API the way a layer planner would: stage
//! polygons and polylines, optimize, then read back the reordered list with
//! its start vertices and directions.

use std::f64::consts::{FRAC_PI_2, PI};

use pathorder::{MonotonicOrder, Point, Polygon, Polyline};

fn segment(ax: i64, ay: i64, bx: i64, by: i64) -> Polyline {
    Polyline::from_points(vec![Point::new(ax, ay), Point::new(bx, by)])
}

fn square(x: i64, y: i64, side: i64) -> Polygon {
    Polygon::from_points(vec![
        Point::new(x, y),
        Point::new(x + side, y),
        Point::new(x + side, y + side),
        Point::new(x, y + side),
    ])
}

/// With an angle of pi the direction vector is (+1000, 0): ordering
/// progresses in +x.
const ALONG_X: f64 = PI;

/// Two adjacent parallel lines must print in monotonic order, the second
/// continuing from wherever the first left the nozzle.
#[test]
fn test_adjacent_lines_print_in_order() {
    let a = segment(0, 0, 1000, 0);
    let b = segment(0, 200, 1000, 200);

    let mut order = MonotonicOrder::new(ALONG_X, 500, Point::zero());
    order.add_polyline(&a);
    order.add_polyline(&b);
    order.optimize();

    let paths = order.paths();
    assert_eq!(paths.len(), 2);
    // Staging order is kept for co-projected lines (stable sort).
    assert_eq!(paths[0].vertices(), a.points());
    assert_eq!(paths[1].vertices(), b.points());

    assert_eq!(paths[0].start_vertex(), Some(0));
    assert!(!paths[0].backwards());
    // The first line exits at (1000, 0), so the second enters at its near
    // endpoint and prints back.
    assert_eq!(paths[1].start_vertex(), Some(1));
    assert!(paths[1].backwards());
}

/// Lines adjacent across the direction vector order along it.
#[test]
fn test_ordering_along_rotated_direction() {
    let far = segment(0, 200, 1000, 200);
    let near = segment(0, 0, 1000, 0);

    // Direction vector (0, +1000): progression in +y, staged far line first.
    let mut order = MonotonicOrder::new(FRAC_PI_2, 500, Point::zero());
    order.add_polyline(&far);
    order.add_polyline(&near);
    order.optimize();

    let paths = order.paths();
    assert_eq!(paths[0].vertices(), near.points());
    assert_eq!(paths[1].vertices(), far.points());
}

/// Two polylines with coincident endpoints form a string and print as one
/// continuous sequence.
#[test]
fn test_coincident_polylines_form_string() {
    let a = segment(0, 0, 500, 0);
    let b = segment(500, 0, 1000, 0);

    let mut order = MonotonicOrder::new(ALONG_X, 500, Point::zero());
    order.add_polyline(&a);
    order.add_polyline(&b);
    order.optimize();

    let paths = order.paths();
    assert_eq!(paths.len(), 2);
    assert_eq!(paths[0].vertices(), a.points());
    assert_eq!(paths[1].vertices(), b.points());
    assert_eq!(paths[0].start_vertex(), Some(0));
    assert_eq!(paths[1].start_vertex(), Some(0));
    assert!(!paths[0].backwards());
    assert!(!paths[1].backwards());
}

/// The string orientation follows the projection, not the staging order.
#[test]
fn test_string_orientation_independent_of_staging_order() {
    let a = segment(0, 0, 500, 0);
    let b = segment(500, 0, 1000, 0);

    let mut order = MonotonicOrder::new(ALONG_X, 500, Point::zero());
    order.add_polyline(&b);
    order.add_polyline(&a);
    order.optimize();

    let paths = order.paths();
    assert_eq!(paths[0].vertices(), a.points());
    assert_eq!(paths[1].vertices(), b.points());
    assert_eq!(paths[0].first_traversed_point(), Some(Point::new(0, 0)));
    assert_eq!(paths[1].first_traversed_point(), Some(Point::new(500, 0)));
}

/// A string that meets a fan of lines at a junction: the branches become
/// starting lines of their own and are visited in monotonic order.
#[test]
fn test_fan_junction_restarts_at_hub() {
    let stem = segment(0, 0, 500, 0);
    let up = segment(500, 0, 500, 500);
    let down = segment(500, 0, 500, -500);

    let mut order = MonotonicOrder::new(ALONG_X, 500, Point::zero());
    order.add_polyline(&stem);
    order.add_polyline(&up);
    order.add_polyline(&down);
    order.optimize();

    let paths = order.paths();
    assert_eq!(paths.len(), 3);
    assert_eq!(paths[0].vertices(), stem.points());
    // The branches project equally; staging order breaks the tie.
    assert_eq!(paths[1].vertices(), up.points());
    assert_eq!(paths[2].vertices(), down.points());
}

/// Closed paths are emitted before any open path, unordered, with the seam
/// toward the source of the direction vector.
#[test]
fn test_closed_paths_first() {
    let a = segment(0, 0, 1000, 0);
    let b = segment(0, 200, 1000, 200);
    let loop_a = square(2000, 0, 1000);
    let loop_b = square(4000, 0, 1000);

    let mut order = MonotonicOrder::new(ALONG_X, 500, Point::zero());
    order.add_polyline(&a);
    order.add_polygon(&loop_a);
    order.add_polyline(&b);
    order.add_polygon(&loop_b);
    order.optimize();

    let paths = order.paths();
    assert_eq!(paths.len(), 4);
    assert!(paths[0].is_closed());
    assert!(paths[1].is_closed());
    assert!(!paths[2].is_closed());
    assert!(!paths[3].is_closed());

    // Seam at the vertex that projects earliest along +x.
    assert_eq!(paths[0].start_vertex(), Some(0));
    assert_eq!(paths[0].vertices(), loop_a.points());
}

/// An open polyline that loops back onto itself is reclassified and printed
/// with the closed paths.
#[test]
fn test_looping_polyline_treated_as_closed() {
    let loop_line = Polyline::from_points(vec![
        Point::new(0, 0),
        Point::new(1000, 0),
        Point::new(500, 800),
        Point::new(2, 1),
    ]);
    let line = segment(0, -500, 1000, -500);

    let mut order = MonotonicOrder::new(ALONG_X, 500, Point::zero());
    order.add_polyline(&line);
    order.add_polyline(&loop_line);
    order.optimize();

    let paths = order.paths();
    assert!(paths[0].is_closed());
    assert_eq!(paths[0].vertices(), loop_line.points());
    assert!(!paths[1].is_closed());
}

/// Parallel lines farther apart than the adjacency distance along the
/// direction vector are independent: each starts its own run from its near
/// endpoint.
#[test]
fn test_distant_lines_are_independent() {
    let a = segment(0, 0, 1000, 0);
    let b = segment(2000, 0, 3000, 0);

    let mut order = MonotonicOrder::new(ALONG_X, 500, Point::zero());
    order.add_polyline(&a);
    order.add_polyline(&b);
    order.optimize();

    let paths = order.paths();
    assert_eq!(paths[0].vertices(), a.points());
    assert_eq!(paths[1].vertices(), b.points());
    assert_eq!(paths[0].start_vertex(), Some(0));
    assert_eq!(paths[1].start_vertex(), Some(0));
    assert!(!paths[1].backwards());
}

/// The output is always a permutation of the input, whatever the mix.
#[test]
fn test_output_is_permutation() {
    let lines = vec![
        segment(0, 0, 1000, 0),
        segment(0, 200, 1000, 200),
        segment(1005, 0, 2000, 0),
        segment(0, 400, 1000, 400),
        segment(5000, 5000, 6000, 5000),
        Polyline::from_points(vec![Point::new(7000, 0)]),
        Polyline::new(),
    ];
    let polygon = square(3000, 3000, 500);

    let mut order = MonotonicOrder::new(ALONG_X, 500, Point::zero());
    for line in &lines {
        order.add_polyline(line);
    }
    order.add_polygon(&polygon);
    order.optimize();

    let paths = order.paths();
    assert_eq!(paths.len(), lines.len() + 1);
    for line in &lines {
        let hits = paths
            .iter()
            .filter(|p| std::ptr::eq(p.vertices().as_ptr(), line.points().as_ptr()))
            .count();
        assert_eq!(hits, 1, "each staged path appears exactly once");
    }

    // Every open path with vertices has an endpoint start; the degenerate
    // singleton keeps none.
    for path in paths.iter().filter(|p| !p.is_closed()) {
        match path.len() {
            0 | 1 => assert_eq!(path.start_vertex(), None),
            n => {
                let start = path.start_vertex().expect("endpoint assigned");
                assert!(start == 0 || start == n - 1);
                assert_eq!(path.backwards(), start == n - 1);
            }
        }
    }
}

/// Starting lines are visited in order of their earliest projection.
#[test]
fn test_starting_lines_monotonic() {
    let rows: Vec<Polyline> = (0..6).map(|i| segment(0, i * 2000, 1000, i * 2000)).collect();

    // Rows are 2mm apart, far beyond the 0.5mm adjacency distance: every row
    // is an independent starting line.
    let mut order = MonotonicOrder::new(FRAC_PI_2, 500, Point::zero());
    order.add_polyline(&rows[3]);
    order.add_polyline(&rows[0]);
    order.add_polyline(&rows[5]);
    order.add_polyline(&rows[1]);
    order.add_polyline(&rows[4]);
    order.add_polyline(&rows[2]);
    order.optimize();

    let ys: Vec<i64> = order
        .paths()
        .iter()
        .map(|p| p.vertices()[0].y)
        .collect();
    assert_eq!(ys, vec![0, 2000, 4000, 6000, 8000, 10000]);
}

/// Optimizing twice with the same parameters reproduces the same output.
#[test]
fn test_optimize_is_idempotent() {
    let a = segment(0, 0, 500, 0);
    let b = segment(500, 0, 1000, 0);
    let c = segment(0, 200, 1000, 200);
    let polygon = square(2000, 2000, 500);

    let mut order = MonotonicOrder::new(ALONG_X, 500, Point::zero());
    order.add_polyline(&a);
    order.add_polyline(&b);
    order.add_polyline(&c);
    order.add_polygon(&polygon);
    order.optimize();

    let first: Vec<_> = order
        .paths()
        .iter()
        .map(|p| (p.vertices().as_ptr(), p.start_vertex(), p.backwards()))
        .collect();

    order.optimize();
    let second: Vec<_> = order
        .paths()
        .iter()
        .map(|p| (p.vertices().as_ptr(), p.start_vertex(), p.backwards()))
        .collect();

    assert_eq!(first, second);
}

#[test]
fn test_empty_input() {
    let mut order = MonotonicOrder::new(ALONG_X, 500, Point::zero());
    order.optimize();
    assert!(order.paths().is_empty());
    assert!(order.is_empty());
}

#[test]
fn test_single_line() {
    let line = segment(0, 0, 1000, 0);
    let mut order = MonotonicOrder::new(ALONG_X, 500, Point::new(900, 100));
    order.add_polyline(&line);
    order.optimize();

    let paths = order.paths();
    assert_eq!(paths.len(), 1);
    // Enters at the endpoint nearer the configured start point.
    assert_eq!(paths[0].start_vertex(), Some(1));
    assert!(paths[0].backwards());
}

/// A shattered surface: many collinear chains side by side. Every chain
/// prints head to tail and the chains advance monotonically.
#[test]
fn test_shattered_rows() {
    let mut rows = Vec::new();
    for row in 0..4 {
        for piece in 0..3 {
            rows.push(segment(
                piece * 1000,
                row * 300,
                (piece + 1) * 1000,
                row * 300,
            ));
        }
    }

    let mut order = MonotonicOrder::new(FRAC_PI_2, 500, Point::zero());
    for row in &rows {
        order.add_polyline(row);
    }
    order.optimize();

    let paths = order.paths();
    assert_eq!(paths.len(), rows.len());

    // Rows never print out of order.
    let row_sequence: Vec<i64> = paths.iter().map(|p| p.vertices()[0].y).collect();
    let mut sorted = row_sequence.clone();
    sorted.sort();
    assert_eq!(row_sequence, sorted);

    // Every piece enters at one of its endpoints.
    for path in paths {
        let start = path.start_vertex().expect("assigned");
        assert!(start == 0 || start == path.len() - 1);
    }
}
