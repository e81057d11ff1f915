#![allow(clippy::float_cmp)]

use super::*;

const EPSILON: f64 = 1e-10;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

// --- Point ---

#[test]
fn point_new() {
    let p = Point::new(3.0, 4.0);
    assert_eq!(p.x, 3.0);
    assert_eq!(p.y, 4.0);
}

#[test]
fn point_distance_pythagorean() {
    assert!(approx_eq(Point::new(0.0, 0.0).distance(Point::new(3.0, 4.0)), 5.0));
}

#[test]
fn point_distance_is_symmetric() {
    let a = Point::new(-2.0, 7.5);
    let b = Point::new(11.0, -1.0);
    assert!(approx_eq(a.distance(b), b.distance(a)));
}

// --- Size ---

#[test]
fn size_scaled_multiplies_both_dimensions() {
    let s = Size::new(100.0, 50.0).scaled(2.0);
    assert_eq!(s, Size::new(200.0, 100.0));
}

// --- Empty extent ---

#[test]
fn empty_extent_is_empty() {
    assert!(Extent::empty().is_empty());
}

#[test]
fn default_extent_is_empty() {
    assert!(Extent::default().is_empty());
}

#[test]
fn extending_empty_by_point_yields_point_extent() {
    let mut e = Extent::empty();
    e.extend_point(Point::new(2.0, 3.0));
    assert_eq!(e, Extent::new(2.0, 3.0, 2.0, 3.0));
    assert!(!e.is_empty());
}

#[test]
fn empty_extent_intersects_nothing() {
    let e = Extent::empty();
    assert!(!e.intersects(&Extent::new(-1e9, -1e9, 1e9, 1e9)));
}

#[test]
fn from_points_with_no_points_is_empty() {
    let pts: [Point; 0] = [];
    assert!(Extent::from_points(&pts).is_empty());
}

// --- Construction / growth ---

#[test]
fn from_points_bounds_all_points() {
    let pts = [Point::new(1.0, 5.0), Point::new(-3.0, 2.0), Point::new(4.0, -1.0)];
    assert_eq!(Extent::from_points(&pts), Extent::new(-3.0, -1.0, 4.0, 5.0));
}

#[test]
fn extend_covers_other_extent() {
    let mut e = Extent::new(0.0, 0.0, 1.0, 1.0);
    e.extend(&Extent::new(-2.0, 0.5, 0.5, 3.0));
    assert_eq!(e, Extent::new(-2.0, 0.0, 1.0, 3.0));
}

#[test]
fn buffer_point_extent_is_square() {
    let e = Extent::from_point(Point::new(10.0, -4.0)).buffer(20.0);
    assert_eq!(e, Extent::new(-10.0, -24.0, 30.0, 16.0));
    assert!(approx_eq(e.width(), 40.0));
    assert!(approx_eq(e.height(), 40.0));
}

// --- Predicates ---

#[test]
fn intersects_counts_touching_edges() {
    let a = Extent::new(0.0, 0.0, 10.0, 10.0);
    let b = Extent::new(10.0, 10.0, 20.0, 20.0);
    assert!(a.intersects(&b));
    assert!(b.intersects(&a));
}

#[test]
fn disjoint_extents_do_not_intersect() {
    let a = Extent::new(0.0, 0.0, 10.0, 10.0);
    let b = Extent::new(10.5, 0.0, 20.0, 10.0);
    assert!(!a.intersects(&b));
}

#[test]
fn contains_point_is_inclusive() {
    let e = Extent::new(0.0, 0.0, 10.0, 10.0);
    assert!(e.contains_point(Point::new(0.0, 10.0)));
    assert!(e.contains_point(Point::new(5.0, 5.0)));
    assert!(!e.contains_point(Point::new(10.1, 5.0)));
}

#[test]
fn contains_extent_requires_full_cover() {
    let outer = Extent::new(0.0, 0.0, 10.0, 10.0);
    assert!(outer.contains_extent(&Extent::new(1.0, 1.0, 9.0, 9.0)));
    assert!(outer.contains_extent(&outer));
    assert!(!outer.contains_extent(&Extent::new(5.0, 5.0, 11.0, 9.0)));
}

#[test]
fn intersection_of_overlapping_extents() {
    let a = Extent::new(0.0, 0.0, 10.0, 10.0);
    let b = Extent::new(5.0, -5.0, 15.0, 5.0);
    assert_eq!(a.intersection(&b), Extent::new(5.0, 0.0, 10.0, 5.0));
}

#[test]
fn intersection_of_disjoint_extents_is_empty() {
    let a = Extent::new(0.0, 0.0, 1.0, 1.0);
    let b = Extent::new(2.0, 2.0, 3.0, 3.0);
    assert!(a.intersection(&b).is_empty());
}

#[test]
fn center_is_midpoint() {
    assert_eq!(Extent::new(-4.0, 2.0, 6.0, 8.0).center(), Point::new(1.0, 5.0));
}

// --- View extent ---

#[test]
fn view_extent_without_rotation() {
    let e = Extent::for_view_and_size(Point::new(100.0, 50.0), 2.0, 0.0, Size::new(200.0, 100.0));
    assert!(approx_eq(e.min_x, -100.0));
    assert!(approx_eq(e.max_x, 300.0));
    assert!(approx_eq(e.min_y, -50.0));
    assert!(approx_eq(e.max_y, 150.0));
}

#[test]
fn view_extent_quarter_turn_swaps_axes() {
    let e = Extent::for_view_and_size(Point::new(0.0, 0.0), 1.0, std::f64::consts::FRAC_PI_2, Size::new(200.0, 100.0));
    assert!(approx_eq(e.width(), 100.0));
    assert!(approx_eq(e.height(), 200.0));
}

#[test]
fn view_extent_eighth_turn_grows() {
    let e = Extent::for_view_and_size(Point::new(0.0, 0.0), 1.0, std::f64::consts::FRAC_PI_4, Size::new(100.0, 100.0));
    assert!(approx_eq(e.width(), 100.0 * std::f64::consts::SQRT_2));
    assert!(approx_eq(e.center().x, 0.0));
}
