//! Lattice search for the first free position of a box.

use crate::model::{Container, PackBox, Position, EPSILON};

/// Checks whether two boxes intersect at their current positions.
///
/// Boxes that only share a face are disjoint: they are separated as soon as
/// one axis separates them.
pub fn overlaps(a: &PackBox, b: &PackBox) -> bool {
    let (a_min, a_max) = (a.position, a.max_corner());
    let (b_min, b_max) = (b.position, b.max_corner());

    !(a_max.x <= b_min.x + EPSILON
        || b_max.x <= a_min.x + EPSILON
        || a_max.y <= b_min.y + EPSILON
        || b_max.y <= a_min.y + EPSILON
        || a_max.z <= b_min.z + EPSILON
        || b_max.z <= a_min.z + EPSILON)
}

/// Length of the overlap of two intervals, never negative.
pub fn overlap_1d(a1: f64, a2: f64, b1: f64, b2: f64) -> f64 {
    (a2.min(b2) - a1.max(b1)).max(0.0)
}

/// Overlap area of two boxes projected onto the floor (x/y plane).
pub fn footprint_overlap(a: &PackBox, b: &PackBox) -> f64 {
    let (a_min, a_max) = (a.position, a.max_corner());
    let (b_min, b_max) = (b.position, b.max_corner());
    overlap_1d(a_min.x, a_max.x, b_min.x, b_max.x) * overlap_1d(a_min.y, a_max.y, b_min.y, b_max.y)
}

/// Highest lattice coordinate at which a box of `extent` still fits in `bound`.
fn last_lattice_index(bound: f64, extent: f64) -> Option<i64> {
    let room = bound - extent;
    if room < -EPSILON {
        return None;
    }
    Some((room + EPSILON).floor().max(0.0) as i64)
}

/// Finds the first integer lattice position where `bx` fits.
///
/// Positions are scanned with `x` innermost, then `y`, then `z`, using the
/// box's current working dimensions. On success the box is left at the first
/// free position and `true` is returned; on failure the position is
/// unspecified.
pub fn find_position(bx: &mut PackBox, placed: &[PackBox], container: &Container) -> bool {
    let dims = bx.dims();
    let (Some(max_x), Some(max_y), Some(max_z)) = (
        last_lattice_index(container.width(), dims.width),
        last_lattice_index(container.height(), dims.height),
        last_lattice_index(container.depth(), dims.depth),
    ) else {
        return false;
    };

    for z in 0..=max_z {
        for y in 0..=max_y {
            let mut x = 0;
            while x <= max_x {
                bx.position = Position::new(x as f64, y as f64, z as f64);
                match placed.iter().find(|other| overlaps(bx, other)) {
                    None => return true,
                    // Every lattice x before the blocker's far face hits the same blocker
                    Some(blocker) => {
                        let next = (blocker.max_corner().x - EPSILON).ceil() as i64;
                        x = next.max(x + 1);
                    }
                }
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube(id: &str, side: f64) -> PackBox {
        PackBox::new(id, side, side, side, false).unwrap()
    }

    #[test]
    fn test_touching_boxes_do_not_overlap() {
        let mut a = cube("a", 5.0);
        let mut b = cube("b", 5.0);
        a.position = Position::new(0.0, 0.0, 0.0);
        b.position = Position::new(5.0, 0.0, 0.0);
        assert!(!overlaps(&a, &b));

        b.position = Position::new(4.0, 4.0, 4.0);
        assert!(overlaps(&a, &b));
        assert!(overlaps(&b, &a));
    }

    #[test]
    fn test_first_position_in_scan_order() {
        let container = Container::new(10.0, 10.0, 10.0).unwrap();
        let mut placed = Vec::new();

        let expected = [
            Position::new(0.0, 0.0, 0.0),
            Position::new(5.0, 0.0, 0.0),
            Position::new(0.0, 5.0, 0.0),
            Position::new(5.0, 5.0, 0.0),
            Position::new(0.0, 0.0, 5.0),
        ];

        for (i, want) in expected.iter().enumerate() {
            let mut bx = cube(&format!("b{}", i), 5.0);
            assert!(find_position(&mut bx, &placed, &container));
            assert_eq!(bx.position, *want);
            placed.push(bx);
        }
    }

    #[test]
    fn test_skips_fractional_blocker() {
        let container = Container::new(10.0, 2.0, 2.0).unwrap();
        let mut first = PackBox::new("a", 2.5, 2.0, 2.0, false).unwrap();
        assert!(find_position(&mut first, &[], &container));

        let mut second = PackBox::new("b", 2.0, 2.0, 2.0, false).unwrap();
        assert!(find_position(&mut second, &[first], &container));
        assert_eq!(second.position, Position::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn test_oversized_box_never_fits() {
        let container = Container::new(10.0, 10.0, 10.0).unwrap();
        let mut bx = PackBox::new("big", 11.0, 12.0, 13.0, false).unwrap();
        for idx in 0..6 {
            bx.select_orientation(idx).unwrap();
            assert!(!find_position(&mut bx, &[], &container));
        }
    }

    #[test]
    fn test_fractional_box_stays_in_bounds() {
        let container = Container::new(5.0, 5.0, 5.0).unwrap();
        let mut placed = Vec::new();
        for i in 0..4 {
            let mut bx = PackBox::new(format!("b{}", i), 2.5, 2.5, 5.0, false).unwrap();
            if find_position(&mut bx, &placed, &container) {
                assert!(container.contains(&bx));
                assert!(placed.iter().all(|p| !overlaps(&bx, p)));
                placed.push(bx);
            }
        }
        // Lattice origins 0..=2 on x and y all cut into the first box
        assert_eq!(placed.len(), 1);
    }

    #[test]
    fn test_full_container_rejects() {
        let container = Container::new(4.0, 4.0, 4.0).unwrap();
        let mut filler = cube("filler", 4.0);
        assert!(find_position(&mut filler, &[], &container));
        let mut extra = cube("extra", 1.0);
        assert!(!find_position(&mut extra, &[filler], &container));
    }
}
