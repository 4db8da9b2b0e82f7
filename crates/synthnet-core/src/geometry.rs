//! Planar geometry helpers

use synthnet_storage::Position;

/// Euclidean distance between two points in the plane
pub fn distance(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    (x2 - x1).hypot(y2 - y1)
}

/// Euclidean distance between two positions, ignoring z
pub fn planar_distance(a: Position, b: Position) -> f64 {
    distance(
        f64::from(a.x),
        f64::from(a.y),
        f64::from(b.x),
        f64::from(b.y),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        assert_eq!(distance(0.0, 0.0, 3.0, 4.0), 5.0);
        assert_eq!(distance(1.0, 1.0, 1.0, 1.0), 0.0);
        assert_eq!(distance(-3.0, 0.0, 0.0, 4.0), distance(0.0, 4.0, -3.0, 0.0));
    }

    #[test]
    fn test_planar_distance_ignores_z() {
        let a = Position::new(0, 0, 0);
        let b = Position::new(6, 8, 100);
        assert_eq!(planar_distance(a, b), 10.0);
    }
}
