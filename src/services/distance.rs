use crate::models::Coordinates;

/// Round to 2 decimal places, the precision of every stored distance and amount
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Great-circle distances between coordinates. Stateless and `Copy`, so it
/// can be embedded in any service without sharing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DistanceCalculator;

impl DistanceCalculator {
    pub fn new() -> Self {
        DistanceCalculator
    }

    /// Haversine distance in kilometers, rounded to 2 decimals.
    /// Inputs are not range-checked.
    pub fn distance(&self, a: &Coordinates, b: &Coordinates) -> f64 {
        let distance = a.distance_to(b);

        tracing::trace!(
            "Distance calculated: {:.4} km between ({}, {}) and ({}, {})",
            distance,
            a.lat,
            a.lng,
            b.lat,
            b.lng
        );

        round2(distance)
    }

    /// Sum of the distances between consecutive points
    pub fn total_distance(&self, points: &[Coordinates]) -> f64 {
        if points.len() < 2 {
            return 0.0;
        }

        points
            .windows(2)
            .map(|pair| self.distance(&pair[0], &pair[1]))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coords(lat: f64, lng: f64) -> Coordinates {
        Coordinates::new(lat, lng).unwrap()
    }

    #[test]
    fn test_one_degree_longitude_at_equator() {
        let calc = DistanceCalculator::new();
        assert_eq!(calc.distance(&coords(0.0, 0.0), &coords(0.0, 1.0)), 111.19);
    }

    #[test]
    fn test_casablanca_to_rabat() {
        let calc = DistanceCalculator::new();
        let casablanca = coords(33.5731, -7.5898);
        let rabat = coords(34.0209, -6.8416);

        let distance = calc.distance(&casablanca, &rabat);
        assert!(
            (distance - 87.0).abs() <= 2.0,
            "Casablanca-Rabat should be about 87 km, got {}",
            distance
        );
    }

    #[test]
    fn test_zero_distance_and_symmetry() {
        let calc = DistanceCalculator::new();
        let a = coords(48.8566, 2.3522);
        let b = coords(-33.8688, 151.2093);

        assert_eq!(calc.distance(&a, &a), 0.0);
        assert_eq!(calc.distance(&a, &b), calc.distance(&b, &a));
    }

    #[test]
    fn test_result_is_rounded() {
        let calc = DistanceCalculator::new();
        let d = calc.distance(&coords(33.5731, -7.5898), &coords(34.0209, -6.8416));
        assert_eq!(d, round2(d));
    }

    #[test]
    fn test_total_distance() {
        let calc = DistanceCalculator::new();
        assert_eq!(calc.total_distance(&[]), 0.0);
        assert_eq!(calc.total_distance(&[coords(0.0, 0.0)]), 0.0);

        let points = [coords(0.0, 0.0), coords(0.0, 1.0), coords(0.0, 2.0)];
        let total = calc.total_distance(&points);
        assert!((total - 222.38).abs() < 1e-9);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.005_1), 1.01);
        assert_eq!(round2(87.004), 87.0);
        assert_eq!(round2(0.0), 0.0);
    }
}
