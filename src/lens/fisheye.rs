use eframe::egui::Vec2;

/// Maps a distance from the camera center onto the compressed radius.
///
/// Identity up to `start_radius`, then `max - band / (1 + (d - start) / band)`
/// where `band = max - start`. The slope is 1 at the seam, the curve is
/// strictly increasing and it never reaches `max_radius`.
pub fn compressed_radius(distance: f32, start_radius: f32, max_radius: f32) -> f32 {
    if distance <= start_radius {
        return distance;
    }

    let band = max_radius - start_radius;
    if band <= f32::EPSILON {
        return max_radius.min(distance);
    }

    let overflow = distance - start_radius;
    max_radius - band / (1.0 + overflow / band)
}

/// Radial fisheye remap of `point` around `center`. Direction is preserved;
/// only the distance from `center` changes.
pub fn compress(point: Vec2, center: Vec2, start_radius: f32, max_radius: f32) -> Vec2 {
    let offset = point - center;
    let distance = offset.length();
    if distance <= start_radius || distance <= f32::EPSILON {
        return point;
    }

    let radius = compressed_radius(distance, start_radius, max_radius);
    center + offset * (radius / distance)
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;

    use super::*;

    const START: f32 = 291.2;
    const MAX: f32 = 331.2;

    #[test]
    fn identity_inside_comfort_radius() {
        let center = vec2(40.0, -12.0);
        for offset in [vec2(0.0, 0.0), vec2(100.0, 20.0), vec2(-200.0, 200.0), vec2(0.0, START)] {
            let point = center + offset;
            assert_eq!(compress(point, center, START, MAX), point);
        }
    }

    #[test]
    fn cliff_node_lands_inside_the_band() {
        let center = Vec2::ZERO;
        let compressed = compress(vec2(600.0, 0.0), center, START, MAX);
        let radius = compressed.length();
        assert!(radius > START && radius < MAX, "radius {radius}");
    }

    #[test]
    fn far_node_approaches_horizon() {
        let compressed = compress(vec2(0.0, 10_000.0), Vec2::ZERO, START, MAX);
        let radius = compressed.length();
        assert!(radius < MAX);
        assert!(MAX - radius < 1.0, "radius {radius}");
    }

    #[test]
    fn radius_is_bounded_and_monotonic() {
        let mut previous = compressed_radius(START, START, MAX);
        let mut distance = START;
        while distance < 1.0e6 {
            distance *= 1.07;
            let radius = compressed_radius(distance, START, MAX);
            assert!(radius < MAX);
            assert!(radius > previous, "not increasing at {distance}");
            previous = radius;
        }
    }

    #[test]
    fn seam_is_continuous() {
        let below = compressed_radius(START - 0.001, START, MAX);
        let above = compressed_radius(START + 0.001, START, MAX);
        assert!((above - below).abs() < 0.01);
    }

    #[test]
    fn direction_is_preserved() {
        let center = vec2(-75.0, 310.0);
        for (index, radius) in [350.0_f32, 900.0, 4_000.0, 75_000.0].into_iter().enumerate() {
            let angle = 0.4 + index as f32 * 1.7;
            let point = center + Vec2::angled(angle) * radius;
            let compressed = compress(point, center, START, MAX);
            let before = (point - center).angle();
            let after = (compressed - center).angle();
            assert!((before - after).abs() < 1.0e-4, "{before} vs {after}");
        }
    }

    #[test]
    fn collapsed_band_clamps_to_horizon() {
        let compressed = compress(vec2(500.0, 0.0), Vec2::ZERO, 300.0, 300.0);
        assert!((compressed.x - 300.0).abs() < 1.0e-4);
    }
}
