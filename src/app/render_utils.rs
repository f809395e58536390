use eframe::egui::ecolor::Hsva;
use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke};

pub(super) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
}

pub(super) fn dim_color(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.0);
    Color32::from_rgba_unmultiplied(
        (color.r() as f32 * factor) as u8,
        (color.g() as f32 * factor) as u8,
        (color.b() as f32 * factor) as u8,
        (color.a() as f32 * (0.45 + (factor * 0.55))) as u8,
    )
}

/// Grid anchored at `origin` (the world origin on screen) with `step`
/// pixels between lines.
pub(super) fn draw_background(painter: &Painter, rect: Rect, origin: Pos2, step: f32) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(19, 23, 29));

    let step = step.max(20.0);
    if !step.is_finite() || !origin.x.is_finite() || !origin.y.is_finite() {
        return;
    }
    let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 70));

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
        x += step;
    }

    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
        y += step;
    }
}

pub(super) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    !(position.x + radius < rect.left()
        || position.x - radius > rect.right()
        || position.y + radius < rect.top()
        || position.y - radius > rect.bottom())
}

pub(super) fn edge_visible(rect: Rect, start: Pos2, end: Pos2, padding: f32) -> bool {
    let min_x = start.x.min(end.x) - padding;
    let max_x = start.x.max(end.x) + padding;
    let min_y = start.y.min(end.y) - padding;
    let max_y = start.y.max(end.y) + padding;

    if max_x < rect.left() || min_x > rect.right() || max_y < rect.top() || min_y > rect.bottom() {
        return false;
    }

    if rect.contains(start) || rect.contains(end) {
        return true;
    }

    let top_left = rect.left_top();
    let top_right = rect.right_top();
    let bottom_left = rect.left_bottom();
    let bottom_right = rect.right_bottom();

    segments_intersect(start, end, top_left, top_right)
        || segments_intersect(start, end, top_right, bottom_right)
        || segments_intersect(start, end, bottom_right, bottom_left)
        || segments_intersect(start, end, bottom_left, top_left)
}

fn segments_intersect(a1: Pos2, a2: Pos2, b1: Pos2, b2: Pos2) -> bool {
    fn cross(o: Pos2, a: Pos2, b: Pos2) -> f32 {
        let oa = a - o;
        let ob = b - o;
        (oa.x * ob.y) - (oa.y * ob.x)
    }

    let a_min_x = a1.x.min(a2.x);
    let a_max_x = a1.x.max(a2.x);
    let a_min_y = a1.y.min(a2.y);
    let a_max_y = a1.y.max(a2.y);
    let b_min_x = b1.x.min(b2.x);
    let b_max_x = b1.x.max(b2.x);
    let b_min_y = b1.y.min(b2.y);
    let b_max_y = b1.y.max(b2.y);

    if a_max_x < b_min_x || b_max_x < a_min_x || a_max_y < b_min_y || b_max_y < a_min_y {
        return false;
    }

    let c1 = cross(a1, a2, b1);
    let c2 = cross(a1, a2, b2);
    let c3 = cross(b1, b2, a1);
    let c4 = cross(b1, b2, a2);

    (c1 <= 0.0 && c2 >= 0.0 || c1 >= 0.0 && c2 <= 0.0)
        && (c3 <= 0.0 && c4 >= 0.0 || c3 >= 0.0 && c4 <= 0.0)
}

fn normalize_log(value: f32, min: f32, max: f32) -> f32 {
    let min = min.max(1.0e-3);
    let max = max.max(min);
    let value = value.clamp(min, max);

    let denominator = max.ln() - min.ln();
    if !denominator.is_finite() || denominator.abs() < f32::EPSILON {
        return 0.5;
    }

    ((value.ln() - min.ln()) / denominator).clamp(0.0, 1.0)
}

pub(super) fn node_radius(value: f32, min: f32, max: f32) -> f32 {
    6.0 + normalize_log(value, min, max) * 14.0
}

/// Well separated hue per topic, stable across runs.
pub(super) fn topic_color(topic: Option<usize>) -> Color32 {
    let Some(topic) = topic else {
        return Color32::from_rgb(150, 156, 166);
    };
    let hue = (topic as f32 * 0.618_034 + 0.08).fract();
    Hsva::new(hue, 0.58, 0.92, 1.0).into()
}

pub(super) fn with_alpha(color: Color32, alpha: f32) -> Color32 {
    let [r, g, b, a] = color.to_srgba_unmultiplied();
    Color32::from_rgba_unmultiplied(r, g, b, (a as f32 * alpha.clamp(0.0, 1.0)) as u8)
}

#[cfg(test)]
mod tests {
    use eframe::egui::{pos2, vec2};
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn edge_visibility_handles_crossing_segments() {
        let rect = Rect::from_min_size(pos2(0.0, 0.0), vec2(100.0, 100.0));
        assert!(edge_visible(rect, pos2(-50.0, 50.0), pos2(150.0, 50.0), 0.0));
        assert!(edge_visible(rect, pos2(10.0, 10.0), pos2(500.0, 500.0), 0.0));
        assert!(!edge_visible(rect, pos2(-50.0, -10.0), pos2(150.0, -10.0), 0.0));
        assert!(!edge_visible(rect, pos2(-20.0, 90.0), pos2(10.0, 130.0), 0.0));
    }

    #[test]
    fn radius_grows_with_weight() {
        assert_eq!(node_radius(1.0, 1.0, 9.0), 6.0);
        assert_eq!(node_radius(9.0, 1.0, 9.0), 20.0);
        assert_eq!(node_radius(4.0, 4.0, 4.0), 13.0);
        assert!(node_radius(3.0, 1.0, 9.0) > node_radius(2.0, 1.0, 9.0));
    }

    #[test]
    fn topic_colors_are_stable_and_distinct() {
        assert_eq!(topic_color(Some(3)), topic_color(Some(3)));
        assert_ne!(topic_color(Some(0)), topic_color(Some(1)));
        assert_eq!(topic_color(None), Color32::from_rgb(150, 156, 166));
    }

    #[test]
    fn alpha_scaling_keeps_the_hue() {
        let color = with_alpha(Color32::from_rgb(200, 100, 50), 0.5);
        assert_eq!(color.a(), 127);
        assert_eq!(with_alpha(color, 0.0).a(), 0);
    }
}
