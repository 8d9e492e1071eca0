use nalgebra::Vector3;

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1. - t) + (b * t)
}

/// Return the angle (in radians) of the line from `origin` to `reference`
/// projected on the XY plane, measured from the positive x-axis and then
/// shifted back by `zero_offset`.
///
/// With `zero_offset = PI/2` a reference straight "up" from the origin gives
/// an angle of zero.
///
/// Returns None when the two points coincide on the XY plane (or either is
/// not finite), since there is no direction to measure.
pub fn heading_angle(origin: &Vector3<f32>, reference: &Vector3<f32>, zero_offset: f32) -> Option<f32> {
    let dx = reference.x - origin.x;
    let dy = reference.y - origin.y;
    if !dx.is_finite() || !dy.is_finite() {
        return None;
    }
    if dx.abs() <= f32::EPSILON && dy.abs() <= f32::EPSILON {
        return None;
    }
    Some(dy.atan2(dx) - zero_offset)
}

#[cfg(test)]
mod tests {
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_heading_cardinals() {
        let o = Vector3::new(0., 0., 0.);
        let angle = |x: f32, y: f32| heading_angle(&o, &Vector3::new(x, y, 0.), FRAC_PI_2).unwrap();
        assert!(close(angle(0., 1.), 0.)); // N
        assert!(close(angle(1., 1.), -FRAC_PI_4)); // NE
        assert!(close(angle(1., 0.), -FRAC_PI_2)); // E
        assert!(close(angle(-1., 0.), FRAC_PI_2)); // W
        assert!(close(angle(0., -1.), -PI)); // S
    }

    #[test]
    fn test_heading_ignores_depth() {
        let o = Vector3::new(1., 1., 0.);
        let a = heading_angle(&o, &Vector3::new(2., 2., 0.), 0.).unwrap();
        let b = heading_angle(&o, &Vector3::new(2., 2., 30.), 0.).unwrap();
        assert!(close(a, b));
    }

    #[test]
    fn test_heading_undefined_for_coincident_points() {
        let p = Vector3::new(3., 4., 0.);
        assert_eq!(heading_angle(&p, &p, FRAC_PI_2), None);
        assert_eq!(heading_angle(&p, &Vector3::new(3., 4., 9.), FRAC_PI_2), None);
        assert_eq!(heading_angle(&p, &Vector3::new(f32::NAN, 0., 0.), FRAC_PI_2), None);
    }

    #[test]
    fn test_lerp() {
        assert_eq!(lerp(0., 10., 0.), 0.);
        assert_eq!(lerp(0., 10., 1.), 10.);
        assert_eq!(lerp(0., 10., 0.5), 5.);
    }
}
