//! Math helpers and glam re-exports.
//!
//! We re-export [glam](https://docs.rs/glam) so simulations don't need to
//! depend on it directly. Components such as positions are usually [`Vec2`].

pub use glam::Vec2;

/// Vector from polar coordinates: length `r`, angle `t` in radians.
pub fn polar(r: f32, t: f32) -> Vec2 {
    Vec2::from_angle(t) * r
}

/// Wrap `v` into the rectangle centred on the origin with the given size, so
/// something leaving one edge re-enters from the opposite one.
pub fn wrap_centered(v: Vec2, size: Vec2) -> Vec2 {
    let half = size * 0.5;
    let mut out = v;
    if out.x < -half.x {
        out.x += size.x;
    }
    if out.x > half.x {
        out.x -= size.x;
    }
    if out.y < -half.y {
        out.y += size.y;
    }
    if out.y > half.y {
        out.y -= size.y;
    }
    out
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use super::*;

    #[test]
    fn polar_matches_cos_sin() {
        let v = polar(2.0, PI / 2.0);
        assert!(v.x.abs() < 1e-6);
        assert!((v.y - 2.0).abs() < 1e-6);
    }

    #[test]
    fn wrap_reenters_from_opposite_edge() {
        let size = Vec2::new(100.0, 50.0);
        assert_eq!(wrap_centered(Vec2::new(60.0, 0.0), size), Vec2::new(-40.0, 0.0));
        assert_eq!(wrap_centered(Vec2::new(0.0, -30.0), size), Vec2::new(0.0, 20.0));
        assert_eq!(wrap_centered(Vec2::new(10.0, 10.0), size), Vec2::new(10.0, 10.0));
    }
}
