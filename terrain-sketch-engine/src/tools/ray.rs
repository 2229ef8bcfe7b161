use bevy::prelude::*;

/// Ray against an oriented box: transform into the box's local frame and run
/// the slab test there.
pub fn ray_hits_obb(origin: Vec3, dir: Vec3, xf: &GlobalTransform, size: Vec3) -> Option<f32> {
    let inv = xf.compute_matrix().inverse();
    let o_local = inv.transform_point3(origin);
    let d_local = inv.transform_vector3(dir);
    let he = size * 0.5;
    ray_aabb_hit_t(o_local, d_local, -he, he)
}

// Slab-method ray–AABB intersection, returns Some(t) or None
pub fn ray_aabb_hit_t(ray_origin: Vec3, ray_direction: Vec3, min: Vec3, max: Vec3) -> Option<f32> {
    let inv = Vec3::new(
        if ray_direction.x != 0.0 { 1.0 / ray_direction.x } else { f32::INFINITY },
        if ray_direction.y != 0.0 { 1.0 / ray_direction.y } else { f32::INFINITY },
        if ray_direction.z != 0.0 { 1.0 / ray_direction.z } else { f32::INFINITY },
    );

    let (mut tmin, mut tmax) = ((min.x - ray_origin.x) * inv.x, (max.x - ray_origin.x) * inv.x);
    if tmin > tmax { std::mem::swap(&mut tmin, &mut tmax); }

    let (mut tymin, mut tymax) = ((min.y - ray_origin.y) * inv.y, (max.y - ray_origin.y) * inv.y);
    if tymin > tymax { std::mem::swap(&mut tymin, &mut tymax); }

    if (tmin > tymax) || (tymin > tmax) { return None; }
    if tymin > tmin { tmin = tymin; }
    if tymax < tmax { tmax = tymax; }

    let (mut tzmin, mut tzmax) = ((min.z - ray_origin.z) * inv.z, (max.z - ray_origin.z) * inv.z);
    if tzmin > tzmax { std::mem::swap(&mut tzmin, &mut tzmax); }

    if (tmin > tzmax) || (tzmin > tmax) { return None; }
    if tzmin > tmin { tmin = tzmin; }
    if tzmax < tmax { tmax = tzmax; }

    if tmax < 0.0 { return None; }
    Some(if tmin >= 0.0 { tmin } else { tmax })
}

/// Distance from a ray to a point, with the ray parameter of the closest
/// approach. `None` when the point lies behind the ray origin.
pub fn ray_point_distance(origin: Vec3, dir: Vec3, point: Vec3) -> Option<(f32, f32)> {
    let t = (point - origin).dot(dir);
    if t < 0.0 {
        return None;
    }
    let closest = origin + dir * t;
    Some((closest.distance(point), t))
}

/// Minimum distance between a ray and a segment, with the ray parameter of
/// the closest approach.
pub fn ray_segment_distance(origin: Vec3, dir: Vec3, a: Vec3, b: Vec3) -> Option<(f32, f32)> {
    let seg = b - a;
    let seg_len_sq = seg.length_squared();
    if seg_len_sq <= f32::EPSILON {
        return ray_point_distance(origin, dir, a);
    }

    // Closest points between the infinite line pair, then clamp to the
    // segment and re-project onto the ray.
    let w = origin - a;
    let a_dd = dir.dot(dir);
    let b_ds = dir.dot(seg);
    let c_ss = seg_len_sq;
    let d_dw = dir.dot(w);
    let e_sw = seg.dot(w);
    let denom = a_dd * c_ss - b_ds * b_ds;

    let s = if denom.abs() > f32::EPSILON {
        ((b_ds * d_dw - a_dd * e_sw) / denom).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let on_segment = a + seg * s;
    let t = (on_segment - origin).dot(dir).max(0.0);
    let on_ray = origin + dir * t;
    Some((on_ray.distance(on_segment), t))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aabb_hit_from_outside() {
        let t = ray_aabb_hit_t(
            Vec3::new(0.0, 0.0, -10.0),
            Vec3::Z,
            Vec3::splat(-1.0),
            Vec3::splat(1.0),
        );
        assert_eq!(t, Some(9.0));
    }

    #[test]
    fn aabb_miss() {
        let t = ray_aabb_hit_t(
            Vec3::new(5.0, 0.0, -10.0),
            Vec3::Z,
            Vec3::splat(-1.0),
            Vec3::splat(1.0),
        );
        assert_eq!(t, None);
    }

    #[test]
    fn point_behind_origin_is_rejected() {
        assert!(ray_point_distance(Vec3::ZERO, Vec3::Z, Vec3::new(0.0, 0.0, -5.0)).is_none());
    }

    #[test]
    fn segment_distance_perpendicular() {
        let (d, _) = ray_segment_distance(
            Vec3::ZERO,
            Vec3::Z,
            Vec3::new(-1.0, 2.0, 5.0),
            Vec3::new(1.0, 2.0, 5.0),
        )
        .unwrap();
        assert!((d - 2.0).abs() < 1e-4);
    }
}
