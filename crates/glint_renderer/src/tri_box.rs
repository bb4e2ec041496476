//! Exact triangle/box overlap test (separating axis theorem).
//!
//! Used while building the uniform grid so that a triangle is only stored
//! in voxels it actually touches, not in every voxel of its bounding box.
//! Thirteen candidate axes are tested: the three box normals, the triangle
//! normal and the nine cross products of box axes and triangle edges.

use glint_math::Vec3;

/// Does triangle `tri` overlap the box with `center` and half extents `half`?
///
/// Touching counts as overlapping.
pub fn triangle_box_overlap(center: Vec3, half: Vec3, tri: &[Vec3; 3]) -> bool {
    let v0 = tri[0] - center;
    let v1 = tri[1] - center;
    let v2 = tri[2] - center;

    // Box normals: compare the triangle's extent with the box.
    let min = v0.min(v1).min(v2);
    let max = v0.max(v1).max(v2);
    if min.cmpgt(half).any() || max.cmplt(-half).any() {
        return false;
    }

    // Edge cross products.
    let edges = [v1 - v0, v2 - v1, v0 - v2];
    for edge in edges {
        for axis in [Vec3::X, Vec3::Y, Vec3::Z] {
            if separated_on(axis.cross(edge), v0, v1, v2, half) {
                return false;
            }
        }
    }

    // Triangle plane.
    let normal = edges[0].cross(edges[1]);
    let d = normal.dot(v0);
    let r = half.dot(normal.abs());
    d.abs() <= r
}

#[inline]
fn separated_on(axis: Vec3, v0: Vec3, v1: Vec3, v2: Vec3, half: Vec3) -> bool {
    let p0 = axis.dot(v0);
    let p1 = axis.dot(v1);
    let p2 = axis.dot(v2);
    let r = half.dot(axis.abs());
    p0.min(p1).min(p2) > r || p0.max(p1).max(p2) < -r
}
