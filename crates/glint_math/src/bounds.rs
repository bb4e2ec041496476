//! Cached bounding volumes of a scene node.

use crate::{Aabb, Mat4, Mat4Ext, Vec3};

/// Object- and world-space bounds of a node plus their bounding spheres.
///
/// Every node carries one of these after the scene is updated. The world box
/// is the first thing a ray is tested against before it is transformed into
/// the node's object space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeBounds {
    /// Box in the node's own coordinate frame.
    pub os: Aabb,
    /// Box in world space.
    pub ws: Aabb,
    pub center_os: Vec3,
    pub radius_os: f32,
    pub center_ws: Vec3,
    pub radius_ws: f32,
    /// False for hidden nodes; they are never hit.
    pub visible: bool,
}

impl NodeBounds {
    /// Bounds of a node without geometry or not yet updated.
    pub const EMPTY: NodeBounds = NodeBounds {
        os: Aabb::EMPTY,
        ws: Aabb::EMPTY,
        center_os: Vec3::ZERO,
        radius_os: 0.0,
        center_ws: Vec3::ZERO,
        radius_ws: 0.0,
        visible: true,
    };

    /// Derive world bounds from an object-space box and the node's
    /// object-to-world matrix.
    pub fn from_object(os: Aabb, world: &Mat4) -> Self {
        let ws = world.transform_aabb(&os);
        let (center_os, center_ws) = if os.is_empty() {
            (Vec3::ZERO, world.transform_point3(Vec3::ZERO))
        } else {
            (os.centroid(), ws.centroid())
        };

        Self {
            os,
            ws,
            center_os,
            radius_os: os.radius(),
            center_ws,
            radius_ws: ws.radius(),
            visible: true,
        }
    }

    pub fn with_visibility(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.os.is_empty()
    }
}

impl Default for NodeBounds {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_bounds_follow_transform() {
        let os = Aabb::from_points(Vec3::splat(-1.0), Vec3::splat(1.0));
        let world = Mat4::from_translation(Vec3::new(0.0, 5.0, 0.0));
        let b = NodeBounds::from_object(os, &world);

        assert_eq!(b.center_os, Vec3::ZERO);
        assert_eq!(b.center_ws, Vec3::new(0.0, 5.0, 0.0));
        assert!((b.radius_ws - 3.0_f32.sqrt()).abs() < 1e-5);
        assert!(b.visible);
    }

    #[test]
    fn test_empty_bounds() {
        let b = NodeBounds::from_object(Aabb::EMPTY, &Mat4::IDENTITY).with_visibility(false);
        assert!(b.is_empty());
        assert!(b.ws.is_empty());
        assert!(!b.visible);
    }
}
