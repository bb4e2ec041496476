//! Arena scene graph.
//!
//! Nodes are stored in a flat table and addressed by [`NodeId`]. A node is a
//! group of children, a shape drawing one mesh, or a reference that draws
//! another node (usually a detached prototype) under its own transform.
//! Shared geometry is therefore instanced without copying or ref-counting.
//!
//! Transforms and bounding boxes are cached per node and refreshed by
//! [`Scene::update`], which must run after edits and before rendering.

use glint_math::{Aabb, Color, Mat4, Mat4Ext, NodeBounds, Vec3};

use crate::camera::Camera;
use crate::error::{SceneError, SceneResult};
use crate::fog::Fog;
use crate::light::Light;
use crate::material::Material;
use crate::mesh::Mesh;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(usize);

        impl $name {
            /// Position in the owning table.
            #[inline]
            pub fn index(self) -> usize {
                self.0
            }
        }
    };
}

handle!(
    /// Handle of a node in [`Scene`].
    NodeId
);
handle!(
    /// Handle of a mesh in [`Scene`].
    MeshId
);
handle!(
    /// Handle of a material in [`Scene`].
    MaterialId
);
handle!(
    /// Handle of a light in [`Scene`].
    LightId
);

impl MaterialId {
    /// The material every scene starts with.
    pub const DEFAULT: MaterialId = MaterialId(0);
}

/// What a node draws.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Group { children: Vec<NodeId> },
    Shape { mesh: MeshId },
    Reference { target: NodeId },
}

/// A scene graph node.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    /// Object-to-parent transform
    pub local: Mat4,
    /// Hidden nodes and their subtrees are never hit.
    pub hidden: bool,
    parent: Option<NodeId>,
    local_inv: Mat4,
    world: Mat4,
    bounds: NodeBounds,
}

impl Node {
    fn new(name: String, kind: NodeKind, local: Mat4, parent: Option<NodeId>) -> Self {
        Self {
            name,
            kind,
            local,
            hidden: false,
            parent,
            local_inv: local.inverse(),
            world: local,
            bounds: NodeBounds::EMPTY,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Parent-to-object transform, valid after [`Scene::update`].
    pub fn local_inv(&self) -> &Mat4 {
        &self.local_inv
    }

    /// Object-to-world transform along the parent chain.
    pub fn world(&self) -> &Mat4 {
        &self.world
    }

    /// Cached bounds of the subtree, valid after [`Scene::update`].
    pub fn bounds(&self) -> &NodeBounds {
        &self.bounds
    }

    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Group { children } => children,
            _ => &[],
        }
    }
}

/// Everything the ray tracer needs to render a frame.
#[derive(Debug, Clone)]
pub struct Scene {
    nodes: Vec<Node>,
    meshes: Vec<Mesh>,
    materials: Vec<Material>,
    lights: Vec<Light>,
    root: NodeId,
    pub camera: Option<Camera>,
    pub background: Color,
    /// Global ambient light, scaled by each material's ambient color
    pub global_ambient: Color,
    pub fog: Option<Fog>,
    dirty: bool,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

impl Scene {
    /// Create an empty scene with a root group and the default material.
    pub fn new() -> Self {
        let root = Node::new(
            "root".to_string(),
            NodeKind::Group {
                children: Vec::new(),
            },
            Mat4::IDENTITY,
            None,
        );
        Self {
            nodes: vec![root],
            meshes: Vec::new(),
            materials: vec![Material::default()],
            lights: Vec::new(),
            root: NodeId(0),
            camera: None,
            background: Vec3::ZERO,
            global_ambient: Vec3::splat(0.2),
            fog: None,
            dirty: true,
        }
    }

    pub fn with_camera(mut self, camera: Camera) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    pub fn with_global_ambient(mut self, ambient: Color) -> Self {
        self.global_ambient = ambient;
        self
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    // ------------------------------------------------------------------
    // Tables

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    /// Add a mesh after checking its indices and material handle.
    pub fn add_mesh(&mut self, mesh: Mesh) -> SceneResult<MeshId> {
        mesh.validate()?;
        self.material_checked(mesh.material)?;
        self.meshes.push(mesh);
        self.dirty = true;
        Ok(MeshId(self.meshes.len() - 1))
    }

    pub fn add_light(&mut self, light: Light) -> LightId {
        self.lights.push(light);
        LightId(self.lights.len() - 1)
    }

    pub fn material(&self, id: MaterialId) -> &Material {
        &self.materials[id.0]
    }

    pub fn mesh(&self, id: MeshId) -> &Mesh {
        &self.meshes[id.0]
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn light(&self, id: LightId) -> &Light {
        &self.lights[id.0]
    }

    pub fn light_mut(&mut self, id: LightId) -> &mut Light {
        &mut self.lights[id.0]
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// True if nodes, meshes or transforms changed since the last update.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn material_checked(&self, id: MaterialId) -> SceneResult<&Material> {
        self.materials
            .get(id.0)
            .ok_or(SceneError::UnknownMaterial(id.0))
    }

    fn node_checked(&self, id: NodeId) -> SceneResult<&Node> {
        self.nodes.get(id.0).ok_or(SceneError::UnknownNode(id.0))
    }

    // ------------------------------------------------------------------
    // Graph editing

    /// Add a group. With `parent == None` the node is detached and can only
    /// be drawn through references.
    pub fn add_group(
        &mut self,
        parent: Option<NodeId>,
        name: impl Into<String>,
        local: Mat4,
    ) -> SceneResult<NodeId> {
        self.add_node(
            parent,
            name.into(),
            NodeKind::Group {
                children: Vec::new(),
            },
            local,
        )
    }

    /// Add a shape drawing `mesh`.
    pub fn add_shape(
        &mut self,
        parent: Option<NodeId>,
        name: impl Into<String>,
        mesh: MeshId,
        local: Mat4,
    ) -> SceneResult<NodeId> {
        if mesh.0 >= self.meshes.len() {
            return Err(SceneError::UnknownMesh(mesh.0));
        }
        self.add_node(parent, name.into(), NodeKind::Shape { mesh }, local)
    }

    /// Add a reference drawing `target` under this node's transform.
    pub fn add_reference(
        &mut self,
        parent: Option<NodeId>,
        name: impl Into<String>,
        target: NodeId,
        local: Mat4,
    ) -> SceneResult<NodeId> {
        self.node_checked(target)?;
        self.add_node(parent, name.into(), NodeKind::Reference { target }, local)
    }

    fn add_node(
        &mut self,
        parent: Option<NodeId>,
        name: String,
        kind: NodeKind,
        local: Mat4,
    ) -> SceneResult<NodeId> {
        let id = NodeId(self.nodes.len());
        if let Some(parent) = parent {
            let parent_node = self.nodes.get_mut(parent.0).ok_or(SceneError::UnknownNode(parent.0))?;
            match &mut parent_node.kind {
                NodeKind::Group { children } => children.push(id),
                _ => return Err(SceneError::NotAGroup(parent_node.name.clone())),
            }
        }
        self.nodes.push(Node::new(name, kind, local, parent));
        self.dirty = true;
        Ok(id)
    }

    /// Replace the object-to-parent transform of a node.
    pub fn set_transform(&mut self, id: NodeId, local: Mat4) -> SceneResult<()> {
        let node = self.nodes.get_mut(id.0).ok_or(SceneError::UnknownNode(id.0))?;
        node.local = local;
        self.dirty = true;
        Ok(())
    }

    /// Hide or show a node and its subtree.
    pub fn set_hidden(&mut self, id: NodeId, hidden: bool) -> SceneResult<()> {
        let node = self.nodes.get_mut(id.0).ok_or(SceneError::UnknownNode(id.0))?;
        node.hidden = hidden;
        self.dirty = true;
        Ok(())
    }

    /// Find the first node with the given name.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name == name).map(NodeId)
    }

    // ------------------------------------------------------------------
    // Update

    /// Recompute inverse transforms, world transforms and subtree bounds.
    ///
    /// Fails with [`SceneError::Cycle`] if a reference reaches itself.
    pub fn update(&mut self) -> SceneResult<()> {
        for node in &mut self.nodes {
            node.local_inv = node.local.inverse();
        }

        // Object-space subtree boxes, post-order with cycle detection.
        let mut marks = vec![Mark::Unvisited; self.nodes.len()];
        let mut boxes = vec![Aabb::EMPTY; self.nodes.len()];
        for i in 0..self.nodes.len() {
            self.object_bounds(NodeId(i), &mut marks, &mut boxes)?;
        }

        // World transforms, pre-order from every parentless node.
        let mut worlds = vec![Mat4::IDENTITY; self.nodes.len()];
        let mut stack: Vec<(NodeId, Mat4)> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.parent.is_none())
            .map(|(i, _)| (NodeId(i), Mat4::IDENTITY))
            .collect();
        while let Some((id, parent_world)) = stack.pop() {
            let node = &self.nodes[id.0];
            let world = parent_world * node.local;
            worlds[id.0] = world;
            for &child in node.children() {
                stack.push((child, world));
            }
        }

        for (i, node) in self.nodes.iter_mut().enumerate() {
            node.world = worlds[i];
            node.bounds = NodeBounds::from_object(boxes[i], &worlds[i]).with_visibility(!node.hidden);
        }

        self.dirty = false;
        log::debug!(
            "Scene updated: {} nodes, {} meshes, {} triangles",
            self.nodes.len(),
            self.meshes.len(),
            self.triangle_count()
        );
        Ok(())
    }

    fn object_bounds(&self, id: NodeId, marks: &mut [Mark], boxes: &mut [Aabb]) -> SceneResult<Aabb> {
        match marks[id.0] {
            Mark::Done => return Ok(boxes[id.0]),
            Mark::Visiting => return Err(SceneError::Cycle(self.nodes[id.0].name.clone())),
            Mark::Unvisited => {}
        }
        marks[id.0] = Mark::Visiting;

        let node = &self.nodes[id.0];
        let bounds = match &node.kind {
            NodeKind::Shape { mesh } => self.meshes[mesh.0].bounds,
            NodeKind::Group { children } => {
                let mut acc = Aabb::EMPTY;
                for &child in children {
                    let child_box = self.object_bounds(child, marks, boxes)?;
                    let child_node = &self.nodes[child.0];
                    if !child_node.hidden {
                        acc = Aabb::surrounding(&acc, &child_node.local.transform_aabb(&child_box));
                    }
                }
                acc
            }
            NodeKind::Reference { target } => {
                let target_box = self.object_bounds(*target, marks, boxes)?;
                let target_node = &self.nodes[target.0];
                if target_node.hidden {
                    Aabb::EMPTY
                } else {
                    target_node.local.transform_aabb(&target_box)
                }
            }
        };

        marks[id.0] = Mark::Done;
        boxes[id.0] = bounds;
        Ok(bounds)
    }

    /// Number of triangles over all meshes.
    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(Mesh::triangle_count).sum()
    }

    /// True if the root draws at least one visible triangle.
    /// Only meaningful after [`Scene::update`].
    pub fn has_geometry(&self) -> bool {
        let root = &self.nodes[self.root.0];
        !root.hidden && !root.bounds.is_empty()
    }
}
