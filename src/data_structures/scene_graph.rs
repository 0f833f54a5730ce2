//! Scene graph and hierarchical scene organization.
//!
//! Nodes live in a flat arena and refer to each other by [`NodeId`]. A node
//! is either a container (a pivot that only carries a transform) or a model
//! that draws one geometry with one material. Parents are always inserted
//! before their children, so world transforms are computed in one forward
//! pass over the arena.

use log::warn;

use crate::data_structures::instance::{Instance, InstanceRaw};

/// Index of a node in the [`SceneGraph`] arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Index of a mesh in the renderer's geometry list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GeometryId(pub usize);

/// Index of a material in the renderer's material list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NodeKind {
    Container,
    Model {
        geometry: GeometryId,
        material: MaterialId,
        cast_shadow: bool,
    },
}

#[derive(Clone, Debug)]
pub struct SceneNode {
    pub name: String,
    pub kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// (local, world)
    instance: (Instance, Instance),
}

/// A model node flattened for drawing.
#[derive(Clone, Copy, Debug)]
pub struct Renderable {
    pub id: NodeId,
    pub geometry: GeometryId,
    pub material: MaterialId,
    pub cast_shadow: bool,
    pub world: Instance,
}

impl Renderable {
    pub fn to_raw(&self) -> InstanceRaw {
        self.world.to_raw()
    }
}

#[derive(Clone, Debug, Default)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds a pivot node. `parent` must already be in the graph.
    pub fn add_container(
        &mut self,
        name: &str,
        parent: Option<NodeId>,
        local: Instance,
    ) -> NodeId {
        self.insert(name, NodeKind::Container, parent, local)
    }

    /// Adds a node drawing `geometry` with `material`.
    pub fn add_model(
        &mut self,
        name: &str,
        parent: Option<NodeId>,
        local: Instance,
        geometry: GeometryId,
        material: MaterialId,
        cast_shadow: bool,
    ) -> NodeId {
        let kind = NodeKind::Model {
            geometry,
            material,
            cast_shadow,
        };
        self.insert(name, kind, parent, local)
    }

    fn insert(
        &mut self,
        name: &str,
        kind: NodeKind,
        parent: Option<NodeId>,
        local: Instance,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        // A parent that doesn't exist yet would break the forward pass
        let parent = parent.filter(|p| {
            let known = p.0 < self.nodes.len();
            if !known {
                warn!("Parent {:?} of {name} is not in the scene graph, adding it as a root.", p);
            }
            known
        });
        if let Some(p) = parent {
            self.nodes[p.0].children.push(id);
        }
        let world = match parent {
            Some(p) => &self.nodes[p.0].instance.1 * &local,
            None => local,
        };
        self.nodes.push(SceneNode {
            name: name.to_string(),
            kind,
            parent,
            children: Vec::new(),
            instance: (local, world),
        });
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0)
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|node| node.name == name)
            .map(NodeId)
    }

    pub fn get_parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|node| node.parent)
    }

    pub fn get_children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn get_local_transform(&self, id: NodeId) -> Option<Instance> {
        self.nodes.get(id.0).map(|node| node.instance.0)
    }

    /// World transform as of the last [`SceneGraph::update_world_transforms`].
    pub fn get_world_transform(&self, id: NodeId) -> Option<Instance> {
        self.nodes.get(id.0).map(|node| node.instance.1)
    }

    pub fn set_local_transform(&mut self, id: NodeId, instance: Instance) {
        match self.nodes.get_mut(id.0) {
            Some(node) => node.instance.0 = instance,
            None => warn!("Tried to transform unknown node {:?}.", id),
        }
    }

    pub fn local_transform_mut(&mut self, id: NodeId) -> Option<&mut Instance> {
        self.nodes.get_mut(id.0).map(|node| &mut node.instance.0)
    }

    /// Recomputes every world transform as `parent_world * local`.
    pub fn update_world_transforms(&mut self) {
        for i in 0..self.nodes.len() {
            let local = self.nodes[i].instance.0;
            let world = match self.nodes[i].parent {
                Some(p) => &self.nodes[p.0].instance.1 * &local,
                None => local,
            };
            self.nodes[i].instance.1 = world;
        }
    }

    /// All model nodes in insertion order, with their current world transforms.
    pub fn renderables(&self) -> impl Iterator<Item = Renderable> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, node)| match node.kind {
                NodeKind::Model {
                    geometry,
                    material,
                    cast_shadow,
                } => Some(Renderable {
                    id: NodeId(i),
                    geometry,
                    material,
                    cast_shadow,
                    world: node.instance.1,
                }),
                NodeKind::Container => None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{InnerSpace, Rad, Vector3};

    #[test]
    fn children_are_linked_to_their_parent() {
        let mut graph = SceneGraph::new();
        let root = graph.add_container("root", None, Instance::new());
        let a = graph.add_container("a", Some(root), Instance::new());
        let b = graph.add_model(
            "b",
            Some(a),
            Instance::new(),
            GeometryId(0),
            MaterialId(0),
            false,
        );

        assert_eq!(graph.get_children(root), &[a]);
        assert_eq!(graph.get_children(a), &[b]);
        assert_eq!(graph.get_parent(b), Some(a));
        assert_eq!(graph.get_parent(root), None);
        assert_eq!(graph.find("b"), Some(b));
    }

    #[test]
    fn unknown_parent_becomes_root() {
        let mut graph = SceneGraph::new();
        let id = graph.add_container("orphan", Some(NodeId(7)), Instance::new());
        assert_eq!(graph.get_parent(id), None);
    }

    #[test]
    fn world_transform_follows_rotating_parent() {
        let mut graph = SceneGraph::new();
        let pivot = graph.add_container("pivot", None, Instance::new());
        let child = graph.add_container(
            "child",
            Some(pivot),
            Instance::new().with_position(Vector3::new(10.0, 0.0, 0.0)),
        );

        let mut rotated = Instance::new();
        rotated.set_rotation_y(Rad(std::f32::consts::PI));
        graph.set_local_transform(pivot, rotated);
        graph.update_world_transforms();

        let world = graph.get_world_transform(child).unwrap();
        assert!((world.position - Vector3::new(-10.0, 0.0, 0.0)).magnitude() < 1e-4);
    }

    #[test]
    fn renderables_skip_containers() {
        let mut graph = SceneGraph::new();
        let root = graph.add_container("root", None, Instance::new());
        graph.add_model(
            "sphere",
            Some(root),
            Instance::new().with_uniform_scale(2.0),
            GeometryId(0),
            MaterialId(3),
            true,
        );
        graph.update_world_transforms();

        let renderables: Vec<_> = graph.renderables().collect();
        assert_eq!(renderables.len(), 1);
        assert_eq!(renderables[0].material, MaterialId(3));
        assert!(renderables[0].cast_shadow);
        assert_eq!(renderables[0].world.scale, Vector3::new(2.0, 2.0, 2.0));
    }
}
