//! Scene graph: nodes, components, and the shared draw traversal

mod camera;
mod light;
mod transform;

pub use camera::*;
pub use light::*;
pub use transform::*;

use crate::resources::{Material, Mesh};
use crate::EntityId;
use glam::Mat4;
use std::sync::Arc;

/// A mesh paired with the material it is drawn with
#[derive(Clone)]
pub struct Primitive {
    pub mesh: Arc<Mesh>,
    pub material: Arc<Material>,
}

impl Primitive {
    pub fn new(mesh: Arc<Mesh>, material: Arc<Material>) -> Self {
        Self { mesh, material }
    }
}

/// Renderable model: an ordered sequence of primitives
#[derive(Clone, Default)]
pub struct Model {
    pub primitives: Vec<Primitive>,
}

impl Model {
    pub fn new(primitives: Vec<Primitive>) -> Self {
        Self { primitives }
    }

    pub fn single(mesh: Arc<Mesh>, material: Arc<Material>) -> Self {
        Self {
            primitives: vec![Primitive::new(mesh, material)],
        }
    }
}

/// Hierarchical scene entity.
///
/// Components are explicit optional fields resolved at construction time,
/// not looked up by runtime type. A node's global transform is the product
/// of its ancestors' local transforms, recomputed every traversal.
pub struct Node {
    id: EntityId,
    pub name: String,
    pub transform: Transform,
    pub camera: Option<Camera>,
    pub light: Option<DirectionalLight>,
    pub model: Option<Model>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(name: &str) -> Self {
        Self {
            id: EntityId::next(),
            name: name.to_string(),
            transform: Transform::default(),
            camera: None,
            light: None,
            model: None,
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_camera(mut self, camera: Camera) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn with_light(mut self, light: DirectionalLight) -> Self {
        self.light = Some(light);
        self
    }

    pub fn with_model(mut self, model: Model) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn add_child(&mut self, child: Node) {
        self.children.push(child);
    }

    /// Depth-first pre-order search by name
    pub fn find(&self, name: &str) -> Option<&Node> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Node> {
        if self.name == name {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|child| child.find_mut(name))
    }
}

/// The scene: a single root node owning the whole hierarchy
pub struct Scene {
    pub root: Node,
}

impl Scene {
    pub fn new(root: Node) -> Self {
        Self { root }
    }

    /// Named node lookup, depth-first pre-order
    pub fn find(&self, name: &str) -> Option<&Node> {
        self.root.find(name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.root.find_mut(name)
    }

    /// Global transform of a node in this scene, the product of its
    /// ancestors' local matrices. Recomputed on every call, never cached.
    pub fn global_matrix(&self, target: EntityId) -> Option<Mat4> {
        fn walk(node: &Node, target: EntityId, parent: Mat4) -> Option<Mat4> {
            let global = parent * node.transform.local_matrix();
            if node.id() == target {
                return Some(global);
            }
            node.children
                .iter()
                .find_map(|child| walk(child, target, global))
        }
        walk(&self.root, target, Mat4::IDENTITY)
    }
}

/// One visited node in a planned frame: its resolved global transform and
/// the derived normal matrix. Every node gets an entry, model or not.
pub struct DrawItem<'s> {
    pub node: &'s Node,
    pub model_matrix: Mat4,
    pub normal_matrix: Mat4,
}

impl DrawItem<'_> {
    /// Model uniform payload for this node, uploaded once per pass
    pub fn uniform_data(&self) -> ModelUniformData {
        ModelUniformData {
            model: self.model_matrix,
            normal: self.normal_matrix,
        }
    }
}

/// Planned traversal of a scene graph, shared by the shadow and forward
/// passes. Planning walks the hierarchy depth-first pre-order, passing the
/// accumulated parent matrix down each recursive call as an explicit
/// parameter; the passes then upload uniforms from and replay this list.
pub struct DrawList<'s> {
    pub items: Vec<DrawItem<'s>>,
}

impl<'s> DrawList<'s> {
    pub fn plan(root: &'s Node) -> Self {
        fn visit<'s>(node: &'s Node, parent: Mat4, out: &mut Vec<DrawItem<'s>>) {
            let global = parent * node.transform.local_matrix();
            out.push(DrawItem {
                node,
                model_matrix: global,
                normal_matrix: normal_matrix(global),
            });
            for child in &node.children {
                visit(child, global, out);
            }
        }

        let mut items = Vec::new();
        visit(root, Mat4::IDENTITY, &mut items);
        Self { items }
    }

    /// Number of indexed draw calls this plan produces in a single pass
    pub fn draw_count(&self) -> usize {
        self.items
            .iter()
            .filter_map(|item| item.node.model.as_ref())
            .map(|model| model.primitives.len())
            .sum()
    }

    /// Number of model-uniform uploads a pass performs for this plan, one
    /// per visited node whether or not the node draws
    pub fn upload_count(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn mat4_close(a: Mat4, b: Mat4) -> bool {
        a.to_cols_array()
            .iter()
            .zip(b.to_cols_array().iter())
            .all(|(x, y)| (x - y).abs() < 1e-5)
    }

    fn mesh_node(name: &str) -> Node {
        let mesh = Arc::new(Mesh::cube());
        let material = Arc::new(Material::tinted("gray", [0.5, 0.5, 0.5, 1.0]));
        Node::new(name).with_model(Model::single(mesh, material))
    }

    #[test]
    fn root_global_matrix_is_its_local_matrix() {
        let root = Node::new("root")
            .with_transform(Transform::from_translation(Vec3::new(1.0, 0.0, 0.0)));
        let local = root.transform.local_matrix();
        let scene = Scene::new(root);
        let global = scene.global_matrix(scene.root.id()).unwrap();
        assert!(mat4_close(global, local));
    }

    #[test]
    fn child_global_is_parent_global_times_local() {
        let child = Node::new("child")
            .with_transform(Transform::from_translation(Vec3::new(0.0, 2.0, 0.0)));
        let child_id = child.id();
        let root = Node::new("root")
            .with_transform(Transform::from_translation_scale(
                Vec3::new(5.0, 0.0, 0.0),
                Vec3::splat(2.0),
            ))
            .with_child(child);
        let scene = Scene::new(root);

        let parent_global = scene.global_matrix(scene.root.id()).unwrap();
        let child_local = scene.root.children[0].transform.local_matrix();
        let expected = parent_global * child_local;
        assert!(mat4_close(scene.global_matrix(child_id).unwrap(), expected));

        // translation scales through the parent
        let w = scene.global_matrix(child_id).unwrap().w_axis;
        assert!((w.x - 5.0).abs() < 1e-5);
        assert!((w.y - 4.0).abs() < 1e-5);
    }

    #[test]
    fn plan_visits_depth_first_pre_order() {
        let root = Node::new("root")
            .with_child(Node::new("a").with_child(Node::new("a1")))
            .with_child(Node::new("b"));
        let plan = DrawList::plan(&root);
        let order: Vec<&str> = plan.items.iter().map(|i| i.node.name.as_str()).collect();
        assert_eq!(order, vec!["root", "a", "a1", "b"]);
    }

    #[test]
    fn plan_matrices_match_scene_global_matrices() {
        let mut root = Node::new("root")
            .with_transform(Transform::from_components(
                Vec3::new(1.0, 2.0, 3.0),
                Vec3::new(0.3, 0.0, 0.0),
                Vec3::ONE,
            ));
        root.add_child(
            Node::new("child").with_transform(Transform::from_translation(Vec3::X)),
        );
        let scene = Scene::new(root);

        let plan = DrawList::plan(&scene.root);
        for item in &plan.items {
            let expected = scene.global_matrix(item.node.id()).unwrap();
            assert!(mat4_close(item.model_matrix, expected));
        }
    }

    #[test]
    fn empty_node_gets_an_item_and_an_upload_but_no_draws() {
        let root = Node::new("empty");
        let plan = DrawList::plan(&root);
        assert_eq!(plan.items.len(), 1);
        assert_eq!(plan.upload_count(), 1);
        assert_eq!(plan.draw_count(), 0);
    }

    #[test]
    fn transform_only_nodes_still_get_a_uniform_upload() {
        // a rotating group node with no model of its own
        let root = Node::new("root").with_child(
            Node::new("group")
                .with_transform(Transform::from_translation(Vec3::new(2.0, 0.0, 0.0)))
                .with_child(mesh_node("ball")),
        );
        let scene = Scene::new(root);

        let plan = DrawList::plan(&scene.root);
        assert_eq!(plan.upload_count(), 3);
        assert_eq!(plan.draw_count(), 1);

        let group = plan.items.iter().find(|i| i.node.name == "group").unwrap();
        let data = group.uniform_data();
        let expected = scene.global_matrix(group.node.id()).unwrap();
        assert!(mat4_close(data.model, expected));
        assert!(mat4_close(data.normal, normal_matrix(expected)));
    }

    #[test]
    fn nodes_without_models_still_propagate_transforms() {
        let leaf = mesh_node("leaf");
        let leaf_id = leaf.id();
        let group = Node::new("group")
            .with_transform(Transform::from_translation(Vec3::new(0.0, 0.0, -3.0)))
            .with_child(leaf);
        let scene = Scene::new(Node::new("root").with_child(group));

        let global = scene.global_matrix(leaf_id).unwrap();
        assert!((global.w_axis.z - -3.0).abs() < 1e-5);
        assert_eq!(DrawList::plan(&scene.root).draw_count(), 1);
    }

    #[test]
    fn single_primitive_scene_plans_one_draw() {
        // root -> cameraNode, lightNode, meshNode(one primitive, identity transform)
        let root = Node::new("root")
            .with_child(Node::new("camera").with_camera(Camera::default()))
            .with_child(Node::new("light").with_light(DirectionalLight::default()))
            .with_child(mesh_node("mesh"));
        let scene = Scene::new(root);

        let plan = DrawList::plan(&scene.root);
        assert_eq!(plan.items.len(), 4);
        assert_eq!(plan.draw_count(), 1);

        let mesh_item = plan
            .items
            .iter()
            .find(|i| i.node.name == "mesh")
            .unwrap();
        assert!(mat4_close(mesh_item.model_matrix, Mat4::IDENTITY));
        let model = mesh_item.node.model.as_ref().unwrap();
        assert_eq!(model.primitives[0].mesh.index_count(), 36);
    }

    #[test]
    fn find_locates_nested_nodes() {
        let root = Node::new("root")
            .with_child(Node::new("a").with_child(Node::new("target")))
            .with_child(Node::new("target"));
        let scene = Scene::new(root);
        // pre-order: the nested one comes first
        let found = scene.find("target").unwrap();
        assert_eq!(found.id(), scene.root.children[0].children[0].id());
        assert!(scene.find("missing").is_none());
    }
}
