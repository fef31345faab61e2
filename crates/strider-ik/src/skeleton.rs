//! World-space bone registry.
//!
//! Bones are stored flat and referenced by [`BoneId`] handles; constraints
//! and chains hold handles rather than references, so the whole rig forms
//! an acyclic graph with a single owner. Poses are kept in world space:
//! rotating a joint rotates the bone *and its whole subtree* in place,
//! which is exactly what the CCD solver needs every sweep.

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};

/// Handle to a bone in a [`Skeleton`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoneId(pub usize);

#[derive(Debug, Clone)]
struct Bone {
    name: String,
    parent: Option<BoneId>,
    pose: Isometry3<f32>,
}

/// Flat registry of named, world-space bone poses.
#[derive(Debug, Clone, Default)]
pub struct Skeleton {
    bones: Vec<Bone>,
    children: Vec<Vec<BoneId>>,
}

impl Skeleton {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root bone (no parent) at the given world pose.
    pub fn add_root(&mut self, name: impl Into<String>, pose: Isometry3<f32>) -> BoneId {
        self.push(name.into(), None, pose)
    }

    /// Add a bone under `parent` at the given *world* pose.
    pub fn add_bone(
        &mut self,
        name: impl Into<String>,
        parent: BoneId,
        pose: Isometry3<f32>,
    ) -> BoneId {
        let id = self.push(name.into(), Some(parent), pose);
        self.children[parent.0].push(id);
        id
    }

    fn push(&mut self, name: String, parent: Option<BoneId>, pose: Isometry3<f32>) -> BoneId {
        let id = BoneId(self.bones.len());
        self.bones.push(Bone { name, parent, pose });
        self.children.push(Vec::new());
        id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Look up a bone by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<BoneId> {
        self.bones
            .iter()
            .position(|b| b.name == name)
            .map(BoneId)
    }

    /// Root bones (bones with no parent).
    pub fn roots(&self) -> impl Iterator<Item = BoneId> + '_ {
        self.bones
            .iter()
            .enumerate()
            .filter(|(_, b)| b.parent.is_none())
            .map(|(i, _)| BoneId(i))
    }

    /// Bone name.
    #[must_use]
    pub fn name(&self, id: BoneId) -> &str {
        &self.bones[id.0].name
    }

    /// World-space pose.
    #[must_use]
    pub fn pose(&self, id: BoneId) -> &Isometry3<f32> {
        &self.bones[id.0].pose
    }

    /// World-space position.
    #[must_use]
    pub fn position(&self, id: BoneId) -> Vector3<f32> {
        self.bones[id.0].pose.translation.vector
    }

    /// World-space orientation.
    #[must_use]
    pub fn rotation(&self, id: BoneId) -> UnitQuaternion<f32> {
        self.bones[id.0].pose.rotation
    }

    /// Rotate a bone and all of its descendants about a world-space pivot.
    pub fn rotate_about(
        &mut self,
        root: BoneId,
        rotation: &UnitQuaternion<f32>,
        pivot: &Vector3<f32>,
    ) {
        self.for_subtree(root, |bone| {
            let t = bone.pose.translation.vector;
            bone.pose.translation = Translation3::from(pivot + rotation * (t - pivot));
            bone.pose.rotation = rotation * bone.pose.rotation;
        });
    }

    /// Translate a bone and all of its descendants.
    pub fn translate_subtree(&mut self, root: BoneId, delta: &Vector3<f32>) {
        self.for_subtree(root, |bone| {
            bone.pose.translation.vector += delta;
        });
    }

    fn for_subtree(&mut self, root: BoneId, mut f: impl FnMut(&mut Bone)) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            f(&mut self.bones[id.0]);
            stack.extend(self.children[id.0].iter().copied());
        }
    }
}
