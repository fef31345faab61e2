//! A solvable joint chain: ordered constrained joints plus an end effector.

use nalgebra::Vector3;

use strider_core::error::ChainError;
use strider_core::types::{BodyFrame, Target};

use crate::hinge::{AngularScope, HingeJoint};
use crate::skeleton::{BoneId, Skeleton};

/// Foot alignment settings for the joint immediately preceding the end
/// effector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FootConfig {
    /// Offset in degrees from the target surface normal.
    pub angle_offset: f32,
}

/// Why a candidate target cannot be solved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetValidity {
    /// Within reach and inside the root joint's angular scope.
    Reachable,
    /// Farther from the chain root than the chain can extend.
    OutOfReach,
    /// Outside the root joint's allowed angular window.
    OutsideRootScope,
}

/// Ordered sequence of constrained joints (root first) driving a distinct
/// end-effector point.
///
/// The end effector is a plain bone reference, not a constrained joint.
/// `length` is derived once at construction from consecutive pivot
/// distances; `target` and `error` are rewritten every tick.
#[derive(Debug, Clone)]
pub struct Chain {
    joints: Vec<HingeJoint>,
    end_effector: BoneId,
    foot: Option<FootConfig>,
    /// Unscaled chain length; multiply by the body scale for world reach.
    length: f32,
    /// Current foothold target.
    pub target: Target,
    /// End-effector distance to the target after the latest solve.
    pub error: f32,
}

impl Chain {
    /// Build a chain over `joints` (root first) ending at `end_effector`.
    ///
    /// # Errors
    ///
    /// [`ChainError::Empty`] for an empty joint list, and
    /// [`ChainError::EffectorIsJoint`] if the end effector is one of the
    /// constrained joints' bones.
    pub fn new(
        skeleton: &Skeleton,
        joints: Vec<HingeJoint>,
        end_effector: BoneId,
    ) -> Result<Self, ChainError> {
        if joints.is_empty() {
            return Err(ChainError::Empty);
        }
        if joints.iter().any(|j| j.bone() == end_effector) {
            return Err(ChainError::EffectorIsJoint(end_effector.0));
        }

        // Rest-pose pivots at unit scale give the canonical chain length.
        let rest_body = BodyFrame::default();
        let mut length = 0.0;
        let mut previous = joints[0].pivot(skeleton, &rest_body);
        for joint in joints.iter().skip(1) {
            let pivot = joint.pivot(skeleton, &rest_body);
            length += (pivot - previous).norm();
            previous = pivot;
        }
        length += (skeleton.position(end_effector) - previous).norm();

        let end = skeleton.position(end_effector);
        Ok(Self {
            joints,
            end_effector,
            foot: None,
            length,
            target: Target::fallback(end, Vector3::y()),
            error: 0.0,
        })
    }

    /// Enable foot alignment on the last joint.
    #[must_use]
    pub const fn with_foot(mut self, foot: FootConfig) -> Self {
        self.foot = Some(foot);
        self
    }

    #[must_use]
    pub fn dof(&self) -> usize {
        self.joints.len()
    }

    #[must_use]
    pub fn joints(&self) -> &[HingeJoint] {
        &self.joints
    }

    #[must_use]
    pub fn joints_mut(&mut self) -> &mut [HingeJoint] {
        &mut self.joints
    }

    #[must_use]
    pub const fn end_effector(&self) -> BoneId {
        self.end_effector
    }

    #[must_use]
    pub const fn foot(&self) -> Option<FootConfig> {
        self.foot
    }

    /// Unscaled chain length (sum of consecutive pivot distances).
    #[must_use]
    pub const fn length(&self) -> f32 {
        self.length
    }

    /// World position of the chain root (first joint's pivot).
    #[must_use]
    pub fn root_position(&self, skeleton: &Skeleton, body: &BodyFrame) -> Vector3<f32> {
        self.joints[0].pivot(skeleton, body)
    }

    /// World position of the end effector.
    #[must_use]
    pub fn end_position(&self, skeleton: &Skeleton) -> Vector3<f32> {
        skeleton.position(self.end_effector)
    }

    /// Current end-effector distance to the chain's target.
    #[must_use]
    pub fn measure_error(&self, skeleton: &Skeleton) -> f32 {
        (self.end_position(skeleton) - self.target.position).norm()
    }

    /// Check whether `position` is a target the solver can be expected to
    /// reach: within the (scaled) chain length of the root and inside the
    /// root joint's angular window.
    ///
    /// Callers should request a different target on a negative answer
    /// rather than expect the solver to resolve it.
    #[must_use]
    pub fn target_validity(
        &self,
        skeleton: &Skeleton,
        body: &BodyFrame,
        position: &Vector3<f32>,
    ) -> TargetValidity {
        let root = self.root_position(skeleton, body);
        let to_target = position - root;
        if to_target.norm() > self.length * body.scale {
            return TargetValidity::OutOfReach;
        }
        match self.joints[0].scope_of(skeleton, body, &to_target) {
            AngularScope::Within => TargetValidity::Reachable,
            AngularScope::BeforeMin | AngularScope::PastMax => TargetValidity::OutsideRootScope,
        }
    }
}
