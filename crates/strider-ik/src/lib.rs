//! Constrained-joint inverse kinematics for multi-legged rigs.
//!
//! Provides a world-space bone registry, hinge and ball-joint constraints,
//! and an iterative Cyclic Coordinate Descent (CCD) solver that rotates a
//! chain of constrained joints toward a foothold target.
//!
//! # Architecture
//!
//! ```text
//! Skeleton ──► Chain (HingeJoints + end effector) ──► CcdSolver ──► rotated bones
//! ```
//!
//! A [`Chain`] references bones in a [`Skeleton`] by handle. The solver
//! mutates bone poses in place through each joint's [`HingeJoint`]
//! constraint; ball joints clamp orientations through [`SwingTwistLimit`].

pub mod chain;
pub mod ellipse;
pub mod hinge;
pub mod math;
pub mod skeleton;
pub mod solver;
pub mod swing_twist;

pub use chain::{Chain, FootConfig, TargetValidity};
pub use ellipse::Ellipse;
pub use hinge::{AngularScope, AxisSpec, HingeJoint};
pub use skeleton::{BoneId, Skeleton};
pub use solver::{CcdConfig, CcdResult, CcdSolver};
pub use swing_twist::SwingTwistLimit;
