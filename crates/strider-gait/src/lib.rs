//! Stepping and gait coordination.
//!
//! Sits on top of `strider-ik`: per-leg [`Stepper`]s decide when a leg
//! must lift and re-plant its foothold, the [`GaitScheduler`] coordinates
//! which legs may do so each phase window, and the [`Rig`] ties skeleton,
//! chains, steppers, and scheduler into one tick-ordered assembly.
//!
//! # Tick order
//!
//! ```text
//! body sync ─► step transitions ─► chain solves ─► gait evaluation
//! ```
//!
//! Within one tick a stepper always observes that tick's already-solved
//! chain error before deciding to step.

pub mod plugin;
pub mod rig;
pub mod scheduler;
pub mod stepper;

pub use plugin::{BodyDrive, StriderPlugin, StriderRig, SurfaceWorld};
pub use rig::{LegId, Rig};
pub use scheduler::GaitScheduler;
pub use stepper::{Stepper, StepperConfig};
