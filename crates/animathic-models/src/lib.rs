//! Shared data models for animathic.
//!
//! This crate provides the types shared by every other crate in the
//! workspace:
//! - the animation specification (the structured IR between the LLM layer
//!   and the code synthesizer) and its allowlisted vocabulary,
//! - the job entity and its state machine,
//! - the video entity,
//! - the error-kind taxonomy used to coarsen every component's internal
//!   errors into the fixed vocabulary the job coordinator and API expose.

pub mod error_kind;
pub mod job;
pub mod spec;
pub mod video;

pub use error_kind::ErrorKind;
pub use job::{GenerationAttempt, AttemptOutcome, AttemptPhase, Job, JobError, JobId, JobState};
pub use spec::{
    AnimationSpec, CameraDecl, Color, ObjectDecl, ObjectKind, SceneKind, SpecError, Style,
    StepDecl, ActionKind, ACTIONS, COLORS, OBJECT_KINDS,
};
pub use video::{Video, VideoId, VideoStatus};
