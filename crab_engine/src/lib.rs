//! Crab Engine - 键盘螃蟹的程序化动画核心
//!
//! 提供：
//! - 骨骼系统和 CCD IK 求解
//! - 腿部步态控制（交替落脚）
//! - 乐器姿势状态机
//! - 节拍步进音序器
//! - 待机/移动动画

pub mod animation;
pub mod audio;
pub mod character;
pub mod config;
pub mod gait;
pub mod locomotion;
pub mod pose;
pub mod rig;
pub mod sequencer;
pub mod skeleton;

#[cfg(test)]
pub(crate) mod testing;

pub use animation::{Easing, RigContext, TweenId, TweenManager, TweenSpec, TweenTarget};
pub use audio::{AudioBackend, SoundId};
pub use character::{CrabCharacter, RigEvent};
pub use config::AnimationConfig;
pub use gait::{LegGaitController, LegId, LegState};
pub use locomotion::{IdleAnimator, Locomotion, MoveOutcome};
pub use pose::{Instrument, Pose, PoseRequest, PoseRequestOutcome, PoseStateMachine, PropSet};
pub use sequencer::{BeatClock, BeatSequencer, SoundBank, SoundLoopEntry};
pub use skeleton::{Bone, BoneDesc, BoneId, IkChain, IkSolver, Skeleton};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CrabError {
    #[error("bone not found: {0}")]
    BoneNotFound(String),

    #[error("malformed IK chain: {0}")]
    MalformedChain(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("unknown leg: {0}")]
    UnknownLeg(String),

    #[error("unknown sound: {0}")]
    UnknownSound(String),
}

pub type Result<T> = std::result::Result<T, CrabError>;
