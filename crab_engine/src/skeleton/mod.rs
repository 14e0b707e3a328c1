//! 骨骼系统和 IK 求解器

mod bone;
mod ik_solver;
mod manager;

pub use bone::{Bone, BoneId};
pub use ik_solver::{IkChain, IkLink, IkSolver};
pub use manager::Skeleton;

use glam::Vec3;

/// 外部加载器提供的骨骼描述（绑定姿势下的本地变换）
#[derive(Clone, Debug)]
pub struct BoneDesc {
    pub name: String,
    pub parent: Option<String>,
    pub position: Vec3,
    /// XYZ 顺序欧拉角（弧度）
    pub rotation: Vec3,
}

impl BoneDesc {
    pub fn new(name: impl Into<String>, parent: Option<&str>, position: Vec3) -> Self {
        Self {
            name: name.into(),
            parent: parent.map(str::to_string),
            position,
            rotation: Vec3::ZERO,
        }
    }

    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }
}
