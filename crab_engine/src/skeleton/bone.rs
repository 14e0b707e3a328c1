//! 骨骼节点

use glam::{EulerRot, Mat4, Quat, Vec3};

/// 骨骼句柄（加载时分配，生命周期内不变）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoneId(pub(crate) usize);

impl BoneId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// 骨骼节点
///
/// 旋转以 XYZ 顺序欧拉角保存，IK 限制按分量钳制。
#[derive(Clone, Debug)]
pub struct Bone {
    pub name: String,
    pub parent: Option<BoneId>,

    // 本地变换（相对于父骨骼）
    pub position: Vec3,
    pub rotation: Vec3,

    // 静止姿势（加载完成后捕获）
    pub rest_position: Vec3,
    pub rest_rotation: Vec3,

    // 变换结果，由 Skeleton::update_global_transforms 刷新
    pub global_transform: Mat4,
}

impl Bone {
    pub fn new(name: String, parent: Option<BoneId>, position: Vec3, rotation: Vec3) -> Self {
        Self {
            name,
            parent,
            position,
            rotation,
            rest_position: position,
            rest_rotation: rotation,
            global_transform: Mat4::IDENTITY,
        }
    }

    /// 当前本地旋转（四元数）
    pub fn quaternion(&self) -> Quat {
        Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z)
    }

    pub fn set_quaternion(&mut self, q: Quat) {
        let (x, y, z) = q.normalize().to_euler(EulerRot::XYZ);
        self.rotation = Vec3::new(x, y, z);
    }

    /// 本地变换矩阵
    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.quaternion(), self.position)
    }

    /// 恢复到静止姿势
    pub fn reset_to_rest(&mut self) {
        self.position = self.rest_position;
        self.rotation = self.rest_rotation;
    }

    /// 把当前姿势记为静止姿势
    pub fn capture_rest(&mut self) {
        self.rest_position = self.position;
        self.rest_rotation = self.rotation;
    }
}
