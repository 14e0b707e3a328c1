//! 骨骼管理器

use glam::{Mat4, Vec3};
use std::collections::HashMap;

use super::{Bone, BoneDesc, BoneId};
use crate::{CrabError, Result};

/// 骨骼树：按索引和名称查找，拥有所有骨骼
#[derive(Clone, Debug, Default)]
pub struct Skeleton {
    bones: Vec<Bone>,
    name_to_index: HashMap<String, usize>,
}

impl Skeleton {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从外部加载器给出的骨骼描述构建
    ///
    /// 父骨骼必须排在子骨骼之前，这样索引稳定且不可能成环。
    pub fn from_descs(descs: &[BoneDesc]) -> Result<Self> {
        let mut skeleton = Self::new();
        for desc in descs {
            let parent = match &desc.parent {
                Some(parent_name) => Some(skeleton.bone_id(parent_name)?),
                None => None,
            };
            skeleton.add_bone(Bone::new(desc.name.clone(), parent, desc.position, desc.rotation))?;
        }
        skeleton.update_global_transforms();
        log::info!("骨骼构建完成: {} 个骨骼", skeleton.bone_count());
        Ok(skeleton)
    }

    /// 添加骨骼，名称必须唯一，父骨骼必须已存在
    pub fn add_bone(&mut self, bone: Bone) -> Result<BoneId> {
        if self.name_to_index.contains_key(&bone.name) {
            return Err(CrabError::InvalidConfig(format!("duplicate bone name {}", bone.name)));
        }
        if let Some(parent) = bone.parent {
            if parent.0 >= self.bones.len() {
                return Err(CrabError::InvalidConfig(format!(
                    "parent #{} of {} is not loaded yet",
                    parent.0, bone.name
                )));
            }
        }
        let index = self.bones.len();
        self.name_to_index.insert(bone.name.clone(), index);
        self.bones.push(bone);
        Ok(BoneId(index))
    }

    /// 按名称解析骨骼句柄，找不到视为配置错误
    pub fn bone_id(&self, name: &str) -> Result<BoneId> {
        self.find_bone_by_name(name)
            .ok_or_else(|| CrabError::BoneNotFound(name.to_string()))
    }

    /// 通过名称查找骨骼
    pub fn find_bone_by_name(&self, name: &str) -> Option<BoneId> {
        self.name_to_index.get(name).copied().map(BoneId)
    }

    /// 获取骨骼数量
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    /// 按索引获取骨骼
    pub fn get_bone(&self, index: usize) -> Option<&Bone> {
        self.bones.get(index)
    }

    pub fn contains(&self, id: BoneId) -> bool {
        id.0 < self.bones.len()
    }

    /// 句柄只能由本骨骼树产生，越界属于调用方错误
    pub fn bone(&self, id: BoneId) -> &Bone {
        &self.bones[id.0]
    }

    pub fn bone_mut(&mut self, id: BoneId) -> &mut Bone {
        &mut self.bones[id.0]
    }

    /// 沿祖先链组合本地变换得到世界矩阵，O(深度)
    pub fn world_matrix(&self, id: BoneId) -> Mat4 {
        let mut matrix = self.bones[id.0].local_matrix();
        let mut parent = self.bones[id.0].parent;
        while let Some(p) = parent {
            matrix = self.bones[p.0].local_matrix() * matrix;
            parent = self.bones[p.0].parent;
        }
        matrix
    }

    /// 骨骼的世界坐标
    pub fn world_position(&self, id: BoneId) -> Vec3 {
        self.world_matrix(id).w_axis.truncate()
    }

    /// 把世界坐标转换到某骨骼的本地空间
    pub fn world_to_local(&self, id: BoneId, world: Vec3) -> Vec3 {
        self.world_matrix(id).inverse().transform_point3(world)
    }

    /// 刷新所有骨骼的全局变换缓存
    ///
    /// 父骨骼总在前面，一次正向遍历即可。
    pub fn update_global_transforms(&mut self) {
        for i in 0..self.bones.len() {
            let local = self.bones[i].local_matrix();
            self.bones[i].global_transform = match self.bones[i].parent {
                Some(p) => self.bones[p.0].global_transform * local,
                None => local,
            };
        }
    }

    /// 把所有骨骼的当前姿势记为静止姿势
    pub fn capture_rest(&mut self) {
        for bone in &mut self.bones {
            bone.capture_rest();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_tree() -> Skeleton {
        Skeleton::from_descs(&[
            BoneDesc::new("root", None, Vec3::ZERO),
            BoneDesc::new("body_back", Some("root"), Vec3::new(0.0, 4.0, 0.0)),
            BoneDesc::new("arm_1L", Some("body_back"), Vec3::new(1.0, 0.0, 0.0))
                .with_rotation(Vec3::new(0.0, 0.0, std::f32::consts::FRAC_PI_2)),
            BoneDesc::new("arm_2L", Some("arm_1L"), Vec3::new(1.0, 0.0, 0.0)),
        ])
        .unwrap()
    }

    #[test]
    fn test_lookup_by_name() {
        let skeleton = small_tree();
        assert_eq!(skeleton.bone_count(), 4);
        assert_eq!(skeleton.bone_id("arm_1L").unwrap().index(), 2);
        assert!(matches!(skeleton.bone_id("leg_front_1L"), Err(CrabError::BoneNotFound(_))));
    }

    #[test]
    fn test_world_position_walks_ancestors() {
        let skeleton = small_tree();
        let arm_2 = skeleton.bone_id("arm_2L").unwrap();
        // arm_1L 绕 Z 转 90°，子骨骼的 +X 偏移变成 +Y
        let pos = skeleton.world_position(arm_2);
        assert!((pos - Vec3::new(1.0, 5.0, 0.0)).length() < 1e-5);

        let local = skeleton.world_to_local(skeleton.bone_id("root").unwrap(), pos);
        assert!((local - pos).length() < 1e-5);
    }

    #[test]
    fn test_cached_globals_match_walk() {
        let mut skeleton = small_tree();
        let arm_1 = skeleton.bone_id("arm_1L").unwrap();
        skeleton.bone_mut(arm_1).rotation.z = 0.4;
        skeleton.update_global_transforms();
        let arm_2 = skeleton.bone_id("arm_2L").unwrap();
        let cached = skeleton.bone(arm_2).global_transform.w_axis.truncate();
        assert!((cached - skeleton.world_position(arm_2)).length() < 1e-5);
    }

    #[test]
    fn test_parent_must_precede_child() {
        let result = Skeleton::from_descs(&[
            BoneDesc::new("arm_2L", Some("arm_1L"), Vec3::ZERO),
            BoneDesc::new("arm_1L", None, Vec3::ZERO),
        ]);
        assert!(result.is_err());
    }
}
