//! IK 求解器（CCD）

use glam::{Quat, Vec3};

use super::{BoneId, Skeleton};
use crate::{CrabError, Result};

/// 小于该角度的修正直接跳过
const MIN_ANGLE: f32 = 1e-5;

/// IK 链接信息
#[derive(Clone, Debug)]
pub struct IkLink {
    pub bone: BoneId,
    pub rotation_min: Option<Vec3>,
    pub rotation_max: Option<Vec3>,
}

impl IkLink {
    pub fn free(bone: BoneId) -> Self {
        Self { bone, rotation_min: None, rotation_max: None }
    }

    pub fn limited(bone: BoneId, min: Vec3, max: Vec3) -> Self {
        Self { bone, rotation_min: Some(min), rotation_max: Some(max) }
    }

    /// 按分量把欧拉角钳制到 [min, max]
    pub fn clamp(&self, rotation: Vec3) -> Vec3 {
        let mut r = rotation;
        if let Some(min) = self.rotation_min {
            r = r.max(min);
        }
        if let Some(max) = self.rotation_max {
            r = r.min(max);
        }
        r
    }
}

/// IK 链：链接按 末端 → 根部 排列
#[derive(Clone, Debug)]
pub struct IkChain {
    pub target: BoneId,
    pub effector: BoneId,
    pub links: Vec<IkLink>,
    pub iterations: u32,
}

impl IkChain {
    /// 无角度限制的链
    pub fn new(target: BoneId, effector: BoneId, links: &[BoneId], iterations: u32) -> Self {
        Self {
            target,
            effector,
            links: links.iter().copied().map(IkLink::free).collect(),
            iterations,
        }
    }

    /// 带角度限制的链，限制数组长度必须和链接数一致
    pub fn with_limits(
        target: BoneId,
        effector: BoneId,
        links: &[BoneId],
        rotation_min: &[Vec3],
        rotation_max: &[Vec3],
        iterations: u32,
    ) -> Result<Self> {
        if rotation_min.len() != links.len() || rotation_max.len() != links.len() {
            return Err(CrabError::MalformedChain(format!(
                "{} links but {} min / {} max limits",
                links.len(),
                rotation_min.len(),
                rotation_max.len()
            )));
        }
        let links = links
            .iter()
            .zip(rotation_min.iter().zip(rotation_max))
            .map(|(&bone, (&min, &max))| IkLink::limited(bone, min, max))
            .collect();
        Ok(Self { target, effector, links, iterations })
    }
}

/// IK 求解器
#[derive(Clone, Debug)]
pub struct IkSolver {
    chains: Vec<IkChain>,
}

impl IkSolver {
    /// 检查所有链都引用本骨骼树中的骨骼
    pub fn new(skeleton: &Skeleton, chains: Vec<IkChain>) -> Result<Self> {
        for (i, chain) in chains.iter().enumerate() {
            if chain.iterations == 0 {
                return Err(CrabError::MalformedChain(format!("chain #{} has zero iterations", i)));
            }
            if chain.links.is_empty() {
                return Err(CrabError::MalformedChain(format!("chain #{} has no links", i)));
            }
            let all_bones = [chain.target, chain.effector]
                .into_iter()
                .chain(chain.links.iter().map(|l| l.bone));
            for bone in all_bones {
                if !skeleton.contains(bone) {
                    return Err(CrabError::MalformedChain(format!(
                        "chain #{} references missing bone #{}",
                        i,
                        bone.index()
                    )));
                }
            }
            for link in &chain.links {
                if let (Some(min), Some(max)) = (link.rotation_min, link.rotation_max) {
                    if min.cmpgt(max).any() {
                        return Err(CrabError::MalformedChain(format!(
                            "chain #{} link {} has min > max",
                            i,
                            skeleton.bone(link.bone).name
                        )));
                    }
                }
            }
        }
        log::info!("IK 求解器创建完成: {} 条链", chains.len());
        Ok(Self { chains })
    }

    pub fn chains(&self) -> &[IkChain] {
        &self.chains
    }

    /// 对所有链执行一次求解
    pub fn solve(&self, skeleton: &mut Skeleton) {
        for chain in &self.chains {
            Self::solve_chain(chain, skeleton);
        }
    }

    /// 单条链的 CCD 求解
    pub fn solve_chain(chain: &IkChain, skeleton: &mut Skeleton) {
        let target_pos = skeleton.world_position(chain.target);

        for _ in 0..chain.iterations {
            let mut rotated = false;

            for link in &chain.links {
                let link_matrix = skeleton.world_matrix(link.bone);
                let (_, link_rot, link_pos) = link_matrix.to_scale_rotation_translation();
                let inv_link_rot = link_rot.inverse();

                // 在链接骨骼的本地空间中比较方向
                let effector_pos = skeleton.world_position(chain.effector);
                let effector_vec = (inv_link_rot * (effector_pos - link_pos)).normalize_or_zero();
                let target_vec = (inv_link_rot * (target_pos - link_pos)).normalize_or_zero();
                if effector_vec == Vec3::ZERO || target_vec == Vec3::ZERO {
                    continue;
                }

                let angle = target_vec.dot(effector_vec).clamp(-1.0, 1.0).acos();
                if angle < MIN_ANGLE {
                    continue;
                }

                let axis = effector_vec.cross(target_vec).normalize_or_zero();
                if axis == Vec3::ZERO {
                    continue;
                }

                let bone = skeleton.bone_mut(link.bone);
                let rotation = bone.quaternion() * Quat::from_axis_angle(axis, angle);
                bone.set_quaternion(rotation);
                bone.rotation = link.clamp(bone.rotation);
                rotated = true;
            }

            if !rotated {
                break;
            }
        }

        // 跳过的链接也要满足限制
        for link in &chain.links {
            let bone = skeleton.bone_mut(link.bone);
            bone.rotation = link.clamp(bone.rotation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::BoneDesc;

    /// 两节平面手臂，长度各 1，外加一个挂在 root 下的目标
    fn two_link_arm(target: Vec3) -> (Skeleton, IkChain) {
        let skeleton = Skeleton::from_descs(&[
            BoneDesc::new("root", None, Vec3::ZERO),
            BoneDesc::new("arm_1L", Some("root"), Vec3::ZERO),
            BoneDesc::new("arm_2L", Some("arm_1L"), Vec3::new(1.0, 0.0, 0.0)),
            BoneDesc::new("arm_effectorL", Some("arm_2L"), Vec3::new(1.0, 0.0, 0.0)),
            BoneDesc::new("arm_targetL", Some("root"), target),
        ])
        .unwrap();
        let id = |name| skeleton.bone_id(name).unwrap();
        let chain = IkChain::new(id("arm_targetL"), id("arm_effectorL"), &[id("arm_2L"), id("arm_1L")], 10);
        (skeleton, chain)
    }

    #[test]
    fn test_reaches_reachable_target() {
        let (mut skeleton, chain) = two_link_arm(Vec3::new(1.0, 1.0, 0.0));
        let solver = IkSolver::new(&skeleton, vec![chain.clone()]).unwrap();
        for _ in 0..20 {
            solver.solve(&mut skeleton);
        }
        let effector = skeleton.world_position(chain.effector);
        assert!((effector - Vec3::new(1.0, 1.0, 0.0)).length() < 1e-2);
    }

    #[test]
    fn test_already_solved_chain_is_untouched() {
        let (mut skeleton, chain) = two_link_arm(Vec3::new(2.0, 0.0, 0.0));
        let solver = IkSolver::new(&skeleton, vec![chain.clone()]).unwrap();
        let before: Vec<Vec3> = chain.links.iter().map(|l| skeleton.bone(l.bone).rotation).collect();
        solver.solve(&mut skeleton);
        for (link, prev) in chain.links.iter().zip(before) {
            assert!((skeleton.bone(link.bone).rotation - prev).length() < 1e-4);
        }
    }

    #[test]
    fn test_rotation_stays_inside_limits() {
        let (mut skeleton, chain) = two_link_arm(Vec3::new(-1.0, 1.5, 0.5));
        let limit = Vec3::splat(0.3);
        let links: Vec<BoneId> = chain.links.iter().map(|l| l.bone).collect();
        let limited = IkChain::with_limits(
            chain.target,
            chain.effector,
            &links,
            &[-limit, -limit],
            &[limit, limit],
            3,
        )
        .unwrap();
        let solver = IkSolver::new(&skeleton, vec![limited.clone()]).unwrap();
        for _ in 0..10 {
            solver.solve(&mut skeleton);
            for link in &limited.links {
                let r = skeleton.bone(link.bone).rotation;
                assert!(r.cmpge(-limit - Vec3::splat(1e-5)).all(), "{:?}", r);
                assert!(r.cmple(limit + Vec3::splat(1e-5)).all(), "{:?}", r);
            }
        }
    }

    #[test]
    fn test_unequal_limit_arrays_are_rejected() {
        let (skeleton, chain) = two_link_arm(Vec3::ONE);
        let links: Vec<BoneId> = chain.links.iter().map(|l| l.bone).collect();
        let result = IkChain::with_limits(chain.target, chain.effector, &links, &[Vec3::ZERO], &[Vec3::ZERO, Vec3::ZERO], 3);
        assert!(matches!(result, Err(CrabError::MalformedChain(_))));

        let broken = IkChain::new(chain.target, BoneId(99), &links, 3);
        assert!(IkSolver::new(&skeleton, vec![broken]).is_err());
    }
}
