//! 螃蟹骨骼表和 IK 链定义

use glam::Vec3;

use super::{link_limits, ChainClass, LegId, LegPair, LimitDeltas, Side};
use crate::config::AnimationConfig;
use crate::skeleton::{BoneId, IkChain, IkSolver, Skeleton};
use crate::Result;

/// 螃蟹模型的骨骼层级（名称, 父骨骼），顺序即加载后的索引
///
/// 0 root, 1 body_back, 2..=25 左腿和左臂, 26 body_front,
/// 27..=50 右腿和右臂, 51..=58 八个腿部目标（挂在 root 下）。
pub fn crab_bone_hierarchy() -> Vec<(String, Option<String>)> {
    let mut bones: Vec<(String, Option<String>)> = Vec::with_capacity(59);
    let mut push = |name: String, parent: Option<String>| bones.push((name, parent));

    push("root".into(), None);
    push("body_back".into(), Some("root".into()));

    for side in Side::BOTH {
        let s = side.suffix();
        for pair in LegPair::ALL {
            let p = pair.name();
            push(format!("leg_{p}_1{s}"), Some("body_back".into()));
            push(format!("leg_{p}_2{s}"), Some(format!("leg_{p}_1{s}")));
            push(format!("leg_{p}_3{s}"), Some(format!("leg_{p}_2{s}")));
            push(format!("leg_{p}_effector{s}"), Some(format!("leg_{p}_3{s}")));
        }
        push(format!("arm_1{s}"), Some("body_back".into()));
        for i in 2..=4 {
            push(format!("arm_{i}{s}"), Some(format!("arm_{}{s}", i - 1)));
        }
        push(format!("arm_claw_top{s}"), Some(format!("arm_4{s}")));
        push(format!("arm_claw_bottom{s}"), Some(format!("arm_4{s}")));
        push(format!("arm_effector{s}"), Some(format!("arm_4{s}")));
        push(format!("arm_target{s}"), Some("body_back".into()));
        if side == Side::Left {
            push("body_front".into(), Some("body_back".into()));
        }
    }

    for leg in LegId::all() {
        push(leg.target_name(), Some("root".into()));
    }
    bones
}

/// 一条腿的骨骼
#[derive(Clone, Copy, Debug)]
pub struct LegBones {
    /// `_1`（根部）到 `_3`
    pub joints: [BoneId; 3],
    pub effector: BoneId,
    pub target: BoneId,
}

/// 一条手臂的骨骼
#[derive(Clone, Copy, Debug)]
pub struct ArmBones {
    /// `arm_1`（肩）到 `arm_4`（钳子的父骨骼）
    pub joints: [BoneId; 4],
    pub claw_top: BoneId,
    pub claw_bottom: BoneId,
    pub effector: BoneId,
    pub target: BoneId,
}

impl ArmBones {
    /// 所有以 `arm` 开头的骨骼
    pub fn all_bones(&self) -> impl Iterator<Item = BoneId> + '_ {
        self.joints
            .iter()
            .copied()
            .chain([self.claw_top, self.claw_bottom, self.effector, self.target])
    }
}

/// 加载时按名称解析好的骨骼句柄，热路径中不再按字符串查找
#[derive(Clone, Debug)]
pub struct CrabLayout {
    pub root: BoneId,
    pub body_back: BoneId,
    pub body_front: BoneId,
    legs: Vec<LegBones>,
    arms: Vec<ArmBones>,
}

impl CrabLayout {
    pub fn resolve(skeleton: &Skeleton) -> Result<Self> {
        let mut legs = Vec::with_capacity(LegId::COUNT);
        for leg in LegId::all() {
            let (p, s) = (leg.pair.name(), leg.side.suffix());
            legs.push(LegBones {
                joints: [
                    skeleton.bone_id(&format!("leg_{p}_1{s}"))?,
                    skeleton.bone_id(&format!("leg_{p}_2{s}"))?,
                    skeleton.bone_id(&format!("leg_{p}_3{s}"))?,
                ],
                effector: skeleton.bone_id(&format!("leg_{p}_effector{s}"))?,
                target: skeleton.bone_id(&leg.target_name())?,
            });
        }

        let mut arms = Vec::with_capacity(2);
        for side in Side::BOTH {
            let s = side.suffix();
            arms.push(ArmBones {
                joints: [
                    skeleton.bone_id(&format!("arm_1{s}"))?,
                    skeleton.bone_id(&format!("arm_2{s}"))?,
                    skeleton.bone_id(&format!("arm_3{s}"))?,
                    skeleton.bone_id(&format!("arm_4{s}"))?,
                ],
                claw_top: skeleton.bone_id(&format!("arm_claw_top{s}"))?,
                claw_bottom: skeleton.bone_id(&format!("arm_claw_bottom{s}"))?,
                effector: skeleton.bone_id(&format!("arm_effector{s}"))?,
                target: skeleton.bone_id(&format!("arm_target{s}"))?,
            });
        }

        Ok(Self {
            root: skeleton.bone_id("root")?,
            body_back: skeleton.bone_id("body_back")?,
            body_front: skeleton.bone_id("body_front")?,
            legs,
            arms,
        })
    }

    pub fn leg(&self, leg: LegId) -> &LegBones {
        &self.legs[leg.index()]
    }

    pub fn arm(&self, side: Side) -> &ArmBones {
        &self.arms[side.index()]
    }
}

/// 八条腿 + 两条手臂的 IK 链，限制由当前（绑定姿势）旋转推导
pub fn crab_ik_chains(skeleton: &Skeleton, layout: &CrabLayout, config: &AnimationConfig) -> Result<Vec<IkChain>> {
    let mut chains = Vec::with_capacity(LegId::COUNT + 2);

    let leg_deltas = LimitDeltas::uniform(config.leg_limit_delta);
    for leg in LegId::all() {
        let bones = layout.leg(leg);
        let links = [bones.joints[2], bones.joints[1], bones.joints[0]];
        chains.push(limited_chain(
            skeleton,
            ChainClass::Leg,
            leg.side,
            bones.target,
            bones.effector,
            &links,
            &leg_deltas,
            config.ik_iterations,
        )?);
    }

    let arm_deltas = LimitDeltas::uniform(config.arm_limit_delta);
    for side in Side::BOTH {
        let bones = layout.arm(side);
        let links = [bones.joints[3], bones.joints[2], bones.joints[1], bones.joints[0]];
        chains.push(limited_chain(
            skeleton,
            ChainClass::Arm,
            side,
            bones.target,
            bones.effector,
            &links,
            &arm_deltas,
            config.ik_iterations,
        )?);
    }

    log::debug!("螃蟹 IK 链: {} 条", chains.len());
    Ok(chains)
}

#[allow(clippy::too_many_arguments)]
fn limited_chain(
    skeleton: &Skeleton,
    class: ChainClass,
    side: Side,
    target: BoneId,
    effector: BoneId,
    links: &[BoneId],
    deltas: &LimitDeltas,
    iterations: u32,
) -> Result<IkChain> {
    let (mins, maxs): (Vec<Vec3>, Vec<Vec3>) = links
        .iter()
        .enumerate()
        .map(|(i, &bone)| link_limits(class, side, i, skeleton.bone(bone).rotation, deltas))
        .unzip();
    IkChain::with_limits(target, effector, links, &mins, &maxs, iterations)
}

/// 加载后捕获的静止姿势
#[derive(Clone, Debug)]
pub struct RigRest {
    /// body_back 的静止高度（root 空间）
    pub body_height: f32,
    pub body_rotation: Vec3,
    leg_targets: Vec<Vec3>,
    leg_offsets: Vec<Vec3>,
    arm_targets: [Vec3; 2],
}

impl RigRest {
    /// 腿部目标的静止位置（root 空间）
    pub fn leg_target(&self, leg: LegId) -> Vec3 {
        self.leg_targets[leg.index()]
    }

    /// 腿部目标相对 body_back 的偏移
    pub fn leg_offset(&self, leg: LegId) -> Vec3 {
        self.leg_offsets[leg.index()]
    }

    /// 手臂目标的静止位置（body_back 空间）
    pub fn arm_target(&self, side: Side) -> Vec3 {
        self.arm_targets[side.index()]
    }
}

/// 加载后的就位：身体下沉、腿向内收、预热求解，然后记录静止姿势
pub fn settle_rig(skeleton: &mut Skeleton, layout: &CrabLayout, solver: &IkSolver, config: &AnimationConfig) -> RigRest {
    skeleton.bone_mut(layout.body_back).position.y += config.initial_body_drop;
    let body_pos = skeleton.bone(layout.body_back).position;

    for leg in LegId::all() {
        let target = skeleton.bone_mut(layout.leg(leg).target);
        let direction = (body_pos - target.position).normalize_or_zero();
        target.position.x += direction.x * config.initial_leg_tuck;
        target.position.z += direction.z * config.initial_leg_tuck;
    }

    for _ in 0..config.ik_warmup_passes {
        solver.solve(skeleton);
    }
    skeleton.update_global_transforms();
    skeleton.capture_rest();

    let leg_targets: Vec<Vec3> = LegId::all().map(|leg| skeleton.bone(layout.leg(leg).target).position).collect();
    let leg_offsets = leg_targets.iter().map(|&t| t - body_pos).collect();
    let body = skeleton.bone(layout.body_back);

    log::info!(
        "螃蟹骨架就位: 身体高度 {:.3}, 预热求解 {} 次",
        body.position.y,
        config.ik_warmup_passes
    );

    RigRest {
        body_height: body.position.y,
        body_rotation: body.rotation,
        leg_targets,
        leg_offsets,
        arm_targets: [
            skeleton.bone(layout.arm(Side::Left).target).position,
            skeleton.bone(layout.arm(Side::Right).target).position,
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::crab_skeleton;

    #[test]
    fn test_hierarchy_indices() {
        let bones = crab_bone_hierarchy();
        assert_eq!(bones.len(), 59);
        assert_eq!(bones[1].0, "body_back");
        assert_eq!(bones[5].0, "leg_front_effectorL");
        assert_eq!(bones[24].0, "arm_effectorL");
        assert_eq!(bones[25].0, "arm_targetL");
        assert_eq!(bones[26].0, "body_front");
        assert_eq!(bones[43].0, "arm_1R");
        assert_eq!(bones[50].0, "arm_targetR");
        assert_eq!(bones[51].0, "leg_front_targetL");
        assert_eq!(bones[58].0, "leg_back_targetR");
        assert_eq!(bones[22].1.as_deref(), Some("arm_4L"));
    }

    #[test]
    fn test_chains_follow_tip_to_base_order() {
        let skeleton = crab_skeleton();
        let layout = CrabLayout::resolve(&skeleton).unwrap();
        let chains = crab_ik_chains(&skeleton, &layout, &AnimationConfig::default()).unwrap();
        assert_eq!(chains.len(), 10);

        let front_left = &chains[0];
        assert_eq!(skeleton.bone(front_left.target).name, "leg_front_targetL");
        assert_eq!(skeleton.bone(front_left.effector).name, "leg_front_effectorL");
        let names: Vec<&str> = front_left.links.iter().map(|l| skeleton.bone(l.bone).name.as_str()).collect();
        assert_eq!(names, ["leg_front_3L", "leg_front_2L", "leg_front_1L"]);

        let right_arm = &chains[9];
        assert_eq!(right_arm.links.len(), 4);
        assert_eq!(skeleton.bone(right_arm.links[0].bone).name, "arm_4R");
        assert_eq!(right_arm.iterations, 3);
    }

    #[test]
    fn test_settle_records_rest_state() {
        let mut skeleton = crab_skeleton();
        let layout = CrabLayout::resolve(&skeleton).unwrap();
        let config = AnimationConfig::default();
        let chains = crab_ik_chains(&skeleton, &layout, &config).unwrap();
        let solver = IkSolver::new(&skeleton, chains).unwrap();
        let body_before = skeleton.bone(layout.body_back).position;
        let leg = LegId::new(LegPair::Front, Side::Left);
        let target_before = skeleton.bone(layout.leg(leg).target).position;

        let rest = settle_rig(&mut skeleton, &layout, &solver, &config);

        assert!((rest.body_height - (body_before.y - 0.5)).abs() < 1e-5);
        let body_now = skeleton.bone(layout.body_back).position;
        // 收拢方向按三维方向取水平分量
        let dir = (body_now - target_before).normalize();
        let expected = target_before + Vec3::new(dir.x, 0.0, dir.z) * 0.75;
        assert!((rest.leg_target(leg) - expected).length() < 1e-5);
        assert!((rest.leg_offset(leg) - (rest.leg_target(leg) - body_now)).length() < 1e-5);
        assert_eq!(skeleton.bone(layout.body_back).rest_position, body_now);
    }
}
