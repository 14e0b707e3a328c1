//! 关节角度限制生成
//!
//! 求解器本身不区分腿和手臂；这里按链的类型、左右和关节序号
//! 从静止姿势旋转推导出每个链接的 [min, max]。

use glam::Vec3;

use super::Side;

/// IK 链类型
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainClass {
    Leg,
    Arm,
}

/// 基础角度增量（弧度），左右两侧的方向不对称
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LimitDeltas {
    pub min: Vec3,
    pub max: Vec3,
}

impl LimitDeltas {
    pub fn uniform(delta: f32) -> Self {
        Self {
            min: Vec3::splat(delta),
            max: Vec3::splat(delta),
        }
    }
}

/// 每个轴的增量倍数，`link_index` 从末端（0）数起
pub fn axis_multipliers(class: ChainClass, link_index: usize) -> Vec3 {
    let i = link_index as f32;
    match class {
        ChainClass::Leg => {
            // Y 轴是腿的主要摆动方向
            let swing = 2.75 + i * 5.5;
            let diagonal = 1.65 + i * 0.125;
            Vec3::new(diagonal, swing, diagonal)
        }
        ChainClass::Arm => {
            let (bend, diagonal) = match link_index {
                0 => (7.0, 3.5),
                1 => (4.5, 0.75),
                _ => (1.0, 0.75),
            };
            Vec3::new(diagonal, diagonal, bend)
        }
    }
}

/// 计算一个链接的 (rotation_min, rotation_max)
pub fn link_limits(class: ChainClass, side: Side, link_index: usize, rest: Vec3, deltas: &LimitDeltas) -> (Vec3, Vec3) {
    let m = axis_multipliers(class, link_index);
    let (below, above) = match side {
        Side::Left => (deltas.min, deltas.max),
        Side::Right => (deltas.max, deltas.min),
    };
    (rest - below * m, rest + above * m)
}
