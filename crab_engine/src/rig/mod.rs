//! 螃蟹骨架：骨骼表、IK 链表、角度限制

mod crab;
mod limits;

pub use crab::{
    crab_bone_hierarchy, crab_ik_chains, settle_rig, ArmBones, CrabLayout, LegBones, RigRest,
};
pub use limits::{axis_multipliers, link_limits, ChainClass, LimitDeltas};

use crate::{CrabError, Result};

/// 左右
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    /// 骨骼名后缀
    pub fn suffix(self) -> &'static str {
        match self {
            Side::Left => "L",
            Side::Right => "R",
        }
    }

    pub fn mirror(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }
}

/// 从前往后的四对腿
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LegPair {
    Front,
    MidFront,
    MidBack,
    Back,
}

impl LegPair {
    pub const ALL: [LegPair; 4] = [LegPair::Front, LegPair::MidFront, LegPair::MidBack, LegPair::Back];

    pub fn name(self) -> &'static str {
        match self {
            LegPair::Front => "front",
            LegPair::MidFront => "mid_front",
            LegPair::MidBack => "mid_back",
            LegPair::Back => "back",
        }
    }

    fn index(self) -> usize {
        match self {
            LegPair::Front => 0,
            LegPair::MidFront => 1,
            LegPair::MidBack => 2,
            LegPair::Back => 3,
        }
    }
}

/// 一条腿（以它的 IK 目标骨骼命名）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LegId {
    pub pair: LegPair,
    pub side: Side,
}

impl LegId {
    pub const COUNT: usize = 8;

    /// 左侧四条在前，右侧四条在后
    pub fn all() -> impl Iterator<Item = LegId> {
        Side::BOTH
            .into_iter()
            .flat_map(|side| LegPair::ALL.into_iter().map(move |pair| LegId { pair, side }))
    }

    pub fn new(pair: LegPair, side: Side) -> Self {
        Self { pair, side }
    }

    /// 稳定索引 [0, 8)
    pub fn index(self) -> usize {
        self.side.index() * 4 + self.pair.index()
    }

    /// 对侧同位置的腿
    pub fn mirror(self) -> LegId {
        LegId { pair: self.pair, side: self.side.mirror() }
    }

    /// 交错分组：左前、右中前、左中后、右后为一组
    pub fn is_alternate(self) -> bool {
        matches!(
            (self.pair, self.side),
            (LegPair::Front, Side::Left)
                | (LegPair::MidFront, Side::Right)
                | (LegPair::MidBack, Side::Left)
                | (LegPair::Back, Side::Right)
        )
    }

    /// 只有前腿落地时发出脚步声
    pub fn plays_footstep(self) -> bool {
        self.pair == LegPair::Front
    }

    /// 例如 `leg_front_targetL`
    pub fn target_name(self) -> String {
        format!("leg_{}_target{}", self.pair.name(), self.side.suffix())
    }

    pub fn from_target_name(name: &str) -> Result<LegId> {
        LegId::all()
            .find(|leg| leg.target_name() == name)
            .ok_or_else(|| CrabError::UnknownLeg(name.to_string()))
    }
}
