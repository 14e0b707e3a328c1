//! 乐器表
//!
//! 每种乐器一份静态数据：双臂 IK 目标、身体倾斜、道具初始缩放以及
//! 演奏时的循环动画轨道。

use glam::{BVec3, Vec3};

use crate::rig::Side;
use crate::{CrabError, Result};

/// 乐器（顺序即选择编号 1..=5）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Instrument {
    Bass,
    DjStation,
    Guitar,
    Synth,
    Piano,
}

impl Instrument {
    pub const ALL: [Instrument; 5] = [
        Instrument::Bass,
        Instrument::DjStation,
        Instrument::Guitar,
        Instrument::Synth,
        Instrument::Piano,
    ];

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// 从 0 开始的索引
    pub fn index(self) -> usize {
        match self {
            Instrument::Bass => 0,
            Instrument::DjStation => 1,
            Instrument::Guitar => 2,
            Instrument::Synth => 3,
            Instrument::Piano => 4,
        }
    }

    pub fn from_index(index: usize) -> Option<Instrument> {
        Self::ALL.get(index).copied()
    }

    pub fn from_name(name: &str) -> Result<Instrument> {
        Self::ALL
            .into_iter()
            .find(|i| i.name() == name)
            .ok_or_else(|| CrabError::InvalidConfig(format!("unknown instrument {}", name)))
    }

    pub fn spec(self) -> &'static InstrumentSpec {
        match self {
            Instrument::Bass => &BASS,
            Instrument::DjStation => &DJ_STATION,
            Instrument::Guitar => &GUITAR,
            Instrument::Synth => &SYNTH,
            Instrument::Piano => &PIANO,
        }
    }
}

/// 循环动画写入的通道
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopChannel {
    /// 手臂 IK 目标，基准为该乐器的姿势目标
    Arm(Side),
    /// 自发光，基准为黑
    PropGlow,
    /// 缩放，基准为 1
    PropScale,
    /// 模型偏移，基准为 0
    PropOffset,
}

/// 一条来回往复的循环轨道：基准 → 基准 + delta → 基准 → …
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoopTrack {
    pub channel: LoopChannel,
    pub delta: Vec3,
    pub axes: BVec3,
    /// 单程时长 = 一拍 × `loop_beats` × `factor`
    pub factor: f32,
}

impl LoopTrack {
    const fn new(channel: LoopChannel, delta: Vec3, factor: f32) -> Self {
        Self { channel, delta, axes: BVec3::TRUE, factor }
    }

    /// 只在 X 轴上左右摆动
    const fn sideways(side: Side, dx: f32, factor: f32) -> Self {
        Self {
            channel: LoopChannel::Arm(side),
            delta: Vec3::new(dx, 0.0, 0.0),
            axes: BVec3::new(true, false, false),
            factor,
        }
    }

    /// 该通道的静止值
    pub fn base(&self, spec: &InstrumentSpec) -> Vec3 {
        match self.channel {
            LoopChannel::Arm(side) => spec.arm_target(side),
            LoopChannel::PropGlow | LoopChannel::PropOffset => Vec3::ZERO,
            LoopChannel::PropScale => Vec3::ONE,
        }
    }
}

/// 乐器静态数据
#[derive(Debug)]
pub struct InstrumentSpec {
    pub name: &'static str,
    /// 左右手臂 IK 目标（body_back 空间）
    pub arm_targets: [Vec3; 2],
    /// 摆姿势时身体的旋转，None 表示保持静止姿势
    pub body_rotation: Option<Vec3>,
    /// 道具出现前/消失后的缩放
    pub start_scale: Vec3,
    /// 出现时把模型偏移归零
    pub snap_offset_on_show: bool,
    /// 循环动画的基础时长（拍）
    pub loop_beats: f32,
    pub loops: &'static [LoopTrack],
}

impl InstrumentSpec {
    pub fn arm_target(&self, side: Side) -> Vec3 {
        self.arm_targets[side.index()]
    }
}

const fn glow(level: f32) -> Vec3 {
    Vec3::new(level, level, level)
}

static BASS: InstrumentSpec = InstrumentSpec {
    name: "bass",
    arm_targets: [Vec3::new(2.92, 5.043, 0.584), Vec3::new(-0.942, 5.696, -1.112)],
    body_rotation: Some(Vec3::new(1.227, -0.002, -0.011)),
    start_scale: Vec3::ZERO,
    snap_offset_on_show: false,
    loop_beats: 0.25,
    loops: &[
        LoopTrack::new(LoopChannel::Arm(Side::Right), Vec3::new(0.0, 0.0, 0.55), 1.0),
        LoopTrack::new(LoopChannel::PropGlow, glow(0.15), 1.0),
        LoopTrack::new(LoopChannel::PropScale, glow(0.0625), 1.0),
    ],
};

static DJ_STATION: InstrumentSpec = InstrumentSpec {
    name: "dj_station",
    arm_targets: [Vec3::new(2.87, 5.17, -1.621), Vec3::new(-2.87, 5.17, -1.621)],
    body_rotation: None,
    start_scale: Vec3::ZERO,
    snap_offset_on_show: true,
    loop_beats: 0.25,
    loops: &[
        LoopTrack::sideways(Side::Right, -0.375, 8.0),
        LoopTrack::sideways(Side::Left, 0.375, 4.0),
        LoopTrack::new(LoopChannel::PropGlow, Vec3::new(0.1, 0.6, 0.1), 2.0),
        LoopTrack::new(LoopChannel::PropOffset, Vec3::new(0.0, 0.375, 0.1875), 2.0),
        LoopTrack::new(LoopChannel::PropScale, glow(0.065), 2.0),
    ],
};

static GUITAR: InstrumentSpec = InstrumentSpec {
    name: "guitar",
    arm_targets: [Vec3::new(3.45, 4.67, -1.80), Vec3::new(-0.551, 5.065, -1.548)],
    body_rotation: None,
    start_scale: Vec3::new(0.25, 0.0, 0.0),
    snap_offset_on_show: false,
    loop_beats: 0.125,
    loops: &[
        LoopTrack::new(LoopChannel::Arm(Side::Right), Vec3::new(0.0, 0.0, 0.5), 1.0),
        LoopTrack::new(LoopChannel::Arm(Side::Left), Vec3::new(0.0, 0.0, 0.15), 2.0),
        LoopTrack::new(LoopChannel::PropGlow, glow(0.15), 2.0),
        LoopTrack::new(LoopChannel::PropScale, glow(0.05), 2.0),
    ],
};

static SYNTH: InstrumentSpec = InstrumentSpec {
    name: "synth",
    arm_targets: [Vec3::new(2.67, 4.67, -1.296), Vec3::new(-2.67, 4.67, -1.296)],
    body_rotation: None,
    start_scale: Vec3::ZERO,
    snap_offset_on_show: false,
    loop_beats: 0.125,
    loops: &[
        LoopTrack::sideways(Side::Right, -0.425, 8.0),
        LoopTrack::sideways(Side::Left, 0.425, 4.0),
        LoopTrack::new(LoopChannel::PropGlow, glow(0.15), 2.0),
        LoopTrack::new(LoopChannel::PropOffset, Vec3::new(0.0, 0.25, 0.125), 2.0),
        LoopTrack::new(LoopChannel::PropScale, glow(0.05), 4.0),
    ],
};

static PIANO: InstrumentSpec = InstrumentSpec {
    name: "piano",
    arm_targets: [Vec3::new(2.37, 4.67, -1.361), Vec3::new(-2.37, 4.67, -1.361)],
    body_rotation: None,
    start_scale: Vec3::ZERO,
    snap_offset_on_show: false,
    loop_beats: 0.25,
    loops: &[
        LoopTrack::sideways(Side::Right, -0.65, 4.0),
        LoopTrack::sideways(Side::Left, 0.65, 2.0),
        LoopTrack::new(LoopChannel::PropGlow, glow(0.15), 2.0),
        LoopTrack::new(LoopChannel::PropScale, glow(0.025), 2.0),
    ],
};
