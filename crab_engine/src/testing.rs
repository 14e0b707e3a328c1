//! 测试辅助：合成的螃蟹骨架和记录调用的音频后端

use glam::Vec3;
use std::collections::{HashMap, HashSet};

use crate::audio::{AudioBackend, SoundId};
use crate::config::AnimationConfig;
use crate::rig::{crab_bone_hierarchy, crab_ik_chains, settle_rig, CrabLayout, RigRest};
use crate::skeleton::{BoneDesc, IkSolver, Skeleton};

/// 按骨骼名给出合成的本地位置：左侧 +X，右侧 -X，手臂朝 -Z
fn synthetic_position(name: &str) -> Vec3 {
    match name {
        "root" => return Vec3::ZERO,
        "body_back" => return Vec3::new(0.0, 4.0, 0.0),
        "body_front" => return Vec3::new(0.0, 0.0, -1.0),
        _ => {}
    }

    let sx = if name.ends_with('L') { 1.0 } else { -1.0 };
    let stem = &name[..name.len() - 1];

    if let Some(rest) = stem.strip_prefix("leg_") {
        let z = if rest.starts_with("mid_front") {
            0.4
        } else if rest.starts_with("mid_back") {
            -0.4
        } else if rest.starts_with("front") {
            1.2
        } else {
            -1.2
        };
        return if rest.ends_with("target") {
            Vec3::new(sx * 4.0, 0.0, z)
        } else if rest.ends_with("effector") {
            Vec3::new(sx * 0.6, -3.4, 0.0)
        } else if rest.ends_with('1') {
            Vec3::new(sx * 1.0, 0.0, z)
        } else if rest.ends_with('2') {
            Vec3::new(sx * 1.2, 0.6, 0.0)
        } else {
            Vec3::new(sx * 1.2, -1.2, 0.0)
        };
    }

    match stem {
        "arm_1" => Vec3::new(sx * 0.8, 0.5, -1.4),
        "arm_2" => Vec3::new(sx * 0.8, 0.3, -0.4),
        "arm_3" => Vec3::new(sx * 0.6, 0.2, -0.5),
        "arm_4" => Vec3::new(sx * 0.4, 0.0, -0.4),
        "arm_claw_top" => Vec3::new(0.0, 0.1, -0.3),
        "arm_claw_bottom" => Vec3::new(0.0, -0.1, -0.3),
        "arm_effector" => Vec3::new(0.0, 0.0, -0.4),
        "arm_target" => Vec3::new(sx * 2.6, 1.0, -3.1),
        other => panic!("unexpected bone {}", other),
    }
}

/// 绑定姿势下的合成螃蟹骨架（所有旋转为零）
pub(crate) fn crab_skeleton() -> Skeleton {
    let descs: Vec<BoneDesc> = crab_bone_hierarchy()
        .into_iter()
        .map(|(name, parent)| BoneDesc {
            position: synthetic_position(&name),
            rotation: Vec3::ZERO,
            name,
            parent,
        })
        .collect();
    Skeleton::from_descs(&descs).expect("synthetic crab skeleton")
}

pub(crate) struct SettledCrab {
    pub skeleton: Skeleton,
    pub layout: CrabLayout,
    pub solver: IkSolver,
    pub rest: RigRest,
}

/// 已经就位的合成螃蟹
pub(crate) fn settled_crab() -> SettledCrab {
    let config = AnimationConfig::default();
    let mut skeleton = crab_skeleton();
    let layout = CrabLayout::resolve(&skeleton).unwrap();
    let chains = crab_ik_chains(&skeleton, &layout, &config).unwrap();
    let solver = IkSolver::new(&skeleton, chains).unwrap();
    let rest = settle_rig(&mut skeleton, &layout, &solver, &config);
    SettledCrab { skeleton, layout, solver, rest }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum AudioCall {
    Play(SoundId),
    Stop(SoundId),
    Offset(SoundId, f32),
}

/// 记录所有调用；播放中的音效要手动 `finish` 才会结束
#[derive(Default)]
pub(crate) struct RecordingAudio {
    pub calls: Vec<AudioCall>,
    pub playing: HashSet<SoundId>,
    pub durations: HashMap<SoundId, f32>,
}

impl RecordingAudio {
    pub fn plays(&self) -> Vec<SoundId> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                AudioCall::Play(s) => Some(*s),
                _ => None,
            })
            .collect()
    }

    pub fn offsets(&self, sound: SoundId) -> Vec<f32> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                AudioCall::Offset(s, t) if *s == sound => Some(*t),
                _ => None,
            })
            .collect()
    }

    /// 模拟音效自然播放结束
    pub fn finish(&mut self, sound: SoundId) {
        self.playing.remove(&sound);
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }
}

impl AudioBackend for RecordingAudio {
    fn play(&mut self, sound: SoundId) {
        self.calls.push(AudioCall::Play(sound));
        self.playing.insert(sound);
    }

    fn stop(&mut self, sound: SoundId) {
        self.calls.push(AudioCall::Stop(sound));
        self.playing.remove(&sound);
    }

    fn is_playing(&self, sound: SoundId) -> bool {
        self.playing.contains(&sound)
    }

    fn set_playback_offset(&mut self, sound: SoundId, seconds: f32) {
        self.calls.push(AudioCall::Offset(sound, seconds));
    }

    fn duration(&self, sound: SoundId) -> f32 {
        self.durations.get(&sound).copied().unwrap_or(4.0)
    }
}
