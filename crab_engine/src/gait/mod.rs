//! 腿部步态控制
//!
//! 每条腿在「着地」和「抬起（移动到新目标）」之间切换。腿部目标偏离
//! 身体应有位置超过阈值时迈步，但只有对侧同位置的腿着地、且本腿的
//! 迈步次数不多于对侧时才允许，保证左右交替。

use glam::Vec3;

use crate::animation::{Easing, RigContext, TweenSpec, TweenTarget};
use crate::audio::{AudioBackend, SoundId};
use crate::config::AnimationConfig;
use crate::rig::{CrabLayout, RigRest};
use crate::skeleton::{BoneId, Skeleton};

pub use crate::rig::LegId;

/// 单条腿的步态状态
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LegState {
    pub grounded: bool,
    pub moved_times: u32,
}

impl Default for LegState {
    fn default() -> Self {
        Self { grounded: true, moved_times: 0 }
    }
}

/// 步态事件（由补间完成回调产生）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GaitEvent {
    LegPlanted(LegId),
}

/// 步态参数
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GaitSettings {
    pub trigger_distance: f32,
    pub lookahead: f32,
    pub lift_height: f32,
    pub step_ms: f32,
}

impl GaitSettings {
    pub fn from_config(config: &AnimationConfig) -> Self {
        Self {
            trigger_distance: config.leg_trigger_distance,
            lookahead: config.leg_lookahead,
            lift_height: config.leg_lift_height,
            step_ms: config.leg_step_ms(),
        }
    }
}

/// 两个交替使用的脚步声，避免同一个音效重叠
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Footsteps {
    pub first: SoundId,
    pub second: SoundId,
}

impl Footsteps {
    pub fn play(&self, audio: &mut impl AudioBackend) {
        let sound = if audio.is_playing(self.first) { self.second } else { self.first };
        audio.play(sound);
    }
}

/// 强制归位时排队的迈步
#[derive(Clone, Copy, Debug)]
struct PendingStep {
    destination: Vec3,
    wait_ms: f32,
}

/// 腿部步态控制器
#[derive(Clone, Debug)]
pub struct LegGaitController {
    settings: GaitSettings,
    body: BoneId,
    rest_height: f32,
    target_bones: [BoneId; LegId::COUNT],
    offsets: [Vec3; LegId::COUNT],
    /// 每条腿目标正在去往的位置
    planned: [Vec3; LegId::COUNT],
    states: [LegState; LegId::COUNT],
    pending: [Option<PendingStep>; LegId::COUNT],
    footsteps: Option<Footsteps>,
}

impl LegGaitController {
    pub fn new(layout: &CrabLayout, rest: &RigRest, settings: GaitSettings, footsteps: Option<Footsteps>) -> Self {
        let mut target_bones = [layout.body_back; LegId::COUNT];
        let mut offsets = [Vec3::ZERO; LegId::COUNT];
        let mut planned = [Vec3::ZERO; LegId::COUNT];
        for leg in LegId::all() {
            target_bones[leg.index()] = layout.leg(leg).target;
            offsets[leg.index()] = rest.leg_offset(leg);
            planned[leg.index()] = rest.leg_target(leg);
        }
        Self {
            settings,
            body: layout.body_back,
            rest_height: rest.body_height,
            target_bones,
            offsets,
            planned,
            states: [LegState::default(); LegId::COUNT],
            pending: [None; LegId::COUNT],
            footsteps,
        }
    }

    pub fn settings(&self) -> &GaitSettings {
        &self.settings
    }

    pub fn state(&self, leg: LegId) -> LegState {
        self.states[leg.index()]
    }

    pub fn planned_target(&self, leg: LegId) -> Vec3 {
        self.planned[leg.index()]
    }

    pub fn all_grounded(&self) -> bool {
        self.states.iter().all(|s| s.grounded)
    }

    /// 是否还有强制归位的迈步没完成
    pub fn has_pending_steps(&self) -> bool {
        self.pending.iter().any(Option::is_some)
    }

    /// 交替规则：对侧着地，且本腿迈步次数不多于对侧
    pub fn can_move_leg(&self, leg: LegId) -> bool {
        let mirror = self.states[leg.mirror().index()];
        if !mirror.grounded {
            return false;
        }
        let own = self.states[leg.index()];
        i64::from(own.moved_times) - i64::from(mirror.moved_times) <= 0
    }

    /// 按身体当前位置（高度取静止高度）推算的腿部目标应在位置
    pub fn required_position(&self, skeleton: &Skeleton, leg: LegId) -> Vec3 {
        let mut body = skeleton.bone(self.body).position;
        body.y = self.rest_height;
        body + self.offsets[leg.index()]
    }

    /// 身体应回到的中心：各腿目标减去偏移后的平均，高度取静止高度
    pub fn body_center(&self, skeleton: &Skeleton) -> Vec3 {
        let sum: Vec3 = LegId::all()
            .map(|leg| skeleton.bone(self.target_bones[leg.index()]).position - self.offsets[leg.index()])
            .sum();
        let mut center = sum / LegId::COUNT as f32;
        center.y = self.rest_height;
        center
    }

    /// 移动中每帧调用：偏离过远且满足交替规则的腿迈向新目标
    ///
    /// 返回本次抬起的腿。
    pub fn update_targets<E, A>(&mut self, ctx: &mut RigContext<'_, E>, direction: Option<Vec3>, audio: &mut A) -> Vec<LegId>
    where
        E: Clone + From<GaitEvent>,
        A: AudioBackend,
    {
        let trigger_sq = self.settings.trigger_distance * self.settings.trigger_distance;
        let lookahead = direction.map_or(Vec3::ZERO, |d| d * self.settings.lookahead);
        let mut lifted = Vec::new();

        for leg in LegId::all() {
            let required = self.required_position(ctx.skeleton, leg);
            if required.distance_squared(self.planned[leg.index()]) <= trigger_sq {
                continue;
            }
            if !self.states[leg.index()].grounded || !self.can_move_leg(leg) {
                log::trace!("{} 暂不能迈步", leg.target_name());
                continue;
            }
            self.pending[leg.index()] = None;
            self.lift_leg(ctx, leg, required + lookahead, audio);
            lifted.push(leg);
        }
        lifted
    }

    /// 移动结束时调用：所有腿无视距离阈值回到身体下方
    ///
    /// 交错组的腿延后半个周期；仍在空中的腿等落地后再迈。
    pub fn force_update<E, A>(&mut self, ctx: &mut RigContext<'_, E>, audio: &mut A)
    where
        E: Clone + From<GaitEvent>,
        A: AudioBackend,
    {
        for leg in LegId::all() {
            let destination = self.required_position(ctx.skeleton, leg);
            let wait_ms = if leg.is_alternate() { self.settings.step_ms } else { 0.0 };
            self.pending[leg.index()] = Some(PendingStep { destination, wait_ms });
        }
        log::debug!("步态强制归位: {} 条腿排队", LegId::COUNT);
        self.update(0.0, ctx, audio);
    }

    /// 每帧推进排队的迈步
    pub fn update<E, A>(&mut self, dt_ms: f32, ctx: &mut RigContext<'_, E>, audio: &mut A)
    where
        E: Clone + From<GaitEvent>,
        A: AudioBackend,
    {
        for leg in LegId::all() {
            let Some(step) = self.pending[leg.index()].as_mut() else {
                continue;
            };
            step.wait_ms -= dt_ms;
            if step.wait_ms > 0.0 {
                continue;
            }
            if !self.states[leg.index()].grounded || !self.states[leg.mirror().index()].grounded {
                continue;
            }
            let destination = step.destination;
            self.pending[leg.index()] = None;
            self.lift_leg(ctx, leg, destination, audio);
        }
    }

    /// 腿部目标补间完成
    pub fn on_leg_planted(&mut self, leg: LegId) {
        let state = &mut self.states[leg.index()];
        state.grounded = true;
        state.moved_times += 1;
        log::trace!("{} 落地, 累计 {} 次", leg.target_name(), state.moved_times);
    }

    /// 抬腿：先升到目标上方，再落到目标
    fn lift_leg<E, A>(&mut self, ctx: &mut RigContext<'_, E>, leg: LegId, destination: Vec3, audio: &mut A)
    where
        E: Clone + From<GaitEvent>,
        A: AudioBackend,
    {
        let target = TweenTarget::BonePosition(self.target_bones[leg.index()]);
        let half = self.settings.step_ms / 2.0;

        self.states[leg.index()].grounded = false;
        self.planned[leg.index()] = destination;

        ctx.tweens.stop_target(target);
        let up = ctx.tweens.add(
            TweenSpec::new(target, destination + Vec3::Y * self.settings.lift_height, half).easing(Easing::SINE_IN),
        );
        let down = ctx.tweens.add(
            TweenSpec::new(target, destination, half)
                .easing(Easing::SINE_OUT)
                .on_complete(E::from(GaitEvent::LegPlanted(leg))),
        );
        ctx.tweens.chain(up, down);
        ctx.tweens.start(up);

        if leg.plays_footstep() {
            if let Some(footsteps) = &self.footsteps {
                footsteps.play(audio);
            }
        }
    }
}
