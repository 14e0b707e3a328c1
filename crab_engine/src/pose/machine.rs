//! 姿势状态机
//!
//! 状态：中立、过渡中（锁）、演奏某种乐器。过渡期间拒绝新的请求；
//! 过渡时长结束后才进入目标状态。进入演奏状态后可启动该乐器的
//! 循环动画，任何新的过渡开始前都会先停掉它。

use glam::Vec3;

use super::{Instrument, LoopChannel};
use crate::animation::{Easing, RigContext, TweenId, TweenSpec, TweenTarget};
use crate::config::AnimationConfig;
use crate::rig::{CrabLayout, Side};
use crate::skeleton::BoneId;

/// 当前姿势
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pose {
    Neutral,
    Transitioning,
    Playing(Instrument),
}

impl Pose {
    pub fn instrument(self) -> Option<Instrument> {
        match self {
            Pose::Playing(instrument) => Some(instrument),
            _ => None,
        }
    }
}

/// 姿势请求选项
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoseRequest {
    /// 同时切换道具的显示/隐藏
    pub toggle_prop: bool,
    /// 已经处于目标姿势时仍然重新摆一次
    pub force: bool,
    /// 跳过插值，直接写入最终值
    pub immediate: bool,
}

impl Default for PoseRequest {
    fn default() -> Self {
        Self {
            toggle_prop: true,
            force: false,
            immediate: false,
        }
    }
}

impl PoseRequest {
    /// 同步重置用：强制、立即、不切换道具
    pub fn reset() -> Self {
        Self {
            toggle_prop: false,
            force: true,
            immediate: true,
        }
    }
}

/// 请求结果；拒绝不是错误
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoseRequestOutcome {
    /// 开始过渡
    Started,
    /// 立即完成
    Snapped,
    AlreadyInPose,
    /// 正在过渡，请求被忽略
    Locked,
    /// 道具尚未加载，之后每帧重试
    Deferred,
}

#[derive(Clone, Copy, Debug)]
struct Transition {
    destination: Pose,
    remaining_ms: f32,
}

#[derive(Clone, Debug)]
struct PlayingLoop {
    instrument: Instrument,
    chains: Vec<TweenId>,
}

/// 姿势状态机
#[derive(Clone, Debug)]
pub struct PoseStateMachine {
    pose: Pose,
    transition: Option<Transition>,
    deferred: Option<(Instrument, PoseRequest)>,
    playing_loop: Option<PlayingLoop>,
    body: BoneId,
    arm_targets: [BoneId; 2],
    /// 两条手臂上所有以 `arm` 开头的骨骼
    arm_bones: Vec<BoneId>,
    transition_ms: f32,
    completion_slack: f32,
    visible_threshold: f32,
    beat_ms: f32,
}

impl PoseStateMachine {
    pub fn new(layout: &CrabLayout, config: &AnimationConfig) -> Self {
        let arm_bones = Side::BOTH
            .into_iter()
            .flat_map(|side| layout.arm(side).all_bones().collect::<Vec<_>>())
            .collect();
        Self {
            pose: Pose::Neutral,
            transition: None,
            deferred: None,
            playing_loop: None,
            body: layout.body_back,
            arm_targets: [layout.arm(Side::Left).target, layout.arm(Side::Right).target],
            arm_bones,
            transition_ms: config.pose_transition_ms(),
            completion_slack: config.pose_completion_slack,
            visible_threshold: config.prop_visible_threshold,
            beat_ms: config.beat_duration_ms(),
        }
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn is_transitioning(&self) -> bool {
        self.pose == Pose::Transitioning
    }

    /// 等待道具加载的请求
    pub fn deferred_instrument(&self) -> Option<Instrument> {
        self.deferred.map(|(instrument, _)| instrument)
    }

    pub fn is_loop_playing(&self) -> bool {
        self.playing_loop.is_some()
    }

    /// 回到中立姿势：手臂骨骼和目标回到静止值，身体旋转复原
    pub fn request_neutral<E: Clone>(&mut self, ctx: &mut RigContext<'_, E>, request: PoseRequest) -> PoseRequestOutcome {
        if self.pose == Pose::Transitioning {
            log::trace!("姿势过渡中, 忽略中立请求");
            return PoseRequestOutcome::Locked;
        }
        if self.pose == Pose::Neutral && !request.force {
            return PoseRequestOutcome::AlreadyInPose;
        }

        self.deferred = None;
        self.stop_playing_loop(ctx);
        if request.toggle_prop {
            self.hide_props(ctx, None, request.immediate);
        }

        for &bone in &self.arm_bones {
            let rest_rotation = ctx.skeleton.bone(bone).rest_rotation;
            self.drive(ctx, TweenTarget::BoneRotation(bone), rest_rotation, Easing::QUAD_OUT, request.immediate);
        }
        for target in self.arm_targets {
            let rest_position = ctx.skeleton.bone(target).rest_position;
            self.drive(ctx, TweenTarget::BonePosition(target), rest_position, Easing::QUAD_OUT, request.immediate);
        }
        let body_rest = ctx.skeleton.bone(self.body).rest_rotation;
        self.drive(ctx, TweenTarget::BoneRotation(self.body), body_rest, Easing::QUAD_IN_OUT, request.immediate);

        self.begin(Pose::Neutral, request.immediate)
    }

    /// 摆出演奏某种乐器的姿势
    pub fn request_instrument<E: Clone>(
        &mut self,
        ctx: &mut RigContext<'_, E>,
        instrument: Instrument,
        request: PoseRequest,
    ) -> PoseRequestOutcome {
        if self.pose == Pose::Transitioning {
            log::trace!("姿势过渡中, 忽略 {} 请求", instrument.name());
            return PoseRequestOutcome::Locked;
        }
        if self.pose == Pose::Playing(instrument) && !request.force {
            return PoseRequestOutcome::AlreadyInPose;
        }
        if !ctx.props.is_loaded(instrument) {
            if self.deferred_instrument() != Some(instrument) {
                log::debug!("道具 {} 尚未加载, 延后摆姿势", instrument.name());
            }
            self.deferred = Some((instrument, request));
            return PoseRequestOutcome::Deferred;
        }

        self.deferred = None;
        self.stop_playing_loop(ctx);
        self.hide_props(ctx, Some(instrument), request.immediate);

        let spec = instrument.spec();
        for side in Side::BOTH {
            let target = TweenTarget::BonePosition(self.arm_targets[side.index()]);
            self.drive(ctx, target, spec.arm_target(side), Easing::QUAD_IN_OUT, request.immediate);
        }
        let body_rotation = spec
            .body_rotation
            .unwrap_or(ctx.skeleton.bone(self.body).rest_rotation);
        self.drive(ctx, TweenTarget::BoneRotation(self.body), body_rotation, Easing::QUAD_IN_OUT, request.immediate);

        if request.force {
            for (target, value) in [
                (TweenTarget::PropScale(instrument), Vec3::ONE),
                (TweenTarget::PropGlow(instrument), Vec3::ZERO),
                (TweenTarget::PropOffset(instrument), Vec3::ZERO),
            ] {
                self.drive(ctx, target, value, Easing::QUAD_IN_OUT, request.immediate);
            }
            ctx.props.get_mut(instrument).on_screen = true;
        } else if request.toggle_prop && !ctx.props.get(instrument).on_screen {
            self.toggle_prop(ctx, instrument, true, self.transition_ms, request.immediate);
        }

        self.begin(Pose::Playing(instrument), request.immediate)
    }

    /// 推进过渡计时并重试被延后的请求；返回本帧到达的姿势
    pub fn update<E: Clone>(&mut self, dt_ms: f32, ctx: &mut RigContext<'_, E>) -> Option<Pose> {
        let mut reached = None;
        if let Some(transition) = self.transition.as_mut() {
            transition.remaining_ms -= dt_ms;
            if transition.remaining_ms <= 0.0 {
                let destination = transition.destination;
                self.transition = None;
                self.pose = destination;
                log::debug!("姿势到达: {:?}", destination);
                reached = Some(destination);
            }
        }

        if let Some((instrument, request)) = self.deferred {
            if ctx.props.is_loaded(instrument) && self.pose != Pose::Transitioning {
                self.deferred = None;
                let outcome = self.request_instrument(ctx, instrument, request);
                log::debug!("道具 {} 已就绪, 重试姿势: {:?}", instrument.name(), outcome);
            }
        }
        reached
    }

    /// 启动当前乐器的演奏循环；不在演奏状态或已在循环时返回 false
    pub fn start_playing_loop<E: Clone>(&mut self, ctx: &mut RigContext<'_, E>) -> bool {
        let Pose::Playing(instrument) = self.pose else {
            return false;
        };
        if self.playing_loop.is_some() {
            return false;
        }

        let spec = instrument.spec();
        let base_ms = self.beat_ms * spec.loop_beats;
        let chains = spec
            .loops
            .iter()
            .map(|track| {
                let target = self.loop_target(instrument, track.channel);
                let base = track.base(spec);
                let duration = base_ms * track.factor;
                let (x, y, z) = (track.axes.x, track.axes.y, track.axes.z);
                let out = ctx.tweens.add(
                    TweenSpec::new(target, base + track.delta, duration)
                        .easing(Easing::SINE_IN_OUT)
                        .axes(x, y, z)
                        .persistent(),
                );
                let back = ctx.tweens.add(
                    TweenSpec::new(target, base, duration)
                        .easing(Easing::SINE_IN_OUT)
                        .axes(x, y, z)
                        .persistent(),
                );
                ctx.tweens.chain(out, back);
                ctx.tweens.chain(back, out);
                ctx.tweens.start(out);
                out
            })
            .collect();

        log::debug!("{} 演奏循环开始", instrument.name());
        self.playing_loop = Some(PlayingLoop { instrument, chains });
        true
    }

    /// 停止演奏循环；没有循环时返回 false
    pub fn stop_playing_loop<E: Clone>(&mut self, ctx: &mut RigContext<'_, E>) -> bool {
        let Some(playing) = self.playing_loop.take() else {
            return false;
        };
        for id in playing.chains {
            ctx.tweens.stop_chain(id);
        }
        log::debug!("{} 演奏循环停止", playing.instrument.name());
        true
    }

    /// 显示或隐藏道具：缩放在初始值和 1 之间变化，发光在白和黑之间变化
    pub fn toggle_prop<E: Clone>(
        &self,
        ctx: &mut RigContext<'_, E>,
        instrument: Instrument,
        show: bool,
        duration_ms: f32,
        immediate: bool,
    ) {
        let spec = instrument.spec();
        let (scale_from, scale_to, glow_from, glow_to) = if show {
            (spec.start_scale, Vec3::ONE, Vec3::ONE, Vec3::ZERO)
        } else {
            (Vec3::ONE, spec.start_scale, Vec3::ZERO, Vec3::ONE)
        };
        ctx.props.get_mut(instrument).on_screen = show;

        for (target, from, to) in [
            (TweenTarget::PropScale(instrument), scale_from, scale_to),
            (TweenTarget::PropGlow(instrument), glow_from, glow_to),
        ] {
            ctx.tweens.stop_target(target);
            if immediate {
                ctx.snap(target, to);
            } else {
                ctx.snap(target, from);
                ctx.tweens
                    .animate(TweenSpec::new(target, to, duration_ms).easing(Easing::QUAD_IN_OUT));
            }
        }

        if show && spec.snap_offset_on_show {
            let offset = TweenTarget::PropOffset(instrument);
            ctx.tweens.stop_target(offset);
            ctx.snap(offset, Vec3::ZERO);
        }
        log::trace!("道具 {} {}", instrument.name(), if show { "显示" } else { "隐藏" });
    }

    /// 隐藏除 `keep` 以外所有显示中的道具
    fn hide_props<E: Clone>(&self, ctx: &mut RigContext<'_, E>, keep: Option<Instrument>, immediate: bool) {
        let duration = self.transition_ms * self.completion_slack;
        for instrument in Instrument::ALL {
            if Some(instrument) == keep {
                continue;
            }
            let shown = ctx.props.get(instrument).on_screen
                || ctx.props.is_visible(instrument, self.visible_threshold);
            if shown {
                self.toggle_prop(ctx, instrument, false, duration, immediate);
            }
        }
    }

    /// 停掉该属性上的补间，然后补间或直接写入到 `value`
    fn drive<E: Clone>(&self, ctx: &mut RigContext<'_, E>, target: TweenTarget, value: Vec3, easing: Easing, immediate: bool) {
        ctx.tweens.stop_target(target);
        if immediate {
            ctx.snap(target, value);
        } else {
            ctx.tweens
                .animate(TweenSpec::new(target, value, self.transition_ms).easing(easing));
        }
    }

    fn begin(&mut self, destination: Pose, immediate: bool) -> PoseRequestOutcome {
        if immediate {
            self.transition = None;
            self.pose = destination;
            log::debug!("姿势立即切换: {:?}", destination);
            PoseRequestOutcome::Snapped
        } else {
            self.pose = Pose::Transitioning;
            self.transition = Some(Transition {
                destination,
                remaining_ms: self.transition_ms * self.completion_slack,
            });
            log::debug!("姿势过渡开始: -> {:?}", destination);
            PoseRequestOutcome::Started
        }
    }

    fn loop_target(&self, instrument: Instrument, channel: LoopChannel) -> TweenTarget {
        match channel {
            LoopChannel::Arm(side) => TweenTarget::BonePosition(self.arm_targets[side.index()]),
            LoopChannel::PropGlow => TweenTarget::PropGlow(instrument),
            LoopChannel::PropScale => TweenTarget::PropScale(instrument),
            LoopChannel::PropOffset => TweenTarget::PropOffset(instrument),
        }
    }
}
