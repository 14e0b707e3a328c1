//! 螃蟹角色
//!
//! 持有骨架和所有动画组件，宿主只需要两个入口：
//! - `frame`：渲染循环每帧调用（补间、步态、姿势计时、IK）
//! - `advance_clock` / `beat_tick`：节拍音序器
//!
//! 骨骼位置由多个组件轮流写入，谁在写由各组件的状态标志决定：
//! 移动期间身体归 `Locomotion`，有声音且不移动时归 `IdleAnimator`；
//! 手臂目标归 `PoseStateMachine`；腿部目标归 `LegGaitController`。

use glam::Vec3;

use crate::animation::{RigContext, TweenManager};
use crate::audio::AudioBackend;
use crate::config::{get_config, AnimationConfig};
use crate::gait::{GaitEvent, GaitSettings, LegGaitController};
use crate::locomotion::{IdleAnimator, Locomotion, MoveOutcome, MovementEvent};
use crate::pose::{Instrument, Pose, PoseRequest, PoseRequestOutcome, PoseStateMachine, PropSet};
use crate::rig::{crab_ik_chains, settle_rig, CrabLayout, RigRest};
use crate::sequencer::{BeatClock, BeatSequencer, PulseSignal, SequencerTick, SoundBank, TickContext};
use crate::skeleton::{BoneDesc, IkSolver, Skeleton};
use crate::Result;

/// 补间完成时分发的事件
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RigEvent {
    Gait(GaitEvent),
    Movement(MovementEvent),
}

impl From<GaitEvent> for RigEvent {
    fn from(event: GaitEvent) -> Self {
        RigEvent::Gait(event)
    }
}

impl From<MovementEvent> for RigEvent {
    fn from(event: MovementEvent) -> Self {
        RigEvent::Movement(event)
    }
}

pub struct CrabCharacter<A: AudioBackend> {
    config: AnimationConfig,
    skeleton: Skeleton,
    layout: CrabLayout,
    solver: IkSolver,
    rest: RigRest,
    props: PropSet,
    tweens: TweenManager<RigEvent>,
    gait: LegGaitController,
    poses: PoseStateMachine,
    idle: IdleAnimator,
    locomotion: Locomotion,
    sequencer: BeatSequencer,
    clock: BeatClock,
    sounds: SoundBank,
    audio: A,
    selected: Instrument,
    /// 最近一次脉冲变化，宿主据此驱动背景特效
    last_pulse: PulseSignal,
}

impl<A: AudioBackend> CrabCharacter<A> {
    /// 从已加载的骨架构建角色：解析骨骼、生成 IK 链、就位并记录静止姿势
    pub fn new(mut skeleton: Skeleton, audio: A, config: AnimationConfig) -> Result<Self> {
        config.validate()?;
        let layout = CrabLayout::resolve(&skeleton)?;
        let chains = crab_ik_chains(&skeleton, &layout, &config)?;
        let solver = IkSolver::new(&skeleton, chains)?;
        let rest = settle_rig(&mut skeleton, &layout, &solver, &config);

        let sounds = SoundBank::standard(&config);
        let gait = LegGaitController::new(&layout, &rest, GaitSettings::from_config(&config), sounds.footsteps());
        let poses = PoseStateMachine::new(&layout, &config);
        let idle = IdleAnimator::new(&layout, &rest, &config);
        let locomotion = Locomotion::new(&layout, &rest, &config);

        log::info!("螃蟹角色创建完成: {} 根骨骼", skeleton.bone_count());

        Ok(Self {
            sequencer: BeatSequencer::new(&config),
            clock: BeatClock::from_config(&config),
            config,
            skeleton,
            layout,
            solver,
            rest,
            props: PropSet::new(),
            tweens: TweenManager::new(),
            gait,
            poses,
            idle,
            locomotion,
            sounds,
            audio,
            // 初始站在中间的底座上
            selected: Instrument::Guitar,
            last_pulse: PulseSignal::Unchanged,
        })
    }

    /// 使用全局配置
    pub fn with_global_config(skeleton: Skeleton, audio: A) -> Result<Self> {
        Self::new(skeleton, audio, get_config())
    }

    pub fn from_descs(descs: &[BoneDesc], audio: A, config: AnimationConfig) -> Result<Self> {
        Self::new(Skeleton::from_descs(descs)?, audio, config)
    }

    /// 渲染帧
    pub fn frame(&mut self, dt_ms: f32) {
        let mut ctx = RigContext::new(&mut self.skeleton, &mut self.props, &mut self.tweens);

        self.locomotion.update(&mut ctx, &mut self.gait, &mut self.audio);
        self.gait.update(dt_ms, &mut ctx, &mut self.audio);

        for event in ctx.update_tweens(dt_ms) {
            match event {
                RigEvent::Gait(GaitEvent::LegPlanted(leg)) => self.gait.on_leg_planted(leg),
                RigEvent::Movement(MovementEvent::Arrived) => {
                    self.locomotion.on_arrived(&mut ctx, &mut self.gait, &mut self.audio);
                }
            }
        }
        self.poses.update(dt_ms, &mut ctx);

        self.solver.solve(&mut self.skeleton);
        self.skeleton.update_global_transforms();
    }

    /// 累加经过的时间并执行到期的节拍步
    pub fn advance_clock(&mut self, elapsed_ms: f32) -> Vec<SequencerTick> {
        let ticks = self.clock.advance(elapsed_ms);
        (0..ticks).map(|_| self.beat_tick()).collect()
    }

    /// 执行一步音序器，并按结果启停待机和演奏动画
    pub fn beat_tick(&mut self) -> SequencerTick {
        let context = TickContext {
            moving: self.locomotion.is_moving(),
            idle_playing: self.idle.is_playing(),
            melody: self.selected.index(),
        };
        let tick = self.sequencer.tick(&mut self.sounds, &mut self.audio, context);
        if tick.pulse != PulseSignal::Unchanged {
            self.last_pulse = tick.pulse;
        }

        let center = self.gait.body_center(&self.skeleton);
        let mut ctx = RigContext::new(&mut self.skeleton, &mut self.props, &mut self.tweens);

        if tick.stop_idle {
            self.idle.stop(&mut ctx, Some(center));
        }
        if tick.start_idle {
            self.idle.start(&mut ctx, center);
        }

        if tick.melody_animation {
            if self.poses.pose() != Pose::Playing(self.selected) {
                self.poses.request_instrument(&mut ctx, self.selected, PoseRequest::default());
            }
            self.poses.start_playing_loop(&mut ctx);
        } else if self.poses.pose() != Pose::Neutral {
            self.poses.request_neutral(&mut ctx, PoseRequest::default());
        }
        tick
    }

    /// 移动到世界坐标的某一点
    pub fn move_to(&mut self, world_point: Vec3) -> MoveOutcome {
        let mut ctx = RigContext::new(&mut self.skeleton, &mut self.props, &mut self.tweens);
        self.locomotion.move_to(&mut ctx, world_point, &mut self.idle)
    }

    /// 选择乐器并走到它的底座；已经选中时返回 None
    pub fn select_instrument(&mut self, instrument: Instrument, stand_at: Vec3) -> Option<MoveOutcome> {
        if instrument == self.selected {
            return None;
        }
        let outcome = self.move_to(stand_at);
        log::debug!("选择乐器 {} -> {}", self.selected.name(), instrument.name());
        self.selected = instrument;
        Some(outcome)
    }

    /// 直接请求姿势；`None` 表示中立
    pub fn request_pose(&mut self, instrument: Option<Instrument>, request: PoseRequest) -> PoseRequestOutcome {
        let mut ctx = RigContext::new(&mut self.skeleton, &mut self.props, &mut self.tweens);
        match instrument {
            Some(instrument) => self.poses.request_instrument(&mut ctx, instrument, request),
            None => self.poses.request_neutral(&mut ctx, request),
        }
    }

    pub fn hold_melody(&mut self, holding: bool) {
        self.sequencer.hold_melody(holding);
    }

    pub fn press_sound(&mut self, name: &str) -> Result<()> {
        self.sounds.press(name, &mut self.audio)
    }

    pub fn release_sound(&mut self, name: &str) -> Result<()> {
        self.sounds.release(name, &mut self.audio)
    }

    /// 停止所有声音和旋律
    pub fn stop_all_sounds(&mut self) {
        self.sounds.stop_all(&mut self.audio);
        self.sequencer.stop_melody(&mut self.sounds, &mut self.audio);
    }

    /// 宿主加载完道具模型后调用
    pub fn mark_prop_loaded(&mut self, instrument: Instrument) {
        self.props.mark_loaded(instrument);
    }

    pub fn config(&self) -> &AnimationConfig {
        &self.config
    }

    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    pub fn layout(&self) -> &CrabLayout {
        &self.layout
    }

    pub fn rest(&self) -> &RigRest {
        &self.rest
    }

    pub fn props(&self) -> &PropSet {
        &self.props
    }

    pub fn sounds(&self) -> &SoundBank {
        &self.sounds
    }

    pub fn gait(&self) -> &LegGaitController {
        &self.gait
    }

    pub fn sequencer(&self) -> &BeatSequencer {
        &self.sequencer
    }

    pub fn pose(&self) -> Pose {
        self.poses.pose()
    }

    pub fn is_loop_playing(&self) -> bool {
        self.poses.is_loop_playing()
    }

    pub fn selected_instrument(&self) -> Instrument {
        self.selected
    }

    pub fn is_moving(&self) -> bool {
        self.locomotion.is_moving()
    }

    pub fn is_idle(&self) -> bool {
        self.idle.is_playing()
    }

    pub fn last_pulse(&self) -> PulseSignal {
        self.last_pulse
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut A {
        &mut self.audio
    }
}
