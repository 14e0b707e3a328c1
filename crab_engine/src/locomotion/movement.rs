//! 点到点移动
//!
//! 身体按固定速度水平移动到目标点，开始时下沉、到达后恢复高度。
//! 移动期间每帧让步态控制器检查腿部目标；到达后强制所有腿归位。

use glam::Vec3;

use super::IdleAnimator;
use crate::animation::{Easing, RigContext, TweenSpec, TweenTarget};
use crate::audio::AudioBackend;
use crate::config::AnimationConfig;
use crate::gait::{GaitEvent, LegGaitController};
use crate::rig::{CrabLayout, RigRest};
use crate::skeleton::BoneId;

/// 移动事件（由补间完成回调产生）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MovementEvent {
    Arrived,
}

/// 移动请求结果
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MoveOutcome {
    Started { duration_ms: f32 },
    /// 上一次移动还没结束
    Busy,
}

#[derive(Clone, Debug)]
pub struct Locomotion {
    root: BoneId,
    body: BoneId,
    rest_height: f32,
    speed: f32,
    dip: f32,
    dip_max_ms: f32,
    recover_max_ms: f32,
    moving: bool,
    direction: Option<Vec3>,
    duration_ms: f32,
}

impl Locomotion {
    pub fn new(layout: &CrabLayout, rest: &RigRest, config: &AnimationConfig) -> Self {
        Self {
            root: layout.root,
            body: layout.body_back,
            rest_height: rest.body_height,
            speed: config.movement_speed,
            dip: config.movement_dip,
            dip_max_ms: config.movement_dip_max_ms,
            recover_max_ms: config.movement_recover_max_ms,
            moving: false,
            direction: None,
            duration_ms: 0.0,
        }
    }

    pub fn is_moving(&self) -> bool {
        self.moving
    }

    /// 当前移动的水平方向
    pub fn direction(&self) -> Option<Vec3> {
        self.direction.filter(|_| self.moving)
    }

    /// 把身体移动到世界坐标 `world_point` 的正上方
    pub fn move_to<E>(&mut self, ctx: &mut RigContext<'_, E>, world_point: Vec3, idle: &mut IdleAnimator) -> MoveOutcome
    where
        E: Clone + From<MovementEvent>,
    {
        if self.moving {
            log::trace!("正在移动, 忽略新的移动请求");
            return MoveOutcome::Busy;
        }

        let local = ctx.skeleton.world_to_local(self.root, world_point);
        idle.stop(ctx, None);

        let body = ctx.skeleton.bone(self.body).position;
        let delta = Vec3::new(local.x - body.x, 0.0, local.z - body.z);
        let duration_ms = 1000.0 * delta.length() / self.speed;
        let direction = delta.try_normalize();

        let target = TweenTarget::BonePosition(self.body);
        ctx.tweens.stop_target(target);
        ctx.tweens.animate(
            TweenSpec::new(target, Vec3::Y * (self.rest_height - self.dip), self.dip_max_ms.min(duration_ms / 3.0))
                .easing(Easing::SINE_IN_OUT)
                .axes(false, true, false),
        );
        ctx.tweens.animate(
            TweenSpec::new(target, Vec3::new(local.x, 0.0, local.z), duration_ms)
                .axes(true, false, true)
                .on_complete(E::from(MovementEvent::Arrived)),
        );

        self.moving = true;
        self.direction = direction;
        self.duration_ms = duration_ms;
        log::debug!("开始移动: 距离 {:.3}, 用时 {:.0}ms", delta.length(), duration_ms);
        MoveOutcome::Started { duration_ms }
    }

    /// 移动中每帧调用
    pub fn update<E, A>(&mut self, ctx: &mut RigContext<'_, E>, gait: &mut LegGaitController, audio: &mut A)
    where
        E: Clone + From<GaitEvent>,
        A: AudioBackend,
    {
        if self.moving {
            gait.update_targets(ctx, self.direction, audio);
        }
    }

    /// 水平补间完成：腿全部归位，身体恢复高度
    pub fn on_arrived<E, A>(&mut self, ctx: &mut RigContext<'_, E>, gait: &mut LegGaitController, audio: &mut A)
    where
        E: Clone + From<GaitEvent>,
        A: AudioBackend,
    {
        if !self.moving {
            return;
        }
        gait.force_update(ctx, audio);
        ctx.tweens.animate(
            TweenSpec::new(
                TweenTarget::BonePosition(self.body),
                Vec3::Y * self.rest_height,
                self.recover_max_ms.min(self.duration_ms / 3.0),
            )
            .easing(Easing::SINE_IN_OUT)
            .axes(false, true, false),
        );
        self.moving = false;
        log::debug!("移动结束");
    }
}
