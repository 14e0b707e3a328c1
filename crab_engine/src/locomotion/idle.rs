//! 待机摆动
//!
//! 身体在四个点之间循环：左上 → 中下 → 右上 → 中下。四段补间首尾串联，
//! 每次启动交替从左或从右开始。

use glam::Vec3;

use crate::animation::{Easing, RigContext, TweenId, TweenSpec, TweenTarget};
use crate::config::AnimationConfig;
use crate::rig::{CrabLayout, RigRest};
use crate::skeleton::BoneId;

#[derive(Clone, Debug)]
pub struct IdleAnimator {
    body: BoneId,
    rest_height: f32,
    segment_ms: f32,
    vertical: f32,
    horizontal: f32,
    /// 循环中的任意一段，停止时沿串联取消整圈
    cycle: Option<TweenId>,
    left_first: bool,
}

impl IdleAnimator {
    pub fn new(layout: &CrabLayout, rest: &RigRest, config: &AnimationConfig) -> Self {
        Self {
            body: layout.body_back,
            rest_height: rest.body_height,
            segment_ms: config.idle_segment_ms(),
            vertical: config.idle_vertical_delta,
            horizontal: config.idle_horizontal_delta,
            cycle: None,
            left_first: false,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.cycle.is_some()
    }

    /// 以 `center` 的水平位置为中心开始摆动；已在播放时返回 false
    ///
    /// 先停掉身体位置上残留的补间（回中、落地恢复），摆动独占身体骨骼。
    pub fn start<E: Clone>(&mut self, ctx: &mut RigContext<'_, E>, center: Vec3) -> bool {
        if self.cycle.is_some() {
            return false;
        }
        ctx.tweens.stop_target(TweenTarget::BonePosition(self.body));
        let center = Vec3::new(center.x, self.rest_height, center.z);

        let up_left = center + Vec3::new(-self.horizontal, self.vertical, 0.0);
        let up_right = center + Vec3::new(self.horizontal, self.vertical, 0.0);
        let [a, b, c, d] = [up_left, center, up_right, center].map(|to| self.segment(ctx, to));
        ctx.tweens.chain(a, b);
        ctx.tweens.chain(b, c);
        ctx.tweens.chain(c, d);
        ctx.tweens.chain(d, a);

        self.left_first = !self.left_first;
        let first = if self.left_first { a } else { c };
        ctx.tweens.start(first);
        self.cycle = Some(first);
        log::debug!("待机开始 ({})", if self.left_first { "左" } else { "右" });
        true
    }

    /// 停止摆动；给出 `recenter_to` 时身体补间回到该位置
    pub fn stop<E: Clone>(&mut self, ctx: &mut RigContext<'_, E>, recenter_to: Option<Vec3>) {
        if let Some(cycle) = self.cycle.take() {
            ctx.tweens.stop_chain(cycle);
            log::debug!("待机停止");
        }
        if let Some(center) = recenter_to {
            ctx.tweens.animate(
                TweenSpec::new(TweenTarget::BonePosition(self.body), center, self.segment_ms)
                    .easing(Easing::SINE_IN_OUT),
            );
        }
    }

    fn segment<E: Clone>(&self, ctx: &mut RigContext<'_, E>, to: Vec3) -> TweenId {
        ctx.tweens.add(
            TweenSpec::new(TweenTarget::BonePosition(self.body), to, self.segment_ms)
                .easing(Easing::SINE_IN_OUT)
                .axes(true, true, false)
                .persistent(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::TweenManager;
    use crate::pose::PropSet;
    use crate::testing::settled_crab;

    #[test]
    fn test_idle_cycles_and_alternates() {
        let crab = settled_crab();
        let config = AnimationConfig::default();
        let mut skeleton = crab.skeleton;
        let mut props = PropSet::new();
        let mut tweens: TweenManager<()> = TweenManager::new();
        let mut idle = IdleAnimator::new(&crab.layout, &crab.rest, &config);
        let body = crab.layout.body_back;
        let start = skeleton.bone(body).position;
        let segment = config.idle_segment_ms();

        let mut ctx = RigContext::new(&mut skeleton, &mut props, &mut tweens);
        assert!(idle.start(&mut ctx, start));
        assert!(!idle.start(&mut ctx, start));

        // 第一段结束时在左上
        ctx.update_tweens(segment);
        let p = ctx.skeleton.bone(body).position;
        assert!((p.x - (start.x - 0.35)).abs() < 1e-4);
        assert!((p.y - (crab.rest.body_height + 0.5)).abs() < 1e-4);
        assert_eq!(p.z, start.z);

        // 一整圈后回到中心，循环仍在继续
        for _ in 0..3 {
            ctx.update_tweens(segment);
        }
        let p = ctx.skeleton.bone(body).position;
        assert!((p - Vec3::new(start.x, crab.rest.body_height, start.z)).length() < 1e-4);
        assert_eq!(ctx.tweens.active_count(), 1);

        idle.stop(&mut ctx, None);
        assert!(!idle.is_playing());
        assert!(ctx.tweens.is_empty());

        // 再次启动从右边开始
        idle.start(&mut ctx, start);
        ctx.update_tweens(segment);
        assert!((ctx.skeleton.bone(body).position.x - (start.x + 0.35)).abs() < 1e-4);
    }

    #[test]
    fn test_stop_with_recenter() {
        let crab = settled_crab();
        let config = AnimationConfig::default();
        let mut skeleton = crab.skeleton;
        let mut props = PropSet::new();
        let mut tweens: TweenManager<()> = TweenManager::new();
        let mut idle = IdleAnimator::new(&crab.layout, &crab.rest, &config);
        let body = crab.layout.body_back;
        let start = skeleton.bone(body).position;

        let mut ctx = RigContext::new(&mut skeleton, &mut props, &mut tweens);
        idle.start(&mut ctx, start);
        ctx.update_tweens(50.0);
        let center = Vec3::new(0.0, crab.rest.body_height, 0.0);
        idle.stop(&mut ctx, Some(center));
        assert_eq!(ctx.tweens.active_count(), 1);
        ctx.update_tweens(config.idle_segment_ms());
        assert!((ctx.skeleton.bone(body).position - center).length() < 1e-4);
        assert!(ctx.tweens.is_empty());
    }

    #[test]
    fn test_start_takes_over_body_position() {
        let crab = settled_crab();
        let config = AnimationConfig::default();
        let mut skeleton = crab.skeleton;
        let mut props = PropSet::new();
        let mut tweens: TweenManager<()> = TweenManager::new();
        let mut idle = IdleAnimator::new(&crab.layout, &crab.rest, &config);
        let body = crab.layout.body_back;
        let center = skeleton.bone(body).position;

        let mut ctx = RigContext::new(&mut skeleton, &mut props, &mut tweens);
        ctx.tweens.animate(TweenSpec::new(TweenTarget::BonePosition(body), center + Vec3::X * 3.0, 1000.0));
        ctx.update_tweens(100.0);
        assert!(idle.start(&mut ctx, center));
        assert_eq!(ctx.tweens.active_count(), 1);

        // 摆动仍以给定中心为准
        ctx.update_tweens(config.idle_segment_ms());
        let p = ctx.skeleton.bone(body).position;
        assert!((p.x - (center.x - 0.35)).abs() < 1e-4);
    }
}
