//! 动画系统
//!
//! 提供补间、缓动，以及各动画组件共享的绑定上下文。

mod easing;
mod tween;

pub use easing::{Easing, EasingDirection, EasingStyle};
pub use tween::{Animatable, TweenId, TweenManager, TweenSpec, TweenTarget};

use glam::Vec3;

use crate::pose::PropSet;
use crate::skeleton::Skeleton;

/// 补间可写入的全部属性：骨骼变换 + 乐器道具状态
pub struct RigTargets<'a> {
    pub skeleton: &'a mut Skeleton,
    pub props: &'a mut PropSet,
}

impl Animatable for RigTargets<'_> {
    fn read(&self, target: TweenTarget) -> Vec3 {
        match target {
            TweenTarget::BonePosition(id) => self.skeleton.bone(id).position,
            TweenTarget::BoneRotation(id) => self.skeleton.bone(id).rotation,
            TweenTarget::PropScale(instrument) => self.props.get(instrument).scale,
            TweenTarget::PropGlow(instrument) => self.props.get(instrument).glow,
            TweenTarget::PropOffset(instrument) => self.props.get(instrument).offset,
        }
    }

    fn write(&mut self, target: TweenTarget, value: Vec3) {
        match target {
            TweenTarget::BonePosition(id) => self.skeleton.bone_mut(id).position = value,
            TweenTarget::BoneRotation(id) => self.skeleton.bone_mut(id).rotation = value,
            TweenTarget::PropScale(instrument) => self.props.get_mut(instrument).scale = value,
            TweenTarget::PropGlow(instrument) => self.props.get_mut(instrument).glow = value,
            TweenTarget::PropOffset(instrument) => self.props.get_mut(instrument).offset = value,
        }
    }
}

/// 动画组件共享的可变状态
///
/// 骨骼位置由多个组件轮流写入，谁在写由各组件的状态标志决定。
pub struct RigContext<'a, E> {
    pub skeleton: &'a mut Skeleton,
    pub props: &'a mut PropSet,
    pub tweens: &'a mut TweenManager<E>,
}

impl<'a, E: Clone> RigContext<'a, E> {
    pub fn new(skeleton: &'a mut Skeleton, props: &'a mut PropSet, tweens: &'a mut TweenManager<E>) -> Self {
        Self { skeleton, props, tweens }
    }

    /// 立即写入属性（不经过补间）
    pub fn snap(&mut self, target: TweenTarget, value: Vec3) {
        self.targets().write(target, value);
    }

    pub fn read(&mut self, target: TweenTarget) -> Vec3 {
        self.targets().read(target)
    }

    /// 推进所有补间，返回完成事件
    pub fn update_tweens(&mut self, dt_ms: f32) -> Vec<E> {
        let mut targets = RigTargets {
            skeleton: &mut *self.skeleton,
            props: &mut *self.props,
        };
        self.tweens.update(dt_ms, &mut targets)
    }

    fn targets(&mut self) -> RigTargets<'_> {
        RigTargets {
            skeleton: &mut *self.skeleton,
            props: &mut *self.props,
        }
    }
}
