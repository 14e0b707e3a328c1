//! 补间动画管理
//!
//! 以毫秒推进的 Vec3 补间。支持延迟、分轴掩码、串联（A 完成后自动启动 B）
//! 以及整条串联链的取消。完成事件以泛型 `E` 返回给调用方分发。

use glam::{BVec3, Vec3};
use std::collections::{HashMap, HashSet, VecDeque};

use super::Easing;
use crate::pose::Instrument;
use crate::skeleton::BoneId;

/// 补间句柄
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TweenId(u64);

/// 补间写入的属性
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TweenTarget {
    BonePosition(BoneId),
    /// 欧拉角
    BoneRotation(BoneId),
    PropScale(Instrument),
    /// 自发光颜色（RGB）
    PropGlow(Instrument),
    PropOffset(Instrument),
}

/// 可被补间读写的一组属性
pub trait Animatable {
    fn read(&self, target: TweenTarget) -> Vec3;
    fn write(&mut self, target: TweenTarget, value: Vec3);
}

/// 补间配置
#[derive(Clone, Debug)]
pub struct TweenSpec<E> {
    pub target: TweenTarget,
    pub to: Vec3,
    pub duration_ms: f32,
    pub easing: Easing,
    pub delay_ms: f32,
    /// 只写入为 true 的分量
    pub axes: BVec3,
    pub on_complete: Option<E>,
    /// 完成或停止后保留，可再次启动（循环链需要）
    pub persistent: bool,
}

impl<E> TweenSpec<E> {
    pub fn new(target: TweenTarget, to: Vec3, duration_ms: f32) -> Self {
        Self {
            target,
            to,
            duration_ms,
            easing: Easing::LINEAR,
            delay_ms: 0.0,
            axes: BVec3::TRUE,
            on_complete: None,
            persistent: false,
        }
    }

    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn delay(mut self, delay_ms: f32) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn axes(mut self, x: bool, y: bool, z: bool) -> Self {
        self.axes = BVec3::new(x, y, z);
        self
    }

    pub fn on_complete(mut self, event: E) -> Self {
        self.on_complete = Some(event);
        self
    }

    pub fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum TweenState {
    /// 已创建，等待 start 或串联触发
    Idle,
    Waiting { remaining_ms: f32 },
    Running,
}

#[derive(Clone, Debug)]
struct Tween<E> {
    spec: TweenSpec<E>,
    state: TweenState,
    /// 起始值在真正开始运行时捕获
    from: Option<Vec3>,
    elapsed_ms: f32,
    chained: Vec<TweenId>,
    /// 本帧是否已推进过
    last_frame: u64,
    /// 同帧内被重新启动时留到下一帧的时间
    carry_ms: f32,
}

impl<E> Tween<E> {
    fn is_active(&self) -> bool {
        self.state != TweenState::Idle
    }

    fn begin(&mut self) {
        self.from = None;
        self.elapsed_ms = 0.0;
        self.carry_ms = 0.0;
        self.state = if self.spec.delay_ms > 0.0 {
            TweenState::Waiting { remaining_ms: self.spec.delay_ms }
        } else {
            TweenState::Running
        };
    }

    /// 推进 dt 毫秒；完成时返回多出来的时间
    fn advance(&mut self, mut dt_ms: f32, world: &mut impl Animatable) -> Option<f32> {
        if let TweenState::Waiting { remaining_ms } = self.state {
            if dt_ms < remaining_ms {
                self.state = TweenState::Waiting { remaining_ms: remaining_ms - dt_ms };
                return None;
            }
            dt_ms -= remaining_ms;
            self.state = TweenState::Running;
        }

        let target = self.spec.target;
        let from = *self.from.get_or_insert_with(|| world.read(target));
        self.elapsed_ms += dt_ms;

        let progress = if self.spec.duration_ms <= 0.0 {
            1.0
        } else {
            (self.elapsed_ms / self.spec.duration_ms).min(1.0)
        };
        let value = from.lerp(self.spec.to, self.spec.easing.ease(progress));
        let current = world.read(target);
        world.write(target, Vec3::select(self.spec.axes, value, current));

        if progress >= 1.0 {
            Some((self.elapsed_ms - self.spec.duration_ms).max(0.0))
        } else {
            None
        }
    }
}

/// 补间管理器
#[derive(Clone, Debug)]
pub struct TweenManager<E> {
    tweens: HashMap<TweenId, Tween<E>>,
    next_id: u64,
    frame: u64,
}

impl<E> Default for TweenManager<E> {
    fn default() -> Self {
        Self {
            tweens: HashMap::new(),
            next_id: 0,
            frame: 0,
        }
    }
}

impl<E: Clone> TweenManager<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册补间但不启动
    pub fn add(&mut self, spec: TweenSpec<E>) -> TweenId {
        let id = TweenId(self.next_id);
        self.next_id += 1;
        self.tweens.insert(
            id,
            Tween {
                spec,
                state: TweenState::Idle,
                from: None,
                elapsed_ms: 0.0,
                chained: Vec::new(),
                last_frame: 0,
                carry_ms: 0.0,
            },
        );
        id
    }

    /// 启动（或重新启动）补间
    pub fn start(&mut self, id: TweenId) -> bool {
        match self.tweens.get_mut(&id) {
            Some(tween) => {
                tween.begin();
                true
            }
            None => false,
        }
    }

    /// 注册并立即启动
    pub fn animate(&mut self, spec: TweenSpec<E>) -> TweenId {
        let id = self.add(spec);
        self.start(id);
        id
    }

    /// `first` 完成时自动启动 `next`
    pub fn chain(&mut self, first: TweenId, next: TweenId) {
        if let Some(tween) = self.tweens.get_mut(&first) {
            tween.chained.push(next);
        }
    }

    /// 停止单个补间（不影响串联的后续补间）
    pub fn stop(&mut self, id: TweenId) {
        let remove = match self.tweens.get_mut(&id) {
            Some(tween) => {
                tween.state = TweenState::Idle;
                !tween.spec.persistent
            }
            None => false,
        };
        if remove {
            self.tweens.remove(&id);
        }
    }

    /// 停止并移除整条串联链（包括尚未开始的环节）
    pub fn stop_chain(&mut self, id: TweenId) {
        let mut visited = HashSet::new();
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if !visited.insert(current) {
                continue;
            }
            if let Some(tween) = self.tweens.remove(&current) {
                pending.extend(tween.chained);
            }
        }
    }

    /// 停止所有正在写入该属性的补间链
    pub fn stop_target(&mut self, target: TweenTarget) {
        let ids: Vec<TweenId> = self
            .tweens
            .iter()
            .filter(|(_, t)| t.spec.target == target && t.is_active())
            .map(|(&id, _)| id)
            .collect();
        for id in ids {
            self.stop_chain(id);
        }
    }

    pub fn is_active(&self, id: TweenId) -> bool {
        self.tweens.get(&id).map_or(false, Tween::is_active)
    }

    /// 是否有补间正在写入该属性
    pub fn is_animating(&self, target: TweenTarget) -> bool {
        self.tweens.values().any(|t| t.spec.target == target && t.is_active())
    }

    pub fn active_count(&self) -> usize {
        self.tweens.values().filter(|t| t.is_active()).count()
    }

    /// 已注册的补间数量（含未启动的）
    pub fn len(&self) -> usize {
        self.tweens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tweens.is_empty()
    }

    /// 推进所有补间，返回本帧完成的事件
    ///
    /// 完成后串联的补间用剩余时间继续推进；每个补间每帧最多推进一次，
    /// 循环链不会在同一帧里无限展开。本帧已推进过的后续补间把剩余时间
    /// 留到下一帧（最多一帧的时长）。
    pub fn update(&mut self, dt_ms: f32, world: &mut impl Animatable) -> Vec<E> {
        self.frame += 1;
        let frame = self.frame;
        let mut events = Vec::new();

        let mut queue: VecDeque<(TweenId, f32)> = {
            let mut ids: Vec<TweenId> = self
                .tweens
                .iter()
                .filter(|(_, t)| t.is_active())
                .map(|(&id, _)| id)
                .collect();
            // 按创建顺序推进，后创建的补间覆盖先创建的
            ids.sort();
            ids.into_iter().map(|id| (id, dt_ms)).collect()
        };

        while let Some((id, dt)) = queue.pop_front() {
            let Some(tween) = self.tweens.get_mut(&id) else {
                continue;
            };
            if !tween.is_active() || tween.last_frame == frame {
                continue;
            }
            tween.last_frame = frame;
            let dt = dt + std::mem::take(&mut tween.carry_ms);

            let Some(leftover) = tween.advance(dt, world) else {
                continue;
            };

            tween.state = TweenState::Idle;
            events.extend(tween.spec.on_complete.clone());
            let chained = tween.chained.clone();
            if !tween.spec.persistent {
                self.tweens.remove(&id);
            }

            for next in chained {
                if !self.start(next) {
                    continue;
                }
                match self.tweens.get_mut(&next) {
                    Some(tween) if tween.last_frame == frame => tween.carry_ms = leftover.min(dt_ms),
                    _ => queue.push_back((next, leftover)),
                }
            }
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Values(HashMap<TweenTarget, Vec3>);

    impl Animatable for Values {
        fn read(&self, target: TweenTarget) -> Vec3 {
            self.0.get(&target).copied().unwrap_or(Vec3::ZERO)
        }

        fn write(&mut self, target: TweenTarget, value: Vec3) {
            self.0.insert(target, value);
        }
    }

    const BODY: TweenTarget = TweenTarget::BonePosition(BoneId(1));

    #[test]
    fn test_linear_progress_and_completion_event() {
        let mut values = Values::default();
        let mut tweens: TweenManager<&str> = TweenManager::new();
        let id = tweens.animate(TweenSpec::new(BODY, Vec3::new(10.0, 0.0, 0.0), 100.0).on_complete("done"));

        assert!(tweens.update(50.0, &mut values).is_empty());
        assert!((values.read(BODY).x - 5.0).abs() < 1e-5);

        assert_eq!(tweens.update(50.0, &mut values), vec!["done"]);
        assert_eq!(values.read(BODY), Vec3::new(10.0, 0.0, 0.0));
        assert!(!tweens.is_active(id));
        assert!(tweens.is_empty());
    }

    #[test]
    fn test_axis_mask_leaves_other_components() {
        let mut values = Values::default();
        values.write(BODY, Vec3::new(1.0, 2.0, 3.0));
        let mut tweens: TweenManager<()> = TweenManager::new();
        tweens.animate(TweenSpec::new(BODY, Vec3::new(9.0, 9.0, 9.0), 10.0).axes(false, true, false));
        tweens.update(10.0, &mut values);
        assert_eq!(values.read(BODY), Vec3::new(1.0, 9.0, 3.0));
    }

    #[test]
    fn test_delay_captures_start_late() {
        let mut values = Values::default();
        let mut tweens: TweenManager<()> = TweenManager::new();
        tweens.animate(TweenSpec::new(BODY, Vec3::X * 4.0, 100.0).delay(50.0));
        tweens.update(40.0, &mut values);
        assert_eq!(values.read(BODY), Vec3::ZERO);

        // 延迟期间被别人改写，起点以开始运行时为准
        values.write(BODY, Vec3::X * 2.0);
        tweens.update(60.0, &mut values);
        // 剩余 50ms 推进一半：2 → 4 的中点
        assert!((values.read(BODY).x - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_chain_carries_leftover_time() {
        let mut values = Values::default();
        let mut tweens: TweenManager<u8> = TweenManager::new();
        let up = tweens.add(TweenSpec::new(BODY, Vec3::Y, 100.0).on_complete(1));
        let down = tweens.add(TweenSpec::new(BODY, Vec3::ZERO, 100.0).on_complete(2));
        tweens.chain(up, down);
        tweens.start(up);

        assert_eq!(tweens.update(150.0, &mut values), vec![1]);
        assert!(tweens.is_active(down));
        assert!((values.read(BODY).y - 0.5).abs() < 1e-5);
        assert_eq!(tweens.update(50.0, &mut values), vec![2]);
        assert!(tweens.is_empty());
    }

    #[test]
    fn test_cycle_keeps_leftover_for_next_frame() {
        let mut values = Values::default();
        let mut tweens: TweenManager<()> = TweenManager::new();
        let up = tweens.add(TweenSpec::new(BODY, Vec3::Y, 100.0).persistent());
        let down = tweens.add(TweenSpec::new(BODY, Vec3::ZERO, 30.0).persistent());
        tweens.chain(up, down);
        tweens.chain(down, up);
        tweens.start(up);

        // up 用掉 100ms，down 用掉 30ms，剩下 20ms 留给重新开始的 up
        tweens.update(150.0, &mut values);
        assert_eq!(values.read(BODY), Vec3::ZERO);
        assert!(tweens.is_active(up));

        tweens.update(10.0, &mut values);
        assert!((values.read(BODY).y - 0.3).abs() < 1e-5);
    }

    #[test]
    fn test_stop_chain_cancels_pending_links() {
        let mut values = Values::default();
        let mut tweens: TweenManager<()> = TweenManager::new();
        let a = tweens.add(TweenSpec::new(BODY, Vec3::Y, 100.0).persistent());
        let b = tweens.add(TweenSpec::new(BODY, Vec3::ZERO, 100.0).persistent());
        tweens.chain(a, b);
        tweens.chain(b, a);
        tweens.start(a);

        for _ in 0..5 {
            tweens.update(70.0, &mut values);
        }
        assert_eq!(tweens.active_count(), 1);

        tweens.stop_chain(a);
        assert!(tweens.is_empty());
        let frozen = values.read(BODY);
        tweens.update(500.0, &mut values);
        assert_eq!(values.read(BODY), frozen);
    }

    #[test]
    fn test_stop_single_keeps_chain_target_idle() {
        let mut values = Values::default();
        let mut tweens: TweenManager<()> = TweenManager::new();
        let a = tweens.add(TweenSpec::new(BODY, Vec3::Y, 100.0));
        let b = tweens.add(TweenSpec::new(BODY, Vec3::ZERO, 100.0));
        tweens.chain(a, b);
        tweens.start(a);
        tweens.stop(a);
        tweens.update(200.0, &mut values);
        assert!(!tweens.is_active(b));
        assert_eq!(values.read(BODY), Vec3::ZERO);
    }

    #[test]
    fn test_stop_target() {
        let mut values = Values::default();
        let mut tweens: TweenManager<()> = TweenManager::new();
        let other = TweenTarget::BonePosition(BoneId(2));
        tweens.animate(TweenSpec::new(BODY, Vec3::Y, 100.0));
        tweens.animate(TweenSpec::new(other, Vec3::Y, 100.0));
        assert!(tweens.is_animating(BODY));
        tweens.stop_target(BODY);
        assert!(!tweens.is_animating(BODY));
        assert!(tweens.is_animating(other));
    }
}
