//! 动画配置
//!
//! 所有参数扁平化，直接在代码中修改默认值即可。

use once_cell::sync::Lazy;
use std::f32::consts::PI;
use std::sync::RwLock;

use crate::{CrabError, Result};

/// 每拍的步数
pub const STEPS_PER_BEAT: u32 = 32;

/// 动画配置（扁平化，不嵌套）
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationConfig {
    // ========== 节拍 ==========
    /// 节拍速度，默认 170
    pub bps: f32,
    /// 步进计数回绕值（4 小节 × 32 步 × 4），默认 512
    pub step_wrap: i32,
    /// 循环音效的周期（步），默认 128
    pub loop_period_steps: i32,
    /// 旋律的周期（步），默认 128
    pub melody_period_steps: i32,
    /// 旋律中途进入的量化步长，默认 16
    pub melody_entry_steps: i32,
    /// 旋律停止的量化步长，默认 8
    pub melody_stop_steps: i32,
    /// 背景脉冲效果每隔多少拍重启，默认 0.5
    pub pulse_each_beats: f32,

    // ========== IK ==========
    /// 每条 IK 链的迭代次数，默认 3
    pub ik_iterations: u32,
    /// 加载时预热求解的次数，默认 100
    pub ik_warmup_passes: u32,
    /// 腿部关节角度限制基础增量（弧度），默认 π/24
    pub leg_limit_delta: f32,
    /// 手臂关节角度限制基础增量（弧度），默认 π/36
    pub arm_limit_delta: f32,

    // ========== 加载姿势 ==========
    /// 加载后身体骨骼的下移量，默认 -0.5
    pub initial_body_drop: f32,
    /// 加载后腿部目标向身体收拢的距离，默认 0.75
    pub initial_leg_tuck: f32,

    // ========== 步态 ==========
    /// 腿部目标偏离多远后触发迈步，默认 0.675
    pub leg_trigger_distance: f32,
    /// 沿移动方向的前瞻距离，默认 0.625
    pub leg_lookahead: f32,
    /// 迈步时抬腿高度，默认 1.125
    pub leg_lift_height: f32,

    // ========== 移动 ==========
    /// 移动速度（单位/秒），默认 12.5
    pub movement_speed: f32,
    /// 移动开始时身体下沉量，默认 0.1
    pub movement_dip: f32,
    /// 下沉动画最长时间（毫秒），默认 250
    pub movement_dip_max_ms: f32,
    /// 恢复动画最长时间（毫秒），默认 200
    pub movement_recover_max_ms: f32,

    // ========== 待机 ==========
    /// 待机上下摆动幅度，默认 0.5
    pub idle_vertical_delta: f32,
    /// 待机左右摆动幅度，默认 0.35
    pub idle_horizontal_delta: f32,

    // ========== 姿势 ==========
    /// 姿势过渡时长占一拍的比例，默认 0.5
    pub pose_transition_beats: f32,
    /// 过渡完成定时相对动画时长的放大系数，默认 1.01
    pub pose_completion_slack: f32,
    /// 乐器缩放高于此值视为仍在屏幕上，默认 0.75
    pub prop_visible_threshold: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            // 注意：一拍的时长按 120 / bps 计算
            bps: 170.0,
            step_wrap: 512,
            loop_period_steps: 128,
            melody_period_steps: 128,
            melody_entry_steps: 16,
            melody_stop_steps: 8,
            pulse_each_beats: 0.5,

            ik_iterations: 3,
            ik_warmup_passes: 100,
            leg_limit_delta: PI / 24.0,
            arm_limit_delta: PI / 36.0,

            initial_body_drop: -0.5,
            initial_leg_tuck: 0.75,

            leg_trigger_distance: 0.675,
            leg_lookahead: 0.625,
            leg_lift_height: 1.125,

            movement_speed: 12.5,
            movement_dip: 0.1,
            movement_dip_max_ms: 250.0,
            movement_recover_max_ms: 200.0,

            idle_vertical_delta: 0.5,
            idle_horizontal_delta: 0.35,

            pose_transition_beats: 0.5,
            pose_completion_slack: 1.01,
            prop_visible_threshold: 0.75,
        }
    }
}

impl AnimationConfig {
    /// 检查配置是否可用
    pub fn validate(&self) -> Result<()> {
        if !(self.bps > 0.0) {
            return Err(CrabError::InvalidConfig(format!("bps must be positive, got {}", self.bps)));
        }
        if !(self.movement_speed > 0.0) {
            return Err(CrabError::InvalidConfig(format!(
                "movement_speed must be positive, got {}",
                self.movement_speed
            )));
        }
        if self.ik_iterations == 0 {
            return Err(CrabError::InvalidConfig("ik_iterations must be at least 1".to_string()));
        }
        for (name, value) in [
            ("step_wrap", self.step_wrap),
            ("loop_period_steps", self.loop_period_steps),
            ("melody_period_steps", self.melody_period_steps),
            ("melody_entry_steps", self.melody_entry_steps),
            ("melody_stop_steps", self.melody_stop_steps),
        ] {
            if value <= 1 {
                return Err(CrabError::InvalidConfig(format!("{} must be greater than 1, got {}", name, value)));
            }
        }
        Ok(())
    }

    /// 一拍的时长（毫秒）
    pub fn beat_duration_ms(&self) -> f32 {
        120.0 / self.bps * 1000.0
    }

    /// 音序器步进间隔（毫秒）
    pub fn step_interval_ms(&self) -> f32 {
        self.beat_duration_ms() / STEPS_PER_BEAT as f32
    }

    /// 姿势过渡动画时长（毫秒）
    pub fn pose_transition_ms(&self) -> f32 {
        self.beat_duration_ms() * self.pose_transition_beats
    }

    /// 单次迈步的时长（毫秒）
    pub fn leg_step_ms(&self) -> f32 {
        1000.0 * (self.leg_trigger_distance + self.leg_lookahead) / (2.0 * self.movement_speed)
    }

    /// 待机循环每一段的时长（毫秒）
    pub fn idle_segment_ms(&self) -> f32 {
        self.beat_duration_ms() / 4.0
    }

    /// 背景脉冲的重启周期（步）
    pub fn pulse_period_steps(&self) -> i32 {
        ((64.0 * self.pulse_each_beats).floor() as i32).max(1)
    }
}

/// 全局配置实例
static ANIMATION_CONFIG: Lazy<RwLock<AnimationConfig>> = Lazy::new(|| {
    RwLock::new(AnimationConfig::default())
});

/// 获取当前配置（只读）
pub fn get_config() -> AnimationConfig {
    match ANIMATION_CONFIG.read() {
        Ok(config) => config.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// 手动设置配置（用于运行时调试）
pub fn set_config(config: AnimationConfig) -> Result<()> {
    config.validate()?;
    log::info!("[动画配置] bps={}, 移动速度={}, IK迭代={}", config.bps, config.movement_speed, config.ik_iterations);
    match ANIMATION_CONFIG.write() {
        Ok(mut guard) => *guard = config,
        Err(poisoned) => *poisoned.into_inner() = config,
    }
    Ok(())
}

/// 重置为默认配置
pub fn reset_config() {
    match ANIMATION_CONFIG.write() {
        Ok(mut guard) => *guard = AnimationConfig::default(),
        Err(poisoned) => *poisoned.into_inner() = AnimationConfig::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_durations() {
        let config = AnimationConfig::default();
        let beat = 120.0 / 170.0 * 1000.0;
        assert!((config.beat_duration_ms() - beat).abs() < 1e-3);
        assert!((config.step_interval_ms() - beat / 32.0).abs() < 1e-4);
        assert!((config.pose_transition_ms() - beat / 2.0).abs() < 1e-3);
        assert!((config.leg_step_ms() - 52.0).abs() < 1e-3);
        assert_eq!(config.pulse_period_steps(), 32);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(AnimationConfig::default().validate().is_ok());

        let config = AnimationConfig { bps: 0.0, ..AnimationConfig::default() };
        assert!(matches!(config.validate(), Err(CrabError::InvalidConfig(_))));

        let config = AnimationConfig { ik_iterations: 0, ..AnimationConfig::default() };
        assert!(config.validate().is_err());

        let config = AnimationConfig { loop_period_steps: 1, ..AnimationConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_global_config_roundtrip() {
        let custom = AnimationConfig { bps: 120.0, ..AnimationConfig::default() };
        set_config(custom.clone()).unwrap();
        assert_eq!(get_config().bps, 120.0);
        assert!(set_config(AnimationConfig { bps: -1.0, ..custom }).is_err());
        reset_config();
        assert_eq!(get_config(), AnimationConfig::default());
    }
}
