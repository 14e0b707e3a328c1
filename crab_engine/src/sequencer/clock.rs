//! 固定间隔的节拍时钟
//!
//! 宿主按帧传入经过的时间，时钟换算成应当执行的步数。

use crate::config::AnimationConfig;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BeatClock {
    interval_ms: f32,
    accumulated_ms: f32,
}

impl BeatClock {
    pub fn new(interval_ms: f32) -> Self {
        Self {
            interval_ms: interval_ms.max(f32::EPSILON),
            accumulated_ms: 0.0,
        }
    }

    /// 每拍 32 步
    pub fn from_config(config: &AnimationConfig) -> Self {
        Self::new(config.step_interval_ms())
    }

    pub fn interval_ms(&self) -> f32 {
        self.interval_ms
    }

    /// 累加经过的时间，返回到期的步数
    pub fn advance(&mut self, elapsed_ms: f32) -> u32 {
        self.accumulated_ms += elapsed_ms.max(0.0);
        let mut ticks = 0;
        while self.accumulated_ms >= self.interval_ms {
            self.accumulated_ms -= self.interval_ms;
            ticks += 1;
        }
        ticks
    }

    pub fn reset(&mut self) {
        self.accumulated_ms = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_interval() {
        let clock = BeatClock::from_config(&AnimationConfig::default());
        // 120 / 170 秒一拍，32 步
        assert!((clock.interval_ms() - 705.882_35 / 32.0).abs() < 1e-3);
    }

    #[test]
    fn test_advance_carries_remainder() {
        let mut clock = BeatClock::new(10.0);
        assert_eq!(clock.advance(4.0), 0);
        assert_eq!(clock.advance(7.0), 1);
        assert_eq!(clock.advance(29.0), 3);
        assert_eq!(clock.advance(-5.0), 0);
        clock.reset();
        assert_eq!(clock.advance(9.9), 0);
    }
}
