//! 缓动曲线

use std::f32::consts::{FRAC_PI_2, PI};

/// 缓动类型
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EasingStyle {
    #[default]
    Linear,
    Quadratic,
    Sinusoidal,
}

/// 缓动方向
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EasingDirection {
    #[default]
    In,
    Out,
    InOut,
}

/// 缓动函数 = 类型 + 方向
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Easing {
    pub style: EasingStyle,
    pub direction: EasingDirection,
}

impl Easing {
    pub const LINEAR: Easing = Easing::new(EasingStyle::Linear, EasingDirection::In);
    pub const QUAD_OUT: Easing = Easing::new(EasingStyle::Quadratic, EasingDirection::Out);
    pub const QUAD_IN_OUT: Easing = Easing::new(EasingStyle::Quadratic, EasingDirection::InOut);
    pub const SINE_IN: Easing = Easing::new(EasingStyle::Sinusoidal, EasingDirection::In);
    pub const SINE_OUT: Easing = Easing::new(EasingStyle::Sinusoidal, EasingDirection::Out);
    pub const SINE_IN_OUT: Easing = Easing::new(EasingStyle::Sinusoidal, EasingDirection::InOut);

    pub const fn new(style: EasingStyle, direction: EasingDirection) -> Self {
        Self { style, direction }
    }

    /// 输入进度 [0, 1]，输出缓动后的进度
    pub fn ease(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self.direction {
            EasingDirection::In => ease_in(t, self.style),
            EasingDirection::Out => 1.0 - ease_in(1.0 - t, self.style),
            EasingDirection::InOut => match self.style {
                // 正弦 InOut 直接用闭式，避免分段接缝
                EasingStyle::Sinusoidal => 0.5 * (1.0 - (PI * t).cos()),
                style if t < 0.5 => ease_in(t * 2.0, style) / 2.0,
                style => 1.0 - ease_in((1.0 - t) * 2.0, style) / 2.0,
            },
        }
    }
}

fn ease_in(t: f32, style: EasingStyle) -> f32 {
    match style {
        EasingStyle::Linear => t,
        EasingStyle::Quadratic => t * t,
        EasingStyle::Sinusoidal => 1.0 - (t * FRAC_PI_2).cos(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Easing; 6] = [
        Easing::LINEAR,
        Easing::QUAD_OUT,
        Easing::QUAD_IN_OUT,
        Easing::SINE_IN,
        Easing::SINE_OUT,
        Easing::SINE_IN_OUT,
    ];

    #[test]
    fn test_endpoints() {
        for easing in ALL {
            assert!(easing.ease(0.0).abs() < 1e-6, "{:?}", easing);
            assert!((easing.ease(1.0) - 1.0).abs() < 1e-6, "{:?}", easing);
        }
    }

    #[test]
    fn test_known_values() {
        assert!((Easing::QUAD_OUT.ease(0.5) - 0.75).abs() < 1e-6);
        assert!((Easing::QUAD_IN_OUT.ease(0.25) - 0.125).abs() < 1e-6);
        assert!((Easing::QUAD_IN_OUT.ease(0.5) - 0.5).abs() < 1e-6);
        assert!((Easing::SINE_OUT.ease(0.5) - (PI / 4.0).sin()).abs() < 1e-6);
        assert!((Easing::SINE_IN_OUT.ease(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        assert_eq!(Easing::SINE_IN.ease(-1.0), 0.0);
        assert!((Easing::SINE_IN.ease(2.0) - 1.0).abs() < 1e-6);
    }
}
