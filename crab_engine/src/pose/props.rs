//! 乐器道具状态
//!
//! 道具模型本身由宿主渲染，这里只保存补间写入的可见属性。

use glam::Vec3;

use super::Instrument;

/// 单个道具
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PropState {
    /// 模型是否已加载完成
    pub loaded: bool,
    /// 是否处于显示状态（最近一次切换的方向）
    pub on_screen: bool,
    pub scale: Vec3,
    /// 自发光颜色
    pub glow: Vec3,
    /// 模型相对挂点的偏移
    pub offset: Vec3,
}

impl PropState {
    fn hidden(instrument: Instrument) -> Self {
        Self {
            loaded: false,
            on_screen: false,
            scale: instrument.spec().start_scale,
            glow: Vec3::ONE,
            offset: Vec3::ZERO,
        }
    }
}

/// 五个道具
#[derive(Clone, Debug, PartialEq)]
pub struct PropSet {
    props: [PropState; 5],
}

impl Default for PropSet {
    fn default() -> Self {
        Self::new()
    }
}

impl PropSet {
    /// 全部隐藏、尚未加载
    pub fn new() -> Self {
        Self {
            props: Instrument::ALL.map(PropState::hidden),
        }
    }

    /// 全部隐藏、已加载
    pub fn loaded() -> Self {
        let mut set = Self::new();
        for prop in &mut set.props {
            prop.loaded = true;
        }
        set
    }

    pub fn get(&self, instrument: Instrument) -> &PropState {
        &self.props[instrument.index()]
    }

    pub fn get_mut(&mut self, instrument: Instrument) -> &mut PropState {
        &mut self.props[instrument.index()]
    }

    pub fn mark_loaded(&mut self, instrument: Instrument) {
        self.get_mut(instrument).loaded = true;
        log::debug!("道具 {} 已加载", instrument.name());
    }

    pub fn is_loaded(&self, instrument: Instrument) -> bool {
        self.get(instrument).loaded
    }

    /// 纵向缩放超过阈值视为可见
    pub fn is_visible(&self, instrument: Instrument, threshold: f32) -> bool {
        self.get(instrument).scale.y > threshold
    }

    pub fn iter(&self) -> impl Iterator<Item = (Instrument, &PropState)> {
        Instrument::ALL.into_iter().zip(self.props.iter())
    }
}
