//! 音频播放接口
//!
//! 动画核心只发出抽象的播放指令，解码和输出由宿主实现。

/// 音效句柄，对应 `SoundBank` 中的索引
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SoundId(pub u32);

impl SoundId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// 宿主提供的音频播放器
pub trait AudioBackend {
    fn play(&mut self, sound: SoundId);

    fn stop(&mut self, sound: SoundId);

    fn is_playing(&self, sound: SoundId) -> bool;

    /// 设置下一次播放的起始位置（秒）
    fn set_playback_offset(&mut self, sound: SoundId, seconds: f32);

    /// 音频时长（秒），尚未加载时返回 0
    fn duration(&self, sound: SoundId) -> f32;
}
