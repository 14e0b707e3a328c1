//! 节拍音序器
//!
//! 每步：
//! 1. 处理旋律的开始/切换/停止
//! 2. 背景脉冲到期时重启
//! 3. 按周期启停循环音效
//! 4. 没有任何声音时把步数复位为 -1 并停止待机和脉冲，否则确保它们在运行
//! 5. 给出旋律动画是否应当播放
//!
//! 音序器只操作音频和自身状态，对动画的要求通过 `SequencerTick` 返回。

use super::SoundBank;
use crate::audio::AudioBackend;
use crate::config::AnimationConfig;

/// 背景脉冲的变化
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PulseSignal {
    #[default]
    Unchanged,
    Started,
    Restarted,
    Stopped,
}

/// 每步需要的外部状态
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickContext {
    /// 螃蟹正在移动
    pub moving: bool,
    /// 待机动画正在播放
    pub idle_playing: bool,
    /// 当前选择的旋律（从 0 开始）
    pub melody: usize,
}

/// 一步的结果
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SequencerTick {
    /// 本步结束后的步数（复位时为 -1）
    pub step: i32,
    pub any_playing: bool,
    pub start_idle: bool,
    /// 停止待机并让身体回到中心
    pub stop_idle: bool,
    pub pulse: PulseSignal,
    /// 旋律正在播放且螃蟹没有移动
    pub melody_animation: bool,
}

#[derive(Clone, Debug)]
pub struct BeatSequencer {
    step: i32,
    step_wrap: i32,
    melody_period: i32,
    melody_entry: i32,
    melody_stop: i32,
    pulse_period: i32,
    holding_melody: bool,
    melody_playing: bool,
    /// 下一个要请求的旋律分段（1..=4）
    next_part: usize,
    pulse_active: bool,
}

impl BeatSequencer {
    pub fn new(config: &AnimationConfig) -> Self {
        Self {
            step: -1,
            step_wrap: config.step_wrap,
            melody_period: config.melody_period_steps,
            melody_entry: config.melody_entry_steps,
            melody_stop: config.melody_stop_steps,
            pulse_period: config.pulse_period_steps(),
            holding_melody: false,
            melody_playing: false,
            next_part: 1,
            pulse_active: false,
        }
    }

    pub fn step(&self) -> i32 {
        self.step
    }

    pub fn is_melody_playing(&self) -> bool {
        self.melody_playing
    }

    pub fn is_holding_melody(&self) -> bool {
        self.holding_melody
    }

    pub fn is_pulse_active(&self) -> bool {
        self.pulse_active
    }

    /// 按住/松开旋律键
    pub fn hold_melody(&mut self, holding: bool) {
        self.holding_melody = holding;
    }

    /// 立即停止全部旋律
    pub fn stop_melody(&mut self, bank: &mut SoundBank, audio: &mut impl AudioBackend) {
        bank.stop_melodies(audio);
        self.next_part = 1;
        self.melody_playing = false;
    }

    /// 推进一步
    pub fn tick(&mut self, bank: &mut SoundBank, audio: &mut impl AudioBackend, context: TickContext) -> SequencerTick {
        self.step += 1;
        if self.step >= self.step_wrap {
            self.step = 0;
        }
        let step = self.step;

        self.update_melody(bank, audio, context);

        let mut pulse = PulseSignal::Unchanged;
        if self.pulse_active && step % self.pulse_period == 0 {
            pulse = PulseSignal::Restarted;
        }

        let mut any_playing = false;
        for entry in bank.entries_mut().iter_mut().filter(|e| e.looped) {
            let period = entry.period_steps;
            if step % period == 0 {
                audio.stop(entry.sound);
            }
            if entry.requested && !audio.is_playing(entry.sound) {
                let offset = audio.duration(entry.sound) * (step % period) as f32 / (period - 1) as f32;
                audio.set_playback_offset(entry.sound, offset);
                audio.play(entry.sound);
                if entry.play_once {
                    entry.requested = false;
                }
            }
            if audio.is_playing(entry.sound) {
                any_playing = true;
            }
        }

        let mut result = SequencerTick {
            step,
            any_playing,
            pulse,
            ..SequencerTick::default()
        };

        if any_playing {
            result.start_idle = !context.idle_playing && !context.moving;
            if !self.pulse_active {
                self.pulse_active = true;
                result.pulse = PulseSignal::Started;
            }
        } else {
            if self.step != -1 {
                log::debug!("没有声音在播放, 步数复位");
            }
            self.step = -1;
            result.step = -1;
            result.stop_idle = context.idle_playing;
            if self.pulse_active {
                self.pulse_active = false;
                result.pulse = PulseSignal::Stopped;
            }
        }

        result.melody_animation = self.melody_playing && !context.moving;
        result
    }

    fn update_melody(&mut self, bank: &mut SoundBank, audio: &mut impl AudioBackend, context: TickContext) {
        let step = self.step;
        if self.holding_melody && !context.moving {
            if step % self.melody_period == 0 {
                self.request_next_part(bank, context.melody);
            } else if !self.melody_playing && step % self.melody_entry == 0 {
                // 从当前窗口对应的位置切入第一段
                let Some(entry) = bank.melody_part(context.melody, 1) else {
                    log::warn!("旋律 {} 不存在", context.melody);
                    return;
                };
                let (sound, period) = (entry.sound, entry.period_steps);
                let offset = audio.duration(sound) * ((step - 1) % period) as f32 / (period - 1) as f32;
                audio.set_playback_offset(sound, offset);
                audio.play(sound);
                self.melody_playing = true;
                self.next_part = 2;
                log::debug!("旋律 {} 在第 {} 步切入", context.melody + 1, step);
            }
        } else if self.melody_playing && step % self.melody_stop == 0 {
            self.stop_melody(bank, audio);
            log::debug!("旋律在第 {} 步停止", step);
        }
    }

    /// 请求下一段旋律，由循环音效的逻辑在本步启动
    fn request_next_part(&mut self, bank: &mut SoundBank, melody: usize) {
        let part = self.next_part;
        self.next_part = if part >= super::MELODY_PARTS { 1 } else { part + 1 };
        match bank.melody_part_mut(melody, part) {
            Some(entry) => {
                entry.requested = true;
                self.melody_playing = true;
            }
            None => log::warn!("旋律 {} 不存在", melody),
        }
    }
}
