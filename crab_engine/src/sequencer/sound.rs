//! 音效表
//!
//! 每个音效登记一次，得到稳定的 `SoundId`。循环音效由音序器按周期
//! 启停；非循环音效（脚步声等）按下即从头播放。

use std::collections::HashMap;

use crate::audio::{AudioBackend, SoundId};
use crate::config::AnimationConfig;
use crate::gait::Footsteps;
use crate::{CrabError, Result};

/// 旋律数量（每种乐器一段）
pub const MELODY_COUNT: usize = 5;
/// 每段旋律的分段数
pub const MELODY_PARTS: usize = 4;

/// 一个已登记的音效
#[derive(Clone, Debug, PartialEq)]
pub struct SoundLoopEntry {
    pub name: String,
    pub sound: SoundId,
    /// 循环周期（步）
    pub period_steps: i32,
    pub looped: bool,
    /// 开始播放后清除请求标志
    pub play_once: bool,
    /// 是否请求播放
    pub requested: bool,
}

/// 音效表
#[derive(Clone, Debug, Default)]
pub struct SoundBank {
    entries: Vec<SoundLoopEntry>,
    by_name: HashMap<String, usize>,
    melodies: Vec<[usize; MELODY_PARTS]>,
    footsteps: Option<Footsteps>,
}

impl SoundBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// 键盘螃蟹的标准音效：鼓、踩镲、贝斯循环，五段旋律，两个脚步声
    pub fn standard(config: &AnimationConfig) -> Self {
        let mut bank = Self::new();
        let period = config.loop_period_steps;
        for i in 1..=10 {
            bank.push(format!("kick_snare_{}", i), period, true, false);
        }
        for i in 1..=9 {
            bank.push(format!("hi_hat_{}", i), period, true, false);
        }
        for i in 1..=7 {
            bank.push(format!("bass_{}", i), period, true, false);
        }
        for i in 1..=MELODY_COUNT {
            let mut parts = [0; MELODY_PARTS];
            for (j, part) in parts.iter_mut().enumerate() {
                let name = format!("melody_{}_P{}", i, j + 1);
                *part = bank.push(name, config.melody_period_steps, true, true).index();
            }
            bank.melodies.push(parts);
        }
        let first = bank.push("crab_walk_1".to_string(), period, false, false);
        let second = bank.push("crab_walk_2".to_string(), period, false, false);
        bank.footsteps = Some(Footsteps { first, second });

        log::info!("音效表: {} 个音效, {} 段旋律", bank.entries.len(), bank.melodies.len());
        bank
    }

    /// 登记新音效；重名或周期不合法时报错
    pub fn register(&mut self, name: &str, period_steps: i32, looped: bool, play_once: bool) -> Result<SoundId> {
        if self.by_name.contains_key(name) {
            return Err(CrabError::InvalidConfig(format!("duplicate sound {}", name)));
        }
        if period_steps <= 1 {
            return Err(CrabError::InvalidConfig(format!(
                "sound {} period must be greater than 1, got {}",
                name, period_steps
            )));
        }
        Ok(self.push(name.to_string(), period_steps, looped, play_once))
    }

    fn push(&mut self, name: String, period_steps: i32, looped: bool, play_once: bool) -> SoundId {
        let sound = SoundId(self.entries.len() as u32);
        self.by_name.insert(name.clone(), sound.index());
        self.entries.push(SoundLoopEntry {
            name,
            sound,
            period_steps,
            looped,
            play_once,
            requested: false,
        });
        sound
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[SoundLoopEntry] {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [SoundLoopEntry] {
        &mut self.entries
    }

    pub fn get(&self, name: &str) -> Result<&SoundLoopEntry> {
        self.by_name
            .get(name)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| CrabError::UnknownSound(name.to_string()))
    }

    pub fn sound_id(&self, name: &str) -> Result<SoundId> {
        self.get(name).map(|entry| entry.sound)
    }

    pub fn footsteps(&self) -> Option<Footsteps> {
        self.footsteps
    }

    pub fn melody_count(&self) -> usize {
        self.melodies.len()
    }

    /// 第 `melody` 段旋律（从 0 开始）的第 `part` 部分（1..=4）
    pub fn melody_part(&self, melody: usize, part: usize) -> Option<&SoundLoopEntry> {
        let index = *self.melodies.get(melody)?.get(part.checked_sub(1)?)?;
        self.entries.get(index)
    }

    pub(crate) fn melody_part_mut(&mut self, melody: usize, part: usize) -> Option<&mut SoundLoopEntry> {
        let index = *self.melodies.get(melody)?.get(part.checked_sub(1)?)?;
        self.entries.get_mut(index)
    }

    /// 按下：循环音效只打开请求标志，由音序器在节拍上启动；
    /// 非循环音效立即从头播放
    pub fn press(&mut self, name: &str, audio: &mut impl AudioBackend) -> Result<()> {
        let index = *self
            .by_name
            .get(name)
            .ok_or_else(|| CrabError::UnknownSound(name.to_string()))?;
        let entry = &mut self.entries[index];
        if entry.looped {
            entry.requested = true;
        } else {
            audio.stop(entry.sound);
            audio.set_playback_offset(entry.sound, 0.0);
            audio.play(entry.sound);
        }
        log::trace!("按下音效 {}", name);
        Ok(())
    }

    /// 松开：清除请求并立即停止
    pub fn release(&mut self, name: &str, audio: &mut impl AudioBackend) -> Result<()> {
        let index = *self
            .by_name
            .get(name)
            .ok_or_else(|| CrabError::UnknownSound(name.to_string()))?;
        let entry = &mut self.entries[index];
        entry.requested = false;
        audio.stop(entry.sound);
        audio.set_playback_offset(entry.sound, 0.0);
        log::trace!("松开音效 {}", name);
        Ok(())
    }

    /// 停止所有旋律分段并清除请求
    pub fn stop_melodies(&mut self, audio: &mut impl AudioBackend) {
        for parts in &self.melodies {
            for &index in parts {
                let entry = &mut self.entries[index];
                entry.requested = false;
                audio.stop(entry.sound);
            }
        }
    }

    /// 停止全部音效并清除所有请求
    pub fn stop_all(&mut self, audio: &mut impl AudioBackend) {
        for entry in &mut self.entries {
            entry.requested = false;
            audio.stop(entry.sound);
        }
        log::debug!("停止全部音效");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{AudioCall, RecordingAudio};

    #[test]
    fn test_standard_bank_layout() {
        let bank = SoundBank::standard(&AnimationConfig::default());
        assert_eq!(bank.len(), 10 + 9 + 7 + 20 + 2);
        assert_eq!(bank.melody_count(), MELODY_COUNT);

        let part = bank.melody_part(2, 4).unwrap();
        assert_eq!(part.name, "melody_3_P4");
        assert!(part.looped && part.play_once);
        assert!(bank.melody_part(0, 0).is_none());
        assert!(bank.melody_part(5, 1).is_none());

        let hat = bank.get("hi_hat_9").unwrap();
        assert_eq!(hat.period_steps, 128);
        assert!(!hat.play_once);

        let footsteps = bank.footsteps().unwrap();
        assert_eq!(footsteps.first, bank.sound_id("crab_walk_1").unwrap());
        assert!(!bank.get("crab_walk_2").unwrap().looped);
    }

    #[test]
    fn test_press_and_release() {
        let mut bank = SoundBank::standard(&AnimationConfig::default());
        let mut audio = RecordingAudio::default();

        bank.press("kick_snare_1", &mut audio).unwrap();
        assert!(bank.get("kick_snare_1").unwrap().requested);
        assert!(audio.calls.is_empty());

        let walk = bank.sound_id("crab_walk_1").unwrap();
        bank.press("crab_walk_1", &mut audio).unwrap();
        assert_eq!(
            audio.calls,
            vec![AudioCall::Stop(walk), AudioCall::Offset(walk, 0.0), AudioCall::Play(walk)]
        );

        audio.clear_calls();
        let kick = bank.sound_id("kick_snare_1").unwrap();
        bank.release("kick_snare_1", &mut audio).unwrap();
        assert!(!bank.get("kick_snare_1").unwrap().requested);
        assert_eq!(audio.calls, vec![AudioCall::Stop(kick), AudioCall::Offset(kick, 0.0)]);

        assert!(matches!(bank.press("cowbell", &mut audio), Err(CrabError::UnknownSound(_))));
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut bank = SoundBank::new();
        let id = bank.register("pad", 64, true, false).unwrap();
        assert_eq!(id, SoundId(0));
        assert!(bank.register("pad", 64, true, false).is_err());
        assert!(bank.register("blip", 1, true, false).is_err());
    }
}
