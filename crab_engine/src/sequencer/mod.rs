//! 节拍音序器：时钟、音效表、逐步的循环逻辑

mod clock;
mod looper;
mod sound;

pub use clock::BeatClock;
pub use looper::{BeatSequencer, PulseSignal, SequencerTick, TickContext};
pub use sound::{SoundBank, SoundLoopEntry, MELODY_COUNT, MELODY_PARTS};
