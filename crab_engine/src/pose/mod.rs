//! 演奏姿势：乐器表、道具状态、姿势状态机

mod instrument;
mod machine;
mod props;

pub use instrument::{Instrument, InstrumentSpec, LoopChannel, LoopTrack};
pub use machine::{Pose, PoseRequest, PoseRequestOutcome, PoseStateMachine};
pub use props::{PropSet, PropState};
