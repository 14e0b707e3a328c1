//! 待机摆动和点到点移动
//!
//! 两者都写入身体骨骼的位置，互斥：移动开始前先停止待机，
//! 移动结束后由音序器在有声音时重新启动待机。

mod idle;
mod movement;

pub use idle::IdleAnimator;
pub use movement::{Locomotion, MoveOutcome, MovementEvent};
