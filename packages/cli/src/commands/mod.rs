pub mod check;
pub mod init;
pub mod render;
pub mod replay;

pub use check::{check, CheckArgs};
pub use init::{init, InitArgs};
pub use render::{render, RenderArgs};
pub use replay::{replay, ReplayArgs};
