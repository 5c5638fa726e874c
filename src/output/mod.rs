pub mod dockerfile;

pub use dockerfile::{BuildScript, Instruction};
