mod process;
mod reader;

#[cfg(test)]
pub mod mock;

pub use process::{AttachProcess, GameProcess, ProcessInfo};
pub use reader::{ReadMemory, WriteMemory, decode_ascii, decode_utf16_le};

#[cfg(test)]
pub use mock::MockMemory;
