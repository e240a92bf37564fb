pub mod file;
pub mod memory;

pub use file::JsonFileSessionStorage;
pub use memory::MemorySessionStorage;
