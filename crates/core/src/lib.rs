pub mod events;
pub mod models;
pub mod records;
pub mod status;
pub mod traits;

pub use events::*;
pub use models::*;
pub use records::*;
pub use status::*;
pub use traits::*;
