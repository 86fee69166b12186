pub mod binding;
pub mod change;
pub mod doc;
pub mod error;
pub mod health;
pub mod messages;

pub use binding::*;
pub use change::*;
pub use doc::*;
pub use error::*;
pub use health::*;
pub use messages::*;
