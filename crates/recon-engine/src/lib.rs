pub mod binding;
pub mod branch;
pub mod config;
pub mod doctor;
pub mod finder;
pub mod root;
pub mod session;
pub mod thread;

pub use binding::*;
pub use branch::*;
pub use config::*;
pub use doctor::*;
pub use finder::*;
pub use root::*;
pub use session::*;
pub use thread::*;
