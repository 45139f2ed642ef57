mod admin;
mod error;
mod health_check;
mod home;
mod unsubscribe;

pub use admin::*;
pub use error::*;
pub use health_check::*;
pub use home::*;
pub use unsubscribe::*;
