//! Data models for Stalewatch

mod account;
mod alert;
mod backup;
mod outcome;
mod report;
mod request;
mod resource;

pub use account::*;
pub use alert::*;
pub use backup::*;
pub use outcome::*;
pub use report::*;
pub use request::*;
pub use resource::*;
