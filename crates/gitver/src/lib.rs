pub mod error;
pub mod log;
pub mod object;
pub mod resolver;

pub use error::GitVerError;
pub use log::{read_commits, replay, CommitRecord};
pub use object::read_commit_timestamp;
pub use resolver::{resolve, Version};
