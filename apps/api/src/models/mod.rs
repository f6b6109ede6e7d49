pub mod candidate;
pub mod certification;
pub mod job;
