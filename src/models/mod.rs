pub mod driver;
pub mod event;
pub mod job;
pub mod matching;
pub mod route;
