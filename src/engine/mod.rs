pub mod jobs;
pub mod matching;
pub mod pool;
