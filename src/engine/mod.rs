pub mod r#assert;
pub mod normalize;
pub mod resolve;
pub mod runner;
