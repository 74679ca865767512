pub mod decision;
pub mod evaluator;
pub mod refresh;
