pub mod config;
pub mod evaluator;

pub use config::EvaluatorConfig;
pub use evaluator::Evaluator;
