mod evaluation_repository;

pub use evaluation_repository::{EvaluationRepository, PgEvaluationRepository};
