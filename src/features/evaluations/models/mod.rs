mod evaluation;

pub use evaluation::{CreateEvaluation, Evaluation, EvaluationStatus, UpdateEvaluation};
