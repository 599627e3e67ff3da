mod evaluation;
mod session;
mod subject;
mod topic;

pub use evaluation::{
    average_score, format_score, parse_date, parse_score, Evaluation, EvaluationPatch,
    NewEvaluation,
};
pub use session::{Session, User};
pub use subject::{EvaluationsUpdate, NewSubject, Subject, SubjectWithTopics};
pub use topic::{NewTopic, Topic, TopicCompletion};
