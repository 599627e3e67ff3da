mod dashboard;
mod login;
mod schedule;
mod subjects;
mod topics;

pub use dashboard::{DashboardRow, DashboardView};
pub use login::{sign_in_message, AuthMode, LoginField, LoginForm};
pub use schedule::SCHEDULE_PLACEHOLDER;
pub use subjects::SubjectsView;
pub use topics::TopicsView;
