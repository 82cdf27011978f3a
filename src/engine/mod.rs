pub mod appeals;
pub mod checks;
pub mod comments;
pub mod history;
pub mod reviewers;
pub mod reviews;
pub mod stats;
pub mod submissions;

#[cfg(test)]
mod pg_tests;

pub use appeals::AppealEngine;
pub use checks::CheckGateway;
pub use comments::CommentEngine;
pub use history::HistoryLog;
pub use reviewers::ReviewerRegistry;
pub use reviews::ReviewEngine;
pub use stats::StatsEngine;
pub use submissions::SubmissionEngine;
