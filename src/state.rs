use crate::db::DbPool;
use crate::engine::{
    AppealEngine, CheckGateway, CommentEngine, HistoryLog, ReviewEngine, ReviewerRegistry,
    StatsEngine, SubmissionEngine,
};

/// One engine object per workflow component, constructed once at startup and
/// shared by reference through the router.
#[derive(Clone)]
pub struct AppState {
    pub reviewers: ReviewerRegistry,
    pub submissions: SubmissionEngine,
    pub reviews: ReviewEngine,
    pub comments: CommentEngine,
    pub checks: CheckGateway,
    pub appeals: AppealEngine,
    pub history: HistoryLog,
    pub stats: StatsEngine,
}

impl AppState {
    pub fn new(pool: DbPool) -> Self {
        Self {
            reviewers: ReviewerRegistry::new(pool.clone()),
            submissions: SubmissionEngine::new(pool.clone()),
            reviews: ReviewEngine::new(pool.clone()),
            comments: CommentEngine::new(pool.clone()),
            checks: CheckGateway::new(pool.clone()),
            appeals: AppealEngine::new(pool.clone()),
            history: HistoryLog::new(pool.clone()),
            stats: StatsEngine::new(pool),
        }
    }
}
