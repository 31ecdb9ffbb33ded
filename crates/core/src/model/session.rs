use chrono::{DateTime, Utc};

/// Outcome of a confirmed submission, as scored by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizResult {
    score: u32,
    submitted_at: DateTime<Utc>,
}

impl QuizResult {
    #[must_use]
    pub fn new(score: u32, submitted_at: DateTime<Utc>) -> Self {
        Self {
            score,
            submitted_at,
        }
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }
}
