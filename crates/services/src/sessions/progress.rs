/// Counts shown on the submit confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitReview {
    pub answered: usize,
    pub total: usize,
}

impl SubmitReview {
    #[must_use]
    pub fn all_answered(&self) -> bool {
        self.answered >= self.total
    }

    #[must_use]
    pub fn unanswered(&self) -> usize {
        self.total.saturating_sub(self.answered)
    }
}
