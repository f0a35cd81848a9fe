/// Aggregated view of exam progress, useful for UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExamProgress {
    /// 1-based position of the current question.
    pub position: usize,
    pub available: usize,
    pub target: usize,
    pub answered: usize,
    pub correct: usize,
    pub loading: bool,
}
