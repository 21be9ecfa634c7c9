/// Aggregated view of quiz progress, useful for a progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub score: u32,
    pub is_complete: bool,
}

impl SessionProgress {
    /// Share of the quiz answered, 0..=100.
    #[must_use]
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        let pct = self.answered.saturating_mul(100) / self.total;
        u32::try_from(pct).unwrap_or(100)
    }
}
