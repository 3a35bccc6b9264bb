//! Extraction progress states

/// Where an extraction currently is. `Failed` is reachable from any state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExtractionState {
    #[default]
    NotStarted,
    PageLoading {
        attempt: u32,
    },
    ConsentHandling,
    AwaitingTable,
    /// Visiting horizontal stop `stop` (1-based) of `of`
    ScrollingColumns {
        stop: usize,
        of: usize,
    },
    HarvestingHeaders,
    HarvestingRows,
    Done,
    Failed(String),
}

impl std::fmt::Display for ExtractionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionState::NotStarted => write!(f, "not started"),
            ExtractionState::PageLoading { attempt } => write!(f, "page loading (attempt {})", attempt),
            ExtractionState::ConsentHandling => write!(f, "consent handling"),
            ExtractionState::AwaitingTable => write!(f, "awaiting table"),
            ExtractionState::ScrollingColumns { stop, of } => {
                write!(f, "scrolling columns ({}/{})", stop, of)
            }
            ExtractionState::HarvestingHeaders => write!(f, "harvesting headers"),
            ExtractionState::HarvestingRows => write!(f, "harvesting rows"),
            ExtractionState::Done => write!(f, "done"),
            ExtractionState::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}
