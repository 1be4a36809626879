//! Application Services
//!
//! - `PairAnalyzer`: one analytics pass over two resampled legs

mod pair_analyzer;

pub use pair_analyzer::{AnalysisOutcome, PairAnalyzer, PairError, PairRequest, PairSnapshot};
