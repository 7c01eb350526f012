//! Simulated document-processing stages.
//!
//! Each stage sleeps for a configured delay instead of doing real work, so
//! the progress protocol can be exercised end to end. A real parser or
//! inference worker replaces these by implementing [`Stage`].

mod finalize;
mod pages;
mod parse;

use std::sync::Arc;

pub use finalize::{FinalizeStage, RESULT_SUFFIX};
pub use pages::PageProcessingStage;
pub use parse::ParseStage;

use crate::config::SimulationConfig;
use crate::stage::Stage;

/// `parsing → processing(1..N) → finalizing`.
pub fn simulated_pipeline(config: &SimulationConfig) -> Vec<Arc<dyn Stage>> {
    vec![
        Arc::new(ParseStage::new(config.parse_delay, config.pages)),
        Arc::new(PageProcessingStage::new(config.page_delay, config.pages)),
        Arc::new(FinalizeStage::new(config.finalize_delay)),
    ]
}

/// Sleep unless the configured delay is zero.
async fn simulate_work(delay: std::time::Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
