pub mod batch_ctx;
pub mod fallback;

pub use batch_ctx::BatchCtx;
pub use fallback::{BatchOutcome, FallbackOrchestrator};
