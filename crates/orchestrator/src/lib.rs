pub mod enrichment;
pub mod manager;
pub mod signer;
pub mod venue;
pub mod window;


// Re-export main types
pub use enrichment::enrich_quotes;
pub use manager::{
    BatchReport, BatchWindowManager, Collaborators, ManagerConfig, OrchestratorError,
    SettlementPlan,
};
pub use signer::LocalSigner;
pub use venue::{
    BatchSubmission, ChainEvent, OperatorSigner, PoolStateProvider, SettlementSubmitter,
    SwapQuote, SwapQuoter, TxReceipt, VenueError,
};
pub use window::{BatchWindow, BlockOutcome, ClosedBatch, PushOutcome};
