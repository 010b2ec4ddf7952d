pub mod enhancement_adapter;
pub mod extraction_adapter;
pub mod provider;
pub mod provider_factory;
pub mod response_parser;
pub mod validator;

pub use enhancement_adapter::TermEnhancementAdapter;
pub use extraction_adapter::EntityExtractionAdapter;
pub use provider::{ProviderAdapter, ProviderBatchResult};
pub use provider_factory::{adapters_for, build_backends, AdapterPair, BackendPair, ProviderKind};
