pub mod cache_key;
pub mod entity;
pub mod language;
pub mod loaders;
pub mod outcome;
pub mod requirements;
pub mod work_item;

pub use cache_key::CacheKey;
pub use entity::{EntityType, EntityTypeFilter, ExtractedEntity};
pub use loaders::{load_all_work_files, load_work_file, WorkFile};
pub use outcome::{
    BatchReport, EnrichmentOutcome, EnrichmentPayload, ErrorKind, OutcomeError, ProviderRole,
};
pub use requirements::{EnhancementRequirements, ExtractionRequirements, TargetRequirements};
pub use work_item::{Term, TextChunk, WorkItem, WorkItemKind};
