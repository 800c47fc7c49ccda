//! Curated knowledge domains fed to the seeder.
//!
//! | Collection              | Purpose                                              |
//! |-------------------------|------------------------------------------------------|
//! | `therapeutic_responses` | Validating, educating and reframing replies          |
//! | `intervention_library`  | Grounding, breathing and de-escalation techniques    |
//! | `user_patterns`         | Heuristics for recognising how a user is doing       |
//! | `helen_contexts`        | Conversation memory (written by the service, not seeded here) |
//!
//! A domain only describes content. Whether an item is new is decided by the
//! [`ContentSeeder`](crate::ContentSeeder) against the ledger.

mod conversation_guide;
mod therapeutic;

pub use conversation_guide::{
    ChangeTalkIndicators, ComplexReflections, ConversationGuide, DeescalationTools, Reflections,
    SummaryStructure, Summaries, TaskInitiationHelpers,
};
pub use therapeutic::TherapeuticKnowledge;

use crate::seeder::SeedItem;

pub const THERAPEUTIC_RESPONSES: &str = "therapeutic_responses";
pub const INTERVENTION_LIBRARY: &str = "intervention_library";
pub const USER_PATTERNS: &str = "user_patterns";
pub const HELEN_CONTEXTS: &str = "helen_contexts";

/// Collections reported before and after a seeding run.
pub const SEEDED_COLLECTIONS: [&str; 3] = [THERAPEUTIC_RESPONSES, INTERVENTION_LIBRARY, USER_PATTERNS];

/// Items for one collection, labelled for reports.
#[derive(Debug, Clone)]
pub struct SeedBatch {
    pub label: String,
    pub collection: String,
    pub items: Vec<SeedItem>,
}

impl SeedBatch {
    pub fn new(label: impl Into<String>, collection: &str, items: Vec<SeedItem>) -> Self {
        Self {
            label: label.into(),
            collection: collection.to_string(),
            items,
        }
    }
}

/// A source of curated content, seeded as a sequence of batches.
pub trait KnowledgeDomain: Send + Sync {
    fn name(&self) -> &str;

    fn batches(&self) -> Vec<SeedBatch>;
}
