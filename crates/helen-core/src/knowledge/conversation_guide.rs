//! Conversation-management guide: motivational-interviewing techniques loaded from
//! `conversation_management_guide.json` and split into seed batches.
//!
//! Every section is optional; a guide with only `affirmations` is valid and yields
//! a single batch.

use super::{KnowledgeDomain, SeedBatch, INTERVENTION_LIBRARY, THERAPEUTIC_RESPONSES};
use crate::error::{VaultError, VaultResult};
use crate::seeder::SeedItem;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::Path;

/// Reflection type -> example reflections.
pub type ComplexReflections = BTreeMap<String, Vec<String>>;
/// Indicator type (desire, ability, reason, need, ...) -> example statement.
pub type ChangeTalkIndicators = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationGuide {
    #[serde(default)]
    pub open_questions: Vec<String>,
    #[serde(default)]
    pub affirmations: Vec<String>,
    #[serde(default)]
    pub reflections: Reflections,
    #[serde(default)]
    pub summaries: Summaries,
    #[serde(default)]
    pub deescalation_tools: DeescalationTools,
    #[serde(default)]
    pub task_initiation_helpers: TaskInitiationHelpers,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reflections {
    #[serde(default)]
    pub simple_reflection_starters: Vec<String>,
    #[serde(default)]
    pub complex_reflection_types: ComplexReflections,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Summaries {
    #[serde(default)]
    pub starters: Vec<String>,
    #[serde(default)]
    pub structure: SummaryStructure,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryStructure {
    #[serde(default)]
    pub change_talk_indicators: ChangeTalkIndicators,
    #[serde(default)]
    pub invitation_endings: Vec<String>,
    #[serde(default)]
    pub ambivalence_template: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeescalationTools {
    #[serde(default)]
    pub grounding_prompts: Vec<String>,
    #[serde(default)]
    pub choice_scaffolds: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskInitiationHelpers {
    #[serde(default)]
    pub tiny_steps: Vec<String>,
    #[serde(default)]
    pub externalization_prompts: Vec<String>,
}

impl ConversationGuide {
    /// Reads and parses the guide. Missing or malformed files are `GuideLoad` errors.
    pub fn load(path: &Path) -> VaultResult<Self> {
        let guide_err = |reason: String| VaultError::GuideLoad {
            path: path.to_path_buf(),
            reason,
        };
        let bytes = std::fs::read(path).map_err(|e| guide_err(e.to_string()))?;
        let guide: ConversationGuide =
            serde_json::from_slice(&bytes).map_err(|e| guide_err(e.to_string()))?;
        tracing::info!(
            target: "helen::knowledge",
            path = %path.display(),
            items = guide.item_count(),
            "📖 Loaded conversation guide"
        );
        Ok(guide)
    }

    /// Total number of documents the guide contributes across all batches.
    pub fn item_count(&self) -> usize {
        self.batches().iter().map(|b| b.items.len()).sum()
    }

    fn open_question_items(&self) -> Vec<SeedItem> {
        self.open_questions
            .iter()
            .map(|q| {
                SeedItem::new(
                    q.as_str(),
                    json!({
                        "type": "open_question",
                        "purpose": "exploration",
                        "technique": "motivational_interviewing",
                        "category": "conversation_starter",
                        "tone": "gentle",
                    }),
                )
            })
            .collect()
    }

    fn affirmation_items(&self) -> Vec<SeedItem> {
        self.affirmations
            .iter()
            .map(|a| {
                SeedItem::new(
                    a.as_str(),
                    json!({
                        "type": "affirmation",
                        "purpose": "validation",
                        "technique": "person_centered",
                        "category": "emotional_support",
                        "tone": "validating",
                    }),
                )
            })
            .collect()
    }

    fn reflection_items(&self) -> Vec<SeedItem> {
        let simple = self.reflections.simple_reflection_starters.iter().map(|s| {
            SeedItem::new(
                s.as_str(),
                json!({
                    "type": "reflection_starter",
                    "purpose": "active_listening",
                    "technique": "motivational_interviewing",
                    "category": "conversation_technique",
                    "complexity": "simple",
                }),
            )
        });
        let complex = self
            .reflections
            .complex_reflection_types
            .iter()
            .flat_map(|(reflection_type, examples)| {
                examples.iter().map(move |example| {
                    SeedItem::new(
                        example.as_str(),
                        json!({
                            "type": "reflection_example",
                            "purpose": "deep_understanding",
                            "technique": "motivational_interviewing",
                            "category": "conversation_technique",
                            "complexity": "complex",
                            "reflection_type": reflection_type,
                        }),
                    )
                })
            });
        simple.chain(complex).collect()
    }

    fn summary_items(&self) -> Vec<SeedItem> {
        let structure = &self.summaries.structure;
        let mut items: Vec<SeedItem> = self
            .summaries
            .starters
            .iter()
            .map(|s| {
                SeedItem::new(
                    s.as_str(),
                    json!({
                        "type": "summary_starter",
                        "purpose": "consolidation",
                        "technique": "motivational_interviewing",
                        "category": "conversation_technique",
                        "usage": "transition",
                    }),
                )
            })
            .collect();

        items.extend(structure.change_talk_indicators.iter().map(|(indicator_type, text)| {
            SeedItem::new(
                text.as_str(),
                json!({
                    "type": "change_talk_indicator",
                    "purpose": "motivation_building",
                    "technique": "motivational_interviewing",
                    "category": "behavioral_change",
                    "indicator_type": indicator_type,
                }),
            )
        }));

        items.extend(structure.invitation_endings.iter().map(|ending| {
            SeedItem::new(
                ending.as_str(),
                json!({
                    "type": "invitation_ending",
                    "purpose": "collaboration",
                    "technique": "motivational_interviewing",
                    "category": "conversation_technique",
                    "usage": "closure",
                }),
            )
        }));

        if let Some(template) = structure
            .ambivalence_template
            .as_deref()
            .filter(|t| !t.trim().is_empty())
        {
            items.push(SeedItem::new(
                template,
                json!({
                    "type": "ambivalence_template",
                    "purpose": "conflict_resolution",
                    "technique": "motivational_interviewing",
                    "category": "conversation_technique",
                    "usage": "template",
                }),
            ));
        }
        items
    }

    fn deescalation_items(&self) -> Vec<SeedItem> {
        let tools = &self.deescalation_tools;
        let grounding = tools.grounding_prompts.iter().map(|p| {
            SeedItem::new(
                p.as_str(),
                json!({
                    "type": "grounding_prompt",
                    "purpose": "crisis_stabilization",
                    "technique": "grounding",
                    "category": "crisis_intervention",
                    "crisis_level": "moderate",
                    "duration": "1-2 minutes",
                }),
            )
        });
        let scaffolds = tools.choice_scaffolds.iter().map(|s| {
            SeedItem::new(
                s.as_str(),
                json!({
                    "type": "choice_scaffold",
                    "purpose": "executive_function_support",
                    "technique": "structured_choice",
                    "category": "adhd_support",
                    "crisis_level": "mild",
                    "usage": "decision_making",
                }),
            )
        });
        grounding.chain(scaffolds).collect()
    }

    fn task_initiation_items(&self) -> Vec<SeedItem> {
        let helpers = &self.task_initiation_helpers;
        let steps = helpers.tiny_steps.iter().map(|s| {
            SeedItem::new(
                s.as_str(),
                json!({
                    "type": "tiny_step",
                    "purpose": "task_initiation",
                    "technique": "behavioral_activation",
                    "category": "executive_function",
                    "adhd_support": "task_paralysis",
                    "difficulty": "minimal",
                }),
            )
        });
        let prompts = helpers.externalization_prompts.iter().map(|p| {
            SeedItem::new(
                p.as_str(),
                json!({
                    "type": "externalization_prompt",
                    "purpose": "cognitive_offloading",
                    "technique": "externalization",
                    "category": "executive_function",
                    "adhd_support": "working_memory",
                    "difficulty": "low",
                }),
            )
        });
        steps.chain(prompts).collect()
    }
}

impl KnowledgeDomain for ConversationGuide {
    fn name(&self) -> &str {
        "conversation management guide"
    }

    /// One batch per guide section; empty sections are left out.
    fn batches(&self) -> Vec<SeedBatch> {
        let sections = [
            ("open questions", THERAPEUTIC_RESPONSES, self.open_question_items()),
            ("affirmations", THERAPEUTIC_RESPONSES, self.affirmation_items()),
            ("reflection techniques", THERAPEUTIC_RESPONSES, self.reflection_items()),
            ("summary techniques", THERAPEUTIC_RESPONSES, self.summary_items()),
            ("de-escalation tools", INTERVENTION_LIBRARY, self.deescalation_items()),
            ("task initiation helpers", INTERVENTION_LIBRARY, self.task_initiation_items()),
        ];
        sections
            .into_iter()
            .filter(|(_, _, items)| !items.is_empty())
            .map(|(label, collection, items)| SeedBatch::new(label, collection, items))
            .collect()
    }
}
