//! Static therapeutic knowledge: ADHD-adapted responses, crisis interventions and
//! user-pattern heuristics.

use super::{KnowledgeDomain, SeedBatch, INTERVENTION_LIBRARY, THERAPEUTIC_RESPONSES, USER_PATTERNS};
use crate::seeder::SeedItem;
use serde_json::json;

/// (document, type, topic, crisis_level)
const RESPONSES: [(&str, &str, &str, &str); 15] = [
    (
        "ADHD brains feel emotions more intensely - what you're experiencing is real and valid.",
        "validation",
        "emotional_intensity",
        "mild",
    ),
    (
        "Your ADHD brain is working extra hard right now. You're doing the best you can.",
        "validation",
        "effort_recognition",
        "moderate",
    ),
    (
        "Emotional overwhelm with ADHD is exhausting. You're showing real strength by reaching out.",
        "validation",
        "overwhelm",
        "moderate",
    ),
    (
        "ADHD makes everything feel more urgent and intense. Let's slow this down together.",
        "grounding",
        "urgency",
        "severe",
    ),
    (
        "Your ADHD brain processes things differently, and that includes stress. This will pass.",
        "reassurance",
        "difference",
        "mild",
    ),
    (
        "Executive dysfunction is real with ADHD. It's not laziness - your brain works differently.",
        "education",
        "executive_dysfunction",
        "mild",
    ),
    (
        "ADHD hyperfocus can be both a gift and a challenge. You're not broken, you're different.",
        "reframe",
        "hyperfocus",
        "none",
    ),
    (
        "Rejection sensitivity with ADHD can make criticism feel devastating. Your feelings are valid.",
        "validation",
        "rejection_sensitivity",
        "moderate",
    ),
    (
        "ADHD time blindness makes planning hard. Let's break this into tiny, manageable steps.",
        "education",
        "time_blindness",
        "mild",
    ),
    (
        "Your ADHD brain needs more dopamine to feel motivated. This isn't a character flaw.",
        "education",
        "motivation",
        "mild",
    ),
    (
        "Emotional dysregulation with ADHD means big feelings. You're not too sensitive.",
        "validation",
        "emotional_dysregulation",
        "moderate",
    ),
    (
        "ADHD working memory challenges make following instructions hard. Let's simplify this.",
        "education",
        "working_memory",
        "mild",
    ),
    (
        "Your ADHD brain thrives on novelty and stimulation. Boredom can feel physically painful.",
        "education",
        "stimulation_needs",
        "none",
    ),
    (
        "Masking ADHD symptoms is exhausting. You deserve understanding and accommodation.",
        "validation",
        "masking",
        "moderate",
    ),
    (
        "ADHD paralysis when overwhelmed is real. Let's find just one small thing you can do.",
        "grounding",
        "paralysis",
        "severe",
    ),
];

/// (document, technique, crisis_level, duration, type)
const INTERVENTIONS: [(&str, &str, &str, &str, &str); 15] = [
    (
        "Let's start with just one deep breath. In through your nose for 4 counts, hold for 4, out through your mouth for 6.",
        "breathing",
        "moderate",
        "30 seconds",
        "physiological",
    ),
    (
        "Right now, name 5 things you can see, 4 things you can touch, 3 things you can hear, 2 things you can smell, 1 thing you can taste.",
        "grounding",
        "moderate",
        "2 minutes",
        "sensory",
    ),
    (
        "Your safety is the most important thing right now. Are you in a safe space? Can you move to one if needed?",
        "safety",
        "severe",
        "1 minute",
        "assessment",
    ),
    (
        "This intense feeling will pass. ADHD emotions are like waves - they peak and then they recede. You've gotten through this before.",
        "validation",
        "moderate",
        "30 seconds",
        "cognitive",
    ),
    (
        "Let's use the TIPP technique: splash cold water on your face, do 10 jumping jacks, breathe slowly, and tense then relax your muscles.",
        "DBT_TIPP",
        "severe",
        "5 minutes",
        "physiological",
    ),
    (
        "Try the STOP technique: Stop what you're doing, Take a breath, Observe your thoughts and feelings, Proceed mindfully.",
        "mindfulness",
        "mild",
        "1 minute",
        "cognitive",
    ),
    (
        "Use bilateral stimulation: tap your knees alternating left-right, or cross your arms and pat your shoulders.",
        "bilateral_stimulation",
        "moderate",
        "1 minute",
        "physiological",
    ),
    (
        "Ground yourself: press your feet firmly into the floor, feel the weight of your body in the chair.",
        "grounding",
        "mild",
        "30 seconds",
        "physical",
    ),
    (
        "Name your emotions: 'I'm feeling overwhelming anxiety right now' - labeling helps your brain process.",
        "emotion_labeling",
        "moderate",
        "30 seconds",
        "cognitive",
    ),
    (
        "Use the 4-7-8 breath: breathe in for 4, hold for 7, exhale slowly for 8 counts.",
        "breathing",
        "moderate",
        "1 minute",
        "physiological",
    ),
    (
        "Try progressive muscle relaxation: tense your shoulders for 5 seconds, then release and notice the contrast.",
        "progressive_relaxation",
        "mild",
        "2 minutes",
        "physiological",
    ),
    (
        "Use the RAIN technique: Recognize what's happening, Allow the experience, Investigate with kindness, Natural awareness.",
        "RAIN",
        "moderate",
        "3 minutes",
        "mindfulness",
    ),
    (
        "Practice radical acceptance: 'This is what I'm feeling right now, and that's okay.'",
        "acceptance",
        "moderate",
        "30 seconds",
        "cognitive",
    ),
    (
        "Use your senses: hold an ice cube, smell something strong, listen to calming music.",
        "sensory",
        "severe",
        "1 minute",
        "sensory",
    ),
    (
        "Create safety: remind yourself where you are, that you're safe, and this will pass.",
        "safety_reminder",
        "severe",
        "30 seconds",
        "cognitive",
    ),
];

/// (document, pattern, intervention, priority)
const PATTERNS: [(&str, &str, &str, &str); 15] = [
    (
        "User shows attention fade pattern: short responses, 'idk', 'ok', 'whatever' - needs micro-breaks and simplified guidance.",
        "attention_fade",
        "micro_breaks",
        "high",
    ),
    (
        "User exhibits ADHD emotional dysregulation: intense emotions, catastrophic thinking - needs validation and grounding first.",
        "emotional_dysregulation",
        "validation_first",
        "high",
    ),
    (
        "User demonstrates hyperfocus tendency: very long messages, detailed explanations - can handle more complex interventions.",
        "hyperfocus",
        "complex_ok",
        "medium",
    ),
    (
        "User shows executive dysfunction: difficulty with decisions, feeling overwhelmed by choices - needs structured options.",
        "executive_dysfunction",
        "structure_needed",
        "high",
    ),
    (
        "User displays rejection sensitivity: takes feedback personally, needs extra validation and gentle approach.",
        "rejection_sensitivity",
        "extra_validation",
        "high",
    ),
    (
        "User exhibits time blindness: underestimates task duration, struggles with transitions - needs explicit time awareness.",
        "time_blindness",
        "time_awareness",
        "medium",
    ),
    (
        "User shows working memory challenges: loses track of conversation, needs frequent summaries and simple instructions.",
        "working_memory",
        "simplify_repeat",
        "high",
    ),
    (
        "User demonstrates perfectionism paralysis: afraid to start tasks, overwhelmed by standards - needs permission to be imperfect.",
        "perfectionism",
        "permission_imperfect",
        "medium",
    ),
    (
        "User exhibits emotional overwhelm: big feelings about small things - needs validation that emotions are proportional to ADHD brain.",
        "emotional_overwhelm",
        "validate_proportionality",
        "high",
    ),
    (
        "User shows masking exhaustion: appears fine but struggling internally - needs permission to unmask and be authentic.",
        "masking_exhaustion",
        "permission_authentic",
        "high",
    ),
    (
        "User demonstrates dopamine-seeking: difficulty with boring tasks, needs novelty - needs gamification and rewards.",
        "dopamine_seeking",
        "gamification",
        "medium",
    ),
    (
        "User exhibits social anxiety: fears judgment about ADHD traits - needs reassurance about neurodivergent authenticity.",
        "social_anxiety",
        "neurodivergent_acceptance",
        "medium",
    ),
    (
        "User shows cognitive overload: too many thoughts at once - needs brain dump and prioritization techniques.",
        "cognitive_overload",
        "brain_dump",
        "high",
    ),
    (
        "User demonstrates imposter syndrome: feels like fraud despite success - needs validation of ADHD strengths.",
        "imposter_syndrome",
        "strength_validation",
        "medium",
    ),
    (
        "User exhibits crisis escalation: moves quickly from mild to severe distress - needs early intervention recognition.",
        "crisis_escalation",
        "early_intervention",
        "critical",
    ),
];

/// The built-in therapeutic domain: one batch per collection.
#[derive(Debug, Clone, Copy, Default)]
pub struct TherapeuticKnowledge;

impl TherapeuticKnowledge {
    pub fn responses() -> Vec<SeedItem> {
        RESPONSES
            .iter()
            .map(|(doc, kind, topic, crisis)| {
                SeedItem::new(*doc, json!({ "type": kind, "topic": topic, "crisis_level": crisis }))
            })
            .collect()
    }

    pub fn interventions() -> Vec<SeedItem> {
        INTERVENTIONS
            .iter()
            .map(|(doc, technique, crisis, duration, kind)| {
                SeedItem::new(
                    *doc,
                    json!({
                        "technique": technique,
                        "crisis_level": crisis,
                        "duration": duration,
                        "type": kind,
                    }),
                )
            })
            .collect()
    }

    pub fn user_patterns() -> Vec<SeedItem> {
        PATTERNS
            .iter()
            .map(|(doc, pattern, intervention, priority)| {
                SeedItem::new(
                    *doc,
                    json!({ "pattern": pattern, "intervention": intervention, "priority": priority }),
                )
            })
            .collect()
    }
}

impl KnowledgeDomain for TherapeuticKnowledge {
    fn name(&self) -> &str {
        "therapeutic knowledge"
    }

    fn batches(&self) -> Vec<SeedBatch> {
        vec![
            SeedBatch::new("therapeutic responses", THERAPEUTIC_RESPONSES, Self::responses()),
            SeedBatch::new("intervention techniques", INTERVENTION_LIBRARY, Self::interventions()),
            SeedBatch::new("user patterns", USER_PATTERNS, Self::user_patterns()),
        ]
    }
}
