//! Classification prompt templates

use serde::{Deserialize, Serialize};

const DETAILED_PROMPT: &str = r#"You are a waste-sorting assistant. Look at the main item in the image and classify it.

Respond with ONLY a single JSON object and nothing else (no prose, no markdown):
{
  "label": "<biodegradable|non_biodegradable|hazardous>",
  "confidence": <float 0.0-1.0>,
  "notes": "<short reason>"
}

Rules:
- "biodegradable": food scraps, peels, leaves, paper, cardboard, wood, natural fabric.
- "non_biodegradable": plastics, glass, metal cans, styrofoam, synthetic fabric, rubber.
- "hazardous": batteries, chemicals, paint, medicine, syringes, light bulbs, aerosol cans.
- All electronic items (phones, cables, chargers, circuit boards, gadgets) are hazardous.
- If several items are visible, classify the most prominent one.
- Use exactly one of the three label values above."#;

const COMPACT_PROMPT: &str = r#"Return ONLY a single JSON object:
{
  "label": "<biodegradable|non_biodegradable|hazardous>",
  "confidence": <float 0.0-1.0>,
  "notes": "<short reason>"
}
Classify the main item in the image as biodegradable, non_biodegradable, or hazardous.
All electronic items and batteries are hazardous."#;

/// Selectable prompt wording
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptTemplate {
    /// Full rule set with examples per label
    #[default]
    Detailed,
    /// Short legacy wording
    Compact,
}

/// Immutable instruction sent alongside every image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationPrompt {
    template: PromptTemplate,
    text: &'static str,
}

impl ClassificationPrompt {
    pub fn new(template: PromptTemplate) -> Self {
        let text = match template {
            PromptTemplate::Detailed => DETAILED_PROMPT,
            PromptTemplate::Compact => COMPACT_PROMPT,
        };
        Self { template, text }
    }

    pub fn template(&self) -> PromptTemplate {
        self.template
    }

    pub fn text(&self) -> &str {
        self.text
    }
}

impl Default for ClassificationPrompt {
    fn default() -> Self {
        Self::new(PromptTemplate::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Label;

    #[test]
    fn test_every_template_enumerates_labels_and_rules() {
        for template in [PromptTemplate::Detailed, PromptTemplate::Compact] {
            let prompt = ClassificationPrompt::new(template);
            let text = prompt.text();

            assert!(text.contains("ONLY a single JSON object"), "{:?}", template);
            for label in Label::CANONICAL {
                assert!(text.contains(label.as_str()), "{:?} missing {}", template, label);
            }
            assert!(text.to_lowercase().contains("electronic"), "{:?}", template);
            assert!(text.contains("\"label\""));
        }
    }

    #[test]
    fn test_template_from_yaml_name() {
        let template: PromptTemplate = serde_json::from_str("\"compact\"").unwrap();
        assert_eq!(template, PromptTemplate::Compact);
        assert_eq!(ClassificationPrompt::default().template(), PromptTemplate::Detailed);
    }
}
