//! Survey randomizer steps and their heterogeneous items.

use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::step::{default_required, InstructionStep, SurveyStep};

/// A step that presents every item once, in one shuffled order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomizerStep {
    #[serde(default)]
    pub step_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default, alias = "surveys")]
    pub steps: Vec<RandomizerItem>,
}

impl RandomizerStep {
    pub fn new(step_id: impl Into<String>, steps: Vec<RandomizerItem>) -> Self {
        Self {
            step_id: step_id.into(),
            title: None,
            required: true,
            steps,
        }
    }
}

/// One entry of a randomizer.
///
/// Items without a `step_type` are legacy surveys. Item types the engine
/// cannot present are kept verbatim so the recorded item order still
/// reflects the configuration; the engine skips them at display time.
#[derive(Debug, Clone, PartialEq)]
pub enum RandomizerItem {
    Survey(SurveyStep),
    Instruction(InstructionStep),
    Unsupported(Value),
}

impl RandomizerItem {
    /// Wire name of the item type.
    pub fn item_type(&self) -> &str {
        match self {
            RandomizerItem::Survey(_) => "survey",
            RandomizerItem::Instruction(_) => "instruction",
            RandomizerItem::Unsupported(raw) => raw
                .get("step_type")
                .and_then(Value::as_str)
                .unwrap_or("unknown"),
        }
    }

    fn configured_id(&self) -> Option<&str> {
        let id = match self {
            RandomizerItem::Survey(s) => Some(s.step_id.as_str()),
            RandomizerItem::Instruction(s) => Some(s.step_id.as_str()),
            RandomizerItem::Unsupported(raw) => raw
                .get("survey_id")
                .or_else(|| raw.get("step_id"))
                .and_then(Value::as_str),
        };
        id.filter(|id| !id.is_empty())
    }

    /// Configured id, or `item_{position}` when none was authored.
    pub fn item_id(&self, position: usize) -> String {
        self.configured_id()
            .map(str::to_string)
            .unwrap_or_else(|| format!("item_{position}"))
    }
}

impl<'de> Deserialize<'de> for RandomizerItem {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut value = Value::deserialize(deserializer)?;
        let item_type = value
            .get("step_type")
            .and_then(Value::as_str)
            .unwrap_or("survey")
            .to_string();

        match item_type.as_str() {
            "survey" | "instruction" => {
                if let Some(object) = value.as_object_mut() {
                    object.remove("step_type");
                }
                if item_type == "survey" {
                    SurveyStep::deserialize(value)
                        .map(RandomizerItem::Survey)
                        .map_err(D::Error::custom)
                } else {
                    InstructionStep::deserialize(value)
                        .map(RandomizerItem::Instruction)
                        .map_err(D::Error::custom)
                }
            }
            _ => Ok(RandomizerItem::Unsupported(value)),
        }
    }
}

impl Serialize for RandomizerItem {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let value = match self {
            RandomizerItem::Survey(step) => tagged(step, "survey"),
            RandomizerItem::Instruction(step) => tagged(step, "instruction"),
            RandomizerItem::Unsupported(raw) => Ok(raw.clone()),
        }
        .map_err(S::Error::custom)?;
        value.serialize(serializer)
    }
}

fn tagged<T: Serialize>(step: &T, item_type: &str) -> Result<Value, serde_json::Error> {
    let mut value = serde_json::to_value(step)?;
    if let Some(object) = value.as_object_mut() {
        object.insert("step_type".to_string(), Value::String(item_type.to_string()));
    }
    Ok(value)
}
