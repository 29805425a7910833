//! Branch steps: zero-duration routing points between alternative paths.

use serde::{Deserialize, Serialize};

use super::step::{default_required, Step};

/// How a branch path is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionType {
    /// Weighted random assignment.
    #[default]
    Random,
    /// Matches the participant's assigned experimental condition.
    ConditionId,
}

fn default_weight() -> i64 {
    1
}

/// One alternative sub-sequence of a branch step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    #[serde(default)]
    pub branch_id: String,
    #[serde(default)]
    pub condition_label: String,
    #[serde(default)]
    pub condition_type: ConditionType,
    #[serde(default)]
    pub condition_value: String,
    /// Relative weight for random assignment. Values below 1 are never drawn
    /// and values above `u32::MAX` are capped.
    #[serde(default = "default_weight")]
    pub weight: i64,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Branch {
    pub fn random(branch_id: impl Into<String>, weight: i64, steps: Vec<Step>) -> Self {
        Self {
            branch_id: branch_id.into(),
            condition_label: String::new(),
            condition_type: ConditionType::Random,
            condition_value: String::new(),
            weight,
            steps,
        }
    }

    pub fn for_condition(
        branch_id: impl Into<String>,
        condition_value: impl Into<String>,
        steps: Vec<Step>,
    ) -> Self {
        Self {
            branch_id: branch_id.into(),
            condition_label: String::new(),
            condition_type: ConditionType::ConditionId,
            condition_value: condition_value.into(),
            weight: default_weight(),
            steps,
        }
    }
}

/// Branch step body. Never rendered; the server resolves the path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchStep {
    #[serde(default)]
    pub step_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub branches: Vec<Branch>,
}

impl BranchStep {
    pub fn new(step_id: impl Into<String>, branches: Vec<Branch>) -> Self {
        Self {
            step_id: step_id.into(),
            title: None,
            required: true,
            branches,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_defaults_to_random_with_unit_weight() {
        let branch: Branch = serde_json::from_str(r#"{"branch_id":"a","steps":[]}"#).unwrap();
        assert_eq!(branch.condition_type, ConditionType::Random);
        assert_eq!(branch.weight, 1);
    }

    #[test]
    fn nested_steps_deserialize() {
        let step: Step = serde_json::from_str(
            r#"{"step_type":"branch","step_id":"b1","branches":[
                {"branch_id":"ctrl","condition_type":"condition_id","condition_value":"control",
                 "steps":[{"step_type":"consent","step_id":"c2","content":"x"}]}
            ]}"#,
        )
        .unwrap();
        let Step::Branch(b) = step else {
            panic!("expected branch");
        };
        assert_eq!(b.branches[0].condition_type, ConditionType::ConditionId);
        assert_eq!(b.branches[0].steps[0].step_id(), "c2");
    }
}
