//! Cursor over one randomizer step instance.

use rand::Rng;

use super::dwell_gate::DwellGate;
use crate::domain::flow::{RandomizerItem, RandomizerStep};
use crate::domain::randomization::shuffled_order;
use crate::domain::response::{QuestionResponse, ResponsePayload};
use crate::domain::survey::SurveyPlan;

/// Per-item runtime state of the item under the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemRuntime {
    Survey(SurveyPlan),
    Instruction(Option<DwellGate>),
}

/// Shuffled item order, cursor and buffered answers of one randomizer.
///
/// The top-level step index does not move while items are iterated; the
/// buffered answers are submitted once, when the last item completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomizerRun {
    order: Vec<usize>,
    item_order: Vec<String>,
    cursor: usize,
    responses: Vec<QuestionResponse>,
    current: Option<ItemRuntime>,
    skipped: Vec<String>,
}

impl RandomizerRun {
    /// Shuffles the items once and positions the cursor on the first
    /// presentable item.
    pub fn start<R: Rng + ?Sized>(step: &RandomizerStep, rng: &mut R) -> Self {
        let order = shuffled_order(step.steps.len(), rng);
        let item_order = order
            .iter()
            .enumerate()
            .map(|(position, index)| step.steps[*index].item_id(position))
            .collect();
        let mut run = Self {
            order,
            item_order,
            cursor: 0,
            responses: Vec::new(),
            current: None,
            skipped: Vec::new(),
        };
        run.settle(step, rng);
        run
    }

    fn settle<R: Rng + ?Sized>(&mut self, step: &RandomizerStep, rng: &mut R) {
        self.current = None;
        while let Some(item) = self.item_at(step, self.cursor) {
            match item {
                RandomizerItem::Survey(survey) => {
                    self.current = Some(ItemRuntime::Survey(SurveyPlan::new(
                        survey.survey_questions.len(),
                        survey.randomize_questions,
                        rng,
                    )));
                    return;
                }
                RandomizerItem::Instruction(instruction) => {
                    let gate = instruction
                        .dwell_seconds()
                        .map(|seconds| DwellGate::new(seconds, instruction.show_timer));
                    self.current = Some(ItemRuntime::Instruction(gate));
                    return;
                }
                RandomizerItem::Unsupported(_) => {
                    self.skipped.push(self.item_order[self.cursor].clone());
                    self.cursor += 1;
                }
            }
        }
    }

    fn item_at<'a>(&self, step: &'a RandomizerStep, position: usize) -> Option<&'a RandomizerItem> {
        self.order.get(position).and_then(|index| step.steps.get(*index))
    }

    /// Ids of unsupported items passed over since the last call.
    pub fn take_skipped(&mut self) -> Vec<String> {
        std::mem::take(&mut self.skipped)
    }

    /// True once every item has been completed or skipped.
    pub fn is_exhausted(&self) -> bool {
        self.current.is_none()
    }

    /// Item ids in presented order.
    pub fn item_order(&self) -> &[String] {
        &self.item_order
    }

    /// 1-based position of the current item and the item count.
    pub fn position(&self) -> (usize, usize) {
        (self.cursor + 1, self.order.len())
    }

    pub fn current_item<'a>(&self, step: &'a RandomizerStep) -> Option<&'a RandomizerItem> {
        self.current.as_ref()?;
        self.item_at(step, self.cursor)
    }

    pub fn current_runtime(&self) -> Option<&ItemRuntime> {
        self.current.as_ref()
    }

    pub fn dwell_gate(&self) -> Option<&DwellGate> {
        match &self.current {
            Some(ItemRuntime::Instruction(gate)) => gate.as_ref(),
            _ => None,
        }
    }

    pub fn dwell_gate_mut(&mut self) -> Option<&mut DwellGate> {
        match &mut self.current {
            Some(ItemRuntime::Instruction(gate)) => gate.as_mut(),
            _ => None,
        }
    }

    /// True when no presentable item follows the current one.
    pub fn is_last_item(&self, step: &RandomizerStep) -> bool {
        (self.cursor + 1..self.order.len()).all(|position| {
            matches!(
                self.item_at(step, position),
                Some(RandomizerItem::Unsupported(_)) | None
            )
        })
    }

    /// Tags answers from the current survey item with its item metadata.
    pub fn tag_responses(
        &self,
        step: &RandomizerStep,
        responses: Vec<QuestionResponse>,
    ) -> Vec<QuestionResponse> {
        let item_type = self
            .current_item(step)
            .map(|item| item.item_type().to_string());
        let item_id = self.item_order.get(self.cursor).cloned();
        let question_order = match (&self.current, self.current_item(step)) {
            (Some(ItemRuntime::Survey(plan)), Some(RandomizerItem::Survey(survey))) => {
                plan.question_order(&survey.survey_questions)
            }
            _ => None,
        };

        responses
            .into_iter()
            .map(|mut response| {
                response.item_id = item_id.clone();
                response.item_type = item_type.clone();
                response.item_order = Some(self.cursor + 1);
                if let Some(order) = &question_order {
                    response.question_index = order
                        .iter()
                        .position(|id| *id == response.question_id)
                        .map(|i| i + 1);
                    response.question_order = Some(order.clone());
                }
                response
            })
            .collect()
    }

    /// Payload for the single advance of this randomizer, including `extra`
    /// answers from an item that has not been committed yet.
    pub fn completion_payload(&self, extra: &[QuestionResponse]) -> ResponsePayload {
        let mut randomizer_responses = self.responses.clone();
        randomizer_responses.extend_from_slice(extra);
        ResponsePayload::Randomizer {
            randomizer_responses,
            item_order: self.item_order.clone(),
        }
    }

    /// Buffers the current item's answers and moves to the next item.
    pub fn complete_item<R: Rng + ?Sized>(
        &mut self,
        step: &RandomizerStep,
        responses: Vec<QuestionResponse>,
        rng: &mut R,
    ) {
        self.responses.extend(responses);
        self.cursor += 1;
        self.settle(step, rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::flow::{InstructionStep, Question, QuestionType, SurveyStep};
    use crate::domain::response::Answer;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn survey_item(id: &str, randomize: bool) -> RandomizerItem {
        let mut survey = SurveyStep::new(
            id,
            vec![
                Question::new(format!("{id}_a"), "A", QuestionType::Text),
                Question::new(format!("{id}_b"), "B", QuestionType::Text),
            ],
        );
        survey.randomize_questions = randomize;
        RandomizerItem::Survey(survey)
    }

    fn step() -> RandomizerStep {
        RandomizerStep::new(
            "r1",
            vec![
                survey_item("s1", false),
                survey_item("s2", true),
                RandomizerItem::Instruction(InstructionStep::new("i1", "Read").with_dwell(3, true)),
            ],
        )
    }

    #[test]
    fn order_covers_every_item_once() {
        let step = step();
        let run = RandomizerRun::start(&step, &mut StdRng::seed_from_u64(5));
        let mut ids = run.item_order().to_vec();
        ids.sort();
        assert_eq!(ids, vec!["i1", "s1", "s2"]);
        assert_eq!(run.position(), (1, 3));
    }

    #[test]
    fn walking_all_items_exhausts_the_run() {
        let step = step();
        let mut rng = StdRng::seed_from_u64(11);
        let mut run = RandomizerRun::start(&step, &mut rng);
        let mut seen = Vec::new();
        while let Some(item) = run.current_item(&step) {
            seen.push(item.item_id(0));
            run.complete_item(&step, vec![], &mut rng);
        }
        assert!(run.is_exhausted());
        assert_eq!(seen, run.item_order());
    }

    #[test]
    fn instruction_items_carry_a_dwell_gate() {
        let step = RandomizerStep::new(
            "r1",
            vec![RandomizerItem::Instruction(
                InstructionStep::new("i1", "Read").with_dwell(3, false),
            )],
        );
        let mut run = RandomizerRun::start(&step, &mut StdRng::seed_from_u64(1));
        assert_eq!(run.dwell_gate().map(|g| g.remaining_seconds()), Some(3));
        run.dwell_gate_mut().unwrap().tick();
        assert_eq!(run.dwell_gate().map(|g| g.remaining_seconds()), Some(2));
        assert!(run.is_last_item(&step));
    }

    #[test]
    fn unsupported_items_are_skipped_but_keep_their_order_slot() {
        let step = RandomizerStep::new(
            "r1",
            vec![RandomizerItem::Unsupported(json!({"step_type":"video","step_id":"v1"}))],
        );
        let mut run = RandomizerRun::start(&step, &mut StdRng::seed_from_u64(1));
        assert!(run.is_exhausted());
        assert_eq!(run.take_skipped(), vec!["v1"]);
        assert_eq!(run.item_order(), &["v1".to_string()]);
    }

    #[test]
    fn responses_are_tagged_with_item_metadata() {
        let step = RandomizerStep::new("r1", vec![survey_item("s2", true)]);
        let run = RandomizerRun::start(&step, &mut StdRng::seed_from_u64(3));
        let tagged = run.tag_responses(
            &step,
            vec![QuestionResponse::new("s2_b", "B", QuestionType::Text, Some(Answer::text("x")))],
        );
        let response = &tagged[0];
        assert_eq!(response.item_id.as_deref(), Some("s2"));
        assert_eq!(response.item_type.as_deref(), Some("survey"));
        assert_eq!(response.item_order, Some(1));
        let order = response.question_order.clone().unwrap();
        assert_eq!(order.len(), 2);
        assert_eq!(
            response.question_index,
            order.iter().position(|id| id == "s2_b").map(|i| i + 1)
        );
    }

    #[test]
    fn completion_payload_includes_uncommitted_answers() {
        let step = RandomizerStep::new("r1", vec![survey_item("s1", false)]);
        let run = RandomizerRun::start(&step, &mut StdRng::seed_from_u64(3));
        let extra = vec![QuestionResponse::new("s1_a", "A", QuestionType::Text, None)];
        match run.completion_payload(&extra) {
            ResponsePayload::Randomizer {
                randomizer_responses,
                item_order,
            } => {
                assert_eq!(randomizer_responses.len(), 1);
                assert_eq!(item_order, vec!["s1"]);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }
}
