use rand::Rng;

use crate::domain::flow::Question;
use crate::domain::randomization::shuffled_order;

/// Presentation order of one survey instance.
///
/// Generated once when the survey is entered and held fixed until the step
/// instance is left, so re-rendering never reshuffles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurveyPlan {
    order: Vec<usize>,
    randomized: bool,
}

impl SurveyPlan {
    pub fn new<R: Rng + ?Sized>(question_count: usize, randomize: bool, rng: &mut R) -> Self {
        let order = if randomize {
            shuffled_order(question_count, rng)
        } else {
            (0..question_count).collect()
        };
        Self {
            order,
            randomized: randomize,
        }
    }

    /// Questions in presented order.
    pub fn presented<'a>(&'a self, questions: &'a [Question]) -> impl Iterator<Item = &'a Question> + 'a {
        self.order.iter().filter_map(move |i| questions.get(*i))
    }

    /// Question ids in presented order, recorded only for randomized surveys.
    pub fn question_order(&self, questions: &[Question]) -> Option<Vec<String>> {
        self.randomized.then(|| {
            self.presented(questions)
                .map(|q| q.question_id.clone())
                .collect()
        })
    }
}
