//! Flow execution state.
//!
//! Pure per-participant state used by the engine: lifecycle, the active
//! step instance with its fixed random orders, dwell gates, randomizer
//! cursors and the descriptors handed to renderers.

mod descriptor;
mod dwell_gate;
mod instance;
mod progress;
mod randomizer_run;
mod state;

pub use descriptor::{
    AdvanceControl, AiEvaluationView, DescriptorBody, QuestionControl, QuestionView,
    StepDescriptor, NO_OPTIONS_NOTICE,
};
pub use dwell_gate::DwellGate;
pub use instance::{ActiveStep, AiEvaluationMode, EvaluationAttempts, StepRuntime};
pub use progress::Progress;
pub use randomizer_run::{ItemRuntime, RandomizerRun};
pub use state::{FlowState, Surface};
