//! Terminal renderer for the participant runner.
//!
//! Turns step descriptors into plain text and raw input lines into
//! answers. Input is passed through loosely; the engine's survey
//! validation decides what is acceptable.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::domain::execution::{
    AdvanceControl, AiEvaluationView, DescriptorBody, QuestionControl, QuestionView,
    StepDescriptor, Surface,
};
use crate::domain::response::Answer;
use crate::ports::{ChatSurface, ParticipantShell};

/// Renders a descriptor as a block of text.
pub fn render(descriptor: &StepDescriptor) -> String {
    let mut out = String::new();
    match &descriptor.progress {
        Some(progress) => {
            let _ = writeln!(out, "== {} [{}] ==", descriptor.title, progress);
        }
        None => {
            let _ = writeln!(out, "== {} ==", descriptor.title);
        }
    }

    match &descriptor.body {
        DescriptorBody::Document {
            lines,
            button_text,
            control,
        } => {
            push_lines(&mut out, lines);
            match control {
                AdvanceControl::Visible => {
                    let _ = writeln!(out, "[Enter] {}", button_text);
                }
                AdvanceControl::Hidden { countdown } => {
                    if let Some(countdown) = countdown {
                        let _ = writeln!(out, "{}", countdown);
                    }
                }
            }
        }
        DescriptorBody::Survey {
            description,
            questions,
            button_text,
        } => {
            if !description.trim().is_empty() {
                let _ = writeln!(out, "{}", description);
            }
            for (position, question) in questions.iter().enumerate() {
                out.push_str(&render_question(position + 1, question));
            }
            let _ = writeln!(out, "[{}]", button_text);
        }
        DescriptorBody::Chat {
            bot_name,
            time_limit_minutes,
            time_limit_reached,
        } => {
            let _ = writeln!(out, "Chatting with {}", bot_name);
            if let Some(minutes) = time_limit_minutes {
                let _ = writeln!(out, "Time limit: {} minutes", minutes);
            }
            if *time_limit_reached {
                let _ = writeln!(out, "The chat has ended.");
                let _ = writeln!(out, "[Enter] Continue");
            }
        }
        DescriptorBody::AdvancePending { lines, button_text } => {
            push_lines(&mut out, lines);
            let _ = writeln!(out, "[Enter] {}", button_text);
        }
        DescriptorBody::AiEvaluation(AiEvaluationView::Placeholder { lines, button_text }) => {
            push_lines(&mut out, lines);
            let _ = writeln!(out, "[Enter] {}", button_text);
        }
        DescriptorBody::AiEvaluation(AiEvaluationView::Scoring {
            questions,
            failures,
            max_attempts,
            last_error,
            can_retry,
            can_skip,
        }) => {
            push_lines(&mut out, questions);
            if let Some(error) = last_error {
                let _ = writeln!(out, "Evaluation failed ({}/{}): {}", failures, max_attempts, error);
            }
            if *can_retry {
                let _ = writeln!(out, "[r] Retry");
            }
            if *can_skip {
                let _ = writeln!(out, "[s] Skip");
            }
        }
        DescriptorBody::AlreadyCompleted { lines } | DescriptorBody::AllCompleted { lines } => {
            push_lines(&mut out, lines);
        }
    }
    out
}

fn push_lines(out: &mut String, lines: &[String]) {
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
}

fn render_question(position: usize, question: &QuestionView) -> String {
    let mut out = String::new();
    let marker = if question.required { " *" } else { "" };
    let _ = writeln!(out, "{}. {}{}", position, question.question_text, marker);
    match &question.control {
        QuestionControl::Likert {
            points,
            min_label,
            max_label,
        } => {
            let _ = writeln!(
                out,
                "   1 ({}) .. {} ({})",
                min_label.as_deref().unwrap_or("low"),
                points,
                max_label.as_deref().unwrap_or("high")
            );
        }
        QuestionControl::SingleChoice { options } | QuestionControl::MultiChoice { options } => {
            for (index, option) in options.iter().enumerate() {
                let _ = writeln!(out, "   {}) {}", index + 1, option);
            }
        }
        QuestionControl::Text { placeholder, .. } | QuestionControl::Textarea { placeholder, .. } => {
            if let Some(placeholder) = placeholder {
                let _ = writeln!(out, "   ({})", placeholder);
            }
        }
        QuestionControl::NotConfigured { notice } => {
            let _ = writeln!(out, "   {}", notice);
        }
    }
    out
}

/// Converts one input line into an answer for `question`.
///
/// Choice input accepts 1-based option numbers or option text; checkbox
/// input is comma separated. Blank input means unanswered.
pub fn parse_answer(question: &QuestionView, input: &str) -> Option<Answer> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    match &question.control {
        QuestionControl::Likert { .. } => Some(
            input
                .parse::<i64>()
                .map(Answer::Integer)
                .unwrap_or_else(|_| Answer::text(input)),
        ),
        QuestionControl::SingleChoice { options } => {
            Some(Answer::text(resolve_option(options, input)))
        }
        QuestionControl::MultiChoice { options } => Some(Answer::Choices(
            input
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| resolve_option(options, part))
                .collect(),
        )),
        QuestionControl::Text { .. } | QuestionControl::Textarea { .. } => Some(Answer::text(input)),
        QuestionControl::NotConfigured { .. } => None,
    }
}

fn resolve_option(options: &[String], input: &str) -> String {
    input
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|index| options.get(index))
        .cloned()
        .unwrap_or_else(|| input.to_string())
}

/// Shell that prints surface changes and remembers an exit request.
#[derive(Debug, Clone, Default)]
pub struct TerminalShell {
    exit_requested: Arc<AtomicBool>,
}

impl TerminalShell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested.load(Ordering::SeqCst)
    }
}

impl ParticipantShell for TerminalShell {
    fn set_surface(&self, surface: Surface) {
        if surface == Surface::Chat {
            println!("-- chat --");
        }
    }

    fn clear_local_state(&self) {
        tracing::debug!("Local participant state cleared");
    }

    fn exit_experiment(&self) {
        self.exit_requested.store(true, Ordering::SeqCst);
    }
}

/// Chat surface that prints framing and notices.
#[derive(Debug, Clone, Default)]
pub struct TerminalChat;

impl ChatSurface for TerminalChat {
    fn show_banner(&self, text: &str) {
        println!("[{}]", text);
    }

    fn show_system_notice(&self, text: &str) {
        println!("** {} **", text);
    }

    fn close_transport(&self) {
        println!("-- chat closed --");
    }
}
