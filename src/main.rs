//! Terminal participant runner.
//!
//! Walks one participant through a flow, either against an experiment
//! server or, with `--flow-file`, against an in-process server seeded
//! from a JSON or YAML flow definition.

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use experiment_flow::adapters::gateway::{HttpFlowGateway, InMemoryFlowGateway};
use experiment_flow::adapters::ui::{parse_answer, render, TerminalChat, TerminalShell};
use experiment_flow::application::{EngineDeps, FlowEngine, FlowError};
use experiment_flow::config::{AppConfig, TelemetryConfig};
use experiment_flow::domain::execution::{AiEvaluationView, DescriptorBody, FlowState};
use experiment_flow::domain::flow::FlowDefinition;
use experiment_flow::domain::foundation::{ParticipantId, ParticipantSession, SessionId};
use experiment_flow::domain::response::SurveyAnswers;
use experiment_flow::ports::FlowGateway;

type BoxError = Box<dyn std::error::Error>;

#[derive(Parser)]
#[command(name = "experiment-flow")]
#[command(about = "Run an experiment flow for one participant in the terminal")]
struct Cli {
    /// Experiment session identifier
    #[arg(long)]
    session: String,

    /// Participant (client) identifier
    #[arg(long)]
    participant: String,

    /// Serve this flow definition in-process instead of calling the server
    #[arg(long)]
    flow_file: Option<PathBuf>,

    /// Experimental condition for `condition_id` branches (with --flow-file)
    #[arg(long)]
    condition: Option<String>,

    /// Seed for question, item and branch randomization
    #[arg(long)]
    seed: Option<u64>,
}

fn init_tracing(telemetry: &TelemetryConfig) -> Result<(), BoxError> {
    let filter = telemetry.env_filter()?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if telemetry.json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn build_gateway(
    cli: &Cli,
    config: &AppConfig,
    session: &ParticipantSession,
) -> Result<Arc<dyn FlowGateway>, BoxError> {
    let Some(path) = &cli.flow_file else {
        info!(base_url = %config.gateway.base_url, "Using experiment server");
        return Ok(Arc::new(HttpFlowGateway::new(config.gateway.http())?));
    };

    let flow = FlowDefinition::from_path(path)?;
    let gateway = match cli.seed {
        Some(seed) => InMemoryFlowGateway::with_rng(Box::new(StdRng::seed_from_u64(seed))),
        None => InMemoryFlowGateway::new(),
    };
    gateway.register_flow(session.session_id.clone(), flow)?;
    if let Some(condition) = &cli.condition {
        gateway.assign_condition(session, condition.clone());
    }
    info!(path = %path.display(), "Using local flow definition");
    Ok(Arc::new(gateway))
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config.telemetry)?;

    let session = ParticipantSession::new(
        SessionId::new(cli.session.clone())?,
        ParticipantId::new(cli.participant.clone())?,
    );
    let gateway = build_gateway(&cli, &config, &session)?;

    let shell = TerminalShell::new();
    let mut deps = EngineDeps::new(gateway, Arc::new(shell.clone()), Arc::new(TerminalChat));
    if let Some(seed) = cli.seed {
        deps = deps.with_rng(Box::new(StdRng::seed_from_u64(seed.wrapping_add(1))));
    }
    let (mut engine, mut events) = FlowEngine::new(session, deps, config.engine_options());

    match engine.initialize().await {
        Ok(FlowState::NoFlow) => {
            println!("No flow is configured for this session. Falling back to free chat.");
            return Ok(());
        }
        Ok(_) => {}
        Err(e) if e.is_retryable() => {
            report(Err(e));
        }
        Err(e) => return Err(e.into()),
    }

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut changed = true;
    loop {
        let descriptor = engine.show_current_step();
        if changed {
            if let Some(descriptor) = &descriptor {
                print!("{}", render(descriptor));
            }
        }
        if engine.state().is_terminal() || shell.exit_requested() {
            break;
        }

        if let Some(DescriptorBody::Survey { questions, .. }) = descriptor.as_ref().map(|d| &d.body)
        {
            let mut answers = SurveyAnswers::new();
            for question in questions {
                println!("> {}", question.question_text);
                let Some(line) = input.next_line().await? else {
                    return Ok(());
                };
                if let Some(answer) = parse_answer(question, &line) {
                    answers.insert(question.question_id.clone(), answer);
                }
            }
            changed = report(engine.submit_survey(&answers).await);
            continue;
        }

        tokio::select! {
            Some(event) = events.recv() => {
                changed = report(engine.handle_event(event).await.map(|_| engine.state()));
            }
            line = input.next_line() => {
                let Some(line) = line? else {
                    info!("Input closed, leaving the flow");
                    break;
                };
                let body = descriptor.as_ref().map(|d| &d.body);
                changed = report(respond(&mut engine, body, line.trim()).await);
            }
        }
    }
    Ok(())
}

async fn respond(
    engine: &mut FlowEngine,
    body: Option<&DescriptorBody>,
    line: &str,
) -> Result<FlowState, FlowError> {
    match (body, line) {
        (Some(DescriptorBody::AiEvaluation(AiEvaluationView::Scoring { .. })), "s") => {
            engine.skip_ai_evaluation().await
        }
        (Some(DescriptorBody::AiEvaluation(AiEvaluationView::Scoring { .. })), _) => {
            engine.run_ai_evaluation().await
        }
        (
            Some(DescriptorBody::Chat {
                time_limit_reached: true,
                ..
            }),
            _,
        ) => engine.acknowledge().await,
        (Some(DescriptorBody::Chat { .. }), _) => {
            println!("(messages are exchanged in the chat window)");
            Ok(engine.state())
        }
        _ => engine.acknowledge().await,
    }
}

/// Prints a failed operation. Returns true when the screen should be
/// drawn again.
fn report(result: Result<FlowState, FlowError>) -> bool {
    match result {
        Ok(_) => true,
        Err(FlowError::DwellGateClosed { remaining }) => {
            println!("Please keep reading ({} seconds left).", remaining);
            false
        }
        Err(FlowError::Validation(e)) => {
            println!("{}", e);
            true
        }
        Err(e) if e.is_retryable() => {
            warn!(error = %e, "Operation failed");
            println!("Something went wrong: {}. Press Enter to try again.", e);
            false
        }
        Err(e) => {
            error!(error = %e, "Operation failed");
            println!("{}", e);
            false
        }
    }
}
