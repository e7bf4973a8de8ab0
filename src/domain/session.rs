//! Decide/execute control loop.
//!
//! ```text
//! Deciding --oracle--> Executing --+--> Deciding   (FETCH, INDICATOR, bad command)
//!                                  +--> Terminal   (FINISH)
//!                                  +--> Terminal   (BACKTEST, forced FINISH with its result)
//! ```
//!
//! History is append-only and is replayed in full into every oracle context.

use tracing::{debug, info};

use crate::domain::action::{Action, ActionKind};
use crate::domain::command_parser;
use crate::domain::error::AgentError;
use crate::domain::executor::Executor;
use crate::ports::decision_port::DecisionPort;

/// One executed command and its textual result.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// Command text exactly as the oracle produced it.
    pub command: String,
    /// Parsed action; `None` when the command was malformed.
    pub action: Option<Action>,
    pub result: String,
}

impl Step {
    pub fn kind(&self) -> Option<ActionKind> {
        self.action.as_ref().map(Action::kind)
    }

    fn render(&self) -> String {
        format!("Action: {}\nResult: {}", self.command, self.result)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub goal: String,
    pub history: Vec<Step>,
    pub last_action: Option<Action>,
    pub last_result: Option<String>,
}

impl SessionState {
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            history: Vec::new(),
            last_action: None,
            last_result: None,
        }
    }

    fn record(&mut self, step: Step) {
        self.last_action = step.action.clone();
        self.last_result = Some(step.result.clone());
        self.history.push(step);
    }

    /// Context handed to the decision oracle: goal, grammar and full history.
    pub fn context(&self) -> String {
        let past_steps = self
            .history
            .iter()
            .map(Step::render)
            .collect::<Vec<_>>()
            .join("\n");
        let commands = ActionKind::ALL
            .iter()
            .enumerate()
            .map(|(i, kind)| format!("{}. {}", i + 1, kind.usage()))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "You are a financial trading agent.\n\
             Your goal: {goal}\n\n\
             Past Steps:\n{past_steps}\n\n\
             Available Commands:\n{commands}\n\n\
             Choose the next best command. Only output the command, no explanation.\n",
            goal = self.goal,
        )
    }
}

/// What the loop does after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Decide,
    Terminal,
    /// Stop, treating the step's result as a `FINISH` message.
    ForceFinish,
}

/// Transition table keyed by the keyword of the executed command.
pub fn transition(kind: Option<ActionKind>) -> Transition {
    match kind {
        Some(ActionKind::Backtest) => Transition::ForceFinish,
        Some(ActionKind::Finish) => Transition::Terminal,
        Some(ActionKind::Fetch) | Some(ActionKind::Indicator) | None => Transition::Decide,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Finished,
    BacktestCompleted,
    StepLimit,
}

#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub state: SessionState,
    pub stop: StopReason,
    pub final_answer: String,
}

impl SessionOutcome {
    pub fn history(&self) -> &[Step] {
        &self.state.history
    }
}

pub struct Agent<'a> {
    oracle: &'a dyn DecisionPort,
    executor: Executor<'a>,
    max_steps: Option<usize>,
}

impl<'a> Agent<'a> {
    pub fn new(oracle: &'a dyn DecisionPort, executor: Executor<'a>) -> Self {
        Self {
            oracle,
            executor,
            max_steps: None,
        }
    }

    /// Stop after `max_steps` executed commands. Unbounded by default.
    pub fn with_max_steps(mut self, max_steps: Option<usize>) -> Self {
        self.max_steps = max_steps.filter(|&n| n > 0);
        self
    }

    pub fn run(&self, goal: &str) -> Result<SessionOutcome, AgentError> {
        self.run_with_observer(goal, |_| {})
    }

    /// Run the loop, calling `observer` after each step is appended to history.
    pub fn run_with_observer<F>(
        &self,
        goal: &str,
        mut observer: F,
    ) -> Result<SessionOutcome, AgentError>
    where
        F: FnMut(&Step),
    {
        let mut state = SessionState::new(goal);
        info!(goal, "session started");

        loop {
            if let Some(limit) = self.max_steps {
                if state.history.len() >= limit {
                    info!(steps = limit, "step limit reached");
                    let final_answer = format!("Stopped after {} steps without FINISH.", limit);
                    return Ok(SessionOutcome {
                        state,
                        stop: StopReason::StepLimit,
                        final_answer,
                    });
                }
            }

            let context = state.context();
            debug!(bytes = context.len(), "requesting next command");
            let command = self.oracle.decide(&context)?.trim().to_string();
            info!(step = state.history.len() + 1, %command, "oracle proposed command");

            let (action, result) = self.executor.execute_command(&command);
            let step = Step {
                command,
                action,
                result: result.clone(),
            };
            let kind = step
                .kind()
                .or_else(|| command_parser::peek_kind(&step.command));
            state.record(step);
            if let Some(step) = state.history.last() {
                observer(step);
            }

            match transition(kind) {
                Transition::Decide => continue,
                Transition::Terminal => {
                    info!(steps = state.history.len(), "session finished");
                    return Ok(SessionOutcome {
                        state,
                        stop: StopReason::Finished,
                        final_answer: result,
                    });
                }
                Transition::ForceFinish => {
                    info!(steps = state.history.len(), "backtest completed, finishing");
                    state.last_action = Some(Action::finish(result.clone()));
                    return Ok(SessionOutcome {
                        state,
                        stop: StopReason::BacktestCompleted,
                        final_answer: result,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_table() {
        assert_eq!(transition(Some(ActionKind::Fetch)), Transition::Decide);
        assert_eq!(transition(Some(ActionKind::Indicator)), Transition::Decide);
        assert_eq!(transition(Some(ActionKind::Backtest)), Transition::ForceFinish);
        assert_eq!(transition(Some(ActionKind::Finish)), Transition::Terminal);
        assert_eq!(transition(None), Transition::Decide);
    }

    #[test]
    fn context_contains_goal_grammar_and_history() {
        let mut state = SessionState::new("Fetch TSLA");
        state.record(Step {
            command: "DANCE \"TSLA\"".into(),
            action: None,
            result: "ERROR: unknown".into(),
        });
        let ctx = state.context();
        assert!(ctx.contains("Your goal: Fetch TSLA"));
        assert!(ctx.contains("1. FETCH \"TICKER\""));
        assert!(ctx.contains("4. FINISH \"final answer\""));
        assert!(ctx.contains("Action: DANCE \"TSLA\"\nResult: ERROR: unknown"));
    }

    #[test]
    fn record_tracks_last_action_and_result() {
        let mut state = SessionState::new("goal");
        state.record(Step {
            command: "FETCH \"TSLA\"".into(),
            action: Some(Action::Fetch {
                ticker: "TSLA".into(),
            }),
            result: "rows".into(),
        });
        assert_eq!(state.history.len(), 1);
        assert_eq!(
            state.last_action,
            Some(Action::Fetch {
                ticker: "TSLA".into()
            })
        );
        assert_eq!(state.last_result.as_deref(), Some("rows"));
    }
}
