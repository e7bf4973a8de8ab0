//! Control loop tests with scripted oracles and in-memory ports.
//!
//! Tests cover:
//! - The fetch, indicator, backtest scenario ending in a forced finish
//! - Recovery from malformed commands
//! - FINISH termination, step limits and oracle failures

mod common;

use common::*;
use quantagent::domain::action::Action;
use quantagent::domain::error::AgentError;
use quantagent::domain::executor::Executor;
use quantagent::domain::session::{Agent, StopReason};

fn tsla_data() -> MockDataPort {
    MockDataPort::new().with_bars("TSLA", generate_wave("2024-01-01", 120, 200.0))
}

mod scenario {
    use super::*;

    #[test]
    fn fetch_indicator_backtest_forces_finish() {
        let data = tsla_data();
        let charts = RecordingChartPort::new();
        let oracle = ScriptedOracle::new(&[
            "FETCH \"TSLA\"",
            "INDICATOR \"TSLA\" \"SMA\"",
            "BACKTEST \"TSLA\" \"SMA\"",
            "FINISH \"never read\"",
        ]);

        let agent = Agent::new(&oracle, Executor::new(&data, &charts));
        let outcome = agent
            .run("Fetch TSLA, calculate SMA, then backtest SMA strategy")
            .unwrap();

        assert_eq!(outcome.stop, StopReason::BacktestCompleted);
        let history = outcome.history();
        assert_eq!(history.len(), 3);
        assert!(history[0].result.contains("Close"));
        assert!(history[1].result.contains("SMA20"));
        assert!(history[2]
            .result
            .starts_with("Backtest completed for TSLA (SMA)."));
        assert!(history[2]
            .result
            .contains("Chart saved: charts/chart_TSLA_000001.svg"));

        assert_eq!(oracle.remaining(), 1);
        assert_eq!(charts.rendered.borrow().len(), 1);
        assert_eq!(outcome.final_answer, history[2].result);
        assert_eq!(
            outcome.state.last_action,
            Some(Action::finish(history[2].result.clone()))
        );
    }

    #[test]
    fn lookbacks_match_each_action() {
        let data = tsla_data();
        let charts = RecordingChartPort::new();
        let oracle = ScriptedOracle::new(&[
            "FETCH \"TSLA\"",
            "INDICATOR \"TSLA\" \"RSI\"",
            "BACKTEST \"TSLA\" \"SMA\"",
        ]);
        Agent::new(&oracle, Executor::new(&data, &charts))
            .run("goal")
            .unwrap();

        let lookbacks: Vec<Lookback> = data.requests.borrow().iter().map(|(_, l)| *l).collect();
        assert_eq!(
            lookbacks,
            vec![Lookback::OneYear, Lookback::SixMonths, Lookback::OneYear]
        );
    }

    #[test]
    fn history_is_replayed_into_every_context() {
        let data = tsla_data();
        let charts = RecordingChartPort::new();
        let oracle = ScriptedOracle::new(&["FETCH \"TSLA\"", "FINISH \"done\""]);
        Agent::new(&oracle, Executor::new(&data, &charts))
            .run("Fetch TSLA")
            .unwrap();

        let contexts = oracle.contexts.borrow();
        assert_eq!(contexts.len(), 2);
        assert!(contexts[0].contains("Your goal: Fetch TSLA"));
        assert!(!contexts[0].contains("Action:"));
        assert!(contexts[1].contains("Action: FETCH \"TSLA\"\nResult: "));
    }
}

mod recovery {
    use super::*;

    #[test]
    fn malformed_command_is_fed_back_verbatim() {
        let data = tsla_data();
        let charts = RecordingChartPort::new();
        let oracle = ScriptedOracle::new(&["DANCE \"TSLA\"", "FINISH \"gave up\""]);

        let outcome = Agent::new(&oracle, Executor::new(&data, &charts))
            .run("Fetch TSLA")
            .unwrap();

        assert_eq!(outcome.stop, StopReason::Finished);
        assert_eq!(outcome.final_answer, "gave up");
        let history = outcome.history();
        assert_eq!(history.len(), 2);
        assert!(history[0].action.is_none());
        assert!(history[0].result.starts_with("ERROR:"));

        let contexts = oracle.contexts.borrow();
        assert!(contexts[1].contains("Action: DANCE \"TSLA\""));
        assert!(contexts[1].contains("Result: ERROR:"));
        assert!(data.requests.borrow().is_empty());
    }

    #[test]
    fn provider_failure_does_not_stop_the_loop() {
        let data = MockDataPort::new().with_error("TSLA", "connection reset");
        let charts = RecordingChartPort::new();
        let oracle = ScriptedOracle::new(&["FETCH \"TSLA\"", "FINISH"]);

        let outcome = Agent::new(&oracle, Executor::new(&data, &charts))
            .run("Fetch TSLA")
            .unwrap();

        assert_eq!(
            outcome.history()[0].result,
            "ERROR: data provider error: connection reset"
        );
        assert_eq!(outcome.final_answer, "Finished.");
    }

    #[test]
    fn failed_backtest_still_finishes() {
        let data = MockDataPort::new().with_bars("TSLA", generate_wave("2024-01-01", 10, 50.0));
        let charts = RecordingChartPort::new();
        let oracle = ScriptedOracle::new(&["BACKTEST \"TSLA\" \"SMA\"", "FETCH \"TSLA\""]);

        let outcome = Agent::new(&oracle, Executor::new(&data, &charts))
            .run("Backtest TSLA")
            .unwrap();

        assert_eq!(outcome.stop, StopReason::BacktestCompleted);
        assert_eq!(outcome.history().len(), 1);
        assert!(outcome.final_answer.starts_with("ERROR in backtest:"));
        assert_eq!(oracle.remaining(), 1);
        assert!(charts.rendered.borrow().is_empty());
    }

    #[test]
    fn malformed_finish_still_terminates() {
        let data = tsla_data();
        let charts = RecordingChartPort::new();
        let oracle = ScriptedOracle::new(&["FINISH \"unterminated", "FETCH \"TSLA\""]);

        let outcome = Agent::new(&oracle, Executor::new(&data, &charts))
            .run("goal")
            .unwrap();

        assert_eq!(outcome.stop, StopReason::Finished);
        assert_eq!(outcome.history().len(), 1);
        assert!(outcome.final_answer.starts_with("ERROR:"));
        assert_eq!(oracle.remaining(), 1);
    }
}

mod termination {
    use super::*;

    #[test]
    fn finish_first_executes_nothing() {
        let data = tsla_data();
        let charts = RecordingChartPort::new();
        let oracle = ScriptedOracle::new(&["FINISH \"TSLA looks fine\""]);

        let outcome = Agent::new(&oracle, Executor::new(&data, &charts))
            .run("goal")
            .unwrap();

        assert_eq!(outcome.final_answer, "TSLA looks fine");
        assert_eq!(outcome.history().len(), 1);
        assert!(data.requests.borrow().is_empty());
    }

    #[test]
    fn step_limit_stops_the_loop() {
        let data = tsla_data();
        let charts = RecordingChartPort::new();
        let oracle = ScriptedOracle::new(&["FETCH \"TSLA\""; 5]);

        let outcome = Agent::new(&oracle, Executor::new(&data, &charts))
            .with_max_steps(Some(3))
            .run("goal")
            .unwrap();

        assert_eq!(outcome.stop, StopReason::StepLimit);
        assert_eq!(outcome.history().len(), 3);
        assert_eq!(outcome.final_answer, "Stopped after 3 steps without FINISH.");
        assert_eq!(oracle.remaining(), 2);
    }

    #[test]
    fn zero_step_limit_means_unbounded() {
        let data = tsla_data();
        let charts = RecordingChartPort::new();
        let oracle = ScriptedOracle::new(&["FETCH \"TSLA\"", "FETCH \"TSLA\"", "FINISH"]);

        let outcome = Agent::new(&oracle, Executor::new(&data, &charts))
            .with_max_steps(Some(0))
            .run("goal")
            .unwrap();

        assert_eq!(outcome.stop, StopReason::Finished);
        assert_eq!(outcome.history().len(), 3);
    }

    #[test]
    fn oracle_error_aborts_session() {
        let data = tsla_data();
        let charts = RecordingChartPort::new();
        let oracle = ScriptedOracle::new(&["FETCH \"TSLA\""]).then_fail("rate limited");

        let err = Agent::new(&oracle, Executor::new(&data, &charts))
            .run("goal")
            .unwrap_err();

        assert!(matches!(err, AgentError::Oracle { .. }));
        assert_eq!(err.to_string(), "decision oracle error: rate limited");
    }

    #[test]
    fn observer_sees_each_step_in_order() {
        let data = tsla_data();
        let charts = RecordingChartPort::new();
        let oracle = ScriptedOracle::new(&["FETCH \"TSLA\"", "DANCE", "FINISH"]);

        let mut seen = Vec::new();
        Agent::new(&oracle, Executor::new(&data, &charts))
            .run_with_observer("goal", |step| seen.push(step.command.clone()))
            .unwrap();

        assert_eq!(seen, vec!["FETCH \"TSLA\"", "DANCE", "FINISH"]);
    }
}
