//! The demo handlers: fixed outcomes, random outcomes, a delayed success,
//! custom events and thrown errors.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::selector::{below_threshold, two_significant, uniform_millis, Dice};
use crate::agent::{Handler, HandlerError, InvocationContext, Outcome, SourceLocation};

pub const SIMPLE_SUCCESS_MESSAGE: &str = "This is my serverless function!";
pub const SIMPLE_FAILURE_MESSAGE: &str = "This is my failing serverless function!";
pub const RANDOM_FAIL_MESSAGE: &str = "I decided to fail this time.";
pub const RANDOM_SUCCESS_MESSAGE: &str = "I decided to succeed this time.";
pub const CUSTOM_EVENTS_MESSAGE: &str = "This is my serverless function with custom events!";
pub const TYPE_ERROR_MESSAGE: &str = "This is a thrown error of TypeError!";
pub const GENERIC_ERROR_MESSAGE: &str = "This is a thrown error of Error!";

/// Probability of failure for [`RandomSuccessError`].
pub const FAILURE_THRESHOLD: f64 = 0.5;
/// Values above this (on a 0-100 scale) throw a `TypeError`.
pub const TYPE_ERROR_THRESHOLD: f64 = 50.0;
pub const MIN_DELAY_MS: u64 = 900;
pub const MAX_DELAY_MS: u64 = 2001;

const REPEATED_SENTENCE: &str =
    "this string is so long that it is not allowed so we cut it to a shorter length. ";

const LONG_VALUE: &str = "Leverage agile frameworks to provide a robust synopsis for high level \
overviews. Iterative approaches to corporate strategy foster collaborative thinking to further the \
overall value proposition. Organically grow the holistic world view of disruptive innovation via \
workplace diversity and empowerment. Bring to the table win-win survival strategies to ensure \
proactive domination. At the end of the day, going forward, a new normal that has evolved from \
generation X is on the runway heading towards a streamlined cloud solution. User generated content \
in real-time will have multiple touchpoints for offshoring.";

pub struct SimpleSuccess;

#[async_trait]
impl Handler for SimpleSuccess {
    fn name(&self) -> &str {
        "simple-success"
    }

    fn description(&self) -> &str {
        "Always succeeds with a fixed message"
    }

    async fn handle(&self, _event: Value, _ctx: &InvocationContext) -> Result<Outcome, HandlerError> {
        Ok(Outcome::success(SIMPLE_SUCCESS_MESSAGE))
    }
}

pub struct SimpleFailure;

#[async_trait]
impl Handler for SimpleFailure {
    fn name(&self) -> &str {
        "simple-failure"
    }

    fn description(&self) -> &str {
        "Always fails with a fixed message"
    }

    async fn handle(&self, _event: Value, _ctx: &InvocationContext) -> Result<Outcome, HandlerError> {
        Ok(Outcome::failure(SIMPLE_FAILURE_MESSAGE))
    }
}

pub struct RandomSuccessError {
    dice: Arc<dyn Dice>,
}

impl RandomSuccessError {
    pub fn new(dice: Arc<dyn Dice>) -> Self {
        Self { dice }
    }
}

#[async_trait]
impl Handler for RandomSuccessError {
    fn name(&self) -> &str {
        "random-success-error"
    }

    fn description(&self) -> &str {
        "Fails or succeeds on a coin flip"
    }

    async fn handle(&self, _event: Value, _ctx: &InvocationContext) -> Result<Outcome, HandlerError> {
        if below_threshold(self.dice.roll(), FAILURE_THRESHOLD) {
            Ok(Outcome::failure(RANDOM_FAIL_MESSAGE))
        } else {
            Ok(Outcome::success(RANDOM_SUCCESS_MESSAGE))
        }
    }
}

pub struct LongRunningSuccess {
    dice: Arc<dyn Dice>,
}

impl LongRunningSuccess {
    pub fn new(dice: Arc<dyn Dice>) -> Self {
        Self { dice }
    }
}

#[async_trait]
impl Handler for LongRunningSuccess {
    fn name(&self) -> &str {
        "long-running-success"
    }

    fn description(&self) -> &str {
        "Waits 900 to 2001 ms, then succeeds"
    }

    async fn handle(&self, _event: Value, _ctx: &InvocationContext) -> Result<Outcome, HandlerError> {
        let millis = uniform_millis(self.dice.roll(), MIN_DELAY_MS, MAX_DELAY_MS);
        tracing::debug!(millis, "Delaying success");
        tokio::time::sleep(Duration::from_millis(millis)).await;
        Ok(Outcome::success(format!(
            "Succeeded with a set duration of {millis}"
        )))
    }
}

pub struct CustomEvents {
    dice: Arc<dyn Dice>,
}

impl CustomEvents {
    pub fn new(dice: Arc<dyn Dice>) -> Self {
        Self { dice }
    }
}

#[async_trait]
impl Handler for CustomEvents {
    fn name(&self) -> &str {
        "custom-events"
    }

    fn description(&self) -> &str {
        "Logs a batch of custom events, then succeeds"
    }

    async fn handle(&self, _event: Value, ctx: &InvocationContext) -> Result<Outcome, HandlerError> {
        ctx.log("simple-key", 42);
        ctx.log("key with space", "a neat value");
        ctx.log("value-too-long", REPEATED_SENTENCE.repeat(22).trim_end());
        ctx.log("undefined value", None::<String>);
        ctx.log("null value", Value::Null);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let random = (self.dice.roll() * 10_000.0).floor() as u64 + 1;
        ctx.log("random number", random);
        ctx.log("long_value", LONG_VALUE);
        Ok(Outcome::success(CUSTOM_EVENTS_MESSAGE))
    }
}

pub struct ThrownFailure {
    dice: Arc<dyn Dice>,
}

impl ThrownFailure {
    pub fn new(dice: Arc<dyn Dice>) -> Self {
        Self { dice }
    }
}

#[async_trait]
impl Handler for ThrownFailure {
    fn name(&self) -> &str {
        "thrown-failure"
    }

    fn description(&self) -> &str {
        "Throws a TypeError or an Error depending on a draw"
    }

    async fn handle(&self, _event: Value, _ctx: &InvocationContext) -> Result<Outcome, HandlerError> {
        let value = two_significant(self.dice.roll() * 100.0);
        if value > TYPE_ERROR_THRESHOLD {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let line = value.trunc() as u32;
            return Err(HandlerError::type_error(
                TYPE_ERROR_MESSAGE,
                Some(SourceLocation {
                    file: "someFile.js".into(),
                    line,
                }),
            ));
        }
        Err(HandlerError::generic(GENERIC_ERROR_MESSAGE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{ErrorKind, LambdaContext};
    use crate::handlers::selector::{FixedDice, SequenceDice, ThreadDice};
    use serde_json::json;

    fn ctx() -> InvocationContext {
        InvocationContext::unreported(LambdaContext::local("demo", Duration::from_secs(3)))
    }

    #[tokio::test]
    async fn simple_success_returns_literal_message() {
        let outcome = SimpleSuccess.handle(json!({}), &ctx()).await.unwrap();
        assert_eq!(outcome, Outcome::Success("This is my serverless function!".into()));
    }

    #[tokio::test]
    async fn simple_failure_fails() {
        let outcome = SimpleFailure.handle(json!({}), &ctx()).await.unwrap();
        assert_eq!(outcome, Outcome::Failure(SIMPLE_FAILURE_MESSAGE.into()));
    }

    #[tokio::test]
    async fn random_outcome_follows_draw() {
        let handler = RandomSuccessError::new(Arc::new(SequenceDice::new([0.2, 0.5, 0.8])));
        let ctx = ctx();
        assert!(handler.handle(json!({}), &ctx).await.unwrap().is_failure());
        assert_eq!(
            handler.handle(json!({}), &ctx).await.unwrap(),
            Outcome::success(RANDOM_SUCCESS_MESSAGE)
        );
        assert!(!handler.handle(json!({}), &ctx).await.unwrap().is_failure());
    }

    #[tokio::test]
    async fn random_outcome_ratio_is_near_half() {
        let handler = RandomSuccessError::new(Arc::new(ThreadDice));
        let ctx = ctx();
        let runs = 4_000;
        let mut failures = 0;
        for _ in 0..runs {
            if handler.handle(json!({}), &ctx).await.unwrap().is_failure() {
                failures += 1;
            }
        }
        let ratio = f64::from(failures) / f64::from(runs);
        // ~8 standard deviations of slack
        assert!((0.43..0.57).contains(&ratio), "failure ratio {ratio}");
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_success_waits_at_least_minimum() {
        for draw in [0.0, 0.42, 0.999_999] {
            let handler = LongRunningSuccess::new(Arc::new(FixedDice(draw)));
            let started = tokio::time::Instant::now();
            let outcome = handler.handle(json!({}), &ctx()).await.unwrap();
            let waited = started.elapsed();

            assert!(waited >= Duration::from_millis(MIN_DELAY_MS));
            assert!(waited <= Duration::from_millis(MAX_DELAY_MS + 1));
            let Outcome::Success(message) = outcome else {
                panic!("expected success, got {outcome:?}");
            };
            assert!(message.starts_with("Succeeded with a set duration of "));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_success_reports_chosen_duration() {
        let handler = LongRunningSuccess::new(Arc::new(FixedDice(0.5)));
        let outcome = handler.handle(json!({}), &ctx()).await.unwrap();
        assert_eq!(outcome, Outcome::success("Succeeded with a set duration of 1451"));
    }

    #[tokio::test]
    async fn thrown_failure_kind_follows_draw() {
        let cases = [
            (0.10, ErrorKind::Generic),
            (0.504, ErrorKind::Generic),
            (0.51, ErrorKind::Type),
            (0.72, ErrorKind::Type),
            (0.999, ErrorKind::Type),
        ];
        for (draw, expected) in cases {
            let handler = ThrownFailure::new(Arc::new(FixedDice(draw)));
            let err = handler.handle(json!({}), &ctx()).await.unwrap_err();
            assert_eq!(err.kind(), Some(expected), "draw {draw}");
        }
    }

    #[tokio::test]
    async fn type_error_carries_location() {
        let handler = ThrownFailure::new(Arc::new(FixedDice(0.72)));
        let err = handler.handle(json!({}), &ctx()).await.unwrap_err();
        assert_eq!(err.to_string(), TYPE_ERROR_MESSAGE);
        match err {
            HandlerError::Thrown {
                location: Some(location),
                ..
            } => assert_eq!(location.to_string(), "someFile.js:72"),
            other => panic!("unexpected error {other:?}"),
        }

        let handler = ThrownFailure::new(Arc::new(FixedDice(0.998)));
        match handler.handle(json!({}), &ctx()).await.unwrap_err() {
            HandlerError::Thrown {
                location: Some(location),
                ..
            } => assert_eq!(location.line, 100),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn generic_error_message() {
        let handler = ThrownFailure::new(Arc::new(FixedDice(0.3)));
        let err = handler.handle(json!({}), &ctx()).await.unwrap_err();
        assert_eq!(err.name(), "Error");
        assert_eq!(err.to_string(), GENERIC_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn custom_events_forward_every_value() {
        let ctx = InvocationContext::reporting(LambdaContext::local("demo", Duration::from_secs(3)));
        let handler = CustomEvents::new(Arc::new(FixedDice(0.0)));
        let outcome = handler.handle(json!({}), &ctx).await.unwrap();
        assert_eq!(outcome, Outcome::success(CUSTOM_EVENTS_MESSAGE));

        let recorded = ctx.recorded();
        let find = |name: &str| {
            recorded
                .custom_metrics
                .iter()
                .find(|m| m.name == name)
                .cloned()
                .unwrap()
        };
        assert_eq!(recorded.custom_metrics.len(), 7);
        assert_eq!(find("simple-key").n, Some(42.into()));
        assert_eq!(find("key with space").s.as_deref(), Some("a neat value"));
        assert_eq!(find("undefined value").s.as_deref(), Some("undefined"));
        assert_eq!(find("null value").s.as_deref(), Some("null"));
        assert_eq!(find("random number").n, Some(1.into()));
        assert!(find("value-too-long").s.unwrap().len() > 1_000);
        assert_eq!(find("long_value").s.as_deref(), Some(LONG_VALUE));
    }
}
