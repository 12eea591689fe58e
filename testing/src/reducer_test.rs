//! Given-When-Then harness for state-machine reducers.
//!
//! A transition reads best as "from this state, after these actions, this
//! action leads here and asks for this work". [`ReducerTest`] replays the setup
//! actions, applies the action under test, and checks:
//!
//! - the resulting state ([`then_state`](ReducerTest::then_state)),
//! - the step itself, comparing the state before and after the action
//!   ([`then_transition`](ReducerTest::then_transition),
//!   [`then_unchanged`](ReducerTest::then_unchanged) for rejected actions),
//! - the effects, either as values ([`then_effects`](ReducerTest::then_effects))
//!   or by running them and looking at the actions they feed back
//!   ([`then_feedback`](ReducerTest::then_feedback)).

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use std::fmt::Debug;
use storefront_core::{effect::Effect, reducer::Reducer};

type StateCheck<S> = Box<dyn FnOnce(&S)>;
type TransitionCheck<S> = Box<dyn FnOnce(&S, &S)>;
type EffectCheck<A> = Box<dyn FnOnce(&[Effect<A>])>;
type FeedbackCheck<A> = Box<dyn FnOnce(&[A])>;

/// Fluent reducer test
///
/// # Example
///
/// ```ignore
/// use storefront_testing::ReducerTest;
///
/// ReducerTest::new(CheckoutReducer)
///     .with_env(test_environment())
///     .given_state(CheckoutState::default())
///     .given_actions([CheckoutAction::Open])
///     .when_action(CheckoutAction::SetEmail("too early".into()))
///     .then_unchanged()
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    setup: Vec<A>,
    action: Option<A>,
    state_checks: Vec<StateCheck<S>>,
    transition_checks: Vec<TransitionCheck<S>>,
    effect_checks: Vec<EffectCheck<A>>,
    feedback_checks: Vec<FeedbackCheck<A>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
    S: Clone,
{
    /// Start a test for `reducer`
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            setup: Vec::new(),
            action: None,
            state_checks: Vec::new(),
            transition_checks: Vec::new(),
            effect_checks: Vec::new(),
            feedback_checks: Vec::new(),
        }
    }

    /// Environment handed to every `reduce` call
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// Initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Actions replayed before the action under test. Their effects are dropped.
    #[must_use]
    pub fn given_actions(mut self, actions: impl IntoIterator<Item = A>) -> Self {
        self.setup.extend(actions);
        self
    }

    /// Action under test (When)
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.action = Some(action);
        self
    }

    /// Check the state after the action under test
    #[must_use]
    pub fn then_state<F>(mut self, check: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_checks.push(Box::new(check));
        self
    }

    /// Check the step taken by the action under test, given the state right
    /// before it (after setup) and right after it
    #[must_use]
    pub fn then_transition<F>(mut self, check: F) -> Self
    where
        F: FnOnce(&S, &S) + 'static,
    {
        self.transition_checks.push(Box::new(check));
        self
    }

    /// Expect the action under test to be rejected: state untouched
    #[must_use]
    pub fn then_unchanged(self) -> Self
    where
        S: PartialEq + Debug + 'static,
    {
        self.then_transition(|before, after| {
            assert_eq!(before, after, "expected the action to leave the state untouched");
        })
    }

    /// Check the effects of the action under test as values
    #[must_use]
    pub fn then_effects<F>(mut self, check: F) -> Self
    where
        F: FnOnce(&[Effect<A>]) + 'static,
    {
        self.effect_checks.push(Box::new(check));
        self
    }

    /// Run every future effect to completion and check the actions they
    /// feed back, in effect order
    #[must_use]
    pub fn then_feedback<F>(mut self, check: F) -> Self
    where
        F: FnOnce(&[A]) + 'static,
    {
        self.feedback_checks.push(Box::new(check));
        self
    }

    /// Run the reducer and every check
    ///
    /// # Panics
    ///
    /// Panics if the state, action or environment is missing, or if a check
    /// fails.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("given_state() is required");
        let action = self.action.expect("when_action() is required");
        let env = self.environment.expect("with_env() is required");

        for setup in self.setup {
            drop(self.reducer.reduce(&mut state, setup, &env));
        }

        let before = (!self.transition_checks.is_empty()).then(|| state.clone());
        let effects = self.reducer.reduce(&mut state, action, &env);

        for check in self.state_checks {
            check(&state);
        }
        if let Some(before) = before {
            for check in self.transition_checks {
                check(&before, &state);
            }
        }
        for check in self.effect_checks {
            check(&effects);
        }
        if !self.feedback_checks.is_empty() {
            let feedback = resolve(effects);
            for check in self.feedback_checks {
                check(&feedback);
            }
        }
    }
}

/// Drive every future effect on a throwaway current-thread runtime and collect
/// the actions they produce.
///
/// # Panics
///
/// Panics if the runtime cannot be built.
#[allow(clippy::expect_used)] // Test code can use expect
pub fn resolve<A>(effects: impl IntoIterator<Item = Effect<A>>) -> Vec<A> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("test runtime");

    let mut produced = Vec::new();
    for effect in effects {
        if let Effect::Future(future) = effect {
            produced.extend(runtime.block_on(future));
        }
    }
    produced
}

/// Effect assertions
pub mod assertions {
    use storefront_core::effect::Effect;

    fn describe<A>(effects: &[Effect<A>]) -> Vec<&'static str> {
        effects
            .iter()
            .map(|effect| match effect {
                Effect::None => "none",
                Effect::Future(_) => "future",
            })
            .collect()
    }

    /// The action asked for no work (an explicit `Effect::None` counts as none)
    ///
    /// # Panics
    ///
    /// Panics if any future effect is present.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_effects<A>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().all(Effect::is_none),
            "expected no work, got {:?}",
            describe(effects)
        );
    }

    /// Exactly `expected` effects were returned
    ///
    /// # Panics
    ///
    /// Panics on a different count.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        assert_eq!(
            effects.len(),
            expected,
            "unexpected effects {:?}",
            describe(effects)
        );
    }

    /// At least one future effect was returned
    ///
    /// # Panics
    ///
    /// Panics if there is none.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().any(|effect| !effect.is_none()),
            "expected a future effect, got {:?}",
            describe(effects)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::{SmallVec, smallvec};

    // A two-step payment: Browsing --Pay--> Paying --Settled--> Paid | Browsing

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Step {
        Browsing,
        Paying,
        Paid,
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    struct Till {
        step: Step,
        attempts: u32,
        receipt: Option<String>,
    }

    impl Default for Till {
        fn default() -> Self {
            Self {
                step: Step::Browsing,
                attempts: 0,
                receipt: None,
            }
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum TillAction {
        Pay,
        Settled { accepted: bool },
        Abandon,
    }

    /// Whether the fake processor accepts payments
    struct Processor {
        accepts: bool,
    }

    struct TillReducer;

    impl Reducer for TillReducer {
        type State = Till;
        type Action = TillAction;
        type Environment = Processor;

        fn reduce(
            &self,
            state: &mut Till,
            action: TillAction,
            env: &Processor,
        ) -> SmallVec<[Effect<TillAction>; 4]> {
            match (state.step, action) {
                (Step::Browsing, TillAction::Pay) => {
                    state.step = Step::Paying;
                    state.attempts += 1;
                    let accepted = env.accepts;
                    smallvec![Effect::Future(Box::pin(async move {
                        tokio::task::yield_now().await;
                        Some(TillAction::Settled { accepted })
                    }))]
                }
                (Step::Paying, TillAction::Settled { accepted: true }) => {
                    state.step = Step::Paid;
                    state.receipt = Some(format!("receipt-{}", state.attempts));
                    smallvec![Effect::None]
                }
                (Step::Paying, TillAction::Settled { accepted: false }) | (_, TillAction::Abandon) => {
                    state.step = Step::Browsing;
                    SmallVec::new()
                }
                _ => SmallVec::new(),
            }
        }
    }

    fn till(accepts: bool) -> ReducerTest<TillReducer, Till, TillAction, Processor> {
        ReducerTest::new(TillReducer)
            .with_env(Processor { accepts })
            .given_state(Till::default())
    }

    #[test]
    fn test_transition_sees_state_after_setup() {
        till(true)
            .given_actions([TillAction::Pay, TillAction::Abandon])
            .when_action(TillAction::Pay)
            .then_transition(|before, after| {
                assert_eq!(before.step, Step::Browsing);
                assert_eq!(before.attempts, 1);
                assert_eq!(after.step, Step::Paying);
                assert_eq!(after.attempts, 2);
            })
            .run();
    }

    #[test]
    fn test_out_of_step_action_is_unchanged() {
        till(true)
            .when_action(TillAction::Settled { accepted: true })
            .then_unchanged()
            .then_effects(|effects| assertions::assert_effects_count(effects, 0))
            .run();
    }

    #[test]
    #[should_panic(expected = "leave the state untouched")]
    fn test_unchanged_fails_on_a_real_step() {
        till(true).when_action(TillAction::Pay).then_unchanged().run();
    }

    #[test]
    fn test_feedback_runs_the_effect() {
        till(false)
            .when_action(TillAction::Pay)
            .then_effects(|effects| assertions::assert_has_future_effect(effects))
            .then_feedback(|actions| {
                assert_eq!(actions, [TillAction::Settled { accepted: false }]);
            })
            .run();
    }

    #[test]
    fn test_feedback_closes_the_loop() {
        let actions = resolve(TillReducer.reduce(
            &mut Till::default(),
            TillAction::Pay,
            &Processor { accepts: true },
        ));

        till(true)
            .given_actions([TillAction::Pay])
            .when_action(actions[0].clone())
            .then_state(|state| {
                assert_eq!(state.step, Step::Paid);
                assert_eq!(state.receipt.as_deref(), Some("receipt-1"));
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    #[should_panic(expected = "expected no work")]
    fn test_no_effects_rejects_a_future() {
        let effects = TillReducer.reduce(
            &mut Till::default(),
            TillAction::Pay,
            &Processor { accepts: true },
        );
        assertions::assert_no_effects(&effects);
    }
}
