//! # Storefront Core
//!
//! Core traits and types for the storefront state-synchronization layer.
//!
//! This crate provides the pieces every other crate in the workspace builds on:
//! the closed event catalog, the synchronous [`event_bus::EventBus`], the domain
//! types owned by the catalog, cart and checkout stores, and the collaborator
//! traits (order submission, product fetch) that the runtime talks to.
//!
//! ## Core Concepts
//!
//! - **Event**: A [`event::ShopEvent`] variant; its [`event::Topic`] is derived
//!   from the variant so names and payloads can never disagree
//! - **Store**: Owns one slice of mutable state and publishes a snapshot after
//!   every change
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//!   used for the checkout state machine
//! - **Effect**: Side effect description (the order submission), executed by the
//!   runtime, never by the reducer
//! - **Environment**: Injected dependencies via traits ([`api::ShopApi`],
//!   [`environment::Clock`])
//!
//! ## Example
//!
//! ```
//! use storefront_core::event::{ShopEvent, Topic};
//! use storefront_core::event_bus::EventBus;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let bus = EventBus::new();
//! let locked = Rc::new(Cell::new(false));
//!
//! let seen = Rc::clone(&locked);
//! bus.subscribe(Topic::PageLocked, move |event| {
//!     if let ShopEvent::PageLocked { locked } = event {
//!         seen.set(*locked);
//!     }
//! });
//!
//! bus.publish(ShopEvent::PageLocked { locked: true });
//! assert!(locked.get());
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

pub mod api;
pub mod error;
pub mod event;
pub mod event_bus;
pub mod types;
pub mod validation;

/// Reducer module - The core trait for state-machine logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.
/// They contain the transition rules and are deterministic and testable without
/// a bus, a network, or a runtime.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for transition logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for CheckoutReducer {
    ///     type State = CheckoutState;
    ///     type Action = CheckoutAction;
    ///     type Environment = CheckoutEnvironment;
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut CheckoutState,
    ///         action: CheckoutAction,
    ///         env: &CheckoutEnvironment,
    ///     ) -> SmallVec<[Effect<CheckoutAction>; 4]> {
    ///         match action {
    ///             CheckoutAction::Reset => {
    ///                 state.reset();
    ///                 SmallVec::new()
    ///             }
    ///             _ => SmallVec::new(),
    ///         }
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Checks the action against the current state
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution).
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are returned from reducers and
    /// executed by the store that owns the reducer.
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Whether this effect does nothing when executed
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Test - fixed time for deterministic tests
    /// struct FixedClock { time: DateTime<Utc> }
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> DateTime<Utc> {
    ///         self.time
    ///     }
    /// }
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
