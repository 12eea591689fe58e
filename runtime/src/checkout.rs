//! Checkout state machine.
//!
//! The transition rules live in [`CheckoutReducer`], a pure [`Reducer`] over
//! [`CheckoutState`]. [`CheckoutStore`] owns the state, feeds actions through
//! the reducer, publishes `checkout:updated` after every accepted action, and
//! hands the order submission effect back to the caller as a
//! [`PendingSubmission`].
//!
//! # Stages
//!
//! ```text
//! Idle ──open──► EnteringOrder ──advance──► EnteringContacts ──submit──► Submitting ──ok──► Complete
//!  ▲                                               ▲                          │
//!  │                                               └─────────failure──────────┘
//!  └──────────────────────────── reset (from any stage) ─────────────────────────────────────┘
//! ```
//!
//! Actions that do not apply to the current stage are rejected: the state is
//! left untouched and nothing is published.
//!
//! # Late responses
//!
//! Every submission is tagged with a sequence number. A response whose number
//! no longer matches (the checkout was reset while the request was in flight)
//! does not move the stage. A late success is still recorded and announced
//! as `order:placed`, since the backend has accepted the order.

use crate::metrics::OrderMetrics;
use smallvec::{SmallVec, smallvec};
use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use storefront_core::api::ShopApi;
use storefront_core::effect::Effect;
use storefront_core::environment::Clock;
use storefront_core::error::ApiError;
use storefront_core::event::ShopEvent;
use storefront_core::event_bus::EventPublisher;
use storefront_core::reducer::Reducer;
use storefront_core::types::{
    BuyerFields, CheckoutSnapshot, CheckoutStage, FieldErrors, OrderRequest, OrderResult,
    PaymentMethod, PlacedOrder,
};
use storefront_core::validation;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Stage-level message shown after a failed submission
pub const SUBMISSION_FAILED: &str = "Could not place the order. Please try again.";

/// State owned by [`CheckoutStore`]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CheckoutState {
    /// Current stage
    pub stage: CheckoutStage,
    /// Buyer data collected so far
    pub fields: BuyerFields,
    /// Message from the last failed submission
    pub submission_error: Option<String>,
    /// Most recent order accepted by the backend
    pub last_order: Option<PlacedOrder>,
    /// Sequence number of the most recent submission
    pub submission_seq: u64,
    /// Bumped on every accepted action
    pub revision: u64,
}

impl CheckoutState {
    /// Validation errors for the form of the current stage
    #[must_use]
    pub fn errors(&self) -> FieldErrors {
        match self.stage {
            CheckoutStage::EnteringOrder => validation::validate_order(&self.fields),
            CheckoutStage::EnteringContacts | CheckoutStage::Submitting => {
                validation::validate_contacts(&self.fields)
            }
            CheckoutStage::Idle | CheckoutStage::Complete => FieldErrors::new(),
        }
    }

    /// Published view of the state
    #[must_use]
    pub fn snapshot(&self) -> CheckoutSnapshot {
        CheckoutSnapshot {
            stage: self.stage,
            fields: self.fields.clone(),
            errors: self.errors(),
            submission_error: self.submission_error.clone(),
        }
    }

    fn move_to(&mut self, next: CheckoutStage) {
        debug_assert!(self.stage.can_transition_to(next));
        tracing::debug!(from = ?self.stage, to = ?next, "checkout stage changed");
        self.stage = next;
    }

    fn accept(&mut self) {
        self.revision += 1;
    }
}

/// Inputs of the checkout state machine
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckoutAction {
    /// Start a checkout from `Idle`
    Open,
    /// Choose the payment method
    SetPayment(PaymentMethod),
    /// Edit the delivery address
    SetAddress(String),
    /// Leave the order step if it is valid
    AdvanceToContacts,
    /// Edit the contact email
    SetEmail(String),
    /// Edit the contact phone
    SetPhone(String),
    /// Send the order if the contacts step is valid
    Submit(OrderRequest),
    /// The backend accepted submission `seq`
    SubmissionSucceeded {
        /// Submission sequence number
        seq: u64,
        /// Backend response
        result: OrderResult,
    },
    /// Submission `seq` failed
    SubmissionFailed {
        /// Submission sequence number
        seq: u64,
        /// Failure reported by the backend adapter
        error: ApiError,
    },
    /// Abandon the checkout
    Reset,
}

impl CheckoutAction {
    const fn name(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::SetPayment(_) => "set_payment",
            Self::SetAddress(_) => "set_address",
            Self::AdvanceToContacts => "advance_to_contacts",
            Self::SetEmail(_) => "set_email",
            Self::SetPhone(_) => "set_phone",
            Self::Submit(_) => "submit",
            Self::SubmissionSucceeded { .. } => "submission_succeeded",
            Self::SubmissionFailed { .. } => "submission_failed",
            Self::Reset => "reset",
        }
    }
}

/// Dependencies of the checkout reducer
#[derive(Clone)]
pub struct CheckoutEnvironment {
    /// Order submission backend
    pub api: Arc<dyn ShopApi>,
    /// Timestamps accepted orders
    pub clock: Arc<dyn Clock>,
}

impl CheckoutEnvironment {
    /// Bundle the collaborators
    #[must_use]
    pub fn new(api: Arc<dyn ShopApi>, clock: Arc<dyn Clock>) -> Self {
        Self { api, clock }
    }
}

impl std::fmt::Debug for CheckoutEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutEnvironment").finish_non_exhaustive()
    }
}

/// Pure transition rules of the checkout
#[derive(Clone, Copy, Debug, Default)]
pub struct CheckoutReducer;

type Effects = SmallVec<[Effect<CheckoutAction>; 4]>;

impl CheckoutReducer {
    fn reject(state: &CheckoutState, action: &CheckoutAction, reason: &'static str) -> Effects {
        tracing::debug!(stage = ?state.stage, action = action.name(), reason, "checkout action rejected");
        SmallVec::new()
    }

    fn submission_effect(api: Arc<dyn ShopApi>, seq: u64, request: OrderRequest) -> Effect<CheckoutAction> {
        Effect::Future(Box::pin(async move {
            let action = match api.create_order(request).await {
                Ok(result) => CheckoutAction::SubmissionSucceeded { seq, result },
                Err(error) => CheckoutAction::SubmissionFailed { seq, error },
            };
            Some(action)
        }))
    }
}

impl Reducer for CheckoutReducer {
    type State = CheckoutState;
    type Action = CheckoutAction;
    type Environment = CheckoutEnvironment;

    fn reduce(
        &self,
        state: &mut CheckoutState,
        action: CheckoutAction,
        env: &CheckoutEnvironment,
    ) -> Effects {
        match action {
            CheckoutAction::Open => {
                if state.stage != CheckoutStage::Idle {
                    return Self::reject(state, &action, "checkout already open");
                }
                state.fields.clear();
                state.submission_error = None;
                state.move_to(CheckoutStage::EnteringOrder);
                state.accept();
                SmallVec::new()
            }

            CheckoutAction::SetPayment(method) => {
                if !state.stage.accepts_order_fields() {
                    return Self::reject(state, &action, "order fields are locked");
                }
                state.fields.payment = Some(method);
                state.accept();
                SmallVec::new()
            }

            CheckoutAction::SetAddress(ref address) => {
                if !state.stage.accepts_order_fields() {
                    return Self::reject(state, &action, "order fields are locked");
                }
                state.fields.address.clone_from(address);
                state.accept();
                SmallVec::new()
            }

            CheckoutAction::AdvanceToContacts => {
                if state.stage != CheckoutStage::EnteringOrder {
                    return Self::reject(state, &action, "not on the order step");
                }
                if !validation::validate_order(&state.fields).is_empty() {
                    return Self::reject(state, &action, "order step is invalid");
                }
                state.move_to(CheckoutStage::EnteringContacts);
                state.accept();
                SmallVec::new()
            }

            CheckoutAction::SetEmail(ref email) => {
                if !state.stage.accepts_contact_fields() {
                    return Self::reject(state, &action, "contact fields are locked");
                }
                state.fields.email.clone_from(email);
                state.accept();
                SmallVec::new()
            }

            CheckoutAction::SetPhone(ref phone) => {
                if !state.stage.accepts_contact_fields() {
                    return Self::reject(state, &action, "contact fields are locked");
                }
                state.fields.phone.clone_from(phone);
                state.accept();
                SmallVec::new()
            }

            CheckoutAction::Submit(request) => {
                if state.stage != CheckoutStage::EnteringContacts {
                    return Self::reject(state, &CheckoutAction::Submit(request), "not on the contacts step");
                }
                if !validation::validate_contacts(&state.fields).is_empty() {
                    return Self::reject(state, &CheckoutAction::Submit(request), "contacts step is invalid");
                }
                state.submission_seq += 1;
                state.submission_error = None;
                state.move_to(CheckoutStage::Submitting);
                state.accept();
                tracing::info!(
                    seq = state.submission_seq,
                    items = request.items.len(),
                    total = request.total,
                    "submitting order"
                );
                smallvec![Self::submission_effect(
                    Arc::clone(&env.api),
                    state.submission_seq,
                    request
                )]
            }

            CheckoutAction::SubmissionSucceeded { seq, result } => {
                let order = PlacedOrder::new(result, env.clock.now());
                tracing::info!(seq, order = %order.id, total = order.total, "order placed");

                if seq == state.submission_seq && state.stage == CheckoutStage::Submitting {
                    state.fields.clear();
                    state.submission_error = None;
                    state.move_to(CheckoutStage::Complete);
                    state.accept();
                } else {
                    tracing::debug!(seq, current = state.submission_seq, stage = ?state.stage, "late success; stage unchanged");
                }
                state.last_order = Some(order);
                SmallVec::new()
            }

            CheckoutAction::SubmissionFailed { seq, ref error } => {
                if seq != state.submission_seq || state.stage != CheckoutStage::Submitting {
                    return Self::reject(state, &action, "stale submission response");
                }
                tracing::warn!(seq, error = %error, "order submission failed");
                state.submission_error = Some(SUBMISSION_FAILED.to_string());
                state.move_to(CheckoutStage::EnteringContacts);
                state.accept();
                SmallVec::new()
            }

            CheckoutAction::Reset => {
                state.fields.clear();
                state.submission_error = None;
                if state.stage != CheckoutStage::Idle {
                    state.move_to(CheckoutStage::Idle);
                }
                state.accept();
                SmallVec::new()
            }
        }
    }
}

/// An order request that has been accepted by the state machine but not yet
/// sent.
///
/// Either await it in place with [`run`](Self::run), or hand it to a runtime
/// with [`start`](Self::start) and collect the response later. The response is
/// fed back into the store it came from, if that store still exists.
#[must_use = "the order is not sent until the submission is run"]
pub struct PendingSubmission {
    seq: u64,
    effect: Pin<Box<dyn Future<Output = Option<CheckoutAction>> + Send>>,
    store: Weak<CheckoutStore>,
}

impl PendingSubmission {
    /// Sequence number of this submission
    #[must_use]
    pub const fn seq(&self) -> u64 {
        self.seq
    }

    /// Send the order and apply the response
    pub async fn run(self) {
        let action = self.effect.await;
        deliver(&self.store, self.seq, action);
    }

    /// Send the order on `runtime` without waiting for it
    pub fn start(self, runtime: &Handle) -> InFlightSubmission {
        tracing::debug!(seq = self.seq, "order submission started");
        InFlightSubmission {
            seq: self.seq,
            task: runtime.spawn(self.effect),
            store: self.store,
        }
    }
}

impl std::fmt::Debug for PendingSubmission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingSubmission")
            .field("seq", &self.seq)
            .finish_non_exhaustive()
    }
}

/// A submission whose request is running on a runtime task.
///
/// The response is only applied by [`finish`](Self::finish), on the thread
/// that owns the store.
#[must_use = "the response is not applied until the submission is finished"]
pub struct InFlightSubmission {
    seq: u64,
    task: JoinHandle<Option<CheckoutAction>>,
    store: Weak<CheckoutStore>,
}

impl InFlightSubmission {
    /// Sequence number of this submission
    #[must_use]
    pub const fn seq(&self) -> u64 {
        self.seq
    }

    /// Whether the response has arrived
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the response and apply it.
    ///
    /// A request task that died without answering counts as a transport
    /// failure, so the checkout never stays in `Submitting`.
    pub async fn finish(self) {
        let action = match self.task.await {
            Ok(action) => action,
            Err(error) => {
                tracing::warn!(seq = self.seq, error = %error, "order submission task failed");
                Some(CheckoutAction::SubmissionFailed {
                    seq: self.seq,
                    error: ApiError::Transport(error.to_string()),
                })
            }
        };
        deliver(&self.store, self.seq, action);
    }
}

impl std::fmt::Debug for InFlightSubmission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InFlightSubmission")
            .field("seq", &self.seq)
            .field("finished", &self.task.is_finished())
            .finish()
    }
}

fn deliver(store: &Weak<CheckoutStore>, seq: u64, action: Option<CheckoutAction>) {
    let Some(action) = action else {
        return;
    };
    match store.upgrade() {
        Some(store) => store.apply_response(action),
        None => tracing::debug!(seq, "checkout store dropped before response"),
    }
}

struct Outcome {
    accepted: bool,
    effects: Effects,
}

/// Buyer data and checkout stage, published as `checkout:updated`.
///
/// Always held as `Rc<CheckoutStore>` so pending submissions can find their
/// way back.
pub struct CheckoutStore {
    state: RefCell<CheckoutState>,
    reducer: CheckoutReducer,
    env: CheckoutEnvironment,
    events: Rc<dyn EventPublisher>,
}

impl CheckoutStore {
    /// Create an idle checkout
    #[must_use]
    pub fn new(env: CheckoutEnvironment, events: Rc<dyn EventPublisher>) -> Rc<Self> {
        Rc::new(Self {
            state: RefCell::new(CheckoutState::default()),
            reducer: CheckoutReducer,
            env,
            events,
        })
    }

    fn send(&self, action: CheckoutAction) -> Outcome {
        let placed = matches!(action, CheckoutAction::SubmissionSucceeded { .. });

        let (accepted, effects, snapshot, order) = {
            let mut state = self.state.borrow_mut();
            let revision = state.revision;
            let effects = self.reducer.reduce(&mut state, action, &self.env);
            let accepted = state.revision != revision;
            let snapshot = accepted.then(|| state.snapshot());
            let order = if placed { state.last_order.clone() } else { None };
            (accepted, effects, snapshot, order)
        };

        if let Some(snapshot) = snapshot {
            self.events.publish(ShopEvent::CheckoutUpdated(snapshot));
        }
        if let Some(order) = order {
            OrderMetrics::record_completed();
            self.events.publish(ShopEvent::OrderPlaced { order });
        }

        Outcome { accepted, effects }
    }

    fn apply_response(&self, action: CheckoutAction) {
        let seq = match &action {
            CheckoutAction::SubmissionSucceeded { seq, .. } => *seq,
            CheckoutAction::SubmissionFailed { seq, .. } => {
                OrderMetrics::record_failed();
                *seq
            }
            _ => return,
        };

        let outcome = self.send(action);
        // Responses settle the machine; they never schedule more work
        debug_assert!(outcome.effects.is_empty());
        if !outcome.accepted {
            tracing::debug!(seq, "order response left the stage unchanged");
        }
    }

    /// Start a checkout. Only accepted from `Idle`.
    pub fn open(&self) -> bool {
        self.send(CheckoutAction::Open).accepted
    }

    /// Choose the payment method. Only accepted on the order step.
    pub fn set_payment(&self, method: PaymentMethod) {
        self.send(CheckoutAction::SetPayment(method));
    }

    /// Edit the address. Only accepted on the order step.
    pub fn set_address(&self, address: impl Into<String>) {
        self.send(CheckoutAction::SetAddress(address.into()));
    }

    /// Errors of the order step for the current fields
    #[must_use]
    pub fn validate_order(&self) -> FieldErrors {
        validation::validate_order(&self.state.borrow().fields)
    }

    /// Move to the contacts step. Returns `false` (and changes nothing) when
    /// the order step is invalid or not current.
    pub fn advance_to_contacts(&self) -> bool {
        self.send(CheckoutAction::AdvanceToContacts).accepted
    }

    /// Edit the email. Only accepted on the contacts step.
    pub fn set_email(&self, email: impl Into<String>) {
        self.send(CheckoutAction::SetEmail(email.into()));
    }

    /// Edit the phone. Only accepted on the contacts step.
    pub fn set_phone(&self, phone: impl Into<String>) {
        self.send(CheckoutAction::SetPhone(phone.into()));
    }

    /// Errors of the contacts step for the current fields
    #[must_use]
    pub fn validate_contacts(&self) -> FieldErrors {
        validation::validate_contacts(&self.state.borrow().fields)
    }

    /// Move to `Submitting` and return the request to run.
    ///
    /// Returns `None` (and sends nothing) unless the contacts step is current
    /// and valid, which also rules out a second submit while one is in flight.
    pub fn submit(self: &Rc<Self>, request: OrderRequest) -> Option<PendingSubmission> {
        let outcome = self.send(CheckoutAction::Submit(request));
        if !outcome.accepted {
            return None;
        }

        let effect = outcome.effects.into_iter().find_map(|effect| match effect {
            Effect::Future(future) => Some(future),
            Effect::None => None,
        })?;

        OrderMetrics::record_submitted();
        Some(PendingSubmission {
            seq: self.state.borrow().submission_seq,
            effect,
            store: Rc::downgrade(self),
        })
    }

    /// Abandon the checkout from any stage
    pub fn reset(&self) {
        self.send(CheckoutAction::Reset);
    }

    /// Published view of the current state
    #[must_use]
    pub fn snapshot(&self) -> CheckoutSnapshot {
        self.state.borrow().snapshot()
    }

    /// Current stage
    #[must_use]
    pub fn stage(&self) -> CheckoutStage {
        self.state.borrow().stage
    }

    /// Buyer data collected so far
    #[must_use]
    pub fn fields(&self) -> BuyerFields {
        self.state.borrow().fields.clone()
    }

    /// Most recent accepted order
    #[must_use]
    pub fn last_order(&self) -> Option<PlacedOrder> {
        self.state.borrow().last_order.clone()
    }
}

impl std::fmt::Debug for CheckoutStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutStore")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
