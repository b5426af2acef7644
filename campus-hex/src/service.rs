//! Registration Application Service
//!
//! Orchestrates the checkout/reconciliation flow and the administrative
//! operations through the repository and gateway ports. Contains NO
//! infrastructure logic - pure business orchestration.

use campus_types::{
    AppError, AssignRankRequest, BulkAttendanceRequest, CancelCheckoutRequest, CheckoutAudit,
    CheckoutStage, ConfirmPaymentRequest, CreateOrderRequest, CreateOrderResponse, DomainError,
    EventId, Money, PaymentConfirmation, PaymentGateway, Registration, RegistrationId,
    RegistrationIntent, RegistrationKey, RegistrationRepository, StudentId, SubeventId,
};

/// Application service for event registrations.
///
/// Generic over `R: RegistrationRepository` and `G: PaymentGateway` - the
/// adapters are injected at compile time. This enables:
/// - Swapping the store (SQLite/Postgres) without code changes
/// - Testing the reconciliation flow with in-memory doubles
/// - Compile-time checks for port implementations
pub struct RegistrationService<R: RegistrationRepository, G: PaymentGateway> {
    repo: R,
    gateway: G,
}

impl<R: RegistrationRepository, G: PaymentGateway> RegistrationService<R, G> {
    /// Creates a new registration service with the given adapters.
    pub fn new(repo: R, gateway: G) -> Self {
        Self { repo, gateway }
    }

    /// Returns a reference to the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Validates a raw order request into a registration intent.
    fn intent(&self, req: &CreateOrderRequest) -> Result<RegistrationIntent, AppError> {
        let fee = Money::new(req.fee, req.currency)?;
        let key = RegistrationKey {
            student_id: req.student_id,
            event_id: req.event_id,
            subevent_id: req.subevent_id,
        };
        let intent = RegistrationIntent::new(
            key,
            req.student_name.clone(),
            req.student_email.clone(),
            fee,
        )?;
        Ok(intent)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Checkout / reconciliation
    // ─────────────────────────────────────────────────────────────────────────

    /// Starts a checkout: validates the intent, rejects triples that already
    /// hold a paid registration, then creates a gateway order.
    ///
    /// Nothing but an audit entry is persisted here. The registration row is
    /// written only when the confirmation verifies.
    pub async fn create_order(
        &self,
        req: CreateOrderRequest,
    ) -> Result<CreateOrderResponse, AppError> {
        let intent = self.intent(&req)?;

        // Fail fast before spending a gateway round trip.
        if self.repo.find_paid(&intent.key).await?.is_some() {
            return Err(AppError::AlreadyRegistered(intent.key));
        }

        let order = self.gateway.create_order(intent.fee, &intent.receipt()).await?;

        self.repo
            .record_checkout(CheckoutAudit::new(
                &order.order_id,
                CheckoutStage::OrderCreated,
                Some(intent.key.to_string()),
            ))
            .await?;

        tracing::info!(order_id = %order.order_id, key = %intent.key, "gateway order created");

        Ok(CreateOrderResponse {
            order_id: order.order_id,
            key: self.gateway.checkout_key().to_string(),
            amount: order.amount.amount(),
            currency: order.amount.currency(),
        })
    }

    /// Settles a checkout: verifies the gateway signature and, if valid,
    /// commits the paid registration atomically.
    ///
    /// A duplicate confirmation for an already-registered triple fails with
    /// `AlreadyRegistered` and persists nothing; the losing side of a
    /// concurrent race serializes inside `insert_paid`.
    pub async fn confirm_payment(
        &self,
        req: ConfirmPaymentRequest,
    ) -> Result<Registration, AppError> {
        let intent = self.intent(&req.intent)?;

        let confirmation = PaymentConfirmation {
            order_id: req.order_id.clone(),
            payment_id: req.payment_id.clone(),
            signature: req.signature,
        };

        if !self.gateway.verify_confirmation(&confirmation) {
            tracing::warn!(
                order_id = %req.order_id,
                key = %intent.key,
                "payment confirmation signature mismatch"
            );
            // Best effort: a failed audit write must not mask the rejection.
            if let Err(e) = self
                .repo
                .record_checkout(CheckoutAudit::new(
                    &req.order_id,
                    CheckoutStage::Rejected,
                    Some("signature mismatch".into()),
                ))
                .await
            {
                tracing::error!(order_id = %req.order_id, "audit write failed: {}", e);
            }
            return Err(AppError::InvalidSignature);
        }

        let registration = Registration::paid(intent, req.order_id, req.payment_id);
        let committed = self.repo.insert_paid(registration).await?;

        tracing::info!(
            registration_id = %committed.id,
            order_id = %committed.gateway_order_id,
            "registration committed"
        );

        Ok(committed)
    }

    /// Records a checkout the student walked away from. The gateway order is
    /// left to expire on its own; no registration row exists for it.
    pub async fn cancel_checkout(&self, req: CancelCheckoutRequest) -> Result<(), AppError> {
        self.repo
            .record_checkout(CheckoutAudit::new(
                &req.order_id,
                CheckoutStage::Abandoned,
                None,
            ))
            .await?;

        tracing::info!(order_id = %req.order_id, "checkout abandoned");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Registration queries
    // ─────────────────────────────────────────────────────────────────────────

    /// A student's registrations, newest first.
    pub async fn student_registrations(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<Registration>, AppError> {
        self.repo.list_for_student(student_id).await.map_err(Into::into)
    }

    /// Registrations for an event, optionally narrowed to one sub-event.
    pub async fn event_registrations(
        &self,
        event_id: EventId,
        subevent_id: Option<SubeventId>,
    ) -> Result<Vec<Registration>, AppError> {
        self.repo
            .list_for_event(event_id, subevent_id)
            .await
            .map_err(Into::into)
    }

    /// Number of paid participants for an event or sub-event.
    pub async fn participant_count(
        &self,
        event_id: EventId,
        subevent_id: Option<SubeventId>,
    ) -> Result<i64, AppError> {
        self.repo
            .count_paid(event_id, subevent_id)
            .await
            .map_err(Into::into)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Admin mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Marks attendance on one registration.
    pub async fn mark_attendance(
        &self,
        id: RegistrationId,
        present: bool,
    ) -> Result<Registration, AppError> {
        self.repo.set_attendance(id, present).await.map_err(Into::into)
    }

    /// Marks attendance on every paid registration of a sub-event.
    pub async fn mark_bulk_attendance(
        &self,
        req: BulkAttendanceRequest,
    ) -> Result<Vec<Registration>, AppError> {
        self.repo
            .set_bulk_attendance(req.event_id, req.subevent_id, req.present)
            .await
            .map_err(Into::into)
    }

    /// Assigns a competition rank to a registration.
    pub async fn assign_rank(
        &self,
        id: RegistrationId,
        req: AssignRankRequest,
    ) -> Result<Registration, AppError> {
        if req.rank < 1 {
            return Err(DomainError::InvalidRank.into());
        }

        self.repo.set_rank(id, req.rank).await.map_err(Into::into)
    }

    /// Ranked leaderboard for a sub-event.
    pub async fn leaderboard(
        &self,
        event_id: EventId,
        subevent_id: SubeventId,
    ) -> Result<Vec<Registration>, AppError> {
        self.repo
            .leaderboard(event_id, subevent_id)
            .await
            .map_err(Into::into)
    }

    /// Deletes every registration of an event. Administrative cascade used
    /// when an event itself is removed.
    pub async fn purge_event(&self, event_id: EventId) -> Result<u64, AppError> {
        let removed = self.repo.delete_for_event(event_id).await?;
        tracing::info!(event_id = %event_id, removed, "event registrations purged");
        Ok(removed)
    }
}
