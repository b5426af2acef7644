//! RegistrationService unit tests.

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use campus_gateway::MockGateway;
    use campus_types::{
        ApiKey, ApiKeyId, AppError, AssignRankRequest, BulkAttendanceRequest,
        CancelCheckoutRequest, CheckoutAudit, CheckoutStage, ConfirmPaymentRequest,
        CreateOrderRequest, Currency, DomainError, EventId, Registration, RegistrationId,
        RegistrationKey, RegistrationRepository, RepoError, StudentId, SubeventId,
    };

    use crate::RegistrationService;

    /// Simple in-memory repository for testing the service layer.
    ///
    /// One mutex guards the registration set, so concurrent `insert_paid`
    /// calls serialize exactly as the database transaction does.
    pub struct MockRepo {
        registrations: Mutex<Vec<Registration>>,
        audits: Mutex<Vec<CheckoutAudit>>,
        api_keys: Mutex<Vec<ApiKey>>,
    }

    impl MockRepo {
        pub fn new() -> Self {
            Self {
                registrations: Mutex::new(Vec::new()),
                audits: Mutex::new(Vec::new()),
                api_keys: Mutex::new(Vec::new()),
            }
        }

        fn audit_stages(&self, order_id: &str) -> Vec<CheckoutStage> {
            self.audits
                .lock()
                .unwrap()
                .iter()
                .filter(|a| a.order_id == order_id)
                .map(|a| a.stage)
                .collect()
        }
    }

    #[async_trait]
    impl RegistrationRepository for MockRepo {
        async fn find_paid(
            &self,
            key: &RegistrationKey,
        ) -> Result<Option<Registration>, RepoError> {
            Ok(self
                .registrations
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.is_paid() && r.key() == *key)
                .cloned())
        }

        async fn insert_paid(
            &self,
            registration: Registration,
        ) -> Result<Registration, RepoError> {
            let mut regs = self.registrations.lock().unwrap();
            if regs
                .iter()
                .any(|r| r.is_paid() && r.key() == registration.key())
            {
                return Err(RepoError::DuplicatePaid(registration.key()));
            }
            self.audits.lock().unwrap().push(CheckoutAudit::new(
                &registration.gateway_order_id,
                CheckoutStage::Confirmed,
                Some(registration.gateway_payment_id.clone()),
            ));
            regs.push(registration.clone());
            Ok(registration)
        }

        async fn record_checkout(&self, audit: CheckoutAudit) -> Result<(), RepoError> {
            self.audits.lock().unwrap().push(audit);
            Ok(())
        }

        async fn list_checkout_audit(
            &self,
            order_id: &str,
        ) -> Result<Vec<CheckoutAudit>, RepoError> {
            Ok(self
                .audits
                .lock()
                .unwrap()
                .iter()
                .filter(|a| a.order_id == order_id)
                .cloned()
                .collect())
        }

        async fn get_registration(
            &self,
            id: RegistrationId,
        ) -> Result<Option<Registration>, RepoError> {
            Ok(self
                .registrations
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.id == id)
                .cloned())
        }

        async fn list_for_student(
            &self,
            student_id: StudentId,
        ) -> Result<Vec<Registration>, RepoError> {
            Ok(self
                .registrations
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.student_id == student_id)
                .cloned()
                .collect())
        }

        async fn list_for_event(
            &self,
            event_id: EventId,
            subevent_id: Option<SubeventId>,
        ) -> Result<Vec<Registration>, RepoError> {
            Ok(self
                .registrations
                .lock()
                .unwrap()
                .iter()
                .filter(|r| {
                    r.event_id == event_id
                        && subevent_id.is_none_or(|s| r.subevent_id == s)
                })
                .cloned()
                .collect())
        }

        async fn count_paid(
            &self,
            event_id: EventId,
            subevent_id: Option<SubeventId>,
        ) -> Result<i64, RepoError> {
            Ok(self
                .registrations
                .lock()
                .unwrap()
                .iter()
                .filter(|r| {
                    r.is_paid()
                        && r.event_id == event_id
                        && subevent_id.is_none_or(|s| r.subevent_id == s)
                })
                .count() as i64)
        }

        async fn set_attendance(
            &self,
            id: RegistrationId,
            present: bool,
        ) -> Result<Registration, RepoError> {
            let mut regs = self.registrations.lock().unwrap();
            let reg = regs
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or(RepoError::NotFound)?;
            if !reg.is_paid() {
                return Err(RepoError::Domain(DomainError::UnpaidRegistration(id)));
            }
            reg.attendance = present;
            Ok(reg.clone())
        }

        async fn set_bulk_attendance(
            &self,
            event_id: EventId,
            subevent_id: SubeventId,
            present: bool,
        ) -> Result<Vec<Registration>, RepoError> {
            let mut regs = self.registrations.lock().unwrap();
            let mut updated = Vec::new();
            for reg in regs.iter_mut() {
                if reg.is_paid() && reg.event_id == event_id && reg.subevent_id == subevent_id {
                    reg.attendance = present;
                    updated.push(reg.clone());
                }
            }
            Ok(updated)
        }

        async fn set_rank(
            &self,
            id: RegistrationId,
            rank: i32,
        ) -> Result<Registration, RepoError> {
            let mut regs = self.registrations.lock().unwrap();
            let reg = regs
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or(RepoError::NotFound)?;
            if !reg.is_paid() {
                return Err(RepoError::Domain(DomainError::UnpaidRegistration(id)));
            }
            reg.rank = Some(rank);
            Ok(reg.clone())
        }

        async fn leaderboard(
            &self,
            event_id: EventId,
            subevent_id: SubeventId,
        ) -> Result<Vec<Registration>, RepoError> {
            let mut ranked: Vec<Registration> = self
                .registrations
                .lock()
                .unwrap()
                .iter()
                .filter(|r| {
                    r.is_paid()
                        && r.event_id == event_id
                        && r.subevent_id == subevent_id
                        && r.rank.is_some()
                })
                .cloned()
                .collect();
            ranked.sort_by_key(|r| r.rank);
            Ok(ranked)
        }

        async fn delete_for_event(&self, event_id: EventId) -> Result<u64, RepoError> {
            let mut regs = self.registrations.lock().unwrap();
            let before = regs.len();
            regs.retain(|r| r.event_id != event_id);
            Ok((before - regs.len()) as u64)
        }

        async fn verify_api_key_hash(
            &self,
            key_hash: &str,
        ) -> Result<Option<ApiKey>, RepoError> {
            Ok(self
                .api_keys
                .lock()
                .unwrap()
                .iter()
                .find(|k| k.is_active && k.key_hash == key_hash)
                .cloned())
        }

        async fn create_api_key(&self, name: &str) -> Result<(ApiKey, String), RepoError> {
            let raw = format!("ck_test_{}", name);
            let key = ApiKey::new(name.to_string(), format!("hash_{}", raw));
            self.api_keys.lock().unwrap().push(key.clone());
            Ok((key, raw))
        }

        async fn count_api_keys(&self) -> Result<i64, RepoError> {
            Ok(self.api_keys.lock().unwrap().len() as i64)
        }

        async fn list_api_keys(&self) -> Result<Vec<ApiKey>, RepoError> {
            Ok(self.api_keys.lock().unwrap().clone())
        }

        async fn delete_api_key(&self, id: ApiKeyId) -> Result<bool, RepoError> {
            let mut keys = self.api_keys.lock().unwrap();
            match keys.iter_mut().find(|k| k.id == id && k.is_active) {
                Some(key) => {
                    key.is_active = false;
                    Ok(true)
                }
                None => Ok(false),
            }
        }
    }

    fn service() -> RegistrationService<MockRepo, MockGateway> {
        RegistrationService::new(MockRepo::new(), MockGateway::new("k1", "secret"))
    }

    fn order_request(student: i64) -> CreateOrderRequest {
        CreateOrderRequest {
            student_id: StudentId::new(student),
            event_id: EventId::new(7),
            subevent_id: SubeventId::new(3),
            student_name: format!("Student {}", student),
            student_email: format!("s{}@college.edu", student),
            fee: 50000,
            currency: Currency::INR,
        }
    }

    /// Runs a full checkout for a student and returns the confirm request.
    async fn checkout(
        svc: &RegistrationService<MockRepo, MockGateway>,
        student: i64,
        payment_id: &str,
    ) -> ConfirmPaymentRequest {
        let order = svc.create_order(order_request(student)).await.unwrap();
        let signature = MockGateway::new("k1", "secret").sign(&order.order_id, payment_id);
        ConfirmPaymentRequest {
            intent: order_request(student),
            order_id: order.order_id,
            payment_id: payment_id.to_string(),
            signature,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Checkout / reconciliation
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_create_order_returns_checkout_parameters() {
        let svc = service();

        let resp = svc.create_order(order_request(42)).await.unwrap();

        assert_eq!(resp.order_id, "order_mock_1");
        assert_eq!(resp.key, "k1");
        assert_eq!(resp.amount, 50000);
        assert_eq!(resp.currency, Currency::INR);

        let stages = svc.repo().audit_stages(&resp.order_id);
        assert_eq!(stages, vec![CheckoutStage::OrderCreated]);
    }

    #[tokio::test]
    async fn test_create_order_rejects_invalid_fee() {
        let svc = service();
        let req = CreateOrderRequest {
            fee: 0,
            ..order_request(42)
        };

        let result = svc.create_order(req).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_order_rejects_blank_name() {
        let svc = service();
        let req = CreateOrderRequest {
            student_name: "   ".into(),
            ..order_request(42)
        };

        let result = svc.create_order(req).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_order_rejects_already_registered() {
        let svc = service();
        let confirm = checkout(&svc, 42, "pay_1").await;
        svc.confirm_payment(confirm).await.unwrap();

        let result = svc.create_order(order_request(42)).await;

        assert!(matches!(result, Err(AppError::AlreadyRegistered(_))));

        // The gateway was never asked for a second order: the next order a
        // different student creates still gets the next sequential id.
        let next = svc.create_order(order_request(99)).await.unwrap();
        assert_eq!(next.order_id, "order_mock_2");
    }

    #[tokio::test]
    async fn test_create_order_gateway_down_persists_nothing() {
        let svc =
            RegistrationService::new(MockRepo::new(), MockGateway::down("k1", "secret"));

        let result = svc.create_order(order_request(42)).await;

        assert!(matches!(result, Err(AppError::GatewayUnavailable(_))));
        assert!(svc.repo().audits.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_confirm_payment_commits_registration() {
        let svc = service();
        let confirm = checkout(&svc, 42, "pay_1").await;
        let order_id = confirm.order_id.clone();

        let reg = svc.confirm_payment(confirm).await.unwrap();

        assert!(reg.is_paid());
        assert_eq!(reg.gateway_order_id, order_id);
        assert_eq!(reg.gateway_payment_id, "pay_1");

        let stages = svc.repo().audit_stages(&order_id);
        assert_eq!(
            stages,
            vec![CheckoutStage::OrderCreated, CheckoutStage::Confirmed]
        );
    }

    #[tokio::test]
    async fn test_confirm_payment_rejects_tampered_signature() {
        let svc = service();
        let mut confirm = checkout(&svc, 42, "pay_1").await;
        let order_id = confirm.order_id.clone();
        // Signature computed for a different payment.
        confirm.payment_id = "pay_other".into();

        let result = svc.confirm_payment(confirm).await;

        assert!(matches!(result, Err(AppError::InvalidSignature)));
        assert!(svc.repo().registrations.lock().unwrap().is_empty());

        let stages = svc.repo().audit_stages(&order_id);
        assert_eq!(
            stages,
            vec![CheckoutStage::OrderCreated, CheckoutStage::Rejected]
        );
    }

    #[tokio::test]
    async fn test_confirm_payment_duplicate_rejected() {
        let svc = service();
        let first = checkout(&svc, 42, "pay_1").await;
        svc.confirm_payment(first).await.unwrap();

        // Second checkout for the same triple; confirmation is validly
        // signed, yet the triple already holds a paid registration.
        let order_id = "order_mock_2".to_string();
        let signature = MockGateway::new("k1", "secret").sign(&order_id, "pay_2");
        let second = ConfirmPaymentRequest {
            intent: order_request(42),
            order_id,
            payment_id: "pay_2".into(),
            signature,
        };

        let result = svc.confirm_payment(second).await;

        assert!(matches!(result, Err(AppError::AlreadyRegistered(_))));
        assert_eq!(svc.repo().registrations.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_confirms_commit_exactly_once() {
        let svc = service();
        let first = checkout(&svc, 42, "pay_a").await;
        let mut second = first.clone();
        second.payment_id = "pay_b".into();
        second.signature =
            MockGateway::new("k1", "secret").sign(&second.order_id, "pay_b");

        let (a, b) = tokio::join!(svc.confirm_payment(first), svc.confirm_payment(second));

        let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(successes, 1);
        assert_eq!(svc.repo().registrations.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_checkout_records_abandonment() {
        let svc = service();
        let order = svc.create_order(order_request(42)).await.unwrap();

        svc.cancel_checkout(CancelCheckoutRequest {
            order_id: order.order_id.clone(),
        })
        .await
        .unwrap();

        let stages = svc.repo().audit_stages(&order.order_id);
        assert_eq!(
            stages,
            vec![CheckoutStage::OrderCreated, CheckoutStage::Abandoned]
        );
        assert!(svc.repo().registrations.lock().unwrap().is_empty());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Admin operations
    // ─────────────────────────────────────────────────────────────────────────

    async fn committed(svc: &RegistrationService<MockRepo, MockGateway>, student: i64) -> Registration {
        let confirm = checkout(svc, student, &format!("pay_{}", student)).await;
        svc.confirm_payment(confirm).await.unwrap()
    }

    #[tokio::test]
    async fn test_attendance_and_count() {
        let svc = service();
        let reg = committed(&svc, 42).await;
        committed(&svc, 43).await;

        let updated = svc.mark_attendance(reg.id, true).await.unwrap();
        assert!(updated.attendance);

        let count = svc
            .participant_count(EventId::new(7), Some(SubeventId::new(3)))
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_bulk_attendance() {
        let svc = service();
        committed(&svc, 42).await;
        committed(&svc, 43).await;

        let updated = svc
            .mark_bulk_attendance(BulkAttendanceRequest {
                event_id: EventId::new(7),
                subevent_id: SubeventId::new(3),
                present: true,
            })
            .await
            .unwrap();

        assert_eq!(updated.len(), 2);
        assert!(updated.iter().all(|r| r.attendance));
    }

    #[tokio::test]
    async fn test_assign_rank_rejects_zero() {
        let svc = service();
        let reg = committed(&svc, 42).await;

        let result = svc
            .assign_rank(reg.id, AssignRankRequest { rank: 0 })
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_leaderboard_orders_by_rank() {
        let svc = service();
        let first = committed(&svc, 42).await;
        let second = committed(&svc, 43).await;

        svc.assign_rank(second.id, AssignRankRequest { rank: 1 })
            .await
            .unwrap();
        svc.assign_rank(first.id, AssignRankRequest { rank: 2 })
            .await
            .unwrap();

        let board = svc
            .leaderboard(EventId::new(7), SubeventId::new(3))
            .await
            .unwrap();

        assert_eq!(board.len(), 2);
        assert_eq!(board[0].id, second.id);
        assert_eq!(board[1].id, first.id);
    }

    #[tokio::test]
    async fn test_purge_event() {
        let svc = service();
        committed(&svc, 42).await;
        committed(&svc, 43).await;

        let removed = svc.purge_event(EventId::new(7)).await.unwrap();

        assert_eq!(removed, 2);
        let remaining = svc
            .event_registrations(EventId::new(7), None)
            .await
            .unwrap();
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn test_student_registrations_filtered() {
        let svc = service();
        committed(&svc, 42).await;
        committed(&svc, 43).await;

        let mine = svc
            .student_registrations(StudentId::new(42))
            .await
            .unwrap();

        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].student_id, StudentId::new(42));
    }
}
