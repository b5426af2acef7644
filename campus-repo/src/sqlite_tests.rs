//! SQLite repository integration tests.

#[cfg(test)]
mod tests {
    use campus_types::{
        CheckoutAudit, CheckoutStage, Currency, DomainError, EventId, Money, Registration,
        RegistrationId, RegistrationIntent, RegistrationKey, RegistrationRepository, RepoError,
        StudentId, SubeventId,
    };

    use crate::SqliteRepo;

    async fn setup_repo() -> SqliteRepo {
        SqliteRepo::new("sqlite::memory:").await.unwrap()
    }

    fn key(student: i64, event: i64, subevent: i64) -> RegistrationKey {
        RegistrationKey {
            student_id: StudentId::new(student),
            event_id: EventId::new(event),
            subevent_id: SubeventId::new(subevent),
        }
    }

    fn paid_registration(student: i64, event: i64, subevent: i64) -> Registration {
        let fee = Money::new(50000, Currency::INR).unwrap();
        let intent = RegistrationIntent::new(
            key(student, event, subevent),
            format!("Student {}", student),
            format!("s{}@college.edu", student),
            fee,
        )
        .unwrap();

        Registration::paid(
            intent,
            format!("order_{}_{}_{}", student, event, subevent),
            format!("pay_{}_{}_{}", student, event, subevent),
        )
    }

    /// Plants a non-paid row directly; the public API only ever writes paid
    /// rows, but the schema tolerates legacy pending/failed records.
    async fn insert_failed_row(repo: &SqliteRepo, student: i64, event: i64, subevent: i64) -> RegistrationId {
        let id = RegistrationId::new();
        sqlx::query(
            r#"INSERT INTO registrations
                   (id, student_id, event_id, subevent_id, student_name, student_email,
                    fee, currency, payment_status, gateway_order_id, gateway_payment_id,
                    attendance, rank, registration_date)
               VALUES (?, ?, ?, ?, 'Ghost', 'ghost@college.edu',
                       50000, 'INR', 'failed', 'order_ghost', '', 0, NULL, ?)"#,
        )
        .bind(id.to_string())
        .bind(student)
        .bind(event)
        .bind(subevent)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(repo.pool())
        .await
        .unwrap();
        id
    }

    #[tokio::test]
    async fn test_insert_paid_then_find() {
        let repo = setup_repo().await;

        let inserted = repo.insert_paid(paid_registration(42, 7, 3)).await.unwrap();
        let found = repo.find_paid(&key(42, 7, 3)).await.unwrap().unwrap();

        assert_eq!(found.id, inserted.id);
        assert_eq!(found.gateway_order_id, "order_42_7_3");
        assert!(found.is_paid());
        assert!(!found.attendance);
        assert!(found.rank.is_none());
    }

    #[tokio::test]
    async fn test_find_paid_empty() {
        let repo = setup_repo().await;

        let found = repo.find_paid(&key(42, 7, 3)).await.unwrap();

        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_paid_insert_rejected() {
        let repo = setup_repo().await;

        repo.insert_paid(paid_registration(42, 7, 3)).await.unwrap();
        let result = repo.insert_paid(paid_registration(42, 7, 3)).await;

        assert!(matches!(result, Err(RepoError::DuplicatePaid(k)) if k == key(42, 7, 3)));

        // No second row was committed.
        let rows = repo
            .list_for_event(EventId::new(7), Some(SubeventId::new(3)))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_duplicate_insert_loses_cleanly() {
        // The interleaving is timing-dependent, so run the race a few times.
        for _ in 0..20 {
            let repo = setup_repo().await;

            let (a, b) = tokio::join!(
                repo.insert_paid(paid_registration(42, 7, 3)),
                repo.insert_paid(paid_registration(42, 7, 3)),
            );

            let results = [a, b];
            assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
            let loser = results.iter().find(|r| r.is_err()).unwrap();
            assert!(
                matches!(loser, Err(RepoError::DuplicatePaid(k)) if *k == key(42, 7, 3)),
                "loser got {loser:?}"
            );

            assert_eq!(
                repo.count_paid(EventId::new(7), Some(SubeventId::new(3)))
                    .await
                    .unwrap(),
                1
            );
        }
    }

    #[tokio::test]
    async fn test_failed_row_does_not_block_paid_insert() {
        let repo = setup_repo().await;

        insert_failed_row(&repo, 42, 7, 3).await;
        let result = repo.insert_paid(paid_registration(42, 7, 3)).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_other_triples_are_independent() {
        let repo = setup_repo().await;

        repo.insert_paid(paid_registration(42, 7, 3)).await.unwrap();
        repo.insert_paid(paid_registration(42, 7, 4)).await.unwrap();
        repo.insert_paid(paid_registration(43, 7, 3)).await.unwrap();

        assert_eq!(repo.count_paid(EventId::new(7), None).await.unwrap(), 3);
        assert_eq!(
            repo.count_paid(EventId::new(7), Some(SubeventId::new(3)))
                .await
                .unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn test_confirmed_audit_written_with_insert() {
        let repo = setup_repo().await;

        repo.insert_paid(paid_registration(42, 7, 3)).await.unwrap();
        let trail = repo.list_checkout_audit("order_42_7_3").await.unwrap();

        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].stage, CheckoutStage::Confirmed);
        assert_eq!(trail[0].detail.as_deref(), Some("pay_42_7_3"));
    }

    #[tokio::test]
    async fn test_checkout_audit_trail() {
        let repo = setup_repo().await;

        repo.record_checkout(CheckoutAudit::new(
            "order_abc",
            CheckoutStage::OrderCreated,
            None,
        ))
        .await
        .unwrap();
        repo.record_checkout(CheckoutAudit::new(
            "order_abc",
            CheckoutStage::Abandoned,
            Some("checkout dismissed".into()),
        ))
        .await
        .unwrap();

        let trail = repo.list_checkout_audit("order_abc").await.unwrap();

        assert_eq!(trail.len(), 2);
        assert_eq!(trail[0].stage, CheckoutStage::OrderCreated);
        assert_eq!(trail[1].stage, CheckoutStage::Abandoned);
    }

    #[tokio::test]
    async fn test_list_for_student() {
        let repo = setup_repo().await;

        repo.insert_paid(paid_registration(42, 7, 3)).await.unwrap();
        repo.insert_paid(paid_registration(42, 8, 1)).await.unwrap();
        repo.insert_paid(paid_registration(43, 7, 3)).await.unwrap();

        let mine = repo.list_for_student(StudentId::new(42)).await.unwrap();

        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|r| r.student_id == StudentId::new(42)));
    }

    #[tokio::test]
    async fn test_set_attendance_on_paid() {
        let repo = setup_repo().await;

        let reg = repo.insert_paid(paid_registration(42, 7, 3)).await.unwrap();
        let updated = repo.set_attendance(reg.id, true).await.unwrap();

        assert!(updated.attendance);

        let fetched = repo.get_registration(reg.id).await.unwrap().unwrap();
        assert!(fetched.attendance);
    }

    #[tokio::test]
    async fn test_set_attendance_on_unpaid_fails() {
        let repo = setup_repo().await;

        let id = insert_failed_row(&repo, 42, 7, 3).await;
        let result = repo.set_attendance(id, true).await;

        assert!(matches!(
            result,
            Err(RepoError::Domain(DomainError::UnpaidRegistration(_)))
        ));
    }

    #[tokio::test]
    async fn test_set_attendance_not_found() {
        let repo = setup_repo().await;

        let result = repo.set_attendance(RegistrationId::new(), true).await;

        assert!(matches!(result, Err(RepoError::NotFound)));
    }

    #[tokio::test]
    async fn test_bulk_attendance_only_touches_paid() {
        let repo = setup_repo().await;

        repo.insert_paid(paid_registration(42, 7, 3)).await.unwrap();
        repo.insert_paid(paid_registration(43, 7, 3)).await.unwrap();
        let ghost = insert_failed_row(&repo, 44, 7, 3).await;

        let updated = repo
            .set_bulk_attendance(EventId::new(7), SubeventId::new(3), true)
            .await
            .unwrap();

        assert_eq!(updated.len(), 2);
        assert!(updated.iter().all(|r| r.attendance));

        let ghost_row = repo.get_registration(ghost).await.unwrap().unwrap();
        assert!(!ghost_row.attendance);
    }

    #[tokio::test]
    async fn test_rank_and_leaderboard_ordering() {
        let repo = setup_repo().await;

        let first = repo.insert_paid(paid_registration(42, 7, 3)).await.unwrap();
        let second = repo.insert_paid(paid_registration(43, 7, 3)).await.unwrap();
        // Unranked paid registration stays off the leaderboard.
        repo.insert_paid(paid_registration(44, 7, 3)).await.unwrap();

        repo.set_rank(second.id, 1).await.unwrap();
        repo.set_rank(first.id, 2).await.unwrap();

        let board = repo
            .leaderboard(EventId::new(7), SubeventId::new(3))
            .await
            .unwrap();

        assert_eq!(board.len(), 2);
        assert_eq!(board[0].id, second.id);
        assert_eq!(board[0].rank, Some(1));
        assert_eq!(board[1].id, first.id);
    }

    #[tokio::test]
    async fn test_delete_for_event_cascade() {
        let repo = setup_repo().await;

        repo.insert_paid(paid_registration(42, 7, 3)).await.unwrap();
        repo.insert_paid(paid_registration(43, 7, 4)).await.unwrap();
        repo.insert_paid(paid_registration(42, 8, 1)).await.unwrap();

        let removed = repo.delete_for_event(EventId::new(7)).await.unwrap();

        assert_eq!(removed, 2);
        assert_eq!(repo.count_paid(EventId::new(7), None).await.unwrap(), 0);
        assert_eq!(repo.count_paid(EventId::new(8), None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_api_key_lifecycle() {
        let repo = setup_repo().await;

        assert_eq!(repo.count_api_keys().await.unwrap(), 0);

        let (created, raw_key) = repo.create_api_key("admin").await.unwrap();
        assert!(raw_key.starts_with("ck_"));
        assert_eq!(repo.count_api_keys().await.unwrap(), 1);

        let hash = crate::security::hash_api_key(&raw_key);
        let verified = repo.verify_api_key_hash(&hash).await.unwrap().unwrap();
        assert_eq!(verified.id, created.id);

        assert!(repo.delete_api_key(created.id).await.unwrap());
        assert!(repo.verify_api_key_hash(&hash).await.unwrap().is_none());
        assert_eq!(repo.count_api_keys().await.unwrap(), 0);
    }
}
