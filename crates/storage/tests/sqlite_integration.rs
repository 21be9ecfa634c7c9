use chrono::Duration;
use quiz_core::model::{AnswerRecord, Attempt, AttemptId, UserId};
use quiz_core::time::fixed_now;
use storage::repository::{AttemptRepository, IdentityRepository, StorageError};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn user(raw: &str) -> UserId {
    UserId::new(raw).unwrap()
}

fn answer(is_correct: bool) -> AnswerRecord {
    AnswerRecord {
        question: "What is the capital of France?".into(),
        user_answer: if is_correct { "Paris" } else { "London" }.into(),
        correct_answer: "Paris".into(),
        is_correct,
    }
}

#[tokio::test]
async fn resume_scenario_create_update_complete() {
    let repo = connect("memdb_resume_scenario").await;
    let now = fixed_now();

    let mut attempt = Attempt::start(user("u1"), now);
    let id = repo.create(&attempt).await.unwrap();
    assert_eq!(id, AttemptId::new(1));
    attempt.assign_id(id).unwrap();

    attempt
        .record_answer(answer(true), now + Duration::seconds(3))
        .unwrap();
    repo.update(&attempt).await.unwrap();

    let latest = repo
        .latest_incomplete(&user("u1"))
        .await
        .unwrap()
        .expect("incomplete attempt");
    assert_eq!(latest.id(), Some(id));
    assert_eq!(latest.current_question_index(), 1);
    assert_eq!(latest.score(), 1);

    attempt.mark_complete(now + Duration::seconds(4)).unwrap();
    repo.update(&attempt).await.unwrap();

    assert!(repo.latest_incomplete(&user("u1")).await.unwrap().is_none());
    let history = repo.list_by_user(&user("u1")).await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].is_complete());
}

#[tokio::test]
async fn round_trip_preserves_every_field() {
    let repo = connect("memdb_round_trip").await;
    let now = fixed_now() + Duration::milliseconds(123);

    let mut attempt = Attempt::start(user("u1"), now);
    attempt.record_answer(answer(true), now).unwrap();
    attempt.record_answer(answer(false), now).unwrap();
    let id = repo.create(&attempt).await.unwrap();
    attempt.assign_id(id).unwrap();

    let stored = repo.list_by_user(&user("u1")).await.unwrap();
    assert_eq!(stored, vec![attempt.clone()]);
    assert_eq!(repo.get(id).await.unwrap(), attempt);
}

#[tokio::test]
async fn update_is_idempotent() {
    let repo = connect("memdb_idempotent").await;
    let mut attempt = Attempt::start(user("u1"), fixed_now());
    let id = repo.create(&attempt).await.unwrap();
    attempt.assign_id(id).unwrap();
    attempt.record_answer(answer(false), fixed_now()).unwrap();

    repo.update(&attempt).await.unwrap();
    let once = repo.get(id).await.unwrap();
    repo.update(&attempt).await.unwrap();
    let twice = repo.get(id).await.unwrap();

    assert_eq!(once, twice);
    assert_eq!(repo.list_by_user(&user("u1")).await.unwrap().len(), 1);
}

#[tokio::test]
async fn update_of_unknown_id_is_not_found() {
    let repo = connect("memdb_update_missing").await;
    let mut attempt = Attempt::start(user("u1"), fixed_now());
    assert!(matches!(
        repo.update(&attempt).await,
        Err(StorageError::NotFound)
    ));

    attempt.assign_id(AttemptId::new(99)).unwrap();
    assert!(matches!(
        repo.update(&attempt).await,
        Err(StorageError::NotFound)
    ));
    assert!(matches!(
        repo.get(AttemptId::new(99)).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn users_only_see_their_own_attempts() {
    let repo = connect("memdb_two_users").await;
    let now = fixed_now();
    let u1 = repo.create(&Attempt::start(user("u1"), now)).await.unwrap();
    let u2 = repo
        .create(&Attempt::start(user("u2"), now + Duration::seconds(1)))
        .await
        .unwrap();

    let latest_u1 = repo.latest_incomplete(&user("u1")).await.unwrap().unwrap();
    let latest_u2 = repo.latest_incomplete(&user("u2")).await.unwrap().unwrap();
    assert_eq!(latest_u1.id(), Some(u1));
    assert_eq!(latest_u2.id(), Some(u2));

    let listed = repo.list_by_user(&user("u1")).await.unwrap();
    assert!(listed.iter().all(|a| a.user_id() == &user("u1")));
    assert!(repo.list_by_user(&user("u3")).await.unwrap().is_empty());
}

#[tokio::test]
async fn latest_incomplete_prefers_recent_write_then_insertion() {
    let repo = connect("memdb_latest_order").await;
    let now = fixed_now();

    let mut older = Attempt::start(user("u1"), now);
    let older_id = repo.create(&older).await.unwrap();
    older.assign_id(older_id).unwrap();
    let newer_id = repo
        .create(&Attempt::start(user("u1"), now + Duration::seconds(10)))
        .await
        .unwrap();

    let latest = repo.latest_incomplete(&user("u1")).await.unwrap().unwrap();
    assert_eq!(latest.id(), Some(newer_id));

    // Writing to the older attempt makes it the most recent one.
    older
        .record_answer(answer(true), now + Duration::seconds(20))
        .unwrap();
    repo.update(&older).await.unwrap();
    let latest = repo.latest_incomplete(&user("u1")).await.unwrap().unwrap();
    assert_eq!(latest.id(), Some(older_id));

    // Equal timestamps: the later insert wins.
    let tie_id = repo
        .create(&Attempt::start(user("u1"), now + Duration::seconds(20)))
        .await
        .unwrap();
    let latest = repo.latest_incomplete(&user("u1")).await.unwrap().unwrap();
    assert_eq!(latest.id(), Some(tie_id));
}

#[tokio::test]
async fn malformed_rows_are_skipped_on_read() {
    let repo = connect("memdb_malformed").await;
    let good = repo
        .create(&Attempt::start(user("u1"), fixed_now()))
        .await
        .unwrap();

    sqlx::query(
        r"
            INSERT INTO quiz_attempts (
                user_id, timestamp, current_question_index, score, answers, is_complete
            )
            VALUES ('u1', ?1, 0, 0, 'not json', 0)
        ",
    )
    .bind(fixed_now().timestamp_millis() + 1_000)
    .execute(repo.pool())
    .await
    .unwrap();

    let listed = repo.list_by_user(&user("u1")).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id(), Some(good));

    let latest = repo.latest_incomplete(&user("u1")).await.unwrap().unwrap();
    assert_eq!(latest.id(), Some(good));
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = connect("memdb_migrate_twice").await;
    repo.migrate().await.expect("second migrate");
    let id = repo
        .create(&Attempt::start(user("u1"), fixed_now()))
        .await
        .unwrap();
    assert_eq!(id, AttemptId::new(1));
}

#[tokio::test]
async fn identity_is_persisted_once() {
    let repo = connect("memdb_identity").await;
    assert!(repo.load_user_id().await.unwrap().is_none());

    repo.save_user_id(&user("abc123")).await.unwrap();
    assert_eq!(repo.load_user_id().await.unwrap(), Some(user("abc123")));
}
