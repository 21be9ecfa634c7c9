use std::sync::Arc;

use quiz_core::model::{QuestionBank, QuizSettings};
use quiz_core::time::fixed_clock;
use services::{AppServices, AttemptHistoryService, AttemptSummary, QuizLoopService};
use storage::repository::{AttemptRepository, InMemoryRepository};

#[tokio::test]
async fn full_quiz_persists_and_completes() {
    let repo = InMemoryRepository::new();
    let bank = Arc::new(QuestionBank::sample());
    let loop_svc = QuizLoopService::new(fixed_clock(), Arc::clone(&bank), Arc::new(repo.clone()));
    let user = quiz_core::model::UserId::new("u1").unwrap();

    let mut session = loop_svc.start_or_resume(&user).await.session;
    let mut last = None;
    while let Some(question) = session.current_question() {
        let choice = question.correct_option_id().to_owned();
        last = Some(loop_svc.answer_current(&mut session, &choice).await.unwrap());
    }

    let last = last.expect("answered at least once");
    assert!(last.is_complete);
    assert!(last.persisted);
    assert_eq!(last.progress.score, 3);

    let id = last.attempt_id.unwrap();
    let stored = repo.get(id).await.unwrap();
    assert!(stored.is_complete());
    assert_eq!(stored.answers().len(), bank.len());
    assert!(repo.latest_incomplete(&user).await.unwrap().is_none());

    // Reopened from history for review.
    let reviewed = loop_svc.open_attempt(&user, id).await.unwrap();
    assert!(reviewed.is_complete());
    assert!(reviewed.current_question().is_none());
    let summary = AttemptSummary::from_attempt(reviewed.attempt(), reviewed.total_questions());
    assert_eq!(summary.percent, 100);
    assert_eq!(summary.answers.len(), bank.len());

    let history = AttemptHistoryService::new(Arc::new(repo));
    let items = history.list(&user, bank.len()).await.unwrap();
    assert_eq!(items.len(), 1);
    assert!(items[0].is_complete);
}

#[tokio::test]
async fn older_attempt_opened_from_history_continues_in_place() {
    let services = AppServices::in_memory(fixed_clock(), QuestionBank::sample(), QuizSettings::default())
        .await
        .unwrap();
    let user = services.user_id().clone();
    let quiz = services.quiz_loop();

    let mut old = quiz.start_new(&user);
    let old_id = quiz
        .answer_current(&mut old, "2")
        .await
        .unwrap()
        .attempt_id
        .unwrap();
    let mut newer = quiz.start_new(&user);
    quiz.answer_current(&mut newer, "1").await.unwrap();

    let mut reopened = quiz.open_attempt(&user, old_id).await.unwrap();
    assert!(!reopened.is_complete());
    assert_eq!(reopened.current_index(), 1);

    let result = quiz.answer_current(&mut reopened, "2").await.unwrap();
    assert_eq!(result.attempt_id, Some(old_id));
    assert!(result.persisted);

    let items = services.history().list(&user, 3).await.unwrap();
    assert_eq!(items.len(), 2);
    let old_item = items.iter().find(|item| item.id == old_id).unwrap();
    assert_eq!(old_item.answered, 2);
    assert_eq!(old_item.score, 2);
}

#[tokio::test]
async fn interrupted_attempt_is_resumed_after_restart() {
    let url = "sqlite:file:memdb_services_resume?mode=memory&cache=shared";
    let settings = QuizSettings::default();

    let first = AppServices::new_sqlite(url, fixed_clock(), QuestionBank::sample(), settings)
        .await
        .expect("open");
    let user = first.user_id().clone();
    let quiz = first.quiz_loop();
    let mut session = quiz.start_or_resume(&user).await.session;
    quiz.answer_current(&mut session, "2").await.unwrap();
    let timed_out = quiz.time_out(&mut session, 1).await.unwrap().unwrap();
    assert!(timed_out.persisted);

    // Second process over the same store: same user, same attempt.
    let second = AppServices::new_sqlite(url, fixed_clock(), QuestionBank::sample(), settings)
        .await
        .expect("reopen");
    assert_eq!(second.user_id(), &user);

    let start = second.quiz_loop().start_or_resume(&user).await;
    assert!(start.resumed);
    assert_eq!(start.session.attempt_id(), session.attempt_id());
    assert_eq!(start.session.current_index(), 2);
    assert_eq!(start.session.attempt().score(), 1);

    let items = second.history().list(&user, 3).await.unwrap();
    assert_eq!(items.len(), 1);
    assert!(!items[0].is_complete);
    assert_eq!(items[0].answered, 2);

    drop(first);
}

#[tokio::test]
async fn starting_new_attempt_hides_older_incomplete_one() {
    let services = AppServices::in_memory(fixed_clock(), QuestionBank::sample(), QuizSettings::default())
        .await
        .unwrap();
    let user = services.user_id().clone();
    let quiz = services.quiz_loop();

    let mut old = quiz.start_new(&user);
    let old_id = quiz.answer_current(&mut old, "1").await.unwrap().attempt_id;

    let mut fresh = quiz.start_new(&user);
    let fresh_id = quiz.answer_current(&mut fresh, "2").await.unwrap().attempt_id;
    assert_ne!(old_id, fresh_id);

    let resumed = quiz.start_or_resume(&user).await;
    assert!(resumed.resumed);
    assert_eq!(resumed.session.attempt_id(), fresh_id);

    // History still holds both.
    let items = services.history().list(&user, 3).await.unwrap();
    assert_eq!(items.len(), 2);
}

#[tokio::test]
async fn unavailable_store_degrades_to_memory() {
    let services = AppServices::bootstrap(
        "sqlite:///definitely/missing/dir/quiz.sqlite3",
        fixed_clock(),
        QuestionBank::sample(),
        QuizSettings::default(),
    )
    .await
    .expect("in-memory fallback");

    assert!(services.is_degraded());
    assert!(services.degraded_reason().is_some());

    let user = services.user_id().clone();
    let quiz = services.quiz_loop();
    let mut session = quiz.start_new(&user);
    let result = quiz.answer_current(&mut session, "2").await.unwrap();
    assert!(result.persisted);
}
