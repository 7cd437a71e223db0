//! Reconciliation flows against the recording fake service.

use std::sync::atomic::Ordering;

use glossa_document::NodeKind;
use glossa_editor::{Command, Point, Selection};
use glossa_sync::fake::{Call, RecordingService};
use glossa_sync::{DocumentMeta, DocumentSession};

fn meta() -> DocumentMeta {
    DocumentMeta {
        document_id: "d1".to_string(),
        language_id: "es".to_string(),
        title: "práctica".to_string(),
    }
}

fn first_paragraph(session: &DocumentSession) -> glossa_document::NodeKey {
    let tree = session.editor().tree();
    tree.first_child(tree.root()).unwrap()
}

/// Insert a word into the (empty) first paragraph via the command path.
fn insert_word(session: &mut DocumentSession, word: &str, database_id: Option<&str>) {
    let p = first_paragraph(session);
    let index = session.editor().tree().children(p).len();
    session.set_selection(Some(Selection::Caret(Point::new(p, index))));
    let outcome = session
        .apply(&Command::InsertWord {
            word: word.to_string(),
            translations: vec!["house".to_string()],
            database_id: database_id.map(str::to_string),
            target: None,
        })
        .unwrap();
    assert_eq!(outcome, glossa_editor::Outcome::Handled);
}

fn wrap_first_paragraph_in_sentence(session: &mut DocumentSession) {
    let p = first_paragraph(session);
    session.set_selection(Some(Selection::caret(p, 0)));
    let outcome = session.apply(&Command::ToggleSentence).unwrap();
    assert_eq!(outcome, glossa_editor::Outcome::Handled);
}

fn insert_grammar_point(session: &mut DocumentSession, title_text: &str) {
    let tree = session.editor().tree();
    let last = tree.last_child(tree.root()).unwrap();
    session.set_selection(Some(Selection::caret(last, 0)));
    session.apply(&Command::InsertGrammarPoint).unwrap();

    // Type the heading into the fresh title node.
    let container = session
        .editor()
        .tree()
        .keys_of_kind(NodeKind::GrammarPointContainer)
        .pop()
        .unwrap();
    let title = session.editor().tree().children(container)[0];
    session.set_selection(Some(Selection::caret(title, 0)));
    session
        .apply(&Command::InsertWord {
            word: title_text.to_string(),
            translations: vec![],
            database_id: None,
            target: None,
        })
        .unwrap();
}

#[tokio::test]
async fn test_reconcile_issues_exact_upserts_and_cleans_index() {
    let mut session = DocumentSession::new(meta());
    let service = RecordingService::new();

    insert_word(&mut session, "casa", None);
    wrap_first_paragraph_in_sentence(&mut session);
    // Index: one dirty word, one dirty sentence.
    assert_eq!(session.index().dirty_count(), 2);

    let report = session.reconcile(&service).await;

    assert!(report.is_complete_success());
    assert_eq!(report.upserted, 2);
    assert_eq!(report.deleted, 0);
    assert!(session.index().is_fully_clean());

    let calls = service.calls().await;
    let word_upserts = calls
        .iter()
        .filter(|c| matches!(c, Call::WordUpsert(_)))
        .count();
    let sentence_upserts = calls
        .iter()
        .filter(|c| matches!(c, Call::SentenceUpsert(_)))
        .count();
    assert_eq!(word_upserts, 1);
    assert_eq!(sentence_upserts, 1);

    // A second cycle with nothing dirty issues no calls at all.
    let report = session.reconcile(&service).await;
    assert_eq!(report.upserted, 0);
    assert_eq!(service.calls().await.len(), calls.len());
}

#[tokio::test]
async fn test_returned_ids_are_written_back_to_the_tree() {
    let mut session = DocumentSession::new(meta());
    let service = RecordingService::new();

    insert_word(&mut session, "casa", None);
    session.reconcile(&service).await;

    let tree = session.editor().tree();
    let word = tree.keys_of_kind(NodeKind::Word)[0];
    let id = tree.node(word).unwrap().database_id().map(str::to_string);
    assert!(id.is_some(), "reconcile should attach the returned id");

    // Edit the word: the next upsert reuses the same persisted id.
    session
        .apply(&Command::SetWordTranslations {
            key: word,
            translations: vec!["home".to_string()],
        })
        .unwrap();
    assert_eq!(session.index().dirty_count(), 1);
    session.reconcile(&service).await;

    let calls = service.calls().await;
    let last_word_upsert = calls
        .iter()
        .rev()
        .find_map(|c| match c {
            Call::WordUpsert(request) => Some(request.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(last_word_upsert.id, id);
}

#[tokio::test]
async fn test_sentence_upsert_carries_word_ids_saved_in_same_cycle() {
    let mut session = DocumentSession::new(meta());
    let service = RecordingService::new();

    insert_word(&mut session, "casa", None);
    wrap_first_paragraph_in_sentence(&mut session);
    session.reconcile(&service).await;

    let calls = service.calls().await;
    let sentence = calls
        .iter()
        .find_map(|c| match c {
            Call::SentenceUpsert(request) => Some(request.clone()),
            _ => None,
        })
        .unwrap();
    let word_record_id = session
        .editor()
        .tree()
        .keys_of_kind(NodeKind::Word)
        .first()
        .and_then(|&k| {
            session
                .editor()
                .tree()
                .node(k)
                .unwrap()
                .database_id()
                .map(str::to_string)
        })
        .unwrap();
    assert_eq!(sentence.containing_words, vec![word_record_id]);
}

#[tokio::test]
async fn test_removing_word_from_sentence_updates_remote_with_same_id() {
    let mut session = DocumentSession::new(meta());
    let service = RecordingService::new();

    // Sentence containing one word already persisted as w1.
    insert_word(&mut session, "casa", Some("w1"));
    wrap_first_paragraph_in_sentence(&mut session);
    session.reconcile(&service).await;

    let first_sentence_upsert = service
        .calls()
        .await
        .iter()
        .find_map(|c| match c {
            Call::SentenceUpsert(request) => Some(request.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(first_sentence_upsert.containing_words, vec!["w1".to_string()]);
    let sentence_id = {
        let tree = session.editor().tree();
        let sentence = tree.keys_of_kind(NodeKind::Sentence)[0];
        tree.node(sentence).unwrap().database_id().unwrap().to_string()
    };

    // Remove the word, nothing else, and reconcile again.
    let word = session.editor().tree().keys_of_kind(NodeKind::Word)[0];
    session.set_selection(Some(Selection::Node(word)));
    session.apply(&Command::Backspace).unwrap();
    let report = session.reconcile(&service).await;
    assert!(report.is_complete_success());

    let calls = service.calls().await;
    let last_sentence_upsert = calls
        .iter()
        .rev()
        .find_map(|c| match c {
            Call::SentenceUpsert(request) => Some(request.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(last_sentence_upsert.id, Some(sentence_id));
    assert!(last_sentence_upsert.containing_words.is_empty());

    // The word deletion went out as one batched call.
    let word_deletes: Vec<_> = calls
        .iter()
        .filter_map(|c| match c {
            Call::WordDelete(ids) => Some(ids.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(word_deletes, vec![vec!["w1".to_string()]]);
    assert!(session.index().is_fully_clean());
}

#[tokio::test]
async fn test_never_persisted_deletion_needs_no_remote_call() {
    let mut session = DocumentSession::new(meta());
    let service = RecordingService::new();

    insert_word(&mut session, "casa", None);
    let word = session.editor().tree().keys_of_kind(NodeKind::Word)[0];
    session.set_selection(Some(Selection::Node(word)));
    session.apply(&Command::Backspace).unwrap();

    let report = session.reconcile(&service).await;
    assert!(report.is_complete_success());
    assert_eq!(report.deleted, 0);
    assert!(session.index().is_fully_clean());
    assert!(service
        .calls()
        .await
        .iter()
        .all(|c| !matches!(c, Call::WordDelete(_))));
}

#[tokio::test]
async fn test_failed_upsert_stays_dirty_and_does_not_block_others() {
    let mut session = DocumentSession::new(meta());
    let service = RecordingService::new();
    service.fail_sentence_upserts.store(true, Ordering::Relaxed);

    insert_word(&mut session, "casa", None);
    wrap_first_paragraph_in_sentence(&mut session);
    insert_grammar_point(&mut session, "ser");

    let report = session.reconcile(&service).await;

    // Word and grammar point went through; the sentence failure is isolated.
    assert_eq!(report.failed.len(), 1);
    assert!(matches!(
        report.failed[0].entity,
        glossa_sync::EntityKind::Sentence
    ));
    assert!(report.upserted >= 2);
    assert_eq!(session.index().dirty_count(), 1);

    // Next cycle retries just the sentence.
    service.fail_sentence_upserts.store(false, Ordering::Relaxed);
    let before = service.call_count().await;
    let report = session.reconcile(&service).await;
    assert!(report.is_complete_success());
    assert_eq!(service.call_count().await, before + 1);
    assert!(session.index().is_fully_clean());
}

#[tokio::test]
async fn test_grammar_points_reconcile_before_sentences() {
    let mut session = DocumentSession::new(meta());
    let service = RecordingService::new();

    insert_word(&mut session, "casa", None);
    wrap_first_paragraph_in_sentence(&mut session);
    insert_grammar_point(&mut session, "ser");

    session.reconcile(&service).await;

    let calls = service.calls().await;
    let gp_pos = calls
        .iter()
        .position(|c| matches!(c, Call::GrammarPointUpsert(_)))
        .unwrap();
    let sentence_pos = calls
        .iter()
        .position(|c| matches!(c, Call::SentenceUpsert(_)))
        .unwrap();
    assert!(gp_pos < sentence_pos);
}

#[tokio::test]
async fn test_save_upserts_document_then_reconciles() {
    let mut session = DocumentSession::new(meta());
    let service = RecordingService::new();

    insert_word(&mut session, "casa", None);
    let report = session.save(&service).await.unwrap();
    assert!(report.is_complete_success());

    let calls = service.calls().await;
    assert!(matches!(calls[0], Call::DocumentUpsert(_)));
    let document = match &calls[0] {
        Call::DocumentUpsert(request) => request.clone(),
        _ => unreachable!(),
    };
    assert_eq!(document.id, "d1");
    assert_eq!(document.title, "práctica");

    // The stored string opens back into an equivalent session: the word
    // survives with its fields and, having been serialized before the
    // entity upserts ran, still no persisted id.
    let loaded = DocumentSession::load(meta(), &document.serialized_document).unwrap();
    let tree = loaded.editor().tree();
    let words = tree.keys_of_kind(NodeKind::Word);
    assert_eq!(words.len(), 1);
    match tree.node(words[0]).unwrap() {
        glossa_document::Node::Word {
            word,
            translations,
            database_id,
            ..
        } => {
            assert_eq!(word, "casa");
            assert_eq!(translations, &vec!["house".to_string()]);
            assert_eq!(database_id, &None);
        }
        _ => unreachable!(),
    }
    assert!(loaded.index().is_fully_clean());
}

#[tokio::test]
async fn test_document_level_save_failure_surfaces_as_error() {
    let mut session = DocumentSession::new(meta());
    let service = RecordingService::new();
    service.fail_document_upserts.store(true, Ordering::Relaxed);

    insert_word(&mut session, "casa", None);
    let result = session.save(&service).await;
    assert!(result.is_err());

    // Entity reconciliation never started; the word is still dirty for the
    // next attempt.
    assert_eq!(session.index().dirty_count(), 1);
    assert_eq!(service.call_count().await, 1);
}
