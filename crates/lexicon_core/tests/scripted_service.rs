use lexicon_core::{
    DictionaryError, DictionaryService, MergeOutcome, NewTranslation, NewWord, RepoCall, Scripted,
    ScriptedRepository, Sentence, TableLocks, Translation, TranslationRemoval, TxMode, Word,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn sentence(id: i64, translation_id: i64, text: &str) -> Sentence {
    Sentence {
        id,
        translation_id,
        sentence: text.to_string(),
    }
}

fn bike(sentences: Vec<Sentence>) -> Translation {
    Translation {
        id: 10,
        word_id: 1,
        english: "bike".to_string(),
        sentences,
    }
}

fn rower(translations: Vec<Translation>) -> Word {
    Word {
        id: 1,
        polish: "rower".to_string(),
        translations,
    }
}

#[test]
fn merge_of_a_new_word_locks_both_tables_and_inserts_the_tree() {
    let repo = ScriptedRepository::new()
        .respond(Scripted::Fail(DictionaryError::WordNotExists {
            polish: "rower".to_string(),
        }))
        .respond(Scripted::Word(rower(vec![])));
    let service = DictionaryService::new(repo);

    let outcome = service
        .merge_word("rower", &NewTranslation::new("bike", ["Fast", "Fast"]))
        .unwrap();
    assert_eq!(outcome, MergeOutcome::CreatedWord);

    assert_eq!(
        service.repository().calls(),
        vec![
            RepoCall::Transaction(TxMode::Locked(TableLocks::ALL)),
            RepoCall::GetWord {
                polish: "rower".to_string()
            },
            RepoCall::AddWord(NewWord::with_translation(
                "rower",
                NewTranslation::new("bike", ["Fast"]),
            )),
        ]
    );
    assert_eq!(service.repository().remaining(), 0);
}

#[test]
fn merge_into_an_existing_translation_adds_only_missing_sentences() {
    let existing = bike(vec![sentence(100, 10, "Fast")]);
    let repo = ScriptedRepository::new()
        .respond(Scripted::Word(rower(vec![existing.clone()])))
        .respond(Scripted::Translation(existing))
        .respond(Scripted::Sentences(vec![sentence(101, 10, "Red")]));
    let service = DictionaryService::new(repo);

    let outcome = service
        .merge_word("rower", &NewTranslation::new("bike", ["Fast", "Red"]))
        .unwrap();
    assert_eq!(outcome, MergeOutcome::AddedSentences(1));

    let calls = service.repository().calls();
    assert_eq!(
        calls.last(),
        Some(&RepoCall::AddSentences {
            translation_id: 10,
            sentences: vec!["Red".to_string()],
        })
    );
}

#[test]
fn merge_with_nothing_new_performs_no_writes() {
    let existing = bike(vec![sentence(100, 10, "Fast")]);
    let repo = ScriptedRepository::new()
        .respond(Scripted::Word(rower(vec![existing.clone()])))
        .respond(Scripted::Translation(existing));
    let service = DictionaryService::new(repo);

    let outcome = service
        .merge_word("rower", &NewTranslation::new("bike", ["Fast"]))
        .unwrap();
    assert_eq!(outcome, MergeOutcome::Unchanged);
    assert_eq!(service.repository().calls().len(), 3);
}

#[test]
fn merge_attaches_a_missing_translation_to_the_existing_word() {
    let repo = ScriptedRepository::new()
        .respond(Scripted::Word(rower(vec![bike(vec![])])))
        .respond(Scripted::Fail(DictionaryError::TranslationNotExists {
            polish: "rower".to_string(),
            english: "bicycle".to_string(),
        }))
        .respond(Scripted::Translation(Translation {
            id: 11,
            word_id: 1,
            english: "bicycle".to_string(),
            sentences: vec![],
        }));
    let service = DictionaryService::new(repo);

    let outcome = service
        .merge_word("rower", &NewTranslation::new("bicycle", Vec::<String>::new()))
        .unwrap();
    assert_eq!(outcome, MergeOutcome::CreatedTranslation);
    assert!(matches!(
        service.repository().calls().last(),
        Some(RepoCall::AddTranslation { word_id: 1, .. })
    ));
}

#[test]
fn merge_propagates_storage_failures() {
    let repo = ScriptedRepository::new().respond(Scripted::Fail(DictionaryError::InvalidData(
        "broken row".to_string(),
    )));
    let service = DictionaryService::new(repo);

    let err = service
        .merge_word("rower", &NewTranslation::new("bike", ["Fast"]))
        .unwrap_err();
    assert!(matches!(err, DictionaryError::InvalidData(_)));
}

#[test]
fn delete_translation_racing_another_delete_is_still_success() {
    let repo = ScriptedRepository::new()
        .respond(Scripted::Translation(bike(vec![])))
        .respond(Scripted::Removal(TranslationRemoval::default()));
    let service = DictionaryService::new(repo);

    assert!(service.delete_translation("rower", "bike").unwrap());
    assert_eq!(
        service.repository().calls()[0],
        RepoCall::Transaction(TxMode::ReadWrite)
    );
}

#[test]
fn delete_sentence_miss_skips_the_delete_statement() {
    let repo = ScriptedRepository::new().respond(Scripted::Fail(
        DictionaryError::SentenceNotExists {
            polish: "rower".to_string(),
            english: "bike".to_string(),
            sentence: "Gone".to_string(),
        },
    ));
    let service = DictionaryService::new(repo);

    assert!(service.delete_sentence("rower", "bike", "Gone").unwrap());
    assert_eq!(service.repository().calls().len(), 2);
}

#[test]
fn update_that_touches_no_rows_reports_not_exists() {
    let repo = ScriptedRepository::new()
        .respond(Scripted::Word(rower(vec![])))
        .respond(Scripted::Rows(0));
    let service = DictionaryService::new(repo);

    let err = service.update_word("rower", "rowerek").unwrap_err();
    assert!(matches!(err, DictionaryError::WordNotExists { polish } if polish == "rower"));
}

#[test]
fn select_word_runs_read_only_and_never_writes() {
    let writes = Arc::new(AtomicUsize::new(0));
    let observed = Arc::clone(&writes);
    let repo = ScriptedRepository::new()
        .respond(Scripted::Word(rower(vec![bike(vec![])])))
        .with_verifier(move |call| match call {
            RepoCall::Transaction(mode) => assert_eq!(*mode, TxMode::ReadOnly),
            RepoCall::GetWord { .. } => {}
            _ => {
                observed.fetch_add(1, Ordering::SeqCst);
            }
        });
    let service = DictionaryService::new(repo);

    let word = service.select_word("rower").unwrap();
    assert_eq!(word.translations.len(), 1);
    assert_eq!(writes.load(Ordering::SeqCst), 0);
}

#[test]
fn missing_scripted_response_is_reported_as_invalid_data() {
    let service = DictionaryService::new(ScriptedRepository::new());
    let err = service.select_word("rower").unwrap_err();
    assert!(matches!(err, DictionaryError::InvalidData(_)));
}
