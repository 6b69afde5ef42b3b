use lexicon_core::{NewTranslation, NewWord, Sentence, Translation, Word, WordView};

fn kot() -> Word {
    Word {
        id: 7,
        polish: "kot".to_string(),
        translations: vec![Translation {
            id: 70,
            word_id: 7,
            english: "cat".to_string(),
            sentences: vec![Sentence {
                id: 700,
                translation_id: 70,
                sentence: "The cat sleeps".to_string(),
            }],
        }],
    }
}

#[test]
fn word_view_serializes_to_the_response_shape_without_ids() {
    let json = serde_json::to_value(WordView::from(&kot())).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "polish": "kot",
            "translations": [{
                "english": "cat",
                "sentences": [{ "sentence": "The cat sleeps" }]
            }]
        })
    );
}

#[test]
fn word_view_deserializes_from_the_response_shape() {
    let value = serde_json::json!({
        "polish": "kot",
        "translations": [{ "english": "cat", "sentences": [] }]
    });
    let view: WordView = serde_json::from_value(value).unwrap();
    assert_eq!(view.translations[0].english, "cat");
    assert!(view.translations[0].sentences.is_empty());
}

#[test]
fn new_word_payload_accepts_request_json() {
    let value = serde_json::json!({
        "polish": "rower",
        "translations": [{ "english": "bike", "sentences": ["I like my bike"] }]
    });
    let payload: NewWord = serde_json::from_value(value).unwrap();
    assert_eq!(
        payload,
        NewWord::with_translation("rower", NewTranslation::new("bike", ["I like my bike"]))
    );
}

#[test]
fn payload_missing_required_fields_is_rejected() {
    let value = serde_json::json!({ "english": "bike" });
    assert!(serde_json::from_value::<NewTranslation>(value).is_err());
}
