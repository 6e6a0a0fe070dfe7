//! Seed data so the service is useful without any external config or OpenAI.

use crate::domain::{Answer, Language, LanguageId, Question, RecordId, TestTree, Translation};

/// Languages known when the config file does not list any.
pub fn default_languages() -> Vec<Language> {
  vec![
    Language { id: 1, code: "hu".into() },
    Language { id: 2, code: "en".into() },
  ]
}

fn seeded(id: RecordId, language_id: LanguageId, content: &str) -> Translation {
  Translation {
    id: Some(id),
    source_type: Some("human".into()),
    created_by: Some(1),
    ..Translation::new(language_id, content)
  }
}

/// One fully persisted demo test. Every node carries an id.
pub fn demo_test() -> TestTree {
  TestTree {
    id: Some(1),
    title: "Földrajz / Geography".into(),
    category_id: Some(3),
    source_type: None,
    questions: vec![Question {
      id: Some(10),
      source_type: Some("human".into()),
      category_id: Some(3),
      question_translations: vec![
        seeded(501, 1, "Mi Magyarország fővárosa?"),
        seeded(502, 2, "What is the capital of Hungary?"),
      ],
      answers: vec![
        Answer {
          id: Some(100),
          source_type: Some("human".into()),
          position: Some(1),
          is_correct: true,
          answer_translations: vec![seeded(701, 1, "Budapest"), seeded(702, 2, "Budapest")],
        },
        Answer {
          id: Some(101),
          source_type: Some("human".into()),
          position: Some(2),
          is_correct: false,
          answer_translations: vec![seeded(703, 1, "Debrecen"), seeded(704, 2, "Debrecen")],
        },
      ],
    }],
  }
}
