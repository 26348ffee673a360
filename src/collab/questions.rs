use futures::future::BoxFuture;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::CollabResult;
use crate::dao::models::GameMode;

/// One quiz item served by the vocabulary content store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionItem {
    /// Text shown to the player.
    pub prompt: String,
    /// Expected answer, compared case-insensitively by the runner.
    pub answer: String,
    /// Multiple-choice options; empty for free-text sentence questions.
    #[serde(default)]
    pub choices: Vec<String>,
    /// Subcategory this item belongs to.
    #[serde(default)]
    pub subcategory: u32,
}

/// Parameters of a question fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionQuery {
    /// Category to draw from.
    pub category: String,
    /// Subcategory filter; 0 selects every subcategory of the category.
    pub subcategory: u32,
    /// Quiz kind.
    pub mode: GameMode,
}

/// Contract to the external vocabulary content store.
///
/// The store returns the full pool for the query; shuffling and truncation to
/// the configured question count happen on the caller's side, which is why
/// the two participants of a match are not guaranteed identical lists.
pub trait QuestionSource: Send + Sync {
    /// Fetch the question pool for a query.
    fn fetch(&self, query: QuestionQuery) -> BoxFuture<'static, CollabResult<Vec<QuestionItem>>>;
}

/// Static question bank, used in tests and offline runs.
///
/// Categories keep their authoring order, which makes bank listings and
/// fixtures deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticQuestionBank {
    #[serde(default)]
    vocab: IndexMap<String, Vec<QuestionItem>>,
    #[serde(default)]
    sentence: IndexMap<String, Vec<QuestionItem>>,
}

impl StaticQuestionBank {
    /// Add items to a category of the given mode.
    pub fn insert(&mut self, mode: GameMode, category: impl Into<String>, items: Vec<QuestionItem>) {
        let shelf = match mode {
            GameMode::Vocab => &mut self.vocab,
            GameMode::Sentence => &mut self.sentence,
        };
        shelf.entry(category.into()).or_default().extend(items);
    }

    fn lookup(&self, query: &QuestionQuery) -> Vec<QuestionItem> {
        let shelf = match query.mode {
            GameMode::Vocab => &self.vocab,
            GameMode::Sentence => &self.sentence,
        };
        shelf
            .get(&query.category)
            .map(|items| {
                items
                    .iter()
                    .filter(|item| query.subcategory == 0 || item.subcategory == query.subcategory)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl QuestionSource for StaticQuestionBank {
    fn fetch(&self, query: QuestionQuery) -> BoxFuture<'static, CollabResult<Vec<QuestionItem>>> {
        let items = self.lookup(&query);
        Box::pin(async move { Ok(items) })
    }
}

#[cfg(feature = "client")]
pub use http::HttpQuestionSource;

#[cfg(feature = "client")]
mod http {
    use futures::future::BoxFuture;

    use crate::collab::{CollabError, CollabResult};
    use crate::dao::models::GameMode;

    use super::{QuestionItem, QuestionQuery, QuestionSource};

    /// HTTP-backed vocabulary content store.
    #[derive(Clone)]
    pub struct HttpQuestionSource {
        http: reqwest::Client,
        base_url: String,
    }

    impl HttpQuestionSource {
        /// Build a source rooted at `base_url`.
        pub fn new(base_url: impl Into<String>) -> Self {
            Self {
                http: reqwest::Client::new(),
                base_url: base_url.into().trim_end_matches('/').to_owned(),
            }
        }
    }

    impl QuestionSource for HttpQuestionSource {
        fn fetch(
            &self,
            query: QuestionQuery,
        ) -> BoxFuture<'static, CollabResult<Vec<QuestionItem>>> {
            let http = self.http.clone();
            let mode = match query.mode {
                GameMode::Vocab => "vocab",
                GameMode::Sentence => "sentence",
            };
            let url = format!(
                "{}/questions?category={}&subcategory={}&mode={mode}",
                self.base_url, query.category, query.subcategory
            );
            Box::pin(async move {
                http.get(&url)
                    .send()
                    .await
                    .map_err(|err| CollabError::Unreachable(err.to_string()))?
                    .error_for_status()
                    .map_err(|err| CollabError::Unreachable(err.to_string()))?
                    .json::<Vec<QuestionItem>>()
                    .await
                    .map_err(|err| CollabError::Malformed(err.to_string()))
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(prompt: &str, subcategory: u32) -> QuestionItem {
        QuestionItem {
            prompt: prompt.into(),
            answer: format!("answer-{prompt}"),
            choices: vec![],
            subcategory,
        }
    }

    #[tokio::test]
    async fn subcategory_zero_mixes_everything() {
        let mut bank = StaticQuestionBank::default();
        bank.insert(
            GameMode::Vocab,
            "animal",
            vec![item("cat", 1), item("whale", 2), item("eagle", 3)],
        );

        let all = bank
            .fetch(QuestionQuery {
                category: "animal".into(),
                subcategory: 0,
                mode: GameMode::Vocab,
            })
            .await
            .unwrap();
        assert_eq!(all.len(), 3);

        let birds = bank
            .fetch(QuestionQuery {
                category: "animal".into(),
                subcategory: 3,
                mode: GameMode::Vocab,
            })
            .await
            .unwrap();
        assert_eq!(birds.len(), 1);
        assert_eq!(birds[0].prompt, "eagle");
    }

    #[tokio::test]
    async fn modes_have_separate_shelves() {
        let mut bank = StaticQuestionBank::default();
        bank.insert(GameMode::Vocab, "food", vec![item("bread", 1)]);

        let sentences = bank
            .fetch(QuestionQuery {
                category: "food".into(),
                subcategory: 0,
                mode: GameMode::Sentence,
            })
            .await
            .unwrap();
        assert!(sentences.is_empty());
    }
}
