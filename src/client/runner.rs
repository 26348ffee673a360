use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use futures::future::BoxFuture;
use rand::{rng, seq::SliceRandom};
use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::debug;

use super::api::{ClientError, LobbyClient};
use crate::{
    collab::{
        CollabError,
        questions::{QuestionItem, QuestionQuery, QuestionSource},
    },
    dao::models::ParticipantRole,
    dto::{
        lobby::LobbySummary,
        score::{ScoreBoard, ScoreSubmission, StatsDto},
    },
};

/// Default cadence of the waiting-for-opponent score poll.
pub const DEFAULT_SCORE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Hook the embedding UI implements to collect an answer to one question.
///
/// The runner enforces the time limit; an `ask` future that outlives it is
/// dropped and the question is scored as an empty answer.
pub trait AnswerPrompt: Send {
    /// Present the question and collect an answer, `None` for a skip.
    fn ask(&mut self, question: &QuestionItem, limit: Duration) -> BoxFuture<'_, Option<String>>;
}

/// Errors the match runner can surface.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// A backend call failed.
    #[error(transparent)]
    Api(#[from] ClientError),
    /// The content collaborator failed.
    #[error(transparent)]
    Content(#[from] CollabError),
    /// The content collaborator had nothing for the configured category.
    #[error("content store returned no questions for category `{category}`")]
    NoQuestions {
        /// The category that came up empty.
        category: String,
    },
}

/// Per-question score: a correct answer earns 100 points minus up to 30 for
/// elapsed time, floored and never negative; wrong answers and timeouts earn
/// zero.
pub fn question_score(correct: bool, elapsed: Duration, limit: Duration) -> i64 {
    if !correct {
        return 0;
    }
    let ratio = elapsed.as_secs_f64() / limit.as_secs_f64();
    (100.0 - ratio * 30.0).floor().max(0.0) as i64
}

/// Case- and whitespace-insensitive answer comparison.
pub fn answers_match(given: &str, expected: &str) -> bool {
    given.trim().to_lowercase() == expected.trim().to_lowercase()
}

/// Score and stats accumulated across one played round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayedRound {
    /// Total score across all questions.
    pub score: i64,
    /// Per-question stats for the submission.
    pub stats: StatsDto,
}

/// Play a question list against a prompt, enforcing the per-question limit.
pub async fn play_round(
    items: &[QuestionItem],
    limit: Duration,
    prompt: &mut dyn AnswerPrompt,
) -> PlayedRound {
    let mut score = 0;
    let mut correct = 0u32;
    let mut fastest_ms = u64::MAX;
    let mut slowest_ms = 0u64;

    for question in items {
        let begun = Instant::now();
        let answer = match timeout(limit, prompt.ask(question, limit)).await {
            Ok(answer) => answer,
            // Countdown ran out: auto-submit an empty answer.
            Err(_) => None,
        };
        let elapsed = begun.elapsed().min(limit);
        let elapsed_ms = elapsed.as_millis() as u64;
        fastest_ms = fastest_ms.min(elapsed_ms);
        slowest_ms = slowest_ms.max(elapsed_ms);

        let is_correct = answer
            .as_deref()
            .is_some_and(|given| answers_match(given, &question.answer));
        if is_correct {
            correct += 1;
        }
        score += question_score(is_correct, elapsed, limit);
    }

    let questions = items.len() as u32;
    PlayedRound {
        score,
        stats: StatsDto {
            questions,
            correct,
            wrong: questions - correct,
            fastest_ms: if questions == 0 { 0 } else { fastest_ms },
            slowest_ms,
        },
    }
}

/// Drives one participant through an in-progress match: fetch and shuffle
/// the question list, play the round, submit the score, then hold in the
/// waiting-for-opponent state until the outcome resolves.
pub struct MatchRunner {
    client: Arc<LobbyClient>,
    questions: Arc<dyn QuestionSource>,
    score_poll_interval: Duration,
}

impl MatchRunner {
    /// Build a runner over an API client and a question source.
    pub fn new(client: Arc<LobbyClient>, questions: Arc<dyn QuestionSource>) -> Self {
        Self {
            client,
            questions,
            score_poll_interval: DEFAULT_SCORE_POLL_INTERVAL,
        }
    }

    /// Override the waiting-for-opponent poll cadence.
    pub fn with_score_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.score_poll_interval = poll_interval;
        self
    }

    /// Play the match for one seat and return the resolved scoreboard.
    pub async fn run(
        &self,
        lobby: &LobbySummary,
        role: ParticipantRole,
        prompt: &mut dyn AnswerPrompt,
    ) -> Result<ScoreBoard, RunnerError> {
        let settings = &lobby.settings;
        let mut items = self
            .questions
            .fetch(QuestionQuery {
                category: settings.category.clone(),
                subcategory: settings.subcategory,
                mode: settings.mode,
            })
            .await?;

        // Each side shuffles and truncates its own pool, so the two
        // participants' lists are not guaranteed identical or identically
        // ordered.
        items.shuffle(&mut rng());
        items.truncate(settings.num_questions as usize);
        if items.is_empty() {
            return Err(RunnerError::NoQuestions {
                category: settings.category.clone(),
            });
        }

        let limit = Duration::from_secs(u64::from(settings.timer_secs));
        let round = play_round(&items, limit, prompt).await;
        debug!(score = round.score, "round finished; submitting");

        let submission = ScoreSubmission {
            role,
            score: round.score,
            stats: round.stats,
        };
        let mut board = self.client.submit_score(lobby.id, &submission).await?;

        // Waiting-for-opponent holding state: poll the aggregate instead of
        // the match record until both scores are in.
        while !board.both_submitted {
            sleep(self.score_poll_interval).await;
            board = self.client.scores(lobby.id).await?;
        }

        Ok(board)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[test]
    fn score_decays_with_elapsed_time() {
        let limit = Duration::from_secs(10);
        assert_eq!(question_score(true, Duration::ZERO, limit), 100);
        assert_eq!(question_score(true, Duration::from_secs(5), limit), 85);
        assert_eq!(question_score(true, limit, limit), 70);
    }

    #[test]
    fn score_floors_fractional_penalties() {
        // 1s of a 7s limit: 100 - 30/7 = 95.71..., floored to 95.
        assert_eq!(
            question_score(true, Duration::from_secs(1), Duration::from_secs(7)),
            95
        );
    }

    #[test]
    fn score_never_goes_negative() {
        assert_eq!(
            question_score(true, Duration::from_secs(40), Duration::from_secs(10)),
            0
        );
    }

    #[test]
    fn wrong_answers_score_zero_regardless_of_speed() {
        assert_eq!(
            question_score(false, Duration::ZERO, Duration::from_secs(10)),
            0
        );
    }

    #[test]
    fn answer_comparison_ignores_case_and_whitespace() {
        assert!(answers_match("  Elephant ", "elephant"));
        assert!(answers_match("ELEPHANT", "Elephant"));
        assert!(!answers_match("elefant", "elephant"));
        assert!(!answers_match("", "elephant"));
    }

    enum Scripted {
        Answer(&'static str),
        Skip,
        Stall,
    }

    struct ScriptedPrompt {
        script: VecDeque<Scripted>,
    }

    impl AnswerPrompt for ScriptedPrompt {
        fn ask(
            &mut self,
            _question: &QuestionItem,
            _limit: Duration,
        ) -> BoxFuture<'_, Option<String>> {
            match self.script.pop_front() {
                Some(Scripted::Answer(text)) => Box::pin(async move { Some(text.to_string()) }),
                Some(Scripted::Skip) | None => Box::pin(async { None }),
                Some(Scripted::Stall) => Box::pin(std::future::pending()),
            }
        }
    }

    fn question(answer: &str) -> QuestionItem {
        QuestionItem {
            prompt: format!("translate `{answer}`"),
            answer: answer.into(),
            choices: vec![],
            subcategory: 1,
        }
    }

    #[tokio::test]
    async fn round_accumulates_score_and_stats() {
        let items = vec![question("cat"), question("dog"), question("owl")];
        let mut prompt = ScriptedPrompt {
            script: VecDeque::from([
                Scripted::Answer("cat"),
                Scripted::Answer("fox"),
                Scripted::Stall,
            ]),
        };

        let limit = Duration::from_millis(100);
        let round = play_round(&items, limit, &mut prompt).await;

        assert_eq!(round.stats.questions, 3);
        assert_eq!(round.stats.correct, 1);
        assert_eq!(round.stats.wrong, 2);
        // One correct answer, delivered almost instantly.
        assert!(round.score >= 90 && round.score <= 100, "score {}", round.score);
        // The stalled question ran the full countdown.
        assert_eq!(round.stats.slowest_ms, 100);
        assert!(round.stats.fastest_ms < 100);
    }

    #[tokio::test]
    async fn timeout_counts_as_an_empty_answer() {
        let items = vec![question("cat")];
        let mut prompt = ScriptedPrompt {
            script: VecDeque::from([Scripted::Stall]),
        };

        let round = play_round(&items, Duration::from_millis(50), &mut prompt).await;
        assert_eq!(round.score, 0);
        assert_eq!(round.stats.correct, 0);
        assert_eq!(round.stats.wrong, 1);
    }

    #[tokio::test]
    async fn empty_round_produces_zeroed_stats() {
        let mut prompt = ScriptedPrompt {
            script: VecDeque::new(),
        };
        let round = play_round(&[], Duration::from_millis(50), &mut prompt).await;
        assert_eq!(round.score, 0);
        assert_eq!(round.stats.questions, 0);
        assert_eq!(round.stats.fastest_ms, 0);
        assert_eq!(round.stats.slowest_ms, 0);
    }
}
