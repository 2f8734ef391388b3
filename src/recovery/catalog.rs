//! Challenge question registry on top of [`QuestionStore`].
//!
//! All access goes through one async mutex: reads see a complete file and
//! read-modify-write sequences (`add`, `delete`, `seed_if_empty`) never
//! interleave, so concurrent callers cannot lose each other's updates.

use super::error::Result;
use super::question::{default_questions, ChallengeQuestion};
use super::store::{LocaleFilter, QuestionStore};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

#[derive(Debug)]
pub struct ChallengeQuestionCatalog {
    store: Mutex<QuestionStore>,
    locale_filter: LocaleFilter,
}

impl ChallengeQuestionCatalog {
    #[must_use]
    pub fn new(store: QuestionStore, locale_filter: LocaleFilter) -> Self {
        if locale_filter == LocaleFilter::ExcludeMatching {
            warn!("locale-filtered reads exclude the requested locale (legacy polarity)");
        }
        Self {
            store: Mutex::new(store),
            locale_filter,
        }
    }

    #[must_use]
    pub const fn locale_filter(&self) -> LocaleFilter {
        self.locale_filter
    }

    /// The built-in question sets; does not touch the store.
    #[must_use]
    pub fn seed_defaults(&self) -> Vec<ChallengeQuestion> {
        default_questions()
    }

    /// Write the defaults when the store holds no records.
    ///
    /// Returns the number of records written (0 when already populated).
    ///
    /// # Errors
    /// Store read or write failures.
    #[instrument(skip(self))]
    pub async fn seed_if_empty(&self) -> Result<usize> {
        let store = self.store.lock().await;
        if !store.load_all().await?.is_empty() {
            return Ok(0);
        }
        let defaults = default_questions();
        store.save(&defaults).await?;
        info!(count = defaults.len(), "seeded default challenge questions");
        Ok(defaults.len())
    }

    /// # Errors
    /// Store read failures.
    pub async fn exists(&self, question: &ChallengeQuestion) -> Result<bool> {
        Ok(self.list_all().await?.contains(question))
    }

    /// # Errors
    /// Store read failures.
    pub async fn list_all(&self) -> Result<Vec<ChallengeQuestion>> {
        self.store.lock().await.load_all().await
    }

    /// Records for `locale`, filtered per the configured [`LocaleFilter`].
    ///
    /// # Errors
    /// Store read failures.
    pub async fn list_by_locale(&self, locale: &str) -> Result<Vec<ChallengeQuestion>> {
        self.store
            .lock()
            .await
            .load_by_locale(locale, self.locale_filter)
            .await
    }

    /// Distinct set ids among the records [`Self::list_by_locale`] returns,
    /// in first-seen order.
    ///
    /// # Errors
    /// Store read failures.
    pub async fn question_set_ids(&self, locale: &str) -> Result<Vec<String>> {
        let mut ids: Vec<String> = Vec::new();
        for question in self.list_by_locale(locale).await? {
            if !ids.contains(&question.question_set_id) {
                ids.push(question.question_set_id);
            }
        }
        Ok(ids)
    }

    /// Questions of one set in the given locale (always an exact locale match).
    ///
    /// # Errors
    /// Store read failures.
    pub async fn questions_in_set(
        &self,
        question_set_id: &str,
        locale: &str,
    ) -> Result<Vec<ChallengeQuestion>> {
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .filter(|q| q.question_set_id == question_set_id && q.has_locale(locale))
            .collect())
    }

    /// Upsert by (set, id, locale). Existing keys keep their position and
    /// get the new text; unknown keys are appended. Adding the same list
    /// twice leaves the store unchanged.
    ///
    /// # Errors
    /// Store read or write failures.
    #[instrument(skip(self, questions), fields(count = questions.len()))]
    pub async fn add(&self, questions: &[ChallengeQuestion]) -> Result<()> {
        let store = self.store.lock().await;
        let mut all = store.load_all().await?;

        for question in questions {
            match all.iter_mut().find(|existing| existing.key() == question.key()) {
                Some(existing) => existing.question.clone_from(&question.question),
                None => all.push(question.clone()),
            }
        }

        store.save(&all).await
    }

    /// Remove every record value-equal to one in `questions` and persist the
    /// rest in their original order. Records not present are ignored.
    ///
    /// # Errors
    /// Store read or write failures.
    #[instrument(skip(self, questions), fields(count = questions.len()))]
    pub async fn delete(&self, questions: &[ChallengeQuestion]) -> Result<()> {
        let store = self.store.lock().await;
        let mut all = store.load_all().await?;
        all.retain(|question| !questions.contains(question));
        store.save(&all).await
    }
}
