//! Feed controller
//!
//! Drives one feed session: appends the next related article whenever the
//! reader nears the end of the page, keeps one article prefetched ahead of
//! time, and stops advancing while the last article has live coverage.
//!
//! The session lives behind a single mutex. It is never held across a
//! call to the content source, so live-coverage reports and visibility
//! updates are handled while a fetch is in flight.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::domain::entities::{
    AddressBarUpdate, AppendResult, Article, ArticleBounds, ArticleRef, FeedPhase, FeedSession,
    FetchedPost, Prefetched, Slug,
};
use crate::domain::ports::ContentSource;
use crate::error::ContentSourceError;

/// Tunables for a feed session
#[derive(Debug, Clone)]
pub struct FeedSettings {
    /// Quiet period after a queue change before prefetching
    pub prefetch_debounce: Duration,
    /// Upper bound on any single content source call
    pub fetch_timeout: Duration,
    /// How many times a timed-out candidate is retried before it is skipped
    pub timeout_retries: u32,
    /// Share of the viewport an article must cover to own the address bar
    pub visibility_threshold: f64,
    /// How far before the end of the page the renderer should fire the
    /// viewport trigger
    pub prefetch_margin_px: u32,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            prefetch_debounce: Duration::from_millis(1000),
            fetch_timeout: Duration::from_secs(8),
            timeout_retries: 1,
            visibility_threshold: 0.3,
            prefetch_margin_px: 2000,
        }
    }
}

/// What a single advance did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdvanceOutcome {
    /// An article was added to the end of the feed
    Appended { slug: Slug, prefetched: bool },
    /// The candidate failed, was missing, or was a duplicate; it will not be retried
    Skipped { slug: Slug },
    /// The candidate fetch timed out
    TimedOut { slug: Slug, will_retry: bool },
    /// The category lookup failed; a later trigger tries again
    Stalled,
    /// The last article has live coverage
    Locked,
    /// Another advance is in flight
    Busy,
    /// Nothing left to show
    Exhausted,
}

/// What the rendering layer needs to draw the feed
#[derive(Debug, Clone, Serialize)]
pub struct FeedSnapshot {
    pub articles: Vec<Article>,
    pub phase: FeedPhase,
    pub loading: bool,
    pub exhausted: bool,
    pub locked: bool,
    pub current: Option<AddressBarUpdate>,
}

enum Discovery {
    Found(ArticleRef),
    Exhausted,
    Failed,
}

/// Controller for one incremental article feed
pub struct FeedController<CS>
where
    CS: ContentSource + ?Sized,
{
    source: Arc<CS>,
    settings: FeedSettings,
    session: Mutex<FeedSession>,
}

impl<CS> FeedController<CS>
where
    CS: ContentSource + ?Sized,
{
    pub fn new(source: Arc<CS>, settings: FeedSettings, initial: FetchedPost) -> Self {
        Self {
            source,
            settings,
            session: Mutex::new(FeedSession::start(initial)),
        }
    }

    pub fn settings(&self) -> &FeedSettings {
        &self.settings
    }

    pub async fn snapshot(&self) -> FeedSnapshot {
        let session = self.session.lock().await;
        FeedSnapshot {
            articles: session.articles().to_vec(),
            phase: session.phase(),
            loading: session.is_loading(),
            exhausted: session.is_exhausted(),
            locked: session.is_locked(),
            current: session.current().cloned(),
        }
    }

    /// Record that an article has live coverage. Marks are never removed.
    pub async fn mark_live(&self, slug: Slug) -> bool {
        let mut session = self.session.lock().await;
        let added = session.mark_live(slug.clone());
        if added && session.is_locked() {
            tracing::info!(slug = %slug, "Feed locked by live coverage");
        }
        added
    }

    /// Reflect the article the reader is looking at. Cosmetic only.
    pub async fn track_visibility(
        &self,
        viewport_height: f64,
        bounds: &[ArticleBounds],
    ) -> Option<AddressBarUpdate> {
        let mut session = self.session.lock().await;
        session.track_visibility(viewport_height, bounds, self.settings.visibility_threshold)
    }

    /// Try to append exactly one article to the feed
    pub async fn advance(&self) -> AdvanceOutcome {
        let candidate = {
            let mut session = self.session.lock().await;
            if session.is_locked() {
                tracing::debug!("Feed is locked by live coverage, not advancing");
                return AdvanceOutcome::Locked;
            }
            if session.is_exhausted() {
                return AdvanceOutcome::Exhausted;
            }
            if session.is_loading() {
                return AdvanceOutcome::Busy;
            }

            match session.take_prefetched() {
                Prefetched::Fresh { requested, post } => {
                    let slug = post.article.slug.clone();
                    return match session.append(post, Some(&requested)) {
                        AppendResult::Appended => {
                            tracing::debug!(slug = %slug, "Appended prefetched article");
                            AdvanceOutcome::Appended {
                                slug,
                                prefetched: true,
                            }
                        }
                        AppendResult::Duplicate => AdvanceOutcome::Skipped { slug },
                    };
                }
                Prefetched::Stale(slug) => {
                    tracing::debug!(slug = %slug, "Discarding stale prefetched article");
                }
                Prefetched::Empty => {}
            }

            session.begin_loading();
            session.next_candidate()
        };

        let candidate = match candidate {
            Some(candidate) => candidate,
            None => match self.discover_in_category().await {
                Discovery::Found(candidate) => candidate,
                Discovery::Exhausted => {
                    let mut session = self.session.lock().await;
                    session.mark_exhausted();
                    tracing::info!(
                        articles = session.articles().len(),
                        "Feed exhausted"
                    );
                    return AdvanceOutcome::Exhausted;
                }
                Discovery::Failed => {
                    self.session.lock().await.finish_loading();
                    return AdvanceOutcome::Stalled;
                }
            },
        };

        self.load_candidate(candidate).await
    }

    /// Fetch a candidate and display it
    async fn load_candidate(&self, candidate: ArticleRef) -> AdvanceOutcome {
        let result = self.fetch_post(&candidate.slug).await;

        let mut session = self.session.lock().await;
        session.finish_loading();
        let slug = candidate.slug;

        match result {
            Ok(Some(post)) => {
                if session.is_locked() {
                    // live coverage arrived while the fetch was in flight
                    session.stash(slug, post);
                    return AdvanceOutcome::Locked;
                }
                let canonical = post.article.slug.clone();
                match session.append(post, Some(&slug)) {
                    AppendResult::Appended => {
                        tracing::debug!(
                            slug = %canonical,
                            queue_len = session.queue().len(),
                            loaded = session.loaded_slug_count(),
                            "Appended article"
                        );
                        AdvanceOutcome::Appended {
                            slug: canonical,
                            prefetched: false,
                        }
                    }
                    AppendResult::Duplicate => {
                        tracing::debug!(slug = %canonical, "Skipping duplicate article");
                        AdvanceOutcome::Skipped { slug }
                    }
                }
            }
            Ok(None) => {
                tracing::warn!(slug = %slug, "Related article not found, skipping");
                session.mark_failed(&slug);
                AdvanceOutcome::Skipped { slug }
            }
            Err(ContentSourceError::Timeout(after)) => {
                let consumed = session.record_timeout(&slug, self.settings.timeout_retries);
                tracing::warn!(
                    slug = %slug,
                    timeout_ms = after.as_millis() as u64,
                    will_retry = !consumed,
                    "Article fetch timed out"
                );
                AdvanceOutcome::TimedOut {
                    slug,
                    will_retry: !consumed,
                }
            }
            Err(e) => {
                tracing::warn!(slug = %slug, error = %e, "Failed to fetch article, skipping");
                session.mark_failed(&slug);
                AdvanceOutcome::Skipped { slug }
            }
        }
    }

    /// Refill the queue from the last article's category
    async fn discover_in_category(&self) -> Discovery {
        let (category, exclude) = {
            let session = self.session.lock().await;
            (session.last_category(), session.loaded_ids())
        };
        let Some(category) = category else {
            tracing::debug!("Last article has no category, nothing more to discover");
            return Discovery::Exhausted;
        };

        let lookup = tokio::time::timeout(
            self.settings.fetch_timeout,
            self.source.fetch_more_in_category(&category, &exclude),
        )
        .await;

        match lookup {
            Ok(Ok(refs)) if refs.is_empty() => {
                tracing::debug!(category = %category.slug, "Category has no more articles");
                Discovery::Exhausted
            }
            Ok(Ok(refs)) => {
                let mut session = self.session.lock().await;
                let added = session.merge_refs(refs);
                tracing::debug!(category = %category.slug, added, "Queued more in category");
                match session.next_candidate() {
                    Some(candidate) => Discovery::Found(candidate),
                    None => Discovery::Exhausted,
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(category = %category.slug, error = %e, "Category lookup failed");
                Discovery::Failed
            }
            Err(_) => {
                tracing::warn!(category = %category.slug, "Category lookup timed out");
                Discovery::Failed
            }
        }
    }

    /// Speculatively fetch the next candidate into the prefetch slot.
    /// Returns whether the slot was filled.
    pub async fn prefetch_now(&self) -> bool {
        let candidate = self.session.lock().await.begin_prefetch();
        let Some(candidate) = candidate else {
            return false;
        };

        let post = match self.fetch_post(&candidate.slug).await {
            Ok(Some(post)) => Some(post),
            Ok(None) => {
                tracing::debug!(slug = %candidate.slug, "Prefetch candidate not found");
                None
            }
            Err(e) => {
                tracing::debug!(slug = %candidate.slug, error = %e, "Prefetch failed");
                None
            }
        };

        let stored = self.session.lock().await.finish_prefetch(&candidate.slug, post);
        if stored {
            tracing::debug!(slug = %candidate.slug, "Prefetched article");
        }
        stored
    }

    async fn fetch_post(&self, slug: &Slug) -> Result<Option<FetchedPost>, ContentSourceError> {
        let timeout = self.settings.fetch_timeout;
        match tokio::time::timeout(timeout, self.source.fetch_post(slug)).await {
            Ok(result) => result,
            Err(_) => Err(ContentSourceError::Timeout(timeout)),
        }
    }
}

impl<CS> FeedController<CS>
where
    CS: ContentSource + ?Sized + 'static,
{
    /// Viewport trigger: advance once, then schedule a prefetch
    pub async fn on_viewport_trigger(self: &Arc<Self>) -> AdvanceOutcome {
        let outcome = self.advance().await;
        self.schedule_prefetch().await;
        outcome
    }

    /// Prefetch after the debounce period unless the queue or loaded set
    /// changes again first
    pub async fn schedule_prefetch(self: &Arc<Self>) -> JoinHandle<()> {
        let scheduled_at = self.session.lock().await.generation();
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(controller.settings.prefetch_debounce).await;
            if controller.session.lock().await.generation() != scheduled_at {
                return;
            }
            controller.prefetch_now().await;
        })
    }
}
