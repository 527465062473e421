//! Feed session state
//!
//! The in-memory state of one incremental article feed: what is displayed,
//! what has been discovered, what has already been tried, and the single
//! speculative prefetch slot. Everything here is synchronous; the
//! controller in `app::feed_controller` does the I/O around it.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::article::{Article, ArticleId, ArticleRef, CategoryRef, FetchedPost, Slug};
use super::visibility::{most_visible, AddressBarUpdate, ArticleBounds};

/// Observable phase of a feed session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedPhase {
    /// Not fetching; more content may exist
    Idle,
    /// An advance is waiting on the content source
    Loading,
    /// Nothing left to show, ever
    Exhausted,
    /// The last displayed article has live coverage
    Locked,
}

impl std::fmt::Display for FeedPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedPhase::Idle => write!(f, "idle"),
            FeedPhase::Loading => write!(f, "loading"),
            FeedPhase::Exhausted => write!(f, "exhausted"),
            FeedPhase::Locked => write!(f, "locked"),
        }
    }
}

/// Contents of the prefetch slot when an advance looks at it
#[derive(Debug)]
pub enum Prefetched {
    Empty,
    /// Loaded through another path since it was buffered; discarded
    Stale(Slug),
    /// `requested` is the candidate slug the post was fetched for
    Fresh { requested: Slug, post: FetchedPost },
}

/// Result of trying to display a fetched post
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendResult {
    Appended,
    /// Slug or id already displayed or attempted
    Duplicate,
}

/// State of one feed, for the lifetime of a page view
#[derive(Debug)]
pub struct FeedSession {
    articles: Vec<Article>,
    queue: Vec<ArticleRef>,
    loaded_slugs: HashSet<Slug>,
    loaded_ids: HashSet<ArticleId>,
    prefetched: Option<(Slug, FetchedPost)>,
    prefetch_in_flight: bool,
    live: HashSet<Slug>,
    loading: bool,
    exhausted: bool,
    timeouts: HashMap<Slug, u32>,
    current: Option<AddressBarUpdate>,
    /// Bumped on every change to the queue or the loaded set
    generation: u64,
}

impl FeedSession {
    /// Start a feed with the article the reader landed on
    pub fn start(initial: FetchedPost) -> Self {
        let current = Some(address_of(&initial.article));
        let mut session = Self {
            articles: Vec::new(),
            queue: Vec::new(),
            loaded_slugs: HashSet::new(),
            loaded_ids: HashSet::new(),
            prefetched: None,
            prefetch_in_flight: false,
            live: HashSet::new(),
            loading: false,
            exhausted: false,
            timeouts: HashMap::new(),
            current,
            generation: 0,
        };
        session.append(initial, None);
        session
    }

    // ========== Queries ==========

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn queue(&self) -> &[ArticleRef] {
        &self.queue
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn current(&self) -> Option<&AddressBarUpdate> {
        self.current.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn has_prefetched(&self) -> bool {
        self.prefetched.is_some()
    }

    pub fn is_slug_loaded(&self, slug: &Slug) -> bool {
        self.loaded_slugs.contains(slug)
    }

    pub fn is_id_loaded(&self, id: ArticleId) -> bool {
        self.loaded_ids.contains(&id)
    }

    /// Every loaded id, sorted, for "more in category" exclusion
    pub fn loaded_ids(&self) -> Vec<ArticleId> {
        let mut ids: Vec<_> = self.loaded_ids.iter().copied().collect();
        ids.sort();
        ids
    }

    pub fn loaded_slug_count(&self) -> usize {
        self.loaded_slugs.len()
    }

    /// True while the last displayed article is marked live
    pub fn is_locked(&self) -> bool {
        self.articles
            .last()
            .is_some_and(|a| self.live.contains(&a.slug))
    }

    pub fn phase(&self) -> FeedPhase {
        if self.exhausted {
            FeedPhase::Exhausted
        } else if self.is_locked() {
            FeedPhase::Locked
        } else if self.loading {
            FeedPhase::Loading
        } else {
            FeedPhase::Idle
        }
    }

    pub fn last_category(&self) -> Option<CategoryRef> {
        self.articles.last().and_then(|a| a.category.clone())
    }

    /// First queue entry not yet loaded, scanning front to back
    pub fn next_candidate(&self) -> Option<ArticleRef> {
        self.queue
            .iter()
            .find(|r| !self.loaded_slugs.contains(&r.slug))
            .cloned()
    }

    // ========== Advance bookkeeping ==========

    /// Enter `Loading`. Returns false if an advance is already in flight.
    pub fn begin_loading(&mut self) -> bool {
        if self.loading {
            return false;
        }
        self.loading = true;
        true
    }

    pub fn finish_loading(&mut self) {
        self.loading = false;
    }

    pub fn mark_exhausted(&mut self) {
        self.loading = false;
        self.exhausted = true;
    }

    /// Record a live-coverage report. Returns true the first time a slug is seen.
    pub fn mark_live(&mut self, slug: Slug) -> bool {
        self.live.insert(slug)
    }

    /// Empty the prefetch slot for an advance
    pub fn take_prefetched(&mut self) -> Prefetched {
        match self.prefetched.take() {
            None => Prefetched::Empty,
            Some((requested, post)) => {
                if self.is_slug_loaded(&requested) {
                    Prefetched::Stale(requested)
                } else if self.is_slug_loaded(&post.article.slug)
                    || self.is_id_loaded(post.article.id)
                {
                    Prefetched::Stale(post.article.slug)
                } else {
                    Prefetched::Fresh { requested, post }
                }
            }
        }
    }

    /// Display a fetched post and merge its related references.
    ///
    /// `requested` is the candidate slug that was asked for; it is marked
    /// loaded even when the CMS answers with a different canonical slug.
    pub fn append(&mut self, post: FetchedPost, requested: Option<&Slug>) -> AppendResult {
        if let Some(slug) = requested {
            self.loaded_slugs.insert(slug.clone());
        }

        let FetchedPost { article, related } = post;
        let duplicate_slug = self.articles.iter().any(|a| a.slug == article.slug)
            || (requested != Some(&article.slug) && self.loaded_slugs.contains(&article.slug));
        if duplicate_slug || self.loaded_ids.contains(&article.id) {
            self.loaded_slugs.insert(article.slug);
            self.generation += 1;
            return AppendResult::Duplicate;
        }

        self.loaded_slugs.insert(article.slug.clone());
        self.loaded_ids.insert(article.id);
        self.articles.push(article);
        self.merge_refs(related);
        self.generation += 1;
        AppendResult::Appended
    }

    /// Mark a candidate as consumed without displaying it
    pub fn mark_failed(&mut self, slug: &Slug) {
        if self.loaded_slugs.insert(slug.clone()) {
            self.generation += 1;
        }
    }

    /// Count a timeout against a candidate. Once it has timed out more than
    /// `retries` times it is marked loaded; returns true in that case.
    pub fn record_timeout(&mut self, slug: &Slug, retries: u32) -> bool {
        let count = self.timeouts.entry(slug.clone()).or_insert(0);
        *count += 1;
        if *count > retries {
            self.mark_failed(slug);
            true
        } else {
            false
        }
    }

    /// Append references to the queue, skipping ids already queued.
    /// Returns how many were added.
    pub fn merge_refs(&mut self, refs: Vec<ArticleRef>) -> usize {
        let mut added = 0;
        for r in refs {
            if self.queue.iter().any(|q| q.id == r.id) {
                continue;
            }
            self.queue.push(r);
            added += 1;
        }
        if added > 0 {
            self.generation += 1;
        }
        added
    }

    // ========== Prefetch slot ==========

    /// Claim the next candidate for a speculative fetch, if one is allowed
    pub fn begin_prefetch(&mut self) -> Option<ArticleRef> {
        if self.has_prefetched() || self.exhausted || self.prefetch_in_flight {
            return None;
        }
        let candidate = self.next_candidate()?;
        self.prefetch_in_flight = true;
        Some(candidate)
    }

    /// Store a speculative result. Dropped when the slot is taken or the
    /// article was loaded meanwhile; returns whether it was kept.
    pub fn finish_prefetch(&mut self, requested: &Slug, post: Option<FetchedPost>) -> bool {
        self.prefetch_in_flight = false;
        match post {
            Some(post) => self.stash(requested.clone(), post),
            None => false,
        }
    }

    /// Park a post that could not be displayed (the feed locked while it was
    /// in flight) in the prefetch slot so a later advance can use it
    pub fn stash(&mut self, requested: Slug, post: FetchedPost) -> bool {
        if self.has_prefetched()
            || self.is_slug_loaded(&requested)
            || self.is_slug_loaded(&post.article.slug)
            || self.is_id_loaded(post.article.id)
        {
            return false;
        }
        self.prefetched = Some((requested, post));
        true
    }

    // ========== Address bar ==========

    /// Reflect the most visible displayed article once it covers more than
    /// `threshold` of the viewport
    pub fn track_visibility(
        &mut self,
        viewport_height: f64,
        bounds: &[ArticleBounds],
        threshold: f64,
    ) -> Option<AddressBarUpdate> {
        let (slug, fraction) = most_visible(viewport_height, bounds)?;
        if fraction <= threshold {
            return None;
        }
        if self
            .current
            .as_ref()
            .is_some_and(|c| c.slug == slug.as_str())
        {
            return None;
        }
        let article = self.articles.iter().find(|a| &a.slug == slug)?;
        let update = address_of(article);
        self.current = Some(update.clone());
        Some(update)
    }
}

fn address_of(article: &Article) -> AddressBarUpdate {
    AddressBarUpdate {
        slug: article.slug.to_string(),
        title: article.title.clone(),
        path: article.public_path(),
    }
}
