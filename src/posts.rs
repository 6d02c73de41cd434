use crate::{
    error::{AppError, RepoError},
    models::{CreatePostRequest, NewPost, Post, PostChanges, UpdatePostRequest},
    repository::RepositoryState,
    slug::{candidate, slugify},
};
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// How many insert-time slug collisions `create` absorbs before giving up.
pub const MAX_SLUG_CONFLICTS: u32 = 8;

/// PostService
///
/// The blog's post operations, layered over a `Repository`. This is where slug
/// allocation, tag normalization, date parsing and the public-listing outage policy
/// live; the store itself only persists rows.
#[derive(Clone)]
pub struct PostService {
    repo: RepositoryState,
}

impl PostService {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    /// create
    ///
    /// Picks the first free slug in the sequence `base`, `base-1`, `base-2`, ... and
    /// inserts the post under it.
    ///
    /// The existence check alone is racy: two concurrent creations can both see the same
    /// slug as free. The store's unique constraint catches the loser, which then moves on
    /// to the next suffix instead of failing.
    pub async fn create(&self, req: CreatePostRequest) -> Result<Post, AppError> {
        let title = req.title.unwrap_or_default();
        let base = slugify(&title);
        let date = match req.date.as_deref() {
            Some(raw) if !raw.trim().is_empty() => parse_date(raw)?,
            _ => Utc::now(),
        };

        let mut draft = NewPost {
            title,
            slug: String::new(),
            date,
            author: req.author,
            tags: req.tags.map(|t| t.normalize()).unwrap_or_default(),
            cover_url: req.cover_url,
            excerpt: req.excerpt,
            content: req.content.unwrap_or_default(),
            published: req.published.unwrap_or(true),
        };

        let mut n = 0;
        let mut conflicts = 0;
        loop {
            let slug = candidate(&base, n);
            if self.repo.slug_exists(&slug).await.map_err(creation_failed)? {
                n += 1;
                continue;
            }

            draft.slug = slug;
            match self.repo.insert_post(draft.clone()).await {
                Ok(post) => {
                    tracing::info!(id = %post.id, slug = %post.slug, "post created");
                    return Ok(post);
                }
                Err(RepoError::SlugTaken(taken)) => {
                    conflicts += 1;
                    tracing::warn!(slug = %taken, conflicts, "slug claimed concurrently, retrying");
                    if conflicts >= MAX_SLUG_CONFLICTS {
                        return Err(AppError::Storage(format!(
                            "failed to create post: no free slug for `{base}` after {conflicts} conflicts"
                        )));
                    }
                    n += 1;
                }
                Err(e) => return Err(creation_failed(e)),
            }
        }
    }

    /// All published posts, newest first. Store failures propagate.
    pub async fn published(&self) -> Result<Vec<Post>, AppError> {
        Ok(self.repo.list_published().await?)
    }

    /// published_or_empty
    ///
    /// Outage policy for the public listing: if the store fails, the page renders an empty
    /// blog instead of an error. The failure is still logged.
    pub async fn published_or_empty(&self) -> Vec<Post> {
        match self.published().await {
            Ok(posts) => posts,
            Err(e) => {
                tracing::warn!("public post listing degraded to empty: {}", e);
                vec![]
            }
        }
    }

    /// Every post including drafts, for the admin dashboard.
    pub async fn all(&self) -> Result<Vec<Post>, AppError> {
        Ok(self.repo.list_posts().await?)
    }

    /// get_by_id_or_slug
    ///
    /// Looks the key up as an id first, then as a slug. No visibility filter is applied:
    /// an unpublished post is returned to anyone who knows its id or slug.
    pub async fn get_by_id_or_slug(&self, key: &str) -> Result<Post, AppError> {
        if let Ok(id) = Uuid::parse_str(key) {
            if let Some(post) = self.repo.find_post(id).await? {
                return Ok(post);
            }
        }

        self.repo
            .find_post_by_slug(key)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// update
    ///
    /// Applies only the supplied fields. The slug is never touched, even when the title
    /// changes.
    pub async fn update(&self, id: &str, req: UpdatePostRequest) -> Result<Post, AppError> {
        let id = Uuid::parse_str(id).map_err(|_| AppError::NotFound)?;
        let changes = into_changes(req)?;

        let post = self
            .repo
            .update_post(id, changes)
            .await?
            .ok_or(AppError::NotFound)?;

        tracing::info!(id = %post.id, "post updated");
        Ok(post)
    }

    /// Permanently removes the post.
    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        let id = Uuid::parse_str(id).map_err(|_| AppError::NotFound)?;

        if self.repo.delete_post(id).await? {
            tracing::info!(%id, "post deleted");
            Ok(())
        } else {
            Err(AppError::NotFound)
        }
    }
}

fn creation_failed(e: RepoError) -> AppError {
    AppError::Storage(format!("failed to create post: {e}"))
}

fn into_changes(req: UpdatePostRequest) -> Result<PostChanges, AppError> {
    let date = match req.date.as_deref() {
        Some(raw) if !raw.trim().is_empty() => Some(parse_date(raw)?),
        _ => None,
    };

    Ok(PostChanges {
        title: req.title,
        date,
        author: req.author,
        tags: req.tags.map(|t| t.map(|t| t.normalize()).unwrap_or_default()),
        cover_url: req.cover_url,
        excerpt: req.excerpt,
        content: req.content,
        published: req.published,
    })
}

/// parse_date
///
/// Accepts an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (as sent by a date input),
/// the latter read as midnight UTC.
pub fn parse_date(raw: &str) -> Result<DateTime<Utc>, AppError> {
    let raw = raw.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| AppError::Validation(format!("invalid date `{raw}`")))
}
