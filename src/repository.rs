use crate::error::RepoError;
use crate::models::{NewPost, Post, PostChanges};
use async_trait::async_trait;
use sqlx::{PgPool, query_builder::QueryBuilder};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};
use uuid::Uuid;

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations on the `posts` table.
/// Handlers and the post operations never see the concrete backend, which lets the test
/// suite swap Postgres for the in-memory store.
///
/// Implementations must enforce slug uniqueness at write time and report a collision
/// as `RepoError::SlugTaken`.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Round-trip to the store, used by the health check.
    async fn ping(&self) -> Result<(), RepoError>;

    async fn slug_exists(&self, slug: &str) -> Result<bool, RepoError>;
    async fn insert_post(&self, post: NewPost) -> Result<Post, RepoError>;

    // Published only, newest first.
    async fn list_published(&self) -> Result<Vec<Post>, RepoError>;
    // Every post, drafts included, newest first.
    async fn list_posts(&self) -> Result<Vec<Post>, RepoError>;

    async fn find_post(&self, id: Uuid) -> Result<Option<Post>, RepoError>;
    async fn find_post_by_slug(&self, slug: &str) -> Result<Option<Post>, RepoError>;

    /// Returns `None` when no post has this id.
    async fn update_post(&self, id: Uuid, changes: PostChanges)
    -> Result<Option<Post>, RepoError>;
    /// Returns true if a row was removed.
    async fn delete_post(&self, id: Uuid) -> Result<bool, RepoError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer access across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const POST_COLUMNS: &str =
    "id, title, slug, date, author, tags, cover_url, excerpt, content, published";

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by the PostgreSQL database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps a violation of the `posts_slug_key` unique constraint to `SlugTaken`.
fn insert_error(e: sqlx::Error, slug: &str) -> RepoError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepoError::SlugTaken(slug.to_string())
        }
        _ => RepoError::from(e),
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn ping(&self) -> Result<(), RepoError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool, RepoError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM posts WHERE slug = $1)")
            .bind(slug)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    /// insert_post
    ///
    /// The id is generated here; the unique index on `slug` is the final arbiter when two
    /// creations race for the same slug.
    async fn insert_post(&self, post: NewPost) -> Result<Post, RepoError> {
        let query = format!(
            "INSERT INTO posts ({POST_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {POST_COLUMNS}"
        );

        sqlx::query_as::<_, Post>(&query)
            .bind(Uuid::new_v4())
            .bind(&post.title)
            .bind(&post.slug)
            .bind(post.date)
            .bind(&post.author)
            .bind(&post.tags)
            .bind(&post.cover_url)
            .bind(&post.excerpt)
            .bind(&post.content)
            .bind(post.published)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| insert_error(e, &post.slug))
    }

    async fn list_published(&self) -> Result<Vec<Post>, RepoError> {
        let query =
            format!("SELECT {POST_COLUMNS} FROM posts WHERE published = true ORDER BY date DESC");
        Ok(sqlx::query_as::<_, Post>(&query)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_posts(&self) -> Result<Vec<Post>, RepoError> {
        let query = format!("SELECT {POST_COLUMNS} FROM posts ORDER BY date DESC");
        Ok(sqlx::query_as::<_, Post>(&query)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        let query = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1");
        Ok(sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_post_by_slug(&self, slug: &str) -> Result<Option<Post>, RepoError> {
        let query = format!("SELECT {POST_COLUMNS} FROM posts WHERE slug = $1");
        Ok(sqlx::query_as::<_, Post>(&query)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// update_post
    ///
    /// Builds the SET list from the supplied fields only, using QueryBuilder for safe
    /// parameterization. An empty change set is a plain lookup.
    async fn update_post(
        &self,
        id: Uuid,
        changes: PostChanges,
    ) -> Result<Option<Post>, RepoError> {
        if changes.is_empty() {
            return self.find_post(id).await;
        }

        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new("UPDATE posts SET ");
        let mut set = builder.separated(", ");

        if let Some(title) = changes.title {
            set.push("title = ").push_bind_unseparated(title);
        }
        if let Some(date) = changes.date {
            set.push("date = ").push_bind_unseparated(date);
        }
        if let Some(author) = changes.author {
            set.push("author = ").push_bind_unseparated(author);
        }
        if let Some(tags) = changes.tags {
            set.push("tags = ").push_bind_unseparated(tags);
        }
        if let Some(cover_url) = changes.cover_url {
            set.push("cover_url = ").push_bind_unseparated(cover_url);
        }
        if let Some(excerpt) = changes.excerpt {
            set.push("excerpt = ").push_bind_unseparated(excerpt);
        }
        if let Some(content) = changes.content {
            set.push("content = ").push_bind_unseparated(content);
        }
        if let Some(published) = changes.published {
            set.push("published = ").push_bind_unseparated(published);
        }

        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(" RETURNING ");
        builder.push(POST_COLUMNS);

        Ok(builder
            .build_query_as::<Post>()
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// MemoryRepository
///
/// An in-process store with the same contract as `PostgresRepository`, including the
/// unique-slug check on insert. `set_unavailable(true)` makes every call fail, which
/// simulates a database outage.
#[derive(Default)]
pub struct MemoryRepository {
    posts: Mutex<Vec<Post>>,
    unavailable: AtomicBool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Runs `f` against the post list, or fails like a dead connection would.
    fn with_posts<T>(&self, f: impl FnOnce(&mut Vec<Post>) -> T) -> Result<T, RepoError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepoError::Unavailable("connection refused".to_string()));
        }
        let mut posts = self
            .posts
            .lock()
            .map_err(|_| RepoError::Unavailable("store lock poisoned".to_string()))?;
        Ok(f(&mut posts))
    }
}

fn newest_first(mut posts: Vec<Post>) -> Vec<Post> {
    posts.sort_by(|a, b| b.date.cmp(&a.date));
    posts
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn ping(&self) -> Result<(), RepoError> {
        self.with_posts(|_| ())
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool, RepoError> {
        self.with_posts(|posts| posts.iter().any(|p| p.slug == slug))
    }

    async fn insert_post(&self, post: NewPost) -> Result<Post, RepoError> {
        self.with_posts(|posts| {
            if posts.iter().any(|p| p.slug == post.slug) {
                return Err(RepoError::SlugTaken(post.slug));
            }
            let created = post.into_post(Uuid::new_v4());
            posts.push(created.clone());
            Ok(created)
        })?
    }

    async fn list_published(&self) -> Result<Vec<Post>, RepoError> {
        let published = self.with_posts(|posts| {
            posts
                .iter()
                .filter(|p| p.published)
                .cloned()
                .collect::<Vec<_>>()
        })?;
        Ok(newest_first(published))
    }

    async fn list_posts(&self) -> Result<Vec<Post>, RepoError> {
        let all = self.with_posts(|posts| posts.clone())?;
        Ok(newest_first(all))
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        self.with_posts(|posts| posts.iter().find(|p| p.id == id).cloned())
    }

    async fn find_post_by_slug(&self, slug: &str) -> Result<Option<Post>, RepoError> {
        self.with_posts(|posts| posts.iter().find(|p| p.slug == slug).cloned())
    }

    async fn update_post(
        &self,
        id: Uuid,
        changes: PostChanges,
    ) -> Result<Option<Post>, RepoError> {
        self.with_posts(|posts| {
            posts.iter_mut().find(|p| p.id == id).map(|post| {
                changes.apply(post);
                post.clone()
            })
        })
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool, RepoError> {
        self.with_posts(|posts| {
            let before = posts.len();
            posts.retain(|p| p.id != id);
            posts.len() < before
        })
    }
}
