use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// Post
///
/// A blog entry from the `posts` table. `slug` is assigned once at creation and is
/// unique across the table; `published` controls whether the post is listed publicly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    #[ts(type = "string")]
    pub date: DateTime<Utc>,
    pub author: Option<String>,
    pub tags: Vec<String>,
    pub cover_url: Option<String>,
    pub excerpt: Option<String>,
    pub content: String,
    pub published: bool,
}

/// NewPost
///
/// A fully resolved row ready for insertion. Produced by the post operations once the
/// slug is picked and the draft is normalized; the store only assigns the id.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub slug: String,
    pub date: DateTime<Utc>,
    pub author: Option<String>,
    pub tags: Vec<String>,
    pub cover_url: Option<String>,
    pub excerpt: Option<String>,
    pub content: String,
    pub published: bool,
}

impl NewPost {
    pub fn into_post(self, id: Uuid) -> Post {
        Post {
            id,
            title: self.title,
            slug: self.slug,
            date: self.date,
            author: self.author,
            tags: self.tags,
            cover_url: self.cover_url,
            excerpt: self.excerpt,
            content: self.content,
            published: self.published,
        }
    }
}

/// PostChanges
///
/// A normalized partial update. `None` means "leave as is"; for the nullable columns
/// `Some(None)` clears the value. There is deliberately no slug field.
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub author: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub cover_url: Option<Option<String>>,
    pub excerpt: Option<Option<String>>,
    pub content: Option<String>,
    pub published: Option<bool>,
}

impl PostChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.date.is_none()
            && self.author.is_none()
            && self.tags.is_none()
            && self.cover_url.is_none()
            && self.excerpt.is_none()
            && self.content.is_none()
            && self.published.is_none()
    }

    /// Applies the changes to an in-memory post.
    pub fn apply(self, post: &mut Post) {
        if let Some(title) = self.title {
            post.title = title;
        }
        if let Some(date) = self.date {
            post.date = date;
        }
        if let Some(author) = self.author {
            post.author = author;
        }
        if let Some(tags) = self.tags {
            post.tags = tags;
        }
        if let Some(cover_url) = self.cover_url {
            post.cover_url = cover_url;
        }
        if let Some(excerpt) = self.excerpt {
            post.excerpt = excerpt;
        }
        if let Some(content) = self.content {
            post.content = content;
        }
        if let Some(published) = self.published {
            post.published = published;
        }
    }
}

/// TagsInput
///
/// Tags arrive either as a JSON array or as one comma-delimited string
/// (the admin form sends `"coaching, leadership"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(untagged)]
#[ts(export)]
pub enum TagsInput {
    List(Vec<String>),
    Csv(String),
}

impl TagsInput {
    /// Splits the comma form, trimming each piece and dropping empty ones.
    /// Order is preserved in both forms.
    pub fn normalize(self) -> Vec<String> {
        match self {
            TagsInput::List(tags) => tags,
            TagsInput::Csv(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

/// --- Request Payloads (Input Schemas) ---

/// CreatePostRequest
///
/// Input payload for `POST /api/posts`. Everything is optional: an empty title falls
/// back to the default slug base, a missing date means "now", `published` defaults to true.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreatePostRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// RFC 3339 timestamp or `YYYY-MM-DD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<TagsInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
}

/// UpdatePostRequest
///
/// Partial update payload for `PUT /api/posts/{id}`.
///
/// The nullable columns use a double `Option` so that an omitted key (`None`) and an
/// explicit `null` (`Some(None)`) stay distinguishable. `slug` is not accepted here;
/// unknown keys are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdatePostRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    #[ts(type = "string | null")]
    pub author: Option<Option<String>>,

    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<TagsInput>)]
    #[ts(type = "TagsInput | null")]
    pub tags: Option<Option<TagsInput>>,

    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    #[ts(type = "string | null")]
    pub cover_url: Option<Option<String>>,

    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    #[ts(type = "string | null")]
    pub excerpt: Option<Option<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
}

/// Present key (even `null`) becomes `Some(..)`; an absent key falls back to `default`.
fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// LoginRequest
///
/// Body of `POST /api/auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: String,
}

/// Query string of the login page.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoginPageQuery {
    pub next: Option<String>,
}

/// ContactRequest
///
/// Inquiry submitted from the contact section. `website` is a honeypot field that
/// real visitors never see.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ContactRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub message: Option<String>,
    pub website: Option<String>,
}

/// --- Output Schemas ---

/// OkResponse
///
/// Acknowledgement body for login, logout, delete and contact.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

/// HealthResponse
///
/// Liveness plus a database round-trip.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub ok: bool,
    pub database: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
