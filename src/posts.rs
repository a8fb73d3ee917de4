use ::log::{debug, error, info, warn};
use ::serde::{Deserialize, Serialize};
use ::std::sync::Arc;

use crate::{
    context::RequestContext,
    error::{ForumError, ForumResult},
    model::{
        Category, NewImageCheck, NewPost, Post, PostCheckStatus, PostListQuery,
        Scene,
    },
    moderation::providers::interface::{ContentSafetyProvider, MediaKind},
    storage::interface::{fetchable_url, StorageResolver},
    store::{CategoryStore, ImageCheckStore, PostStore},
};

pub(crate) const MAX_TITLE_CHARS: usize = 100;
pub(crate) const EXCERPT_CHARS: usize = 200;

fn default_public() -> bool {
    true
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreatePostRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default = "default_public")]
    pub is_public: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreatedPost {
    pub post_id: i64,
    pub image_check_status: PostCheckStatus,
}

/// A post as returned to clients. Listings carry the excerpt only.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PostView {
    pub id: i64,
    pub title: String,
    pub excerpt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub category: String,
    pub category_name: String,
    pub tags: Vec<String>,
    pub images: Vec<String>,
    pub image_check_status: PostCheckStatus,
    pub likes: i32,
    pub comments: i32,
    pub views: i32,
    pub shares: i32,
    /// Whether the caller has liked the post. Filled in by
    /// `LikeService::mark_liked`.
    pub is_liked: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl PostView {
    fn new(post: Post, with_content: bool) -> Self {
        PostView {
            id: post.id,
            title: post.title,
            excerpt: post.excerpt,
            content: if with_content { Some(post.content) } else { None },
            category: post.category,
            category_name: post.category_name,
            tags: post.tags,
            images: post.images,
            image_check_status: post.image_check_status,
            likes: post.likes,
            comments: post.comments,
            views: post.views,
            shares: post.shares,
            is_liked: false,
            created_at: post.created_at_ms,
            updated_at: post.updated_at_ms,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Pagination {
    pub current: u32,
    pub page_size: u32,
    pub total: i64,
    pub has_more: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub(crate) struct PostPage {
    pub list: Vec<PostView>,
    pub pagination: Pagination,
}

fn validate(request: &CreatePostRequest) -> ForumResult<()> {
    if request.title.trim().is_empty() {
        return Err(ForumError::Validation(String::from("title is required")));
    }

    if request.title.chars().count() > MAX_TITLE_CHARS {
        return Err(ForumError::Validation(format!(
            "title is longer than {} characters",
            MAX_TITLE_CHARS
        )));
    }

    if request.content.trim().is_empty() {
        return Err(ForumError::Validation(String::from(
            "content is required",
        )));
    }

    if request.category.is_empty() || request.category == "all" {
        return Err(ForumError::Validation(String::from(
            "a category is required",
        )));
    }

    Ok(())
}

pub(crate) struct PostService {
    posts: Arc<dyn PostStore>,
    records: Arc<dyn ImageCheckStore>,
    categories: Arc<dyn CategoryStore>,
    moderation: Arc<dyn ContentSafetyProvider>,
    storage: Arc<dyn StorageResolver>,
}

impl PostService {
    pub(crate) fn new(
        posts: Arc<dyn PostStore>,
        records: Arc<dyn ImageCheckStore>,
        categories: Arc<dyn CategoryStore>,
        moderation: Arc<dyn ContentSafetyProvider>,
        storage: Arc<dyn StorageResolver>,
    ) -> Self {
        PostService {
            posts,
            records,
            categories,
            moderation,
            storage,
        }
    }

    async fn check_text(
        &self,
        openid: &str,
        text: &str,
        rejection: &str,
    ) -> ForumResult<()> {
        if text.is_empty() {
            return Ok(());
        }

        let verdict =
            self.moderation.check_text(openid, text, Scene::Forum).await?;

        if !verdict.safe {
            return Err(ForumError::ContentRejected(rejection.to_string()));
        }

        Ok(())
    }

    /// Create a post. Text is checked before anything is written. A post
    /// with images is stored as `Checking` and stays out of listings until
    /// every image callback has arrived.
    pub(crate) async fn create(
        &self,
        context: &RequestContext,
        request: CreatePostRequest,
    ) -> ForumResult<CreatedPost> {
        validate(&request)?;

        let category = self
            .categories
            .get_by_code(&request.category)
            .await?
            .ok_or_else(|| {
                ForumError::NotFound(format!("category {}", request.category))
            })?;

        debug!(
            "create post: author={}, unionid={}, appid={:?}, env={:?}, source={:?}, ip={:?}",
            context.masked_openid(),
            context.unionid.is_some(),
            context.appid,
            context.env,
            context.source,
            context.ip,
        );

        match context.openid.as_deref() {
            Some(openid) => {
                self.check_text(
                    openid,
                    &request.title,
                    "title contains disallowed content, please revise and retry",
                )
                .await?;
                self.check_text(
                    openid,
                    &request.content,
                    "content contains disallowed content, please revise and retry",
                )
                .await?;
            }
            None => {
                warn!("create post without identity, text check skipped");
            }
        }

        let images = request
            .images
            .into_iter()
            .filter(|image| !image.is_empty())
            .collect::<Vec<_>>();

        let mut post = NewPost {
            excerpt: crate::utils::excerpt(&request.content, EXCERPT_CHARS),
            title: request.title,
            content: request.content,
            author_openid: context.openid.clone().unwrap_or_default(),
            category: category.code,
            category_name: category.name,
            tags: request.tags,
            images,
            image_check_status: PostCheckStatus::NotRequired,
            is_public: request.is_public,
        };

        if post.images.is_empty() {
            let post_id = self.posts.create(&post).await?;

            if let Err(err) =
                self.categories.increment_post_count(&post.category).await
            {
                warn!(
                    "failed to increment post count of {}: {}",
                    post.category, err
                );
            }

            info!("created post {}", post_id);

            return Ok(CreatedPost {
                post_id,
                image_check_status: post.image_check_status,
            });
        }

        post.image_check_status = PostCheckStatus::Checking;
        let post_id = self.posts.create(&post).await?;

        let openid = context.openid.as_deref().unwrap_or_default();

        if let Err(err) = self.submit_images(post_id, openid, &post.images).await
        {
            self.discard(post_id).await;
            return Err(err);
        }

        info!(
            "created post {} with {} images awaiting moderation",
            post_id,
            post.images.len()
        );

        Ok(CreatedPost {
            post_id,
            image_check_status: post.image_check_status,
        })
    }

    async fn submit_images(
        &self,
        post_id: i64,
        openid: &str,
        images: &[String],
    ) -> ForumResult<()> {
        for (index, image) in images.iter().enumerate() {
            let media_url = fetchable_url(self.storage.as_ref(), image).await?;

            let submission = self
                .moderation
                .submit_media(openid, &media_url, MediaKind::Image, Scene::Forum)
                .await?;

            self.records
                .create(&NewImageCheck {
                    post_id,
                    image_url: image.clone(),
                    trace_id: submission.trace_id.clone(),
                })
                .await?;

            debug!(
                "post {} image {} submitted, trace_id={}",
                post_id,
                index + 1,
                submission.trace_id
            );
        }

        Ok(())
    }

    /// Remove a post whose image submission failed, with its records.
    async fn discard(&self, post_id: i64) {
        if let Err(err) = self.records.delete_by_post_id(post_id).await {
            error!("failed to delete image checks of post {}: {}", post_id, err);
        }

        if let Err(err) = self.posts.delete(post_id).await {
            error!("failed to delete aborted post {}: {}", post_id, err);
        }
    }

    pub(crate) async fn list(
        &self,
        query: &PostListQuery,
    ) -> ForumResult<PostPage> {
        let (posts, total) = self.posts.list_listable(query).await?;

        let has_more = query.offset() + (posts.len() as i64) < total;

        Ok(PostPage {
            list: posts
                .into_iter()
                .map(|post| PostView::new(post, false))
                .collect(),
            pagination: Pagination {
                current: query.page,
                page_size: query.page_size,
                total,
                has_more,
            },
        })
    }

    /// Detail of a post. The view counter is bumped in the background.
    pub(crate) async fn detail(&self, post_id: i64) -> ForumResult<PostView> {
        let post = self.posts.get_by_id(post_id).await?;

        let posts = self.posts.clone();
        ::tokio::spawn(async move {
            if let Err(err) = posts.increment_views(post_id).await {
                warn!("failed to increment views of post {}: {}", post_id, err);
            }
        });

        Ok(PostView::new(post, true))
    }

    pub(crate) async fn delete(
        &self,
        context: &RequestContext,
        post_id: i64,
    ) -> ForumResult<()> {
        let openid = context.require_openid()?;
        let post = self.posts.get_by_id(post_id).await?;

        if post.author_openid != openid {
            return Err(ForumError::Forbidden(String::from(
                "only the author can delete a post",
            )));
        }

        self.posts.soft_delete(post_id).await?;

        info!("post {} deleted by {}", post_id, context.masked_openid());

        Ok(())
    }

    pub(crate) async fn categories(&self) -> ForumResult<Vec<Category>> {
        self.categories.list_active().await
    }
}
