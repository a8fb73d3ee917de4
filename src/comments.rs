use ::log::{info, warn};
use ::serde::Deserialize;
use ::std::sync::Arc;

use crate::{
    context::RequestContext,
    error::{ForumError, ForumResult},
    model::{Comment, NewComment, Scene},
    moderation::providers::interface::ContentSafetyProvider,
    store::{CommentStore, PostStore},
};

pub(crate) const MAX_COMMENT_CHARS: usize = 500;

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateCommentRequest {
    #[serde(default)]
    pub content: String,
    pub parent_id: Option<i64>,
}

pub(crate) struct CommentService {
    comments: Arc<dyn CommentStore>,
    posts: Arc<dyn PostStore>,
    moderation: Arc<dyn ContentSafetyProvider>,
}

impl CommentService {
    pub(crate) fn new(
        comments: Arc<dyn CommentStore>,
        posts: Arc<dyn PostStore>,
        moderation: Arc<dyn ContentSafetyProvider>,
    ) -> Self {
        CommentService {
            comments,
            posts,
            moderation,
        }
    }

    pub(crate) async fn create(
        &self,
        context: &RequestContext,
        post_id: i64,
        request: CreateCommentRequest,
    ) -> ForumResult<Comment> {
        let length = request.content.trim().chars().count();
        if length == 0 || length > MAX_COMMENT_CHARS {
            return Err(ForumError::Validation(format!(
                "comment must be 1 to {} characters",
                MAX_COMMENT_CHARS
            )));
        }

        self.posts.get_by_id(post_id).await?;

        if let Some(parent_id) = request.parent_id {
            match self.comments.get_by_id(parent_id).await? {
                Some(parent) if parent.post_id == post_id => {}
                _ => {
                    return Err(ForumError::NotFound(format!(
                        "comment {}",
                        parent_id
                    )))
                }
            }
        }

        match context.openid.as_deref() {
            Some(openid) => {
                let verdict = self
                    .moderation
                    .check_text(openid, &request.content, Scene::Comment)
                    .await?;

                if !verdict.safe {
                    return Err(ForumError::ContentRejected(String::from(
                        "comment contains disallowed content, please revise and retry",
                    )));
                }
            }
            None => warn!("create comment without identity, text check skipped"),
        }

        let comment = self
            .comments
            .create(&NewComment {
                post_id,
                parent_id: request.parent_id,
                author_openid: context.openid.clone().unwrap_or_default(),
                content: request.content,
            })
            .await?;

        if let Err(err) = self.posts.increment_comments(post_id).await {
            warn!("failed to increment comments of post {}: {}", post_id, err);
        }

        info!("comment {} on post {}", comment.id, post_id);

        Ok(comment)
    }

    pub(crate) async fn list(&self, post_id: i64) -> ForumResult<Vec<Comment>> {
        self.posts.get_by_id(post_id).await?;
        self.comments.list_by_post_id(post_id).await
    }
}
