use crate::{context::RequestContext, error::ForumError, posts::CreatePostRequest};

pub(crate) async fn handler(
    state: ::std::sync::Arc<crate::State>,
    context: RequestContext,
    bytes: ::bytes::Bytes,
) -> Result<Box<dyn ::warp::Reply>, ::warp::Rejection> {
    let request: CreatePostRequest =
        crate::warp_try_forum!(super::util::parse_json(&bytes));

    let result = state.posts.create(&context, request).await;

    if let Err(ForumError::ContentRejected(_)) = &result {
        super::util::count(&state, "posts.rejected");
    }

    let created = crate::warp_try_forum!(result);

    super::util::count(&state, "posts.created");

    Ok(super::util::success(&created))
}
