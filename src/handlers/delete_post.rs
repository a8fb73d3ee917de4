use crate::context::RequestContext;

pub(crate) async fn handler(
    post_id: i64,
    state: ::std::sync::Arc<crate::State>,
    context: RequestContext,
) -> Result<Box<dyn ::warp::Reply>, ::warp::Rejection> {
    crate::warp_try_forum!(state.posts.delete(&context, post_id).await);

    Ok(super::util::success(&::serde_json::json!({ "postId": post_id })))
}
