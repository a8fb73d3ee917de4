use crate::context::RequestContext;

pub(crate) async fn handler(
    post_id: i64,
    state: ::std::sync::Arc<crate::State>,
    context: RequestContext,
) -> Result<Box<dyn ::warp::Reply>, ::warp::Rejection> {
    let post = crate::warp_try_forum!(state.posts.detail(post_id).await);

    let mut posts = [post];
    state.likes.mark_liked(&context, &mut posts).await;

    Ok(super::util::success(&posts[0]))
}
