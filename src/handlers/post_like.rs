use crate::{context::RequestContext, likes::LikeRequest};

pub(crate) async fn handler(
    post_id: i64,
    state: ::std::sync::Arc<crate::State>,
    context: RequestContext,
    bytes: ::bytes::Bytes,
) -> Result<Box<dyn ::warp::Reply>, ::warp::Rejection> {
    let request: LikeRequest =
        crate::warp_try_forum!(super::util::parse_json(&bytes));

    let like = crate::warp_try_forum!(
        state.likes.toggle(&context, post_id, request).await
    );

    Ok(super::util::success(&like))
}
