use crate::{comments::CreateCommentRequest, context::RequestContext};

pub(crate) async fn handler(
    post_id: i64,
    state: ::std::sync::Arc<crate::State>,
    context: RequestContext,
    bytes: ::bytes::Bytes,
) -> Result<Box<dyn ::warp::Reply>, ::warp::Rejection> {
    let request: CreateCommentRequest =
        crate::warp_try_forum!(super::util::parse_json(&bytes));

    let comment = crate::warp_try_forum!(
        state.comments.create(&context, post_id, request).await
    );

    Ok(super::util::success(&comment))
}
