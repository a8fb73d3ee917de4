//! In-memory stores and scripted providers for orchestration tests.

use async_trait::async_trait;
use ::std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use crate::{
    error::{ForumError, ForumResult},
    model::{
        Category, CheckResolution, Comment, ImageCheckRecord, NewComment,
        NewImageCheck, NewPost, Post, PostCheckStatus, PostListQuery,
        PostSort, RecordStatus, Scene,
    },
    moderation::providers::interface::{
        ContentSafetyProvider, MediaKind, MediaSubmission, RiskLevel,
        TextVerdict,
    },
    storage::interface::StorageResolver,
    store::{
        CategoryStore, CommentStore, ImageCheckStore, LikeStore, PostStore,
    },
};

pub(crate) fn record(
    post_id: i64,
    trace_id: &str,
    status: RecordStatus,
) -> ImageCheckRecord {
    ImageCheckRecord {
        id: 0,
        post_id,
        image_url: format!("https://img.example/{}.jpg", trace_id),
        trace_id: trace_id.to_string(),
        status,
        suggest: String::new(),
        label: 0,
        prob: 0.0,
        strategy: String::new(),
        errcode: 0,
        errmsg: String::new(),
    }
}

pub(crate) fn new_post(category: &str, images: usize) -> NewPost {
    NewPost {
        title: String::from("title"),
        content: String::from("content"),
        excerpt: String::from("content"),
        author_openid: String::from("o-author"),
        category: category.to_string(),
        category_name: category.to_string(),
        tags: vec![],
        images: (0..images)
            .map(|index| format!("https://img.example/{}.jpg", index))
            .collect(),
        image_check_status: if images == 0 {
            PostCheckStatus::NotRequired
        } else {
            PostCheckStatus::Checking
        },
        is_public: true,
    }
}

pub(crate) fn callback_body(trace_id: &str, suggest: &str, errcode: i32) -> Vec<u8> {
    let label = if suggest == "pass" { 100 } else { 20001 };
    let errmsg = if errcode == 0 { "ok" } else { "system error" };

    ::serde_json::to_vec(&::serde_json::json!({
        "ToUserName": "gh_38cc2ef4e9dc",
        "FromUserName": "o-system",
        "CreateTime": 1626959646,
        "MsgType": "event",
        "Event": "wxa_media_check",
        "appid": "wx8f16a5e0f1b7bca6",
        "trace_id": trace_id,
        "version": 2,
        "detail": [{
            "strategy": "content_model",
            "errcode": 0,
            "suggest": suggest,
            "label": label,
            "prob": 90,
        }],
        "errcode": errcode,
        "errmsg": errmsg,
        "result": {
            "suggest": suggest,
            "label": label,
        },
    }))
    .unwrap()
}

/// Statuses the listing shows. Mirrors the Postgres listing filter.
pub(crate) fn is_listable(status: PostCheckStatus) -> bool {
    matches!(status, PostCheckStatus::NotRequired | PostCheckStatus::Passed)
}

fn test_category(code: &str, sort: i32) -> Category {
    Category {
        code: code.to_string(),
        name: code.to_uppercase(),
        icon: String::new(),
        description: String::new(),
        post_count: 0,
        sort,
    }
}

#[derive(Default)]
struct Tables {
    next_id: i64,
    posts: BTreeMap<i64, Post>,
    records: Vec<ImageCheckRecord>,
    categories: Vec<Category>,
    comments: Vec<Comment>,
    likes: HashSet<(String, i64)>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

pub(crate) struct MemoryStore {
    tables: Mutex<Tables>,
    fail_record_updates: AtomicBool,
    fail_counters: AtomicBool,
}

impl MemoryStore {
    pub(crate) fn new() -> Arc<Self> {
        let tables = Tables {
            categories: vec![
                test_category("all", 0),
                test_category("tech", 1),
                test_category("life", 2),
            ],
            ..Default::default()
        };

        Arc::new(MemoryStore {
            tables: Mutex::new(tables),
            fail_record_updates: AtomicBool::new(false),
            fail_counters: AtomicBool::new(false),
        })
    }

    fn tables(&self) -> ::std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }

    pub(crate) fn insert_post(&self, status: PostCheckStatus) -> i64 {
        self.insert_post_with_images(status, 0)
    }

    pub(crate) fn insert_post_with_images(
        &self,
        status: PostCheckStatus,
        images: usize,
    ) -> i64 {
        let mut tables = self.tables();
        let id = tables.next_id();
        let mut post = stored_post(id, &new_post("tech", images));
        post.image_check_status = status;
        tables.posts.insert(id, post);
        id
    }

    pub(crate) fn insert_record(&self, mut record: ImageCheckRecord) {
        let mut tables = self.tables();
        record.id = tables.next_id();
        tables.records.push(record);
    }

    pub(crate) fn set_record_status(&self, trace_id: &str, status: RecordStatus) {
        for record in self.tables().records.iter_mut() {
            if record.trace_id == trace_id {
                record.status = status;
            }
        }
    }

    pub(crate) fn record_status(&self, trace_id: &str) -> Option<RecordStatus> {
        self.tables()
            .records
            .iter()
            .find(|record| record.trace_id == trace_id)
            .map(|record| record.status)
    }

    pub(crate) fn records_for(&self, post_id: i64) -> Vec<ImageCheckRecord> {
        self.tables()
            .records
            .iter()
            .filter(|record| record.post_id == post_id)
            .cloned()
            .collect()
    }

    pub(crate) fn post(&self, post_id: i64) -> Option<Post> {
        self.tables().posts.get(&post_id).cloned()
    }

    pub(crate) fn post_status(&self, post_id: i64) -> PostCheckStatus {
        self.post(post_id)
            .map(|post| post.image_check_status)
            .unwrap()
    }

    pub(crate) fn post_count(&self) -> usize {
        self.tables().posts.len()
    }

    pub(crate) fn record_count(&self) -> usize {
        self.tables().records.len()
    }

    pub(crate) fn category_post_count(&self, code: &str) -> i32 {
        self.tables()
            .categories
            .iter()
            .find(|category| category.code == code)
            .map(|category| category.post_count)
            .unwrap()
    }

    pub(crate) fn comment_count(&self) -> usize {
        self.tables().comments.len()
    }

    pub(crate) fn fail_record_updates(&self) {
        self.fail_record_updates.store(true, Ordering::SeqCst);
    }

    /// Counter increments (category posts, views, comments) fail.
    pub(crate) fn fail_counters(&self) {
        self.fail_counters.store(true, Ordering::SeqCst);
    }

    fn counter_result(&self) -> ForumResult<()> {
        if self.fail_counters.load(Ordering::SeqCst) {
            Err(ForumError::Persistence(::sqlx::Error::PoolTimedOut))
        } else {
            Ok(())
        }
    }
}

fn stored_post(id: i64, post: &NewPost) -> Post {
    Post {
        id,
        title: post.title.clone(),
        content: post.content.clone(),
        excerpt: post.excerpt.clone(),
        author_openid: post.author_openid.clone(),
        category: post.category.clone(),
        category_name: post.category_name.clone(),
        tags: post.tags.clone(),
        images: post.images.clone(),
        image_check_status: post.image_check_status,
        is_public: post.is_public,
        is_deleted: false,
        likes: 0,
        comments: 0,
        views: 0,
        shares: 0,
        created_at_ms: id,
        updated_at_ms: id,
    }
}

#[async_trait]
impl ImageCheckStore for MemoryStore {
    async fn create(
        &self,
        record: &NewImageCheck,
    ) -> ForumResult<ImageCheckRecord> {
        let mut tables = self.tables();

        if tables
            .records
            .iter()
            .any(|existing| existing.trace_id == record.trace_id)
        {
            return Err(ForumError::DuplicateTraceId(record.trace_id.clone()));
        }

        let mut created =
            crate::test_utils::record(record.post_id, &record.trace_id, RecordStatus::Checking);
        created.id = tables.next_id();
        created.image_url = record.image_url.clone();
        tables.records.push(created.clone());

        Ok(created)
    }

    async fn get_by_trace_id(
        &self,
        trace_id: &str,
    ) -> ForumResult<ImageCheckRecord> {
        self.tables()
            .records
            .iter()
            .find(|record| record.trace_id == trace_id)
            .cloned()
            .ok_or_else(|| ForumError::NotFound(format!("image check {}", trace_id)))
    }

    async fn update_status(
        &self,
        trace_id: &str,
        resolution: &CheckResolution,
    ) -> ForumResult<()> {
        if self.fail_record_updates.load(Ordering::SeqCst) {
            return Err(ForumError::Persistence(::sqlx::Error::PoolTimedOut));
        }

        let mut tables = self.tables();
        let record = tables
            .records
            .iter_mut()
            .find(|record| record.trace_id == trace_id)
            .ok_or_else(|| ForumError::NotFound(format!("image check {}", trace_id)))?;

        record.status = resolution.status;
        record.suggest = resolution.suggest.clone();
        record.label = resolution.label;
        record.prob = resolution.prob;
        record.strategy = resolution.strategy.clone();
        record.errcode = resolution.errcode;
        record.errmsg = resolution.errmsg.clone();

        Ok(())
    }

    async fn list_by_post_id(
        &self,
        post_id: i64,
    ) -> ForumResult<Vec<ImageCheckRecord>> {
        Ok(self.records_for(post_id))
    }

    async fn delete_by_post_id(&self, post_id: i64) -> ForumResult<u64> {
        let mut tables = self.tables();
        let before = tables.records.len();
        tables.records.retain(|record| record.post_id != post_id);
        Ok((before - tables.records.len()) as u64)
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn create(&self, post: &NewPost) -> ForumResult<i64> {
        let mut tables = self.tables();
        let id = tables.next_id();
        tables.posts.insert(id, stored_post(id, post));
        Ok(id)
    }

    async fn get_by_id(&self, post_id: i64) -> ForumResult<Post> {
        self.tables()
            .posts
            .get(&post_id)
            .filter(|post| !post.is_deleted)
            .cloned()
            .ok_or_else(|| ForumError::NotFound(format!("post {}", post_id)))
    }

    async fn update_image_check_status(
        &self,
        post_id: i64,
        status: PostCheckStatus,
    ) -> ForumResult<bool> {
        let mut tables = self.tables();

        match tables.posts.get_mut(&post_id) {
            Some(post) if post.image_check_status == PostCheckStatus::Checking => {
                post.image_check_status = status;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_listable(
        &self,
        query: &PostListQuery,
    ) -> ForumResult<(Vec<Post>, i64)> {
        let tables = self.tables();

        let mut posts = tables
            .posts
            .values()
            .filter(|post| {
                !post.is_deleted
                    && post.is_public
                    && is_listable(post.image_check_status)
                    && query
                        .category
                        .as_ref()
                        .map(|category| &post.category == category)
                        .unwrap_or(true)
            })
            .cloned()
            .collect::<Vec<_>>();

        match query.sort {
            PostSort::Latest => posts.sort_by(|a, b| b.id.cmp(&a.id)),
            PostSort::Hot => posts.sort_by(|a, b| {
                (b.likes, b.views, b.id).cmp(&(a.likes, a.views, a.id))
            }),
            PostSort::Recommend => posts.sort_by(|a, b| {
                (b.likes, b.comments, b.id).cmp(&(a.likes, a.comments, a.id))
            }),
        }

        let total = posts.len() as i64;
        let page = posts
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.page_size as usize)
            .collect();

        Ok((page, total))
    }

    async fn increment_views(&self, post_id: i64) -> ForumResult<()> {
        self.counter_result()?;
        if let Some(post) = self.tables().posts.get_mut(&post_id) {
            post.views += 1;
        }
        Ok(())
    }

    async fn increment_comments(&self, post_id: i64) -> ForumResult<()> {
        self.counter_result()?;
        if let Some(post) = self.tables().posts.get_mut(&post_id) {
            post.comments += 1;
        }
        Ok(())
    }

    async fn soft_delete(&self, post_id: i64) -> ForumResult<()> {
        match self.tables().posts.get_mut(&post_id) {
            Some(post) if !post.is_deleted => {
                post.is_deleted = true;
                Ok(())
            }
            _ => Err(ForumError::NotFound(format!("post {}", post_id))),
        }
    }

    async fn delete(&self, post_id: i64) -> ForumResult<()> {
        self.tables().posts.remove(&post_id);
        Ok(())
    }
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn get_by_code(&self, code: &str) -> ForumResult<Option<Category>> {
        Ok(self
            .tables()
            .categories
            .iter()
            .find(|category| category.code == code)
            .cloned())
    }

    async fn list_active(&self) -> ForumResult<Vec<Category>> {
        let mut categories = self.tables().categories.clone();
        categories.sort_by_key(|category| category.sort);
        Ok(categories)
    }

    async fn increment_post_count(&self, code: &str) -> ForumResult<()> {
        self.counter_result()?;
        for category in self.tables().categories.iter_mut() {
            if category.code == code {
                category.post_count += 1;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn create(&self, comment: &NewComment) -> ForumResult<Comment> {
        let mut tables = self.tables();
        let id = tables.next_id();
        let created = Comment {
            id,
            post_id: comment.post_id,
            parent_id: comment.parent_id,
            author_openid: comment.author_openid.clone(),
            content: comment.content.clone(),
            created_at_ms: id,
        };
        tables.comments.push(created.clone());
        Ok(created)
    }

    async fn get_by_id(&self, comment_id: i64) -> ForumResult<Option<Comment>> {
        Ok(self
            .tables()
            .comments
            .iter()
            .find(|comment| comment.id == comment_id)
            .cloned())
    }

    async fn list_by_post_id(&self, post_id: i64) -> ForumResult<Vec<Comment>> {
        Ok(self
            .tables()
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl LikeStore for MemoryStore {
    async fn like(&self, openid: &str, post_id: i64) -> ForumResult<bool> {
        let mut tables = self.tables();

        if !tables.likes.insert((openid.to_string(), post_id)) {
            return Ok(false);
        }

        if let Some(post) = tables.posts.get_mut(&post_id) {
            post.likes += 1;
        }

        Ok(true)
    }

    async fn unlike(&self, openid: &str, post_id: i64) -> ForumResult<bool> {
        let mut tables = self.tables();

        if !tables.likes.remove(&(openid.to_string(), post_id)) {
            return Ok(false);
        }

        if let Some(post) = tables.posts.get_mut(&post_id) {
            post.likes = (post.likes - 1).max(0);
        }

        Ok(true)
    }

    async fn liked_post_ids(
        &self,
        openid: &str,
        post_ids: &[i64],
    ) -> ForumResult<HashSet<i64>> {
        let tables = self.tables();

        Ok(post_ids
            .iter()
            .copied()
            .filter(|post_id| tables.likes.contains(&(openid.to_string(), *post_id)))
            .collect())
    }
}

/// Content-safety provider answering from a script. Text is safe unless its
/// exact content was marked, media submissions yield `trace_1`, `trace_2`, ...
#[derive(Default)]
pub(crate) struct ScriptedProvider {
    text_suggests: Mutex<HashMap<String, String>>,
    text_unavailable: AtomicBool,
    failing_submission: Mutex<Option<usize>>,
    text_calls: Mutex<Vec<(String, Scene)>>,
    media_calls: Mutex<Vec<(String, String)>>,
    submissions: AtomicUsize,
}

impl ScriptedProvider {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(ScriptedProvider::default())
    }

    pub(crate) fn judge_text(&self, content: &str, suggest: &str) {
        self.text_suggests
            .lock()
            .unwrap()
            .insert(content.to_string(), suggest.to_string());
    }

    pub(crate) fn make_text_unavailable(&self) {
        self.text_unavailable.store(true, Ordering::SeqCst);
    }

    /// The nth media submission (1-based) is refused.
    pub(crate) fn refuse_submission(&self, nth: usize) {
        *self.failing_submission.lock().unwrap() = Some(nth);
    }

    pub(crate) fn text_calls(&self) -> Vec<(String, Scene)> {
        self.text_calls.lock().unwrap().clone()
    }

    /// `(openid, media_url)` per accepted or refused submission.
    pub(crate) fn media_calls(&self) -> Vec<(String, String)> {
        self.media_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentSafetyProvider for ScriptedProvider {
    async fn check_text(
        &self,
        _openid: &str,
        content: &str,
        scene: Scene,
    ) -> ForumResult<TextVerdict> {
        self.text_calls
            .lock()
            .unwrap()
            .push((content.to_string(), scene));

        if self.text_unavailable.load(Ordering::SeqCst) {
            return Err(ForumError::Provider(String::from("request timed out")));
        }

        let suggest = self
            .text_suggests
            .lock()
            .unwrap()
            .get(content)
            .cloned()
            .unwrap_or_else(|| String::from("pass"));
        let safe = suggest == "pass";

        Ok(TextVerdict {
            safe,
            label: if safe { 100 } else { 20002 },
            suggest,
            trace_id: None,
            risk_level: if safe { RiskLevel::Safe } else { RiskLevel::Medium },
            keywords: vec![],
        })
    }

    async fn submit_media(
        &self,
        openid: &str,
        media_url: &str,
        kind: MediaKind,
        _scene: Scene,
    ) -> ForumResult<MediaSubmission> {
        assert_eq!(kind, MediaKind::Image);

        self.media_calls
            .lock()
            .unwrap()
            .push((openid.to_string(), media_url.to_string()));

        let nth = self.submissions.fetch_add(1, Ordering::SeqCst) + 1;

        if *self.failing_submission.lock().unwrap() == Some(nth) {
            return Err(ForumError::Provider(String::from(
                "media_check_async errcode 45009: reach max api daily quota limit",
            )));
        }

        Ok(MediaSubmission {
            trace_id: format!("trace_{}", nth),
        })
    }
}

/// Resolves `cloud://<path>` to `https://tcb.example/<path>`.
#[derive(Default)]
pub(crate) struct MemoryResolver {
    missing: Mutex<HashSet<String>>,
}

impl MemoryResolver {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(MemoryResolver::default())
    }

    pub(crate) fn make_missing(&self, storage_id: &str) {
        self.missing.lock().unwrap().insert(storage_id.to_string());
    }
}

#[async_trait]
impl StorageResolver for MemoryResolver {
    async fn resolve(&self, storage_id: &str) -> ForumResult<String> {
        if self.missing.lock().unwrap().contains(storage_id) {
            return Err(ForumError::Provider(format!(
                "cannot resolve {}: status 1 STORAGE_FILE_NONEXIST",
                storage_id
            )));
        }

        Ok(format!(
            "https://tcb.example/{}",
            storage_id.trim_start_matches("cloud://")
        ))
    }
}
