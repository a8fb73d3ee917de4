//! Domain types shared by the stores, the moderation pipeline and the
//! handlers.

/// Content-security scene. Selects the provider's policy set.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scene {
    Profile = 1,
    Comment = 2,
    Forum = 3,
    Social = 4,
}

impl Scene {
    pub(crate) fn code(self) -> u8 {
        self as u8
    }
}

/// The provider's categorical verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Suggest {
    Pass,
    Review,
    Risky,
}

impl Suggest {
    pub(crate) fn parse(value: &str) -> Option<Suggest> {
        match value {
            "pass" => Some(Suggest::Pass),
            "review" => Some(Suggest::Review),
            "risky" => Some(Suggest::Risky),
            _ => None,
        }
    }

    pub(crate) fn description(self) -> &'static str {
        match self {
            Suggest::Pass => "passed",
            Suggest::Review => "needs manual review",
            Suggest::Risky => "risky",
        }
    }
}

pub(crate) mod label {
    pub(crate) const NORMAL: i32 = 100;
    pub(crate) const PORN: i32 = 20001;
    pub(crate) const ABUSE: i32 = 20002;
    pub(crate) const POLITICS: i32 = 20003;
    pub(crate) const AD: i32 = 20006;
    pub(crate) const CRIME: i32 = 20008;
    pub(crate) const OTHER: i32 = 20012;

    pub(crate) fn description(label: i32) -> &'static str {
        match label {
            NORMAL => "normal",
            PORN => "pornography",
            ABUSE => "abuse",
            POLITICS => "politics",
            AD => "advertising",
            CRIME => "illegal activity",
            OTHER => "other",
            _ => "unknown",
        }
    }
}

/// Per-image moderation state.
///
/// `Pending` is never written by the submission path, records start at
/// `Checking` once the provider has accepted the job.
#[derive(::sqlx::Type, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i16)]
pub(crate) enum RecordStatus {
    Pending = 0,
    Checking = 1,
    Passed = 2,
    Failed = 3,
}

impl RecordStatus {
    pub(crate) fn is_terminal(self) -> bool {
        matches!(self, RecordStatus::Passed | RecordStatus::Failed)
    }

    /// Only `pass` publishes. `review`, `risky` and anything unrecognised fail.
    pub(crate) fn from_suggest(suggest: &str) -> RecordStatus {
        match Suggest::parse(suggest) {
            Some(Suggest::Pass) => RecordStatus::Passed,
            _ => RecordStatus::Failed,
        }
    }
}

/// Post-level moderation state. Governs listing visibility.
#[derive(::sqlx::Type, Debug, Clone, Copy, PartialEq, Eq)]
#[derive(::serde::Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub(crate) enum PostCheckStatus {
    NotRequired = 0,
    Checking = 1,
    Passed = 2,
    Failed = 3,
}

#[derive(::sqlx::FromRow, Debug, Clone, PartialEq)]
pub(crate) struct ImageCheckRecord {
    pub id: i64,
    pub post_id: i64,
    pub image_url: String,
    pub trace_id: String,
    pub status: RecordStatus,
    pub suggest: String,
    pub label: i32,
    pub prob: f64,
    pub strategy: String,
    pub errcode: i32,
    pub errmsg: String,
}

/// Fields needed to create an image check record. The store assigns the id
/// and the `Checking` status.
#[derive(Debug, Clone)]
pub(crate) struct NewImageCheck {
    pub post_id: i64,
    pub image_url: String,
    pub trace_id: String,
}

/// Provider outcome written onto a record when its callback arrives.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CheckResolution {
    pub status: RecordStatus,
    pub suggest: String,
    pub label: i32,
    pub prob: f64,
    pub strategy: String,
    pub errcode: i32,
    pub errmsg: String,
}

#[derive(::sqlx::FromRow, Debug, Clone, PartialEq)]
pub(crate) struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub author_openid: String,
    pub category: String,
    pub category_name: String,
    pub tags: Vec<String>,
    pub images: Vec<String>,
    pub image_check_status: PostCheckStatus,
    pub is_public: bool,
    pub is_deleted: bool,
    pub likes: i32,
    pub comments: i32,
    pub views: i32,
    pub shares: i32,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Debug, Clone)]
pub(crate) struct NewPost {
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub author_openid: String,
    pub category: String,
    pub category_name: String,
    pub tags: Vec<String>,
    pub images: Vec<String>,
    pub image_check_status: PostCheckStatus,
    pub is_public: bool,
}

#[derive(::sqlx::FromRow, ::serde::Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Category {
    pub code: String,
    pub name: String,
    pub icon: String,
    pub description: String,
    pub post_count: i32,
    pub sort: i32,
}

#[derive(::sqlx::FromRow, ::serde::Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub parent_id: Option<i64>,
    pub author_openid: String,
    pub content: String,
    pub created_at_ms: i64,
}

#[derive(Debug, Clone)]
pub(crate) struct NewComment {
    pub post_id: i64,
    pub parent_id: Option<i64>,
    pub author_openid: String,
    pub content: String,
}

#[derive(::serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub(crate) enum PostSort {
    #[default]
    Latest,
    Hot,
    Recommend,
}

/// Listing parameters after clamping.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PostListQuery {
    pub page: u32,
    pub page_size: u32,
    pub category: Option<String>,
    pub sort: PostSort,
}

impl PostListQuery {
    pub(crate) const DEFAULT_PAGE_SIZE: u32 = 10;
    pub(crate) const MAX_PAGE_SIZE: u32 = 50;

    pub(crate) fn new(
        page: Option<u32>,
        page_size: Option<u32>,
        category: Option<String>,
        sort: Option<PostSort>,
    ) -> Self {
        let page = page.filter(|page| *page >= 1).unwrap_or(1);
        let page_size = page_size
            .filter(|size| (1..=Self::MAX_PAGE_SIZE).contains(size))
            .unwrap_or(Self::DEFAULT_PAGE_SIZE);
        let category = category
            .filter(|category| !category.is_empty() && category != "all");

        PostListQuery {
            page,
            page_size,
            category,
            sort: sort.unwrap_or_default(),
        }
    }

    pub(crate) fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.page_size)
    }
}
