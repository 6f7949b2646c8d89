//! Article and user query composition.
//!
//! An [`ArticleQuery`] is the single source of the listing predicate. The
//! listing and the count are both derived from it, for the Postgres store
//! through [`ArticleQuery::push_predicate`] and for in-process evaluation
//! through [`ArticleQuery::matches`].

use std::cmp::Ordering;

use sqlx::{Postgres, QueryBuilder};

use crate::models::{Article, ArticleStatus};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// ArticleFilter
///
/// Optional query parameters combined conjunctively. Blank values count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleFilter {
    pub publisher: Option<String>,
    pub tag: Option<String>,
    pub search: Option<String>,
}

impl ArticleFilter {
    pub fn new(publisher: Option<String>, tag: Option<String>, search: Option<String>) -> Self {
        Self {
            publisher: non_blank(publisher),
            tag: non_blank(tag),
            search: non_blank(search),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Visibility
///
/// Public readers only ever see approved articles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    ApprovedOnly,
    All,
}

/// ArticleSort
///
/// The public listing ranks by popularity, the admin listing by recency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleSort {
    PostedAsc,
    PostedDesc,
    MostViewed,
    LeastViewed,
}

impl ArticleSort {
    /// `sort=asc|desc` on the recency-sorted listing. Anything else means unsorted.
    pub fn by_recency(raw: Option<&str>) -> Option<Self> {
        match raw.map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case("asc") => Some(ArticleSort::PostedAsc),
            Some(s) if s.eq_ignore_ascii_case("desc") => Some(ArticleSort::PostedDesc),
            _ => None,
        }
    }

    /// `sort=true|false` on the popularity-sorted listing.
    pub fn by_popularity(flag: Option<bool>) -> Option<Self> {
        flag.map(|most_viewed_first| {
            if most_viewed_first {
                ArticleSort::MostViewed
            } else {
                ArticleSort::LeastViewed
            }
        })
    }
}

/// ArticleQuery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleQuery {
    pub filter: ArticleFilter,
    pub visibility: Visibility,
    pub sort: Option<ArticleSort>,
}

impl ArticleQuery {
    /// Listing for readers: approved articles only.
    pub fn public(filter: ArticleFilter) -> Self {
        Self {
            filter,
            visibility: Visibility::ApprovedOnly,
            sort: None,
        }
    }

    /// Listing for admins: every moderation status.
    pub fn privileged(filter: ArticleFilter) -> Self {
        Self {
            filter,
            visibility: Visibility::All,
            sort: None,
        }
    }

    pub fn sorted(mut self, sort: Option<ArticleSort>) -> Self {
        self.sort = sort;
        self
    }

    pub fn matches(&self, article: &Article) -> bool {
        if self.visibility == Visibility::ApprovedOnly && article.status != ArticleStatus::Approved {
            return false;
        }
        if let Some(publisher) = &self.filter.publisher {
            if &article.publisher != publisher {
                return false;
            }
        }
        if let Some(tag) = &self.filter.tag {
            if &article.tag != tag {
                return false;
            }
        }
        match &self.filter.search {
            Some(search) => article
                .title
                .to_lowercase()
                .contains(&search.to_lowercase()),
            None => true,
        }
    }

    /// Ordering used when no sort is requested: newest first.
    pub fn compare(&self, a: &Article, b: &Article) -> Ordering {
        let newest_first = b.posted_date.cmp(&a.posted_date).then_with(|| a.id.cmp(&b.id));
        match self.sort {
            Some(ArticleSort::PostedAsc) => {
                a.posted_date.cmp(&b.posted_date).then_with(|| a.id.cmp(&b.id))
            }
            Some(ArticleSort::PostedDesc) | None => newest_first,
            Some(ArticleSort::MostViewed) => b.view_count.cmp(&a.view_count).then(newest_first),
            Some(ArticleSort::LeastViewed) => a.view_count.cmp(&b.view_count).then(newest_first),
        }
    }

    /// Filters and orders an in-process collection.
    pub fn apply<I>(&self, articles: I) -> Vec<Article>
    where
        I: IntoIterator<Item = Article>,
    {
        let mut matched: Vec<Article> = articles.into_iter().filter(|a| self.matches(a)).collect();
        matched.sort_by(|a, b| self.compare(a, b));
        matched
    }

    /// Appends the `WHERE` clause. Shared by the listing and the count query.
    pub fn push_predicate(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder.push(" WHERE TRUE");
        if self.visibility == Visibility::ApprovedOnly {
            builder.push(" AND status = ");
            builder.push_bind(ArticleStatus::Approved);
        }
        if let Some(publisher) = &self.filter.publisher {
            builder.push(" AND publisher = ");
            builder.push_bind(publisher.clone());
        }
        if let Some(tag) = &self.filter.tag {
            builder.push(" AND tag = ");
            builder.push_bind(tag.clone());
        }
        if let Some(search) = &self.filter.search {
            builder.push(" AND title ILIKE ");
            builder.push_bind(format!("%{}%", escape_like(search)));
        }
    }

    pub fn push_order(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder.push(match self.sort {
            Some(ArticleSort::PostedAsc) => " ORDER BY posted_date ASC, id ASC",
            Some(ArticleSort::PostedDesc) | None => " ORDER BY posted_date DESC, id ASC",
            Some(ArticleSort::MostViewed) => {
                " ORDER BY view_count DESC, posted_date DESC, id ASC"
            }
            Some(ArticleSort::LeastViewed) => " ORDER BY view_count ASC, posted_date DESC, id ASC",
        });
    }
}

/// Escapes `LIKE` metacharacters so the search term matches literally.
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// UserPage
///
/// Zero-based page of the user listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserPage {
    pub page: u32,
    pub size: u32,
}

impl UserPage {
    pub fn new(page: Option<u32>, size: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(0),
            size: size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page) * i64::from(self.size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }
}
