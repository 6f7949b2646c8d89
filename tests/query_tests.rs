use bulletin_backend::{
    InMemoryRepository,
    models::{Article, ArticleStatus, CreateArticleRequest, PremiumFlag, PublisherCount, Role, RoleCount},
    query::{ArticleFilter, ArticleQuery, ArticleSort, MAX_PAGE_SIZE, UserPage, escape_like},
    reports::{ChartCell, publisher_chart, user_stats},
    repository::Repository,
};
use chrono::{Duration, Utc};

fn article(title: &str, publisher: &str, tag: &str, status: ArticleStatus, views: i64, age_days: i64) -> Article {
    let mut a = Article::new_submission(
        CreateArticleRequest {
            title: title.into(),
            publisher: publisher.into(),
            tag: tag.into(),
            body: "body".into(),
        },
        "author@news.io",
        Utc::now() - Duration::days(age_days),
    );
    a.status = status;
    a.view_count = views;
    a
}

async fn seeded() -> InMemoryRepository {
    let repo = InMemoryRepository::new();
    for a in [
        article("Rust 2024 Released", "Daily", "tech", ArticleStatus::Approved, 50, 3),
        article("Election results", "Daily", "politics", ArticleStatus::Approved, 10, 2),
        article("rust belt economy", "Weekly", "tech", ArticleStatus::Approved, 5, 1),
        article("Rustacean meetup", "Daily", "tech", ArticleStatus::Pending, 99, 0),
        article("Declined rust rumor", "Daily", "tech", ArticleStatus::Declined, 0, 4),
    ] {
        repo.insert_article(&a).await.unwrap();
    }
    repo
}

fn filter(publisher: Option<&str>, tag: Option<&str>, search: Option<&str>) -> ArticleFilter {
    ArticleFilter::new(
        publisher.map(String::from),
        tag.map(String::from),
        search.map(String::from),
    )
}

// --- Predicate ---

#[tokio::test]
async fn test_public_listing_only_returns_approved() {
    let repo = seeded().await;
    let listed = repo
        .list_articles(&ArticleQuery::public(ArticleFilter::default()))
        .await
        .unwrap();

    assert_eq!(listed.len(), 3);
    assert!(listed.iter().all(|a| a.status == ArticleStatus::Approved));
}

#[tokio::test]
async fn test_filters_combine_conjunctively() {
    let repo = seeded().await;
    let query = ArticleQuery::public(filter(Some("Daily"), Some("tech"), Some("RUST")));
    let listed = repo.list_articles(&query).await.unwrap();

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].title, "Rust 2024 Released");
}

#[tokio::test]
async fn test_count_matches_listing_length() {
    let repo = seeded().await;
    for f in [
        ArticleFilter::default(),
        filter(Some("Daily"), None, None),
        filter(None, Some("tech"), Some("rust")),
        filter(Some("Nobody"), None, None),
    ] {
        let query = ArticleQuery::public(f);
        let listed = repo.list_articles(&query).await.unwrap();
        let count = repo.count_articles(&query).await.unwrap();
        assert_eq!(count, listed.len() as i64, "count diverged for {query:?}");
    }
}

#[tokio::test]
async fn test_privileged_listing_sees_every_status() {
    let repo = seeded().await;
    let query = ArticleQuery::privileged(filter(None, None, Some("rust")));
    assert_eq!(repo.count_articles(&query).await.unwrap(), 4);
}

#[test]
fn test_blank_filter_values_are_ignored() {
    assert_eq!(filter(Some("  "), Some(""), Some(" ")), ArticleFilter::default());
}

// --- Ordering ---

#[tokio::test]
async fn test_popularity_sort_both_directions() {
    let repo = seeded().await;

    let most = ArticleQuery::public(ArticleFilter::default())
        .sorted(ArticleSort::by_popularity(Some(true)));
    let views: Vec<i64> = repo.list_articles(&most).await.unwrap().iter().map(|a| a.view_count).collect();
    assert_eq!(views, vec![50, 10, 5]);

    let least = ArticleQuery::public(ArticleFilter::default())
        .sorted(ArticleSort::by_popularity(Some(false)));
    let views: Vec<i64> = repo.list_articles(&least).await.unwrap().iter().map(|a| a.view_count).collect();
    assert_eq!(views, vec![5, 10, 50]);
}

#[tokio::test]
async fn test_default_and_recency_ordering() {
    let repo = seeded().await;

    let default = repo
        .list_articles(&ArticleQuery::privileged(ArticleFilter::default()))
        .await
        .unwrap();
    assert!(default.windows(2).all(|w| w[0].posted_date >= w[1].posted_date));

    let asc = ArticleQuery::privileged(ArticleFilter::default())
        .sorted(ArticleSort::by_recency(Some("asc")));
    let listed = repo.list_articles(&asc).await.unwrap();
    assert_eq!(listed.first().unwrap().title, "Declined rust rumor");
    assert!(listed.windows(2).all(|w| w[0].posted_date <= w[1].posted_date));
}

#[test]
fn test_sort_parameter_parsing() {
    assert_eq!(ArticleSort::by_recency(Some("DESC")), Some(ArticleSort::PostedDesc));
    assert_eq!(ArticleSort::by_recency(Some("sideways")), None);
    assert_eq!(ArticleSort::by_popularity(None), None);
}

#[test]
fn test_like_metacharacters_are_escaped() {
    assert_eq!(escape_like("100%_done\\"), "100\\%\\_done\\\\");
    assert_eq!(escape_like("plain"), "plain");
}

// --- Paging ---

#[test]
fn test_user_page_defaults_and_clamping() {
    let page = UserPage::new(None, None);
    assert_eq!((page.offset(), page.limit()), (0, 10));

    let page = UserPage::new(Some(3), Some(5));
    assert_eq!((page.offset(), page.limit()), (15, 5));

    assert_eq!(UserPage::new(None, Some(0)).limit(), 1);
    assert_eq!(UserPage::new(None, Some(10_000)).limit(), i64::from(MAX_PAGE_SIZE));
}

// --- Reports ---

#[test]
fn test_publisher_chart_starts_with_header() {
    let rows = publisher_chart(vec![
        PublisherCount { publisher: "Daily".into(), count: 4 },
        PublisherCount { publisher: "Weekly".into(), count: 1 },
    ]);

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0], ("Publisher".to_string(), ChartCell::Label("Articles".into())));
    assert_eq!(rows[1], ("Daily".to_string(), ChartCell::Count(4)));
    assert_eq!(
        serde_json::to_value(&rows).unwrap(),
        serde_json::json!([["Publisher", "Articles"], ["Daily", 4], ["Weekly", 1]])
    );
}

#[test]
fn test_user_stats_missing_group_counts_as_zero() {
    let stats = user_stats(&[RoleCount { role: Role::User, count: 7 }], 7, 2);
    assert_eq!(stats.normal_users, 7);
    assert_eq!(stats.admin_users, 0);
    assert_eq!(stats.premium_users, 2);
}

#[tokio::test]
async fn test_publisher_counts_group_every_status() {
    let repo = seeded().await;
    let counts = repo.count_articles_by_publisher().await.unwrap();
    assert_eq!(
        counts,
        vec![
            PublisherCount { publisher: "Daily".into(), count: 4 },
            PublisherCount { publisher: "Weekly".into(), count: 1 },
        ]
    );
}

#[test]
fn test_new_submission_defaults() {
    let a = article("  Padded  ", "Daily", "tech", ArticleStatus::Pending, 0, 0);
    assert_eq!(a.title, "Padded");
    assert_eq!(a.premium, PremiumFlag::No);
    assert_eq!(a.decline_reason, None);
}
