//! Dashboard aggregations over the article and user collections.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{PublisherCount, Role, RoleCount, UserStats},
    repository::RepositoryState,
};

/// Header row expected by the dashboard chart.
pub const PUBLISHER_CHART_HEADER: (&str, &str) = ("Publisher", "Articles");

/// ChartCell
///
/// A chart cell is either a label or a count; rows serialize as JSON arrays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
#[serde(untagged)]
pub enum ChartCell {
    Label(String),
    Count(i64),
}

pub type ChartRow = (String, ChartCell);

/// Publisher counts prefixed with the fixed header pair.
pub fn publisher_chart(counts: Vec<PublisherCount>) -> Vec<ChartRow> {
    let (label, value) = PUBLISHER_CHART_HEADER;
    std::iter::once((label.to_string(), ChartCell::Label(value.to_string())))
        .chain(
            counts
                .into_iter()
                .map(|row| (row.publisher, ChartCell::Count(row.count))),
        )
        .collect()
}

/// Folds grouped role counts into the summary. A role with no row counts as zero.
pub fn user_stats(groups: &[RoleCount], total_users: i64, premium_users: i64) -> UserStats {
    let count_of = |role: Role| {
        groups
            .iter()
            .filter(|g| g.role == role)
            .map(|g| g.count)
            .sum::<i64>()
    };
    UserStats {
        total_users,
        normal_users: count_of(Role::User),
        admin_users: count_of(Role::Admin),
        premium_users,
    }
}

/// AggregationReporter
pub struct AggregationReporter {
    repo: RepositoryState,
}

impl AggregationReporter {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    pub async fn publisher_article_counts(&self) -> AppResult<Vec<ChartRow>> {
        let counts = self.repo.count_articles_by_publisher().await?;
        Ok(publisher_chart(counts))
    }

    pub async fn user_role_counts(&self) -> AppResult<UserStats> {
        let groups = self.repo.count_users_by_role().await?;
        let total_users = self.repo.count_users().await?;
        let premium_users = self.repo.count_premium_users().await?;
        Ok(user_stats(&groups, total_users, premium_users))
    }
}
