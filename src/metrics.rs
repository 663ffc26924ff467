//! Model health reports for both recommenders.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::model::Algorithm;
use crate::types::RecError;

/// Shape of the collaborative model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollaborativeMetrics {
    /// Always [`Algorithm::CollaborativeFiltering`].
    pub algorithm: Algorithm,
    /// Matrix rows.
    pub total_users: usize,
    /// Matrix columns.
    pub total_products: usize,
    /// Percentage of empty cells.
    pub sparsity: f64,
    /// Mean number of positive cells per row.
    pub avg_interactions_per_user: f64,
    /// Percentage of users that can be served; the fallback covers everyone.
    pub coverage_users: f64,
    /// Percentage of columns with at least one positive cell.
    pub coverage_products: f64,
}

/// Shape of the content model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentMetrics {
    /// Always [`Algorithm::ContentBased`].
    pub algorithm: Algorithm,
    /// Indexed products.
    pub total_products: usize,
    /// Percentage of products that can be recommended.
    pub coverage: f64,
    /// Mean blended similarity of sampled products to every other product.
    pub avg_similarity_score: f64,
    /// Learned TF-IDF terms.
    pub vocabulary_size: usize,
}

/// Which model a metrics request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetricsTarget {
    /// The collaborative model.
    Collaborative,
    /// The content model.
    #[default]
    Content,
}

impl FromStr for MetricsTarget {
    type Err = RecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "content" | "content_based" => Ok(MetricsTarget::Content),
            "collaborative" | "collaborative_filtering" => Ok(MetricsTarget::Collaborative),
            other => Err(RecError::InvalidArgument(format!(
                "unknown metrics target '{other}'"
            ))),
        }
    }
}

/// Metrics of one model, serialized without an enclosing tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricsSnapshot {
    /// Collaborative report.
    Collaborative(CollaborativeMetrics),
    /// Content report.
    Content(ContentMetrics),
}

impl MetricsSnapshot {
    /// Algorithm the report describes.
    pub fn algorithm(&self) -> Algorithm {
        match self {
            MetricsSnapshot::Collaborative(m) => m.algorithm,
            MetricsSnapshot::Content(m) => m.algorithm,
        }
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricsSnapshot::Collaborative(m) => {
                writeln!(f, "algorithm                 {}", m.algorithm)?;
                writeln!(f, "  total_users             {}", m.total_users)?;
                writeln!(f, "  total_products          {}", m.total_products)?;
                writeln!(f, "  sparsity                {:.2}%", m.sparsity)?;
                writeln!(f, "  avg_interactions/user   {:.2}", m.avg_interactions_per_user)?;
                writeln!(f, "  coverage_users          {:.1}%", m.coverage_users)?;
                write!(f, "  coverage_products       {:.1}%", m.coverage_products)
            }
            MetricsSnapshot::Content(m) => {
                writeln!(f, "algorithm                 {}", m.algorithm)?;
                writeln!(f, "  total_products          {}", m.total_products)?;
                writeln!(f, "  coverage                {:.1}%", m.coverage)?;
                writeln!(f, "  avg_similarity_score    {:.4}", m.avg_similarity_score)?;
                write!(f, "  vocabulary_size         {}", m.vocabulary_size)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_serializes_without_tag() {
        let snapshot = MetricsSnapshot::Content(ContentMetrics {
            algorithm: Algorithm::ContentBased,
            total_products: 3,
            coverage: 100.0,
            avg_similarity_score: 0.25,
            vocabulary_size: 12,
        });
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["algorithm"], "content_based");
        assert_eq!(json["vocabulary_size"], 12);
        assert_eq!(snapshot.algorithm(), Algorithm::ContentBased);
    }

    #[test]
    fn target_parses_aliases() {
        assert_eq!("Collaborative".parse::<MetricsTarget>().unwrap(), MetricsTarget::Collaborative);
        assert_eq!("content_based".parse::<MetricsTarget>().unwrap(), MetricsTarget::Content);
        assert!("hybrid".parse::<MetricsTarget>().is_err());
    }
}
