use crate::dom::ElementSnapshot;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Weight of one matched hint; larger than any geometric term so hints dominate
pub const HINT_WEIGHT: f64 = 1_000_000.0;

/// Geometric preference among validated matches of one strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scoring {
    /// All candidates equal; document order decides
    #[default]
    DocumentOrder,
    LargestArea,
    SmallestArea,
    /// Lowest on the page, where chat inputs usually sit
    Bottommost,
}

impl Scoring {
    fn geometric(&self, snapshot: &ElementSnapshot) -> f64 {
        let b = &snapshot.bounding_box;
        match self {
            Scoring::DocumentOrder => 0.0,
            Scoring::LargestArea => b.area(),
            Scoring::SmallestArea => -b.area(),
            Scoring::Bottommost => b.bottom(),
        }
    }
}

/// Score a candidate: hint matches first, then the geometric preference
pub fn score(snapshot: &ElementSnapshot, scoring: Scoring, hints: &[String]) -> f64 {
    let haystack = if hints.is_empty() {
        String::new()
    } else {
        let mut haystack = snapshot.label_haystack();
        if let Some(role) = snapshot.attribute("role") {
            haystack.push(' ');
            haystack.push_str(&role.to_lowercase());
        }
        haystack
    };

    let hint_matches = hints
        .iter()
        .filter(|hint| haystack.contains(&hint.to_lowercase()))
        .count();

    hint_matches as f64 * HINT_WEIGHT + scoring.geometric(snapshot)
}

/// Rank scored items best first; equal scores keep their incoming (document) order
pub fn rank<T>(items: &mut [(T, f64)]) {
    items.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{BoundingBox, ComputedStyle, ElementHandle};
    use std::collections::HashMap;

    fn snap(key: &str, w: f64, h: f64, y: f64) -> ElementSnapshot {
        ElementSnapshot {
            handle: ElementHandle::new(key),
            tag_name: "div".to_string(),
            attributes: HashMap::new(),
            bounding_box: BoundingBox::new(0.0, y, w, h),
            style: ComputedStyle::default(),
            disabled: false,
            read_only: false,
            content_editable: true,
            text: String::new(),
            value: None,
            svg_paths: Vec::new(),
            has_icon: false,
        }
    }

    #[test]
    fn test_geometric_preferences() {
        let small = snap("a", 10.0, 10.0, 0.0);
        let large = snap("b", 100.0, 10.0, 500.0);
        assert!(score(&large, Scoring::LargestArea, &[]) > score(&small, Scoring::LargestArea, &[]));
        assert!(score(&small, Scoring::SmallestArea, &[]) > score(&large, Scoring::SmallestArea, &[]));
        assert!(score(&large, Scoring::Bottommost, &[]) > score(&small, Scoring::Bottommost, &[]));
    }

    #[test]
    fn test_hints_outweigh_geometry() {
        let mut labeled = snap("a", 10.0, 10.0, 0.0);
        labeled.attributes.insert("role".to_string(), "textbox".to_string());
        let large = snap("b", 1000.0, 500.0, 0.0);
        let hints = vec!["textbox".to_string()];
        assert!(score(&labeled, Scoring::LargestArea, &hints) > score(&large, Scoring::LargestArea, &hints));
    }

    #[test]
    fn test_rank_is_stable_for_ties() {
        let mut items = vec![("first", 1.0), ("second", 2.0), ("third", 1.0), ("fourth", 2.0)];
        rank(&mut items);
        let order: Vec<_> = items.iter().map(|(name, _)| *name).collect();
        assert_eq!(order, vec!["second", "fourth", "first", "third"]);
    }
}
