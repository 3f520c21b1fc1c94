use serde::Deserialize;
use serde_json::{Map, Value};

/// Percentage scores keyed by class label, in the order the analyzer
/// emitted them.
///
/// Order is significant: arg-max ties resolve to the earliest entry, so
/// the distribution never goes through a hash or sorted map.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct ScoreDistribution {
    entries: Vec<(String, f64)>,
}

impl ScoreDistribution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry, replacing the score in place if the label exists.
    pub fn insert(&mut self, label: impl Into<String>, score: f64) {
        let label = label.into();
        match self.entries.iter_mut().find(|(l, _)| *l == label) {
            Some(entry) => entry.1 = score,
            None => self.entries.push((label, score)),
        }
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, s)| *s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.entries.iter().map(|(l, s)| (l.as_str(), *s))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<L: Into<String>> FromIterator<(L, f64)> for ScoreDistribution {
    fn from_iter<T: IntoIterator<Item = (L, f64)>>(iter: T) -> Self {
        let mut dist = ScoreDistribution::new();
        for (label, score) in iter {
            dist.insert(label, score);
        }
        dist
    }
}

impl TryFrom<Map<String, Value>> for ScoreDistribution {
    type Error = String;

    // `serde_json` is built with `preserve_order`, so the map iterates in
    // document order.
    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        map.into_iter()
            .map(|(label, value)| match value.as_f64() {
                Some(score) => Ok((label, score)),
                None => Err(format!("score for {label} is not a number: {value}")),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preserves_insertion_order() {
        let dist: ScoreDistribution = [("sad", 1.0), ("angry", 2.0), ("happy", 3.0)]
            .into_iter()
            .collect();
        let labels: Vec<&str> = dist.iter().map(|(l, _)| l).collect();
        assert_eq!(labels, vec!["sad", "angry", "happy"]);
    }

    #[test]
    fn test_insert_existing_label_keeps_position() {
        let mut dist = ScoreDistribution::new();
        dist.insert("a", 1.0);
        dist.insert("b", 2.0);
        dist.insert("a", 5.0);
        assert_eq!(dist.len(), 2);
        assert_eq!(dist.iter().next(), Some(("a", 5.0)));
    }

    #[test]
    fn test_get_missing_label() {
        let dist: ScoreDistribution = [("happy", 70.0)].into_iter().collect();
        assert_eq!(dist.get("happy"), Some(70.0));
        assert_eq!(dist.get("sad"), None);
    }

    #[test]
    fn test_deserialize_keeps_json_order() {
        let dist: ScoreDistribution =
            serde_json::from_str(r#"{"surprise": 1.5, "angry": 2, "neutral": 0.25}"#).unwrap();
        let labels: Vec<&str> = dist.iter().map(|(l, _)| l).collect();
        assert_eq!(labels, vec!["surprise", "angry", "neutral"]);
        assert_eq!(dist.get("angry"), Some(2.0));
    }

    #[test]
    fn test_deserialize_rejects_non_numeric_scores() {
        let result: Result<ScoreDistribution, _> = serde_json::from_str(r#"{"happy": "lots"}"#);
        assert!(result.is_err());
    }
}
