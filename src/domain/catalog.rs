//! Sport catalog: category display names, upstream base queries and icons.
//!
//! The catalog is built once at startup and shared read-only (behind an
//! `Arc`) by the handler, the normalizer and the view model code.

use super::query::Category;
use std::collections::HashMap;

/// Icon used for an event whose sport cannot be recognized.
pub const DEFAULT_EVENT_ICON: &str = "🎯";

/// Icon used for a recognized sport with no dedicated glyph.
pub const GENERIC_SPORT_ICON: &str = "🏅";

/// Immutable lookup tables for categories and sports.
#[derive(Debug, Clone)]
pub struct SportCatalog {
    base_queries: HashMap<Category, String>,
    category_names: HashMap<Category, String>,
    icons: HashMap<String, String>,
}

impl Default for SportCatalog {
    fn default() -> Self {
        let base_queries = Category::ALL
            .into_iter()
            .map(|category| {
                let base = match category {
                    Category::All => "sports".to_string(),
                    other => other.id().to_string(),
                };
                (category, base)
            })
            .collect();

        let category_names = [
            (Category::All, "All Events"),
            (Category::Running, "Running"),
            (Category::Cycling, "Cycling"),
            (Category::Swimming, "Swimming"),
            (Category::Tennis, "Tennis"),
            (Category::Basketball, "Basketball"),
            (Category::Soccer, "Soccer"),
            (Category::Fitness, "Fitness"),
            (Category::Outdoor, "Outdoor"),
            (Category::Esports, "Esports"),
        ]
        .into_iter()
        .map(|(c, name)| (c, name.to_string()))
        .collect();

        let icons = [
            ("soccer", "⚽"),
            ("football", "⚽"),
            ("basketball", "🏀"),
            ("baseball", "⚾"),
            ("american_football", "🏈"),
            ("ice_hockey", "🏒"),
            ("hockey", "🏒"),
            ("volleyball", "🏐"),
            ("boxing", "🥊"),
            ("fighting", "🥊"),
            ("mma", "🥋"),
            ("golf", "⛳"),
            ("tennis", "🎾"),
            ("cricket", "🏏"),
            ("rugby", "🏉"),
            ("cycling", "🚴"),
            ("running", "🏃"),
            ("marathon", "🏃"),
            ("athletics", "🏃"),
            ("swimming", "🏊"),
            ("fitness", "💪"),
            ("outdoor", "🏞️"),
            ("hiking", "🥾"),
            ("skiing", "🎿"),
            ("f1", "🏎️"),
            ("esports", "🎮"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            base_queries,
            category_names,
            icons,
        }
    }
}

impl SportCatalog {
    /// Upstream query for a category and free text.
    ///
    /// The category's base term always leads; non-blank search text follows it
    /// after a single space.
    ///
    /// ```
    /// use event_compass::domain::{Category, SportCatalog};
    ///
    /// let catalog = SportCatalog::default();
    /// assert_eq!(catalog.compose_query(Category::All, ""), "sports");
    /// assert_eq!(catalog.compose_query(Category::Running, "marathon"), "running marathon");
    /// ```
    #[must_use]
    pub fn compose_query(&self, category: Category, search_text: &str) -> String {
        let base = self
            .base_queries
            .get(&category)
            .map_or("sports", String::as_str);
        let text = search_text.trim();
        if text.is_empty() {
            base.to_string()
        } else {
            format!("{base} {text}")
        }
    }

    #[must_use]
    pub fn category_name(&self, category: Category) -> &str {
        self.category_names
            .get(&category)
            .map_or_else(|| category.id(), String::as_str)
    }

    /// Icon for a sport key such as `"ice hockey"` or `"Soccer"`.
    #[must_use]
    pub fn icon_for_sport(&self, sport: &str) -> Option<&str> {
        let key = sport.trim().to_lowercase().split_whitespace().collect::<Vec<_>>().join("_");
        if key.is_empty() {
            return None;
        }
        self.icons.get(&key).map(String::as_str)
    }

    /// Best icon for an event given its category hints and title.
    ///
    /// Category-like hints are checked first, then each word of the title.
    /// A hint that names an unknown sport still gets the generic sport icon.
    #[must_use]
    pub fn icon_for_event<'a, I>(&self, hints: I, title: &str) -> String
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut saw_hint = false;
        for hint in hints {
            if hint.trim().is_empty() {
                continue;
            }
            saw_hint = true;
            if let Some(icon) = self.icon_for_sport(hint) {
                return icon.to_string();
            }
        }

        let from_title = title
            .split(|c: char| !c.is_alphanumeric())
            .find_map(|word| self.icon_for_sport(word));

        match from_title {
            Some(icon) => icon.to_string(),
            None if saw_hint => GENERIC_SPORT_ICON.to_string(),
            None => DEFAULT_EVENT_ICON.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_search_text_is_not_appended() {
        let catalog = SportCatalog::default();
        assert_eq!(catalog.compose_query(Category::Soccer, "   "), "soccer");
    }

    #[test]
    fn multi_word_sports_use_snake_case_keys() {
        let catalog = SportCatalog::default();
        assert_eq!(catalog.icon_for_sport("Ice Hockey"), Some("🏒"));
    }

    #[test]
    fn icon_falls_back_through_hints_title_and_default() {
        let catalog = SportCatalog::default();
        assert_eq!(catalog.icon_for_event(["tennis"], "Open"), "🎾");
        assert_eq!(catalog.icon_for_event(std::iter::empty::<&str>(), "City Marathon 2025"), "🏃");
        assert_eq!(catalog.icon_for_event(["lacrosse"], "Finals"), GENERIC_SPORT_ICON);
        assert_eq!(catalog.icon_for_event(std::iter::empty::<&str>(), "Meetup"), DEFAULT_EVENT_ICON);
    }
}
