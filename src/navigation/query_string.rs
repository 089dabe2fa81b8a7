//! Query-string codec for the list view's descriptor.
//!
//! Only user-entered fields travel in the link. Device coordinates and map
//! bounds are environment inputs and are never serialized, so a parsed
//! descriptor always has both unset.
//!
//! # Keys
//!
//! | Key    | Field           | Omitted when |
//! |--------|-----------------|--------------|
//! | `q`    | `search_text`   | empty        |
//! | `cat`  | `category`      | `all`        |
//! | `loc`  | `location_mode` | `all`        |
//! | `sort` | `sort_key`      | `date`       |
//! | `view` | `view_mode`     | `grid`       |

use crate::domain::{Category, LocationMode, QueryDescriptor, SortKey, ViewMode};
use url::form_urlencoded;

const SEARCH_KEY: &str = "q";
const CATEGORY_KEY: &str = "cat";
const LOCATION_KEY: &str = "loc";
const SORT_KEY: &str = "sort";
const VIEW_KEY: &str = "view";

/// Parses a query string into a descriptor.
///
/// A leading `?` is ignored. Missing keys, unknown values and unknown keys
/// all fall back to defaults, so any input yields a usable descriptor. When a
/// key repeats, its first occurrence wins.
///
/// ```
/// use event_compass::domain::{Category, SortKey};
/// use event_compass::navigation::parse_query_string;
///
/// let d = parse_query_string("?q=marathon&cat=running&sort=popular");
/// assert_eq!(d.search_text, "marathon");
/// assert_eq!(d.category, Category::Running);
/// assert_eq!(d.sort_key, SortKey::Popularity);
/// ```
#[must_use]
pub fn parse_query_string(raw: &str) -> QueryDescriptor {
    let raw = raw.strip_prefix('?').unwrap_or(raw);
    let mut descriptor = QueryDescriptor::default();
    let mut seen = Vec::with_capacity(5);

    for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
        if seen.contains(&key) {
            continue;
        }
        match key.as_ref() {
            SEARCH_KEY => descriptor.search_text = value.into_owned(),
            CATEGORY_KEY => descriptor.category = Category::from_id(&value).unwrap_or_default(),
            LOCATION_KEY => {
                descriptor.location_mode = LocationMode::from_id(&value).unwrap_or_default();
            }
            SORT_KEY => descriptor.sort_key = sort_from_param(&value),
            VIEW_KEY => descriptor.view_mode = view_from_param(&value),
            other => {
                tracing::trace!(key = other, "ignoring unknown query parameter");
                continue;
            }
        }
        seen.push(key);
    }

    descriptor
}

/// Serializes a descriptor, omitting every field equal to its default.
///
/// Keys are emitted in a fixed order so equal descriptors always produce equal
/// strings. The result carries no leading `?` and is empty for the default
/// descriptor.
#[must_use]
pub fn to_query_string(descriptor: &QueryDescriptor) -> String {
    let mut out = form_urlencoded::Serializer::new(String::new());

    if !descriptor.search_text.is_empty() {
        out.append_pair(SEARCH_KEY, &descriptor.search_text);
    }
    if descriptor.category != Category::All {
        out.append_pair(CATEGORY_KEY, descriptor.category.id());
    }
    if descriptor.location_mode != LocationMode::All {
        out.append_pair(LOCATION_KEY, descriptor.location_mode.id());
    }
    match descriptor.sort_key {
        SortKey::Date => {}
        SortKey::Popularity => {
            out.append_pair(SORT_KEY, "popular");
        }
        SortKey::Price => {
            out.append_pair(SORT_KEY, "price");
        }
    }
    if descriptor.view_mode == ViewMode::List {
        out.append_pair(VIEW_KEY, "list");
    }

    out.finish()
}

fn sort_from_param(value: &str) -> SortKey {
    match value {
        "popular" | "popularity" => SortKey::Popularity,
        "price" => SortKey::Price,
        _ => SortKey::Date,
    }
}

fn view_from_param(value: &str) -> ViewMode {
    if value == "list" {
        ViewMode::List
    } else {
        ViewMode::Grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn every_reachable_descriptor() -> Vec<QueryDescriptor> {
        let texts = ["", "marathon", "5k & fun run", "ünïcode?=#"];
        let modes = [
            LocationMode::All,
            LocationMode::Nearby,
            LocationMode::City,
            LocationMode::Virtual,
        ];
        let sorts = [SortKey::Date, SortKey::Popularity, SortKey::Price];
        let layouts = [ViewMode::Grid, ViewMode::List];

        let mut all = Vec::new();
        for text in texts {
            for category in Category::ALL {
                for location_mode in modes {
                    for sort_key in sorts {
                        for view_mode in layouts {
                            all.push(QueryDescriptor {
                                search_text: text.to_string(),
                                category,
                                location_mode,
                                sort_key,
                                view_mode,
                                coordinates: None,
                                bounding_box: None,
                            });
                        }
                    }
                }
            }
        }
        all
    }

    #[test]
    fn serialization_round_trips() {
        for descriptor in every_reachable_descriptor() {
            let encoded = to_query_string(&descriptor);
            assert_eq!(parse_query_string(&encoded), descriptor, "via {encoded:?}");
        }
    }

    #[test]
    fn defaults_are_omitted() {
        assert_eq!(to_query_string(&QueryDescriptor::default()), "");
        let d = QueryDescriptor {
            category: Category::Tennis,
            view_mode: ViewMode::List,
            ..QueryDescriptor::default()
        };
        assert_eq!(to_query_string(&d), "cat=tennis&view=list");
    }

    #[test]
    fn unknown_values_fall_back_to_defaults() {
        let d = parse_query_string("cat=curling&loc=moon&sort=random&view=carousel&extra=1");
        assert_eq!(d, QueryDescriptor::default());
    }

    #[test]
    fn key_order_does_not_matter() {
        assert_eq!(
            parse_query_string("view=list&q=swim&cat=swimming"),
            parse_query_string("cat=swimming&q=swim&view=list"),
        );
    }

    #[test]
    fn popularity_alias_is_emitted_canonically() {
        let d = parse_query_string("sort=popularity");
        assert_eq!(d.sort_key, SortKey::Popularity);
        assert_eq!(to_query_string(&d), "sort=popular");
    }

    #[test]
    fn first_occurrence_wins() {
        assert_eq!(parse_query_string("q=a&q=b").search_text, "a");
    }
}
