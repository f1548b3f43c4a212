//! Catalog data structures
//!
//! `CatalogItem` is the immutable snapshot of one entry of the remote catalog.
//! It carries enough of the series/season/film classification to derive a
//! display title and a destination directory for downloads.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::queue::{FILM_DIR, SERIES_DIR};

/// One entry of the remote catalog
///
/// Field names follow the Jellyfin item DTO so responses decode directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct CatalogItem {
    /// Globally unique item id
    pub id: String,
    /// Item name as shown by the server
    #[serde(default)]
    pub name: String,
    /// Whether the item has children
    #[serde(default)]
    pub is_folder: bool,
    /// Series name, empty for standalone works
    #[serde(default, deserialize_with = "null_as_default")]
    pub series_name: String,
    /// Season name, empty for standalone works
    #[serde(default, deserialize_with = "null_as_default")]
    pub season_name: String,
    /// Season number (episodic items only)
    #[serde(
        default,
        rename = "ParentIndexNumber",
        deserialize_with = "null_as_default"
    )]
    pub season_number: i32,
    /// Episode number (episodic items only)
    #[serde(default, rename = "IndexNumber", deserialize_with = "null_as_default")]
    pub episode_number: i32,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl CatalogItem {
    /// Create a folder item
    pub fn folder(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_folder: true,
            ..Default::default()
        }
    }

    /// Create a standalone leaf item (a film)
    pub fn film(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Create an episodic leaf item
    pub fn episode(
        id: impl Into<String>,
        name: impl Into<String>,
        series: impl Into<String>,
        season: i32,
        episode: i32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            series_name: series.into(),
            season_name: format!("Season {}", season),
            season_number: season,
            episode_number: episode,
            is_folder: false,
        }
    }

    /// Whether the item belongs to a series
    pub fn is_episodic(&self) -> bool {
        !self.series_name.is_empty()
    }

    /// Title used in the download list and for alphabetical ordering
    pub fn display_title(&self) -> String {
        if self.is_episodic() {
            format!(
                "{} • {} • {}. {}",
                self.series_name, self.season_name, self.episode_number, self.name
            )
        } else {
            format!("{} • {}", FILM_DIR, self.name)
        }
    }

    /// Label used in a navigation column
    pub fn column_label(&self) -> String {
        if self.is_episodic() && !self.is_folder {
            format!("{}. {}", self.episode_number, self.name)
        } else {
            self.name.clone()
        }
    }

    /// Destination directory relative to the download root
    ///
    /// `Series/<series>/<season>` for episodes, `Film` otherwise. Names come
    /// from the server, so each component is sanitized before use.
    pub fn relative_destination(&self) -> PathBuf {
        if self.is_episodic() {
            PathBuf::from(SERIES_DIR)
                .join(sanitize_component(&self.series_name))
                .join(sanitize_component(&self.season_name))
        } else {
            PathBuf::from(FILM_DIR)
        }
    }
}

/// Make a server-provided name safe to use as one path component
pub fn sanitize_component(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim();

    match trimmed {
        "" => "_".to_string(),
        "." | ".." => trimmed.replace('.', "_"),
        _ => trimmed.to_string(),
    }
}

/// Something the UI can render as a list row
///
/// Catalog entries and download tasks are distinct types that share this
/// capability rather than one union type.
pub trait DisplayRow {
    /// Main line of the row
    fn title(&self) -> String;

    /// Secondary line of the row
    fn description(&self) -> String;
}

impl DisplayRow for CatalogItem {
    fn title(&self) -> String {
        self.column_label()
    }

    fn description(&self) -> String {
        if self.is_folder {
            String::new()
        } else {
            self.display_title()
        }
    }
}

/// Body of an items listing response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemsResponse {
    /// Items in server order
    #[serde(default)]
    pub items: Vec<CatalogItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_jellyfin_item() {
        let json = r#"{
            "Name": "Pilot",
            "Id": "abc",
            "SeriesName": "Show",
            "SeasonName": "Season 1",
            "ParentIndexNumber": 1,
            "IndexNumber": 3,
            "IsFolder": false,
            "Type": "Episode"
        }"#;

        let item: CatalogItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.id, "abc");
        assert_eq!(item.season_number, 1);
        assert_eq!(item.episode_number, 3);
        assert!(!item.is_folder);
    }

    #[test]
    fn test_decode_sparse_item() {
        let json = r#"{"Items":[{"Id":"f1","Name":"Movies","IsFolder":true,"SeriesName":null}]}"#;

        let response: ItemsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.items.len(), 1);
        assert!(response.items[0].is_folder);
        assert!(response.items[0].series_name.is_empty());
        assert_eq!(response.items[0].episode_number, 0);
    }

    #[test]
    fn test_display_titles() {
        let episode = CatalogItem::episode("e1", "Pilot", "Show", 1, 2);
        assert_eq!(episode.display_title(), "Show • Season 1 • 2. Pilot");
        assert_eq!(episode.column_label(), "2. Pilot");

        let film = CatalogItem::film("m1", "Heat");
        assert_eq!(film.display_title(), "Film • Heat");
        assert_eq!(film.column_label(), "Heat");
    }

    #[test]
    fn test_relative_destination() {
        let episode = CatalogItem::episode("e1", "Pilot", "Show", 1, 2);
        assert_eq!(
            episode.relative_destination(),
            PathBuf::from("Series").join("Show").join("Season 1")
        );

        let film = CatalogItem::film("m1", "Heat");
        assert_eq!(film.relative_destination(), PathBuf::from("Film"));
    }

    #[test]
    fn test_destination_cannot_escape_root() {
        let mut episode = CatalogItem::episode("e1", "Pilot", "../../etc", 1, 2);
        episode.season_name = "..".to_string();

        let destination = episode.relative_destination();
        assert!(destination
            .components()
            .all(|c| matches!(c, std::path::Component::Normal(_))));
    }

    #[test]
    fn test_sanitize_component() {
        assert_eq!(sanitize_component("a/b"), "a_b");
        assert_eq!(sanitize_component("   "), "_");
        assert_eq!(sanitize_component(".."), "__");
        assert_eq!(sanitize_component("Season 1"), "Season 1");
    }
}
