use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The domain tables that take part in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncTable {
    /// Hunting-log entries (`eintraege`)
    #[serde(rename = "eintraege")]
    Entries,
    /// Stored shot analyses
    #[serde(rename = "shot_analysis")]
    ShotAnalyses,
    /// POIs, stands, game cameras
    #[serde(rename = "map_features")]
    MapFeatures,
    /// GPS tracks recorded for an entry
    #[serde(rename = "tracking_data")]
    TrackingData,
    /// Photos and other attachments (`medien`)
    #[serde(rename = "medien")]
    Media,
}

impl SyncTable {
    /// Every tracked table, as returned by a full pull.
    pub const ALL: [SyncTable; 5] = [
        SyncTable::Entries,
        SyncTable::ShotAnalyses,
        SyncTable::MapFeatures,
        SyncTable::TrackingData,
        SyncTable::Media,
    ];

    /// Tables served by the stateless `GET /api/sync` feed. Media is left out.
    pub const FEED: [SyncTable; 4] = [
        SyncTable::Entries,
        SyncTable::ShotAnalyses,
        SyncTable::MapFeatures,
        SyncTable::TrackingData,
    ];

    /// SQL table name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncTable::Entries => "eintraege",
            SyncTable::ShotAnalyses => "shot_analysis",
            SyncTable::MapFeatures => "map_features",
            SyncTable::TrackingData => "tracking_data",
            SyncTable::Media => "medien",
        }
    }
}

impl fmt::Display for SyncTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncTable {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SyncTable::ALL
            .into_iter()
            .find(|table| table.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "Unknown table '{}'. Valid options: eintraege, shot_analysis, map_features, tracking_data, medien",
                    s
                )
            })
    }
}
