//! Store keys and backend classification
//!
//! Every logical piece of app state has a `StoreKey`. Each key is served by
//! exactly one backend, decided by an exhaustive match so that adding a key
//! without classifying it fails to compile.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Backend responsible for a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Primitive key/value plugin
    Scalar,
    /// Column of the single app row in the relational database
    Structured,
    /// Append-only trace log table
    Log,
}

/// Logical identifier for a piece of persisted app state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StoreKey {
    AlternateSearchBarPosition,
    AutoFetchMetadata,
    Bookmarks,
    CheckForAppUpdates,
    DarkModeEnabled,
    DefaultToFolderView,
    DisplayHelp,
    DisplayOtherSyncsWarning,
    DisplayPermissions,
    DisplayUpdated,
    InstallationId,
    LastUpdated,
    LastUpgradeVersion,
    RemovedSync,
    SyncBookmarksToolbar,
    SyncEnabled,
    SyncInfo,
    TelemetryEnabled,
    TraceLog,
}

impl StoreKey {
    pub const ALL: [StoreKey; 19] = [
        StoreKey::AlternateSearchBarPosition,
        StoreKey::AutoFetchMetadata,
        StoreKey::Bookmarks,
        StoreKey::CheckForAppUpdates,
        StoreKey::DarkModeEnabled,
        StoreKey::DefaultToFolderView,
        StoreKey::DisplayHelp,
        StoreKey::DisplayOtherSyncsWarning,
        StoreKey::DisplayPermissions,
        StoreKey::DisplayUpdated,
        StoreKey::InstallationId,
        StoreKey::LastUpdated,
        StoreKey::LastUpgradeVersion,
        StoreKey::RemovedSync,
        StoreKey::SyncBookmarksToolbar,
        StoreKey::SyncEnabled,
        StoreKey::SyncInfo,
        StoreKey::TelemetryEnabled,
        StoreKey::TraceLog,
    ];

    /// Keys kept as columns of the app row
    pub const STRUCTURED: [StoreKey; 2] = [StoreKey::Bookmarks, StoreKey::RemovedSync];

    /// Which backend serves this key
    pub fn backend(self) -> Backend {
        match self {
            StoreKey::Bookmarks | StoreKey::RemovedSync => Backend::Structured,
            StoreKey::TraceLog => Backend::Log,
            StoreKey::AlternateSearchBarPosition
            | StoreKey::AutoFetchMetadata
            | StoreKey::CheckForAppUpdates
            | StoreKey::DarkModeEnabled
            | StoreKey::DefaultToFolderView
            | StoreKey::DisplayHelp
            | StoreKey::DisplayOtherSyncsWarning
            | StoreKey::DisplayPermissions
            | StoreKey::DisplayUpdated
            | StoreKey::InstallationId
            | StoreKey::LastUpdated
            | StoreKey::LastUpgradeVersion
            | StoreKey::SyncBookmarksToolbar
            | StoreKey::SyncEnabled
            | StoreKey::SyncInfo
            | StoreKey::TelemetryEnabled => Backend::Scalar,
        }
    }

    /// Persisted name: the native storage key, or the column name
    pub fn as_str(self) -> &'static str {
        match self {
            StoreKey::AlternateSearchBarPosition => "alternateSearchBarPosition",
            StoreKey::AutoFetchMetadata => "autoFetchMetadata",
            StoreKey::Bookmarks => "bookmarks",
            StoreKey::CheckForAppUpdates => "checkForAppUpdates",
            StoreKey::DarkModeEnabled => "darkModeEnabled",
            StoreKey::DefaultToFolderView => "defaultToFolderView",
            StoreKey::DisplayHelp => "displayHelp",
            StoreKey::DisplayOtherSyncsWarning => "displayOtherSyncsWarning",
            StoreKey::DisplayPermissions => "displayPermissions",
            StoreKey::DisplayUpdated => "displayUpdated",
            StoreKey::InstallationId => "installationId",
            StoreKey::LastUpdated => "lastUpdated",
            StoreKey::LastUpgradeVersion => "lastUpgradeVersion",
            StoreKey::RemovedSync => "removedSync",
            StoreKey::SyncBookmarksToolbar => "syncBookmarksToolbar",
            StoreKey::SyncEnabled => "syncEnabled",
            StoreKey::SyncInfo => "syncInfo",
            StoreKey::TelemetryEnabled => "telemetryEnabled",
            StoreKey::TraceLog => "traceLog",
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no key
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown store key: {0}")]
pub struct UnknownKey(pub String);

impl FromStr for StoreKey {
    type Err = UnknownKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StoreKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| UnknownKey(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_all_keys_are_distinct() {
        let set: HashSet<_> = StoreKey::ALL.iter().collect();
        assert_eq!(set.len(), StoreKey::ALL.len());

        let names: HashSet<_> = StoreKey::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(names.len(), StoreKey::ALL.len());
    }

    #[test]
    fn test_single_log_key() {
        let logs: Vec<_> = StoreKey::ALL
            .iter()
            .filter(|k| k.backend() == Backend::Log)
            .collect();
        assert_eq!(logs, vec![&StoreKey::TraceLog]);
    }

    #[test]
    fn test_structured_set_matches_classification() {
        let structured: Vec<_> = StoreKey::ALL
            .iter()
            .copied()
            .filter(|k| k.backend() == Backend::Structured)
            .collect();
        assert_eq!(structured, StoreKey::STRUCTURED.to_vec());
    }

    #[test]
    fn test_scalar_examples() {
        assert_eq!(StoreKey::TelemetryEnabled.backend(), Backend::Scalar);
        assert_eq!(StoreKey::LastUpdated.backend(), Backend::Scalar);
        assert_eq!(StoreKey::Bookmarks.backend(), Backend::Structured);
    }

    #[test]
    fn test_parse_round_trip() {
        for key in StoreKey::ALL {
            assert_eq!(key.as_str().parse::<StoreKey>().unwrap(), key);
        }
        assert!("notAKey".parse::<StoreKey>().is_err());
    }

    #[test]
    fn test_serde_name_matches_persisted_name() {
        let json = serde_json::to_string(&StoreKey::DisplayOtherSyncsWarning).unwrap();
        assert_eq!(json, "\"displayOtherSyncsWarning\"");
    }
}
