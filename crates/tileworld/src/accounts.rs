//! Named player accounts persisted as a JSON array.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::player::Marker;
use crate::save::write_atomic;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub name: String,
    #[serde(default)]
    pub x: i64,
    #[serde(default)]
    pub y: i64,
    #[serde(default)]
    pub inventory: BTreeMap<String, u32>,
    /// Base stat levels.
    #[serde(default)]
    pub stats: BTreeMap<String, i64>,
    #[serde(default)]
    pub xp: i64,
    #[serde(default)]
    pub markers: Vec<Marker>,
    #[serde(default)]
    pub shortcuts: BTreeMap<String, String>,
}

/// Keyed by lowercased name; each record keeps the spelling it was created with.
#[derive(Debug, Default)]
pub struct Accounts {
    by_name: HashMap<String, Account>,
}

fn key(name: &str) -> String {
    name.to_ascii_lowercase()
}

impl Accounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `path`; a missing file is an empty table, an unreadable one is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let mut by_name = HashMap::new();
        match std::fs::read_to_string(path) {
            Ok(s) => {
                for a in serde_json::from_str::<Vec<Account>>(&s)? {
                    by_name.insert(key(&a.name), a);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        info!(path = %path.display(), accounts = by_name.len(), "accounts loaded");
        Ok(Self { by_name })
    }

    pub fn to_json(&self) -> Result<String> {
        let mut v = self.by_name.values().collect::<Vec<_>>();
        v.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(serde_json::to_string_pretty(&v)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        write_atomic(path, self.to_json()?.as_bytes())
    }

    pub fn get(&self, name: &str) -> Option<&Account> {
        self.by_name.get(&key(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(&key(name))
    }

    pub fn upsert(&mut self, acct: Account) {
        self.by_name.insert(key(&acct.name), acct);
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ann() -> Account {
        Account {
            name: "ann".to_string(),
            x: 3,
            y: 4,
            inventory: BTreeMap::from([("bread".to_string(), 2)]),
            stats: BTreeMap::from([("speed".to_string(), 6)]),
            xp: 120,
            markers: vec![Marker {
                x: 3,
                y: 4,
                description: "camp".to_string(),
            }],
            shortcuts: BTreeMap::new(),
        }
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let accts = Accounts::load(&dir.path().join("nope.json")).unwrap();
        assert!(accts.is_empty());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("save").join("accounts.json");
        let mut accts = Accounts::load(&path).unwrap();
        accts.upsert(ann());
        accts.save_to(&path).unwrap();

        let back = Accounts::load(&path).unwrap();
        assert_eq!(back.get("ann"), Some(&ann()));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(Accounts::load(&path).is_err());
    }

    #[test]
    fn old_records_fill_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        std::fs::write(&path, r#"[{"name":"bo","xp":7}]"#).unwrap();
        let accts = Accounts::load(&path).unwrap();
        let bo = accts.get("bo").unwrap();
        assert_eq!(bo.xp, 7);
        assert!(bo.inventory.is_empty());
        assert!(bo.stats.is_empty());
    }

    #[test]
    fn names_match_without_case() {
        let mut accts = Accounts::new();
        let mut a = ann();
        a.name = "Ann".to_string();
        accts.upsert(a);
        assert!(accts.contains("ANN"));
        assert_eq!(accts.get("ann").map(|a| a.name.as_str()), Some("Ann"));

        accts.upsert(ann());
        assert_eq!(accts.len(), 1);
    }

    #[test]
    fn json_is_sorted_by_name() {
        let mut accts = Accounts::new();
        let mut zed = ann();
        zed.name = "zed".to_string();
        accts.upsert(zed);
        accts.upsert(ann());
        let json = accts.to_json().unwrap();
        let a = json.find("\"ann\"").unwrap();
        let z = json.find("\"zed\"").unwrap();
        assert!(a < z);
        assert!(json.contains("\"camp\""));
    }
}
