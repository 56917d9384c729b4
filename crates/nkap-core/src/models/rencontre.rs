//! Classified ads and dating profiles.

use serde::{Deserialize, Serialize};

use super::de;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    #[serde(deserialize_with = "de::number")]
    pub id: i64,
    pub nom: String,
    pub prenom: String,
    #[serde(default, deserialize_with = "de::optional_number")]
    pub age: Option<u32>,
    #[serde(default)]
    pub ville: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub sexe: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdKind {
    Amoureuse,
    Business,
    Autre,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ad {
    #[serde(deserialize_with = "de::number")]
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: AdKind,
    pub titre: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub utilisateur: Option<Profile>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewAd {
    #[serde(rename = "type")]
    pub kind: AdKind,
    pub titre: String,
    pub description: String,
}
