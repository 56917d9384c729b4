//! Tontines: rotating-savings groups. All accounting happens server-side.

use serde::{Deserialize, Serialize};

use super::de;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    #[serde(deserialize_with = "de::number")]
    pub id: i64,
    pub nom: String,
    pub prenom: String,
}

impl Member {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.prenom, self.nom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tontine {
    #[serde(deserialize_with = "de::number")]
    pub id: i64,
    pub nom: String,
    pub code: String,
    #[serde(deserialize_with = "de::number")]
    pub prix: f64,
    #[serde(deserialize_with = "de::number")]
    pub nombre_membres: u32,
    #[serde(default, deserialize_with = "de::optional_number")]
    pub membres_actuels: Option<u32>,
    #[serde(default)]
    pub statut: Option<String>,
    #[serde(default, deserialize_with = "de::optional_number")]
    pub montant_collecte: Option<f64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub createur: Option<Member>,
}

impl Tontine {
    pub fn members(&self) -> u32 {
        self.membres_actuels.unwrap_or(0)
    }

    pub fn is_full(&self) -> bool {
        self.members() >= self.nombre_membres
    }

    pub fn places_left(&self) -> u32 {
        self.nombre_membres.saturating_sub(self.members())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TontineList {
    pub tontines: Vec<Tontine>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TontineDetails {
    pub tontine: Tontine,
    #[serde(default)]
    pub membres: Vec<Member>,
    #[serde(default)]
    pub est_createur: bool,
    #[serde(default)]
    pub est_membre: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewTontine {
    pub nom: String,
    pub prix: f64,
    pub nombre_membres: u32,
}
