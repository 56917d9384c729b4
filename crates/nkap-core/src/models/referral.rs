//! Referral ("parrainage") codes, statistics and referred members.

use serde::Deserialize;

use super::de;

#[derive(Debug, Clone, Deserialize)]
pub struct Sponsor {
    pub nom: String,
    pub prenom: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CodeCheck {
    pub parrain: Sponsor,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReferralStats {
    #[serde(default)]
    pub code_parrainage: Option<String>,
    #[serde(default, deserialize_with = "de::optional_number")]
    pub nombre_filleuls: Option<u32>,
    #[serde(default, deserialize_with = "de::optional_number")]
    pub filleuls_actifs: Option<u32>,
    #[serde(default, deserialize_with = "de::optional_number")]
    pub total_bonus: Option<f64>,
    #[serde(default, deserialize_with = "de::optional_number")]
    pub gains_ce_mois: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Referee {
    #[serde(deserialize_with = "de::number")]
    pub id: i64,
    pub nom_complet: String,
    /// `DD/MM/YYYY`
    #[serde(default)]
    pub date_inscription: Option<String>,
    #[serde(default)]
    pub a_participe_tontine: bool,
}

impl Referee {
    pub fn is_active(&self) -> bool {
        self.a_participe_tontine
    }

    pub fn joined_on(&self) -> Option<chrono::NaiveDate> {
        self.date_inscription
            .as_deref()
            .and_then(|d| chrono::NaiveDate::parse_from_str(d, "%d/%m/%Y").ok())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefereeList {
    #[serde(default)]
    pub filleuls: Vec<Referee>,
}
