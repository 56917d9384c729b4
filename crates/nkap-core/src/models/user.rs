//! Account models: the signed-in user, registration and profile edits.

use serde::{Deserialize, Serialize};

use super::de;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "de::number")]
    pub id: i64,
    pub nom: String,
    pub prenom: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub telephone: Option<String>,
    #[serde(default)]
    pub ville: Option<String>,
    #[serde(default)]
    pub sexe: Option<String>,
    #[serde(default)]
    pub date_naissance: Option<String>,
    #[serde(default)]
    pub code_parrainage: Option<String>,
    #[serde(default, deserialize_with = "de::optional_number")]
    pub solde: Option<f64>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.prenom, self.nom).trim().to_string()
    }

    /// Overwrite the fields present in `patch`.
    pub fn apply(&mut self, patch: &UserPatch) {
        fn merge(target: &mut Option<String>, value: &Option<String>) {
            if value.is_some() {
                *target = value.clone();
            }
        }

        if let Some(ref nom) = patch.nom {
            self.nom = nom.clone();
        }
        if let Some(ref prenom) = patch.prenom {
            self.prenom = prenom.clone();
        }
        merge(&mut self.email, &patch.email);
        merge(&mut self.telephone, &patch.telephone);
        merge(&mut self.ville, &patch.ville);
        merge(&mut self.bio, &patch.bio);
        merge(&mut self.avatar, &patch.avatar);
        if patch.solde.is_some() {
            self.solde = patch.solde;
        }
    }
}

/// Partial profile update. Unset fields are left out of the request body.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nom: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prenom: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telephone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ville: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Local only; the balance is never sent to the server.
    #[serde(skip)]
    pub solde: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub nom: String,
    pub prenom: String,
    pub email: String,
    pub telephone: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_parrainage: Option<String>,
    pub date_naissance: String,
    pub sexe: String,
    pub ville: String,
}

/// Answer to login and registration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfilePayload {
    pub user: User,
}
