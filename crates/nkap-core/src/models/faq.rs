use serde::{Deserialize, Serialize};

use super::de;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaqEntry {
    #[serde(deserialize_with = "de::number")]
    pub id: i64,
    pub question: String,
    #[serde(default)]
    pub reponse: Option<String>,
    #[serde(default)]
    pub categorie: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FaqList {
    pub faqs: Vec<FaqEntry>,
}
