//! Marketplace listings.

use serde::{Deserialize, Serialize};

use super::de;
use super::tontine::Member;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    #[serde(deserialize_with = "de::number")]
    pub id: i64,
    pub titre: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(deserialize_with = "de::number")]
    pub prix: f64,
    #[serde(default)]
    pub categorie: Option<String>,
    #[serde(default)]
    pub ville: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub vendeur: Option<Member>,
    #[serde(default)]
    pub statut: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Product {
    pub fn is_sold(&self) -> bool {
        self.statut.as_deref() == Some("vendu")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductList {
    pub produits: Vec<Product>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductDetails {
    pub produit: Product,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewProduct {
    pub titre: String,
    pub description: String,
    pub prix: f64,
    pub categorie: String,
    pub images: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ville: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telephone_contact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whatsapp: Option<String>,
}
