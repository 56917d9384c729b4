//! Wallet balance, transaction history and payment operations.

use serde::{Deserialize, Serialize};

use super::de;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Balance {
    #[serde(deserialize_with = "de::number")]
    pub solde: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(deserialize_with = "de::number")]
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(deserialize_with = "de::number")]
    pub montant: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub statut: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// One page of a paginated listing.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    #[serde(default, deserialize_with = "de::optional_number")]
    pub current_page: Option<u32>,
    #[serde(default, deserialize_with = "de::optional_number")]
    pub last_page: Option<u32>,
    #[serde(default, deserialize_with = "de::optional_number")]
    pub total: Option<u64>,
}

impl<T> Page<T> {
    pub fn has_more(&self) -> bool {
        match (self.current_page, self.last_page) {
            (Some(current), Some(last)) => current < last,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionHistory {
    pub transactions: Page<Transaction>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RechargeRequest {
    pub montant: f64,
    pub methode_paiement: String,
    pub reference_externe: String,
}

/// A recharge hands back a payment page to open and a token to poll with.
#[derive(Debug, Clone, Deserialize)]
pub struct RechargeReceipt {
    #[serde(default)]
    pub payment_url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WithdrawalRequest {
    pub montant: f64,
    pub telephone: String,
    pub operateur: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WithdrawalReceipt {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default, deserialize_with = "de::optional_number")]
    pub montant_net: Option<f64>,
    #[serde(default, deserialize_with = "de::optional_number")]
    pub frais: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferRequest {
    pub destinataire: String,
    pub montant: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentStatus {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub statut: Option<String>,
}

impl PaymentStatus {
    pub fn label(&self) -> &str {
        self.status
            .as_deref()
            .or(self.statut.as_deref())
            .unwrap_or("unknown")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_history_page() {
        let history: TransactionHistory = serde_json::from_value(json!({
            "transactions": {
                "current_page": 1,
                "last_page": "3",
                "data": [
                    {"id": 1, "type": "recharge", "montant": "5000", "statut": "complete"},
                    {"id": 2, "type": "retrait", "montant": 1000.5}
                ]
            }
        }))
        .unwrap();

        assert_eq!(history.transactions.data.len(), 2);
        assert_eq!(history.transactions.data[0].kind, "recharge");
        assert_eq!(history.transactions.data[0].montant, 5000.0);
        assert_eq!(history.transactions.data[1].statut, None);
        assert!(history.transactions.has_more());
    }

    #[test]
    fn test_payment_status_label() {
        let status: PaymentStatus = serde_json::from_value(json!({"statut": "pending"})).unwrap();
        assert_eq!(status.label(), "pending");
    }
}
