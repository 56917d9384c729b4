//! Typed wrappers for every nkap endpoint.
//!
//! Each wrapper goes through the session-aware transport, so all of them get
//! the bearer token and the 401/403 teardown for free. Response shapes are
//! fixed per endpoint; a body that does not match is a decode error.

use std::path::Path;

use serde_json::json;

use super::client::{ApiClient, RequestOptions};
use super::envelope::{Ack, Data, Envelope};
use super::ApiError;
use crate::models::{
    Ad, AuthPayload, Balance, CodeCheck, Conversation, FaqList, Message, NewAd, NewConversation,
    NewProduct, NewTontine, PaymentStatus, ProductDetails, ProductList, ProfilePayload, Profile,
    RechargeReceipt, RechargeRequest, RefereeList, ReferralStats, Registration, Sponsor,
    Tontine, TontineDetails, TontineList, TransactionHistory, TransferRequest, UnreadCount,
    User, UserPatch, WithdrawalReceipt, WithdrawalRequest,
};

/// Endpoint receiving product images.
pub const UPLOAD_IMAGE_PATH: &str = "/business/upload-image";

impl ApiClient {
    // ===== Auth =====

    /// Create an account. The returned token is not stored here.
    pub async fn register(&self, registration: &Registration) -> Result<AuthPayload, ApiError> {
        self.post("/inscription", registration).await
    }

    /// Exchange an identifier (email or phone) and password for a token.
    pub async fn login(&self, identifiant: &str, password: &str) -> Result<AuthPayload, ApiError> {
        self.post(
            "/connexion",
            &json!({ "identifiant": identifiant, "password": password }),
        )
        .await
    }

    /// Tell the server to revoke the current token.
    pub async fn logout(&self) -> Result<(), ApiError> {
        self.post_empty::<Ack>("/deconnexion").await.map(|_| ())
    }

    pub async fn fetch_profile(&self) -> Result<User, ApiError> {
        let profile: ProfilePayload = self.get("/profil").await?;
        Ok(profile.user)
    }

    pub async fn update_profile(&self, patch: &UserPatch) -> Result<User, ApiError> {
        let profile: ProfilePayload = self.put("/profil", patch).await?;
        Ok(profile.user)
    }

    pub async fn change_password(&self, current: &str, new: &str) -> Result<(), ApiError> {
        self.put::<Ack, _>(
            "/mot-de-passe",
            &json!({
                "ancien_mot_de_passe": current,
                "nouveau_mot_de_passe": new,
            }),
        )
        .await
        .map(|_| ())
    }

    // ===== Wallet =====

    pub async fn fetch_balance(&self) -> Result<f64, ApiError> {
        let balance: Balance = self.get("/solde").await?;
        Ok(balance.solde)
    }

    pub async fn fetch_transactions(&self, page: u32) -> Result<TransactionHistory, ApiError> {
        self.get_with("/transactions", RequestOptions::default().query("page", page))
            .await
    }

    pub async fn recharge(&self, request: &RechargeRequest) -> Result<RechargeReceipt, ApiError> {
        self.post("/recharger", request).await
    }

    pub async fn withdraw(&self, request: &WithdrawalRequest) -> Result<WithdrawalReceipt, ApiError> {
        self.post("/retirer", request).await
    }

    pub async fn transfer(&self, request: &TransferRequest) -> Result<(), ApiError> {
        self.post::<Ack, _>("/transferer", request).await.map(|_| ())
    }

    pub async fn check_payment_status(&self, token: &str) -> Result<PaymentStatus, ApiError> {
        self.post("/payment/check-status", &json!({ "token": token }))
            .await
    }

    // ===== Tontines =====

    /// Create a tontine; returns the server's confirmation text, if any.
    pub async fn create_tontine(&self, tontine: &NewTontine) -> Result<Option<String>, ApiError> {
        let created: Envelope<Ack> = self
            .request(
                reqwest::Method::POST,
                "/tontines",
                Some(tontine),
                RequestOptions::default(),
            )
            .await?
            .envelope()?;
        let message = created.message.clone();
        created.into_result().map(|_| message)
    }

    pub async fn join_tontine(&self, code: &str) -> Result<(), ApiError> {
        self.post::<Ack, _>("/tontines/rejoindre", &json!({ "code": code }))
            .await
            .map(|_| ())
    }

    /// Look a tontine up by its invitation code.
    pub async fn search_tontine(&self, code: &str) -> Result<Tontine, ApiError> {
        self.get(&format!("/tontines/rechercher/{}", code)).await
    }

    pub async fn fetch_created_tontines(&self) -> Result<Vec<Tontine>, ApiError> {
        let list: TontineList = self.get("/tontines/mes-creations").await?;
        Ok(list.tontines)
    }

    pub async fn fetch_joined_tontines(&self) -> Result<Vec<Tontine>, ApiError> {
        let list: TontineList = self.get("/tontines/mes-adhesions").await?;
        Ok(list.tontines)
    }

    pub async fn fetch_tontine(&self, id: i64) -> Result<TontineDetails, ApiError> {
        self.get(&format!("/tontines/{}", id)).await
    }

    // ===== Referral =====

    /// Check a referral code before registering; returns the sponsor.
    pub async fn verify_referral_code(&self, code: &str) -> Result<Sponsor, ApiError> {
        let check: CodeCheck = self
            .post("/verifier-code-parrainage", &json!({ "code": code }))
            .await?;
        Ok(check.parrain)
    }

    pub async fn fetch_referral_stats(&self) -> Result<ReferralStats, ApiError> {
        self.get("/parrainage/statistiques").await
    }

    pub async fn fetch_referees(&self) -> Result<RefereeList, ApiError> {
        self.get("/parrainage/filleuls").await
    }

    // ===== Business =====

    pub async fn fetch_products(&self, category: Option<&str>) -> Result<ProductList, ApiError> {
        let mut options = RequestOptions::default();
        if let Some(category) = category {
            options = options.query("categorie", category);
        }
        let list: Data<ProductList> = self.get_with("/business/produits", options).await?;
        Ok(list.data)
    }

    pub async fn create_product(&self, product: &NewProduct) -> Result<(), ApiError> {
        self.post::<Ack, _>("/business/produits", product)
            .await
            .map(|_| ())
    }

    pub async fn fetch_product(&self, id: i64) -> Result<ProductDetails, ApiError> {
        let details: Data<ProductDetails> =
            self.get(&format!("/business/produits/{}", id)).await?;
        Ok(details.data)
    }

    pub async fn update_product(&self, id: i64, product: &NewProduct) -> Result<(), ApiError> {
        self.put::<Ack, _>(&format!("/business/produits/{}", id), product)
            .await
            .map(|_| ())
    }

    pub async fn delete_product(&self, id: i64) -> Result<(), ApiError> {
        self.delete::<Ack>(&format!("/business/produits/{}", id))
            .await
            .map(|_| ())
    }

    pub async fn fetch_my_products(&self) -> Result<ProductList, ApiError> {
        let list: Data<ProductList> = self.get("/business/mes-produits").await?;
        Ok(list.data)
    }

    pub async fn mark_product_sold(&self, id: i64) -> Result<(), ApiError> {
        self.post_empty::<Ack>(&format!("/business/produits/{}/vendu", id))
            .await
            .map(|_| ())
    }

    pub async fn upload_image(&self, file: impl AsRef<Path>) -> Result<String, ApiError> {
        self.upload_file(UPLOAD_IMAGE_PATH, file).await
    }

    pub async fn upload_images<P: AsRef<Path>>(&self, files: &[P]) -> Result<Vec<String>, ApiError> {
        self.upload_files(UPLOAD_IMAGE_PATH, files).await
    }

    // ===== Rencontre =====

    pub async fn create_ad(&self, ad: &NewAd) -> Result<(), ApiError> {
        self.post::<Ack, _>("/rencontre/annonces", ad).await.map(|_| ())
    }

    pub async fn fetch_my_ads(&self) -> Result<Vec<Ad>, ApiError> {
        let ads: Data<Vec<Ad>> = self.get("/rencontre/mes-annonces").await?;
        Ok(ads.data)
    }

    pub async fn fetch_dating_profiles(&self, page: u32) -> Result<Vec<Profile>, ApiError> {
        let profiles: Data<Vec<Profile>> = self
            .get_with("/rencontre/amoureuse", RequestOptions::default().query("page", page))
            .await?;
        Ok(profiles.data)
    }

    pub async fn fetch_business_ads(&self) -> Result<Vec<Ad>, ApiError> {
        let ads: Data<Vec<Ad>> = self.get("/rencontre/business").await?;
        Ok(ads.data)
    }

    pub async fn fetch_other_ads(&self) -> Result<Vec<Ad>, ApiError> {
        let ads: Data<Vec<Ad>> = self.get("/rencontre/autre").await?;
        Ok(ads.data)
    }

    pub async fn contact_member(&self, user_id: i64, message: &str) -> Result<(), ApiError> {
        self.post::<Ack, _>(
            &format!("/rencontre/contacter/{}", user_id),
            &json!({ "message": message }),
        )
        .await
        .map(|_| ())
    }

    // ===== Messages =====

    pub async fn fetch_conversations(&self) -> Result<Vec<Conversation>, ApiError> {
        let conversations: Data<Vec<Conversation>> = self.get("/messages/conversations").await?;
        Ok(conversations.data)
    }

    /// One page of a conversation, newest first as the server sends it.
    pub async fn fetch_messages(&self, conversation_id: i64, page: u32) -> Result<Vec<Message>, ApiError> {
        let messages: Data<Vec<Message>> = self
            .get_with(
                &format!("/messages/conversations/{}", conversation_id),
                RequestOptions::default().query("page", page),
            )
            .await?;
        Ok(messages.data)
    }

    pub async fn send_message(&self, conversation_id: i64, contenu: &str) -> Result<Message, ApiError> {
        let sent: Data<Message> = self
            .post(
                &format!("/messages/conversations/{}", conversation_id),
                &json!({ "contenu": contenu }),
            )
            .await?;
        Ok(sent.data)
    }

    /// Open a conversation with a member and return its id.
    pub async fn start_conversation(&self, recipient_id: i64, message: &str) -> Result<i64, ApiError> {
        let created: Data<NewConversation> = self
            .post(
                "/messages/nouvelle",
                &json!({ "destinataire_id": recipient_id, "message": message }),
            )
            .await?;
        Ok(created.data.conversation_id)
    }

    pub async fn fetch_unread_count(&self) -> Result<u32, ApiError> {
        let unread: UnreadCount = self.get("/messages/non-lus").await?;
        Ok(unread.count)
    }

    // ===== FAQ =====

    pub async fn ask_question(&self, question: &str) -> Result<(), ApiError> {
        self.post::<Ack, _>("/faq/question", &json!({ "question": question }))
            .await
            .map(|_| ())
    }

    pub async fn fetch_faq(&self, category: Option<&str>) -> Result<FaqList, ApiError> {
        let mut options = RequestOptions::default();
        if let Some(category) = category {
            options = options.query("categorie", category);
        }
        self.get_with("/faq", options).await
    }
}
