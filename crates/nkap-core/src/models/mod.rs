//! Data models for nkap entities.
//!
//! These mirror the server's JSON. Numbers the server sometimes sends as
//! strings go through the lenient deserializers in `de`.
//!
//! - `User`, `Registration`, `UserPatch`: the account
//! - `Balance`, `Transaction`, `Page`: the wallet
//! - `Tontine`, `Member`: savings groups
//! - `ReferralStats`, `Referee`: referral program
//! - `Product`, `Ad`, `Profile`: marketplace and rencontre
//! - `Conversation`, `Message`: messaging

pub mod business;
pub mod de;
pub mod faq;
pub mod message;
pub mod referral;
pub mod rencontre;
pub mod tontine;
pub mod user;
pub mod wallet;

pub use business::{NewProduct, Product, ProductDetails, ProductList};
pub use faq::{FaqEntry, FaqList};
pub use message::{
    Conversation, LastMessage, Message, NewConversation, Participant, UnreadCount,
    MESSAGES_PAGE_SIZE,
};
pub use referral::{CodeCheck, Referee, RefereeList, ReferralStats, Sponsor};
pub use rencontre::{Ad, AdKind, NewAd, Profile};
pub use tontine::{Member, NewTontine, Tontine, TontineDetails, TontineList};
pub use user::{AuthPayload, ProfilePayload, Registration, User, UserPatch};
pub use wallet::{
    Balance, Page, PaymentStatus, RechargeReceipt, RechargeRequest, Transaction,
    TransactionHistory, TransferRequest, WithdrawalReceipt, WithdrawalRequest,
};
