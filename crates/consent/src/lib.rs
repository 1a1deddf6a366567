//! SMS consent management: phone normalization, opt-in/opt-out keyword
//! handling, Do-Not-Call lookups and the consent record store.

pub mod dnc;
pub mod keywords;
pub mod manager;
pub mod phone;

pub use dnc::{DncRegistry, NoDncRegistry, StaticDncRegistry};
pub use manager::{
    ConsentManager, ConsentRecord, ConsentStatusView, ConsentVerification, InboundAction,
    InboundResponse,
};
pub use phone::normalize_phone;
