//! Domain models for the referral ledger.

pub mod balance;
pub mod commission;
pub mod pagination;
pub mod referral;
pub mod referral_config;
pub mod withdrawal;

pub use balance::UserReferralBalance;
pub use commission::{
    Commission, CommissionStatus, NewCommission, PaymentEventRequest, PaymentEventResponse,
};
pub use pagination::PageQuery;
pub use referral::{
    generate_referral_link, NewReferral, Referral, ReferralItem, ReferralLinkResponse,
    ReferralStatus, RegisterReferralRequest, RegisterReferralResponse, UtmMetadata,
};
pub use referral_config::{CommissionType, ReferralConfig, ReferralConfigInput};
pub use withdrawal::{
    CreateWithdrawalRequest, ListWithdrawalsQuery, NewWithdrawalRequest, PixKeyType,
    RejectWithdrawalRequest, WithdrawalEligibility, WithdrawalRequest, WithdrawalStatus,
};
