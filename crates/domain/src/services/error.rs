//! Ledger error taxonomy.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::PixKeyType;

/// Uniqueness guarantees the backing store enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueConstraint {
    /// One referral per referred user.
    Referral,
    /// One first-payment commission per referred user.
    FirstPaymentCommission,
    /// One commission per external payment reference.
    PaymentReference,
    /// One pending withdrawal request per user.
    PendingWithdrawal,
    /// One active commission policy.
    ActiveConfig,
}

impl std::fmt::Display for UniqueConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UniqueConstraint::Referral => write!(f, "referral"),
            UniqueConstraint::FirstPaymentCommission => write!(f, "first_payment_commission"),
            UniqueConstraint::PaymentReference => write!(f, "payment_reference"),
            UniqueConstraint::PendingWithdrawal => write!(f, "pending_withdrawal"),
            UniqueConstraint::ActiveConfig => write!(f, "active_config"),
        }
    }
}

/// Failure reported by a ledger store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(UniqueConstraint),

    #[error("Store error: {0}")]
    Database(String),
}

/// Typed failures of ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Referral code not found")]
    InvalidCode,

    #[error("Users cannot refer themselves")]
    SelfReferral,

    #[error("User already has a referrer")]
    AlreadyReferred,

    #[error("User was not referred")]
    NoReferrer,

    #[error("Referral program is disabled")]
    ProgramDisabled,

    #[error("Commission already registered for this payment")]
    DuplicateCommission,

    #[error("Referral configuration is unavailable")]
    SystemUnavailable,

    #[error("Minimum withdrawal amount is {minimum}")]
    BelowMinimum { minimum: Decimal },

    #[error("Insufficient available balance: {available}")]
    InsufficientBalance { available: Decimal },

    #[error("A withdrawal request is already pending")]
    PendingRequestExists,

    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Invalid {0} PIX key")]
    InvalidPixKey(PixKeyType),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Cannot move from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(UniqueConstraint::Referral) => LedgerError::AlreadyReferred,
            StoreError::UniqueViolation(
                UniqueConstraint::FirstPaymentCommission | UniqueConstraint::PaymentReference,
            ) => LedgerError::DuplicateCommission,
            StoreError::UniqueViolation(UniqueConstraint::PendingWithdrawal) => {
                LedgerError::PendingRequestExists
            }
            other => LedgerError::Store(other),
        }
    }
}

impl LedgerError {
    /// Stable machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::InvalidCode => "invalid_code",
            LedgerError::SelfReferral => "self_referral",
            LedgerError::AlreadyReferred => "already_referred",
            LedgerError::NoReferrer => "no_referrer",
            LedgerError::ProgramDisabled => "program_disabled",
            LedgerError::DuplicateCommission => "duplicate_commission",
            LedgerError::SystemUnavailable => "system_unavailable",
            LedgerError::BelowMinimum { .. } => "below_minimum",
            LedgerError::InsufficientBalance { .. } => "insufficient_balance",
            LedgerError::PendingRequestExists => "pending_request_exists",
            LedgerError::InvalidAmount => "invalid_amount",
            LedgerError::InvalidPixKey(_) => "invalid_pix_key",
            LedgerError::InvalidInput(_) => "validation_error",
            LedgerError::NotFound(_) => "not_found",
            LedgerError::InvalidTransition { .. } => "invalid_transition",
            LedgerError::Store(_) => "internal_error",
        }
    }
}
