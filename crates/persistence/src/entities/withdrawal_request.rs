//! Withdrawal request entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{PixKeyType, WithdrawalRequest, WithdrawalStatus};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for withdrawal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "withdrawal_status", rename_all = "lowercase")]
pub enum WithdrawalStatusDb {
    Pending,
    Approved,
    Paid,
    Rejected,
}

impl From<WithdrawalStatusDb> for WithdrawalStatus {
    fn from(value: WithdrawalStatusDb) -> Self {
        match value {
            WithdrawalStatusDb::Pending => WithdrawalStatus::Pending,
            WithdrawalStatusDb::Approved => WithdrawalStatus::Approved,
            WithdrawalStatusDb::Paid => WithdrawalStatus::Paid,
            WithdrawalStatusDb::Rejected => WithdrawalStatus::Rejected,
        }
    }
}

impl From<WithdrawalStatus> for WithdrawalStatusDb {
    fn from(value: WithdrawalStatus) -> Self {
        match value {
            WithdrawalStatus::Pending => WithdrawalStatusDb::Pending,
            WithdrawalStatus::Approved => WithdrawalStatusDb::Approved,
            WithdrawalStatus::Paid => WithdrawalStatusDb::Paid,
            WithdrawalStatus::Rejected => WithdrawalStatusDb::Rejected,
        }
    }
}

/// Database enum for PIX key type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "pix_key_type", rename_all = "lowercase")]
pub enum PixKeyTypeDb {
    Cpf,
    Cnpj,
    Email,
    Phone,
    Random,
}

impl From<PixKeyTypeDb> for PixKeyType {
    fn from(value: PixKeyTypeDb) -> Self {
        match value {
            PixKeyTypeDb::Cpf => PixKeyType::Cpf,
            PixKeyTypeDb::Cnpj => PixKeyType::Cnpj,
            PixKeyTypeDb::Email => PixKeyType::Email,
            PixKeyTypeDb::Phone => PixKeyType::Phone,
            PixKeyTypeDb::Random => PixKeyType::Random,
        }
    }
}

impl From<PixKeyType> for PixKeyTypeDb {
    fn from(value: PixKeyType) -> Self {
        match value {
            PixKeyType::Cpf => PixKeyTypeDb::Cpf,
            PixKeyType::Cnpj => PixKeyTypeDb::Cnpj,
            PixKeyType::Email => PixKeyTypeDb::Email,
            PixKeyType::Phone => PixKeyTypeDb::Phone,
            PixKeyType::Random => PixKeyTypeDb::Random,
        }
    }
}

/// Database row mapping for the withdrawal_requests table.
#[derive(Debug, Clone, FromRow)]
pub struct WithdrawalRequestEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub pix_key: String,
    pub pix_key_type: PixKeyTypeDb,
    pub bank_name: Option<String>,
    pub status: WithdrawalStatusDb,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl From<WithdrawalRequestEntity> for WithdrawalRequest {
    fn from(entity: WithdrawalRequestEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            amount: entity.amount,
            pix_key: entity.pix_key,
            pix_key_type: entity.pix_key_type.into(),
            bank_name: entity.bank_name,
            status: entity.status.into(),
            rejection_reason: entity.rejection_reason,
            created_at: entity.created_at,
            processed_at: entity.processed_at,
        }
    }
}
