use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 罰金の日額（通貨単位/日）
pub const FINE_PER_DAY: i64 = 5;

/// 貸出ID - 貸出台帳コンテキストの集約ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoanId(Uuid);

impl LoanId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl Default for LoanId {
    fn default() -> Self {
        Self::new()
    }
}

/// 書籍ID - カタログ管理コンテキストの集約ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookId(Uuid);

impl BookId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl Default for BookId {
    fn default() -> Self {
        Self::new()
    }
}

/// 会員ID - 会員管理コンテキストの集約ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberId(Uuid);

impl MemberId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl Default for MemberId {
    fn default() -> Self {
        Self::new()
    }
}

/// 罰金支払いID - 追記専用の監査レコードの識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentId(Uuid);

impl PaymentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl Default for PaymentId {
    fn default() -> Self {
        Self::new()
    }
}

/// 通知ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(Uuid);

impl NotificationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl Default for NotificationId {
    fn default() -> Self {
        Self::new()
    }
}

/// 罰金額エラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FineAmountError {
    /// 負の金額は表現できない
    Negative,
}

/// 罰金額（通貨単位）
///
/// 不変条件：金額は0以上。
/// 型システムでこの制約を強制し、負の罰金を作成できないようにする。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FineAmount(i64);

impl FineAmount {
    /// 罰金なし
    pub const ZERO: FineAmount = FineAmount(0);

    /// 延滞日数から罰金を計算する
    ///
    /// 日額は`FINE_PER_DAY`の固定線形レート。上限なし。
    /// 負の日数は0日として扱う。
    pub fn accrue(days_overdue: i64) -> Self {
        Self(days_overdue.max(0) * FINE_PER_DAY)
    }

    /// 現在の金額
    pub fn value(&self) -> i64 {
        self.0
    }

    /// 罰金が残っていないか
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for FineAmount {
    fn default() -> Self {
        Self::ZERO
    }
}

impl TryFrom<i64> for FineAmount {
    type Error = FineAmountError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value < 0 {
            return Err(FineAmountError::Negative);
        }
        Ok(Self(value))
    }
}

/// 会員ロール
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    /// 文字列表現を取得する
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "member" => Ok(Role::Member),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    // TDD: FineAmount のテスト
    #[test]
    fn test_fine_amount_zero() {
        assert!(FineAmount::ZERO.is_zero());
        assert_eq!(FineAmount::ZERO.value(), 0);
    }

    #[test]
    fn test_fine_amount_accrue_linear_rate() {
        assert_eq!(FineAmount::accrue(0).value(), 0);
        assert_eq!(FineAmount::accrue(1).value(), 5);
        assert_eq!(FineAmount::accrue(5).value(), 25);
        // 上限なし
        assert_eq!(FineAmount::accrue(365).value(), 1825);
    }

    #[test]
    fn test_fine_amount_accrue_clamps_negative_days() {
        assert_eq!(FineAmount::accrue(-3), FineAmount::ZERO);
    }

    #[test]
    fn test_fine_amount_try_from_valid() {
        let amount = FineAmount::try_from(25);
        assert!(amount.is_ok());
        assert_eq!(amount.unwrap().value(), 25);
    }

    #[test]
    fn test_fine_amount_try_from_negative() {
        let amount = FineAmount::try_from(-1);
        assert!(amount.is_err());
        assert_eq!(amount.unwrap_err(), FineAmountError::Negative);
    }

    // ID value objects のテスト
    #[test]
    fn test_loan_id_creation() {
        let id1 = LoanId::new();
        let id2 = LoanId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_loan_id_from_uuid() {
        let uuid = Uuid::new_v4();
        let id = LoanId::from_uuid(uuid);
        assert_eq!(id.value(), uuid);
    }

    #[test]
    fn test_book_id_creation() {
        let id1 = BookId::new();
        let id2 = BookId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_member_id_creation() {
        let id1 = MemberId::new();
        let id2 = MemberId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_payment_id_creation() {
        let id1 = PaymentId::new();
        let id2 = PaymentId::new();
        assert_ne!(id1, id2);
    }

    // Role のテスト
    #[test]
    fn test_role_round_trip() {
        assert_eq!(Role::from_str("admin").unwrap(), Role::Admin);
        assert_eq!(Role::from_str("member").unwrap(), Role::Member);
        assert_eq!(Role::Admin.as_str(), "admin");
        assert_eq!(Role::Member.as_str(), "member");
    }

    #[test]
    fn test_role_rejects_unknown() {
        assert!(Role::from_str("librarian").is_err());
    }
}
