use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{MemberId, Role};

/// 会員 - 会員管理コンテキストのレコード
///
/// ビジネスルール：本人確認済み（verified）の会員のみ貸出可能。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub member_id: MemberId,
    pub name: String,
    pub email: String,
    pub verified: bool,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Member {
    /// 貸出資格があるか
    pub fn can_borrow(&self) -> bool {
        self.verified
    }
}
