use chrono::{DateTime, Utc};

use crate::domain::commands::{CreateMember, UpdateMember};
use crate::domain::member::Member;
use crate::domain::value_objects::MemberId;
use crate::ports::MemberStore;

use super::circulation::{CirculationError, Result, ServiceDependencies};

/// 会員を登録する
///
/// 登録直後は未確認（verified = false）。貸出資格は
/// 更新操作で本人確認されてから与えられる。
pub async fn create_member(
    deps: &ServiceDependencies,
    cmd: CreateMember,
    now: DateTime<Utc>,
) -> Result<Member> {
    let member = Member {
        member_id: MemberId::new(),
        name: cmd.name,
        email: cmd.email,
        verified: false,
        role: cmd.role,
        created_at: now,
        updated_at: now,
    };

    deps.members.insert(member.clone()).await?;

    Ok(member)
}

/// IDで会員を取得する
pub async fn get_member(deps: &ServiceDependencies, member_id: MemberId) -> Result<Member> {
    deps.members
        .get(member_id)
        .await?
        .ok_or(CirculationError::MemberNotFound)
}

/// 全会員を取得する
pub async fn list_members(deps: &ServiceDependencies) -> Result<Vec<Member>> {
    Ok(deps.members.list().await?)
}

/// 会員を更新する（本人確認・ロール変更を含む）
pub async fn update_member(
    deps: &ServiceDependencies,
    cmd: UpdateMember,
    now: DateTime<Utc>,
) -> Result<Member> {
    Ok(deps.members.update(cmd, now).await?)
}

/// 会員を削除する
///
/// 貸出レコード（返却済みを含む）が参照している間は拒否される。
pub async fn delete_member(deps: &ServiceDependencies, member_id: MemberId) -> Result<()> {
    Ok(deps.members.delete(member_id).await?)
}
