use crate::domain::commands::UpdateMember;
use crate::domain::member::Member;
use crate::domain::value_objects::{MemberId, Role};
use crate::ports::member_store::{MemberStoreError, MemberStore as MemberStoreTrait, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use std::str::FromStr;

/// PostgreSQLの行データをMemberに変換する
fn map_row_to_member(row: &PgRow) -> Result<Member> {
    let role_str: &str = row.get("role");
    let role = Role::from_str(role_str).map_err(|e| {
        MemberStoreError::Storage(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            e,
        )))
    })?;

    Ok(Member {
        member_id: MemberId::from_uuid(row.get("member_id")),
        name: row.get("name"),
        email: row.get("email"),
        verified: row.get("verified"),
        role,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

const SELECT_MEMBER_COLUMNS: &str = r#"
    SELECT
        member_id,
        name,
        email,
        verified,
        role,
        created_at,
        updated_at
    FROM members
"#;

/// MemberStoreのPostgreSQL実装
pub struct MemberStore {
    pool: PgPool,
}

impl MemberStore {
    /// PostgreSQLコネクションプールから新しいMemberStoreを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MemberStoreTrait for MemberStore {
    async fn insert(&self, member: Member) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO members (
                member_id,
                name,
                email,
                verified,
                role,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(member.member_id.value())
        .bind(&member.name)
        .bind(&member.email)
        .bind(member.verified)
        .bind(member.role.as_str())
        .bind(member.created_at)
        .bind(member.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, member_id: MemberId) -> Result<Option<Member>> {
        let row = sqlx::query(&format!("{} WHERE member_id = $1", SELECT_MEMBER_COLUMNS))
            .bind(member_id.value())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_row_to_member).transpose()
    }

    async fn list(&self) -> Result<Vec<Member>> {
        let rows = sqlx::query(&format!("{} ORDER BY name ASC", SELECT_MEMBER_COLUMNS))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(map_row_to_member).collect()
    }

    async fn update(&self, cmd: UpdateMember, now: DateTime<Utc>) -> Result<Member> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "{} WHERE member_id = $1 FOR UPDATE",
            SELECT_MEMBER_COLUMNS
        ))
        .bind(cmd.member_id.value())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Err(MemberStoreError::MemberNotFound);
        };
        let current = map_row_to_member(&row)?;

        let updated = Member {
            name: cmd.name.unwrap_or(current.name),
            email: cmd.email.unwrap_or(current.email),
            verified: cmd.verified.unwrap_or(current.verified),
            role: cmd.role.unwrap_or(current.role),
            updated_at: now,
            ..current
        };

        sqlx::query(
            r#"
            UPDATE members
            SET
                name = $2,
                email = $3,
                verified = $4,
                role = $5,
                updated_at = $6
            WHERE member_id = $1
            "#,
        )
        .bind(updated.member_id.value())
        .bind(&updated.name)
        .bind(&updated.email)
        .bind(updated.verified)
        .bind(updated.role.as_str())
        .bind(updated.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn delete(&self, member_id: MemberId) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let referenced: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM loans WHERE member_id = $1)")
                .bind(member_id.value())
                .fetch_one(&mut *tx)
                .await?;

        if referenced {
            return Err(MemberStoreError::MemberHasLoans);
        }

        let deleted = sqlx::query("DELETE FROM members WHERE member_id = $1")
            .bind(member_id.value())
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(MemberStoreError::MemberNotFound);
        }

        tx.commit().await?;
        Ok(())
    }
}
