use std::sync::{Arc, Mutex};

use crate::domain::commands::UpdateMember;
use crate::domain::member::Member;
use crate::domain::value_objects::MemberId;
use crate::ports::member_store::{MemberStoreError, MemberStore as MemberStoreTrait, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::Db;

/// MemberStoreのインメモリ実装
pub struct MemberStore {
    db: Arc<Mutex<Db>>,
}

impl MemberStore {
    pub(super) fn new(db: Arc<Mutex<Db>>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MemberStoreTrait for MemberStore {
    async fn insert(&self, member: Member) -> Result<()> {
        let mut db = self.db.lock().unwrap();
        db.members.insert(member.member_id, member);
        Ok(())
    }

    async fn get(&self, member_id: MemberId) -> Result<Option<Member>> {
        let db = self.db.lock().unwrap();
        Ok(db.members.get(&member_id).cloned())
    }

    async fn list(&self) -> Result<Vec<Member>> {
        let db = self.db.lock().unwrap();
        let mut members: Vec<Member> = db.members.values().cloned().collect();
        members.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(members)
    }

    async fn update(&self, cmd: UpdateMember, now: DateTime<Utc>) -> Result<Member> {
        let mut db = self.db.lock().unwrap();
        let current = db
            .members
            .get(&cmd.member_id)
            .cloned()
            .ok_or(MemberStoreError::MemberNotFound)?;

        let updated = Member {
            name: cmd.name.unwrap_or(current.name),
            email: cmd.email.unwrap_or(current.email),
            verified: cmd.verified.unwrap_or(current.verified),
            role: cmd.role.unwrap_or(current.role),
            updated_at: now,
            ..current
        };

        db.members.insert(updated.member_id, updated.clone());
        Ok(updated)
    }

    async fn delete(&self, member_id: MemberId) -> Result<()> {
        let mut db = self.db.lock().unwrap();

        if db.loans.values().any(|loan| loan.member_id() == member_id) {
            return Err(MemberStoreError::MemberHasLoans);
        }

        db.members
            .remove(&member_id)
            .map(|_| ())
            .ok_or(MemberStoreError::MemberNotFound)
    }
}
