use std::sync::Arc;

use chrono::Utc;
use rusty_circulation::adapters::mock;
use rusty_circulation::application::circulation::ServiceDependencies;
use rusty_circulation::domain::book::Book;
use rusty_circulation::domain::member::Member;
use rusty_circulation::domain::value_objects::{BookId, MemberId, Role};
use rusty_circulation::ports::{CatalogStore, MemberStore};

/// テスト用の依存関係一式
///
/// シンクは検証のために具象型のまま保持する。
pub struct TestDeps {
    pub deps: ServiceDependencies,
    pub notifications: Arc<mock::NotificationSink>,
    pub email: Arc<mock::EmailSink>,
}

/// インメモリアダプター一式から依存関係を組み立てる
///
/// ストアとledgerは1つの共有状態の上に作られるため、
/// 在庫の増減はPostgreSQL実装と同じ意味論で観測できる。
pub fn test_deps() -> TestDeps {
    let (catalog, members, ledger) = mock::stores();
    let notifications = Arc::new(mock::NotificationSink::new());
    let email = Arc::new(mock::EmailSink::new());

    let deps = ServiceDependencies {
        catalog,
        members,
        ledger,
        notifications: notifications.clone(),
        email: email.clone(),
    };

    TestDeps {
        deps,
        notifications,
        email,
    }
}

/// テスト用の蔵書を登録する
#[allow(dead_code)]
pub async fn seed_book(deps: &ServiceDependencies, copies: u32) -> BookId {
    let now = Utc::now();
    let book = Book {
        book_id: BookId::new(),
        title: "The Left Hand of Darkness".to_string(),
        author: "Ursula K. Le Guin".to_string(),
        isbn: None,
        total_copies: copies,
        available_copies: copies,
        created_at: now,
        updated_at: now,
    };
    let book_id = book.book_id;

    deps.catalog.insert(book).await.expect("seed book");
    book_id
}

/// テスト用の会員を登録する
#[allow(dead_code)]
pub async fn seed_member(deps: &ServiceDependencies, verified: bool) -> MemberId {
    let now = Utc::now();
    let member = Member {
        member_id: MemberId::new(),
        name: "Genly Ai".to_string(),
        email: "genly@example.com".to_string(),
        verified,
        role: Role::Member,
        created_at: now,
        updated_at: now,
    };
    let member_id = member.member_id;

    deps.members.insert(member).await.expect("seed member");
    member_id
}
