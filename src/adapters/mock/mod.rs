use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::domain::book::Book;
use crate::domain::loan::{FinePayment, Loan};
use crate::domain::member::Member;
use crate::domain::value_objects::{BookId, LoanId, MemberId};

pub mod catalog_store;
pub mod email_sink;
pub mod loan_ledger;
pub mod member_store;
pub mod notification_sink;

pub use catalog_store::CatalogStore;
pub use email_sink::EmailSink;
pub use loan_ledger::LoanLedger;
pub use member_store::MemberStore;
pub use notification_sink::NotificationSink;

/// インメモリの共有状態
///
/// 台帳の複合書き込み（在庫確保と貸出挿入など）はPostgreSQLでは
/// 同一データベース上の単一トランザクションで行われる。モックでも
/// 同じ意味論を保つため、ストアとledgerは1つのDbを共有し、
/// 複合書き込みを1回のロック区間で行う。
#[derive(Default)]
pub(crate) struct Db {
    pub(crate) books: HashMap<BookId, Book>,
    pub(crate) members: HashMap<MemberId, Member>,
    pub(crate) loans: HashMap<LoanId, Loan>,
    pub(crate) payments: Vec<FinePayment>,
}

/// 共有Dbの上にストア一式を作成する（テスト・ローカル配線用）
pub fn stores() -> (Arc<CatalogStore>, Arc<MemberStore>, Arc<LoanLedger>) {
    let db = Arc::new(Mutex::new(Db::default()));
    (
        Arc::new(CatalogStore::new(db.clone())),
        Arc::new(MemberStore::new(db.clone())),
        Arc::new(LoanLedger::new(db)),
    )
}
