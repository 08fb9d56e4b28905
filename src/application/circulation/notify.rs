use serde_json::json;

use crate::domain::DomainEvent;
use crate::domain::book::Book;
use crate::domain::member::Member;
use crate::domain::value_objects::{BookId, MemberId, NotificationId};
use crate::ports::{
    CatalogStore, EmailMessage, EmailSink, MemberStore, Notification, NotificationSink,
};

use super::loan_service::ServiceDependencies;

/// 通知の内容（シンクに依存しない中間表現）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationContent {
    pub event_type: &'static str,
    pub title: String,
    pub message: String,
    pub action_url: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// 純粋関数：ドメインイベントから通知内容を組み立てる
///
/// 通知シンクとメールシンクは同じ内容を受け取る
/// （タイトル＝件名、メッセージ＝本文）。
pub fn notification_content(event: &DomainEvent, book_title: &str) -> NotificationContent {
    match event {
        DomainEvent::LoanIssued(e) => NotificationContent {
            event_type: event.event_type(),
            title: format!("You borrowed \"{}\"", book_title),
            message: format!(
                "\"{}\" is due back on {}.",
                book_title,
                e.deadline.format("%Y-%m-%d")
            ),
            action_url: Some(format!("/loans/{}", e.loan_id.value())),
            metadata: Some(json!({
                "loan_id": e.loan_id.value(),
                "book_id": e.book_id.value(),
                "deadline": e.deadline,
            })),
        },
        DomainEvent::LoanReturned(e) => {
            let message = if let Some(waived) = e.waived {
                format!(
                    "\"{}\" was returned. A fine of {} was waived.",
                    book_title,
                    waived.value()
                )
            } else if !e.fine.is_zero() {
                format!(
                    "\"{}\" was returned. A fine of {} is due.",
                    book_title,
                    e.fine.value()
                )
            } else {
                format!("\"{}\" was returned. Thank you!", book_title)
            };
            NotificationContent {
                event_type: event.event_type(),
                title: format!("You returned \"{}\"", book_title),
                message,
                action_url: Some(format!("/loans/{}", e.loan_id.value())),
                metadata: Some(json!({
                    "loan_id": e.loan_id.value(),
                    "book_id": e.book_id.value(),
                    "fine": e.fine.value(),
                    "was_overdue": e.was_overdue,
                })),
            }
        }
        DomainEvent::FineCleared(e) => NotificationContent {
            event_type: event.event_type(),
            title: "Fine cleared".to_string(),
            message: format!(
                "Your fine of {} for \"{}\" has been cleared.",
                e.amount.value(),
                book_title
            ),
            action_url: Some(format!("/loans/{}", e.loan_id.value())),
            metadata: Some(json!({
                "loan_id": e.loan_id.value(),
                "amount": e.amount.value(),
            })),
        },
        DomainEvent::LoanOverdue(e) => NotificationContent {
            event_type: event.event_type(),
            title: format!("\"{}\" is overdue", book_title),
            message: format!(
                "\"{}\" was due on {} and is {} day(s) overdue. A fine accrues daily until it is returned.",
                book_title,
                e.deadline.format("%Y-%m-%d"),
                e.days_overdue
            ),
            action_url: Some(format!("/loans/{}", e.loan_id.value())),
            metadata: Some(json!({
                "loan_id": e.loan_id.value(),
                "book_id": e.book_id.value(),
                "days_overdue": e.days_overdue,
            })),
        },
    }
}

/// イベントを通知シンクとメールシンクへ配信する
///
/// 配信はfire-and-forget：失敗はログに記録されるだけで、
/// 主操作を失敗させることはない（リトライもしない）。
pub(super) async fn dispatch(
    deps: &ServiceDependencies,
    member: &Member,
    book: &Book,
    event: &DomainEvent,
) {
    let content = notification_content(event, &book.title);

    let notification = Notification {
        notification_id: NotificationId::new(),
        member_id: member.member_id,
        event_type: content.event_type.to_string(),
        title: content.title.clone(),
        message: content.message.clone(),
        action_url: content.action_url,
        metadata: content.metadata,
        read: false,
        created_at: event.occurred_at(),
    };

    let email = EmailMessage {
        recipient: member.email.clone(),
        subject: content.title,
        body: content.message,
    };

    let (published, sent) = futures::join!(
        deps.notifications.publish(notification),
        deps.email.send(email)
    );

    if let Err(err) = published {
        tracing::warn!(error = %err, event_type = event.event_type(), "failed to record notification");
    }
    if let Err(err) = sent {
        tracing::warn!(error = %err, event_type = event.event_type(), "failed to hand event to email sink");
    }
}

/// 会員と書籍をIDから引いた上で配信する
///
/// 参照の解決に失敗した場合もログに記録して握りつぶす。
pub(super) async fn dispatch_for(
    deps: &ServiceDependencies,
    member_id: MemberId,
    book_id: BookId,
    event: &DomainEvent,
) {
    let member = match deps.members.get(member_id).await {
        Ok(Some(member)) => member,
        Ok(None) => {
            tracing::warn!(member_id = %member_id.value(), "skipping notification: member missing");
            return;
        }
        Err(err) => {
            tracing::warn!(error = %err, "skipping notification: member lookup failed");
            return;
        }
    };

    let book = match deps.catalog.get(book_id).await {
        Ok(Some(book)) => book,
        Ok(None) => {
            tracing::warn!(book_id = %book_id.value(), "skipping notification: book missing");
            return;
        }
        Err(err) => {
            tracing::warn!(error = %err, "skipping notification: book lookup failed");
            return;
        }
    };

    dispatch(deps, &member, &book, event).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FineAmount, LoanIssued, LoanReturned};
    use crate::domain::value_objects::{LoanId, MemberId};
    use chrono::Utc;

    #[test]
    fn test_issued_content_mentions_deadline() {
        let now = Utc::now();
        let event = DomainEvent::LoanIssued(LoanIssued {
            loan_id: LoanId::new(),
            book_id: BookId::new(),
            member_id: MemberId::new(),
            issued_at: now,
            deadline: now,
        });

        let content = notification_content(&event, "Dune");
        assert_eq!(content.event_type, "loan_issued");
        assert!(content.title.contains("Dune"));
        assert!(content.message.contains(&now.format("%Y-%m-%d").to_string()));
        assert!(content.action_url.is_some());
    }

    #[test]
    fn test_returned_content_mentions_fine() {
        let now = Utc::now();
        let event = DomainEvent::LoanReturned(LoanReturned {
            loan_id: LoanId::new(),
            book_id: BookId::new(),
            member_id: MemberId::new(),
            returned_at: now,
            was_overdue: true,
            fine: FineAmount::try_from(25).unwrap(),
            waived: None,
        });

        let content = notification_content(&event, "Dune");
        assert!(content.message.contains("25"));
    }

    #[test]
    fn test_returned_content_mentions_waiver() {
        let now = Utc::now();
        let event = DomainEvent::LoanReturned(LoanReturned {
            loan_id: LoanId::new(),
            book_id: BookId::new(),
            member_id: MemberId::new(),
            returned_at: now,
            was_overdue: true,
            fine: FineAmount::ZERO,
            waived: Some(FineAmount::try_from(15).unwrap()),
        });

        let content = notification_content(&event, "Dune");
        assert!(content.message.contains("waived"));
        assert!(content.message.contains("15"));
    }
}
