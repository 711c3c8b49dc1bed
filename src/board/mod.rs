//! Pipeline board state engine.
//!
//! ## Module Map
//!
//! ```text
//!  DealStore + StageCatalog (crate::store)
//!          │ list / list_stages
//!          v
//!  filter.rs   compute() → BoardSnapshot      (pure, re-run on every change)
//!          │ seed
//!          v
//!  controller.rs  BoardController             (visual columns + drag FSM)
//!          │ DragOutcome::Moved(MoveRequest)
//!          v
//!  session.rs  BoardSession::drag_end()       (move_to_stage, reconcile,
//!          │                                   celebrate, notify)
//!          └──> authoritative deal flows back into compute() → re-seed
//! ```
//!
//! | Module       | Responsibility                                          |
//! |--------------|---------------------------------------------------------|
//! | `filter`     | Quick filter + predicate set, grouping, value totals    |
//! | `metrics`    | Probability fallback, time-in-stage, column health      |
//! | `controller` | Ordered per-stage lists and the drag state machine      |
//! | `session`    | Async owner of the controller; talks to the store       |
//! | `notify`     | `Celebration` and `Notifier` side-effect seams          |

pub mod controller;
pub mod filter;
pub mod metrics;
pub mod notify;
pub mod session;

pub use controller::{BoardController, DragOutcome, DragState, Gesture, MoveRequest};
pub use filter::{BoardSnapshot, EvalContext, StageMetrics, compute};
pub use metrics::{DealInsight, StageHealth, TimeThresholds};
pub use notify::{
    Celebration, LogCelebration, LogNotifier, Notification, NotificationLevel, Notifier,
};
pub use session::{BoardSession, LoadState, MoveResult};

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use pipeline_common::{CompanyRef, Deal, DealStatus, Stage, StageId};

    pub fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    pub fn stage(name: &str, order_position: i32, default_probability: Option<u8>) -> Stage {
        Stage {
            id: Uuid::new_v4(),
            name: name.to_string(),
            color_token: "slate".to_string(),
            order_position,
            default_probability,
        }
    }

    /// Deal owned by "me", created 60 days ago, in its stage for one day.
    pub fn deal_in(stage_id: StageId, name: &str, value: i64) -> Deal {
        let now = fixed_now();
        Deal {
            id: Uuid::new_v4(),
            name: name.to_string(),
            company: CompanyRef {
                id: Uuid::new_v4(),
                name: "Acme".to_string(),
            },
            contact: None,
            value: Decimal::from(value),
            stage_id,
            owner_id: "me".to_string(),
            created_at: now - Duration::days(60),
            updated_at: now - Duration::days(60),
            stage_changed_at: now - Duration::days(1),
            expected_close_date: None,
            probability: None,
            status: DealStatus::Active,
            priority: None,
            lead_source: None,
            tags: Vec::new(),
        }
    }
}
