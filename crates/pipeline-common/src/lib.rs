//! Shared domain types for the pipeline board.
//!
//! Everything here is plain data: stages, deals, the filter predicate set
//! and the explicit view state handed to the board engine. Behaviour lives
//! in the `pipeline-board` crate.

pub mod deal;
pub mod filter;
pub mod stage;
pub mod view;

pub use deal::{
    ClearableField, CompanyRef, ContactRef, Deal, DealId, DealPatch, DealSize, DealStatus,
    NewDeal, Priority, TimeStatus,
};
pub use filter::{DateField, DateRange, FilterSet, QuickFilter};
pub use stage::{Stage, StageId};
pub use view::{OwnerScope, SortMode, ViewState};
