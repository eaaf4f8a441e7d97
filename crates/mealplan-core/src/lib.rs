//! mealplan-core: weekly dinner plan generation and shopping consolidation.
//!
//! The core consumes a read-only recipe corpus and an append-only selection
//! history, and produces ranked plan candidates plus consolidated shopping
//! lists. Persistence and presentation are external collaborators behind the
//! trait seams in [`recipe`], [`history`], and [`external`].

pub mod error;
pub mod external;
pub mod generator;
pub mod history;
pub mod preference;
pub mod ranker;
pub mod recipe;
pub mod service;
pub mod shopping;

pub use error::PlanError;
pub use service::{PlanService, ServiceConfig};
