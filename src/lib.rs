//! Quizsmith · quiz authoring backend
//!
//! Content arrives as a tree (Test → Questions → Answers → per-language
//! Translations), either from an editor form or from AI generation. Before it is
//! saved, the tree is normalized (`normalize`) and its translation ids are
//! reconciled against the persisted copy (`reconcile`), so a save updates
//! existing rows instead of inserting duplicates.

pub mod config;
pub mod domain;
pub mod error;
pub mod logic;
pub mod normalize;
pub mod openai;
pub mod protocol;
pub mod reconcile;
pub mod routes;
pub mod seeds;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod tree;
pub mod util;

pub use normalize::normalize;
pub use reconcile::reconcile_ids;
