//! Element location and selector self-heal
//!
//! This crate implements:
//! - Natural-language element search over four strategies (text, ARIA,
//!   semantic taxonomy, visual region)
//! - Alternative selector generation for selectors that stopped matching
//! - A page query port ([`DomQueryable`]) plus a captured-page implementation

pub mod errors;
pub mod finder;
pub mod healer;
pub mod ports;
pub mod query;
pub mod selector;
pub mod snapshot;
pub mod strategies;
pub mod types;

pub use errors::*;
pub use finder::*;
pub use healer::*;
pub use ports::*;
pub use query::{ElementType, ParsedQuery, PositionHint};
pub use selector::{decompose, decompose_groups, AttrMatcher, AttrOp, SelectorParts};
pub use snapshot::*;
pub use strategies::*;
pub use types::*;
