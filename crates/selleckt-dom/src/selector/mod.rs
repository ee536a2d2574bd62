//! CSS selectors for querying the document.

mod matcher;
mod parser;
mod types;

pub use matcher::SelectorMatcher;
pub use parser::{parse_selector, parse_selector_list};
pub use types::*;
