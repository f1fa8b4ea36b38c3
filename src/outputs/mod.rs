//! Output generation for harvested posts.
//!
//! # Submodules
//!
//! - [`json`]: Writes the persisted projection of retained posts to a JSON file
//!
//! # Output Structure
//!
//! ```text
//! data/
//! └── tweets_with_bias.json   # [{"user", "text", "bias", "id"}, ...]
//! ```

pub mod json;
