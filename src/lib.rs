//! Interactive graph rewriting with the double pushout (DPO) approach.
//!
//! [`dpo`] holds the engine: graphs, rules, matching, the rewrite step and parallel
//! application. [`session`] wraps it in an editing session driven by commands.

pub mod dpo;
pub mod session;
