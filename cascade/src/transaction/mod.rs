//! Navigation transactions.
//!
//! Every navigation begins a transaction. Asynchronous completions carry the
//! id they were started under and drop their result when a newer transaction
//! has begun since; nothing in flight is ever preempted.

mod manager;

pub use manager::{TransactionId, TransactionManager};
