//! Convenient imports for typical `pgguard` usage.
//!
//! ```ignore
//! use pgguard::prelude::*;
//! ```

pub use crate::{
    Assignments, Db, Executor, Filter, GuardConfig, GuardError, GuardResult, Mode, Page, Record,
    SetValue, Tx,
};
