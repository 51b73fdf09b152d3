pub mod files;
pub mod health;
pub mod reels;

use crate::error::Result;

/// Status code to record for a handler result; successful handlers answer 200.
fn status_of<T>(result: &Result<T>) -> u16 {
    match result {
        Ok(_) => 200,
        Err(e) => e.status().as_u16(),
    }
}
