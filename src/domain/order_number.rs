//! Human-facing order numbers.

use chrono::Utc;
use rand::Rng;

/// `SI-<last six digits of epoch millis>-<random 1000..=9999>`.
///
/// Not globally unique: concurrent creations inside the same millisecond
/// bucket can draw the same suffix. The unique index on
/// `orders.order_number` is the backstop; a collision fails the insert and
/// is never retried.
pub fn generate() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen_range(1000..=9999);
    format!("SI-{:06}-{}", millis.rem_euclid(1_000_000), suffix)
}
