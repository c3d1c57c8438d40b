//! Human order number generator
//!
//! 5 位随机数渲染为固定 NN-NNN 形状，与存储比对防碰撞。
//! 重试有上界：外部存储故障时显式失败，绝不静默死循环。

use rand::Rng;

use crate::orders::store::OrderStore;
use crate::utils::{AppError, AppResult};

/// Collision-retry bound; exceeding it is an explicit exhaustion error
const MAX_ATTEMPTS: usize = 20;

/// Render a 5-digit draw (10000..=99999) as NN-NNN
fn format_number(n: u32) -> String {
    format!("{:02}-{:03}", n / 1000, n % 1000)
}

fn draw() -> u32 {
    rand::thread_rng().gen_range(10_000..=99_999)
}

/// Allocate a free order number, checking the store for collisions.
///
/// Uniqueness holds because the number is only returned after the store
/// reports no existing order with that secondary key; creation happens
/// immediately after in the same request.
pub async fn allocate(store: &dyn OrderStore) -> AppResult<String> {
    for _ in 0..MAX_ATTEMPTS {
        let number = format_number(draw());
        if store.find_by_number(&number).await?.is_none() {
            return Ok(number);
        }
    }
    Err(AppError::internal(format!(
        "No free order number after {MAX_ATTEMPTS} attempts"
    )))
}

/// Check the fixed NN-NNN shape
pub fn is_valid_shape(number: &str) -> bool {
    let bytes = number.as_bytes();
    bytes.len() == 6
        && bytes[2] == b'-'
        && bytes[..2].iter().all(u8::is_ascii_digit)
        && bytes[3..].iter().all(u8::is_ascii_digit)
        && bytes[0] != b'0'
}
