//! Price level aggregation
//!
//! Pure functions that collapse raw resting orders into depth-limited,
//! price-sorted levels. Comparison is exact decimal, so two orders at the
//! same printed price always merge into one level.

use crate::data::{Order, PriceLevel};

/// Sort direction for one side of the book.
///
/// Supplied by the caller: bids aggregate descending (best bid first), asks
/// ascending (best ask first).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceOrdering {
    Ascending,
    Descending,
}

/// Aggregate raw orders into at most `depth_limit` price levels.
///
/// Orders at equal price are merged by summing remaining volume, regardless
/// of input order. Empty input yields an empty vector.
pub fn aggregate(orders: &[Order], depth_limit: usize, ordering: PriceOrdering) -> Vec<PriceLevel> {
    let mut sorted: Vec<&Order> = orders.iter().collect();
    match ordering {
        PriceOrdering::Ascending => sorted.sort_by(|a, b| a.price.cmp(&b.price)),
        PriceOrdering::Descending => sorted.sort_by(|a, b| b.price.cmp(&a.price)),
    }

    let mut levels: Vec<PriceLevel> = Vec::new();
    for order in sorted {
        match levels.last_mut() {
            Some(level) if level.price == order.price => {
                level.volume += order.remaining_volume;
            }
            _ => {
                if levels.len() == depth_limit {
                    break;
                }
                levels.push(PriceLevel {
                    price: order.price,
                    volume: order.remaining_volume,
                });
            }
        }
    }

    levels
}
