//! Order-maintenance tags.
//!
//! Every live node carries an `i32` tag that increases strictly along the
//! list, so comparing two positions is a single integer comparison. Begin and
//! End own the extreme tags and are never relabeled.
//!
//! Inserting between two nodes whose tags are adjacent relabels the smallest
//! aligned tag window around the insertion point that is sparse enough:
//!
//! ```text
//! tag space (offset):  0 ─────────────────────────────────────── 2^32-1
//! level 1 window:           [..]
//! level 2 window:          [....]
//! level k window:      [...............]   accept when n < 2^k / t^k
//!                                           and each gap is >= 3
//! ```
//!
//! `t = (2^32 / len)^(1/32)` makes the density bound loosen geometrically
//! toward the root, which keeps relabeling amortized logarithmic.

use super::{NodeId, Shape};

pub(super) const TAG_BITS: u32 = 32;

/// Floor average of two tags without overflow.
pub(super) fn average(x: i32, y: i32) -> i32 {
    (x & y) + ((x ^ y) >> 1)
}

/// Position of a tag in the unsigned tag space.
pub(super) fn offset(tag: i32) -> u64 {
    (tag as i64 - i32::MIN as i64) as u64
}

pub(super) fn from_offset(offset: u64) -> i32 {
    (offset as i64 + i32::MIN as i64) as i32
}

impl Shape {
    /// Relabel the minimum sparse enclosing window around `around` so that
    /// the gap after it is at least 2.
    pub(super) fn relabel(&mut self, around: NodeId) {
        let total = (self.len + 2) as f64;
        let t = (2f64.powi(TAG_BITS as i32) / total).powf(1.0 / TAG_BITS as f64);
        let base = offset(self.tag(around));
        let mut threshold = 1.0f64;

        for level in 1..=TAG_BITS {
            threshold /= t;
            let range = 1u64 << level;
            let low = base & !(range - 1);
            let high = low + range - 1;
            let members = self.window(around, low, high);
            let n = members.len() as u64;
            let step = range / (n + 1);
            let sparse = (n as f64) < range as f64 * threshold;
            if (sparse && step >= 3) || level == TAG_BITS {
                tracing::trace!(level, members = n, step, "relabel tag window");
                for (i, id) in members.into_iter().enumerate() {
                    self.slots[id.index()].tag = from_offset(low + step * (i as u64 + 1));
                }
                return;
            }
        }
    }

    /// Non-sentinel nodes whose tags fall in `[low, high]`, in list order.
    fn window(&self, around: NodeId, low: u64, high: u64) -> Vec<NodeId> {
        let mut left = around;
        while left != NodeId::BEGIN {
            let prev = self.slots[left.index()].prev;
            if prev == NodeId::BEGIN || offset(self.tag(prev)) < low {
                break;
            }
            left = prev;
        }
        let mut cursor = if left == NodeId::BEGIN { self.slots[left.index()].next } else { left };
        let mut members = Vec::new();
        while cursor != NodeId::END && offset(self.tag(cursor)) <= high {
            members.push(cursor);
            cursor = self.slots[cursor.index()].next;
        }
        members
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_stays_between_extremes() {
        assert_eq!(average(i32::MIN, i32::MAX), -1);
        assert_eq!(average(4, 8), 6);
        assert_eq!(average(-3, -1), -2);
        let mid = average(i32::MIN, i32::MIN + 2);
        assert_eq!(mid, i32::MIN + 1);
    }

    #[test]
    fn offsets_round_trip() {
        for tag in [i32::MIN, -1, 0, 1, i32::MAX] {
            assert_eq!(from_offset(offset(tag)), tag);
        }
        assert_eq!(offset(i32::MIN), 0);
        assert_eq!(offset(i32::MAX), u32::MAX as u64);
    }
}
