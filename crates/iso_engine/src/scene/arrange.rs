//! Bounding-box refinement of the quadrant order
//!
//! Quadrant bucketing alone draws a long object too early when a small
//! object in the next quadrant sits behind it. This pass walks the flattened
//! draw order one quadrant at a time and moves entries of the following
//! quadrant in front of an entry whose box they lie behind.
//!
//! The walk works on a singly linked list over positions in the draw order.
//! Node 0 is the list head; node `i` is `order[i - 1]`.

use super::entry::{BoundBox, PaintEntry};
use crate::foundation::math::Rotation;

const BIGGER: u8 = 1 << 0;
const NEXT: u8 = 1 << 1;
const IDENTICAL: u8 = 1 << 2;

const HEAD: usize = 0;

/// Scratch buffers for the arrange pass, kept between frames
#[derive(Debug, Default)]
pub(crate) struct Arranger {
    items: Vec<u16>,
    next: Vec<Option<usize>>,
    flags: Vec<u8>,
}

impl Arranger {
    /// Scratch sized for `capacity` entries
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            next: Vec::with_capacity(capacity + 1),
            flags: Vec::with_capacity(capacity + 1),
        }
    }

    /// Reorder `order`, the bucket heads of quadrants `back..=front` in drain
    /// order, so entries behind a box in the previous quadrant draw first
    pub(crate) fn arrange(&mut self, entries: &[PaintEntry], order: &mut Vec<u16>, rotation: Rotation, back: u16, front: u16) {
        if order.len() < 2 {
            return;
        }
        self.items.clear();
        self.items.extend_from_slice(order);
        let len = order.len();
        self.next.clear();
        self.next.extend((0..=len).map(|i| (i < len).then_some(i + 1)));
        self.flags.clear();
        self.flags.resize(len + 1, 0);

        let mut list = OrderList {
            entries,
            items: &self.items,
            next: &mut self.next,
            flags: &mut self.flags,
        };
        let mut cache = list.sweep(HEAD, back, NEXT, rotation);
        let mut quadrant = back.saturating_add(1);
        while quadrant < front {
            cache = list.sweep(cache, quadrant, 0, rotation);
            quadrant += 1;
        }
        list.write_back(order);
    }
}

struct OrderList<'a> {
    entries: &'a [PaintEntry],
    items: &'a [u16],
    next: &'a mut [Option<usize>],
    flags: &'a mut [u8],
}

impl OrderList<'_> {
    fn entry(&self, node: usize) -> &PaintEntry {
        &self.entries[usize::from(self.items[node - 1])]
    }

    fn quadrant(&self, node: usize) -> u32 {
        u32::from(self.entry(node).quadrant)
    }

    fn bounds(&self, node: usize) -> BoundBox {
        self.entry(node).bounds
    }

    /// Sort the nodes of `quadrant` against those of the quadrant after it
    ///
    /// Returns the node the next sweep can start from.
    fn sweep(&mut self, start: usize, quadrant: u16, flag: u8, rotation: Rotation) -> usize {
        let q = u32::from(quadrant);

        let mut node = start;
        loop {
            let Some(next) = self.next[node] else {
                return node;
            };
            if q <= self.quadrant(next) {
                break;
            }
            node = next;
        }
        let cache = node;

        let mut cursor = cache;
        while let Some(next) = self.next[cursor] {
            cursor = next;
            let nq = self.quadrant(next);
            if nq > q + 1 {
                self.flags[next] = BIGGER;
                break;
            } else if nq == q + 1 {
                self.flags[next] = NEXT | IDENTICAL;
            } else if nq == q {
                self.flags[next] = flag | IDENTICAL;
            }
        }

        let mut before = cache;
        loop {
            let anchor = loop {
                let Some(next) = self.next[before] else {
                    return cache;
                };
                if self.flags[next] & BIGGER != 0 {
                    return cache;
                }
                if self.flags[next] & IDENTICAL != 0 {
                    break next;
                }
                before = next;
            };
            self.flags[anchor] &= !IDENTICAL;
            let initial = self.bounds(anchor);

            let mut cursor = anchor;
            while let Some(candidate) = self.next[cursor] {
                if self.flags[candidate] & BIGGER != 0 {
                    break;
                }
                if self.flags[candidate] & NEXT != 0 && is_bbox_intersecting(rotation, &initial, &self.bounds(candidate)) {
                    // unlink the candidate and reinsert it ahead of the anchor
                    self.next[cursor] = self.next[candidate];
                    self.next[candidate] = self.next[before];
                    self.next[before] = Some(candidate);
                } else {
                    cursor = candidate;
                }
            }
        }
    }

    fn write_back(&self, order: &mut Vec<u16>) {
        order.clear();
        let mut node = self.next[HEAD];
        while let Some(n) = node {
            order.push(self.items[n - 1]);
            node = self.next[n];
        }
    }
}

/// True when `b` lies behind `a` from the camera without the boxes
/// interpenetrating
fn is_bbox_intersecting(rotation: Rotation, a: &BoundBox, b: &BoundBox) -> bool {
    if a.z_end < b.z {
        return false;
    }
    match rotation {
        Rotation::R0 => {
            a.y_end >= b.y && a.x_end >= b.x && !(a.z < b.z_end && a.y < b.y_end && a.x < b.x_end)
        }
        Rotation::R1 => {
            a.y_end >= b.y && a.x_end < b.x && !(a.z < b.z_end && a.y < b.y_end && a.x >= b.x_end)
        }
        Rotation::R2 => {
            a.y_end < b.y && a.x_end < b.x && !(a.z < b.z_end && a.y >= b.y_end && a.x >= b.x_end)
        }
        Rotation::R3 => {
            a.y_end < b.y && a.x_end >= b.x && !(a.z < b.z_end && a.y >= b.y_end && a.x < b.x_end)
        }
    }
}
