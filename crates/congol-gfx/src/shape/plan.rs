//! Indexed draw policy: which `glDrawElements` calls a selection produces.

use crate::error::{GfxError, Result};

/// Which part of the index buffer to draw.
///
/// `begin` and `end` count in batches of `single_draw_amount` indices;
/// `restart` splits a full draw into one call per `restart` indices.
/// `u32::MAX` or `0` as `restart` means "no restart".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexSelection {
    pub begin: Option<u32>,
    pub end: Option<u32>,
    pub restart: Option<u32>,
}

impl IndexSelection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn batch(begin: u32) -> Self {
        Self {
            begin: Some(begin),
            ..Self::default()
        }
    }

    pub fn batches(begin: u32, end: u32) -> Self {
        Self {
            begin: Some(begin),
            end: Some(end),
            ..Self::default()
        }
    }

    pub fn up_to(end: u32) -> Self {
        Self {
            end: Some(end),
            ..Self::default()
        }
    }

    pub fn chunked(restart: u32) -> Self {
        Self {
            restart: Some(restart),
            ..Self::default()
        }
    }
}

/// One `glDrawElements` call, in indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexedCall {
    pub first: u32,
    pub count: u32,
}

impl IndexedCall {
    /// Offset into a `u32` element buffer.
    pub fn byte_offset(&self) -> usize {
        self.first as usize * std::mem::size_of::<u32>()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawPlan {
    /// Batches `begin..=end`, one call.
    Span { first: u32, count: u32 },
    /// Batch `begin` alone.
    Single { first: u32, count: u32 },
    /// Every batch before `end`.
    Prefix { count: u32 },
    /// The whole index buffer, one call.
    Full { count: u32 },
    /// The whole index buffer, one call per `chunk` indices.
    Chunked { chunk: u32, total: u32 },
}

impl DrawPlan {
    /// Pick the plan for `selection` over an element buffer of
    /// `index_count` indices.
    ///
    /// `begin`/`end` take precedence over `restart`. Batch arithmetic that
    /// does not fit a `u32` index count is reported, not wrapped.
    pub fn resolve(
        selection: IndexSelection,
        single_draw_amount: u32,
        index_count: u32,
    ) -> Result<Self> {
        let restart = selection.restart.filter(|&r| r != 0 && r != u32::MAX);
        let single = single_draw_amount;
        let batches = |n: u32, what: &'static str| {
            single
                .checked_mul(n)
                .ok_or(GfxError::CountOverflow { what })
        };

        Ok(match (selection.begin, selection.end, restart) {
            (Some(begin), Some(end), _) => DrawPlan::Span {
                first: batches(begin, "first batch index")?,
                count: batches(end.saturating_sub(begin), "batch span")?
                    .checked_add(single)
                    .ok_or(GfxError::CountOverflow { what: "batch span" })?,
            },
            (Some(begin), None, _) => DrawPlan::Single {
                first: batches(begin, "first batch index")?,
                count: single,
            },
            (None, Some(end), _) => DrawPlan::Prefix {
                count: batches(end, "batch prefix")?,
            },
            (None, None, None) => DrawPlan::Full { count: index_count },
            (None, None, Some(chunk)) => DrawPlan::Chunked {
                chunk,
                total: index_count,
            },
        })
    }

    /// The calls this plan issues, in order.
    ///
    /// A chunked plan issues `ceil(total / chunk)` calls; the last one is
    /// clamped to the indices that remain.
    pub fn calls(&self) -> Vec<IndexedCall> {
        match *self {
            DrawPlan::Span { first, count } | DrawPlan::Single { first, count } => {
                vec![IndexedCall { first, count }]
            }
            DrawPlan::Prefix { count } | DrawPlan::Full { count } => {
                vec![IndexedCall { first: 0, count }]
            }
            DrawPlan::Chunked { chunk, total } => (0..total.div_ceil(chunk))
                .map(|j| {
                    let first = j * chunk;
                    IndexedCall {
                        first,
                        count: chunk.min(total - first),
                    }
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_selection_draws_everything_once() {
        let plan = DrawPlan::resolve(IndexSelection::all(), 6, 60).unwrap();
        assert_eq!(plan, DrawPlan::Full { count: 60 });
        assert_eq!(plan.calls(), vec![IndexedCall { first: 0, count: 60 }]);

        let max = IndexSelection::chunked(u32::MAX);
        assert_eq!(
            DrawPlan::resolve(max, 6, 60).unwrap(),
            DrawPlan::Full { count: 60 }
        );
    }

    #[test]
    fn begin_only_draws_one_batch() {
        let plan = DrawPlan::resolve(IndexSelection::batch(3), 6, 60).unwrap();
        assert_eq!(plan.calls(), vec![IndexedCall { first: 18, count: 6 }]);
        assert_eq!(plan.calls()[0].byte_offset(), 72);
    }

    #[test]
    fn end_only_scales_by_end() {
        let plan = DrawPlan::resolve(IndexSelection::up_to(4), 6, 60).unwrap();
        assert_eq!(plan.calls(), vec![IndexedCall { first: 0, count: 24 }]);
    }

    #[test]
    fn begin_and_end_span_inclusive_batches() {
        let plan = DrawPlan::resolve(IndexSelection::batches(2, 4), 6, 60).unwrap();
        assert_eq!(plan.calls(), vec![IndexedCall { first: 12, count: 18 }]);
    }

    #[test]
    fn begin_and_end_take_precedence_over_restart() {
        let selection = IndexSelection {
            begin: Some(1),
            end: None,
            restart: Some(4),
        };
        assert_eq!(
            DrawPlan::resolve(selection, 6, 60).unwrap(),
            DrawPlan::Single { first: 6, count: 6 }
        );
    }

    #[test]
    fn restart_splits_into_chunks() {
        let plan = DrawPlan::resolve(IndexSelection::chunked(4), 6, 12).unwrap();
        let calls = plan.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|c| c.count == 4));
        assert_eq!(calls[2].first, 8);
    }

    #[test]
    fn restart_rounds_up_and_clamps_last_chunk() {
        let calls = DrawPlan::resolve(IndexSelection::chunked(4), 6, 10)
            .unwrap()
            .calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[2], IndexedCall { first: 8, count: 2 });

        assert!(DrawPlan::resolve(IndexSelection::chunked(4), 6, 0)
            .unwrap()
            .calls()
            .is_empty());
    }

    #[test]
    fn oversized_batches_are_reported() {
        let overflow = DrawPlan::resolve(IndexSelection::batch(1_000_000_000), 6, 12);
        assert!(matches!(overflow, Err(GfxError::CountOverflow { .. })));
        assert!(DrawPlan::resolve(IndexSelection::up_to(u32::MAX), 2, 12).is_err());
        assert!(DrawPlan::resolve(IndexSelection::batches(0, u32::MAX), 1, 12).is_err());

        let fits = DrawPlan::resolve(IndexSelection::batch(1_000_000_000), 4, 12).unwrap();
        assert_eq!(
            fits,
            DrawPlan::Single {
                first: 4_000_000_000,
                count: 4
            }
        );
    }
}
