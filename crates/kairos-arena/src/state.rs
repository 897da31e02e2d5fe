//! The unlocked state container of an entity.
//!
//! [`EntityState`] holds the three row buffers and the tick countdown.
//! It performs no locking; the engine wraps it in a timed `RwLock`.
//! Every mutator except [`adjust`](EntityState::adjust) and the
//! `with_*` construction helpers writes only `delta` fields.

use kairos_core::SetId;

use crate::error::RowError;
use crate::ranges::ChangedRanges;
use crate::rows::{Row, RowKind, SetDef, SetRow, Wrapping};

/// Outcome of [`EntityState::adjust`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Adjusted {
    /// At least one row was committed.
    pub changed: bool,
    /// The committed dynamic status flipped.
    pub dynamic_changed: bool,
}

/// Sets, bytes, and vec buffers of one entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityState {
    sets: Vec<SetRow>,
    bytes: Vec<Row<i8>>,
    vec: Vec<Row<i64>>,
    sets_changed: ChangedRanges,
    bytes_changed: ChangedRanges,
    vec_changed: ChangedRanges,
    clock: i64,
}

impl Default for EntityState {
    fn default() -> Self {
        Self::new([])
    }
}

impl EntityState {
    /// Row index of the dynamic flag in every entity.
    pub const IS_DYNAMIC_INDEX: usize = 0;
    /// Row index of the tick period in every entity.
    pub const TICK_PERIOD_INDEX: usize = 1;
    /// Tick period of a freshly built entity.
    pub const DEFAULT_TICK_PERIOD: i64 = 10;

    /// Build a state from user set declarations.
    ///
    /// The reserved sets are always present at fixed indices. User sets
    /// are sorted by id; reserved or duplicate ids are dropped with a
    /// warning.
    pub fn new(user_sets: impl IntoIterator<Item = SetDef>) -> Self {
        let mut user: Vec<SetDef> = user_sets
            .into_iter()
            .filter(|def| {
                if def.id.is_reserved() {
                    tracing::warn!(id = %def.id, "set id is reserved, dropped");
                    return false;
                }
                true
            })
            .collect();
        user.sort_by_key(|def| def.id);
        user.dedup_by(|next, kept| {
            let dup = next.id == kept.id;
            if dup {
                tracing::warn!(id = %next.id, "duplicate set id, dropped");
            }
            dup
        });

        let mut sets = Vec::with_capacity(user.len() + 2);
        sets.push(SetRow::from(SetDef::new(SetId::IS_DYNAMIC, 0)));
        sets.push(SetRow::from(SetDef::new(
            SetId::TICK_PERIOD,
            Self::DEFAULT_TICK_PERIOD,
        )));
        sets.extend(user.into_iter().map(SetRow::from));

        Self {
            sets,
            bytes: Vec::new(),
            vec: Vec::new(),
            sets_changed: ChangedRanges::new(),
            bytes_changed: ChangedRanges::new(),
            vec_changed: ChangedRanges::new(),
            clock: 0,
        }
    }

    /// Set the committed dynamic flag at construction.
    pub fn with_dynamic(mut self, dynamic: bool) -> Self {
        self.sets[Self::IS_DYNAMIC_INDEX].value = i64::from(dynamic);
        self
    }

    /// Set the committed tick period at construction.
    pub fn with_tick_period(mut self, period: i64) -> Self {
        self.sets[Self::TICK_PERIOD_INDEX].value = period;
        self
    }

    /// Initialize the committed byte buffer.
    pub fn with_bytes(mut self, values: &[i8]) -> Self {
        self.bytes = values.iter().map(|&v| Row { value: v, delta: 0 }).collect();
        self.bytes_changed.clear();
        self
    }

    /// Initialize the committed vec buffer.
    pub fn with_vec(mut self, values: &[i64]) -> Self {
        self.vec = values.iter().map(|&v| Row { value: v, delta: 0 }).collect();
        self.vec_changed.clear();
        self
    }

    // ── sets ───────────────────────────────────────────────────────

    /// All set rows, sorted by id.
    pub fn sets(&self) -> &[SetRow] {
        &self.sets
    }

    /// Row index of the set `id`.
    pub fn index_of(&self, id: SetId) -> Option<usize> {
        self.sets.binary_search_by_key(&id, |row| row.id).ok()
    }

    /// Row index of the set `id`, or [`RowError::UnknownSet`].
    pub fn require_index(&self, id: SetId) -> Result<usize, RowError> {
        self.index_of(id).ok_or(RowError::UnknownSet { id })
    }

    /// Committed value at `index`.
    pub fn get(&self, index: usize) -> Result<i64, RowError> {
        self.set_row(index).map(|row| row.value)
    }

    /// Fixed-point scale at `index`.
    pub fn scale(&self, index: usize) -> Result<i64, RowError> {
        self.set_row(index).map(|row| row.scale)
    }

    /// Propose `value` as the next committed value at `index`.
    pub fn set(&mut self, index: usize, value: i64) -> Result<(), RowError> {
        let row = self.set_row_mut(index)?;
        row.delta = value.wrapping_sub(row.value);
        self.sets_changed.mark(index, 1);
        Ok(())
    }

    /// Add `delta` to the pending change at `index`.
    pub fn apply_delta(&mut self, index: usize, delta: i64) -> Result<(), RowError> {
        let row = self.set_row_mut(index)?;
        row.delta = row.delta.wrapping_add(delta);
        self.sets_changed.mark(index, 1);
        Ok(())
    }

    /// Committed dynamic flag.
    pub fn is_dynamic(&self) -> bool {
        self.sets[Self::IS_DYNAMIC_INDEX].value != 0
    }

    /// Propose a new dynamic flag.
    pub fn set_dynamic(&mut self, dynamic: bool) {
        let row = &mut self.sets[Self::IS_DYNAMIC_INDEX];
        row.delta = i64::from(dynamic).wrapping_sub(row.value);
        self.sets_changed.mark(Self::IS_DYNAMIC_INDEX, 1);
    }

    /// Committed tick period.
    pub fn tick_period(&self) -> i64 {
        self.sets[Self::TICK_PERIOD_INDEX].value
    }

    /// Propose a new tick period.
    pub fn set_tick_period(&mut self, period: i64) {
        let row = &mut self.sets[Self::TICK_PERIOD_INDEX];
        row.delta = period.wrapping_sub(row.value);
        self.sets_changed.mark(Self::TICK_PERIOD_INDEX, 1);
    }

    // ── clock ──────────────────────────────────────────────────────

    /// Advance the tick countdown.
    ///
    /// Returns `true` when the countdown is at zero, and restarts it at
    /// `tick_period - 1`. A non-positive period leaves the countdown
    /// negative, so the entity stops ticking.
    pub fn clock(&mut self) -> bool {
        if self.clock == 0 {
            self.reset_clock();
            return true;
        }
        if self.clock > 0 && self.tick_period() > 0 {
            self.clock -= 1;
        }
        false
    }

    /// Current countdown value.
    pub fn clock_value(&self) -> i64 {
        self.clock
    }

    /// Overwrite the countdown.
    pub fn set_clock(&mut self, clock: i64) {
        self.clock = clock;
    }

    /// Restart the countdown from the committed tick period.
    pub fn reset_clock(&mut self) {
        self.clock = self.tick_period().wrapping_sub(1);
    }

    // ── commit ─────────────────────────────────────────────────────

    /// Whether any row has an uncommitted change.
    pub fn is_changed(&self) -> bool {
        !self.sets_changed.is_empty()
            || !self.bytes_changed.is_empty()
            || !self.vec_changed.is_empty()
    }

    /// Fold every pending delta into its committed value.
    ///
    /// Only marked ranges are visited. Calling this twice in a row is a
    /// no-op the second time.
    pub fn adjust(&mut self) -> Adjusted {
        let changed = self.is_changed();
        let was_dynamic = self.is_dynamic();

        for range in self.sets_changed.iter() {
            if let Some(rows) = self.sets.get_mut(range) {
                for row in rows {
                    row.value = row.value.wrapping_add(row.delta);
                    row.delta = 0;
                }
            }
        }
        commit_rows(&mut self.bytes, &self.bytes_changed);
        commit_rows(&mut self.vec, &self.vec_changed);

        self.sets_changed.clear();
        self.bytes_changed.clear();
        self.vec_changed.clear();

        Adjusted {
            changed,
            dynamic_changed: was_dynamic != self.is_dynamic(),
        }
    }

    // ── bytes ──────────────────────────────────────────────────────

    /// Raw byte rows.
    pub fn byte_rows(&self) -> &[Row<i8>] {
        &self.bytes
    }

    /// Number of byte rows.
    pub fn bytes_len(&self) -> usize {
        self.bytes.len()
    }

    /// Committed byte at `index`.
    pub fn bytes_get(&self, index: usize) -> Result<i8, RowError> {
        row_at(&self.bytes, RowKind::Bytes, index).map(|row| row.value)
    }

    /// Every committed byte.
    pub fn bytes_get_all(&self) -> Vec<i8> {
        self.bytes.iter().map(|row| row.value).collect()
    }

    /// Committed bytes in `[offset, offset + count)`.
    pub fn bytes_read(&self, offset: usize, count: usize) -> Result<Vec<i8>, RowError> {
        span(&self.bytes, RowKind::Bytes, offset, count)
            .map(|rows| rows.iter().map(|row| row.value).collect())
    }

    /// Propose `value` at `index`.
    pub fn bytes_set(&mut self, index: usize, value: i8) -> Result<(), RowError> {
        write_values(&mut self.bytes, &mut self.bytes_changed, RowKind::Bytes, index, &[value])
    }

    /// Propose `values` starting at `offset`.
    pub fn bytes_write(&mut self, offset: usize, values: &[i8]) -> Result<(), RowError> {
        write_values(&mut self.bytes, &mut self.bytes_changed, RowKind::Bytes, offset, values)
    }

    /// Add `delta` at `index`.
    pub fn bytes_apply_delta(&mut self, index: usize, delta: i8) -> Result<(), RowError> {
        add_deltas(&mut self.bytes, &mut self.bytes_changed, RowKind::Bytes, index, &[delta], false)
    }

    /// Add `deltas` starting at `offset`.
    pub fn bytes_write_delta(&mut self, offset: usize, deltas: &[i8]) -> Result<(), RowError> {
        add_deltas(&mut self.bytes, &mut self.bytes_changed, RowKind::Bytes, offset, deltas, false)
    }

    /// Subtract `deltas` starting at `offset`.
    pub fn bytes_erase_delta(&mut self, offset: usize, deltas: &[i8]) -> Result<(), RowError> {
        add_deltas(&mut self.bytes, &mut self.bytes_changed, RowKind::Bytes, offset, deltas, true)
    }

    /// Grow with zero rows or truncate to `len`.
    pub fn bytes_resize(&mut self, len: usize) {
        self.bytes.resize(len, Row::default());
        self.bytes_changed.truncate(len);
    }

    // ── vec ────────────────────────────────────────────────────────

    /// Raw vec rows.
    pub fn vec_rows(&self) -> &[Row<i64>] {
        &self.vec
    }

    /// Number of vec rows.
    pub fn vec_len(&self) -> usize {
        self.vec.len()
    }

    /// Committed element at `index`.
    pub fn vec_get(&self, index: usize) -> Result<i64, RowError> {
        row_at(&self.vec, RowKind::Vec, index).map(|row| row.value)
    }

    /// Every committed element.
    pub fn vec_get_all(&self) -> Vec<i64> {
        self.vec.iter().map(|row| row.value).collect()
    }

    /// Committed elements in `[offset, offset + count)`.
    pub fn vec_read(&self, offset: usize, count: usize) -> Result<Vec<i64>, RowError> {
        span(&self.vec, RowKind::Vec, offset, count)
            .map(|rows| rows.iter().map(|row| row.value).collect())
    }

    /// Propose `value` at `index`.
    pub fn vec_set(&mut self, index: usize, value: i64) -> Result<(), RowError> {
        write_values(&mut self.vec, &mut self.vec_changed, RowKind::Vec, index, &[value])
    }

    /// Propose `values` starting at `offset`.
    pub fn vec_write(&mut self, offset: usize, values: &[i64]) -> Result<(), RowError> {
        write_values(&mut self.vec, &mut self.vec_changed, RowKind::Vec, offset, values)
    }

    /// Add `delta` at `index`.
    pub fn vec_apply_delta(&mut self, index: usize, delta: i64) -> Result<(), RowError> {
        add_deltas(&mut self.vec, &mut self.vec_changed, RowKind::Vec, index, &[delta], false)
    }

    /// Add `deltas` starting at `offset`.
    pub fn vec_write_delta(&mut self, offset: usize, deltas: &[i64]) -> Result<(), RowError> {
        add_deltas(&mut self.vec, &mut self.vec_changed, RowKind::Vec, offset, deltas, false)
    }

    /// Subtract `deltas` starting at `offset`.
    pub fn vec_erase_delta(&mut self, offset: usize, deltas: &[i64]) -> Result<(), RowError> {
        add_deltas(&mut self.vec, &mut self.vec_changed, RowKind::Vec, offset, deltas, true)
    }

    /// Grow with zero rows or truncate to `len`.
    pub fn vec_resize(&mut self, len: usize) {
        self.vec.resize(len, Row::default());
        self.vec_changed.truncate(len);
    }

    /// Append `values`; they become visible after the next commit.
    pub fn vec_add(&mut self, values: &[i64]) {
        let start = self.vec.len();
        self.vec.extend(values.iter().map(|&v| Row::pending(v)));
        self.vec_changed.mark(start, values.len());
    }

    /// Insert `record` in front of the first record whose key is not
    /// less than `record[0]`, treating the buffer as records of
    /// `record.len()` elements.
    pub fn vec_add_sorted(&mut self, record: &[i64]) {
        let Some(&key) = record.first() else {
            return;
        };
        let at = self.vec_lower_bound(key, record.len());
        self.splice_pending(at, record);
    }

    /// Insert `values` before `index`.
    pub fn vec_insert(&mut self, index: usize, values: &[i64]) -> Result<(), RowError> {
        if index > self.vec.len() {
            return Err(RowError::InvalidIndex {
                kind: RowKind::Vec,
                index,
                len: self.vec.len(),
            });
        }
        self.splice_pending(index, values);
        Ok(())
    }

    /// Remove `count` rows starting at `index`.
    pub fn vec_erase(&mut self, index: usize, count: usize) -> Result<(), RowError> {
        span(&self.vec, RowKind::Vec, index, count)?;
        self.vec.drain(index..index + count);
        self.vec_changed.mark_all(self.vec.len());
        Ok(())
    }

    /// Remove the first record of `stride` rows whose key equals `value`.
    pub fn vec_erase_by_value(&mut self, value: i64, stride: usize) -> Result<(), RowError> {
        if stride == 0 {
            return Err(RowError::ZeroStride);
        }
        let found = (0..self.vec.len() / stride)
            .map(|record| record * stride)
            .find(|&at| self.vec[at].projected() == value);
        match found {
            Some(at) => self.vec_erase(at, stride),
            None => Err(RowError::ValueNotFound { value }),
        }
    }

    /// Binary-search the record of `stride` rows keyed by `value` and
    /// remove it.
    pub fn vec_erase_by_value_sorted(&mut self, value: i64, stride: usize) -> Result<(), RowError> {
        if stride == 0 {
            return Err(RowError::ZeroStride);
        }
        let at = self.vec_lower_bound(value, stride);
        if at + stride <= self.vec.len() && self.vec[at].projected() == value {
            self.vec_erase(at, stride)
        } else {
            Err(RowError::ValueNotFound { value })
        }
    }

    /// First record start whose projected key is not less than `key`.
    fn vec_lower_bound(&self, key: i64, stride: usize) -> usize {
        let stride = stride.max(1);
        let records = self.vec.len() / stride;
        let mut lo = 0;
        let mut hi = records;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.vec[mid * stride].projected() < key {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo * stride
    }

    fn splice_pending(&mut self, at: usize, values: &[i64]) {
        self.vec
            .splice(at..at, values.iter().map(|&v| Row::pending(v)));
        self.vec_changed.mark_all(self.vec.len());
    }

    // ── helpers ────────────────────────────────────────────────────

    fn set_row(&self, index: usize) -> Result<&SetRow, RowError> {
        let len = self.sets.len();
        self.sets.get(index).ok_or(RowError::InvalidIndex {
            kind: RowKind::Sets,
            index,
            len,
        })
    }

    fn set_row_mut(&mut self, index: usize) -> Result<&mut SetRow, RowError> {
        let len = self.sets.len();
        self.sets.get_mut(index).ok_or(RowError::InvalidIndex {
            kind: RowKind::Sets,
            index,
            len,
        })
    }
}

fn row_at<T>(rows: &[Row<T>], kind: RowKind, index: usize) -> Result<&Row<T>, RowError> {
    rows.get(index).ok_or(RowError::InvalidIndex {
        kind,
        index,
        len: rows.len(),
    })
}

fn span<T>(rows: &[Row<T>], kind: RowKind, offset: usize, count: usize) -> Result<&[Row<T>], RowError> {
    offset
        .checked_add(count)
        .and_then(|end| rows.get(offset..end))
        .ok_or(RowError::InvalidRange {
            kind,
            offset,
            count,
            len: rows.len(),
        })
}

fn write_values<T: Wrapping>(
    rows: &mut [Row<T>],
    changed: &mut ChangedRanges,
    kind: RowKind,
    offset: usize,
    values: &[T],
) -> Result<(), RowError> {
    span(rows, kind, offset, values.len())?;
    for (row, &v) in rows[offset..].iter_mut().zip(values) {
        row.delta = v.sub(row.value);
    }
    changed.mark(offset, values.len());
    Ok(())
}

fn add_deltas<T: Wrapping>(
    rows: &mut [Row<T>],
    changed: &mut ChangedRanges,
    kind: RowKind,
    offset: usize,
    deltas: &[T],
    negate: bool,
) -> Result<(), RowError> {
    span(rows, kind, offset, deltas.len())?;
    for (row, &d) in rows[offset..].iter_mut().zip(deltas) {
        row.delta = if negate { row.delta.sub(d) } else { row.delta.add(d) };
    }
    changed.mark(offset, deltas.len());
    Ok(())
}

fn commit_rows<T: Wrapping>(rows: &mut [Row<T>], changed: &ChangedRanges) {
    for range in changed.iter() {
        if let Some(slice) = rows.get_mut(range) {
            for row in slice {
                row.commit();
            }
        }
    }
}
