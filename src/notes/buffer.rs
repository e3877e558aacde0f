//! Fixed-capacity structure-of-arrays note storage.
//!
//! Live notes always occupy rows `[0, len)`, so one contiguous instanced draw
//! covers them. Removal swaps the last row into the hole; [`NoteHandle`]s go
//! through a generation-tagged key table so they survive those moves and go
//! stale once their note is removed or cleared.

use std::collections::BTreeMap;

use super::geometry::{self, FlowParams};

/// Straight-alpha RGBA color.
pub type Rgba = [f32; 4];
/// RGB color.
pub type Rgb = [f32; 3];

/// Reasons an `add` is refused.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum AddError {
    /// Every slot is taken. The note is dropped; callers must not retry.
    #[error("Note buffer full ({capacity} notes)")]
    CapacityExhausted { capacity: usize },
    /// Zero marks an empty slot, so timestamps must be positive.
    #[error("Timestamp must be finite and positive, got {0}")]
    InvalidTimestamp(f64),
}

/// Stable reference to a note across buffer compaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoteHandle {
    index: u32,
    generation: u32,
}

impl NoteHandle {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Glow halo parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteGlow {
    /// Halo reach outside the body in logical pixels.
    pub size: f32,
    pub opacity_top: f32,
    pub opacity_bottom: f32,
    pub color_top: Rgb,
    pub color_bottom: Rgb,
}

impl NoteGlow {
    pub const NONE: Self = Self {
        size: 0.0,
        opacity_top: 0.0,
        opacity_bottom: 0.0,
        color_top: [0.0; 3],
        color_bottom: [0.0; 3],
    };
}

impl Default for NoteGlow {
    fn default() -> Self {
        Self::NONE
    }
}

/// Everything the input dispatcher resolves before adding a note.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteSpec {
    /// Originating column. Diagnostics only.
    pub track_index: u32,
    /// Left edge of the column.
    pub column_x: f32,
    pub width: f32,
    /// Bottom edge of the track.
    pub track_bottom: f32,
    /// Leading (top) edge color.
    pub color_top: Rgba,
    /// Trailing (bottom) edge color.
    pub color_bottom: Rgba,
    /// Clamped to half the body's smaller extent when drawn.
    pub corner_radius: f32,
    pub glow: NoteGlow,
}

impl NoteSpec {
    /// Opaque white note with square corners and no glow.
    pub fn new(track_index: u32, column_x: f32, width: f32, track_bottom: f32) -> Self {
        Self {
            track_index,
            column_x,
            width,
            track_bottom,
            color_top: [1.0; 4],
            color_bottom: [1.0; 4],
            corner_radius: 0.0,
            glow: NoteGlow::NONE,
        }
    }

    pub fn with_colors(mut self, top: Rgba, bottom: Rgba) -> Self {
        self.color_top = top;
        self.color_bottom = bottom;
        self
    }

    pub fn with_corner_radius(mut self, radius: f32) -> Self {
        self.corner_radius = radius;
        self
    }

    pub fn with_glow(mut self, glow: NoteGlow) -> Self {
        self.glow = glow;
        self
    }
}

/// Read-only snapshot of one live note.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteView {
    pub handle: NoteHandle,
    pub start_time: f64,
    /// Zero while the key is held.
    pub end_time: f64,
    pub spec: NoteSpec,
}

impl NoteView {
    pub fn is_active(&self) -> bool {
        self.end_time == 0.0
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct KeySlot {
    generation: u32,
    row: Option<u32>,
}

/// Fixed-capacity note storage, one array per GPU attribute stream.
#[derive(Debug, Clone)]
pub struct NoteBuffer {
    capacity: usize,
    len: usize,
    version: u64,

    start_time: Vec<f64>,
    end_time: Vec<f64>,
    /// `[column_x, track_bottom, width]`
    placement: Vec<[f32; 3]>,
    color_top: Vec<Rgba>,
    color_bottom: Vec<Rgba>,
    /// `[corner_radius, glow_size, glow_opacity_top, glow_opacity_bottom]`
    shape: Vec<[f32; 4]>,
    glow_top: Vec<Rgb>,
    glow_bottom: Vec<Rgb>,
    track_index: Vec<u32>,

    row_key: Vec<u32>,
    keys: Vec<KeySlot>,
    free_keys: Vec<u32>,
}

impl NoteBuffer {
    /// Create an empty buffer with `capacity` zeroed slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            len: 0,
            version: 0,
            start_time: vec![0.0; capacity],
            end_time: vec![0.0; capacity],
            placement: vec![[0.0; 3]; capacity],
            color_top: vec![[0.0; 4]; capacity],
            color_bottom: vec![[0.0; 4]; capacity],
            shape: vec![[0.0; 4]; capacity],
            glow_top: vec![[0.0; 3]; capacity],
            glow_bottom: vec![[0.0; 3]; capacity],
            track_index: vec![0; capacity],
            row_key: vec![0; capacity],
            keys: vec![KeySlot::default(); capacity],
            free_keys: (0..capacity as u32).rev().collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of live notes (`activeCount`).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity
    }

    /// Incremented by every [`clear`](Self::clear), never by cleanup.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Append a held note starting at `now`.
    pub fn add(&mut self, now: f64, spec: &NoteSpec) -> Result<NoteHandle, AddError> {
        if !now.is_finite() || now <= 0.0 {
            return Err(AddError::InvalidTimestamp(now));
        }
        if self.is_full() {
            return Err(AddError::CapacityExhausted {
                capacity: self.capacity,
            });
        }
        let Some(key) = self.free_keys.pop() else {
            return Err(AddError::CapacityExhausted {
                capacity: self.capacity,
            });
        };

        let row = self.len;
        self.start_time[row] = now;
        self.end_time[row] = 0.0;
        self.placement[row] = [spec.column_x, spec.track_bottom, spec.width];
        self.color_top[row] = spec.color_top;
        self.color_bottom[row] = spec.color_bottom;
        self.shape[row] = [
            spec.corner_radius,
            spec.glow.size.max(0.0),
            spec.glow.opacity_top.clamp(0.0, 1.0),
            spec.glow.opacity_bottom.clamp(0.0, 1.0),
        ];
        self.glow_top[row] = spec.glow.color_top;
        self.glow_bottom[row] = spec.glow.color_bottom;
        self.track_index[row] = spec.track_index;

        let slot = &mut self.keys[key as usize];
        slot.row = Some(row as u32);
        self.row_key[row] = key;
        self.len += 1;

        Ok(NoteHandle {
            index: key,
            generation: slot.generation,
        })
    }

    /// Mark a held note as released at `now`.
    ///
    /// Returns `false` when the handle is stale (the note was already cleaned
    /// up or cleared) or the note was already released.
    pub fn finalize(&mut self, handle: NoteHandle, now: f64) -> bool {
        let Some(row) = self.row_of(handle) else {
            return false;
        };
        if self.end_time[row] != 0.0 {
            return false;
        }
        self.end_time[row] = now.max(self.start_time[row]);
        true
    }

    /// Remove every released note that has travelled past its track.
    ///
    /// Returns the number of notes removed. Row order is not preserved.
    pub fn cleanup(&mut self, now: f64, flow: &FlowParams) -> usize {
        let mut removed = 0;
        let mut row = 0;
        while row < self.len {
            let exited = geometry::has_exited(
                self.start_time[row],
                self.end_time[row],
                now,
                self.placement[row][1],
                flow,
            );
            if exited {
                self.swap_remove(row);
                removed += 1;
            } else {
                row += 1;
            }
        }
        removed
    }

    /// Drop every note and bump the version. Returns the new version.
    pub fn clear(&mut self) -> u64 {
        for row in 0..self.len {
            let key = self.row_key[row];
            self.release_key(key);
            self.start_time[row] = 0.0;
            self.end_time[row] = 0.0;
        }
        self.len = 0;
        self.version += 1;
        self.version
    }

    /// Whether `handle` still refers to a live note.
    pub fn contains(&self, handle: NoteHandle) -> bool {
        self.row_of(handle).is_some()
    }

    pub fn get(&self, handle: NoteHandle) -> Option<NoteView> {
        self.row_of(handle).map(|row| self.view(row))
    }

    /// Live notes in row order.
    pub fn iter(&self) -> impl Iterator<Item = NoteView> + '_ {
        (0..self.len).map(move |row| self.view(row))
    }

    /// Live note count per track index.
    pub fn track_counts(&self) -> BTreeMap<u32, usize> {
        let mut counts = BTreeMap::new();
        for &track in self.track_indices() {
            *counts.entry(track).or_insert(0) += 1;
        }
        counts
    }

    /// Earliest start time among live notes.
    pub fn oldest_start(&self) -> Option<f64> {
        self.start_times().iter().copied().reduce(f64::min)
    }

    pub fn start_times(&self) -> &[f64] {
        &self.start_time[..self.len]
    }

    pub fn end_times(&self) -> &[f64] {
        &self.end_time[..self.len]
    }

    pub fn placements(&self) -> &[[f32; 3]] {
        &self.placement[..self.len]
    }

    pub fn colors_top(&self) -> &[Rgba] {
        &self.color_top[..self.len]
    }

    pub fn colors_bottom(&self) -> &[Rgba] {
        &self.color_bottom[..self.len]
    }

    pub fn shapes(&self) -> &[[f32; 4]] {
        &self.shape[..self.len]
    }

    pub fn glow_colors_top(&self) -> &[Rgb] {
        &self.glow_top[..self.len]
    }

    pub fn glow_colors_bottom(&self) -> &[Rgb] {
        &self.glow_bottom[..self.len]
    }

    pub fn track_indices(&self) -> &[u32] {
        &self.track_index[..self.len]
    }

    fn row_of(&self, handle: NoteHandle) -> Option<usize> {
        let slot = self.keys.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.row.map(|row| row as usize)
    }

    fn view(&self, row: usize) -> NoteView {
        let key = self.row_key[row];
        let [column_x, track_bottom, width] = self.placement[row];
        let [corner_radius, glow_size, opacity_top, opacity_bottom] = self.shape[row];
        NoteView {
            handle: NoteHandle {
                index: key,
                generation: self.keys[key as usize].generation,
            },
            start_time: self.start_time[row],
            end_time: self.end_time[row],
            spec: NoteSpec {
                track_index: self.track_index[row],
                column_x,
                width,
                track_bottom,
                color_top: self.color_top[row],
                color_bottom: self.color_bottom[row],
                corner_radius,
                glow: NoteGlow {
                    size: glow_size,
                    opacity_top,
                    opacity_bottom,
                    color_top: self.glow_top[row],
                    color_bottom: self.glow_bottom[row],
                },
            },
        }
    }

    fn release_key(&mut self, key: u32) {
        let slot = &mut self.keys[key as usize];
        slot.generation = slot.generation.wrapping_add(1);
        slot.row = None;
        self.free_keys.push(key);
    }

    fn swap_remove(&mut self, row: usize) {
        let last = self.len - 1;
        self.release_key(self.row_key[row]);

        if row != last {
            self.start_time.swap(row, last);
            self.end_time.swap(row, last);
            self.placement.swap(row, last);
            self.color_top.swap(row, last);
            self.color_bottom.swap(row, last);
            self.shape.swap(row, last);
            self.glow_top.swap(row, last);
            self.glow_bottom.swap(row, last);
            self.track_index.swap(row, last);

            let moved = self.row_key[last];
            self.row_key[row] = moved;
            self.keys[moved as usize].row = Some(row as u32);
        }

        self.start_time[last] = 0.0;
        self.end_time[last] = 0.0;
        self.len = last;
    }
}
