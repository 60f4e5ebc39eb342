//! # Paint Session
//!
//! A per-frame arena of paint entries plus the 512 quadrant buckets that
//! order them.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle --begin_frame--> Accumulating --drain_in_order--> Draining --> Idle
//! ```
//!
//! While accumulating, the scene walk sets a cursor (tile, interaction kind,
//! element) and calls the `insert*`, `attach*` and `add_string` methods.
//! Draining visits the touched quadrants back to front, then the strings.
//! The arena is only rewound by the next `begin_frame` or by [`PaintSession::reset`],
//! so the last frame stays available for hit testing.
//!
//! ## Capacity
//!
//! Entries, attachments and strings share one fixed capacity. Storage is
//! reserved up front, so painting never allocates. When the arena is full,
//! requests fail with [`PaintError::Overflow`]; the first overflow of a
//! frame is logged and later ones are only counted.

use super::arrange::Arranger;
use super::entry::{AttachRef, AttachedEntry, BoundBox, ElementRef, EntryRef, Link, PaintEntry, StringEntry, TilePosition};
use super::{InteractionKind, PaintError, Result};
use crate::assets::SpriteSheet;
use crate::core::config::{BucketOrder, PaintConfig, MAX_PAINT_CAPACITY};
use crate::foundation::math::{project, MapCoords, Rotation, ScreenCoords, ScreenRect};
use crate::render::ImageId;

/// Number of quadrant buckets
pub const QUADRANT_COUNT: usize = 512;

/// Engine units covered by one quadrant along the diagonal
const QUADRANT_SIZE: i32 = 32;

/// Where a session is in its frame cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// No frame in progress
    #[default]
    Idle,
    /// Accepting paint requests
    Accumulating,
    /// Handing entries to a visitor
    Draining,
}

/// Per-frame counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    /// Entries placed, chained ones included
    pub inserted: usize,
    /// Entries chained to a previous entry
    pub chained: usize,
    /// Requests rejected as off screen
    pub culled: usize,
    /// Requests rejected because the arena was full
    pub dropped: usize,
    /// Attachments placed
    pub attachments: usize,
    /// Strings placed
    pub strings: usize,
    /// Lowest and highest quadrant touched
    pub quadrant_range: Option<(u16, u16)>,
    /// Entries and attachments the renderer could not draw
    pub skipped: usize,
}

/// Receives a frame's entries in draw order
pub trait PaintVisitor {
    /// Error type; session misuse is reported through it too
    type Error: From<PaintError>;

    /// Called once per entry, back to front
    fn visit_entry(&mut self, entry: &PaintEntry) -> std::result::Result<(), Self::Error>;

    /// Called for each attachment right after its parent
    fn visit_attachment(&mut self, parent: &PaintEntry, attachment: &AttachedEntry) -> std::result::Result<(), Self::Error>;

    /// Called for each string after all entries, in insertion order
    fn visit_string(&mut self, string: &StringEntry) -> std::result::Result<(), Self::Error> {
        let _ = string;
        Ok(())
    }
}

/// Per-frame paint arena and quadrant sorter
#[derive(Debug)]
pub struct PaintSession {
    capacity: usize,
    bucket_order: BucketOrder,
    sort_bounding_boxes: bool,

    state: SessionState,
    generation: u32,
    visible: ScreenRect,
    zoom: u8,
    rotation: Rotation,

    entries: Vec<PaintEntry>,
    attachments: Vec<AttachedEntry>,
    strings: Vec<StringEntry>,
    heads: [Link; QUADRANT_COUNT],
    tails: [Link; QUADRANT_COUNT],
    quadrant_range: Option<(u16, u16)>,
    order: Vec<u16>,
    arranger: Arranger,

    // scene walk cursor
    sprite_position: TilePosition,
    interaction: InteractionKind,
    map_position: TilePosition,
    current_element: Option<ElementRef>,
    last_entry: Link,

    stats: FrameStats,
    overflow_reported: bool,
}

impl PaintSession {
    /// Create a session sized and ordered by `config`
    pub fn new(config: &PaintConfig) -> Self {
        let capacity = config.capacity.clamp(1, MAX_PAINT_CAPACITY);
        Self {
            capacity,
            bucket_order: config.bucket_order,
            sort_bounding_boxes: config.sort_bounding_boxes,
            state: SessionState::Idle,
            generation: 0,
            visible: ScreenRect::default(),
            zoom: 0,
            rotation: Rotation::R0,
            entries: Vec::with_capacity(capacity),
            attachments: Vec::with_capacity(capacity),
            strings: Vec::with_capacity(capacity),
            heads: [None; QUADRANT_COUNT],
            tails: [None; QUADRANT_COUNT],
            quadrant_range: None,
            order: Vec::with_capacity(capacity),
            arranger: Arranger::with_capacity(capacity),
            sprite_position: TilePosition::default(),
            interaction: InteractionKind::None,
            map_position: TilePosition::default(),
            current_element: None,
            last_entry: None,
            stats: FrameStats::default(),
            overflow_reported: false,
        }
    }

    /// Create a session with default ordering and the given capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(&PaintConfig {
            capacity,
            ..PaintConfig::default()
        })
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Camera rotation of the current frame
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Zoom level of the current frame
    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// Screen area entries are culled against
    pub fn visible_rect(&self) -> ScreenRect {
        self.visible
    }

    /// Maximum entries, attachments and strings per frame
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Arena slots used this frame
    pub fn used(&self) -> usize {
        self.entries.len() + self.attachments.len() + self.strings.len()
    }

    /// Entries placed this frame
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entry was placed this frame
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Counters for the current or last frame
    pub fn stats(&self) -> FrameStats {
        FrameStats {
            quadrant_range: self.quadrant_range,
            ..self.stats
        }
    }

    /// Same-quadrant ordering
    pub fn bucket_order(&self) -> BucketOrder {
        self.bucket_order
    }

    /// Change same-quadrant ordering for later frames
    pub fn set_bucket_order(&mut self, order: BucketOrder) {
        self.bucket_order = order;
    }

    /// Enable or disable the bounding-box arrange pass
    pub fn set_bounding_box_sort(&mut self, enabled: bool) {
        self.sort_bounding_boxes = enabled;
    }

    /// All entries of the frame in arena order
    pub fn entries(&self) -> &[PaintEntry] {
        &self.entries
    }

    /// Strings of the frame in insertion order
    pub fn strings(&self) -> &[StringEntry] {
        &self.strings
    }

    /// Attachments of an entry in draw order
    pub fn attachments_of<'a>(&'a self, entry: &PaintEntry) -> impl Iterator<Item = &'a AttachedEntry> + 'a {
        std::iter::successors(entry.first_attachment.map(|i| &self.attachments[usize::from(i)]), move |a| {
            a.next.map(|i| &self.attachments[usize::from(i)])
        })
    }

    /// Start accumulating a frame, discarding the previous one
    ///
    /// Handles issued before this call stop resolving.
    pub fn begin_frame(&mut self, visible: ScreenRect, zoom: u8, rotation: Rotation) -> Result<()> {
        self.expect_state(SessionState::Idle)?;
        self.clear_frame();
        self.visible = visible;
        self.zoom = zoom;
        self.rotation = rotation;
        self.state = SessionState::Accumulating;
        log::trace!("Paint frame {} started: {:?} zoom {} {:?}", self.generation, visible, zoom, rotation);
        Ok(())
    }

    /// Drop the current frame and return to idle from any state
    pub fn reset(&mut self) {
        self.clear_frame();
        self.state = SessionState::Idle;
    }

    /// Set the map position that inserted offsets are relative to
    pub fn set_sprite_position(&mut self, x: i32, y: i32) {
        self.sprite_position = TilePosition::new(x, y);
    }

    /// Set the interaction kind recorded on new entries
    pub fn set_interaction(&mut self, kind: InteractionKind) {
        self.interaction = kind;
    }

    /// Set the tile recorded on new entries
    pub fn set_map_position(&mut self, x: i32, y: i32) {
        self.map_position = TilePosition::new(x, y);
    }

    /// Set the element recorded on new entries
    pub fn set_current_element(&mut self, element: Option<ElementRef>) {
        self.current_element = element;
    }

    /// Place a sprite whose bound box starts at its own offset
    ///
    /// `offset` is relative to the sprite position and rotated with the
    /// camera; `bound_size` is the box length along each axis. The quadrant
    /// comes from the rotated offset.
    pub fn insert(&mut self, sheet: &SpriteSheet, image: ImageId, offset: MapCoords, bound_size: MapCoords) -> Result<EntryRef> {
        self.expect_state(SessionState::Accumulating)?;
        self.last_entry = None;

        let direction = self.rotation.inverse_direction();
        let (ox, oy) = direction.rotate(offset.x, offset.y);
        let origin = MapCoords::new(ox + self.sprite_position.x, oy + self.sprite_position.y, offset.z);
        let (bx, by) = shrink_bound_size(bound_size, self.rotation);
        let (bx, by) = direction.rotate(bx, by);
        let bounds = BoundBox {
            x: origin.x,
            y: origin.y,
            z: origin.z,
            x_end: origin.x + bx,
            y_end: origin.y + by,
            z_end: origin.z + bound_size.z,
        };

        let index = self.place(sheet, image, origin, bounds)?;
        self.link_quadrant(index, quadrant_hash(origin.x, origin.y, self.rotation));
        self.last_entry = Some(index);
        Ok(self.entry_ref(index))
    }

    /// Place a sprite with an explicit bound box offset
    ///
    /// The quadrant comes from the rotated bound box origin.
    pub fn insert_with_bounds(
        &mut self,
        sheet: &SpriteSheet,
        image: ImageId,
        offset: MapCoords,
        bound_size: MapCoords,
        bound_offset: MapCoords,
    ) -> Result<EntryRef> {
        self.expect_state(SessionState::Accumulating)?;
        self.last_entry = None;

        let index = self.place_with_bounds(sheet, image, offset, bound_size, bound_offset)?;
        let bounds = self.entries[usize::from(index)].bounds;
        self.link_quadrant(index, quadrant_hash(bounds.x, bounds.y, self.rotation));
        self.last_entry = Some(index);
        Ok(self.entry_ref(index))
    }

    /// Place a sprite drawn immediately after the previously placed entry
    ///
    /// The new entry gets no bucket of its own. Without a previous entry this
    /// behaves like [`PaintSession::insert_with_bounds`].
    pub fn insert_chained(
        &mut self,
        sheet: &SpriteSheet,
        image: ImageId,
        offset: MapCoords,
        bound_size: MapCoords,
        bound_offset: MapCoords,
    ) -> Result<EntryRef> {
        self.expect_state(SessionState::Accumulating)?;
        let Some(previous) = self.last_entry else {
            return self.insert_with_bounds(sheet, image, offset, bound_size, bound_offset);
        };

        let index = self.place_with_bounds(sheet, image, offset, bound_size, bound_offset)?;
        let quadrant = self.entries[usize::from(previous)].quadrant;
        self.entries[usize::from(previous)].chained = Some(index);
        self.entries[usize::from(index)].quadrant = quadrant;
        self.last_entry = Some(index);
        self.stats.chained += 1;
        Ok(self.entry_ref(index))
    }

    /// Append a sprite to `parent`'s attachments
    pub fn attach_child(&mut self, parent: EntryRef, image: ImageId, offset: ScreenCoords) -> Result<AttachRef> {
        self.expect_state(SessionState::Accumulating)?;
        let parent = self.resolve(parent)?;
        self.push_attachment(parent, image, None, offset)
    }

    /// Append a sprite to the most recently placed entry's attachments
    pub fn attach_to_last(&mut self, image: ImageId, offset: ScreenCoords) -> Result<AttachRef> {
        self.expect_state(SessionState::Accumulating)?;
        let parent = self.last_entry.ok_or(PaintError::NoParent)?;
        self.push_attachment(parent, image, None, offset)
    }

    /// Append a masked sprite to `parent`'s attachments
    ///
    /// `colour` is drawn wherever `mask` has a non-zero pixel.
    pub fn attach_masked(&mut self, parent: EntryRef, mask: ImageId, colour: ImageId, offset: ScreenCoords) -> Result<AttachRef> {
        self.expect_state(SessionState::Accumulating)?;
        let parent = self.resolve(parent)?;
        self.push_attachment(parent, mask, Some(colour), offset)
    }

    /// Draw an entry as a mask over `colour` instead of directly
    pub fn set_masked(&mut self, entry: EntryRef, colour: ImageId) -> Result<()> {
        let index = self.resolve(entry)?;
        self.entries[usize::from(index)].masked_colour = Some(colour);
        Ok(())
    }

    /// Set the tertiary remap colour of an entry
    pub fn set_tertiary_colour(&mut self, entry: EntryRef, colour: u8) -> Result<()> {
        let index = self.resolve(entry)?;
        self.entries[usize::from(index)].tertiary_colour = colour;
        Ok(())
    }

    /// Look up an entry of the current frame
    pub fn entry(&self, entry: EntryRef) -> Result<&PaintEntry> {
        let index = self.resolve(entry)?;
        Ok(&self.entries[usize::from(index)])
    }

    /// Look up an attachment of the current frame
    pub fn attachment(&self, attachment: AttachRef) -> Result<&AttachedEntry> {
        if attachment.generation != self.generation {
            return Err(PaintError::NoParent);
        }
        self.attachments
            .get(usize::from(attachment.index))
            .ok_or(PaintError::NoParent)
    }

    /// Queue a text callout at the sprite position, raised by `z`
    pub fn add_string(
        &mut self,
        string_id: u16,
        args: [i32; 4],
        z: i32,
        offset_x: i32,
        y_offsets: &'static [i8],
    ) -> Result<()> {
        self.expect_state(SessionState::Accumulating)?;
        self.reserve()?;
        let anchor = project(
            MapCoords::new(self.sprite_position.x, self.sprite_position.y, z),
            self.rotation,
        );
        self.strings.push(StringEntry {
            string_id,
            args,
            position: anchor.offset(offset_x, 0),
            y_offsets,
        });
        self.stats.strings += 1;
        Ok(())
    }

    /// Hand every entry to `visitor` back to front, then every string
    ///
    /// Each entry is followed by its attachments and then by the entries
    /// chained to it. The session returns to idle whether or not the visitor
    /// fails.
    pub fn drain_in_order<V: PaintVisitor>(&mut self, visitor: &mut V) -> std::result::Result<FrameStats, V::Error> {
        self.expect_state(SessionState::Accumulating)?;
        self.state = SessionState::Draining;

        let mut order = std::mem::take(&mut self.order);
        let mut arranger = std::mem::take(&mut self.arranger);
        self.collect_order(&mut order, &mut arranger);
        let result = self.visit_all(&order, visitor);
        self.order = order;
        self.arranger = arranger;
        self.state = SessionState::Idle;

        if self.stats.dropped > 0 {
            log::debug!(
                "Paint frame {} dropped {} requests at capacity {}",
                self.generation,
                self.stats.dropped,
                self.capacity
            );
        }
        result.map(|()| self.stats())
    }

    /// Bucket heads in draw order, after the optional arrange pass
    pub(crate) fn draw_order(&self) -> Vec<u16> {
        let mut order = Vec::with_capacity(self.entries.len());
        self.collect_order(&mut order, &mut Arranger::default());
        order
    }

    /// Entries reachable from a bucket head through chaining
    pub(crate) fn chain(&self, head: u16) -> impl Iterator<Item = &PaintEntry> + '_ {
        std::iter::successors(Some(&self.entries[usize::from(head)]), move |e| {
            e.chained.map(|i| &self.entries[usize::from(i)])
        })
    }

    fn collect_order(&self, order: &mut Vec<u16>, arranger: &mut Arranger) {
        order.clear();
        let Some((back, front)) = self.quadrant_range else {
            return;
        };
        for quadrant in back..=front {
            let mut link = self.heads[usize::from(quadrant)];
            while let Some(index) = link {
                order.push(index);
                link = self.entries[usize::from(index)].next;
            }
        }
        if self.sort_bounding_boxes {
            arranger.arrange(&self.entries, order, self.rotation, back, front);
        }
    }

    fn visit_all<V: PaintVisitor>(&self, order: &[u16], visitor: &mut V) -> std::result::Result<(), V::Error> {
        for &head in order {
            for entry in self.chain(head) {
                visitor.visit_entry(entry)?;
                for attachment in self.attachments_of(entry) {
                    visitor.visit_attachment(entry, attachment)?;
                }
            }
        }
        for string in &self.strings {
            visitor.visit_string(string)?;
        }
        Ok(())
    }

    fn expect_state(&self, expected: SessionState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(PaintError::WrongState {
                expected,
                found: self.state,
            })
        }
    }

    fn clear_frame(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.entries.clear();
        self.attachments.clear();
        self.strings.clear();
        self.heads = [None; QUADRANT_COUNT];
        self.tails = [None; QUADRANT_COUNT];
        self.quadrant_range = None;
        self.sprite_position = TilePosition::default();
        self.interaction = InteractionKind::None;
        self.map_position = TilePosition::default();
        self.current_element = None;
        self.last_entry = None;
        self.stats = FrameStats::default();
        self.overflow_reported = false;
    }

    fn reserve(&mut self) -> Result<()> {
        if self.used() < self.capacity {
            return Ok(());
        }
        self.stats.dropped += 1;
        if !self.overflow_reported {
            self.overflow_reported = true;
            log::warn!(
                "Paint arena full at {} items; dropping paint requests for the rest of frame {}",
                self.capacity,
                self.generation
            );
        }
        Err(PaintError::Overflow)
    }

    fn resolve(&self, entry: EntryRef) -> Result<u16> {
        if entry.generation == self.generation && usize::from(entry.index) < self.entries.len() {
            Ok(entry.index)
        } else {
            Err(PaintError::NoParent)
        }
    }

    fn entry_ref(&self, index: u16) -> EntryRef {
        EntryRef {
            index,
            generation: self.generation,
        }
    }

    fn place_with_bounds(
        &mut self,
        sheet: &SpriteSheet,
        image: ImageId,
        offset: MapCoords,
        bound_size: MapCoords,
        bound_offset: MapCoords,
    ) -> Result<u16> {
        let direction = self.rotation.inverse_direction();
        let (ox, oy) = direction.rotate(offset.x, offset.y);
        let origin = MapCoords::new(ox + self.sprite_position.x, oy + self.sprite_position.y, offset.z);

        let (sx, sy) = shrink_bound_size(bound_size, self.rotation);
        let (sx, sy) = direction.rotate(sx, sy);
        let (bx, by) = direction.rotate(bound_offset.x, bound_offset.y);
        let bounds = BoundBox {
            x: bx + self.sprite_position.x,
            y: by + self.sprite_position.y,
            z: bound_offset.z,
            x_end: sx + bx + self.sprite_position.x,
            y_end: sy + by + self.sprite_position.y,
            z_end: bound_offset.z + bound_size.z,
        };
        self.place(sheet, image, origin, bounds)
    }

    /// Allocate an entry for `image` drawn at map point `origin`, unless it
    /// is off screen or the arena is full
    fn place(&mut self, sheet: &SpriteSheet, image: ImageId, origin: MapCoords, bounds: BoundBox) -> Result<u16> {
        self.reserve()?;
        let id = image.index();
        let sprite = sheet.get(id).map_err(|_| PaintError::MissingSprite(id))?;

        let position = project(origin, self.rotation);
        let screen_rect = sprite.screen_rect(position);
        if !screen_rect.intersects(&self.visible) {
            self.stats.culled += 1;
            return Err(PaintError::Culled);
        }

        let index = self.entries.len() as u16;
        self.entries.push(PaintEntry {
            image,
            position,
            screen_rect,
            bounds,
            interaction: self.interaction,
            map_position: self.map_position,
            element: self.current_element,
            ..PaintEntry::default()
        });
        self.stats.inserted += 1;
        Ok(index)
    }

    fn link_quadrant(&mut self, index: u16, hash: i32) {
        let quadrant = (hash / QUADRANT_SIZE).clamp(0, QUADRANT_COUNT as i32 - 1) as u16;
        self.entries[usize::from(index)].quadrant = quadrant;

        let q = usize::from(quadrant);
        match self.bucket_order {
            BucketOrder::Lifo => {
                self.entries[usize::from(index)].next = self.heads[q];
                self.heads[q] = Some(index);
            }
            BucketOrder::Fifo => {
                match self.tails[q] {
                    Some(tail) => self.entries[usize::from(tail)].next = Some(index),
                    None => self.heads[q] = Some(index),
                }
                self.tails[q] = Some(index);
            }
        }

        self.quadrant_range = Some(match self.quadrant_range {
            Some((back, front)) => (back.min(quadrant), front.max(quadrant)),
            None => (quadrant, quadrant),
        });
    }

    fn push_attachment(&mut self, parent: u16, image: ImageId, masked_colour: Option<ImageId>, offset: ScreenCoords) -> Result<AttachRef> {
        self.reserve()?;
        let index = self.attachments.len() as u16;
        self.attachments.push(AttachedEntry {
            image,
            masked_colour,
            offset,
            next: None,
        });

        let entry = &mut self.entries[usize::from(parent)];
        match entry.last_attachment {
            Some(last) => self.attachments[usize::from(last)].next = Some(index),
            None => entry.first_attachment = Some(index),
        }
        entry.last_attachment = Some(index);
        self.stats.attachments += 1;

        Ok(AttachRef {
            index,
            generation: self.generation,
        })
    }
}

/// Bound box lengths are inclusive on the axes facing the camera
fn shrink_bound_size(size: MapCoords, rotation: Rotation) -> (i32, i32) {
    match rotation {
        Rotation::R0 => (size.x - 1, size.y - 1),
        Rotation::R1 => (size.x - 1, size.y),
        Rotation::R2 => (size.x, size.y),
        Rotation::R3 => (size.x, size.y - 1),
    }
}

/// Diagonal depth of a rotated map point, before dividing into quadrants
pub(crate) fn quadrant_hash(x: i32, y: i32, rotation: Rotation) -> i32 {
    let (rx, ry) = rotation.direction().rotate(x, y);
    let bias = match rotation {
        Rotation::R0 => 0,
        Rotation::R1 | Rotation::R3 => 0x2000,
        Rotation::R2 => 0x4000,
    };
    rx + ry + bias
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::SpriteSheetBuilder;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Visit {
        Entry(u32),
        Attachment(u32, u32),
        String(u16),
    }

    #[derive(Default)]
    struct Recorder(Vec<Visit>);

    impl PaintVisitor for Recorder {
        type Error = PaintError;

        fn visit_entry(&mut self, entry: &PaintEntry) -> Result<()> {
            self.0.push(Visit::Entry(entry.image.index()));
            Ok(())
        }

        fn visit_attachment(&mut self, parent: &PaintEntry, attachment: &AttachedEntry) -> Result<()> {
            self.0.push(Visit::Attachment(parent.image.index(), attachment.image.index()));
            Ok(())
        }

        fn visit_string(&mut self, string: &StringEntry) -> Result<()> {
            self.0.push(Visit::String(string.string_id));
            Ok(())
        }
    }

    /// Ten identical 4x4 sprites; tests tell entries apart by image index
    fn sheet() -> SpriteSheet {
        let mut builder = SpriteSheetBuilder::new();
        for _ in 0..10 {
            builder.push_bitmap(4, 4, -2, -2, &[1; 16]).unwrap();
        }
        builder.build()
    }

    fn everywhere() -> ScreenRect {
        ScreenRect::new(-10_000, -10_000, 20_000, 20_000)
    }

    fn started(capacity: usize) -> PaintSession {
        let mut session = PaintSession::with_capacity(capacity);
        session.begin_frame(everywhere(), 0, Rotation::R0).unwrap();
        session
    }

    fn at(session: &mut PaintSession, sheet: &SpriteSheet, id: u32, x: i32, y: i32) -> Result<EntryRef> {
        session.set_sprite_position(x, y);
        session.insert(sheet, ImageId::new(id), MapCoords::default(), MapCoords::new(32, 32, 8))
    }

    fn drain(session: &mut PaintSession) -> Vec<Visit> {
        let mut recorder = Recorder::default();
        session.drain_in_order(&mut recorder).unwrap();
        recorder.0
    }

    #[test]
    fn test_lower_quadrant_drains_first() {
        let sheet = sheet();
        let mut session = started(16);
        let front = at(&mut session, &sheet, 1, 64, 64).unwrap();
        let back = at(&mut session, &sheet, 2, 0, 0).unwrap();
        assert_eq!(session.entry(front).unwrap().quadrant, 4);
        assert_eq!(session.entry(back).unwrap().quadrant, 0);

        assert_eq!(drain(&mut session), vec![Visit::Entry(2), Visit::Entry(1)]);
        assert_eq!(session.stats().quadrant_range, Some((0, 4)));
    }

    #[test]
    fn test_quadrant_order_ignores_insertion_order() {
        let sheet = sheet();
        let mut session = started(64);
        let positions = [(96, 0), (0, 0), (32, 64), (0, 32), (160, 160)];
        for (i, &(x, y)) in positions.iter().enumerate() {
            at(&mut session, &sheet, i as u32, x, y).unwrap();
        }
        let visited = drain(&mut session);
        let quadrants: Vec<u16> = visited
            .iter()
            .map(|v| match v {
                Visit::Entry(id) => session.entries()[*id as usize].quadrant,
                _ => unreachable!(),
            })
            .collect();
        assert!(quadrants.windows(2).all(|w| w[0] <= w[1]), "{quadrants:?}");
    }

    #[test]
    fn test_same_quadrant_lifo_and_fifo() {
        let sheet = sheet();
        let mut session = started(16);
        at(&mut session, &sheet, 1, 0, 0).unwrap();
        at(&mut session, &sheet, 2, 0, 0).unwrap();
        assert_eq!(drain(&mut session), vec![Visit::Entry(2), Visit::Entry(1)]);

        session.set_bucket_order(BucketOrder::Fifo);
        session.begin_frame(everywhere(), 0, Rotation::R0).unwrap();
        at(&mut session, &sheet, 1, 0, 0).unwrap();
        at(&mut session, &sheet, 2, 0, 0).unwrap();
        at(&mut session, &sheet, 3, 0, 0).unwrap();
        assert_eq!(drain(&mut session), vec![Visit::Entry(1), Visit::Entry(2), Visit::Entry(3)]);
    }

    #[test]
    fn test_culled_insert_leaves_arena_unchanged() {
        let sheet = sheet();
        let mut session = PaintSession::with_capacity(16);
        session.begin_frame(ScreenRect::new(0, 0, 640, 480), 0, Rotation::R0).unwrap();
        // projects to screen x = -1000
        let result = at(&mut session, &sheet, 1, 1000, 0);
        assert_eq!(result, Err(PaintError::Culled));
        assert_eq!(session.len(), 0);
        assert_eq!(session.used(), 0);
        assert_eq!(session.stats().culled, 1);
    }

    #[test]
    fn test_overflow_is_recoverable_and_counted() {
        let sheet = sheet();
        let mut session = started(2);
        at(&mut session, &sheet, 1, 0, 0).unwrap();
        at(&mut session, &sheet, 2, 32, 0).unwrap();
        assert_eq!(at(&mut session, &sheet, 3, 64, 0), Err(PaintError::Overflow));
        assert_eq!(session.attach_to_last(ImageId::new(4), ScreenCoords::default()), Err(PaintError::NoParent));
        assert_eq!(at(&mut session, &sheet, 3, 64, 0), Err(PaintError::Overflow));
        assert_eq!(session.stats().dropped, 2);

        let visited = drain(&mut session);
        assert_eq!(visited.len(), 2);

        // the next frame starts clean
        session.begin_frame(everywhere(), 0, Rotation::R0).unwrap();
        assert_eq!(session.stats(), FrameStats::default());
        assert!(at(&mut session, &sheet, 3, 64, 0).is_ok());
    }

    #[test]
    fn test_state_machine() {
        let sheet = sheet();
        let mut session = PaintSession::with_capacity(8);
        assert_eq!(
            at(&mut session, &sheet, 1, 0, 0),
            Err(PaintError::WrongState {
                expected: SessionState::Accumulating,
                found: SessionState::Idle
            })
        );
        assert!(session.drain_in_order(&mut Recorder::default()).is_err());

        session.begin_frame(everywhere(), 0, Rotation::R0).unwrap();
        assert!(session.begin_frame(everywhere(), 0, Rotation::R0).is_err());
        assert_eq!(session.state(), SessionState::Accumulating);

        drain(&mut session);
        assert_eq!(session.state(), SessionState::Idle);

        session.begin_frame(everywhere(), 0, Rotation::R0).unwrap();
        session.reset();
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_missing_sprite() {
        let sheet = sheet();
        let mut session = started(8);
        assert_eq!(at(&mut session, &sheet, 99, 0, 0), Err(PaintError::MissingSprite(99)));
    }

    #[test]
    fn test_attachments_follow_parent() {
        let sheet = sheet();
        let mut session = started(16);
        let parent = at(&mut session, &sheet, 1, 0, 0).unwrap();
        at(&mut session, &sheet, 2, 64, 64).unwrap();
        session.attach_child(parent, ImageId::new(5), ScreenCoords::new(1, 1)).unwrap();
        session.attach_child(parent, ImageId::new(6), ScreenCoords::new(2, 2)).unwrap();
        session.attach_to_last(ImageId::new(7), ScreenCoords::default()).unwrap();

        assert_eq!(
            drain(&mut session),
            vec![
                Visit::Entry(1),
                Visit::Attachment(1, 5),
                Visit::Attachment(1, 6),
                Visit::Entry(2),
                Visit::Attachment(2, 7),
            ]
        );
        assert_eq!(session.stats().attachments, 3);
    }

    #[test]
    fn test_stale_parent_is_rejected() {
        let sheet = sheet();
        let mut session = started(16);
        let parent = at(&mut session, &sheet, 1, 0, 0).unwrap();
        drain(&mut session);

        session.begin_frame(everywhere(), 0, Rotation::R0).unwrap();
        at(&mut session, &sheet, 2, 0, 0).unwrap();
        assert_eq!(
            session.attach_child(parent, ImageId::new(3), ScreenCoords::default()),
            Err(PaintError::NoParent)
        );
    }

    #[test]
    fn test_attach_to_last_after_cull() {
        let sheet = sheet();
        let mut session = PaintSession::with_capacity(16);
        session.begin_frame(ScreenRect::new(0, 0, 64, 64), 0, Rotation::R0).unwrap();
        assert!(at(&mut session, &sheet, 1, 1000, 0).is_err());
        assert_eq!(
            session.attach_to_last(ImageId::new(2), ScreenCoords::default()),
            Err(PaintError::NoParent)
        );
    }

    #[test]
    fn test_chained_entry_draws_after_previous() {
        let sheet = sheet();
        let mut session = started(16);
        at(&mut session, &sheet, 1, 0, 0).unwrap();
        let chained = session
            .insert_chained(&sheet, ImageId::new(2), MapCoords::default(), MapCoords::new(1, 1, 1), MapCoords::new(256, 256, 0))
            .unwrap();
        at(&mut session, &sheet, 3, 64, 64).unwrap();

        assert_eq!(session.entry(chained).unwrap().quadrant, 0);
        assert_eq!(drain(&mut session), vec![Visit::Entry(1), Visit::Entry(2), Visit::Entry(3)]);
        assert_eq!(session.stats().chained, 1);
    }

    #[test]
    fn test_chained_without_previous_gets_own_quadrant() {
        let sheet = sheet();
        let mut session = started(16);
        let entry = session
            .insert_chained(&sheet, ImageId::new(2), MapCoords::default(), MapCoords::new(1, 1, 1), MapCoords::new(64, 64, 0))
            .unwrap();
        assert_eq!(session.entry(entry).unwrap().quadrant, 4);
        assert_eq!(session.stats().chained, 0);
    }

    #[test]
    fn test_strings_drain_after_sprites_in_order() {
        let sheet = sheet();
        let mut session = started(16);
        session.set_sprite_position(64, 64);
        session.add_string(10, [1, 2, 0, 0], 0, 4, &[]).unwrap();
        at(&mut session, &sheet, 1, 0, 0).unwrap();
        session.add_string(11, [0; 4], 0, 0, &[]).unwrap();

        assert_eq!(session.strings()[0].position, ScreenCoords::new(4, 64));
        assert_eq!(drain(&mut session), vec![Visit::Entry(1), Visit::String(10), Visit::String(11)]);
    }

    #[test]
    fn test_insert_records_cursor_and_projection() {
        let sheet = sheet();
        let mut session = started(16);
        session.set_interaction(InteractionKind::Scenery);
        session.set_map_position(32, 64);
        session.set_current_element(Some(ElementRef(7)));
        let entry = at(&mut session, &sheet, 1, 32, 64).unwrap();

        let entry = session.entry(entry).unwrap();
        assert_eq!(entry.position, ScreenCoords::new(32, 48));
        assert_eq!(entry.screen_rect, ScreenRect::new(30, 46, 4, 4));
        assert_eq!(entry.interaction, InteractionKind::Scenery);
        assert_eq!(entry.map_position, TilePosition::new(32, 64));
        assert_eq!(entry.element, Some(ElementRef(7)));
        assert_eq!(
            entry.bounds,
            BoundBox {
                x: 32,
                y: 64,
                z: 0,
                x_end: 63,
                y_end: 95,
                z_end: 8
            }
        );
    }

    #[test]
    fn test_quadrant_hash_per_rotation() {
        assert_eq!(quadrant_hash(10, 20, Rotation::R0), 30);
        assert_eq!(quadrant_hash(10, 20, Rotation::R1), 20 - 10 + 0x2000);
        assert_eq!(quadrant_hash(10, 20, Rotation::R2), -30 + 0x4000);
        assert_eq!(quadrant_hash(10, 20, Rotation::R3), 10 - 20 + 0x2000);
    }

    #[test]
    fn test_rotated_bounds_face_the_camera() {
        let sheet = sheet();
        let mut session = PaintSession::with_capacity(8);
        session.begin_frame(everywhere(), 0, Rotation::R2).unwrap();
        session.set_sprite_position(100, 100);
        let entry = session
            .insert(&sheet, ImageId::new(1), MapCoords::new(2, 3, 0), MapCoords::new(10, 20, 5))
            .unwrap();
        let bounds = session.entry(entry).unwrap().bounds;
        // offsets and lengths are mirrored on both axes
        assert_eq!((bounds.x, bounds.y), (98, 97));
        assert_eq!((bounds.x_end, bounds.y_end), (88, 77));
        assert_eq!(bounds.z_end, 5);
    }

    #[test]
    fn test_masked_and_tertiary() {
        let sheet = sheet();
        let mut session = started(8);
        let entry = at(&mut session, &sheet, 1, 0, 0).unwrap();
        session.set_masked(entry, ImageId::new(2)).unwrap();
        session.set_tertiary_colour(entry, 9).unwrap();
        let attached = session
            .attach_masked(entry, ImageId::new(3), ImageId::new(4), ScreenCoords::default())
            .unwrap();

        let stored = session.entry(entry).unwrap();
        assert!(stored.is_masked());
        assert_eq!(stored.tertiary_colour, 9);
        assert_eq!(session.attachment(attached).unwrap().masked_colour, Some(ImageId::new(4)));
    }
}
