//! Elements of the cumulative lists held by schedulers, timelines and emitters.

use super::{enums::NodeKind, literal, write_extra, write_leader, LoadIssue, VfxGraph};
use crate::commands::CommandError;
use crate::field::{self, DynField, Field, NullableBool};
use crate::io::{
    incremental::{self, Snapshot},
    ChunkID, DecodeError, RawChunk, Sink, Source,
};
use crate::state::graph::{MakeSelector, SelectorKey};

/// Every list element opens with this field.
pub const ENABLED: ChunkID = ChunkID::from_name("bEna");

/// The lists a node can own.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, strum::IntoStaticStr)]
pub enum ItemList {
    SchedulerItems,
    /// Stored after, and prefixed by, every scheduler item.
    SchedulerTriggers,
    TimelineItems,
    ParticleItems,
    /// Stored after, and prefixed by, every particle item.
    EmitterItems,
}
impl ItemList {
    /// Kind of node owning this list.
    #[must_use]
    pub fn owner(self) -> NodeKind {
        match self {
            Self::SchedulerItems | Self::SchedulerTriggers => NodeKind::Scheduler,
            Self::TimelineItems => NodeKind::Timeline,
            Self::ParticleItems | Self::EmitterItems => NodeKind::Emitter,
        }
    }
    /// Tag shared by every chunk of this list's run.
    #[must_use]
    pub const fn tag(self) -> ChunkID {
        ChunkID::from_name(match self {
            Self::SchedulerItems | Self::TimelineItems => "Item",
            Self::SchedulerTriggers => "Trgr",
            Self::ParticleItems => "ItPr",
            Self::EmitterItems => "ItEm",
        })
    }
}

/// A list element. Selectors are owned by the enclosing node and live in the graph.
pub trait ListItem: Clone + PartialEq + Sized {
    /// A fresh element. Fields are present with their defaults if `present`, else absent.
    fn new<M: MakeSelector<NodeKind>>(alloc: &mut M, list: ItemList, present: bool) -> Self;
    fn decode<M: MakeSelector<NodeKind>>(
        alloc: &mut M,
        list: ItemList,
        source: &mut dyn Source,
        bounds: u64,
    ) -> Result<Self, DecodeError>;
    fn encode(&self, graph: &VfxGraph, writer: &mut dyn Sink) -> std::io::Result<()>;
    fn fields(&self) -> Vec<&dyn DynField>;
    fn fields_mut(&mut self) -> Vec<&mut dyn DynField>;
    fn selectors(&self) -> Vec<SelectorKey>;
}

fn make_field<T: field::Scalar>(id: &str, default: T, present: bool) -> Field<T> {
    if present {
        Field::new(id, default)
    } else {
        Field::unset(id, default)
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct SchedulerItem {
    pub enabled: Field<NullableBool>,
    pub start_time: Field<i32>,
    /// `TlNo`
    pub timeline: SelectorKey,
    pub extra: Vec<RawChunk>,
}
impl ListItem for SchedulerItem {
    fn new<M: MakeSelector<NodeKind>>(alloc: &mut M, _: ItemList, present: bool) -> Self {
        Self {
            enabled: make_field("bEna", NullableBool::True, present),
            start_time: make_field("StTm", 0, present),
            timeline: alloc.make_selector(NodeKind::Timeline, make_field("TlNo", -1, present), true),
            extra: Vec::new(),
        }
    }
    fn decode<M: MakeSelector<NodeKind>>(
        alloc: &mut M,
        list: ItemList,
        source: &mut dyn Source,
        bounds: u64,
    ) -> Result<Self, DecodeError> {
        let mut enabled = Field::unset("bEna", NullableBool::True);
        let mut start_time = Field::unset("StTm", 0);
        let mut timeline = Field::unset("TlNo", -1);
        let mut extra = Vec::new();
        field::read_fields_keeping(
            source,
            bounds,
            list.tag(),
            &mut [&mut enabled, &mut start_time, &mut timeline],
            &mut extra,
        )?;
        Ok(Self {
            enabled,
            start_time,
            timeline: alloc.make_selector(NodeKind::Timeline, timeline, true),
            extra,
        })
    }
    fn encode(&self, graph: &VfxGraph, writer: &mut dyn Sink) -> std::io::Result<()> {
        write_leader(&self.enabled, writer)?;
        self.start_time.encode(writer)?;
        literal(graph, self.timeline)?.encode(writer)?;
        write_extra(&self.extra, writer)
    }
    fn fields(&self) -> Vec<&dyn DynField> {
        vec![&self.enabled, &self.start_time]
    }
    fn fields_mut(&mut self) -> Vec<&mut dyn DynField> {
        vec![&mut self.enabled, &mut self.start_time]
    }
    fn selectors(&self) -> Vec<SelectorKey> {
        vec![self.timeline]
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct TimelineItem {
    pub enabled: Field<NullableBool>,
    pub start_time: Field<i32>,
    pub end_time: Field<i32>,
    /// `BdNo`
    pub binder: SelectorKey,
    /// `EfNo`
    pub effector: SelectorKey,
    /// `EmNo`
    pub emitter: SelectorKey,
    pub platform: Field<i32>,
    pub clip: Field<i32>,
    pub extra: Vec<RawChunk>,
}
impl ListItem for TimelineItem {
    fn new<M: MakeSelector<NodeKind>>(alloc: &mut M, _: ItemList, present: bool) -> Self {
        Self {
            enabled: make_field("bEna", NullableBool::True, present),
            start_time: make_field("StTm", 0, present),
            end_time: make_field("EdTm", 0, present),
            binder: alloc.make_selector(NodeKind::Binder, make_field("BdNo", -1, present), true),
            effector: alloc.make_selector(NodeKind::Effector, make_field("EfNo", -1, present), true),
            emitter: alloc.make_selector(NodeKind::Emitter, make_field("EmNo", -1, present), true),
            platform: make_field("Plat", 0, present),
            clip: make_field("ClNo", -1, present),
            extra: Vec::new(),
        }
    }
    fn decode<M: MakeSelector<NodeKind>>(
        alloc: &mut M,
        list: ItemList,
        source: &mut dyn Source,
        bounds: u64,
    ) -> Result<Self, DecodeError> {
        let mut enabled = Field::unset("bEna", NullableBool::True);
        let mut start_time = Field::unset("StTm", 0);
        let mut end_time = Field::unset("EdTm", 0);
        let mut binder = Field::unset("BdNo", -1);
        let mut effector = Field::unset("EfNo", -1);
        let mut emitter = Field::unset("EmNo", -1);
        let mut platform = Field::unset("Plat", 0);
        let mut clip = Field::unset("ClNo", -1);
        let mut extra = Vec::new();
        field::read_fields_keeping(
            source,
            bounds,
            list.tag(),
            &mut [
                &mut enabled,
                &mut start_time,
                &mut end_time,
                &mut binder,
                &mut effector,
                &mut emitter,
                &mut platform,
                &mut clip,
            ],
            &mut extra,
        )?;
        Ok(Self {
            enabled,
            start_time,
            end_time,
            binder: alloc.make_selector(NodeKind::Binder, binder, true),
            effector: alloc.make_selector(NodeKind::Effector, effector, true),
            emitter: alloc.make_selector(NodeKind::Emitter, emitter, true),
            platform,
            clip,
            extra,
        })
    }
    fn encode(&self, graph: &VfxGraph, writer: &mut dyn Sink) -> std::io::Result<()> {
        write_leader(&self.enabled, writer)?;
        self.start_time.encode(writer)?;
        self.end_time.encode(writer)?;
        literal(graph, self.binder)?.encode(writer)?;
        literal(graph, self.effector)?.encode(writer)?;
        literal(graph, self.emitter)?.encode(writer)?;
        self.platform.encode(writer)?;
        self.clip.encode(writer)?;
        write_extra(&self.extra, writer)
    }
    fn fields(&self) -> Vec<&dyn DynField> {
        vec![
            &self.enabled,
            &self.start_time,
            &self.end_time,
            &self.platform,
            &self.clip,
        ]
    }
    fn fields_mut(&mut self) -> Vec<&mut dyn DynField> {
        vec![
            &mut self.enabled,
            &mut self.start_time,
            &mut self.end_time,
            &mut self.platform,
            &mut self.clip,
        ]
    }
    fn selectors(&self) -> Vec<SelectorKey> {
        vec![self.binder, self.effector, self.emitter]
    }
}

/// An element of either emitter list. `TgNo` selects a particle in [`ItemList::ParticleItems`]
/// and an emitter in [`ItemList::EmitterItems`].
#[derive(Clone, PartialEq, Debug)]
pub struct EmitterItem {
    pub enabled: Field<NullableBool>,
    /// `TgNo`
    pub target: SelectorKey,
    pub local_direction: Field<i32>,
    pub create_time: Field<i32>,
    pub create_count: Field<i32>,
    pub extra: Vec<RawChunk>,
}
impl EmitterItem {
    fn target_kind(list: ItemList) -> NodeKind {
        if list == ItemList::EmitterItems {
            NodeKind::Emitter
        } else {
            NodeKind::Particle
        }
    }
}
impl ListItem for EmitterItem {
    fn new<M: MakeSelector<NodeKind>>(alloc: &mut M, list: ItemList, present: bool) -> Self {
        Self {
            enabled: make_field("bEna", NullableBool::True, present),
            target: alloc.make_selector(
                Self::target_kind(list),
                make_field("TgNo", -1, present),
                true,
            ),
            local_direction: make_field("LcNo", 0, present),
            create_time: make_field("CrTm", 0, present),
            create_count: make_field("CrCn", 1, present),
            extra: Vec::new(),
        }
    }
    fn decode<M: MakeSelector<NodeKind>>(
        alloc: &mut M,
        list: ItemList,
        source: &mut dyn Source,
        bounds: u64,
    ) -> Result<Self, DecodeError> {
        let mut enabled = Field::unset("bEna", NullableBool::True);
        let mut target = Field::unset("TgNo", -1);
        let mut local_direction = Field::unset("LcNo", 0);
        let mut create_time = Field::unset("CrTm", 0);
        let mut create_count = Field::unset("CrCn", 1);
        let mut extra = Vec::new();
        field::read_fields_keeping(
            source,
            bounds,
            list.tag(),
            &mut [
                &mut enabled,
                &mut target,
                &mut local_direction,
                &mut create_time,
                &mut create_count,
            ],
            &mut extra,
        )?;
        Ok(Self {
            enabled,
            target: alloc.make_selector(Self::target_kind(list), target, true),
            local_direction,
            create_time,
            create_count,
            extra,
        })
    }
    fn encode(&self, graph: &VfxGraph, writer: &mut dyn Sink) -> std::io::Result<()> {
        write_leader(&self.enabled, writer)?;
        literal(graph, self.target)?.encode(writer)?;
        self.local_direction.encode(writer)?;
        self.create_time.encode(writer)?;
        self.create_count.encode(writer)?;
        write_extra(&self.extra, writer)
    }
    fn fields(&self) -> Vec<&dyn DynField> {
        vec![
            &self.enabled,
            &self.local_direction,
            &self.create_time,
            &self.create_count,
        ]
    }
    fn fields_mut(&mut self) -> Vec<&mut dyn DynField> {
        vec![
            &mut self.enabled,
            &mut self.local_direction,
            &mut self.create_time,
            &mut self.create_count,
        ]
    }
    fn selectors(&self) -> Vec<SelectorKey> {
        vec![self.target]
    }
}

/// Any list element, as carried by item commands.
#[derive(Clone, PartialEq, Debug)]
pub enum Item {
    Scheduler(SchedulerItem),
    Timeline(TimelineItem),
    Emitter(EmitterItem),
}
impl Item {
    /// A fresh element of the type `list` holds, with its fields present.
    pub fn new<M: MakeSelector<NodeKind>>(alloc: &mut M, list: ItemList) -> Self {
        match list {
            ItemList::SchedulerItems | ItemList::SchedulerTriggers => {
                Self::Scheduler(SchedulerItem::new(alloc, list, true))
            }
            ItemList::TimelineItems => Self::Timeline(TimelineItem::new(alloc, list, true)),
            ItemList::ParticleItems | ItemList::EmitterItems => {
                Self::Emitter(EmitterItem::new(alloc, list, true))
            }
        }
    }
    #[must_use]
    pub fn selectors(&self) -> Vec<SelectorKey> {
        match self {
            Self::Scheduler(item) => item.selectors(),
            Self::Timeline(item) => item.selectors(),
            Self::Emitter(item) => item.selectors(),
        }
    }
    #[must_use]
    pub fn fields(&self) -> Vec<&dyn DynField> {
        match self {
            Self::Scheduler(item) => item.fields(),
            Self::Timeline(item) => item.fields(),
            Self::Emitter(item) => item.fields(),
        }
    }
}

/// Insert into a list, refusing positions past the end.
pub(super) fn insert_at<T>(items: &mut Vec<T>, idx: usize, item: T) -> Result<(), CommandError> {
    if idx > items.len() {
        return Err(CommandError::MismatchedState);
    }
    items.insert(idx, item);
    Ok(())
}
/// Remove from a list, only if the element there is `expected`.
pub(super) fn remove_at<T: PartialEq>(
    items: &mut Vec<T>,
    idx: usize,
    expected: &T,
) -> Result<(), CommandError> {
    if items.get(idx) != Some(expected) {
        return Err(CommandError::MismatchedState);
    }
    items.remove(idx);
    Ok(())
}

/// Decode the authoritative snapshot of a run. With `skip`, the first `skip` elements belong to another list
/// and are dropped.
pub(super) fn decode_list<T: ListItem, M: MakeSelector<NodeKind>>(
    alloc: &mut M,
    list: ItemList,
    snapshot: Option<Snapshot>,
    skip: usize,
    issues: &mut Vec<LoadIssue>,
) -> Result<Vec<T>, DecodeError> {
    let Some(snapshot) = snapshot else {
        return Ok(Vec::new());
    };
    let mut ranges = snapshot.elements(ENABLED)?;
    if skip > 0 {
        let total = ranges.len();
        let Some(own) = incremental::split_shared(ranges, skip) else {
            log::warn!(
                "{} at {:#x} holds {total} elements, shorter than its {skip} element prefix",
                snapshot.tag,
                snapshot.offset
            );
            issues.push(LoadIssue::TruncatedSharedList {
                tag: snapshot.tag,
                offset: snapshot.offset,
                elements: total,
                prefix: skip,
            });
            return Ok(Vec::new());
        };
        ranges = own;
    }
    if !snapshot.consistent || snapshot.chunks != ranges.len() {
        log::warn!(
            "{} at {:#x}: {} chunks for {} elements, using the longest",
            snapshot.tag,
            snapshot.offset,
            snapshot.chunks,
            ranges.len()
        );
        issues.push(LoadIssue::MalformedList {
            tag: snapshot.tag,
            offset: snapshot.offset,
            chunks: snapshot.chunks,
            elements: ranges.len(),
        });
    }
    ranges
        .into_iter()
        .map(|range| {
            let mut source = snapshot.element_source(range);
            let len = source.len();
            T::decode(alloc, list, &mut source, len)
        })
        .collect()
}

/// Write a list as its cumulative run, after `prefix`. Returns the encoded elements so a list sharing this
/// run can use them as its prefix.
pub(super) fn encode_list<T: ListItem>(
    graph: &VfxGraph,
    writer: &mut dyn Sink,
    list: ItemList,
    prefix: &[Vec<u8>],
    items: &[T],
) -> std::io::Result<Vec<Vec<u8>>> {
    let elements = incremental::encode_elements(items, |item, w| item.encode(graph, w))?;
    incremental::write_cumulative(writer, list.tag(), prefix, &elements)?;
    Ok(elements)
}
