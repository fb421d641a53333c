//! Content of each node kind.
//!
//! Every payload is built the same way for loading and for insertion by the user: fields start present (with
//! defaults) or absent, and selectors are made through a [`MakeSelector`] so they land in the graph owned by the
//! node. Encoding writes known content in declaration order, then whatever was not understood.

use super::enums::{
    BinderRotation, BinderType, CoordComputeOrder, EffectorType, EmitterType, NodeKind,
    ParticleFlags, ParticleType, RotationDirectionBase, RotationOrder, TextureBorder,
    TextureFilter,
};
use super::items::{self, EmitterItem, Item, ItemList, ListItem, SchedulerItem, TimelineItem};
use super::{literal, write_count, write_extra, LoadIssue, VfxGraph};
use crate::commands::CommandError;
use crate::field::{self, DynField, Enumerated, Field, FixedString, Flags, NullableBool};
use crate::io::{
    self, incremental::SnapshotCollector, ChunkID, ChunkReader, DecodeError, RawChunk, Sink,
    Source,
};
use crate::state::graph::{MakeSelector, SelectorKey};

fn make_field<T: field::Scalar>(id: &str, default: T, present: bool) -> Field<T> {
    if present {
        Field::new(id, default)
    } else {
        Field::unset(id, default)
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct Scheduler {
    pub items: Vec<SchedulerItem>,
    pub triggers: Vec<SchedulerItem>,
    pub extra: Vec<RawChunk>,
}
const ITEM_COUNT: ChunkID = ChunkID::from_name("ItCn");
const TRIGGER_COUNT: ChunkID = ChunkID::from_name("TrCn");
impl Scheduler {
    fn new() -> Self {
        Self {
            items: Vec::new(),
            triggers: Vec::new(),
            extra: Vec::new(),
        }
    }
    fn decode<R, M>(
        alloc: &mut M,
        chunk: &mut ChunkReader<R>,
        issues: &mut Vec<LoadIssue>,
    ) -> Result<Self, DecodeError>
    where
        R: Source,
        M: MakeSelector<NodeKind>,
    {
        let mut items = SnapshotCollector::new(ItemList::SchedulerItems.tag());
        let mut triggers = SnapshotCollector::new(ItemList::SchedulerTriggers.tag());
        let mut extra = Vec::new();
        io::read_nested(chunk, |sub| match sub.id() {
            ITEM_COUNT | TRIGGER_COUNT => Ok(()),
            id if id == items.tag() => items.offer(sub),
            id if id == triggers.tag() => triggers.offer(sub),
            _ => {
                extra.push(RawChunk::capture(sub)?);
                Ok(())
            }
        })?;
        let items: Vec<SchedulerItem> =
            items::decode_list(alloc, ItemList::SchedulerItems, items.finish(), 0, issues)?;
        let triggers = items::decode_list(
            alloc,
            ItemList::SchedulerTriggers,
            triggers.finish(),
            items.len(),
            issues,
        )?;
        Ok(Self {
            items,
            triggers,
            extra,
        })
    }
    fn encode(&self, graph: &VfxGraph, writer: &mut dyn Sink) -> std::io::Result<()> {
        write_count(writer, ITEM_COUNT, self.items.len())?;
        write_count(writer, TRIGGER_COUNT, self.triggers.len())?;
        let items = items::encode_list(graph, writer, ItemList::SchedulerItems, &[], &self.items)?;
        items::encode_list(
            graph,
            writer,
            ItemList::SchedulerTriggers,
            &items,
            &self.triggers,
        )?;
        write_extra(&self.extra, writer)
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct Timeline {
    pub loop_start: Field<i32>,
    pub loop_end: Field<i32>,
    /// `BnNo`
    pub binder: SelectorKey,
    pub clip_count: Field<i32>,
    pub items: Vec<TimelineItem>,
    pub extra: Vec<RawChunk>,
}
const TIMELINE_ITEM_COUNT: ChunkID = ChunkID::from_name("TICn");
impl Timeline {
    fn new<M: MakeSelector<NodeKind>>(alloc: &mut M, present: bool) -> Self {
        Self {
            loop_start: make_field("LpSt", 0, present),
            loop_end: make_field("LpEd", 0, present),
            binder: alloc.make_selector(NodeKind::Binder, make_field("BnNo", -1, present), true),
            clip_count: make_field("CpCn", 0, present),
            items: Vec::new(),
            extra: Vec::new(),
        }
    }
    fn decode<R, M>(
        alloc: &mut M,
        chunk: &mut ChunkReader<R>,
        issues: &mut Vec<LoadIssue>,
    ) -> Result<Self, DecodeError>
    where
        R: Source,
        M: MakeSelector<NodeKind>,
    {
        let mut loop_start = Field::unset("LpSt", 0);
        let mut loop_end = Field::unset("LpEd", 0);
        let mut binder = Field::unset("BnNo", -1);
        let mut clip_count = Field::unset("CpCn", 0);
        let mut items = SnapshotCollector::new(ItemList::TimelineItems.tag());
        let mut extra = Vec::new();
        io::read_nested(chunk, |sub| {
            if field::read_matching(
                &mut [&mut loop_start, &mut loop_end, &mut binder, &mut clip_count],
                sub,
            )? {
                return Ok(());
            }
            match sub.id() {
                TIMELINE_ITEM_COUNT => Ok(()),
                id if id == items.tag() => items.offer(sub),
                _ => {
                    extra.push(RawChunk::capture(sub)?);
                    Ok(())
                }
            }
        })?;
        Ok(Self {
            loop_start,
            loop_end,
            binder: alloc.make_selector(NodeKind::Binder, binder, true),
            clip_count,
            items: items::decode_list(alloc, ItemList::TimelineItems, items.finish(), 0, issues)?,
            extra,
        })
    }
    fn encode(&self, graph: &VfxGraph, writer: &mut dyn Sink) -> std::io::Result<()> {
        self.loop_start.encode(writer)?;
        self.loop_end.encode(writer)?;
        literal(graph, self.binder)?.encode(writer)?;
        write_count(writer, TIMELINE_ITEM_COUNT, self.items.len())?;
        self.clip_count.encode(writer)?;
        items::encode_list(graph, writer, ItemList::TimelineItems, &[], &self.items)?;
        write_extra(&self.extra, writer)
    }
    fn fields(&self) -> Vec<&dyn DynField> {
        vec![&self.loop_start, &self.loop_end, &self.clip_count]
    }
    fn fields_mut(&mut self) -> Vec<&mut dyn DynField> {
        vec![&mut self.loop_start, &mut self.loop_end, &mut self.clip_count]
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct Emitter {
    pub sound: Field<FixedString>,
    pub sound_index: Field<i32>,
    pub loop_start: Field<i32>,
    pub loop_end: Field<i32>,
    pub child_limit: Field<i32>,
    /// `EfNo`
    pub effector: SelectorKey,
    pub any_direction: Field<NullableBool>,
    pub emitter_type: Field<Enumerated<EmitterType>>,
    pub rotation_base: Field<Enumerated<RotationDirectionBase>>,
    pub coord_order: Field<Enumerated<CoordComputeOrder>>,
    pub rotation_order: Field<Enumerated<RotationOrder>>,
    pub particles: Vec<EmitterItem>,
    pub emitters: Vec<EmitterItem>,
    pub extra: Vec<RawChunk>,
}
const PARTICLE_COUNT: ChunkID = ChunkID::from_name("PrCn");
const EMITTER_COUNT: ChunkID = ChunkID::from_name("EmCn");
impl Emitter {
    fn new<M: MakeSelector<NodeKind>>(alloc: &mut M, present: bool) -> Self {
        Self {
            sound: Field::unset("SdNm", FixedString::default()),
            sound_index: make_field("SdNo", -1, present),
            loop_start: make_field("LpSt", 0, present),
            loop_end: make_field("LpEd", 0, present),
            child_limit: make_field("ClCn", 0, present),
            effector: alloc.make_selector(NodeKind::Effector, make_field("EfNo", -1, present), true),
            any_direction: make_field("bAD", NullableBool::False, present),
            emitter_type: make_field("EVT", EmitterType::Point.into(), present),
            rotation_base: make_field("RBDT", RotationDirectionBase::Z.into(), present),
            coord_order: make_field("CCOT", CoordComputeOrder::ScaleRotateTranslate.into(), present),
            rotation_order: make_field("ROT", RotationOrder::Xyz.into(), present),
            particles: Vec::new(),
            emitters: Vec::new(),
            extra: Vec::new(),
        }
    }
    fn decode<R, M>(
        alloc: &mut M,
        chunk: &mut ChunkReader<R>,
        issues: &mut Vec<LoadIssue>,
    ) -> Result<Self, DecodeError>
    where
        R: Source,
        M: MakeSelector<NodeKind>,
    {
        let mut this = Self::new(&mut NoSelectors, false);
        let mut effector = Field::unset("EfNo", -1);
        let mut particles = SnapshotCollector::new(ItemList::ParticleItems.tag());
        let mut emitters = SnapshotCollector::new(ItemList::EmitterItems.tag());
        let mut extra = Vec::new();
        io::read_nested(chunk, |sub| {
            let mut fields = this.fields_mut();
            fields.push(&mut effector);
            if field::read_matching(&mut fields, sub)? {
                return Ok(());
            }
            match sub.id() {
                PARTICLE_COUNT | EMITTER_COUNT => Ok(()),
                id if id == particles.tag() => particles.offer(sub),
                id if id == emitters.tag() => emitters.offer(sub),
                _ => {
                    extra.push(RawChunk::capture(sub)?);
                    Ok(())
                }
            }
        })?;
        this.effector = alloc.make_selector(NodeKind::Effector, effector, true);
        this.particles =
            items::decode_list(alloc, ItemList::ParticleItems, particles.finish(), 0, issues)?;
        this.emitters = items::decode_list(
            alloc,
            ItemList::EmitterItems,
            emitters.finish(),
            this.particles.len(),
            issues,
        )?;
        this.extra = extra;
        Ok(this)
    }
    fn encode(&self, graph: &VfxGraph, writer: &mut dyn Sink) -> std::io::Result<()> {
        self.sound.encode(writer)?;
        self.sound_index.encode(writer)?;
        self.loop_start.encode(writer)?;
        self.loop_end.encode(writer)?;
        self.child_limit.encode(writer)?;
        literal(graph, self.effector)?.encode(writer)?;
        self.any_direction.encode(writer)?;
        self.emitter_type.encode(writer)?;
        self.rotation_base.encode(writer)?;
        self.coord_order.encode(writer)?;
        self.rotation_order.encode(writer)?;
        write_count(writer, PARTICLE_COUNT, self.particles.len())?;
        write_count(writer, EMITTER_COUNT, self.emitters.len())?;
        let particles =
            items::encode_list(graph, writer, ItemList::ParticleItems, &[], &self.particles)?;
        items::encode_list(
            graph,
            writer,
            ItemList::EmitterItems,
            &particles,
            &self.emitters,
        )?;
        write_extra(&self.extra, writer)
    }
    fn fields(&self) -> Vec<&dyn DynField> {
        vec![
            &self.sound,
            &self.sound_index,
            &self.loop_start,
            &self.loop_end,
            &self.child_limit,
            &self.any_direction,
            &self.emitter_type,
            &self.rotation_base,
            &self.coord_order,
            &self.rotation_order,
        ]
    }
    fn fields_mut(&mut self) -> Vec<&mut dyn DynField> {
        vec![
            &mut self.sound,
            &mut self.sound_index,
            &mut self.loop_start,
            &mut self.loop_end,
            &mut self.child_limit,
            &mut self.any_direction,
            &mut self.emitter_type,
            &mut self.rotation_base,
            &mut self.coord_order,
            &mut self.rotation_order,
        ]
    }
}

/// Stands in while decoding a payload whose selectors are made once their literals are known.
struct NoSelectors;
impl MakeSelector<NodeKind> for NoSelectors {
    fn make_selector(&mut self, _: NodeKind, _: Field<i32>, _: bool) -> SelectorKey {
        SelectorKey::DANGLING
    }
}

/// The two texture attribute blocks of a particle.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, strum::IntoStaticStr)]
pub enum BlockSlot {
    Color1,
    Normal,
}
impl BlockSlot {
    #[must_use]
    pub const fn tag(self) -> ChunkID {
        ChunkID::from_name(match self {
            Self::Color1 => "TC1",
            Self::Normal => "TN",
        })
    }
}

/// An optional nested group of fields. While unassigned it is not written and its selector is disabled.
#[derive(Clone, PartialEq, Debug)]
pub struct TextureBlock {
    pub assigned: bool,
    pub enabled: Field<NullableBool>,
    /// `TxNo`
    pub texture: SelectorKey,
    pub filter: Field<Enumerated<TextureFilter>>,
    pub border: Field<Enumerated<TextureBorder>>,
    pub extra: Vec<RawChunk>,
}
impl TextureBlock {
    fn new<M: MakeSelector<NodeKind>>(alloc: &mut M, assigned: bool) -> Self {
        Self {
            assigned,
            enabled: make_field("bEna", NullableBool::True, assigned),
            texture: alloc.make_selector(
                NodeKind::Texture,
                make_field("TxNo", -1, assigned),
                assigned,
            ),
            filter: make_field("TFT", TextureFilter::Linear.into(), assigned),
            border: make_field("TBT", TextureBorder::Wrap.into(), assigned),
            extra: Vec::new(),
        }
    }
    fn decode<R, M>(alloc: &mut M, chunk: &mut ChunkReader<R>) -> Result<Self, DecodeError>
    where
        R: Source,
        M: MakeSelector<NodeKind>,
    {
        let mut enabled = Field::unset("bEna", NullableBool::True);
        let mut texture = Field::unset("TxNo", -1);
        let mut filter = Field::unset("TFT", Enumerated::Known(TextureFilter::Linear));
        let mut border = Field::unset("TBT", Enumerated::Known(TextureBorder::Wrap));
        let mut extra = Vec::new();
        let bounds = u64::from(chunk.remaining());
        let within = chunk.id();
        field::read_fields_keeping(
            chunk,
            bounds,
            within,
            &mut [&mut enabled, &mut texture, &mut filter, &mut border],
            &mut extra,
        )?;
        Ok(Self {
            assigned: true,
            enabled,
            texture: alloc.make_selector(NodeKind::Texture, texture, true),
            filter,
            border,
            extra,
        })
    }
    fn encode(
        &self,
        slot: BlockSlot,
        graph: &VfxGraph,
        writer: &mut dyn Sink,
    ) -> std::io::Result<()> {
        if !self.assigned {
            return Ok(());
        }
        io::write_chunk(writer, slot.tag(), |w| {
            self.enabled.encode(w)?;
            literal(graph, self.texture)?.encode(w)?;
            self.filter.encode(w)?;
            self.border.encode(w)?;
            write_extra(&self.extra, w)
        })
    }
    #[must_use]
    pub fn fields(&self) -> Vec<&dyn DynField> {
        vec![&self.enabled, &self.filter, &self.border]
    }
    pub fn fields_mut(&mut self) -> Vec<&mut dyn DynField> {
        vec![&mut self.enabled, &mut self.filter, &mut self.border]
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct Particle {
    pub loop_start: Field<i32>,
    pub loop_end: Field<i32>,
    pub particle_type: Field<Enumerated<ParticleType>>,
    pub depth_offset_perspective: Field<NullableBool>,
    pub rotation_base: Field<Enumerated<RotationDirectionBase>>,
    pub coord_order: Field<Enumerated<CoordComputeOrder>>,
    pub rotation_order: Field<Enumerated<RotationOrder>>,
    pub flags: Field<Flags<ParticleFlags>>,
    pub color_texture: TextureBlock,
    pub normal_texture: TextureBlock,
    pub extra: Vec<RawChunk>,
}
impl Particle {
    fn new<M: MakeSelector<NodeKind>>(alloc: &mut M, present: bool) -> Self {
        Self {
            loop_start: make_field("LpSt", 0, present),
            loop_end: make_field("LpEd", 0, present),
            particle_type: make_field("PrVT", ParticleType::Parameter.into(), present),
            depth_offset_perspective: make_field("bDFP", NullableBool::False, present),
            rotation_base: make_field("RBDT", RotationDirectionBase::Z.into(), present),
            coord_order: make_field("CCOT", CoordComputeOrder::ScaleRotateTranslate.into(), present),
            rotation_order: make_field("ROT", RotationOrder::Xyz.into(), present),
            flags: make_field("PrFl", Flags(ParticleFlags::empty()), present),
            color_texture: TextureBlock::new(alloc, false),
            normal_texture: TextureBlock::new(alloc, false),
            extra: Vec::new(),
        }
    }
    fn decode<R, M>(alloc: &mut M, chunk: &mut ChunkReader<R>) -> Result<Self, DecodeError>
    where
        R: Source,
        M: MakeSelector<NodeKind>,
    {
        let mut this = Self::new(&mut NoSelectors, false);
        let mut color = None;
        let mut normal = None;
        let mut extra = Vec::new();
        io::read_nested(chunk, |sub| {
            if field::read_matching(&mut this.fields_mut(), sub)? {
                return Ok(());
            }
            match sub.id() {
                // A repeated block is kept opaque, only the first one owns a selector.
                id if id == BlockSlot::Color1.tag() && color.is_none() => {
                    color = Some(TextureBlock::decode(alloc, sub)?);
                }
                id if id == BlockSlot::Normal.tag() && normal.is_none() => {
                    normal = Some(TextureBlock::decode(alloc, sub)?);
                }
                _ => extra.push(RawChunk::capture(sub)?),
            }
            Ok(())
        })?;
        this.color_texture = match color {
            Some(block) => block,
            None => TextureBlock::new(alloc, false),
        };
        this.normal_texture = match normal {
            Some(block) => block,
            None => TextureBlock::new(alloc, false),
        };
        this.extra = extra;
        Ok(this)
    }
    fn encode(&self, graph: &VfxGraph, writer: &mut dyn Sink) -> std::io::Result<()> {
        field::write_fields(writer, &self.fields())?;
        self.color_texture.encode(BlockSlot::Color1, graph, writer)?;
        self.normal_texture.encode(BlockSlot::Normal, graph, writer)?;
        write_extra(&self.extra, writer)
    }
    fn fields(&self) -> Vec<&dyn DynField> {
        vec![
            &self.loop_start,
            &self.loop_end,
            &self.particle_type,
            &self.depth_offset_perspective,
            &self.rotation_base,
            &self.coord_order,
            &self.rotation_order,
            &self.flags,
        ]
    }
    fn fields_mut(&mut self) -> Vec<&mut dyn DynField> {
        vec![
            &mut self.loop_start,
            &mut self.loop_end,
            &mut self.particle_type,
            &mut self.depth_offset_perspective,
            &mut self.rotation_base,
            &mut self.coord_order,
            &mut self.rotation_order,
            &mut self.flags,
        ]
    }
    #[must_use]
    pub fn block(&self, slot: BlockSlot) -> &TextureBlock {
        match slot {
            BlockSlot::Color1 => &self.color_texture,
            BlockSlot::Normal => &self.normal_texture,
        }
    }
    pub fn block_mut(&mut self, slot: BlockSlot) -> &mut TextureBlock {
        match slot {
            BlockSlot::Color1 => &mut self.color_texture,
            BlockSlot::Normal => &mut self.normal_texture,
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct Effector {
    pub effector_type: Field<Enumerated<EffectorType>>,
    pub rotation_order: Field<Enumerated<RotationOrder>>,
    pub coord_order: Field<Enumerated<CoordComputeOrder>>,
    pub affect_other_vfx: Field<NullableBool>,
    pub affect_game: Field<NullableBool>,
    pub loop_start: Field<i32>,
    pub loop_end: Field<i32>,
    pub extra: Vec<RawChunk>,
}
impl Effector {
    fn new(present: bool) -> Self {
        Self {
            effector_type: make_field("EfVT", EffectorType::PointLight.into(), present),
            rotation_order: make_field("RoOT", RotationOrder::Xyz.into(), present),
            coord_order: make_field("CCOT", CoordComputeOrder::ScaleRotateTranslate.into(), present),
            affect_other_vfx: make_field("bAOV", NullableBool::False, present),
            affect_game: make_field("bAGm", NullableBool::False, present),
            loop_start: make_field("LpSt", 0, present),
            loop_end: make_field("LpEd", 0, present),
            extra: Vec::new(),
        }
    }
    fn fields(&self) -> Vec<&dyn DynField> {
        vec![
            &self.effector_type,
            &self.rotation_order,
            &self.coord_order,
            &self.affect_other_vfx,
            &self.affect_game,
            &self.loop_start,
            &self.loop_end,
        ]
    }
    fn fields_mut(&mut self) -> Vec<&mut dyn DynField> {
        vec![
            &mut self.effector_type,
            &mut self.rotation_order,
            &mut self.coord_order,
            &mut self.affect_other_vfx,
            &mut self.affect_game,
            &mut self.loop_start,
            &mut self.loop_end,
        ]
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct Binder {
    pub start_to_global_direction: Field<NullableBool>,
    pub vfx_scale_enabled: Field<NullableBool>,
    pub vfx_scale_bias: Field<f32>,
    pub vfx_scale_depth_offset: Field<NullableBool>,
    pub life: Field<i32>,
    pub binder_type: Field<Enumerated<BinderType>>,
    pub rotation: Field<Enumerated<BinderRotation>>,
    pub extra: Vec<RawChunk>,
}
impl Binder {
    fn new(present: bool) -> Self {
        Self {
            start_to_global_direction: make_field("bStG", NullableBool::False, present),
            vfx_scale_enabled: make_field("bVSc", NullableBool::False, present),
            vfx_scale_bias: make_field("bVSb", 0.0, present),
            vfx_scale_depth_offset: make_field("bVSd", NullableBool::False, present),
            life: make_field("Life", -1, present),
            binder_type: make_field("BnVT", BinderType::Point.into(), present),
            rotation: make_field("BnRT", BinderRotation::Standard.into(), present),
            extra: Vec::new(),
        }
    }
    fn fields(&self) -> Vec<&dyn DynField> {
        vec![
            &self.start_to_global_direction,
            &self.vfx_scale_enabled,
            &self.vfx_scale_bias,
            &self.vfx_scale_depth_offset,
            &self.life,
            &self.binder_type,
            &self.rotation,
        ]
    }
    fn fields_mut(&mut self) -> Vec<&mut dyn DynField> {
        vec![
            &mut self.start_to_global_direction,
            &mut self.vfx_scale_enabled,
            &mut self.vfx_scale_bias,
            &mut self.vfx_scale_depth_offset,
            &mut self.life,
            &mut self.binder_type,
            &mut self.rotation,
        ]
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct Texture {
    pub path: Field<FixedString>,
    pub extra: Vec<RawChunk>,
}
impl Texture {
    fn new(present: bool) -> Self {
        Self {
            path: make_field("Path", FixedString::from_text(""), present),
            extra: Vec::new(),
        }
    }
    fn fields(&self) -> Vec<&dyn DynField> {
        vec![&self.path]
    }
    fn fields_mut(&mut self) -> Vec<&mut dyn DynField> {
        vec![&mut self.path]
    }
}

/// Kinds whose content is nothing but fields.
fn decode_flat<R: Source>(
    chunk: &mut ChunkReader<R>,
    mut fields: Vec<&mut dyn DynField>,
    extra: &mut Vec<RawChunk>,
) -> Result<(), DecodeError> {
    let bounds = u64::from(chunk.remaining());
    let within = chunk.id();
    field::read_fields_keeping(chunk, bounds, within, &mut fields, extra)
}

/// Where a field sits within a node.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum FieldLocation {
    /// Directly in the node.
    Direct,
    /// In the element at `idx` of one of the node's lists.
    Item { list: ItemList, idx: usize },
    /// In one of a particle's texture blocks.
    Block(BlockSlot),
}

#[derive(Clone, PartialEq, Debug)]
pub enum NodePayload {
    Scheduler(Scheduler),
    Timeline(Timeline),
    Emitter(Emitter),
    Particle(Particle),
    Effector(Effector),
    Binder(Binder),
    Texture(Texture),
}
impl NodePayload {
    /// A fresh payload. Fields are present with defaults if `present`, otherwise absent.
    pub fn new<M: MakeSelector<NodeKind>>(kind: NodeKind, alloc: &mut M, present: bool) -> Self {
        match kind {
            NodeKind::Scheduler => Self::Scheduler(Scheduler::new()),
            NodeKind::Timeline => Self::Timeline(Timeline::new(alloc, present)),
            NodeKind::Emitter => Self::Emitter(Emitter::new(alloc, present)),
            NodeKind::Particle => Self::Particle(Particle::new(alloc, present)),
            NodeKind::Effector => Self::Effector(Effector::new(present)),
            NodeKind::Binder => Self::Binder(Binder::new(present)),
            NodeKind::Texture => Self::Texture(Texture::new(present)),
        }
    }
    /// Decode the payload of a node chunk. Anomalies that do not stop the load are pushed to `issues`.
    pub fn decode<R, M>(
        kind: NodeKind,
        alloc: &mut M,
        chunk: &mut ChunkReader<R>,
        issues: &mut Vec<LoadIssue>,
    ) -> Result<Self, DecodeError>
    where
        R: Source,
        M: MakeSelector<NodeKind>,
    {
        Ok(match kind {
            NodeKind::Scheduler => Self::Scheduler(Scheduler::decode(alloc, chunk, issues)?),
            NodeKind::Timeline => Self::Timeline(Timeline::decode(alloc, chunk, issues)?),
            NodeKind::Emitter => Self::Emitter(Emitter::decode(alloc, chunk, issues)?),
            NodeKind::Particle => Self::Particle(Particle::decode(alloc, chunk)?),
            NodeKind::Effector => {
                let mut this = Effector::new(false);
                let mut extra = Vec::new();
                decode_flat(chunk, this.fields_mut(), &mut extra)?;
                this.extra = extra;
                Self::Effector(this)
            }
            NodeKind::Binder => {
                let mut this = Binder::new(false);
                let mut extra = Vec::new();
                decode_flat(chunk, this.fields_mut(), &mut extra)?;
                this.extra = extra;
                Self::Binder(this)
            }
            NodeKind::Texture => {
                let mut this = Texture::new(false);
                let mut extra = Vec::new();
                decode_flat(chunk, this.fields_mut(), &mut extra)?;
                this.extra = extra;
                Self::Texture(this)
            }
        })
    }
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Scheduler(_) => NodeKind::Scheduler,
            Self::Timeline(_) => NodeKind::Timeline,
            Self::Emitter(_) => NodeKind::Emitter,
            Self::Particle(_) => NodeKind::Particle,
            Self::Effector(_) => NodeKind::Effector,
            Self::Binder(_) => NodeKind::Binder,
            Self::Texture(_) => NodeKind::Texture,
        }
    }
    /// Write the content of the node chunk, not the chunk header.
    pub fn encode(&self, graph: &VfxGraph, writer: &mut dyn Sink) -> std::io::Result<()> {
        match self {
            Self::Scheduler(this) => this.encode(graph, writer),
            Self::Timeline(this) => this.encode(graph, writer),
            Self::Emitter(this) => this.encode(graph, writer),
            Self::Particle(this) => this.encode(graph, writer),
            Self::Effector(this) => {
                field::write_fields(writer, &this.fields())?;
                write_extra(&this.extra, writer)
            }
            Self::Binder(this) => {
                field::write_fields(writer, &this.fields())?;
                write_extra(&this.extra, writer)
            }
            Self::Texture(this) => {
                field::write_fields(writer, &this.fields())?;
                write_extra(&this.extra, writer)
            }
        }
    }
    /// Fields directly in the node.
    #[must_use]
    pub fn direct_fields(&self) -> Vec<&dyn DynField> {
        match self {
            Self::Scheduler(_) => Vec::new(),
            Self::Timeline(this) => this.fields(),
            Self::Emitter(this) => this.fields(),
            Self::Particle(this) => this.fields(),
            Self::Effector(this) => this.fields(),
            Self::Binder(this) => this.fields(),
            Self::Texture(this) => this.fields(),
        }
    }
    fn direct_fields_mut(&mut self) -> Vec<&mut dyn DynField> {
        match self {
            Self::Scheduler(_) => Vec::new(),
            Self::Timeline(this) => this.fields_mut(),
            Self::Emitter(this) => this.fields_mut(),
            Self::Particle(this) => this.fields_mut(),
            Self::Effector(this) => this.fields_mut(),
            Self::Binder(this) => this.fields_mut(),
            Self::Texture(this) => this.fields_mut(),
        }
    }
    /// Fields at a location, or None if this node has no such location.
    #[must_use]
    pub fn fields(&self, location: &FieldLocation) -> Option<Vec<&dyn DynField>> {
        match location {
            FieldLocation::Direct => Some(self.direct_fields()),
            FieldLocation::Block(slot) => self.block(*slot).map(TextureBlock::fields),
            FieldLocation::Item { list, idx } => match (self, list) {
                (Self::Scheduler(this), ItemList::SchedulerItems) => {
                    this.items.get(*idx).map(ListItem::fields)
                }
                (Self::Scheduler(this), ItemList::SchedulerTriggers) => {
                    this.triggers.get(*idx).map(ListItem::fields)
                }
                (Self::Timeline(this), ItemList::TimelineItems) => {
                    this.items.get(*idx).map(ListItem::fields)
                }
                (Self::Emitter(this), ItemList::ParticleItems) => {
                    this.particles.get(*idx).map(ListItem::fields)
                }
                (Self::Emitter(this), ItemList::EmitterItems) => {
                    this.emitters.get(*idx).map(ListItem::fields)
                }
                _ => None,
            },
        }
    }
    pub fn fields_mut(&mut self, location: &FieldLocation) -> Option<Vec<&mut dyn DynField>> {
        match location {
            FieldLocation::Direct => Some(self.direct_fields_mut()),
            FieldLocation::Block(slot) => self.block_mut(*slot).map(TextureBlock::fields_mut),
            FieldLocation::Item { list, idx } => match (self, list) {
                (Self::Scheduler(this), ItemList::SchedulerItems) => {
                    this.items.get_mut(*idx).map(ListItem::fields_mut)
                }
                (Self::Scheduler(this), ItemList::SchedulerTriggers) => {
                    this.triggers.get_mut(*idx).map(ListItem::fields_mut)
                }
                (Self::Timeline(this), ItemList::TimelineItems) => {
                    this.items.get_mut(*idx).map(ListItem::fields_mut)
                }
                (Self::Emitter(this), ItemList::ParticleItems) => {
                    this.particles.get_mut(*idx).map(ListItem::fields_mut)
                }
                (Self::Emitter(this), ItemList::EmitterItems) => {
                    this.emitters.get_mut(*idx).map(ListItem::fields_mut)
                }
                _ => None,
            },
        }
    }
    /// A texture block, if this is a particle.
    #[must_use]
    pub fn block(&self, slot: BlockSlot) -> Option<&TextureBlock> {
        match self {
            Self::Particle(this) => Some(this.block(slot)),
            _ => None,
        }
    }
    pub fn block_mut(&mut self, slot: BlockSlot) -> Option<&mut TextureBlock> {
        match self {
            Self::Particle(this) => Some(this.block_mut(slot)),
            _ => None,
        }
    }
    /// Length of one of this node's lists, or None if it has no such list.
    #[must_use]
    pub fn list_len(&self, list: ItemList) -> Option<usize> {
        match (self, list) {
            (Self::Scheduler(this), ItemList::SchedulerItems) => Some(this.items.len()),
            (Self::Scheduler(this), ItemList::SchedulerTriggers) => Some(this.triggers.len()),
            (Self::Timeline(this), ItemList::TimelineItems) => Some(this.items.len()),
            (Self::Emitter(this), ItemList::ParticleItems) => Some(this.particles.len()),
            (Self::Emitter(this), ItemList::EmitterItems) => Some(this.emitters.len()),
            _ => None,
        }
    }
    /// A copy of a list element.
    #[must_use]
    pub fn item(&self, list: ItemList, idx: usize) -> Option<Item> {
        match (self, list) {
            (Self::Scheduler(this), ItemList::SchedulerItems) => {
                this.items.get(idx).cloned().map(Item::Scheduler)
            }
            (Self::Scheduler(this), ItemList::SchedulerTriggers) => {
                this.triggers.get(idx).cloned().map(Item::Scheduler)
            }
            (Self::Timeline(this), ItemList::TimelineItems) => {
                this.items.get(idx).cloned().map(Item::Timeline)
            }
            (Self::Emitter(this), ItemList::ParticleItems) => {
                this.particles.get(idx).cloned().map(Item::Emitter)
            }
            (Self::Emitter(this), ItemList::EmitterItems) => {
                this.emitters.get(idx).cloned().map(Item::Emitter)
            }
            _ => None,
        }
    }
    pub(super) fn insert_item(
        &mut self,
        list: ItemList,
        idx: usize,
        item: &Item,
    ) -> Result<(), CommandError> {
        match (self, list, item) {
            (Self::Scheduler(this), ItemList::SchedulerItems, Item::Scheduler(item)) => {
                items::insert_at(&mut this.items, idx, item.clone())
            }
            (Self::Scheduler(this), ItemList::SchedulerTriggers, Item::Scheduler(item)) => {
                items::insert_at(&mut this.triggers, idx, item.clone())
            }
            (Self::Timeline(this), ItemList::TimelineItems, Item::Timeline(item)) => {
                items::insert_at(&mut this.items, idx, item.clone())
            }
            (Self::Emitter(this), ItemList::ParticleItems, Item::Emitter(item)) => {
                items::insert_at(&mut this.particles, idx, item.clone())
            }
            (Self::Emitter(this), ItemList::EmitterItems, Item::Emitter(item)) => {
                items::insert_at(&mut this.emitters, idx, item.clone())
            }
            _ => Err(CommandError::MismatchedState),
        }
    }
    pub(super) fn remove_item(
        &mut self,
        list: ItemList,
        idx: usize,
        item: &Item,
    ) -> Result<(), CommandError> {
        match (self, list, item) {
            (Self::Scheduler(this), ItemList::SchedulerItems, Item::Scheduler(item)) => {
                items::remove_at(&mut this.items, idx, item)
            }
            (Self::Scheduler(this), ItemList::SchedulerTriggers, Item::Scheduler(item)) => {
                items::remove_at(&mut this.triggers, idx, item)
            }
            (Self::Timeline(this), ItemList::TimelineItems, Item::Timeline(item)) => {
                items::remove_at(&mut this.items, idx, item)
            }
            (Self::Emitter(this), ItemList::ParticleItems, Item::Emitter(item)) => {
                items::remove_at(&mut this.particles, idx, item)
            }
            (Self::Emitter(this), ItemList::EmitterItems, Item::Emitter(item)) => {
                items::remove_at(&mut this.emitters, idx, item)
            }
            _ => Err(CommandError::MismatchedState),
        }
    }
}
