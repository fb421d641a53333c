//! Node kinds and the enumerations stored in effect fields.

use crate::io::ChunkID;

/// One group of nodes per kind. Declaration order is the order groups are written in.
#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Debug,
    strum::EnumIter,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[strum(ascii_case_insensitive)]
pub enum NodeKind {
    Scheduler,
    Timeline,
    Emitter,
    Particle,
    Effector,
    Binder,
    Texture,
}
impl NodeKind {
    /// Tag of this kind's node chunks.
    #[must_use]
    pub const fn tag(self) -> ChunkID {
        ChunkID::from_name(match self {
            Self::Scheduler => "Schd",
            Self::Timeline => "TmLn",
            Self::Emitter => "Emit",
            Self::Particle => "Ptcl",
            Self::Effector => "Efct",
            Self::Binder => "Bind",
            Self::Texture => "Tex",
        })
    }
    /// Tag of the root field holding how many nodes of this kind there are.
    #[must_use]
    pub const fn count_tag(self) -> ChunkID {
        ChunkID::from_name(match self {
            Self::Scheduler => "ScCn",
            Self::Timeline => "TlCn",
            Self::Emitter => "EmCn",
            Self::Particle => "PrCn",
            Self::Effector => "EfCn",
            Self::Binder => "BdCn",
            Self::Texture => "TxCn",
        })
    }
    #[must_use]
    pub fn from_tag(tag: ChunkID) -> Option<Self> {
        <Self as strum::IntoEnumIterator>::iter().find(|kind| kind.tag() == tag)
    }
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }
}
impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, strum::FromRepr, strum::IntoStaticStr)]
#[repr(i32)]
pub enum EmitterType {
    Point = 0,
    Cone = 1,
    ConeModel = 2,
    SphereModel = 3,
    CylinderModel = 4,
    Model = 5,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, strum::FromRepr, strum::IntoStaticStr)]
#[repr(i32)]
pub enum ParticleType {
    Parameter = 0,
    Powder = 1,
    Windmill = 2,
    Line = 3,
    Reserve0 = 4,
    Model = 5,
    Polyline = 6,
    Reserve1 = 7,
    Quad = 8,
    Polygon = 9,
    Decal = 10,
    DecalRing = 11,
    Disc = 12,
    LightModel = 13,
    Laser = 14,
    ModelSkin = 15,
    Dissolve = 16,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, strum::FromRepr, strum::IntoStaticStr)]
#[repr(i32)]
pub enum EffectorType {
    PointLight = 0,
    DirectionalLight = 1,
    RadialBlur = 2,
    BlackHole = 3,
    CameraQuake = 4,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, strum::FromRepr, strum::IntoStaticStr)]
#[repr(i32)]
pub enum BinderType {
    Point = 0,
    Linear = 1,
    Spline = 2,
    Camera = 3,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, strum::FromRepr, strum::IntoStaticStr)]
#[repr(i32)]
pub enum BinderRotation {
    Standard = 0,
    Billboard = 1,
    BillboardAxisY = 2,
    LookAt = 3,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, strum::FromRepr, strum::IntoStaticStr)]
#[repr(i32)]
pub enum RotationOrder {
    Xyz = 0,
    Xzy = 1,
    Yxz = 2,
    Yzx = 3,
    Zxy = 4,
    Zyx = 5,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, strum::FromRepr, strum::IntoStaticStr)]
#[repr(i32)]
pub enum CoordComputeOrder {
    ScaleRotateTranslate = 0,
    ScaleTranslateRotate = 1,
    RotateScaleTranslate = 2,
    RotateTranslateScale = 3,
    TranslateScaleRotate = 4,
    TranslateRotateScale = 5,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, strum::FromRepr, strum::IntoStaticStr)]
#[repr(i32)]
pub enum RotationDirectionBase {
    Z = 0,
    X = 1,
    Y = 2,
    Camera = 3,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, strum::FromRepr, strum::IntoStaticStr)]
#[repr(i32)]
pub enum TextureFilter {
    Linear = 0,
    Point = 1,
    Anisotropic = 2,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, strum::FromRepr, strum::IntoStaticStr)]
#[repr(i32)]
pub enum TextureBorder {
    Wrap = 0,
    Clamp = 1,
    Mirror = 2,
}

crate::scalar_enum!(
    EmitterType,
    ParticleType,
    EffectorType,
    BinderType,
    BinderRotation,
    RotationOrder,
    CoordComputeOrder,
    RotationDirectionBase,
    TextureFilter,
    TextureBorder,
);

bitflags::bitflags! {
    /// Particle draw flags. Unnamed bits are kept as read.
    #[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
    pub struct ParticleFlags: u32 {
        const DEPTH_TEST = 1 << 0;
        const DEPTH_WRITE = 1 << 1;
        const SOFT_PARTICLE = 1 << 2;
        const COLLISION = 1 << 3;
        const APPLY_TONE_MAP = 1 << 4;
        const APPLY_FOG = 1 << 5;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn tags_are_unique_and_invert() {
        for kind in NodeKind::iter() {
            assert_eq!(NodeKind::from_tag(kind.tag()), Some(kind));
            assert_ne!(kind.tag(), kind.count_tag());
        }
        assert_eq!(NodeKind::from_tag(ChunkID::from_name("Clip")), None);
        assert_eq!("particle".parse::<NodeKind>(), Ok(NodeKind::Particle));
    }
}
