use crate::assets::{BrandAsset, Font, PopupVariant};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

/// Position/velocity in percent of the viewport.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Family {
    PrimaryVideo,
    VideoClone,
    MemeText,
    BirthdayText,
    BrandImage,
    BrandText,
    BrandLogo,
    CorruptionRect,
    FakePopup,
}

impl Family {
    pub fn label(self) -> &'static str {
        match self {
            Self::PrimaryVideo => "video",
            Self::VideoClone => "clone",
            Self::MemeText => "meme",
            Self::BirthdayText => "bday",
            Self::BrandImage => "brand-img",
            Self::BrandText => "brand-txt",
            Self::BrandLogo => "logo",
            Self::CorruptionRect => "corrupt",
            Self::FakePopup => "popup",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    Video {
        source_index: usize,
        playback_rate: f32,
    },
    Text {
        text: &'static str,
        font: Font,
        color: (u8, u8, u8),
    },
    Image {
        asset: BrandAsset,
        opacity: f32,
    },
    Corruption {
        width: f32,
        height: f32,
        opacity: f32,
    },
    Popup {
        variant: PopupVariant,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub family: Family,
    pub pos: Vec2,
    pub rotation: f32,
    pub scale: f32,
    pub velocity: Option<Vec2>,
    pub spin_speed: f32,
    pub created_at_ms: u64,
    pub payload: Payload,
}

impl Entity {
    pub fn is_spinning(&self) -> bool {
        self.spin_speed != 0.0
    }

    pub fn text(&self) -> Option<&'static str> {
        match self.payload {
            Payload::Text { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// Bounded, age-ordered collection of one entity family.
#[derive(Clone, Debug)]
pub struct Pool {
    family: Family,
    cap: usize,
    target: usize,
    items: Vec<Entity>,
}

impl Pool {
    pub fn new(family: Family, cap: usize) -> Self {
        Self {
            family,
            cap,
            target: 0,
            items: Vec::new(),
        }
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Count the generator last aimed for.
    pub fn target(&self) -> usize {
        self.target
    }

    pub fn set_target(&mut self, target: usize) {
        self.target = target.min(self.cap);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entity> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Entity> {
        self.items.iter_mut()
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.items.iter().find(|e| e.id == id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.items.iter().any(|e| e.id == id)
    }

    pub fn ids(&self) -> Vec<EntityId> {
        self.items.iter().map(|e| e.id).collect()
    }

    /// Adds `entity`, evicting the oldest members first while at cap.
    pub fn admit(&mut self, entity: Entity) -> Vec<Entity> {
        let mut evicted = Vec::new();
        if self.cap == 0 {
            return evicted;
        }
        while self.items.len() >= self.cap {
            if let Some(old) = self.evict_oldest() {
                evicted.push(old);
            }
        }
        self.items.push(entity);
        evicted
    }

    pub fn evict_oldest(&mut self) -> Option<Entity> {
        let idx = self
            .items
            .iter()
            .enumerate()
            .min_by_key(|(i, e)| (e.created_at_ms, *i))
            .map(|(i, _)| i)?;
        Some(self.items.remove(idx))
    }

    /// Drops the oldest members until at most `len` remain.
    pub fn trim_to(&mut self, len: usize) -> Vec<Entity> {
        let mut removed = Vec::new();
        while self.items.len() > len {
            if let Some(old) = self.evict_oldest() {
                removed.push(old);
            }
        }
        removed
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let idx = self.items.iter().position(|e| e.id == id)?;
        Some(self.items.remove(idx))
    }

    pub fn drain_where(&mut self, mut pred: impl FnMut(&Entity) -> bool) -> Vec<Entity> {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.items.len());
        for e in self.items.drain(..) {
            if pred(&e) {
                removed.push(e);
            } else {
                kept.push(e);
            }
        }
        self.items = kept;
        removed
    }

    pub fn clear(&mut self) -> Vec<Entity> {
        self.target = 0;
        std::mem::take(&mut self.items)
    }
}
