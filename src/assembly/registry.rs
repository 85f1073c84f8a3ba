// Declarative part catalogs.
//
// Each assembly variant is a RON document listing its parts in draw order.
// Parsing resolves the loose `params` map into typed `KindParams`, so a
// catalog that is missing a required parameter fails here and never reaches
// the render loop.

use std::collections::{BTreeMap, HashMap};

use glam::Vec3;
use serde::Deserialize;

use super::error::ConfigError;
use crate::engine::components::Color;

// ============================================================================
// KINDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum PartKind {
    Body,
    Door,
    Hatch,
    Wheel,
    Gear,
    Shaft,
    Housing,
    /// Rounded panel of the cube rig; carries wear like a gear.
    Cube,
    /// Externally loaded mesh, drawn by the shell as-is.
    Asset,
}

impl PartKind {
    pub const ALL: [PartKind; 9] = [
        PartKind::Body,
        PartKind::Door,
        PartKind::Hatch,
        PartKind::Wheel,
        PartKind::Gear,
        PartKind::Shaft,
        PartKind::Housing,
        PartKind::Cube,
        PartKind::Asset,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PartKind::Body => "body",
            PartKind::Door => "door",
            PartKind::Hatch => "hatch",
            PartKind::Wheel => "wheel",
            PartKind::Gear => "gear",
            PartKind::Shaft => "shaft",
            PartKind::Housing => "housing",
            PartKind::Cube => "cube",
            PartKind::Asset => "asset",
        }
    }

    /// Kinds whose condition is tracked as a wear level.
    pub fn has_wear(self) -> bool {
        matches!(self, PartKind::Gear | PartKind::Cube)
    }

    /// Kinds that articulate open and closed.
    pub fn is_hinged(self) -> bool {
        matches!(self, PartKind::Door | PartKind::Hatch)
    }

    fn known_params(self) -> &'static [&'static str] {
        match self {
            PartKind::Body => &["length", "height", "width"],
            PartKind::Door => &["side", "mount", "length", "height"],
            PartKind::Hatch => &["type", "length", "width"],
            PartKind::Wheel => &["spin_speed", "radius", "width"],
            PartKind::Gear => &["radius", "teeth", "spin_speed", "spin_axis", "thickness"],
            PartKind::Shaft => &["length", "radius"],
            PartKind::Housing => &["width", "depth", "thickness"],
            PartKind::Cube => &["size"],
            PartKind::Asset => &["path"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorSide {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorMount {
    Front,
    Rear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HatchKind {
    Hood,
    Trunk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn unit(self) -> Vec3 {
        match self {
            Axis::X => Vec3::X,
            Axis::Y => Vec3::Y,
            Axis::Z => Vec3::Z,
        }
    }
}

/// Typed parameters for each part kind. The kind of a part is derived from
/// this, so the two can never disagree.
#[derive(Debug, Clone, PartialEq)]
pub enum KindParams {
    Body { length: f32, height: f32, width: f32 },
    Door { side: DoorSide, mount: DoorMount, length: f32, height: f32 },
    Hatch { kind: HatchKind, length: f32, width: f32 },
    Wheel { spin_speed: f32, radius: f32, width: f32 },
    Gear { radius: f32, tooth_count: u32, spin_speed: f32, spin_axis: Axis, thickness: f32 },
    Shaft { length: f32, radius: f32 },
    Housing { width: f32, depth: f32, thickness: f32 },
    Cube { size: f32 },
    Asset { path: String },
}

impl KindParams {
    pub fn kind(&self) -> PartKind {
        match self {
            KindParams::Body { .. } => PartKind::Body,
            KindParams::Door { .. } => PartKind::Door,
            KindParams::Hatch { .. } => PartKind::Hatch,
            KindParams::Wheel { .. } => PartKind::Wheel,
            KindParams::Gear { .. } => PartKind::Gear,
            KindParams::Shaft { .. } => PartKind::Shaft,
            KindParams::Housing { .. } => PartKind::Housing,
            KindParams::Cube { .. } => PartKind::Cube,
            KindParams::Asset { .. } => PartKind::Asset,
        }
    }
}

/// One part as declared in a catalog. Immutable after load.
#[derive(Debug, Clone, PartialEq)]
pub struct PartSpec {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub assembled_position: Vec3,
    pub exploded_position: Vec3,
    pub base_color: Color,
    pub params: KindParams,
    /// Starting wear for wear-bearing kinds.
    pub initial_wear: Option<f32>,
}

impl PartSpec {
    pub fn kind(&self) -> PartKind {
        self.params.kind()
    }

    /// Layout position before any user offset.
    pub fn layout_position(&self, exploded: bool) -> Vec3 {
        if exploded { self.exploded_position } else { self.assembled_position }
    }
}

// ============================================================================
// CATALOG FILE
// ============================================================================

#[derive(Debug, Deserialize)]
struct CatalogFile {
    name: String,
    parts: Vec<PartEntry>,
}

#[derive(Debug, Deserialize)]
struct PartEntry {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    position: (f32, f32, f32),
    exploded: (f32, f32, f32),
    color: String,
    kind: PartKind,
    #[serde(default)]
    params: BTreeMap<String, ParamValue>,
    #[serde(default)]
    initial_wear: Option<f32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ParamValue {
    Number(f64),
    Text(String),
}

/// Typed access to one entry's `params` map.
struct ParamReader<'a> {
    id: &'a str,
    kind: PartKind,
    raw: &'a BTreeMap<String, ParamValue>,
}

impl<'a> ParamReader<'a> {
    fn invalid(&self, param: &'static str, reason: impl Into<String>) -> ConfigError {
        ConfigError::InvalidParam { id: self.id.to_string(), param, reason: reason.into() }
    }

    fn missing(&self, param: &'static str) -> ConfigError {
        ConfigError::MissingParam { id: self.id.to_string(), kind: self.kind.name(), param }
    }

    fn number(&self, key: &'static str) -> Result<Option<f32>, ConfigError> {
        match self.raw.get(key) {
            None => Ok(None),
            Some(ParamValue::Number(v)) if v.is_finite() => Ok(Some(*v as f32)),
            Some(ParamValue::Number(v)) => Err(self.invalid(key, format!("{v} is not finite"))),
            Some(ParamValue::Text(t)) => Err(self.invalid(key, format!("expected a number, got \"{t}\""))),
        }
    }

    fn number_or(&self, key: &'static str, default: f32) -> Result<f32, ConfigError> {
        Ok(self.number(key)?.unwrap_or(default))
    }

    fn required_number(&self, key: &'static str) -> Result<f32, ConfigError> {
        self.number(key)?.ok_or_else(|| self.missing(key))
    }

    fn required_count(&self, key: &'static str) -> Result<u32, ConfigError> {
        let v = self.required_number(key)?;
        if v < 0.0 || v.fract() != 0.0 || v > u32::MAX as f32 {
            return Err(self.invalid(key, format!("{v} is not a whole count")));
        }
        Ok(v as u32)
    }

    fn text(&self, key: &'static str) -> Result<Option<&'a str>, ConfigError> {
        match self.raw.get(key) {
            None => Ok(None),
            Some(ParamValue::Text(t)) => Ok(Some(t.as_str())),
            Some(ParamValue::Number(v)) => Err(self.invalid(key, format!("expected text, got {v}"))),
        }
    }

    /// Map a text parameter onto one of `options`.
    fn choice<T: Copy>(&self, key: &'static str, options: &[(&str, T)]) -> Result<Option<T>, ConfigError> {
        let Some(text) = self.text(key)? else {
            return Ok(None);
        };
        options
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(text))
            .map(|&(_, value)| Some(value))
            .ok_or_else(|| {
                let names: Vec<&str> = options.iter().map(|(n, _)| *n).collect();
                self.invalid(key, format!("\"{text}\" is not one of {}", names.join(", ")))
            })
    }

    fn required_choice<T: Copy>(&self, key: &'static str, options: &[(&str, T)]) -> Result<T, ConfigError> {
        self.choice(key, options)?.ok_or_else(|| self.missing(key))
    }

    fn warn_unknown(&self) {
        let known = self.kind.known_params();
        for key in self.raw.keys().filter(|k| !known.contains(&k.as_str())) {
            log::warn!("part `{}` ({}): ignoring unknown parameter `{}`", self.id, self.kind.name(), key);
        }
    }

    fn resolve(&self) -> Result<KindParams, ConfigError> {
        self.warn_unknown();
        let params = match self.kind {
            PartKind::Body => KindParams::Body {
                length: self.number_or("length", 3.5)?,
                height: self.number_or("height", 1.1)?,
                width: self.number_or("width", 1.6)?,
            },
            PartKind::Door => KindParams::Door {
                side: self.required_choice("side", &[("left", DoorSide::Left), ("right", DoorSide::Right)])?,
                mount: self.required_choice("mount", &[("front", DoorMount::Front), ("rear", DoorMount::Rear)])?,
                length: self.number_or("length", 0.8)?,
                height: self.number_or("height", 0.9)?,
            },
            PartKind::Hatch => KindParams::Hatch {
                kind: self.required_choice("type", &[("hood", HatchKind::Hood), ("trunk", HatchKind::Trunk)])?,
                length: self.number_or("length", 0.8)?,
                width: self.number_or("width", 1.4)?,
            },
            PartKind::Wheel => KindParams::Wheel {
                spin_speed: self.number_or("spin_speed", 1.0)?,
                radius: self.number_or("radius", 0.35)?,
                width: self.number_or("width", 0.25)?,
            },
            PartKind::Gear => KindParams::Gear {
                radius: self.required_number("radius")?,
                tooth_count: self.required_count("teeth")?,
                spin_speed: self.number_or("spin_speed", 1.0)?,
                spin_axis: self
                    .choice("spin_axis", &[("x", Axis::X), ("y", Axis::Y), ("z", Axis::Z)])?
                    .unwrap_or(Axis::Z),
                thickness: self.number_or("thickness", 0.3)?,
            },
            PartKind::Shaft => KindParams::Shaft {
                length: self.required_number("length")?,
                radius: self.required_number("radius")?,
            },
            PartKind::Housing => KindParams::Housing {
                width: self.number_or("width", 4.0)?,
                depth: self.number_or("depth", 2.5)?,
                thickness: self.number_or("thickness", 0.3)?,
            },
            PartKind::Cube => KindParams::Cube { size: self.number_or("size", 0.9)? },
            PartKind::Asset => KindParams::Asset {
                path: self.text("path")?.ok_or_else(|| self.missing("path"))?.to_string(),
            },
        };
        Ok(params)
    }
}

fn resolve_entry(entry: PartEntry) -> Result<PartSpec, ConfigError> {
    let reader = ParamReader { id: &entry.id, kind: entry.kind, raw: &entry.params };
    let params = reader.resolve()?;

    let base_color = Color::from_hex(&entry.color).ok_or_else(|| ConfigError::InvalidColor {
        id: entry.id.clone(),
        color: entry.color.clone(),
    })?;

    let initial_wear = match entry.initial_wear {
        Some(w) if !(0.0..=1.0).contains(&w) => {
            return Err(reader.invalid("initial_wear", format!("{w} is outside [0, 1]")));
        }
        Some(_) if !entry.kind.has_wear() => {
            log::warn!("part `{}` ({}): wear is not tracked for this kind", entry.id, entry.kind.name());
            None
        }
        other => other,
    };

    let (x, y, z) = entry.position;
    let (ex, ey, ez) = entry.exploded;
    Ok(PartSpec {
        display_name: entry.name,
        description: entry.description,
        assembled_position: Vec3::new(x, y, z),
        exploded_position: Vec3::new(ex, ey, ez),
        base_color,
        params,
        initial_wear,
        id: entry.id,
    })
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Built-in assemblies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Variant {
    Car,
    Gearbox,
    Cube,
    Plant,
}

impl Variant {
    pub const ALL: [Variant; 4] = [Variant::Car, Variant::Gearbox, Variant::Cube, Variant::Plant];

    /// Embedded catalog source.
    pub fn source(self) -> &'static str {
        match self {
            Variant::Car => include_str!("../../assets/assemblies/car.ron"),
            Variant::Gearbox => include_str!("../../assets/assemblies/gearbox.ron"),
            Variant::Cube => include_str!("../../assets/assemblies/cube.ron"),
            Variant::Plant => include_str!("../../assets/assemblies/plant.ron"),
        }
    }
}

/// Validated, ordered part catalog with id lookup.
#[derive(Debug, Clone)]
pub struct Registry {
    name: String,
    parts: Vec<PartSpec>,
    index: HashMap<String, usize>,
}

impl Registry {
    /// Parse and validate a catalog.
    pub fn from_ron(src: &str) -> Result<Self, ConfigError> {
        let file: CatalogFile = ron::from_str(src)?;
        if file.parts.is_empty() {
            return Err(ConfigError::Empty(file.name));
        }

        let mut parts = Vec::with_capacity(file.parts.len());
        let mut index = HashMap::with_capacity(file.parts.len());
        for entry in file.parts {
            let spec = resolve_entry(entry)?;
            if index.insert(spec.id.clone(), parts.len()).is_some() {
                return Err(ConfigError::DuplicateId(spec.id));
            }
            parts.push(spec);
        }

        log::info!("loaded assembly `{}` with {} parts", file.name, parts.len());
        Ok(Self { name: file.name, parts, index })
    }

    pub fn builtin(variant: Variant) -> Result<Self, ConfigError> {
        Self::from_ron(variant.source())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parts in catalog order.
    pub fn parts(&self) -> &[PartSpec] {
        &self.parts
    }

    pub fn get(&self, id: &str) -> Option<&PartSpec> {
        self.index_of(id).map(|i| &self.parts[i])
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PartSpec> {
        self.parts.iter()
    }
}
