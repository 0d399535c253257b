/*!
Core value types and math aliases shared by every module.

Identifiers are plain newtypes over monotonically increasing counters. They are
never reused within one [`crate::DestructionWorld`], so a stale id simply fails
to resolve instead of aliasing a newer object.
*/

use std::fmt;
use std::str::FromStr;

use nalgebra as na;

/// Common math aliases for clarity and consistency.
pub type Vec3 = na::Vector3<f32>;
pub type Point3 = na::Point3<f32>;
pub type Quat = na::UnitQuaternion<f32>;
pub type Iso = na::Isometry3<f32>;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

id_type!(
    /// A live (or formerly live) structure.
    StructureId
);
id_type!(
    /// One debris piece of a broken structure.
    FragmentId
);
id_type!(
    /// A single scene object (instanced batch or fragment mesh).
    MeshId
);
id_type!(GeometryId);
id_type!(MaterialId);

/// Monotonic id allocator.
#[derive(Debug, Default)]
pub struct IdGen(u64);

impl IdGen {
    #[inline]
    pub fn next_raw(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }
}

/// 8-bit sRGB color as stored in structure data (`#RRGGBB`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(0xff, 0xff, 0xff);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// One of the CSS basic color keywords.
    pub fn named(name: &str) -> Option<Rgb> {
        const NAMES: [(&str, Rgb); 17] = [
            ("black", Rgb::new(0x00, 0x00, 0x00)),
            ("silver", Rgb::new(0xc0, 0xc0, 0xc0)),
            ("gray", Rgb::new(0x80, 0x80, 0x80)),
            ("white", Rgb::new(0xff, 0xff, 0xff)),
            ("maroon", Rgb::new(0x80, 0x00, 0x00)),
            ("red", Rgb::new(0xff, 0x00, 0x00)),
            ("purple", Rgb::new(0x80, 0x00, 0x80)),
            ("fuchsia", Rgb::new(0xff, 0x00, 0xff)),
            ("green", Rgb::new(0x00, 0x80, 0x00)),
            ("lime", Rgb::new(0x00, 0xff, 0x00)),
            ("olive", Rgb::new(0x80, 0x80, 0x00)),
            ("yellow", Rgb::new(0xff, 0xff, 0x00)),
            ("navy", Rgb::new(0x00, 0x00, 0x80)),
            ("blue", Rgb::new(0x00, 0x00, 0xff)),
            ("teal", Rgb::new(0x00, 0x80, 0x80)),
            ("aqua", Rgb::new(0x00, 0xff, 0xff)),
            ("orange", Rgb::new(0xff, 0xa5, 0x00)),
        ];
        NAMES
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|&(_, rgb)| rgb)
    }

    /// Normalized `[r, g, b]` in `0..=1`.
    pub fn to_f32(self) -> [f32; 3] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        ]
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseRgbError;

impl FromStr for Rgb {
    type Err = ParseRgbError;

    /// Accepts `#RRGGBB`, the `#RGB` shorthand and the basic CSS color
    /// names, case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let Some(hex) = s.strip_prefix('#') else {
            return Rgb::named(s).ok_or(ParseRgbError);
        };
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ParseRgbError);
        }
        let channel = |h: &str| u8::from_str_radix(h, 16).map_err(|_| ParseRgbError);
        match hex.len() {
            6 => Ok(Rgb::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => {
                let expand = |h: &str| channel(h).map(|v| v * 17);
                Ok(Rgb::new(
                    expand(&hex[0..1])?,
                    expand(&hex[1..2])?,
                    expand(&hex[2..3])?,
                ))
            }
            _ => Err(ParseRgbError),
        }
    }
}

/// Content key for a render material: color plus alpha quantized to 1/1000.
///
/// Two blocks share a batch and a cached material exactly when their keys
/// are equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialKey {
    pub color: Rgb,
    pub alpha_milli: u16,
}

impl MaterialKey {
    pub fn new(color: Rgb, alpha: f32) -> Self {
        let alpha_milli = (alpha.clamp(0.0, 1.0) * 1000.0).round() as u16;
        Self { color, alpha_milli }
    }

    #[inline]
    pub fn alpha(&self) -> f32 {
        self.alpha_milli as f32 / 1000.0
    }

    /// Translucent materials render both faces.
    #[inline]
    pub fn is_translucent(&self) -> bool {
        self.alpha_milli < 999
    }
}
