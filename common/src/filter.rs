//! Built-in photo filters.
//!
//! Each filter is a composition of a few pure per-pixel color adjustments
//! (CSS filter-function semantics), so the same code path serves both the
//! live preview and the captured still — what you see is what you get.
//! Filters never change geometry; cropping is the compositor's job.

/// The closed set of built-in filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    None,
    Vintage,
    Monochrome,
    Cinematic,
    Soft,
    Vignette,
}

/// A catalog entry: display label plus the stable identifier used in config
/// and in the picker.
#[derive(Debug, Clone, Copy)]
pub struct FilterDescriptor {
    pub name: &'static str,
    pub id: &'static str,
    pub kind: FilterKind,
}

pub const CATALOG: [FilterDescriptor; 6] = [
    FilterDescriptor {
        name: "None",
        id: "none",
        kind: FilterKind::None,
    },
    FilterDescriptor {
        name: "Vintage",
        id: "vintage",
        kind: FilterKind::Vintage,
    },
    FilterDescriptor {
        name: "B&W",
        id: "monochrome",
        kind: FilterKind::Monochrome,
    },
    FilterDescriptor {
        name: "Cinematic",
        id: "cinematic",
        kind: FilterKind::Cinematic,
    },
    FilterDescriptor {
        name: "Soft",
        id: "soft",
        kind: FilterKind::Soft,
    },
    FilterDescriptor {
        name: "Vignette",
        id: "vignette",
        kind: FilterKind::Vignette,
    },
];

impl FilterKind {
    /// Look up a filter by its stable identifier.
    pub fn from_id(id: &str) -> Option<FilterKind> {
        CATALOG.iter().find(|d| d.id == id).map(|d| d.kind)
    }

    pub fn id(self) -> &'static str {
        CATALOG
            .iter()
            .find(|d| d.kind == self)
            .map(|d| d.id)
            .unwrap_or("none")
    }

    /// Apply this filter to one RGBA pixel. Alpha passes through untouched;
    /// `None` is a byte-exact identity.
    pub fn apply_pixel(self, px: [u8; 4]) -> [u8; 4] {
        if self == FilterKind::None {
            return px;
        }
        let mut c = [
            px[0] as f32 / 255.0,
            px[1] as f32 / 255.0,
            px[2] as f32 / 255.0,
        ];
        match self {
            FilterKind::None => unreachable!(),
            // sepia(0.5) contrast(1.2)
            FilterKind::Vintage => {
                c = sepia(c, 0.5);
                c = contrast(c, 1.2);
            }
            // grayscale(1)
            FilterKind::Monochrome => {
                c = grayscale(c, 1.0);
            }
            // contrast(1.3) saturate(1.2)
            FilterKind::Cinematic => {
                c = contrast(c, 1.3);
                c = saturate(c, 1.2);
            }
            // brightness(1.1) contrast(0.9)
            FilterKind::Soft => {
                c = brightness(c, 1.1);
                c = contrast(c, 0.9);
            }
            // contrast(1.2) brightness(0.9)
            FilterKind::Vignette => {
                c = contrast(c, 1.2);
                c = brightness(c, 0.9);
            }
        }
        [to_u8(c[0]), to_u8(c[1]), to_u8(c[2]), px[3]]
    }
}

/// Rec. 709 relative luminance.
fn luma(c: [f32; 3]) -> f32 {
    0.2126 * c[0] + 0.7152 * c[1] + 0.0722 * c[2]
}

fn brightness(c: [f32; 3], amount: f32) -> [f32; 3] {
    [c[0] * amount, c[1] * amount, c[2] * amount]
}

fn contrast(c: [f32; 3], amount: f32) -> [f32; 3] {
    [
        (c[0] - 0.5) * amount + 0.5,
        (c[1] - 0.5) * amount + 0.5,
        (c[2] - 0.5) * amount + 0.5,
    ]
}

fn grayscale(c: [f32; 3], amount: f32) -> [f32; 3] {
    let l = luma(c);
    [
        c[0] + (l - c[0]) * amount,
        c[1] + (l - c[1]) * amount,
        c[2] + (l - c[2]) * amount,
    ]
}

fn saturate(c: [f32; 3], amount: f32) -> [f32; 3] {
    let l = luma(c);
    [
        l + (c[0] - l) * amount,
        l + (c[1] - l) * amount,
        l + (c[2] - l) * amount,
    ]
}

/// Sepia matrix mixed with the identity by `amount`.
fn sepia(c: [f32; 3], amount: f32) -> [f32; 3] {
    let s = [
        0.393 * c[0] + 0.769 * c[1] + 0.189 * c[2],
        0.349 * c[0] + 0.686 * c[1] + 0.168 * c[2],
        0.272 * c[0] + 0.534 * c[1] + 0.131 * c[2],
    ];
    [
        c[0] + (s[0] - c[0]) * amount,
        c[1] + (s[1] - c[1]) * amount,
        c[2] + (s[2] - c[2]) * amount,
    ]
}

fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}
