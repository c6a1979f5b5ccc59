//! Color resolution: plugin palette lookup first, then the full
//! translation pass (named colors, `#RRGGBB[AA]`, `H,S,V` triples,
//! and color lists with stops). Unknown colors warn once per run and
//! resolve to black.

use gv_core::warn_once;
use peniko::Color;

/// A color list entry: a color plus an optional stop fraction.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorStop {
    pub color: Color,
    pub frac: Option<f64>,
}

/// Named palette subset (graphviz X11 scheme spellings).
const NAMED: &[(&str, [u8; 3])] = &[
    ("aliceblue", [240, 248, 255]),
    ("aquamarine", [127, 255, 212]),
    ("azure", [240, 255, 255]),
    ("beige", [245, 245, 220]),
    ("black", [0, 0, 0]),
    ("blue", [0, 0, 255]),
    ("blueviolet", [138, 43, 226]),
    ("brown", [165, 42, 42]),
    ("cadetblue", [95, 158, 160]),
    ("chartreuse", [127, 255, 0]),
    ("chocolate", [210, 105, 30]),
    ("coral", [255, 127, 80]),
    ("cornflowerblue", [100, 149, 237]),
    ("crimson", [220, 20, 60]),
    ("cyan", [0, 255, 255]),
    ("darkblue", [0, 0, 139]),
    ("darkgreen", [0, 100, 0]),
    ("darkorange", [255, 140, 0]),
    ("firebrick", [178, 34, 34]),
    ("forestgreen", [34, 139, 34]),
    ("gold", [255, 215, 0]),
    ("gray", [192, 192, 192]),
    ("grey", [192, 192, 192]),
    ("green", [0, 255, 0]),
    ("hotpink", [255, 105, 180]),
    ("indigo", [75, 0, 130]),
    ("ivory", [255, 255, 240]),
    ("khaki", [240, 230, 140]),
    ("lavender", [230, 230, 250]),
    ("lightblue", [173, 216, 230]),
    ("lightgrey", [211, 211, 211]),
    ("lightyellow", [255, 255, 224]),
    ("limegreen", [50, 205, 50]),
    ("magenta", [255, 0, 255]),
    ("maroon", [176, 48, 96]),
    ("navy", [0, 0, 128]),
    ("olive", [128, 128, 0]),
    ("orange", [255, 165, 0]),
    ("orchid", [218, 112, 214]),
    ("pink", [255, 192, 203]),
    ("purple", [160, 32, 240]),
    ("red", [255, 0, 0]),
    ("salmon", [250, 128, 114]),
    ("skyblue", [135, 206, 235]),
    ("slategray", [112, 128, 144]),
    ("tan", [210, 180, 140]),
    ("teal", [0, 128, 128]),
    ("tomato", [255, 99, 71]),
    ("violet", [238, 130, 238]),
    ("wheat", [245, 222, 179]),
    ("white", [255, 255, 255]),
    ("yellow", [255, 255, 0]),
];

pub fn black() -> Color {
    Color::from_rgba8(0, 0, 0, 255)
}

/// Resolve one color string. `palette` is the plugin's own table and
/// is consulted first.
pub fn resolve_color(s: &str, palette: Option<&dyn Fn(&str) -> Option<Color>>) -> Color {
    if let Some(pal) = palette {
        if let Some(c) = pal(s) {
            return c;
        }
    }
    match translate(s) {
        Some(c) => c,
        None => {
            warn_once!("unknown color '{s}', using black");
            black()
        }
    }
}

/// The full translation pass, without the palette shortcut.
fn translate(s: &str) -> Option<Color> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex);
    }
    if s.contains(',') || s.split_whitespace().count() == 3 {
        if let Some(c) = parse_hsv(s) {
            return Some(c);
        }
    }
    let key = s.to_ascii_lowercase().replace(' ', "");
    NAMED
        .iter()
        .find(|(n, _)| *n == key)
        .map(|&(_, [r, g, b])| Color::from_rgba8(r, g, b, 255))
}

fn parse_hex(hex: &str) -> Option<Color> {
    let v = |b: u8| -> Option<u8> {
        match b {
            b'0'..=b'9' => Some(b - b'0'),
            b'a'..=b'f' => Some(b - b'a' + 10),
            b'A'..=b'F' => Some(b - b'A' + 10),
            _ => None,
        }
    };
    let b = hex.as_bytes();
    match b.len() {
        3 => Some(Color::from_rgba8(
            v(b[0])? * 17,
            v(b[1])? * 17,
            v(b[2])? * 17,
            255,
        )),
        6 | 8 => {
            let r = v(b[0])? << 4 | v(b[1])?;
            let g = v(b[2])? << 4 | v(b[3])?;
            let bl = v(b[4])? << 4 | v(b[5])?;
            let a = if b.len() == 8 {
                v(b[6])? << 4 | v(b[7])?
            } else {
                255
            };
            Some(Color::from_rgba8(r, g, bl, a))
        }
        _ => None,
    }
}

/// `H,S,V` (or space-separated) with every component in `[0, 1]`.
fn parse_hsv(s: &str) -> Option<Color> {
    let parts: Vec<f64> = s
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .map(|p| p.parse::<f64>())
        .collect::<Result<_, _>>()
        .ok()?;
    let [h, sat, val] = parts.as_slice() else {
        return None;
    };
    if !(0.0..=1.0).contains(h) || !(0.0..=1.0).contains(sat) || !(0.0..=1.0).contains(val) {
        return None;
    }
    let (r, g, b) = hsv_to_rgb(*h * 360.0, *sat, *val);
    Some(Color::from_rgba8(
        (r * 255.0).round() as u8,
        (g * 255.0).round() as u8,
        (b * 255.0).round() as u8,
        255,
    ))
}

fn hsv_to_rgb(h: f64, s: f64, v: f64) -> (f64, f64, f64) {
    if s <= 0.0 {
        return (v, v, v);
    }
    let h = (h % 360.0) / 60.0;
    let i = h.floor();
    let f = h - i;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match i as i32 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    }
}

/// Parse a color list `c1[;f1][:c2[;f2]...]` as used by gradient
/// fills. Single colors yield a one-entry list.
pub fn resolve_color_list(s: &str, palette: Option<&dyn Fn(&str) -> Option<Color>>) -> Vec<ColorStop> {
    s.split(':')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            let (color, frac) = match part.split_once(';') {
                Some((c, f)) => (c, f.trim().parse::<f64>().ok()),
                None => (part, None),
            };
            ColorStop {
                color: resolve_color(color, palette),
                frac: frac.filter(|f| (0.0..=1.0).contains(f)),
            }
        })
        .collect()
}
