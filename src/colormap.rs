use eframe::egui::Color32;

/// Anchor points of the diverging "icefire" map: pale blue, blue, near-black, red, pale yellow.
const ICEFIRE: [(f64, [u8; 3]); 9] = [
    (0.000, [189, 230, 219]),
    (0.125, [107, 190, 209]),
    (0.250, [58, 129, 203]),
    (0.375, [58, 62, 121]),
    (0.500, [29, 29, 31]),
    (0.625, [115, 38, 63]),
    (0.750, [197, 59, 57]),
    (0.875, [238, 130, 84]),
    (1.000, [255, 236, 186]),
];

/// Maps `value` clipped to `[vmin, vmax]` onto the icefire colormap. NaN maps to `None`.
pub fn icefire(value: f64, vmin: f64, vmax: f64) -> Option<Color32> {
    if value.is_nan() {
        return None;
    }
    let t = if vmax > vmin {
        ((value - vmin) / (vmax - vmin)).clamp(0.0, 1.0)
    } else {
        0.5
    };

    let upper = ICEFIRE
        .iter()
        .position(|(stop, _)| *stop >= t)
        .unwrap_or(ICEFIRE.len() - 1)
        .max(1);
    let (t0, c0) = ICEFIRE[upper - 1];
    let (t1, c1) = ICEFIRE[upper];
    let f = ((t - t0) / (t1 - t0)).clamp(0.0, 1.0);
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * f).round() as u8;

    Some(Color32::from_rgb(
        lerp(c0[0], c1[0]),
        lerp(c0[1], c1[1]),
        lerp(c0[2], c1[2]),
    ))
}

/// Palette assigned to the intrinsic subtypes, in order of first appearance.
pub const SUBTYPE_PALETTE: [&str; 7] = ["blue", "pink", "yellow", "red", "#98F5FF", "green", "black"];

/// Resolves a matplotlib-style color name or `#RRGGBB` string.
pub fn parse_color(name: &str) -> Option<Color32> {
    if let Some(hex) = name.strip_prefix('#') {
        if hex.len() != 6 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        return Some(Color32::from_rgb(channel(0)?, channel(2)?, channel(4)?));
    }
    let rgb = match name {
        "blue" => [0, 0, 255],
        "pink" => [255, 192, 203],
        "yellow" => [255, 255, 0],
        "red" => [255, 0, 0],
        "green" => [0, 128, 0],
        "black" => [0, 0, 0],
        "white" => [255, 255, 255],
        _ => return None,
    };
    Some(Color32::from_rgb(rgb[0], rgb[1], rgb[2]))
}

/// Evenly spaced hues for categorical nodes (HLS with fixed lightness/saturation).
pub fn categorical(index: usize, count: usize) -> Color32 {
    let h = index as f32 / count.max(1) as f32;
    let rgb = eframe::egui::ecolor::Hsva::new(h, 0.55, 0.85, 1.0).to_srgb();
    Color32::from_rgb(rgb[0], rgb[1], rgb[2])
}
