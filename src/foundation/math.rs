pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y) as u8
}

/// Premultiplied source-over of one RGBA8 pixel onto another.
pub(crate) fn over_premul(src: [u8; 4], dst: [u8; 4]) -> [u8; 4] {
    let inv = 255 - u16::from(src[3]);
    if inv == 0 {
        return src;
    }
    std::array::from_fn(|c| src[c].saturating_add(mul_div255_u8(u16::from(dst[c]), inv)))
}

/// Rounded average of `count` accumulated channel sums.
pub(crate) fn average_px(sum: [u32; 4], count: u32) -> [u8; 4] {
    if count == 0 {
        return [0; 4];
    }
    let half = count / 2;
    sum.map(|s| ((s + half) / count).min(255) as u8)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
