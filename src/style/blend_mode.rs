/// Compositing operator applied when a layer or decoration is drawn onto a target.
///
/// All formulas operate on premultiplied pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    Clear,
    Src,
    Dst,
    #[default]
    SrcOver,
    DstOver,
    SrcIn,
    DstIn,
    SrcOut,
    DstOut,
    SrcAtop,
    DstAtop,
    Xor,
    Plus,
    Modulate,
    Screen,
    Overlay,
    Darken,
    Lighten,
    Multiply,
}

impl BlendMode {
    pub fn blend(self, src: [f32; 4], dst: [f32; 4]) -> [f32; 4] {
        let sa = src[3];
        let da = dst[3];
        match self {
            BlendMode::Clear => [0.0; 4],
            BlendMode::Src => src,
            BlendMode::Dst => dst,
            BlendMode::SrcOver => per_channel(src, dst, |s, d| s + d * (1.0 - sa)),
            BlendMode::DstOver => per_channel(src, dst, |s, d| d + s * (1.0 - da)),
            BlendMode::SrcIn => per_channel(src, dst, |s, _| s * da),
            BlendMode::DstIn => per_channel(src, dst, |_, d| d * sa),
            BlendMode::SrcOut => per_channel(src, dst, |s, _| s * (1.0 - da)),
            BlendMode::DstOut => per_channel(src, dst, |_, d| d * (1.0 - sa)),
            BlendMode::SrcAtop => {
                let mut out = per_channel(src, dst, |s, d| s * da + d * (1.0 - sa));
                out[3] = da;
                out
            }
            BlendMode::DstAtop => {
                let mut out = per_channel(src, dst, |s, d| d * sa + s * (1.0 - da));
                out[3] = sa;
                out
            }
            BlendMode::Xor => per_channel(src, dst, |s, d| s * (1.0 - da) + d * (1.0 - sa)),
            BlendMode::Plus => per_channel(src, dst, |s, d| (s + d).min(1.0)),
            BlendMode::Modulate => per_channel(src, dst, |s, d| s * d),
            BlendMode::Screen => per_channel(src, dst, |s, d| s + d - s * d),
            BlendMode::Multiply => separable(src, dst, |s, d| s * d),
            BlendMode::Overlay => separable(src, dst, |s, d| {
                if 2.0 * d <= da {
                    2.0 * s * d
                } else {
                    sa * da - 2.0 * (da - d) * (sa - s)
                }
            }),
            BlendMode::Darken => separable(src, dst, |s, d| (s * da).min(d * sa)),
            BlendMode::Lighten => separable(src, dst, |s, d| (s * da).max(d * sa)),
        }
    }
}

fn per_channel(src: [f32; 4], dst: [f32; 4], f: impl Fn(f32, f32) -> f32) -> [f32; 4] {
    [
        f(src[0], dst[0]),
        f(src[1], dst[1]),
        f(src[2], dst[2]),
        f(src[3], dst[3]),
    ]
}

// `mix` receives premultiplied channels and returns the overlapping contribution;
// the non-overlapping parts of source and destination pass through.
fn separable(src: [f32; 4], dst: [f32; 4], mix: impl Fn(f32, f32) -> f32) -> [f32; 4] {
    let sa = src[3];
    let da = dst[3];
    let mut out = [0.0; 4];
    for i in 0..3 {
        let s = src[i];
        let d = dst[i];
        out[i] = s * (1.0 - da) + d * (1.0 - sa) + mix(s, d);
    }
    out[3] = sa + da - sa * da;
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
    const HALF_BLUE: [f32; 4] = [0.0, 0.0, 0.5, 0.5];

    #[test]
    fn src_over_with_transparent_source_keeps_destination() {
        assert_eq!(BlendMode::SrcOver.blend([0.0; 4], RED), RED);
    }

    #[test]
    fn src_over_half_alpha_mixes_evenly() {
        assert_eq!(BlendMode::SrcOver.blend(HALF_BLUE, RED), [0.5, 0.0, 0.5, 1.0]);
    }

    #[test]
    fn dst_out_with_opaque_source_erases_destination() {
        assert_eq!(BlendMode::DstOut.blend(RED, HALF_BLUE), [0.0; 4]);
    }

    #[test]
    fn dst_in_scales_destination_by_source_alpha() {
        assert_eq!(BlendMode::DstIn.blend(HALF_BLUE, RED), [0.5, 0.0, 0.0, 0.5]);
    }

    #[test]
    fn plus_saturates_at_one() {
        assert_eq!(BlendMode::Plus.blend(RED, RED), RED);
    }

    #[test]
    fn multiply_with_white_is_identity_for_opaque_pixels() {
        let white = [1.0, 1.0, 1.0, 1.0];
        let gray = [0.25, 0.5, 0.75, 1.0];
        assert_eq!(BlendMode::Multiply.blend(white, gray), gray);
    }
}
