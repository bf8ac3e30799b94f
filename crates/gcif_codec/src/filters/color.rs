//! Reversible RGB <-> YUV color transforms.
//!
//! Sixteen transforms, mostly from Strutz's adaptive color-transform
//! family plus BCIF's difference filters, `YUVr` from JPEG 2000 and
//! Malvar's lifting `YCgCo-R`. All arithmetic is modulo 256 with signed
//! interpretation where the lifting steps shift, so every transform is
//! exactly invertible over the full 8-bit cube.

/// Number of color filters
pub const CF_COUNT: usize = 16;

type CfFunc = fn([u8; 3]) -> [u8; 3];

#[inline]
fn w(v: i32) -> u8 {
	v as u8
}

#[inline]
fn s(v: u8) -> i32 {
	i32::from(v as i8)
}

// Forward transforms: [r, g, b] -> [y, u, v]

fn r2y_gb_rg([r, g, b]: [u8; 3]) -> [u8; 3] {
	[b, g.wrapping_sub(b), g.wrapping_sub(r)]
}

fn r2y_gr_bg([r, g, b]: [u8; 3]) -> [u8; 3] {
	[g.wrapping_sub(b), g.wrapping_sub(r), r]
}

fn r2y_yuvr([r, g, b]: [u8; 3]) -> [u8; 3] {
	let u = b.wrapping_sub(g);
	let v = r.wrapping_sub(g);
	let y = w(i32::from(g) + ((s(u) + s(v)) >> 2));
	[y, u, v]
}

fn r2y_d9([r, g, b]: [u8; 3]) -> [u8; 3] {
	let mix = ((u32::from(r) + u32::from(g) * 3) >> 2) as u8;
	[r, b.wrapping_sub(mix), g.wrapping_sub(r)]
}

fn r2y_d12([r, g, b]: [u8; 3]) -> [u8; 3] {
	let mix = ((u32::from(r) * 3 + u32::from(b)) >> 2) as u8;
	[b, g.wrapping_sub(mix), r.wrapping_sub(b)]
}

fn r2y_d8([r, g, b]: [u8; 3]) -> [u8; 3] {
	let mix = ((u32::from(r) + u32::from(g)) >> 1) as u8;
	[r, b.wrapping_sub(mix), g.wrapping_sub(r)]
}

fn r2y_e2r([r, g, b]: [u8; 3]) -> [u8; 3] {
	let co = r.wrapping_sub(g);
	let t = i32::from(g) + (s(co) >> 1);
	let cg = w(i32::from(b) - t);
	let y = w(t + (s(cg) >> 1));
	[y, cg, co]
}

fn r2y_bg_rg([r, g, b]: [u8; 3]) -> [u8; 3] {
	[g.wrapping_sub(b), g, g.wrapping_sub(r)]
}

fn r2y_gr_br([r, g, b]: [u8; 3]) -> [u8; 3] {
	[b.wrapping_sub(r), g.wrapping_sub(r), r]
}

fn r2y_d18([r, g, b]: [u8; 3]) -> [u8; 3] {
	let mix = ((u32::from(g) * 3 + u32::from(b)) >> 2) as u8;
	[b, r.wrapping_sub(mix), g.wrapping_sub(b)]
}

fn r2y_b_gr_r([r, g, b]: [u8; 3]) -> [u8; 3] {
	[b, g.wrapping_sub(r), r]
}

fn r2y_d11([r, g, b]: [u8; 3]) -> [u8; 3] {
	let mix = ((u32::from(r) + u32::from(b)) >> 1) as u8;
	[b, g.wrapping_sub(mix), r.wrapping_sub(b)]
}

fn r2y_d14([r, g, b]: [u8; 3]) -> [u8; 3] {
	let mix = ((u32::from(r) + u32::from(b)) >> 1) as u8;
	[r, g.wrapping_sub(mix), b.wrapping_sub(r)]
}

fn r2y_d10([r, g, b]: [u8; 3]) -> [u8; 3] {
	let mix = ((u32::from(r) + u32::from(b) * 3) >> 2) as u8;
	[b, g.wrapping_sub(mix), r.wrapping_sub(b)]
}

fn r2y_ycgco_r([r, g, b]: [u8; 3]) -> [u8; 3] {
	let co = r.wrapping_sub(b);
	let t = i32::from(b) + (s(co) >> 1);
	let cg = w(i32::from(g) - t);
	let y = w(t + (s(cg) >> 1));
	[y, cg, co]
}

fn r2y_gb_rb([r, g, b]: [u8; 3]) -> [u8; 3] {
	[b, g.wrapping_sub(b), r.wrapping_sub(b)]
}

// Inverse transforms: [y, u, v] -> [r, g, b]

fn y2r_gb_rg([y, u, v]: [u8; 3]) -> [u8; 3] {
	let b = y;
	let g = u.wrapping_add(b);
	[g.wrapping_sub(v), g, b]
}

fn y2r_gr_bg([y, u, v]: [u8; 3]) -> [u8; 3] {
	let r = v;
	let g = u.wrapping_add(r);
	[r, g, g.wrapping_sub(y)]
}

fn y2r_yuvr([y, u, v]: [u8; 3]) -> [u8; 3] {
	let g = w(i32::from(y) - ((s(u) + s(v)) >> 2));
	[v.wrapping_add(g), g, u.wrapping_add(g)]
}

fn y2r_d9([y, u, v]: [u8; 3]) -> [u8; 3] {
	let r = y;
	let g = v.wrapping_add(r);
	let mix = ((u32::from(r) + u32::from(g) * 3) >> 2) as u8;
	[r, g, u.wrapping_add(mix)]
}

fn y2r_d12([y, u, v]: [u8; 3]) -> [u8; 3] {
	let b = y;
	let r = b.wrapping_add(v);
	let mix = ((u32::from(r) * 3 + u32::from(b)) >> 2) as u8;
	[r, u.wrapping_add(mix), b]
}

fn y2r_d8([y, u, v]: [u8; 3]) -> [u8; 3] {
	let r = y;
	let g = v.wrapping_add(r);
	let mix = ((u32::from(r) + u32::from(g)) >> 1) as u8;
	[r, g, u.wrapping_add(mix)]
}

fn y2r_e2r([y, u, v]: [u8; 3]) -> [u8; 3] {
	let co = v;
	let cg = u;
	let t = i32::from(y) - (s(cg) >> 1);
	let b = w(s(cg) + t);
	let g = w(t - (s(co) >> 1));
	[w(s(co) + i32::from(g)), g, b]
}

fn y2r_bg_rg([y, u, v]: [u8; 3]) -> [u8; 3] {
	let g = u;
	[g.wrapping_sub(v), g, g.wrapping_sub(y)]
}

fn y2r_gr_br([y, u, v]: [u8; 3]) -> [u8; 3] {
	let r = v;
	[r, u.wrapping_add(r), y.wrapping_add(r)]
}

fn y2r_d18([y, u, v]: [u8; 3]) -> [u8; 3] {
	let b = y;
	let g = v.wrapping_add(b);
	let mix = ((u32::from(g) * 3 + u32::from(b)) >> 2) as u8;
	[u.wrapping_add(mix), g, b]
}

fn y2r_b_gr_r([y, u, v]: [u8; 3]) -> [u8; 3] {
	let r = v;
	[r, u.wrapping_add(r), y]
}

fn y2r_d11([y, u, v]: [u8; 3]) -> [u8; 3] {
	let b = y;
	let r = v.wrapping_add(b);
	let mix = ((u32::from(r) + u32::from(b)) >> 1) as u8;
	[r, u.wrapping_add(mix), b]
}

fn y2r_d14([y, u, v]: [u8; 3]) -> [u8; 3] {
	let r = y;
	let b = v.wrapping_add(r);
	let mix = ((u32::from(r) + u32::from(b)) >> 1) as u8;
	[r, u.wrapping_add(mix), b]
}

fn y2r_d10([y, u, v]: [u8; 3]) -> [u8; 3] {
	let b = y;
	let r = v.wrapping_add(b);
	let mix = ((u32::from(r) + u32::from(b) * 3) >> 2) as u8;
	[r, u.wrapping_add(mix), b]
}

fn y2r_ycgco_r([y, u, v]: [u8; 3]) -> [u8; 3] {
	let co = v;
	let cg = u;
	let t = i32::from(y) - (s(cg) >> 1);
	let g = w(s(cg) + t);
	let b = w(t - (s(co) >> 1));
	[w(s(co) + i32::from(b)), g, b]
}

fn y2r_gb_rb([y, u, v]: [u8; 3]) -> [u8; 3] {
	let b = y;
	[v.wrapping_add(b), u.wrapping_add(b), b]
}

/// Forward transforms in transmitted index order
static RGB_TO_YUV: [CfFunc; CF_COUNT] = [
	r2y_gb_rg,
	r2y_gr_bg,
	r2y_yuvr,
	r2y_d9,
	r2y_d12,
	r2y_d8,
	r2y_e2r,
	r2y_bg_rg,
	r2y_gr_br,
	r2y_d18,
	r2y_b_gr_r,
	r2y_d11,
	r2y_d14,
	r2y_d10,
	r2y_ycgco_r,
	r2y_gb_rb,
];

/// Inverse transforms in transmitted index order
static YUV_TO_RGB: [CfFunc; CF_COUNT] = [
	y2r_gb_rg,
	y2r_gr_bg,
	y2r_yuvr,
	y2r_d9,
	y2r_d12,
	y2r_d8,
	y2r_e2r,
	y2r_bg_rg,
	y2r_gr_br,
	y2r_d18,
	y2r_b_gr_r,
	y2r_d11,
	y2r_d14,
	y2r_d10,
	y2r_ycgco_r,
	y2r_gb_rb,
];

/// Applies forward color filter `cf`
#[inline]
pub fn rgb_to_yuv(cf: usize, rgb: [u8; 3]) -> [u8; 3] {
	RGB_TO_YUV[cf](rgb)
}

/// Applies inverse color filter `cf`
#[inline]
pub fn yuv_to_rgb(cf: usize, yuv: [u8; 3]) -> [u8; 3] {
	YUV_TO_RGB[cf](yuv)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	#[ignore = "exhaustive 256^3 sweep; run with --ignored"]
	fn test_all_filters_reversible_exhaustive() {
		// The full 256^3 cube for each of the 16 transforms
		for cf in 0..CF_COUNT {
			for r in 0..=255u8 {
				for g in 0..=255u8 {
					for b in 0..=255u8 {
						let rgb = [r, g, b];
						let back = yuv_to_rgb(cf, rgb_to_yuv(cf, rgb));
						assert_eq!(back, rgb, "cf {cf} not reversible at {rgb:?}");
					}
				}
			}
		}
	}

	#[test]
	fn test_all_filters_reversible_dense() {
		// Two channels exhaustive, the third on a coprime stride, three
		// ways round; catches every wrap and shift edge the exhaustive
		// sweep does in a fraction of the time
		for cf in 0..CF_COUNT {
			for hi in 0..=255u8 {
				for lo in 0..=255u8 {
					for third in [0u8, 1, 63, 127, 128, 129, 254, 255] {
						for rgb in [[hi, lo, third], [hi, third, lo], [third, hi, lo]] {
							let back = yuv_to_rgb(cf, rgb_to_yuv(cf, rgb));
							assert_eq!(back, rgb, "cf {cf} not reversible at {rgb:?}");
						}
					}
				}
			}
		}
	}

	#[test]
	fn test_gb_rg_definition() {
		// Y=B, U=G-B, V=G-R
		assert_eq!(rgb_to_yuv(0, [10, 20, 30]), [30, 246, 10]);
	}

	#[test]
	fn test_identityish_filter_keeps_gray_small() {
		// On gray pixels every difference-based transform should
		// produce zero chroma
		for cf in [0usize, 1, 8, 10, 15] {
			let yuv = rgb_to_yuv(cf, [77, 77, 77]);
			assert_eq!(yuv[1], 0, "cf {cf}");
		}
	}
}
