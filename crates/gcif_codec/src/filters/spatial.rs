//! Spatial RGB predictors.
//!
//! Neighbor naming, matching the raster layout:
//!
//! ```text
//!         E
//! F C B D
//!   A ?
//! ```
//!
//! Every filter comes in a `safe` variant that degrades toward available
//! neighbors at the image edges (A, then B, then zero) and a `fast`
//! variant that assumes `x > 0 && y > 0 && x < width - 1`. The fast
//! variants run in the interior loop; edge pixels take the safe path.
//!
//! Besides the 17 defaults there are 80 tapped filters of the form
//! `(a*A + b*B + c*C + d*D) / 2`; the encoder may swap them in for
//! defaults that score poorly on a particular image.

/// Number of default spatial filters
pub const SF_COUNT: usize = 17;

/// Number of tapped filter candidates
pub const TAPPED_COUNT: usize = 80;

/// Neighborhood view for one pixel of an RGBA raster
#[derive(Debug, Clone, Copy)]
pub struct PixelCtx<'a> {
	rgba: &'a [u8],
	/// Pixel column
	pub x: usize,
	/// Pixel row
	pub y: usize,
	/// Raster width in pixels
	pub width: usize,
}

impl<'a> PixelCtx<'a> {
	/// Creates a context for pixel (x, y)
	#[inline]
	pub fn new(rgba: &'a [u8], x: usize, y: usize, width: usize) -> Self {
		Self {
			rgba,
			x,
			y,
			width,
		}
	}

	#[inline]
	fn rgb_at(&self, dx: isize, dy: isize) -> [u8; 3] {
		let col = self.x as isize + dx;
		let row = self.y as isize + dy;
		let idx = (row * self.width as isize + col) as usize * 4;
		[self.rgba[idx], self.rgba[idx + 1], self.rgba[idx + 2]]
	}

	#[inline]
	fn a(&self) -> [u8; 3] {
		self.rgb_at(-1, 0)
	}

	#[inline]
	fn b(&self) -> [u8; 3] {
		self.rgb_at(0, -1)
	}

	#[inline]
	fn c(&self) -> [u8; 3] {
		self.rgb_at(-1, -1)
	}

	#[inline]
	fn d(&self) -> [u8; 3] {
		self.rgb_at(1, -1)
	}

	/// D, or B at the right edge
	#[inline]
	fn d_or_b(&self) -> [u8; 3] {
		if self.x < self.width - 1 { self.d() } else { self.b() }
	}
}

type SfFunc = fn(&PixelCtx<'_>) -> [u8; 3];

/// Safe/fast function pair for one spatial filter
#[derive(Clone, Copy)]
struct SfPair {
	safe: SfFunc,
	fast: SfFunc,
}

#[inline]
fn map3(a: [u8; 3], b: [u8; 3], f: impl Fn(i32, i32) -> i32) -> [u8; 3] {
	[
		f(i32::from(a[0]), i32::from(b[0])) as u8,
		f(i32::from(a[1]), i32::from(b[1])) as u8,
		f(i32::from(a[2]), i32::from(b[2])) as u8,
	]
}

#[inline]
fn map3x3(a: [u8; 3], b: [u8; 3], c: [u8; 3], f: impl Fn(i32, i32, i32) -> i32) -> [u8; 3] {
	[
		f(i32::from(a[0]), i32::from(b[0]), i32::from(c[0])) as u8,
		f(i32::from(a[1]), i32::from(b[1]), i32::from(c[1])) as u8,
		f(i32::from(a[2]), i32::from(b[2]), i32::from(c[2])) as u8,
	]
}

fn avg2(a: [u8; 3], b: [u8; 3]) -> [u8; 3] {
	map3(a, b, |a, b| (a + b) >> 1)
}

// Simple neighbor filters

fn sff_z(_ctx: &PixelCtx<'_>) -> [u8; 3] {
	[0, 0, 0]
}

fn sff_d(ctx: &PixelCtx<'_>) -> [u8; 3] {
	if ctx.y > 0 {
		ctx.d_or_b()
	} else if ctx.x > 0 {
		ctx.a()
	} else {
		[0, 0, 0]
	}
}

fn sffu_d(ctx: &PixelCtx<'_>) -> [u8; 3] {
	ctx.d()
}

fn sff_c(ctx: &PixelCtx<'_>) -> [u8; 3] {
	if ctx.x > 0 {
		if ctx.y > 0 { ctx.c() } else { ctx.a() }
	} else if ctx.y > 0 {
		ctx.b()
	} else {
		[0, 0, 0]
	}
}

fn sffu_c(ctx: &PixelCtx<'_>) -> [u8; 3] {
	ctx.c()
}

fn sff_b(ctx: &PixelCtx<'_>) -> [u8; 3] {
	if ctx.y > 0 {
		ctx.b()
	} else if ctx.x > 0 {
		ctx.a()
	} else {
		[0, 0, 0]
	}
}

fn sffu_b(ctx: &PixelCtx<'_>) -> [u8; 3] {
	ctx.b()
}

fn sff_a(ctx: &PixelCtx<'_>) -> [u8; 3] {
	if ctx.x > 0 {
		ctx.a()
	} else if ctx.y > 0 {
		ctx.b()
	} else {
		[0, 0, 0]
	}
}

fn sffu_a(ctx: &PixelCtx<'_>) -> [u8; 3] {
	ctx.a()
}

// Average filters

fn sff_ab(ctx: &PixelCtx<'_>) -> [u8; 3] {
	if ctx.x > 0 {
		if ctx.y > 0 { avg2(ctx.a(), ctx.b()) } else { ctx.a() }
	} else if ctx.y > 0 {
		ctx.b()
	} else {
		[0, 0, 0]
	}
}

fn sffu_ab(ctx: &PixelCtx<'_>) -> [u8; 3] {
	avg2(ctx.a(), ctx.b())
}

fn sff_bd(ctx: &PixelCtx<'_>) -> [u8; 3] {
	if ctx.y > 0 {
		avg2(ctx.b(), ctx.d_or_b())
	} else if ctx.x > 0 {
		ctx.a()
	} else {
		[0, 0, 0]
	}
}

fn sffu_bd(ctx: &PixelCtx<'_>) -> [u8; 3] {
	avg2(ctx.b(), ctx.d())
}

fn sff_ad(ctx: &PixelCtx<'_>) -> [u8; 3] {
	if ctx.y > 0 {
		if ctx.x > 0 {
			avg2(ctx.a(), ctx.d_or_b())
		} else {
			ctx.d_or_b()
		}
	} else if ctx.x > 0 {
		ctx.a()
	} else {
		[0, 0, 0]
	}
}

fn sffu_ad(ctx: &PixelCtx<'_>) -> [u8; 3] {
	avg2(ctx.a(), ctx.d())
}

fn sff_abcd(ctx: &PixelCtx<'_>) -> [u8; 3] {
	if ctx.x > 0 {
		if ctx.y > 0 {
			let (a, b, c, d) = (ctx.a(), ctx.b(), ctx.c(), ctx.d_or_b());
			[
				((i32::from(a[0]) + i32::from(b[0]) + i32::from(c[0]) + i32::from(d[0]) + 1)
					>> 2) as u8,
				((i32::from(a[1]) + i32::from(b[1]) + i32::from(c[1]) + i32::from(d[1]) + 1)
					>> 2) as u8,
				((i32::from(a[2]) + i32::from(b[2]) + i32::from(c[2]) + i32::from(d[2]) + 1)
					>> 2) as u8,
			]
		} else {
			ctx.a()
		}
	} else if ctx.y > 0 {
		avg2(ctx.b(), ctx.d_or_b())
	} else {
		[0, 0, 0]
	}
}

fn sffu_abcd(ctx: &PixelCtx<'_>) -> [u8; 3] {
	let (a, b, c, d) = (ctx.a(), ctx.b(), ctx.c(), ctx.d());
	[
		((i32::from(a[0]) + i32::from(b[0]) + i32::from(c[0]) + i32::from(d[0]) + 1) >> 2) as u8,
		((i32::from(a[1]) + i32::from(b[1]) + i32::from(c[1]) + i32::from(d[1]) + 1) >> 2) as u8,
		((i32::from(a[2]) + i32::from(b[2]) + i32::from(c[2]) + i32::from(d[2]) + 1) >> 2) as u8,
	]
}

// Gradient filters

fn clamp_grad(b: i32, a: i32, c: i32) -> i32 {
	let grad = b + a - c;
	let lo = b.min(a).min(c);
	let hi = b.max(a).max(c);
	grad.clamp(lo, hi)
}

fn sff_clamp_grad(ctx: &PixelCtx<'_>) -> [u8; 3] {
	if ctx.y > 0 {
		if ctx.x > 0 {
			map3x3(ctx.b(), ctx.a(), ctx.c(), clamp_grad)
		} else {
			ctx.d_or_b()
		}
	} else if ctx.x > 0 {
		ctx.a()
	} else {
		[0, 0, 0]
	}
}

fn sffu_clamp_grad(ctx: &PixelCtx<'_>) -> [u8; 3] {
	map3x3(ctx.b(), ctx.a(), ctx.c(), clamp_grad)
}

fn skew_grad(b: i32, a: i32, c: i32) -> i32 {
	let pred = (3 * (b + a) - (c << 1)) >> 2;
	pred.clamp(0, 255)
}

fn sff_skew_grad(ctx: &PixelCtx<'_>) -> [u8; 3] {
	if ctx.y > 0 {
		if ctx.x > 0 {
			map3x3(ctx.b(), ctx.a(), ctx.c(), skew_grad)
		} else {
			ctx.d_or_b()
		}
	} else if ctx.x > 0 {
		ctx.a()
	} else {
		[0, 0, 0]
	}
}

fn sffu_skew_grad(ctx: &PixelCtx<'_>) -> [u8; 3] {
	map3x3(ctx.b(), ctx.a(), ctx.c(), skew_grad)
}

// Select filters

fn left_sel(f: i32, c: i32, a: i32) -> i32 {
	if (f - c).abs() < (f - a).abs() { c } else { a }
}

fn sff_pick_left(ctx: &PixelCtx<'_>) -> [u8; 3] {
	if ctx.x > 1 && ctx.y > 0 {
		let f = ctx.rgb_at(-2, -1);
		map3x3(f, ctx.c(), ctx.a(), left_sel)
	} else if ctx.x > 0 {
		ctx.a()
	} else if ctx.y > 0 {
		ctx.b()
	} else {
		[0, 0, 0]
	}
}

fn sffu_pick_left(ctx: &PixelCtx<'_>) -> [u8; 3] {
	if ctx.x > 1 {
		let f = ctx.rgb_at(-2, -1);
		map3x3(f, ctx.c(), ctx.a(), left_sel)
	} else {
		ctx.a()
	}
}

fn sff_pred_ur(ctx: &PixelCtx<'_>) -> [u8; 3] {
	if ctx.y > 1 && ctx.x + 2 < ctx.width {
		let d = ctx.d();
		let e = ctx.rgb_at(2, -2);
		map3(d, e, |d, e| d * 2 - e)
	} else if ctx.x > 0 {
		ctx.a()
	} else if ctx.y > 0 {
		ctx.b()
	} else {
		[0, 0, 0]
	}
}

// Paeth family

fn paeth(a: i32, b: i32, c: i32) -> i32 {
	let pabc = a + b - c;
	let pa = (pabc - a).abs();
	let pb = (pabc - b).abs();
	let pc = (pabc - c).abs();

	if pa <= pb && pa <= pc {
		a
	} else if pb <= pc {
		b
	} else {
		c
	}
}

fn abc_paeth(a: i32, b: i32, c: i32) -> i32 {
	if a <= c && c <= b { a + b - c } else { paeth(a, b, c) }
}

fn abc_clamp(a: i32, b: i32, c: i32) -> i32 {
	(a + b - c).clamp(0, 255)
}

fn pred_level(a: i32, d: i32, b: i32) -> i32 {
	if b >= a && b >= d {
		a.min(d)
	} else if b <= a && b <= d {
		a.max(d)
	} else {
		d + a - b
	}
}

macro_rules! abc_filter {
	($safe:ident, $fast:ident, $inner:ident) => {
		fn $safe(ctx: &PixelCtx<'_>) -> [u8; 3] {
			if ctx.x > 0 {
				if ctx.y > 0 {
					map3x3(ctx.a(), ctx.b(), ctx.c(), $inner)
				} else {
					ctx.a()
				}
			} else if ctx.y > 0 {
				ctx.b()
			} else {
				[0, 0, 0]
			}
		}

		fn $fast(ctx: &PixelCtx<'_>) -> [u8; 3] {
			map3x3(ctx.a(), ctx.b(), ctx.c(), $inner)
		}
	};
}

abc_filter!(sff_abc_clamp, sffu_abc_clamp, abc_clamp);
abc_filter!(sff_paeth, sffu_paeth, paeth);
abc_filter!(sff_abc_paeth, sffu_abc_paeth, abc_paeth);

fn sff_plo(ctx: &PixelCtx<'_>) -> [u8; 3] {
	if ctx.x > 0 {
		if ctx.y > 0 {
			map3x3(ctx.a(), ctx.d_or_b(), ctx.b(), pred_level)
		} else {
			ctx.a()
		}
	} else if ctx.y > 0 {
		ctx.b()
	} else {
		[0, 0, 0]
	}
}

fn sffu_plo(ctx: &PixelCtx<'_>) -> [u8; 3] {
	map3x3(ctx.a(), ctx.d(), ctx.b(), pred_level)
}

/// Default filter set, in transmitted index order
static DEFAULT_FILTERS: [SfPair; SF_COUNT] = [
	SfPair { safe: sff_z, fast: sff_z },
	SfPair { safe: sff_d, fast: sffu_d },
	SfPair { safe: sff_c, fast: sffu_c },
	SfPair { safe: sff_b, fast: sffu_b },
	SfPair { safe: sff_a, fast: sffu_a },
	SfPair { safe: sff_ab, fast: sffu_ab },
	SfPair { safe: sff_bd, fast: sffu_bd },
	SfPair { safe: sff_clamp_grad, fast: sffu_clamp_grad },
	SfPair { safe: sff_skew_grad, fast: sffu_skew_grad },
	SfPair { safe: sff_pick_left, fast: sffu_pick_left },
	SfPair { safe: sff_pred_ur, fast: sff_pred_ur },
	SfPair { safe: sff_abc_clamp, fast: sffu_abc_clamp },
	SfPair { safe: sff_paeth, fast: sffu_paeth },
	SfPair { safe: sff_abc_paeth, fast: sffu_abc_paeth },
	SfPair { safe: sff_plo, fast: sffu_plo },
	SfPair { safe: sff_abcd, fast: sffu_abcd },
	SfPair { safe: sff_ad, fast: sffu_ad },
];

/// Tap coefficients (a, b, c, d) for `(a*A + b*B + c*C + d*D) / 2`.
///
/// The list was distilled from exhaustive search over small-coefficient
/// taps; only these ever beat a default filter in practice.
pub static FILTER_TAPS: [[i32; 4]; TAPPED_COUNT] = [
	[3, 3, 0, -4],
	[2, 4, 0, -4],
	[1, 2, 3, -4],
	[2, 4, -1, -3],
	[3, 4, -3, -2],
	[2, 4, -2, -2],
	[4, 0, 0, -2],
	[3, 1, 0, -2],
	[2, 2, 0, -2],
	[4, -1, 1, -2],
	[3, 0, 1, -2],
	[2, 0, 2, -2],
	[0, 2, 2, -2],
	[-1, 1, 4, -2],
	[-2, 2, 4, -2],
	[2, 3, -2, -1],
	[2, 2, -1, -1],
	[1, 3, -1, -1],
	[3, 0, 0, -1],
	[2, 1, 0, -1],
	[1, 2, 0, -1],
	[0, 3, 0, -1],
	[4, -2, 1, -1],
	[2, 0, 1, -1],
	[1, 1, 1, -1],
	[0, 2, 1, -1],
	[2, -1, 2, -1],
	[1, 0, 2, -1],
	[0, 1, 2, -1],
	[-2, 2, 3, -1],
	[2, 3, -3, 0],
	[2, 1, -1, 0],
	[1, 2, -1, 0],
	[3, -1, 0, 0],
	[3, -2, 1, 0],
	[2, -1, 1, 0],
	[1, 0, 1, 0],
	[0, 1, 1, 0],
	[-1, 2, 1, 0],
	[2, -2, 2, 0],
	[1, -1, 2, 0],
	[-1, 1, 2, 0],
	[-2, 2, 2, 0],
	[-1, 0, 3, 0],
	[2, 1, -2, 1],
	[2, 0, -1, 1],
	[1, 1, -1, 1],
	[0, 2, -1, 1],
	[2, -1, 0, 1],
	[-1, 2, 0, 1],
	[2, -2, 1, 1],
	[1, -1, 1, 1],
	[0, 0, 1, 1],
	[-1, 1, 1, 1],
	[-2, 2, 1, 1],
	[1, -2, 2, 1],
	[2, -3, 2, 1],
	[0, -1, 2, 1],
	[-1, 0, 2, 1],
	[1, -3, 3, 1],
	[2, 0, -2, 2],
	[0, 2, -2, 2],
	[2, -1, -1, 2],
	[1, 0, -1, 2],
	[0, 1, -1, 2],
	[2, -2, 0, 2],
	[1, -1, 0, 2],
	[-1, 1, 0, 2],
	[-2, 2, 0, 2],
	[2, -3, 1, 2],
	[1, -2, 1, 2],
	[0, -1, 1, 2],
	[-1, 0, 1, 2],
	[2, -4, 2, 2],
	[0, -2, 2, 2],
	[-2, 0, 2, 2],
	[1, -4, 3, 2],
	[2, -2, -1, 3],
	[0, -1, 0, 3],
	[2, -4, 0, 4],
];

/// Evaluates tap filter `tap` over explicit neighbor values
#[inline]
pub fn tap_predict(tap: usize, a: [u8; 3], b: [u8; 3], c: [u8; 3], d: [u8; 3]) -> [u8; 3] {
	let [ta, tb, tc, td] = FILTER_TAPS[tap];
	let one = |i: usize| {
		let sum = ta * i32::from(a[i]) + tb * i32::from(b[i]) + tc * i32::from(c[i])
			+ td * i32::from(d[i]);
		(sum / 2) as u8
	};
	[one(0), one(1), one(2)]
}

fn tap_safe(tap: usize, ctx: &PixelCtx<'_>) -> [u8; 3] {
	if ctx.x > 0 {
		if ctx.y > 0 {
			tap_predict(tap, ctx.a(), ctx.b(), ctx.c(), ctx.d_or_b())
		} else {
			ctx.a()
		}
	} else if ctx.y > 0 {
		ctx.b()
	} else {
		[0, 0, 0]
	}
}

fn tap_fast(tap: usize, ctx: &PixelCtx<'_>) -> [u8; 3] {
	tap_predict(tap, ctx.a(), ctx.b(), ctx.c(), ctx.d())
}

/// One transmitted filter slot: a library default or a tapped override
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterSlot {
	Default(u8),
	Tapped(u8),
}

/// The active spatial filter set.
///
/// Starts as the 17 defaults; the encoder may overwrite entries with
/// tapped filters and transmits each replacement so the decoder applies
/// the same substitution.
#[derive(Debug, Clone)]
pub struct SpatialFilterSet {
	slots: [FilterSlot; SF_COUNT],
}

impl Default for SpatialFilterSet {
	fn default() -> Self {
		Self::new()
	}
}

impl SpatialFilterSet {
	/// The unmodified default set
	pub fn new() -> Self {
		let mut slots = [FilterSlot::Default(0); SF_COUNT];
		for (i, slot) in slots.iter_mut().enumerate() {
			*slot = FilterSlot::Default(i as u8);
		}
		Self {
			slots,
		}
	}

	/// Overwrites default `default_index` with tapped filter `tap_index`
	pub fn replace(&mut self, default_index: usize, tap_index: usize) {
		debug_assert!(default_index < SF_COUNT && tap_index < TAPPED_COUNT);
		self.slots[default_index] = FilterSlot::Tapped(tap_index as u8);
	}

	/// Edge-correct prediction through filter `index`
	#[inline]
	pub fn predict_safe(&self, index: usize, ctx: &PixelCtx<'_>) -> [u8; 3] {
		match self.slots[index] {
			FilterSlot::Default(f) => (DEFAULT_FILTERS[f as usize].safe)(ctx),
			FilterSlot::Tapped(t) => tap_safe(t as usize, ctx),
		}
	}

	/// Interior-only prediction through filter `index`
	#[inline]
	pub fn predict_fast(&self, index: usize, ctx: &PixelCtx<'_>) -> [u8; 3] {
		match self.slots[index] {
			FilterSlot::Default(f) => (DEFAULT_FILTERS[f as usize].fast)(ctx),
			FilterSlot::Tapped(t) => tap_fast(t as usize, ctx),
		}
	}
}
