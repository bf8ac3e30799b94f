//! 2-D LZ zone decoder and trigger scheduler.

use crate::bits::BitReader;
use crate::entropy::EntropyDecoder;
use crate::error::ReadError;

use super::{MAX_ZONES, ZONE_NULL, ZONE_SIZE};

/// One zone in the decoder's arena.
///
/// Source position is held as a signed offset from the destination so a
/// scanline copy for row y reads from `(dx + sox, y + soy)`. `prev` and
/// `next` link the zone into the active-by-column worklist.
#[derive(Debug, Clone, Copy)]
struct Zone {
	dx: u16,
	dy: u16,
	sox: i32,
	soy: i32,
	w: u16,
	h: u16,
	prev: u16,
	next: u16,
}

/// Zone list decoder and replay engine.
///
/// Two worklists drive replay: zones pending by destination row, and
/// zones active on the current row ordered by destination column. The
/// pixel loop asks for the current row/column triggers and calls back
/// in when the raster scan reaches them.
#[derive(Debug)]
pub struct LzDecoder {
	width: usize,
	zones: Vec<Zone>,
	work_head: u16,
	next_x: u16,
	trigger_x: u32,
	next_y: usize,
	trigger_y: u32,
}

/// Trigger value meaning "never fires"
pub const TRIGGER_NONE: u32 = u32::MAX;

impl LzDecoder {
	/// An empty zone list (palette mode)
	pub fn empty(width: usize) -> Self {
		Self {
			width,
			zones: Vec::new(),
			work_head: ZONE_NULL,
			next_x: ZONE_NULL,
			trigger_x: TRIGGER_NONE,
			next_y: 0,
			trigger_y: TRIGGER_NONE,
		}
	}

	/// Reads and validates the zone list
	pub fn read(
		reader: &mut BitReader<'_>,
		width: usize,
		height: usize,
	) -> Result<Self, ReadError> {
		let mut this = Self::empty(width);

		let count = reader.read_bits(16) as usize;
		if count == 0 {
			return Ok(this);
		}
		if count > MAX_ZONES {
			return Err(ReadError::LzCodes);
		}

		let compressed = reader.read_bit() != 0;
		let mut entropy = if compressed {
			Some(EntropyDecoder::read(256, reader).ok_or(ReadError::LzCodes)?)
		} else {
			None
		};

		let (mut last_dx, mut last_dy) = (0u16, 0u16);
		this.zones.reserve(count);

		for _ in 0..count {
			let (sx, esy, mut dx, edy, w, h) = if let Some(entropy) = entropy.as_mut() {
				let mut field = |reader: &mut BitReader<'_>| {
					let lo = entropy.next(reader);
					let hi = entropy.next(reader);
					(hi << 8) | (lo & 0xFF)
				};
				let sx = field(reader);
				let esy = field(reader);
				let edx = field(reader);
				let edy = field(reader);
				let w = entropy.next(reader);
				let h = entropy.next(reader);
				(sx, esy, edx, edy, w, h)
			} else {
				(
					reader.read9() as u16,
					reader.read9() as u16,
					reader.read9() as u16,
					reader.read9() as u16,
					reader.read_bits(8) as u16,
					reader.read_bits(8) as u16,
				)
			};

			// Undo the delta context
			if edy == 0 {
				dx = dx.wrapping_add(last_dx);
			}
			let dy = edy.wrapping_add(last_dy);
			let sy = dy.wrapping_sub(esy);
			let w = w + ZONE_SIZE as u16;
			let h = h + ZONE_SIZE as u16;

			// The source must strictly precede the destination and both
			// rectangles must stay inside the image
			if sy > dy || (sy == dy && sx >= dx) {
				return Err(ReadError::LzBad);
			}
			if usize::from(sx) + usize::from(w) > width
				|| usize::from(sy) + usize::from(h) > height
				|| usize::from(dx) + usize::from(w) > width
				|| usize::from(dy) + usize::from(h) > height
			{
				return Err(ReadError::LzBad);
			}

			// Transmission order is the replay order
			if let Some(last) = this.zones.last() {
				if (dy, dx) <= (last.dy, last.dx) {
					return Err(ReadError::LzBad);
				}
			}

			this.zones.push(Zone {
				dx,
				dy,
				sox: i32::from(sx) - i32::from(dx),
				soy: i32::from(sy) - i32::from(dy),
				w,
				h,
				prev: ZONE_NULL,
				next: ZONE_NULL,
			});

			last_dx = dx;
			last_dy = dy;
		}

		if reader.eof() {
			return Err(ReadError::LzCodes);
		}

		this.next_y = 0;
		this.trigger_y = u32::from(this.zones[0].dy);
		Ok(this)
	}

	/// Number of decoded zones
	pub fn zone_count(&self) -> usize {
		self.zones.len()
	}

	/// Row at which [`trigger_row`](Self::trigger_row) must run next
	#[inline]
	pub fn trigger_y(&self) -> u32 {
		self.trigger_y
	}

	/// Column at which [`trigger_col`](Self::trigger_col) must run next
	#[inline]
	pub fn trigger_x(&self) -> u32 {
		self.trigger_x
	}

	/// Merges all zones starting on the triggered row into the active
	/// list, keeping it ordered by destination column
	pub fn trigger_row(&mut self) {
		let row = self.trigger_y as u16;

		while self.next_y < self.zones.len() && self.zones[self.next_y].dy == row {
			let index = self.next_y as u16;
			self.insert_active(index);
			self.next_y += 1;
		}

		self.trigger_y = if self.next_y < self.zones.len() {
			u32::from(self.zones[self.next_y].dy)
		} else {
			TRIGGER_NONE
		};

		self.next_x = self.work_head;
		self.trigger_x = if self.next_x == ZONE_NULL {
			TRIGGER_NONE
		} else {
			u32::from(self.zones[self.next_x as usize].dx)
		};
	}

	fn insert_active(&mut self, index: u16) {
		let dx = self.zones[index as usize].dx;

		// Find the first active zone at or right of the new column
		let mut after = self.work_head;
		let mut before = ZONE_NULL;
		while after != ZONE_NULL && self.zones[after as usize].dx < dx {
			before = after;
			after = self.zones[after as usize].next;
		}

		self.zones[index as usize].prev = before;
		self.zones[index as usize].next = after;

		if before == ZONE_NULL {
			self.work_head = index;
		} else {
			self.zones[before as usize].next = index;
		}
		if after != ZONE_NULL {
			self.zones[after as usize].prev = index;
		}
	}

	fn unlink(&mut self, index: u16) {
		let (prev, next) = {
			let zone = &self.zones[index as usize];
			(zone.prev, zone.next)
		};

		if prev == ZONE_NULL {
			self.work_head = next;
		} else {
			self.zones[prev as usize].next = next;
		}
		if next != ZONE_NULL {
			self.zones[next as usize].prev = prev;
		}
	}

	/// Copies one scanline of the triggered zone into the raster and
	/// schedules the next trigger. Returns the number of pixels
	/// written, which the pixel loop must skip.
	pub fn trigger_col(&mut self, rgba: &mut [u8], x: usize, y: usize) -> usize {
		let index = self.next_x;
		debug_assert!(index != ZONE_NULL);

		let (sox, soy, w, next) = {
			let zone = &self.zones[index as usize];
			(zone.sox, zone.soy, usize::from(zone.w), zone.next)
		};

		// Forward pixel-at-a-time copy; source precedes destination so
		// overlap resolves like memmove-forward
		let src_row = (y as i64 + i64::from(soy)) as usize;
		let src_col = (x as i64 + i64::from(sox)) as usize;
		let mut dst = (y * self.width + x) * 4;
		let mut src = (src_row * self.width + src_col) * 4;
		for _ in 0..w * 4 {
			rgba[dst] = rgba[src];
			dst += 1;
			src += 1;
		}

		// Last scanline: retire the zone from the active list
		self.zones[index as usize].h -= 1;
		if self.zones[index as usize].h == 0 {
			self.unlink(index);
		}

		self.next_x = next;
		if self.next_x == ZONE_NULL {
			// Wrap to the head for the next row
			self.next_x = self.work_head;
		}

		self.trigger_x = if self.next_x == ZONE_NULL {
			TRIGGER_NONE
		} else {
			u32::from(self.zones[self.next_x as usize].dx)
		};

		w
	}
}
